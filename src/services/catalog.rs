use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Movie, MovieUpdate, NewMovie, Page, PageRequest, SortField, SortOrder},
    services::batch_queue::{BatchQueue, Inserter, QueueStatus},
    stores::CatalogStore,
};

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 100;
/// Largest bulk insert accepted in one request
pub const MAX_BATCH_ITEMS: usize = 1_000;

/// Builds a page request from raw query parameters
pub fn page_request(
    page: Option<u32>,
    limit: Option<u32>,
    sort: Option<&str>,
    order: Option<&str>,
) -> AppResult<PageRequest> {
    let page = page.unwrap_or(1);
    if page == 0 {
        return Err(AppError::InvalidInput("Page numbers start at 1".to_string()));
    }

    let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT);
    if limit == 0 || limit > MAX_PAGE_LIMIT {
        return Err(AppError::InvalidInput(format!(
            "Limit must be between 1 and {}",
            MAX_PAGE_LIMIT
        )));
    }

    let sort = sort.map(str::parse::<SortField>).transpose()?.unwrap_or(SortField::Title);
    let order = order.map(str::parse::<SortOrder>).transpose()?.unwrap_or(SortOrder::Asc);

    Ok(PageRequest {
        page,
        limit,
        sort,
        order,
    })
}

pub async fn list_page(catalog: &dyn CatalogStore, request: PageRequest) -> AppResult<Page> {
    catalog.list_page(request).await
}

pub async fn get_movie(catalog: &dyn CatalogStore, id: Uuid) -> AppResult<Movie> {
    catalog
        .get(id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Movie {} not found", id)))
}

/// Full-text search, falling back to substring matching when it finds nothing
pub async fn search(catalog: &dyn CatalogStore, query: Option<&str>) -> AppResult<Vec<Movie>> {
    let query = query.map(str::trim).unwrap_or_default();
    if query.is_empty() {
        return Err(AppError::InvalidInput("Search query is required".to_string()));
    }

    let results = catalog.text_search(query).await?;
    if !results.is_empty() {
        tracing::debug!(query = %query, hits = results.len(), "Full-text search hit");
        return Ok(results);
    }

    let results = catalog.substring_search(query).await?;
    tracing::debug!(query = %query, hits = results.len(), "Fell back to substring search");
    Ok(results)
}

pub async fn create_movie(catalog: &dyn CatalogStore, movie: NewMovie) -> AppResult<Movie> {
    movie.validate()?;
    let movie = catalog.insert(movie).await?;
    tracing::info!(movie_id = %movie.id, title = %movie.title, "Movie created");
    Ok(movie)
}

pub async fn update_movie(
    catalog: &dyn CatalogStore,
    id: Uuid,
    update: MovieUpdate,
) -> AppResult<Movie> {
    update.validate()?;
    let movie = catalog
        .update(id, update)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Movie {} not found", id)))?;
    tracing::info!(movie_id = %id, "Movie updated");
    Ok(movie)
}

pub async fn delete_movie(catalog: &dyn CatalogStore, id: Uuid) -> AppResult<()> {
    if !catalog.delete(id).await? {
        return Err(AppError::NotFound(format!("Movie {} not found", id)));
    }
    tracing::info!(movie_id = %id, "Movie deleted");
    Ok(())
}

/// Adapts a catalog store to the batch queue
pub struct CatalogInserter {
    catalog: Arc<dyn CatalogStore>,
}

impl CatalogInserter {
    pub fn new(catalog: Arc<dyn CatalogStore>) -> Self {
        Self { catalog }
    }
}

#[async_trait::async_trait]
impl Inserter<NewMovie> for CatalogInserter {
    async fn insert(&self, payload: &NewMovie) -> AppResult<()> {
        self.catalog.insert(payload.clone()).await.map(|_| ())
    }
}

/// Validates every movie up front, then hands them to the queue.
///
/// Either the whole batch is accepted or none of it is.
pub fn enqueue_batch(
    queue: &BatchQueue<NewMovie>,
    inserter: Arc<dyn Inserter<NewMovie>>,
    movies: Vec<NewMovie>,
) -> AppResult<QueueStatus> {
    if movies.is_empty() {
        return Err(AppError::InvalidInput("Batch cannot be empty".to_string()));
    }
    if movies.len() > MAX_BATCH_ITEMS {
        return Err(AppError::InvalidInput(format!(
            "Batch cannot exceed {} movies",
            MAX_BATCH_ITEMS
        )));
    }
    for (index, movie) in movies.iter().enumerate() {
        movie
            .validate()
            .map_err(|e| AppError::InvalidInput(format!("Movie at index {}: {}", index, e)))?;
    }

    let accepted = movies.len();
    for movie in movies {
        queue.enqueue(movie, Arc::clone(&inserter));
    }

    tracing::info!(accepted, "Batch insert accepted");
    Ok(queue.status())
}
