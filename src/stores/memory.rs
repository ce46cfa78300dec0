use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        Interaction, Movie, MovieUpdate, NewMovie, NewUser, Page, PageRequest, SortField,
        SortOrder, User, UserPreferences,
    },
};

use super::{CatalogStore, InteractionStore, UserStore};

/// Store backed by process memory
///
/// Implements every store trait; used by tests and `STORAGE=memory` runs.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    /// Kept in insertion order
    movies: Vec<Movie>,
    users: HashMap<Uuid, User>,
    preferences: HashMap<Uuid, UserPreferences>,
    interactions: Vec<Interaction>,
}

impl MemoryStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

fn words(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn compare(a: &Movie, b: &Movie, sort: SortField) -> std::cmp::Ordering {
    match sort {
        SortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        SortField::Rating => a.rating.total_cmp(&b.rating),
        SortField::ReleaseDate => a.release_date.cmp(&b.release_date),
        SortField::Duration => a.duration.cmp(&b.duration),
    }
}

#[async_trait::async_trait]
impl CatalogStore for MemoryStore {
    async fn list_all(&self) -> AppResult<Vec<Movie>> {
        Ok(self.inner.read().await.movies.clone())
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Movie>> {
        let inner = self.inner.read().await;
        Ok(inner.movies.iter().find(|m| m.id == id).cloned())
    }

    async fn list_page(&self, request: PageRequest) -> AppResult<Page> {
        let inner = self.inner.read().await;
        let mut movies = inner.movies.clone();

        movies.sort_by(|a, b| {
            let ordering = compare(a, b, request.sort);
            match request.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let total = movies.len() as u64;
        let movies = movies
            .into_iter()
            .skip(request.offset() as usize)
            .take(request.limit as usize)
            .collect();

        Ok(Page {
            movies,
            page: request.page,
            limit: request.limit,
            total,
        })
    }

    async fn text_search(&self, query: &str) -> AppResult<Vec<Movie>> {
        let terms = words(query);
        if terms.is_empty() {
            return Ok(Vec::new());
        }

        let inner = self.inner.read().await;
        Ok(inner
            .movies
            .iter()
            .filter(|movie| {
                let mut haystack = words(&movie.title);
                haystack.extend(words(&movie.description));
                terms.iter().all(|term| haystack.contains(term))
            })
            .cloned()
            .collect())
    }

    async fn substring_search(&self, query: &str) -> AppResult<Vec<Movie>> {
        let needle = query.to_lowercase();
        let inner = self.inner.read().await;
        Ok(inner
            .movies
            .iter()
            .filter(|movie| {
                movie.title.to_lowercase().contains(&needle)
                    || movie.description.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect())
    }

    async fn insert(&self, movie: NewMovie) -> AppResult<Movie> {
        let movie = movie.into_movie(Utc::now());
        self.inner.write().await.movies.push(movie.clone());
        Ok(movie)
    }

    async fn update(&self, id: Uuid, update: MovieUpdate) -> AppResult<Option<Movie>> {
        let mut inner = self.inner.write().await;
        let Some(movie) = inner.movies.iter_mut().find(|m| m.id == id) else {
            return Ok(None);
        };
        update.apply(movie, Utc::now());
        Ok(Some(movie.clone()))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        let before = inner.movies.len();
        inner.movies.retain(|m| m.id != id);
        Ok(inner.movies.len() != before)
    }
}

#[async_trait::async_trait]
impl InteractionStore for MemoryStore {
    async fn record(&self, interaction: Interaction) -> AppResult<()> {
        self.inner.write().await.interactions.push(interaction);
        Ok(())
    }

    async fn since(&self, from: DateTime<Utc>) -> AppResult<Vec<Interaction>> {
        let inner = self.inner.read().await;
        Ok(inner
            .interactions
            .iter()
            .filter(|i| i.created_at >= from)
            .cloned()
            .collect())
    }

    async fn for_movie(&self, movie_id: Uuid) -> AppResult<Vec<Interaction>> {
        let inner = self.inner.read().await;
        Ok(inner
            .interactions
            .iter()
            .filter(|i| i.movie_id == movie_id)
            .cloned()
            .collect())
    }

    async fn for_user(&self, user_id: Uuid) -> AppResult<Vec<Interaction>> {
        let inner = self.inner.read().await;
        Ok(inner
            .interactions
            .iter()
            .filter(|i| i.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait::async_trait]
impl UserStore for MemoryStore {
    async fn create(&self, user: NewUser) -> AppResult<User> {
        let mut inner = self.inner.write().await;
        if inner
            .users
            .values()
            .any(|u| u.username.eq_ignore_ascii_case(&user.username))
        {
            return Err(AppError::Conflict(format!(
                "Username '{}' is already taken",
                user.username
            )));
        }

        let user = user.into_user(Utc::now());
        inner.preferences.insert(user.id, UserPreferences::new());
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn preferences(&self, user_id: Uuid) -> AppResult<UserPreferences> {
        let inner = self.inner.read().await;
        inner
            .preferences
            .get(&user_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))
    }

    async fn add_preferences(
        &self,
        user_id: Uuid,
        genres: Vec<String>,
        directors: Vec<String>,
    ) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        let prefs = inner
            .preferences
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;
        prefs.add_genres(genres);
        prefs.add_directors(directors);
        Ok(())
    }

    async fn add_viewed(
        &self,
        user_id: Uuid,
        movie_id: Uuid,
        viewed_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        let prefs = inner
            .preferences
            .get_mut(&user_id)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;
        prefs.add_viewed(movie_id, viewed_at);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use chrono::NaiveDate;
    use tokio_test::assert_ok;

    fn new_movie(title: &str, description: &str, rating: f64, year: i32) -> NewMovie {
        NewMovie {
            title: title.to_string(),
            description: description.to_string(),
            release_date: NaiveDate::from_ymd_opt(year, 6, 1).unwrap(),
            duration: 100 + year % 50,
            rating,
            genre: vec!["Drama".to_string()],
            director: "Someone".to_string(),
            cast: vec![],
            poster_url: None,
            external_id: None,
        }
    }

    async fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .insert(new_movie("The Godfather", "A mafia family saga", 9.2, 1972))
            .await
            .unwrap();
        store
            .insert(new_movie("Alien", "In space no one can hear you scream", 8.5, 1979))
            .await
            .unwrap();
        store
            .insert(new_movie("Godzilla", "A giant lizard", 6.4, 2014))
            .await
            .unwrap();
        store
    }

    #[tokio::test]
    async fn test_list_page_sorted_desc() {
        let store = seeded().await;
        let page = store
            .list_page(PageRequest {
                page: 1,
                limit: 2,
                sort: SortField::Rating,
                order: SortOrder::Desc,
            })
            .await
            .unwrap();

        assert_eq!(page.total, 3);
        let titles: Vec<&str> = page.movies.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["The Godfather", "Alien"]);
    }

    #[tokio::test]
    async fn test_list_page_second_page() {
        let store = seeded().await;
        let page = store
            .list_page(PageRequest {
                page: 2,
                limit: 2,
                sort: SortField::Title,
                order: SortOrder::Asc,
            })
            .await
            .unwrap();

        assert_eq!(page.movies.len(), 1);
        assert_eq!(page.movies[0].title, "The Godfather");
    }

    #[tokio::test]
    async fn test_text_search_matches_whole_words() {
        let store = seeded().await;

        let hits = store.text_search("mafia saga").await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "The Godfather");

        // "god" is only a fragment, so full-text finds nothing
        assert!(store.text_search("god").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_substring_search() {
        let store = seeded().await;
        let hits = store.substring_search("GOD").await.unwrap();
        let titles: Vec<&str> = hits.iter().map(|m| m.title.as_str()).collect();
        assert_eq!(titles, vec!["The Godfather", "Godzilla"]);
    }

    #[tokio::test]
    async fn test_update_and_delete() {
        let store = seeded().await;
        let alien = store.text_search("alien").await.unwrap().remove(0);

        let updated = store
            .update(
                alien.id,
                MovieUpdate {
                    rating: Some(8.6),
                    ..Default::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.rating, 8.6);

        assert!(store.delete(alien.id).await.unwrap());
        assert!(!store.delete(alien.id).await.unwrap());
        assert!(store.get(alien.id).await.unwrap().is_none());
        assert!(store
            .update(alien.id, MovieUpdate::default())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let store = MemoryStore::new();
        let new_user = |name: &str| NewUser {
            username: name.to_string(),
            email: format!("{}@example.com", name),
            password_hash: "hash".to_string(),
            role: Role::User,
        };

        assert_ok!(store.create(new_user("neo")).await);
        let err = store.create(new_user("NEO")).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_preferences_set_semantics() {
        let store = MemoryStore::new();
        let user = store
            .create(NewUser {
                username: "trinity".to_string(),
                email: "trinity@example.com".to_string(),
                password_hash: "hash".to_string(),
                role: Role::User,
            })
            .await
            .unwrap();
        let movie_id = Uuid::new_v4();

        for _ in 0..2 {
            assert_ok!(
                store
                    .add_preferences(
                        user.id,
                        vec!["Sci-Fi".to_string()],
                        vec!["Wachowski".to_string()],
                    )
                    .await
            );
            assert_ok!(store.add_viewed(user.id, movie_id, Utc::now()).await);
        }

        let prefs = store.preferences(user.id).await.unwrap();
        assert_eq!(prefs.preferred_genres, vec!["Sci-Fi"]);
        assert_eq!(prefs.preferred_directors, vec!["Wachowski"]);
        assert_eq!(prefs.viewed_movies.len(), 1);
    }

    #[tokio::test]
    async fn test_interaction_queries() {
        let store = MemoryStore::new();
        let user = Uuid::new_v4();
        let movie = Uuid::new_v4();
        let now = Utc::now();

        let old = Interaction::new(
            user,
            movie,
            crate::models::InteractionType::View,
            Default::default(),
            None,
            now - chrono::Duration::days(40),
        );
        let fresh = Interaction::new(
            Uuid::new_v4(),
            movie,
            crate::models::InteractionType::Like,
            Default::default(),
            Some(2.0),
            now,
        );
        store.record(old).await.unwrap();
        store.record(fresh).await.unwrap();

        assert_eq!(store.since(now - chrono::Duration::days(30)).await.unwrap().len(), 1);
        assert_eq!(store.for_movie(movie).await.unwrap().len(), 2);
        assert_eq!(store.for_user(user).await.unwrap().len(), 1);
    }
}
