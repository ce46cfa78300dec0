use chrono::{DateTime, Utc};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{
        user_preferences::merge_case_insensitive, Interaction, InteractionMetadata, Movie,
        MovieUpdate, NewMovie, NewUser, Page, PageRequest, User, UserPreferences,
        ViewedMovie,
    },
};

use super::{CatalogStore, InteractionStore, UserStore};

const MOVIE_COLUMNS: &str = "id, title, description, release_date, duration, rating, genre, \
     director, cast_members, poster_url, external_id, created_at, updated_at";

/// Document text used by full-text search; must match the index in migrations
const SEARCH_DOCUMENT: &str = "to_tsvector('english', title || ' ' || description)";

/// PostgreSQL implementation of every store trait
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Applies pending migrations from `migrations/`
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }
}

/// Escapes LIKE wildcards so user input matches literally
fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    role: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = AppError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: row.id,
            username: row.username,
            email: row.email,
            password_hash: row.password_hash,
            role: row.role.parse()?,
            created_at: row.created_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct InteractionRow {
    id: Uuid,
    user_id: Uuid,
    movie_id: Uuid,
    interaction_type: String,
    metadata: Json<InteractionMetadata>,
    weight: f64,
    created_at: DateTime<Utc>,
}

impl TryFrom<InteractionRow> for Interaction {
    type Error = AppError;

    fn try_from(row: InteractionRow) -> Result<Self, Self::Error> {
        Ok(Interaction {
            id: row.id,
            user_id: row.user_id,
            movie_id: row.movie_id,
            interaction_type: row
                .interaction_type
                .parse()
                .map_err(|_| AppError::Internal(format!("Corrupt interaction {}", row.id)))?,
            metadata: row.metadata.0,
            weight: row.weight,
            created_at: row.created_at,
        })
    }
}

fn into_interactions(rows: Vec<InteractionRow>) -> AppResult<Vec<Interaction>> {
    rows.into_iter().map(Interaction::try_from).collect()
}

#[async_trait::async_trait]
impl CatalogStore for PgStore {
    async fn list_all(&self) -> AppResult<Vec<Movie>> {
        let movies = sqlx::query_as::<_, Movie>(&format!(
            "SELECT {} FROM movies ORDER BY created_at, id",
            MOVIE_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(movies)
    }

    async fn get(&self, id: Uuid) -> AppResult<Option<Movie>> {
        let movie = sqlx::query_as::<_, Movie>(&format!(
            "SELECT {} FROM movies WHERE id = $1",
            MOVIE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(movie)
    }

    async fn list_page(&self, request: PageRequest) -> AppResult<Page> {
        // Column and direction come from whitelisted enums, never from raw input
        let sql = format!(
            "SELECT {} FROM movies ORDER BY {} {}, created_at, id LIMIT $1 OFFSET $2",
            MOVIE_COLUMNS,
            request.sort.column(),
            request.order.sql()
        );

        let movies = sqlx::query_as::<_, Movie>(&sql)
            .bind(i64::from(request.limit))
            .bind(request.offset() as i64)
            .fetch_all(&self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM movies")
            .fetch_one(&self.pool)
            .await?;

        Ok(Page {
            movies,
            page: request.page,
            limit: request.limit,
            total: total.max(0) as u64,
        })
    }

    async fn text_search(&self, query: &str) -> AppResult<Vec<Movie>> {
        let sql = format!(
            "SELECT {cols} FROM movies \
             WHERE {doc} @@ plainto_tsquery('english', $1) \
             ORDER BY ts_rank({doc}, plainto_tsquery('english', $1)) DESC, created_at",
            cols = MOVIE_COLUMNS,
            doc = SEARCH_DOCUMENT
        );

        let movies = sqlx::query_as::<_, Movie>(&sql)
            .bind(query)
            .fetch_all(&self.pool)
            .await?;
        Ok(movies)
    }

    async fn substring_search(&self, query: &str) -> AppResult<Vec<Movie>> {
        let movies = sqlx::query_as::<_, Movie>(&format!(
            "SELECT {} FROM movies WHERE title ILIKE $1 OR description ILIKE $1 \
             ORDER BY created_at, id",
            MOVIE_COLUMNS
        ))
        .bind(like_pattern(query))
        .fetch_all(&self.pool)
        .await?;
        Ok(movies)
    }

    async fn insert(&self, movie: NewMovie) -> AppResult<Movie> {
        let movie = movie.into_movie(Utc::now());

        sqlx::query(
            r#"
            INSERT INTO movies (id, title, description, release_date, duration, rating, genre,
                                director, cast_members, poster_url, external_id, created_at,
                                updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(movie.id)
        .bind(&movie.title)
        .bind(&movie.description)
        .bind(movie.release_date)
        .bind(movie.duration)
        .bind(movie.rating)
        .bind(&movie.genre)
        .bind(&movie.director)
        .bind(&movie.cast)
        .bind(&movie.poster_url)
        .bind(&movie.external_id)
        .bind(movie.created_at)
        .bind(movie.updated_at)
        .execute(&self.pool)
        .await?;

        tracing::debug!(movie_id = %movie.id, "Movie inserted");
        Ok(movie)
    }

    async fn update(&self, id: Uuid, update: MovieUpdate) -> AppResult<Option<Movie>> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query_as::<_, Movie>(&format!(
            "SELECT {} FROM movies WHERE id = $1 FOR UPDATE",
            MOVIE_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(mut movie) = existing else {
            return Ok(None);
        };
        update.apply(&mut movie, Utc::now());

        sqlx::query(
            r#"
            UPDATE movies
            SET title = $2, description = $3, release_date = $4, duration = $5, rating = $6,
                genre = $7, director = $8, cast_members = $9, poster_url = $10, external_id = $11,
                updated_at = $12
            WHERE id = $1
            "#,
        )
        .bind(movie.id)
        .bind(&movie.title)
        .bind(&movie.description)
        .bind(movie.release_date)
        .bind(movie.duration)
        .bind(movie.rating)
        .bind(&movie.genre)
        .bind(&movie.director)
        .bind(&movie.cast)
        .bind(&movie.poster_url)
        .bind(&movie.external_id)
        .bind(movie.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(movie))
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM movies WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait::async_trait]
impl InteractionStore for PgStore {
    async fn record(&self, interaction: Interaction) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO interactions (id, user_id, movie_id, interaction_type, metadata, weight, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(interaction.id)
        .bind(interaction.user_id)
        .bind(interaction.movie_id)
        .bind(interaction.interaction_type.as_str())
        .bind(Json(&interaction.metadata))
        .bind(interaction.weight)
        .bind(interaction.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn since(&self, from: DateTime<Utc>) -> AppResult<Vec<Interaction>> {
        let rows = sqlx::query_as::<_, InteractionRow>(
            "SELECT * FROM interactions WHERE created_at >= $1 ORDER BY created_at",
        )
        .bind(from)
        .fetch_all(&self.pool)
        .await?;
        into_interactions(rows)
    }

    async fn for_movie(&self, movie_id: Uuid) -> AppResult<Vec<Interaction>> {
        let rows = sqlx::query_as::<_, InteractionRow>(
            "SELECT * FROM interactions WHERE movie_id = $1 ORDER BY created_at",
        )
        .bind(movie_id)
        .fetch_all(&self.pool)
        .await?;
        into_interactions(rows)
    }

    async fn for_user(&self, user_id: Uuid) -> AppResult<Vec<Interaction>> {
        let rows = sqlx::query_as::<_, InteractionRow>(
            "SELECT * FROM interactions WHERE user_id = $1 ORDER BY created_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        into_interactions(rows)
    }
}

#[async_trait::async_trait]
impl UserStore for PgStore {
    async fn create(&self, user: NewUser) -> AppResult<User> {
        let user = user.into_user(Utc::now());

        let result = sqlx::query(
            r#"
            INSERT INTO users (id, username, email, password_hash, role, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.role.to_string())
        .bind(user.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(user),
            Err(sqlx::Error::Database(e)) if e.is_unique_violation() => Err(AppError::Conflict(
                format!("Username '{}' is already taken", user.username),
            )),
            Err(e) => Err(e.into()),
        }
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, password_hash, role, created_at \
             FROM users WHERE lower(username) = lower($1)",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>> {
        let row = sqlx::query_as::<_, UserRow>(
            "SELECT id, username, email, password_hash, role, created_at FROM users WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        row.map(User::try_from).transpose()
    }

    async fn preferences(&self, user_id: Uuid) -> AppResult<UserPreferences> {
        let lists: Option<(Vec<String>, Vec<String>)> = sqlx::query_as(
            "SELECT preferred_genres, preferred_directors FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let (preferred_genres, preferred_directors) =
            lists.ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;

        let viewed: Vec<(Uuid, DateTime<Utc>)> = sqlx::query_as(
            "SELECT movie_id, viewed_at FROM viewed_movies WHERE user_id = $1 ORDER BY viewed_at",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(UserPreferences {
            preferred_genres,
            preferred_directors,
            viewed_movies: viewed
                .into_iter()
                .map(|(movie_id, viewed_at)| ViewedMovie {
                    movie_id,
                    viewed_at,
                })
                .collect(),
        })
    }

    async fn add_preferences(
        &self,
        user_id: Uuid,
        genres: Vec<String>,
        directors: Vec<String>,
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        let lists: Option<(Vec<String>, Vec<String>)> = sqlx::query_as(
            "SELECT preferred_genres, preferred_directors FROM users WHERE id = $1 FOR UPDATE",
        )
        .bind(user_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (mut preferred_genres, mut preferred_directors) =
            lists.ok_or_else(|| AppError::NotFound(format!("User {} not found", user_id)))?;
        merge_case_insensitive(&mut preferred_genres, genres);
        merge_case_insensitive(&mut preferred_directors, directors);

        sqlx::query(
            "UPDATE users SET preferred_genres = $2, preferred_directors = $3 WHERE id = $1",
        )
        .bind(user_id)
        .bind(&preferred_genres)
        .bind(&preferred_directors)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn add_viewed(
        &self,
        user_id: Uuid,
        movie_id: Uuid,
        viewed_at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO viewed_movies (user_id, movie_id, viewed_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, movie_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(movie_id)
        .bind(viewed_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_like_pattern_escapes_wildcards() {
        assert_eq!(like_pattern("god"), "%god%");
        assert_eq!(like_pattern("100%_real"), "%100\\%\\_real%");
        assert_eq!(like_pattern("a\\b"), "%a\\\\b%");
    }
}
