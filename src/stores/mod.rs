//! Persistence boundaries of the service.
//!
//! Each store is a trait so the HTTP layer and services can run against
//! PostgreSQL in production and the in-memory implementation in tests and
//! local development.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    error::AppResult,
    models::{
        Interaction, Movie, MovieUpdate, NewMovie, NewUser, Page, PageRequest, User,
        UserPreferences,
    },
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Durable movie records
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogStore: Send + Sync {
    /// Every movie, in insertion order
    async fn list_all(&self) -> AppResult<Vec<Movie>>;

    async fn get(&self, id: Uuid) -> AppResult<Option<Movie>>;

    async fn list_page(&self, request: PageRequest) -> AppResult<Page>;

    /// Word-based search over title and description
    async fn text_search(&self, query: &str) -> AppResult<Vec<Movie>>;

    /// Case-insensitive substring match over title and description
    async fn substring_search(&self, query: &str) -> AppResult<Vec<Movie>>;

    async fn insert(&self, movie: NewMovie) -> AppResult<Movie>;

    /// Returns `None` when the movie does not exist
    async fn update(&self, id: Uuid, update: MovieUpdate) -> AppResult<Option<Movie>>;

    /// Returns false when the movie does not exist
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}

/// Append-only log of user interactions
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait InteractionStore: Send + Sync {
    async fn record(&self, interaction: Interaction) -> AppResult<()>;

    /// Interactions created at or after `from`
    async fn since(&self, from: DateTime<Utc>) -> AppResult<Vec<Interaction>>;

    async fn for_movie(&self, movie_id: Uuid) -> AppResult<Vec<Interaction>>;

    async fn for_user(&self, user_id: Uuid) -> AppResult<Vec<Interaction>>;
}

/// Accounts and their preference snapshots
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` when the username is taken
    async fn create(&self, user: NewUser) -> AppResult<User>;

    async fn find_by_username(&self, username: &str) -> AppResult<Option<User>>;

    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<User>>;

    async fn preferences(&self, user_id: Uuid) -> AppResult<UserPreferences>;

    /// Adds genres and directors with set semantics
    async fn add_preferences(
        &self,
        user_id: Uuid,
        genres: Vec<String>,
        directors: Vec<String>,
    ) -> AppResult<()>;

    /// Records a view; a movie appears at most once
    async fn add_viewed(
        &self,
        user_id: Uuid,
        movie_id: Uuid,
        viewed_at: DateTime<Utc>,
    ) -> AppResult<()>;
}
