pub mod auth;
pub mod batch_queue;
pub mod catalog;
pub mod feed;
pub mod interactions;
pub mod recommendations;
pub mod scoring;

pub use auth::AuthService;
pub use batch_queue::{BatchQueue, Inserter, QueueConfig, QueueStatus};
pub use catalog::CatalogInserter;
pub use feed::ScoredMovie;
