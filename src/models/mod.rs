pub mod interaction;
pub mod movie;
pub mod user;
pub mod user_preferences;

pub use interaction::{Interaction, InteractionMetadata, InteractionType};
pub use movie::{Movie, MovieUpdate, NewMovie, Page, PageRequest, SortField, SortOrder};
pub use user::{NewUser, Role, User, UserProfile};
pub use user_preferences::{UserPreferences, ViewedMovie};
