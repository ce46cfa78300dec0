use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Interaction, InteractionMetadata, InteractionType, UserPreferences},
    stores::{CatalogStore, InteractionStore, UserStore},
};

/// Body of an interaction tracking request
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackInteractionRequest {
    pub movie_id: Uuid,
    /// Parsed by hand so unknown kinds produce a validation error
    pub interaction_type: String,
    #[serde(default)]
    pub metadata: InteractionMetadata,
    #[serde(default)]
    pub weight: Option<f64>,
}

/// Records an interaction and folds it into the user's preferences.
///
/// A `like` adds the movie's genres and director to the preferred lists; a
/// `view` marks the movie as seen.
pub async fn track(
    catalog: &dyn CatalogStore,
    interactions: &dyn InteractionStore,
    users: &dyn UserStore,
    user_id: Uuid,
    request: TrackInteractionRequest,
    now: DateTime<Utc>,
) -> AppResult<Interaction> {
    let interaction_type: InteractionType = request.interaction_type.parse()?;
    if let Some(weight) = request.weight {
        if !weight.is_finite() || weight < 0.0 {
            return Err(AppError::InvalidInput(
                "Weight must be a non-negative number".to_string(),
            ));
        }
    }

    let movie = catalog
        .get(request.movie_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Movie {} not found", request.movie_id)))?;
    if users.find_by_id(user_id).await?.is_none() {
        return Err(AppError::NotFound(format!("User {} not found", user_id)));
    }

    let interaction = Interaction::new(
        user_id,
        movie.id,
        interaction_type,
        request.metadata,
        request.weight,
        now,
    );
    interactions.record(interaction.clone()).await?;

    match interaction_type {
        InteractionType::Like => {
            users
                .add_preferences(user_id, movie.genre.clone(), vec![movie.director.clone()])
                .await?;
        }
        InteractionType::View => {
            users.add_viewed(user_id, movie.id, now).await?;
        }
        InteractionType::Share | InteractionType::Search | InteractionType::Click => {}
    }

    tracing::info!(
        user_id = %user_id,
        movie_id = %movie.id,
        interaction_type = %interaction_type,
        "Interaction recorded"
    );

    Ok(interaction)
}

pub async fn for_user(interactions: &dyn InteractionStore, user_id: Uuid) -> AppResult<Vec<Interaction>> {
    interactions.for_user(user_id).await
}

pub async fn for_movie(
    catalog: &dyn CatalogStore,
    interactions: &dyn InteractionStore,
    movie_id: Uuid,
) -> AppResult<Vec<Interaction>> {
    if catalog.get(movie_id).await?.is_none() {
        return Err(AppError::NotFound(format!("Movie {} not found", movie_id)));
    }
    interactions.for_movie(movie_id).await
}

pub async fn preferences(users: &dyn UserStore, user_id: Uuid) -> AppResult<UserPreferences> {
    users.preferences(user_id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{NewMovie, NewUser, Role},
        stores::{MemoryStore, MockInteractionStore},
    };
    use chrono::NaiveDate;

    async fn setup() -> (MemoryStore, Uuid, Uuid) {
        let store = MemoryStore::new();
        let user = store
            .create(NewUser {
                username: "ellen".to_string(),
                email: "ellen@example.com".to_string(),
                password_hash: "hash".to_string(),
                role: Role::User,
            })
            .await
            .unwrap();
        let movie = store
            .insert(NewMovie {
                title: "Aliens".to_string(),
                description: "This time it's war".to_string(),
                release_date: NaiveDate::from_ymd_opt(1986, 7, 18).unwrap(),
                duration: 137,
                rating: 8.4,
                genre: vec!["Action".to_string(), "Sci-Fi".to_string()],
                director: "James Cameron".to_string(),
                cast: vec!["Sigourney Weaver".to_string()],
                poster_url: None,
                external_id: None,
            })
            .await
            .unwrap();
        (store, user.id, movie.id)
    }

    fn request(movie_id: Uuid, kind: &str) -> TrackInteractionRequest {
        TrackInteractionRequest {
            movie_id,
            interaction_type: kind.to_string(),
            metadata: InteractionMetadata::default(),
            weight: None,
        }
    }

    #[tokio::test]
    async fn test_like_updates_preferred_genres_and_director() {
        let (store, user_id, movie_id) = setup().await;

        track(&store, &store, &store, user_id, request(movie_id, "like"), Utc::now())
            .await
            .unwrap();

        let prefs = store.preferences(user_id).await.unwrap();
        assert_eq!(prefs.preferred_genres, vec!["Action", "Sci-Fi"]);
        assert_eq!(prefs.preferred_directors, vec!["James Cameron"]);
        assert!(prefs.viewed_movies.is_empty());
    }

    #[tokio::test]
    async fn test_view_marks_movie_seen() {
        let (store, user_id, movie_id) = setup().await;

        for _ in 0..3 {
            track(&store, &store, &store, user_id, request(movie_id, "view"), Utc::now())
                .await
                .unwrap();
        }

        let prefs = store.preferences(user_id).await.unwrap();
        assert_eq!(prefs.viewed_movies.len(), 1);
        assert_eq!(store.for_user(user_id).await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_invalid_type_rejected_before_store_access() {
        let (store, user_id, movie_id) = setup().await;
        let mut interactions = MockInteractionStore::new();
        interactions.expect_record().times(0);

        let err = track(&store, &interactions, &store, user_id, request(movie_id, "rate"), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_unknown_movie_not_found() {
        let (store, user_id, _) = setup().await;

        let err = track(&store, &store, &store, user_id, request(Uuid::new_v4(), "click"), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
        assert!(store.for_user(user_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_negative_weight_rejected() {
        let (store, user_id, movie_id) = setup().await;
        let mut req = request(movie_id, "share");
        req.weight = Some(-1.0);

        assert!(track(&store, &store, &store, user_id, req, Utc::now()).await.is_err());
    }
}
