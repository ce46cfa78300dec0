use chrono::{DateTime, Duration, Utc};
use uuid::Uuid;

use crate::{
    error::AppResult,
    services::feed::{self, ScoredMovie, PERSONALIZED_WINDOW_DAYS, TRENDING_WINDOW_DAYS},
    stores::{CatalogStore, InteractionStore, UserStore},
};

/// Generates a personalized feed for one user
///
/// Every catalog movie is a candidate. Candidates are scored against the
/// user's preference snapshot and the last 30 days of interactions from all
/// users, then the top `limit` are returned.
pub async fn personalized_feed(
    catalog: &dyn CatalogStore,
    interactions: &dyn InteractionStore,
    users: &dyn UserStore,
    user_id: Uuid,
    limit: usize,
    now: DateTime<Utc>,
) -> AppResult<Vec<ScoredMovie>> {
    let limit = feed::validate_limit(limit)?;

    let prefs = users.preferences(user_id).await?;
    let candidates = catalog.list_all().await?;
    let recent = interactions
        .since(now - Duration::days(PERSONALIZED_WINDOW_DAYS))
        .await?;

    tracing::debug!(
        user_id = %user_id,
        candidates = candidates.len(),
        interactions = recent.len(),
        "Scoring personalized feed"
    );

    Ok(feed::personalized(candidates, &prefs, &recent, now, limit))
}

/// Generates the trending feed shared by all users
pub async fn trending_feed(
    catalog: &dyn CatalogStore,
    interactions: &dyn InteractionStore,
    limit: usize,
    now: DateTime<Utc>,
) -> AppResult<Vec<ScoredMovie>> {
    let limit = feed::validate_limit(limit)?;

    let candidates = catalog.list_all().await?;
    let recent = interactions
        .since(now - Duration::days(TRENDING_WINDOW_DAYS))
        .await?;

    Ok(feed::trending(candidates, &recent, now, limit))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::AppError,
        models::{Interaction, InteractionType, NewMovie, NewUser, Role},
        stores::{MemoryStore, MockCatalogStore, MockInteractionStore},
    };
    use chrono::NaiveDate;

    fn new_movie(title: &str, genre: &str, director: &str, rating: f64) -> NewMovie {
        NewMovie {
            title: title.to_string(),
            description: String::new(),
            release_date: NaiveDate::from_ymd_opt(2015, 3, 1).unwrap(),
            duration: 110,
            rating,
            genre: vec![genre.to_string()],
            director: director.to_string(),
            cast: vec![],
            poster_url: None,
            external_id: None,
        }
    }

    #[tokio::test]
    async fn test_personalized_feed_prefers_liked_genre() {
        let store = MemoryStore::new();
        let user = store
            .create(NewUser {
                username: "sarah".to_string(),
                email: "sarah@example.com".to_string(),
                password_hash: "hash".to_string(),
                role: Role::User,
            })
            .await
            .unwrap();
        store.insert(new_movie("Comedy Hit", "Comedy", "A", 9.0)).await.unwrap();
        store.insert(new_movie("Action Pick", "Action", "B", 7.0)).await.unwrap();
        store
            .add_preferences(user.id, vec!["action".to_string()], vec![])
            .await
            .unwrap();

        let feed = personalized_feed(&store, &store, &store, user.id, 20, Utc::now())
            .await
            .unwrap();

        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].movie.title, "Action Pick");
    }

    #[tokio::test]
    async fn test_trending_feed_ignores_old_interactions() {
        let store = MemoryStore::new();
        let now = Utc::now();
        let old_buzz = store.insert(new_movie("Old Buzz", "Drama", "A", 6.0)).await.unwrap();
        store.insert(new_movie("Well Rated", "Drama", "B", 8.0)).await.unwrap();

        for _ in 0..50 {
            store
                .record(Interaction::new(
                    Uuid::new_v4(),
                    old_buzz.id,
                    InteractionType::Click,
                    Default::default(),
                    None,
                    now - Duration::days(8),
                ))
                .await
                .unwrap();
        }

        let feed = trending_feed(&store, &store, 20, now).await.unwrap();
        assert_eq!(feed[0].movie.title, "Well Rated");
        assert!((feed[0].score - 0.4).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_invalid_limit_rejected_before_store_access() {
        let mut catalog = MockCatalogStore::new();
        catalog.expect_list_all().times(0);
        let mut interactions = MockInteractionStore::new();
        interactions.expect_since().times(0);

        let err = trending_feed(&catalog, &interactions, 0, Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }
}
