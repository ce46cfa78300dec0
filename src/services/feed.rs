//! Ranking of candidate movies into capped feeds.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::{
    error::{AppError, AppResult},
    models::{Interaction, Movie, UserPreferences},
    services::scoring,
};

/// Interaction window fetched for the personalized feed
pub const PERSONALIZED_WINDOW_DAYS: i64 = 30;
/// Interaction window used by the trending feed
pub const TRENDING_WINDOW_DAYS: i64 = 7;
/// Interaction count at which the trending popularity term saturates
pub const TRENDING_SATURATION: f64 = 50.0;
pub const MAX_FEED_LIMIT: usize = 100;

/// A movie with the score it was ranked by
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ScoredMovie {
    pub movie: Movie,
    pub score: f64,
}

/// Checks a client supplied feed size
pub fn validate_limit(limit: usize) -> AppResult<usize> {
    if limit == 0 || limit > MAX_FEED_LIMIT {
        return Err(AppError::InvalidInput(format!(
            "Limit must be between 1 and {}",
            MAX_FEED_LIMIT
        )));
    }
    Ok(limit)
}

/// Ranks `movies` for one user with the relevance score
pub fn personalized(
    movies: Vec<Movie>,
    prefs: &UserPreferences,
    recent_interactions: &[Interaction],
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<ScoredMovie> {
    let scored = movies
        .into_iter()
        .map(|movie| {
            let score = scoring::score(&movie, prefs, recent_interactions, now);
            ScoredMovie { movie, score }
        })
        .collect();

    rank(scored, limit)
}

/// Ranks `movies` by rating and interaction volume in the trending window
pub fn trending(
    movies: Vec<Movie>,
    recent_interactions: &[Interaction],
    now: DateTime<Utc>,
    limit: usize,
) -> Vec<ScoredMovie> {
    let counts = counts_since(recent_interactions, now - Duration::days(TRENDING_WINDOW_DAYS), now);

    let scored = movies
        .into_iter()
        .map(|movie| {
            let count = counts.get(&movie.id).copied().unwrap_or(0);
            let score = trending_score(movie.rating, count);
            ScoredMovie { movie, score }
        })
        .collect();

    rank(scored, limit)
}

pub fn trending_score(rating: f64, recent_count: usize) -> f64 {
    0.5 * (rating / 10.0).clamp(0.0, 1.0)
        + 0.5 * scoring::popularity_score(recent_count, TRENDING_SATURATION)
}

fn counts_since(
    interactions: &[Interaction],
    from: DateTime<Utc>,
    until: DateTime<Utc>,
) -> HashMap<Uuid, usize> {
    let mut counts = HashMap::new();
    for interaction in interactions
        .iter()
        .filter(|i| i.created_at >= from && i.created_at <= until)
    {
        *counts.entry(interaction.movie_id).or_insert(0) += 1;
    }
    counts
}

/// Sorts descending by score and truncates.
///
/// `sort_by` is stable, so equal scores keep their input order.
fn rank(mut scored: Vec<ScoredMovie>, limit: usize) -> Vec<ScoredMovie> {
    scored.sort_by(|a, b| b.score.total_cmp(&a.score));
    scored.truncate(limit);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::scoring::tests::{fixed_now, interactions_on, movie};

    #[test]
    fn test_trending_score_example() {
        assert!((trending_score(8.0, 60) - 0.9).abs() < 1e-9);
        assert!((trending_score(8.0, 25) - 0.65).abs() < 1e-9);
    }

    #[test]
    fn test_personalized_sorted_and_truncated() {
        let now = fixed_now();
        let movies = vec![
            movie("Low", &["Horror"], "A", 2.0, 1970),
            movie("High", &["Drama"], "B", 9.0, 2023),
            movie("Mid", &["Drama", "Horror"], "C", 6.0, 2010),
        ];
        let mut prefs = UserPreferences::new();
        prefs.add_genres(["drama"]);

        let feed = personalized(movies, &prefs, &[], now, 2);

        assert_eq!(feed.len(), 2);
        assert_eq!(feed[0].movie.title, "High");
        assert_eq!(feed[1].movie.title, "Mid");
        assert!(feed[0].score >= feed[1].score);
    }

    #[test]
    fn test_personalized_ties_keep_input_order() {
        let now = fixed_now();
        let movies: Vec<Movie> = ["First", "Second", "Third", "Fourth"]
            .iter()
            .map(|title| movie(title, &["Drama"], "Same", 7.0, 2015))
            .collect();

        let feed = personalized(movies, &UserPreferences::new(), &[], now, 20);
        let titles: Vec<&str> = feed.iter().map(|s| s.movie.title.as_str()).collect();

        assert_eq!(titles, vec!["First", "Second", "Third", "Fourth"]);
    }

    #[test]
    fn test_personalized_uses_popularity() {
        let now = fixed_now();
        let quiet = movie("Quiet", &["Drama"], "A", 7.0, 2015);
        let busy = movie("Busy", &["Drama"], "A", 7.0, 2015);
        let interactions = interactions_on(&busy, 100, now - Duration::days(1));

        let feed = personalized(vec![quiet, busy], &UserPreferences::new(), &interactions, now, 20);
        assert_eq!(feed[0].movie.title, "Busy");
        assert!((feed[0].score - feed[1].score - 0.10).abs() < 1e-9);
    }

    #[test]
    fn test_trending_ranks_by_rating_and_activity() {
        let now = fixed_now();
        let classic = movie("Classic", &["Drama"], "A", 9.0, 1960);
        let buzz = movie("Buzz", &["Action"], "B", 6.0, 2024);
        let stale = movie("Stale", &["Action"], "C", 7.0, 2020);

        let mut interactions = interactions_on(&buzz, 60, now - Duration::days(3));
        // Outside the trending window
        interactions.extend(interactions_on(&stale, 60, now - Duration::days(10)));

        let feed = trending(vec![classic, buzz, stale], &interactions, now, 20);
        let titles: Vec<&str> = feed.iter().map(|s| s.movie.title.as_str()).collect();

        assert_eq!(titles, vec!["Buzz", "Classic", "Stale"]);
        assert!((feed[0].score - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_trending_ties_keep_input_order() {
        let now = fixed_now();
        let movies: Vec<Movie> = ["a", "b", "c"]
            .iter()
            .map(|title| movie(title, &[], "x", 5.0, 2000))
            .collect();

        let feed = trending(movies, &[], now, 2);
        let titles: Vec<&str> = feed.iter().map(|s| s.movie.title.as_str()).collect();
        assert_eq!(titles, vec!["a", "b"]);
    }

    #[test]
    fn test_validate_limit() {
        assert_eq!(validate_limit(20).unwrap(), 20);
        assert!(validate_limit(0).is_err());
        assert!(validate_limit(MAX_FEED_LIMIT + 1).is_err());
    }
}
