//! Relevance scoring of a movie against one user's taste.
//!
//! Every function here is pure: the caller passes the reference time, so
//! identical inputs always produce identical scores.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::models::{Interaction, Movie, UserPreferences};

/// Window used by the popularity signal
pub const POPULARITY_WINDOW_DAYS: i64 = 7;
/// Interaction count at which the popularity signal saturates
pub const POPULARITY_SATURATION: f64 = 100.0;

/// Sub-score used when the user has no history for a signal
const NEUTRAL_SCORE: f64 = 0.5;
const DIRECTOR_MISS_SCORE: f64 = 0.3;
const SEEN_SCORE: f64 = 0.1;
const UNSEEN_SCORE: f64 = 0.8;

#[derive(Debug, Clone, Copy)]
pub struct ScoringWeights {
    pub genre: f64,
    pub director: f64,
    pub rating: f64,
    pub popularity: f64,
    pub recency: f64,
    pub exposure: f64,
}

pub const DEFAULT_WEIGHTS: ScoringWeights = ScoringWeights {
    genre: 0.40,
    director: 0.20,
    rating: 0.15,
    popularity: 0.10,
    recency: 0.10,
    exposure: 0.05,
};

impl ScoringWeights {
    pub fn sum(&self) -> f64 {
        self.genre + self.director + self.rating + self.popularity + self.recency + self.exposure
    }
}

/// Individual signals behind a relevance score, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreBreakdown {
    pub genre_match: f64,
    pub director_match: f64,
    pub rating: f64,
    pub popularity: f64,
    pub recency: f64,
    pub exposure: f64,
}

impl ScoreBreakdown {
    /// Weighted sum, clamped to [0, 1]
    pub fn total(&self, weights: &ScoringWeights) -> f64 {
        let total = self.genre_match * weights.genre
            + self.director_match * weights.director
            + self.rating * weights.rating
            + self.popularity * weights.popularity
            + self.recency * weights.recency
            + self.exposure * weights.exposure;

        total.clamp(0.0, 1.0)
    }
}

/// Relevance of `movie` for a user, in [0, 1]
pub fn score(
    movie: &Movie,
    prefs: &UserPreferences,
    recent_interactions: &[Interaction],
    now: DateTime<Utc>,
) -> f64 {
    breakdown(movie, prefs, recent_interactions, now).total(&DEFAULT_WEIGHTS)
}

pub fn breakdown(
    movie: &Movie,
    prefs: &UserPreferences,
    recent_interactions: &[Interaction],
    now: DateTime<Utc>,
) -> ScoreBreakdown {
    ScoreBreakdown {
        genre_match: genre_match(movie, prefs),
        director_match: director_match(movie, prefs),
        rating: rating_score(movie),
        popularity: popularity_score(recent_count(movie, recent_interactions, now), POPULARITY_SATURATION),
        recency: recency_score(movie, now),
        exposure: exposure_score(movie, prefs),
    }
}

/// Fraction of the movie's genres the user prefers
pub fn genre_match(movie: &Movie, prefs: &UserPreferences) -> f64 {
    if prefs.preferred_genres.is_empty() {
        return NEUTRAL_SCORE;
    }
    if movie.genre.is_empty() {
        return 0.0;
    }

    let matching = movie
        .genre
        .iter()
        .filter(|genre| {
            prefs
                .preferred_genres
                .iter()
                .any(|preferred| preferred.eq_ignore_ascii_case(genre))
        })
        .count();

    matching as f64 / movie.genre.len() as f64
}

pub fn director_match(movie: &Movie, prefs: &UserPreferences) -> f64 {
    if prefs.preferred_directors.is_empty() {
        return NEUTRAL_SCORE;
    }

    let liked = prefs
        .preferred_directors
        .iter()
        .any(|director| director.eq_ignore_ascii_case(&movie.director));

    if liked {
        1.0
    } else {
        DIRECTOR_MISS_SCORE
    }
}

pub fn rating_score(movie: &Movie) -> f64 {
    (movie.rating / 10.0).clamp(0.0, 1.0)
}

/// Linear popularity, saturating at `saturation` interactions
pub fn popularity_score(count: usize, saturation: f64) -> f64 {
    (count as f64 / saturation).min(1.0)
}

/// Interactions on `movie` in the popularity window ending at `now`
pub fn recent_count(movie: &Movie, interactions: &[Interaction], now: DateTime<Utc>) -> usize {
    let window_start = now - Duration::days(POPULARITY_WINDOW_DAYS);
    interactions
        .iter()
        .filter(|i| i.movie_id == movie.id && i.created_at >= window_start && i.created_at <= now)
        .count()
}

/// Step function over whole calendar years since release.
/// Unreleased movies count as zero years old.
pub fn recency_score(movie: &Movie, now: DateTime<Utc>) -> f64 {
    let years = now
        .date_naive()
        .years_since(movie.release_date)
        .unwrap_or(0);

    match years {
        0..=5 => 1.0,
        6..=10 => 0.7,
        11..=20 => 0.5,
        _ => 0.3,
    }
}

/// Novelty bonus for movies the user has not watched yet
pub fn exposure_score(movie: &Movie, prefs: &UserPreferences) -> f64 {
    if prefs.has_viewed(movie.id) {
        SEEN_SCORE
    } else {
        UNSEEN_SCORE
    }
}
