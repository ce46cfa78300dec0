use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A movie the user has watched, with the time of the first view
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ViewedMovie {
    pub movie_id: Uuid,
    pub viewed_at: DateTime<Utc>,
}

/// Aggregated taste signal for one user
///
/// Genres and directors behave like sets compared case-insensitively; the
/// first spelling seen is kept. `viewed_movies` holds at most one entry per movie.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserPreferences {
    pub preferred_genres: Vec<String>,
    pub preferred_directors: Vec<String>,
    pub viewed_movies: Vec<ViewedMovie>,
}

impl UserPreferences {
    /// Creates an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds genres not already present
    pub fn add_genres<I, S>(&mut self, genres: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        merge_case_insensitive(&mut self.preferred_genres, genres);
    }

    /// Adds directors not already present
    pub fn add_directors<I, S>(&mut self, directors: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        merge_case_insensitive(&mut self.preferred_directors, directors);
    }

    /// Records a view; repeated views of the same movie keep the first timestamp
    pub fn add_viewed(&mut self, movie_id: Uuid, viewed_at: DateTime<Utc>) {
        if !self.has_viewed(movie_id) {
            self.viewed_movies.push(ViewedMovie {
                movie_id,
                viewed_at,
            });
        }
    }

    pub fn has_viewed(&self, movie_id: Uuid) -> bool {
        self.viewed_movies.iter().any(|v| v.movie_id == movie_id)
    }
}

/// Appends values to `target` skipping case-insensitive duplicates and blanks
pub fn merge_case_insensitive<I, S>(target: &mut Vec<String>, values: I)
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    for value in values {
        let value: String = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            continue;
        }
        if !target.iter().any(|v| v.eq_ignore_ascii_case(trimmed)) {
            target.push(trimmed.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_preferences() {
        let prefs = UserPreferences::new();
        assert!(prefs.preferred_genres.is_empty());
        assert!(prefs.preferred_directors.is_empty());
        assert!(prefs.viewed_movies.is_empty());
    }

    #[test]
    fn test_add_genres_suppresses_duplicates() {
        let mut prefs = UserPreferences::new();
        prefs.add_genres(["Action", "Drama"]);
        prefs.add_genres(["action", "Comedy", "DRAMA"]);
        assert_eq!(prefs.preferred_genres, vec!["Action", "Drama", "Comedy"]);
    }

    #[test]
    fn test_add_directors_skips_blank() {
        let mut prefs = UserPreferences::new();
        prefs.add_directors(["", "Denis Villeneuve", "denis villeneuve"]);
        assert_eq!(prefs.preferred_directors, vec!["Denis Villeneuve"]);
    }

    #[test]
    fn test_add_viewed_keeps_first_view() {
        let mut prefs = UserPreferences::new();
        let movie_id = Uuid::new_v4();
        let first = Utc::now();
        prefs.add_viewed(movie_id, first);
        prefs.add_viewed(movie_id, first + chrono::Duration::hours(1)); // Duplicate should be ignored
        assert_eq!(prefs.viewed_movies.len(), 1);
        assert_eq!(prefs.viewed_movies[0].viewed_at, first);
        assert!(prefs.has_viewed(movie_id));
    }
}
