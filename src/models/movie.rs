use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// A movie in the catalog
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub release_date: NaiveDate,
    /// Running time in minutes
    pub duration: i32,
    /// Rating on a 0-10 scale
    pub rating: f64,
    pub genre: Vec<String>,
    pub director: String,
    #[sqlx(rename = "cast_members")]
    pub cast: Vec<String>,
    pub poster_url: Option<String>,
    pub external_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Payload for creating a movie
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct NewMovie {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub release_date: NaiveDate,
    pub duration: i32,
    pub rating: f64,
    #[serde(default)]
    pub genre: Vec<String>,
    pub director: String,
    #[serde(default)]
    pub cast: Vec<String>,
    #[serde(default)]
    pub poster_url: Option<String>,
    #[serde(default)]
    pub external_id: Option<String>,
}

impl NewMovie {
    /// Rejects payloads that would violate catalog invariants
    pub fn validate(&self) -> AppResult<()> {
        if self.title.trim().is_empty() {
            return Err(AppError::InvalidInput("Title cannot be empty".to_string()));
        }
        validate_rating(self.rating)?;
        validate_duration(self.duration)?;
        Ok(())
    }

    /// Materializes the payload into a catalog record
    pub fn into_movie(self, now: DateTime<Utc>) -> Movie {
        Movie {
            id: Uuid::new_v4(),
            title: self.title,
            description: self.description,
            release_date: self.release_date,
            duration: self.duration,
            rating: self.rating,
            genre: self.genre,
            director: self.director,
            cast: self.cast,
            poster_url: self.poster_url,
            external_id: self.external_id,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of a movie; absent fields are left untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MovieUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub release_date: Option<NaiveDate>,
    pub duration: Option<i32>,
    pub rating: Option<f64>,
    pub genre: Option<Vec<String>>,
    pub director: Option<String>,
    pub cast: Option<Vec<String>>,
    pub poster_url: Option<String>,
    pub external_id: Option<String>,
}

impl MovieUpdate {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(AppError::InvalidInput("Title cannot be empty".to_string()));
            }
        }
        if let Some(rating) = self.rating {
            validate_rating(rating)?;
        }
        if let Some(duration) = self.duration {
            validate_duration(duration)?;
        }
        Ok(())
    }

    /// Applies the update to an existing record
    pub fn apply(self, movie: &mut Movie, now: DateTime<Utc>) {
        if let Some(title) = self.title {
            movie.title = title;
        }
        if let Some(description) = self.description {
            movie.description = description;
        }
        if let Some(release_date) = self.release_date {
            movie.release_date = release_date;
        }
        if let Some(duration) = self.duration {
            movie.duration = duration;
        }
        if let Some(rating) = self.rating {
            movie.rating = rating;
        }
        if let Some(genre) = self.genre {
            movie.genre = genre;
        }
        if let Some(director) = self.director {
            movie.director = director;
        }
        if let Some(cast) = self.cast {
            movie.cast = cast;
        }
        if self.poster_url.is_some() {
            movie.poster_url = self.poster_url;
        }
        if self.external_id.is_some() {
            movie.external_id = self.external_id;
        }
        movie.updated_at = now;
    }
}

fn validate_rating(rating: f64) -> AppResult<()> {
    if !(0.0..=10.0).contains(&rating) {
        return Err(AppError::InvalidInput(format!(
            "Rating must be between 0 and 10, got {}",
            rating
        )));
    }
    Ok(())
}

fn validate_duration(duration: i32) -> AppResult<()> {
    if duration <= 0 {
        return Err(AppError::InvalidInput(
            "Duration must be a positive number of minutes".to_string(),
        ));
    }
    Ok(())
}

/// Field a catalog page can be sorted by
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Title,
    Rating,
    ReleaseDate,
    Duration,
}

impl SortField {
    /// Column name in the movies table
    pub fn column(&self) -> &'static str {
        match self {
            SortField::Title => "title",
            SortField::Rating => "rating",
            SortField::ReleaseDate => "release_date",
            SortField::Duration => "duration",
        }
    }
}

impl FromStr for SortField {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "title" => Ok(SortField::Title),
            "rating" => Ok(SortField::Rating),
            "releaseDate" => Ok(SortField::ReleaseDate),
            "duration" => Ok(SortField::Duration),
            other => Err(AppError::InvalidInput(format!(
                "Invalid sort field '{}': expected one of title, rating, releaseDate, duration",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl FromStr for SortOrder {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(AppError::InvalidInput(format!(
                "Invalid sort order '{}': expected asc or desc",
                other
            ))),
        }
    }
}

impl Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SortOrder::Asc => write!(f, "asc"),
            SortOrder::Desc => write!(f, "desc"),
        }
    }
}

/// A validated page request against the catalog
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number
    pub page: u32,
    pub limit: u32,
    pub sort: SortField,
    pub order: SortOrder,
}

impl PageRequest {
    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

/// One page of catalog results
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub movies: Vec<Movie>,
    pub page: u32,
    pub limit: u32,
    pub total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_movie() -> NewMovie {
        NewMovie {
            title: "Heat".to_string(),
            description: "A crew of thieves".to_string(),
            release_date: NaiveDate::from_ymd_opt(1995, 12, 15).unwrap(),
            duration: 170,
            rating: 8.3,
            genre: vec!["Crime".to_string(), "Thriller".to_string()],
            director: "Michael Mann".to_string(),
            cast: vec!["Al Pacino".to_string()],
            poster_url: None,
            external_id: Some("tt0113277".to_string()),
        }
    }

    #[test]
    fn test_validate_rejects_out_of_range_rating() {
        let mut movie = new_movie();
        movie.rating = 10.5;
        assert!(matches!(movie.validate(), Err(AppError::InvalidInput(_))));
    }

    #[test]
    fn test_validate_rejects_blank_title() {
        let mut movie = new_movie();
        movie.title = "   ".to_string();
        assert!(movie.validate().is_err());
    }

    #[test]
    fn test_update_only_touches_given_fields() {
        let created = Utc::now();
        let mut movie = new_movie().into_movie(created);
        let later = created + chrono::Duration::minutes(5);

        MovieUpdate {
            rating: Some(9.0),
            ..Default::default()
        }
        .apply(&mut movie, later);

        assert_eq!(movie.rating, 9.0);
        assert_eq!(movie.title, "Heat");
        assert_eq!(movie.updated_at, later);
        assert_eq!(movie.created_at, created);
    }

    #[test]
    fn test_sort_field_parse() {
        assert_eq!("releaseDate".parse::<SortField>().unwrap(), SortField::ReleaseDate);
        assert_eq!("rating".parse::<SortField>().unwrap(), SortField::Rating);
        assert!("budget".parse::<SortField>().is_err());
    }

    #[test]
    fn test_sort_order_parse_is_case_insensitive() {
        assert_eq!("DESC".parse::<SortOrder>().unwrap(), SortOrder::Desc);
        assert!("sideways".parse::<SortOrder>().is_err());
    }

    #[test]
    fn test_page_offset() {
        let request = PageRequest {
            page: 3,
            limit: 20,
            sort: SortField::Title,
            order: SortOrder::Asc,
        };
        assert_eq!(request.offset(), 40);
    }

    #[test]
    fn test_movie_serializes_camel_case() {
        let movie = new_movie().into_movie(Utc::now());
        let json = serde_json::to_value(&movie).unwrap();
        assert_eq!(json["releaseDate"], "1995-12-15");
        assert_eq!(json["cast"][0], "Al Pacino");
        assert_eq!(json["externalId"], "tt0113277");
    }
}
