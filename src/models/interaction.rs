use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};
use uuid::Uuid;

use crate::error::AppError;

/// Kind of user action recorded against a movie
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum InteractionType {
    View,
    Like,
    Share,
    Search,
    Click,
}

impl InteractionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionType::View => "view",
            InteractionType::Like => "like",
            InteractionType::Share => "share",
            InteractionType::Search => "search",
            InteractionType::Click => "click",
        }
    }
}

impl Display for InteractionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for InteractionType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "view" => Ok(InteractionType::View),
            "like" => Ok(InteractionType::Like),
            "share" => Ok(InteractionType::Share),
            "search" => Ok(InteractionType::Search),
            "click" => Ok(InteractionType::Click),
            other => Err(AppError::InvalidInput(format!(
                "Invalid interaction type '{}': expected one of view, like, share, search, click",
                other
            ))),
        }
    }
}

/// Free-form client context attached to an interaction
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct InteractionMetadata {
    /// Seconds watched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watch_time: Option<f64>,
    /// Fraction of the page scrolled, 0-1
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scroll_depth: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_type: Option<String>,
    /// Client-side timestamp, if the client sent one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// A recorded user action; never mutated after creation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Interaction {
    pub id: Uuid,
    pub user_id: Uuid,
    pub movie_id: Uuid,
    pub interaction_type: InteractionType,
    pub metadata: InteractionMetadata,
    pub weight: f64,
    pub created_at: DateTime<Utc>,
}

pub const DEFAULT_INTERACTION_WEIGHT: f64 = 1.0;

impl Interaction {
    pub fn new(
        user_id: Uuid,
        movie_id: Uuid,
        interaction_type: InteractionType,
        metadata: InteractionMetadata,
        weight: Option<f64>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            movie_id,
            interaction_type,
            metadata,
            weight: weight.unwrap_or(DEFAULT_INTERACTION_WEIGHT),
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interaction_type_parse() {
        assert_eq!("like".parse::<InteractionType>().unwrap(), InteractionType::Like);
        assert_eq!("click".parse::<InteractionType>().unwrap(), InteractionType::Click);
    }

    #[test]
    fn test_interaction_type_rejects_unknown() {
        let err = "bookmark".parse::<InteractionType>().unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn test_weight_defaults_to_one() {
        let interaction = Interaction::new(
            Uuid::new_v4(),
            Uuid::new_v4(),
            InteractionType::View,
            InteractionMetadata::default(),
            None,
            Utc::now(),
        );
        assert_eq!(interaction.weight, 1.0);
    }

    #[test]
    fn test_metadata_deserializes_partial_payload() {
        let metadata: InteractionMetadata =
            serde_json::from_str(r#"{"watchTime": 42.5, "deviceType": "tv"}"#).unwrap();
        assert_eq!(metadata.watch_time, Some(42.5));
        assert_eq!(metadata.device_type.as_deref(), Some("tv"));
        assert_eq!(metadata.scroll_depth, None);
    }
}
