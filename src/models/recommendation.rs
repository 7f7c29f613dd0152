use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{fmt::Display, str::FromStr};

use super::UserId;
use crate::error::AppError;

/// Kind of entity a recommendation points at
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TargetType {
    User,
    Song,
    Playlist,
}

impl TargetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TargetType::User => "user",
            TargetType::Song => "song",
            TargetType::Playlist => "playlist",
        }
    }
}

impl Display for TargetType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TargetType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(TargetType::User),
            "song" => Ok(TargetType::Song),
            "playlist" => Ok(TargetType::Playlist),
            other => Err(AppError::Internal(format!("Unknown target type: {}", other))),
        }
    }
}

/// Why a target was recommended
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ReasonTag {
    TasteSimilarity,
    TopGenre,
    TopArtist,
    DurationMatch,
    Fallback,
}

impl ReasonTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReasonTag::TasteSimilarity => "taste_similarity",
            ReasonTag::TopGenre => "top_genre",
            ReasonTag::TopArtist => "top_artist",
            ReasonTag::DurationMatch => "duration_match",
            ReasonTag::Fallback => "fallback",
        }
    }
}

impl Display for ReasonTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReasonTag {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "taste_similarity" => Ok(ReasonTag::TasteSimilarity),
            "top_genre" => Ok(ReasonTag::TopGenre),
            "top_artist" => Ok(ReasonTag::TopArtist),
            "duration_match" => Ok(ReasonTag::DurationMatch),
            "fallback" => Ok(ReasonTag::Fallback),
            other => Err(AppError::Internal(format!("Unknown reason tag: {}", other))),
        }
    }
}

/// A computed recommendation. A later computation for the same
/// (uid, target_type, target_id) overwrites score, reason and timestamp.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub uid: UserId,
    pub target_type: TargetType,
    pub target_id: String,
    pub score: f64,
    pub reason: ReasonTag,
    pub updated_at: DateTime<Utc>,
}

impl Recommendation {
    pub fn key(&self) -> (UserId, TargetType, String) {
        (self.uid, self.target_type, self.target_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tags_round_trip_through_text_columns() {
        for tag in [
            ReasonTag::TasteSimilarity,
            ReasonTag::TopGenre,
            ReasonTag::TopArtist,
            ReasonTag::DurationMatch,
            ReasonTag::Fallback,
        ] {
            assert_eq!(tag.as_str().parse::<ReasonTag>().unwrap(), tag);
            assert_eq!(
                serde_json::to_string(&tag).unwrap(),
                format!("\"{}\"", tag.as_str())
            );
        }

        assert_eq!("song".parse::<TargetType>().unwrap(), TargetType::Song);
        assert!("album".parse::<TargetType>().is_err());
    }
}
