use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Song, SongId, UserId};
use crate::error::{AppError, AppResult};

/// One user's relationship with one song. Unique per (uid, sid).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Interaction {
    pub uid: UserId,
    pub sid: SongId,
    /// Never decreases
    pub total_plays: i64,
    pub favourite: bool,
    /// 1 to 5 when present
    pub rating: Option<i16>,
    pub last_listened: Option<DateTime<Utc>>,
}

impl Interaction {
    pub fn new(uid: UserId, sid: SongId) -> Self {
        Self {
            uid,
            sid,
            total_plays: 0,
            favourite: false,
            rating: None,
            last_listened: None,
        }
    }

    /// Whether this row contributes to the user's taste (favourited or played)
    pub fn counts_toward_taste(&self) -> bool {
        self.favourite || self.total_plays > 0
    }
}

/// An interaction joined with the song it refers to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct HistoryEntry {
    #[sqlx(flatten)]
    pub interaction: Interaction,
    #[sqlx(flatten)]
    pub song: Song,
}

/// Explicit creation payload
#[derive(Debug, Clone, Deserialize)]
pub struct InteractionCreate {
    pub uid: UserId,
    pub sid: SongId,
    #[serde(default)]
    pub total_plays: Option<i64>,
    #[serde(default)]
    pub favourite: Option<bool>,
    #[serde(default)]
    pub rating: Option<i16>,
    #[serde(default)]
    pub last_listened: Option<DateTime<Utc>>,
}

impl InteractionCreate {
    pub fn validate(&self) -> AppResult<()> {
        if let Some(plays) = self.total_plays {
            validate_plays(plays)?;
        }
        if let Some(rating) = self.rating {
            validate_rating(rating)?;
        }
        Ok(())
    }

    pub fn into_interaction(self, now: DateTime<Utc>) -> Interaction {
        Interaction {
            uid: self.uid,
            sid: self.sid,
            total_plays: self.total_plays.unwrap_or(0),
            favourite: self.favourite.unwrap_or(false),
            rating: self.rating,
            last_listened: Some(self.last_listened.unwrap_or(now)),
        }
    }
}

/// Settable interaction fields. The favourite flag is only moved by toggling.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InteractionPatch {
    #[serde(default)]
    pub last_listened: Option<DateTime<Utc>>,
    #[serde(default)]
    pub total_plays: Option<i64>,
    #[serde(default)]
    pub rating: Option<i16>,
}

impl InteractionPatch {
    pub fn is_empty(&self) -> bool {
        self.last_listened.is_none() && self.total_plays.is_none() && self.rating.is_none()
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.is_empty() {
            return Err(AppError::InvalidInput("No fields to update".to_string()));
        }
        if let Some(plays) = self.total_plays {
            validate_plays(plays)?;
        }
        if let Some(rating) = self.rating {
            validate_rating(rating)?;
        }
        Ok(())
    }

    /// Checks the patch against the stored row: play counts only move forward
    pub fn check_against(&self, current: &Interaction) -> AppResult<()> {
        if let Some(plays) = self.total_plays {
            if plays < current.total_plays {
                return Err(AppError::InvalidInput(format!(
                    "total_plays cannot decrease (stored {}, requested {})",
                    current.total_plays, plays
                )));
            }
        }
        Ok(())
    }

    pub fn apply(&self, interaction: &mut Interaction) {
        if let Some(last_listened) = self.last_listened {
            interaction.last_listened = Some(last_listened);
        }
        if let Some(plays) = self.total_plays {
            interaction.total_plays = plays;
        }
        if let Some(rating) = self.rating {
            interaction.rating = Some(rating);
        }
    }
}

fn validate_plays(plays: i64) -> AppResult<()> {
    if plays < 0 {
        return Err(AppError::InvalidInput(
            "total_plays must not be negative".to_string(),
        ));
    }
    Ok(())
}

fn validate_rating(rating: i16) -> AppResult<()> {
    if !(1..=5).contains(&rating) {
        return Err(AppError::InvalidInput(format!(
            "Rating must be between 1 and 5, got {}",
            rating
        )));
    }
    Ok(())
}
