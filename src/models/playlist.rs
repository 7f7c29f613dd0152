use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{PlaylistId, SongId, UserId};
use crate::error::{AppError, AppResult};

/// Name given to the implicit playlist mirroring a user's favourites
pub const FAVOURITES_PLAYLIST_NAME: &str = "Favourites";

const MAX_NAME_LEN: usize = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Playlist {
    pub pid: PlaylistId,
    /// Owner
    pub uid: UserId,
    pub name: String,
    pub description: String,
    pub private: bool,
    pub shared_with: Option<String>,
    /// Set on the one playlist per user that mirrors favourite interactions
    pub is_favourites: bool,
    pub created_at: DateTime<Utc>,
}

impl Playlist {
    pub fn favourites_for(uid: UserId, now: DateTime<Utc>) -> Self {
        Self {
            pid: PlaylistId::new(),
            uid,
            name: FAVOURITES_PLAYLIST_NAME.to_string(),
            description: "Songs you marked as favourite".to_string(),
            private: true,
            shared_with: None,
            is_favourites: true,
            created_at: now,
        }
    }

    /// Rejects edits of membership that must go through favourite toggling
    pub fn ensure_user_managed(&self) -> AppResult<()> {
        if self.is_favourites {
            return Err(AppError::InvalidInput(
                "The favourites playlist is managed through toggle-favourite".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlaylistCreate {
    pub uid: UserId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub private: bool,
    #[serde(default)]
    pub shared_with: Option<String>,
}

impl PlaylistCreate {
    pub fn validate(&self) -> AppResult<()> {
        validate_name(&self.name)
    }

    pub fn into_playlist(self, now: DateTime<Utc>) -> Playlist {
        Playlist {
            pid: PlaylistId::new(),
            uid: self.uid,
            name: self.name.trim().to_string(),
            description: self.description,
            private: self.private,
            shared_with: self.shared_with,
            is_favourites: false,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlaylistPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub private: Option<bool>,
    #[serde(default)]
    pub shared_with: Option<String>,
}

impl PlaylistPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.private.is_none()
            && self.shared_with.is_none()
    }

    pub fn validate(&self) -> AppResult<()> {
        if self.is_empty() {
            return Err(AppError::InvalidInput("No fields to update".to_string()));
        }
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        Ok(())
    }

    pub fn apply(&self, playlist: &mut Playlist) {
        if let Some(name) = &self.name {
            playlist.name = name.trim().to_string();
        }
        if let Some(description) = &self.description {
            playlist.description = description.clone();
        }
        if let Some(private) = self.private {
            playlist.private = private;
        }
        if let Some(shared_with) = &self.shared_with {
            playlist.shared_with = Some(shared_with.clone());
        }
    }
}

/// Membership of a song in a playlist
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlaylistSong {
    pub pid: PlaylistId,
    pub sid: SongId,
}

fn validate_name(name: &str) -> AppResult<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::InvalidInput(
            "Playlist name must not be empty".to_string(),
        ));
    }
    if trimmed.chars().count() > MAX_NAME_LEN {
        return Err(AppError::InvalidInput(format!(
            "Playlist name must be at most {} characters",
            MAX_NAME_LEN
        )));
    }
    Ok(())
}
