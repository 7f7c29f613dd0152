use serde::{Deserialize, Serialize};

use super::SongId;
use crate::error::{AppError, AppResult};

const MAX_PAGE_SIZE: u32 = 100;

/// A catalog song. Reference data, never mutated after loading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Song {
    pub sid: SongId,
    pub title: String,
    pub artist: String,
    /// One or more genre names
    pub genres: Vec<String>,
    /// Duration in seconds
    pub duration: f64,
    #[serde(default)]
    pub audio_path: Option<String>,
    #[serde(default)]
    pub audio_download_path: Option<String>,
}

impl Song {
    pub fn has_genre(&self, genre: &str) -> bool {
        self.genres.iter().any(|g| g.eq_ignore_ascii_case(genre))
    }
}

/// Catalog search parameters. Text filters are case-insensitive substring matches.
#[derive(Debug, Clone, Deserialize)]
pub struct SongSearch {
    /// Free text matched against title, artist and genre names
    #[serde(default)]
    pub q: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub artist: Option<String>,
    #[serde(default)]
    pub min_duration: Option<f64>,
    #[serde(default)]
    pub max_duration: Option<f64>,
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

fn default_page() -> u32 {
    1
}

fn default_page_size() -> u32 {
    20
}

impl Default for SongSearch {
    fn default() -> Self {
        Self {
            q: None,
            genre: None,
            artist: None,
            min_duration: None,
            max_duration: None,
            page: default_page(),
            page_size: default_page_size(),
        }
    }
}

impl SongSearch {
    pub fn validate(&self) -> AppResult<()> {
        if self.page == 0 {
            return Err(AppError::InvalidInput("Page numbers start at 1".to_string()));
        }
        if self.page_size == 0 || self.page_size > MAX_PAGE_SIZE {
            return Err(AppError::InvalidInput(format!(
                "Page size must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        if let (Some(min), Some(max)) = (self.min_duration, self.max_duration) {
            if min > max {
                return Err(AppError::InvalidInput(
                    "min_duration must not exceed max_duration".to_string(),
                ));
            }
        }
        Ok(())
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.page_size)
    }

    /// In-memory equivalent of the SQL filter
    pub fn matches(&self, song: &Song) -> bool {
        let contains = |haystack: &str, needle: &str| {
            haystack.to_lowercase().contains(&needle.to_lowercase())
        };

        if let Some(q) = &self.q {
            let hit = contains(&song.title, q)
                || contains(&song.artist, q)
                || song.genres.iter().any(|g| contains(g, q));
            if !hit {
                return false;
            }
        }
        if let Some(genre) = &self.genre {
            if !song.genres.iter().any(|g| contains(g, genre)) {
                return false;
            }
        }
        if let Some(artist) = &self.artist {
            if !contains(&song.artist, artist) {
                return false;
            }
        }
        if let Some(min) = self.min_duration {
            if song.duration < min {
                return false;
            }
        }
        if let Some(max) = self.max_duration {
            if song.duration > max {
                return false;
            }
        }
        true
    }
}
