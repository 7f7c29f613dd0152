use serde::{Deserialize, Serialize};

use super::{SongId, UserId};

/// Listening summary for one user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct UserStats {
    pub uid: UserId,
    pub username: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub country: Option<String>,
    pub total_plays: i64,
    pub favourite_count: i64,
    pub playlists_count: i64,
    /// Sum of plays times song duration, in seconds
    pub total_listen_seconds: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct SongPlays {
    pub sid: SongId,
    pub title: String,
    pub artist: String,
    pub plays: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct ArtistPlays {
    pub artist: String,
    pub plays: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct GenrePlays {
    pub genre: String,
    pub plays: i64,
}
