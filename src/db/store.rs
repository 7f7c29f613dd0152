//! Storage interfaces the services are written against.
//!
//! Every lookup surfaces absence as `None` or an empty list; errors are
//! reserved for storage failures and rule violations (duplicates, missing
//! references on writes).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::{
    error::AppResult,
    models::{
        ArtistPlays, GenrePlays, HistoryEntry, Interaction, InteractionPatch, LikeOutcome, Match,
        NewUser, Playlist, PlaylistId, PlaylistPatch, Recommendation, Song, SongId, SongPlays,
        SongSearch, TargetType, User, UserCredentials, UserId, UserPatch, UserStats,
    },
};

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `Conflict` when the username is taken
    async fn create_user(&self, user: NewUser) -> AppResult<User>;

    async fn user(&self, uid: UserId) -> AppResult<Option<User>>;

    async fn user_by_username(&self, username: &str) -> AppResult<Option<UserCredentials>>;

    async fn list_users(&self) -> AppResult<Vec<User>>;

    /// Returns `None` for an unknown user
    async fn update_user(&self, uid: UserId, patch: &UserPatch) -> AppResult<Option<User>>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn song(&self, sid: &SongId) -> AppResult<Option<Song>>;

    /// Songs carrying this genre (exact name, case-insensitive)
    async fn songs_by_genre(&self, genre: &str) -> AppResult<Vec<Song>>;

    /// Songs by this artist (exact name, case-insensitive)
    async fn songs_by_artist(&self, artist: &str) -> AppResult<Vec<Song>>;

    /// Songs whose duration lies in `[min, max]`
    async fn songs_by_duration(&self, min: f64, max: f64) -> AppResult<Vec<Song>>;

    async fn search_songs(&self, search: &SongSearch) -> AppResult<Vec<Song>>;

    /// Up to `limit` songs in random order
    async fn sample_songs(&self, limit: usize) -> AppResult<Vec<Song>>;

    async fn song_count(&self) -> AppResult<i64>;

    /// Inserts songs that are not present yet, returning how many were added
    async fn seed_songs(&self, songs: &[Song]) -> AppResult<usize>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait InteractionStore: Send + Sync {
    async fn interaction(&self, uid: UserId, sid: &SongId) -> AppResult<Option<Interaction>>;

    async fn has_interaction(&self, uid: UserId, sid: &SongId) -> AppResult<bool>;

    async fn interactions_for_user(&self, uid: UserId) -> AppResult<Vec<Interaction>>;

    /// Interactions of a user joined with their songs
    async fn history(&self, uid: UserId) -> AppResult<Vec<HistoryEntry>>;

    /// Fails with `Conflict` if the pair already has a row. A favourite row
    /// joins the favourites playlist in the same transaction.
    async fn create_interaction(&self, interaction: Interaction) -> AppResult<Interaction>;

    async fn update_interaction(
        &self,
        uid: UserId,
        sid: &SongId,
        patch: &InteractionPatch,
    ) -> AppResult<Interaction>;

    /// Also drops the song from the favourites playlist
    async fn delete_interaction(&self, uid: UserId, sid: &SongId) -> AppResult<()>;

    /// Creates the row with one play or increments the count
    async fn record_play(
        &self,
        uid: UserId,
        sid: &SongId,
        at: DateTime<Utc>,
    ) -> AppResult<Interaction>;

    /// Flips the favourite flag and mirrors it into the favourites playlist,
    /// all or nothing. Failures inside surface as `TransactionFailed`.
    async fn toggle_favourite(&self, uid: UserId, sid: &SongId) -> AppResult<Interaction>;
}

#[async_trait]
pub trait PlaylistStore: Send + Sync {
    /// Fails with `NotFound` when the owner does not exist
    async fn create_playlist(&self, playlist: Playlist) -> AppResult<Playlist>;

    async fn playlist(&self, pid: PlaylistId) -> AppResult<Option<Playlist>>;

    async fn playlists_for_user(&self, uid: UserId) -> AppResult<Vec<Playlist>>;

    async fn favourites_playlist(&self, uid: UserId) -> AppResult<Option<Playlist>>;

    async fn update_playlist(
        &self,
        pid: PlaylistId,
        patch: &PlaylistPatch,
    ) -> AppResult<Option<Playlist>>;

    /// Removes the playlist and its memberships. Returns whether it existed.
    async fn delete_playlist(&self, pid: PlaylistId) -> AppResult<bool>;

    /// `NotFound` for a missing playlist or song, `Conflict` when already present
    async fn add_song(&self, pid: PlaylistId, sid: &SongId) -> AppResult<()>;

    /// `NotFound` when the song is not in the playlist
    async fn remove_song(&self, pid: PlaylistId, sid: &SongId) -> AppResult<()>;

    /// Members in insertion order; empty for an unknown playlist
    async fn playlist_songs(&self, pid: PlaylistId) -> AppResult<Vec<SongId>>;
}

#[async_trait]
pub trait MatchStore: Send + Sync {
    async fn get_match(&self, a: UserId, b: UserId) -> AppResult<Option<Match>>;

    /// Records `liker`'s like on the pair, creating the row with
    /// `similarity` if it does not exist. The transition is decided on the
    /// row as locked by this call.
    async fn upsert_like(
        &self,
        liker: UserId,
        liked: UserId,
        similarity: f64,
    ) -> AppResult<(Match, LikeOutcome)>;

    /// Every row involving `uid`, oldest first
    async fn matches_for(&self, uid: UserId) -> AppResult<Vec<Match>>;

    /// Users eligible as match candidates for `uid`, ordered by uid: everyone
    /// except `uid` and users sharing a row with `uid`, unless that row is a
    /// like from them that `uid` has not returned.
    async fn candidate_users(&self, uid: UserId) -> AppResult<Vec<User>>;
}

#[async_trait]
pub trait RecommendationStore: Send + Sync {
    async fn upsert_recommendations(&self, recommendations: &[Recommendation]) -> AppResult<()>;

    /// Highest score first
    async fn recommendations_for(
        &self,
        uid: UserId,
        target_type: Option<TargetType>,
    ) -> AppResult<Vec<Recommendation>>;
}

#[async_trait]
pub trait StatsStore: Send + Sync {
    async fn user_stats(&self, uid: UserId) -> AppResult<Option<UserStats>>;

    async fn top_songs(&self, limit: i64) -> AppResult<Vec<SongPlays>>;

    async fn top_artists(&self, limit: i64) -> AppResult<Vec<ArtistPlays>>;

    async fn top_genres(&self, limit: i64) -> AppResult<Vec<GenrePlays>>;
}

/// Everything the application needs from one backing store
pub trait Store:
    UserStore
    + CatalogStore
    + InteractionStore
    + PlaylistStore
    + MatchStore
    + RecommendationStore
    + StatsStore
    + 'static
{
}

impl<T> Store for T where
    T: UserStore
        + CatalogStore
        + InteractionStore
        + PlaylistStore
        + MatchStore
        + RecommendationStore
        + StatsStore
        + 'static
{
}
