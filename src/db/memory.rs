//! Process-local store used for development and tests.
//!
//! Each operation holds the write lock for its whole duration, which gives
//! the same all-or-nothing behavior the Postgres store gets from transactions.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rand::seq::SliceRandom;
use tokio::sync::RwLock;

use super::store::{
    CatalogStore, InteractionStore, MatchStore, PlaylistStore, RecommendationStore, StatsStore,
    UserStore,
};
use crate::{
    error::{AppError, AppResult},
    models::{
        ArtistPlays, GenrePlays, HistoryEntry, Interaction, InteractionPatch, LikeOutcome, Match,
        NewUser, Playlist, PlaylistId, PlaylistPatch, Recommendation, Song, SongId, SongPlays,
        SongSearch, TargetType, User, UserCredentials, UserId, UserPatch, UserStats,
    },
};

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryStoreInner>>,
}

#[derive(Default)]
struct MemoryStoreInner {
    users: BTreeMap<UserId, UserCredentials>,
    songs: BTreeMap<SongId, Song>,
    interactions: BTreeMap<(UserId, SongId), Interaction>,
    playlists: BTreeMap<PlaylistId, Playlist>,
    /// Members in insertion order
    playlist_songs: HashMap<PlaylistId, Vec<SongId>>,
    matches: BTreeMap<(UserId, UserId), Match>,
    recommendations: HashMap<(UserId, TargetType, String), Recommendation>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MemoryStoreInner {
    fn require_user(&self, uid: UserId) -> AppResult<()> {
        if self.users.contains_key(&uid) {
            Ok(())
        } else {
            Err(AppError::not_found("User", uid))
        }
    }

    fn require_song(&self, sid: &SongId) -> AppResult<()> {
        if self.songs.contains_key(sid) {
            Ok(())
        } else {
            Err(AppError::not_found("Song", sid))
        }
    }

    fn favourites_pid(&self, uid: UserId) -> Option<PlaylistId> {
        self.playlists
            .values()
            .find(|p| p.uid == uid && p.is_favourites)
            .map(|p| p.pid)
    }

    /// Mirrors a favourite flag into the user's favourites playlist,
    /// creating the playlist the first time a song is added
    fn sync_favourite(&mut self, uid: UserId, sid: &SongId, favourite: bool) {
        let pid = match self.favourites_pid(uid) {
            Some(pid) => pid,
            None if favourite => {
                let playlist = Playlist::favourites_for(uid, Utc::now());
                let pid = playlist.pid;
                self.playlists.insert(pid, playlist);
                pid
            }
            None => return,
        };

        let members = self.playlist_songs.entry(pid).or_default();
        let present = members.contains(sid);
        if favourite && !present {
            members.push(sid.clone());
        } else if !favourite && present {
            members.retain(|s| s != sid);
        }
    }

    fn user_interactions(&self, uid: UserId) -> impl Iterator<Item = &Interaction> {
        self.interactions.values().filter(move |i| i.uid == uid)
    }

    fn plays_by<K, F>(&self, key: F) -> HashMap<K, i64>
    where
        K: std::hash::Hash + Eq,
        F: Fn(&Song) -> Vec<K>,
    {
        let mut plays = HashMap::new();
        for interaction in self.interactions.values() {
            if let Some(song) = self.songs.get(&interaction.sid) {
                for k in key(song) {
                    *plays.entry(k).or_insert(0) += interaction.total_plays;
                }
            }
        }
        plays
    }
}

/// Highest plays first, then key ascending; zero-play entries dropped
fn ranked<K: Ord>(plays: HashMap<K, i64>, limit: i64) -> Vec<(K, i64)> {
    let mut ranked: Vec<(K, i64)> = plays.into_iter().filter(|(_, p)| *p > 0).collect();
    ranked.sort_by(|(a_key, a), (b_key, b)| b.cmp(a).then(a_key.cmp(b_key)));
    ranked.truncate(usize::try_from(limit).unwrap_or(0));
    ranked
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, user: NewUser) -> AppResult<User> {
        let mut inner = self.inner.write().await;
        if inner
            .users
            .values()
            .any(|c| c.user.username == user.username)
        {
            return Err(AppError::Conflict(format!(
                "Username {} is already taken",
                user.username
            )));
        }

        let created = User {
            uid: UserId::new(),
            username: user.username,
            name: user.name,
            email: user.email,
            age: user.age,
            country: user.country,
            created_at: Utc::now(),
        };
        inner.users.insert(
            created.uid,
            UserCredentials {
                user: created.clone(),
                password_hash: user.password_hash,
            },
        );
        Ok(created)
    }

    async fn user(&self, uid: UserId) -> AppResult<Option<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.get(&uid).map(|c| c.user.clone()))
    }

    async fn user_by_username(&self, username: &str) -> AppResult<Option<UserCredentials>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .find(|c| c.user.username == username)
            .cloned())
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let inner = self.inner.read().await;
        Ok(inner.users.values().map(|c| c.user.clone()).collect())
    }

    async fn update_user(&self, uid: UserId, patch: &UserPatch) -> AppResult<Option<User>> {
        let mut inner = self.inner.write().await;
        if let Some(username) = &patch.username {
            if inner
                .users
                .values()
                .any(|c| c.user.uid != uid && &c.user.username == username)
            {
                return Err(AppError::Conflict(format!(
                    "Username {} is already taken",
                    username
                )));
            }
        }

        Ok(inner.users.get_mut(&uid).map(|c| {
            patch.apply(&mut c.user);
            c.user.clone()
        }))
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn song(&self, sid: &SongId) -> AppResult<Option<Song>> {
        let inner = self.inner.read().await;
        Ok(inner.songs.get(sid).cloned())
    }

    async fn songs_by_genre(&self, genre: &str) -> AppResult<Vec<Song>> {
        let inner = self.inner.read().await;
        Ok(inner
            .songs
            .values()
            .filter(|s| s.has_genre(genre))
            .cloned()
            .collect())
    }

    async fn songs_by_artist(&self, artist: &str) -> AppResult<Vec<Song>> {
        let inner = self.inner.read().await;
        Ok(inner
            .songs
            .values()
            .filter(|s| s.artist.eq_ignore_ascii_case(artist))
            .cloned()
            .collect())
    }

    async fn songs_by_duration(&self, min: f64, max: f64) -> AppResult<Vec<Song>> {
        let inner = self.inner.read().await;
        Ok(inner
            .songs
            .values()
            .filter(|s| s.duration >= min && s.duration <= max)
            .cloned()
            .collect())
    }

    async fn search_songs(&self, search: &SongSearch) -> AppResult<Vec<Song>> {
        let inner = self.inner.read().await;
        let offset = usize::try_from(search.offset()).unwrap_or(usize::MAX);
        Ok(inner
            .songs
            .values()
            .filter(|s| search.matches(s))
            .skip(offset)
            .take(search.page_size as usize)
            .cloned()
            .collect())
    }

    async fn sample_songs(&self, limit: usize) -> AppResult<Vec<Song>> {
        let inner = self.inner.read().await;
        let mut songs: Vec<Song> = inner.songs.values().cloned().collect();
        songs.shuffle(&mut rand::rng());
        songs.truncate(limit);
        Ok(songs)
    }

    async fn song_count(&self) -> AppResult<i64> {
        let inner = self.inner.read().await;
        Ok(inner.songs.len() as i64)
    }

    async fn seed_songs(&self, songs: &[Song]) -> AppResult<usize> {
        let mut inner = self.inner.write().await;
        let mut added = 0;
        for song in songs {
            if !inner.songs.contains_key(&song.sid) {
                inner.songs.insert(song.sid.clone(), song.clone());
                added += 1;
            }
        }
        Ok(added)
    }
}

#[async_trait]
impl InteractionStore for MemoryStore {
    async fn interaction(&self, uid: UserId, sid: &SongId) -> AppResult<Option<Interaction>> {
        let inner = self.inner.read().await;
        Ok(inner.interactions.get(&(uid, sid.clone())).cloned())
    }

    async fn has_interaction(&self, uid: UserId, sid: &SongId) -> AppResult<bool> {
        let inner = self.inner.read().await;
        Ok(inner.interactions.contains_key(&(uid, sid.clone())))
    }

    async fn interactions_for_user(&self, uid: UserId) -> AppResult<Vec<Interaction>> {
        let inner = self.inner.read().await;
        Ok(inner.user_interactions(uid).cloned().collect())
    }

    async fn history(&self, uid: UserId) -> AppResult<Vec<HistoryEntry>> {
        let inner = self.inner.read().await;
        Ok(inner
            .user_interactions(uid)
            .filter_map(|interaction| {
                inner.songs.get(&interaction.sid).map(|song| HistoryEntry {
                    interaction: interaction.clone(),
                    song: song.clone(),
                })
            })
            .collect())
    }

    async fn create_interaction(&self, interaction: Interaction) -> AppResult<Interaction> {
        let mut inner = self.inner.write().await;
        inner.require_user(interaction.uid)?;
        inner.require_song(&interaction.sid)?;

        let key = (interaction.uid, interaction.sid.clone());
        if inner.interactions.contains_key(&key) {
            return Err(AppError::Conflict(format!(
                "Interaction of user {} with song {} already exists",
                interaction.uid, interaction.sid
            )));
        }

        if interaction.favourite {
            inner.sync_favourite(interaction.uid, &interaction.sid, true);
        }
        inner.interactions.insert(key, interaction.clone());
        Ok(interaction)
    }

    async fn update_interaction(
        &self,
        uid: UserId,
        sid: &SongId,
        patch: &InteractionPatch,
    ) -> AppResult<Interaction> {
        let mut inner = self.inner.write().await;
        let interaction = inner
            .interactions
            .get_mut(&(uid, sid.clone()))
            .ok_or_else(|| {
                AppError::NotFound(format!("No interaction of user {} with song {}", uid, sid))
            })?;

        patch.check_against(interaction)?;
        patch.apply(interaction);
        Ok(interaction.clone())
    }

    async fn delete_interaction(&self, uid: UserId, sid: &SongId) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if inner.interactions.remove(&(uid, sid.clone())).is_none() {
            return Err(AppError::NotFound(format!(
                "No interaction of user {} with song {}",
                uid, sid
            )));
        }
        inner.sync_favourite(uid, sid, false);
        Ok(())
    }

    async fn record_play(
        &self,
        uid: UserId,
        sid: &SongId,
        at: DateTime<Utc>,
    ) -> AppResult<Interaction> {
        let mut inner = self.inner.write().await;
        inner.require_user(uid)?;
        inner.require_song(sid)?;

        let interaction = inner
            .interactions
            .entry((uid, sid.clone()))
            .or_insert_with(|| Interaction::new(uid, sid.clone()));
        interaction.total_plays += 1;
        interaction.last_listened = Some(at);
        Ok(interaction.clone())
    }

    async fn toggle_favourite(&self, uid: UserId, sid: &SongId) -> AppResult<Interaction> {
        let mut inner = self.inner.write().await;
        inner.require_user(uid)?;
        inner.require_song(sid)?;

        let interaction = inner
            .interactions
            .entry((uid, sid.clone()))
            .or_insert_with(|| Interaction {
                last_listened: Some(Utc::now()),
                ..Interaction::new(uid, sid.clone())
            });
        interaction.favourite = !interaction.favourite;
        let toggled = interaction.clone();

        inner.sync_favourite(uid, sid, toggled.favourite);
        Ok(toggled)
    }
}

#[async_trait]
impl PlaylistStore for MemoryStore {
    async fn create_playlist(&self, playlist: Playlist) -> AppResult<Playlist> {
        let mut inner = self.inner.write().await;
        inner.require_user(playlist.uid)?;
        inner.playlists.insert(playlist.pid, playlist.clone());
        Ok(playlist)
    }

    async fn playlist(&self, pid: PlaylistId) -> AppResult<Option<Playlist>> {
        let inner = self.inner.read().await;
        Ok(inner.playlists.get(&pid).cloned())
    }

    async fn playlists_for_user(&self, uid: UserId) -> AppResult<Vec<Playlist>> {
        let inner = self.inner.read().await;
        let mut playlists: Vec<Playlist> = inner
            .playlists
            .values()
            .filter(|p| p.uid == uid)
            .cloned()
            .collect();
        playlists.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.pid.cmp(&b.pid)));
        Ok(playlists)
    }

    async fn favourites_playlist(&self, uid: UserId) -> AppResult<Option<Playlist>> {
        let inner = self.inner.read().await;
        Ok(inner
            .favourites_pid(uid)
            .and_then(|pid| inner.playlists.get(&pid).cloned()))
    }

    async fn update_playlist(
        &self,
        pid: PlaylistId,
        patch: &PlaylistPatch,
    ) -> AppResult<Option<Playlist>> {
        let mut inner = self.inner.write().await;
        Ok(inner.playlists.get_mut(&pid).map(|p| {
            patch.apply(p);
            p.clone()
        }))
    }

    async fn delete_playlist(&self, pid: PlaylistId) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        inner.playlist_songs.remove(&pid);
        Ok(inner.playlists.remove(&pid).is_some())
    }

    async fn add_song(&self, pid: PlaylistId, sid: &SongId) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        if !inner.playlists.contains_key(&pid) {
            return Err(AppError::not_found("Playlist", pid));
        }
        inner.require_song(sid)?;

        let members = inner.playlist_songs.entry(pid).or_default();
        if members.contains(sid) {
            return Err(AppError::Conflict(format!(
                "Song {} is already in playlist {}",
                sid, pid
            )));
        }
        members.push(sid.clone());
        Ok(())
    }

    async fn remove_song(&self, pid: PlaylistId, sid: &SongId) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        let not_member = || AppError::NotFound(format!("Song {} is not in playlist {}", sid, pid));
        let members = inner.playlist_songs.get_mut(&pid).ok_or_else(not_member)?;
        let index = members
            .iter()
            .position(|s| s == sid)
            .ok_or_else(not_member)?;
        members.remove(index);
        Ok(())
    }

    async fn playlist_songs(&self, pid: PlaylistId) -> AppResult<Vec<SongId>> {
        let inner = self.inner.read().await;
        Ok(inner.playlist_songs.get(&pid).cloned().unwrap_or_default())
    }
}

#[async_trait]
impl MatchStore for MemoryStore {
    async fn get_match(&self, a: UserId, b: UserId) -> AppResult<Option<Match>> {
        let inner = self.inner.read().await;
        Ok(inner.matches.get(&Match::canonical_pair(a, b)).cloned())
    }

    async fn upsert_like(
        &self,
        liker: UserId,
        liked: UserId,
        similarity: f64,
    ) -> AppResult<(Match, LikeOutcome)> {
        let mut inner = self.inner.write().await;
        let now = Utc::now();
        let record = inner
            .matches
            .entry(Match::canonical_pair(liker, liked))
            .or_insert_with(|| Match::new(liker, liked, similarity, now));
        let outcome = record.apply_like(liker, now);
        Ok((record.clone(), outcome))
    }

    async fn matches_for(&self, uid: UserId) -> AppResult<Vec<Match>> {
        let inner = self.inner.read().await;
        let mut rows: Vec<Match> = inner
            .matches
            .values()
            .filter(|m| m.involves(uid))
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(rows)
    }

    async fn candidate_users(&self, uid: UserId) -> AppResult<Vec<User>> {
        let inner = self.inner.read().await;
        Ok(inner
            .users
            .values()
            .filter(|c| c.user.uid != uid)
            .filter(|c| {
                match inner.matches.get(&Match::canonical_pair(uid, c.user.uid)) {
                    None => true,
                    Some(row) => !row.liked_by(uid) && row.liked_by(c.user.uid),
                }
            })
            .map(|c| c.user.clone())
            .collect())
    }
}

#[async_trait]
impl RecommendationStore for MemoryStore {
    async fn upsert_recommendations(&self, recommendations: &[Recommendation]) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        for recommendation in recommendations {
            inner
                .recommendations
                .insert(recommendation.key(), recommendation.clone());
        }
        Ok(())
    }

    async fn recommendations_for(
        &self,
        uid: UserId,
        target_type: Option<TargetType>,
    ) -> AppResult<Vec<Recommendation>> {
        let inner = self.inner.read().await;
        let mut recommendations: Vec<Recommendation> = inner
            .recommendations
            .values()
            .filter(|r| r.uid == uid && target_type.map_or(true, |t| r.target_type == t))
            .cloned()
            .collect();
        recommendations.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then(a.target_id.cmp(&b.target_id))
        });
        Ok(recommendations)
    }
}

#[async_trait]
impl StatsStore for MemoryStore {
    async fn user_stats(&self, uid: UserId) -> AppResult<Option<UserStats>> {
        let inner = self.inner.read().await;
        let Some(credentials) = inner.users.get(&uid) else {
            return Ok(None);
        };
        let user = &credentials.user;

        let mut stats = UserStats {
            uid,
            username: user.username.clone(),
            name: user.name.clone(),
            email: user.email.clone(),
            country: user.country.clone(),
            total_plays: 0,
            favourite_count: 0,
            playlists_count: inner.playlists.values().filter(|p| p.uid == uid).count() as i64,
            total_listen_seconds: 0.0,
        };
        for interaction in inner.user_interactions(uid) {
            stats.total_plays += interaction.total_plays;
            stats.favourite_count += i64::from(interaction.favourite);
            if let Some(song) = inner.songs.get(&interaction.sid) {
                stats.total_listen_seconds += interaction.total_plays as f64 * song.duration;
            }
        }
        Ok(Some(stats))
    }

    async fn top_songs(&self, limit: i64) -> AppResult<Vec<SongPlays>> {
        let inner = self.inner.read().await;
        let plays = inner.plays_by(|song| vec![song.sid.clone()]);
        Ok(ranked(plays, limit)
            .into_iter()
            .filter_map(|(sid, plays)| {
                inner.songs.get(&sid).map(|song| SongPlays {
                    sid,
                    title: song.title.clone(),
                    artist: song.artist.clone(),
                    plays,
                })
            })
            .collect())
    }

    async fn top_artists(&self, limit: i64) -> AppResult<Vec<ArtistPlays>> {
        let inner = self.inner.read().await;
        let plays = inner.plays_by(|song| vec![song.artist.clone()]);
        Ok(ranked(plays, limit)
            .into_iter()
            .map(|(artist, plays)| ArtistPlays { artist, plays })
            .collect())
    }

    async fn top_genres(&self, limit: i64) -> AppResult<Vec<GenrePlays>> {
        let inner = self.inner.read().await;
        let plays = inner.plays_by(|song| song.genres.clone());
        Ok(ranked(plays, limit)
            .into_iter()
            .map(|(genre, plays)| GenrePlays { genre, plays })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn song(sid: &str, artist: &str, genres: &[&str], duration: f64) -> Song {
        Song {
            sid: SongId::from(sid),
            title: format!("Track {}", sid),
            artist: artist.to_string(),
            genres: genres.iter().map(|g| g.to_string()).collect(),
            duration,
            audio_path: None,
            audio_download_path: None,
        }
    }

    async fn user(store: &MemoryStore, username: &str) -> User {
        store
            .create_user(NewUser {
                username: username.to_string(),
                password_hash: "hash".to_string(),
                name: None,
                email: None,
                age: None,
                country: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_duplicate_username_conflicts() {
        let store = MemoryStore::new();
        user(&store, "ana").await;

        let result = store
            .create_user(NewUser {
                username: "ana".to_string(),
                password_hash: "other".to_string(),
                name: None,
                email: None,
                age: None,
                country: None,
            })
            .await;
        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_toggle_favourite_mirrors_playlist() {
        let store = MemoryStore::new();
        let ana = user(&store, "ana").await;
        store
            .seed_songs(&[song("1", "Coltrane", &["Jazz"], 300.0)])
            .await
            .unwrap();
        let sid = SongId::from("1");

        let toggled = store.toggle_favourite(ana.uid, &sid).await.unwrap();
        assert!(toggled.favourite);
        let favourites = store.favourites_playlist(ana.uid).await.unwrap().unwrap();
        assert_eq!(
            store.playlist_songs(favourites.pid).await.unwrap(),
            vec![sid.clone()]
        );

        let toggled = store.toggle_favourite(ana.uid, &sid).await.unwrap();
        assert!(!toggled.favourite);
        assert!(store
            .playlist_songs(favourites.pid)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_toggle_favourite_unknown_song() {
        let store = MemoryStore::new();
        let ana = user(&store, "ana").await;

        let result = store.toggle_favourite(ana.uid, &SongId::from("404")).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(store.favourites_playlist(ana.uid).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_record_play_creates_then_increments() {
        let store = MemoryStore::new();
        let ana = user(&store, "ana").await;
        store
            .seed_songs(&[song("1", "Coltrane", &["Jazz"], 300.0)])
            .await
            .unwrap();
        let sid = SongId::from("1");

        store.record_play(ana.uid, &sid, Utc::now()).await.unwrap();
        let interaction = store.record_play(ana.uid, &sid, Utc::now()).await.unwrap();
        assert_eq!(interaction.total_plays, 2);
        assert!(!interaction.favourite);
    }

    #[tokio::test]
    async fn test_candidate_users_exclusions() {
        let store = MemoryStore::new();
        let me = user(&store, "me").await;
        let liked_by_me = user(&store, "liked_by_me").await;
        let likes_me = user(&store, "likes_me").await;
        let stranger = user(&store, "stranger").await;

        store.upsert_like(me.uid, liked_by_me.uid, 0.0).await.unwrap();
        store.upsert_like(likes_me.uid, me.uid, 0.0).await.unwrap();

        let candidates: Vec<UserId> = store
            .candidate_users(me.uid)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.uid)
            .collect();

        assert!(!candidates.contains(&me.uid));
        assert!(!candidates.contains(&liked_by_me.uid));
        assert!(candidates.contains(&likes_me.uid));
        assert!(candidates.contains(&stranger.uid));

        let mut sorted = candidates.clone();
        sorted.sort();
        assert_eq!(candidates, sorted);
    }

    #[tokio::test]
    async fn test_upsert_like_keeps_first_similarity() {
        let store = MemoryStore::new();
        let a = user(&store, "a").await;
        let b = user(&store, "b").await;

        let (_, outcome) = store.upsert_like(a.uid, b.uid, 0.3).await.unwrap();
        assert_eq!(outcome, LikeOutcome::Liked);

        let (record, outcome) = store.upsert_like(b.uid, a.uid, 0.9).await.unwrap();
        assert_eq!(outcome, LikeOutcome::Matched);
        assert!((record.similarity_score - 0.3).abs() < 1e-9);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_likes_on_one_pair_match_once() {
        let store = MemoryStore::new();
        let a = user(&store, "a").await.uid;
        let b = user(&store, "b").await.uid;

        let first = tokio::spawn({
            let store = store.clone();
            async move { store.upsert_like(a, b, 0.25).await }
        });
        let second = tokio::spawn({
            let store = store.clone();
            async move { store.upsert_like(b, a, 0.75).await }
        });
        let (first, second) = tokio::join!(first, second);
        let (first, first_outcome) = first.unwrap().unwrap();
        let (second, second_outcome) = second.unwrap().unwrap();

        let mut outcomes = vec![first_outcome, second_outcome];
        outcomes.sort_by_key(|o| *o == LikeOutcome::Matched);
        assert_eq!(outcomes, vec![LikeOutcome::Liked, LikeOutcome::Matched]);

        let matched = if first_outcome == LikeOutcome::Matched {
            first
        } else {
            second
        };
        let stored = store.get_match(a, b).await.unwrap().unwrap();
        assert!(stored.matched);
        assert!(stored.liked_by(a) && stored.liked_by(b));
        assert!(stored.matched_at.is_some());
        assert_eq!(stored.matched_at, matched.matched_at);
        // whichever like created the row fixed the similarity
        assert!(stored.similarity_score == 0.25 || stored.similarity_score == 0.75);
    }

    #[tokio::test]
    async fn test_remove_song_from_unknown_playlist() {
        let store = MemoryStore::new();
        let pid = PlaylistId::new();

        let result = store.remove_song(pid, &SongId::from("1")).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
        assert!(!store.inner.read().await.playlist_songs.contains_key(&pid));
    }

    #[tokio::test]
    async fn test_delete_playlist_drops_members() {
        let store = MemoryStore::new();
        let ana = user(&store, "ana").await;
        store
            .seed_songs(&[song("1", "Coltrane", &["Jazz"], 300.0)])
            .await
            .unwrap();

        let playlist = Playlist {
            is_favourites: false,
            name: "Evening".to_string(),
            ..Playlist::favourites_for(ana.uid, Utc::now())
        };
        let pid = store.create_playlist(playlist).await.unwrap().pid;
        store.add_song(pid, &SongId::from("1")).await.unwrap();
        assert!(matches!(
            store.add_song(pid, &SongId::from("1")).await,
            Err(AppError::Conflict(_))
        ));

        assert!(store.delete_playlist(pid).await.unwrap());
        assert!(store.playlist_songs(pid).await.unwrap().is_empty());
        assert!(!store.delete_playlist(pid).await.unwrap());
    }

    #[tokio::test]
    async fn test_global_top_lists() {
        let store = MemoryStore::new();
        let ana = user(&store, "ana").await;
        store
            .seed_songs(&[
                song("1", "Coltrane", &["Jazz"], 300.0),
                song("2", "Nirvana", &["Rock", "Grunge"], 200.0),
            ])
            .await
            .unwrap();

        for _ in 0..3 {
            store
                .record_play(ana.uid, &SongId::from("2"), Utc::now())
                .await
                .unwrap();
        }
        store
            .record_play(ana.uid, &SongId::from("1"), Utc::now())
            .await
            .unwrap();

        let songs = store.top_songs(10).await.unwrap();
        assert_eq!(songs[0].sid, SongId::from("2"));
        assert_eq!(songs[0].plays, 3);

        let genres = store.top_genres(2).await.unwrap();
        assert_eq!(genres.len(), 2);
        assert_eq!(genres[0].genre, "Grunge");
        assert_eq!(genres[1].genre, "Rock");

        let stats = store.user_stats(ana.uid).await.unwrap().unwrap();
        assert_eq!(stats.total_plays, 4);
        assert!((stats.total_listen_seconds - 900.0).abs() < 1e-9);
    }
}
