use std::sync::Arc;

use crate::{
    cached,
    db::{Cache, CacheKey, InteractionStore},
    error::AppResult,
    models::{TasteProfile, UserId},
};

/// Derives taste profiles from interaction history, optionally cached in Redis.
///
/// Every interaction write must call [`ProfileService::invalidate`] for the
/// affected user so a cached profile never outlives the data it came from.
#[derive(Clone)]
pub struct ProfileService {
    interactions: Arc<dyn InteractionStore>,
    cache: Option<Cache>,
    ttl: u64,
}

impl ProfileService {
    pub fn new(interactions: Arc<dyn InteractionStore>, cache: Option<Cache>, ttl: u64) -> Self {
        Self {
            interactions,
            cache,
            ttl,
        }
    }

    pub async fn profile(&self, uid: UserId) -> AppResult<TasteProfile> {
        match &self.cache {
            Some(cache) => {
                let key = CacheKey::TasteProfile(uid);
                cached!(cache, key, self.ttl, self.build(uid))
            }
            None => self.build(uid).await,
        }
    }

    /// Like [`profile`](Self::profile), but a failed lookup yields an empty
    /// profile instead of an error
    pub async fn profile_or_empty(&self, uid: UserId) -> TasteProfile {
        match self.profile(uid).await {
            Ok(profile) => profile,
            Err(e) => {
                tracing::warn!(uid = %uid, error = %e, "Taste profile unavailable, using empty profile");
                TasteProfile::empty(uid)
            }
        }
    }

    /// Retires the cached profile of `uid` before returning
    pub async fn invalidate(&self, uid: UserId) {
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.invalidate(&CacheKey::TasteProfile(uid)).await {
                tracing::error!(uid = %uid, error = %e, "Failed to invalidate cached taste profile");
            }
        }
    }

    async fn build(&self, uid: UserId) -> AppResult<TasteProfile> {
        let history = self.interactions.history(uid).await?;
        let profile = TasteProfile::from_history(uid, &history);
        tracing::debug!(
            uid = %uid,
            genres = profile.genres.len(),
            artists = profile.artists.len(),
            "Taste profile built"
        );
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::store::MockInteractionStore;
    use crate::error::AppError;
    use crate::models::{HistoryEntry, Interaction, Song, SongId};

    fn history(uid: UserId) -> Vec<HistoryEntry> {
        vec![HistoryEntry {
            interaction: Interaction {
                favourite: true,
                ..Interaction::new(uid, SongId::from("1"))
            },
            song: Song {
                sid: SongId::from("1"),
                title: "So What".to_string(),
                artist: "Miles Davis".to_string(),
                genres: vec!["Jazz".to_string()],
                duration: 545.0,
                audio_path: None,
                audio_download_path: None,
            },
        }]
    }

    #[tokio::test]
    async fn test_profile_from_store_without_cache() {
        let uid = UserId::new();
        let mut store = MockInteractionStore::new();
        store
            .expect_history()
            .times(1)
            .returning(move |_| Ok(history(uid)));

        let service = ProfileService::new(Arc::new(store), None, 60);
        let profile = service.profile(uid).await.unwrap();

        assert_eq!(profile.top_genres, vec!["Jazz"]);
        assert_eq!(profile.top_artists, vec!["Miles Davis"]);
        // no cache configured, invalidation is a no-op
        service.invalidate(uid).await;
    }

    #[tokio::test]
    async fn test_store_failure_degrades_to_empty_profile() {
        let uid = UserId::new();
        let mut store = MockInteractionStore::new();
        store
            .expect_history()
            .returning(|_| Err(AppError::Internal("connection reset".to_string())));

        let service = ProfileService::new(Arc::new(store), None, 60);
        assert!(service.profile(uid).await.is_err());

        let profile = service.profile_or_empty(uid).await;
        assert_eq!(profile, TasteProfile::empty(uid));
    }
}
