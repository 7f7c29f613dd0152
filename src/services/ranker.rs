use std::sync::Arc;

use chrono::Utc;

use crate::{
    db::{MatchStore, RecommendationStore, UserStore},
    error::{AppError, AppResult},
    models::{
        CandidatePage, MatchCard, PageQuery, ReasonTag, Recommendation, TargetType, UserId,
    },
};

use super::{matching::match_card, profile::ProfileService, similarity::similarity};

pub const MAX_CANDIDATE_LIMIT: u32 = 50;

/// Orders potential matches for a user by taste similarity
#[derive(Clone)]
pub struct CandidateRanker {
    users: Arc<dyn UserStore>,
    matches: Arc<dyn MatchStore>,
    recommendations: Arc<dyn RecommendationStore>,
    profiles: ProfileService,
}

impl CandidateRanker {
    pub fn new(
        users: Arc<dyn UserStore>,
        matches: Arc<dyn MatchStore>,
        recommendations: Arc<dyn RecommendationStore>,
        profiles: ProfileService,
    ) -> Self {
        Self {
            users,
            matches,
            recommendations,
            profiles,
        }
    }

    /// One page of candidates, most similar first. Equal scores keep the
    /// store's uid order.
    pub async fn rank(&self, uid: UserId, page: PageQuery) -> AppResult<CandidatePage> {
        if !(1..=MAX_CANDIDATE_LIMIT).contains(&page.limit) {
            return Err(AppError::InvalidInput(format!(
                "limit must be between 1 and {}",
                MAX_CANDIDATE_LIMIT
            )));
        }
        if page.page == 0 {
            return Err(AppError::InvalidInput("page starts at 1".to_string()));
        }
        if self.users.user(uid).await?.is_none() {
            return Err(AppError::not_found("User", uid));
        }

        let viewer = self.profiles.profile_or_empty(uid).await;
        let eligible = self.matches.candidate_users(uid).await?;

        let mut ranked: Vec<MatchCard> = Vec::with_capacity(eligible.len());
        for user in eligible.into_iter().filter(|u| u.uid != uid) {
            let profile = self.profiles.profile_or_empty(user.uid).await;
            let score = similarity(&viewer, &profile);
            ranked.push(match_card(user, &viewer, &profile, score, false));
        }
        // stable: ties stay in uid order
        ranked.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));

        let total_candidates = ranked.len();
        let limit = page.limit as usize;
        let total_pages = total_candidates.div_ceil(limit).max(1) as u32;
        let candidates: Vec<MatchCard> = ranked
            .into_iter()
            .skip((page.page as usize - 1) * limit)
            .take(limit)
            .collect();

        tracing::info!(
            uid = %uid,
            total_candidates,
            returned = candidates.len(),
            page = page.page,
            "Ranked match candidates"
        );

        self.remember(uid, &candidates).await;

        Ok(CandidatePage {
            candidates,
            total_candidates,
            current_page: page.page,
            total_pages,
        })
    }

    /// The `limit` best candidates
    pub async fn top(&self, uid: UserId, limit: u32) -> AppResult<Vec<MatchCard>> {
        let page = self.rank(uid, PageQuery { page: 1, limit }).await?;
        Ok(page.candidates)
    }

    async fn remember(&self, uid: UserId, candidates: &[MatchCard]) {
        let now = Utc::now();
        let recommendations: Vec<Recommendation> = candidates
            .iter()
            .map(|card| Recommendation {
                uid,
                target_type: TargetType::User,
                target_id: card.uid.to_string(),
                score: card.similarity_score,
                reason: ReasonTag::TasteSimilarity,
                updated_at: now,
            })
            .collect();

        if let Err(e) = self
            .recommendations
            .upsert_recommendations(&recommendations)
            .await
        {
            tracing::warn!(uid = %uid, error = %e, "Failed to store user recommendations");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{CatalogStore, InteractionStore, MemoryStore};
    use crate::models::{NewUser, Song, SongId};

    struct Fixture {
        store: Arc<MemoryStore>,
        ranker: CandidateRanker,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let profiles = ProfileService::new(store.clone(), None, 60);
        let ranker = CandidateRanker::new(store.clone(), store.clone(), store.clone(), profiles);
        Fixture { store, ranker }
    }

    impl Fixture {
        async fn user(&self, username: &str) -> UserId {
            self.store
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
                .uid
        }

        async fn favourite(&self, uid: UserId, sid: &str) {
            self.store
                .toggle_favourite(uid, &SongId::from(sid))
                .await
                .unwrap();
        }
    }

    async fn seed(store: &MemoryStore) {
        let song = |sid: &str, artist: &str, genre: &str| Song {
            sid: SongId::from(sid),
            title: format!("Track {}", sid),
            artist: artist.to_string(),
            genres: vec![genre.to_string()],
            duration: 240.0,
            audio_path: None,
            audio_download_path: None,
        };
        store
            .seed_songs(&[
                song("1", "Coltrane", "Jazz"),
                song("2", "Monk", "Jazz"),
                song("3", "Slayer", "Metal"),
            ])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_rank_orders_by_similarity_and_excludes_self() {
        let f = fixture();
        seed(&f.store).await;
        let me = f.user("me").await;
        let jazz_fan = f.user("jazz_fan").await;
        let metalhead = f.user("metalhead").await;

        f.favourite(me, "1").await;
        f.favourite(me, "2").await;
        f.favourite(jazz_fan, "1").await;
        f.favourite(metalhead, "3").await;

        let page = f.ranker.rank(me, PageQuery::default()).await.unwrap();
        let order: Vec<UserId> = page.candidates.iter().map(|c| c.uid).collect();

        assert!(!order.contains(&me));
        assert_eq!(order[0], jazz_fan);
        assert_eq!(page.total_candidates, 2);
        assert_eq!(page.total_pages, 1);
        assert!(page.candidates[0].similarity_score > 0.0);
        assert_eq!(page.candidates[0].common_songs, 1);
        assert_eq!(page.candidates[1].similarity_score, 0.0);

        let stored = f
            .store
            .recommendations_for(me, Some(TargetType::User))
            .await
            .unwrap();
        assert_eq!(stored.len(), 2);
        assert_eq!(stored[0].target_id, jazz_fan.to_string());
    }

    #[tokio::test]
    async fn test_ties_keep_uid_order_and_paginate() {
        let f = fixture();
        let me = f.user("me").await;
        for i in 0..5 {
            f.user(&format!("user{}", i)).await;
        }

        let first = f
            .ranker
            .rank(me, PageQuery { page: 1, limit: 2 })
            .await
            .unwrap();
        let second = f
            .ranker
            .rank(me, PageQuery { page: 2, limit: 2 })
            .await
            .unwrap();

        assert_eq!(first.total_candidates, 5);
        assert_eq!(first.total_pages, 3);
        assert_eq!(second.current_page, 2);

        let uids: Vec<UserId> = first
            .candidates
            .iter()
            .chain(second.candidates.iter())
            .map(|c| c.uid)
            .collect();
        let mut sorted = uids.clone();
        sorted.sort();
        assert_eq!(uids, sorted);
    }

    #[tokio::test]
    async fn test_limit_bounds() {
        let f = fixture();
        let me = f.user("me").await;

        for limit in [0, MAX_CANDIDATE_LIMIT + 1] {
            let result = f.ranker.rank(me, PageQuery { page: 1, limit }).await;
            assert!(matches!(result, Err(AppError::InvalidInput(_))));
        }
    }
}
