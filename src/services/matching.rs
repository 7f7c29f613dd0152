use std::sync::Arc;

use crate::{
    db::{InteractionStore, MatchStore, PlaylistStore, UserStore},
    error::{AppError, AppResult},
    models::{LikeOutcome, Match, MatchCard, MatchingProfile, TasteProfile, User, UserId},
};

use super::{profile::ProfileService, similarity::SimilarityScorer};

/// Card for `user` as seen by the owner of `viewer`
pub(crate) fn match_card(
    user: User,
    viewer: &TasteProfile,
    profile: &TasteProfile,
    similarity_score: f64,
    matched: bool,
) -> MatchCard {
    MatchCard {
        uid: user.uid,
        username: user.username,
        name: user.name,
        age: user.age,
        country: user.country,
        favorite_genres: profile.top_genres.clone(),
        top_artists: profile.top_artists.clone(),
        similarity_score,
        common_genres: viewer.common_top_genres(profile),
        common_songs: viewer.common_songs(profile),
        matched,
    }
}

/// Likes between users and the views over them
#[derive(Clone)]
pub struct MatchService {
    users: Arc<dyn UserStore>,
    matches: Arc<dyn MatchStore>,
    interactions: Arc<dyn InteractionStore>,
    playlists: Arc<dyn PlaylistStore>,
    profiles: ProfileService,
    scorer: SimilarityScorer,
}

impl MatchService {
    pub fn new(
        users: Arc<dyn UserStore>,
        matches: Arc<dyn MatchStore>,
        interactions: Arc<dyn InteractionStore>,
        playlists: Arc<dyn PlaylistStore>,
        profiles: ProfileService,
    ) -> Self {
        Self {
            users,
            matches,
            interactions,
            playlists,
            scorer: SimilarityScorer::new(profiles.clone()),
            profiles,
        }
    }

    /// Records that `liker` likes `liked`.
    ///
    /// The pair's similarity is computed only when the pair has no row yet.
    /// A like that changes nothing is reported as `Conflict`.
    pub async fn like(&self, liker: UserId, liked: UserId) -> AppResult<Match> {
        if liker == liked {
            return Err(AppError::InvalidInput(
                "Users cannot like themselves".to_string(),
            ));
        }
        self.require_user(liker).await?;
        self.require_user(liked).await?;

        let similarity = match self.matches.get_match(liker, liked).await? {
            Some(existing) => existing.similarity_score,
            None => self.scorer.score(liker, liked).await,
        };

        let (record, outcome) = self.matches.upsert_like(liker, liked, similarity).await?;
        match outcome {
            LikeOutcome::Unchanged => {
                return Err(AppError::Conflict(format!(
                    "User {} already liked user {}",
                    liker, liked
                )));
            }
            LikeOutcome::Liked => {
                tracing::info!(liker = %liker, liked = %liked, similarity, "Like recorded");
            }
            LikeOutcome::Matched => {
                tracing::info!(liker = %liker, liked = %liked, similarity, "Users matched");
            }
        }

        Ok(record)
    }

    /// Every pair `uid` has liked, matched or not, best first
    pub async fn likes(&self, uid: UserId) -> AppResult<Vec<MatchCard>> {
        self.require_user(uid).await?;
        let records: Vec<Match> = self
            .matches
            .matches_for(uid)
            .await?
            .into_iter()
            .filter(|m| m.liked_by(uid))
            .collect();
        self.cards(uid, records).await
    }

    /// Mutual matches of `uid`, best first
    pub async fn matches(&self, uid: UserId) -> AppResult<Vec<MatchCard>> {
        self.require_user(uid).await?;
        let records: Vec<Match> = self
            .matches
            .matches_for(uid)
            .await?
            .into_iter()
            .filter(|m| m.matched)
            .collect();
        self.cards(uid, records).await
    }

    pub async fn profile(&self, uid: UserId) -> AppResult<MatchingProfile> {
        let user = self
            .users
            .user(uid)
            .await?
            .ok_or_else(|| AppError::not_found("User", uid))?;
        let taste = self.profiles.profile_or_empty(uid).await;
        let total_songs = self.interactions.interactions_for_user(uid).await?.len();
        let total_playlists = self.playlists.playlists_for_user(uid).await?.len();

        Ok(MatchingProfile {
            uid,
            username: user.username,
            name: user.name,
            age: user.age,
            country: user.country,
            favorite_genres: taste.top_genres,
            top_artists: taste.top_artists,
            total_songs,
            total_playlists,
        })
    }

    async fn cards(&self, uid: UserId, records: Vec<Match>) -> AppResult<Vec<MatchCard>> {
        let viewer = self.profiles.profile_or_empty(uid).await;
        let mut cards = Vec::with_capacity(records.len());

        for record in records {
            let other = record.other(uid);
            let Some(user) = self.users.user(other).await? else {
                tracing::warn!(uid = %other, "Match row refers to a missing user");
                continue;
            };
            let profile = self.profiles.profile_or_empty(other).await;
            cards.push(match_card(
                user,
                &viewer,
                &profile,
                record.display_score(),
                record.matched,
            ));
        }

        cards.sort_by(|a, b| b.similarity_score.total_cmp(&a.similarity_score));
        Ok(cards)
    }

    async fn require_user(&self, uid: UserId) -> AppResult<()> {
        match self.users.user(uid).await? {
            Some(_) => Ok(()),
            None => Err(AppError::not_found("User", uid)),
        }
    }
}
