use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;

/// Display boost added to the stored similarity of a one-sided like
pub const ONE_SIDED_LIKE_BOOST: f64 = 0.30;
/// Display boost added to the stored similarity of a mutual match
pub const MATCHED_BOOST: f64 = 0.40;

/// Like state of an unordered user pair
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MatchState {
    NoRecord,
    OneSidedLike,
    Matched,
}

impl MatchState {
    pub fn of(record: Option<&Match>) -> Self {
        match record {
            None => MatchState::NoRecord,
            Some(m) if m.matched => MatchState::Matched,
            Some(_) => MatchState::OneSidedLike,
        }
    }
}

/// What a like did to the pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LikeOutcome {
    /// The liker's flag was set; the other side has not liked yet
    Liked,
    /// The liker's flag completed the pair
    Matched,
    /// The liker had already liked; nothing changed
    Unchanged,
}

/// Like record for an unordered pair, stored with `user1_id < user2_id`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, sqlx::FromRow)]
pub struct Match {
    pub user1_id: UserId,
    pub user2_id: UserId,
    pub liked_by_user1: bool,
    pub liked_by_user2: bool,
    /// True iff both sides liked. Never reset once set.
    pub matched: bool,
    /// Computed when the row is created, never recomputed
    pub similarity_score: f64,
    pub created_at: DateTime<Utc>,
    pub matched_at: Option<DateTime<Utc>>,
}

impl Match {
    /// Orders a pair the way it is stored
    pub fn canonical_pair(a: UserId, b: UserId) -> (UserId, UserId) {
        if a <= b {
            (a, b)
        } else {
            (b, a)
        }
    }

    /// A fresh row for the pair with neither side liked yet
    pub fn new(a: UserId, b: UserId, similarity_score: f64, now: DateTime<Utc>) -> Self {
        let (user1_id, user2_id) = Self::canonical_pair(a, b);
        Self {
            user1_id,
            user2_id,
            liked_by_user1: false,
            liked_by_user2: false,
            matched: false,
            similarity_score,
            created_at: now,
            matched_at: None,
        }
    }

    pub fn involves(&self, uid: UserId) -> bool {
        self.user1_id == uid || self.user2_id == uid
    }

    pub fn other(&self, uid: UserId) -> UserId {
        if self.user1_id == uid {
            self.user2_id
        } else {
            self.user1_id
        }
    }

    pub fn liked_by(&self, uid: UserId) -> bool {
        if self.user1_id == uid {
            self.liked_by_user1
        } else if self.user2_id == uid {
            self.liked_by_user2
        } else {
            false
        }
    }

    pub fn state(&self) -> MatchState {
        MatchState::of(Some(self))
    }

    /// Records `liker`'s like, deciding the transition from both flags as they are now
    pub fn apply_like(&mut self, liker: UserId, now: DateTime<Utc>) -> LikeOutcome {
        debug_assert!(self.involves(liker), "liker is not part of this pair");

        let flag = if self.user1_id == liker {
            &mut self.liked_by_user1
        } else if self.user2_id == liker {
            &mut self.liked_by_user2
        } else {
            return LikeOutcome::Unchanged;
        };

        if *flag {
            return LikeOutcome::Unchanged;
        }
        *flag = true;

        if self.liked_by_user1 && self.liked_by_user2 && !self.matched {
            self.matched = true;
            self.matched_at = Some(now);
            LikeOutcome::Matched
        } else {
            LikeOutcome::Liked
        }
    }

    /// Stored similarity plus the presentation boost for its state
    pub fn display_score(&self) -> f64 {
        let boost = if self.matched {
            MATCHED_BOOST
        } else {
            ONE_SIDED_LIKE_BOOST
        };
        self.similarity_score + boost
    }
}

/// A user as shown on the matching screens
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MatchCard {
    pub uid: UserId,
    pub username: String,
    pub name: Option<String>,
    pub age: Option<i32>,
    pub country: Option<String>,
    pub favorite_genres: Vec<String>,
    pub top_artists: Vec<String>,
    pub similarity_score: f64,
    pub common_genres: usize,
    pub common_songs: usize,
    pub matched: bool,
}

/// One page of ranked match candidates
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidatePage {
    pub candidates: Vec<MatchCard>,
    pub total_candidates: usize,
    pub current_page: u32,
    pub total_pages: u32,
}

/// Profile summary shown before liking someone
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingProfile {
    pub uid: UserId,
    pub username: String,
    pub name: Option<String>,
    pub age: Option<i32>,
    pub country: Option<String>,
    pub favorite_genres: Vec<String>,
    pub top_artists: Vec<String>,
    pub total_songs: usize,
    pub total_playlists: usize,
}
