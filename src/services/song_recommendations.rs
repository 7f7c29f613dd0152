use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use rand::seq::SliceRandom;
use serde::Serialize;

use crate::{
    db::{CatalogStore, RecommendationStore, UserStore},
    error::{AppError, AppResult},
    models::{ReasonTag, Recommendation, Song, SongId, TargetType, TasteProfile, UserId},
};

use super::profile::ProfileService;

pub const MAX_SONG_LIMIT: u32 = 50;

const TOP_GENRE_POINTS: u8 = 4;
const TOP_ARTIST_POINTS: u8 = 2;
const DURATION_POINTS: u8 = 1;
const MAX_POINTS: u8 = TOP_GENRE_POINTS + TOP_ARTIST_POINTS + DURATION_POINTS;

#[derive(Debug, Clone, Serialize)]
pub struct RecommendedSong {
    #[serde(flatten)]
    pub song: Song,
    /// Fraction of the maximum tier points, in `[0.0, 1.0]`
    pub score: f64,
    pub reason: ReasonTag,
}

/// Tier points of `song` for `profile` and the strongest criterion it met
fn tier(song: &Song, profile: &TasteProfile) -> (u8, ReasonTag) {
    let genre = profile.top_genres.iter().any(|g| song.has_genre(g));
    let artist = profile
        .top_artists
        .iter()
        .any(|a| a.eq_ignore_ascii_case(&song.artist));
    let duration = profile
        .favourite_duration
        .is_some_and(|band| band.contains(song.duration));

    let points = u8::from(genre) * TOP_GENRE_POINTS
        + u8::from(artist) * TOP_ARTIST_POINTS
        + u8::from(duration) * DURATION_POINTS;
    let reason = if genre {
        ReasonTag::TopGenre
    } else if artist {
        ReasonTag::TopArtist
    } else if duration {
        ReasonTag::DurationMatch
    } else {
        ReasonTag::Fallback
    };
    (points, reason)
}

/// Recommends catalog songs a user has not interacted with yet
#[derive(Clone)]
pub struct SongRecommender {
    users: Arc<dyn UserStore>,
    catalog: Arc<dyn CatalogStore>,
    recommendations: Arc<dyn RecommendationStore>,
    profiles: ProfileService,
}

impl SongRecommender {
    pub fn new(
        users: Arc<dyn UserStore>,
        catalog: Arc<dyn CatalogStore>,
        recommendations: Arc<dyn RecommendationStore>,
        profiles: ProfileService,
    ) -> Self {
        Self {
            users,
            catalog,
            recommendations,
            profiles,
        }
    }

    pub async fn recommend(&self, uid: UserId, limit: u32) -> AppResult<Vec<RecommendedSong>> {
        if !(1..=MAX_SONG_LIMIT).contains(&limit) {
            return Err(AppError::InvalidInput(format!(
                "limit must be between 1 and {}",
                MAX_SONG_LIMIT
            )));
        }
        if self.users.user(uid).await?.is_none() {
            return Err(AppError::not_found("User", uid));
        }

        let profile = self.profiles.profile_or_empty(uid).await;
        let limit = limit as usize;

        let recommended = if profile.has_history() {
            self.from_taste(&profile, limit).await?
        } else {
            tracing::debug!(uid = %uid, "No listening history, sampling catalog");
            self.fallback(&profile, limit).await?
        };

        tracing::info!(uid = %uid, count = recommended.len(), "Song recommendations assembled");
        self.remember(uid, &recommended).await;
        Ok(recommended)
    }

    async fn from_taste(
        &self,
        profile: &TasteProfile,
        limit: usize,
    ) -> AppResult<Vec<RecommendedSong>> {
        let mut pool: BTreeMap<SongId, Song> = BTreeMap::new();
        for genre in &profile.top_genres {
            for song in self.catalog.songs_by_genre(genre).await? {
                pool.entry(song.sid.clone()).or_insert(song);
            }
        }
        for artist in &profile.top_artists {
            for song in self.catalog.songs_by_artist(artist).await? {
                pool.entry(song.sid.clone()).or_insert(song);
            }
        }
        if let Some(band) = profile.favourite_duration {
            let (min, max) = band.bounds();
            for song in self.catalog.songs_by_duration(min, max).await? {
                pool.entry(song.sid.clone()).or_insert(song);
            }
        }

        let mut scored: Vec<(u8, RecommendedSong)> = pool
            .into_values()
            .filter(|song| !profile.interacted.contains(&song.sid))
            .filter_map(|song| {
                let (points, reason) = tier(&song, profile);
                (points > 0).then(|| {
                    (
                        points,
                        RecommendedSong {
                            song,
                            score: f64::from(points) / f64::from(MAX_POINTS),
                            reason,
                        },
                    )
                })
            })
            .collect();

        // shuffle first so the stable sort randomizes order within each tier
        scored.shuffle(&mut rand::rng());
        scored.sort_by(|(a, _), (b, _)| b.cmp(a));

        Ok(scored
            .into_iter()
            .take(limit)
            .map(|(_, song)| song)
            .collect())
    }

    async fn fallback(
        &self,
        profile: &TasteProfile,
        limit: usize,
    ) -> AppResult<Vec<RecommendedSong>> {
        let sample = self
            .catalog
            .sample_songs(limit + profile.interacted.len())
            .await?;

        Ok(sample
            .into_iter()
            .filter(|song| !profile.interacted.contains(&song.sid))
            .take(limit)
            .map(|song| RecommendedSong {
                song,
                score: 0.0,
                reason: ReasonTag::Fallback,
            })
            .collect())
    }

    async fn remember(&self, uid: UserId, songs: &[RecommendedSong]) {
        let now = Utc::now();
        let recommendations: Vec<Recommendation> = songs
            .iter()
            .map(|r| Recommendation {
                uid,
                target_type: TargetType::Song,
                target_id: r.song.sid.to_string(),
                score: r.score,
                reason: r.reason,
                updated_at: now,
            })
            .collect();

        if let Err(e) = self
            .recommendations
            .upsert_recommendations(&recommendations)
            .await
        {
            tracing::warn!(uid = %uid, error = %e, "Failed to store song recommendations");
        }
    }
}
