use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use super::{HistoryEntry, SongId, UserId};

/// How many genres/artists make up a user's "top" lists
pub const TOP_N: usize = 5;

/// Mean and population standard deviation of favourited song durations
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct DurationBand {
    pub mean: f64,
    pub std_dev: f64,
}

impl DurationBand {
    pub fn from_durations(durations: &[f64]) -> Option<Self> {
        let finite: Vec<f64> = durations.iter().copied().filter(|d| d.is_finite()).collect();
        if finite.is_empty() {
            return None;
        }

        let n = finite.len() as f64;
        let mean = finite.iter().sum::<f64>() / n;
        let variance = finite.iter().map(|d| (d - mean).powi(2)).sum::<f64>() / n;

        Some(Self {
            mean,
            std_dev: variance.sqrt(),
        })
    }

    /// Whether `duration` lies within one standard deviation of the mean
    pub fn contains(&self, duration: f64) -> bool {
        (duration - self.mean).abs() <= self.std_dev
    }

    pub fn bounds(&self) -> (f64, f64) {
        (self.mean - self.std_dev, self.mean + self.std_dev)
    }
}

#[derive(Default)]
struct Tally {
    plays: i64,
    favourites: i64,
}

/// Music taste of one user, derived from their interaction history.
///
/// `genres` and `artists` only include songs the user favourited or played;
/// `interacted` includes every song with an interaction row.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TasteProfile {
    pub uid: UserId,
    pub genres: BTreeSet<String>,
    pub artists: BTreeSet<String>,
    /// Up to five genres by total plays, then favourite count, then name
    pub top_genres: Vec<String>,
    /// Up to five artists by favourite count, then total plays, then name
    pub top_artists: Vec<String>,
    pub favourite_duration: Option<DurationBand>,
    pub interacted: BTreeSet<SongId>,
}

impl TasteProfile {
    pub fn empty(uid: UserId) -> Self {
        Self {
            uid,
            genres: BTreeSet::new(),
            artists: BTreeSet::new(),
            top_genres: Vec::new(),
            top_artists: Vec::new(),
            favourite_duration: None,
            interacted: BTreeSet::new(),
        }
    }

    pub fn from_history(uid: UserId, history: &[HistoryEntry]) -> Self {
        let mut profile = Self::empty(uid);
        let mut genre_tally: HashMap<&str, Tally> = HashMap::new();
        let mut artist_tally: HashMap<&str, Tally> = HashMap::new();
        let mut favourite_durations = Vec::new();

        for entry in history {
            let interaction = &entry.interaction;
            let song = &entry.song;
            profile.interacted.insert(song.sid.clone());

            if !interaction.counts_toward_taste() {
                continue;
            }

            let favourite = i64::from(interaction.favourite);
            for genre in &song.genres {
                profile.genres.insert(genre.clone());
                let tally = genre_tally.entry(genre.as_str()).or_default();
                tally.plays += interaction.total_plays;
                tally.favourites += favourite;
            }

            profile.artists.insert(song.artist.clone());
            let tally = artist_tally.entry(song.artist.as_str()).or_default();
            tally.plays += interaction.total_plays;
            tally.favourites += favourite;

            if interaction.favourite {
                favourite_durations.push(song.duration);
            }
        }

        let mut genres: Vec<(&str, Tally)> = genre_tally.into_iter().collect();
        genres.sort_by(|(a_name, a), (b_name, b)| {
            b.plays
                .cmp(&a.plays)
                .then(b.favourites.cmp(&a.favourites))
                .then(a_name.cmp(b_name))
        });
        profile.top_genres = genres
            .into_iter()
            .take(TOP_N)
            .map(|(name, _)| name.to_string())
            .collect();

        let mut artists: Vec<(&str, Tally)> = artist_tally.into_iter().collect();
        artists.sort_by(|(a_name, a), (b_name, b)| {
            b.favourites
                .cmp(&a.favourites)
                .then(b.plays.cmp(&a.plays))
                .then(a_name.cmp(b_name))
        });
        profile.top_artists = artists
            .into_iter()
            .take(TOP_N)
            .map(|(name, _)| name.to_string())
            .collect();

        profile.favourite_duration = DurationBand::from_durations(&favourite_durations);
        profile
    }

    /// True when at least one interaction counts toward taste
    pub fn has_history(&self) -> bool {
        !self.genres.is_empty() || !self.artists.is_empty()
    }

    pub fn common_top_genres(&self, other: &TasteProfile) -> usize {
        self.top_genres
            .iter()
            .filter(|g| other.top_genres.contains(g))
            .count()
    }

    pub fn common_songs(&self, other: &TasteProfile) -> usize {
        self.interacted.intersection(&other.interacted).count()
    }
}
