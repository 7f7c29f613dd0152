use crate::models::{TasteProfile, UserId};

use super::profile::ProfileService;

const GENRE_WEIGHT: f64 = 0.4;
const ARTIST_WEIGHT: f64 = 0.6;
/// Weighted overlap that maps to a perfect score
const OVERLAP_SCALE: f64 = 10.0;

/// Taste similarity of two profiles in `[0.0, 1.0]`.
///
/// Symmetric. Users without any counted interactions score 0.0.
pub fn similarity(a: &TasteProfile, b: &TasteProfile) -> f64 {
    let genre_overlap = a.genres.intersection(&b.genres).count() as f64;
    let artist_overlap = a.artists.intersection(&b.artists).count() as f64;

    normalize((genre_overlap * GENRE_WEIGHT + artist_overlap * ARTIST_WEIGHT) / OVERLAP_SCALE)
}

fn normalize(score: f64) -> f64 {
    if score.is_finite() {
        score.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Scores pairs of users by looking up both taste profiles
#[derive(Clone)]
pub struct SimilarityScorer {
    profiles: ProfileService,
}

impl SimilarityScorer {
    pub fn new(profiles: ProfileService) -> Self {
        Self { profiles }
    }

    /// Never fails: a profile that cannot be loaded counts as empty
    pub async fn score(&self, a: UserId, b: UserId) -> f64 {
        let (profile_a, profile_b) = tokio::join!(
            self.profiles.profile_or_empty(a),
            self.profiles.profile_or_empty(b)
        );
        similarity(&profile_a, &profile_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn profile(genres: &[&str], artists: &[&str]) -> TasteProfile {
        TasteProfile {
            genres: genres.iter().map(|g| g.to_string()).collect::<BTreeSet<_>>(),
            artists: artists.iter().map(|a| a.to_string()).collect::<BTreeSet<_>>(),
            ..TasteProfile::empty(UserId::new())
        }
    }

    #[test]
    fn test_weighted_overlap() {
        let a = profile(&["Jazz", "Blues", "Rock"], &["Miles Davis", "B.B. King"]);
        let b = profile(&["Jazz", "Blues", "Pop"], &["Miles Davis"]);
        // (2 * 0.4 + 1 * 0.6) / 10
        assert!((similarity(&a, &b) - 0.14).abs() < 1e-9);
    }

    #[test]
    fn test_symmetric() {
        let a = profile(&["Jazz"], &["Coltrane", "Monk"]);
        let b = profile(&["Jazz", "Soul"], &["Monk"]);
        assert_eq!(similarity(&a, &b), similarity(&b, &a));
    }

    #[test]
    fn test_no_overlap_is_zero() {
        let a = profile(&["Metal"], &["Slayer"]);
        let b = profile(&["Jazz"], &["Coltrane"]);
        assert_eq!(similarity(&a, &b), 0.0);

        let empty = profile(&[], &[]);
        assert_eq!(similarity(&a, &empty), 0.0);
    }

    #[test]
    fn test_capped_at_one() {
        let genres: Vec<String> = (0..20).map(|i| format!("G{}", i)).collect();
        let artists: Vec<String> = (0..20).map(|i| format!("A{}", i)).collect();
        let genre_refs: Vec<&str> = genres.iter().map(String::as_str).collect();
        let artist_refs: Vec<&str> = artists.iter().map(String::as_str).collect();

        let a = profile(&genre_refs, &artist_refs);
        let b = profile(&genre_refs, &artist_refs);
        assert_eq!(similarity(&a, &b), 1.0);
    }

    #[test]
    fn test_normalize_non_finite() {
        assert_eq!(normalize(f64::NAN), 0.0);
        assert_eq!(normalize(f64::INFINITY), 0.0);
        assert_eq!(normalize(-0.5), 0.0);
    }
}
