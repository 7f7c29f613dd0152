use std::path::Path;

use anyhow::Context;

use crate::{db::CatalogStore, models::Song};

/// Loads a JSON array of songs into an empty catalog.
///
/// Does nothing when the catalog already has songs. Songs without a genre
/// or with an unusable duration are skipped. Returns how many were added.
pub async fn seed_from_file(catalog: &dyn CatalogStore, path: &Path) -> anyhow::Result<usize> {
    let existing = catalog.song_count().await?;
    if existing > 0 {
        tracing::info!(existing, "Catalog already populated, skipping seed");
        return Ok(0);
    }

    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading catalog seed {}", path.display()))?;
    let songs: Vec<Song> = serde_json::from_str(&raw)
        .with_context(|| format!("parsing catalog seed {}", path.display()))?;

    let total = songs.len();
    let valid: Vec<Song> = songs
        .into_iter()
        .filter(|song| {
            let usable = !song.genres.is_empty() && song.duration.is_finite() && song.duration >= 0.0;
            if !usable {
                tracing::warn!(sid = %song.sid, "Skipping catalog entry without genre or duration");
            }
            usable
        })
        .collect();

    let added = catalog.seed_songs(&valid).await?;
    tracing::info!(added, skipped = total - valid.len(), "Catalog seeded");
    Ok(added)
}
