//! Catalog-ingestion boundary.
//!
//! Playlist walking lives in an external collaborator; this module only
//! accepts the (artist, representative song) pairs it produces and upserts
//! them: insert-if-absent by name, and record the song only when none is
//! stored yet. The CLI adapter reads the pairs from a JSON file.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use crate::artist_store::ArtistStore;

/// One ingested pair. The song is optional: some catalog entries only name
/// the artist.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ArtistImport {
    pub artist: String,
    #[serde(default)]
    pub song: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ImportStats {
    pub total: usize,
    pub added: usize,
}

/// Upsert every pair. Existing artists keep their stored song; blank names
/// are dropped.
pub fn upsert_all(store: &dyn ArtistStore, imports: &[ArtistImport]) -> Result<ImportStats> {
    let mut stats = ImportStats {
        total: imports.len(),
        ..Default::default()
    };

    for import in imports {
        let name = import.artist.trim();
        if name.is_empty() {
            debug!("Skipping import entry with a blank artist name");
            continue;
        }
        let song = import
            .song
            .as_deref()
            .map(str::trim)
            .filter(|song| !song.is_empty());
        if store.upsert_artist(name, song)? {
            stats.added += 1;
        }
    }

    info!(
        "Imported {} artists ({} new)",
        stats.total, stats.added
    );
    Ok(stats)
}

/// Read a JSON array of `{"artist": ..., "song": ...}` objects.
pub fn load_imports(path: &Path) -> Result<Vec<ArtistImport>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read import file {:?}", path))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse import file {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artist_store::SqliteArtistStore;
    use tempfile::TempDir;

    fn import(artist: &str, song: Option<&str>) -> ArtistImport {
        ArtistImport {
            artist: artist.to_string(),
            song: song.map(str::to_string),
        }
    }

    #[test]
    fn test_upsert_all_counts_new_rows_only() {
        let dir = TempDir::new().unwrap();
        let store = SqliteArtistStore::new(dir.path().join("artists.db")).unwrap();

        let stats = upsert_all(
            &store,
            &[
                import("Daft Punk", Some("Get Lucky")),
                import("Queen", None),
                import("Daft Punk", Some("One More Time")),
                import("   ", Some("Ghost Song")),
            ],
        )
        .unwrap();

        assert_eq!(stats.total, 4);
        assert_eq!(stats.added, 2);

        // First song encountered wins
        let record = store.get_artist("Daft Punk").unwrap().unwrap();
        assert_eq!(record.song_name.as_deref(), Some("Get Lucky"));
    }

    #[test]
    fn test_load_imports() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("playlist.json");
        std::fs::write(
            &path,
            r#"[{"artist": "Daft Punk", "song": "Get Lucky"}, {"artist": "Queen"}]"#,
        )
        .unwrap();

        let imports = load_imports(&path).unwrap();
        assert_eq!(imports.len(), 2);
        assert_eq!(imports[0].artist, "Daft Punk");
        assert_eq!(imports[0].song.as_deref(), Some("Get Lucky"));
        assert_eq!(imports[1].song, None);
    }

    #[test]
    fn test_load_imports_missing_file_is_error() {
        let dir = TempDir::new().unwrap();
        assert!(load_imports(&dir.path().join("nope.json")).is_err());
    }
}
