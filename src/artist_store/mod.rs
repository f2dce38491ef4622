//! Durable artist storage.
//!
//! The resolution cache is not a separate store: a cache read is a read of
//! `artists.channel_url` and a cache write is a conditional update of the
//! same column. Connections are opened per operation and never held across
//! an external search call, so concurrent workers do not contend on a
//! shared handle.

mod models;
mod schema;

pub use models::{ArtistRecord, AutoVerification, ManualVerification};
pub use schema::ensure_schema;

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use tracing::info;

/// Storage operations needed by the resolver, verifier, runner, and the
/// ingestion/review collaborators.
pub trait ArtistStore: Send + Sync {
    /// Insert the artist if absent; record the representative song only when
    /// none is stored yet. Returns true when a new row was inserted.
    fn upsert_artist(&self, name: &str, song_name: Option<&str>) -> Result<bool>;

    fn get_artist(&self, name: &str) -> Result<Option<ArtistRecord>>;

    /// Names of artists with no resolved channel (the resolution batch).
    fn pending_resolution(&self) -> Result<Vec<String>>;

    /// Records with a channel and a song but no verification evidence yet
    /// (the verification batch).
    fn pending_verification(&self) -> Result<Vec<ArtistRecord>>;

    /// Resolution-cache read.
    fn channel_for(&self, name: &str) -> Result<Option<String>>;

    /// Resolution-cache write. An empty URL is refused: a cached channel is
    /// only ever replaced by a newer successful resolution.
    fn set_channel(&self, name: &str, channel_url: &str) -> Result<()>;

    fn set_auto_verified(&self, id: i64, state: AutoVerification) -> Result<()>;

    fn set_manually_verified(&self, id: i64, verdict: ManualVerification) -> Result<()>;

    /// Resolved records still awaiting a manual verdict, ordered by name.
    fn pending_review(&self) -> Result<Vec<ArtistRecord>>;
}

/// SQLite-backed artist store. Holds only the database path; every
/// operation opens its own short-lived connection.
pub struct SqliteArtistStore {
    db_path: PathBuf,
}

impl SqliteArtistStore {
    /// Open (or create) the database and apply the schema migration.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let db_path = db_path.as_ref().to_path_buf();
        let existed = db_path.exists();

        let conn = Connection::open(&db_path)
            .with_context(|| format!("Failed to open artist database at {:?}", db_path))?;
        ensure_schema(&conn)?;

        if !existed {
            info!("Created new artist database at {:?}", db_path);
        }

        Ok(SqliteArtistStore { db_path })
    }

    fn open(&self) -> Result<Connection> {
        Connection::open(&self.db_path)
            .with_context(|| format!("Failed to open artist database at {:?}", self.db_path))
    }

    fn row_to_record(row: &rusqlite::Row) -> rusqlite::Result<ArtistRecord> {
        Ok(ArtistRecord {
            id: row.get("id")?,
            name: row.get("name")?,
            song_name: row.get("song_name")?,
            channel_url: row.get("channel_url")?,
            auto_verified: AutoVerification::from_db(row.get("auto_verified")?),
            manually_verified: ManualVerification::from_db(row.get("manually_verified")?),
        })
    }
}

impl ArtistStore for SqliteArtistStore {
    fn upsert_artist(&self, name: &str, song_name: Option<&str>) -> Result<bool> {
        let conn = self.open()?;
        let inserted = conn.execute(
            "INSERT OR IGNORE INTO artists (name) VALUES (?1)",
            params![name],
        )?;
        if let Some(song) = song_name {
            conn.execute(
                "UPDATE artists SET song_name = ?1
                 WHERE name = ?2 AND (song_name IS NULL OR song_name = '')",
                params![song, name],
            )?;
        }
        Ok(inserted > 0)
    }

    fn get_artist(&self, name: &str) -> Result<Option<ArtistRecord>> {
        let conn = self.open()?;
        let record = conn
            .prepare("SELECT * FROM artists WHERE name = ?1")?
            .query_row(params![name], Self::row_to_record)
            .optional()?;
        Ok(record)
    }

    fn pending_resolution(&self) -> Result<Vec<String>> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT name FROM artists
             WHERE channel_url IS NULL OR channel_url = ''
             ORDER BY name ASC",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(names)
    }

    fn pending_verification(&self) -> Result<Vec<ArtistRecord>> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM artists
             WHERE channel_url IS NOT NULL AND TRIM(channel_url) <> ''
               AND song_name IS NOT NULL AND TRIM(song_name) <> ''
               AND auto_verified IS NULL
             ORDER BY name ASC",
        )?;
        let records = stmt
            .query_map([], Self::row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }

    fn channel_for(&self, name: &str) -> Result<Option<String>> {
        let conn = self.open()?;
        let channel = conn
            .query_row(
                "SELECT channel_url FROM artists WHERE name = ?1",
                params![name],
                |row| row.get::<_, Option<String>>(0),
            )
            .optional()?
            .flatten()
            .filter(|url| !url.trim().is_empty());
        Ok(channel)
    }

    fn set_channel(&self, name: &str, channel_url: &str) -> Result<()> {
        if channel_url.trim().is_empty() {
            bail!("Refusing to cache an empty channel URL for '{}'", name);
        }
        let conn = self.open()?;
        let updated = conn.execute(
            "UPDATE artists SET channel_url = ?1 WHERE name = ?2",
            params![channel_url, name],
        )?;
        if updated == 0 {
            bail!("No artist named '{}' to set a channel for", name);
        }
        Ok(())
    }

    fn set_auto_verified(&self, id: i64, state: AutoVerification) -> Result<()> {
        let conn = self.open()?;
        let updated = conn.execute(
            "UPDATE artists SET auto_verified = ?1 WHERE id = ?2",
            params![state.as_db(), id],
        )?;
        if updated == 0 {
            bail!("No artist with id {} to auto-verify", id);
        }
        Ok(())
    }

    fn set_manually_verified(&self, id: i64, verdict: ManualVerification) -> Result<()> {
        let conn = self.open()?;
        let updated = conn.execute(
            "UPDATE artists SET manually_verified = ?1 WHERE id = ?2",
            params![verdict.as_db(), id],
        )?;
        if updated == 0 {
            bail!("No artist with id {} to record a verdict for", id);
        }
        Ok(())
    }

    fn pending_review(&self) -> Result<Vec<ArtistRecord>> {
        let conn = self.open()?;
        let mut stmt = conn.prepare(
            "SELECT * FROM artists
             WHERE channel_url IS NOT NULL AND TRIM(channel_url) <> ''
               AND song_name IS NOT NULL AND TRIM(song_name) <> ''
               AND (manually_verified IS NULL OR manually_verified = 0)
             ORDER BY name ASC",
        )?;
        let records = stmt
            .query_map([], Self::row_to_record)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(records)
    }
}
