//! Artist table bootstrap and additive column migration.
//!
//! The table began life as (id, name); every later column arrives through a
//! check-then-add migration so a database created by any earlier version
//! opens cleanly. Migrations only ever add nullable columns — existing data
//! is never rewritten or dropped.

use anyhow::{Context, Result};
use rusqlite::Connection;
use tracing::info;

const CREATE_ARTISTS_TABLE: &str = "CREATE TABLE IF NOT EXISTS artists (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE
)";

/// Columns added after the initial schema, in the order they appeared.
const ADDITIVE_COLUMNS: &[(&str, &str)] = &[
    ("song_name", "TEXT"),
    ("channel_url", "TEXT"),
    ("auto_verified", "INTEGER"),
    ("manually_verified", "INTEGER"),
];

/// Create the table if missing and add any columns this version knows about
/// that the database does not have yet. Safe to call on every startup.
pub fn ensure_schema(conn: &Connection) -> Result<()> {
    conn.execute(CREATE_ARTISTS_TABLE, [])
        .context("Failed to create artists table")?;

    let existing = column_names(conn, "artists")?;
    for (name, sql_type) in ADDITIVE_COLUMNS {
        if !existing.iter().any(|column| column == name) {
            conn.execute(
                &format!("ALTER TABLE artists ADD COLUMN {} {}", name, sql_type),
                [],
            )
            .with_context(|| format!("Failed to add column {}", name))?;
            info!("Added '{}' column to artists table", name);
        }
    }

    Ok(())
}

fn column_names(conn: &Connection, table: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", table))?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(names)
}
