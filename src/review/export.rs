//! Auxiliary review list.
//!
//! Verification misses are appended to a small CSV file. The manual-review
//! collaborator reads the file back, and its row order becomes the priority
//! index used to rank the pending-review queue: earlier misses are reviewed
//! first.

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

const HEADER: &str = "artist_name,song_name,channel_url";

/// Append-only writer for the review list. Creating it truncates any
/// previous file and writes the header row.
pub struct ReviewCsv {
    writer: BufWriter<File>,
}

impl ReviewCsv {
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create review list at {:?}", path.as_ref()))?;
        let mut writer = BufWriter::new(file);
        writeln!(writer, "{}", HEADER)?;
        writer.flush()?;
        Ok(Self { writer })
    }

    /// Write one miss and flush, so a cancelled batch still leaves a
    /// complete file behind.
    pub fn append(&mut self, artist: &str, song: &str, channel_url: &str) -> Result<()> {
        writeln!(
            self.writer,
            "{},{},{}",
            csv_field(artist),
            csv_field(song),
            csv_field(channel_url)
        )?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Read a review list back into a channel-URL -> 1-based row index map.
/// A missing file yields an empty map (nothing has been exported yet).
pub fn load_priority_index<P: AsRef<Path>>(path: P) -> Result<HashMap<String, usize>> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(HashMap::new());
    }

    let reader = BufReader::new(
        File::open(path).with_context(|| format!("Failed to open review list at {:?}", path))?,
    );

    let mut index = HashMap::new();
    for (position, line) in reader.lines().skip(1).enumerate() {
        let line = line?;
        let fields = parse_csv_line(&line);
        if let Some(url) = fields.get(2) {
            if !url.is_empty() {
                index.entry(url.clone()).or_insert(position + 1);
            }
        }
    }
    Ok(index)
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    current.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_roundtrip_priority_index() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("misses.csv");

        {
            let mut csv = ReviewCsv::create(&path).unwrap();
            csv.append("Daft Punk", "Get Lucky", "https://x/@daftpunk").unwrap();
            csv.append("Queen", "Bohemian Rhapsody", "https://x/@queen").unwrap();
        }

        let index = load_priority_index(&path).unwrap();
        assert_eq!(index.get("https://x/@daftpunk"), Some(&1));
        assert_eq!(index.get("https://x/@queen"), Some(&2));
        assert_eq!(index.get("https://x/@unknown"), None);
    }

    #[test]
    fn test_fields_with_commas_and_quotes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("misses.csv");

        {
            let mut csv = ReviewCsv::create(&path).unwrap();
            csv.append(
                "Crosby, Stills & Nash",
                "Song \"Title\"",
                "https://x/@csn",
            )
            .unwrap();
        }

        let index = load_priority_index(&path).unwrap();
        assert_eq!(index.get("https://x/@csn"), Some(&1));

        let line = "\"Crosby, Stills & Nash\",\"Song \"\"Title\"\"\",https://x/@csn";
        let fields = parse_csv_line(line);
        assert_eq!(fields[0], "Crosby, Stills & Nash");
        assert_eq!(fields[1], "Song \"Title\"");
        assert_eq!(fields[2], "https://x/@csn");
    }

    #[test]
    fn test_missing_file_is_empty_index() {
        let dir = TempDir::new().unwrap();
        let index = load_priority_index(dir.path().join("nope.csv")).unwrap();
        assert!(index.is_empty());
    }

    #[test]
    fn test_duplicate_channel_keeps_first_position() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("misses.csv");

        {
            let mut csv = ReviewCsv::create(&path).unwrap();
            csv.append("A", "S1", "https://x/@dup").unwrap();
            csv.append("B", "S2", "https://x/@dup").unwrap();
        }

        let index = load_priority_index(&path).unwrap();
        assert_eq!(index.get("https://x/@dup"), Some(&1));
    }
}
