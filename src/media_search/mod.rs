//! External media-index search capability.
//!
//! Everything the engine knows about the outside platform flows through the
//! [`MediaSearch`] trait: a global channel search, upload searches (global or
//! scoped to one channel), and plain channel listings. The production
//! implementation shells out to a command-line search tool; tests substitute
//! scripted fakes.
//!
//! The tool prints newline-delimited records with " | " separated fields.
//! Lines with too few fields are skipped silently — they are noise from the
//! tool, not errors. A [`SearchError`] means no evidence was gathered; it
//! must never be read as confirmed absence.

mod yt_dlp;

pub use yt_dlp::YtDlpSearch;

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

/// Failures of the external search tool. All variants are recoverable: the
/// query may simply be retried on a future run.
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search tool timed out after {0}s")]
    Timeout(u64),

    #[error("search tool exited with {0}")]
    ToolFailed(String),

    #[error("failed to launch search tool: {0}")]
    Spawn(#[from] std::io::Error),
}

/// A channel surfaced by a global channel search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelHit {
    pub display_name: String,
    pub channel_url: String,
}

/// An upload surfaced by an upload search (three-field shape).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadHit {
    pub title: String,
    pub uploader: String,
    pub url: String,
}

/// An upload from a plain channel listing (two-field shape, no uploader).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelUpload {
    pub title: String,
    pub url: String,
}

#[async_trait]
pub trait MediaSearch: Send + Sync {
    /// Global channel search, over-fetching up to `limit` results.
    async fn search_channels(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<ChannelHit>, SearchError>;

    /// Search uploads within one channel.
    async fn search_channel_uploads(
        &self,
        channel_url: &str,
        query: &str,
    ) -> Result<Vec<UploadHit>, SearchError>;

    /// Global upload search, up to `limit` results.
    async fn search_uploads(
        &self,
        query: &str,
        limit: usize,
    ) -> Result<Vec<UploadHit>, SearchError>;

    /// Plain listing of a channel's uploads, newest first.
    async fn list_channel_uploads(
        &self,
        channel_url: &str,
    ) -> Result<Vec<ChannelUpload>, SearchError>;
}

/// Split one output line into exactly `fields` trimmed parts.
/// Returns `None` for malformed lines (too few fields).
fn split_fields(line: &str, fields: usize) -> Option<Vec<&str>> {
    let parts: Vec<&str> = line.split('|').map(str::trim).collect();
    if parts.len() < fields {
        debug!("skipping malformed result line: {:?}", line);
        return None;
    }
    Some(parts[..fields].to_vec())
}

pub(crate) fn parse_channel_hits(output: &str) -> Vec<ChannelHit> {
    output
        .lines()
        .filter_map(|line| {
            let parts = split_fields(line, 2)?;
            let (display_name, channel_url) = (parts[0], parts[1]);
            if display_name.is_empty() || channel_url.is_empty() {
                return None;
            }
            Some(ChannelHit {
                display_name: display_name.to_string(),
                channel_url: channel_url.to_string(),
            })
        })
        .collect()
}

pub(crate) fn parse_upload_hits(output: &str) -> Vec<UploadHit> {
    output
        .lines()
        .filter_map(|line| {
            let parts = split_fields(line, 3)?;
            let (title, uploader, url) = (parts[0], parts[1], parts[2]);
            if title.is_empty() || url.is_empty() {
                return None;
            }
            Some(UploadHit {
                title: title.to_string(),
                uploader: uploader.to_string(),
                url: url.to_string(),
            })
        })
        .collect()
}

pub(crate) fn parse_channel_uploads(output: &str) -> Vec<ChannelUpload> {
    output
        .lines()
        .filter_map(|line| {
            let parts = split_fields(line, 2)?;
            let (title, url) = (parts[0], parts[1]);
            if title.is_empty() || url.is_empty() {
                return None;
            }
            Some(ChannelUpload {
                title: title.to_string(),
                url: url.to_string(),
            })
        })
        .collect()
}
