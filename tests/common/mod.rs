//! Common test infrastructure
//!
//! A scripted stand-in for the external search tool plus a seeded store,
//! so end-to-end tests can drive the real resolver/verifier/runner without
//! touching the network or a subprocess.

// Each test binary uses a different subset of these helpers
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tempfile::TempDir;
use tubematch::artist_store::{ArtistStore, SqliteArtistStore};
use tubematch::media_search::{ChannelHit, ChannelUpload, MediaSearch, SearchError, UploadHit};

/// Scripted search tool. Channel results are keyed by the full query
/// string, upload results by channel URL; anything unscripted comes back
/// empty. Queries listed in `unavailable_markers` simulate a tool timeout.
#[derive(Default)]
pub struct ScriptedSearch {
    pub channels_by_query: HashMap<String, Vec<ChannelHit>>,
    pub uploads_by_channel: HashMap<String, Vec<UploadHit>>,
    pub unavailable_markers: Vec<String>,
    pub channel_search_calls: AtomicUsize,
    pub upload_search_calls: AtomicUsize,
}

impl ScriptedSearch {
    pub fn channel_search_count(&self) -> usize {
        self.channel_search_calls.load(Ordering::SeqCst)
    }

    fn is_unavailable(&self, subject: &str) -> bool {
        self.unavailable_markers
            .iter()
            .any(|marker| subject.contains(marker.as_str()))
    }
}

#[async_trait]
impl MediaSearch for ScriptedSearch {
    async fn search_channels(
        &self,
        query: &str,
        _limit: usize,
    ) -> Result<Vec<ChannelHit>, SearchError> {
        self.channel_search_calls.fetch_add(1, Ordering::SeqCst);
        if self.is_unavailable(query) {
            return Err(SearchError::Timeout(12));
        }
        Ok(self
            .channels_by_query
            .get(query)
            .cloned()
            .unwrap_or_default())
    }

    async fn search_channel_uploads(
        &self,
        channel_url: &str,
        _query: &str,
    ) -> Result<Vec<UploadHit>, SearchError> {
        self.upload_search_calls.fetch_add(1, Ordering::SeqCst);
        if self.is_unavailable(channel_url) {
            return Err(SearchError::Timeout(12));
        }
        Ok(self
            .uploads_by_channel
            .get(channel_url)
            .cloned()
            .unwrap_or_default())
    }

    async fn search_uploads(
        &self,
        _query: &str,
        _limit: usize,
    ) -> Result<Vec<UploadHit>, SearchError> {
        Ok(Vec::new())
    }

    async fn list_channel_uploads(
        &self,
        _channel_url: &str,
    ) -> Result<Vec<ChannelUpload>, SearchError> {
        Ok(Vec::new())
    }
}

pub fn channel(display_name: &str, channel_url: &str) -> ChannelHit {
    ChannelHit {
        display_name: display_name.to_string(),
        channel_url: channel_url.to_string(),
    }
}

pub fn upload(title: &str, url: &str) -> UploadHit {
    UploadHit {
        title: title.to_string(),
        uploader: "uploader".to_string(),
        url: url.to_string(),
    }
}

/// A store in a temp directory, seeded with (artist, song) pairs.
pub fn seeded_store(pairs: &[(&str, Option<&str>)]) -> (Arc<SqliteArtistStore>, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = SqliteArtistStore::new(dir.path().join("artists.db")).unwrap();
    for (name, song) in pairs {
        store.upsert_artist(name, *song).unwrap();
    }
    (Arc::new(store), dir)
}
