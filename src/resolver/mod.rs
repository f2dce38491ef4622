//! Channel resolution.
//!
//! Per artist key the flow is: consult the cache (the stored channel URL);
//! on a miss, run one global channel search shaped as
//! "<artist> official channel", score every candidate, and persist the best
//! one if it clears the acceptance bar. A miss, a below-bar best, or an
//! unavailable search tool all leave the record untouched and retryable.
//!
//! Concurrent resolutions of the same key collapse into a single search:
//! a per-key async lock serializes them, and whoever waited re-checks the
//! cache before searching.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::artist_store::ArtistStore;
use crate::matching::normalize::canonical_key;
use crate::matching::scorer::{score_channel_candidate, MatchScope};
use crate::media_search::{ChannelHit, MediaSearch};

/// Outcome of one resolution attempt. Only `Resolved` mutated storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The cache already held a channel; no external search ran.
    CacheHit(String),
    /// A fresh search produced an accepted candidate, now cached.
    Resolved(String),
    /// Candidates were scored but none met the acceptance bar.
    NoMatch,
    /// The external tool gave no evidence; the record stays retryable.
    SearchUnavailable,
}

#[derive(Debug, Clone)]
pub struct ResolverSettings {
    /// How many results to over-fetch from the global search.
    pub search_limit: usize,
    /// Host prefixed onto relative channel URLs.
    pub host: String,
}

impl Default for ResolverSettings {
    fn default() -> Self {
        Self {
            search_limit: 20,
            host: "https://www.youtube.com".to_string(),
        }
    }
}

pub struct ChannelResolver {
    store: Arc<dyn ArtistStore>,
    search: Arc<dyn MediaSearch>,
    settings: ResolverSettings,
    /// Per-key locks enforcing the single-flight guarantee.
    inflight: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl ChannelResolver {
    pub fn new(
        store: Arc<dyn ArtistStore>,
        search: Arc<dyn MediaSearch>,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            store,
            search,
            settings,
            inflight: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve one artist. Errors are persistence failures only; search
    /// failures come back as [`Resolution::SearchUnavailable`].
    pub async fn resolve(&self, artist: &str) -> Result<Resolution> {
        if let Some(url) = self.store.channel_for(artist)? {
            return Ok(Resolution::CacheHit(url));
        }

        // Entries live for the process lifetime, bounded by the batch
        // snapshot; removing them would let a fresh arrival race a waiter
        // still holding the old lock.
        let key_lock = {
            let mut inflight = self.inflight.lock().await;
            inflight.entry(artist.to_string()).or_default().clone()
        };
        let _guard = key_lock.lock().await;

        // Another worker may have finished this key while we waited.
        if let Some(url) = self.store.channel_for(artist)? {
            return Ok(Resolution::CacheHit(url));
        }

        self.search_and_select(artist).await
    }

    async fn search_and_select(&self, artist: &str) -> Result<Resolution> {
        let query = format!("{} official channel", artist);
        let hits = match self
            .search
            .search_channels(&query, self.settings.search_limit)
            .await
        {
            Ok(hits) => hits,
            Err(err) => {
                warn!("Channel search unavailable for '{}': {}", artist, err);
                return Ok(Resolution::SearchUnavailable);
            }
        };

        let artist_key = canonical_key(artist);
        let mut best: Option<(f64, &ChannelHit)> = None;
        for hit in &hits {
            let Some(score) =
                score_channel_candidate(&artist_key, &hit.display_name, &hit.channel_url)
            else {
                continue;
            };
            // Strictly-greater keeps the earliest candidate on ties
            if best.map_or(true, |(best_score, _)| score > best_score) {
                best = Some((score, hit));
            }
        }

        let Some((score, hit)) = best else {
            info!("No scoreable channel candidates for '{}'", artist);
            return Ok(Resolution::NoMatch);
        };

        if !MatchScope::Resolution.accepts(score) {
            info!(
                "No confident channel for '{}' (best {:.2} below bar)",
                artist, score
            );
            return Ok(Resolution::NoMatch);
        }

        let url = self.absolute_url(&hit.channel_url);
        self.store.set_channel(artist, &url)?;
        info!("Resolved '{}' -> {} ({:.2})", artist, url, score);
        Ok(Resolution::Resolved(url))
    }

    fn absolute_url(&self, channel_url: &str) -> String {
        if channel_url.starts_with("https://") {
            channel_url.to_string()
        } else {
            format!("{}{}", self.settings.host.trim_end_matches('/'), channel_url)
        }
    }
}
