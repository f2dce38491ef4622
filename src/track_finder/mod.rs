//! Three-tier track lookup.
//!
//! Given a song and artist, try in order: (1) a search inside the artist's
//! resolved channel, accepted with verification-scope scoring; (2) the
//! in-process content cache primed by an album-scoped listing; (3) a global
//! upload search, taking the first hit. Every tier treats an unavailable
//! search tool as "no evidence" and falls through.
//!
//! The content cache is shared across workers. A reader that finds the
//! artist already cached exits fast; two workers racing on a cold artist may
//! each run one redundant listing, and the first insert wins.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::artist_store::ArtistStore;
use crate::matching::normalize::canonical_phrase;
use crate::matching::scorer::{score_upload_candidate, MatchScope};
use crate::matching::similarity::similarity_ratio;
use crate::media_search::{MediaSearch, UploadHit};

/// Cached-listing titles containing any of these are never picked.
const SKIP_PHRASES: &[&str] = &[
    "live",
    "visualiser",
    "shorts",
    "behind",
    "acoustic",
    "performance",
];
/// Cached-listing titles containing any of these get a flat boost.
const PREFER_PHRASES: &[&str] = &["lyric", "official audio", "audio"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackMatch {
    pub upload_url: String,
    /// The channel the match came from, when it came from one.
    pub channel_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct TrackFinderSettings {
    /// Over-fetch size for album-scoped cache priming.
    pub search_limit: usize,
    /// Result count for the global fallback search.
    pub fallback_limit: usize,
}

impl Default for TrackFinderSettings {
    fn default() -> Self {
        Self {
            search_limit: 20,
            fallback_limit: 5,
        }
    }
}

pub struct TrackFinder {
    store: Arc<dyn ArtistStore>,
    search: Arc<dyn MediaSearch>,
    settings: TrackFinderSettings,
    /// Lowercased artist name -> cached upload listing.
    cache: RwLock<HashMap<String, Vec<UploadHit>>>,
}

impl TrackFinder {
    pub fn new(
        store: Arc<dyn ArtistStore>,
        search: Arc<dyn MediaSearch>,
        settings: TrackFinderSettings,
    ) -> Self {
        Self {
            store,
            search,
            settings,
            cache: RwLock::new(HashMap::new()),
        }
    }

    pub async fn find_track(
        &self,
        song: &str,
        artist: &str,
        album: Option<&str>,
    ) -> Result<Option<TrackMatch>> {
        if song.is_empty() {
            return Ok(None);
        }

        let channel_url = self.store.channel_for(artist)?;

        // Tier 1: search the resolved channel directly
        if let Some(channel) = &channel_url {
            if let Some(upload_url) = self.search_in_channel(channel, song).await {
                return Ok(Some(TrackMatch {
                    upload_url,
                    channel_url: channel_url.clone(),
                }));
            }
        }

        // Tier 2: album-primed content cache
        if let Some(album) = album {
            self.prime_cache(artist, channel_url.as_deref(), album).await;
        }
        if let Some(upload_url) = self.best_from_cache(artist, song).await {
            info!("Matched '{}' from cached listing for {}", song, artist);
            return Ok(Some(TrackMatch {
                upload_url,
                channel_url,
            }));
        }

        // Tier 3: global fallback, first hit wins
        let query = format!("{} {}", artist, song);
        match self
            .search
            .search_uploads(&query, self.settings.fallback_limit)
            .await
        {
            Ok(hits) => Ok(hits.into_iter().next().map(|hit| {
                info!("Global fallback match for '{}' -> {}", song, hit.url);
                TrackMatch {
                    upload_url: hit.url,
                    channel_url: None,
                }
            })),
            Err(err) => {
                warn!("Global fallback search failed for '{}': {}", query, err);
                Ok(None)
            }
        }
    }

    async fn search_in_channel(&self, channel_url: &str, song: &str) -> Option<String> {
        let hits = match self.search.search_channel_uploads(channel_url, song).await {
            Ok(hits) => hits,
            Err(err) => {
                warn!("Channel search failed on {}: {}", channel_url, err);
                return None;
            }
        };

        let song_phrase = canonical_phrase(song);
        let mut best: Option<(f64, &UploadHit)> = None;
        for hit in &hits {
            let score = score_upload_candidate(&song_phrase, &hit.title);
            if best.map_or(true, |(best_score, _)| score > best_score) {
                best = Some((score, hit));
            }
        }

        match best {
            Some((score, hit)) if MatchScope::Verification.accepts(score) => {
                info!("Found '{}' on channel -> {} ({:.2})", song, hit.url, score);
                Some(hit.url.clone())
            }
            _ => {
                debug!("No confident channel match for '{}' on {}", song, channel_url);
                None
            }
        }
    }

    /// Fill the content cache for an artist from an album-scoped listing.
    /// No-op when already cached; failures leave it unprimed (retryable).
    async fn prime_cache(&self, artist: &str, channel_url: Option<&str>, album: &str) {
        let cache_key = artist.to_lowercase();
        if self.cache.read().await.contains_key(&cache_key) {
            return;
        }

        let listing = match channel_url {
            Some(channel) => self.search.search_channel_uploads(channel, album).await,
            None => {
                let query = format!("{} {}", artist, album);
                self.search
                    .search_uploads(&query, self.settings.search_limit)
                    .await
            }
        };

        match listing {
            Ok(hits) => {
                info!("Cached {} uploads for {} - {}", hits.len(), artist, album);
                let mut cache = self.cache.write().await;
                cache.entry(cache_key).or_insert(hits);
            }
            Err(err) => warn!("Album listing failed for {} - {}: {}", artist, album, err),
        }
    }

    async fn best_from_cache(&self, artist: &str, song: &str) -> Option<String> {
        let cache = self.cache.read().await;
        let hits = cache.get(&artist.to_lowercase())?;

        let song_lower = song.to_lowercase();
        let mut best: Option<(f64, &UploadHit)> = None;
        for hit in hits {
            let title_lower = hit.title.to_lowercase();
            if SKIP_PHRASES.iter().any(|p| title_lower.contains(p)) {
                continue;
            }
            let mut score = similarity_ratio(&song_lower, &title_lower);
            if PREFER_PHRASES.iter().any(|p| title_lower.contains(p)) {
                score += 0.2;
            }
            if best.map_or(true, |(best_score, _)| score > best_score) {
                best = Some((score, hit));
            }
        }

        best.map(|(_, hit)| hit.url.clone())
    }
}
