//! Channel verification: does the resolved channel actually host the
//! artist's representative song?
//!
//! A verification unit searches within the channel for the song, scores the
//! uploads it finds, and writes the resulting confidence flag. A confident
//! hit confirms the record; a scored-but-unconvincing result rejects it and
//! exports the record to the review list for a human. An unavailable search
//! tool writes nothing — absence of evidence is not evidence of absence.

use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use tracing::{info, warn};

use crate::artist_store::{ArtistRecord, ArtistStore, AutoVerification};
use crate::matching::normalize::canonical_phrase;
use crate::matching::scorer::{score_upload_candidate, MatchScope};
use crate::media_search::{MediaSearch, UploadHit};
use crate::review::ReviewCsv;

/// Outcome of one verification unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// A matching upload was found on the channel.
    Confirmed { upload_url: String },
    /// The channel was searched but nothing matched confidently.
    Rejected,
    /// The search tool gave no evidence; the record stays unverified.
    Unavailable,
}

pub struct ChannelVerifier {
    store: Arc<dyn ArtistStore>,
    search: Arc<dyn MediaSearch>,
    /// Review list for misses; shared across concurrent workers.
    review_log: Option<Mutex<ReviewCsv>>,
}

impl ChannelVerifier {
    pub fn new(
        store: Arc<dyn ArtistStore>,
        search: Arc<dyn MediaSearch>,
        review_log: Option<ReviewCsv>,
    ) -> Self {
        Self {
            store,
            search,
            review_log: review_log.map(Mutex::new),
        }
    }

    /// Verify one record. Requires both a channel and a song; callers get
    /// records from the pending-verification batch, which guarantees that.
    pub async fn verify(&self, record: &ArtistRecord) -> Result<Verdict> {
        let (Some(channel_url), Some(song)) = (&record.channel_url, &record.song_name) else {
            bail!("Record '{}' is missing a channel or a song", record.name);
        };

        let hits = match self.search.search_channel_uploads(channel_url, song).await {
            Ok(hits) => hits,
            Err(err) => {
                warn!(
                    "Verification search unavailable for '{}' on {}: {}",
                    record.name, channel_url, err
                );
                return Ok(Verdict::Unavailable);
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
                self.store
                    .set_auto_verified(record.id, AutoVerification::Confirmed)?;
                info!(
                    "Verified '{}': {} ({:.2})",
                    record.name, hit.url, score
                );
                Ok(Verdict::Confirmed {
                    upload_url: hit.url.clone(),
                })
            }
            _ => {
                self.store
                    .set_auto_verified(record.id, AutoVerification::Rejected)?;
                if let Some(log) = &self.review_log {
                    log.lock()
                        .unwrap()
                        .append(&record.name, song, channel_url)?;
                }
                info!("No confident upload for '{}' on {}", record.name, channel_url);
                Ok(Verdict::Rejected)
            }
        }
    }
}
