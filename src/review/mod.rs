//! Manual-review support.
//!
//! The human-facing review front end lives outside this crate; what lives
//! here is its data contract: the pending-review queue (ranked by the
//! review-list priority index), the per-channel metadata cache it displays,
//! and the verdict write-back.

mod channel_meta;
mod export;

pub use channel_meta::{ChannelMetadata, ChannelMetadataFetcher};
pub use export::{load_priority_index, ReviewCsv};

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;

use crate::artist_store::{ArtistRecord, ArtistStore, ManualVerification};

/// Rank given to channels that never appeared in the review list; they sort
/// after every listed channel.
const UNRANKED: usize = 999_999;

pub struct ReviewQueue {
    store: Arc<dyn ArtistStore>,
    /// channel URL -> 1-based review-list row.
    priority: HashMap<String, usize>,
}

impl ReviewQueue {
    pub fn new(store: Arc<dyn ArtistStore>, priority: HashMap<String, usize>) -> Self {
        Self { store, priority }
    }

    fn rank(&self, record: &ArtistRecord) -> usize {
        record
            .channel_url
            .as_deref()
            .and_then(|url| self.priority.get(url).copied())
            .unwrap_or(UNRANKED)
    }

    /// Every record awaiting a manual verdict, review-list order first,
    /// then name.
    pub fn pending(&self) -> Result<Vec<ArtistRecord>> {
        let mut records = self.store.pending_review()?;
        // The store returns name order; the stable sort keeps it within ranks
        records.sort_by_key(|record| self.rank(record));
        Ok(records)
    }

    /// The next record the reviewer should look at.
    pub fn next_pending(&self) -> Result<Option<ArtistRecord>> {
        Ok(self.pending()?.into_iter().next())
    }

    /// Verdict write-back, by row id.
    pub fn record_verdict(&self, id: i64, verdict: ManualVerification) -> Result<()> {
        self.store.set_manually_verified(id, verdict)
    }
}
