//! Records and tri-state verification flags for the artist table.

use std::fmt;

/// Automatic verification state, written by the verifier.
///
/// Stored as a nullable integer: NULL = unknown, 1 = confirmed,
/// 0 = rejected. Unknown means no verification evidence has been gathered
/// yet (including tool-unavailable runs), so the record stays eligible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AutoVerification {
    #[default]
    Unknown,
    Confirmed,
    Rejected,
}

impl AutoVerification {
    pub fn from_db(value: Option<i64>) -> Self {
        match value {
            None => AutoVerification::Unknown,
            Some(1) => AutoVerification::Confirmed,
            Some(_) => AutoVerification::Rejected,
        }
    }

    pub fn as_db(&self) -> Option<i64> {
        match self {
            AutoVerification::Unknown => None,
            AutoVerification::Confirmed => Some(1),
            AutoVerification::Rejected => Some(0),
        }
    }
}

/// Manual verdict, written back by the review collaborator.
///
/// Stored as a nullable integer: NULL or 0 = pending, 1 = confirmed,
/// -1 = rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ManualVerification {
    #[default]
    Pending,
    Confirmed,
    Rejected,
}

impl ManualVerification {
    pub fn from_db(value: Option<i64>) -> Self {
        match value {
            Some(1) => ManualVerification::Confirmed,
            Some(v) if v < 0 => ManualVerification::Rejected,
            _ => ManualVerification::Pending,
        }
    }

    pub fn as_db(&self) -> Option<i64> {
        match self {
            ManualVerification::Pending => None,
            ManualVerification::Confirmed => Some(1),
            ManualVerification::Rejected => Some(-1),
        }
    }
}

/// One artist row. The name is the unique key; everything else is filled in
/// by ingestion, the resolver, the verifier, and the review collaborator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistRecord {
    pub id: i64,
    pub name: String,
    /// First song seen for this artist during ingestion.
    pub song_name: Option<String>,
    /// Resolved channel URL (the resolution cache value).
    pub channel_url: Option<String>,
    pub auto_verified: AutoVerification,
    pub manually_verified: ManualVerification,
}

impl fmt::Display for ArtistRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
