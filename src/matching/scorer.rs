//! Candidate scoring for channel resolution and upload verification.
//!
//! The base score is the similarity ratio between two canonical forms, then
//! scope-specific bonuses and penalties are layered on top. Token checks run
//! against the lowercased raw text, not the canonical form — the canonical
//! forms strip words like "audio" as noise.
//!
//! Acceptance is thresholded per scope: a best candidate below the bar is
//! reported as no match, never as a low-confidence guess.

use super::normalize::{canonical_key, canonical_phrase};
use super::similarity::similarity_ratio;

/// Minimum accepted score for a channel candidate.
pub const RESOLUTION_THRESHOLD: f64 = 0.6;
/// Minimum accepted score for an upload candidate within a channel.
pub const VERIFICATION_THRESHOLD: f64 = 0.4;
/// Channel candidates whose canonical-key length differs from the artist's
/// by more than this are discarded before scoring.
pub const MAX_KEY_LENGTH_DELTA: usize = 3;

/// Tokens marking uploads worth preferring (official audio over clutter).
const PREFER_TOKENS: &[&str] = &["lyric", "audio"];
/// Tokens marking uploads that are usually not the canonical recording.
const AVOID_TOKENS: &[&str] = &["live", "remix", "cover", "performance"];
/// Marker the platform puts in URLs of channels it has designated as the
/// artist's own.
const OFFICIAL_ARTIST_CHANNEL_MARKER: &str = "officialartistchannel";

/// Query context selecting which adjustment set and threshold apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchScope {
    /// Global search for an artist's channel.
    Resolution,
    /// Search for a song within an already-resolved channel.
    Verification,
}

impl MatchScope {
    pub fn threshold(&self) -> f64 {
        match self {
            MatchScope::Resolution => RESOLUTION_THRESHOLD,
            MatchScope::Verification => VERIFICATION_THRESHOLD,
        }
    }

    /// Whether a best-candidate score clears this scope's acceptance bar.
    pub fn accepts(&self, score: f64) -> bool {
        score >= self.threshold()
    }

    fn avoid_penalty(&self) -> f64 {
        match self {
            MatchScope::Resolution => 0.05,
            MatchScope::Verification => 0.1,
        }
    }
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

/// Score a channel candidate against an artist name (resolution scope).
///
/// Returns `None` when the candidate fails the key-length pre-filter — that
/// is a cheap discard applied before scoring, not a score adjustment.
pub fn score_channel_candidate(
    artist_key: &str,
    display_name: &str,
    channel_url: &str,
) -> Option<f64> {
    let candidate_key = canonical_key(display_name);
    if artist_key.len().abs_diff(candidate_key.len()) > MAX_KEY_LENGTH_DELTA {
        return None;
    }

    let raw = display_name.to_lowercase();
    let mut score = similarity_ratio(artist_key, &candidate_key);

    if contains_any(&raw, PREFER_TOKENS) {
        score += 0.1;
    }
    if contains_any(&raw, AVOID_TOKENS) {
        score -= MatchScope::Resolution.avoid_penalty();
    }

    // Equality and containment are mutually exclusive: an empty key would
    // otherwise satisfy containment trivially and collect both.
    if artist_key == candidate_key {
        score += 0.3;
    } else if !artist_key.is_empty()
        && !candidate_key.is_empty()
        && (candidate_key.contains(artist_key) || artist_key.contains(candidate_key.as_str()))
    {
        score += 0.2;
    }

    if raw.contains("official") {
        score += 0.1;
    }

    let url = channel_url.to_lowercase();
    if url.contains("/@") {
        score += 0.15;
    }
    if url.contains(OFFICIAL_ARTIST_CHANNEL_MARKER) {
        score += 0.25;
    }

    Some(score)
}

/// Score an upload title against a song name (verification scope).
///
/// `song_phrase` must already be the verifier-grade canonical form of the
/// song name; the title is canonicalized here so both sides match.
pub fn score_upload_candidate(song_phrase: &str, title: &str) -> f64 {
    let title_phrase = canonical_phrase(title);
    let raw = title.to_lowercase();

    let mut score = similarity_ratio(song_phrase, &title_phrase);

    if contains_any(&raw, PREFER_TOKENS) {
        score += 0.1;
    }
    if contains_any(&raw, AVOID_TOKENS) {
        score -= MatchScope::Verification.avoid_penalty();
    }
    if song_phrase == title_phrase {
        score += 0.3;
    }

    score
}
