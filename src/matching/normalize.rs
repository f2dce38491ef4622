//! Text canonicalization for artist-name and upload-title comparison.
//!
//! Two canonical forms exist. The resolver-grade *key* drops every separator
//! ("Daft Punk" -> "daftpunk") and is used when matching an artist name
//! against channel display names. The verifier-grade *phrase* keeps a single
//! space between words ("Get Lucky" -> "get lucky") and is used when matching
//! a song name against upload titles. The two forms must never be compared
//! against each other.

use unicode_normalization::UnicodeNormalization;

/// Words that carry no identity signal on the platform. Stripped from both
/// canonical forms before comparison.
const NOISE_TOKENS: &[&str] = &[
    "official",
    "music",
    "channel",
    "topic",
    "video",
    "audio",
    "lyric",
    "lyrics",
    "visualizer",
    "vevo",
    "mv",
];

/// Lowercase, apply Unicode compatibility normalization, split on anything
/// outside [a-z0-9] and drop noise tokens.
fn clean_tokens(text: &str) -> Vec<String> {
    let folded = text.nfkc().collect::<String>().to_lowercase();
    folded
        .split(|c: char| !c.is_ascii_alphanumeric())
        .filter(|token| !token.is_empty() && !NOISE_TOKENS.contains(token))
        .map(str::to_string)
        .collect()
}

/// Resolver-grade canonical form: all separators removed.
pub fn canonical_key(text: &str) -> String {
    clean_tokens(text).concat()
}

/// Verifier-grade canonical form: words joined by a single space.
pub fn canonical_phrase(text: &str) -> String {
    clean_tokens(text).join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_strips_separators_and_case() {
        assert_eq!(canonical_key("Daft Punk"), "daftpunk");
        assert_eq!(canonical_key("PLAT."), "plat");
        assert_eq!(canonical_key("plat.mp3"), "platmp3");
    }

    #[test]
    fn test_key_strips_noise_tokens() {
        assert_eq!(canonical_key("Daft Punk Official Music Channel"), "daftpunk");
        assert_eq!(canonical_key("QueenVEVO"), "queenvevo"); // only whole words are noise
        assert_eq!(canonical_key("Queen VEVO"), "queen");
        assert_eq!(canonical_key("Queen - Topic"), "queen");
    }

    #[test]
    fn test_phrase_keeps_single_spaces() {
        assert_eq!(
            canonical_phrase("Daft Punk - Get Lucky (Official Audio)"),
            "daft punk get lucky"
        );
        assert_eq!(
            canonical_phrase("Get Lucky (Live in Paris)"),
            "get lucky live in paris"
        );
        assert_eq!(canonical_phrase("  spaced   out  "), "spaced out");
    }

    #[test]
    fn test_compatibility_normalization() {
        // Fullwidth forms fold down to plain ASCII
        assert_eq!(canonical_key("Ｄａｆｔ Ｐｕｎｋ"), "daftpunk");
        // Non-ASCII letters that survive NFKC are treated as separators,
        // matching the [a-z0-9] alphabet of the comparison domain
        assert_eq!(canonical_key("Beyoncé"), "beyonc");
    }

    #[test]
    fn test_noise_only_input_is_empty() {
        assert_eq!(canonical_key("Official Music Video"), "");
        assert_eq!(canonical_phrase("Official Music Video"), "");
        assert_eq!(canonical_key(""), "");
    }

    #[test]
    fn test_idempotence() {
        let inputs = [
            "Daft Punk",
            "Daft Punk - Get Lucky (Official Audio)",
            "PLAT.",
            "Queen - Topic",
            "Ｄａｆｔ Ｐｕｎｋ",
            "Beyoncé",
            "Official Music Video",
            "",
            "The Chemical Brothers",
        ];
        for input in inputs {
            let key = canonical_key(input);
            assert_eq!(canonical_key(&key), key, "key not idempotent for {:?}", input);
            let phrase = canonical_phrase(input);
            assert_eq!(
                canonical_phrase(&phrase),
                phrase,
                "phrase not idempotent for {:?}",
                input
            );
        }
    }
}
