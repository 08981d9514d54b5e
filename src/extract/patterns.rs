//! Deterministic claim extraction fallback.
//!
//! Splits text into sentences and keeps those whose structure suggests a
//! verifiable statement of fact. Used whenever the language-model strategy is
//! unavailable or misbehaves, so it must never fail and must behave the same
//! on every run.

use regex::Regex;
use std::sync::OnceLock;

/// Minimum sentence length considered a candidate claim.
const MIN_SENTENCE_LEN: usize = 10;

/// Inputs longer than this fall back to a single whole-text claim when no
/// sentence matches.
const MIN_WHOLE_TEXT_LEN: usize = 5;

/// Maximum number of claims returned.
const MAX_CLAIMS: usize = 5;

fn claim_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // Copulas
            r"(?i)\b(is|are|was|were)\b",
            // Auxiliary verbs
            r"(?i)\b(has|have|had)\b",
            // Modal verbs
            r"(?i)\b(will|would|can|could|should|must)\b",
            // Reporting verbs
            r"(?i)\b(announced|reported|said|stated|confirmed|claimed|revealed)\b",
            // Definite-article statements
            r"(?i)^the\s+\w+",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

/// Extract candidate claims from free text without any external collaborator.
///
/// Returns between 0 and 5 claims. If no sentence qualifies and the trimmed
/// input is longer than 5 characters, the whole trimmed input is returned as
/// a single claim.
#[must_use]
pub fn extract_claims(text: &str) -> Vec<String> {
    let patterns = claim_patterns();

    let mut claims: Vec<String> = text
        .split(['.', '!', '?'])
        .map(str::trim)
        .filter(|sentence| {
            sentence.len() >= MIN_SENTENCE_LEN
                && patterns.iter().any(|p| p.is_match(sentence))
        })
        .map(ToString::to_string)
        .collect();

    claims.truncate(MAX_CLAIMS);

    if claims.is_empty() {
        let trimmed = text.trim();
        if trimmed.len() > MIN_WHOLE_TEXT_LEN {
            claims.push(trimmed.to_string());
        }
    }

    claims
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_copula_sentences() {
        let claims = extract_claims("The sky is blue today. I like turtles a lot maybe.");
        assert!(claims.iter().any(|c| c.contains("sky is blue")));
    }

    #[test]
    fn extracts_reporting_sentences() {
        let claims =
            extract_claims("Apple announced a new chip yesterday. Reuters reported record profits.");
        assert_eq!(claims.len(), 2);
    }

    #[test]
    fn caps_at_five_claims() {
        let text = "Rust is fast. Go is simple. C is old. Java is verbose. \
                    Python is slow. Zig is new. Perl is terse.";
        let claims = extract_claims(text);
        assert_eq!(claims.len(), 5);
    }

    #[test]
    fn short_sentences_are_skipped() {
        // "It is." matches a copula but is under the length floor, so the
        // whole input comes back as one claim.
        let claims = extract_claims("It is.");
        assert_eq!(claims, vec!["It is.".to_string()]);
    }

    #[test]
    fn whole_text_fallback_for_nontrivial_input() {
        let claims = extract_claims("purple bananas forever");
        assert_eq!(claims, vec!["purple bananas forever".to_string()]);
    }

    #[test]
    fn trivial_input_yields_nothing() {
        assert!(extract_claims("ok").is_empty());
        assert!(extract_claims("   ").is_empty());
        assert!(extract_claims("").is_empty());
    }

    #[test]
    fn never_more_than_five_never_negative() {
        for text in ["", "a", "The earth is round. ", &"x. ".repeat(100)] {
            let claims = extract_claims(text);
            assert!(claims.len() <= 5);
        }
    }
}
