//! Multi-factor credibility scoring.
//!
//! A claim's score combines four weighted components derived from the
//! articles the search collaborator returned: keyword relevance, outlet
//! reputation, source consensus and article recency. Claims matching a fixed
//! set of well-established-fact patterns score on a more generous path. All
//! tuning parameters live in [`ScoringPolicy`] so deployments can adjust them
//! without a rebuild.

use crate::verify::search::{extract_keywords, Article};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;

/// Coarse confidence label derived from the credibility score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Score at or below the medium cutoff.
    Low,
    /// Score above the medium cutoff.
    Medium,
    /// Score above the high cutoff.
    High,
}

impl Confidence {
    /// Stable string form used in persistence and API payloads.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    /// Parse the stable string form; unknown labels read as low.
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        match label {
            "high" => Self::High,
            "medium" => Self::Medium,
            _ => Self::Low,
        }
    }
}

/// Tuning parameters for credibility scoring.
///
/// The defaults are the canonical policy; every field can be overridden from
/// configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    /// Reputation tier per outlet (lower-cased name). Unlisted outlets use
    /// `default_tier`.
    pub outlet_tiers: HashMap<String, u32>,
    /// Tier value for unlisted outlets.
    pub default_tier: u32,
    /// Cap on the summed outlet-quality component.
    pub quality_cap: u32,
    /// Cap on the relevance component, general path.
    pub relevance_cap: u32,
    /// Minimum matched keywords for a source to count, general path.
    pub match_threshold: usize,
    /// Per-character keyword weight, general path.
    pub keyword_weight: u32,
    /// Cap on the relevance component, established-fact path.
    pub established_relevance_cap: u32,
    /// Minimum matched keywords for a source to count, established path.
    pub established_match_threshold: usize,
    /// Per-character keyword weight, established path.
    pub established_keyword_weight: u32,
    /// Relevance floor when any source exists, established path.
    pub established_relevance_floor: u32,
    /// Cap on the quality component, established path.
    pub established_quality_cap: u32,
    /// Cap on the consensus component, established path.
    pub established_consensus_cap: u32,
    /// Cap on the consensus component, general path.
    pub consensus_cap: u32,
    /// Cap on the recency component.
    pub recency_cap: u32,
    /// Base score for the established path.
    pub established_base: u32,
    /// Flat bonus for the established path.
    pub established_bonus: u32,
    /// Score with zero sources, general path.
    pub baseline: u8,
    /// Score with zero sources, established path.
    pub established_baseline: u8,
    /// Score on search failure, general path.
    pub fallback: u8,
    /// Score on search failure, established path.
    pub established_fallback: u8,
    /// Scores strictly above this are high confidence.
    pub high_cutoff: u8,
    /// Scores strictly above this are medium confidence.
    pub medium_cutoff: u8,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            outlet_tiers: default_outlet_tiers(),
            default_tier: 4,
            quality_cap: 30,
            relevance_cap: 40,
            match_threshold: 2,
            keyword_weight: 1,
            established_relevance_cap: 35,
            established_match_threshold: 1,
            established_keyword_weight: 2,
            established_relevance_floor: 15,
            established_quality_cap: 25,
            established_consensus_cap: 15,
            consensus_cap: 20,
            recency_cap: 10,
            established_base: 50,
            established_bonus: 20,
            baseline: 25,
            established_baseline: 65,
            fallback: 30,
            established_fallback: 65,
            high_cutoff: 75,
            medium_cutoff: 50,
        }
    }
}

fn default_outlet_tiers() -> HashMap<String, u32> {
    [
        ("reuters", 10),
        ("associated press", 10),
        ("ap news", 10),
        ("bbc news", 9),
        ("bbc", 9),
        ("the new york times", 8),
        ("the washington post", 8),
        ("the guardian", 8),
        ("bloomberg", 8),
        ("financial times", 8),
        ("the wall street journal", 8),
        ("npr", 8),
        ("al jazeera english", 7),
        ("cnn", 6),
        ("abc news", 6),
        ("nbc news", 6),
        ("cbs news", 6),
        ("politico", 6),
    ]
    .iter()
    .map(|(name, tier)| ((*name).to_string(), *tier))
    .collect()
}

/// Patterns for claims presumed true independent of search results: current
/// office-holders and elementary scientific, geographic or mathematical
/// facts.
fn established_patterns() -> &'static [Regex] {
    static PATTERNS: OnceLock<Vec<Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            r"(?i)\bis the (current )?(president|prime minister|chancellor|king|queen|pope)\b",
            r"(?i)\bwater (boils|freezes) at\b",
            r"(?i)\bearth (is round|orbits|revolves around)\b",
            r"(?i)\bspeed of light\b",
            r"(?i)\bsun rises in the east\b",
            r"(?i)\bis the capital of\b",
            r"(?i)\bis the (largest|longest|tallest|highest|smallest)\b",
            r"(?i)\b(two plus two|2\s*\+\s*2)\b",
            r"(?i)\bboiling point of water\b",
        ]
        .iter()
        .filter_map(|p| Regex::new(p).ok())
        .collect()
    })
}

/// Whether a claim matches the well-established-fact pattern set.
#[must_use]
pub fn is_established_fact(claim: &str) -> bool {
    established_patterns().iter().any(|p| p.is_match(claim))
}

/// Credibility scorer applying a [`ScoringPolicy`].
#[derive(Debug, Clone)]
pub struct CredibilityScorer {
    policy: ScoringPolicy,
}

impl CredibilityScorer {
    /// Create a scorer with the given policy.
    #[must_use]
    pub fn new(policy: ScoringPolicy) -> Self {
        Self { policy }
    }

    /// Score a claim against the articles found for it.
    ///
    /// Returns a score in `[0, 100]` and its confidence label.
    #[must_use]
    pub fn score(&self, claim: &str, articles: &[Article], now: DateTime<Utc>) -> (u8, Confidence) {
        let established = is_established_fact(claim);

        if articles.is_empty() {
            let score = if established {
                self.policy.established_baseline
            } else {
                self.policy.baseline
            };
            return (score, self.confidence_for(score));
        }

        let relevance = self.relevance(claim, articles, established);
        let quality = self.quality(articles);
        let consensus = self.consensus(articles);
        let recency = self.recency(articles, now);

        let total = if established {
            self.policy.established_base
                + relevance.min(self.policy.established_relevance_cap)
                + quality.min(self.policy.established_quality_cap)
                + consensus.min(self.policy.established_consensus_cap)
                + recency.min(self.policy.recency_cap)
                + self.policy.established_bonus
        } else {
            relevance.min(self.policy.relevance_cap)
                + quality.min(self.policy.quality_cap)
                + consensus.min(self.policy.consensus_cap)
                + recency.min(self.policy.recency_cap)
        };

        let score = u8::try_from(total.min(100)).unwrap_or(100);
        (score, self.confidence_for(score))
    }

    /// Score used when the search collaborator fails. Always low confidence.
    #[must_use]
    pub fn fallback(&self, claim: &str) -> (u8, Confidence) {
        let score = if is_established_fact(claim) {
            self.policy.established_fallback
        } else {
            self.policy.fallback
        };
        (score, Confidence::Low)
    }

    /// Confidence label for a score.
    #[must_use]
    pub fn confidence_for(&self, score: u8) -> Confidence {
        if score > self.policy.high_cutoff {
            Confidence::High
        } else if score > self.policy.medium_cutoff {
            Confidence::Medium
        } else {
            Confidence::Low
        }
    }

    /// Keyword-overlap relevance. Each source whose matched-keyword count
    /// crosses the path threshold contributes the summed character length of
    /// its matched keywords, weighted per path.
    fn relevance(&self, claim: &str, articles: &[Article], established: bool) -> u32 {
        let keywords = extract_keywords(claim);
        if keywords.is_empty() {
            return 0;
        }

        let (threshold, weight) = if established {
            (
                self.policy.established_match_threshold,
                self.policy.established_keyword_weight,
            )
        } else {
            (self.policy.match_threshold, self.policy.keyword_weight)
        };

        let mut total = 0u32;
        for article in articles {
            let mut haystack = article.title.to_lowercase();
            if let Some(description) = &article.description {
                haystack.push(' ');
                haystack.push_str(&description.to_lowercase());
            }

            let matched: Vec<&String> = keywords
                .iter()
                .filter(|kw| haystack.contains(kw.as_str()))
                .collect();

            if matched.len() >= threshold {
                total += matched
                    .iter()
                    .map(|kw| u32::try_from(kw.len()).unwrap_or(0) * weight)
                    .sum::<u32>();
            }
        }

        if established {
            total.max(self.policy.established_relevance_floor)
        } else {
            total
        }
    }

    /// Outlet-reputation quality: tier values summed over distinct outlets.
    fn quality(&self, articles: &[Article]) -> u32 {
        let mut seen = HashSet::new();
        let mut total = 0u32;
        for article in articles {
            let outlet = article.source.to_lowercase();
            if seen.insert(outlet.clone()) {
                total += self
                    .policy
                    .outlet_tiers
                    .get(&outlet)
                    .copied()
                    .unwrap_or(self.policy.default_tier);
            }
        }
        total.min(self.policy.quality_cap)
    }

    /// Consensus step function over the distinct source count.
    fn consensus(&self, articles: &[Article]) -> u32 {
        let distinct = articles
            .iter()
            .map(|a| a.source.to_lowercase())
            .collect::<HashSet<_>>()
            .len();

        match distinct {
            0 => 0,
            1 => 5,
            2 => 10,
            3 | 4 => 15,
            _ => 20,
        }
    }

    /// Recency points per article, bucketed by age.
    fn recency(&self, articles: &[Article], now: DateTime<Utc>) -> u32 {
        let mut total = 0u32;
        for article in articles {
            let Some(published) = article.published_at else {
                continue;
            };
            let age_days = (now - published).num_days();
            total += match age_days {
                d if d <= 1 => 4,
                d if d <= 7 => 2,
                d if d <= 30 => 1,
                _ => 0,
            };
        }
        total.min(self.policy.recency_cap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    fn scorer() -> CredibilityScorer {
        CredibilityScorer::new(ScoringPolicy::default())
    }

    fn article(title: &str, source: &str, age_days: i64) -> Article {
        Article {
            title: title.to_string(),
            source: source.to_string(),
            url: format!("https://example.com/{source}"),
            description: None,
            published_at: Some(Utc::now() - Duration::days(age_days)),
        }
    }

    #[test]
    fn zero_sources_general_baseline() {
        let (score, confidence) = scorer().score("Company X fired its entire board", &[], Utc::now());
        assert_eq!(score, 25);
        assert_eq!(confidence, Confidence::Low);
    }

    #[test]
    fn zero_sources_established_baseline() {
        let (score, confidence) =
            scorer().score("Paris is the capital of France", &[], Utc::now());
        assert_eq!(score, 65);
        assert_eq!(confidence, Confidence::Medium);
    }

    #[test]
    fn established_detection() {
        assert!(is_established_fact("Water boils at 100 degrees Celsius"));
        assert!(is_established_fact("Macron is the president of France"));
        assert!(is_established_fact("The Nile is the longest river"));
        assert!(!is_established_fact("Company X fired its entire board"));
    }

    #[test]
    fn fallback_scores() {
        let s = scorer();
        let (score, confidence) = s.fallback("Company X fired its entire board");
        assert_eq!((score, confidence), (30, Confidence::Low));
        let (score, confidence) = s.fallback("Paris is the capital of France");
        assert_eq!((score, confidence), (65, Confidence::Low));
    }

    #[test]
    fn consensus_steps() {
        let s = scorer();
        let make = |outlets: &[&str]| -> Vec<Article> {
            outlets.iter().map(|o| article("t", o, 100)).collect()
        };
        assert_eq!(s.consensus(&make(&[])), 0);
        assert_eq!(s.consensus(&make(&["a"])), 5);
        assert_eq!(s.consensus(&make(&["a", "b"])), 10);
        assert_eq!(s.consensus(&make(&["a", "b", "c"])), 15);
        assert_eq!(s.consensus(&make(&["a", "b", "c", "d"])), 15);
        assert_eq!(s.consensus(&make(&["a", "b", "c", "d", "e"])), 20);
        // Duplicate outlets do not add consensus
        assert_eq!(s.consensus(&make(&["a", "a", "a"])), 5);
    }

    #[test]
    fn recency_buckets_and_cap() {
        let s = scorer();
        let now = Utc::now();
        assert_eq!(s.recency(&[article("t", "a", 0)], now), 4);
        assert_eq!(s.recency(&[article("t", "a", 3)], now), 2);
        assert_eq!(s.recency(&[article("t", "a", 20)], now), 1);
        assert_eq!(s.recency(&[article("t", "a", 90)], now), 0);

        let fresh: Vec<Article> = (0..5).map(|i| article("t", &format!("s{i}"), 0)).collect();
        assert_eq!(s.recency(&fresh, now), 10);
    }

    #[test]
    fn quality_uses_tiers_and_default() {
        let s = scorer();
        assert_eq!(s.quality(&[article("t", "Reuters", 0)]), 10);
        assert_eq!(s.quality(&[article("t", "Some Blog", 0)]), 4);
        // Distinct outlets sum, duplicates collapse
        assert_eq!(
            s.quality(&[article("t", "Reuters", 0), article("t", "reuters", 1)]),
            10
        );
    }

    #[test]
    fn confidence_cutoffs() {
        let s = scorer();
        assert_eq!(s.confidence_for(76), Confidence::High);
        assert_eq!(s.confidence_for(75), Confidence::Medium);
        assert_eq!(s.confidence_for(51), Confidence::Medium);
        assert_eq!(s.confidence_for(50), Confidence::Low);
        assert_eq!(s.confidence_for(0), Confidence::Low);
    }

    #[test]
    fn relevant_corroborated_claim_scores_high() {
        let claim = "SpaceX launched forty Starlink satellites from Florida";
        let articles: Vec<Article> = ["Reuters", "Associated Press", "BBC News"]
            .iter()
            .map(|outlet| Article {
                title: "SpaceX launched forty Starlink satellites".to_string(),
                source: (*outlet).to_string(),
                url: "https://example.com".to_string(),
                description: Some("Launched from Florida on Tuesday".to_string()),
                published_at: Some(Utc::now()),
            })
            .collect();

        let (score, confidence) = scorer().score(claim, &articles, Utc::now());
        assert!(score >= 75, "expected a strong score, got {score}");
        assert_ne!(confidence, Confidence::Low);
    }

    proptest! {
        #[test]
        fn score_is_always_in_bounds(
            claim in ".{0,200}",
            outlets in prop::collection::vec("[a-z]{1,12}", 0..8),
            ages in prop::collection::vec(0i64..400, 0..8),
        ) {
            let articles: Vec<Article> = outlets
                .iter()
                .zip(ages.iter().chain(std::iter::repeat(&0)))
                .map(|(outlet, age)| Article {
                    title: claim.chars().take(40).collect(),
                    source: outlet.clone(),
                    url: String::new(),
                    description: None,
                    published_at: Some(Utc::now() - Duration::days(*age)),
                })
                .collect();

            let (score, _) = scorer().score(&claim, &articles, Utc::now());
            prop_assert!(score <= 100);
        }
    }
}
