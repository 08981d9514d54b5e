//! News-search collaborator client.
//!
//! Queries the external article index for evidence relevant to a claim. The
//! query is optimized per claim: claims naming well-known political entities
//! are rewritten to canonical search terms, everything else searches on the
//! claim's top keywords.

use crate::config::SearchConfig;
use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use regex::Regex;
use serde::Deserialize;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::debug;

/// An article returned by the search collaborator.
#[derive(Debug, Clone)]
pub struct Article {
    /// Headline.
    pub title: String,
    /// Outlet name.
    pub source: String,
    /// Canonical URL.
    pub url: String,
    /// Teaser/description text, when present.
    pub description: Option<String>,
    /// Publication time, when present.
    pub published_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    articles: Vec<RawArticle>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawArticle {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    published_at: Option<DateTime<Utc>>,
    source: RawSource,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    name: Option<String>,
}

/// Client for the external article index.
pub struct SearchClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    page_size: u32,
}

impl SearchClient {
    /// Build a client from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be constructed.
    pub fn new(config: &SearchConfig, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Search(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            page_size: config.page_size,
        })
    }

    /// Search for articles matching `claim`.
    ///
    /// # Errors
    ///
    /// Returns an error when no credential is configured, on transport
    /// failure, or on a malformed response body. Callers must degrade to the
    /// scoring fallback rather than propagate.
    pub async fn search(&self, claim: &str) -> Result<Vec<Article>> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(Error::Search("no search API key configured".to_string()));
        };

        let query = optimize_query(claim);
        let page_size = self.page_size.to_string();
        debug!("Searching sources for claim with query: {query}");

        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("q", query.as_str()),
                ("sortBy", "publishedAt"),
                ("pageSize", page_size.as_str()),
                ("apiKey", api_key),
            ])
            .send()
            .await
            .map_err(|e| Error::Search(format!("search request failed: {e}")))?
            .error_for_status()
            .map_err(|e| Error::Search(format!("search returned error status: {e}")))?
            .json::<SearchResponse>()
            .await
            .map_err(|e| Error::Search(format!("malformed search response: {e}")))?;

        Ok(response
            .articles
            .into_iter()
            .filter_map(|raw| {
                Some(Article {
                    title: raw.title?,
                    source: raw.source.name.unwrap_or_else(|| "unknown".to_string()),
                    url: raw.url.unwrap_or_default(),
                    description: raw.description,
                    published_at: raw.published_at,
                })
            })
            .collect())
    }
}

/// Canonical rewrites for claims about well-known political entities. The
/// raw claim text tends to search poorly (pronouns, honorifics, partial
/// names), so these map to stable query terms.
fn entity_rewrites() -> &'static [(Regex, &'static str)] {
    static REWRITES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    REWRITES.get_or_init(|| {
        [
            (r"(?i)\btrump\b", "Donald Trump president United States"),
            (r"(?i)\bbiden\b", "Joe Biden United States"),
            (r"(?i)\bputin\b", "Vladimir Putin Russia president"),
            (r"(?i)\bzelensky\b", "Volodymyr Zelensky Ukraine president"),
            (r"(?i)\bmacron\b", "Emmanuel Macron France president"),
            (r"(?i)\bxi jinping\b", "Xi Jinping China president"),
            (r"(?i)\bmodi\b", "Narendra Modi India prime minister"),
        ]
        .iter()
        .filter_map(|(pattern, query)| Regex::new(pattern).ok().map(|re| (re, *query)))
        .collect()
    })
}

const STOP_WORDS: &[&str] = &[
    "the", "this", "that", "with", "from", "have", "has", "had", "was", "were", "will",
    "would", "been", "being", "their", "there", "about", "which", "when", "what", "said",
    "says", "announced", "reported", "into", "over", "under", "after", "before", "more",
    "than", "some", "such", "very", "just", "only", "also", "does", "those", "these",
];

/// Maximum keywords joined into a fallback query.
const MAX_QUERY_KEYWORDS: usize = 6;

/// Rewrite a claim into an optimized search query.
#[must_use]
pub fn optimize_query(claim: &str) -> String {
    for (pattern, canonical) in entity_rewrites() {
        if pattern.is_match(claim) {
            return (*canonical).to_string();
        }
    }

    let keywords = extract_keywords(claim);
    if keywords.is_empty() {
        return claim.trim().to_string();
    }
    keywords
        .into_iter()
        .take(MAX_QUERY_KEYWORDS)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Extract content keywords from a claim: lower-cased words longer than three
/// characters that are not stop words, deduplicated in order.
#[must_use]
pub fn extract_keywords(claim: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    claim
        .split(|c: char| !c.is_alphanumeric())
        .map(str::to_lowercase)
        .filter(|word| word.len() > 3 && !STOP_WORDS.contains(&word.as_str()))
        .filter(|word| seen.insert(word.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn political_claims_are_rewritten() {
        let query = optimize_query("Trump is the current president of the United States");
        assert_eq!(query, "Donald Trump president United States");
    }

    #[test]
    fn general_claims_use_keywords() {
        let query = optimize_query("The reactor in Fukushima released radioactive water");
        assert_eq!(query, "reactor fukushima released radioactive water");
    }

    #[test]
    fn keywords_skip_stop_words_and_short_words() {
        let keywords = extract_keywords("The cat was on the mat with a laser pointer");
        assert_eq!(keywords, vec!["laser", "pointer"]);
    }

    #[test]
    fn keywords_deduplicate() {
        let keywords = extract_keywords("bitcoin bitcoin bitcoin price");
        assert_eq!(keywords, vec!["bitcoin", "price"]);
    }

    #[tokio::test]
    async fn missing_key_is_a_search_error() {
        let client = SearchClient::new(&SearchConfig::default(), Duration::from_secs(1))
            .expect("client");
        let err = client.search("anything").await.unwrap_err();
        assert!(matches!(err, Error::Search(_)));
    }
}
