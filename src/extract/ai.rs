//! Language-model claim extraction strategy.
//!
//! Calls an OpenAI-compatible chat-completions endpoint with a fixed
//! instruction contract: the model must return strictly a JSON array of
//! claim strings. Anything else is treated as a strategy failure and the
//! caller falls back to pattern extraction.

use crate::config::ExtractionConfig;
use crate::error::{Error, Result};
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

const SYSTEM_PROMPT: &str = "You are a precise fact-checking assistant that \
extracts only verifiable factual claims from text. Always respond with valid JSON.";

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

/// Claim extraction backed by a chat-completions model.
pub struct AiExtractor {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl AiExtractor {
    /// Create an extractor from configuration. Returns `None` when no
    /// credential is configured.
    #[must_use]
    pub fn from_config(config: &ExtractionConfig, timeout: Duration) -> Option<Self> {
        let api_key = config.api_key.clone().filter(|k| !k.is_empty())?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .ok()?;

        Some(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
        })
    }

    /// Ask the model for the factual claims contained in `text`.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, an empty completion, malformed
    /// JSON, or a non-array payload. Callers are expected to fall back to
    /// pattern extraction on any error.
    pub async fn extract(&self, text: &str) -> Result<Vec<String>> {
        let prompt = build_prompt(text);

        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
            "max_tokens": 500,
            "temperature": 0.1,
        });

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Extraction(format!("model request failed: {e}")))?
            .error_for_status()
            .map_err(|e| Error::Extraction(format!("model returned error status: {e}")))?
            .json::<ChatResponse>()
            .await
            .map_err(|e| Error::Extraction(format!("malformed completion envelope: {e}")))?;

        let content = response
            .choices
            .first()
            .and_then(|c| c.message.content.as_deref())
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or_else(|| Error::Extraction("empty completion".to_string()))?;

        parse_claim_array(content)
    }
}

fn build_prompt(text: &str) -> String {
    format!(
        "You are a fact-checking assistant. Analyze the following text and \
extract only factual claims that can be verified against news sources or \
public information.\n\n\
Rules:\n\
1. Extract only objective, verifiable statements of fact\n\
2. Ignore opinions, subjective statements, and personal experiences\n\
3. Focus on claims about events, announcements, statistics, or concrete facts\n\
4. Each claim should be a complete, standalone statement\n\
5. Return claims as a JSON array of strings\n\
6. If no verifiable claims are found, return an empty array\n\n\
Text to analyze:\n\"{}\"\n\n\
Return only the JSON array, no other text:",
        text.replace('"', "\\\"")
    )
}

/// Parse the model output as a strict JSON array of non-empty strings.
fn parse_claim_array(content: &str) -> Result<Vec<String>> {
    let value: serde_json::Value = serde_json::from_str(content)
        .map_err(|e| Error::Extraction(format!("completion is not JSON: {e}")))?;

    let serde_json::Value::Array(items) = value else {
        return Err(Error::Extraction("completion is not a JSON array".to_string()));
    };

    debug!("Model returned {} candidate claims", items.len());

    Ok(items
        .into_iter()
        .filter_map(|item| match item {
            serde_json::Value::String(s) => {
                let s = s.trim().to_string();
                (!s.is_empty()).then_some(s)
            }
            _ => None,
        })
        .collect())
}
