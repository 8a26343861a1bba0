//! Gemini API client with key rotation and graceful degradation.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use reqwest::Client;
use tokio::sync::Semaphore;

use reword_core::{fallback_paraphrase, split};

use crate::prompt::{
    build_prompt, Content, GenerateContentRequest, GenerateContentResponse, GenerationConfig, Part,
};

/// Production endpoint of the generative-language API.
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Default model name.
pub const DEFAULT_MODEL: &str = "gemini-2.0-flash-lite";

/// Retries after the first failed attempt (3 attempts total).
const MAX_RETRIES: u32 = 2;

/// Concurrent provider calls allowed at once.
const MAX_CONCURRENT_CALLS: usize = 2;

/// Bounded wait for one provider call.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Sampling temperature for paraphrasing.
const TEMPERATURE: f32 = 0.7;

/// Output token cap per request.
const MAX_OUTPUT_TOKENS: u32 = 800;

/// Error type for Gemini operations.
#[derive(Debug, thiserror::Error)]
pub enum GeminiError {
    /// No API keys were configured.
    #[error("no Gemini API keys configured")]
    NoKeys,

    /// HTTP request failed (network error or timeout).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The API returned a non-success status.
    #[error("Gemini API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body, as far as it could be read.
        message: String,
    },

    /// The API returned a well-formed but empty or blocked response.
    #[error("empty response from Gemini")]
    EmptyResponse,
}

/// Client for the Gemini `generateContent` endpoint.
///
/// Holds an ordered pool of API keys. The pool index is the only shared
/// mutable state and is guarded by a mutex held just for the index update,
/// never across a network call.
pub struct GeminiClient {
    http: Client,
    base_url: String,
    model: String,
    keys: Vec<String>,
    index: Mutex<usize>,
    permits: Semaphore,
}

impl GeminiClient {
    /// Create a client against the production endpoint.
    ///
    /// # Errors
    ///
    /// Returns `GeminiError::NoKeys` when `keys` is empty, or an HTTP error
    /// if the underlying client cannot be built.
    pub fn new(keys: Vec<String>) -> Result<Self, GeminiError> {
        Self::with_base_url(DEFAULT_BASE_URL, keys)
    }

    /// Create a client against a custom endpoint (used by tests).
    ///
    /// # Errors
    ///
    /// Returns `GeminiError::NoKeys` when `keys` is empty, or an HTTP error
    /// if the underlying client cannot be built.
    pub fn with_base_url(
        base_url: impl Into<String>,
        keys: Vec<String>,
    ) -> Result<Self, GeminiError> {
        if keys.is_empty() {
            return Err(GeminiError::NoKeys);
        }
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: DEFAULT_MODEL.to_string(),
            keys,
            index: Mutex::new(0),
            permits: Semaphore::new(MAX_CONCURRENT_CALLS),
        })
    }

    /// Override the model name.
    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Number of configured keys.
    #[must_use]
    pub fn key_count(&self) -> usize {
        self.keys.len()
    }

    /// Advance to the next key in the pool.
    ///
    /// Returns `false` when fewer than two keys exist and nothing changed.
    pub fn rotate(&self) -> bool {
        if self.keys.len() < 2 {
            return false;
        }
        let mut index = self.index.lock().unwrap_or_else(PoisonError::into_inner);
        *index = (*index + 1) % self.keys.len();
        tracing::info!(index = *index, "Rotated to next Gemini API key");
        true
    }

    fn current_key(&self) -> String {
        let index = self.index.lock().unwrap_or_else(PoisonError::into_inner);
        self.keys[*index].clone()
    }

    /// Generate exactly `count` paraphrases of `text`.
    ///
    /// Never fails: provider errors are retried with key rotation, and any
    /// remaining shortfall is padded with deterministic fallback strings.
    pub async fn generate(&self, text: &str, count: usize) -> Vec<String> {
        if count == 0 {
            return Vec::new();
        }
        let prompt = build_prompt(text, count);

        // The semaphore is never closed, so acquisition only fails if the
        // client is being torn down; degrade to fallbacks in that case.
        let Ok(_permit) = self.permits.acquire().await else {
            return (1..=count).map(fallback_paraphrase).collect();
        };

        for attempt in 0..=MAX_RETRIES {
            let key = self.current_key();
            match self.call(&prompt, &key).await {
                Ok(raw) => {
                    let mut parts = split(&raw, count);
                    if parts.len() < count {
                        tracing::warn!(
                            got = parts.len(),
                            expected = count,
                            "Response split came up short, padding with fallbacks"
                        );
                        for idx in parts.len()..count {
                            parts.push(fallback_paraphrase(idx + 1));
                        }
                    }
                    return parts;
                }
                Err(e) => {
                    tracing::warn!(attempt = attempt + 1, error = %e, "Gemini call failed");
                    if attempt < MAX_RETRIES {
                        self.rotate();
                    }
                }
            }
        }

        tracing::error!("All Gemini attempts failed, using fallback paraphrases");
        (1..=count).map(fallback_paraphrase).collect()
    }

    /// Check whether the current key can reach the API at all.
    pub async fn probe(&self) -> bool {
        let key = self.current_key();
        match self.call("Say 'Hello' in one word.", &key).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "Gemini probe failed");
                false
            }
        }
    }

    /// One provider call: explicit result, no retry.
    async fn call(&self, prompt: &str, key: &str) -> Result<String, GeminiError> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url, self.model
        );
        let request = GenerateContentRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_owned(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
                max_output_tokens: MAX_OUTPUT_TOKENS,
            },
        };

        let response = self
            .http
            .post(&url)
            .query(&[("key", key)])
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(GeminiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: GenerateContentResponse = response.json().await?;
        body.text().ok_or(GeminiError::EmptyResponse)
    }
}
