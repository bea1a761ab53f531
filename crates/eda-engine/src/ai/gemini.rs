//! Google Gemini provider (<https://ai.google.dev/>).

use std::time::Duration;

use super::RecommendationProvider;
use crate::error::{EngineError, Result};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default Gemini API endpoint.
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models/";

const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Default timeout for API requests in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Low temperature keeps the JSON layout stable between calls.
const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Recommendations are a few kilobytes of JSON.
const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Body of a `generateContent` call.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Instruction<'a>,
    contents: [Turn<'a>; 1],
    generation_config: Generation,
}

#[derive(Serialize)]
struct Instruction<'a> {
    parts: [TextPart<'a>; 1],
}

#[derive(Serialize)]
struct Turn<'a> {
    role: &'static str,
    parts: [TextPart<'a>; 1],
}

#[derive(Serialize)]
struct TextPart<'a> {
    text: &'a str,
}

/// Asks for `application/json` so the model does not wrap its answer in prose.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Generation {
    temperature: f32,
    max_output_tokens: u32,
    response_mime_type: &'static str,
}

const SYSTEM_INSTRUCTION: &str =
    "You are a data quality analyst. Answer with a single JSON object and nothing else.";

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateBody>,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct CandidateBody {
    #[serde(default)]
    parts: Vec<ReplyPart>,
}

#[derive(Deserialize)]
struct ReplyPart {
    #[serde(default)]
    text: String,
}

impl GenerateResponse {
    /// Text of the first candidate, `None` when it was blocked or empty.
    fn into_text(self) -> Option<String> {
        let candidate = self.candidates.into_iter().next()?;
        if matches!(candidate.finish_reason.as_deref(), Some("SAFETY" | "BLOCKED")) {
            return None;
        }
        let text: String = candidate
            .content?
            .parts
            .into_iter()
            .map(|part| part.text)
            .collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

/// Configuration for the Gemini provider.
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    /// The model to use (e.g., "gemini-1.5-flash").
    pub model: String,
    /// Temperature for response generation (0.0 - 2.0).
    pub temperature: f32,
    /// Maximum tokens in the response.
    pub max_tokens: u32,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Base URL for the API (useful for proxies or custom endpoints).
    pub base_url: String,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_owned(),
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            base_url: DEFAULT_BASE_URL.to_owned(),
        }
    }
}

impl GeminiConfig {
    pub fn builder() -> GeminiConfigBuilder {
        GeminiConfigBuilder::default()
    }
}

/// Builder for [`GeminiConfig`], starting from the defaults.
#[derive(Default)]
pub struct GeminiConfigBuilder {
    config: GeminiConfig,
}

impl GeminiConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Clamped to the 0.0..=2.0 range the API accepts.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.config.max_tokens = max_tokens;
        self
    }

    pub fn timeout_secs(mut self, timeout_secs: u64) -> Self {
        self.config.timeout_secs = timeout_secs;
        self
    }

    /// Endpoint prefix; the model name is appended directly.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    pub fn build(self) -> GeminiConfig {
        self.config
    }
}

/// Gemini-backed [`RecommendationProvider`].
///
/// ```rust,ignore
/// use eda_engine::ai::{GeminiConfig, GeminiProvider};
///
/// let config = GeminiConfig::builder().model("gemini-2.0-flash").build();
/// let provider = GeminiProvider::with_config("your-api-key", config)?;
/// ```
pub struct GeminiProvider {
    api_key: String,
    config: GeminiConfig,
    client: Client,
}

impl GeminiProvider {
    /// Create a provider with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_config(api_key, GeminiConfig::default())
    }

    pub fn with_config(api_key: impl Into<String>, config: GeminiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            api_key: api_key.into(),
            config,
            client,
        })
    }

    fn request_body<'a>(&self, prompt: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            system_instruction: Instruction {
                parts: [TextPart {
                    text: SYSTEM_INSTRUCTION,
                }],
            },
            contents: [Turn {
                role: "user",
                parts: [TextPart { text: prompt }],
            }],
            generation_config: Generation {
                temperature: self.config.temperature,
                max_output_tokens: self.config.max_tokens,
                response_mime_type: "application/json",
            },
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}{}:generateContent",
            self.config.base_url, self.config.model
        )
    }
}

fn service_error(message: impl Into<String>) -> EngineError {
    EngineError::RecommendationService(message.into())
}

impl RecommendationProvider for GeminiProvider {
    fn complete(&self, prompt: &str) -> Result<String> {
        debug!(
            "Sending {} prompt characters to {}",
            prompt.len(),
            self.config.model
        );

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .map_err(|e| service_error(format!("request to Gemini failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().unwrap_or_default();
            return Err(service_error(format!(
                "Gemini returned {status}: {}",
                detail.trim()
            )));
        }

        response
            .json::<GenerateResponse>()
            .map_err(|e| service_error(format!("unreadable Gemini response: {e}")))?
            .into_text()
            .ok_or_else(|| service_error("Gemini returned no usable text"))
    }

    fn name(&self) -> &str {
        "Gemini"
    }

    fn model(&self) -> Option<&str> {
        Some(&self.config.model)
    }
}
