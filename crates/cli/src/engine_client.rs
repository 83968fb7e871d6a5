//! Extraction engine clients.
//!
//! One blocking HTTP call per image, bounded by a timeout and never retried
//! automatically. Each provider adapter builds its own request envelope and
//! digs the text out of its own response envelope; status classification is
//! shared.

use std::time::{Duration, Instant};

use base64::{engine::general_purpose::STANDARD, Engine};
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{debug, info};

use bitacora_config::{AIProvider, ResolvedAIConfig};

use crate::exit_codes;
use crate::photo::ImagePayload;

const USER_AGENT: &str = concat!("bitacora/", env!("CARGO_PKG_VERSION"));
const MAX_ERROR_CHARS: usize = 300;

// ── Trait ───────────────────────────────────────────────────────────

/// A vision-capable model that turns a logsheet image into raw text.
pub trait ExtractionEngine {
    fn name(&self) -> &str;
    fn extract(&self, image: &ImagePayload, prompt: &str) -> Result<String, ExtractionFailure>;
}

#[derive(Debug, Error)]
pub enum ExtractionFailure {
    #[error("no API key for {provider}")]
    MissingKey { provider: String },
    #[error("{provider} auth failed ({status}): {message}")]
    Auth { provider: String, status: u16, message: String },
    #[error("{provider} request rejected ({status}): {message}")]
    Rejected { provider: String, status: u16, message: String },
    #[error("{provider} rate limited: {message}")]
    RateLimited { provider: String, message: String },
    #[error("{provider} upstream error: {message}")]
    Upstream { provider: String, message: String },
    #[error("{provider} did not answer within {secs}s")]
    Timeout { provider: String, secs: u64 },
    #[error("{provider} returned no text: {detail}")]
    EmptyResponse { provider: String, detail: String },
}

impl ExtractionFailure {
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::MissingKey { .. } => exit_codes::EXIT_AI_MISSING_KEY,
            Self::Auth { .. } => exit_codes::EXIT_ENGINE_AUTH,
            Self::Rejected { .. } => exit_codes::EXIT_ENGINE_REJECTED,
            Self::RateLimited { .. } => exit_codes::EXIT_ENGINE_RATE_LIMIT,
            Self::Upstream { .. } => exit_codes::EXIT_ENGINE_UPSTREAM,
            Self::Timeout { .. } => exit_codes::EXIT_ENGINE_TIMEOUT,
            Self::EmptyResponse { .. } => exit_codes::EXIT_ENGINE_EMPTY,
        }
    }

    pub fn hint(&self) -> Option<String> {
        match self {
            Self::MissingKey { .. } => Some("run `bitacora ai doctor` to see where keys are looked up".into()),
            Self::Auth { .. } => Some("check the API key for this provider".into()),
            Self::Rejected { .. } => Some("check the model name and that the image is a readable photo".into()),
            Self::RateLimited { .. } | Self::Upstream { .. } => Some("wait a moment and re-run the same command".into()),
            Self::Timeout { .. } => Some("re-run, or raise the limit with --timeout".into()),
            Self::EmptyResponse { .. } => Some("re-run; a blurry or cropped photo can make the model refuse".into()),
        }
    }
}

/// Build the engine for a resolved configuration.
pub fn from_config(config: &ResolvedAIConfig) -> Result<Box<dyn ExtractionEngine>, ExtractionFailure> {
    let provider = config.provider_name().to_string();
    let api_key = config
        .api_key
        .clone()
        .ok_or_else(|| ExtractionFailure::MissingKey { provider: provider.clone() })?;
    let http = HttpEngine::new(&provider, config.timeout_secs)?;

    match config.provider {
        AIProvider::OpenAI => Ok(Box::new(OpenAiEngine {
            http,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
        })),
        AIProvider::Gemini | AIProvider::None => Ok(Box::new(GeminiEngine {
            http,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key,
            temperature: config.temperature,
        })),
    }
}

// ── Shared HTTP plumbing ────────────────────────────────────────────

struct HttpEngine {
    client: reqwest::blocking::Client,
    provider: String,
    timeout_secs: u64,
}

impl HttpEngine {
    fn new(provider: &str, timeout_secs: u64) -> Result<Self, ExtractionFailure> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ExtractionFailure::Upstream {
                provider: provider.to_string(),
                message: format!("failed to build HTTP client: {}", e),
            })?;
        Ok(Self { client, provider: provider.to_string(), timeout_secs })
    }

    /// Send once and classify the outcome. Returns the parsed JSON envelope.
    fn send(&self, request: reqwest::blocking::RequestBuilder) -> Result<Value, ExtractionFailure> {
        let started = Instant::now();
        let resp = request.send().map_err(|e| self.transport_error(e))?;
        let status = resp.status().as_u16();
        let text = resp.text().map_err(|e| self.transport_error(e))?;
        debug!(provider = %self.provider, status, ms = started.elapsed().as_millis() as u64, "engine responded");

        let body: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
        let provider = self.provider.clone();

        match status {
            200..=299 => {
                if body.is_null() {
                    return Err(ExtractionFailure::Upstream {
                        provider,
                        message: format!("response is not JSON: {}", clip(&text)),
                    });
                }
                Ok(body)
            }
            401 | 403 => Err(ExtractionFailure::Auth { provider, status, message: error_message(&body, &text) }),
            429 => Err(ExtractionFailure::RateLimited { provider, message: error_message(&body, &text) }),
            400..=499 => Err(ExtractionFailure::Rejected { provider, status, message: error_message(&body, &text) }),
            _ => Err(ExtractionFailure::Upstream {
                provider,
                message: format!("HTTP {}: {}", status, error_message(&body, &text)),
            }),
        }
    }

    fn transport_error(&self, e: reqwest::Error) -> ExtractionFailure {
        if e.is_timeout() {
            ExtractionFailure::Timeout { provider: self.provider.clone(), secs: self.timeout_secs }
        } else {
            ExtractionFailure::Upstream { provider: self.provider.clone(), message: e.to_string() }
        }
    }
}

/// `{"error": {"message": ...}}` is shared by both providers.
fn error_message(body: &Value, raw: &str) -> String {
    body["error"]["message"]
        .as_str()
        .map(str::to_string)
        .unwrap_or_else(|| clip(raw))
}

fn clip(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= MAX_ERROR_CHARS {
        trimmed.to_string()
    } else {
        let cut: String = trimmed.chars().take(MAX_ERROR_CHARS).collect();
        format!("{}...", cut)
    }
}

// ── Gemini ──────────────────────────────────────────────────────────

pub struct GeminiEngine {
    http: HttpEngine,
    endpoint: String,
    model: String,
    api_key: String,
    temperature: f32,
}

impl GeminiEngine {
    fn request_body(&self, image: &ImagePayload, prompt: &str) -> Value {
        json!({
            "contents": [{
                "parts": [
                    { "text": prompt },
                    { "inline_data": { "mime_type": image.mime_type, "data": STANDARD.encode(&image.bytes) } }
                ]
            }],
            "generationConfig": { "temperature": self.temperature }
        })
    }
}

impl ExtractionEngine for GeminiEngine {
    fn name(&self) -> &str {
        "gemini"
    }

    fn extract(&self, image: &ImagePayload, prompt: &str) -> Result<String, ExtractionFailure> {
        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        info!(provider = "gemini", model = %self.model, image_bytes = image.bytes.len(), "calling extraction engine");
        let started = Instant::now();

        let body = self.http.send(
            self.http
                .client
                .post(&url)
                .header("x-goog-api-key", &self.api_key)
                .json(&self.request_body(image, prompt)),
        )?;

        let text: String = body["candidates"][0]["content"]["parts"]
            .as_array()
            .map(|parts| parts.iter().filter_map(|p| p["text"].as_str()).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            let detail = body["promptFeedback"]["blockReason"]
                .as_str()
                .or_else(|| body["candidates"][0]["finishReason"].as_str())
                .unwrap_or("empty candidates")
                .to_string();
            return Err(ExtractionFailure::EmptyResponse { provider: "gemini".into(), detail });
        }

        info!(provider = "gemini", chars = text.len(), ms = started.elapsed().as_millis() as u64, "extraction finished");
        Ok(text)
    }
}

// ── OpenAI ──────────────────────────────────────────────────────────

pub struct OpenAiEngine {
    http: HttpEngine,
    endpoint: String,
    model: String,
    api_key: String,
    temperature: f32,
}

impl OpenAiEngine {
    fn request_body(&self, image: &ImagePayload, prompt: &str) -> Value {
        let data_url = format!("data:{};base64,{}", image.mime_type, STANDARD.encode(&image.bytes));
        json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": [{
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt },
                    { "type": "image_url", "image_url": { "url": data_url } }
                ]
            }]
        })
    }
}

impl ExtractionEngine for OpenAiEngine {
    fn name(&self) -> &str {
        "openai"
    }

    fn extract(&self, image: &ImagePayload, prompt: &str) -> Result<String, ExtractionFailure> {
        let url = format!("{}/chat/completions", self.endpoint);
        info!(provider = "openai", model = %self.model, image_bytes = image.bytes.len(), "calling extraction engine");
        let started = Instant::now();

        let body = self.http.send(
            self.http
                .client
                .post(&url)
                .bearer_auth(&self.api_key)
                .json(&self.request_body(image, prompt)),
        )?;

        let text = body["choices"][0]["message"]["content"].as_str().unwrap_or("").to_string();
        if text.trim().is_empty() {
            let detail = body["choices"][0]["finish_reason"].as_str().unwrap_or("no choices").to_string();
            return Err(ExtractionFailure::EmptyResponse { provider: "openai".into(), detail });
        }

        info!(provider = "openai", chars = text.len(), ms = started.elapsed().as_millis() as u64, "extraction finished");
        Ok(text)
    }
}

// ── Tests ───────────────────────────────────────────────────────────
