use async_trait::async_trait;
use serde_json::json;
use thiserror::Error;
use serde::Deserialize;
use reqwest::Client;
use tracing::{info, error};

use crate::models::MeasureType;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";
const FALLBACK_MIME: &str = "image/jpeg";

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("{0} is not set")] MissingApiKey(String),
    #[error("HTTP error: {0}")] Http(String),
    #[error("Other: {0}")] Other(String),
}

/// Reads a meter value off a photo.
#[async_trait]
pub trait ValueExtractor: Send + Sync {
    async fn extract(&self, image_b64: &str, mime_type: &str, measure_type: MeasureType) -> Result<String, GeminiError>;
}

/// Instruction sent alongside the photo, one per meter category.
pub fn build_prompt(measure_type: MeasureType) -> &'static str {
    match measure_type {
        MeasureType::Water => "Me retorne o valor da conta de água.",
        MeasureType::Gas => "Me retorne o total da conta de gás.",
    }
}

/// MIME type declared to the model, guessed from the magic bytes.
pub fn sniff_mime(bytes: &[u8]) -> &'static str {
    image::guess_format(bytes)
        .map(|format| format.to_mime_type())
        .unwrap_or(FALLBACK_MIME)
}

// Keeps inline image payloads out of the logs.
fn truncate_base64_in_json(value: &mut serde_json::Value) {
    match value {
        serde_json::Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                if key == "data" {
                    if let serde_json::Value::String(s) = val {
                        if s.len() > 100 {
                            *val = serde_json::Value::String(format!("{}...[truncated {} chars]", &s[..50], s.len() - 50));
                        }
                    }
                } else {
                    truncate_base64_in_json(val);
                }
            }
        }
        serde_json::Value::Array(arr) => {
            for val in arr.iter_mut() {
                truncate_base64_in_json(val);
            }
        }
        _ => {}
    }
}

enum ApiKey {
    Fixed(String),
    // read on every call, so a key exported after startup is picked up
    Env(String),
}

pub struct GeminiClient {
    client: Client,
    api_key: ApiKey,
    base_url: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self::build(ApiKey::Fixed(api_key), base_url.into(), model.into())
    }

    /// Looks the key up in environment variable `var` at request time.
    pub fn from_env_key(var: impl Into<String>, base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self::build(ApiKey::Env(var.into()), base_url.into(), model.into())
    }

    fn build(api_key: ApiKey, base_url: String, model: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
        }
    }

    fn api_key(&self) -> Result<String, GeminiError> {
        let (name, value) = match &self.api_key {
            ApiKey::Fixed(key) => (API_KEY_VAR, Some(key.clone())),
            ApiKey::Env(var) => (var.as_str(), std::env::var(var).ok()),
        };
        value
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| GeminiError::MissingApiKey(name.to_string()))
    }

    pub fn has_api_key(&self) -> bool { self.api_key().is_ok() }

    fn endpoint(&self, api_key: &str) -> String {
        format!("{}/models/{}:generateContent?key={}", self.base_url, self.model, api_key)
    }

    fn request_body(prompt: &str, image_b64: &str, mime_type: &str) -> serde_json::Value {
        json!({
            "contents": [{
                "parts": [
                    {"text": prompt},
                    {"inlineData": {"mimeType": mime_type, "data": image_b64}}
                ]
            }]
        })
    }

    async fn perform_api_call(&self, api_key: &str, body: &serde_json::Value) -> Result<String, GeminiError> {
        let url = self.endpoint(api_key);
        info!("🔗 Making request to: {}", redact_key(&url, api_key));

        let mut logged = body.clone();
        truncate_base64_in_json(&mut logged);
        info!("📤 Request body: {}", logged);

        let response = self.client
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| GeminiError::Http(e.to_string()))?;

        let status = response.status();
        info!("📥 Response status: {}", status);
        let response_text = response.text().await.map_err(|e| GeminiError::Http(e.to_string()))?;

        if !status.is_success() {
            error!("❌ Gemini API error response: {}", response_text);
            return Err(GeminiError::Http(format!("status={} body={}", status, response_text)));
        }

        parse_text_response(&response_text)
    }
}

#[async_trait]
impl ValueExtractor for GeminiClient {
    async fn extract(&self, image_b64: &str, mime_type: &str, measure_type: MeasureType) -> Result<String, GeminiError> {
        let api_key = self.api_key()?;
        let prompt = build_prompt(measure_type);
        info!("🎯 Extracting {} value ({}, {} base64 chars)", measure_type, mime_type, image_b64.len());

        let body = Self::request_body(prompt, image_b64, mime_type);
        let text = self.perform_api_call(&api_key, &body).await?;
        info!("📥 Gemini returned: {}", text);
        Ok(text)
    }
}

fn redact_key(url: &str, api_key: &str) -> String {
    url.replace(&format!("key={}", api_key), "key=***")
}

// --- Response Parsing Helpers ---

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate { #[serde(default)] content: Content }

#[derive(Debug, Deserialize, Default)]
struct Content { #[serde(default)] parts: Vec<Part> }

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Part {
    Text { text: String },
    #[allow(dead_code)]
    Other(serde_json::Value),
}

fn parse_text_response(raw: &str) -> Result<String, GeminiError> {
    let parsed: GeminiResponse = serde_json::from_str(raw)
        .map_err(|e| GeminiError::Other(format!("parse error: {}", e)))?;

    parsed.candidates
        .iter()
        .flat_map(|c| c.content.parts.iter())
        .find_map(|p| match p {
            Part::Text { text } => Some(text.clone()),
            Part::Other(_) => None,
        })
        .ok_or_else(|| GeminiError::Other("no text content in response".into()))
}
