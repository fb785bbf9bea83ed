use std::future::Future;
use std::time::Duration;

use reqwest::StatusCode;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::debug;

use super::prompts::Prompt;
use crate::config::TranslationSettings;

#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("rate limited (HTTP {status})")]
    RateLimited { status: u16 },
    #[error("service unavailable: {0}")]
    Unavailable(String),
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },
    #[error("request failed: {0}")]
    Transport(String),
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl TranslateError {
    /// Rate-limit and unavailability failures rotate keys; everything else gives up.
    pub fn is_retryable(&self) -> bool {
        matches!(self, TranslateError::RateLimited { .. } | TranslateError::Unavailable(_))
    }

    pub fn from_status(status: StatusCode, body: String) -> Self {
        match status.as_u16() {
            429 => TranslateError::RateLimited { status: 429 },
            500 | 502 | 503 | 504 => TranslateError::Unavailable(format!("HTTP {}", status.as_u16())),
            s => TranslateError::Http { status: s, body },
        }
    }

    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() || e.is_connect() {
            TranslateError::Unavailable(e.to_string())
        } else {
            TranslateError::Transport(e.to_string())
        }
    }
}

/// A text-generation backend that returns one translated string per prompt.
pub trait Translator {
    fn translate(
        &self,
        api_key: &str,
        prompt: &Prompt,
    ) -> impl Future<Output = Result<String, TranslateError>> + Send;
}

/// `generateContent` client with a schema-constrained JSON reply.
pub struct GeminiClient {
    http: reqwest::Client,
    url: String,
}

impl GeminiClient {
    pub fn new(settings: &TranslationSettings) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()?;
        let url = format!(
            "{}/{}:generateContent",
            settings.endpoint.trim_end_matches('/'),
            settings.model
        );
        Ok(GeminiClient { http, url })
    }
}

impl Translator for GeminiClient {
    async fn translate(&self, api_key: &str, prompt: &Prompt) -> Result<String, TranslateError> {
        let response = self
            .http
            .post(&self.url)
            .header("x-goog-api-key", api_key)
            .json(&request_body(prompt))
            .send()
            .await
            .map_err(TranslateError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TranslateError::from_status(status, body));
        }

        let value: Value = response.json().await.map_err(TranslateError::from_reqwest)?;
        debug!("Response: {}", value);
        parse_response(&value)
    }
}

fn request_body(prompt: &Prompt) -> Value {
    json!({
        "systemInstruction": { "parts": [{ "text": prompt.system }] },
        "contents": [{ "role": "user", "parts": [{ "text": prompt.text }] }],
        "generationConfig": {
            "temperature": 0.2,
            "responseMimeType": "application/json",
            "responseSchema": {
                "type": "OBJECT",
                "properties": { "translation": { "type": "STRING" } },
                "required": ["translation"]
            }
        }
    })
}

/// Pull `{"translation": ...}` out of the first candidate.
fn parse_response(value: &Value) -> Result<String, TranslateError> {
    let text = value
        .pointer("/candidates/0/content/parts/0/text")
        .and_then(Value::as_str)
        .ok_or_else(|| TranslateError::Malformed("no candidate text".to_string()))?;

    let payload: Value = serde_json::from_str(text)
        .map_err(|e| TranslateError::Malformed(format!("candidate is not JSON: {}", e)))?;

    payload
        .get("translation")
        .and_then(Value::as_str)
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or_else(|| TranslateError::Malformed("missing translation field".to_string()))
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(TranslateError::from_status(StatusCode::TOO_MANY_REQUESTS, String::new()).is_retryable());
        assert!(TranslateError::from_status(StatusCode::SERVICE_UNAVAILABLE, String::new()).is_retryable());
        let bad = TranslateError::from_status(StatusCode::BAD_REQUEST, "nope".to_string());
        assert!(!bad.is_retryable());
        assert_eq!(bad.to_string(), "HTTP 400: nope");
    }

    #[test]
    fn parses_structured_reply() {
        let v = json!({
            "candidates": [{ "content": { "parts": [{ "text": "{\"translation\": \" ترجمه \"}" }] } }]
        });
        assert_eq!(parse_response(&v).unwrap(), "ترجمه");
    }

    #[test]
    fn rejects_unstructured_reply() {
        let v = json!({ "candidates": [{ "content": { "parts": [{ "text": "plain words" }] } }] });
        assert!(matches!(parse_response(&v), Err(TranslateError::Malformed(_))));
        assert!(matches!(parse_response(&json!({})), Err(TranslateError::Malformed(_))));
        let empty = json!({
            "candidates": [{ "content": { "parts": [{ "text": "{\"translation\": \"\"}" }] } }]
        });
        assert!(parse_response(&empty).is_err());
    }

    #[test]
    fn body_carries_prompt_and_schema() {
        let p = Prompt {
            system: "sys".to_string(),
            text: "متن".to_string(),
        };
        let body = request_body(&p);
        assert_eq!(body.pointer("/contents/0/parts/0/text").unwrap(), "متن");
        assert_eq!(body.pointer("/systemInstruction/parts/0/text").unwrap(), "sys");
        assert_eq!(
            body.pointer("/generationConfig/responseMimeType").unwrap(),
            "application/json"
        );
    }
}
