//! Transcription client: one page image in, the model's text out.
//!
//! Each call is exactly one `generateContent` POST. There is no retry and,
//! unless [`crate::config::ProcessingConfig::api_timeout_secs`] is set, no
//! timeout either. Failures are returned to the orchestrator, which turns
//! them into a page-local error result.
//!
//! ## Wire format
//!
//! ```text
//! POST {endpoint}?key={api_key}
//! {"contents":[{"parts":[{"text":PROMPT},
//!                        {"inline_data":{"mime_type":"image/png","data":BASE64}}]}]}
//!
//! 200 {"candidates":[{"content":{"parts":[{"text":"..."}]}}]}
//! ```

use crate::config::ProcessingConfig;
use crate::error::{ParseError, ProcessError, TranscriptionError};
use crate::prompts::{IMAGE_MIME_TYPE, TRANSCRIPTION_PROMPT};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

/// Sends one base64 PNG to a vision model and returns its transcription.
#[async_trait]
pub trait Transcriber: Send + Sync {
    async fn transcribe(&self, image_base64: &str) -> Result<String, TranscriptionError>;
}

// ── Request / response envelopes ─────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: [Part<'a>; 2],
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    InlineData { inline_data: InlineData<'a> },
}

#[derive(Debug, Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

/// Build the JSON body for one page image.
pub fn build_request_body(image_base64: &str) -> serde_json::Value {
    let request = GenerateRequest {
        contents: [Content {
            parts: [
                Part::Text {
                    text: TRANSCRIPTION_PROMPT,
                },
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: IMAGE_MIME_TYPE,
                        data: image_base64,
                    },
                },
            ],
        }],
    };
    // Serialising borrowed strings into a Value cannot fail.
    serde_json::to_value(&request).unwrap_or(serde_json::Value::Null)
}

/// Pull `candidates[0].content.parts[0].text` out of a response body.
pub fn parse_response(body: &str) -> Result<String, ParseError> {
    let response: GenerateResponse =
        serde_json::from_str(body).map_err(|e| ParseError::InvalidJson(e.to_string()))?;

    response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .and_then(|c| c.parts.into_iter().next())
        .and_then(|p| p.text)
        .ok_or(ParseError::MissingText)
}

// ── Client ───────────────────────────────────────────────────────────────

/// [`Transcriber`] talking to a Gemini-style `generateContent` endpoint.
#[derive(Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    timeout_secs: Option<u64>,
}

impl GeminiClient {
    pub fn new(config: &ProcessingConfig) -> Result<Self, ProcessError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ProcessError::Internal(format!("HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            timeout_secs: config.api_timeout_secs,
        })
    }

    /// The request URL carries the API key, so it is stripped from the error.
    fn map_send_error(&self, e: reqwest::Error) -> TranscriptionError {
        let e = e.without_url();
        match self.timeout_secs {
            Some(secs) if e.is_timeout() => TranscriptionError::Timeout { secs },
            _ => TranscriptionError::Network {
                detail: e.to_string(),
            },
        }
    }
}

#[async_trait]
impl Transcriber for GeminiClient {
    async fn transcribe(&self, image_base64: &str) -> Result<String, TranscriptionError> {
        let body = build_request_body(image_base64);
        debug!("POST {} ({} bytes of image data)", self.endpoint, image_base64.len());

        let mut request = self
            .http
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&body);
        if let Some(secs) = self.timeout_secs {
            request = request.timeout(Duration::from_secs(secs));
        }

        let response = request.send().await.map_err(|e| self.map_send_error(e))?;
        let status = response.status();
        let text = response.text().await.map_err(|e| self.map_send_error(e))?;

        if !status.is_success() {
            warn!("Endpoint returned HTTP {}", status.as_u16());
            return Err(TranscriptionError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(parse_response(&text)?)
    }
}
