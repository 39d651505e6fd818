//! Google Cloud Vision `images:annotate` backend.
//!
//! Sends the image as base64 with a single `TEXT_DETECTION` feature and reads
//! back `responses[0].fullTextAnnotation.text`.

use async_trait::async_trait;
use base64::Engine;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::recognizer::{OcrBackend, OcrError};

pub const DEFAULT_ENDPOINT: &str = "https://vision.googleapis.com/v1/images:annotate";

pub struct VisionRecognizer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl VisionRecognizer {
    /// Fails with [`OcrError::MissingCredentials`] when no usable key is given.
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Result<Self, OcrError> {
        Self::with_client(reqwest::Client::new(), endpoint, api_key)
    }

    pub fn with_client(
        client: reqwest::Client,
        endpoint: impl Into<String>,
        api_key: Option<String>,
    ) -> Result<Self, OcrError> {
        let api_key = api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .ok_or(OcrError::MissingCredentials)?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }
}

#[async_trait]
impl OcrBackend for VisionRecognizer {
    async fn recognize(&self, image_bytes: &[u8]) -> Result<Option<String>, OcrError> {
        tracing::info!(bytes = image_bytes.len(), endpoint = %self.endpoint, "sending OCR request");

        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.as_str())])
            .json(&build_request(image_bytes))
            .send()
            .await
            .map_err(|e| OcrError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::Api {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        let parsed: AnnotateResponse = response
            .json()
            .await
            .map_err(|e| OcrError::MalformedResponse(e.to_string()))?;

        let text = full_text(parsed)?;
        tracing::debug!(chars = text.as_ref().map_or(0, |t| t.chars().count()), "OCR response received");
        Ok(text)
    }
}

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AnnotateRequest {
    requests: Vec<AnnotateImageRequest>,
}

#[derive(Debug, Serialize)]
struct AnnotateImageRequest {
    image: ImageContent,
    features: Vec<Feature>,
}

#[derive(Debug, Serialize)]
struct ImageContent {
    content: String,
}

#[derive(Debug, Serialize)]
struct Feature {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Default, Deserialize)]
struct AnnotateResponse {
    #[serde(default)]
    responses: Vec<AnnotateImageResponse>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AnnotateImageResponse {
    full_text_annotation: Option<TextAnnotation>,
    error: Option<ApiStatus>,
}

#[derive(Debug, Deserialize)]
struct TextAnnotation {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
struct ApiStatus {
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ApiStatus>,
}

fn build_request(image_bytes: &[u8]) -> AnnotateRequest {
    AnnotateRequest {
        requests: vec![AnnotateImageRequest {
            image: ImageContent {
                content: base64::engine::general_purpose::STANDARD.encode(image_bytes),
            },
            features: vec![Feature { kind: "TEXT_DETECTION" }],
        }],
    }
}

/// Absent or empty annotation means "no text detected". A per-image error
/// without any text is surfaced as an API error.
fn full_text(response: AnnotateResponse) -> Result<Option<String>, OcrError> {
    let Some(first) = response.responses.into_iter().next() else {
        return Ok(None);
    };
    if let Some(text) = first.full_text_annotation.map(|a| a.text).filter(|t| !t.is_empty()) {
        return Ok(Some(text));
    }
    match first.error {
        Some(err) if !err.message.is_empty() => Err(OcrError::Api {
            status: err.code.unwrap_or(200),
            message: err.message,
        }),
        _ => Ok(None),
    }
}

/// Prefer the service's own `error.message`; fall back to the status reason.
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|e| e.error)
        .map(|e| e.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string())
}
