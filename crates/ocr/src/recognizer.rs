use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OcrError {
    #[error("OCR API key is not configured")]
    MissingCredentials,
    #[error("Network error: {0}")]
    Network(String),
    #[error("OCR API error ({status}): {message}")]
    Api { status: u16, message: String },
    #[error("Malformed OCR response: {0}")]
    MalformedResponse(String),
}

/// Abstraction over an OCR backend.
/// Implementations accept encoded image bytes and return the full recognised
/// text, or `None` when the image holds no text.
#[async_trait]
pub trait OcrBackend: Send + Sync {
    async fn recognize(&self, image_bytes: &[u8]) -> Result<Option<String>, OcrError>;
}

// ── Mock backend (always available, used for tests) ───────────────────────────

/// Returns a pre-set string, so the pipeline can be exercised offline.
pub struct MockRecognizer {
    pub text: Option<String>,
}

impl MockRecognizer {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()) }
    }

    /// A backend that never detects any text.
    pub fn blank() -> Self {
        Self { text: None }
    }
}

#[async_trait]
impl OcrBackend for MockRecognizer {
    async fn recognize(&self, _image_bytes: &[u8]) -> Result<Option<String>, OcrError> {
        Ok(self.text.clone())
    }
}
