use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

use crate::extract::Extractor;
use crate::preprocess::{self, DEFAULT_MAX_DIMENSION};
use crate::recognizer::{OcrBackend, OcrError};
use crate::types::ScanOutcome;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image preprocessing failed: {0}")]
    Preprocess(#[from] crate::preprocess::PreprocessError),
    #[error("OCR recognition failed: {0}")]
    Ocr(#[from] OcrError),
    #[error("A receipt scan is already in progress")]
    Busy,
}

/// Orchestrates: read → preprocess → OCR → extract.
///
/// Only one scan may be in flight at a time. A second request while one is
/// pending fails fast with [`PipelineError::Busy`]; nothing is queued.
pub struct ReceiptPipeline<R: OcrBackend> {
    recognizer: R,
    extractor: Extractor,
    max_dimension: u32,
    busy: AtomicBool,
}

impl<R: OcrBackend> ReceiptPipeline<R> {
    pub fn new(recognizer: R, extractor: Extractor) -> Self {
        Self {
            recognizer,
            extractor,
            max_dimension: DEFAULT_MAX_DIMENSION,
            busy: AtomicBool::new(false),
        }
    }

    pub fn with_max_dimension(mut self, max_dimension: u32) -> Self {
        self.max_dimension = max_dimension;
        self
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Scan a file on disk (camera capture or gallery pick).
    pub async fn scan_file(&self, path: &Path) -> Result<ScanOutcome, PipelineError> {
        let _guard = BusyGuard::acquire(&self.busy)?;
        let bytes = tokio::fs::read(path).await?;
        tracing::info!(path = %path.display(), bytes = bytes.len(), "scanning receipt");
        self.run(&bytes).await
    }

    /// Scan raw image bytes.
    pub async fn scan_bytes(&self, data: &[u8]) -> Result<ScanOutcome, PipelineError> {
        let _guard = BusyGuard::acquire(&self.busy)?;
        self.run(data).await
    }

    async fn run(&self, data: &[u8]) -> Result<ScanOutcome, PipelineError> {
        let image_bytes = preprocess::prepare_for_ocr(data, self.max_dimension)?;

        let Some(ocr_text) = self.recognizer.recognize(&image_bytes).await? else {
            tracing::info!("no text detected in receipt image");
            return Ok(ScanOutcome::default());
        };

        let items = self.extractor.extract(&ocr_text);
        tracing::info!(items = items.len(), "receipt scanned");

        Ok(ScanOutcome {
            ocr_text: Some(ocr_text),
            items,
        })
    }
}

/// Holds the pipeline's busy flag for the duration of one scan.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, PipelineError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| PipelineError::Busy)?;
        Ok(BusyGuard(flag))
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recognizer::MockRecognizer;
    use async_trait::async_trait;
    use image::{DynamicImage, GrayImage, ImageBuffer, Luma};
    use std::io::Cursor;
    use std::sync::Arc;
    use tokio::sync::Notify;

    fn tiny_png() -> Vec<u8> {
        let img: GrayImage = ImageBuffer::from_fn(4, 4, |_, _| Luma([200u8]));
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn pipeline(recognizer: MockRecognizer) -> ReceiptPipeline<MockRecognizer> {
        ReceiptPipeline::new(recognizer, Extractor::default())
    }

    /// Holds every recognition until the test releases it.
    struct GatedRecognizer {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl OcrBackend for GatedRecognizer {
        async fn recognize(&self, _image_bytes: &[u8]) -> Result<Option<String>, OcrError> {
            self.gate.notified().await;
            Ok(Some("お茶 ¥150".into()))
        }
    }

    struct FailingRecognizer;

    #[async_trait]
    impl OcrBackend for FailingRecognizer {
        async fn recognize(&self, _image_bytes: &[u8]) -> Result<Option<String>, OcrError> {
            Err(OcrError::Network("connection refused".into()))
        }
    }

    #[tokio::test]
    async fn scan_bytes_extracts_items() {
        let p = pipeline(MockRecognizer::new("おにぎり\n¥120\nお茶 ¥150\n合計 ¥270"));
        let outcome = p.scan_bytes(&tiny_png()).await.unwrap();
        let names: Vec<_> = outcome.items.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["おにぎり", "お茶"]);
        assert!(outcome.notice().is_none());
    }

    #[tokio::test]
    async fn no_text_yields_empty_outcome() {
        let outcome = pipeline(MockRecognizer::blank()).scan_bytes(&tiny_png()).await.unwrap();
        assert!(outcome.ocr_text.is_none());
        assert!(outcome.items.is_empty());
    }

    #[tokio::test]
    async fn scan_file_reads_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("receipt.png");
        std::fs::write(&path, tiny_png()).unwrap();

        let outcome = pipeline(MockRecognizer::new("パン\n¥180")).scan_file(&path).await.unwrap();
        assert_eq!(outcome.items.len(), 1);
        assert_eq!(outcome.items[0].price.amount(), 180);
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let p = pipeline(MockRecognizer::new(""));
        let err = p.scan_file(Path::new("/nonexistent/receipt.png")).await.unwrap_err();
        assert!(matches!(err, PipelineError::Io(_)));
        assert!(!p.is_busy());
    }

    #[tokio::test]
    async fn undecodable_image_is_preprocess_error() {
        let err = pipeline(MockRecognizer::new("x")).scan_bytes(b"nope").await.unwrap_err();
        assert!(matches!(err, PipelineError::Preprocess(_)));
    }

    #[tokio::test]
    async fn recognizer_failure_surfaces_and_releases_lock() {
        let p = ReceiptPipeline::new(FailingRecognizer, Extractor::default());
        let err = p.scan_bytes(&tiny_png()).await.unwrap_err();
        assert!(matches!(err, PipelineError::Ocr(OcrError::Network(_))));
        assert!(!p.is_busy());
    }

    #[tokio::test]
    async fn second_scan_while_pending_is_rejected() {
        let gate = Arc::new(Notify::new());
        let p = ReceiptPipeline::new(GatedRecognizer { gate: gate.clone() }, Extractor::default());
        let png = tiny_png();

        let (first, second) = tokio::join!(p.scan_bytes(&png), async {
            tokio::task::yield_now().await;
            let r = p.scan_bytes(&png).await;
            gate.notify_one();
            r
        });

        assert_eq!(first.unwrap().items.len(), 1);
        assert!(matches!(second, Err(PipelineError::Busy)));

        // The flag is released once the first scan completes.
        assert!(!p.is_busy());
        gate.notify_one();
        assert!(p.scan_bytes(&png).await.is_ok());
    }
}
