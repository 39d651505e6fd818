pub mod extract;
pub mod pipeline;
pub mod preprocess;
pub mod recognizer;
pub mod types;
pub mod vision;

pub use extract::{Extractor, ExtractorConfig};
pub use pipeline::{PipelineError, ReceiptPipeline};
pub use preprocess::{prepare_for_ocr, PreprocessError, DEFAULT_MAX_DIMENSION};
pub use recognizer::{MockRecognizer, OcrBackend, OcrError};
pub use types::{ScanNotice, ScanOutcome};
pub use vision::VisionRecognizer;
