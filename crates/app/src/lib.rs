//! Capture, review and configuration for the kakeibo command line.

pub mod config;
pub mod flow;
pub mod review;

pub use config::{Config, ConfigError};
pub use flow::{CaptureFlow, Committed, FlowError};
pub use review::{DraftOrigin, ReviewDraft, ReviewError};
