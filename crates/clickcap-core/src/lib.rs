//! Core library for click-captcha solving.
//!
//! This crate provides:
//! - Instruction parsing into an ordered target sequence
//! - Glyph region detection and character recognition on ONNX models
//! - Recognition with a rotation fallback for tilted glyphs
//! - Greedy click matching and result classification
//! - Helpers for the browser driver (data URIs, page coordinates, retry pacing)

pub mod captcha;
pub mod driver;
pub mod error;
pub mod models;
pub mod ocr;

pub use captcha::{CaptchaSolver, DebugRenderer, SolveObserver, match_targets, parse_instruction};
#[cfg(feature = "native")]
pub use captcha::create_solver_from_dir;
pub use driver::{PlannedClick, click_plan, decode_data_uri};
pub use error::{ClickcapError, OcrError, Result};
pub use models::{
    BoundingBox, ClickPoint, ClickcapConfig, FailureReason, Region, RetryPolicy, SolveResult,
};
pub use ocr::{CharRecognizer, RegionDetector, TextDetector, TextRecognizer};

/// Re-export inference types.
pub use clickcap_inference::{InferenceBackend, InputTensor, OutputTensor};

#[cfg(feature = "native")]
pub use clickcap_inference::OrtBackend;
