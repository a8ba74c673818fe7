//! ONNX inference abstraction layer for clickcap.
//!
//! The captcha detector and recognizer only see the [`InferenceBackend`]
//! trait, so model execution can be swapped out (ONNX Runtime natively, an
//! in-memory fake in tests).

mod backend;
mod error;
mod tensor;

pub use backend::InferenceBackend;
pub use error::InferenceError;
pub use tensor::{InputTensor, OutputTensor};

#[cfg(feature = "native")]
pub use backend::ort::OrtBackend;

/// Result type for inference operations.
pub type Result<T> = std::result::Result<T, InferenceError>;
