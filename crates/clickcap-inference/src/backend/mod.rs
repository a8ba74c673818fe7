//! Inference backend implementations.

#[cfg(feature = "native")]
pub mod ort;

use crate::{InferenceError, InputTensor, OutputTensor, Result};

/// Trait for ONNX inference backends.
///
/// Detection and recognition models are single-input graphs, so most callers
/// go through [`InferenceBackend::run_single`] and let the backend pick the
/// input name the model declares.
pub trait InferenceBackend: Send + Sync {
    /// Run inference with the given named inputs.
    fn run(&self, inputs: &[(&str, InputTensor)]) -> Result<Vec<(String, OutputTensor)>>;

    /// Get the input names expected by the model.
    fn input_names(&self) -> &[String];

    /// Get the output names produced by the model.
    fn output_names(&self) -> &[String];

    /// Feed one tensor to the model's first input and return its first output.
    fn run_single(&self, input: InputTensor) -> Result<OutputTensor> {
        let name = self
            .input_names()
            .first()
            .map(String::as_str)
            .unwrap_or("input");

        self.run(&[(name, input)])?
            .into_iter()
            .next()
            .map(|(_, tensor)| tensor)
            .ok_or(InferenceError::NoOutput)
    }
}
