//! Character recognition using a CTC classification model.

use std::path::Path;

use image::DynamicImage;
use ndarray::ArrayD;
use tracing::{debug, trace};

use crate::error::OcrError;
use clickcap_inference::{InferenceBackend, InputTensor, OutputTensor};

use super::CharRecognizer;
use super::preprocessing::ImagePreprocessor;

/// Character recognizer for single-glyph crops.
pub struct TextRecognizer<B: InferenceBackend> {
    backend: B,
    preprocessor: ImagePreprocessor,
    charset: Vec<char>,
}

impl<B: InferenceBackend> TextRecognizer<B> {
    /// Create a new recognizer. `charset[0]` is the CTC blank.
    pub fn new(backend: B, charset: Vec<char>) -> Self {
        Self {
            backend,
            preprocessor: ImagePreprocessor::new(),
            charset,
        }
    }

    /// Load a charset file: one entry per line, blank token prepended.
    pub fn load_charset(path: &Path) -> Result<Vec<char>, OcrError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| OcrError::ModelLoad(format!("Failed to load charset: {}", e)))?;

        let charset = parse_charset(&content);
        debug!("Loaded charset with {} entries", charset.len());
        Ok(charset)
    }

    /// Recognize the text in a glyph crop.
    pub fn recognize_text(&self, image: &DynamicImage) -> Result<String, OcrError> {
        let tensor = self
            .preprocessor
            .preprocess_for_recognition(image)
            .map_err(|e| OcrError::Preprocessing(e.to_string()))?;

        let output = self
            .backend
            .run_single(InputTensor::Float32(tensor.into_dyn()))
            .map_err(|e| OcrError::Recognition(e.to_string()))?;

        let indices = match output {
            OutputTensor::Float32(logits) => argmax_steps(&logits)?,
            OutputTensor::Int64(ids) => ids.iter().map(|&i| i.max(0) as usize).collect(),
        };

        let text = self.ctc_collapse(&indices);
        trace!("Recognized: '{}'", text);
        Ok(text)
    }

    /// Greedy CTC decode: collapse repeats, drop blanks, map to characters.
    fn ctc_collapse(&self, indices: &[usize]) -> String {
        let mut text = String::new();
        let mut prev = 0usize;

        for &idx in indices {
            if idx != 0 && idx != prev {
                if let Some(&c) = self.charset.get(idx) {
                    text.push(c);
                }
            }
            prev = idx;
        }

        text
    }
}

impl<B: InferenceBackend> CharRecognizer for TextRecognizer<B> {
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError> {
        self.recognize_text(image)
    }
}

/// Parse charset file contents. Lines are taken by their first character;
/// empty lines are skipped.
pub fn parse_charset(content: &str) -> Vec<char> {
    let mut charset = vec![' '];
    charset.extend(content.lines().filter_map(|line| line.chars().next()));
    charset
}

/// Argmax over classes for each time step.
///
/// Accepts logits laid out as `[1, T, C]` or `[T, 1, C]`.
fn argmax_steps(logits: &ArrayD<f32>) -> Result<Vec<usize>, OcrError> {
    let shape = logits.shape();
    if shape.len() != 3 {
        return Err(OcrError::Recognition(format!(
            "Invalid output shape: {:?}",
            shape
        )));
    }

    let (steps, batch_first) = match (shape[0], shape[1]) {
        (1, t) => (t, true),
        (t, 1) => (t, false),
        _ => {
            return Err(OcrError::Recognition(format!(
                "Unsupported batch layout: {:?}",
                shape
            )));
        }
    };
    let classes = shape[2];

    let indices = (0..steps)
        .map(|t| {
            let value = |c: usize| {
                if batch_first {
                    logits[[0, t, c]]
                } else {
                    logits[[t, 0, c]]
                }
            };

            (0..classes)
                .max_by(|&a, &b| value(a).total_cmp(&value(b)))
                .unwrap_or(0)
        })
        .collect();

    Ok(indices)
}
