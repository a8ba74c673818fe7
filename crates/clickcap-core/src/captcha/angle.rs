//! Recognition with a rotation fallback for tilted glyphs.

use image::DynamicImage;
use tracing::{trace, warn};

use crate::ocr::{CharRecognizer, rotate_expand};

/// Angles in degrees tried after the upright pass reads nothing.
pub const ROTATION_SWEEP: [f32; 7] = [-15.0, -10.0, -5.0, 0.0, 5.0, 10.0, 15.0];

/// Confidence for text read without rotation.
pub const UPRIGHT_CONFIDENCE: f32 = 1.0;

/// Confidence for text that only appeared after rotating the crop.
pub const ROTATED_CONFIDENCE: f32 = 0.8;

/// Text read from one glyph region.
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    pub text: String,
    pub confidence: f32,
    /// Sweep angle that produced the text, `None` for the upright pass.
    pub angle: Option<f32>,
}

impl Recognition {
    /// Nothing could be read at any angle.
    pub fn empty() -> Self {
        Self {
            text: String::new(),
            confidence: 0.0,
            angle: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// Recognize a glyph crop, falling back to the rotation sweep.
///
/// The crop is read as-is first. Only if that yields no text is each angle
/// of [`ROTATION_SWEEP`] tried in order; the first non-empty read wins.
/// Recognizer errors count as an empty read and never abort the sweep.
pub fn recognize_with_rotation<R>(recognizer: &R, crop: &DynamicImage) -> Recognition
where
    R: CharRecognizer + ?Sized,
{
    if let Some(text) = attempt(recognizer, crop) {
        return Recognition {
            text,
            confidence: UPRIGHT_CONFIDENCE,
            angle: None,
        };
    }

    for angle in ROTATION_SWEEP {
        let rotated = rotate_expand(crop, angle);
        match attempt(recognizer, &rotated) {
            Some(text) => {
                trace!("Read '{}' at {}°", text, angle);
                return Recognition {
                    text,
                    confidence: ROTATED_CONFIDENCE,
                    angle: Some(angle),
                };
            }
            None => trace!("Nothing at {}°", angle),
        }
    }

    Recognition::empty()
}

/// One recognition pass; `None` for empty text or a failed pass.
fn attempt<R>(recognizer: &R, image: &DynamicImage) -> Option<String>
where
    R: CharRecognizer + ?Sized,
{
    match recognizer.recognize(image) {
        Ok(text) => {
            let text = text.trim();
            (!text.is_empty()).then(|| text.to_string())
        }
        Err(e) => {
            warn!("Recognition pass failed: {}", e);
            None
        }
    }
}
