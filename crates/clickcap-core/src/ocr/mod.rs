//! Glyph detection and character recognition models.

mod detector;
mod preprocessing;
mod recognizer;

pub use detector::{Candidate, TextDetector, non_max_suppression};
pub use preprocessing::{ImagePreprocessor, rotate_expand};
pub use recognizer::{TextRecognizer, parse_charset};

use image::DynamicImage;

use crate::error::OcrError;
use crate::models::BoundingBox;

/// Locates glyph regions in a captcha image.
pub trait RegionDetector: Send + Sync {
    /// Return one box per hypothesized glyph, in source-image pixels.
    fn detect(&self, image: &DynamicImage) -> Result<Vec<BoundingBox>, OcrError>;
}

/// Reads the text of a single glyph crop.
pub trait CharRecognizer: Send + Sync {
    /// Recognize `image`. An empty string means nothing was read.
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError>;
}

impl<T: RegionDetector + ?Sized> RegionDetector for Box<T> {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<BoundingBox>, OcrError> {
        (**self).detect(image)
    }
}

impl<T: CharRecognizer + ?Sized> CharRecognizer for Box<T> {
    fn recognize(&self, image: &DynamicImage) -> Result<String, OcrError> {
        (**self).recognize(image)
    }
}
