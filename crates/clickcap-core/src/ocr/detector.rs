//! Glyph detection using a YOLOX-style single-stage detector.

use image::{DynamicImage, GenericImageView};
use ndarray::ArrayD;
use tracing::debug;

use crate::error::OcrError;
use crate::models::{BoundingBox, DetectionConfig};
use clickcap_inference::{InferenceBackend, InputTensor, OutputTensor};

use super::RegionDetector;
use super::preprocessing::ImagePreprocessor;

/// Feature map strides of the detection head.
const STRIDES: [u32; 3] = [8, 16, 32];

/// Glyph detector backed by an ONNX object-detection model.
pub struct TextDetector<B: InferenceBackend> {
    backend: B,
    preprocessor: ImagePreprocessor,
    input_size: u32,
    score_threshold: f32,
    nms_threshold: f32,
}

/// Candidate box in original-image coordinates, before clipping.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub score: f32,
}

impl Candidate {
    fn area(&self) -> f32 {
        (self.x2 - self.x1).max(0.0) * (self.y2 - self.y1).max(0.0)
    }

    /// Intersection over union with another candidate.
    pub fn iou(&self, other: &Candidate) -> f32 {
        let ix = (self.x2.min(other.x2) - self.x1.max(other.x1)).max(0.0);
        let iy = (self.y2.min(other.y2) - self.y1.max(other.y1)).max(0.0);
        let intersection = ix * iy;
        let union = self.area() + other.area() - intersection;

        if union <= 0.0 { 0.0 } else { intersection / union }
    }
}

impl<B: InferenceBackend> TextDetector<B> {
    /// Create a new detector with default thresholds.
    pub fn new(backend: B) -> Self {
        Self::with_config(backend, &DetectionConfig::default())
    }

    /// Create a detector using the given thresholds and input size.
    pub fn with_config(backend: B, config: &DetectionConfig) -> Self {
        Self {
            backend,
            preprocessor: ImagePreprocessor::new(),
            input_size: config.input_size,
            score_threshold: config.score_threshold,
            nms_threshold: config.nms_threshold,
        }
    }

    /// Run the model and return clipped, de-duplicated glyph boxes.
    pub fn detect_boxes(&self, image: &DynamicImage) -> Result<Vec<BoundingBox>, OcrError> {
        let (tensor, ratio) = self.preprocessor.letterbox(image, self.input_size)?;

        let output = self
            .backend
            .run_single(InputTensor::Float32(tensor.into_dyn()))
            .map_err(|e| OcrError::Detection(e.to_string()))?;

        let predictions = match output {
            OutputTensor::Float32(arr) => arr,
            _ => return Err(OcrError::Detection("Unexpected output type".to_string())),
        };

        debug!("Detection output shape: {:?}", predictions.shape());

        let candidates = self.decode(&predictions, ratio)?;
        let kept = non_max_suppression(candidates, self.nms_threshold);

        let (width, height) = image.dimensions();
        let boxes: Vec<BoundingBox> = kept
            .iter()
            .map(|c| clip_to_image(c, width, height))
            .filter(|b| !b.is_empty())
            .collect();

        debug!("Detected {} glyph regions", boxes.len());
        Ok(boxes)
    }

    /// Decode raw head output `[1, N, 5 + classes]` into scored candidates.
    fn decode(&self, predictions: &ArrayD<f32>, ratio: f32) -> Result<Vec<Candidate>, OcrError> {
        let shape = predictions.shape();
        if shape.len() != 3 || shape[0] == 0 || shape[2] < 6 {
            return Err(OcrError::Detection(format!(
                "Invalid output shape: {:?}",
                shape
            )));
        }

        let grid = grid_cells(self.input_size);
        if grid.len() != shape[1] {
            return Err(OcrError::Detection(format!(
                "Output has {} anchors, expected {} for input size {}",
                shape[1],
                grid.len(),
                self.input_size
            )));
        }

        let num_fields = shape[2];
        let mut candidates = Vec::new();

        for (i, &(gx, gy, stride)) in grid.iter().enumerate() {
            let objectness = predictions[[0, i, 4]];
            let class_score = (5..num_fields)
                .map(|k| predictions[[0, i, k]])
                .fold(f32::NEG_INFINITY, f32::max);
            let score = objectness * class_score;

            if score < self.score_threshold {
                continue;
            }

            let cx = (predictions[[0, i, 0]] + gx) * stride;
            let cy = (predictions[[0, i, 1]] + gy) * stride;
            let w = predictions[[0, i, 2]].exp() * stride;
            let h = predictions[[0, i, 3]].exp() * stride;

            candidates.push(Candidate {
                x1: (cx - w / 2.0) / ratio,
                y1: (cy - h / 2.0) / ratio,
                x2: (cx + w / 2.0) / ratio,
                y2: (cy + h / 2.0) / ratio,
                score,
            });
        }

        debug!(
            "{} candidates above score threshold {}",
            candidates.len(),
            self.score_threshold
        );

        Ok(candidates)
    }
}

impl<B: InferenceBackend> RegionDetector for TextDetector<B> {
    fn detect(&self, image: &DynamicImage) -> Result<Vec<BoundingBox>, OcrError> {
        self.detect_boxes(image)
    }
}

/// Grid cell offsets and strides in head output order.
fn grid_cells(input_size: u32) -> Vec<(f32, f32, f32)> {
    let mut cells = Vec::new();

    for stride in STRIDES {
        let cells_per_side = input_size / stride;
        for y in 0..cells_per_side {
            for x in 0..cells_per_side {
                cells.push((x as f32, y as f32, stride as f32));
            }
        }
    }

    cells
}

/// Greedy NMS: keep the best-scoring box, drop everything overlapping it
/// above `iou_threshold`, repeat.
pub fn non_max_suppression(mut candidates: Vec<Candidate>, iou_threshold: f32) -> Vec<Candidate> {
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut kept: Vec<Candidate> = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if kept.iter().all(|k| k.iou(&candidate) <= iou_threshold) {
            kept.push(candidate);
        }
    }

    kept
}

fn clip_to_image(candidate: &Candidate, width: u32, height: u32) -> BoundingBox {
    let w = width as f32;
    let h = height as f32;

    BoundingBox::new(
        candidate.x1.clamp(0.0, w).round() as u32,
        candidate.y1.clamp(0.0, h).round() as u32,
        candidate.x2.clamp(0.0, w).round() as u32,
        candidate.y2.clamp(0.0, h).round() as u32,
    )
}
