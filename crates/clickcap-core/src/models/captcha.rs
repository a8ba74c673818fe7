//! Captcha solving data model: regions, click points and solve outcomes.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Axis-aligned glyph box in source-image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl BoundingBox {
    /// Create a box from its corners.
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Center point, rounded down to whole pixels.
    pub fn center(&self) -> (u32, u32) {
        (self.x1 + self.width() / 2, self.y1 + self.height() / 2)
    }

    pub fn width(&self) -> u32 {
        self.x2.saturating_sub(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.saturating_sub(self.y1)
    }

    /// Whether the box encloses no pixels.
    pub fn is_empty(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}

/// A detected glyph region together with its recognized text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Glyph bounding box.
    pub bbox: BoundingBox,

    /// Recognized text (empty when recognition produced nothing).
    pub text: String,

    /// Trust in `text`; only used to rank regions with the same text.
    pub confidence: f32,
}

impl Region {
    /// Create a labeled region.
    pub fn new(bbox: BoundingBox, text: impl Into<String>, confidence: f32) -> Self {
        Self {
            bbox,
            text: text.into(),
            confidence,
        }
    }

    /// A region recognition could not read.
    pub fn unlabeled(bbox: BoundingBox) -> Self {
        Self::new(bbox, String::new(), 0.0)
    }

    pub fn center(&self) -> (u32, u32) {
        self.bbox.center()
    }

    /// Whether recognition produced any text for this region.
    pub fn is_labeled(&self) -> bool {
        !self.text.is_empty()
    }
}

/// One resolved click site, relative to the captcha image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClickPoint {
    pub x: u32,
    pub y: u32,
    /// Target character this click satisfies.
    pub character: char,
    /// Confidence of the region the click was taken from.
    pub confidence: f32,
}

impl ClickPoint {
    /// Map the point into page coordinates given the image element's on-page origin.
    pub fn to_page(&self, origin_x: f64, origin_y: f64) -> (f64, f64) {
        (origin_x + f64::from(self.x), origin_y + f64::from(self.y))
    }
}

/// Why a solve attempt produced no usable click sequence.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    /// The instruction contained no target characters.
    #[error("cannot parse instruction")]
    InstructionParse,

    /// The detector found no glyph regions.
    #[error("no regions detected")]
    NoRegionsDetected,

    /// Regions were found but none matched a target character.
    #[error("no matching click points")]
    NoMatch,

    /// The image bytes could not be decoded.
    #[error("invalid image: {0}")]
    InvalidImage(String),

    /// The detector itself failed on this image.
    #[error("detection failed: {0}")]
    DetectionFailed(String),
}

/// Outcome of a single solve invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SolveResult {
    /// Every target character resolved to a click, in instruction order.
    Success { click_points: Vec<ClickPoint> },

    /// Some targets resolved; a fresh challenge will likely do better.
    PartialSuccess {
        found: Vec<char>,
        missing: Vec<char>,
        click_points: Vec<ClickPoint>,
    },

    /// Nothing usable.
    Failure { reason: FailureReason },
}

impl SolveResult {
    pub fn failure(reason: FailureReason) -> Self {
        SolveResult::Failure { reason }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, SolveResult::Success { .. })
    }

    /// Whether the driver should refresh the challenge and try again.
    pub fn needs_refresh(&self) -> bool {
        !self.is_success()
    }

    /// Click points to perform, in order. Empty for failures.
    pub fn click_points(&self) -> &[ClickPoint] {
        match self {
            SolveResult::Success { click_points }
            | SolveResult::PartialSuccess { click_points, .. } => click_points,
            SolveResult::Failure { .. } => &[],
        }
    }

    /// Short status label used in logs and summaries.
    pub fn status(&self) -> &'static str {
        match self {
            SolveResult::Success { .. } => "success",
            SolveResult::PartialSuccess { .. } => "partial",
            SolveResult::Failure { .. } => "failure",
        }
    }
}
