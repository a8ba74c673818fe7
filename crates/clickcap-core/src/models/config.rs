//! Configuration structures for the captcha solver and its driver.

use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Main configuration for clickcap.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClickcapConfig {
    /// Glyph detector configuration.
    pub detection: DetectionConfig,

    /// Model configuration.
    pub models: ModelConfig,

    /// Driver retry policy.
    pub retry: RetryPolicy,
}

/// Glyph detector configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Square input size of the detection model (must be a multiple of 32).
    pub input_size: u32,

    /// Minimum objectness × class score for a candidate box.
    pub score_threshold: f32,

    /// IoU above which overlapping candidates are suppressed.
    pub nms_threshold: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            input_size: 416,
            score_threshold: 0.1,
            nms_threshold: 0.45,
        }
    }
}

/// Model file locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Directory containing model files.
    pub model_dir: PathBuf,

    /// Glyph detection model file name.
    pub detection_model: String,

    /// Character recognition model file name.
    pub recognition_model: String,

    /// Recognition charset file name (one entry per line).
    pub charset: String,

    /// Number of CPU threads per inference session.
    pub num_threads: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model_dir: PathBuf::from("models"),
            detection_model: "det.onnx".to_string(),
            recognition_model: "rec.onnx".to_string(),
            charset: "charset.txt".to_string(),
            num_threads: 4,
        }
    }
}

/// How the driver paces clicks and how often it refreshes a failed challenge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Solve attempts per login, including the first.
    pub max_attempts: u32,

    /// Lower bound of the pause between two clicks.
    pub min_click_pause_ms: u64,

    /// Upper bound of the pause between two clicks.
    pub max_click_pause_ms: u64,

    /// Wait after requesting a fresh challenge before reading it.
    pub refresh_settle_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            min_click_pause_ms: 200,
            max_click_pause_ms: 500,
            refresh_settle_ms: 2000,
        }
    }
}

impl RetryPolicy {
    /// Whether attempt number `attempt` (0-based) is still within budget.
    pub fn allows(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// Randomized pause to insert between consecutive clicks.
    pub fn click_pause<R: Rng>(&self, rng: &mut R) -> Duration {
        let low = self.min_click_pause_ms.min(self.max_click_pause_ms);
        let high = self.min_click_pause_ms.max(self.max_click_pause_ms);
        Duration::from_millis(rng.gen_range(low..=high))
    }

    pub fn refresh_settle(&self) -> Duration {
        Duration::from_millis(self.refresh_settle_ms)
    }
}

impl ClickcapConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}
