//! Data models and configuration.

pub mod captcha;
pub mod config;

pub use captcha::{BoundingBox, ClickPoint, FailureReason, Region, SolveResult};
pub use config::{ClickcapConfig, DetectionConfig, ModelConfig, RetryPolicy};
