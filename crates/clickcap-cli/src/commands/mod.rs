//! Subcommand implementations.

pub mod batch;
pub mod config;
pub mod parse;
pub mod solve;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use tracing::debug;

use clickcap_core::models::ClickcapConfig;
use clickcap_core::{CaptchaSolver, TextDetector, TextRecognizer, create_solver_from_dir};
use clickcap_core::OrtBackend;

/// Solver type backed by ONNX Runtime models.
pub type OrtSolver = CaptchaSolver<TextDetector<OrtBackend>, TextRecognizer<OrtBackend>>;

/// Load configuration from `--config`, the user config file, or defaults.
pub fn load_config(config_path: Option<&str>) -> anyhow::Result<ClickcapConfig> {
    if let Some(path) = config_path {
        return ClickcapConfig::from_file(Path::new(path))
            .with_context(|| format!("Failed to load config from {}", path));
    }

    let default_path = config::default_config_path();
    if default_path.exists() {
        debug!("Using config from {}", default_path.display());
        Ok(ClickcapConfig::from_file(&default_path)?)
    } else {
        Ok(ClickcapConfig::default())
    }
}

/// Load the solver models from `model_dir` (or the configured directory).
pub fn load_solver(
    model_dir: Option<&Path>,
    config: &ClickcapConfig,
) -> anyhow::Result<OrtSolver> {
    let model_dir: PathBuf = model_dir
        .map(Path::to_path_buf)
        .unwrap_or_else(|| config.models.model_dir.clone());

    for name in [
        &config.models.detection_model,
        &config.models.recognition_model,
        &config.models.charset,
    ] {
        let path = model_dir.join(name);
        if !path.exists() {
            anyhow::bail!(
                "Model file not found: {}\n\n\
                 Point --model-dir (or 'models.model_dir' in the config) at a directory \
                 containing {}, {} and {}.",
                path.display(),
                config.models.detection_model,
                config.models.recognition_model,
                config.models.charset
            );
        }
    }

    create_solver_from_dir(&model_dir, config)
        .map_err(|e| anyhow::anyhow!("Failed to load captcha models: {}", e))
}

/// Read captcha image bytes from a file path or an inline `data:image/` URI.
pub fn load_image_bytes(source: &str) -> anyhow::Result<Vec<u8>> {
    if source.trim_start().starts_with("data:") {
        return Ok(clickcap_core::decode_data_uri(source)?);
    }

    fs::read(source).with_context(|| format!("Failed to read image {}", source))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_load_image_bytes_from_data_uri() {
        let bytes = load_image_bytes("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn test_load_image_bytes_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("captcha.png");
        fs::write(&path, b"png").unwrap();

        let bytes = load_image_bytes(path.to_str().unwrap()).unwrap();
        assert_eq!(bytes, b"png");
    }

    #[test]
    fn test_missing_image_is_error() {
        assert!(load_image_bytes("/nonexistent/captcha.png").is_err());
    }

    #[test]
    fn test_missing_models_are_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_solver(Some(dir.path()), &ClickcapConfig::default())
            .err()
            .unwrap();
        assert!(err.to_string().contains("det.onnx"));
    }

    #[test]
    fn test_explicit_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"retry": {"max_attempts": 2}}"#).unwrap();

        let config = load_config(path.to_str()).unwrap();
        assert_eq!(config.retry.max_attempts, 2);
    }
}
