// THEORY:
// `PipelineConfig` is the single tunable knob-set for the engine. Everything
// here has a sane default so a caller can run `PipelineConfig::default()` and
// get the reference behavior (400px working resolution, triangle resampling).
// The scoring weights are not configurable; they live in `confidence::weights`.

use crate::error::{AnalysisError, Result};
use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_MAX_SIZE: u32 = 400;
pub const DEFAULT_NO_TEXT_SENTINEL: &str = "No text detected";

/// Resampling filter used when drawing the decoded image onto the working surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResizeFilter {
    Nearest,
    #[default]
    Triangle,
    CatmullRom,
    Lanczos3,
}

impl From<ResizeFilter> for FilterType {
    fn from(filter: ResizeFilter) -> Self {
        match filter {
            ResizeFilter::Nearest => FilterType::Nearest,
            ResizeFilter::Triangle => FilterType::Triangle,
            ResizeFilter::CatmullRom => FilterType::CatmullRom,
            ResizeFilter::Lanczos3 => FilterType::Lanczos3,
        }
    }
}

/// Configuration for the diagnostic pipeline, allowing for tunable behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// The working resolution cap used to compute the uniform scale ratio.
    pub max_size: u32,
    pub resize_filter: ResizeFilter,
    /// Extracted text equal to this marker is treated like empty text.
    pub no_text_sentinel: String,
    /// Number of workers in the parallel pipeline.
    pub worker_count: usize,
    /// Default tracing filter for binaries when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_MAX_SIZE,
            resize_filter: ResizeFilter::default(),
            no_text_sentinel: DEFAULT_NO_TEXT_SENTINEL.to_string(),
            worker_count: num_cpus::get().max(1),
            log_filter: "info".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Reads a JSON config file. Missing fields fall back to their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| AnalysisError::Config(format!("{}: {e}", path.display())))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(raw).map_err(|e| AnalysisError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(AnalysisError::Config("max_size must be greater than 0".into()));
        }
        if self.worker_count == 0 {
            return Err(AnalysisError::Config("worker_count must be greater than 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_reference_behavior() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_size, 400);
        assert_eq!(config.resize_filter, ResizeFilter::Triangle);
        assert_eq!(config.no_text_sentinel, "No text detected");
        assert!(config.worker_count >= 1);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config = PipelineConfig::from_json(r#"{ "max_size": 256, "resize_filter": "nearest" }"#)
            .expect("valid config");
        assert_eq!(config.max_size, 256);
        assert_eq!(config.resize_filter, ResizeFilter::Nearest);
        assert_eq!(config.no_text_sentinel, DEFAULT_NO_TEXT_SENTINEL);
    }

    #[test]
    fn zero_max_size_is_rejected() {
        let err = PipelineConfig::from_json(r#"{ "max_size": 0 }"#).unwrap_err();
        assert!(matches!(err, AnalysisError::Config(_)));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        let err = PipelineConfig::from_json("{ max_size: ").unwrap_err();
        assert!(matches!(err, AnalysisError::Config(_)));
    }

    #[test]
    fn reads_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("pipeline.json");
        std::fs::write(&path, r#"{ "worker_count": 2 }"#).expect("write config");
        let config = PipelineConfig::from_file(&path).expect("config from file");
        assert_eq!(config.worker_count, 2);
        assert!(PipelineConfig::from_file(dir.path().join("missing.json")).is_err());
    }
}
