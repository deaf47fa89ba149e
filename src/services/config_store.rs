// Configuration Storage Service
// Handles config file read/write, validation and version backup

use crate::models::Frame;
use crate::services::retention::prune_oldest;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_INFERENCE_URL: &str = "https://api-inference.huggingface.co/models";
const BACKUPS_KEPT: usize = 10;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to {action} {path}: {source}")]
    Io {
        action: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

impl ConfigError {
    fn io(action: &'static str, path: &Path, source: std::io::Error) -> Self {
        ConfigError::Io {
            action,
            path: path.to_path_buf(),
            source,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub segmentation: SegmentationConfig,
    #[serde(default)]
    pub detection: DetectionConfig,
    #[serde(default)]
    pub inference: InferenceConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            segmentation: SegmentationConfig::default(),
            detection: DetectionConfig::default(),
            inference: InferenceConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentationConfig {
    #[serde(default = "default_window_size")]
    pub window_size: usize,
    #[serde(default = "default_overlap")]
    pub overlap: usize,
    #[serde(default = "default_leadership_radius")]
    pub leadership_context_radius: usize,
}

impl Default for SegmentationConfig {
    fn default() -> Self {
        Self {
            window_size: default_window_size(),
            overlap: default_overlap(),
            leadership_context_radius: default_leadership_radius(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionConfig {
    #[serde(default = "default_threshold")]
    pub threshold: f64,
    #[serde(default = "default_frame_labels")]
    pub frame_labels: Vec<Frame>,
    #[serde(default = "default_zero_shot_model")]
    pub zero_shot_model: String,
    pub fine_tuned_endpoint: Option<String>,
    pub linear_model_path: Option<PathBuf>,
    pub ensemble_weights: Option<Vec<f64>>,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            threshold: default_threshold(),
            frame_labels: default_frame_labels(),
            zero_shot_model: default_zero_shot_model(),
            fine_tuned_endpoint: None,
            linear_model_path: None,
            ensemble_weights: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InferenceConfig {
    pub base_url: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_version() -> String { "1.0.0".to_string() }
fn default_window_size() -> usize { 3 }
fn default_overlap() -> usize { 1 }
fn default_leadership_radius() -> usize { 150 }
fn default_threshold() -> f64 { 0.5 }
fn default_frame_labels() -> Vec<Frame> { Frame::ALL.to_vec() }
fn default_zero_shot_model() -> String { "facebook/bart-large-mnli".to_string() }
fn default_timeout_secs() -> u64 { 80 }

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let seg = &self.segmentation;
        if seg.window_size == 0 {
            return Err(ConfigError::Invalid("windowSize must be at least 1".to_string()));
        }
        if seg.overlap >= seg.window_size {
            return Err(ConfigError::Invalid(format!(
                "overlap ({}) must be smaller than windowSize ({})",
                seg.overlap, seg.window_size
            )));
        }

        let det = &self.detection;
        if !(0.0..=1.0).contains(&det.threshold) {
            return Err(ConfigError::Invalid(format!(
                "threshold must be in [0, 1], got {}",
                det.threshold
            )));
        }

        let mut labels = det.frame_labels.clone();
        labels.sort();
        labels.dedup();
        if labels.len() != Frame::ALL.len() || det.frame_labels.len() != Frame::ALL.len() {
            return Err(ConfigError::Invalid(
                "frameLabels must list each of the four frames exactly once".to_string(),
            ));
        }

        if let Some(weights) = &det.ensemble_weights {
            if weights.iter().any(|w| !w.is_finite() || *w < 0.0) {
                return Err(ConfigError::Invalid(
                    "ensembleWeights must be finite and non-negative".to_string(),
                ));
            }
            let sum: f64 = weights.iter().sum();
            if (sum - 1.0).abs() > 1e-6 {
                return Err(ConfigError::Invalid(format!(
                    "ensembleWeights must sum to 1.0, got {}",
                    sum
                )));
            }
        }

        Ok(())
    }

    /// Inference base URL: config first, then `LEADFRAME_INFERENCE_URL`, then the hosted default.
    pub fn inference_base_url(&self) -> String {
        let from_config = self
            .inference
            .base_url
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string);

        from_config
            .or_else(|| non_empty_env("LEADFRAME_INFERENCE_URL"))
            .unwrap_or_else(|| DEFAULT_INFERENCE_URL.to_string())
            .trim_end_matches('/')
            .to_string()
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Hosted inference token from `LEADFRAME_API_TOKEN`, then `HF_API_TOKEN`.
pub fn api_token_from_env() -> Option<String> {
    non_empty_env("LEADFRAME_API_TOKEN").or_else(|| non_empty_env("HF_API_TOKEN"))
}

pub struct ConfigStore {
    config_dir: PathBuf,
    config_file: PathBuf,
}

impl ConfigStore {
    pub fn new(config_dir: PathBuf) -> Self {
        let config_file = config_dir.join("config.json");
        Self { config_dir, config_file }
    }

    /// Get default config directory
    pub fn default_config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("leadframe"))
    }

    pub fn config_file(&self) -> &Path {
        &self.config_file
    }

    /// Ensure config directory exists
    pub fn ensure_dir(&self) -> Result<(), ConfigError> {
        fs::create_dir_all(&self.config_dir)
            .map_err(|e| ConfigError::io("create config dir", &self.config_dir, e))
    }

    /// Load and validate configuration; a missing file yields defaults.
    pub fn load(&self) -> Result<AppConfig, ConfigError> {
        if !self.config_file.exists() {
            return Ok(AppConfig::default());
        }

        let content = fs::read_to_string(&self.config_file)
            .map_err(|e| ConfigError::io("read", &self.config_file, e))?;

        let config: AppConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate, back up the previous file, then write.
    pub fn save(&self, config: &AppConfig) -> Result<(), ConfigError> {
        config.validate()?;
        self.ensure_dir()?;

        if self.config_file.exists() {
            self.create_backup()?;
        }

        let content = serde_json::to_string_pretty(config)?;

        fs::write(&self.config_file, content)
            .map_err(|e| ConfigError::io("write", &self.config_file, e))
    }

    fn create_backup(&self) -> Result<(), ConfigError> {
        let backup_dir = self.config_dir.join("backups");
        fs::create_dir_all(&backup_dir)
            .map_err(|e| ConfigError::io("create backup dir", &backup_dir, e))?;

        let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S_%3f");
        let backup_file = backup_dir.join(format!("config_{}.json", timestamp));

        fs::copy(&self.config_file, &backup_file)
            .map_err(|e| ConfigError::io("back up", &self.config_file, e))?;

        prune_oldest(&backup_dir, BACKUPS_KEPT, |name| {
            name.starts_with("config_") && name.ends_with(".json")
        })
        .map_err(|e| ConfigError::io("prune backups", &backup_dir, e))?;

        Ok(())
    }
}
