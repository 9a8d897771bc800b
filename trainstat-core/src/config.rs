//! Configuration for the status inspector.
//!
//! Uses `figment` for layered configuration: defaults -> config files -> environment -> CLI args.
//! Configuration is loaded from `~/.config/trainstat/config.toml`, `.trainstat/config.toml`
//! in the workspace directory, and an optional explicit file.

use crate::error::StatusError;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings that mirror the training loop's configuration.
///
/// Relative paths are resolved against the inspected workspace.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InspectorConfig {
    /// Directory the training loop writes checkpoints into.
    #[serde(default = "default_checkpoint_dir")]
    pub checkpoint_dir: PathBuf,
    /// File-name glob selecting checkpoint files.
    #[serde(default = "default_checkpoint_pattern")]
    pub checkpoint_pattern: String,
    /// Directory holding exported models.
    #[serde(default = "default_saved_models_dir")]
    pub saved_models_dir: PathBuf,
    /// File-name glob selecting exported models.
    #[serde(default = "default_saved_model_pattern")]
    pub saved_model_pattern: String,
    /// Number of epochs the run is configured for.
    #[serde(default = "default_total_epochs")]
    pub total_epochs: u64,
    /// Rough wall-clock cost of one epoch, in hours.
    #[serde(default = "default_hours_per_epoch")]
    pub hours_per_epoch: f64,
    /// Dataset directory whose presence is reported.
    #[serde(default = "default_dataset_path")]
    pub dataset_path: PathBuf,
    /// What the user re-runs to resume training.
    #[serde(default = "default_resume_entry_point")]
    pub resume_entry_point: String,
}

impl Default for InspectorConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir: default_checkpoint_dir(),
            checkpoint_pattern: default_checkpoint_pattern(),
            saved_models_dir: default_saved_models_dir(),
            saved_model_pattern: default_saved_model_pattern(),
            total_epochs: default_total_epochs(),
            hours_per_epoch: default_hours_per_epoch(),
            dataset_path: default_dataset_path(),
            resume_entry_point: default_resume_entry_point(),
        }
    }
}

impl InspectorConfig {
    /// Reject values that would make the progress figures meaningless.
    pub fn validate(&self) -> Result<(), StatusError> {
        if self.total_epochs == 0 {
            return Err(StatusError::config("total_epochs must be at least 1"));
        }
        if !self.hours_per_epoch.is_finite() || self.hours_per_epoch < 0.0 {
            return Err(StatusError::config(format!(
                "hours_per_epoch must be a non-negative number, got {}",
                self.hours_per_epoch
            )));
        }
        if self.checkpoint_pattern.trim().is_empty() || self.saved_model_pattern.trim().is_empty() {
            return Err(StatusError::config("file patterns must not be empty"));
        }
        Ok(())
    }
}

fn default_checkpoint_dir() -> PathBuf {
    PathBuf::from("checkpoints")
}

fn default_checkpoint_pattern() -> String {
    "checkpoint_epoch_*.safetensors".to_string()
}

fn default_saved_models_dir() -> PathBuf {
    PathBuf::from("saved_models")
}

fn default_saved_model_pattern() -> String {
    "*.safetensors".to_string()
}

fn default_total_epochs() -> u64 {
    50
}

fn default_hours_per_epoch() -> f64 {
    0.2
}

const DATASET_CACHE_SUFFIX: &str = ".cache/kagglehub/datasets/awsaf49/coco-2017-dataset/versions/2";

fn default_dataset_path() -> PathBuf {
    directories::BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(DATASET_CACHE_SUFFIX))
        .unwrap_or_else(|| PathBuf::from(DATASET_CACHE_SUFFIX))
}

fn default_resume_entry_point() -> String {
    "colorization-model.ipynb".to_string()
}

/// Command-line overrides. Unset fields leave lower layers untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_epochs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hours_per_epoch: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_path: Option<PathBuf>,
}

impl ConfigOverrides {
    /// Apply directly to an already-built config, used when layered loading fails.
    pub fn apply_to(&self, config: &mut InspectorConfig) {
        if let Some(total) = self.total_epochs {
            config.total_epochs = total;
        }
        if let Some(hours) = self.hours_per_epoch {
            config.hours_per_epoch = hours;
        }
        if let Some(path) = &self.dataset_path {
            config.dataset_path = path.clone();
        }
    }
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `TRAINSTAT_`)
/// 3. Explicit config file (`--config`)
/// 4. Workspace-local config (`.trainstat/config.toml`)
/// 5. User config (`~/.config/trainstat/config.toml`)
/// 6. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    config_file: Option<&Path>,
    overrides: Option<&ConfigOverrides>,
) -> Result<InspectorConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(InspectorConfig::default()));

    // User-level config
    if let Some(config_dir) = directories::ProjectDirs::from("dev", "trainstat", "trainstat") {
        let user_config = config_dir.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    // Workspace-level config
    if let Some(ws) = workspace {
        let ws_config = ws.join(".trainstat").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // A file named on the command line must exist.
    if let Some(file) = config_file {
        if !file.is_file() {
            return Err(Box::new(figment::Error::from(format!(
                "config file not found: {}",
                file.display()
            ))));
        }
        figment = figment.merge(Toml::file(file));
    }

    // Environment variables (TRAINSTAT_TOTAL_EPOCHS, TRAINSTAT_DATASET_PATH, etc.)
    figment = figment.merge(Env::prefixed("TRAINSTAT_").ignore(&["log_dir"]));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(Box::new)
}
