//! # Configuration System
//!
//! Application settings from TOML files and environment variables.
//!
//! ## Configuration Sources (in priority order)
//!
//! 1. Command-line flags (applied by the binary)
//! 2. Environment variables (`DESKPILOT_*`, plus `OPENAI_API_KEY` as a key fallback)
//! 3. An explicit `--config` file
//! 4. `./deskpilot.toml`
//! 5. Global config (`<config dir>/deskpilot/config.toml`)
//! 6. Default values
//!
//! ## Example
//!
//! ```ignore
//! let config = AppConfig::load(None)?;
//! config.validate()?;
//! println!("Model: {}", config.model.model);
//! ```

use deskpilot_providers::openai::{DEFAULT_BASE_URL, DEFAULT_MODEL};
use deskpilot_providers::remote::DEFAULT_REMOTE_URL;
use deskpilot_vision::{CaptureSettings, InputSettings};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur in configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Missing required setting: {0}")]
    MissingField(String),

    #[error(transparent)]
    Settings(#[from] deskpilot_vision::ConfigError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Which model client the loop talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelProvider {
    /// OpenAI Responses API
    OpenAi,
    /// A proxy server that owns the real credentials
    Remote,
}

impl FromStr for ModelProvider {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "remote" => Ok(Self::Remote),
            other => Err(ConfigError::InvalidConfig(format!(
                "Unknown provider '{other}' (expected 'openai' or 'remote')"
            ))),
        }
    }
}

/// Model client configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// `openai` or `remote`
    pub provider: String,

    /// API key (prefer the environment in practice)
    pub api_key: Option<String>,

    pub model: String,

    /// OpenAI-compatible base URL, normalized to end with `/`
    pub base_url: String,

    /// Proxy endpoint for the `remote` provider
    pub remote_url: String,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            remote_url: DEFAULT_REMOTE_URL.to_string(),
            request_timeout_secs: 60,
        }
    }
}

/// Control loop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Upper bound on planning iterations per objective
    pub max_steps: u32,

    /// Pause after each executed step
    pub step_delay_ms: u64,

    /// Ask the model to prefer keyboard navigation
    pub keyboard_only_mode: bool,

    pub system_prompt_path: PathBuf,

    /// Debug transcript; an empty path disables it
    pub transcript_path: Option<PathBuf>,

    /// Save each turn's screenshot here as `turn_NNN.png`
    pub screenshot_dir: Option<PathBuf>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            max_steps: 30,
            step_delay_ms: 500,
            keyboard_only_mode: false,
            system_prompt_path: PathBuf::from("prompts").join("system_prompt.txt"),
            transcript_path: Some(PathBuf::from("output.txt")),
            screenshot_dir: None,
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub model: ModelConfig,

    #[serde(default)]
    pub run: RunConfig,

    #[serde(default)]
    pub input: InputSettings,

    #[serde(default)]
    pub capture: CaptureSettings,

    /// Path this config was last loaded from
    #[serde(skip)]
    loaded_from: Option<PathBuf>,
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from the default locations plus an optional explicit file, then
    /// apply environment overrides. The explicit file must exist.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                debug!("Loading global config from {:?}", global_path);
                config = config.merge_from_file(&global_path)?;
            }
        }

        let local_path = Self::project_config_path();
        if local_path.exists() {
            debug!("Loading project config from {:?}", local_path);
            config = config.merge_from_file(&local_path)?;
        }

        if let Some(path) = explicit {
            debug!("Loading config from {:?}", path);
            config = config.merge_from_file(path)?;
        }

        Ok(config.apply_env_overrides())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;
        config.loaded_from = Some(path.to_path_buf());
        Ok(config)
    }

    /// Merge configuration from a file. Keys present in the file replace the
    /// current values; everything else is kept.
    pub fn merge_from_file(self, path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        let overlay: toml::Table = toml::from_str(&content)?;

        let mut merged = toml::Table::try_from(&self)
            .map_err(|e| ConfigError::SerializationError(e.to_string()))?;
        merge_tables(&mut merged, overlay);

        let mut config: Self = merged.try_into()?;
        config.loaded_from = Some(path.to_path_buf());
        Ok(config)
    }

    /// Apply environment variable overrides
    pub fn apply_env_overrides(self) -> Self {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any variable source.
    pub fn apply_overrides_from<F>(mut self, var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(provider) = var("DESKPILOT_PROVIDER") {
            self.model.provider = provider;
        }

        if let Some(model) = var("DESKPILOT_MODEL") {
            self.model.model = model;
        }

        if let Some(key) = var("DESKPILOT_API_KEY") {
            self.model.api_key = Some(key);
        }

        if let Some(url) = var("DESKPILOT_BASE_URL") {
            self.model.base_url = url;
        }

        if let Some(steps) = var("DESKPILOT_MAX_STEPS") {
            if let Ok(parsed) = steps.trim().parse() {
                debug!("Max steps from env: {}", parsed);
                self.run.max_steps = parsed;
            }
        }

        if let Some(kb) = var("DESKPILOT_KEYBOARD_ONLY") {
            self.run.keyboard_only_mode = kb == "1" || kb.eq_ignore_ascii_case("true");
        }

        let has_key = self
            .model
            .api_key
            .as_deref()
            .is_some_and(|k| !k.trim().is_empty());
        if !has_key {
            if let Some(key) = var("OPENAI_API_KEY") {
                self.model.api_key = Some(key);
            }
        }

        self.model.base_url = normalize_url(&self.model.base_url);
        self
    }

    /// Save configuration to a file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::SerializationError(e.to_string()))?;
        std::fs::write(path, content)?;

        info!("Saved configuration to {:?}", path);
        Ok(())
    }

    /// Get the global config path
    pub fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("deskpilot").join("config.toml"))
    }

    /// `deskpilot.toml` in the working directory
    pub fn project_config_path() -> PathBuf {
        PathBuf::from("deskpilot.toml")
    }

    pub fn loaded_from(&self) -> Option<&Path> {
        self.loaded_from.as_deref()
    }

    pub fn provider(&self) -> Result<ModelProvider> {
        self.model.provider.parse()
    }

    /// Transcript path with the "empty disables" rule applied
    pub fn transcript_path(&self) -> Option<&Path> {
        self.run
            .transcript_path
            .as_deref()
            .filter(|p| !p.as_os_str().is_empty())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.model.request_timeout_secs)
    }

    pub fn step_delay(&self) -> Duration {
        Duration::from_millis(self.run.step_delay_ms)
    }

    pub fn inter_step_delay(&self) -> Duration {
        Duration::from_millis(self.input.inter_step_delay_ms)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.run.max_steps == 0 {
            return Err(ConfigError::InvalidConfig(
                "max_steps must be greater than 0".to_string(),
            ));
        }

        if self.model.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidConfig(
                "request_timeout_secs must be greater than 0".to_string(),
            ));
        }

        match self.provider()? {
            ModelProvider::OpenAi => {
                let has_key = self
                    .model
                    .api_key
                    .as_deref()
                    .is_some_and(|k| !k.trim().is_empty());
                if !has_key {
                    return Err(ConfigError::MissingField(
                        "model.api_key (or OPENAI_API_KEY)".to_string(),
                    ));
                }
            }
            ModelProvider::Remote => {
                if self.model.remote_url.trim().is_empty() {
                    return Err(ConfigError::MissingField("model.remote_url".to_string()));
                }
            }
        }

        self.input.validate()?;
        self.capture.validate()?;
        Ok(())
    }
}

fn normalize_url(url: &str) -> String {
    let trimmed = url.trim();
    if trimmed.is_empty() || trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{trimmed}/")
    }
}

fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match value {
            toml::Value::Table(inner) => match base.get_mut(&key) {
                Some(toml::Value::Table(existing)) => merge_tables(existing, inner),
                _ => {
                    base.insert(key, toml::Value::Table(inner));
                }
            },
            value => {
                base.insert(key, value);
            }
        }
    }
}
