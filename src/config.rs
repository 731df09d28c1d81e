//! Application configuration
//!
//! Configuration is loaded from multiple sources with the following priority (lowest to highest):
//! 1. `config/default.toml` (version controlled)
//! 2. `config/user.toml` (gitignored, user overrides)
//! 3. Environment variables (`PHANTASM_SECTION__KEY`)

use figment::{Figment, providers::{Format, Toml, Env}};
use serde::{Serialize, Deserialize};
use std::path::Path;
use thiserror::Error;

use phantasm_core::DEFAULT_RESOURCE_DIRS;

/// Main application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Frame loop configuration
    #[serde(default)]
    pub engine: EngineConfig,
    /// Resource cache configuration
    #[serde(default)]
    pub resources: ResourcesConfig,
    /// Debug configuration
    #[serde(default)]
    pub debug: DebugConfig,
}

impl AppConfig {
    /// Load configuration from default locations
    ///
    /// Priority (lowest to highest):
    /// 1. `config/default.toml`
    /// 2. `config/user.toml`
    /// 3. Environment variables (`PHANTASM_*`)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load configuration from a specific config directory
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_dir = config_dir.as_ref();
        let default_path = config_dir.join("default.toml");
        let user_path = config_dir.join("user.toml");

        let mut figment = Figment::new();

        if default_path.exists() {
            figment = figment.merge(Toml::file(&default_path));
        }

        // Load user config (optional)
        if user_path.exists() {
            figment = figment.merge(Toml::file(&user_path));
        }

        // Environment variables override everything
        // PHANTASM_ENGINE__TITLE=Test -> engine.title = "Test"
        figment = figment.merge(Env::prefixed("PHANTASM_").split("__"));

        let config: Self = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the frame loop cannot run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let engine = &self.engine;
        if engine.fixed_time_step.is_nan() || engine.fixed_time_step <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "engine.fixed_time_step must be positive (got {})",
                engine.fixed_time_step
            )));
        }
        if engine.max_frame_time < engine.fixed_time_step {
            return Err(ConfigError::Invalid(format!(
                "engine.max_frame_time ({}) must be at least engine.fixed_time_step ({})",
                engine.max_frame_time, engine.fixed_time_step
            )));
        }
        if engine.time_scale.is_nan() || engine.time_scale < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "engine.time_scale must not be negative (got {})",
                engine.time_scale
            )));
        }
        if self.debug.log_level.parse::<log::LevelFilter>().is_err() {
            return Err(ConfigError::Invalid(format!(
                "debug.log_level '{}' is not one of off, error, warn, info, debug, trace",
                self.debug.log_level
            )));
        }
        Ok(())
    }
}

/// Frame loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Application title (shown in logs)
    pub title: String,
    /// Fixed update step in seconds
    pub fixed_time_step: f32,
    /// Longest frame the clock accepts, in seconds (longer frames are clamped)
    pub max_frame_time: f32,
    /// Multiplier applied to frame time (0 pauses updates)
    pub time_scale: f32,
    /// Frames the headless demo runs before shutting down
    pub max_frames: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            title: "Phantasm Framework".to_string(),
            fixed_time_step: 1.0 / 60.0,
            max_frame_time: 0.25,
            time_scale: 1.0,
            max_frames: 600,
        }
    }
}

/// Resource cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourcesConfig {
    /// Directory relative resource paths are resolved against
    pub base_dir: String,
    /// Create `default_dirs` under `base_dir` at startup
    pub create_default_dirs: bool,
    /// Resource subdirectories
    pub default_dirs: Vec<String>,
}

impl Default for ResourcesConfig {
    fn default() -> Self {
        Self {
            base_dir: "resources/".to_string(),
            create_default_dirs: false,
            default_dirs: DEFAULT_RESOURCE_DIRS.iter().map(|d| d.to_string()).collect(),
        }
    }
}

/// Debug configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level (off, error, warn, info, debug, trace)
    pub log_level: String,
    /// Periodically log frame timing
    pub log_frame_stats: bool,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_frame_stats: false,
        }
    }
}

impl DebugConfig {
    /// The configured level as a `log` filter (falls back to `Info`)
    pub fn level_filter(&self) -> log::LevelFilter {
        self.log_level.parse().unwrap_or(log::LevelFilter::Info)
    }
}

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or did not match the schema
    #[error("Configuration error: {0}")]
    Figment(#[from] figment::Error),

    /// Values parsed but are unusable
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}
