//! Application configuration
//!
//! Supports multiple profiles (debug, release) with different settings.

use std::path::{Path, PathBuf};

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

/// Tick loop configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickConfig {
    /// Ticks per second the loop aims for
    pub target_rate: f64,
    /// Lowest tick rate simulated; longer gaps are clamped to `1 / min_rate`
    pub min_rate: f64,
    /// Multiplier applied to wall time before clamping
    pub time_scale: f64,
}

impl TickConfig {
    /// Checks that the rates are usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = |rate: f64| rate.is_finite() && rate > 0.0;
        if !positive(self.target_rate) {
            return Err(ConfigError::Message(format!(
                "tick.target_rate must be a positive number, got {}",
                self.target_rate
            )));
        }
        if !positive(self.min_rate) {
            return Err(ConfigError::Message(format!(
                "tick.min_rate must be a positive number, got {}",
                self.min_rate
            )));
        }
        if self.min_rate > self.target_rate {
            return Err(ConfigError::Message(format!(
                "tick.min_rate ({}) exceeds tick.target_rate ({})",
                self.min_rate, self.target_rate
            )));
        }
        if !self.time_scale.is_finite() || self.time_scale < 0.0 {
            return Err(ConfigError::Message(format!(
                "tick.time_scale must be zero or more, got {}",
                self.time_scale
            )));
        }
        Ok(())
    }
}

impl Default for TickConfig {
    fn default() -> Self {
        Self {
            target_rate: 60.0,
            min_rate: 15.0,
            time_scale: 1.0,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directives, used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

/// Application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// The active profile (debug, release, etc.)
    pub profile: String,
    #[serde(default)]
    pub tick: TickConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Loads configuration based on the specified profile
    ///
    /// Profiles are loaded from config files in the following order:
    /// 1. config/{profile}.toml (profile-specific configuration)
    /// 2. Environment variables with prefix APP_ (e.g., APP_TICK__TARGET_RATE=120)
    ///
    /// Config files are searched for in:
    /// 1. Next to the executable (target/debug/config or target/release/config)
    /// 2. In the current directory (./config)
    pub fn load(profile: &str) -> Result<Self, ConfigError> {
        let config_dir = Self::find_config_dir().unwrap_or_else(|| PathBuf::from("config"));
        Self::load_from_dir(&config_dir, profile)
    }

    /// Loads configuration from `{dir}/{profile}.toml` plus the environment
    pub fn load_from_dir(dir: &Path, profile: &str) -> Result<Self, ConfigError> {
        let profile_path = dir.join(profile);

        let config = Config::builder()
            .add_source(File::from(profile_path.as_path()).required(false))
            // Use __ as separator for nested fields (e.g., APP_TICK__MIN_RATE)
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override("profile", profile)?
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.tick.validate()?;
        Ok(config)
    }

    /// Finds the config directory by searching in multiple locations
    fn find_config_dir() -> Option<PathBuf> {
        if let Ok(exe_path) = std::env::current_exe()
            && let Some(exe_dir) = exe_path.parent()
        {
            let config_dir = exe_dir.join("config");
            if config_dir.exists() {
                return Some(config_dir);
            }
        }

        let cwd_config = PathBuf::from("config");
        if cwd_config.exists() {
            return Some(cwd_config);
        }

        None
    }

    /// Loads configuration using the APP_PROFILE environment variable,
    /// defaulting to "release"
    pub fn load_from_env() -> Result<Self, ConfigError> {
        let profile = std::env::var("APP_PROFILE").unwrap_or_else(|_| "release".to_string());
        Self::load(&profile)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            profile: "release".to_string(),
            tick: TickConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
