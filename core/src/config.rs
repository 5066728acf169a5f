//! Configuration loading
//!
//! Sources, lowest priority first:
//! 1. Built-in defaults
//! 2. `sqlscript.toml` in the working directory, or the file named by
//!    `--config` / `SQLSCRIPT_CONFIG_PATH` (which must exist)
//! 3. Environment variables such as `SQLSCRIPT__ENGINE__MAX_FRAMES`
//!    (a `.env` file is loaded first)
//! 4. Explicit builder overrides (CLI flags)
//!
//! # Example
//!
//! ```rust,no_run
//! use sqlscript_core::config::Config;
//!
//! let config = Config::builder().max_frames(Some(4096)).build()?;
//! assert_eq!(config.engine.max_frames, 4096);
//! # Ok::<(), sqlscript_core::config::ConfigError>(())
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Prefix of configuration environment variables
pub const ENV_PREFIX: &str = "SQLSCRIPT";

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_VAR: &str = "SQLSCRIPT_CONFIG_PATH";

/// Default config file, without extension
pub const DEFAULT_CONFIG_NAME: &str = "sqlscript";

/// Smallest usable stack: the bottom frame plus one
const MIN_FRAMES: usize = 2;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/* ===================== Config ===================== */

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub engine: EngineConfig,
    #[serde(default)]
    pub log: LogConfig,
}

/// Evaluator settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Continuation stack capacity; exceeding it is a stack overflow
    pub max_frames: usize,
    /// Keep the top-level scope between runs (interactive mode)
    pub keep_env: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_frames: 100_000,
            keep_env: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: "warn".to_string(),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Load from the default sources
    pub fn load() -> Result<Config, ConfigError> {
        Self::builder().build()
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.engine.max_frames < MIN_FRAMES {
            return Err(ConfigError::Invalid(format!(
                "engine.max_frames must be at least {}, got {}",
                MIN_FRAMES, self.engine.max_frames
            )));
        }
        if self.log.filter.trim().is_empty() {
            return Err(ConfigError::Invalid("log.filter must not be empty".into()));
        }
        Ok(())
    }
}

/* ===================== Builder ===================== */

#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    max_frames: Option<usize>,
    keep_env: Option<bool>,
    log_filter: Option<String>,
}

impl ConfigBuilder {
    /// Config file to read instead of the default search
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn max_frames(mut self, max_frames: Option<usize>) -> Self {
        self.max_frames = max_frames;
        self
    }

    pub fn keep_env(mut self, keep_env: Option<bool>) -> Self {
        self.keep_env = keep_env;
        self
    }

    pub fn log_filter(mut self, filter: Option<String>) -> Self {
        self.log_filter = filter;
        self
    }

    pub fn build(self) -> Result<Config, ConfigError> {
        // A missing .env file is fine
        let _ = dotenvy::dotenv();

        let defaults = Config::default();
        let mut builder = config::Config::builder()
            .set_default(
                "engine.max_frames",
                i64::try_from(defaults.engine.max_frames).unwrap_or(i64::MAX),
            )?
            .set_default("engine.keep_env", defaults.engine.keep_env)?
            .set_default("log.filter", defaults.log.filter)?;

        let explicit = self
            .config_path
            .or_else(|| std::env::var_os(CONFIG_PATH_VAR).map(PathBuf::from));
        builder = match explicit {
            Some(path) => builder.add_source(config::File::from(path.as_path()).required(true)),
            None => builder.add_source(
                config::File::new(DEFAULT_CONFIG_NAME, config::FileFormat::Toml).required(false),
            ),
        };

        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        if let Some(max_frames) = self.max_frames {
            builder = builder.set_override(
                "engine.max_frames",
                i64::try_from(max_frames).unwrap_or(i64::MAX),
            )?;
        }
        if let Some(keep_env) = self.keep_env {
            builder = builder.set_override("engine.keep_env", keep_env)?;
        }
        if let Some(filter) = self.log_filter {
            builder = builder.set_override("log.filter", filter)?;
        }

        let config: Config = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn temp_config(name: &str, contents: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!(
            "sqlscript-{}-{}.toml",
            name,
            std::process::id()
        ));
        fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.engine.max_frames, 100_000);
        assert!(!config.engine.keep_env);
        assert_eq!(config.log.filter, "warn");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_file_then_override() {
        let path = temp_config(
            "override",
            "[engine]\nmax_frames = 512\nkeep_env = true\n\n[log]\nfilter = \"debug\"\n",
        );

        let from_file = Config::builder()
            .config_path(Some(path.clone()))
            .build()
            .unwrap();
        assert_eq!(from_file.engine.max_frames, 512);
        assert!(from_file.engine.keep_env);
        assert_eq!(from_file.log.filter, "debug");

        let overridden = Config::builder()
            .config_path(Some(path.clone()))
            .max_frames(Some(64))
            .build()
            .unwrap();
        assert_eq!(overridden.engine.max_frames, 64);

        fs::remove_file(path).unwrap();
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let path = std::env::temp_dir().join("sqlscript-does-not-exist.toml");
        let err = Config::builder().config_path(Some(path)).build().unwrap_err();
        assert!(matches!(err, ConfigError::Load(_)));
    }

    #[test]
    fn test_tiny_stack_is_rejected() {
        let err = Config::builder().max_frames(Some(1)).build().unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_serializes_as_toml() {
        let text = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(text.contains("max_frames = 100000"));
        let back: Config = toml::from_str(&text).unwrap();
        assert_eq!(back, Config::default());
    }
}
