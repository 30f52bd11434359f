//! Configuration
//!
//! Layered, lowest to highest precedence:
//!
//! 1. built-in defaults
//! 2. `graphscript.toml` in the working directory (optional), or the file
//!    given with `config_path` (required)
//! 3. `GRAPHSCRIPT_*` environment variables, e.g. `GRAPHSCRIPT_RUNNER__MAX_STEPS`
//!    (a `.env` file is loaded first if present)
//! 4. explicit builder overrides
//!
//! # Example
//!
//! ```rust,no_run
//! use graphscript_core::config::Config;
//!
//! let config = Config::builder()
//!     .config_path(Some("scripts/graphscript.toml".into()))
//!     .max_steps(Some(10_000))
//!     .build()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::executor::RunLimits;

const DEFAULT_FILE: &str = "graphscript";
const ENV_PREFIX: &str = "GRAPHSCRIPT";

/* ===================== Settings ===================== */

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub runner: RunnerConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Abort a run after this many instructions
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_steps: Option<u64>,
    /// Delay between instructions, in milliseconds
    pub step_delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing` filter directive, used when `RUST_LOG` is unset
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl Config {
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Load from the default sources with no overrides
    pub fn load() -> Result<Self> {
        Self::builder().build()
    }

    pub fn run_limits(&self) -> RunLimits {
        RunLimits::unlimited()
            .with_max_steps(self.runner.max_steps)
            .with_step_delay(Duration::from_millis(self.runner.step_delay_ms))
    }

    /// Render the effective configuration
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to render configuration as TOML")
    }
}

/* ===================== Builder ===================== */

#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    config_path: Option<PathBuf>,
    max_steps: Option<u64>,
    log_filter: Option<String>,
    read_env: bool,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            read_env: true,
            ..Self::default()
        }
    }

    /// Read this file instead of searching for `graphscript.toml`
    pub fn config_path(mut self, path: Option<PathBuf>) -> Self {
        self.config_path = path;
        self
    }

    pub fn max_steps(mut self, max_steps: Option<u64>) -> Self {
        if max_steps.is_some() {
            self.max_steps = max_steps;
        }
        self
    }

    pub fn log_filter(mut self, filter: Option<String>) -> Self {
        if filter.is_some() {
            self.log_filter = filter;
        }
        self
    }

    /// Skip `.env` and `GRAPHSCRIPT_*` variables
    pub fn ignore_env(mut self) -> Self {
        self.read_env = false;
        self
    }

    pub fn build(self) -> Result<Config> {
        let mut builder = ::config::Config::builder();

        builder = match &self.config_path {
            Some(path) => builder.add_source(::config::File::from(path.as_path()).required(true)),
            None => builder.add_source(::config::File::with_name(DEFAULT_FILE).required(false)),
        };

        if self.read_env {
            dotenvy::dotenv().ok();
            builder = builder.add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        }

        let mut config: Config = builder
            .build()
            .context("Failed to load configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;

        if let Some(max_steps) = self.max_steps {
            config.runner.max_steps = Some(max_steps);
        }
        if let Some(filter) = self.log_filter {
            config.logging.filter = filter;
        }

        tracing::debug!(?config, "configuration loaded");
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.runner.max_steps, None);
        assert_eq!(config.runner.step_delay_ms, 0);
        assert_eq!(config.logging.filter, "info");
        assert_eq!(config.run_limits(), RunLimits::unlimited());
    }

    #[test]
    fn test_file_then_overrides() {
        let file = write_config(
            r#"
            [runner]
            max_steps = 50
            step_delay_ms = 250

            [logging]
            filter = "debug"
            "#,
        );

        let config = Config::builder()
            .config_path(Some(file.path().to_path_buf()))
            .ignore_env()
            .build()
            .unwrap();
        assert_eq!(config.runner.max_steps, Some(50));
        assert_eq!(config.runner.step_delay_ms, 250);
        assert_eq!(config.logging.filter, "debug");

        let overridden = Config::builder()
            .config_path(Some(file.path().to_path_buf()))
            .max_steps(Some(7))
            .log_filter(None)
            .ignore_env()
            .build()
            .unwrap();
        assert_eq!(overridden.runner.max_steps, Some(7));
        assert_eq!(overridden.logging.filter, "debug");
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let file = write_config("[runner]\nstep_delay_ms = 10\n");
        let config = Config::builder()
            .config_path(Some(file.path().to_path_buf()))
            .ignore_env()
            .build()
            .unwrap();
        assert_eq!(config.runner.max_steps, None);
        assert_eq!(config.logging.filter, "info");
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = Config::builder()
            .config_path(Some(dir.path().join("absent.toml")))
            .ignore_env()
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_to_toml_round_trip() {
        let mut config = Config::default();
        config.runner.max_steps = Some(3);
        let rendered = config.to_toml().unwrap();
        assert!(rendered.contains("max_steps = 3"));
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }
}
