use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::stack::AwsCliConfig;
use crate::tail::{PollTiming, DEFAULT_INITIAL_COUNT, MAX_INITIAL_COUNT, MIN_INITIAL_COUNT};

/// Settings read from `~/.config/stack-tail/config.toml`
///
/// Every field is optional; command line flags take precedence.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Region passed to the provider CLI
    pub region: Option<String>,
    /// Named credential profile passed to the provider CLI
    pub profile: Option<String>,
    /// Provider CLI binary (default: `aws` on PATH)
    pub aws_cli: Option<PathBuf>,
    /// Upper bound for one provider call
    pub provider_timeout_secs: Option<u64>,
    /// Events shown from the first page
    pub count: Option<usize>,
    /// Colorize statuses when writing to a terminal
    pub color: Option<bool>,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: Option<String>,
    pub timing: PollTiming,
}

impl Config {
    /// Load the config file, falling back to defaults when it does not exist
    pub fn load() -> Result<Self> {
        Self::load_optional(Self::config_path().as_deref())
    }

    /// Defaults when there is no location to read from (no home directory)
    pub fn load_optional(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load_from(path),
            None => {
                tracing::debug!("No home directory, using default config");
                Ok(Self::default())
            }
        }
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config file at {}", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse config {}: {}", path.display(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Default config file location
    pub fn config_path() -> Option<PathBuf> {
        directories::BaseDirs::new()
            .map(|base_dirs| base_dirs.home_dir().join(".config/stack-tail/config.toml"))
    }

    fn validate(&self) -> Result<()> {
        if let Some(count) = self.count {
            check_initial_count(count)?;
        }
        Ok(())
    }

    /// Initial page size: flag, then file, then the built-in default
    pub fn initial_count(&self, flag: Option<usize>) -> Result<usize> {
        let count = flag.or(self.count).unwrap_or(DEFAULT_INITIAL_COUNT);
        check_initial_count(count)?;
        Ok(count)
    }

    /// Provider CLI settings with flag overrides applied
    pub fn provider_config(&self, region: Option<String>, profile: Option<String>) -> AwsCliConfig {
        let defaults = AwsCliConfig::default();
        AwsCliConfig {
            program: self.aws_cli.clone().unwrap_or(defaults.program),
            region: region.or_else(|| self.region.clone()),
            profile: profile.or_else(|| self.profile.clone()),
            timeout: self
                .provider_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.timeout),
        }
    }

    pub fn timing(&self) -> PollTiming {
        self.timing.normalized()
    }
}

fn check_initial_count(count: usize) -> Result<()> {
    if !(MIN_INITIAL_COUNT..=MAX_INITIAL_COUNT).contains(&count) {
        anyhow::bail!(
            "count must be between {} and {}, got {}",
            MIN_INITIAL_COUNT,
            MAX_INITIAL_COUNT,
            count
        );
    }
    Ok(())
}
