//! Probe configuration: TOML file merged with command line overrides.

use std::{
    fmt, fs,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use memoryless::Config as ScheduleConfig;
use serde::Deserialize;

use crate::{
    args::Args,
    errors::{AppError, Result},
};

/// Which scheduler primitive drives the probes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub(crate) enum Mode {
    /// Callback driven by [`memoryless::run`].
    #[default]
    Run,
    /// Reader loop over a [`memoryless::Ticker`].
    Ticker,
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "run" => Ok(Self::Run),
            "ticker" => Ok(Self::Ticker),
            other => Err(format!("unknown mode '{other}', use 'run' or 'ticker'")),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Run => f.write_str("run"),
            Self::Ticker => f.write_str("ticker"),
        }
    }
}

/// Logging configuration for the probe.
#[derive(Debug, Clone, Deserialize, Default)]
pub(crate) struct LoggingConfig {
    /// Service label to append to the service name (e.g., "prod", "dev").
    pub service_label: Option<String>,

    /// Directory path for file-based logging.
    pub log_dir: Option<PathBuf>,

    /// Prefix for log file names (defaults to "memoryless-probe" if not set).
    pub log_file_prefix: Option<String>,

    /// Use JSON format for logs instead of compact format.
    pub json_format: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct Config {
    /// Probe driver.
    #[serde(default)]
    pub mode: Mode,

    /// Number of probes to take before exiting, unbounded if unset.
    pub count: Option<u64>,

    /// Delay distribution.
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Logging configuration (optional).
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Loads the config file (if any), applies command line overrides and
    /// checks the schedule.
    pub(crate) fn from_args(args: &Args) -> Result<Self> {
        let mut config = match &args.config {
            Some(path) => load_config_from_path(path)?,
            None => Self::default(),
        };

        config.apply_overrides(args)?;
        config.schedule.check()?;
        Ok(config)
    }

    fn apply_overrides(&mut self, args: &Args) -> Result<()> {
        if let Some(mode) = args.mode {
            self.mode = mode;
        }

        if let Some(count) = args.count {
            if count == 0 {
                let msg = "--count must be positive".to_string();
                return Err(AppError::InvalidArgs(msg));
            }
            self.count = Some(count);
        }

        let mut schedule = self.schedule;
        if let Some(ms) = args.expected_ms {
            schedule = schedule.with_expected(Duration::from_millis(ms));
        }
        if let Some(ms) = args.min_ms {
            schedule = schedule.with_min(Duration::from_millis(ms));
        }
        if let Some(ms) = args.max_ms {
            schedule = schedule.with_max(Duration::from_millis(ms));
        }
        if args.once {
            schedule = schedule.with_once(true);
        }
        self.schedule = schedule;

        if args.json_logs {
            self.logging.json_format = Some(true);
        }

        Ok(())
    }
}

fn load_config_from_path(path: &Path) -> Result<Config> {
    let config_str = fs::read_to_string(path)?;
    parse_config(&config_str)
}

fn parse_config(s: &str) -> Result<Config> {
    toml::from_str(s).map_err(AppError::TomlParse)
}
