//! Command line and environment arguments.

use std::{env, path::PathBuf};

use argh::FromArgs;

use crate::config::Mode;

/// Configs overridable by environment.
#[derive(Debug, Clone, Default)]
pub(crate) struct EnvArgs {
    /// Service label to include in service name
    pub service_label: Option<String>,
    /// Directory for file-based logging
    pub log_dir: Option<PathBuf>,
}

impl EnvArgs {
    pub(crate) fn from_env() -> Self {
        Self {
            service_label: env::var("MEMORYLESS_SVC_LABEL").ok(),
            log_dir: env::var("MEMORYLESS_LOG_DIR").ok().map(PathBuf::from),
        }
    }
}

#[derive(Debug, Clone, FromArgs)]
#[argh(description = "Takes probes at memoryless (Poisson) intervals")]
pub(crate) struct Args {
    #[argh(option, short = 'c', description = "path to TOML config file")]
    pub config: Option<PathBuf>,

    #[argh(option, short = 'm', description = "probe driver: run or ticker")]
    pub mode: Option<Mode>,

    #[argh(option, short = 'e', description = "mean delay between probes in ms")]
    pub expected_ms: Option<u64>,

    #[argh(option, description = "minimum delay between probes in ms")]
    pub min_ms: Option<u64>,

    #[argh(option, description = "maximum delay between probes in ms, 0 for none")]
    pub max_ms: Option<u64>,

    #[argh(switch, description = "take a single probe and exit")]
    pub once: bool,

    #[argh(
        option,
        short = 'n',
        description = "stop after this many probes (default: run until ctrl-c)"
    )]
    pub count: Option<u64>,

    #[argh(switch, description = "log in JSON format")]
    pub json_logs: bool,
}
