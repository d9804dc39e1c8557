//! Error types for argument parsing and configuration.

use std::io;

use thiserror::Error;

pub(crate) type Result<T> = std::result::Result<T, AppError>;

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("io: {0}")]
    Io(#[from] io::Error),

    #[error("unparsable config file: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("schedule: {0}")]
    Schedule(#[from] memoryless::ConfigError),

    #[error("invalid args: {0}")]
    InvalidArgs(String),

    #[error("{0}")]
    Anyhow(#[from] anyhow::Error),
}
