// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum GencacheError {
    /// Walking the source tree or reading a candidate file failed.
    #[error("discovery failed at {path:?}: {source}")]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The generator process could not be started or exited non-zero.
    #[error("command `{command}` for {path:?} failed: {reason}\n{output}")]
    TaskExecution {
        path: PathBuf,
        command: String,
        reason: String,
        output: String,
    },

    #[error("hashing {path:?} failed: {source}")]
    Hash {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cache file {path:?}: {source}")]
    CacheIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cancelled before `{0}` could start")]
    Cancelled(String),

    /// Aggregate of every per-task failure in one pass.
    #[error("generate failed with {failed} errors: {first}")]
    GenerationFailed {
        failed: usize,
        first: Box<GencacheError>,
    },

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl GencacheError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, GencacheError::Cancelled(_))
    }
}

pub type Result<T> = std::result::Result<T, GencacheError>;
