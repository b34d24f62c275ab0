//! Error types shared across the daemon

use std::path::PathBuf;
use thiserror::Error;

/// Failure to read per-process counters for a single cycle.
#[derive(Error, Debug)]
pub enum SampleError {
    #[error("process {pid} is gone")]
    ProcessGone { pid: u32 },

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed {file} record for process {pid}: {reason}")]
    Malformed {
        pid: u32,
        file: &'static str,
        reason: String,
    },
}

impl SampleError {
    pub(crate) fn malformed(pid: u32, file: &'static str, reason: impl Into<String>) -> Self {
        SampleError::Malformed {
            pid,
            file,
            reason: reason.into(),
        }
    }
}

/// Invalid startup configuration. Fatal before any worker starts.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("no process names given")]
    NoTargets,

    #[error("empty process name")]
    EmptyName,

    #[error("invalid process name {0:?}: must be a base name without '/'")]
    InvalidName(String),

    #[error("process {0:?} listed more than once")]
    DuplicateName(String),

    #[error("output directory {0:?} is not writable")]
    Unwritable(PathBuf),

    #[error("invalid output format {0:?}, only 'csv' and 'json' are supported")]
    InvalidFormat(String),

    #[error("{name} interval must be at least 1 second")]
    InvalidInterval { name: &'static str },

    #[error("invalid duplicate policy {0:?}, expected 'first' or 'newest'")]
    InvalidPolicy(String),

    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("failed to write config: {0}")]
    Write(#[from] std::io::Error),
}
