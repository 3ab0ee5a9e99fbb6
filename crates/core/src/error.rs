use crate::meter::{ConversionError, MeterKind};
use std::time::Duration;
use thiserror::Error;

/// Errors raised by the metrics agent
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Collection error: {0}")]
    Collection(String),

    #[error("Collecting data took too long ({elapsed:?} > {interval:?})")]
    Overrun { elapsed: Duration, interval: Duration },

    #[error("Metric {key}: {source}")]
    Conversion {
        key: String,
        #[source]
        source: ConversionError,
    },

    #[error("Metric {key} is registered as {registered}, not {requested}")]
    MeterKindMismatch {
        key: String,
        registered: MeterKind,
        requested: MeterKind,
    },

    #[error("Emission error: {0}")]
    Emission(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Scheduler error: {0}")]
    Scheduler(String),

    #[error("Platform-specific error: {0}")]
    Platform(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[cfg(all(target_os = "linux", feature = "linux_procfs"))]
    #[error("Procfs error: {0}")]
    Procfs(#[from] procfs::ProcError),

    #[cfg(unix)]
    #[error("Unix system error: {0}")]
    Unix(#[from] nix::Error),
}

pub type Result<T> = std::result::Result<T, AgentError>;

impl AgentError {
    pub fn collection<S: Into<String>>(msg: S) -> Self {
        Self::Collection(msg.into())
    }

    pub fn emission<S: Into<String>>(msg: S) -> Self {
        Self::Emission(msg.into())
    }

    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    pub fn scheduler<S: Into<String>>(msg: S) -> Self {
        Self::Scheduler(msg.into())
    }

    pub fn platform<S: Into<String>>(msg: S) -> Self {
        Self::Platform(msg.into())
    }

    pub fn conversion<K: Into<String>>(key: K, source: ConversionError) -> Self {
        Self::Conversion {
            key: key.into(),
            source,
        }
    }

    /// Errors that only invalidate a single metric rather than the whole cycle
    pub fn is_metric_scoped(&self) -> bool {
        matches!(self, Self::Conversion { .. } | Self::MeterKindMismatch { .. })
    }
}
