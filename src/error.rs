// src/error.rs
use std::path::PathBuf;
use thiserror::Error;

use crate::types::JobId;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("output delivered for job `{0}` which was never started")]
    UnknownJob(JobId),

    #[error("job `{0}` was already started")]
    JobAlreadyStarted(JobId),

    #[error("job `{0}` received a call after its output stream was closed")]
    JobClosed(JobId),

    #[error("build already finished; the aggregate was delivered")]
    BuildFinished,

    #[error("I/O error: {source} (path: {path})")]
    Io {
        source: std::io::Error,
        path: PathBuf,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Format error: {0}")]
    Fmt(#[from] std::fmt::Error),
}

impl ReportError {
    /// True for contract violations by the host orchestrator, as opposed to
    /// failures of the outer surfaces (files, config, rendering).
    #[must_use]
    pub fn is_usage_fault(&self) -> bool {
        matches!(
            self,
            Self::UnknownJob(_) | Self::JobAlreadyStarted(_) | Self::JobClosed(_) | Self::BuildFinished
        )
    }
}

pub type Result<T> = std::result::Result<T, ReportError>;

// Allow `?` on std::io::Error by converting to ReportError::Io with unknown path.
impl From<std::io::Error> for ReportError {
    fn from(source: std::io::Error) -> Self {
        ReportError::Io {
            source,
            path: PathBuf::from("<unknown>"),
        }
    }
}
