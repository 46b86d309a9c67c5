use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("configuration not loaded")]
    ConfigurationUnavailable,

    #[error("home directory not found: set HOME environment variable")]
    HomeNotFound,

    #[error("{endpoint} request failed: {status} {reason}")]
    Request {
        endpoint: String,
        status: u16,
        reason: String,
    },

    #[error("script {script} failed with exit code {exit_code}: {stderr}")]
    ScriptFailed {
        script: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("invalid script name '{0}': must be a file name inside the scripts directory")]
    InvalidScriptName(String),

    #[error("scripts directory not found: {}", .0.display())]
    ScriptsDirMissing(PathBuf),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),
}

impl SyncError {
    /// HTTP status carried by a [`SyncError::Request`], if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            SyncError::Request { status, .. } => Some(*status),
            SyncError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, SyncError>;
