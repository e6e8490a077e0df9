//! Error types for artifact retention

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias using [`RetentionError`]
pub type RetentionResult<T> = std::result::Result<T, RetentionError>;

/// Everything that can go wrong while keeping or discarding artifacts.
///
/// None of these ever escape [`crate::RetentionController::finalize`]; the
/// controller logs them and collects them in the report.
#[derive(Error, Debug)]
pub enum RetentionError {
    #[error("Filesystem error during {op} of {}: {source}", .path.display())]
    FileSystem {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Session unavailable: {0}")]
    SessionUnavailable(String),

    #[error("Artifact missing after grace delay: {}", .0.display())]
    MissingArtifact(PathBuf),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl RetentionError {
    pub(crate) fn fs(op: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RetentionError::FileSystem {
            op,
            path: path.into(),
            source,
        }
    }

    /// Short machine-friendly kind, used in reports
    pub fn kind(&self) -> &'static str {
        match self {
            RetentionError::FileSystem { .. } => "filesystem",
            RetentionError::SessionUnavailable(_) => "session_unavailable",
            RetentionError::MissingArtifact(_) => "missing_artifact",
            RetentionError::Config(_) => "config",
        }
    }
}
