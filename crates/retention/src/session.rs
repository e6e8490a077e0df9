//! Capabilities the retention controller needs from a browser session
//!
//! The controller never opens or closes sessions. Whatever drives the
//! browser implements these traits and hands the session over at teardown.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use crate::error::RetentionResult;

/// A video being (or already) recorded by the session
#[async_trait]
pub trait VideoHandle: Send + Sync {
    /// Resolve where the recorder wrote the file
    async fn path(&self) -> RetentionResult<PathBuf>;
}

#[async_trait]
pub trait BrowserSession: Send + Sync {
    /// The recording for this session, if video was enabled
    fn video(&self) -> Option<&dyn VideoHandle>;

    /// Capture the current page to `path`
    async fn screenshot(&self, path: &Path, full_page: bool) -> RetentionResult<()>;

    async fn navigate(&self, url: &str) -> RetentionResult<()>;

    /// Whether the page/browser has already been torn down
    fn is_closed(&self) -> bool;
}

/// A video whose path is known up front
#[derive(Debug, Clone)]
pub struct RecordedVideo {
    path: PathBuf,
}

impl RecordedVideo {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl VideoHandle for RecordedVideo {
    async fn path(&self) -> RetentionResult<PathBuf> {
        Ok(self.path.clone())
    }
}
