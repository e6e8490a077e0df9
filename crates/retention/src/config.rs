//! Retention configuration
//!
//! One explicit value per controller. Test groups that want a different
//! layout derive their own copy with the `with_*` builders instead of
//! mutating shared defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{RetentionError, RetentionResult};

/// Where artifacts go and how long to wait for the recorder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionConfig {
    /// Root directory for all retained artifacts
    pub work_dir: PathBuf,

    /// Video folder, relative to `work_dir` unless absolute
    pub videos_dir: PathBuf,

    /// Screenshot folder, relative to `work_dir` unless absolute
    pub screenshots_dir: PathBuf,

    /// Wait before checking that the recorded video exists
    pub grace_delay_ms: u64,

    /// Extension used when the recorder's file has none
    pub video_extension: String,

    /// Capture the full scrollable page on failure
    pub full_page_screenshots: bool,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        Self {
            work_dir: PathBuf::from("test-results"),
            videos_dir: PathBuf::from("videos"),
            screenshots_dir: PathBuf::from("screenshots"),
            grace_delay_ms: 1000,
            video_extension: "webm".to_string(),
            full_page_screenshots: true,
        }
    }
}

impl RetentionConfig {
    /// Load configuration from a TOML file, falling back to defaults when
    /// the file does not exist
    pub fn load(path: &Path) -> RetentionResult<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| RetentionError::fs("read", path, e))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| RetentionError::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn save(&self, path: &Path) -> RetentionResult<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| RetentionError::Config(e.to_string()))?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| RetentionError::fs("create", parent, e))?;
        }
        std::fs::write(path, content).map_err(|e| RetentionError::fs("write", path, e))?;
        Ok(())
    }

    pub fn validate(&self) -> RetentionResult<()> {
        if self.video_extension.is_empty() || self.video_extension.contains(&['.', '/', '\\'][..]) {
            return Err(RetentionError::Config(format!(
                "video_extension must be a bare extension, got {:?}",
                self.video_extension
            )));
        }
        if self.videos_dir.as_os_str().is_empty() || self.screenshots_dir.as_os_str().is_empty() {
            return Err(RetentionError::Config(
                "videos_dir and screenshots_dir must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    pub fn with_videos_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.videos_dir = dir.into();
        self
    }

    pub fn with_screenshots_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.screenshots_dir = dir.into();
        self
    }

    pub fn with_grace_delay(mut self, delay: Duration) -> Self {
        self.grace_delay_ms = delay.as_millis() as u64;
        self
    }

    pub fn grace_delay(&self) -> Duration {
        Duration::from_millis(self.grace_delay_ms)
    }

    /// Resolved video directory
    pub fn video_path(&self) -> PathBuf {
        self.work_dir.join(&self.videos_dir)
    }

    /// Resolved screenshot directory
    pub fn screenshot_path(&self) -> PathBuf {
        self.work_dir.join(&self.screenshots_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_resolve_under_work_dir() {
        let config = RetentionConfig::default();
        assert_eq!(config.video_path(), PathBuf::from("test-results/videos"));
        assert_eq!(config.screenshot_path(), PathBuf::from("test-results/screenshots"));
        assert_eq!(config.grace_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_group_override_leaves_base_untouched() {
        let base = RetentionConfig::default();
        let group = base.clone().with_work_dir("/tmp/run").with_videos_dir("clips");

        assert_eq!(group.video_path(), PathBuf::from("/tmp/run/clips"));
        assert_eq!(base.video_path(), PathBuf::from("test-results/videos"));
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = RetentionConfig::load(&dir.path().join("nope.toml")).unwrap();
        assert_eq!(config, RetentionConfig::default());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/retention.toml");
        let config = RetentionConfig::default()
            .with_screenshots_dir("shots")
            .with_grace_delay(Duration::from_millis(250));

        config.save(&path).unwrap();
        assert_eq!(RetentionConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("retention.toml");
        std::fs::write(&path, "grace_delay_ms = 10\n").unwrap();

        let config = RetentionConfig::load(&path).unwrap();
        assert_eq!(config.grace_delay_ms, 10);
        assert_eq!(config.videos_dir, PathBuf::from("videos"));
    }

    #[test]
    fn test_rejects_dotted_extension() {
        let config = RetentionConfig {
            video_extension: ".webm".to_string(),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(RetentionError::Config(_))));
    }
}
