//! Artifact files, naming, and the on-disk layout
//!
//! ```text
//! <work_dir>/
//!   videos/FAILED_<test>_<timestamp>.webm
//!   screenshots/FAILED_<test>_<timestamp>.png
//!   screenshots/DEBUG_<test>_<label>_<timestamp>.png
//! ```

use chrono::{DateTime, Local};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::config::RetentionConfig;
use crate::error::{RetentionError, RetentionResult};
use crate::record::Outcome;

/// `20250101_100000`
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

pub const SCREENSHOT_EXTENSION: &str = "png";

pub const DEBUG_PREFIX: &str = "DEBUG";

static UNSAFE_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9._-]+").expect("static regex"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Video,
    Screenshot,
}

/// A video or screenshot kept on disk for a test
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactFile {
    pub kind: ArtifactKind,
    pub path: PathBuf,
    pub test_name: String,
    pub timestamp: DateTime<Local>,
}

/// Make a test name or label safe to embed in a file name
pub fn sanitize(name: &str) -> String {
    let cleaned = UNSAFE_CHARS.replace_all(name.trim(), "_");
    let cleaned = cleaned.trim_matches('.');
    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned.to_string()
    }
}

pub fn format_timestamp(ts: &DateTime<Local>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// `{prefix}_{test}_{timestamp}.{ext}`
pub fn artifact_file_name(outcome: Outcome, test_name: &str, ts: &DateTime<Local>, ext: &str) -> String {
    format!("{}_{}_{}.{}", outcome.prefix(), sanitize(test_name), format_timestamp(ts), ext)
}

/// `DEBUG_{test}_{label}_{timestamp}.png`
pub fn debug_file_name(test_name: &str, label: &str, ts: &DateTime<Local>) -> String {
    format!(
        "{}_{}_{}_{}.{}",
        DEBUG_PREFIX,
        sanitize(test_name),
        sanitize(label),
        format_timestamp(ts),
        SCREENSHOT_EXTENSION
    )
}

/// `path` itself, then `stem_2.ext`, `stem_3.ext`, ...
fn candidates(path: &Path) -> impl Iterator<Item = PathBuf> + '_ {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_default();
    let ext = path.extension().map(|e| e.to_string_lossy().to_string());
    let parent = path.parent().unwrap_or_else(|| Path::new(""));

    std::iter::once(path.to_path_buf()).chain((2u32..).map(move |n| {
        let name = match &ext {
            Some(ext) => format!("{}_{}.{}", stem, n, ext),
            None => format!("{}_{}", stem, n),
        };
        parent.join(name)
    }))
}

/// First variant of `path` that does not exist yet. Only a hint: another
/// writer may take it first. Use [`reserve_destination`] to claim a name.
pub fn unique_destination(path: &Path) -> PathBuf {
    candidates(path)
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| path.to_path_buf())
}

/// Claim the first free variant of `path` by creating it empty.
/// `create_new` makes the claim atomic across concurrent teardowns.
pub(crate) fn reserve_destination(path: &Path) -> RetentionResult<PathBuf> {
    for candidate in candidates(path) {
        match OpenOptions::new().write(true).create_new(true).open(&candidate) {
            Ok(_) => return Ok(candidate),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(RetentionError::fs("reserve", &candidate, e)),
        }
    }
    Err(RetentionError::fs(
        "reserve",
        path,
        std::io::Error::new(ErrorKind::AlreadyExists, "no free name"),
    ))
}

/// Resolved directories for one controller
#[derive(Debug, Clone)]
pub struct ArtifactLayout {
    videos_dir: PathBuf,
    screenshots_dir: PathBuf,
    video_extension: String,
}

impl ArtifactLayout {
    pub fn new(config: &RetentionConfig) -> Self {
        Self {
            videos_dir: config.video_path(),
            screenshots_dir: config.screenshot_path(),
            video_extension: config.video_extension.clone(),
        }
    }

    pub fn videos_dir(&self) -> &Path {
        &self.videos_dir
    }

    pub fn screenshots_dir(&self) -> &Path {
        &self.screenshots_dir
    }

    /// Create both directories if absent. Safe to race with other tests.
    pub fn ensure_dirs(&self) -> RetentionResult<()> {
        ensure_dir(&self.videos_dir)?;
        ensure_dir(&self.screenshots_dir)
    }

    /// Destination for a retained video. Keeps the recorder's extension
    /// when it has one.
    pub fn retained_video_path(&self, outcome: Outcome, test_name: &str, ts: &DateTime<Local>, source: &Path) -> PathBuf {
        let ext = source
            .extension()
            .map(|e| e.to_string_lossy().to_string())
            .unwrap_or_else(|| self.video_extension.clone());
        self.videos_dir.join(artifact_file_name(outcome, test_name, ts, &ext))
    }

    pub fn failure_screenshot_path(&self, test_name: &str, ts: &DateTime<Local>) -> PathBuf {
        self.screenshots_dir
            .join(artifact_file_name(Outcome::Failed, test_name, ts, SCREENSHOT_EXTENSION))
    }

    pub fn debug_screenshot_path(&self, test_name: &str, label: &str, ts: &DateTime<Local>) -> PathBuf {
        self.screenshots_dir.join(debug_file_name(test_name, label, ts))
    }

    /// Retained files named after `test_name`, across both directories
    pub fn artifacts_for(&self, test_name: &str) -> Vec<PathBuf> {
        let pattern = format!(
            r"^(FAILED|PASSED|{})_{}_.*\d{{8}}_\d{{6}}(_\d+)?\.[A-Za-z0-9]+$",
            DEBUG_PREFIX,
            regex::escape(&sanitize(test_name))
        );
        let re = match Regex::new(&pattern) {
            Ok(re) => re,
            Err(_) => return Vec::new(),
        };

        let mut found = Vec::new();
        for dir in [&self.videos_dir, &self.screenshots_dir] {
            for entry in walkdir::WalkDir::new(dir)
                .min_depth(1)
                .max_depth(1)
                .into_iter()
                .filter_map(|e| e.ok())
            {
                if entry.file_type().is_file() && re.is_match(&entry.file_name().to_string_lossy()) {
                    found.push(entry.into_path());
                }
            }
        }
        found.sort();
        found
    }
}

pub(crate) fn ensure_dir(dir: &Path) -> RetentionResult<()> {
    std::fs::create_dir_all(dir).map_err(|e| RetentionError::fs("create", dir, e))
}

/// Where a retained file ended up
#[derive(Debug)]
pub(crate) struct Moved {
    pub path: PathBuf,
    /// The destination is in place but the source could not be removed
    pub leftover: Option<RetentionError>,
}

/// Move `source` under the first free variant of `dest`. Never replaces an
/// existing file: the name is claimed with a hard link, or with a copy into
/// a freshly created file when linking is not possible (e.g. across
/// filesystems). A failed copy leaves nothing at the destination.
pub(crate) fn move_to_free_name(source: &Path, dest: &Path) -> RetentionResult<Moved> {
    for candidate in candidates(dest) {
        match std::fs::hard_link(source, &candidate) {
            Ok(()) => return Ok(finish_move(source, candidate)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => debug!("Link failed ({}), copying {} -> {}", e, source.display(), candidate.display()),
        }
        match copy_new(source, &candidate) {
            Ok(()) => return Ok(finish_move(source, candidate)),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
            Err(e) => return Err(RetentionError::fs("copy", source, e)),
        }
    }
    Err(RetentionError::fs(
        "copy",
        dest,
        std::io::Error::new(ErrorKind::AlreadyExists, "no free name"),
    ))
}

fn copy_new(source: &Path, dest: &Path) -> std::io::Result<()> {
    let mut reader = File::open(source)?;
    let mut writer = OpenOptions::new().write(true).create_new(true).open(dest)?;
    let copied = std::io::copy(&mut reader, &mut writer).and_then(|_| writer.sync_all());
    if let Err(e) = copied {
        drop(writer);
        let _ = std::fs::remove_file(dest);
        return Err(e);
    }
    Ok(())
}

fn finish_move(source: &Path, path: PathBuf) -> Moved {
    let leftover = std::fs::remove_file(source)
        .err()
        .map(|e| RetentionError::fs("delete", source, e));
    Moved { path, leftover }
}

pub(crate) fn delete_file(path: &Path) -> RetentionResult<()> {
    std::fs::remove_file(path).map_err(|e| RetentionError::fs("delete", path, e))
}
