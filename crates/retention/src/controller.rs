//! Teardown-time artifact retention
//!
//! Failed tests keep their recording (renamed `FAILED_<test>_<timestamp>`)
//! and get a best-effort screenshot; passed tests have their recording
//! deleted. Nothing in here returns an error to the caller: every problem
//! is logged and collected in the [`RetentionReport`].

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::artifact::{self, ArtifactFile, ArtifactKind, ArtifactLayout};
use crate::config::RetentionConfig;
use crate::error::RetentionError;
use crate::policy::{decide, RetentionPlan, VideoAction};
use crate::record::{Outcome, TestExecutionRecord, TestState};
use crate::session::BrowserSession;

/// Why a finalization pass did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The record never got an outcome
    NotCompleted,
    /// The record was finalized by an earlier pass
    AlreadyFinalized,
}

/// What one finalization pass did
#[derive(Debug)]
pub struct RetentionReport {
    pub test_name: String,
    pub outcome: Option<Outcome>,
    pub plan: Option<RetentionPlan>,
    pub retained: Vec<ArtifactFile>,
    pub discarded: Vec<PathBuf>,
    pub issues: Vec<RetentionError>,
    pub skipped: Option<SkipReason>,
}

impl RetentionReport {
    fn new(record: &TestExecutionRecord) -> Self {
        Self::for_test(record.name(), record.outcome())
    }

    fn for_test(test_name: &str, outcome: Option<Outcome>) -> Self {
        Self {
            test_name: test_name.to_string(),
            outcome,
            plan: None,
            retained: Vec::new(),
            discarded: Vec::new(),
            issues: Vec::new(),
            skipped: None,
        }
    }

    fn skipped(record: &TestExecutionRecord, reason: SkipReason) -> Self {
        Self {
            skipped: Some(reason),
            ..Self::new(record)
        }
    }

    pub fn retained_of(&self, kind: ArtifactKind) -> Option<&ArtifactFile> {
        self.retained.iter().find(|a| a.kind == kind)
    }

    pub fn issue_messages(&self) -> Vec<String> {
        self.issues.iter().map(|e| e.to_string()).collect()
    }

    fn note(&mut self, issue: RetentionError) {
        match &issue {
            RetentionError::SessionUnavailable(_) => {
                info!("[{}] Skipping screenshot: {}", self.test_name, issue)
            }
            _ => warn!("[{}] {}", self.test_name, issue),
        }
        self.issues.push(issue);
    }
}

/// Applies the retention policy at the end of each test
#[derive(Debug, Clone)]
pub struct RetentionController {
    config: RetentionConfig,
    layout: ArtifactLayout,
}

impl RetentionController {
    pub fn new(config: RetentionConfig) -> Self {
        let layout = ArtifactLayout::new(&config);
        Self { config, layout }
    }

    pub fn config(&self) -> &RetentionConfig {
        &self.config
    }

    pub fn layout(&self) -> &ArtifactLayout {
        &self.layout
    }

    /// Run the retention policy once for a completed record.
    ///
    /// The record moves to `Finalized` before any IO, so a second call is a
    /// no-op regardless of how the first one went.
    pub async fn finalize(&self, record: &mut TestExecutionRecord, session: &dyn BrowserSession) -> RetentionReport {
        let outcome = match record.state() {
            TestState::Completed(outcome) => outcome,
            TestState::Running => {
                warn!("[{}] Finalize called before the test completed; nothing to do", record.name());
                return RetentionReport::skipped(record, SkipReason::NotCompleted);
            }
            TestState::Finalized(_) => {
                debug!("[{}] Already finalized", record.name());
                return RetentionReport::skipped(record, SkipReason::AlreadyFinalized);
            }
        };
        record.mark_finalized();

        let mut report = RetentionReport::new(record);
        let ts = record.artifact_timestamp();
        let video = session.video();
        let plan = decide(outcome, video.is_some());
        report.plan = Some(plan);

        debug!(
            "[{}] {} -> video {:?}, screenshot {}",
            record.name(),
            outcome,
            plan.video,
            plan.capture_screenshot
        );

        if plan.capture_screenshot || plan.video == VideoAction::Retain {
            if let Err(e) = self.layout.ensure_dirs() {
                report.note(e);
            }
        }

        if plan.capture_screenshot {
            let path = self.layout.failure_screenshot_path(record.name(), &ts);
            if let Some(file) = self.capture(session, &path, record.name(), ts, &mut report).await {
                info!("[{}] Failure screenshot: {}", record.name(), file.path.display());
                report.retained.push(file);
            }
        }

        let video = match (plan.video, video) {
            (VideoAction::Nothing, _) | (_, None) => return report,
            (_, Some(video)) => video,
        };

        let source = match video.path().await {
            Ok(path) => path,
            Err(e) => {
                report.note(e);
                return report;
            }
        };

        // Let the recorder finish writing before looking for the file.
        tokio::time::sleep(self.config.grace_delay()).await;

        if !source.exists() {
            report.note(RetentionError::MissingArtifact(source));
            return report;
        }

        match plan.video {
            VideoAction::Retain => {
                let dest = self.layout.retained_video_path(outcome, record.name(), &ts, &source);
                match artifact::move_to_free_name(&source, &dest) {
                    Ok(moved) => {
                        info!("[{}] Video retained: {}", record.name(), moved.path.display());
                        report.retained.push(ArtifactFile {
                            kind: ArtifactKind::Video,
                            path: moved.path,
                            test_name: record.name().to_string(),
                            timestamp: ts,
                        });
                        if let Some(e) = moved.leftover {
                            report.note(e);
                        }
                    }
                    Err(e) => report.note(e),
                }
            }
            VideoAction::Discard => match artifact::delete_file(&source) {
                Ok(()) => {
                    debug!("[{}] Video discarded: {}", record.name(), source.display());
                    report.discarded.push(source);
                }
                Err(e) => report.note(e),
            },
            VideoAction::Nothing => {}
        }

        report
    }

    /// Manual capture during a test:
    /// `screenshots/DEBUG_<test>_<label>_<timestamp>.png`
    pub async fn debug_screenshot(&self, session: &dyn BrowserSession, test_name: &str, label: &str) -> Option<ArtifactFile> {
        let ts = Local::now();
        let mut report = RetentionReport::for_test(test_name, None);
        if let Err(e) = artifact::ensure_dir(self.layout.screenshots_dir()) {
            report.note(e);
            return None;
        }
        let path = self.layout.debug_screenshot_path(test_name, label, &ts);
        let file = self.capture(session, &path, test_name, ts, &mut report).await?;
        info!("[{}] Debug screenshot: {}", test_name, file.path.display());
        Some(file)
    }

    /// Screenshot to `path`, or its first free `_N` variant
    async fn capture(
        &self,
        session: &dyn BrowserSession,
        path: &Path,
        test_name: &str,
        ts: DateTime<Local>,
        report: &mut RetentionReport,
    ) -> Option<ArtifactFile> {
        if session.is_closed() {
            report.note(RetentionError::SessionUnavailable(
                "page already closed".to_string(),
            ));
            return None;
        }
        let path = match artifact::reserve_destination(path) {
            Ok(path) => path,
            Err(e) => {
                report.note(e);
                return None;
            }
        };
        match session.screenshot(&path, self.config.full_page_screenshots).await {
            Ok(()) => Some(ArtifactFile {
                kind: ArtifactKind::Screenshot,
                path,
                test_name: test_name.to_string(),
                timestamp: ts,
            }),
            Err(e) => {
                // Release the reserved name.
                let _ = artifact::delete_file(&path);
                report.note(e);
                None
            }
        }
    }
}
