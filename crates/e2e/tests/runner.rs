//! Runner tests with an in-memory browser session
//!
//! The fake session "records" a video into the retention layout just like
//! Playwright would, so these tests exercise the real teardown path.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::OnceCell;

use pwdemo_e2e::runner::{ExecutionOutcome, SessionLauncher, SpecSession};
use pwdemo_e2e::{E2eError, E2eResult, RunnerConfig, TestRunner, TestSpec};
use pwdemo_retention::{
    BrowserSession, RecordedVideo, RetentionConfig, RetentionController, RetentionError,
    RetentionResult, VideoHandle,
};

/// Tests whose name contains this fail
const FAIL_MARK: &str = "Broken";

struct FakeSession {
    videos_dir: PathBuf,
    /// Make the recorded "video" undeletable
    sticky_video: bool,
    video: OnceCell<RecordedVideo>,
}

#[async_trait]
impl SpecSession for FakeSession {
    async fn execute(&self, spec: &TestSpec) -> E2eResult<ExecutionOutcome> {
        std::fs::create_dir_all(&self.videos_dir)?;
        let video = self.videos_dir.join(format!("{}-{}.webm", spec.name.len(), spec.steps.len()));
        if self.sticky_video {
            std::fs::create_dir_all(&video)?;
        } else {
            std::fs::write(&video, b"webm")?;
        }
        let _ = self.video.set(RecordedVideo::new(video));

        if spec.name.contains(FAIL_MARK) {
            return Ok(ExecutionOutcome {
                success: false,
                failed_step: Some(1),
                error: Some("locator.click: Timeout 5000ms exceeded".to_string()),
                screenshots: vec![],
            });
        }
        Ok(ExecutionOutcome {
            success: true,
            ..Default::default()
        })
    }
}

#[async_trait]
impl BrowserSession for FakeSession {
    fn video(&self) -> Option<&dyn VideoHandle> {
        self.video.get().map(|v| v as &dyn VideoHandle)
    }

    async fn screenshot(&self, path: &Path, _full_page: bool) -> RetentionResult<()> {
        std::fs::write(path, b"png").map_err(|e| RetentionError::FileSystem {
            op: "write",
            path: path.to_path_buf(),
            source: e,
        })
    }

    async fn navigate(&self, _url: &str) -> RetentionResult<()> {
        Ok(())
    }

    fn is_closed(&self) -> bool {
        false
    }
}

struct FakeLauncher {
    sticky_video: bool,
}

#[async_trait]
impl SessionLauncher for FakeLauncher {
    type Session = FakeSession;

    async fn launch(&self, _spec: &TestSpec, controller: &RetentionController) -> E2eResult<FakeSession> {
        Ok(FakeSession {
            videos_dir: controller.layout().videos_dir().to_path_buf(),
            sticky_video: self.sticky_video,
            video: OnceCell::new(),
        })
    }
}

fn write_spec(dir: &Path, name: &str, tags: &[&str]) {
    let tags = if tags.is_empty() {
        "tags: []\n".to_string()
    } else {
        let items: String = tags.iter().map(|t| format!("  - {}\n", t)).collect();
        format!("tags:\n{}", items)
    };
    std::fs::write(
        dir.join(format!("{}.yaml", name)),
        format!(
            "name: {}\n{}steps:\n  - action: navigate\n    url: /\n  - action: click\n    selector: '#go'\n",
            name, tags
        ),
    )
    .unwrap();
}

fn runner(work: &Path, specs: &Path, sticky_video: bool) -> TestRunner<FakeLauncher> {
    let retention = RetentionConfig::default()
        .with_work_dir(work)
        .with_grace_delay(Duration::ZERO);
    let config = RunnerConfig {
        output_dir: work.to_path_buf(),
        retention,
        specs_dir: specs.to_path_buf(),
        ..Default::default()
    };
    TestRunner::with_launcher(config, FakeLauncher { sticky_video })
}

fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).map(|d| d.count()).unwrap_or(0)
}

#[tokio::test]
async fn failed_spec_keeps_artifacts_passed_spec_does_not() {
    let work = tempfile::tempdir().unwrap();
    let specs = tempfile::tempdir().unwrap();
    write_spec(specs.path(), "HomeTest", &["smoke"]);
    write_spec(specs.path(), "BrokenLoginTest", &["auth"]);

    let runner = runner(work.path(), specs.path(), false);
    let suite = runner.run_all().await.unwrap();

    assert_eq!(suite.total, 2);
    assert_eq!(suite.passed, 1);
    assert_eq!(suite.failed, 1);

    let broken = suite.results.iter().find(|r| r.name == "BrokenLoginTest").unwrap();
    assert!(!broken.success);
    assert_eq!(broken.steps.len(), 1);
    let video = broken.artifacts.video.as_ref().unwrap();
    let video_name = video.file_name().unwrap().to_string_lossy().to_string();
    assert!(video_name.starts_with("FAILED_BrokenLoginTest_"), "{}", video_name);
    assert!(video_name.ends_with(".webm"));
    assert!(broken.artifacts.screenshot.as_ref().unwrap().exists());

    let home = suite.results.iter().find(|r| r.name == "HomeTest").unwrap();
    assert!(home.success);
    assert!(home.artifacts.video.is_none());
    assert!(home.artifacts.screenshot.is_none());
    assert!(runner.controller().layout().artifacts_for("HomeTest").is_empty());

    // Only the failed test's video is left behind.
    assert_eq!(count_files(runner.controller().layout().videos_dir()), 1);
}

#[tokio::test]
async fn cleanup_failure_does_not_fail_the_suite() {
    let work = tempfile::tempdir().unwrap();
    let specs = tempfile::tempdir().unwrap();
    write_spec(specs.path(), "HomeTest", &[]);

    let runner = runner(work.path(), specs.path(), true);
    let suite = runner.run_all().await.unwrap();

    assert!(suite.all_passed());
    let home = &suite.results[0];
    assert!(home.success);
    assert_eq!(home.artifacts.issues.len(), 1);
    assert!(home.artifacts.issues[0].contains("delete"), "{}", home.artifacts.issues[0]);
}

#[tokio::test]
async fn run_tagged_and_by_name() {
    let work = tempfile::tempdir().unwrap();
    let specs = tempfile::tempdir().unwrap();
    write_spec(specs.path(), "ContactTest", &["forms"]);
    write_spec(specs.path(), "RegisterTest", &["forms", "auth"]);
    write_spec(specs.path(), "ProductsTest", &["catalog"]);

    let runner = runner(work.path(), specs.path(), false);

    let forms = runner.run_tagged("forms").await.unwrap();
    assert_eq!(forms.total, 2);

    let one = runner.run_test("ProductsTest").await.unwrap();
    assert_eq!(one.total, 1);
    assert_eq!(one.results[0].name, "ProductsTest");

    assert!(matches!(
        runner.run_test("Nope").await,
        Err(E2eError::TestNotFound(_))
    ));
}

#[tokio::test]
async fn results_are_written_as_json() {
    let work = tempfile::tempdir().unwrap();
    let specs = tempfile::tempdir().unwrap();
    write_spec(specs.path(), "BrokenCheckoutTest", &[]);

    let runner = runner(work.path(), specs.path(), false);
    let suite = runner.run_all().await.unwrap();
    let path = runner.write_results(&suite).unwrap();

    let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(json["failed"], 1);
    assert_eq!(json["results"][0]["name"], "BrokenCheckoutTest");
    assert!(json["results"][0]["artifacts"]["video"]
        .as_str()
        .unwrap()
        .contains("FAILED_BrokenCheckoutTest_"));
}
