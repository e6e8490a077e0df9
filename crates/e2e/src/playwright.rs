//! Playwright browser sessions
//!
//! Each spec runs as one generated Node script in its own browser context
//! (test-level isolation). Video is recorded into the retention layout's
//! video directory; on failure the script grabs a final frame before the
//! browser closes so the failure screenshot can still be produced at
//! teardown.

use async_trait::async_trait;
use chrono::{DateTime, Local};
use once_cell::sync::{Lazy, OnceCell};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::process::Command as TokioCommand;
use tracing::{debug, info, warn};

use pwdemo_retention::{
    artifact, ArtifactLayout, BrowserSession, RecordedVideo, RetentionController, RetentionError,
    RetentionResult, VideoHandle,
};

use crate::error::{E2eError, E2eResult};
use crate::runner::{ExecutionOutcome, SessionLauncher, SpecSession};
use crate::spec::{TestSpec, TestStep, Viewport};

/// Marker in front of the JSON line the script prints last
const RESULT_MARKER: &str = "__PWDEMO_RESULT__";

static RESULT_LINE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"^{} (\{{.*\}})\s*$", RESULT_MARKER)).expect("static regex")
});

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Browser {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl Browser {
    pub fn as_str(&self) -> &'static str {
        match self {
            Browser::Chromium => "chromium",
            Browser::Firefox => "firefox",
            Browser::Webkit => "webkit",
        }
    }

    pub fn parse(name: &str) -> Self {
        match name {
            "firefox" => Browser::Firefox,
            "webkit" => Browser::Webkit,
            _ => Browser::Chromium,
        }
    }
}

/// Configuration for Playwright
#[derive(Debug, Clone)]
pub struct PlaywrightConfig {
    pub base_url: String,
    pub browser: Browser,
    pub headless: bool,
    /// Record every test speculatively; retention decides afterwards
    pub record_video: bool,
    /// Node executable used to run generated scripts
    pub node_binary: String,
}

impl Default for PlaywrightConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000".to_string(),
            browser: Browser::Chromium,
            headless: true,
            record_video: true,
            node_binary: "node".to_string(),
        }
    }
}

/// What the generated script reports back
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScriptReport {
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    /// 1-based index of the step that threw
    #[serde(default)]
    pub failed_step: Option<usize>,
    #[serde(default)]
    pub video: Option<PathBuf>,
    #[serde(default)]
    pub final_frame: Option<PathBuf>,
    #[serde(default)]
    pub screenshots: Vec<PathBuf>,
}

impl ScriptReport {
    /// Pull the report out of the script's stdout
    pub fn parse(stdout: &str) -> E2eResult<Self> {
        let json = stdout
            .lines()
            .rev()
            .find_map(|line| RESULT_LINE.captures(line).and_then(|c| c.get(1)))
            .ok_or_else(|| E2eError::ScriptOutput("no result line".to_string()))?;
        Ok(serde_json::from_str(json.as_str())?)
    }
}

/// Quote a value as a JavaScript string literal
fn js(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "''".to_string())
}

fn js_path(path: &Path) -> String {
    js(&path.to_string_lossy())
}

/// Generates Node scripts for one test
pub struct ScriptBuilder<'a> {
    config: &'a PlaywrightConfig,
    viewport: Viewport,
    test_name: &'a str,
    layout: &'a ArtifactLayout,
    /// Shared by every debug capture in the script
    started: DateTime<Local>,
    /// Capture the whole page for the final frame
    full_page: bool,
}

impl<'a> ScriptBuilder<'a> {
    pub fn new(config: &'a PlaywrightConfig, viewport: Viewport, test_name: &'a str, layout: &'a ArtifactLayout) -> Self {
        Self {
            config,
            viewport,
            test_name,
            layout,
            started: Local::now(),
            full_page: true,
        }
    }

    pub fn full_page(mut self, full_page: bool) -> Self {
        self.full_page = full_page;
        self
    }

    /// Full script for a spec. `video_dir` turns recording on,
    /// `final_frame` is where the page is captured if a step throws.
    pub fn build(&self, steps: &[TestStep], video_dir: Option<&Path>, final_frame: Option<&Path>) -> String {
        let mut script = self.header(video_dir);
        let mut used = HashSet::new();

        for (i, step) in steps.iter().enumerate() {
            script.push_str(&format!("\n    // Step {}: {}\n", i + 1, step.label()));
            script.push_str(&format!("    step = {};\n", i + 1));
            script.push_str(&self.step_to_js(step, &mut used));
            script.push('\n');
        }

        script.push_str(&self.footer(final_frame));
        script
    }

    /// Navigate to `url` and capture the page to `path`
    pub fn build_capture(&self, url: &str, path: &Path, full_page: bool) -> String {
        let mut script = self.header(None);
        script.push_str(&format!(
            "    step = 1;\n    await page.goto(baseUrl + {});\n    step = 2;\n    await page.screenshot({{ path: {}, fullPage: {} }});\n    result.screenshots.push({});\n",
            js(url),
            js_path(path),
            full_page,
            js_path(path),
        ));
        script.push_str(&self.footer(None));
        script
    }

    fn header(&self, video_dir: Option<&Path>) -> String {
        let record = video_dir
            .map(|dir| {
                format!(
                    ",\n    recordVideo: {{ dir: {}, size: {{ width: {}, height: {} }} }}",
                    js_path(dir),
                    self.viewport.width,
                    self.viewport.height
                )
            })
            .unwrap_or_default();

        format!(
            r#"
const {{ chromium, firefox, webkit, expect }} = require('@playwright/test');

(async () => {{
  const result = {{ success: false, error: null, failed_step: null, video: null, final_frame: null, screenshots: [] }};
  const browser = await {browser}.launch({{ headless: {headless} }});
  const context = await browser.newContext({{
    viewport: {{ width: {width}, height: {height} }}{record}
  }});
  const page = await context.newPage();
  const baseUrl = {base_url};
  let step = 0;

  try {{
"#,
            browser = self.config.browser.as_str(),
            headless = self.config.headless,
            width = self.viewport.width,
            height = self.viewport.height,
            record = record,
            base_url = js(&self.config.base_url),
        )
    }

    fn footer(&self, final_frame: Option<&Path>) -> String {
        let capture = final_frame
            .map(|path| {
                format!(
                    r#"
    try {{
      await page.screenshot({{ path: {path}, fullPage: {full} }});
      result.final_frame = {path};
    }} catch (_) {{}}"#,
                    path = js_path(path),
                    full = self.full_page
                )
            })
            .unwrap_or_default();

        format!(
            r#"
    result.success = true;
  }} catch (error) {{
    result.error = error.message;
    result.failed_step = step;{capture}
  }} finally {{
    const video = page.video();
    await context.close();
    if (video) {{
      try {{ result.video = await video.path(); }} catch (_) {{}}
    }}
    await browser.close();
    console.log('{marker} ' + JSON.stringify(result));
  }}
}})();
"#,
            capture = capture,
            marker = RESULT_MARKER,
        )
    }

    fn debug_path(&self, label: &str, used: &mut HashSet<PathBuf>) -> PathBuf {
        let base = self.layout.debug_screenshot_path(self.test_name, label, &self.started);
        let mut path = artifact::unique_destination(&base);
        let mut n = 2u32;
        while used.contains(&path) {
            let stem = base.file_stem().map(|s| s.to_string_lossy().to_string()).unwrap_or_default();
            path = base.with_file_name(format!("{}_{}.{}", stem, n, artifact::SCREENSHOT_EXTENSION));
            n += 1;
        }
        used.insert(path.clone());
        path
    }

    fn step_to_js(&self, step: &TestStep, used: &mut HashSet<PathBuf>) -> String {
        match step {
            TestStep::Navigate { url, wait_for_selector } => {
                let wait = wait_for_selector
                    .as_ref()
                    .map(|s| format!("\n    await page.waitForSelector({});", js(s)))
                    .unwrap_or_default();
                format!("    await page.goto(baseUrl + {});{}", js(url), wait)
            }
            TestStep::Click { selector, timeout_ms } => {
                format!(
                    "    await page.click({}, {{ timeout: {} }});",
                    js(selector),
                    timeout_ms.unwrap_or(5000)
                )
            }
            TestStep::Fill { selector, value } => {
                format!("    await page.fill({}, {});", js(selector), js(value))
            }
            TestStep::Check { selector } => format!("    await page.check({});", js(selector)),
            TestStep::Select { selector, value } => {
                format!("    await page.selectOption({}, {});", js(selector), js(value))
            }
            TestStep::Press { selector, key } => match selector {
                Some(sel) => format!("    await page.locator({}).press({});", js(sel), js(key)),
                None => format!("    await page.keyboard.press({});", js(key)),
            },
            TestStep::Wait { selector, timeout_ms, state } => format!(
                "    await page.waitForSelector({}, {{ state: '{}', timeout: {} }});",
                js(selector),
                state.as_str(),
                timeout_ms
            ),
            TestStep::Assert { selector, visible, text, text_contains, count } => {
                let locator = format!("page.locator({})", js(selector));
                let mut assertions = Vec::new();
                match visible {
                    Some(true) => assertions.push(format!("    await expect({}).toBeVisible();", locator)),
                    Some(false) => assertions.push(format!("    await expect({}).toBeHidden();", locator)),
                    None => {}
                }
                if let Some(t) = text {
                    assertions.push(format!("    await expect({}).toHaveText({});", locator, js(t)));
                }
                if let Some(t) = text_contains {
                    assertions.push(format!("    await expect({}).toContainText({});", locator, js(t)));
                }
                if let Some(c) = count {
                    assertions.push(format!("    await expect({}).toHaveCount({});", locator, c));
                }
                assertions.join("\n")
            }
            TestStep::Screenshot { label, full_page } => {
                let path = js_path(&self.debug_path(label, used));
                format!(
                    "    await page.screenshot({{ path: {path}, fullPage: {full} }});\n    result.screenshots.push({path});",
                    path = path,
                    full = full_page
                )
            }
            TestStep::Log { message } => format!("    console.log('[TEST] ' + {});", js(message)),
        }
    }
}

/// Starts a [`PlaywrightSession`] per spec
pub struct PlaywrightLauncher {
    config: PlaywrightConfig,
}

impl PlaywrightLauncher {
    /// Fails with [`E2eError::PlaywrightNotFound`] when `npx playwright`
    /// is not available
    pub fn new(config: PlaywrightConfig) -> E2eResult<Self> {
        Self::check_playwright_installed()?;
        Ok(Self { config })
    }

    fn check_playwright_installed() -> E2eResult<()> {
        let output = Command::new("npx")
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status();

        match output {
            Ok(status) if status.success() => Ok(()),
            _ => Err(E2eError::PlaywrightNotFound),
        }
    }
}

#[async_trait]
impl SessionLauncher for PlaywrightLauncher {
    type Session = PlaywrightSession;

    async fn launch(&self, spec: &TestSpec, controller: &RetentionController) -> E2eResult<PlaywrightSession> {
        PlaywrightSession::new(self.config.clone(), spec, controller)
    }
}

/// One browser context for one test
pub struct PlaywrightSession {
    config: PlaywrightConfig,
    test_name: String,
    viewport: Viewport,
    layout: ArtifactLayout,
    full_page: bool,
    staging: tempfile::TempDir,
    current_url: Mutex<Option<String>>,
    video: OnceCell<RecordedVideo>,
    final_frame: OnceCell<PathBuf>,
    closed: AtomicBool,
}

impl PlaywrightSession {
    pub fn new(config: PlaywrightConfig, spec: &TestSpec, controller: &RetentionController) -> E2eResult<Self> {
        Ok(Self {
            config,
            test_name: spec.name.clone(),
            viewport: spec.viewport,
            layout: controller.layout().clone(),
            full_page: controller.config().full_page_screenshots,
            staging: tempfile::tempdir()?,
            current_url: Mutex::new(None),
            video: OnceCell::new(),
            final_frame: OnceCell::new(),
            closed: AtomicBool::new(false),
        })
    }

    fn builder(&self) -> ScriptBuilder<'_> {
        ScriptBuilder::new(&self.config, self.viewport, &self.test_name, &self.layout).full_page(self.full_page)
    }

    async fn run_script(&self, name: &str, script: &str) -> E2eResult<ScriptReport> {
        let script_path = self.staging.path().join(name);
        std::fs::write(&script_path, script)?;

        debug!("Running Playwright script: {}", script_path.display());

        let output = TokioCommand::new(&self.config.node_binary)
            .arg(&script_path)
            .current_dir(self.staging.path())
            .output()
            .await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        match ScriptReport::parse(&stdout) {
            Ok(report) => Ok(report),
            Err(_) => {
                let stderr = String::from_utf8_lossy(&output.stderr);
                Err(E2eError::Playwright(format!(
                    "Script failed ({}):\nstdout: {}\nstderr: {}",
                    output.status, stdout, stderr
                )))
            }
        }
    }
}

#[async_trait]
impl SpecSession for PlaywrightSession {
    async fn execute(&self, spec: &TestSpec) -> E2eResult<ExecutionOutcome> {
        let video_dir = if self.config.record_video {
            let dir = self.layout.videos_dir().to_path_buf();
            std::fs::create_dir_all(&dir)?;
            Some(dir)
        } else {
            None
        };
        let final_frame = self.staging.path().join("final-frame.png");

        let script = self.builder().build(&spec.steps, video_dir.as_deref(), Some(&final_frame));
        let report = self.run_script("test.js", &script).await;
        self.closed.store(true, Ordering::SeqCst);
        let report = report?;

        if let Some(video) = &report.video {
            let _ = self.video.set(RecordedVideo::new(video));
        }
        if let Some(frame) = &report.final_frame {
            let _ = self.final_frame.set(frame.clone());
        }

        Ok(ExecutionOutcome {
            success: report.success,
            failed_step: report.failed_step,
            error: report.error,
            screenshots: report.screenshots,
        })
    }
}

#[async_trait]
impl BrowserSession for PlaywrightSession {
    fn video(&self) -> Option<&dyn VideoHandle> {
        self.video.get().map(|v| v as &dyn VideoHandle)
    }

    async fn screenshot(&self, path: &Path, full_page: bool) -> RetentionResult<()> {
        if let Some(frame) = self.final_frame.get() {
            std::fs::copy(frame, path).map_err(|e| RetentionError::FileSystem {
                op: "copy",
                path: frame.clone(),
                source: e,
            })?;
            return Ok(());
        }
        if self.is_closed() {
            return Err(RetentionError::SessionUnavailable(format!(
                "browser for {} already closed",
                self.test_name
            )));
        }

        let url = self
            .current_url
            .lock()
            .map_err(|_| RetentionError::SessionUnavailable("session state poisoned".to_string()))?
            .clone()
            .ok_or_else(|| RetentionError::SessionUnavailable("nothing navigated yet".to_string()))?;

        let script = self.builder().build_capture(&url, path, full_page);
        match self.run_script("capture.js", &script).await {
            Ok(report) if report.success => Ok(()),
            Ok(report) => Err(RetentionError::SessionUnavailable(
                report.error.unwrap_or_else(|| "capture failed".to_string()),
            )),
            Err(e) => Err(RetentionError::SessionUnavailable(e.to_string())),
        }
    }

    async fn navigate(&self, url: &str) -> RetentionResult<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(RetentionError::SessionUnavailable(format!(
                "browser for {} already closed",
                self.test_name
            )));
        }
        let step = TestStep::Navigate {
            url: url.to_string(),
            wait_for_selector: None,
        };
        let script = self.builder().build(&[step], None, None);
        match self.run_script("navigate.js", &script).await {
            Ok(report) if report.success => {
                info!("[{}] Navigated to {}", self.test_name, url);
                if let Ok(mut current) = self.current_url.lock() {
                    *current = Some(url.to_string());
                }
                Ok(())
            }
            Ok(report) => Err(RetentionError::SessionUnavailable(format!(
                "navigation to {} failed: {}",
                url,
                report.error.unwrap_or_default()
            ))),
            Err(e) => {
                warn!("[{}] Navigation script failed: {}", self.test_name, e);
                Err(RetentionError::SessionUnavailable(e.to_string()))
            }
        }
    }

    /// Closed once the spec script has finished, unless a final frame
    /// survives to serve screenshots from
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst) && self.final_frame.get().is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pwdemo_retention::RetentionConfig;
    use crate::spec::WaitState;
    use test_case::test_case;

    fn layout() -> ArtifactLayout {
        ArtifactLayout::new(&RetentionConfig::default().with_work_dir("/work"))
    }

    fn controller() -> RetentionController {
        RetentionController::new(RetentionConfig::default().with_work_dir("/work"))
    }

    #[test]
    fn test_script_records_video_and_final_frame() {
        let config = PlaywrightConfig::default();
        let layout = layout();
        let builder = ScriptBuilder::new(&config, Viewport::default(), "LoginTest", &layout);
        let steps = vec![TestStep::Navigate {
            url: "/Account/Login".to_string(),
            wait_for_selector: None,
        }];

        let script = builder.build(&steps, Some(Path::new("/work/videos")), Some(Path::new("/stage/final.png")));

        assert!(script.contains(r#"recordVideo: { dir: "/work/videos", size: { width: 1280, height: 720 } }"#));
        assert!(script.contains(r#"await page.goto(baseUrl + "/Account/Login");"#));
        assert!(script.contains(r#"result.final_frame = "/stage/final.png";"#));
        assert!(script.contains("chromium.launch({ headless: true })"));
        assert!(script.contains(RESULT_MARKER));
    }

    #[test]
    fn test_script_without_video() {
        let config = PlaywrightConfig::default();
        let layout = layout();
        let builder = ScriptBuilder::new(&config, Viewport::default(), "LoginTest", &layout);
        let script = builder.build(&[], None, None);
        assert!(!script.contains("recordVideo"));
        assert!(!script.contains("final_frame ="));
    }

    #[test_case(true, "fullPage: true" ; "whole page")]
    #[test_case(false, "fullPage: false" ; "viewport only")]
    fn test_final_frame_follows_full_page_setting(full_page: bool, expected: &str) {
        let config = PlaywrightConfig::default();
        let layout = layout();
        let builder = ScriptBuilder::new(&config, Viewport::default(), "T", &layout).full_page(full_page);

        let script = builder.build(&[], None, Some(Path::new("/stage/final.png")));
        let capture = script
            .lines()
            .find(|l| l.contains(r#"path: "/stage/final.png""#))
            .unwrap();
        assert!(capture.contains(expected), "{}", capture);
    }

    #[test_case(TestStep::Check { selector: "#Terms".into() }, r##"await page.check("#Terms");"## ; "check")]
    #[test_case(
        TestStep::Select { selector: "#Country".into(), value: "NL".into() },
        r##"await page.selectOption("#Country", "NL");"##
        ; "select"
    )]
    #[test_case(
        TestStep::Press { selector: Some("#Search".into()), key: "Enter".into() },
        r##"await page.locator("#Search").press("Enter");"##
        ; "press on element"
    )]
    #[test_case(
        TestStep::Press { selector: None, key: "Escape".into() },
        r#"await page.keyboard.press("Escape");"#
        ; "press on keyboard"
    )]
    #[test_case(
        TestStep::Wait { selector: ".toast".into(), timeout_ms: 2000, state: WaitState::Hidden },
        r#"await page.waitForSelector(".toast", { state: 'hidden', timeout: 2000 });"#
        ; "wait"
    )]
    #[test_case(
        TestStep::Click { selector: "#Submit".into(), timeout_ms: None },
        r##"await page.click("#Submit", { timeout: 5000 });"##
        ; "click with default timeout"
    )]
    #[test_case(TestStep::Log { message: "done".into() }, r#"console.log('[TEST] ' + "done");"# ; "log")]
    fn test_step_to_js(step: TestStep, expected: &str) {
        let config = PlaywrightConfig::default();
        let layout = layout();
        let builder = ScriptBuilder::new(&config, Viewport::default(), "T", &layout);
        let js = builder.step_to_js(&step, &mut HashSet::new());
        assert_eq!(js.trim(), expected);
    }

    #[test]
    fn test_values_are_quoted() {
        let config = PlaywrightConfig::default();
        let layout = layout();
        let builder = ScriptBuilder::new(&config, Viewport::default(), "T", &layout);
        let steps = vec![TestStep::Fill {
            selector: "#Name".to_string(),
            value: "O'Brien \"Jr\"".to_string(),
        }];

        let script = builder.build(&steps, None, None);
        assert!(script.contains(r##"await page.fill("#Name", "O'Brien \"Jr\"");"##));
    }

    #[test]
    fn test_debug_screenshots_get_distinct_names() {
        let config = PlaywrightConfig::default();
        let layout = layout();
        let builder = ScriptBuilder::new(&config, Viewport::default(), "ContactForm", &layout);
        let shot = TestStep::Screenshot {
            label: "form".to_string(),
            full_page: false,
        };

        let script = builder.build(&[shot.clone(), shot], None, None);

        let paths: Vec<&str> = script
            .lines()
            .filter(|l| l.contains("await page.screenshot"))
            .collect();
        assert_eq!(paths.len(), 2);
        assert!(paths[0].contains("/work/screenshots/DEBUG_ContactForm_form_"));
        assert_ne!(paths[0], paths[1]);
        assert!(paths[1].contains("_2.png"));
    }

    #[test]
    fn test_assert_generates_expectations() {
        let config = PlaywrightConfig::default();
        let layout = layout();
        let builder = ScriptBuilder::new(&config, Viewport::default(), "T", &layout);
        let steps = vec![TestStep::Assert {
            selector: ".alert".to_string(),
            visible: Some(true),
            text: None,
            text_contains: Some("Thank you".to_string()),
            count: Some(1),
        }];

        let script = builder.build(&steps, None, None);
        assert!(script.contains(r#"await expect(page.locator(".alert")).toBeVisible();"#));
        assert!(script.contains(r#"await expect(page.locator(".alert")).toContainText("Thank you");"#));
        assert!(script.contains(r#"await expect(page.locator(".alert")).toHaveCount(1);"#));
    }

    #[test]
    fn test_parse_report_takes_last_marker_line() {
        let stdout = format!(
            "[TEST] hello\n{m} {{\"success\":false}}\nnoise\n{m} {{\"success\":false,\"error\":\"Timeout\",\"failed_step\":3,\"video\":\"/work/videos/abc.webm\",\"final_frame\":null,\"screenshots\":[]}}\n",
            m = RESULT_MARKER
        );
        let report = ScriptReport::parse(&stdout).unwrap();
        assert!(!report.success);
        assert_eq!(report.failed_step, Some(3));
        assert_eq!(report.video, Some(PathBuf::from("/work/videos/abc.webm")));
        assert!(report.final_frame.is_none());
    }

    #[test]
    fn test_parse_report_without_marker_fails() {
        assert!(matches!(
            ScriptReport::parse("Error: Cannot find module '@playwright/test'"),
            Err(E2eError::ScriptOutput(_))
        ));
    }

    #[tokio::test]
    async fn test_closed_session_without_frame_refuses_screenshot() {
        let spec = TestSpec::from_yaml("name: T\nsteps:\n  - action: log\n    message: x\n").unwrap();
        let session = PlaywrightSession::new(PlaywrightConfig::default(), &spec, &controller()).unwrap();
        session.closed.store(true, Ordering::SeqCst);

        assert!(session.is_closed());
        assert!(session.video().is_none());
        let err = session.screenshot(Path::new("/tmp/x.png"), true).await.unwrap_err();
        assert!(matches!(err, RetentionError::SessionUnavailable(_)));
    }

    #[tokio::test]
    async fn test_final_frame_serves_screenshot_after_close() {
        let spec = TestSpec::from_yaml("name: T\nsteps:\n  - action: log\n    message: x\n").unwrap();
        let session = PlaywrightSession::new(PlaywrightConfig::default(), &spec, &controller()).unwrap();
        let frame = session.staging.path().join("final-frame.png");
        std::fs::write(&frame, b"png").unwrap();
        session.final_frame.set(frame).unwrap();
        session.closed.store(true, Ordering::SeqCst);

        let out = tempfile::tempdir().unwrap();
        let target = out.path().join("FAILED_T.png");
        assert!(!session.is_closed());
        session.screenshot(&target, true).await.unwrap();
        assert_eq!(std::fs::read(&target).unwrap(), b"png");
    }
}
