//! Command-line options for the E2E harness

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use pwdemo_retention::RetentionConfig;

use crate::error::E2eResult;
use crate::playwright::{Browser, PlaywrightConfig};
use crate::runner::RunnerConfig;

#[derive(Parser, Debug)]
#[command(name = "pwdemo-e2e")]
#[command(about = "E2E test runner with failure video and screenshot retention")]
pub struct Args {
    /// Path to test specs directory
    #[arg(short, long, default_value = "tests/e2e/specs")]
    pub specs: PathBuf,

    /// Run only tests matching this tag
    #[arg(short, long)]
    pub tag: Option<String>,

    /// Run only a specific test by name
    #[arg(short, long)]
    pub name: Option<String>,

    /// Base URL of the app under test
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    pub base_url: String,

    /// Browser to use (chromium, firefox, webkit)
    #[arg(long, default_value = "chromium")]
    pub browser: String,

    /// Run in headless mode (`--headless false` shows the browser)
    #[arg(long, default_value_t = true, action = clap::ArgAction::Set)]
    pub headless: bool,

    /// Disable speculative video recording
    #[arg(long)]
    pub no_video: bool,

    /// Retention settings (TOML); flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Root directory for videos, screenshots and results
    #[arg(short, long)]
    pub work_dir: Option<PathBuf>,

    /// Wait before looking for the recorded video (ms)
    #[arg(long)]
    pub grace_delay_ms: Option<u64>,
}

impl Args {
    /// Runner settings: the retention file first, then flag overrides
    pub fn runner_config(&self) -> E2eResult<RunnerConfig> {
        let mut retention = match &self.config {
            Some(path) => RetentionConfig::load(path)?,
            None => RetentionConfig::default(),
        };
        if let Some(dir) = &self.work_dir {
            retention = retention.with_work_dir(dir);
        }
        if let Some(ms) = self.grace_delay_ms {
            retention = retention.with_grace_delay(Duration::from_millis(ms));
        }

        Ok(RunnerConfig {
            playwright: PlaywrightConfig {
                base_url: self.base_url.clone(),
                browser: Browser::parse(&self.browser),
                headless: self.headless,
                record_video: !self.no_video,
                ..Default::default()
            },
            output_dir: retention.work_dir.clone(),
            retention,
            specs_dir: self.specs.clone(),
        })
    }
}
