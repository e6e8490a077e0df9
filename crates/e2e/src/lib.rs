//! Browser E2E runner with pass/fail artifact retention
//!
//! This crate provides a Rust-controlled E2E testing framework that:
//! - Parses declarative YAML test specs
//! - Runs each spec in its own Playwright browser context, recording video
//! - Hands every finished test to the retention controller, which keeps
//!   video and a screenshot for failures and deletes the video for passes
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    E2E Test Runner (Rust)                   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  TestRunner<L: SessionLauncher>                             │
//! │    ├── launch(spec) -> Session          (one per test)      │
//! │    ├── session.execute(spec) -> ExecutionOutcome            │
//! │    ├── record.complete(Passed | Failed)                     │
//! │    └── controller.finalize(record, session) -> report       │
//! ├─────────────────────────────────────────────────────────────┤
//! │  <work_dir>/videos/FAILED_<test>_<timestamp>.webm           │
//! │  <work_dir>/screenshots/FAILED_<test>_<timestamp>.png       │
//! │  <work_dir>/screenshots/DEBUG_<test>_<label>_<timestamp>.png│
//! │  <work_dir>/test-results.json                               │
//! └─────────────────────────────────────────────────────────────┘
//! ```

pub mod cli;
pub mod error;
pub mod playwright;
pub mod runner;
pub mod spec;

pub use error::{E2eError, E2eResult};
pub use runner::{RunnerConfig, TestRunner, TestSuiteResult};
pub use spec::{TestSpec, TestStep};
