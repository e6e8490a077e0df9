//! Pass/fail artifact retention for browser E2E tests
//!
//! Every test records video speculatively. At teardown the
//! [`RetentionController`] looks at the outcome and either keeps the
//! recording next to a failure screenshot or throws it away:
//!
//! ```text
//! Running ──complete()──► Completed(Passed | Failed) ──finalize()──► Finalized
//!
//!   Failed: videos/FAILED_<test>_<timestamp>.webm
//!           screenshots/FAILED_<test>_<timestamp>.png   (best effort)
//!   Passed: speculative video deleted
//! ```
//!
//! Filesystem and session problems never fail the test; they are logged
//! and listed in the returned [`RetentionReport`].

pub mod artifact;
pub mod config;
pub mod controller;
pub mod error;
pub mod policy;
pub mod record;
pub mod session;

pub use artifact::{ArtifactFile, ArtifactKind, ArtifactLayout};
pub use config::RetentionConfig;
pub use controller::{RetentionController, RetentionReport, SkipReason};
pub use error::{RetentionError, RetentionResult};
pub use policy::{decide, RetentionPlan, VideoAction};
pub use record::{Outcome, TestExecutionRecord, TestState};
pub use session::{BrowserSession, RecordedVideo, VideoHandle};
