//! Per-test execution records

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pass/fail outcome of one test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    Failed,
}

impl Outcome {
    pub fn from_success(success: bool) -> Self {
        if success {
            Outcome::Passed
        } else {
            Outcome::Failed
        }
    }

    /// File name prefix for artifacts kept for this outcome
    pub fn prefix(&self) -> &'static str {
        match self {
            Outcome::Passed => "PASSED",
            Outcome::Failed => "FAILED",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Passed => write!(f, "passed"),
            Outcome::Failed => write!(f, "failed"),
        }
    }
}

/// `Running -> Completed(outcome) -> Finalized(outcome)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", content = "outcome", rename_all = "snake_case")]
pub enum TestState {
    Running,
    Completed(Outcome),
    Finalized(Outcome),
}

impl fmt::Display for TestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TestState::Running => write!(f, "running"),
            TestState::Completed(o) => write!(f, "completed({})", o),
            TestState::Finalized(o) => write!(f, "finalized({})", o),
        }
    }
}

/// One test run, from start to teardown
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestExecutionRecord {
    name: String,
    started_at: DateTime<Local>,
    completed_at: Option<DateTime<Local>>,
    state: TestState,
}

impl TestExecutionRecord {
    /// Start a record now
    pub fn start(name: impl Into<String>) -> Self {
        Self::start_at(name, Local::now())
    }

    pub fn start_at(name: impl Into<String>, started_at: DateTime<Local>) -> Self {
        Self {
            name: name.into(),
            started_at,
            completed_at: None,
            state: TestState::Running,
        }
    }

    /// Record the outcome now. Returns `false` if the record had already
    /// left `Running`, in which case nothing changes.
    pub fn complete(&mut self, outcome: Outcome) -> bool {
        self.complete_at(outcome, Local::now())
    }

    pub fn complete_at(&mut self, outcome: Outcome, at: DateTime<Local>) -> bool {
        if self.state != TestState::Running {
            return false;
        }
        self.state = TestState::Completed(outcome);
        self.completed_at = Some(at);
        true
    }

    pub(crate) fn mark_finalized(&mut self) {
        if let TestState::Completed(outcome) = self.state {
            self.state = TestState::Finalized(outcome);
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn started_at(&self) -> DateTime<Local> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Local>> {
        self.completed_at
    }

    pub fn state(&self) -> TestState {
        self.state
    }

    /// Outcome once known, in either terminal state
    pub fn outcome(&self) -> Option<Outcome> {
        match self.state {
            TestState::Running => None,
            TestState::Completed(o) | TestState::Finalized(o) => Some(o),
        }
    }

    pub fn is_finalized(&self) -> bool {
        matches!(self.state, TestState::Finalized(_))
    }

    /// Timestamp artifact names are derived from: completion time, or the
    /// start time for a record that never completed
    pub fn artifact_timestamp(&self) -> DateTime<Local> {
        self.completed_at.unwrap_or(self.started_at)
    }
}
