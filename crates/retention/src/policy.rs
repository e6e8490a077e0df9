//! Retention policy: outcome in, plan out. No IO here.

use serde::{Deserialize, Serialize};

use crate::record::Outcome;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VideoAction {
    /// Move the recording to the retained location
    Retain,
    /// Delete the speculative recording
    Discard,
    /// No recording was made
    Nothing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionPlan {
    pub video: VideoAction,
    pub capture_screenshot: bool,
}

/// Decide what to do with a finished test's artifacts
pub fn decide(outcome: Outcome, has_video: bool) -> RetentionPlan {
    match (outcome, has_video) {
        (Outcome::Failed, true) => RetentionPlan {
            video: VideoAction::Retain,
            capture_screenshot: true,
        },
        (Outcome::Failed, false) => RetentionPlan {
            video: VideoAction::Nothing,
            capture_screenshot: true,
        },
        (Outcome::Passed, true) => RetentionPlan {
            video: VideoAction::Discard,
            capture_screenshot: false,
        },
        (Outcome::Passed, false) => RetentionPlan {
            video: VideoAction::Nothing,
            capture_screenshot: false,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case(Outcome::Failed, true, VideoAction::Retain, true)]
    #[test_case(Outcome::Failed, false, VideoAction::Nothing, true)]
    #[test_case(Outcome::Passed, true, VideoAction::Discard, false)]
    #[test_case(Outcome::Passed, false, VideoAction::Nothing, false)]
    fn test_decide(outcome: Outcome, has_video: bool, video: VideoAction, screenshot: bool) {
        let plan = decide(outcome, has_video);
        assert_eq!(plan.video, video);
        assert_eq!(plan.capture_screenshot, screenshot);
    }
}
