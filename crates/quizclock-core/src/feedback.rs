//! When per-question correctness is revealed.

use serde::Serialize;

use crate::model::{AttemptStatus, FeedbackWhen};

/// What the learner may see and do for one question.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct FeedbackDecision {
    /// Show whether the chosen option is correct, and which option is.
    pub reveal_correctness: bool,
    /// Show the question's explanation, if it has one.
    pub show_explanation: bool,
    /// Further changes to the answer are refused.
    pub answer_locked: bool,
}

/// Decide feedback for a question. Holds no state.
pub fn decide(when: FeedbackWhen, status: AttemptStatus, answered: bool) -> FeedbackDecision {
    let completed = status == AttemptStatus::Completed;

    let reveal = match when {
        FeedbackWhen::Instant => answered || completed,
        FeedbackWhen::AfterSubmit => completed,
        FeedbackWhen::Never => false,
    };

    FeedbackDecision {
        reveal_correctness: reveal,
        show_explanation: reveal,
        answer_locked: completed || (when == FeedbackWhen::Instant && answered),
    }
}
