//! Error types for quiz loading, attempt storage, and rejected learner actions.
//!
//! Storage errors are defined here rather than in `quizclock-store` so the
//! session can classify them (swallow, or treat as not-found) without string
//! matching.

use thiserror::Error;

use crate::model::AttemptStatus;

/// Errors reported by an [`AttemptStore`](crate::traits::AttemptStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing medium could not be reached at all.
    #[error("attempt store unavailable: {0}")]
    Unavailable(String),

    /// A record could not be written.
    #[error("failed to write attempt {key}: {message}")]
    WriteFailed { key: String, message: String },

    /// A record exists but could not be parsed.
    #[error("malformed saved attempt {key}: {message}")]
    Malformed { key: String, message: String },
}

impl StoreError {
    /// Returns `true` if the record exists but is unreadable.
    ///
    /// Callers treat such a record as missing and start a fresh attempt.
    pub fn is_malformed(&self) -> bool {
        matches!(self, StoreError::Malformed { .. })
    }
}

/// Errors in quiz content. These are authoring defects, not runtime conditions.
#[derive(Debug, Error)]
pub enum QuizError {
    /// The quiz failed validation (e.g. a correct option id that is not among
    /// the question's options).
    #[error("invalid quiz definition '{quiz_id}': {}", .problems.join("; "))]
    InvalidDefinition {
        quiz_id: String,
        problems: Vec<String>,
    },
}

/// A learner action that does not apply to the attempt's current state.
///
/// A rejected action never changes the attempt.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejected {
    #[error("cannot {action} while the attempt is {status}")]
    WrongState {
        action: &'static str,
        status: AttemptStatus,
    },

    #[error("the attempt is already completed")]
    Completed,

    #[error("time is up, the attempt is being submitted")]
    TimeUp,

    #[error("unknown question: {0}")]
    UnknownQuestion(String),

    #[error("question {question_id} has no option {option_id}")]
    UnknownOption {
        question_id: String,
        option_id: String,
    },

    #[error("the answer to question {0} is locked")]
    AnswerLocked(String),

    #[error("submit is only available on the last question")]
    NotOnLastQuestion,

    #[error("question {index} is out of range (1-{count})")]
    OutOfRange { index: usize, count: usize },

    #[error("going back to an earlier question is disabled")]
    BackNavigationDisabled,
}
