//! Core data model types for quizclock.
//!
//! Quiz definitions are immutable content supplied by an authoring tool.
//! The attempt-side types (status, result, saved record) are what the engine
//! produces and persists.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Chosen option id per question id. One answer per question.
pub type Answers = BTreeMap<String, String>;

/// A complete quiz as supplied by the content collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizDefinition {
    /// Unique identifier for this quiz.
    pub id: String,
    /// Human-readable title.
    pub title: String,
    /// Instructions shown before the attempt starts.
    #[serde(default)]
    pub instructions: String,
    /// Time limit in minutes. `None` or `0` means untimed.
    #[serde(default)]
    pub time_limit_minutes: Option<u32>,
    /// Minimum score percent required to pass (inclusive).
    pub pass_score_percent: u8,
    /// When per-question correctness is revealed.
    #[serde(default)]
    pub feedback_when: FeedbackWhen,
    /// Ordered questions.
    #[serde(default)]
    pub questions: Vec<Question>,
}

impl QuizDefinition {
    /// The time limit, if the quiz is timed.
    pub fn time_limit(&self) -> Option<Duration> {
        match self.time_limit_minutes {
            Some(minutes) if minutes > 0 => Some(Duration::minutes(i64::from(minutes))),
            _ => None,
        }
    }

    pub fn is_timed(&self) -> bool {
        self.time_limit().is_some()
    }

    pub fn question(&self, question_id: &str) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == question_id)
    }

    pub fn question_count(&self) -> usize {
        self.questions.len()
    }
}

/// A single multiple-choice question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: String,
    pub prompt: String,
    /// Options in display order.
    pub options: Vec<QuizOption>,
    /// Id of the correct option; must be one of `options`.
    pub correct_option_id: String,
    #[serde(default)]
    pub explanation: Option<String>,
}

impl Question {
    pub fn option(&self, option_id: &str) -> Option<&QuizOption> {
        self.options.iter().find(|o| o.id == option_id)
    }

    pub fn has_option(&self, option_id: &str) -> bool {
        self.option(option_id).is_some()
    }
}

/// One selectable answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuizOption {
    pub id: String,
    pub label: String,
}

/// When correctness is revealed to the learner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackWhen {
    /// Right after the learner answers the current question.
    Instant,
    /// Only once the attempt is completed.
    #[default]
    AfterSubmit,
    /// Never per question; only score and pass/fail.
    Never,
}

impl fmt::Display for FeedbackWhen {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedbackWhen::Instant => write!(f, "instant"),
            FeedbackWhen::AfterSubmit => write!(f, "after_submit"),
            FeedbackWhen::Never => write!(f, "never"),
        }
    }
}

impl FromStr for FeedbackWhen {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "instant" => Ok(FeedbackWhen::Instant),
            "after_submit" | "aftersubmit" => Ok(FeedbackWhen::AfterSubmit),
            "never" | "none" => Ok(FeedbackWhen::Never),
            other => Err(format!("unknown feedback mode: {other}")),
        }
    }
}

/// Lifecycle state of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    Intro,
    InProgress,
    ConfirmingSubmit,
    Completed,
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptStatus::Intro => write!(f, "intro"),
            AttemptStatus::InProgress => write!(f, "in_progress"),
            AttemptStatus::ConfirmingSubmit => write!(f, "confirming_submit"),
            AttemptStatus::Completed => write!(f, "completed"),
        }
    }
}

/// How an attempt reached `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitReason {
    /// The learner submitted and confirmed.
    Manual,
    /// The deadline passed; submitted without confirmation.
    TimeExpired,
}

impl fmt::Display for SubmitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SubmitReason::Manual => write!(f, "submitted"),
            SubmitReason::TimeExpired => write!(f, "time expired"),
        }
    }
}

/// Final, frozen outcome of an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttemptResult {
    pub score_percent: u8,
    pub passed: bool,
    pub correct_count: usize,
    pub question_count: usize,
}

/// Composite storage key for one attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AttemptKey {
    pub quiz_id: String,
    pub attempt_id: String,
}

impl AttemptKey {
    pub fn new(quiz_id: impl Into<String>, attempt_id: impl Into<String>) -> Self {
        Self {
            quiz_id: quiz_id.into(),
            attempt_id: attempt_id.into(),
        }
    }
}

impl fmt::Display for AttemptKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.quiz_id, self.attempt_id)
    }
}

/// The persisted form of an attempt.
///
/// Every field defaults when absent so older or partial records still load.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SavedAttempt {
    #[serde(default)]
    pub answers: Answers,
    #[serde(default)]
    pub deadline_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub saved_at: Option<DateTime<Utc>>,
    /// Present once the attempt is completed.
    #[serde(default)]
    pub result: Option<AttemptResult>,
    #[serde(default)]
    pub submitted_by: Option<SubmitReason>,
}

impl SavedAttempt {
    pub fn is_completed(&self) -> bool {
        self.result.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quiz(limit: Option<u32>) -> QuizDefinition {
        QuizDefinition {
            id: "quiz".into(),
            title: "Quiz".into(),
            instructions: String::new(),
            time_limit_minutes: limit,
            pass_score_percent: 50,
            feedback_when: FeedbackWhen::AfterSubmit,
            questions: vec![],
        }
    }

    #[test]
    fn zero_minutes_is_untimed() {
        assert!(!quiz(None).is_timed());
        assert!(!quiz(Some(0)).is_timed());
        assert_eq!(quiz(Some(2)).time_limit(), Some(Duration::seconds(120)));
    }

    #[test]
    fn feedback_display_and_parse() {
        assert_eq!(FeedbackWhen::AfterSubmit.to_string(), "after_submit");
        assert_eq!(
            "after-submit".parse::<FeedbackWhen>().unwrap(),
            FeedbackWhen::AfterSubmit
        );
        assert_eq!("Instant".parse::<FeedbackWhen>().unwrap(), FeedbackWhen::Instant);
        assert!("sometimes".parse::<FeedbackWhen>().is_err());
    }

    #[test]
    fn saved_attempt_defaults_missing_fields() {
        let saved: SavedAttempt = serde_json::from_str("{}").unwrap();
        assert!(saved.answers.is_empty());
        assert!(saved.deadline_at.is_none());
        assert!(!saved.is_completed());

        let saved: SavedAttempt = serde_json::from_str(r#"{"answers":{"q1":"a"}}"#).unwrap();
        assert_eq!(saved.answers.get("q1").map(String::as_str), Some("a"));
    }

    #[test]
    fn attempt_key_display() {
        assert_eq!(AttemptKey::new("quiz", "abc").to_string(), "quiz/abc");
    }
}
