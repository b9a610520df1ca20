//! Attempt report types with JSON persistence.
//!
//! A report is what a results view or a progress-tracking collaborator
//! consumes. Per-question detail is filtered through the feedback policy, so
//! a report never leaks correct answers the learner may not see.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::attempt::Attempt;
use crate::feedback;
use crate::model::{AttemptResult, AttemptStatus, FeedbackWhen, SubmitReason};

/// A snapshot of one attempt for display or export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttemptReport {
    pub quiz: QuizSummary,
    pub attempt_id: String,
    pub status: AttemptStatus,
    #[serde(default)]
    pub submitted_by: Option<SubmitReason>,
    #[serde(default)]
    pub result: Option<AttemptResult>,
    pub answered_count: usize,
    #[serde(default)]
    pub deadline_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub reviews: Vec<QuestionReview>,
    pub generated_at: DateTime<Utc>,
}

/// Summary of a quiz (without the questions).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizSummary {
    pub id: String,
    pub title: String,
    pub question_count: usize,
    pub pass_score_percent: u8,
    pub feedback_when: FeedbackWhen,
    #[serde(default)]
    pub time_limit_minutes: Option<u32>,
}

/// One question as the learner may see it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionReview {
    pub question_id: String,
    pub prompt: String,
    #[serde(default)]
    pub chosen_option: Option<String>,
    #[serde(default)]
    pub chosen_label: Option<String>,
    /// Present only when correctness is revealed.
    #[serde(default)]
    pub correct_option: Option<String>,
    #[serde(default)]
    pub correct_label: Option<String>,
    #[serde(default)]
    pub is_correct: Option<bool>,
    #[serde(default)]
    pub explanation: Option<String>,
}

impl AttemptReport {
    /// Build a report for the attempt's current state.
    pub fn build(attempt: &Attempt, now: DateTime<Utc>) -> Self {
        let quiz = attempt.quiz();
        let state = attempt.state();

        let reviews = quiz
            .questions
            .iter()
            .map(|q| {
                let chosen = state.answers.get(&q.id);
                let decision = feedback::decide(quiz.feedback_when, state.status, chosen.is_some());
                let reveal = decision.reveal_correctness;
                QuestionReview {
                    question_id: q.id.clone(),
                    prompt: q.prompt.clone(),
                    chosen_option: chosen.cloned(),
                    chosen_label: chosen
                        .and_then(|c| q.option(c))
                        .map(|o| o.label.clone()),
                    correct_option: reveal.then(|| q.correct_option_id.clone()),
                    correct_label: reveal
                        .then(|| q.option(&q.correct_option_id).map(|o| o.label.clone()))
                        .flatten(),
                    is_correct: reveal.then(|| chosen == Some(&q.correct_option_id)),
                    explanation: if decision.show_explanation {
                        q.explanation.clone()
                    } else {
                        None
                    },
                }
            })
            .collect();

        Self {
            quiz: QuizSummary {
                id: quiz.id.clone(),
                title: quiz.title.clone(),
                question_count: quiz.question_count(),
                pass_score_percent: quiz.pass_score_percent,
                feedback_when: quiz.feedback_when,
                time_limit_minutes: quiz.time_limit_minutes,
            },
            attempt_id: state.attempt_id.clone(),
            status: state.status,
            submitted_by: state.submitted_by,
            result: state.result,
            answered_count: quiz.question_count() - attempt.unanswered_count(),
            deadline_at: state.deadline_at,
            reviews,
            generated_at: now,
        }
    }

    /// Save the report as JSON to a file.
    pub fn save_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self).context("failed to serialize report")?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)
            .with_context(|| format!("failed to write report to {}", path.display()))?;
        Ok(())
    }

    /// Load a report from a JSON file.
    pub fn load_json(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read report from {}", path.display()))?;
        let report: AttemptReport =
            serde_json::from_str(&content).context("failed to parse report JSON")?;
        Ok(report)
    }

    /// Format the report as markdown.
    pub fn to_markdown(&self) -> String {
        let mut md = String::new();

        md.push_str(&format!("## {}\n\n", self.quiz.title));
        md.push_str(&format!(
            "**Attempt:** `{}` ({})\n\n",
            self.attempt_id, self.status
        ));

        match self.result {
            Some(result) => {
                md.push_str(&format!(
                    "**Score:** {}% ({}/{}) - {}\n\n",
                    result.score_percent,
                    result.correct_count,
                    result.question_count,
                    if result.passed { "PASSED" } else { "NOT PASSED" }
                ));
            }
            None => {
                md.push_str(&format!(
                    "**Answered:** {}/{}\n\n",
                    self.answered_count, self.quiz.question_count
                ));
            }
        }

        if self.reviews.iter().any(|r| r.is_correct.is_some()) {
            md.push_str("| Question | Your answer | Correct answer | |\n");
            md.push_str("|----------|-------------|----------------|-|\n");
            for r in &self.reviews {
                let mark = match r.is_correct {
                    Some(true) => "ok",
                    Some(false) => "x",
                    None => "",
                };
                md.push_str(&format!(
                    "| {} | {} | {} | {} |\n",
                    r.question_id,
                    r.chosen_label.as_deref().unwrap_or("-"),
                    r.correct_label.as_deref().unwrap_or("-"),
                    mark
                ));
            }
        }

        md
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;

    use crate::model::{Question, QuizDefinition, QuizOption};

    fn quiz(feedback_when: FeedbackWhen) -> Arc<QuizDefinition> {
        let options = vec![
            QuizOption {
                id: "a".into(),
                label: "Alpha".into(),
            },
            QuizOption {
                id: "b".into(),
                label: "Beta".into(),
            },
        ];
        Arc::new(QuizDefinition {
            id: "rep".into(),
            title: "Report Quiz".into(),
            instructions: String::new(),
            time_limit_minutes: None,
            pass_score_percent: 50,
            feedback_when,
            questions: vec![
                Question {
                    id: "q1".into(),
                    prompt: "One".into(),
                    options: options.clone(),
                    correct_option_id: "a".into(),
                    explanation: Some("Alpha is first".into()),
                },
                Question {
                    id: "q2".into(),
                    prompt: "Two".into(),
                    options,
                    correct_option_id: "b".into(),
                    explanation: None,
                },
            ],
        })
    }

    fn completed(feedback_when: FeedbackWhen) -> Attempt {
        let now = Utc::now();
        let mut attempt = Attempt::restore(quiz(feedback_when), "r1", None);
        attempt.start(now).unwrap();
        attempt.record_answer("q1", "a").unwrap();
        attempt.record_answer("q2", "a").unwrap();
        attempt.go_to(1).unwrap();
        attempt.request_submit().unwrap();
        attempt.confirm_submit(now).unwrap();
        attempt
    }

    #[test]
    fn after_submit_reveals_on_completion() {
        let report = AttemptReport::build(&completed(FeedbackWhen::AfterSubmit), Utc::now());
        assert_eq!(report.answered_count, 2);
        assert_eq!(report.result.unwrap().score_percent, 50);
        assert_eq!(report.reviews[0].is_correct, Some(true));
        assert_eq!(report.reviews[0].explanation.as_deref(), Some("Alpha is first"));
        assert_eq!(report.reviews[1].is_correct, Some(false));
        assert_eq!(report.reviews[1].correct_label.as_deref(), Some("Beta"));
        assert!(report.to_markdown().contains("| q2 | Alpha | Beta | x |"));
    }

    #[test]
    fn never_hides_correct_answers() {
        let report = AttemptReport::build(&completed(FeedbackWhen::Never), Utc::now());
        assert!(report.result.is_some());
        for r in &report.reviews {
            assert!(r.correct_option.is_none());
            assert!(r.is_correct.is_none());
            assert!(r.explanation.is_none());
            assert!(r.chosen_option.is_some());
        }
        assert!(!report.to_markdown().contains("Correct answer"));
    }

    #[test]
    fn in_progress_report_has_no_result() {
        let mut attempt = Attempt::restore(quiz(FeedbackWhen::AfterSubmit), "r2", None);
        attempt.start(Utc::now()).unwrap();
        attempt.record_answer("q2", "b").unwrap();
        let report = AttemptReport::build(&attempt, Utc::now());
        assert!(report.result.is_none());
        assert_eq!(report.answered_count, 1);
        assert!(report.reviews[1].is_correct.is_none());
        assert!(report.to_markdown().contains("**Answered:** 1/2"));
    }

    #[test]
    fn save_and_load_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("report.json");
        let report = AttemptReport::build(&completed(FeedbackWhen::Instant), Utc::now());
        report.save_json(&path).unwrap();

        let loaded = AttemptReport::load_json(&path).unwrap();
        assert_eq!(loaded.attempt_id, "r1");
        assert_eq!(loaded.status, AttemptStatus::Completed);
        assert_eq!(loaded.result, report.result);
    }
}
