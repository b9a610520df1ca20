//! The attempt state machine.
//!
//! ```text
//! intro -> in_progress -> confirming_submit -> completed
//!              |    ^            |
//!              |    +-- cancel --+
//!              +------ time expired ------------> completed
//! ```
//!
//! Every transition is a synchronous in-memory update. I/O (saving) and
//! cadence (ticks) belong to [`AttemptSession`](crate::session::AttemptSession).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Rejected;
use crate::feedback::{self, FeedbackDecision};
use crate::model::{
    Answers, AttemptKey, AttemptResult, AttemptStatus, Question, QuizDefinition, SavedAttempt,
    SubmitReason,
};
use crate::scoring;
use crate::timer::{Activation, ExpiredDeadlinePolicy, TimerController, TimerSignal};

/// Mutable state of one attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptState {
    pub attempt_id: String,
    pub answers: Answers,
    pub deadline_at: Option<DateTime<Utc>>,
    pub last_saved_at: Option<DateTime<Utc>>,
    pub status: AttemptStatus,
    /// Set exactly once, on entering `Completed`.
    pub result: Option<AttemptResult>,
    pub submitted_by: Option<SubmitReason>,
    /// Zero-based index of the question on screen.
    pub current_index: usize,
}

/// A transition detected during a tick, applied by the controller loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PendingTransition {
    AutoSubmit,
}

/// One learner's pass through a quiz.
#[derive(Debug, Clone)]
pub struct Attempt {
    quiz: Arc<QuizDefinition>,
    state: AttemptState,
    timer: TimerController,
    stored_deadline: Option<DateTime<Utc>>,
    deadline_policy: ExpiredDeadlinePolicy,
    pending: Option<PendingTransition>,
}

impl Attempt {
    /// A brand-new attempt with a random id.
    pub fn fresh(quiz: Arc<QuizDefinition>) -> Self {
        Self::restore(quiz, Uuid::new_v4().to_string(), None)
    }

    /// Rebuild an attempt from its saved record, or start fresh if there is none.
    ///
    /// A completed record comes back completed with its frozen result
    /// (view-results, not resume-for-edit). Otherwise the attempt starts in
    /// `Intro` with the saved answers; the saved deadline is adopted on
    /// [`start`](Self::start). Answers that no longer match the quiz are dropped.
    pub fn restore(
        quiz: Arc<QuizDefinition>,
        attempt_id: impl Into<String>,
        saved: Option<SavedAttempt>,
    ) -> Self {
        let attempt_id = attempt_id.into();
        let saved = saved.unwrap_or_default();

        let answers: Answers = saved
            .answers
            .into_iter()
            .filter(|(qid, oid)| {
                let known = quiz.question(qid).is_some_and(|q| q.has_option(oid));
                if !known {
                    tracing::debug!(question = %qid, option = %oid, "dropping stale saved answer");
                }
                known
            })
            .collect();

        let (status, result, submitted_by) = match saved.result {
            Some(result) => (
                AttemptStatus::Completed,
                Some(result),
                Some(saved.submitted_by.unwrap_or(SubmitReason::Manual)),
            ),
            None => (AttemptStatus::Intro, None, None),
        };

        let timer = TimerController::new(quiz.time_limit());

        Self {
            state: AttemptState {
                attempt_id,
                answers,
                deadline_at: saved.deadline_at,
                last_saved_at: saved.saved_at,
                status,
                result,
                submitted_by,
                current_index: 0,
            },
            quiz,
            timer,
            stored_deadline: saved.deadline_at,
            deadline_policy: ExpiredDeadlinePolicy::default(),
            pending: None,
        }
    }

    pub fn with_deadline_policy(mut self, policy: ExpiredDeadlinePolicy) -> Self {
        self.deadline_policy = policy;
        self
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn quiz(&self) -> &QuizDefinition {
        &self.quiz
    }

    pub fn state(&self) -> &AttemptState {
        &self.state
    }

    pub fn status(&self) -> AttemptStatus {
        self.state.status
    }

    pub fn attempt_id(&self) -> &str {
        &self.state.attempt_id
    }

    pub fn key(&self) -> AttemptKey {
        AttemptKey::new(&self.quiz.id, &self.state.attempt_id)
    }

    pub fn answers(&self) -> &Answers {
        &self.state.answers
    }

    pub fn result(&self) -> Option<AttemptResult> {
        self.state.result
    }

    pub fn is_completed(&self) -> bool {
        self.state.status == AttemptStatus::Completed
    }

    pub fn current_index(&self) -> usize {
        self.state.current_index
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.quiz.questions.get(self.state.current_index)
    }

    pub fn is_last_question(&self) -> bool {
        self.state.current_index + 1 >= self.quiz.question_count()
    }

    /// Questions in the quiz without an answer.
    pub fn unanswered_count(&self) -> usize {
        self.quiz
            .questions
            .iter()
            .filter(|q| !self.state.answers.contains_key(&q.id))
            .count()
    }

    /// Feedback for a question in the attempt's current state.
    pub fn feedback_for(&self, question_id: &str) -> Option<FeedbackDecision> {
        self.quiz.question(question_id)?;
        Some(feedback::decide(
            self.quiz.feedback_when,
            self.state.status,
            self.state.answers.contains_key(question_id),
        ))
    }

    pub fn timer(&self) -> &TimerController {
        &self.timer
    }

    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> Option<i64> {
        self.timer.remaining_seconds(now)
    }

    /// The record to persist for this attempt.
    pub fn snapshot(&self) -> SavedAttempt {
        SavedAttempt {
            answers: self.state.answers.clone(),
            deadline_at: self.state.deadline_at,
            saved_at: self.state.last_saved_at,
            result: self.state.result,
            submitted_by: self.state.submitted_by,
        }
    }

    pub fn mark_saved(&mut self, at: DateTime<Utc>) {
        self.state.last_saved_at = Some(at);
    }

    // -----------------------------------------------------------------------
    // Transitions
    // -----------------------------------------------------------------------

    /// `Intro -> InProgress`. Activates the timer for timed quizzes.
    pub fn start(&mut self, now: DateTime<Utc>) -> Result<Activation, Rejected> {
        self.require(AttemptStatus::Intro, "start")?;

        let activation = self
            .timer
            .activate(self.stored_deadline, now, self.deadline_policy);
        self.state.deadline_at = self.timer.deadline_at();
        self.state.status = AttemptStatus::InProgress;
        tracing::info!(
            attempt = %self.state.attempt_id,
            quiz = %self.quiz.id,
            ?activation,
            "attempt started"
        );
        Ok(activation)
    }

    /// Record (or overwrite) the answer to a question. Does not navigate.
    pub fn record_answer(
        &mut self,
        question_id: &str,
        option_id: &str,
    ) -> Result<FeedbackDecision, Rejected> {
        self.require(AttemptStatus::InProgress, "answer")?;

        let question = self
            .quiz
            .question(question_id)
            .ok_or_else(|| Rejected::UnknownQuestion(question_id.to_string()))?;
        if !question.has_option(option_id) {
            return Err(Rejected::UnknownOption {
                question_id: question_id.to_string(),
                option_id: option_id.to_string(),
            });
        }

        let answered = self.state.answers.contains_key(question_id);
        if feedback::decide(self.quiz.feedback_when, self.state.status, answered).answer_locked {
            return Err(Rejected::AnswerLocked(question_id.to_string()));
        }

        self.state
            .answers
            .insert(question_id.to_string(), option_id.to_string());
        tracing::debug!(question = %question_id, option = %option_id, "answer recorded");

        Ok(feedback::decide(
            self.quiz.feedback_when,
            self.state.status,
            true,
        ))
    }

    /// Answer the question currently on screen.
    pub fn answer_current(&mut self, option_id: &str) -> Result<FeedbackDecision, Rejected> {
        let question_id = self
            .current_question()
            .map(|q| q.id.clone())
            .ok_or(Rejected::OutOfRange {
                index: self.state.current_index + 1,
                count: self.quiz.question_count(),
            })?;
        self.record_answer(&question_id, option_id)
    }

    pub fn next(&mut self) -> Result<usize, Rejected> {
        self.go_to(self.state.current_index + 1)
    }

    pub fn previous(&mut self) -> Result<usize, Rejected> {
        match self.state.current_index.checked_sub(1) {
            Some(index) => self.go_to(index),
            None => Err(Rejected::OutOfRange {
                index: 0,
                count: self.quiz.question_count(),
            }),
        }
    }

    /// Jump to a zero-based question index. Any question may be revisited.
    pub fn go_to(&mut self, index: usize) -> Result<usize, Rejected> {
        self.require(AttemptStatus::InProgress, "navigate")?;
        let count = self.quiz.question_count();
        if index >= count {
            return Err(Rejected::OutOfRange {
                index: index + 1,
                count,
            });
        }
        self.state.current_index = index;
        Ok(index)
    }

    /// `InProgress -> ConfirmingSubmit`, only from the last question.
    ///
    /// Returns the number of unanswered questions for the confirmation prompt.
    pub fn request_submit(&mut self) -> Result<usize, Rejected> {
        self.require(AttemptStatus::InProgress, "submit")?;
        if !self.is_last_question() {
            return Err(Rejected::NotOnLastQuestion);
        }
        self.timer.cancel();
        self.state.status = AttemptStatus::ConfirmingSubmit;
        Ok(self.unanswered_count())
    }

    /// `ConfirmingSubmit -> InProgress`. The deadline is unchanged.
    pub fn cancel_submit(&mut self, now: DateTime<Utc>) -> Result<(), Rejected> {
        self.require(AttemptStatus::ConfirmingSubmit, "cancel submit")?;
        self.timer.activate(None, now, self.deadline_policy);
        self.state.status = AttemptStatus::InProgress;
        Ok(())
    }

    /// `ConfirmingSubmit -> Completed`.
    ///
    /// The timer is paused while the learner confirms, so a confirmation
    /// that lands on or after the deadline is recorded as a timeout.
    pub fn confirm_submit(&mut self, now: DateTime<Utc>) -> Result<AttemptResult, Rejected> {
        self.require(AttemptStatus::ConfirmingSubmit, "confirm submit")?;
        let reason = match self.state.deadline_at {
            Some(deadline) if now >= deadline => SubmitReason::TimeExpired,
            _ => SubmitReason::Manual,
        };
        Ok(self.complete(reason))
    }

    /// Check the deadline. An expiry is queued, not applied; call
    /// [`apply_pending`](Self::apply_pending) afterwards.
    pub fn tick(&mut self, now: DateTime<Utc>) -> TimerSignal {
        if self.state.status != AttemptStatus::InProgress {
            return TimerSignal::Idle;
        }
        let signal = self.timer.tick(now);
        if signal == TimerSignal::Expired {
            tracing::info!(attempt = %self.state.attempt_id, "time expired");
            self.pending = Some(PendingTransition::AutoSubmit);
        }
        signal
    }

    /// Apply a queued transition. Returns the result if it completed the attempt.
    pub fn apply_pending(&mut self) -> Option<AttemptResult> {
        match self.pending.take()? {
            PendingTransition::AutoSubmit if !self.is_completed() => {
                Some(self.complete(SubmitReason::TimeExpired))
            }
            PendingTransition::AutoSubmit => None,
        }
    }

    fn complete(&mut self, reason: SubmitReason) -> AttemptResult {
        if let Some(result) = self.state.result {
            return result;
        }
        let result = scoring::score(
            &self.quiz.questions,
            &self.state.answers,
            self.quiz.pass_score_percent,
        );
        self.timer.cancel();
        self.pending = None;
        self.state.status = AttemptStatus::Completed;
        self.state.result = Some(result);
        self.state.submitted_by = Some(reason);
        tracing::info!(
            attempt = %self.state.attempt_id,
            score = result.score_percent,
            passed = result.passed,
            %reason,
            "attempt completed"
        );
        result
    }

    fn require(&self, expected: AttemptStatus, action: &'static str) -> Result<(), Rejected> {
        if self.state.status == AttemptStatus::Completed {
            return Err(Rejected::Completed);
        }
        if self.pending.is_some() {
            return Err(Rejected::TimeUp);
        }
        if self.state.status != expected {
            return Err(Rejected::WrongState {
                action,
                status: self.state.status,
            });
        }
        Ok(())
    }
}
