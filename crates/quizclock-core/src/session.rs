//! Attempt session driver.
//!
//! Owns one [`Attempt`] and runs its controller loop: learner commands, the
//! one-second timer tick, and the autosave interval are multiplexed on a
//! single task and handled strictly one at a time. The intervals live only
//! as long as [`AttemptSession::run`]; leaving the loop (completion, or the
//! command channel closing because the learner navigated away) stops both.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::{interval, interval_at, Instant, MissedTickBehavior};

use crate::attempt::Attempt;
use crate::autosave::{AutosaveScheduler, SaveTrigger, DEFAULT_AUTOSAVE_INTERVAL};
use crate::error::{QuizError, Rejected};
use crate::feedback::FeedbackDecision;
use crate::model::{AttemptKey, AttemptStatus, QuizDefinition};
use crate::parser::ensure_valid;
use crate::timer::{Activation, ExpiredDeadlinePolicy, TimerSignal};
use crate::traits::{AttemptStore, Clock};

/// Configuration for an attempt session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Timer tick cadence.
    pub tick_interval: Duration,
    /// Periodic save cadence while in progress.
    pub autosave_interval: Duration,
    /// What to do with a stored deadline that has already passed.
    pub expired_deadline_policy: ExpiredDeadlinePolicy,
    /// Whether the learner may move to an earlier question.
    pub allow_back_navigation: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            autosave_interval: DEFAULT_AUTOSAVE_INTERVAL,
            expired_deadline_policy: ExpiredDeadlinePolicy::default(),
            allow_back_navigation: true,
        }
    }
}

/// A learner action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Answer {
        question_id: String,
        option_id: String,
    },
    /// Answer the question on screen.
    AnswerCurrent(String),
    Next,
    Previous,
    /// Zero-based question index.
    GoTo(usize),
    RequestSubmit,
    ConfirmSubmit,
    CancelSubmit,
    /// Report the current position and remaining time. Valid in any state.
    Refresh,
}

/// Session event reporting.
pub trait SessionObserver: Send + Sync {
    fn on_started(&self, attempt: &Attempt, activation: Activation);
    fn on_navigated(&self, attempt: &Attempt);
    fn on_status(&self, attempt: &Attempt, remaining_secs: Option<i64>);
    fn on_answered(&self, attempt: &Attempt, question_id: &str, decision: FeedbackDecision);
    fn on_tick(&self, remaining_secs: i64);
    fn on_saved(&self, at: DateTime<Utc>);
    fn on_confirm_requested(&self, unanswered: usize);
    fn on_rejected(&self, rejected: &Rejected);
    fn on_completed(&self, attempt: &Attempt);
}

/// No-op observer.
pub struct NoopObserver;

impl SessionObserver for NoopObserver {
    fn on_started(&self, _: &Attempt, _: Activation) {}
    fn on_navigated(&self, _: &Attempt) {}
    fn on_status(&self, _: &Attempt, _: Option<i64>) {}
    fn on_answered(&self, _: &Attempt, _: &str, _: FeedbackDecision) {}
    fn on_tick(&self, _: i64) {}
    fn on_saved(&self, _: DateTime<Utc>) {}
    fn on_confirm_requested(&self, _: usize) {}
    fn on_rejected(&self, _: &Rejected) {}
    fn on_completed(&self, _: &Attempt) {}
}

/// One open attempt plus its store, clock, and autosave bookkeeping.
pub struct AttemptSession {
    attempt: Attempt,
    store: Arc<dyn AttemptStore>,
    clock: Arc<dyn Clock>,
    autosave: AutosaveScheduler,
    config: SessionConfig,
}

impl AttemptSession {
    /// Open a quiz, resuming `resume_attempt_id` if the store has it.
    ///
    /// The quiz is validated first; an invalid quiz is the only failure.
    /// An unreadable or unreachable saved record starts a fresh attempt
    /// under the requested id.
    pub async fn open(
        quiz: Arc<QuizDefinition>,
        resume_attempt_id: Option<String>,
        store: Arc<dyn AttemptStore>,
        clock: Arc<dyn Clock>,
        config: SessionConfig,
    ) -> Result<Self, QuizError> {
        ensure_valid(&quiz)?;

        let attempt = match resume_attempt_id {
            Some(attempt_id) => {
                let key = AttemptKey::new(&quiz.id, &attempt_id);
                let saved = match store.load(&key).await {
                    Ok(saved) => saved,
                    Err(e) if e.is_malformed() => {
                        tracing::warn!(%key, "ignoring unreadable saved attempt: {e}");
                        None
                    }
                    Err(e) => {
                        tracing::warn!(%key, "could not load saved attempt, starting fresh: {e}");
                        None
                    }
                };
                if saved.is_some() {
                    tracing::info!(%key, "resuming saved attempt");
                }
                Attempt::restore(quiz, attempt_id, saved)
            }
            None => Attempt::fresh(quiz),
        };

        Ok(Self {
            attempt: attempt.with_deadline_policy(config.expired_deadline_policy),
            store,
            clock,
            autosave: AutosaveScheduler::new(config.autosave_interval),
            config,
        })
    }

    pub fn attempt(&self) -> &Attempt {
        &self.attempt
    }

    pub fn autosave(&self) -> &AutosaveScheduler {
        &self.autosave
    }

    pub fn into_attempt(self) -> Attempt {
        self.attempt
    }

    /// Apply one learner command.
    ///
    /// The deadline is checked first, so a command that arrives after time
    /// ran out is rejected rather than applied.
    pub async fn handle(
        &mut self,
        command: Command,
        observer: &dyn SessionObserver,
    ) -> Result<(), Rejected> {
        self.poll_deadline(observer).await;
        let now = self.clock.now();

        match command {
            Command::Start => {
                let activation = self.attempt.start(now)?;
                observer.on_started(&self.attempt, activation);
                self.save(SaveTrigger::Started, observer).await;
                observer.on_navigated(&self.attempt);
            }
            Command::Answer {
                question_id,
                option_id,
            } => {
                let decision = self.attempt.record_answer(&question_id, &option_id)?;
                observer.on_answered(&self.attempt, &question_id, decision);
                self.save(SaveTrigger::AnswerChanged, observer).await;
            }
            Command::AnswerCurrent(option_id) => {
                let decision = self.attempt.answer_current(&option_id)?;
                let question_id = self
                    .attempt
                    .current_question()
                    .map(|q| q.id.clone())
                    .unwrap_or_default();
                observer.on_answered(&self.attempt, &question_id, decision);
                self.save(SaveTrigger::AnswerChanged, observer).await;
            }
            Command::Next => {
                self.attempt.next()?;
                observer.on_navigated(&self.attempt);
            }
            Command::Previous => {
                self.require_back_navigation(0)?;
                self.attempt.previous()?;
                observer.on_navigated(&self.attempt);
            }
            Command::GoTo(index) => {
                self.require_back_navigation(index)?;
                self.attempt.go_to(index)?;
                observer.on_navigated(&self.attempt);
            }
            Command::RequestSubmit => {
                let unanswered = self.attempt.request_submit()?;
                observer.on_confirm_requested(unanswered);
            }
            Command::CancelSubmit => {
                self.attempt.cancel_submit(now)?;
                observer.on_navigated(&self.attempt);
            }
            Command::ConfirmSubmit => {
                self.attempt.confirm_submit(now)?;
                self.save(SaveTrigger::Completed, observer).await;
                observer.on_completed(&self.attempt);
            }
            Command::Refresh => {
                observer.on_status(&self.attempt, self.attempt.remaining_seconds(now));
            }
        }
        Ok(())
    }

    /// Refuse moving before the current question when back navigation is off.
    fn require_back_navigation(&self, target: usize) -> Result<(), Rejected> {
        if !self.config.allow_back_navigation
            && self.attempt.status() == AttemptStatus::InProgress
            && target < self.attempt.current_index()
        {
            return Err(Rejected::BackNavigationDisabled);
        }
        Ok(())
    }

    /// One timer tick: report remaining time or auto-submit on expiry.
    pub async fn tick(&mut self, observer: &dyn SessionObserver) -> TimerSignal {
        let signal = self.poll_deadline(observer).await;
        if let TimerSignal::Running { remaining_secs } = signal {
            observer.on_tick(remaining_secs);
        }
        signal
    }

    /// Save the current snapshot now.
    pub async fn save(&mut self, trigger: SaveTrigger, observer: &dyn SessionObserver) {
        let key = self.attempt.key();
        let snapshot = self.attempt.snapshot();
        let now = self.clock.now();
        if let Some(at) = self
            .autosave
            .persist(self.store.as_ref(), &key, &snapshot, now, trigger)
            .await
        {
            self.attempt.mark_saved(at);
            observer.on_saved(at);
        }
    }

    /// Drive the attempt until it completes or `commands` closes.
    ///
    /// Returns the status the attempt was left in.
    pub async fn run(
        &mut self,
        mut commands: mpsc::Receiver<Command>,
        observer: &dyn SessionObserver,
    ) -> AttemptStatus {
        if self.attempt.is_completed() {
            observer.on_completed(&self.attempt);
            return AttemptStatus::Completed;
        }

        let mut ticks = interval(self.config.tick_interval);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let autosave_interval = self.autosave.interval();
        let mut saves = interval_at(Instant::now() + autosave_interval, autosave_interval);
        saves.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            let in_progress = self.attempt.status() == AttemptStatus::InProgress;

            tokio::select! {
                command = commands.recv() => match command {
                    Some(command) => {
                        tracing::debug!(?command, "command received");
                        if let Err(rejected) = self.handle(command, observer).await {
                            observer.on_rejected(&rejected);
                        }
                    }
                    None => {
                        tracing::debug!("command channel closed, leaving attempt");
                        break;
                    }
                },
                _ = ticks.tick(), if in_progress => {
                    self.tick(observer).await;
                }
                _ = saves.tick(), if in_progress => {
                    self.save(SaveTrigger::Interval, observer).await;
                }
            }

            if self.attempt.is_completed() {
                break;
            }
        }

        let status = self.attempt.status();
        if matches!(
            status,
            AttemptStatus::InProgress | AttemptStatus::ConfirmingSubmit
        ) {
            self.save(SaveTrigger::Left, observer).await;
        }
        status
    }

    /// Tick the attempt and apply any queued expiry.
    async fn poll_deadline(&mut self, observer: &dyn SessionObserver) -> TimerSignal {
        let signal = self.attempt.tick(self.clock.now());
        if self.attempt.apply_pending().is_some() {
            self.save(SaveTrigger::Completed, observer).await;
            observer.on_completed(&self.attempt);
        }
        signal
    }
}
