//! Deadline tracking for timed attempts.
//!
//! The controller stores one absolute deadline per attempt and derives the
//! remaining time from the clock on every tick. Nothing is ever decremented,
//! so a suspended process or a changed host clock self-corrects on the next
//! tick.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// What to do when a resumed attempt's stored deadline has already passed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExpiredDeadlinePolicy {
    /// Compute a fresh deadline from now.
    #[default]
    Restart,
    /// Keep the stored deadline; the first tick expires the attempt.
    SubmitImmediately,
}

/// Outcome of activating the timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// The quiz has no time limit.
    Untimed,
    /// A new deadline was computed and must be persisted.
    Started(DateTime<Utc>),
    /// An existing deadline was adopted.
    Resumed(DateTime<Utc>),
}

/// Result of one timer tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerSignal {
    /// Not running (untimed, cancelled, or already expired).
    Idle,
    Running { remaining_secs: i64 },
    /// The deadline passed. Returned once per attempt.
    Expired,
}

#[derive(Debug, Clone)]
pub struct TimerController {
    limit: Option<Duration>,
    deadline_at: Option<DateTime<Utc>>,
    running: bool,
    expiry_signalled: bool,
}

impl TimerController {
    pub fn new(limit: Option<Duration>) -> Self {
        Self {
            limit,
            deadline_at: None,
            running: false,
            expiry_signalled: false,
        }
    }

    pub fn deadline_at(&self) -> Option<DateTime<Utc>> {
        self.deadline_at
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn has_expired(&self) -> bool {
        self.expiry_signalled
    }

    /// Start (or restart after a cancel) ticking.
    ///
    /// The deadline is fixed on the first activation: a stored deadline still
    /// in the future is adopted, otherwise one is computed from `now` (or,
    /// under [`ExpiredDeadlinePolicy::SubmitImmediately`], a past stored
    /// deadline is adopted as-is). Later activations reuse it.
    pub fn activate(
        &mut self,
        stored: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        policy: ExpiredDeadlinePolicy,
    ) -> Activation {
        let Some(limit) = self.limit else {
            return Activation::Untimed;
        };

        if self.expiry_signalled {
            return Activation::Resumed(self.deadline_at.unwrap_or(now));
        }
        self.running = true;

        if let Some(deadline) = self.deadline_at {
            return Activation::Resumed(deadline);
        }

        let (deadline, activation) = match stored {
            Some(deadline) if deadline > now => (deadline, Activation::Resumed(deadline)),
            Some(deadline) if policy == ExpiredDeadlinePolicy::SubmitImmediately => {
                (deadline, Activation::Resumed(deadline))
            }
            _ => (now + limit, Activation::Started(now + limit)),
        };

        self.deadline_at = Some(deadline);
        tracing::debug!(%deadline, ?activation, "timer activated");
        activation
    }

    /// Whole seconds left, rounded up so the display never reads 0 early.
    /// `None` when untimed or not yet activated.
    pub fn remaining_seconds(&self, now: DateTime<Utc>) -> Option<i64> {
        let deadline = self.deadline_at?;
        let millis = (deadline - now).num_milliseconds();
        Some(if millis <= 0 { 0 } else { (millis + 999) / 1000 })
    }

    /// Check the deadline against `now`.
    pub fn tick(&mut self, now: DateTime<Utc>) -> TimerSignal {
        if !self.running {
            return TimerSignal::Idle;
        }
        match self.remaining_seconds(now) {
            Some(remaining) if remaining > 0 => TimerSignal::Running {
                remaining_secs: remaining,
            },
            Some(_) => {
                self.running = false;
                if self.expiry_signalled {
                    TimerSignal::Idle
                } else {
                    self.expiry_signalled = true;
                    TimerSignal::Expired
                }
            }
            None => TimerSignal::Idle,
        }
    }

    /// Stop ticking. The deadline is kept.
    pub fn cancel(&mut self) {
        self.running = false;
    }
}

/// Format seconds as `mm:ss` (or `h:mm:ss` past an hour).
pub fn format_remaining(secs: i64) -> String {
    let secs = secs.max(0);
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}:{m:02}:{s:02}")
    } else {
        format!("{m:02}:{s:02}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t0() -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-05T09:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn untimed_never_runs() {
        let mut timer = TimerController::new(None);
        assert_eq!(
            timer.activate(None, t0(), ExpiredDeadlinePolicy::Restart),
            Activation::Untimed
        );
        assert!(!timer.is_running());
        assert_eq!(timer.tick(t0()), TimerSignal::Idle);
        assert_eq!(timer.remaining_seconds(t0()), None);
    }

    #[test]
    fn fresh_deadline_from_now() {
        let mut timer = TimerController::new(Some(Duration::minutes(1)));
        let activation = timer.activate(None, t0(), ExpiredDeadlinePolicy::Restart);
        assert_eq!(activation, Activation::Started(t0() + Duration::seconds(60)));
        assert_eq!(timer.remaining_seconds(t0()), Some(60));
        assert_eq!(
            timer.remaining_seconds(t0() + Duration::milliseconds(59_001)),
            Some(1)
        );
    }

    #[test]
    fn future_stored_deadline_is_adopted() {
        let stored = t0() + Duration::seconds(45);
        let mut timer = TimerController::new(Some(Duration::minutes(10)));
        assert_eq!(
            timer.activate(Some(stored), t0(), ExpiredDeadlinePolicy::Restart),
            Activation::Resumed(stored)
        );
        assert_eq!(timer.deadline_at(), Some(stored));
    }

    #[test]
    fn past_stored_deadline_follows_policy() {
        let stored = t0() - Duration::seconds(5);

        let mut timer = TimerController::new(Some(Duration::minutes(1)));
        assert_eq!(
            timer.activate(Some(stored), t0(), ExpiredDeadlinePolicy::Restart),
            Activation::Started(t0() + Duration::minutes(1))
        );

        let mut timer = TimerController::new(Some(Duration::minutes(1)));
        assert_eq!(
            timer.activate(Some(stored), t0(), ExpiredDeadlinePolicy::SubmitImmediately),
            Activation::Resumed(stored)
        );
        assert_eq!(timer.tick(t0()), TimerSignal::Expired);
    }

    #[test]
    fn reactivation_keeps_deadline() {
        let mut timer = TimerController::new(Some(Duration::minutes(1)));
        timer.activate(None, t0(), ExpiredDeadlinePolicy::Restart);
        timer.cancel();
        assert_eq!(timer.tick(t0()), TimerSignal::Idle);

        let later = t0() + Duration::seconds(30);
        assert_eq!(
            timer.activate(None, later, ExpiredDeadlinePolicy::Restart),
            Activation::Resumed(t0() + Duration::minutes(1))
        );
        assert_eq!(
            timer.tick(later),
            TimerSignal::Running { remaining_secs: 30 }
        );
    }

    #[test]
    fn expiry_is_signalled_once() {
        let mut timer = TimerController::new(Some(Duration::minutes(1)));
        timer.activate(None, t0(), ExpiredDeadlinePolicy::Restart);

        let after = t0() + Duration::seconds(61);
        let expiries = (0..10)
            .map(|i| timer.tick(after + Duration::seconds(i)))
            .filter(|s| *s == TimerSignal::Expired)
            .count();
        assert_eq!(expiries, 1);
        assert!(timer.has_expired());
        assert!(!timer.is_running());

        timer.activate(None, after, ExpiredDeadlinePolicy::Restart);
        assert_eq!(timer.tick(after), TimerSignal::Idle);
    }

    #[test]
    fn clock_jump_is_absorbed() {
        let mut timer = TimerController::new(Some(Duration::minutes(5)));
        timer.activate(None, t0(), ExpiredDeadlinePolicy::Restart);
        // Host slept for ten minutes between ticks.
        assert_eq!(timer.tick(t0() + Duration::minutes(10)), TimerSignal::Expired);
    }

    #[test]
    fn remaining_formatting() {
        assert_eq!(format_remaining(0), "00:00");
        assert_eq!(format_remaining(75), "01:15");
        assert_eq!(format_remaining(3725), "1:02:05");
        assert_eq!(format_remaining(-3), "00:00");
    }
}
