//! The `quizclock take` command.

use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use quizclock_core::attempt::Attempt;
use quizclock_core::error::Rejected;
use quizclock_core::feedback::FeedbackDecision;
use quizclock_core::model::AttemptStatus;
use quizclock_core::report::AttemptReport;
use quizclock_core::session::{AttemptSession, Command, SessionObserver};
use quizclock_core::timer::{format_remaining, Activation};
use quizclock_core::traits::SystemClock;

use super::Workspace;
use crate::display;

const HELP: &str = "\
Commands:
  start            begin (or resume) the attempt
  answer <opt>     answer the current question (or just type the option id)
  next, prev       move between questions
  goto <n>         jump to question n
  submit           submit (from the last question)
  yes, no          confirm or cancel a submit
  time, status     show progress and time left
  quit             leave; progress is saved";

/// One line of learner input.
#[derive(Debug, PartialEq)]
enum Input {
    Command(Command),
    Help,
    Quit,
    Empty,
    Unknown(String),
}

fn parse_input(line: &str) -> Input {
    let mut words = line.split_whitespace();
    let Some(first) = words.next() else {
        return Input::Empty;
    };
    let rest: Vec<&str> = words.collect();

    match (first.to_ascii_lowercase().as_str(), rest.as_slice()) {
        ("start", []) => Input::Command(Command::Start),
        ("answer", [option]) => Input::Command(Command::AnswerCurrent(option.to_string())),
        ("next", []) => Input::Command(Command::Next),
        ("prev", []) | ("previous", []) | ("back", []) => Input::Command(Command::Previous),
        ("goto", [n]) => match n.parse::<usize>() {
            Ok(n) if n >= 1 => Input::Command(Command::GoTo(n - 1)),
            _ => Input::Unknown(line.trim().to_string()),
        },
        ("submit", []) => Input::Command(Command::RequestSubmit),
        ("yes", []) => Input::Command(Command::ConfirmSubmit),
        ("no", []) => Input::Command(Command::CancelSubmit),
        ("time", []) | ("status", []) => Input::Command(Command::Refresh),
        ("help", []) | ("?", []) => Input::Help,
        ("quit", []) | ("exit", []) => Input::Quit,
        ("answer", []) | ("goto", []) => Input::Unknown(line.trim().to_string()),
        (_, []) => Input::Command(Command::AnswerCurrent(first.to_string())),
        _ => Input::Unknown(line.trim().to_string()),
    }
}

/// Read stdin on a plain thread and forward commands to the session.
///
/// Ends on `quit`, end of input, or when the session stops listening.
/// Dropping the sender is what tells the session the learner left.
fn spawn_reader(tx: mpsc::Sender<Command>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            match parse_input(&line) {
                Input::Command(command) => {
                    if tx.blocking_send(command).is_err() {
                        break;
                    }
                }
                Input::Help => println!("{HELP}"),
                Input::Quit => break,
                Input::Empty => {}
                Input::Unknown(text) => {
                    println!("Unknown command: {text} (type `help`)");
                }
            }
        }
    });
}

/// Console session observer.
struct ConsoleObserver;

impl SessionObserver for ConsoleObserver {
    fn on_started(&self, attempt: &Attempt, activation: Activation) {
        match activation {
            Activation::Untimed => println!("Started."),
            Activation::Started(deadline) | Activation::Resumed(deadline) => {
                let remaining = (deadline - Utc::now()).num_seconds().max(0);
                let verb = if matches!(activation, Activation::Started(_)) {
                    "Started"
                } else {
                    "Resumed"
                };
                println!("{verb}. {} left.", format_remaining(remaining));
            }
        }
        let answered = attempt.quiz().question_count() - attempt.unanswered_count();
        if answered > 0 {
            println!("{answered} question(s) already answered.");
        }
    }

    fn on_navigated(&self, attempt: &Attempt) {
        if attempt.status() == AttemptStatus::InProgress {
            display::print_question(attempt);
        }
    }

    fn on_status(&self, attempt: &Attempt, remaining_secs: Option<i64>) {
        display::print_status(attempt, remaining_secs);
    }

    fn on_answered(&self, attempt: &Attempt, question_id: &str, decision: FeedbackDecision) {
        let Some(question) = attempt.quiz().question(question_id) else {
            return;
        };
        let chosen = attempt
            .answers()
            .get(question_id)
            .and_then(|id| question.option(id))
            .map(|o| o.label.as_str())
            .unwrap_or("-");
        println!("Answer recorded: {chosen}");

        if decision.reveal_correctness {
            if attempt.answers().get(question_id) == Some(&question.correct_option_id) {
                println!("Correct.");
            } else {
                let correct = question
                    .option(&question.correct_option_id)
                    .map(|o| o.label.as_str())
                    .unwrap_or("-");
                println!("Incorrect. The answer is: {correct}");
            }
        }
        if decision.show_explanation {
            if let Some(explanation) = &question.explanation {
                println!("{explanation}");
            }
        }
    }

    fn on_tick(&self, remaining_secs: i64) {
        if remaining_secs > 0 && (remaining_secs % 60 == 0 || remaining_secs <= 10) {
            println!("[{} left]", format_remaining(remaining_secs));
        }
    }

    fn on_saved(&self, at: DateTime<Utc>) {
        tracing::debug!(%at, "progress saved");
    }

    fn on_confirm_requested(&self, unanswered: usize) {
        if unanswered > 0 {
            println!("{unanswered} question(s) unanswered.");
        }
        println!("Submit your answers? (yes/no)");
    }

    fn on_rejected(&self, rejected: &Rejected) {
        println!("Not allowed: {rejected}");
    }

    fn on_completed(&self, attempt: &Attempt) {
        let report = AttemptReport::build(attempt, Utc::now());
        display::print_report(&report);
    }
}

pub async fn execute(
    quiz_path: PathBuf,
    attempt_id: Option<String>,
    report_path: Option<PathBuf>,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let workspace = Workspace::open(&quiz_path, config_path)?;
    let session_config = workspace.config.session_config();

    let mut session = AttemptSession::open(
        workspace.quiz.clone(),
        attempt_id,
        workspace.store.clone(),
        Arc::new(SystemClock),
        session_config,
    )
    .await?;

    let attempt_id = session.attempt().attempt_id().to_string();
    display::print_intro(session.attempt());
    println!("Attempt: {attempt_id}");
    if !session.attempt().is_completed() {
        println!("Type `start` to begin, `help` for commands.");
    }

    let (tx, rx) = mpsc::channel(16);
    spawn_reader(tx);

    let status = session.run(rx, &ConsoleObserver).await;
    tracing::info!(
        attempt = %attempt_id,
        %status,
        saves = session.autosave().saves(),
        failed_saves = session.autosave().failures(),
        "session ended"
    );

    let resume = format!(
        "quizclock take --quiz {} --attempt {attempt_id}",
        quiz_path.display()
    );
    match status {
        AttemptStatus::InProgress | AttemptStatus::ConfirmingSubmit => {
            println!("\nProgress saved. Resume with: {resume}");
        }
        // Reopened but not restarted: the earlier record is still there.
        AttemptStatus::Intro if session.attempt().state().last_saved_at.is_some() => {
            println!("\nResume with: {resume}");
        }
        AttemptStatus::Intro => println!("\nAttempt not started; nothing was saved."),
        AttemptStatus::Completed => {}
    }

    // Completed attempts always leave a report behind.
    let report_path = report_path.or_else(|| {
        (status == AttemptStatus::Completed).then(|| {
            workspace
                .config
                .results_dir
                .join(format!("{}-{attempt_id}.json", workspace.quiz.id))
        })
    });
    if let Some(path) = report_path {
        let report = AttemptReport::build(session.attempt(), Utc::now());
        report.save_json(&path)?;
        eprintln!("Report saved to: {}", path.display());
    }

    Ok(())
}
