//! Terminal rendering shared by the commands.

use comfy_table::{Cell, Table};

use quizclock_core::attempt::Attempt;
use quizclock_core::model::AttemptStatus;
use quizclock_core::report::AttemptReport;
use quizclock_core::timer::format_remaining;

/// Print the quiz header shown before an attempt starts.
pub fn print_intro(attempt: &Attempt) {
    let quiz = attempt.quiz();
    println!("{}", quiz.title);
    if !quiz.instructions.trim().is_empty() {
        println!("{}", quiz.instructions.trim());
    }
    let limit = match quiz.time_limit() {
        Some(limit) => format!("time limit {}", format_remaining(limit.num_seconds())),
        None => "untimed".to_string(),
    };
    println!(
        "{} questions, {limit}, pass mark {}%",
        quiz.question_count(),
        quiz.pass_score_percent
    );
}

/// Print the current question with its options.
pub fn print_question(attempt: &Attempt) {
    let Some(question) = attempt.current_question() else {
        return;
    };
    let chosen = attempt.answers().get(&question.id);

    println!(
        "\nQuestion {}/{}: {}",
        attempt.current_index() + 1,
        attempt.quiz().question_count(),
        question.prompt
    );
    for option in &question.options {
        let marker = if chosen == Some(&option.id) { "*" } else { " " };
        println!(" {marker} [{}] {}", option.id, option.label);
    }
}

/// Print a one-line progress summary.
pub fn print_status(attempt: &Attempt, remaining_secs: Option<i64>) {
    let total = attempt.quiz().question_count();
    let answered = total - attempt.unanswered_count();
    let mut line = match attempt.status() {
        AttemptStatus::Intro => format!("Not started, {answered}/{total} answered"),
        AttemptStatus::Completed => format!("Completed, {answered}/{total} answered"),
        _ => format!(
            "Question {}/{total}, {answered}/{total} answered",
            attempt.current_index() + 1
        ),
    };
    if let Some(secs) = remaining_secs {
        line.push_str(&format!(", {} left", format_remaining(secs)));
    }
    println!("{line}");
}

/// Print a report: the result and review table, or progress when unfinished.
pub fn print_report(report: &AttemptReport) {
    match report.result {
        Some(result) => {
            let reason = report
                .submitted_by
                .map(|r| format!(" ({r})"))
                .unwrap_or_default();
            println!(
                "\nScore: {}% ({}/{}) - {}{reason}",
                result.score_percent,
                result.correct_count,
                result.question_count,
                if result.passed { "PASSED" } else { "NOT PASSED" }
            );
        }
        None => {
            println!(
                "\nNot submitted: {}/{} answered",
                report.answered_count, report.quiz.question_count
            );
        }
    }

    if !report.reviews.iter().any(|r| r.is_correct.is_some()) {
        return;
    }

    let mut table = Table::new();
    table.set_header(vec!["#", "Question", "Your answer", "Correct answer", ""]);
    for (i, review) in report.reviews.iter().enumerate() {
        let mark = match review.is_correct {
            Some(true) => "ok",
            Some(false) => "x",
            None => "",
        };
        table.add_row(vec![
            Cell::new(i + 1),
            Cell::new(&review.prompt),
            Cell::new(review.chosen_label.as_deref().unwrap_or("-")),
            Cell::new(review.correct_label.as_deref().unwrap_or("-")),
            Cell::new(mark),
        ]);
    }
    println!("{table}");

    for (i, review) in report.reviews.iter().enumerate() {
        if let Some(explanation) = &review.explanation {
            println!("  {}. {explanation}", i + 1);
        }
    }
}
