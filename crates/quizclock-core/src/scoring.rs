//! Attempt scoring.
//!
//! Percentages are computed in integer arithmetic and rounded half-up, so
//! 1 of 3 is 33 and 2 of 3 is 67 on every platform.

use crate::model::{Answers, AttemptResult, Question};

/// Score `answers` against the answer key.
///
/// Unanswered questions count as incorrect. An empty quiz scores 0.
pub fn score(questions: &[Question], answers: &Answers, pass_score_percent: u8) -> AttemptResult {
    let question_count = questions.len();
    let correct_count = questions
        .iter()
        .filter(|q| answers.get(&q.id) == Some(&q.correct_option_id))
        .count();

    let score_percent = percent_half_up(correct_count, question_count);

    AttemptResult {
        score_percent,
        passed: score_percent >= pass_score_percent,
        correct_count,
        question_count,
    }
}

/// `round(part / whole * 100)` with halves rounded up.
pub fn percent_half_up(part: usize, whole: usize) -> u8 {
    if whole == 0 {
        return 0;
    }
    let part = part.min(whole) as u64;
    let whole = whole as u64;
    // floor((200 * part + whole) / (2 * whole)) == floor(100 * part / whole + 0.5)
    ((200 * part + whole) / (2 * whole)) as u8
}
