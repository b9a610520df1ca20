//! TOML quiz definition parser.
//!
//! Loads quizzes from TOML files and directories, and validates them.

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::error::QuizError;
use crate::model::{FeedbackWhen, Question, QuizDefinition, QuizOption};

/// Intermediate TOML structure for parsing quiz files.
#[derive(Debug, Deserialize)]
struct TomlQuizFile {
    quiz: TomlQuizHeader,
    #[serde(default)]
    questions: Vec<TomlQuestion>,
}

#[derive(Debug, Deserialize)]
struct TomlQuizHeader {
    id: String,
    title: String,
    #[serde(default)]
    instructions: String,
    #[serde(default)]
    time_limit_minutes: Option<u32>,
    #[serde(default = "default_pass_score")]
    pass_score_percent: u8,
    #[serde(default = "default_feedback_str")]
    feedback: String,
}

fn default_pass_score() -> u8 {
    70
}

fn default_feedback_str() -> String {
    "after_submit".to_string()
}

#[derive(Debug, Deserialize)]
struct TomlQuestion {
    id: String,
    prompt: String,
    correct: String,
    #[serde(default)]
    explanation: Option<String>,
    #[serde(default)]
    options: Vec<TomlOption>,
}

#[derive(Debug, Deserialize)]
struct TomlOption {
    id: String,
    label: String,
}

/// Parse a single TOML file into a `QuizDefinition` (no validation).
pub fn parse_quiz(path: &Path) -> Result<QuizDefinition> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read quiz file: {}", path.display()))?;

    parse_quiz_str(&content, path)
}

/// Parse a TOML string into a `QuizDefinition` (useful for testing).
pub fn parse_quiz_str(content: &str, source_path: &Path) -> Result<QuizDefinition> {
    let parsed: TomlQuizFile = toml::from_str(content)
        .with_context(|| format!("failed to parse TOML: {}", source_path.display()))?;

    let feedback_when: FeedbackWhen = parsed
        .quiz
        .feedback
        .parse()
        .map_err(|e: String| anyhow::anyhow!("{}: {}", source_path.display(), e))?;

    let questions = parsed
        .questions
        .into_iter()
        .map(|q| Question {
            id: q.id,
            prompt: q.prompt,
            options: q
                .options
                .into_iter()
                .map(|o| QuizOption {
                    id: o.id,
                    label: o.label,
                })
                .collect(),
            correct_option_id: q.correct,
            explanation: q.explanation.filter(|e| !e.trim().is_empty()),
        })
        .collect();

    Ok(QuizDefinition {
        id: parsed.quiz.id,
        title: parsed.quiz.title,
        instructions: parsed.quiz.instructions,
        time_limit_minutes: parsed.quiz.time_limit_minutes,
        pass_score_percent: parsed.quiz.pass_score_percent,
        feedback_when,
        questions,
    })
}

/// Parse and validate a quiz file. Error-level issues are fatal.
pub fn load_quiz(path: &Path) -> Result<QuizDefinition> {
    let quiz = parse_quiz(path)?;
    ensure_valid(&quiz).with_context(|| format!("in {}", path.display()))?;
    Ok(quiz)
}

/// Recursively load all `.toml` quiz files from a directory.
///
/// Files that fail to parse are skipped with a warning; validation is left
/// to the caller.
pub fn load_quiz_directory(dir: &Path) -> Result<Vec<QuizDefinition>> {
    let mut quizzes = Vec::new();

    if !dir.is_dir() {
        anyhow::bail!("not a directory: {}", dir.display());
    }

    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.sort_by_key(|e| e.path());

    for entry in entries {
        let path = entry.path();

        if path.is_dir() {
            quizzes.extend(load_quiz_directory(&path)?);
        } else if path.extension().is_some_and(|ext| ext == "toml") {
            match parse_quiz(&path) {
                Ok(quiz) => quizzes.push(quiz),
                Err(e) => {
                    tracing::warn!("skipping {}: {:#}", path.display(), e);
                }
            }
        }
    }

    Ok(quizzes)
}

/// How serious a validation issue is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// The quiz cannot be taken or scored correctly.
    Error,
    /// Suspicious but usable.
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => write!(f, "ERROR"),
            Severity::Warning => write!(f, "WARNING"),
        }
    }
}

/// A problem found while validating a quiz.
#[derive(Debug, Clone)]
pub struct ValidationIssue {
    pub severity: Severity,
    /// The question id (if applicable).
    pub question_id: Option<String>,
    pub message: String,
}

impl ValidationIssue {
    fn error(question_id: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            question_id: question_id.map(str::to_string),
            message: message.into(),
        }
    }

    fn warning(question_id: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            question_id: question_id.map(str::to_string),
            message: message.into(),
        }
    }
}

/// Validate a quiz for authoring defects.
pub fn validate_quiz(quiz: &QuizDefinition) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();

    if quiz.title.trim().is_empty() {
        issues.push(ValidationIssue::warning(None, "title is empty"));
    }
    if quiz.pass_score_percent > 100 {
        issues.push(ValidationIssue::error(
            None,
            format!(
                "pass_score_percent must be at most 100, got {}",
                quiz.pass_score_percent
            ),
        ));
    }
    if quiz.questions.is_empty() {
        issues.push(ValidationIssue::warning(None, "quiz has no questions"));
    }

    let mut seen_questions = HashSet::new();
    for q in &quiz.questions {
        let qid = Some(q.id.as_str());

        if !seen_questions.insert(q.id.as_str()) {
            issues.push(ValidationIssue::error(
                qid,
                format!("duplicate question ID: {}", q.id),
            ));
        }
        if q.prompt.trim().is_empty() {
            issues.push(ValidationIssue::warning(qid, "prompt is empty"));
        }

        match q.options.len() {
            0 => issues.push(ValidationIssue::error(qid, "question has no options")),
            1 => issues.push(ValidationIssue::warning(qid, "question has a single option")),
            _ => {}
        }

        let mut seen_options = HashSet::new();
        for o in &q.options {
            if !seen_options.insert(o.id.as_str()) {
                issues.push(ValidationIssue::error(
                    qid,
                    format!("duplicate option ID: {}", o.id),
                ));
            }
        }

        if !q.options.is_empty() && !q.has_option(&q.correct_option_id) {
            issues.push(ValidationIssue::error(
                qid,
                format!(
                    "correct option '{}' is not among the options",
                    q.correct_option_id
                ),
            ));
        }
    }

    issues
}

/// Fail with `QuizError::InvalidDefinition` if validation finds any error.
pub fn ensure_valid(quiz: &QuizDefinition) -> Result<(), QuizError> {
    let problems: Vec<String> = validate_quiz(quiz)
        .into_iter()
        .filter(|i| i.severity == Severity::Error)
        .map(|i| match i.question_id {
            Some(qid) => format!("[{qid}] {}", i.message),
            None => i.message,
        })
        .collect();

    if problems.is_empty() {
        Ok(())
    } else {
        Err(QuizError::InvalidDefinition {
            quiz_id: quiz.id.clone(),
            problems,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    const VALID_TOML: &str = r#"
[quiz]
id = "safety-101"
title = "Workplace Safety"
instructions = "Answer every question."
time_limit_minutes = 10
pass_score_percent = 60
feedback = "instant"

[[questions]]
id = "q1"
prompt = "What colour is a fire extinguisher for electrical fires?"
correct = "b"
explanation = "CO2 extinguishers carry a black band."
options = [
    { id = "a", label = "Red band" },
    { id = "b", label = "Black band" },
]

[[questions]]
id = "q2"
prompt = "Where is the assembly point?"
correct = "a"
options = [
    { id = "a", label = "Car park" },
    { id = "b", label = "Roof" },
]
"#;

    #[test]
    fn parse_valid_toml() {
        let quiz = parse_quiz_str(VALID_TOML, &PathBuf::from("test.toml")).unwrap();
        assert_eq!(quiz.id, "safety-101");
        assert_eq!(quiz.time_limit_minutes, Some(10));
        assert_eq!(quiz.feedback_when, FeedbackWhen::Instant);
        assert_eq!(quiz.questions.len(), 2);
        assert_eq!(quiz.questions[0].correct_option_id, "b");
        assert_eq!(quiz.questions[0].options[1].label, "Black band");
        assert!(quiz.questions[1].explanation.is_none());
        assert!(validate_quiz(&quiz).is_empty());
    }

    #[test]
    fn parse_missing_optional_fields() {
        let toml = r#"
[quiz]
id = "minimal"
title = "Minimal"

[[questions]]
id = "q1"
prompt = "Pick one"
correct = "a"
options = [{ id = "a", label = "A" }, { id = "b", label = "B" }]
"#;
        let quiz = parse_quiz_str(toml, &PathBuf::from("test.toml")).unwrap();
        assert_eq!(quiz.pass_score_percent, 70);
        assert_eq!(quiz.feedback_when, FeedbackWhen::AfterSubmit);
        assert!(!quiz.is_timed());
    }

    #[test]
    fn correct_option_must_exist() {
        let toml = r#"
[quiz]
id = "broken"
title = "Broken"

[[questions]]
id = "q1"
prompt = "Pick one"
correct = "z"
options = [{ id = "a", label = "A" }, { id = "b", label = "B" }]
"#;
        let quiz = parse_quiz_str(toml, &PathBuf::from("test.toml")).unwrap();
        let issues = validate_quiz(&quiz);
        assert!(issues
            .iter()
            .any(|i| i.severity == Severity::Error && i.message.contains("'z'")));

        let err = ensure_valid(&quiz).unwrap_err();
        assert!(err.to_string().contains("[q1]"));
    }

    #[test]
    fn duplicate_ids_are_errors() {
        let toml = r#"
[quiz]
id = "dupes"
title = "Dupes"

[[questions]]
id = "same"
prompt = "First"
correct = "a"
options = [{ id = "a", label = "A" }, { id = "a", label = "Also A" }]

[[questions]]
id = "same"
prompt = "Second"
correct = "a"
options = [{ id = "a", label = "A" }, { id = "b", label = "B" }]
"#;
        let quiz = parse_quiz_str(toml, &PathBuf::from("test.toml")).unwrap();
        let issues = validate_quiz(&quiz);
        assert!(issues.iter().any(|i| i.message.contains("duplicate question")));
        assert!(issues.iter().any(|i| i.message.contains("duplicate option")));
    }

    #[test]
    fn warnings_do_not_fail_validation() {
        let toml = r#"
[quiz]
id = "empty"
title = ""
"#;
        let quiz = parse_quiz_str(toml, &PathBuf::from("test.toml")).unwrap();
        let issues = validate_quiz(&quiz);
        assert_eq!(issues.len(), 2);
        assert!(issues.iter().all(|i| i.severity == Severity::Warning));
        assert!(ensure_valid(&quiz).is_ok());
    }

    #[test]
    fn unknown_feedback_mode_fails() {
        let toml = r#"
[quiz]
id = "x"
title = "X"
feedback = "sometimes"
"#;
        assert!(parse_quiz_str(toml, &PathBuf::from("x.toml")).is_err());
    }

    #[test]
    fn parse_malformed_toml() {
        let bad = "this is not [valid toml }{";
        let result = parse_quiz_str(bad, &PathBuf::from("bad.toml"));
        assert!(result.is_err());
    }

    #[test]
    fn load_directory_skips_unparsable() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("good.toml"), VALID_TOML).unwrap();
        std::fs::write(dir.path().join("bad.toml"), "not toml {").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let quizzes = load_quiz_directory(dir.path()).unwrap();
        assert_eq!(quizzes.len(), 1);
        assert_eq!(quizzes[0].id, "safety-101");
    }

    #[test]
    fn load_quiz_rejects_invalid_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quiz.toml");
        std::fs::write(&path, VALID_TOML.replace(r#"correct = "a""#, r#"correct = "c""#))
            .unwrap();
        let err = load_quiz(&path).unwrap_err();
        assert!(format!("{err:#}").contains("invalid quiz definition"));
    }
}
