//! The `quizclock results` command.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::Utc;

use quizclock_core::attempt::Attempt;
use quizclock_core::model::AttemptKey;
use quizclock_core::report::AttemptReport;

use super::Workspace;
use crate::display;

pub async fn execute(
    quiz_path: PathBuf,
    attempt_id: String,
    format: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let workspace = Workspace::open(&quiz_path, config_path)?;
    let key = AttemptKey::new(&workspace.quiz.id, &attempt_id);

    let saved = workspace
        .store
        .load(&key)
        .await
        .with_context(|| format!("failed to load attempt {key}"))?
        .with_context(|| {
            format!(
                "no stored attempt '{attempt_id}' for quiz '{}'",
                workspace.quiz.id
            )
        })?;

    let attempt = Attempt::restore(workspace.quiz.clone(), attempt_id, Some(saved));
    let report = AttemptReport::build(&attempt, Utc::now());

    match format.as_str() {
        "markdown" | "md" => {
            println!("{}", report.to_markdown());
        }
        "json" => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        "text" => {
            println!("{}", report.quiz.title);
            println!("Attempt: {}", report.attempt_id);
            if let Some(deadline) = report.deadline_at.filter(|_| report.result.is_none()) {
                println!("Deadline: {}", deadline.format("%Y-%m-%d %H:%M:%S UTC"));
            }
            display::print_report(&report);
        }
        other => bail!("unknown format '{other}' (expected text, markdown or json)"),
    }

    Ok(())
}
