//! The `quizclock attempts` command.

use std::path::PathBuf;

use anyhow::Result;
use comfy_table::{Cell, Table};

use quizclock_core::model::AttemptKey;

use super::Workspace;

pub async fn execute(quiz_path: PathBuf, config_path: Option<PathBuf>) -> Result<()> {
    let workspace = Workspace::open(&quiz_path, config_path)?;
    let quiz = &workspace.quiz;

    let ids = workspace.store.list(&quiz.id).await?;
    if ids.is_empty() {
        println!("No stored attempts for quiz '{}'.", quiz.id);
        return Ok(());
    }

    let mut table = Table::new();
    table.set_header(vec!["Attempt", "Status", "Answered", "Score", "Saved at"]);

    for id in &ids {
        let key = AttemptKey::new(&quiz.id, id);
        match workspace.store.load(&key).await {
            Ok(Some(record)) => {
                let (status, score) = match record.result {
                    Some(result) => (
                        "completed".to_string(),
                        format!("{}%", result.score_percent),
                    ),
                    None => ("in progress".to_string(), "-".to_string()),
                };
                let saved_at = record
                    .saved_at
                    .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
                    .unwrap_or_else(|| "-".to_string());
                table.add_row(vec![
                    Cell::new(id),
                    Cell::new(status),
                    Cell::new(format!(
                        "{}/{}",
                        record.answers.len(),
                        quiz.question_count()
                    )),
                    Cell::new(score),
                    Cell::new(saved_at),
                ]);
            }
            Ok(None) => {}
            Err(e) => {
                tracing::warn!(%key, "unreadable attempt: {e}");
                table.add_row(vec![
                    Cell::new(id),
                    Cell::new("unreadable"),
                    Cell::new("-"),
                    Cell::new("-"),
                    Cell::new("-"),
                ]);
            }
        }
    }

    println!("{table}");
    Ok(())
}
