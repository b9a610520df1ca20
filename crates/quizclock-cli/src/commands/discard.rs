//! The `quizclock discard` command.

use std::path::PathBuf;

use anyhow::Result;

use quizclock_core::model::AttemptKey;

use super::Workspace;

pub async fn execute(
    quiz_path: PathBuf,
    attempt_id: String,
    config_path: Option<PathBuf>,
) -> Result<()> {
    let workspace = Workspace::open(&quiz_path, config_path)?;
    let key = AttemptKey::new(&workspace.quiz.id, &attempt_id);

    // Unreadable records can still be discarded.
    if let Ok(None) = workspace.store.load(&key).await {
        anyhow::bail!(
            "no stored attempt '{attempt_id}' for quiz '{}'",
            workspace.quiz.id
        );
    }

    workspace.store.delete(&key).await?;
    tracing::info!(%key, "attempt discarded");
    println!("Discarded attempt {attempt_id}");
    Ok(())
}
