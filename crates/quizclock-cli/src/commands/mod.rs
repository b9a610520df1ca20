pub mod attempts;
pub mod discard;
pub mod init;
pub mod results;
pub mod take;
pub mod validate;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;

use quizclock_core::model::QuizDefinition;
use quizclock_core::parser;
use quizclock_core::traits::AttemptStore;
use quizclock_store::config::{create_store, load_config_from, QuizclockConfig};

/// Everything a command needs to work with one quiz's attempts.
pub struct Workspace {
    pub config: QuizclockConfig,
    pub quiz: Arc<QuizDefinition>,
    pub store: Arc<dyn AttemptStore>,
}

impl Workspace {
    pub fn open(quiz_path: &Path, config_path: Option<PathBuf>) -> Result<Self> {
        let config = load_config_from(config_path.as_deref())?;
        let quiz = Arc::new(parser::load_quiz(quiz_path)?);
        let store = create_store(&config.store)?;
        tracing::debug!(quiz = %quiz.id, store = store.name(), "workspace opened");
        Ok(Self {
            config,
            quiz,
            store,
        })
    }
}
