//! Store configuration and factory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use quizclock_core::session::SessionConfig;
use quizclock_core::timer::ExpiredDeadlinePolicy;
use quizclock_core::traits::AttemptStore;

use crate::file::FileStore;
use crate::memory::MemoryStore;

/// Where attempt records are kept.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StoreConfig {
    File {
        #[serde(default = "default_store_dir")]
        dir: PathBuf,
    },
    Memory,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig::File {
            dir: default_store_dir(),
        }
    }
}

fn default_store_dir() -> PathBuf {
    PathBuf::from("./.quizclock/attempts")
}

/// Top-level quizclock configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuizclockConfig {
    #[serde(default)]
    pub store: StoreConfig,
    /// Seconds between periodic saves of an in-progress attempt.
    #[serde(default = "default_autosave_interval")]
    pub autosave_interval_secs: u64,
    /// Milliseconds between timer ticks.
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
    /// What to do when a resumed attempt's deadline has already passed.
    #[serde(default)]
    pub expired_deadline_policy: ExpiredDeadlinePolicy,
    /// Whether the learner may move to an earlier question.
    #[serde(default = "default_true")]
    pub allow_back_navigation: bool,
    /// Output directory for attempt reports.
    #[serde(default = "default_results_dir")]
    pub results_dir: PathBuf,
}

fn default_autosave_interval() -> u64 {
    12
}
fn default_tick_interval() -> u64 {
    1000
}
fn default_true() -> bool {
    true
}
fn default_results_dir() -> PathBuf {
    PathBuf::from("./quizclock-results")
}

impl Default for QuizclockConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            autosave_interval_secs: default_autosave_interval(),
            tick_interval_ms: default_tick_interval(),
            expired_deadline_policy: ExpiredDeadlinePolicy::default(),
            allow_back_navigation: true,
            results_dir: default_results_dir(),
        }
    }
}

impl QuizclockConfig {
    /// Session timings derived from this configuration.
    ///
    /// Zero intervals are raised to the smallest usable value.
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            tick_interval: Duration::from_millis(self.tick_interval_ms.max(1)),
            autosave_interval: Duration::from_secs(self.autosave_interval_secs.max(1)),
            expired_deadline_policy: self.expired_deadline_policy,
            allow_back_navigation: self.allow_back_navigation,
        }
    }
}

/// Resolve environment variable references like `${VAR_NAME}` in a string.
fn resolve_env_vars(s: &str) -> String {
    let mut result = s.to_string();
    while let Some(start) = result.find("${") {
        if let Some(end) = result[start..].find('}') {
            let var_name = &result[start + 2..start + end];
            let value = std::env::var(var_name).unwrap_or_default();
            result = format!(
                "{}{}{}",
                &result[..start],
                value,
                &result[start + end + 1..]
            );
        } else {
            break;
        }
    }
    result
}

fn resolve_path(path: &Path) -> PathBuf {
    PathBuf::from(resolve_env_vars(&path.to_string_lossy()))
}

/// Load configuration from well-known paths.
///
/// Search order:
/// 1. `quizclock.toml` in the current directory
/// 2. `~/.config/quizclock/config.toml`
///
/// Environment variable override: `QUIZCLOCK_STORE_DIR`.
pub fn load_config() -> Result<QuizclockConfig> {
    load_config_from(None)
}

/// Load config from an explicit path, or search the default locations.
pub fn load_config_from(path: Option<&Path>) -> Result<QuizclockConfig> {
    let config_path = if let Some(p) = path {
        if p.exists() {
            Some(p.to_path_buf())
        } else {
            anyhow::bail!("config file not found: {}", p.display());
        }
    } else {
        let local = PathBuf::from("quizclock.toml");
        if local.exists() {
            Some(local)
        } else if let Some(home) = dirs_path() {
            let global = home.join("config.toml");
            global.exists().then_some(global)
        } else {
            None
        }
    };

    let config = match config_path {
        Some(path) => {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("failed to read config: {}", path.display()))?;
            let config = parse_config(&content)
                .with_context(|| format!("failed to parse config: {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded config");
            config
        }
        None => QuizclockConfig::default(),
    };

    Ok(finish(config, std::env::var("QUIZCLOCK_STORE_DIR").ok()))
}

fn parse_config(content: &str) -> Result<QuizclockConfig> {
    Ok(toml::from_str::<QuizclockConfig>(content)?)
}

/// Apply the store directory override and expand `${VAR}` references.
fn finish(mut config: QuizclockConfig, store_dir: Option<String>) -> QuizclockConfig {
    if let Some(dir) = store_dir.filter(|d| !d.is_empty()) {
        config.store = StoreConfig::File {
            dir: PathBuf::from(dir),
        };
    }

    if let StoreConfig::File { dir } = &config.store {
        config.store = StoreConfig::File {
            dir: resolve_path(dir),
        };
    }
    config.results_dir = resolve_path(&config.results_dir);
    config
}

fn dirs_path() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|h| PathBuf::from(h).join(".config").join("quizclock"))
}

/// Create a store instance from its configuration.
pub fn create_store(config: &StoreConfig) -> Result<Arc<dyn AttemptStore>> {
    match config {
        StoreConfig::File { dir } => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create store dir: {}", dir.display()))?;
            Ok(Arc::new(FileStore::new(dir)))
        }
        StoreConfig::Memory => Ok(Arc::new(MemoryStore::new())),
    }
}
