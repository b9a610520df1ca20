//! quizclock-store — Attempt store implementations.
//!
//! Implements the `AttemptStore` trait for an in-process map and for a
//! directory of JSON files, and loads the quizclock configuration that
//! selects between them.

pub mod config;
pub mod file;
pub mod memory;

pub use config::{create_store, load_config, QuizclockConfig, StoreConfig};
pub use file::FileStore;
pub use memory::MemoryStore;
