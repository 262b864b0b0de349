//! Dictum Storage crate - SQLite persistence for progress and word lists.
//!
//! Provides a WAL-mode SQLite database with migrations, a progress repository
//! implementing the core `ProgressStore` trait, and a repository for imported
//! word lists.

pub mod db;
pub mod migrations;
pub mod progress;
pub mod word_lists;

pub use db::Database;
pub use progress::ProgressRepository;
pub use word_lists::{WordListRepository, WordListSummary};
