//! # rollcall-core
//!
//! Core library for rollcall - a classroom attendance tracker with local and
//! AI-assisted analysis.
//!
//! This library provides:
//! - Domain types for rosters and attendance history
//! - A record store persisted in SQLite
//! - The local analytics engine (statistics, weekday patterns, summary)
//! - Prompt construction and an analysis orchestrator over pluggable model
//!   and sync-server collaborators
//! - Export/import formats, configuration and logging
//!
//! ## Data flow
//!
//! Record store → statistics → {day patterns, summary} → prompt → model →
//! orchestrator → caller. Everything before the model call is pure and
//! synchronous.
//!
//! ## Example
//!
//! ```rust,no_run
//! use rollcall_core::{run_local_analysis, Config, Database, RecordStore};
//!
//! let config = Config::load().expect("failed to load config");
//! let db = Database::open(&Config::database_path()).expect("failed to open database");
//! db.migrate().expect("failed to run migrations");
//!
//! let today = chrono::Local::now().date_naive();
//! let store = RecordStore::load(&db, &config.records.default_classes, today)
//!     .expect("failed to load records");
//! let result = run_local_analysis(&store.students, &store.attendance)
//!     .expect("analysis failed");
//! println!("{}", result.local_analysis.summary);
//! ```

// Re-export commonly used items at the crate root
pub use analysis::{run_local_analysis, AnalysisError, AnalysisErrorKind, AnalysisResult, Analyzer};
pub use analytics::LocalAnalysis;
pub use config::Config;
pub use db::Database;
pub use error::{Error, Result};
pub use llm::{HttpTextGenerator, TextGenerator};
pub use prompt::AnalysisKind;
pub use store::RecordStore;
pub use sync::{SyncClient, SyncPayload, SyncReceipt, SyncSink};
pub use types::*;

// Public modules
pub mod analysis;
pub mod analytics;
pub mod config;
pub mod db;
pub mod error;
pub mod export;
pub mod llm;
pub mod logging;
pub mod prompt;
pub mod store;
pub mod sync;
pub mod types;

#[cfg(test)]
mod test_support;
