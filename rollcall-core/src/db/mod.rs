//! Database layer for rollcall
//!
//! Local persistence is a SQLite-backed key-value store of JSON blobs with
//! schema migrations. The record store and sync bookkeeping live under
//! fixed keys.

pub mod repo;
pub mod schema;

pub use repo::{Database, LAST_SYNC_KEY, RECORDS_KEY};
