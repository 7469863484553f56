//! # pillminder-store
//!
//! Local storage for medications and dose logs, backed by SQLite.
//!
//! The crate exposes a synchronous `Database` handle that wraps a
//! `rusqlite::Connection` and provides typed CRUD helpers for every domain
//! model. Every per-user query is scoped by owner id.

pub mod database;
pub mod dose_logs;
pub mod medications;
pub mod migrations;

mod error;

pub use database::Database;
pub use error::{Result, StoreError};
pub use pillminder_shared::models::*;
