//! # pillminder-shared
//!
//! Domain types and the pure adherence logic shared by every pillminder
//! crate: time-of-day parsing, dose timing classification, adherence
//! summaries, patient name resolution, and cross-user consolidation.
//!
//! Nothing here performs I/O.

pub mod adherence;
pub mod consolidate;
pub mod constants;
pub mod error;
pub mod models;
pub mod names;
pub mod timing;
pub mod types;

pub use adherence::summarize;
pub use consolidate::{consolidate, Consolidation};
pub use error::ValidationError;
pub use models::*;
pub use timing::{classify, classify_with, DoseTiming, TimingPolicy};
pub use types::{DoseLogId, DoseStatus, MedicationId, TimeOfDay, UserId};
