//! Student mastery levels
//!
//! The level store is the canonical table of students and their per-concept
//! tiers. Bulk ingestion and the manual editor are the only two paths that
//! mutate it; both persist the whole table back to disk.

pub mod classifier;
pub mod editor;
pub mod ingest;
pub mod store;

use thiserror::Error;

pub use classifier::classify;
pub use editor::{apply_manual_update, ManualOutcome};
pub use ingest::{ingest, IngestColumns, IngestError, IngestReport, RowOutcome};
pub use store::{CsvTableFile, LevelStore, TableFile};

/// Errors raised by the level store
#[derive(Debug, Error)]
pub enum LevelError {
    /// No student row with this id
    #[error("Student with id {0} not found")]
    StudentNotFound(u32),

    /// The durable file could not be opened or read
    #[error("Failed to read level store {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The durable file was read but its contents are invalid
    #[error("Level store {path} is malformed: {reason}")]
    Malformed { path: String, reason: String },

    /// Writing the table back to disk failed
    #[error("Failed to write level store {path}: {reason}")]
    Write { path: String, reason: String },
}
