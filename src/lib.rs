//! Flipped Tutor - mastery dashboard library
//!
//! Tracks per-student mastery across the five Flipped-Classroom concepts:
//! - CSV-backed level store with atomic whole-file rewrites
//! - Bulk level updates from exam-result uploads
//! - Manual single-concept edits
//! - Cached, LLM-generated explanations per concept and tier
//!
//! # Example
//!
//! ```ignore
//! use flipped_tutor::{Config, Dashboard};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let dashboard = Dashboard::from_config(&Config::load(None)?)?;
//!     if let Some(student) = dashboard.student(7).await {
//!         println!("{}: {:?}", student.name, student.levels);
//!     }
//!     Ok(())
//! }
//! ```

pub mod types;
pub mod config;
pub mod levels;
pub mod content;
pub mod dashboard;
pub mod security;
pub mod server;
pub mod cli;

pub use config::Config;
pub use content::{Content, ContentProvider, LlmClient, TextGenerator};
pub use dashboard::{ConceptContent, Dashboard, StudentView};
pub use levels::{
    apply_manual_update, classify, ingest, IngestColumns, IngestError, IngestReport, LevelError,
    LevelStore, ManualOutcome, RowOutcome,
};
pub use types::{ChartPoint, Concept, MasteryTier, StudentRecord};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
