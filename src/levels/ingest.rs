//! Bulk ingestion of exam results
//!
//! An uploaded CSV carries one overall score per student. Each score is
//! classified and the resulting tier overwrites every concept of that
//! student. Row-level problems become warnings in the report; only a file
//! that cannot be parsed as a table aborts the batch, and in that case the
//! store is left untouched.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use super::{classify, LevelError, LevelStore};
use crate::types::MasteryTier;

/// Number of trailing upload rows kept for preview
const PREVIEW_ROWS: usize = 5;

const REMEDIATION: &str =
    "Check that the file is valid CSV and that the student id and total score columns exist";

/// Header names recognized in an uploaded exam file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct IngestColumns {
    /// Accepted names for the student id column
    #[serde(default = "default_student_id_columns")]
    pub student_id_columns: Vec<String>,
    /// Accepted names for the overall score column
    #[serde(default = "default_score_columns")]
    pub score_columns: Vec<String>,
}

fn default_student_id_columns() -> Vec<String> {
    vec!["student_id".to_string(), "ID de Estudiante".to_string()]
}

fn default_score_columns() -> Vec<String> {
    vec!["total_score".to_string(), "Puntuación total".to_string()]
}

impl Default for IngestColumns {
    fn default() -> Self {
        Self {
            student_id_columns: default_student_id_columns(),
            score_columns: default_score_columns(),
        }
    }
}

/// Batch-level ingestion failure
#[derive(Debug, Error)]
pub enum IngestError {
    /// The upload is not a well-formed table
    #[error("Failed to parse exam CSV: {reason}. {}", REMEDIATION)]
    Malformed { reason: String },

    /// A required column is absent from the header row
    #[error("Exam CSV has no {kind} column (expected one of: {expected}). {}", REMEDIATION)]
    MissingColumn { kind: &'static str, expected: String },

    /// Rows were applied but the store could not be written back
    #[error("Exam results applied but not saved: {0}")]
    Persist(#[from] LevelError),
}

/// What happened to one data row of the upload (rows are numbered from 1)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RowOutcome {
    Updated { row: usize, student_id: u32, tier: MasteryTier },
    UnknownStudent { row: usize, student_id: i64 },
    MissingFields { row: usize },
}

impl RowOutcome {
    pub fn is_warning(&self) -> bool {
        !matches!(self, RowOutcome::Updated { .. })
    }

    /// Operator-facing message for this row
    pub fn message(&self) -> String {
        match self {
            RowOutcome::Updated { student_id, tier, .. } => {
                format!("Student {} updated to {} based on exam.", student_id, tier)
            }
            RowOutcome::UnknownStudent { student_id, .. } => {
                format!("Student with id {} from the exam was not found in the store.", student_id)
            }
            RowOutcome::MissingFields { row } => {
                format!("Row {} of the uploaded exam: missing student id or total score.", row)
            }
        }
    }
}

/// Result of one ingestion batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    pub outcomes: Vec<RowOutcome>,
    /// Header row of the upload
    pub headers: Vec<String>,
    /// Last few raw rows of the upload
    pub preview: Vec<Vec<String>>,
    pub persisted: bool,
}

impl IngestReport {
    pub fn updated(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.is_warning()).count()
    }

    pub fn warnings(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_warning()).count()
    }

    pub fn messages(&self) -> Vec<String> {
        self.outcomes.iter().map(RowOutcome::message).collect()
    }
}

/// A data row reduced to the two cells we care about
struct ScoreCells {
    row: usize,
    student_id: Option<String>,
    score: Option<String>,
}

struct ParsedUpload {
    headers: Vec<String>,
    rows: Vec<ScoreCells>,
    preview: Vec<Vec<String>>,
}

fn normalize_header(h: &str) -> String {
    h.trim().trim_start_matches('\u{feff}').to_lowercase()
}

fn find_column(headers: &[String], names: &[String], kind: &'static str) -> Result<usize, IngestError> {
    let wanted: Vec<String> = names.iter().map(|n| normalize_header(n)).collect();
    headers
        .iter()
        .position(|h| wanted.contains(&normalize_header(h)))
        .ok_or_else(|| IngestError::MissingColumn {
            kind,
            expected: names.join(", "),
        })
}

/// Parse the whole upload before touching the store
fn parse_upload<R: std::io::Read>(reader: R, columns: &IngestColumns) -> Result<ParsedUpload, IngestError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| IngestError::Malformed { reason: e.to_string() })?
        .iter()
        .map(|h| h.to_string())
        .collect();

    let id_idx = find_column(&headers, &columns.student_id_columns, "student id")?;
    let score_idx = find_column(&headers, &columns.score_columns, "total score")?;

    let mut rows = Vec::new();
    let mut raw_rows = Vec::new();
    for (i, record) in reader.records().enumerate() {
        let record = record.map_err(|e| IngestError::Malformed { reason: e.to_string() })?;
        let cell = |idx: usize| record.get(idx).filter(|s| !s.is_empty()).map(|s| s.to_string());
        rows.push(ScoreCells {
            row: i + 1,
            student_id: cell(id_idx),
            score: cell(score_idx),
        });
        raw_rows.push(record.iter().map(|s| s.to_string()).collect::<Vec<_>>());
    }

    let skip = raw_rows.len().saturating_sub(PREVIEW_ROWS);
    let preview = raw_rows.into_iter().skip(skip).collect();

    Ok(ParsedUpload { headers, rows, preview })
}

/// Coerce a numeric cell to an integer, truncating any fraction
fn parse_integer(cell: &str) -> Option<i64> {
    if let Ok(n) = cell.parse::<i64>() {
        return Some(n);
    }
    cell.parse::<f64>()
        .ok()
        .filter(|f| f.is_finite())
        .map(|f| f.trunc() as i64)
}

/// Parse a total score. Accepts plain numbers and "earned / possible"
/// (as exported by Google Forms), the latter scaled to 0-100.
fn parse_score(cell: &str) -> Option<i64> {
    if let Some((earned, possible)) = cell.split_once('/') {
        let earned: f64 = earned.trim().parse().ok()?;
        let possible: f64 = possible.trim().parse().ok()?;
        if !earned.is_finite() || !possible.is_finite() || possible <= 0.0 {
            return None;
        }
        return Some((earned * 100.0 / possible).round() as i64);
    }
    parse_integer(cell)
}

/// Apply an exam-results upload to the store and persist it once.
pub fn ingest<R: std::io::Read>(
    store: &mut LevelStore,
    reader: R,
    columns: &IngestColumns,
) -> Result<IngestReport, IngestError> {
    let upload = parse_upload(reader, columns)?;
    let previous = store.snapshot();
    let mut outcomes = Vec::with_capacity(upload.rows.len());

    for cells in &upload.rows {
        let parsed = cells
            .student_id
            .as_deref()
            .and_then(parse_integer)
            .zip(cells.score.as_deref().and_then(parse_score));

        let Some((student_id, score)) = parsed else {
            warn!("Exam row {}: missing student id or total score", cells.row);
            outcomes.push(RowOutcome::MissingFields { row: cells.row });
            continue;
        };

        let tier = classify(score);
        let outcome = match u32::try_from(student_id) {
            Ok(id) => match store.set_all_concepts(id, tier) {
                Ok(()) => RowOutcome::Updated { row: cells.row, student_id: id, tier },
                Err(LevelError::StudentNotFound(_)) => RowOutcome::UnknownStudent { row: cells.row, student_id },
                Err(e) => return Err(e.into()),
            },
            Err(_) => RowOutcome::UnknownStudent { row: cells.row, student_id },
        };

        if let RowOutcome::UnknownStudent { .. } = outcome {
            warn!("Exam row {}: student {} not found", cells.row, student_id);
        }
        outcomes.push(outcome);
    }

    store.persist_or_restore(previous)?;

    let report = IngestReport {
        outcomes,
        headers: upload.headers,
        preview: upload.preview,
        persisted: true,
    };
    info!(
        "Ingested exam results: {} updated, {} warnings",
        report.updated(),
        report.warnings()
    );
    Ok(report)
}
