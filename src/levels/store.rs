//! Level store - the student table and its durable CSV copy
//!
//! The table is read once at startup and rewritten wholesale after every
//! mutation. Writes land in a temp file next to the target and are renamed
//! over it, so a crash mid-write leaves the previous file intact.

use std::collections::HashSet;
use std::path::PathBuf;

use tracing::{debug, info, warn};

use super::LevelError;
use crate::types::{Concept, MasteryTier, StudentRecord};

const ID_COLUMN: &str = "id";
const NAME_COLUMN: &str = "name";
const NAME_COLUMN_ALIAS: &str = "nombre";

/// Backend that holds the durable copy of the table
#[cfg_attr(test, mockall::automock)]
pub trait TableFile: Send + Sync {
    /// Read every student row
    fn read_table(&self) -> Result<Vec<StudentRecord>, LevelError>;

    /// Replace the durable copy with `records`
    fn write_table(&self, records: &[StudentRecord]) -> Result<(), LevelError>;

    /// Human-readable location, for logs and errors
    fn location(&self) -> String;
}

/// CSV file with columns `id,name,FC_DEFINICION,...`
#[derive(Debug, Clone)]
pub struct CsvTableFile {
    path: PathBuf,
}

impl CsvTableFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn malformed(&self, reason: impl Into<String>) -> LevelError {
        LevelError::Malformed {
            path: self.location(),
            reason: reason.into(),
        }
    }

    fn write_error(&self, reason: impl std::fmt::Display) -> LevelError {
        LevelError::Write {
            path: self.location(),
            reason: reason.to_string(),
        }
    }
}

/// Column positions resolved from the header row
struct TableLayout {
    id: usize,
    name: usize,
    concepts: [usize; 5],
}

impl TableLayout {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, String> {
        let find = |wanted: &str| {
            headers
                .iter()
                .position(|h| h.trim().trim_start_matches('\u{feff}').eq_ignore_ascii_case(wanted))
        };

        let id = find(ID_COLUMN).ok_or_else(|| format!("missing '{}' column", ID_COLUMN))?;
        let name = find(NAME_COLUMN)
            .or_else(|| find(NAME_COLUMN_ALIAS))
            .ok_or_else(|| format!("missing '{}' column", NAME_COLUMN))?;

        let mut concepts = [0usize; 5];
        for concept in Concept::ALL {
            concepts[concept.index()] = find(concept.tag())
                .ok_or_else(|| format!("missing '{}' column", concept.tag()))?;
        }

        Ok(Self { id, name, concepts })
    }
}

impl TableFile for CsvTableFile {
    fn read_table(&self) -> Result<Vec<StudentRecord>, LevelError> {
        let file = std::fs::File::open(&self.path).map_err(|source| LevelError::Read {
            path: self.location(),
            source,
        })?;

        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(file);

        let headers = reader
            .headers()
            .map_err(|e| self.malformed(format!("invalid header row: {}", e)))?
            .clone();
        let layout = TableLayout::from_headers(&headers).map_err(|r| self.malformed(r))?;

        let mut records = Vec::new();
        let mut seen = HashSet::new();

        for (i, row) in reader.records().enumerate() {
            let line = i + 2;
            let row = row.map_err(|e| self.malformed(format!("line {}: {}", line, e)))?;
            let cell = |idx: usize| row.get(idx).unwrap_or("");

            let id: u32 = cell(layout.id)
                .parse()
                .ok()
                .filter(|id| *id > 0)
                .ok_or_else(|| self.malformed(format!("line {}: invalid id '{}'", line, cell(layout.id))))?;
            if !seen.insert(id) {
                return Err(self.malformed(format!("line {}: duplicate id {}", line, id)));
            }

            let mut levels = [MasteryTier::Basic; 5];
            for concept in Concept::ALL {
                let raw = cell(layout.concepts[concept.index()]);
                levels[concept.index()] = raw
                    .parse::<f64>()
                    .ok()
                    .and_then(MasteryTier::from_value)
                    .ok_or_else(|| {
                        self.malformed(format!(
                            "line {}: {} has value '{}', expected 0.25, 0.55 or 0.85",
                            line,
                            concept.tag(),
                            raw
                        ))
                    })?;
            }

            records.push(StudentRecord::with_levels(id, cell(layout.name), levels));
        }

        Ok(records)
    }

    fn write_table(&self, records: &[StudentRecord]) -> Result<(), LevelError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let tmp = tempfile::NamedTempFile::new_in(&dir).map_err(|e| self.write_error(e))?;
        {
            let mut writer = csv::Writer::from_writer(tmp.as_file());

            let mut header = vec![ID_COLUMN.to_string(), NAME_COLUMN.to_string()];
            header.extend(Concept::ALL.iter().map(|c| c.tag().to_string()));
            writer.write_record(&header).map_err(|e| self.write_error(e))?;

            for record in records {
                let mut row = vec![record.id.to_string(), record.name.clone()];
                row.extend(record.levels().map(|(_, tier)| tier.value().to_string()));
                writer.write_record(&row).map_err(|e| self.write_error(e))?;
            }

            writer.flush().map_err(|e| self.write_error(e))?;
        }
        tmp.as_file().sync_all().map_err(|e| self.write_error(e))?;
        tmp.persist(&self.path).map_err(|e| self.write_error(e.error))?;

        Ok(())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}

/// In-memory student table backed by a durable file
pub struct LevelStore {
    records: Vec<StudentRecord>,
    file: Box<dyn TableFile>,
}

impl LevelStore {
    /// Load the table from `file`. Fails if the file is missing or unparseable.
    pub fn load(file: impl TableFile + 'static) -> Result<Self, LevelError> {
        let records = file.read_table()?;
        info!("Loaded {} students from {}", records.len(), file.location());
        Ok(Self {
            records,
            file: Box::new(file),
        })
    }

    /// Load from a CSV file on disk
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LevelError> {
        Self::load(CsvTableFile::new(path))
    }

    pub fn find(&self, id: u32) -> Option<&StudentRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    fn find_mut(&mut self, id: u32) -> Result<&mut StudentRecord, LevelError> {
        self.records
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(LevelError::StudentNotFound(id))
    }

    /// Overwrite one (student, concept) cell. Does not persist.
    pub fn set_tier(&mut self, id: u32, concept: Concept, tier: MasteryTier) -> Result<(), LevelError> {
        self.find_mut(id)?.set_tier(concept, tier);
        debug!("Student {} {} -> {}", id, concept, tier);
        Ok(())
    }

    /// Overwrite every concept of one student. Does not persist.
    pub fn set_all_concepts(&mut self, id: u32, tier: MasteryTier) -> Result<(), LevelError> {
        self.find_mut(id)?.set_all(tier);
        debug!("Student {} all concepts -> {}", id, tier);
        Ok(())
    }

    /// Write the whole table to the durable file
    pub fn persist(&self) -> Result<(), LevelError> {
        self.file.write_table(&self.records)?;
        info!("Persisted {} students to {}", self.records.len(), self.file.location());
        Ok(())
    }

    /// Persist, and on failure put the table back to `previous`
    pub fn persist_or_restore(&mut self, previous: Vec<StudentRecord>) -> Result<(), LevelError> {
        if let Err(e) = self.persist() {
            warn!("Discarding unsaved level changes for {}: {}", self.file.location(), e);
            self.records = previous;
            return Err(e);
        }
        Ok(())
    }

    /// Copy of the current table, to hand back to `persist_or_restore`
    pub fn snapshot(&self) -> Vec<StudentRecord> {
        self.records.clone()
    }

    /// All records, in file order
    pub fn records(&self) -> &[StudentRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn location(&self) -> String {
        self.file.location()
    }
}
