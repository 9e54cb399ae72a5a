//! Manual single-cell level edits

use serde::Serialize;
use tracing::{info, warn};

use super::{LevelError, LevelStore};
use crate::types::{Concept, MasteryTier};

/// Result of an operator edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ManualOutcome {
    Updated {
        student_id: u32,
        concept: Concept,
        tier: MasteryTier,
    },
    NotFound {
        student_id: u32,
    },
}

impl ManualOutcome {
    pub fn message(&self) -> String {
        match self {
            ManualOutcome::Updated { student_id, concept, tier } => format!(
                "Level for {} set to {} for student {}.",
                concept, tier, student_id
            ),
            ManualOutcome::NotFound { student_id } => {
                format!("Student with id {} not found. Level was not updated.", student_id)
            }
        }
    }
}

/// Set one (student, concept) cell and persist immediately.
///
/// An unknown student is reported as `ManualOutcome::NotFound` and leaves
/// both the table and the durable file untouched. A failed write leaves the
/// table as it was before the call.
pub fn apply_manual_update(
    store: &mut LevelStore,
    student_id: u32,
    concept: Concept,
    tier: MasteryTier,
) -> Result<ManualOutcome, LevelError> {
    let previous = store.snapshot();
    match store.set_tier(student_id, concept, tier) {
        Ok(()) => {}
        Err(LevelError::StudentNotFound(_)) => {
            warn!("Manual update rejected: student {} not found", student_id);
            return Ok(ManualOutcome::NotFound { student_id });
        }
        Err(e) => return Err(e),
    }

    store.persist_or_restore(previous)?;
    info!("Manual update: student {} {} -> {}", student_id, concept, tier);

    Ok(ManualOutcome::Updated {
        student_id,
        concept,
        tier,
    })
}
