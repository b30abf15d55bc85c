//! Collision detection and per-occurrence conflict resolution.

use chrono::{Duration, NaiveDate};
use uuid::Uuid;

use crate::errors::Result;
use crate::schedule::{ConflictStrategy, Occurrence, RecurringTemplate, TransactionKind};
use crate::store::{NewTransaction, TransactionStore};

use super::materializer::{BulkTarget, MaterializationResult};

/// Bound on the forward day-by-day search used by the adjust strategy. Keeps
/// a fully booked calendar from dragging an occurrence arbitrarily far from
/// its scheduled date.
pub const MAX_ADJUST_DAYS: u32 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Outcome of probing the store for an existing transaction in a cell.
pub enum Detection {
    Clear,
    Conflict { existing: Uuid },
}

/// Checks whether the given cell is already occupied in the store.
pub fn detect<S: TransactionStore + ?Sized>(
    store: &S,
    date: NaiveDate,
    category: &str,
    subcategory: Option<&str>,
) -> Result<Detection> {
    let existing = store.find_by_cell(date, category, subcategory)?;
    Ok(match existing {
        Some(id) => Detection::Conflict { existing: id },
        None => Detection::Clear,
    })
}

#[derive(Debug, Clone)]
/// One occurrence worth of transaction fields, ready for resolution and
/// persistence. Recurrence runs and bulk selections both reduce to drafts, so
/// the materializer has a single processing path.
pub struct OccurrenceDraft {
    pub date: NaiveDate,
    pub sequence_index: u32,
    pub amount: f64,
    pub description: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub kind: TransactionKind,
    pub strategy: ConflictStrategy,
    pub series_id: Option<Uuid>,
}

impl OccurrenceDraft {
    pub fn from_template(template: &RecurringTemplate, occurrence: Occurrence) -> Self {
        Self {
            date: occurrence.date,
            sequence_index: occurrence.sequence_index,
            amount: template.amount,
            description: template.description.clone(),
            category: template.category.clone(),
            subcategory: template.subcategory.clone(),
            kind: template.kind,
            strategy: template.conflict_strategy,
            series_id: Some(template.series_id),
        }
    }

    pub fn from_bulk(target: &BulkTarget, sequence_index: u32) -> Self {
        Self {
            date: target.date,
            sequence_index,
            amount: target.amount,
            description: target.description.clone(),
            category: target.category.clone(),
            subcategory: target.subcategory.clone(),
            kind: target.kind,
            strategy: target.conflict_strategy,
            series_id: None,
        }
    }

    /// Builds the store record for this draft at its final (possibly
    /// adjusted) date.
    pub fn to_new_transaction(&self, date: NaiveDate) -> NewTransaction {
        NewTransaction {
            date,
            amount: self.amount,
            description: self.description.clone(),
            category: self.category.clone(),
            subcategory: self.subcategory.clone(),
            kind: self.kind,
            series_id: self.series_id,
            sequence_index: Some(self.sequence_index),
        }
    }
}

/// Applies the draft's conflict strategy to a detection outcome.
///
/// A clear cell schedules regardless of strategy. On a conflict: `Skip`
/// drops the occurrence, `Adjust` probes forward up to [`MAX_ADJUST_DAYS`]
/// days for the first free cell (skipping when the whole window is booked),
/// and `CreateAnyway` accepts the duplicate, reporting it with the conflict
/// disposition so the collision stays auditable.
pub fn resolve<S: TransactionStore + ?Sized>(
    store: &S,
    draft: &OccurrenceDraft,
    detection: Detection,
) -> Result<MaterializationResult> {
    let existing = match detection {
        Detection::Clear => return Ok(MaterializationResult::scheduled(draft)),
        Detection::Conflict { existing } => existing,
    };

    match draft.strategy {
        ConflictStrategy::Skip => Ok(MaterializationResult::skipped(draft)),
        ConflictStrategy::Adjust => {
            let mut candidate = draft.date;
            for _ in 0..MAX_ADJUST_DAYS {
                candidate += Duration::days(1);
                let probe = detect(store, candidate, &draft.category, draft.subcategory.as_deref())?;
                if probe == Detection::Clear {
                    return Ok(MaterializationResult::adjusted(draft, candidate));
                }
            }
            // Adjustment exhausted; treated as a skip, not an error.
            Ok(MaterializationResult::skipped(draft))
        }
        ConflictStrategy::CreateAnyway => Ok(MaterializationResult::duplicate(draft, existing)),
    }
}
