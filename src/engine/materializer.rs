//! Batch materialization of recurrence runs and bulk cell operations.

use std::fmt;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::errors::Result;
use crate::schedule::{
    count_occurrences, occurrences, ConflictStrategy, RecurringTemplate, TransactionKind,
};
use crate::store::TransactionStore;

use super::conflict::{detect, resolve, OccurrenceDraft};

/// Number of occurrences a preview or dry run enumerates when the caller
/// does not supply a cap.
pub const DEFAULT_PREVIEW_CAP: u32 = 12;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
/// Final per-occurrence outcome label.
pub enum Disposition {
    /// Created on its scheduled date.
    Scheduled,
    /// Created after being moved off a conflicting date.
    Adjusted,
    /// Dropped, either by the skip strategy or an exhausted adjustment.
    Skipped,
    /// Created next to an existing transaction by the create-anyway strategy.
    Conflict,
    /// A store operation failed for this occurrence.
    Failed,
}

impl Disposition {
    /// Whether this outcome produces a store write.
    pub fn persists(&self) -> bool {
        matches!(
            self,
            Disposition::Scheduled | Disposition::Adjusted | Disposition::Conflict
        )
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Disposition::Scheduled => "Scheduled",
            Disposition::Adjusted => "Adjusted",
            Disposition::Skipped => "Skipped",
            Disposition::Conflict => "Conflict",
            Disposition::Failed => "Failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Per-occurrence outcome after conflict resolution.
pub struct MaterializationResult {
    pub date: NaiveDate,
    pub sequence_index: u32,
    pub amount: f64,
    pub description: String,
    pub status: Disposition,
    /// The originally scheduled date, present only when `status` is
    /// [`Disposition::Adjusted`].
    pub original_date: Option<NaiveDate>,
    /// The collided transaction, present only when `status` is
    /// [`Disposition::Conflict`].
    pub existing_id: Option<Uuid>,
    /// The underlying failure, present only when `status` is
    /// [`Disposition::Failed`].
    pub error: Option<String>,
}

impl MaterializationResult {
    fn base(draft: &OccurrenceDraft, status: Disposition) -> Self {
        Self {
            date: draft.date,
            sequence_index: draft.sequence_index,
            amount: draft.amount,
            description: draft.description.clone(),
            status,
            original_date: None,
            existing_id: None,
            error: None,
        }
    }

    pub(crate) fn scheduled(draft: &OccurrenceDraft) -> Self {
        Self::base(draft, Disposition::Scheduled)
    }

    pub(crate) fn skipped(draft: &OccurrenceDraft) -> Self {
        Self::base(draft, Disposition::Skipped)
    }

    pub(crate) fn adjusted(draft: &OccurrenceDraft, new_date: NaiveDate) -> Self {
        let mut result = Self::base(draft, Disposition::Adjusted);
        result.original_date = Some(draft.date);
        result.date = new_date;
        result
    }

    pub(crate) fn duplicate(draft: &OccurrenceDraft, existing: Uuid) -> Self {
        let mut result = Self::base(draft, Disposition::Conflict);
        result.existing_id = Some(existing);
        result
    }

    pub(crate) fn failed(draft: &OccurrenceDraft, error: String) -> Self {
        let mut result = Self::base(draft, Disposition::Failed);
        result.error = Some(error);
        result
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
/// Options controlling a materialization run.
pub struct MaterializeOptions {
    /// Record store failures per occurrence and keep going instead of
    /// aborting the run on the first one.
    pub skip_errors: bool,
    /// Resolve every occurrence but never write to the store.
    pub dry_run: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// One selected cell in a bulk operation.
pub struct BulkTarget {
    pub date: NaiveDate,
    pub category: String,
    pub subcategory: Option<String>,
    pub amount: f64,
    pub description: String,
    pub kind: TransactionKind,
    pub conflict_strategy: ConflictStrategy,
}

#[derive(Debug, Clone, Copy)]
/// Incremental snapshot emitted after each resolved occurrence.
pub struct Progress {
    pub total: u32,
    pub completed: u32,
    pub failed: u32,
    pub current: NaiveDate,
}

#[derive(Debug, Clone, Default)]
/// Cooperative cancellation handle shared between a caller and a run.
///
/// Cancellation is checked between occurrences: the run stops generating and
/// persisting, and the report covers exactly what was committed before the
/// flag was observed. Nothing is rolled back.
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
/// Aggregate of a materialization run.
///
/// `completed + failed` never exceeds `total` and equals it after a normal,
/// uncancelled completion. Occurrences the run never reached (abort or
/// cancellation) are absent from `results`.
pub struct BatchReport {
    pub total: u32,
    pub completed: u32,
    pub failed: u32,
    pub results: Vec<MaterializationResult>,
    /// Set when a store failure aborted the run (`skip_errors` off).
    pub run_error: Option<String>,
    /// Set when the cancel flag stopped the run early.
    pub cancelled: bool,
}

type ProgressCallback = Box<dyn FnMut(Progress) + Send>;

/// Orchestrates occurrence generation, conflict handling, and persistence
/// against a transaction store.
pub struct BatchMaterializer<S: TransactionStore> {
    store: S,
    progress: Option<ProgressCallback>,
    cancel: CancelFlag,
}

impl<S: TransactionStore> BatchMaterializer<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            progress: None,
            cancel: CancelFlag::new(),
        }
    }

    /// Registers a callback invoked after every resolved occurrence.
    pub fn on_progress(mut self, callback: impl FnMut(Progress) + Send + 'static) -> Self {
        self.progress = Some(Box::new(callback));
        self
    }

    /// Returns a handle that cancels the current or next run when triggered.
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Resolves the first `cap` occurrences without persisting anything.
    ///
    /// Store failures are recorded per occurrence rather than aborting, so a
    /// preview is always complete. Enumerating twice against an unchanged
    /// store yields an identical sequence.
    pub fn preview(
        &self,
        template: &RecurringTemplate,
        cap: Option<u32>,
    ) -> Result<Vec<MaterializationResult>> {
        let cap = cap.unwrap_or(DEFAULT_PREVIEW_CAP);
        let mut results = Vec::new();
        for occurrence in occurrences(template, Some(cap))? {
            let draft = OccurrenceDraft::from_template(template, occurrence);
            results.push(self.resolve_draft(&draft));
        }
        Ok(results)
    }

    /// Materializes the full recurrence run described by `template`.
    ///
    /// Template validation and the occurrence-count check both happen before
    /// the first store write; an oversized or invalid rule fails without
    /// attempting anything. In dry-run mode the enumeration is capped at
    /// [`DEFAULT_PREVIEW_CAP`] and nothing is persisted.
    pub fn materialize(
        &mut self,
        template: &RecurringTemplate,
        options: &MaterializeOptions,
    ) -> Result<BatchReport> {
        let cap = if options.dry_run {
            Some(DEFAULT_PREVIEW_CAP)
        } else {
            None
        };
        let total = match cap {
            Some(cap) => occurrences(template, Some(cap))?.count() as u32,
            None => count_occurrences(template)?,
        };
        debug!(
            "materializing series {} ({}): {} occurrence(s)",
            template.series_id,
            template.interval.label(),
            total
        );
        let drafts = occurrences(template, cap)?
            .map(|occurrence| OccurrenceDraft::from_template(template, occurrence));
        Ok(self.run(drafts, total, options))
    }

    /// Materializes an explicit multi-cell selection.
    ///
    /// Each target is one occurrence whose sequence index is its position in
    /// the selection, and `total` is the selection length.
    pub fn materialize_bulk(
        &mut self,
        targets: &[BulkTarget],
        options: &MaterializeOptions,
    ) -> Result<BatchReport> {
        let drafts: Vec<OccurrenceDraft> = targets
            .iter()
            .enumerate()
            .map(|(index, target)| OccurrenceDraft::from_bulk(target, index as u32))
            .collect();
        let total = drafts.len() as u32;
        debug!("bulk materialization over {} target(s)", total);
        Ok(self.run(drafts, total, options))
    }

    fn run<I>(&mut self, drafts: I, total: u32, options: &MaterializeOptions) -> BatchReport
    where
        I: IntoIterator<Item = OccurrenceDraft>,
    {
        let mut report = BatchReport {
            total,
            ..Default::default()
        };

        for draft in drafts {
            if self.cancel.is_cancelled() {
                info!(
                    "run cancelled after {} of {} occurrence(s)",
                    report.completed + report.failed,
                    report.total
                );
                report.cancelled = true;
                break;
            }

            let result = self.process(&draft, options);
            let failed = result.status == Disposition::Failed;
            if failed {
                report.failed += 1;
            } else {
                report.completed += 1;
            }
            let current = result.date;
            let abort = failed && !options.skip_errors;
            if abort {
                report.run_error = result.error.clone();
            }
            report.results.push(result);
            self.emit_progress(&report, current);
            if abort {
                warn!(
                    "aborting run after failure on {}: {}",
                    current,
                    report.run_error.as_deref().unwrap_or("unknown error")
                );
                break;
            }
        }

        info!(
            "materialization finished: {}/{} completed, {} failed",
            report.completed, report.total, report.failed
        );
        report
    }

    /// Detects, resolves, and (when applicable) persists a single draft.
    /// Store failures come back as a `Failed` result, never as an error.
    fn process(
        &mut self,
        draft: &OccurrenceDraft,
        options: &MaterializeOptions,
    ) -> MaterializationResult {
        let resolved = self.resolve_draft(draft);
        if options.dry_run || !resolved.status.persists() {
            return resolved;
        }
        match self.store.create(draft.to_new_transaction(resolved.date)) {
            Ok(id) => {
                debug!(
                    "persisted occurrence #{} on {} as {} ({})",
                    draft.sequence_index, resolved.date, id, resolved.status
                );
                resolved
            }
            Err(err) => {
                warn!("persist failed for {}: {}", resolved.date, err);
                MaterializationResult::failed(draft, err.to_string())
            }
        }
    }

    fn resolve_draft(&self, draft: &OccurrenceDraft) -> MaterializationResult {
        let detection = match detect(
            &self.store,
            draft.date,
            &draft.category,
            draft.subcategory.as_deref(),
        ) {
            Ok(detection) => detection,
            Err(err) => {
                warn!("conflict detection failed for {}: {}", draft.date, err);
                return MaterializationResult::failed(draft, err.to_string());
            }
        };
        match resolve(&self.store, draft, detection) {
            Ok(result) => result,
            Err(err) => {
                warn!("conflict resolution failed for {}: {}", draft.date, err);
                MaterializationResult::failed(draft, err.to_string())
            }
        }
    }

    fn emit_progress(&mut self, report: &BatchReport, current: NaiveDate) {
        if let Some(callback) = self.progress.as_mut() {
            callback(Progress {
                total: report.total,
                completed: report.completed,
                failed: report.failed,
                current,
            });
        }
    }
}
