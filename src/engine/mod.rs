//! Conflict handling and batch materialization orchestration.

pub mod conflict;
pub mod materializer;

pub use conflict::{detect, Detection, OccurrenceDraft, MAX_ADJUST_DAYS};
pub use materializer::{
    BatchMaterializer, BatchReport, BulkTarget, CancelFlag, Disposition, MaterializationResult,
    MaterializeOptions, Progress, DEFAULT_PREVIEW_CAP,
};
