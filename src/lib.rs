#![doc(test(attr(deny(warnings))))]

//! Recurrence Core expands recurring transaction templates into concrete
//! occurrences, checks each occurrence against the transaction store for
//! collisions, applies a conflict policy, and materializes the survivors
//! while keeping a complete per-occurrence accounting of the run.

pub mod clock;
pub mod engine;
pub mod errors;
pub mod schedule;
pub mod store;
pub mod utils;

pub use clock::{Clock, FixedClock, SystemClock};
pub use engine::{
    BatchMaterializer, BatchReport, BulkTarget, CancelFlag, Detection, Disposition,
    MaterializationResult, MaterializeOptions, Progress,
};
pub use errors::{EngineError, Result};
pub use schedule::{
    ConflictStrategy, EndCondition, Occurrence, RecurringTemplate, TimeInterval, TimeUnit,
    TransactionKind,
};
pub use store::{
    JsonTransactionStore, MemoryTransactionStore, NewTransaction, StoreError, StoredTransaction,
    TransactionStore,
};

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("Recurrence Core tracing initialized.");
    });
}
