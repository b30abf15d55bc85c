//! Recurrence domain types and pure date arithmetic.

pub mod generator;
pub mod template;
pub mod time_interval;

pub use generator::{count_occurrences, occurrences, Occurrence, OccurrenceIter};
pub use template::{ConflictStrategy, EndCondition, RecurringTemplate, TransactionKind};
pub use time_interval::{TimeInterval, TimeUnit};

/// Hard ceiling on the number of occurrences any single rule may produce.
pub const MAX_OCCURRENCES: u32 = 1000;

/// Largest accepted interval multiplier for a recurrence rule.
pub const MAX_INTERVAL: u32 = 365;
