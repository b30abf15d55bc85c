//! Recurring transaction templates and their validation rules.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::clock::Clock;
use crate::errors::{EngineError, Result};

use super::time_interval::TimeInterval;
use super::{MAX_INTERVAL, MAX_OCCURRENCES};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
/// Classifies the direction of money movement for a transaction.
pub enum TransactionKind {
    Income,
    Expense,
    Saving,
}

impl fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TransactionKind::Income => "Income",
            TransactionKind::Expense => "Expense",
            TransactionKind::Saving => "Saving",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
/// Determines when a recurrence sequence stops generating occurrences.
#[derive(Default)]
pub enum EndCondition {
    #[default]
    Never,
    OnDate(NaiveDate),
    AfterOccurrences(u32),
}

impl fmt::Display for EndCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndCondition::Never => f.write_str("Never"),
            EndCondition::OnDate(date) => write!(f, "On {}", date),
            EndCondition::AfterOccurrences(limit) => {
                write!(
                    f,
                    "After {limit} occurrence{}",
                    if *limit == 1 { "" } else { "s" }
                )
            }
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
/// Selects how a collision with an existing transaction is handled.
#[derive(Default)]
pub enum ConflictStrategy {
    /// Drop the occurrence and leave the existing transaction untouched.
    #[default]
    Skip,
    /// Move the occurrence forward to the nearest free day.
    Adjust,
    /// Create the transaction next to the existing one.
    CreateAnyway,
}

impl fmt::Display for ConflictStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ConflictStrategy::Skip => "Skip",
            ConflictStrategy::Adjust => "Adjust",
            ConflictStrategy::CreateAnyway => "Create Anyway",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// Defines a repeatable transaction source.
///
/// The engine treats templates as immutable: once a run has started, edits
/// upstream mint a new template value rather than mutating this one.
pub struct RecurringTemplate {
    pub series_id: Uuid,
    pub amount: f64,
    pub description: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub kind: TransactionKind,
    pub interval: TimeInterval,
    pub start_date: NaiveDate,
    pub end: EndCondition,
    pub conflict_strategy: ConflictStrategy,
}

impl RecurringTemplate {
    pub fn new(
        amount: f64,
        description: impl Into<String>,
        category: impl Into<String>,
        kind: TransactionKind,
        interval: TimeInterval,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            series_id: Uuid::new_v4(),
            amount,
            description: description.into(),
            category: category.into(),
            subcategory: None,
            kind,
            interval,
            start_date,
            end: EndCondition::default(),
            conflict_strategy: ConflictStrategy::default(),
        }
    }

    pub fn with_subcategory(mut self, subcategory: impl Into<String>) -> Self {
        self.subcategory = Some(subcategory.into());
        self
    }

    pub fn with_end(mut self, end: EndCondition) -> Self {
        self.end = end;
        self
    }

    pub fn with_strategy(mut self, strategy: ConflictStrategy) -> Self {
        self.conflict_strategy = strategy;
        self
    }

    /// Checks the template's internal consistency.
    ///
    /// Interval multipliers are bounded to 1..=365 and occurrence counts to
    /// 1..=1000; an `OnDate` end must fall strictly after the start date.
    pub fn validate(&self) -> Result<()> {
        if self.interval.every < 1 || self.interval.every > MAX_INTERVAL {
            return Err(EngineError::InvalidTemplate(format!(
                "interval must be between 1 and {}, got {}",
                MAX_INTERVAL, self.interval.every
            )));
        }
        match self.end {
            EndCondition::OnDate(end_date) if end_date <= self.start_date => {
                Err(EngineError::InvalidTemplate(format!(
                    "end date {} is not after start date {}",
                    end_date, self.start_date
                )))
            }
            EndCondition::AfterOccurrences(count) if count < 1 || count > MAX_OCCURRENCES => {
                Err(EngineError::InvalidTemplate(format!(
                    "occurrence count must be between 1 and {}, got {}",
                    MAX_OCCURRENCES, count
                )))
            }
            _ => Ok(()),
        }
    }

    /// Validates the template against the current date at creation time.
    ///
    /// An `OnDate` end that already passed is rejected, since such a schedule
    /// can never materialize anything. Start dates in the past are allowed so
    /// a series that began earlier can be backfilled.
    pub fn validate_at(&self, clock: &dyn Clock) -> Result<()> {
        self.validate()?;
        if let EndCondition::OnDate(end_date) = self.end {
            if end_date < clock.today() {
                return Err(EngineError::InvalidTemplate(format!(
                    "end date {} has already passed",
                    end_date
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use crate::clock::FixedClock;
    use crate::schedule::TimeUnit;

    use super::*;

    fn template(every: u32) -> RecurringTemplate {
        RecurringTemplate::new(
            50.0,
            "Gym membership",
            "Health",
            TransactionKind::Expense,
            TimeInterval::new(every, TimeUnit::Week),
            NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
        )
    }

    #[test]
    fn accepts_interval_within_bounds() {
        assert!(template(40).validate().is_ok());
    }

    #[test]
    fn rejects_interval_over_bound() {
        let err = template(400).validate().unwrap_err();
        assert!(matches!(err, EngineError::InvalidTemplate(_)));
    }

    #[test]
    fn rejects_end_date_before_start() {
        let template = template(1).with_end(EndCondition::OnDate(
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        ));
        assert!(matches!(
            template.validate(),
            Err(EngineError::InvalidTemplate(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_occurrence_counts() {
        assert!(template(1)
            .with_end(EndCondition::AfterOccurrences(0))
            .validate()
            .is_err());
        assert!(template(1)
            .with_end(EndCondition::AfterOccurrences(1001))
            .validate()
            .is_err());
        assert!(template(1)
            .with_end(EndCondition::AfterOccurrences(1000))
            .validate()
            .is_ok());
    }

    #[test]
    fn clock_validation_rejects_expired_end_date() {
        let clock = FixedClock(Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap());
        let template = template(1).with_end(EndCondition::OnDate(
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        ));
        assert!(template.validate_at(&clock).is_err());
    }
}
