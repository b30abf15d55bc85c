//! Lazy expansion of recurrence rules into concrete occurrence dates.

use chrono::NaiveDate;

use crate::errors::{EngineError, Result};

use super::template::{EndCondition, RecurringTemplate};
use super::MAX_OCCURRENCES;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// One candidate date produced by expanding a recurrence rule, prior to
/// conflict resolution.
pub struct Occurrence {
    pub date: NaiveDate,
    pub sequence_index: u32,
}

/// Iterator over the occurrence dates of a template.
///
/// Deterministic: re-enumerating from the same template yields the same
/// sequence. Regardless of the end condition, the iterator never yields more
/// than [`MAX_OCCURRENCES`] items.
#[derive(Debug, Clone)]
pub struct OccurrenceIter<'a> {
    template: &'a RecurringTemplate,
    next_date: NaiveDate,
    index: u32,
    cap: Option<u32>,
}

/// Builds the occurrence iterator for a template.
///
/// `cap` bounds the enumeration for previews. A never-ending template without
/// a cap is rejected here; a full materialization of it could not terminate.
pub fn occurrences(template: &RecurringTemplate, cap: Option<u32>) -> Result<OccurrenceIter<'_>> {
    template.validate()?;
    if matches!(template.end, EndCondition::Never) && cap.is_none() {
        return Err(EngineError::InvalidTemplate(
            "never-ending recurrence requires an explicit enumeration cap".into(),
        ));
    }
    Ok(OccurrenceIter {
        template,
        next_date: template.start_date,
        index: 0,
        cap,
    })
}

impl Iterator for OccurrenceIter<'_> {
    type Item = Occurrence;

    fn next(&mut self) -> Option<Occurrence> {
        if let Some(cap) = self.cap {
            if self.index >= cap {
                return None;
            }
        }
        if self.index >= MAX_OCCURRENCES {
            return None;
        }
        match self.template.end {
            EndCondition::OnDate(end_date) if self.next_date > end_date => return None,
            EndCondition::AfterOccurrences(limit) if self.index >= limit => return None,
            _ => {}
        }
        let occurrence = Occurrence {
            date: self.next_date,
            sequence_index: self.index,
        };
        self.next_date = self.template.interval.next_date(self.next_date);
        self.index += 1;
        Some(occurrence)
    }
}

/// Counts the occurrences a template would produce, without allocating.
///
/// Fails with [`EngineError::LimitExceeded`] when the configured termination
/// needs more than [`MAX_OCCURRENCES`] occurrences. The materializer runs
/// this before the first store write so an oversized rule is rejected while
/// nothing has been persisted.
pub fn count_occurrences(template: &RecurringTemplate) -> Result<u32> {
    template.validate()?;
    if matches!(template.end, EndCondition::Never) {
        return Err(EngineError::InvalidTemplate(
            "never-ending recurrence cannot be fully materialized".into(),
        ));
    }
    let mut date = template.start_date;
    let mut count = 0u32;
    loop {
        match template.end {
            EndCondition::OnDate(end_date) if date > end_date => break,
            EndCondition::AfterOccurrences(limit) if count >= limit => break,
            _ => {}
        }
        if count >= MAX_OCCURRENCES {
            return Err(EngineError::LimitExceeded {
                required: count + 1,
                cap: MAX_OCCURRENCES,
            });
        }
        count += 1;
        date = template.interval.next_date(date);
    }
    Ok(count)
}

#[cfg(test)]
mod tests {
    use crate::schedule::{ConflictStrategy, TimeInterval, TimeUnit, TransactionKind};

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn monthly_template(start: NaiveDate, end: EndCondition) -> RecurringTemplate {
        RecurringTemplate::new(
            1200.0,
            "Rent",
            "Housing",
            TransactionKind::Expense,
            TimeInterval::new(1, TimeUnit::Month),
            start,
        )
        .with_end(end)
        .with_strategy(ConflictStrategy::Skip)
    }

    #[test]
    fn monthly_from_the_31st_clamps_each_occurrence() {
        let template = monthly_template(date(2025, 1, 31), EndCondition::AfterOccurrences(3));
        let dates: Vec<_> = occurrences(&template, None)
            .unwrap()
            .map(|occurrence| occurrence.date)
            .collect();
        assert_eq!(
            dates,
            vec![date(2025, 1, 31), date(2025, 2, 28), date(2025, 3, 31)]
        );
    }

    #[test]
    fn sequence_indices_start_at_zero() {
        let template = monthly_template(date(2025, 1, 1), EndCondition::AfterOccurrences(2));
        let indices: Vec<_> = occurrences(&template, None)
            .unwrap()
            .map(|occurrence| occurrence.sequence_index)
            .collect();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn on_date_end_is_inclusive() {
        let template = monthly_template(date(2025, 1, 1), EndCondition::OnDate(date(2025, 3, 1)));
        let dates: Vec<_> = occurrences(&template, None)
            .unwrap()
            .map(|occurrence| occurrence.date)
            .collect();
        assert_eq!(
            dates,
            vec![date(2025, 1, 1), date(2025, 2, 1), date(2025, 3, 1)]
        );
    }

    #[test]
    fn never_ending_requires_a_cap() {
        let template = monthly_template(date(2025, 1, 1), EndCondition::Never);
        assert!(occurrences(&template, None).is_err());
        let preview: Vec<_> = occurrences(&template, Some(5)).unwrap().collect();
        assert_eq!(preview.len(), 5);
    }

    #[test]
    fn cap_bounds_any_end_condition() {
        let template = monthly_template(date(2025, 1, 1), EndCondition::AfterOccurrences(100));
        assert_eq!(occurrences(&template, Some(7)).unwrap().count(), 7);
    }

    #[test]
    fn count_matches_enumeration() {
        let template = monthly_template(date(2025, 1, 15), EndCondition::OnDate(date(2025, 6, 20)));
        let counted = count_occurrences(&template).unwrap();
        let enumerated = occurrences(&template, None).unwrap().count() as u32;
        assert_eq!(counted, enumerated);
        assert_eq!(counted, 6);
    }

    #[test]
    fn oversized_date_range_exceeds_the_hard_cap() {
        let mut template =
            monthly_template(date(2025, 1, 1), EndCondition::OnDate(date(2030, 1, 1)));
        template.interval = TimeInterval::new(1, TimeUnit::Day);
        let err = count_occurrences(&template).unwrap_err();
        assert!(matches!(err, EngineError::LimitExceeded { cap: 1000, .. }));
    }

    #[test]
    fn iterator_never_exceeds_the_hard_cap() {
        let mut template =
            monthly_template(date(2025, 1, 1), EndCondition::OnDate(date(2030, 1, 1)));
        template.interval = TimeInterval::new(1, TimeUnit::Day);
        assert_eq!(occurrences(&template, None).unwrap().count(), 1000);
    }

    #[test]
    fn re_enumeration_is_deterministic() {
        let template = monthly_template(date(2025, 1, 31), EndCondition::AfterOccurrences(12));
        let first: Vec<_> = occurrences(&template, None).unwrap().collect();
        let second: Vec<_> = occurrences(&template, None).unwrap().collect();
        assert_eq!(first, second);
    }
}
