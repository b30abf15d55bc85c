use chrono::NaiveDate;
use uuid::Uuid;

use recurrence_core::{
    MemoryTransactionStore, NewTransaction, RecurringTemplate, StoreError, TimeInterval, TimeUnit,
    TransactionKind, TransactionStore,
};

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Monthly expense template used by most flows; callers attach the end
/// condition and conflict strategy they exercise.
pub fn rent_template(start: NaiveDate) -> RecurringTemplate {
    RecurringTemplate::new(
        1500.0,
        "Rent",
        "Housing",
        TransactionKind::Expense,
        TimeInterval::new(1, TimeUnit::Month),
        start,
    )
}

/// Seeds a pre-existing transaction into the given cell so runs collide
/// with it.
pub fn seed_cell(
    store: &mut MemoryTransactionStore,
    date: NaiveDate,
    category: &str,
    subcategory: Option<&str>,
) -> Uuid {
    store.insert(NewTransaction {
        date,
        amount: 10.0,
        description: "Existing entry".into(),
        category: category.into(),
        subcategory: subcategory.map(Into::into),
        kind: TransactionKind::Expense,
        series_id: None,
        sequence_index: None,
    })
}

/// Store wrapper that fails selected create calls (1-based), for exercising
/// partial-failure handling.
pub struct FlakyStore {
    inner: MemoryTransactionStore,
    fail_on: Vec<u32>,
    creates: u32,
}

impl FlakyStore {
    pub fn failing_on(fail_on: Vec<u32>) -> Self {
        Self {
            inner: MemoryTransactionStore::new(),
            fail_on,
            creates: 0,
        }
    }

    pub fn inner(&self) -> &MemoryTransactionStore {
        &self.inner
    }
}

impl TransactionStore for FlakyStore {
    fn find_by_cell(
        &self,
        date: NaiveDate,
        category: &str,
        subcategory: Option<&str>,
    ) -> Result<Option<Uuid>, StoreError> {
        self.inner.find_by_cell(date, category, subcategory)
    }

    fn create(&mut self, transaction: NewTransaction) -> Result<Uuid, StoreError> {
        self.creates += 1;
        if self.fail_on.contains(&self.creates) {
            return Err(StoreError::Unavailable("simulated outage".into()));
        }
        self.inner.create(transaction)
    }
}
