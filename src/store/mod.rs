//! Transaction store boundary consumed by the materialization engine.
//!
//! The engine only ever needs two operations: an exact-cell lookup used by
//! conflict detection and a create used by materialization. Persistence
//! backends own everything else, including their own concurrency control and
//! operation deadlines.

pub mod json_backend;

pub use json_backend::JsonTransactionStore;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::schedule::TransactionKind;

/// Errors surfaced by transaction store implementations.
///
/// A backend that enforces an operation deadline reports the timeout through
/// `Unavailable` as well; the engine applies the same per-occurrence failure
/// policy either way.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// A transaction record ready to be persisted by the store.
pub struct NewTransaction {
    pub date: NaiveDate,
    pub amount: f64,
    pub description: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub kind: TransactionKind,
    pub series_id: Option<Uuid>,
    pub sequence_index: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
/// A transaction as stored, with its assigned identifier.
pub struct StoredTransaction {
    pub id: Uuid,
    pub date: NaiveDate,
    pub amount: f64,
    pub description: String,
    pub category: String,
    pub subcategory: Option<String>,
    pub kind: TransactionKind,
    pub series_id: Option<Uuid>,
    pub sequence_index: Option<u32>,
    pub created_at: DateTime<Utc>,
}

impl StoredTransaction {
    fn from_new(transaction: NewTransaction) -> Self {
        Self {
            id: Uuid::new_v4(),
            date: transaction.date,
            amount: transaction.amount,
            description: transaction.description,
            category: transaction.category,
            subcategory: transaction.subcategory,
            kind: transaction.kind,
            series_id: transaction.series_id,
            sequence_index: transaction.sequence_index,
            created_at: Utc::now(),
        }
    }

    /// Whether this transaction occupies exactly the given grid cell.
    pub fn cell_matches(&self, date: NaiveDate, category: &str, subcategory: Option<&str>) -> bool {
        self.date == date && self.category == category && self.subcategory.as_deref() == subcategory
    }
}

/// Abstraction over persistence backends holding the transaction ledger.
pub trait TransactionStore: Send + Sync {
    /// Looks up a transaction occupying exactly the given cell. The match is
    /// exact-date, never a range.
    fn find_by_cell(
        &self,
        date: NaiveDate,
        category: &str,
        subcategory: Option<&str>,
    ) -> Result<Option<Uuid>, StoreError>;

    /// Persists a new transaction and returns its identifier.
    fn create(&mut self, transaction: NewTransaction) -> Result<Uuid, StoreError>;
}

#[derive(Debug, Default, Clone)]
/// In-memory reference store, used by tests and by embedders that keep
/// persistence elsewhere.
pub struct MemoryTransactionStore {
    transactions: Vec<StoredTransaction>,
}

impl MemoryTransactionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a transaction directly, bypassing conflict handling. Intended
    /// for seeding fixtures and mirroring pre-existing ledger state.
    pub fn insert(&mut self, transaction: NewTransaction) -> Uuid {
        let stored = StoredTransaction::from_new(transaction);
        let id = stored.id;
        self.transactions.push(stored);
        id
    }

    pub fn transactions(&self) -> &[StoredTransaction] {
        &self.transactions
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}

impl TransactionStore for MemoryTransactionStore {
    fn find_by_cell(
        &self,
        date: NaiveDate,
        category: &str,
        subcategory: Option<&str>,
    ) -> Result<Option<Uuid>, StoreError> {
        Ok(self
            .transactions
            .iter()
            .find(|transaction| transaction.cell_matches(date, category, subcategory))
            .map(|transaction| transaction.id))
    }

    fn create(&mut self, transaction: NewTransaction) -> Result<Uuid, StoreError> {
        Ok(self.insert(transaction))
    }
}
