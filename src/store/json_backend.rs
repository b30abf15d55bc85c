//! Filesystem-backed JSON persistence for the transaction ledger.

use std::{
    fs,
    io::Write,
    path::{Path, PathBuf},
};

use chrono::NaiveDate;
use uuid::Uuid;

use crate::errors::Result;

use super::{NewTransaction, StoreError, StoredTransaction, TransactionStore};

const TMP_SUFFIX: &str = "tmp";

/// Stores the transaction ledger as a single JSON document on disk.
///
/// Writes go to a temporary sibling file first and are renamed into place, so
/// a crash mid-save never leaves a truncated ledger behind.
#[derive(Debug)]
pub struct JsonTransactionStore {
    path: PathBuf,
    transactions: Vec<StoredTransaction>,
}

impl JsonTransactionStore {
    /// Opens the store at `path`, loading the ledger file when it exists.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let transactions = if path.exists() {
            let data = fs::read_to_string(&path)?;
            serde_json::from_str(&data)?
        } else {
            Vec::new()
        };
        Ok(Self { path, transactions })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn transactions(&self) -> &[StoredTransaction] {
        &self.transactions
    }

    fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp = tmp_path(&self.path);
        let data = serde_json::to_string_pretty(&self.transactions)?;
        let mut file = fs::File::create(&tmp)?;
        file.write_all(data.as_bytes())?;
        file.flush()?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl TransactionStore for JsonTransactionStore {
    fn find_by_cell(
        &self,
        date: NaiveDate,
        category: &str,
        subcategory: Option<&str>,
    ) -> std::result::Result<Option<Uuid>, StoreError> {
        Ok(self
            .transactions
            .iter()
            .find(|transaction| transaction.cell_matches(date, category, subcategory))
            .map(|transaction| transaction.id))
    }

    fn create(&mut self, transaction: NewTransaction) -> std::result::Result<Uuid, StoreError> {
        let stored = StoredTransaction::from_new(transaction);
        let id = stored.id;
        self.transactions.push(stored);
        if let Err(err) = self.save() {
            // Keep the in-memory view consistent with what is on disk.
            self.transactions.pop();
            return Err(StoreError::Unavailable(err.to_string()));
        }
        Ok(id)
    }
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}
