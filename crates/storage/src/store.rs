use kakeibo_core::{
    ExpenseBook, ExpenseRecord, LedgerError, RecordId, RecordPatch, Yen, DEFAULT_BUDGET,
};
use serde_json::Value;
use thiserror::Error;

use crate::db::{self, DbPool};
use crate::schema;

/// Key holding the JSON list of records, most recent first.
pub const RECORDS_KEY: &str = "ocr_items";
/// Key holding the budget as a stringified number.
pub const BUDGET_KEY: &str = "app_budget";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("Stored value under '{key}' is corrupt: {reason}")]
    Corrupt { key: &'static str, reason: String },
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Durable home of the [`ExpenseBook`].
///
/// Every mutation is read-modify-write of the whole list; last write wins.
#[derive(Debug, Clone)]
pub struct ExpenseStore {
    pool: DbPool,
    default_budget: Yen,
}

impl ExpenseStore {
    pub fn new(pool: DbPool) -> Self {
        Self {
            pool,
            default_budget: DEFAULT_BUDGET,
        }
    }

    /// Budget reported while none has been set.
    pub fn with_default_budget(mut self, budget: Yen) -> Self {
        self.default_budget = budget;
        self
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    pub async fn load(&self) -> Result<ExpenseBook, StoreError> {
        let stored = self.load_records().await?;
        let budget = self.load_budget().await?;
        Ok(ExpenseBook::new(stored.records, budget))
    }

    /// Prepend `record` and persist the full list.
    pub async fn add_record(&self, record: ExpenseRecord) -> Result<(), StoreError> {
        let mut stored = self.load_records().await?;
        tracing::info!(id = %record.id, total = record.total().amount(), "adding expense record");
        stored.records.insert(0, record);
        self.save_records(&stored.records, &stored.unreadable).await
    }

    /// Overwrite shop and items of the newest record, keeping its id and date.
    pub async fn update_most_recent(&self, patch: RecordPatch) -> Result<ExpenseRecord, StoreError> {
        let stored = self.load_records().await?;
        let mut book = ExpenseBook::new(stored.records, self.default_budget);
        let updated = book.update_most_recent(patch)?.clone();
        tracing::info!(id = %updated.id, total = updated.total().amount(), "updated most recent record");
        self.save_records(book.records(), &stored.unreadable).await?;
        Ok(updated)
    }

    pub async fn delete_record(&self, id: &RecordId) -> Result<ExpenseRecord, StoreError> {
        let stored = self.load_records().await?;
        let mut book = ExpenseBook::new(stored.records, self.default_budget);
        let removed = book.remove(id)?;
        tracing::info!(id = %removed.id, "deleted expense record");
        self.save_records(book.records(), &stored.unreadable).await?;
        Ok(removed)
    }

    /// Delete by position in the most-recent-first list.
    pub async fn delete_at(&self, index: usize) -> Result<ExpenseRecord, StoreError> {
        let stored = self.load_records().await?;
        let mut book = ExpenseBook::new(stored.records, self.default_budget);
        let removed = book.remove_at(index)?;
        tracing::info!(id = %removed.id, index, "deleted expense record");
        self.save_records(book.records(), &stored.unreadable).await?;
        Ok(removed)
    }

    pub async fn set_budget(&self, amount: Yen) -> Result<(), StoreError> {
        tracing::info!(budget = amount.amount(), "setting budget");
        db::set_value(&self.pool, BUDGET_KEY, &amount.amount().to_string()).await?;
        Ok(())
    }

    async fn load_budget(&self) -> Result<Yen, StoreError> {
        match db::get_value(&self.pool, BUDGET_KEY).await? {
            None => Ok(self.default_budget),
            Some(raw) => Yen::parse(&raw).map_err(|_| StoreError::Corrupt {
                key: BUDGET_KEY,
                reason: format!("not a number: '{raw}'"),
            }),
        }
    }

    /// Read the list, normalising older shapes. When anything needed
    /// normalising, the canonical list is written back once. Entries that
    /// cannot be read are never dropped: they are carried along as stored.
    async fn load_records(&self) -> Result<StoredList, StoreError> {
        let Some(raw) = db::get_value(&self.pool, RECORDS_KEY).await? else {
            return Ok(StoredList::default());
        };

        let entries: Vec<Value> = serde_json::from_str(&raw).map_err(|e| StoreError::Corrupt {
            key: RECORDS_KEY,
            reason: e.to_string(),
        })?;

        let mut stored = StoredList {
            records: Vec::with_capacity(entries.len()),
            unreadable: Vec::new(),
        };
        let mut migrated = 0usize;
        let mut out_of_place = false;
        for entry in entries {
            match schema::normalize(&entry) {
                Some(n) => {
                    migrated += usize::from(n.migrated);
                    out_of_place |= !stored.unreadable.is_empty();
                    stored.records.push(n.record);
                }
                None => {
                    tracing::warn!(entry = %entry, "keeping unreadable expense record as stored");
                    stored.unreadable.push(entry);
                }
            }
        }

        // Readable entries after an unreadable one move ahead of it on write.
        if migrated > 0 {
            tracing::info!(
                migrated,
                total = stored.records.len(),
                kept = stored.unreadable.len(),
                reordered = out_of_place,
                "migrated stored expense records"
            );
            self.save_records(&stored.records, &stored.unreadable).await?;
        }

        Ok(stored)
    }

    /// Write records in canonical form, followed by any unreadable entries
    /// exactly as they were read.
    async fn save_records(
        &self,
        records: &[ExpenseRecord],
        unreadable: &[Value],
    ) -> Result<(), StoreError> {
        let list: Vec<Value> = records
            .iter()
            .map(schema::to_stored)
            .chain(unreadable.iter().cloned())
            .collect();
        let json = serde_json::to_string(&list).map_err(|e| StoreError::Corrupt {
            key: RECORDS_KEY,
            reason: e.to_string(),
        })?;
        db::set_value(&self.pool, RECORDS_KEY, &json).await?;
        Ok(())
    }
}

/// The stored list split into what could be read and what could not.
#[derive(Debug, Default)]
struct StoredList {
    records: Vec<ExpenseRecord>,
    unreadable: Vec<Value>,
}
