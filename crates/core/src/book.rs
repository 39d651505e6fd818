use chrono::{Local, TimeZone};

use crate::category::LedgerError;
use crate::money::Yen;
use crate::period::Month;
use crate::record::{ExpenseRecord, RecordId, RecordPatch};

pub const DEFAULT_BUDGET: Yen = Yen::new(30_000);

/// The whole household book: every committed record (most recent first)
/// plus the budget scalar. Owned state, mutated only through its methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseBook {
    records: Vec<ExpenseRecord>,
    budget: Yen,
}

impl Default for ExpenseBook {
    fn default() -> Self {
        ExpenseBook::new(Vec::new(), DEFAULT_BUDGET)
    }
}

impl ExpenseBook {
    pub fn new(records: Vec<ExpenseRecord>, budget: Yen) -> Self {
        ExpenseBook { records, budget }
    }

    pub fn records(&self) -> &[ExpenseRecord] {
        &self.records
    }

    pub fn into_records(self) -> Vec<ExpenseRecord> {
        self.records
    }

    pub fn budget(&self) -> Yen {
        self.budget
    }

    pub fn set_budget(&mut self, amount: Yen) {
        self.budget = amount;
    }

    pub fn most_recent(&self) -> Option<&ExpenseRecord> {
        self.records.first()
    }

    pub fn get(&self, id: &RecordId) -> Option<&ExpenseRecord> {
        self.records.iter().find(|r| &r.id == id)
    }

    /// Prepend; the list stays most-recent-first.
    pub fn add(&mut self, record: ExpenseRecord) {
        self.records.insert(0, record);
    }

    pub fn update_most_recent(&mut self, patch: RecordPatch) -> Result<&ExpenseRecord, LedgerError> {
        let first = self.records.first_mut().ok_or(LedgerError::NoRecords)?;
        first.apply(patch);
        Ok(first)
    }

    pub fn remove(&mut self, id: &RecordId) -> Result<ExpenseRecord, LedgerError> {
        let idx = self
            .records
            .iter()
            .position(|r| &r.id == id)
            .ok_or_else(|| LedgerError::RecordNotFound(id.clone()))?;
        Ok(self.records.remove(idx))
    }

    pub fn remove_at(&mut self, index: usize) -> Result<ExpenseRecord, LedgerError> {
        if index >= self.records.len() {
            return Err(LedgerError::IndexOutOfRange(index));
        }
        Ok(self.records.remove(index))
    }

    pub fn total_spent(&self) -> Yen {
        self.records.iter().map(ExpenseRecord::total).sum()
    }

    /// Budget minus everything recorded so far.
    pub fn remaining(&self) -> Yen {
        self.budget - self.total_spent()
    }

    /// Share of the budget still left, in percent, floored at 0. A budget
    /// of zero or less reads as 100.
    pub fn remaining_percent(&self) -> f64 {
        if self.budget.amount() <= 0 {
            return 100.0;
        }
        let budget = self.budget.amount() as f64;
        ((budget - self.total_spent().amount() as f64) / budget * 100.0).max(0.0)
    }

    /// Records whose local calendar date falls in `month`, newest first.
    pub fn records_in_month(&self, month: Month) -> Vec<&ExpenseRecord> {
        self.records_in_month_tz(month, &Local)
    }

    pub fn records_in_month_tz<Tz: TimeZone>(&self, month: Month, tz: &Tz) -> Vec<&ExpenseRecord> {
        let mut hits: Vec<&ExpenseRecord> = self
            .records
            .iter()
            .filter(|r| month.contains(r.date.with_timezone(tz).date_naive()))
            .collect();
        hits.sort_by(|a, b| b.date.cmp(&a.date));
        hits
    }

    pub fn total_for_month(&self, month: Month) -> Yen {
        self.total_for_month_tz(month, &Local)
    }

    pub fn total_for_month_tz<Tz: TimeZone>(&self, month: Month, tz: &Tz) -> Yen {
        self.records_in_month_tz(month, tz)
            .into_iter()
            .map(ExpenseRecord::total)
            .sum()
    }
}
