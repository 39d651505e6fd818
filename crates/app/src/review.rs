//! The editable draft a user reviews before a purchase is committed.

use chrono::{DateTime, Utc};
use kakeibo_core::{Category, LedgerError, LineItem, RecordPatch, Yen};
use kakeibo_ocr::{ScanNotice, ScanOutcome};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReviewError {
    #[error("No item at position {0}")]
    ItemOutOfRange(usize),
    #[error("Nothing to save: the draft has no items")]
    NoItems,
    #[error("The date of a manual entry is fixed when it is started")]
    DateLocked,
    #[error("Expected NAME=PRICE[=CATEGORY], got '{0}'")]
    BadEntry(String),
    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

/// Where a draft came from. Decides how a commit is persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftOrigin {
    /// A receipt scan; committing adds a new record.
    Scan,
    /// A manual entry, already saved as a pending record; committing
    /// overwrites that most recent record.
    Manual,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewDraft {
    pub origin: DraftOrigin,
    pub shop: Option<String>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub date: DateTime<Utc>,
    pub items: Vec<LineItem>,
    #[serde(default)]
    pub ocr_text: Option<String>,
    #[serde(default)]
    pub notice: Option<ScanNotice>,
}

impl ReviewDraft {
    pub fn from_scan(outcome: ScanOutcome, date: DateTime<Utc>) -> Self {
        let notice = outcome.notice();
        ReviewDraft {
            origin: DraftOrigin::Scan,
            shop: None,
            date: whole_millis(date),
            items: outcome.items,
            ocr_text: outcome.ocr_text,
            notice,
        }
    }

    pub fn manual(shop: Option<String>, items: Vec<LineItem>, date: DateTime<Utc>) -> Self {
        ReviewDraft {
            origin: DraftOrigin::Manual,
            shop: non_blank(shop),
            date: whole_millis(date),
            items,
            ocr_text: None,
            notice: None,
        }
    }

    /// Recomputed on every call; there is no separate running total.
    pub fn total(&self) -> Yen {
        self.items.iter().map(|i| i.price).sum()
    }

    pub fn set_shop(&mut self, shop: Option<String>) {
        self.shop = non_blank(shop);
    }

    pub fn set_date(&mut self, date: DateTime<Utc>) -> Result<(), ReviewError> {
        if self.origin == DraftOrigin::Manual {
            return Err(ReviewError::DateLocked);
        }
        self.date = whole_millis(date);
        Ok(())
    }

    pub fn add_item(&mut self, item: LineItem) {
        self.items.push(item);
    }

    pub fn remove_item(&mut self, index: usize) -> Result<LineItem, ReviewError> {
        self.check(index)?;
        Ok(self.items.remove(index))
    }

    pub fn rename_item(&mut self, index: usize, name: &str) -> Result<(), ReviewError> {
        self.check(index)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::EmptyItemName.into());
        }
        self.items[index].name = name.to_string();
        Ok(())
    }

    /// Unparseable text leaves the price untouched.
    pub fn set_price(&mut self, index: usize, text: &str) -> Result<Yen, ReviewError> {
        self.check(index)?;
        let price = Yen::parse(text)?;
        self.items[index].price = price;
        Ok(price)
    }

    pub fn set_category(&mut self, index: usize, category: Category) -> Result<(), ReviewError> {
        self.check(index)?;
        self.items[index].category = category;
        Ok(())
    }

    /// Consume the draft into what gets persisted. Rows with blank names
    /// are dropped; a draft left with no rows cannot be committed.
    pub fn into_patch(self) -> Result<RecordPatch, ReviewError> {
        let items: Vec<LineItem> = self
            .items
            .into_iter()
            .filter(|i| !i.name.trim().is_empty())
            .collect();
        if items.is_empty() {
            return Err(ReviewError::NoItems);
        }
        Ok(RecordPatch {
            shop: self.shop,
            items,
        })
    }

    fn check(&self, index: usize) -> Result<(), ReviewError> {
        if index < self.items.len() {
            Ok(())
        } else {
            Err(ReviewError::ItemOutOfRange(index))
        }
    }
}

/// Parse one `NAME=PRICE[=CATEGORY]` manual entry. Category defaults to
/// food, matching the manual form.
pub fn parse_manual_item(entry: &str) -> Result<LineItem, ReviewError> {
    let mut parts = entry.splitn(3, '=');
    let (name, price) = match (parts.next(), parts.next()) {
        (Some(name), Some(price)) => (name, price),
        _ => return Err(ReviewError::BadEntry(entry.to_string())),
    };
    let category = match parts.next() {
        Some(c) => c.trim().parse::<Category>()?,
        None => Category::Food,
    };
    Ok(LineItem::new(name, Yen::parse(price)?, category)?)
}

/// Drafts are persisted with millisecond timestamps.
fn whole_millis(date: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(date.timestamp_millis()).unwrap_or(date)
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}
