use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::category::{Category, LedgerError};
use super::money::Yen;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(pub String);

impl RecordId {
    pub fn generate() -> Self {
        RecordId(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RecordId {
    fn from(s: &str) -> Self {
        RecordId(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub name: String,
    pub price: Yen,
    #[serde(default)]
    pub category: Category,
}

impl LineItem {
    /// Build an item, trimming the name and rejecting blank ones.
    pub fn new(name: &str, price: Yen, category: Category) -> Result<Self, LedgerError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::EmptyItemName);
        }
        Ok(LineItem {
            name: name.to_string(),
            price,
            category,
        })
    }
}

/// One committed purchase. The total is never stored independently of the
/// items; see [`ExpenseRecord::total`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpenseRecord {
    pub id: RecordId,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub date: DateTime<Utc>,
    pub shop: Option<String>,
    pub items: Vec<LineItem>,
}

impl ExpenseRecord {
    /// The timestamp is truncated to whole milliseconds, the persisted precision.
    pub fn new(date: DateTime<Utc>, shop: Option<String>, items: Vec<LineItem>) -> Self {
        ExpenseRecord {
            id: RecordId::generate(),
            date: DateTime::from_timestamp_millis(date.timestamp_millis()).unwrap_or(date),
            shop: normalize_shop(shop),
            items,
        }
    }

    pub fn total(&self) -> Yen {
        self.items.iter().map(|i| i.price).sum()
    }

    /// Label shown in history listings: shop, else the first item, else a dash.
    pub fn title(&self) -> &str {
        self.shop
            .as_deref()
            .or_else(|| self.items.first().map(|i| i.name.as_str()))
            .unwrap_or("—")
    }

    /// Replace the editable fields, keeping identity and timestamp.
    pub fn apply(&mut self, patch: RecordPatch) {
        self.shop = normalize_shop(patch.shop);
        self.items = patch.items;
    }
}

/// Fields a review step may overwrite on an already persisted record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPatch {
    pub shop: Option<String>,
    pub items: Vec<LineItem>,
}

fn normalize_shop(shop: Option<String>) -> Option<String> {
    shop.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn item(name: &str, price: i64) -> LineItem {
        LineItem::new(name, Yen(price), Category::Other).unwrap()
    }

    #[test]
    fn line_item_rejects_blank_name() {
        assert_eq!(
            LineItem::new("   ", Yen(100), Category::Food),
            Err(LedgerError::EmptyItemName)
        );
        assert_eq!(item(" パン ", 150).name, "パン");
    }

    #[test]
    fn total_is_sum_of_items() {
        let r = ExpenseRecord::new(Utc::now(), None, vec![item("a", 100), item("b", 250)]);
        assert_eq!(r.total(), Yen(350));
        let empty = ExpenseRecord::new(Utc::now(), None, vec![]);
        assert_eq!(empty.total(), Yen(0));
    }

    #[test]
    fn title_prefers_shop_then_first_item() {
        let mut r = ExpenseRecord::new(Utc::now(), Some("ローソン".into()), vec![item("おにぎり", 120)]);
        assert_eq!(r.title(), "ローソン");
        r.shop = None;
        assert_eq!(r.title(), "おにぎり");
        r.items.clear();
        assert_eq!(r.title(), "—");
    }

    #[test]
    fn blank_shop_is_dropped() {
        let r = ExpenseRecord::new(Utc::now(), Some("  ".into()), vec![]);
        assert_eq!(r.shop, None);
    }

    #[test]
    fn apply_patch_keeps_id_and_date() {
        let date = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();
        let mut r = ExpenseRecord::new(date, None, vec![item("a", 100)]);
        let id = r.id.clone();
        r.apply(RecordPatch {
            shop: Some("スーパー".into()),
            items: vec![item("b", 300)],
        });
        assert_eq!(r.id, id);
        assert_eq!(r.date, date);
        assert_eq!(r.shop.as_deref(), Some("スーパー"));
        assert_eq!(r.total(), Yen(300));
    }

    #[test]
    fn date_is_kept_to_millisecond_precision() {
        let date = Utc.timestamp_opt(1_700_000_000, 123_456_789).unwrap();
        let r = ExpenseRecord::new(date, None, vec![]);
        assert_eq!(r.date.timestamp_millis(), 1_700_000_000_123);
        assert_eq!(r.date.timestamp_subsec_nanos(), 123_000_000);
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(RecordId::generate(), RecordId::generate());
    }
}
