//! Persisted record layout and normalisation of older shapes.
//!
//! Three shapes have been written to the `ocr_items` list over time:
//!
//! * `{ items: [{ item, price, category }], shop, date, total }` from the
//!   receipt review screen,
//! * the same without `total`, with prices kept as the raw form text,
//!   from the manual entry form,
//! * a flat `{ item, price, date }` from the first release.
//!
//! All of them read into [`ExpenseRecord`]. Writes always use the canonical
//! shape produced by [`to_stored`].

use chrono::{DateTime, Utc};
use kakeibo_core::{Category, ExpenseRecord, LineItem, RecordId, Yen};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

const UNNAMED_ITEM: &str = "—";

// ── Canonical write shape ────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct StoredRecordOut<'a> {
    id: &'a str,
    date: i64,
    shop: Option<&'a str>,
    items: Vec<StoredItemOut<'a>>,
    /// Snapshot of the derived total, for readers of the raw layout.
    total: i64,
}

#[derive(Debug, Serialize)]
struct StoredItemOut<'a> {
    name: &'a str,
    price: i64,
    category: Category,
}

pub fn to_stored(record: &ExpenseRecord) -> Value {
    let out = StoredRecordOut {
        id: record.id.as_str(),
        date: record.date.timestamp_millis(),
        shop: record.shop.as_deref(),
        items: record
            .items
            .iter()
            .map(|i| StoredItemOut {
                name: &i.name,
                price: i.price.amount(),
                category: i.category,
            })
            .collect(),
        total: record.total().amount(),
    };
    serde_json::to_value(out).unwrap_or(Value::Null)
}

// ── Tolerant read shape ──────────────────────────────────────────────────────

// Every field reads leniently, so any JSON object deserializes. Only a
// non-object entry, or an `items` element that is neither an object nor
// null, makes an entry unreadable.
#[derive(Debug, Default, Deserialize)]
struct StoredRecordIn {
    #[serde(default, deserialize_with = "lenient_text")]
    id: Option<String>,
    #[serde(default, deserialize_with = "lenient_millis")]
    date: Option<i64>,
    #[serde(default, deserialize_with = "lenient_text")]
    shop: Option<String>,
    #[serde(default, deserialize_with = "lenient_items")]
    items: Option<Vec<StoredItemIn>>,
    #[serde(default, deserialize_with = "lenient_amount")]
    total: Option<i64>,
    // Flat shape.
    #[serde(default, deserialize_with = "lenient_text")]
    item: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    price: Option<i64>,
}

/// Rows from the review screen carry `name`; renaming a row there adds an
/// `item` key next to it, which then holds the user's edit.
#[derive(Debug, Default, Deserialize)]
struct StoredItemIn {
    #[serde(default, deserialize_with = "lenient_text")]
    name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    item: Option<String>,
    #[serde(default, deserialize_with = "lenient_amount")]
    price: Option<i64>,
    #[serde(default, deserialize_with = "lenient_text")]
    category: Option<String>,
}

/// Outcome of reading one stored entry.
#[derive(Debug)]
pub struct Normalized {
    pub record: ExpenseRecord,
    /// The stored JSON differs from the canonical shape and should be rewritten.
    pub migrated: bool,
}

/// Read one entry of the stored list. `None` when the entry cannot be read;
/// the caller keeps such entries as stored.
pub fn normalize(raw: &Value) -> Option<Normalized> {
    if !raw.is_object() {
        return None;
    }
    let stored = StoredRecordIn::deserialize(raw).ok()?;
    let stored_total = stored.total;

    let items = match stored.items {
        Some(items) => items.into_iter().filter_map(normalize_item).collect(),
        None if stored.item.is_some() || stored.price.is_some() => {
            let name = non_blank(stored.item).unwrap_or_else(|| UNNAMED_ITEM.to_string());
            vec![LineItem {
                name,
                price: Yen(stored.price.unwrap_or(0)),
                category: Category::Other,
            }]
        }
        None => Vec::new(),
    };

    let record = ExpenseRecord {
        id: stored.id.map(RecordId).unwrap_or_else(RecordId::generate),
        date: stored
            .date
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        shop: non_blank(stored.shop),
        items,
    };

    if let Some(total) = stored_total {
        if total != record.total().amount() {
            tracing::warn!(
                id = %record.id,
                stored = total,
                derived = record.total().amount(),
                "stored total disagrees with items; using item sum"
            );
        }
    }

    let migrated = to_stored(&record) != *raw;
    Some(Normalized { record, migrated })
}

fn normalize_item(item: StoredItemIn) -> Option<LineItem> {
    let price = item.price.unwrap_or(0);
    let name = match non_blank(item.item).or_else(|| non_blank(item.name)) {
        Some(name) => name,
        // An untouched blank row from the manual form.
        None if price == 0 => return None,
        None => UNNAMED_ITEM.to_string(),
    };
    let category = item
        .category
        .and_then(|c| c.parse::<Category>().ok())
        .unwrap_or_default();
    Some(LineItem {
        name,
        price: Yen(price),
        category,
    })
}

fn non_blank(s: Option<String>) -> Option<String> {
    s.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

// ── Lenient scalar readers ───────────────────────────────────────────────────

/// Strings, or numbers in their JSON form; anything else reads as absent.
fn lenient_text<'de, D: Deserializer<'de>>(d: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// A list of item objects. `null` elements are skipped; any other non-object
/// element fails the whole entry so that it is kept rather than rewritten.
fn lenient_items<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Vec<StoredItemIn>>, D::Error> {
    let Some(Value::Array(elements)) = Option::<Value>::deserialize(d)? else {
        return Ok(None);
    };
    let mut items = Vec::with_capacity(elements.len());
    for element in elements {
        match element {
            Value::Null => {}
            Value::Object(_) => {
                items.push(StoredItemIn::deserialize(element).map_err(D::Error::custom)?)
            }
            other => return Err(D::Error::custom(format!("unreadable item: {other}"))),
        }
    }
    Ok(Some(items))
}

/// Numbers or numeric strings; anything else reads as absent.
fn lenient_amount<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(value.as_ref().and_then(amount_from_value))
}

fn amount_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.round() as i64)),
        Value::String(s) => Yen::parse(s).ok().map(Yen::amount),
        _ => None,
    }
}

/// Epoch milliseconds, or an RFC 3339 string.
fn lenient_millis<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    let value = Option::<Value>::deserialize(d)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(&s)
            .ok()
            .map(|d| d.timestamp_millis()),
        _ => None,
    })
}
