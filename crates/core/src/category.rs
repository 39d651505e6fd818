use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::record::RecordId;

/// Spending category a line item is filed under.
///
/// Persisted by its Japanese label so that stored history stays readable
/// by earlier versions of the app.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "食材")]
    Food,
    #[serde(rename = "飲み物")]
    Drink,
    #[serde(rename = "おやつ")]
    Snack,
    #[serde(rename = "外食")]
    DiningOut,
    #[default]
    #[serde(rename = "他")]
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Food,
        Category::Drink,
        Category::Snack,
        Category::DiningOut,
        Category::Other,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Food => "食材",
            Category::Drink => "飲み物",
            Category::Snack => "おやつ",
            Category::DiningOut => "外食",
            Category::Other => "他",
        }
    }

    pub fn slug(self) -> &'static str {
        match self {
            Category::Food => "food",
            Category::Drink => "drink",
            Category::Snack => "snack",
            Category::DiningOut => "dining-out",
            Category::Other => "other",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        Category::ALL
            .into_iter()
            .find(|c| c.label() == s || c.slug().eq_ignore_ascii_case(s))
            .ok_or_else(|| LedgerError::UnknownCategory(s.to_string()))
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Not a number: '{0}'")]
    InvalidAmount(String),
    #[error("Line item name must not be empty")]
    EmptyItemName,
    #[error("Unknown category: '{0}'")]
    UnknownCategory(String),
    #[error("Invalid month: '{0}' (expected YYYY-MM)")]
    InvalidMonth(String),
    #[error("There are no records yet")]
    NoRecords,
    #[error("Record not found: {0}")]
    RecordNotFound(RecordId),
    #[error("No record at position {0}")]
    IndexOutOfRange(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_label_and_slug() {
        assert_eq!("外食".parse::<Category>().unwrap(), Category::DiningOut);
        assert_eq!("dining-out".parse::<Category>().unwrap(), Category::DiningOut);
        assert_eq!("Drink".parse::<Category>().unwrap(), Category::Drink);
        assert!(matches!(
            "coffee".parse::<Category>(),
            Err(LedgerError::UnknownCategory(_))
        ));
    }

    #[test]
    fn serializes_as_label() {
        assert_eq!(serde_json::to_string(&Category::Snack).unwrap(), "\"おやつ\"");
        let c: Category = serde_json::from_str("\"他\"").unwrap();
        assert_eq!(c, Category::Other);
    }

    #[test]
    fn default_is_other() {
        assert_eq!(Category::default(), Category::Other);
    }
}
