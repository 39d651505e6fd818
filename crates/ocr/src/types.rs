use kakeibo_core::LineItem;
use serde::{Deserialize, Serialize};

/// Why a scan produced nothing worth reviewing. Not an error: the caller
/// still gets an editable (empty) item list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanNotice {
    /// The OCR service found no text in the image.
    NoText,
    /// Text was found but no line looked like an item.
    NoItems,
}

impl std::fmt::Display for ScanNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ScanNotice::NoText => write!(f, "No text was detected. Try another image."),
            ScanNotice::NoItems => write!(f, "No line items were recognised. Add them by hand."),
        }
    }
}

/// The result of a single receipt scan.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanOutcome {
    /// Full text as returned by the OCR service, if any was detected.
    pub ocr_text: Option<String>,
    /// Candidate items in order of appearance.
    pub items: Vec<LineItem>,
}

impl ScanOutcome {
    pub fn notice(&self) -> Option<ScanNotice> {
        match (&self.ocr_text, self.items.is_empty()) {
            (None, _) => Some(ScanNotice::NoText),
            (Some(_), true) => Some(ScanNotice::NoItems),
            (Some(_), false) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kakeibo_core::{Category, Yen};

    #[test]
    fn notice_for_missing_text() {
        let outcome = ScanOutcome::default();
        assert_eq!(outcome.notice(), Some(ScanNotice::NoText));
    }

    #[test]
    fn notice_for_text_without_items() {
        let outcome = ScanOutcome { ocr_text: Some("合計 ¥500".into()), items: vec![] };
        assert_eq!(outcome.notice(), Some(ScanNotice::NoItems));
    }

    #[test]
    fn no_notice_when_items_found() {
        let outcome = ScanOutcome {
            ocr_text: Some("お茶 150".into()),
            items: vec![LineItem::new("お茶", Yen(150), Category::Other).unwrap()],
        };
        assert_eq!(outcome.notice(), None);
    }
}
