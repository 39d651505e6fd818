use std::sync::OnceLock;

use kakeibo_core::{Category, LineItem, Yen};
use regex::Regex;
use serde::{Deserialize, Serialize};

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

// Name, whitespace, optional yen mark, 2–5 digits, optional 円. Only the
// start of the line is anchored; trailing text after the digits is ignored.
re!(re_inline_item, r"^(.+?)\s+¥?\s*([0-9]{2,5})円?");
// A line holding nothing but a price.
re!(re_price_line, r"^¥?\s*([0-9,]+)\s*$");

// ── Configuration ────────────────────────────────────────────────────────────

/// Tuning knobs for [`Extractor`]. Loaded from the `[extract]` config table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// Inclusive lower bound for a believable item price.
    pub min_price: i64,
    /// Inclusive upper bound for a believable item price.
    pub max_price: i64,
    /// Terms marking receipt metadata (totals, tax, change, points, …).
    pub skip_keywords: Vec<String>,
    /// Extra terms that disqualify a name line in the two-line rule.
    pub quantity_markers: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        let words = |ws: &[&str]| ws.iter().map(|w| w.to_string()).collect();
        ExtractorConfig {
            min_price: 30,
            max_price: 10_000,
            skip_keywords: words(&[
                "合計", "小計", "税込", "割引", "釣り", "現金", "ポイント", "点", "数量", "個",
            ]),
            quantity_markers: words(&["数量", "個"]),
        }
    }
}

// ── Public extraction API ─────────────────────────────────────────────────────

/// Turns raw OCR text into candidate line items.
///
/// Single forward pass over trimmed lines. A line is either an inline
/// `name price` pair, or a name whose price sits alone on the following
/// line. Anything else is skipped. Never fails: unusable text just yields
/// fewer items.
#[derive(Debug, Clone, Default)]
pub struct Extractor {
    config: ExtractorConfig,
}

impl Extractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    pub fn extract(&self, ocr_text: &str) -> Vec<LineItem> {
        let lines: Vec<&str> = ocr_text.split('\n').map(str::trim).collect();
        let mut items = Vec::new();

        let mut i = 0;
        while i < lines.len() {
            let current = lines[i];

            if let Some(c) = re_inline_item().captures(current) {
                let name = c.get(1).map_or("", |m| m.as_str()).trim();
                let price = c.get(2).and_then(|m| parse_price(m.as_str()));
                if let Some(price) = price {
                    if self.is_item_name(name) && self.in_range(price) {
                        items.push(candidate(name, price));
                    }
                }
                // An inline-shaped line never pairs with the next one.
                i += 1;
                continue;
            }

            if let Some(next) = lines.get(i + 1) {
                let price = re_price_line()
                    .captures(next)
                    .and_then(|c| c.get(1))
                    .and_then(|m| parse_price(m.as_str()));
                if let Some(price) = price {
                    if self.is_item_name(current)
                        && !self.has_quantity_marker(current)
                        && self.in_range(price)
                    {
                        items.push(candidate(current, price));
                        i += 1;
                    }
                }
            }

            i += 1;
        }

        tracing::debug!(lines = lines.len(), candidates = items.len(), "extracted line items");
        items
    }

    fn is_item_name(&self, name: &str) -> bool {
        !name.is_empty() && !self.config.skip_keywords.iter().any(|k| name.contains(k.as_str()))
    }

    fn has_quantity_marker(&self, name: &str) -> bool {
        self.config.quantity_markers.iter().any(|k| name.contains(k.as_str()))
    }

    fn in_range(&self, price: i64) -> bool {
        (self.config.min_price..=self.config.max_price).contains(&price)
    }
}

fn candidate(name: &str, price: i64) -> LineItem {
    LineItem {
        name: name.to_string(),
        price: Yen(price),
        category: Category::Other,
    }
}

// ── Price parsing ─────────────────────────────────────────────────────────────

fn parse_price(s: &str) -> Option<i64> {
    s.replace(',', "").parse().ok()
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> Vec<(String, i64)> {
        Extractor::default()
            .extract(text)
            .into_iter()
            .map(|i| (i.name, i.price.amount()))
            .collect()
    }

    fn pair(name: &str, price: i64) -> (String, i64) {
        (name.to_string(), price)
    }

    // ── Inline ───────────────────────────────────────────────────────────────

    #[test]
    fn inline_item_and_total_line_skipped() {
        assert_eq!(extract("コーヒー ¥380円\n合計 ¥380"), vec![pair("コーヒー", 380)]);
    }

    #[test]
    fn inline_with_ideographic_space() {
        assert_eq!(extract("コーヒー　¥380円"), vec![pair("コーヒー", 380)]);
    }

    #[test]
    fn inline_without_currency_marks() {
        assert_eq!(
            extract("牛丼 並盛 610\nサラダ 150"),
            vec![pair("牛丼 並盛", 610), pair("サラダ", 150)]
        );
    }

    #[test]
    fn inline_price_bounds_are_inclusive() {
        assert_eq!(
            extract("ガム 29\nアメ 30\n家電 10000\n家具 10001"),
            vec![pair("アメ", 30), pair("家電", 10000)]
        );
    }

    #[test]
    fn long_digit_run_reads_first_five_digits() {
        // 123456 reads as 12345, which is over the ceiling.
        assert!(extract("高級品 123456").is_empty());
    }

    #[test]
    fn skip_keywords_reject_metadata_lines() {
        let text = "小計 ¥1200\n税込 ¥1296\nお釣り ¥704\n現金 ¥2000\nポイント 12\n3点 ¥1296";
        assert!(extract(text).is_empty());
    }

    #[test]
    fn rejected_inline_line_does_not_pair_with_next() {
        // "ガム 20" is inline-shaped but out of range; "150" must not be
        // treated as its price.
        assert!(extract("ガム 20\n150").is_empty());
    }

    // ── Two-line ─────────────────────────────────────────────────────────────

    #[test]
    fn two_line_pair() {
        assert_eq!(extract("おにぎり\n¥120"), vec![pair("おにぎり", 120)]);
    }

    #[test]
    fn two_line_price_line_is_consumed() {
        // The consumed "¥150" is not reconsidered as a name for "¥200".
        assert_eq!(extract("パン\n¥150\n¥200"), vec![pair("パン", 150)]);
    }

    #[test]
    fn two_line_accepts_thousands_separator() {
        assert_eq!(extract("ワイン\n¥1,280"), vec![pair("ワイン", 1280)]);
    }

    #[test]
    fn two_line_rejects_trailing_text_on_price_line() {
        assert!(extract("ワイン\n¥1,280 税込").is_empty());
    }

    #[test]
    fn two_line_rejects_blank_name_and_out_of_range() {
        assert!(extract("\n¥300").is_empty());
        assert!(extract("ガム\n¥10\nテレビ\n¥50,000").is_empty());
    }

    #[test]
    fn two_line_handles_crlf() {
        assert_eq!(extract("おにぎり\r\n¥120\r\n"), vec![pair("おにぎり", 120)]);
    }

    #[test]
    fn mixed_layout_preserves_order() {
        let text = "セブンイレブン\n2024年5月3日\nおにぎり\n¥120\nお茶 ¥150\nからあげ\n¥230\n合計 ¥500\n現金\n¥1000";
        assert_eq!(
            extract(text),
            vec![pair("おにぎり", 120), pair("お茶", 150), pair("からあげ", 230)]
        );
    }

    // ── Configuration ────────────────────────────────────────────────────────

    #[test]
    fn quantity_markers_only_apply_to_two_line_rule() {
        let extractor = Extractor::new(ExtractorConfig {
            skip_keywords: vec![],
            quantity_markers: vec!["数量".into()],
            ..ExtractorConfig::default()
        });
        let inline: Vec<_> = extractor.extract("数量 300").into_iter().map(|i| i.name).collect();
        assert_eq!(inline, vec!["数量".to_string()]);
        assert!(extractor.extract("数量\n300").is_empty());
    }

    #[test]
    fn custom_price_range() {
        let extractor = Extractor::new(ExtractorConfig {
            min_price: 10,
            max_price: 50_000,
            ..ExtractorConfig::default()
        });
        let prices: Vec<_> = extractor
            .extract("ガム 20\nテレビ\n¥50,000")
            .into_iter()
            .map(|i| i.price.amount())
            .collect();
        assert_eq!(prices, vec![20, 50000]);
    }

    #[test]
    fn config_deserializes_with_defaults() {
        let cfg: ExtractorConfig = serde_json::from_str(r#"{"max_price": 20000}"#).unwrap();
        assert_eq!(cfg.max_price, 20000);
        assert_eq!(cfg.min_price, 30);
        assert!(cfg.skip_keywords.contains(&"合計".to_string()));
    }

    // ── Robustness ───────────────────────────────────────────────────────────

    #[test]
    fn extracted_items_default_to_other_category() {
        let items = Extractor::default().extract("お茶 ¥150");
        assert_eq!(items[0].category, Category::Other);
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(extract("").is_empty());
        assert!(extract("\n\n  \n").is_empty());
    }

    #[test]
    fn no_panic_on_garbage_input() {
        let _ = extract("!@#$%^&*()\n\0\x01\x02\n¥\n¥,,,\n99999999999999999999999");
    }

    #[test]
    fn parse_price_strips_commas() {
        assert_eq!(parse_price("1,280"), Some(1280));
        assert_eq!(parse_price(","), None);
    }
}
