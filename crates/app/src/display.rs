//! Terminal output helpers

use chrono::{DateTime, Local, Utc};
use kakeibo::review::{DraftOrigin, ReviewDraft};
use kakeibo_core::{ExpenseRecord, Yen};

pub fn success(message: &str) {
    println!("  ✓ {message}");
}

pub fn error(message: &str) {
    eprintln!("  ✗ {message}");
}

pub fn warning(message: &str) {
    println!("  ⚠ {message}");
}

pub fn labeled(label: &str, value: &str) {
    println!("  {label}: {value}");
}

pub fn local_date(date: DateTime<Utc>) -> String {
    date.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string()
}

pub fn draft(draft: &ReviewDraft) {
    let origin = match draft.origin {
        DraftOrigin::Scan => "scan",
        DraftOrigin::Manual => "manual entry",
    };
    println!();
    labeled("Draft", origin);
    labeled("Shop", draft.shop.as_deref().unwrap_or("—"));
    labeled("Date", &local_date(draft.date));
    if let Some(notice) = draft.notice {
        warning(&notice.to_string());
    }
    println!();
    for (i, item) in draft.items.iter().enumerate() {
        println!("  {:>3}. {:<20} {:>10}  {}", i + 1, item.name, item.price.to_string(), item.category);
    }
    println!("  {:>36}", format!("合計 {}", draft.total()));
}

pub fn record_line(record: &ExpenseRecord) {
    println!(
        "  {}  {:<20} {:>10}  {}",
        local_date(record.date),
        record.title(),
        record.total().to_string(),
        record.id
    );
}

pub fn budget(budget: Yen, spent: Yen, remaining: Yen, remaining_percent: f64) {
    labeled("予算", &budget.to_string());
    labeled("支出", &spent.to_string());
    labeled("残り", &remaining.to_string());
    labeled("残り率", &percent(remaining_percent));
}

/// Whole percent, rounded down.
fn percent(value: f64) -> String {
    format!("{}%", value.floor())
}
