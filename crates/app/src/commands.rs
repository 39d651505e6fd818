use anyhow::{anyhow, bail, Context as _};
use chrono::{Local, NaiveDate, TimeZone, Utc};
use kakeibo::config::{self, Config};
use kakeibo::flow::CaptureFlow;
use kakeibo::review::parse_manual_item;
use kakeibo_core::{Category, LineItem, Month, RecordId, Yen};
use kakeibo_ocr::{Extractor, ReceiptPipeline, VisionRecognizer};
use kakeibo_storage::{create_db, ExpenseStore};
use std::path::Path;

use crate::display;
use crate::ReviewCommands;

pub struct Context {
    pub config: Config,
    pub flow: CaptureFlow,
}

impl Context {
    pub async fn open(config_path: Option<&Path>, data_dir: Option<&Path>) -> anyhow::Result<Self> {
        let config = Config::load(config_path)?;
        let data_dir = config::data_dir(data_dir)?;
        std::fs::create_dir_all(&data_dir)
            .with_context(|| format!("Failed to create data directory {}", data_dir.display()))?;

        let db = create_db(&config::db_path(&data_dir))
            .await
            .context("Failed to open database")?;
        let store = ExpenseStore::new(db).with_default_budget(config.default_budget());

        Ok(Context {
            config,
            flow: CaptureFlow::new(store),
        })
    }
}

pub async fn scan(ctx: &Context, image: &Path) -> anyhow::Result<()> {
    let recognizer = VisionRecognizer::new(ctx.config.ocr.endpoint.clone(), ctx.config.api_key())
        .with_context(|| format!("Set {} to scan receipts", ctx.config.ocr.api_key_env))?;
    let pipeline = ReceiptPipeline::new(recognizer, Extractor::new(ctx.config.extract.clone()))
        .with_max_dimension(ctx.config.ocr.max_dimension);

    let draft = ctx.flow.scan(&pipeline, image).await?;
    display::draft(&draft);
    Ok(())
}

pub async fn manual(ctx: &Context, shop: Option<String>, entries: &[String]) -> anyhow::Result<()> {
    let mut items = Vec::new();
    for entry in entries {
        match parse_manual_item(entry) {
            Ok(item) => items.push(item),
            Err(e) => display::warning(&format!("Skipped: {e}")),
        }
    }
    if items.is_empty() {
        bail!("No valid items were given");
    }

    let draft = ctx.flow.start_manual(shop, items).await?;
    display::success("Saved; review and commit to update the budget");
    display::draft(&draft);
    Ok(())
}

pub async fn review(ctx: &Context, action: ReviewCommands) -> anyhow::Result<()> {
    let flow = &ctx.flow;
    let mut draft = flow.require_draft().await?;

    match action {
        ReviewCommands::Show => {
            display::draft(&draft);
            return Ok(());
        }
        ReviewCommands::Commit => {
            let done = flow.commit(draft).await?;
            display::success(&format!(
                "Saved {} ({})",
                done.record.title(),
                done.record.total()
            ));
            display::labeled("予算", &done.budget.to_string());
            return Ok(());
        }
        ReviewCommands::Discard => {
            flow.discard_draft().await?;
            display::success("Draft discarded");
            return Ok(());
        }
        ReviewCommands::Shop { name } => draft.set_shop(name),
        ReviewCommands::Date { date } => draft.set_date(parse_date(&date)?)?,
        ReviewCommands::Add {
            name,
            price,
            category,
        } => {
            let category = match category {
                Some(c) => c.parse::<Category>()?,
                None => Category::default(),
            };
            draft.add_item(LineItem::new(&name, Yen::parse(&price)?, category)?);
        }
        ReviewCommands::Remove { index } => {
            draft.remove_item(position(index)?)?;
        }
        ReviewCommands::Rename { index, name } => draft.rename_item(position(index)?, &name)?,
        ReviewCommands::Price { index, price } => {
            draft.set_price(position(index)?, &price)?;
        }
        ReviewCommands::Category { index, category } => {
            draft.set_category(position(index)?, category.parse()?)?
        }
    }

    flow.save_draft(&draft).await?;
    display::draft(&draft);
    Ok(())
}

pub async fn history(ctx: &Context, month: Option<&str>) -> anyhow::Result<()> {
    let month = match month {
        Some(m) => m.parse::<Month>()?,
        None => Month::current(),
    };
    let book = ctx.flow.store().load().await?;
    let records = book.records_in_month_tz(month, &Local);

    println!();
    display::labeled(&month.to_string(), &month.span_label());
    println!();
    if records.is_empty() {
        println!("  No records this month.");
    }
    for record in &records {
        display::record_line(record);
    }
    println!();
    display::labeled("今月の合計", &book.total_for_month_tz(month, &Local).to_string());
    Ok(())
}

pub async fn delete(ctx: &Context, id: &str) -> anyhow::Result<()> {
    let removed = ctx.flow.store().delete_record(&RecordId::from(id)).await?;
    display::success(&format!("Deleted {} ({})", removed.title(), removed.total()));
    Ok(())
}

pub async fn budget_show(ctx: &Context) -> anyhow::Result<()> {
    let book = ctx.flow.store().load().await?;
    display::budget(
        book.budget(),
        book.total_spent(),
        book.remaining(),
        book.remaining_percent(),
    );
    Ok(())
}

pub async fn budget_set(ctx: &Context, amount: &str) -> anyhow::Result<()> {
    let amount = Yen::parse(amount)?;
    ctx.flow.store().set_budget(amount).await?;
    display::success(&format!("Budget set to {amount}"));
    Ok(())
}

/// Positions on the command line are 1-based.
fn position(index: usize) -> anyhow::Result<usize> {
    index
        .checked_sub(1)
        .ok_or_else(|| anyhow!("Positions start at 1"))
}

/// A calendar date, taken as local noon.
fn parse_date(s: &str) -> anyhow::Result<chrono::DateTime<Utc>> {
    let date = NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
        .with_context(|| format!("Expected YYYY-MM-DD, got '{s}'"))?;
    let noon = date
        .and_hms_opt(12, 0, 0)
        .ok_or_else(|| anyhow!("Invalid date '{s}'"))?;
    let local = Local
        .from_local_datetime(&noon)
        .earliest()
        .ok_or_else(|| anyhow!("'{s}' does not exist in the local time zone"))?;
    Ok(local.with_timezone(&Utc))
}
