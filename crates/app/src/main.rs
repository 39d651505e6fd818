use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

mod commands;
mod display;

use commands::Context;

/// Receipt scanning and a monthly household budget
#[derive(Parser)]
#[command(name = "kakeibo")]
#[command(version)]
#[command(about = "Scan receipts into line items and track them against a budget", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Config file (defaults to the per-user config.toml, if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the database
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a receipt image and open the result for review
    Scan {
        /// JPEG or PNG photo of the receipt
        image: PathBuf,
    },

    /// Enter a purchase by hand; it is saved at once and opened for review
    Manual {
        /// Shop name
        #[arg(short, long)]
        shop: Option<String>,

        /// NAME=PRICE[=CATEGORY], repeatable
        #[arg(short, long = "item", required = true)]
        items: Vec<String>,
    },

    /// Inspect or edit the draft under review
    Review {
        #[command(subcommand)]
        action: Option<ReviewCommands>,
    },

    /// List the records of a month
    History {
        /// Month as YYYY-MM (defaults to the current month)
        #[arg(short, long)]
        month: Option<String>,
    },

    /// Delete a record by id
    Delete {
        id: String,
    },

    /// Show or change the budget
    Budget {
        #[command(subcommand)]
        action: Option<BudgetCommands>,
    },
}

#[derive(Subcommand)]
pub enum ReviewCommands {
    /// Show the draft
    Show,
    /// Set the shop name (omit to clear)
    Shop { name: Option<String> },
    /// Set the purchase date (YYYY-MM-DD)
    Date { date: String },
    /// Add an item
    Add {
        name: String,
        price: String,
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Remove the item at a position (1-based)
    Remove { index: usize },
    /// Rename the item at a position
    Rename { index: usize, name: String },
    /// Change the price of the item at a position
    Price { index: usize, price: String },
    /// Change the category of the item at a position
    Category { index: usize, category: String },
    /// Save the draft as a record and deduct it from the budget
    Commit,
    /// Throw the draft away
    Discard,
}

#[derive(Subcommand)]
pub enum BudgetCommands {
    /// Show budget, spending and what remains
    Show,
    /// Set the budget
    Set {
        #[arg(allow_hyphen_values = true)]
        amount: String,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        display::error(&format!("{e:#}"));
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = Context::open(cli.config.as_deref(), cli.data_dir.as_deref()).await?;

    match cli.command {
        Commands::Scan { image } => commands::scan(&ctx, &image).await,
        Commands::Manual { shop, items } => commands::manual(&ctx, shop, &items).await,
        Commands::Review { action } => {
            commands::review(&ctx, action.unwrap_or(ReviewCommands::Show)).await
        }
        Commands::History { month } => commands::history(&ctx, month.as_deref()).await,
        Commands::Delete { id } => commands::delete(&ctx, &id).await,
        Commands::Budget { action } => match action.unwrap_or(BudgetCommands::Show) {
            BudgetCommands::Show => commands::budget_show(&ctx).await,
            BudgetCommands::Set { amount } => commands::budget_set(&ctx, &amount).await,
        },
    }
}
