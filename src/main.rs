mod config;
mod loader;
mod models;
mod pipeline;
mod scraper;
mod storage;
mod utils;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::AppConfig;
use crate::loader::load_ticker_list;
use crate::models::{AssetKind, AssetRecord};
use crate::pipeline::Pipeline;
use crate::scraper::http_client::FundamentusClient;
use crate::scraper::{Extractor, SavedPage};
use crate::storage::Repository;
use crate::utils::{fmt_opt, fmt_thousands};

#[derive(Parser)]
#[command(name = "quantiq", about = "Fundamentus stock and REIT scraper", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape one ticker and store it
    Scrape {
        ticker: String,

        #[arg(short, long, value_enum, default_value_t = AssetKind::Stock)]
        kind: AssetKind,

        /// Print the record without storing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Show a stored record
    Show {
        ticker: String,

        /// Also list stored quotation snapshots
        #[arg(long)]
        history: bool,
    },

    /// Extract a record from a saved detail page (no network)
    Extract {
        #[arg(short, long)]
        file: PathBuf,

        #[arg(short, long)]
        ticker: String,

        #[arg(short, long, value_enum, default_value_t = AssetKind::Stock)]
        kind: AssetKind,
    },

    /// Scrape every ticker of a `ticker[,kind]` CSV list
    Batch {
        #[arg(short, long)]
        file: PathBuf,

        /// Kind for rows that do not name one
        #[arg(short, long, value_enum, default_value_t = AssetKind::Stock)]
        kind: AssetKind,
    },

    /// List stored ticker symbols
    Symbols {
        #[arg(short, long, value_enum)]
        kind: Option<AssetKind>,
    },

    /// Show database statistics
    Stats,

    /// Apply schema migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "quantiq=info,warn",
        1 => "quantiq=debug,info",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(filter)
        .init();

    let config = AppConfig::load()?;

    match cli.command {
        Command::Scrape {
            ticker,
            kind,
            dry_run,
        } => {
            let extractor = live_extractor(&config)?;
            let record = if dry_run {
                extractor.execute(kind, &ticker).await?
            } else {
                let pipeline = Pipeline::new(extractor, open_repo(&config)?, config.pipeline);
                pipeline.scrape(kind, &ticker, true).await?
            };
            print_record(&record)?;
        }

        Command::Show { ticker, history } => {
            let repo = open_repo(&config)?;
            let ticker = ticker.trim().to_uppercase();
            let Some(record) = repo.get_by_ticker(&ticker)? else {
                println!("{} is not stored — run `quantiq scrape {}` first.", ticker, ticker);
                return Ok(());
            };
            print_record(&record)?;

            if history {
                let quotes = repo.quote_history(&ticker)?;
                println!("─────────────────────────────────────────────────────────");
                println!("  {:<10}  {:>10}  {:>10}  {:>10}  {:>14}", "date", "price", "52w low", "52w high", "avg vol 2m");
                for q in &quotes {
                    println!(
                        "  {:<10}  {:>10}  {:>10}  {:>10}  {:>14}",
                        q.quoted_on,
                        fmt_opt(q.price),
                        fmt_opt(q.fifty_two_week_low),
                        fmt_opt(q.fifty_two_week_high),
                        q.avg_volume_2m.map(fmt_thousands).unwrap_or_else(|| "-".into()),
                    );
                }
                println!("─────────────────────────────────────────────────────────");
            }
        }

        Command::Extract { file, ticker, kind } => {
            let source = SavedPage::from_file(&file)?;
            let record = Extractor::new(Arc::new(source)).execute(kind, &ticker).await?;
            print_record(&record)?;
        }

        Command::Batch { file, kind } => {
            let _t = utils::Timer::start("Batch scrape");
            let jobs = load_ticker_list(&file, kind)?;
            let pipeline = Pipeline::new(live_extractor(&config)?, open_repo(&config)?, config.pipeline);
            let stats = pipeline.run_batch(jobs).await?;
            info!(
                "Done: {} tickers, {} stored, {} not found, {} errors",
                stats.tickers_processed, stats.stored, stats.not_found, stats.errors
            );
        }

        Command::Symbols { kind } => {
            let repo = open_repo(&config)?;
            let syms = repo.list_symbols(kind)?;
            if syms.is_empty() {
                println!("No symbols — run `quantiq scrape` or `quantiq batch` first.");
            } else {
                println!("{} symbols:", syms.len());
                for s in &syms {
                    println!("  {}", s);
                }
            }
        }

        Command::Stats => {
            let repo = open_repo(&config)?;
            let assets = repo.asset_count()?;
            let quotes = repo.quote_count()?;
            let last_run = repo.last_scrape_run()?;
            println!("─────────────────────────────────");
            println!("  quantiq — Database Stats");
            println!("─────────────────────────────────");
            println!("  Assets   : {}", fmt_thousands(assets));
            for (kind, n) in repo.count_by_kind()? {
                println!("    {:<6} : {}", kind, fmt_thousands(n));
            }
            println!("  Quotes   : {}", fmt_thousands(quotes));
            match last_run {
                Some((id, status, finished)) => println!(
                    "  Last run : #{} {} ({})",
                    id,
                    status,
                    fmt_opt(finished)
                ),
                None => println!("  Last run : —"),
            }
            println!("─────────────────────────────────");
        }

        Command::Migrate => {
            Repository::open(&config.storage.db_path)?.run_migrations()?;
            println!("Migrations applied.");
        }
    }

    Ok(())
}

fn live_extractor(config: &AppConfig) -> Result<Extractor> {
    let client = FundamentusClient::new(&config.scraper).context("Failed to build scraper")?;
    Ok(Extractor::new(Arc::new(client)))
}

fn open_repo(config: &AppConfig) -> Result<Repository> {
    let repo = Repository::open(&config.storage.db_path).context("Failed to open DuckDB")?;
    if config.storage.run_migrations {
        repo.run_migrations()?;
    }
    Ok(repo)
}

fn print_record(record: &AssetRecord) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(record)?);
    Ok(())
}
