//! courtside: basketball-reference scrape-to-record ingestion
//!
//! Entry point. Loads `.env` and configuration, initialises structured
//! logging, opens the store and runs one crawl command, printing the
//! result as JSON.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tracing::info;

use courtside::config::AppConfig;
use courtside::engine::Crawler;
use courtside::scrape::fetch::HttpFetcher;
use courtside::storage::Store;
use courtside::types::{CrawlReport, CrawlUnit, IngestError, SeasonType, StatTable, TableKind};

#[derive(Parser)]
#[command(name = "courtside")]
#[command(about = "Scrape season tables and shot charts into SQLite", long_about = None)]
struct Cli {
    /// Config file path (defaults apply when missing)
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import every season-wide table over the configured season range
    ImportData {
        /// First season (overrides [import] first_season)
        #[arg(long)]
        first: Option<i32>,
        /// Last season (overrides [import] last_season)
        #[arg(long)]
        last: Option<i32>,
    },
    /// Scrape one season's advanced table
    Advanced {
        #[arg(long)]
        season: i32,
        #[arg(long)]
        playoffs: bool,
    },
    /// Scrape one season's totals table
    Totals {
        #[arg(long)]
        season: i32,
        #[arg(long)]
        playoffs: bool,
    },
    /// Scrape a player's shot chart, one season or newest-first over a range
    ShotChart {
        player_id: String,
        /// Newest season
        #[arg(long)]
        start: i32,
        /// Oldest season (inclusive); omit for a single season
        #[arg(long)]
        end: Option<i32>,
    },
    /// Scrape shot charts for every player already in the totals table
    ShotChartAll {
        #[arg(long)]
        start: i32,
        #[arg(long)]
        end: i32,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    let cli = Cli::parse();
    let cfg = AppConfig::load_or_default(&cli.config)?.apply_env();

    init_logging();
    info!(
        database = %cfg.database.url,
        base_url = %cfg.source.base_url,
        strict = cfg.parsing.strict_coercion,
        "courtside starting"
    );

    let store = Store::connect(&cfg.database.url, cfg.database.max_connections)
        .await
        .with_context(|| format!("Failed to open database {}", cfg.database.url))?;
    store.migrate().await.context("Failed to migrate database")?;

    let fetcher = HttpFetcher::new(&cfg.source).context("Failed to build HTTP fetcher")?;
    let crawler = Crawler::from_config(&cfg, Arc::new(fetcher), store);

    match cli.command {
        Commands::ImportData { first, last } => {
            let first = first.unwrap_or(cfg.import.first_season);
            let last = last.unwrap_or(cfg.import.last_season);
            print_crawl(crawler.import_all(first, last).await)?;
        }
        Commands::Advanced { season, playoffs } => {
            let season_type = SeasonType::from_playoff_flag(playoffs);
            let written = crawler.ingest_advanced(season, season_type).await?;
            let unit = CrawlUnit::table(StatTable::new(TableKind::Advanced, season_type), season);
            print_count(&unit, written)?;
        }
        Commands::Totals { season, playoffs } => {
            let season_type = SeasonType::from_playoff_flag(playoffs);
            let written = crawler.ingest_totals(season, season_type).await?;
            let unit = CrawlUnit::table(StatTable::new(TableKind::Totals, season_type), season);
            print_count(&unit, written)?;
        }
        Commands::ShotChart { player_id, start, end: None } => {
            let written = crawler.ingest_shot_chart(&player_id, start).await?;
            print_count(&CrawlUnit::shot_chart(&player_id, start), written)?;
        }
        Commands::ShotChart { player_id, start, end: Some(end) } => {
            print_crawl(crawler.ingest_shot_chart_range(&player_id, start, end).await)?;
        }
        Commands::ShotChartAll { start, end } => {
            print_crawl(crawler.crawl_all_shot_charts(start, end).await)?;
        }
    }

    Ok(())
}

/// Print the report of a multi-unit crawl. A crawl that wrote nothing still
/// prints its report before failing.
fn print_crawl(result: Result<CrawlReport, IngestError>) -> Result<()> {
    match result {
        Ok(report) => print_report(&report),
        Err(IngestError::NothingWritten(report)) => {
            print_report(&report)?;
            Err(IngestError::NothingWritten(report).into())
        }
        Err(e) => Err(e.into()),
    }
}

fn print_report(report: &CrawlReport) -> Result<()> {
    info!("{report}");
    let json = serde_json::to_string_pretty(report).context("Failed to serialise crawl report")?;
    println!("{json}");
    Ok(())
}

fn print_count(unit: &CrawlUnit, written: usize) -> Result<()> {
    let json = serde_json::to_string_pretty(&serde_json::json!({
        "unit": unit.to_string(),
        "written": written,
    }))
    .context("Failed to serialise result")?;
    println!("{json}");
    Ok(())
}

/// Initialise the `tracing` subscriber.
fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("courtside=info"));

    let json_logging = std::env::var("COURTSIDE_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(std::io::stderr)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_writer(std::io::stderr)
            .init();
    }
}
