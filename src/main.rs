mod browser;
mod cache;
mod config;
mod detail;
mod error;
mod extract;
mod listing;
mod models;
mod pipeline;
mod tui;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use browser::Browser;
use cache::CacheStore;
use chrono::Utc;
use clap::{Parser, Subcommand};
use config::Settings;
use pipeline::{Pipeline, Snapshot};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "startups")]
#[command(about = "Browse recently funded startups from startups.gallery")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// WebDriver endpoint used to render pages (e.g. a running chromedriver)
    #[arg(long, global = true, env = "STARTUPS_WEBDRIVER", default_value = config::DEFAULT_WEBDRIVER_URL)]
    webdriver_url: String,

    /// Cache file location
    #[arg(long, global = true, env = "STARTUPS_CACHE")]
    cache_path: Option<PathBuf>,

    /// Company pages rendered at once
    #[arg(long, global = true, env = "STARTUPS_CONCURRENCY", default_value_t = config::DEFAULT_CONCURRENCY)]
    concurrency: usize,

    /// Seconds to wait for a page to render
    #[arg(long, global = true, env = "STARTUPS_TIMEOUT", default_value_t = config::DEFAULT_TIMEOUT_SECS)]
    timeout_secs: u64,

    /// Show the browser window instead of running headless
    #[arg(long, global = true)]
    headful: bool,

    /// Scrape even if the cache is still fresh
    #[arg(long, global = true)]
    refresh: bool,
}

impl Cli {
    fn settings(&self) -> Settings {
        Settings {
            webdriver_url: self.webdriver_url.clone(),
            cache_path: self
                .cache_path
                .clone()
                .unwrap_or_else(config::default_cache_path),
            concurrency: self.concurrency,
            page_timeout: Duration::from_secs(self.timeout_secs),
            headless: !self.headful,
            force_refresh: self.refresh,
        }
    }
}

#[derive(Subcommand, Clone)]
enum Commands {
    /// Browse companies in the terminal (default)
    Browse,

    /// Print companies as a table
    List {
        /// Only show companies matching this text (name, tagline, industry, location, stage)
        #[arg(short, long)]
        filter: Option<String>,
    },

    /// Show cache location and age without scraping
    Status,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let settings = cli.settings();

    match cli.command.clone().unwrap_or(Commands::Browse) {
        Commands::Browse => {
            let snapshot = get_records(&settings).await;
            tokio::task::spawn_blocking(move || tui::run_browse(&snapshot))
                .await
                .context("terminal browser crashed")??;
        }

        Commands::List { filter } => {
            let snapshot = get_records(&settings).await;
            print_table(&snapshot, filter.as_deref());
        }

        Commands::Status => print_status(&settings),
    }

    Ok(())
}

/// Run the pipeline once; Ctrl-C aborts any in-flight page load.
async fn get_records(settings: &Settings) -> Snapshot {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let pipeline = Pipeline::new(Browser::new(settings, cancel.clone()), settings);
    pipeline.get_records(&cancel).await
}

fn print_table(snapshot: &Snapshot, filter: Option<&str>) {
    let records: Vec<_> = snapshot
        .records
        .iter()
        .filter(|r| filter.is_none_or(|f| r.matches(f)))
        .collect();

    if records.is_empty() {
        println!("No startups found ({}).", snapshot.freshness);
        return;
    }

    println!(
        "{:<24} {:<12} {:<18} {:<18} {:>8}",
        "NAME", "STAGE", "INDUSTRY", "LOCATION", "TEAM"
    );
    println!("{}", "-".repeat(84));
    for record in &records {
        println!(
            "{:<24} {:<12} {:<18} {:<18} {:>8}",
            tui::truncate(&record.name, 22),
            tui::truncate(&record.funding_stage, 10),
            tui::truncate(&record.industry, 16),
            tui::truncate(&record.location, 16),
            record.team_size
        );
    }
    println!("\n{} companies | {}", records.len(), snapshot.freshness);
}

fn print_status(settings: &Settings) {
    let store = CacheStore::new(&settings.cache_path);
    println!("Cache:     {}", store.path().display());

    match store.load() {
        Ok(cache) => {
            let now = Utc::now();
            let age = cache.age(now);
            println!("Companies: {}", cache.startups.len());
            println!(
                "Updated:   {} ({}h {}m ago)",
                cache.last_updated.format("%Y-%m-%d %H:%M:%S UTC"),
                age.num_hours(),
                age.num_minutes() % 60
            );
            if cache.is_fresh(now, config::freshness_window()) {
                println!("Fresh:     yes");
            } else {
                println!("Fresh:     no (next run scrapes again)");
            }
        }
        Err(miss) => println!("No usable cache: {}", miss),
    }
}
