mod auth;
mod browser;
mod config;
mod fixture;
mod grid;
mod tasks;

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use config::Config;
use grid::extract::ScrapeView;
use grid::scrape::{self, GridScrape, ScrapeLimits};

#[derive(Parser)]
#[command(
    name = "rentman_bot",
    about = "Rentman task-grid bot: scrape completed tasks, create new ones"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and persist the session for later runs
    Login {
        /// Open a visible browser and complete the login manually
        #[arg(long)]
        headed: bool,
    },
    /// Scrape completed tasks; prints their external ids as JSON
    ScrapeDone,
    /// Scrape every row in the grid (diagnostic view); raw rows as JSON
    ScrapeAll,
    /// Create a task from a JSON record
    CreateTask {
        /// {"externalId":"PRJ-1","title":"…","assignee":"…","deadline":"…"}
        #[arg(long)]
        data: String,
    },
    /// Compare a live scrape against a captured reference table
    Verify {
        /// Path to the saved full-table HTML
        #[arg(long)]
        fixture: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let cfg = Config::from_env()?;

    let result = match cli.command {
        Commands::Login { headed } => {
            if headed {
                auth::interactive_login(&cfg).await
            } else {
                auth::login(&cfg).await
            }
        }
        Commands::ScrapeDone => scrape_done(&cfg).await,
        Commands::ScrapeAll => scrape_all(&cfg).await,
        Commands::CreateTask { data } => create_task(&cfg, &data).await,
        Commands::Verify { fixture } => verify(&cfg, &fixture).await,
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        eprintln!("Done in {}", format_duration(elapsed));
    }

    result
}

/// One full grid walk against a fresh headless session.
async fn scrape_view(cfg: &Config, view: ScrapeView) -> Result<GridScrape> {
    let session = browser::Session::launch(cfg, false).await?;
    let outcome = async {
        browser::open_tasks_view(&session.page, cfg).await?;
        let mut surface = browser::RentmanGrid::new(&session.page);
        scrape::collect_rows(&mut surface, view, ScrapeLimits::default()).await
    }
    .await;
    session.close().await?;

    let result = outcome?;
    if result.truncated {
        bail!(
            "extraction hit the pass ceiling after {} passes; refusing to emit a partial table",
            result.passes
        );
    }
    Ok(result)
}

async fn scrape_done(cfg: &Config) -> Result<()> {
    let result = scrape_view(cfg, ScrapeView::Done).await?;
    let ids = scrape::completed_ids(&result.rows);
    tracing::info!(
        "extracted {} unique external ids in {} passes",
        ids.len(),
        result.passes
    );
    println!("{}", serde_json::to_string(&ids)?);
    Ok(())
}

async fn scrape_all(cfg: &Config) -> Result<()> {
    let result = scrape_view(cfg, ScrapeView::All).await?;
    tracing::info!(
        "collected {} rows in {} passes",
        result.rows.len(),
        result.passes
    );
    println!("{}", serde_json::to_string_pretty(&result.rows)?);
    Ok(())
}

async fn create_task(cfg: &Config, data: &str) -> Result<()> {
    let spec: tasks::TaskSpec = serde_json::from_str(data).context("invalid --data JSON")?;

    let session = browser::Session::launch(cfg, false).await?;
    let outcome = tasks::create_task(&session.page, cfg, &spec).await;
    session.close().await?;
    outcome?;

    println!(
        "{}",
        serde_json::json!({
            "status": "success",
            "action": "createTask",
            "id": spec.external_id,
        })
    );
    Ok(())
}

async fn verify(cfg: &Config, fixture_path: &Path) -> Result<()> {
    let html = std::fs::read_to_string(fixture_path)
        .with_context(|| format!("cannot read fixture {}", fixture_path.display()))?;
    let expected = fixture::parse_reference_table(&html);
    let done = expected.iter().filter(|t| t.completed_on.is_some()).count();
    println!(
        "Parsed {} tasks ({} completed) from the reference table.",
        expected.len(),
        done
    );

    let result = scrape_view(cfg, ScrapeView::All).await?;
    println!("Scraped {} rows from the live grid.", result.rows.len());

    let report = fixture::diff_titles(&expected, &result.rows);
    for title in &report.missing {
        println!("  missing: {title}");
    }
    for title in &report.unexpected {
        println!("  unexpected: {title}");
    }
    if !report.is_clean() {
        bail!(
            "verification failed: expected {} tasks, scraped {} ({} missing, {} unexpected)",
            report.expected_total,
            report.actual_total,
            report.missing.len(),
            report.unexpected.len()
        );
    }
    println!("Verification passed: the live scrape matches the reference table.");
    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
