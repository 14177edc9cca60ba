use std::path::PathBuf;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, NaiveDateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use odds_engine::config::{self, EngineConfig};
use odds_engine::context::LookupCache;
use odds_engine::model::TeamId;
use odds_engine::orchestrator;
use odds_engine::reference::ReferenceTable;
use odds_engine::sqlite_store::SqliteStore;
use odds_engine::store::DataStore;
use odds_engine::value;

#[derive(Debug, Parser)]
#[command(name = "odds_engine", about = "Fixture probability estimates and value bets")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Estimate and store every upcoming fixture.
    Run {
        #[arg(long)]
        db: Option<PathBuf>,
        /// Only fixtures kicking off after this instant (RFC 3339). Defaults to now.
        #[arg(long, value_parser = parse_after)]
        after: Option<NaiveDateTime>,
        /// Last-known standings snapshot (JSON) for teams without a table row.
        #[arg(long)]
        reference: Option<PathBuf>,
    },
    /// List stored estimates that beat the bookmaker by a margin.
    Value {
        #[arg(long)]
        db: Option<PathBuf>,
        /// Minimum edge in percentage points.
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Compute the next upcoming meeting of two teams without saving it.
    Estimate {
        #[arg(long)]
        home: TeamId,
        #[arg(long)]
        away: TeamId,
        #[arg(long)]
        db: Option<PathBuf>,
        #[arg(long)]
        reference: Option<PathBuf>,
    },
}

fn parse_after(raw: &str) -> Result<NaiveDateTime> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.naive_utc())
        .with_context(|| format!("invalid RFC 3339 timestamp {raw:?}"))
}

fn open_store(db: Option<PathBuf>, reference: Option<PathBuf>) -> Result<SqliteStore> {
    let path = db
        .or_else(config::default_db_path)
        .context("unable to resolve sqlite path")?;
    debug!(path = %path.display(), "opening store");
    let store = SqliteStore::open(&path)?;
    match reference {
        Some(file) => {
            let table = ReferenceTable::load(&file)?;
            debug!(teams = table.len(), "loaded reference standings");
            Ok(store.with_reference(table))
        }
        None => Ok(store),
    }
}

fn run(
    cfg: &EngineConfig,
    db: Option<PathBuf>,
    after: Option<NaiveDateTime>,
    reference: Option<PathBuf>,
) -> Result<()> {
    let store = open_store(db, reference)?;
    let after = after.unwrap_or_else(|| Utc::now().naive_utc());
    let summary = orchestrator::run_batch(&store, after, cfg)?;

    println!("Calculation run complete");
    println!("Fixtures: {}", summary.fixtures);
    println!("Saved: {}", summary.saved);
    println!("Skipped: {}", summary.skipped);
    println!("Failed: {}", summary.failed);
    println!("Save failures: {}", summary.save_failures);
    Ok(())
}

fn list_value(cfg: &EngineConfig, db: Option<PathBuf>, threshold: Option<f64>) -> Result<()> {
    let store = open_store(db, None)?;
    let mut cfg = cfg.clone();
    if let Some(threshold) = threshold {
        cfg.value_threshold_pct = threshold;
    }
    let bets = value::value_bets(&store, &cfg)?;
    if bets.is_empty() {
        println!("No value bets above {:.1} points", cfg.value_threshold_pct);
        return Ok(());
    }
    for bet in bets {
        println!(
            "{} {} | {} v {} | {} @ {:.2} | edge {:+.1} | model {:.1}/{:.1}/{:.1} book {:.1}/{:.1}/{:.1}",
            bet.key.date,
            bet.key.time,
            bet.key.home_team_id,
            bet.key.away_team_id,
            bet.best.as_code(),
            bet.best_price,
            bet.max_diff,
            bet.model.home * 100.0,
            bet.model.draw * 100.0,
            bet.model.away * 100.0,
            bet.bookmaker.home * 100.0,
            bet.bookmaker.draw * 100.0,
            bet.bookmaker.away * 100.0,
        );
    }
    Ok(())
}

fn estimate_one(
    cfg: &EngineConfig,
    home: TeamId,
    away: TeamId,
    db: Option<PathBuf>,
    reference: Option<PathBuf>,
) -> Result<()> {
    let store = open_store(db, reference)?;
    let fixture = store
        .get_fixtures(Utc::now().naive_utc())?
        .into_iter()
        .find(|f| f.home_team_id == home && f.away_team_id == away)
        .ok_or_else(|| anyhow!("no upcoming fixture for {home} v {away}"))?;
    let estimate = orchestrator::estimate_fixture(&store, &LookupCache::new(), &fixture, cfg)?;
    println!(
        "{}",
        serde_json::to_string_pretty(&estimate).context("encode estimate")?
    );
    Ok(())
}

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let args = Args::parse();
    let cfg = config::env_config();
    debug!(?cfg, "engine config");

    match args.command {
        Command::Run { db, after, reference } => run(cfg, db, after, reference),
        Command::Value { db, threshold } => list_value(cfg, db, threshold),
        Command::Estimate {
            home,
            away,
            db,
            reference,
        } => estimate_one(cfg, home, away, db, reference),
    }
}
