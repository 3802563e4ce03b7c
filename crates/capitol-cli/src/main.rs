//! `capitol` — operator binary for the congressional trade pipeline.
//!
//! Reads `capitol.toml` (or the path given with `--config`) plus `CAPITOL_*`
//! environment overrides, opens the SQLite store and runs one job per
//! invocation.
//!
//! ```
//! capitol stage scraped.json
//! capitol promote --dry-run
//! capitol assign
//! capitol analyze --limit 50
//! ```

mod config;
mod confirm;
mod directory;
mod scorer;

use std::{
  io::{self, Read as _},
  path::{Path, PathBuf},
};

use anyhow::Context as _;
use capitol_core::{
  grouping::group_by_politician,
  relevance::RelevanceFilter,
  store::{SessionStore, StagingStore},
  trade::TradeData,
};
use capitol_pipeline::{
  Mode,
  analyzer::ConflictAnalyzer,
  assign::assign_pending_sessions,
  reconcile::Reconciler,
  repair::repair_fabricated_zeros,
  requeue::requeue_committee_corrections,
};
use capitol_store_sqlite::SqliteStore;
use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::{config::CliConfig, confirm::StdinGate, directory::DirectoryFile, scorer::HttpScorer};

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(author, version, about = "Congressional trade conflict pipeline")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "capitol.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Load a JSON array of scraped trades into staging (`-` reads stdin).
  Stage { file: PathBuf },

  /// Promote pending staging rows into production.
  Promote {
    /// Truncate production and reload it from staging instead of merging.
    #[arg(long)]
    replace: bool,
    /// Print the preflight report and stop.
    #[arg(long)]
    dry_run: bool,
    /// Skip the confirmation prompt.
    #[arg(long)]
    force:   bool,
  },

  /// Assign unassigned production trades to sessions, in arrival order.
  Assign {
    #[arg(long, default_value_t = 1000)]
    limit: usize,
  },

  /// Score dirty sessions, or unscored trades with `--trades`.
  Analyze {
    #[arg(long)]
    trades:           bool,
    #[arg(long, default_value_t = 100)]
    limit:            usize,
    /// Override `scoring.model`.
    #[arg(long)]
    model:            Option<String>,
    /// Override `scoring.analysis_version`.
    #[arg(long)]
    analysis_version: Option<String>,
  },

  /// Re-queue politicians analysed without committee data who now have it.
  RequeueCommittees {
    #[arg(long)]
    dry_run: bool,
  },

  /// Mark every session for re-analysis.
  RequeueSessions,

  /// Null historical zero scores written by failed analyses.
  RepairZeros {
    #[arg(long)]
    dry_run: bool,
    #[arg(long)]
    force:   bool,
  },

  /// Upsert politicians, aliases, committee seats and securities from TOML.
  LoadDirectory { file: PathBuf },

  /// Preview batch session grouping of a trades file without touching the
  /// store.
  Group { file: PathBuf },
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = config::load(&cli.config)?;

  match cli.command {
    Command::Stage { file } => {
      let store = open_store(&cfg).await?;
      let batch = read_trades(&file)?;
      let staged = store.stage_trades(batch).await.context("failed to stage trades")?;
      println!("staged {} trade(s)", staged.len());
    }

    Command::Promote { replace, dry_run, force } => {
      let reconciler = Reconciler::new(open_store(&cfg).await?, cfg.reconcile.clone());
      let gate = StdinGate { force };
      let mode = if dry_run { Mode::DryRun } else { Mode::Execute };
      let report = if replace {
        reconciler.replace(mode, &gate).await?
      } else {
        reconciler.promote(mode, &gate).await?
      };
      println!("{report}");
    }

    Command::Assign { limit } => {
      let store = open_store(&cfg).await?;
      let report = assign_pending_sessions(&store, cfg.grouping.gap_days, limit).await?;
      print_json(&report)?;
    }

    Command::Analyze { trades, limit, model, analysis_version } => {
      let mut scoring = cfg.scoring.clone();
      if let Some(model) = model {
        scoring.model = model;
      }
      if let Some(version) = analysis_version {
        scoring.analysis_version = version;
      }

      let analyzer = ConflictAnalyzer::new(
        open_store(&cfg).await?,
        HttpScorer::new(&scoring)?,
        RelevanceFilter::new(&cfg.relevance),
        scoring.analyzer_config(),
      );
      let report = if trades {
        analyzer.run_trades(limit).await?
      } else {
        analyzer.run_sessions(limit).await?
      };
      println!("{report}");
    }

    Command::RequeueCommittees { dry_run } => {
      let store = open_store(&cfg).await?;
      let report = requeue_committee_corrections(&store, dry_run).await?;
      print_json(&report)?;
    }

    Command::RequeueSessions => {
      let store = open_store(&cfg).await?;
      let n = store.mark_all_dirty().await.context("failed to re-queue sessions")?;
      println!("re-queued {n} session(s)");
    }

    Command::RepairZeros { dry_run, force } => {
      let store = open_store(&cfg).await?;
      let preview = repair_fabricated_zeros(&store, Mode::DryRun).await?;
      print_json(&preview)?;
      if !dry_run && !preview.candidates.is_empty() {
        let question = format!("null {} fabricated score(s)?", preview.candidates.len());
        if !force && !confirm::ask(&question) {
          anyhow::bail!("repair not confirmed");
        }
        let report = repair_fabricated_zeros(&store, Mode::Execute).await?;
        print_json(&report)?;
      }
    }

    Command::LoadDirectory { file } => {
      let raw = std::fs::read_to_string(&file)
        .with_context(|| format!("reading directory file {}", file.display()))?;
      let parsed = DirectoryFile::parse(&raw).context("parsing directory file")?;
      let store = open_store(&cfg).await?;
      let report = parsed.load_into(&store).await.context("failed to load directory")?;
      println!(
        "loaded {} politician(s), {} alias(es), {} committee seat(s), {} securit(ies)",
        report.politicians, report.aliases, report.assignments, report.securities,
      );
    }

    Command::Group { file } => group_preview(&cfg, &file)?,
  }

  Ok(())
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

async fn open_store(cfg: &CliConfig) -> anyhow::Result<SqliteStore> {
  SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))
}

fn read_trades(path: &Path) -> anyhow::Result<Vec<TradeData>> {
  let raw = if path == Path::new("-") {
    let mut buf = String::new();
    io::stdin().read_to_string(&mut buf).context("reading trades from stdin")?;
    buf
  } else {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?
  };
  serde_json::from_str(&raw).context("parsing trades JSON")
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string_pretty(value)?);
  Ok(())
}

fn group_preview(cfg: &CliConfig, file: &Path) -> anyhow::Result<()> {
  let trades = read_trades(file)?;
  for politician in group_by_politician(trades, &cfg.grouping) {
    println!("{}", politician.politician_name);
    for session in &politician.sessions {
      let (Some(first), Some(last)) = (session.first(), session.last()) else { continue };
      let tickers: Vec<&str> = session.iter().map(|t| t.ticker.as_str()).collect();
      println!(
        "  {} .. {}  {} trade(s): {}",
        first.transaction_date,
        last.transaction_date,
        session.len(),
        tickers.join(", "),
      );
    }
  }
  Ok(())
}
