mod commands;
mod logging;
mod manifest;
mod output;
mod progress;

use std::io::{self, Write};
use std::path::Path;
use std::process;

use anyhow::{bail, Context};
use clap::{CommandFactory, Parser};
use colored::*;
use commands::{CleanTarget, Cli, Commands, KindArg, SortArg};
use dotenv::dotenv;
use manifest::Manifest;
use progress::CliReporter;
use tracing::{error, info, warn};

use photo_sweep_core::analysis::{GroupProposal, Period};
use photo_sweep_core::collaborators::{
    DeletionExecutor, DeletionOutcome, NoCompression, PhotoScanner, SimilarityEngine,
};
use photo_sweep_core::storage::Database;
use photo_sweep_core::{
    AppConfig, Asset, CleanupSession, Collaborators, PurchaseEvent, Scope, StorageSummary,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    let _guard = logging::init_logger();

    let config = match photo_sweep_core::config::load_configuration() {
        Ok(config) => config,
        Err(err) => {
            error!("Error loading configuration: {}", err);
            process::exit(1);
        }
    };

    let args = Cli::parse();
    let manifest = args.manifest.as_path();

    let result = match args.command {
        Some(Commands::Scan { sort, kind }) => run_scan(&config, manifest, sort, kind),
        Some(Commands::Clean { target, yes }) => run_clean(&config, manifest, target, yes),
        Some(Commands::Compress { yes }) => run_compress(&config, manifest, yes),
        Some(Commands::Storage { used, total }) => {
            output::print_storage(&StorageSummary::new(used, total));
            Ok(())
        }
        Some(Commands::Status) => run_status(&config),
        Some(Commands::Upgrade) => run_purchase_event(&config, PurchaseEvent::PurchaseConfirmed),
        Some(Commands::Lapse) => run_purchase_event(&config, PurchaseEvent::SubscriptionLapsed),
        Some(Commands::Rollover) => run_rollover(&config),
        Some(Commands::History { limit }) => run_history(&config, limit),
        Some(Commands::ClearHistory) => run_clear_history(&config),
        Some(Commands::PrintConfig) => {
            println!("Configuration: {:?}", config);
            Ok(())
        }
        Some(Commands::TruncateDb) => run_truncate(&config),
        None => {
            let _ = Cli::command().print_long_help();
            Ok(())
        }
    };

    if let Err(err) = result {
        error!("Error: {:#}", err);
        process::exit(1);
    }

    Ok(())
}

/// A session backed by the configured database. The manifest is only read
/// by commands that touch the library.
fn open_session(config: &AppConfig, manifest_path: Option<&Path>) -> anyhow::Result<CleanupSession> {
    let collaborators = match manifest_path {
        Some(path) => {
            let manifest = Manifest::load(path)
                .with_context(|| format!("reading manifest {}", path.display()))?;
            info!("Using library manifest {}", manifest.path().display());
            Collaborators {
                scanner: Box::new(manifest.clone()),
                similarity: Box::new(manifest.clone()),
                compression: Box::new(manifest.clone()),
                deletion: Box::new(manifest),
            }
        }
        None => Collaborators {
            scanner: Box::new(NoLibrary),
            similarity: Box::new(NoLibrary),
            compression: Box::new(NoCompression),
            deletion: Box::new(NoLibrary),
        },
    };

    let db = Database::open(&config.database_path)
        .with_context(|| format!("opening database {}", config.database_path))?;
    let mut session = CleanupSession::new(config.clone(), collaborators).with_store(Box::new(db));
    session.load_entitlements()?;
    Ok(session)
}

/// Stand-in collaborators for commands that never touch the library.
struct NoLibrary;

impl PhotoScanner for NoLibrary {
    fn scan(&self) -> Result<Vec<Asset>, String> {
        Err("no library manifest".to_string())
    }
}

impl SimilarityEngine for NoLibrary {
    fn group(&self, _assets: &[Asset]) -> Vec<GroupProposal> {
        Vec::new()
    }
}

impl DeletionExecutor for NoLibrary {
    fn delete(&self, _assets: &[Asset]) -> Result<DeletionOutcome, String> {
        Err("no library manifest".to_string())
    }
}

fn scan_with_progress(session: &mut CleanupSession) -> anyhow::Result<()> {
    let reporter = CliReporter::new();
    let result = session.run_scan(&reporter);
    reporter.clear();
    let report = match result {
        Ok(report) => report,
        Err(err) if err.is_upgrade_recoverable() => {
            warn!("{}", err);
            bail!("Upgrade to Pro for unlimited scans");
        }
        Err(err) => return Err(err.into()),
    };

    info!(
        "Scan: {}, Analysis: {}",
        format!("{:.2}s", report.scan_duration.as_secs_f64()).green(),
        format!("{:.2}s", report.analysis_duration.as_secs_f64()).green(),
    );
    output::print_overview(&report.overview);
    Ok(())
}

/// Reload the library for a cleanup without spending a scan.
fn refresh_with_progress(session: &mut CleanupSession) -> anyhow::Result<()> {
    let reporter = CliReporter::new();
    let result = session.refresh_library(&reporter);
    reporter.clear();
    output::print_overview(&result?);
    Ok(())
}

fn run_scan(config: &AppConfig, manifest: &Path, sort: SortArg, kind: KindArg) -> anyhow::Result<()> {
    let mut session = open_session(config, Some(manifest))?;
    scan_with_progress(&mut session)?;

    let (key, order) = sort.key_and_order();
    output::print_groups(session.library());
    output::print_screenshots(session.library(), key, order);
    output::print_large_files(session.library(), kind.into(), key, order);
    Ok(())
}

fn run_clean(config: &AppConfig, manifest: &Path, target: CleanTarget, yes: bool) -> anyhow::Result<()> {
    let mut session = open_session(config, Some(manifest))?;
    refresh_with_progress(&mut session)?;

    let group_ids: Vec<u64> = session.library().groups().iter().map(|g| g.group_id()).collect();
    let periods: Vec<Period> = session.library().buckets().iter().map(|b| b.period()).collect();
    let selection = session.selection_mut();
    match target {
        CleanTarget::Duplicates => {
            for group_id in group_ids {
                selection.select_recommended_deletions(group_id)?;
            }
        }
        CleanTarget::Screenshots => {
            for period in periods {
                selection.select_all(Scope::Period(period))?;
            }
        }
        CleanTarget::LargeFiles => selection.select_all(Scope::LargeFiles)?,
    }

    let totals = session.selection().totals(Scope::Global)?;
    if totals.count == 0 {
        println!("Nothing to clean");
        return Ok(());
    }

    println!();
    let prompt = format!(
        "Delete {} items and free {}?",
        totals.count,
        output::format_bytes(totals.bytes)
    );
    if !yes && !prompt_confirm(&prompt, Some(false))? {
        println!("Cancelled");
        return Ok(());
    }

    let reporter = CliReporter::new();
    let result = session.delete_selected(Scope::Global, &reporter);
    reporter.clear();
    result?;

    if let Ok(state) = session.gate().state() {
        output::print_entitlement(state);
    }
    Ok(())
}

fn run_compress(config: &AppConfig, manifest: &Path, yes: bool) -> anyhow::Result<()> {
    let mut session = open_session(config, Some(manifest))?;
    refresh_with_progress(&mut session)?;

    session.selection_mut().select_all(Scope::LargeFiles)?;
    let savings = session.selection().compression_savings(Scope::LargeFiles)?;
    if savings == 0 {
        println!("Nothing to compress");
        return Ok(());
    }

    let prompt = format!("Compress large files to save {}?", output::format_bytes(savings));
    if !yes && !prompt_confirm(&prompt, Some(true))? {
        println!("Cancelled");
        return Ok(());
    }

    let reporter = CliReporter::new();
    let result = session.compress_selected(Scope::LargeFiles, &reporter);
    reporter.clear();
    match result {
        Ok(_) => Ok(()),
        Err(err) if err.is_upgrade_recoverable() => {
            warn!("{}", err);
            bail!("Compression is available with Pro (photo-sweep upgrade)")
        }
        Err(err) => Err(err.into()),
    }
}

fn run_status(config: &AppConfig) -> anyhow::Result<()> {
    let session = open_session(config, None)?;
    output::print_entitlement(session.gate().state()?);
    Ok(())
}

fn run_purchase_event(config: &AppConfig, event: PurchaseEvent) -> anyhow::Result<()> {
    let mut session = open_session(config, None)?;
    session.apply_purchase_event(event)?;
    output::print_entitlement(session.gate().state()?);
    Ok(())
}

fn run_rollover(config: &AppConfig) -> anyhow::Result<()> {
    let mut session = open_session(config, None)?;
    session.period_rollover()?;
    output::print_entitlement(session.gate().state()?);
    Ok(())
}

fn run_history(config: &AppConfig, limit: usize) -> anyhow::Result<()> {
    let session = open_session(config, None)?;
    output::print_history(&session.scan_history(limit)?);
    Ok(())
}

fn run_clear_history(config: &AppConfig) -> anyhow::Result<()> {
    if !prompt_confirm("Delete all scan history?", Some(false))? {
        return Ok(());
    }
    let session = open_session(config, None)?;
    session.clear_scan_history()?;
    println!("Scan history cleared");
    Ok(())
}

fn run_truncate(config: &AppConfig) -> anyhow::Result<()> {
    if !prompt_confirm(
        "Are you SURE you want to COMPLETELY DELETE the Database?",
        Some(false),
    )? {
        return Ok(());
    }
    let db = Database::open(&config.database_path)?;
    db.truncate_all()?;
    println!("All tables truncated");
    Ok(())
}

fn prompt_confirm(prompt: &str, default: Option<bool>) -> io::Result<bool> {
    let mut input = String::new();

    loop {
        input.clear();

        match default {
            Some(true) => print!("{} (Y/n): ", prompt),
            Some(false) | None => print!("{} (y/N): ", prompt),
        }
        io::stdout().flush()?;

        io::stdin().read_line(&mut input)?;

        match input.trim().to_uppercase().as_str() {
            "Y" => return Ok(true),
            "N" => return Ok(false),
            "" => match default {
                Some(default) => return Ok(default),
                None => continue,
            },
            _ => continue,
        }
    }
}
