use colored::*;

use photo_sweep_core::analysis::SizeTier;
use photo_sweep_core::asset::{filter_by_kind, sorted_view, KindFilter, SortKey, SortOrder};
use photo_sweep_core::storage::models::ScanRecord;
use photo_sweep_core::{Asset, EntitlementState, Library, LibraryOverview, Severity, StorageSummary, Tier};

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Decimal units, one fractional digit above bytes.
pub fn format_bytes(bytes: u64) -> String {
    if bytes < 1000 {
        return format!("{} B", bytes);
    }
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1000.0 && unit < UNITS.len() - 1 {
        value /= 1000.0;
        unit += 1;
    }
    format!("{:.1} {}", value, UNITS[unit])
}

fn display_name(asset: &Asset) -> &str {
    if asset.filename.is_empty() {
        asset.id.as_str()
    } else {
        &asset.filename
    }
}

pub fn print_overview(overview: &LibraryOverview) {
    println!();
    println!(
        "{} assets ({}), {} duplicate groups, {} reclaimable",
        overview.total_assets.to_string().cyan(),
        format_bytes(overview.total_bytes),
        overview.duplicate_groups.to_string().red(),
        format_bytes(overview.potential_savings_bytes).red(),
    );
    println!(
        "{} screenshots, {} large files",
        overview.screenshots.to_string().cyan(),
        overview.large_files.to_string().cyan(),
    );
}

pub fn print_groups(library: &Library) {
    if library.groups().is_empty() {
        return;
    }
    println!();
    println!("{}", "Duplicate groups".bold());
    for group in library.groups() {
        println!(
            "  #{} {} ({:.0}% match), save {}",
            group.group_id(),
            group.match_type().to_string().yellow(),
            group.confidence() * 100.0,
            format_bytes(group.savings_bytes()).green(),
        );
        for member in group.members() {
            let marker = if group.is_recommended(&member.id) {
                "keep".green()
            } else {
                "delete".red()
            };
            println!(
                "      [{}] {} {}",
                marker,
                display_name(member),
                format_bytes(member.size_bytes).dimmed()
            );
        }
    }
}

pub fn print_screenshots(library: &Library, key: SortKey, order: SortOrder) {
    if library.buckets().is_empty() {
        return;
    }
    println!();
    println!("{}", "Screenshots".bold());
    for bucket in library.buckets() {
        println!(
            "  {} ({} items, {})",
            bucket.period().to_string().yellow(),
            bucket.assets().len(),
            format_bytes(bucket.total_bytes())
        );
        for asset in sorted_view(bucket.assets(), key, order) {
            println!(
                "      {} {}",
                display_name(asset),
                asset.captured_at.format("%Y-%m-%d %H:%M").to_string().dimmed()
            );
        }
    }
}

pub fn print_large_files(library: &Library, kind: KindFilter, key: SortKey, order: SortOrder) {
    let files = library.large_files();
    let assets: Vec<&Asset> = files.iter().map(|f| &f.asset).collect();
    let visible = sorted_view(filter_by_kind(assets, kind), key, order);
    if visible.is_empty() {
        return;
    }
    println!();
    println!("{}", "Large files".bold());
    for asset in visible {
        let Some(file) = files.iter().find(|f| f.asset.id == asset.id) else {
            continue;
        };
        let size = format_bytes(asset.size_bytes);
        let size = match file.size_tier() {
            SizeTier::Huge => size.red().bold(),
            SizeTier::Large => size.red(),
            SizeTier::Medium => size.yellow(),
            SizeTier::Normal => size.normal(),
        };
        let savings = if file.is_compressible() {
            format!("compress to save {}", format_bytes(file.compression_savings()))
        } else {
            "not compressible".to_string()
        };
        println!("  {} {} {}", display_name(asset), size, savings.dimmed());
    }
}

pub fn print_storage(summary: &StorageSummary) {
    let percent = format!("{:.1}%", summary.percent_used);
    let percent = match summary.severity {
        Severity::Critical => percent.red().bold(),
        Severity::Warning => percent.yellow(),
        Severity::Normal => percent.green(),
    };
    println!(
        "{} of {} used ({}), {} free",
        format_bytes(summary.used_bytes),
        format_bytes(summary.total_bytes),
        percent,
        format_bytes(summary.free_bytes),
    );
}

pub fn print_entitlement(state: &EntitlementState) {
    match state.tier {
        Tier::Pro => println!("Tier: {}, unlimited scans and cleanups", "Pro".green().bold()),
        Tier::Free => {
            println!("Tier: {}", "Free".yellow());
            println!("  Scans remaining:    {}", state.scans_remaining);
            println!("  Cleanups remaining: {}", state.cleanups_remaining);
        }
    }
}

pub fn print_history(records: &[ScanRecord]) {
    if records.is_empty() {
        println!("No scans recorded");
        return;
    }
    for record in records {
        println!(
            "  {} {} assets, {} groups, {} reclaimable",
            record.completed_at.dimmed(),
            record.assets_scanned,
            record.duplicate_groups,
            format_bytes(u64::try_from(record.potential_savings_bytes).unwrap_or(0)),
        );
    }
}
