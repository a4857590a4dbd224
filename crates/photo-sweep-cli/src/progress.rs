use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Mutex;
use std::time::Duration;

use photo_sweep_core::ProgressReporter;

use crate::output::format_bytes;

/// CLI progress reporter using an indicatif spinner per phase.
///
/// Phases: scanning, grouping, deleting, compressing. Only one spinner is
/// live at a time.
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            bar: Mutex::new(None),
        }
    }

    fn start_spinner(&self, message: String) {
        let pb = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏");
        pb.set_style(style);
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(80));

        if let Ok(mut guard) = self.bar.lock() {
            if let Some(old) = guard.take() {
                old.finish_and_clear();
            }
            *guard = Some(pb);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.bar.lock() {
            if let Some(pb) = guard.take() {
                pb.finish_and_clear();
            }
        }
    }
}

impl ProgressReporter for CliReporter {
    fn on_scan_start(&self) {
        self.start_spinner("Scanning photo library...".to_string());
    }

    fn on_scan_complete(&self, assets_found: usize, duration_secs: f64) {
        self.clear();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Scan complete: {} assets in {:.2}s",
            assets_found, duration_secs
        );
        self.start_spinner("Grouping duplicates...".to_string());
    }

    fn on_analysis_complete(&self, duplicate_groups: usize, large_files: usize, duration_secs: f64) {
        self.clear();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Analysis complete: {} duplicate groups, {} large files in {:.2}s",
            duplicate_groups, large_files, duration_secs
        );
    }

    fn on_delete_start(&self, assets: usize) {
        self.start_spinner(format!("Deleting {} assets...", assets));
    }

    fn on_delete_complete(&self, deleted: usize, bytes_freed: u64) {
        self.clear();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Deleted {} assets, {} freed",
            deleted,
            format_bytes(bytes_freed)
        );
    }

    fn on_compress_start(&self, assets: usize) {
        self.start_spinner(format!("Compressing {} assets...", assets));
    }

    fn on_compress_complete(&self, compressed: usize, bytes_saved: u64) {
        self.clear();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Compressed {} assets, {} saved",
            compressed,
            format_bytes(bytes_saved)
        );
    }
}
