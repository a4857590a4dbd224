/// Trait for reporting cleanup session progress.
///
/// The CLI implements it with indicatif spinners.
/// All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_scan_start(&self) {}
    fn on_scan_complete(&self, _assets_found: usize, _duration_secs: f64) {}
    fn on_analysis_complete(&self, _duplicate_groups: usize, _large_files: usize, _duration_secs: f64) {}
    fn on_delete_start(&self, _assets: usize) {}
    fn on_delete_complete(&self, _deleted: usize, _bytes_freed: u64) {}
    fn on_compress_start(&self, _assets: usize) {}
    fn on_compress_complete(&self, _compressed: usize, _bytes_saved: u64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
