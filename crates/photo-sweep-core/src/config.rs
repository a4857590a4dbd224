use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::path::Path;

use crate::analysis::groups::GroupFilter;
use crate::entitlement::FreeTierLimits;

pub const DEFAULT_DATABASE_PATH: &str = "photo_sweep.db";
pub const DEFAULT_LARGE_FILE_THRESHOLD: u64 = 5 * 1024 * 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_path: String,
    pub large_file_threshold_bytes: u64,
    pub free_scans_per_period: u32,
    pub free_cleanups_per_period: u32,
    /// Minimum similarity, in percent, for similar and burst groups.
    pub similarity_threshold: u8,
    pub include_screenshots: bool,
    pub include_bursts: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        let limits = FreeTierLimits::default();
        Self {
            database_path: DEFAULT_DATABASE_PATH.to_string(),
            large_file_threshold_bytes: DEFAULT_LARGE_FILE_THRESHOLD,
            free_scans_per_period: limits.scans_per_period,
            free_cleanups_per_period: limits.cleanups_per_period,
            similarity_threshold: 85,
            include_screenshots: true,
            include_bursts: true,
        }
    }
}

impl AppConfig {
    pub fn free_tier_limits(&self) -> FreeTierLimits {
        FreeTierLimits {
            scans_per_period: self.free_scans_per_period,
            cleanups_per_period: self.free_cleanups_per_period,
        }
    }

    pub fn group_filter(&self) -> GroupFilter {
        GroupFilter {
            min_confidence: f64::from(self.similarity_threshold.min(100)) / 100.0,
            include_screenshots: self.include_screenshots,
            include_bursts: self.include_bursts,
        }
    }
}

/// Load `Config.toml` from the working directory (if present), then apply
/// `PHOTO_SWEEP_*` environment overrides.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    build(ConfigFile::with_name("Config").required(false))
}

/// Load configuration from an explicit file path.
pub fn load_configuration_from(path: &Path) -> Result<AppConfig, ConfigError> {
    build(ConfigFile::from(path).required(true))
}

fn build<S>(file: S) -> Result<AppConfig, ConfigError>
where
    S: config::Source + Send + Sync + 'static,
{
    let defaults = AppConfig::default();
    let builder = Config::builder()
        .set_default("database_path", defaults.database_path)?
        .set_default(
            "large_file_threshold_bytes",
            defaults.large_file_threshold_bytes as i64,
        )?
        .set_default("free_scans_per_period", i64::from(defaults.free_scans_per_period))?
        .set_default(
            "free_cleanups_per_period",
            i64::from(defaults.free_cleanups_per_period),
        )?
        .set_default("similarity_threshold", i64::from(defaults.similarity_threshold))?
        .set_default("include_screenshots", defaults.include_screenshots)?
        .set_default("include_bursts", defaults.include_bursts)?
        .add_source(file)
        .add_source(Environment::with_prefix("PHOTO_SWEEP").try_parsing(true))
        .build()?;
    builder.try_deserialize::<AppConfig>()
}
