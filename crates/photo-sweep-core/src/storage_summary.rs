use serde::Serialize;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Normal,
    Warning,
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Normal => f.write_str("normal"),
            Severity::Warning => f.write_str("warning"),
            Severity::Critical => f.write_str("critical"),
        }
    }
}

/// Device storage usage derived from two scalars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StorageSummary {
    pub used_bytes: u64,
    pub total_bytes: u64,
    pub percent_used: f64,
    pub free_bytes: u64,
    pub severity: Severity,
}

impl StorageSummary {
    /// A zero `total_bytes` reports 0% used. `used_bytes` beyond the total
    /// saturates the free space at zero.
    pub fn new(used_bytes: u64, total_bytes: u64) -> Self {
        let percent_used = if total_bytes == 0 {
            0.0
        } else {
            100.0 * used_bytes as f64 / total_bytes as f64
        };
        let severity = if percent_used > 90.0 {
            Severity::Critical
        } else if percent_used > 75.0 {
            Severity::Warning
        } else {
            Severity::Normal
        };
        Self {
            used_bytes,
            total_bytes,
            percent_used,
            free_bytes: total_bytes.saturating_sub(used_bytes),
            severity,
        }
    }
}
