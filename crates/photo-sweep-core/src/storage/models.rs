use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::library::LibraryOverview;

/// One completed scan, as shown in the scan history list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScanRecord {
    pub id: i64,
    pub started_at: String,
    pub completed_at: String,
    pub assets_scanned: i64,
    pub total_bytes: i64,
    pub duplicate_groups: i64,
    pub potential_savings_bytes: i64,
    pub large_files: i64,
    pub screenshots: i64,
}

impl ScanRecord {
    /// A record not yet written; `id` is assigned on insert.
    pub fn from_overview(
        started_at: DateTime<Utc>,
        completed_at: DateTime<Utc>,
        overview: &LibraryOverview,
    ) -> Self {
        Self {
            id: 0,
            started_at: started_at.to_rfc3339(),
            completed_at: completed_at.to_rfc3339(),
            assets_scanned: overview.total_assets as i64,
            total_bytes: overview.total_bytes as i64,
            duplicate_groups: overview.duplicate_groups as i64,
            potential_savings_bytes: overview.potential_savings_bytes as i64,
            large_files: overview.large_files as i64,
            screenshots: overview.screenshots as i64,
        }
    }
}
