use super::models::*;
use super::sqlite::Database;
use rusqlite::params;
use tracing::debug;

use crate::collaborators::PersistenceStore;
use crate::entitlement::{EntitlementState, Tier};
use crate::error::Error;

impl Database {
    // ── Entitlement ──────────────────────────────────────────────

    pub fn get_entitlement(&self) -> rusqlite::Result<Option<(String, i64, i64)>> {
        match self.connection().query_row(
            "SELECT tier, scans_remaining, cleanups_remaining FROM entitlement_state WHERE id = 1",
            [],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        ) {
            Ok(row) => Ok(Some(row)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn put_entitlement(&self, tier: &str, scans_remaining: i64, cleanups_remaining: i64) -> rusqlite::Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        self.connection().execute(
            "INSERT INTO entitlement_state (id, tier, scans_remaining, cleanups_remaining, updated_at) \
             VALUES (1, ?1, ?2, ?3, ?4) \
             ON CONFLICT(id) DO UPDATE SET tier = excluded.tier, \
             scans_remaining = excluded.scans_remaining, \
             cleanups_remaining = excluded.cleanups_remaining, \
             updated_at = excluded.updated_at",
            params![tier, scans_remaining, cleanups_remaining, now],
        )?;
        Ok(())
    }

    // ── Scan History ─────────────────────────────────────────────

    pub fn insert_scan_record(&self, record: &ScanRecord) -> rusqlite::Result<i64> {
        self.connection().execute(
            "INSERT INTO scan_history (started_at, completed_at, assets_scanned, total_bytes, \
             duplicate_groups, potential_savings_bytes, large_files, screenshots) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                record.started_at,
                record.completed_at,
                record.assets_scanned,
                record.total_bytes,
                record.duplicate_groups,
                record.potential_savings_bytes,
                record.large_files,
                record.screenshots,
            ],
        )?;
        Ok(self.connection().last_insert_rowid())
    }

    /// Most recent scans first.
    pub fn list_scan_history(&self, limit: i64) -> rusqlite::Result<Vec<ScanRecord>> {
        let mut stmt = self.connection().prepare(
            "SELECT id, started_at, completed_at, assets_scanned, total_bytes, \
                    duplicate_groups, potential_savings_bytes, large_files, screenshots \
             FROM scan_history \
             ORDER BY id DESC \
             LIMIT ?1",
        )?;

        let records = stmt
            .query_map(params![limit], |row| {
                Ok(ScanRecord {
                    id: row.get(0)?,
                    started_at: row.get(1)?,
                    completed_at: row.get(2)?,
                    assets_scanned: row.get(3)?,
                    total_bytes: row.get(4)?,
                    duplicate_groups: row.get(5)?,
                    potential_savings_bytes: row.get(6)?,
                    large_files: row.get(7)?,
                    screenshots: row.get(8)?,
                })
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(records)
    }

    pub fn get_scan_count(&self) -> rusqlite::Result<i64> {
        self.connection()
            .query_row("SELECT COUNT(*) FROM scan_history", [], |row| row.get(0))
    }

    pub fn delete_scan_history(&self) -> rusqlite::Result<usize> {
        let deleted = self.connection().execute("DELETE FROM scan_history", [])?;
        debug!("Deleted {} scan history rows", deleted);
        Ok(deleted)
    }
}

impl PersistenceStore for Database {
    fn load_entitlement(&self) -> Result<Option<EntitlementState>, Error> {
        let row = match self.get_entitlement()? {
            Some(row) => row,
            None => return Ok(None),
        };
        let (tier, scans, cleanups) = row;
        Ok(Some(EntitlementState {
            tier: tier.parse::<Tier>()?,
            scans_remaining: u32::try_from(scans).unwrap_or(0),
            cleanups_remaining: u32::try_from(cleanups).unwrap_or(0),
        }))
    }

    fn save_entitlement(&self, state: &EntitlementState) -> Result<(), Error> {
        self.put_entitlement(
            &state.tier.to_string(),
            i64::from(state.scans_remaining),
            i64::from(state.cleanups_remaining),
        )?;
        Ok(())
    }

    fn record_scan(&self, record: &ScanRecord) -> Result<i64, Error> {
        Ok(self.insert_scan_record(record)?)
    }

    fn scan_history(&self, limit: usize) -> Result<Vec<ScanRecord>, Error> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        Ok(self.list_scan_history(limit)?)
    }

    fn clear_scan_history(&self) -> Result<(), Error> {
        self.delete_scan_history()?;
        Ok(())
    }
}
