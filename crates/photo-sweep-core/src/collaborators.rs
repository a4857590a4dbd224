//! Boundaries to the device-side services the core drives but does not own.
//!
//! Failures are reported as plain messages; the session wraps them in the
//! matching typed [`Error`] variant without altering them.

use crate::analysis::groups::GroupProposal;
use crate::asset::Asset;
use crate::entitlement::EntitlementState;
use crate::error::Error;
use crate::storage::models::ScanRecord;

pub trait PhotoScanner {
    fn scan(&self) -> Result<Vec<Asset>, String>;
}

pub trait SimilarityEngine {
    fn group(&self, assets: &[Asset]) -> Vec<GroupProposal>;
}

/// Estimates run in parallel across the large-file list.
pub trait CompressionService: Send + Sync {
    /// Expected size after compression, or `None` when the asset can't be compressed.
    fn estimate(&self, asset: &Asset) -> Option<u64>;
    fn compress(&self, assets: &[Asset]) -> Result<CompressionOutcome, String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CompressionOutcome {
    pub compressed: usize,
    pub bytes_saved: u64,
}

pub trait DeletionExecutor {
    fn delete(&self, assets: &[Asset]) -> Result<DeletionOutcome, String>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DeletionOutcome {
    pub deleted: usize,
    pub bytes_freed: u64,
}

pub trait PersistenceStore {
    fn load_entitlement(&self) -> Result<Option<EntitlementState>, Error>;
    fn save_entitlement(&self, state: &EntitlementState) -> Result<(), Error>;
    fn record_scan(&self, record: &ScanRecord) -> Result<i64, Error>;
    fn scan_history(&self, limit: usize) -> Result<Vec<ScanRecord>, Error>;
    fn clear_scan_history(&self) -> Result<(), Error>;
}

/// Compression service for hosts without a codec: nothing is compressible.
pub struct NoCompression;

impl CompressionService for NoCompression {
    fn estimate(&self, _asset: &Asset) -> Option<u64> {
        None
    }

    fn compress(&self, _assets: &[Asset]) -> Result<CompressionOutcome, String> {
        Err("compression is not available on this device".to_string())
    }
}
