use thiserror::Error;

use crate::entitlement::Action;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid group: {0}")]
    InvalidGroup(String),

    #[error("Quota exceeded for {action}: requested {requested}, remaining {remaining}")]
    QuotaExceeded {
        action: Action,
        requested: u32,
        remaining: u32,
    },

    #[error("{0} requires a Pro subscription")]
    ProFeature(Action),

    #[error("Entitlement state has not been loaded")]
    EntitlementDesync,

    #[error("Scan failed: {0}")]
    ScanFailed(String),

    #[error("Compression failed: {0}")]
    CompressionFailed(String),

    #[error("Deletion failed: {0}")]
    DeletionFailed(String),

    #[error("Unknown asset: {0}")]
    UnknownAsset(String),

    #[error("Unknown duplicate group: {0}")]
    UnknownGroup(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl Error {
    /// True for denials the user can resolve by upgrading to Pro.
    pub fn is_upgrade_recoverable(&self) -> bool {
        matches!(self, Error::QuotaExceeded { .. } | Error::ProFeature(_))
    }
}
