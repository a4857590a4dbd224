pub mod analysis;
pub mod asset;
pub mod collaborators;
pub mod config;
pub mod engine;
pub mod entitlement;
pub mod error;
pub mod library;
pub mod progress;
pub mod selection;
pub mod storage;
pub mod storage_summary;

pub use asset::{Asset, AssetId, AssetKind};
pub use config::AppConfig;
pub use engine::{CleanupSession, Collaborators, ScanReport};
pub use entitlement::{Action, Decision, EntitlementGate, EntitlementState, Feature, PurchaseEvent, Tier};
pub use error::Error;
pub use library::{Library, LibraryOverview, Scope};
pub use progress::{ProgressReporter, SilentReporter};
pub use selection::{EnabledActions, SelectionEngine, Totals};
pub use storage_summary::{Severity, StorageSummary};
