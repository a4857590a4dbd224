use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::asset::AssetId;
use crate::collaborators::{
    CompressionOutcome, CompressionService, DeletionExecutor, DeletionOutcome, PersistenceStore,
    PhotoScanner, SimilarityEngine,
};
use crate::config::AppConfig;
use crate::entitlement::{Action, EntitlementGate, EntitlementState, Feature, PurchaseEvent};
use crate::error::Error;
use crate::library::{BuildOptions, Library, LibraryOverview, Scope};
use crate::progress::ProgressReporter;
use crate::selection::SelectionEngine;
use crate::storage::models::ScanRecord;

/// The device-side services a session drives.
pub struct Collaborators {
    pub scanner: Box<dyn PhotoScanner>,
    pub similarity: Box<dyn SimilarityEngine>,
    pub compression: Box<dyn CompressionService>,
    pub deletion: Box<dyn DeletionExecutor>,
}

#[derive(Debug)]
pub struct ScanReport {
    pub scan_duration: Duration,
    pub analysis_duration: Duration,
    pub overview: LibraryOverview,
}

/// One user session: the current library and selection, the entitlement
/// gate, and the collaborators that act on the device.
///
/// Every operation that calls out to a collaborator follows the same order:
/// authorize, call, then commit quota and rebuild state on success or release
/// the grant on failure.
pub struct CleanupSession {
    config: AppConfig,
    gate: EntitlementGate,
    selection: SelectionEngine,
    collaborators: Collaborators,
    store: Option<Box<dyn PersistenceStore>>,
}

impl CleanupSession {
    pub fn new(config: AppConfig, collaborators: Collaborators) -> Self {
        let gate = EntitlementGate::new(config.free_tier_limits());
        Self {
            config,
            gate,
            selection: SelectionEngine::default(),
            collaborators,
            store: None,
        }
    }

    pub fn with_store(mut self, store: Box<dyn PersistenceStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn gate(&self) -> &EntitlementGate {
        &self.gate
    }

    pub fn selection(&self) -> &SelectionEngine {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> &mut SelectionEngine {
        &mut self.selection
    }

    pub fn library(&self) -> &Library {
        self.selection.library()
    }

    /// Read the persisted entitlement. A store without a saved row is a new
    /// install and starts on the free tier.
    pub fn load_entitlements(&mut self) -> Result<EntitlementState, Error> {
        let limits = self.config.free_tier_limits();
        let state = match &self.store {
            Some(store) => match store.load_entitlement()? {
                Some(state) => state,
                None => {
                    let fresh = EntitlementState::new_install(limits);
                    store.save_entitlement(&fresh)?;
                    fresh
                }
            },
            None => EntitlementState::new_install(limits),
        };
        self.gate.load(state);
        Ok(state)
    }

    fn persist_entitlement(&self) -> Result<(), Error> {
        if let Some(store) = &self.store {
            store.save_entitlement(self.gate.state()?)?;
        }
        Ok(())
    }

    pub fn apply_purchase_event(&mut self, event: PurchaseEvent) -> Result<(), Error> {
        self.gate.apply(event)?;
        self.persist_entitlement()
    }

    pub fn period_rollover(&mut self) -> Result<(), Error> {
        self.gate.period_rollover()?;
        self.persist_entitlement()
    }

    pub fn is_feature_enabled(&self, feature: Feature) -> bool {
        self.gate.is_feature_enabled(feature)
    }

    /// Scan the device, rebuild the library and consume one scan.
    pub fn run_scan(&mut self, reporter: &dyn ProgressReporter) -> Result<ScanReport, Error> {
        let grant = self.gate.authorize(Action::Scan, 1)?;
        let started_at = Utc::now();

        let (library, scan_duration, analysis_duration) =
            match self.build_library(started_at, reporter) {
                Ok(built) => built,
                Err(err) => {
                    self.gate.release(grant);
                    return Err(err);
                }
            };
        let overview = library.overview();

        let previous = *self.gate.state()?;
        self.gate.commit(grant)?;
        if let Err(err) = self.persist_scan(started_at, &overview) {
            self.gate.load(previous);
            return Err(err);
        }

        self.selection.reload(library);
        info!(
            "Scan complete: {} assets, {} duplicate groups, {} bytes reclaimable",
            overview.total_assets, overview.duplicate_groups, overview.potential_savings_bytes
        );

        Ok(ScanReport {
            scan_duration,
            analysis_duration,
            overview,
        })
    }

    /// Re-read the device so a cleanup acts on the library as it is now.
    /// Consumes no scan and is not recorded in the history.
    pub fn refresh_library(
        &mut self,
        reporter: &dyn ProgressReporter,
    ) -> Result<LibraryOverview, Error> {
        let (library, _, _) = self.build_library(Utc::now(), reporter)?;
        let overview = library.overview();
        self.selection.reload(library);
        debug!(
            "Library refreshed: {} assets, {} duplicate groups",
            overview.total_assets, overview.duplicate_groups
        );
        Ok(overview)
    }

    fn build_library(
        &self,
        started_at: DateTime<Utc>,
        reporter: &dyn ProgressReporter,
    ) -> Result<(Library, Duration, Duration), Error> {
        info!("Scanning photo library...");
        reporter.on_scan_start();
        let scan_start = Instant::now();
        let assets = self
            .collaborators
            .scanner
            .scan()
            .map_err(Error::ScanFailed)?;
        let scan_duration = scan_start.elapsed();
        reporter.on_scan_complete(assets.len(), scan_duration.as_secs_f64());

        let analysis_start = Instant::now();
        let proposals = self.collaborators.similarity.group(&assets);
        let options = BuildOptions {
            filter: self.config.group_filter(),
            large_file_threshold_bytes: self.config.large_file_threshold_bytes,
            now: started_at,
        };
        let library = Library::build(
            assets,
            proposals,
            &options,
            self.collaborators.compression.as_ref(),
        )?;
        let analysis_duration = analysis_start.elapsed();
        let overview = library.overview();
        reporter.on_analysis_complete(
            overview.duplicate_groups,
            overview.large_files,
            analysis_duration.as_secs_f64(),
        );
        Ok((library, scan_duration, analysis_duration))
    }

    fn persist_scan(&self, started_at: DateTime<Utc>, overview: &LibraryOverview) -> Result<(), Error> {
        if let Some(store) = &self.store {
            store.save_entitlement(self.gate.state()?)?;
            let record = ScanRecord::from_overview(started_at, Utc::now(), overview);
            store.record_scan(&record)?;
        }
        Ok(())
    }

    /// Delete every selected asset in `scope`, consuming one cleanup per asset.
    pub fn delete_selected(
        &mut self,
        scope: Scope,
        reporter: &dyn ProgressReporter,
    ) -> Result<DeletionOutcome, Error> {
        let assets = self.selection.selected_assets(scope)?;
        if assets.is_empty() {
            return Ok(DeletionOutcome::default());
        }
        let units = u32::try_from(assets.len()).unwrap_or(u32::MAX);
        let grant = self.gate.authorize(Action::Cleanup, units)?;

        reporter.on_delete_start(assets.len());
        let outcome = match self.collaborators.deletion.delete(&assets) {
            Ok(outcome) => outcome,
            Err(reason) => {
                self.gate.release(grant);
                return Err(Error::DeletionFailed(reason));
            }
        };

        let removed: HashSet<AssetId> = assets.into_iter().map(|a| a.id).collect();
        let rebuilt = self.selection.library().without(&removed);
        self.selection.reload(rebuilt);
        self.gate.commit(grant)?;
        reporter.on_delete_complete(outcome.deleted, outcome.bytes_freed);
        info!(
            "Deleted {} assets, {} bytes freed",
            outcome.deleted, outcome.bytes_freed
        );

        self.persist_entitlement()?;
        Ok(outcome)
    }

    /// Compress the selected, compressible large files in `scope`. Pro only.
    pub fn compress_selected(
        &mut self,
        scope: Scope,
        reporter: &dyn ProgressReporter,
    ) -> Result<CompressionOutcome, Error> {
        let selected = self.selection.selected_assets(scope)?;
        let assets: Vec<_> = selected
            .into_iter()
            .filter(|a| {
                self.library()
                    .large_files()
                    .iter()
                    .any(|f| f.asset.id == a.id && f.is_compressible())
            })
            .collect();
        let units = u32::try_from(assets.len()).unwrap_or(u32::MAX);
        let grant = self.gate.authorize(Action::Compress, units)?;
        if assets.is_empty() {
            debug!("Nothing compressible selected in {:?}", scope);
            self.gate.release(grant);
            return Ok(CompressionOutcome::default());
        }

        reporter.on_compress_start(assets.len());
        let outcome = match self.collaborators.compression.compress(&assets) {
            Ok(outcome) => outcome,
            Err(reason) => {
                self.gate.release(grant);
                return Err(Error::CompressionFailed(reason));
            }
        };

        let ids: Vec<AssetId> = assets.into_iter().map(|a| a.id).collect();
        self.selection.deselect(&ids);
        self.gate.commit(grant)?;
        reporter.on_compress_complete(outcome.compressed, outcome.bytes_saved);
        info!(
            "Compressed {} assets, {} bytes saved",
            outcome.compressed, outcome.bytes_saved
        );
        Ok(outcome)
    }

    pub fn scan_history(&self, limit: usize) -> Result<Vec<ScanRecord>, Error> {
        match &self.store {
            Some(store) => store.scan_history(limit),
            None => Ok(Vec::new()),
        }
    }

    pub fn clear_scan_history(&self) -> Result<(), Error> {
        if let Some(store) = &self.store {
            store.clear_scan_history()?;
        }
        Ok(())
    }
}
