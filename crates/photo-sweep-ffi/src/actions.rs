use chrono::{DateTime, TimeZone, Utc};
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::ffi::c_char;
use tracing::{debug, info};

use photo_sweep_core::analysis::GroupProposal;
use photo_sweep_core::collaborators::{CompressionOutcome, CompressionService, PersistenceStore};
use photo_sweep_core::library::BuildOptions;
use photo_sweep_core::storage::models::ScanRecord;
use photo_sweep_core::storage::Database;
use photo_sweep_core::{AppConfig, Asset, AssetId, EntitlementGate, EntitlementState, Error, Library};

use crate::error::{map_core_error, set_last_error};
use crate::handle::{allocate_handle, destroy_handle, with_handle, SessionState};
use crate::types::*;

/// Library snapshot handed over by the host after it scanned and grouped.
#[derive(Debug, Deserialize)]
struct LibraryPayload {
    assets: Vec<Asset>,
    #[serde(default)]
    proposals: Vec<GroupProposal>,
    #[serde(default)]
    compression_estimates: HashMap<AssetId, u64>,
}

/// Compression estimates precomputed by the host. Compression itself runs on
/// the host, so `compress` is never reached through this bridge.
struct EstimateTable(HashMap<AssetId, u64>);

impl CompressionService for EstimateTable {
    fn estimate(&self, asset: &Asset) -> Option<u64> {
        self.0.get(&asset.id).copied()
    }

    fn compress(&self, _assets: &[Asset]) -> Result<CompressionOutcome, String> {
        Err("compression runs on the host".to_string())
    }
}

fn timestamp(unix_secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(unix_secs, 0).single()
}

fn persist_entitlement(state: &SessionState) -> PsResultCode {
    let result = state
        .gate
        .state()
        .and_then(|entitlement| state.db.save_entitlement(entitlement));
    match result {
        Ok(()) => PsResultCode::Ok,
        Err(e) => map_core_error(e),
    }
}

/// Open a session on the given database, loading the persisted entitlement
/// (or starting a new free install). Returns a handle or 0 on failure.
///
/// # Safety
/// `db_path` must be a valid null-terminated C string or null.
#[no_mangle]
pub unsafe extern "C" fn ps_session_create(db_path: *const c_char) -> u64 {
    let config = match c_string_to_rust(db_path) {
        Some(path) => AppConfig {
            database_path: path,
            ..AppConfig::default()
        },
        None => AppConfig::default(),
    };

    let db = match Database::open(&config.database_path) {
        Ok(db) => db,
        Err(e) => {
            set_last_error(format!("Failed to open database: {}", e));
            return 0;
        }
    };

    let limits = config.free_tier_limits();
    let entitlement = match db.load_entitlement() {
        Ok(Some(state)) => state,
        Ok(None) => {
            let fresh = EntitlementState::new_install(limits);
            if let Err(e) = db.save_entitlement(&fresh) {
                set_last_error(e.to_string());
                return 0;
            }
            fresh
        }
        Err(e) => {
            set_last_error(e.to_string());
            return 0;
        }
    };

    let gate = EntitlementGate::with_state(entitlement, limits);
    let handle = allocate_handle(SessionState::new(config, db, gate));
    debug!("Session {} opened", handle);
    handle
}

/// Destroy a session and free its resources. Unsettled grants are dropped
/// without consuming quota.
#[no_mangle]
pub extern "C" fn ps_session_destroy(handle: u64) -> PsResultCode {
    if destroy_handle(handle) {
        PsResultCode::Ok
    } else {
        set_last_error("Invalid handle".to_string());
        PsResultCode::InvalidHandle
    }
}

/// Replace the session's library with a freshly scanned one. `library_json`
/// holds `assets`, optional `proposals` and optional `compression_estimates`.
/// Screenshot periods are computed relative to `now_unix`. Selections of
/// assets that survive the rebuild are kept.
///
/// # Safety
/// `library_json` must be a valid null-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn ps_load_library(
    handle: u64,
    library_json: *const c_char,
    now_unix: i64,
) -> PsResultCode {
    let json = match c_string_to_rust(library_json) {
        Some(json) => json,
        None => {
            set_last_error("library_json is null or not UTF-8".to_string());
            return PsResultCode::InvalidArgument;
        }
    };
    let payload: LibraryPayload = match serde_json::from_str(&json) {
        Ok(payload) => payload,
        Err(e) => return map_core_error(Error::from(e)),
    };
    let now = match timestamp(now_unix) {
        Some(now) => now,
        None => {
            set_last_error(format!("Invalid timestamp {}", now_unix));
            return PsResultCode::InvalidArgument;
        }
    };

    let result = with_handle(handle, |state| {
        let options = BuildOptions {
            filter: state.config.group_filter(),
            large_file_threshold_bytes: state.config.large_file_threshold_bytes,
            now,
        };
        let estimates = EstimateTable(payload.compression_estimates);
        match Library::build(payload.assets, payload.proposals, &options, &estimates) {
            Ok(library) => {
                info!(
                    "Library loaded: {} assets, {} groups",
                    library.assets().len(),
                    library.groups().len()
                );
                state.selection.reload(library);
                PsResultCode::Ok
            }
            Err(e) => map_core_error(e),
        }
    });

    result.unwrap_or(PsResultCode::InvalidHandle)
}

/// Flip the selection of one asset.
///
/// # Safety
/// `asset_id` must be a valid null-terminated C string; `out_selected` must be valid or null.
#[no_mangle]
pub unsafe extern "C" fn ps_toggle(
    handle: u64,
    asset_id: *const c_char,
    out_selected: *mut bool,
) -> PsResultCode {
    let id = match c_string_to_rust(asset_id) {
        Some(id) => AssetId::from(id),
        None => {
            set_last_error("asset_id is null or not UTF-8".to_string());
            return PsResultCode::InvalidArgument;
        }
    };

    let result = with_handle(handle, |state| match state.selection.toggle(&id) {
        Ok(selected) => {
            if !out_selected.is_null() {
                *out_selected = selected;
            }
            PsResultCode::Ok
        }
        Err(e) => map_core_error(e),
    });

    result.unwrap_or(PsResultCode::InvalidHandle)
}

/// Select every member of a group except the recommended one.
#[no_mangle]
pub extern "C" fn ps_select_recommended(handle: u64, group_id: u64) -> PsResultCode {
    let result = with_handle(handle, |state| {
        match state.selection.select_recommended_deletions(group_id) {
            Ok(()) => PsResultCode::Ok,
            Err(e) => map_core_error(e),
        }
    });

    result.unwrap_or(PsResultCode::InvalidHandle)
}

fn set_scope(handle: u64, scope: PsScope, selected: bool) -> PsResultCode {
    let scope = match scope.to_scope() {
        Some(scope) => scope,
        None => {
            set_last_error(format!("Invalid scope {:?}", scope));
            return PsResultCode::InvalidArgument;
        }
    };

    let result = with_handle(handle, |state| {
        let outcome = if selected {
            state.selection.select_all(scope)
        } else {
            state.selection.deselect_all(scope)
        };
        match outcome {
            Ok(()) => PsResultCode::Ok,
            Err(e) => map_core_error(e),
        }
    });

    result.unwrap_or(PsResultCode::InvalidHandle)
}

#[no_mangle]
pub extern "C" fn ps_select_all(handle: u64, scope: PsScope) -> PsResultCode {
    set_scope(handle, scope, true)
}

#[no_mangle]
pub extern "C" fn ps_deselect_all(handle: u64, scope: PsScope) -> PsResultCode {
    set_scope(handle, scope, false)
}

/// Reserve quota for an action before the host performs it. On success
/// `out_grant` receives a grant id to pass to `ps_commit` once the action
/// succeeded, or to `ps_release` if it failed.
///
/// # Safety
/// `out_grant` must be a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn ps_authorize(
    handle: u64,
    action: u32,
    units: u32,
    out_grant: *mut u64,
) -> PsResultCode {
    if out_grant.is_null() {
        set_last_error("out_grant is null".to_string());
        return PsResultCode::InvalidArgument;
    }
    let action = match action_from_code(action) {
        Some(action) => action,
        None => {
            set_last_error(format!("Invalid action {}", action));
            return PsResultCode::InvalidArgument;
        }
    };

    let result = with_handle(handle, |state| match state.gate.authorize(action, units) {
        Ok(grant) => {
            *out_grant = state.hold_grant(grant);
            PsResultCode::Ok
        }
        Err(e) => map_core_error(e),
    });

    result.unwrap_or(PsResultCode::InvalidHandle)
}

/// Consume the quota held by a grant and persist the new entitlement.
#[no_mangle]
pub extern "C" fn ps_commit(handle: u64, grant_id: u64) -> PsResultCode {
    let result = with_handle(handle, |state| {
        let grant = match state.pending_grants.remove(&grant_id) {
            Some(grant) => grant,
            None => {
                set_last_error(format!("Unknown grant {}", grant_id));
                return PsResultCode::InvalidArgument;
            }
        };
        if let Err(e) = state.gate.commit(grant) {
            return map_core_error(e);
        }
        persist_entitlement(state)
    });

    result.unwrap_or(PsResultCode::InvalidHandle)
}

/// Return the quota reserved by a grant without consuming it.
#[no_mangle]
pub extern "C" fn ps_release(handle: u64, grant_id: u64) -> PsResultCode {
    let result = with_handle(handle, |state| {
        match state.pending_grants.remove(&grant_id) {
            Some(grant) => {
                state.gate.release(grant);
                PsResultCode::Ok
            }
            None => {
                set_last_error(format!("Unknown grant {}", grant_id));
                PsResultCode::InvalidArgument
            }
        }
    });

    result.unwrap_or(PsResultCode::InvalidHandle)
}

/// Remove assets the host deleted. Groups left with fewer than two members
/// dissolve; selections of removed assets are dropped.
///
/// # Safety
/// `ids` must be a valid array of `count` null-terminated C strings.
#[no_mangle]
pub unsafe extern "C" fn ps_remove_assets(
    handle: u64,
    ids: *const *const c_char,
    count: u32,
) -> PsResultCode {
    if ids.is_null() && count > 0 {
        set_last_error("ids is null".to_string());
        return PsResultCode::InvalidArgument;
    }

    let mut removed = HashSet::with_capacity(count as usize);
    for i in 0..count {
        let id_ptr = *ids.add(i as usize);
        match c_string_to_rust(id_ptr) {
            Some(id) => {
                removed.insert(AssetId::from(id));
            }
            None => {
                set_last_error(format!("Invalid asset id at index {}", i));
                return PsResultCode::InvalidArgument;
            }
        }
    }

    let result = with_handle(handle, |state| {
        let rebuilt = state.selection.library().without(&removed);
        state.selection.reload(rebuilt);
        PsResultCode::Ok
    });

    result.unwrap_or(PsResultCode::InvalidHandle)
}

/// Forward a purchase event (0 = purchase confirmed, 1 = subscription lapsed).
#[no_mangle]
pub extern "C" fn ps_apply_purchase_event(handle: u64, event: u32) -> PsResultCode {
    let event = match purchase_event_from_code(event) {
        Some(event) => event,
        None => {
            set_last_error(format!("Invalid purchase event {}", event));
            return PsResultCode::InvalidArgument;
        }
    };

    let result = with_handle(handle, |state| {
        if let Err(e) = state.gate.apply(event) {
            return map_core_error(e);
        }
        persist_entitlement(state)
    });

    result.unwrap_or(PsResultCode::InvalidHandle)
}

/// Billing period boundary: free quotas return to their defaults.
#[no_mangle]
pub extern "C" fn ps_period_rollover(handle: u64) -> PsResultCode {
    let result = with_handle(handle, |state| {
        if let Err(e) = state.gate.period_rollover() {
            return map_core_error(e);
        }
        persist_entitlement(state)
    });

    result.unwrap_or(PsResultCode::InvalidHandle)
}

/// Append the current library overview to the scan history.
#[no_mangle]
pub extern "C" fn ps_record_scan(handle: u64, started_unix: i64, completed_unix: i64) -> PsResultCode {
    let (started, completed) = match (timestamp(started_unix), timestamp(completed_unix)) {
        (Some(started), Some(completed)) => (started, completed),
        _ => {
            set_last_error("Invalid scan timestamps".to_string());
            return PsResultCode::InvalidArgument;
        }
    };

    let result = with_handle(handle, |state| {
        let overview = state.selection.library().overview();
        let record = ScanRecord::from_overview(started, completed, &overview);
        match state.db.record_scan(&record) {
            Ok(_) => PsResultCode::Ok,
            Err(e) => map_core_error(e),
        }
    });

    result.unwrap_or(PsResultCode::InvalidHandle)
}
