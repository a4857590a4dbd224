use photo_sweep_core::analysis::Period;
use photo_sweep_core::asset::{filter_by_kind, sorted_view};
use photo_sweep_core::entitlement::DenialReason;
use photo_sweep_core::{Asset, Decision, StorageSummary};

use crate::error::{map_core_error, ps_free_string, set_last_error};
use crate::handle::with_handle;
use crate::types::*;

fn core_scope(scope: PsScope) -> Result<photo_sweep_core::Scope, PsResultCode> {
    scope.to_scope().ok_or_else(|| {
        set_last_error(format!("Invalid scope {:?}", scope));
        PsResultCode::InvalidArgument
    })
}

/// Ask whether an action may run, without reserving anything.
///
/// # Safety
/// `out_decision` must be a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn ps_can_perform(
    handle: u64,
    action: u32,
    units: u32,
    out_decision: *mut PsDecision,
) -> PsResultCode {
    if out_decision.is_null() {
        set_last_error("out_decision is null".to_string());
        return PsResultCode::InvalidArgument;
    }
    let action = match action_from_code(action) {
        Some(action) => action,
        None => {
            set_last_error(format!("Invalid action {}", action));
            return PsResultCode::InvalidArgument;
        }
    };

    let result = with_handle(handle, |state| {
        *out_decision = match state.gate.can_perform(action, units) {
            Decision::Allowed => PsDecision {
                allowed: true,
                ..PsDecision::default()
            },
            Decision::Denied(DenialReason::QuotaExceeded {
                requested,
                remaining,
            }) => PsDecision {
                allowed: false,
                reason: 1,
                requested,
                remaining,
            },
            Decision::Denied(DenialReason::ProOnly) => PsDecision {
                allowed: false,
                reason: 2,
                ..PsDecision::default()
            },
            Decision::Denied(DenialReason::NotLoaded) => PsDecision {
                allowed: false,
                reason: 3,
                ..PsDecision::default()
            },
        };
        PsResultCode::Ok
    });

    result.unwrap_or(PsResultCode::InvalidHandle)
}

/// # Safety
/// `out_entitlement` must be a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn ps_query_entitlement(
    handle: u64,
    out_entitlement: *mut PsEntitlement,
) -> PsResultCode {
    if out_entitlement.is_null() {
        set_last_error("out_entitlement is null".to_string());
        return PsResultCode::InvalidArgument;
    }

    let result = with_handle(handle, |state| match state.gate.state() {
        Ok(s) => {
            *out_entitlement = PsEntitlement::new(s.tier, s.scans_remaining, s.cleanups_remaining);
            PsResultCode::Ok
        }
        Err(e) => map_core_error(e),
    });

    result.unwrap_or(PsResultCode::InvalidHandle)
}

/// Whether a Pro-only feature (0 = auto scan, 1 = cloud sync) is enabled.
/// Unknown handles and features report false.
#[no_mangle]
pub extern "C" fn ps_is_feature_enabled(handle: u64, feature: u32) -> bool {
    match feature_from_code(feature) {
        Some(feature) => with_handle(handle, |state| state.gate.is_feature_enabled(feature))
            .unwrap_or(false),
        None => false,
    }
}

/// Selected count and bytes in a scope, each asset counted once.
///
/// # Safety
/// `out_totals` must be a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn ps_query_totals(
    handle: u64,
    scope: PsScope,
    out_totals: *mut PsTotals,
) -> PsResultCode {
    if out_totals.is_null() {
        set_last_error("out_totals is null".to_string());
        return PsResultCode::InvalidArgument;
    }
    let scope = match core_scope(scope) {
        Ok(scope) => scope,
        Err(code) => return code,
    };

    let result = with_handle(handle, |state| match state.selection.totals(scope) {
        Ok(totals) => {
            *out_totals = PsTotals {
                count: totals.count as u64,
                bytes: totals.bytes,
            };
            PsResultCode::Ok
        }
        Err(e) => map_core_error(e),
    });

    result.unwrap_or(PsResultCode::InvalidHandle)
}

/// # Safety
/// `out_actions` must be a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn ps_query_enabled_actions(
    handle: u64,
    scope: PsScope,
    out_actions: *mut PsEnabledActions,
) -> PsResultCode {
    if out_actions.is_null() {
        set_last_error("out_actions is null".to_string());
        return PsResultCode::InvalidArgument;
    }
    let scope = match core_scope(scope) {
        Ok(scope) => scope,
        Err(code) => return code,
    };

    let result = with_handle(handle, |state| match state.selection.enabled_actions(scope) {
        Ok(actions) => {
            *out_actions = PsEnabledActions {
                delete: actions.delete,
                compress: actions.compress,
                keep_recommended: actions.keep_recommended,
            };
            PsResultCode::Ok
        }
        Err(e) => map_core_error(e),
    });

    result.unwrap_or(PsResultCode::InvalidHandle)
}

/// Estimated bytes saved by compressing the selected large files in a scope.
///
/// # Safety
/// `out_bytes` must be a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn ps_query_compression_savings(
    handle: u64,
    scope: PsScope,
    out_bytes: *mut u64,
) -> PsResultCode {
    if out_bytes.is_null() {
        set_last_error("out_bytes is null".to_string());
        return PsResultCode::InvalidArgument;
    }
    let scope = match core_scope(scope) {
        Ok(scope) => scope,
        Err(code) => return code,
    };

    let result = with_handle(handle, |state| {
        match state.selection.compression_savings(scope) {
            Ok(bytes) => {
                *out_bytes = bytes;
                PsResultCode::Ok
            }
            Err(e) => map_core_error(e),
        }
    });

    result.unwrap_or(PsResultCode::InvalidHandle)
}

/// # Safety
/// `out_overview` must be a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn ps_query_overview(
    handle: u64,
    out_overview: *mut PsOverview,
) -> PsResultCode {
    if out_overview.is_null() {
        set_last_error("out_overview is null".to_string());
        return PsResultCode::InvalidArgument;
    }

    let result = with_handle(handle, |state| {
        let o = state.selection.library().overview();
        *out_overview = PsOverview {
            total_assets: o.total_assets as u64,
            total_bytes: o.total_bytes,
            duplicate_groups: o.duplicate_groups as u64,
            potential_savings_bytes: o.potential_savings_bytes,
            large_files: o.large_files as u64,
            screenshots: o.screenshots as u64,
        };
        PsResultCode::Ok
    });

    result.unwrap_or(PsResultCode::InvalidHandle)
}

/// Query all duplicate groups of the current library.
///
/// # Safety
/// `out_page` must be a valid pointer. The returned page must be freed with `ps_free_group_page`.
#[no_mangle]
pub unsafe extern "C" fn ps_query_groups(handle: u64, out_page: *mut PsGroupPage) -> PsResultCode {
    if out_page.is_null() {
        set_last_error("out_page is null".to_string());
        return PsResultCode::InvalidArgument;
    }

    let result = with_handle(handle, |state| {
        let groups: Vec<PsGroup> = state
            .selection
            .library()
            .groups()
            .iter()
            .map(|g| PsGroup {
                group_id: g.group_id(),
                match_type: match_type_code(g.match_type()),
                confidence: g.confidence(),
                member_count: g.members().len() as u32,
                total_bytes: g.total_bytes(),
                savings_bytes: g.savings_bytes(),
                recommended_id: rust_string_to_c(g.recommended_member().id.as_str()),
            })
            .collect();

        let (groups, count) = into_raw_page(groups);
        *out_page = PsGroupPage { groups, count };
        PsResultCode::Ok
    });

    result.unwrap_or(PsResultCode::InvalidHandle)
}

/// Free a group page allocated by `ps_query_groups`.
///
/// # Safety
/// `page` must have been returned by `ps_query_groups`.
#[no_mangle]
pub unsafe extern "C" fn ps_free_group_page(page: *mut PsGroupPage) {
    if page.is_null() {
        return;
    }
    let page = &*page;
    if let Some(groups) = from_raw_page(page.groups, page.count) {
        for group in groups.iter() {
            ps_free_string(group.recommended_id);
        }
    }
}

/// Query the members of one group, in display order, with selection flags.
///
/// # Safety
/// `out_page` must be a valid pointer. The returned page must be freed with `ps_free_asset_page`.
#[no_mangle]
pub unsafe extern "C" fn ps_query_group_members(
    handle: u64,
    group_id: u64,
    out_page: *mut PsAssetPage,
) -> PsResultCode {
    if out_page.is_null() {
        set_last_error("out_page is null".to_string());
        return PsResultCode::InvalidArgument;
    }

    let result = with_handle(handle, |state| {
        let group = match state.selection.library().group(group_id) {
            Some(group) => group,
            None => {
                set_last_error(format!("Unknown duplicate group: {}", group_id));
                return PsResultCode::UnknownGroup;
            }
        };

        let assets: Vec<PsAsset> = group
            .members()
            .iter()
            .map(|a| {
                PsAsset::new(
                    a,
                    state.selection.is_selected(&a.id),
                    group.is_recommended(&a.id),
                )
            })
            .collect();

        let (assets, count) = into_raw_page(assets);
        *out_page = PsAssetPage { assets, count };
        PsResultCode::Ok
    });

    result.unwrap_or(PsResultCode::InvalidHandle)
}

unsafe fn free_asset_strings(asset: &PsAsset) {
    ps_free_string(asset.id);
    ps_free_string(asset.filename);
}

/// Free an asset page allocated by `ps_query_group_members` or
/// `ps_query_bucket_assets`.
///
/// # Safety
/// `page` must have been returned by one of those functions.
#[no_mangle]
pub unsafe extern "C" fn ps_free_asset_page(page: *mut PsAssetPage) {
    if page.is_null() {
        return;
    }
    let page = &*page;
    if let Some(assets) = from_raw_page(page.assets, page.count) {
        for asset in assets.iter() {
            free_asset_strings(asset);
        }
    }
}

/// Screenshot buckets of the current library. Periods without screenshots
/// are left out.
///
/// # Safety
/// `out_page` must be a valid pointer. The returned page must be freed with `ps_free_bucket_page`.
#[no_mangle]
pub unsafe extern "C" fn ps_query_buckets(handle: u64, out_page: *mut PsBucketPage) -> PsResultCode {
    if out_page.is_null() {
        set_last_error("out_page is null".to_string());
        return PsResultCode::InvalidArgument;
    }

    let result = with_handle(handle, |state| {
        let buckets: Vec<PsBucket> = state
            .selection
            .library()
            .buckets()
            .iter()
            .map(|b| PsBucket {
                period: b.period().index(),
                count: b.assets().len() as u32,
                total_bytes: b.total_bytes(),
                selected_count: b
                    .assets()
                    .iter()
                    .filter(|a| state.selection.is_selected(&a.id))
                    .count() as u32,
            })
            .collect();

        let (buckets, count) = into_raw_page(buckets);
        *out_page = PsBucketPage { buckets, count };
        PsResultCode::Ok
    });

    result.unwrap_or(PsResultCode::InvalidHandle)
}

/// # Safety
/// `page` must have been returned by `ps_query_buckets`.
#[no_mangle]
pub unsafe extern "C" fn ps_free_bucket_page(page: *mut PsBucketPage) {
    if page.is_null() {
        return;
    }
    let page = &*page;
    drop(from_raw_page(page.buckets, page.count));
}

/// Screenshots of one period (0 = today .. 4 = older), sorted by `sort_key`
/// (`PsSortKey`) in `sort_order` (`PsSortOrder`). An absent period yields an
/// empty page.
///
/// # Safety
/// `out_page` must be a valid pointer. The returned page must be freed with `ps_free_asset_page`.
#[no_mangle]
pub unsafe extern "C" fn ps_query_bucket_assets(
    handle: u64,
    period: u32,
    sort_key: u32,
    sort_order: u32,
    out_page: *mut PsAssetPage,
) -> PsResultCode {
    if out_page.is_null() {
        set_last_error("out_page is null".to_string());
        return PsResultCode::InvalidArgument;
    }
    let period = match Period::from_index(period) {
        Some(period) => period,
        None => {
            set_last_error(format!("Invalid period {}", period));
            return PsResultCode::InvalidArgument;
        }
    };
    let (key, order) = match sort_from_codes(sort_key, sort_order) {
        Some(sort) => sort,
        None => {
            set_last_error(format!("Invalid sort {} / {}", sort_key, sort_order));
            return PsResultCode::InvalidArgument;
        }
    };

    let result = with_handle(handle, |state| {
        let in_period: &[Asset] = state
            .selection
            .library()
            .bucket(period)
            .map(|b| b.assets())
            .unwrap_or(&[]);
        let assets: Vec<PsAsset> = sorted_view(in_period, key, order)
            .into_iter()
            .map(|a| PsAsset::new(a, state.selection.is_selected(&a.id), false))
            .collect();

        let (assets, count) = into_raw_page(assets);
        *out_page = PsAssetPage { assets, count };
        PsResultCode::Ok
    });

    result.unwrap_or(PsResultCode::InvalidHandle)
}

/// Large files of the current library, narrowed to `kind` (`PsKindFilter`)
/// and sorted by `sort_key` in `sort_order`.
///
/// # Safety
/// `out_page` must be a valid pointer. The returned page must be freed with `ps_free_large_file_page`.
#[no_mangle]
pub unsafe extern "C" fn ps_query_large_files(
    handle: u64,
    kind: u32,
    sort_key: u32,
    sort_order: u32,
    out_page: *mut PsLargeFilePage,
) -> PsResultCode {
    if out_page.is_null() {
        set_last_error("out_page is null".to_string());
        return PsResultCode::InvalidArgument;
    }
    let kind = match kind_filter_from_code(kind) {
        Some(kind) => kind,
        None => {
            set_last_error(format!("Invalid kind filter {}", kind));
            return PsResultCode::InvalidArgument;
        }
    };
    let (key, order) = match sort_from_codes(sort_key, sort_order) {
        Some(sort) => sort,
        None => {
            set_last_error(format!("Invalid sort {} / {}", sort_key, sort_order));
            return PsResultCode::InvalidArgument;
        }
    };

    let result = with_handle(handle, |state| {
        let files = state.selection.library().large_files();
        let visible = sorted_view(filter_by_kind(files.iter().map(|f| &f.asset), kind), key, order);
        let page: Vec<PsLargeFile> = visible
            .into_iter()
            .filter_map(|asset| files.iter().find(|f| f.asset.id == asset.id))
            .map(|f| PsLargeFile {
                asset: PsAsset::new(&f.asset, state.selection.is_selected(&f.asset.id), false),
                estimated_compressed_bytes: f.estimated_compressed_bytes.unwrap_or(0),
                savings_bytes: f.compression_savings(),
                is_compressible: f.is_compressible(),
                size_tier: size_tier_code(f.size_tier()),
            })
            .collect();

        let (files, count) = into_raw_page(page);
        *out_page = PsLargeFilePage { files, count };
        PsResultCode::Ok
    });

    result.unwrap_or(PsResultCode::InvalidHandle)
}

/// # Safety
/// `page` must have been returned by `ps_query_large_files`.
#[no_mangle]
pub unsafe extern "C" fn ps_free_large_file_page(page: *mut PsLargeFilePage) {
    if page.is_null() {
        return;
    }
    let page = &*page;
    if let Some(files) = from_raw_page(page.files, page.count) {
        for file in files.iter() {
            free_asset_strings(&file.asset);
        }
    }
}

/// Storage usage from two scalars. Needs no session.
///
/// # Safety
/// `out_summary` must be a valid pointer.
#[no_mangle]
pub unsafe extern "C" fn ps_storage_summary(
    used_bytes: u64,
    total_bytes: u64,
    out_summary: *mut PsStorageSummary,
) -> PsResultCode {
    if out_summary.is_null() {
        set_last_error("out_summary is null".to_string());
        return PsResultCode::InvalidArgument;
    }
    let summary = StorageSummary::new(used_bytes, total_bytes);
    *out_summary = PsStorageSummary {
        used_bytes: summary.used_bytes,
        total_bytes: summary.total_bytes,
        free_bytes: summary.free_bytes,
        percent_used: summary.percent_used,
        severity: severity_code(summary.severity),
    };
    PsResultCode::Ok
}
