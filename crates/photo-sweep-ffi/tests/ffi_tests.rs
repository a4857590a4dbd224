use std::ffi::{CStr, CString};
use std::ptr;
use tempfile::tempdir;

use photo_sweep_ffi::actions::*;
use photo_sweep_ffi::error::*;
use photo_sweep_ffi::queries::*;
use photo_sweep_ffi::types::*;

// ── Helpers ──────────────────────────────────────────────────────────────────

const NOW: i64 = 1_718_470_800; // 2024-06-15T17:00:00Z

fn c_str(s: &str) -> CString {
    CString::new(s).unwrap()
}

fn create_session(db_path: &str) -> u64 {
    let path = c_str(db_path);
    unsafe { ps_session_create(path.as_ptr()) }
}

fn last_error() -> String {
    let ptr = ps_last_error_message();
    let msg = unsafe { CStr::from_ptr(ptr) }.to_str().unwrap().to_string();
    unsafe { ps_free_string(ptr) };
    msg
}

/// Three 2.8 MB exact copies, a similar pair with quality scores, two
/// screenshots and one large compressible video.
const LIBRARY: &str = r#"{
    "assets": [
        {"id": "a", "size_bytes": 2800000, "captured_at": "2024-06-01T10:00:00Z", "kind": "photo"},
        {"id": "b", "size_bytes": 2800000, "captured_at": "2024-06-01T10:00:01Z", "kind": "photo"},
        {"id": "c", "size_bytes": 2800000, "captured_at": "2024-06-01T10:00:02Z", "kind": "photo"},
        {"id": "s1", "size_bytes": 1000, "captured_at": "2024-06-15T09:00:00Z", "kind": "photo", "is_screenshot": true},
        {"id": "s2", "size_bytes": 2000, "captured_at": "2024-06-14T09:00:00Z", "kind": "photo", "is_screenshot": true},
        {"id": "p", "size_bytes": 3000000, "captured_at": "2024-05-01T10:00:00Z", "kind": "photo"},
        {"id": "q", "size_bytes": 2500000, "captured_at": "2024-05-01T10:00:03Z", "kind": "photo"},
        {"id": "clip", "size_bytes": 60000000, "captured_at": "2024-01-05T08:00:00Z", "kind": "video"}
    ],
    "proposals": [
        {"group_id": 1, "match_type": "exact", "members": [
            {"id": "a", "size_bytes": 2800000, "captured_at": "2024-06-01T10:00:00Z", "kind": "photo"},
            {"id": "b", "size_bytes": 2800000, "captured_at": "2024-06-01T10:00:01Z", "kind": "photo"},
            {"id": "c", "size_bytes": 2800000, "captured_at": "2024-06-01T10:00:02Z", "kind": "photo"}
        ]},
        {"group_id": 2, "match_type": "similar", "confidence": 0.95,
         "quality_scores": {"p": 0.3, "q": 0.8},
         "members": [
            {"id": "p", "size_bytes": 3000000, "captured_at": "2024-05-01T10:00:00Z", "kind": "photo"},
            {"id": "q", "size_bytes": 2500000, "captured_at": "2024-05-01T10:00:03Z", "kind": "photo"}
        ]}
    ],
    "compression_estimates": {"clip": 20000000}
}"#;

fn loaded_session(db_path: &str) -> u64 {
    let handle = create_session(db_path);
    assert_ne!(handle, 0);
    let json = c_str(LIBRARY);
    let code = unsafe { ps_load_library(handle, json.as_ptr(), NOW) };
    assert_eq!(code, PsResultCode::Ok, "{}", last_error());
    handle
}

fn scope(kind: PsScopeKind, value: u64) -> PsScope {
    PsScope {
        kind: kind as u32,
        value,
    }
}

fn totals(handle: u64, s: PsScope) -> PsTotals {
    let mut out = PsTotals::default();
    assert_eq!(unsafe { ps_query_totals(handle, s, &mut out) }, PsResultCode::Ok);
    out
}

fn entitlement(handle: u64) -> PsEntitlement {
    let mut out = PsEntitlement {
        is_pro: false,
        scans_remaining: 0,
        cleanups_remaining: 0,
    };
    assert_eq!(unsafe { ps_query_entitlement(handle, &mut out) }, PsResultCode::Ok);
    out
}

// ── Handle lifecycle ─────────────────────────────────────────────────────────

#[test]
fn test_handle_create_and_destroy() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let handle = create_session(db_path.to_str().unwrap());
    assert_ne!(handle, 0, "handle should be non-zero");

    assert_eq!(ps_session_destroy(handle), PsResultCode::Ok);
    assert_eq!(ps_session_destroy(handle), PsResultCode::InvalidHandle);
}

#[test]
fn test_new_install_starts_free() {
    let dir = tempdir().unwrap();
    let handle = create_session(dir.path().join("test.db").to_str().unwrap());

    let state = entitlement(handle);
    assert!(!state.is_pro);
    assert_eq!(state.scans_remaining, 3);
    assert_eq!(state.cleanups_remaining, 50);
    assert!(!ps_is_feature_enabled(handle, PsFeature::AutoScan as u32));
    ps_session_destroy(handle);
}

#[test]
fn test_invalid_handle_reported() {
    let mut out = PsTotals::default();
    let code = unsafe { ps_query_totals(987_654, scope(PsScopeKind::Global, 0), &mut out) };
    assert_eq!(code, PsResultCode::InvalidHandle);
}

// ── Library and selection ────────────────────────────────────────────────────

#[test]
fn test_load_library_overview() {
    let dir = tempdir().unwrap();
    let handle = loaded_session(dir.path().join("test.db").to_str().unwrap());

    let mut overview = PsOverview::default();
    assert_eq!(unsafe { ps_query_overview(handle, &mut overview) }, PsResultCode::Ok);
    assert_eq!(overview.total_assets, 8);
    assert_eq!(overview.duplicate_groups, 2);
    assert_eq!(overview.potential_savings_bytes, 5_600_000 + 3_000_000);
    assert_eq!(overview.screenshots, 2);
    assert_eq!(overview.large_files, 1);
    ps_session_destroy(handle);
}

#[test]
fn test_invalid_library_json() {
    let dir = tempdir().unwrap();
    let handle = create_session(dir.path().join("test.db").to_str().unwrap());
    let json = c_str("{\"assets\": 5}");
    let code = unsafe { ps_load_library(handle, json.as_ptr(), NOW) };
    assert_eq!(code, PsResultCode::InvalidArgument);
    assert!(!last_error().is_empty());
    ps_session_destroy(handle);
}

#[test]
fn test_select_recommended_matches_savings() {
    let dir = tempdir().unwrap();
    let handle = loaded_session(dir.path().join("test.db").to_str().unwrap());

    assert_eq!(ps_select_recommended(handle, 1), PsResultCode::Ok);
    let t = totals(handle, scope(PsScopeKind::Group, 1));
    assert_eq!(t.count, 2);
    assert_eq!(t.bytes, 5_600_000);

    let mut page = PsGroupPage {
        groups: ptr::null_mut(),
        count: 0,
    };
    assert_eq!(unsafe { ps_query_groups(handle, &mut page) }, PsResultCode::Ok);
    assert_eq!(page.count, 2);
    let groups = unsafe { std::slice::from_raw_parts(page.groups, page.count as usize) };
    assert_eq!(groups[0].savings_bytes, t.bytes);
    let keep = unsafe { CStr::from_ptr(groups[1].recommended_id) };
    assert_eq!(keep.to_str().unwrap(), "q");
    unsafe { ps_free_group_page(&mut page) };

    assert_eq!(ps_select_recommended(handle, 42), PsResultCode::UnknownGroup);
    ps_session_destroy(handle);
}

#[test]
fn test_toggle_and_group_members() {
    let dir = tempdir().unwrap();
    let handle = loaded_session(dir.path().join("test.db").to_str().unwrap());

    let id = c_str("b");
    let mut selected = false;
    assert_eq!(unsafe { ps_toggle(handle, id.as_ptr(), &mut selected) }, PsResultCode::Ok);
    assert!(selected);

    let mut page = PsAssetPage {
        assets: ptr::null_mut(),
        count: 0,
    };
    assert_eq!(
        unsafe { ps_query_group_members(handle, 1, &mut page) },
        PsResultCode::Ok
    );
    let members = unsafe { std::slice::from_raw_parts(page.assets, page.count as usize) };
    assert!(members[0].is_recommended);
    assert!(!members[0].is_selected);
    assert!(members[1].is_selected);
    unsafe { ps_free_asset_page(&mut page) };

    assert_eq!(unsafe { ps_toggle(handle, id.as_ptr(), &mut selected) }, PsResultCode::Ok);
    assert!(!selected);

    let unknown = c_str("nope");
    assert_eq!(
        unsafe { ps_toggle(handle, unknown.as_ptr(), ptr::null_mut()) },
        PsResultCode::UnknownAsset
    );
    ps_session_destroy(handle);
}

#[test]
fn test_period_scope_and_enabled_actions() {
    let dir = tempdir().unwrap();
    let handle = loaded_session(dir.path().join("test.db").to_str().unwrap());

    // period index 1 = yesterday
    assert_eq!(
        ps_select_all(handle, scope(PsScopeKind::Period, 1)),
        PsResultCode::Ok
    );
    assert_eq!(totals(handle, scope(PsScopeKind::Global, 0)).count, 1);

    let mut actions = PsEnabledActions::default();
    let code = unsafe {
        ps_query_enabled_actions(handle, scope(PsScopeKind::Period, 1), &mut actions)
    };
    assert_eq!(code, PsResultCode::Ok);
    assert!(actions.delete);
    assert!(!actions.compress);
    assert!(!actions.keep_recommended);

    assert_eq!(
        ps_select_all(handle, scope(PsScopeKind::Period, 9)),
        PsResultCode::InvalidArgument
    );
    ps_session_destroy(handle);
}

#[test]
fn test_compression_savings_for_large_files() {
    let dir = tempdir().unwrap();
    let handle = loaded_session(dir.path().join("test.db").to_str().unwrap());

    ps_select_all(handle, scope(PsScopeKind::LargeFiles, 0));
    let mut bytes = 0;
    let code = unsafe {
        ps_query_compression_savings(handle, scope(PsScopeKind::LargeFiles, 0), &mut bytes)
    };
    assert_eq!(code, PsResultCode::Ok);
    assert_eq!(bytes, 40_000_000);
    ps_session_destroy(handle);
}

/// Three screenshots from today and three large files of mixed kinds.
const SCREENS_AND_LARGE: &str = r#"{
    "assets": [
        {"id": "t1", "filename": "IMG_1.PNG", "size_bytes": 500, "captured_at": "2024-06-15T09:00:00Z", "kind": "photo", "is_screenshot": true},
        {"id": "t2", "filename": "IMG_3.PNG", "size_bytes": 3000, "captured_at": "2024-06-15T12:00:00Z", "kind": "photo", "is_screenshot": true},
        {"id": "t3", "filename": "IMG_2.PNG", "size_bytes": 1500, "captured_at": "2024-06-15T15:00:00Z", "kind": "photo", "is_screenshot": true},
        {"id": "pano", "size_bytes": 30000000, "captured_at": "2024-02-01T10:00:00Z", "kind": "photo"},
        {"id": "clip", "size_bytes": 60000000, "captured_at": "2024-03-01T10:00:00Z", "kind": "video"},
        {"id": "short", "size_bytes": 8000000, "captured_at": "2024-04-01T10:00:00Z", "kind": "video"}
    ],
    "compression_estimates": {"clip": 20000000}
}"#;

fn session_with(db_path: &str, json: &str) -> u64 {
    let handle = create_session(db_path);
    let json = c_str(json);
    let code = unsafe { ps_load_library(handle, json.as_ptr(), NOW) };
    assert_eq!(code, PsResultCode::Ok, "{}", last_error());
    handle
}

unsafe fn asset_ids(assets: *const PsAsset, count: u32) -> Vec<String> {
    (0..count as usize)
        .map(|i| {
            let asset = &*assets.add(i);
            CStr::from_ptr(asset.id).to_str().unwrap().to_string()
        })
        .collect()
}

#[test]
fn test_screenshot_buckets() {
    let dir = tempdir().unwrap();
    let handle = session_with(dir.path().join("test.db").to_str().unwrap(), SCREENS_AND_LARGE);
    let t2 = c_str("t2");
    assert_eq!(
        unsafe { ps_toggle(handle, t2.as_ptr(), ptr::null_mut()) },
        PsResultCode::Ok
    );

    let mut page = PsBucketPage {
        buckets: ptr::null_mut(),
        count: 0,
    };
    assert_eq!(unsafe { ps_query_buckets(handle, &mut page) }, PsResultCode::Ok);
    assert_eq!(page.count, 1);
    let today = unsafe { *page.buckets };
    assert_eq!(today.period, 0);
    assert_eq!(today.count, 3);
    assert_eq!(today.total_bytes, 5_000);
    assert_eq!(today.selected_count, 1);
    unsafe { ps_free_bucket_page(&mut page) };
    ps_session_destroy(handle);
}

#[test]
fn test_bucket_assets_follow_sort() {
    let dir = tempdir().unwrap();
    let handle = session_with(dir.path().join("test.db").to_str().unwrap(), SCREENS_AND_LARGE);

    let query = |key: PsSortKey, order: PsSortOrder| -> Vec<String> {
        let mut page = PsAssetPage {
            assets: ptr::null_mut(),
            count: 0,
        };
        let code = unsafe { ps_query_bucket_assets(handle, 0, key as u32, order as u32, &mut page) };
        assert_eq!(code, PsResultCode::Ok);
        let ids = unsafe { asset_ids(page.assets, page.count) };
        unsafe { ps_free_asset_page(&mut page) };
        ids
    };

    assert_eq!(query(PsSortKey::Size, PsSortOrder::Descending), ["t2", "t3", "t1"]);
    assert_eq!(query(PsSortKey::Name, PsSortOrder::Ascending), ["t1", "t3", "t2"]);
    assert_eq!(query(PsSortKey::Date, PsSortOrder::Descending), ["t3", "t2", "t1"]);

    // yesterday holds nothing
    let mut page = PsAssetPage {
        assets: ptr::null_mut(),
        count: 0,
    };
    let code = unsafe { ps_query_bucket_assets(handle, 1, 0, 0, &mut page) };
    assert_eq!(code, PsResultCode::Ok);
    assert_eq!(page.count, 0);

    let code = unsafe { ps_query_bucket_assets(handle, 7, 0, 0, &mut page) };
    assert_eq!(code, PsResultCode::InvalidArgument);
    let code = unsafe { ps_query_bucket_assets(handle, 0, 9, 0, &mut page) };
    assert_eq!(code, PsResultCode::InvalidArgument);
    ps_session_destroy(handle);
}

#[test]
fn test_large_files_filtered_and_sorted() {
    let dir = tempdir().unwrap();
    let handle = session_with(dir.path().join("test.db").to_str().unwrap(), SCREENS_AND_LARGE);

    let mut page = PsLargeFilePage {
        files: ptr::null_mut(),
        count: 0,
    };
    let code = unsafe {
        ps_query_large_files(
            handle,
            PsKindFilter::Video as u32,
            PsSortKey::Size as u32,
            PsSortOrder::Descending as u32,
            &mut page,
        )
    };
    assert_eq!(code, PsResultCode::Ok);
    assert_eq!(page.count, 2);
    let files = unsafe { std::slice::from_raw_parts(page.files, page.count as usize) };
    let clip = &files[0];
    assert_eq!(unsafe { CStr::from_ptr(clip.asset.id) }.to_str().unwrap(), "clip");
    assert!(clip.asset.is_video);
    assert!(clip.is_compressible);
    assert_eq!(clip.estimated_compressed_bytes, 20_000_000);
    assert_eq!(clip.savings_bytes, 40_000_000);
    assert_eq!(clip.size_tier, 3);
    let short = &files[1];
    assert!(!short.is_compressible);
    assert_eq!(short.estimated_compressed_bytes, 0);
    assert_eq!(short.size_tier, 0);
    unsafe { ps_free_large_file_page(&mut page) };

    let code = unsafe {
        ps_query_large_files(
            handle,
            PsKindFilter::All as u32,
            PsSortKey::Date as u32,
            PsSortOrder::Ascending as u32,
            &mut page,
        )
    };
    assert_eq!(code, PsResultCode::Ok);
    let ids: Vec<String> = unsafe { std::slice::from_raw_parts(page.files, page.count as usize) }
        .iter()
        .map(|f| unsafe { CStr::from_ptr(f.asset.id) }.to_str().unwrap().to_string())
        .collect();
    assert_eq!(ids, ["pano", "clip", "short"]);
    let files = unsafe { std::slice::from_raw_parts(page.files, page.count as usize) };
    assert_eq!(files[0].size_tier, 2);
    unsafe { ps_free_large_file_page(&mut page) };

    let code = unsafe { ps_query_large_files(handle, 5, 0, 0, &mut page) };
    assert_eq!(code, PsResultCode::InvalidArgument);
    ps_session_destroy(handle);
}

// ── Entitlements ─────────────────────────────────────────────────────────────

#[test]
fn test_cleanup_grant_commit_and_release() {
    let dir = tempdir().unwrap();
    let handle = loaded_session(dir.path().join("test.db").to_str().unwrap());

    let mut grant = 0;
    let code = unsafe { ps_authorize(handle, PsAction::Cleanup as u32, 10, &mut grant) };
    assert_eq!(code, PsResultCode::Ok);
    // nothing consumed until the host reports success
    assert_eq!(entitlement(handle).cleanups_remaining, 50);
    assert_eq!(ps_commit(handle, grant), PsResultCode::Ok);
    assert_eq!(entitlement(handle).cleanups_remaining, 40);
    assert_eq!(ps_commit(handle, grant), PsResultCode::InvalidArgument);

    let mut decision = PsDecision::default();
    let code = unsafe { ps_can_perform(handle, PsAction::Cleanup as u32, 41, &mut decision) };
    assert_eq!(code, PsResultCode::Ok);
    assert!(!decision.allowed);
    assert_eq!(decision.reason, 1);
    assert_eq!(decision.requested, 41);
    assert_eq!(decision.remaining, 40);

    let code = unsafe { ps_authorize(handle, PsAction::Cleanup as u32, 41, &mut grant) };
    assert_eq!(code, PsResultCode::QuotaExceeded);

    let code = unsafe { ps_authorize(handle, PsAction::Cleanup as u32, 5, &mut grant) };
    assert_eq!(code, PsResultCode::Ok);
    assert_eq!(ps_release(handle, grant), PsResultCode::Ok);
    assert_eq!(entitlement(handle).cleanups_remaining, 40);
    ps_session_destroy(handle);
}

#[test]
fn test_outstanding_grants_cannot_overdraw_quota() {
    let dir = tempdir().unwrap();
    let handle = loaded_session(dir.path().join("test.db").to_str().unwrap());

    let mut first = 0;
    let mut second = 0;
    let code = unsafe { ps_authorize(handle, PsAction::Cleanup as u32, 40, &mut first) };
    assert_eq!(code, PsResultCode::Ok);
    let code = unsafe { ps_authorize(handle, PsAction::Cleanup as u32, 40, &mut second) };
    assert_eq!(code, PsResultCode::QuotaExceeded);

    let mut decision = PsDecision::default();
    unsafe { ps_can_perform(handle, PsAction::Cleanup as u32, 11, &mut decision) };
    assert!(!decision.allowed);
    assert_eq!(decision.remaining, 10);

    let code = unsafe { ps_authorize(handle, PsAction::Cleanup as u32, 10, &mut second) };
    assert_eq!(code, PsResultCode::Ok);
    assert_eq!(ps_commit(handle, first), PsResultCode::Ok);
    assert_eq!(ps_commit(handle, second), PsResultCode::Ok);
    assert_eq!(entitlement(handle).cleanups_remaining, 0);
    ps_session_destroy(handle);
}

#[test]
fn test_pro_grant_settled_after_lapse_is_free() {
    let dir = tempdir().unwrap();
    let handle = loaded_session(dir.path().join("test.db").to_str().unwrap());
    assert_eq!(
        ps_apply_purchase_event(handle, PsPurchaseEvent::PurchaseConfirmed as u32),
        PsResultCode::Ok
    );

    let mut grant = 0;
    let code = unsafe { ps_authorize(handle, PsAction::Cleanup as u32, 30, &mut grant) };
    assert_eq!(code, PsResultCode::Ok);
    assert_eq!(
        ps_apply_purchase_event(handle, PsPurchaseEvent::SubscriptionLapsed as u32),
        PsResultCode::Ok
    );
    assert_eq!(ps_commit(handle, grant), PsResultCode::Ok);
    assert_eq!(entitlement(handle).cleanups_remaining, 50);
    ps_session_destroy(handle);
}

#[test]
fn test_compress_requires_pro() {
    let dir = tempdir().unwrap();
    let handle = create_session(dir.path().join("test.db").to_str().unwrap());

    let mut grant = 0;
    let code = unsafe { ps_authorize(handle, PsAction::Compress as u32, 1, &mut grant) };
    assert_eq!(code, PsResultCode::ProFeature);

    assert_eq!(
        ps_apply_purchase_event(handle, PsPurchaseEvent::PurchaseConfirmed as u32),
        PsResultCode::Ok
    );
    let code = unsafe { ps_authorize(handle, PsAction::Compress as u32, 1, &mut grant) };
    assert_eq!(code, PsResultCode::Ok);
    assert!(ps_is_feature_enabled(handle, PsFeature::CloudSync as u32));
    ps_session_destroy(handle);
}

#[test]
fn test_entitlement_persists_across_sessions() {
    let dir = tempdir().unwrap();
    let db_path = dir.path().join("test.db");
    let db_path = db_path.to_str().unwrap();

    let handle = create_session(db_path);
    let mut grant = 0;
    unsafe { ps_authorize(handle, PsAction::Scan as u32, 1, &mut grant) };
    assert_eq!(ps_commit(handle, grant), PsResultCode::Ok);
    ps_session_destroy(handle);

    let handle = create_session(db_path);
    assert_eq!(entitlement(handle).scans_remaining, 2);

    assert_eq!(ps_period_rollover(handle), PsResultCode::Ok);
    assert_eq!(entitlement(handle).scans_remaining, 3);
    ps_session_destroy(handle);
}

#[test]
fn test_remove_assets_dissolves_group() {
    let dir = tempdir().unwrap();
    let handle = loaded_session(dir.path().join("test.db").to_str().unwrap());

    let ids = [c_str("p")];
    let ptrs: Vec<*const std::ffi::c_char> = ids.iter().map(|s| s.as_ptr()).collect();
    let code = unsafe { ps_remove_assets(handle, ptrs.as_ptr(), ptrs.len() as u32) };
    assert_eq!(code, PsResultCode::Ok);

    let mut overview = PsOverview::default();
    unsafe { ps_query_overview(handle, &mut overview) };
    assert_eq!(overview.total_assets, 7);
    assert_eq!(overview.duplicate_groups, 1);
    ps_session_destroy(handle);
}

// ── Storage summary ──────────────────────────────────────────────────────────

#[test]
fn test_storage_summary() {
    let mut out = PsStorageSummary {
        used_bytes: 0,
        total_bytes: 0,
        free_bytes: 0,
        percent_used: 0.0,
        severity: 0,
    };
    assert_eq!(unsafe { ps_storage_summary(0, 0, &mut out) }, PsResultCode::Ok);
    assert_eq!(out.percent_used, 0.0);
    assert_eq!(out.severity, 0);

    unsafe { ps_storage_summary(115_000_000_000, 128_000_000_000, &mut out) };
    assert_eq!(out.free_bytes, 13_000_000_000);
    assert_eq!(out.severity, 1);
}
