use std::ffi::{c_char, CStr, CString};
use std::ptr;

use photo_sweep_core::analysis::{MatchType, Period, SizeTier};
use photo_sweep_core::asset::{KindFilter, SortKey, SortOrder};
use photo_sweep_core::entitlement::{Action, Feature, PurchaseEvent};
use photo_sweep_core::{Asset, AssetKind, Scope, Severity, Tier};

/// Result codes returned by all FFI functions.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsResultCode {
    Ok = 0,
    InvalidHandle = 1,
    InvalidArgument = 2,
    IoError = 3,
    DatabaseError = 4,
    InvalidGroup = 5,
    QuotaExceeded = 6,
    ProFeature = 7,
    EntitlementDesync = 8,
    UnknownAsset = 9,
    UnknownGroup = 10,
    InternalError = 99,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsScopeKind {
    Group = 0,
    Period = 1,
    LargeFiles = 2,
    Global = 3,
}

/// A selection scope. `kind` is a `PsScopeKind`; `value` is the group id for
/// `Group` and the period index (0 = today .. 4 = older) for `Period`, and is
/// ignored otherwise.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct PsScope {
    pub kind: u32,
    pub value: u64,
}

impl PsScope {
    pub fn to_scope(self) -> Option<Scope> {
        match self.kind {
            k if k == PsScopeKind::Group as u32 => Some(Scope::Group(self.value)),
            k if k == PsScopeKind::Period as u32 => u32::try_from(self.value)
                .ok()
                .and_then(Period::from_index)
                .map(Scope::Period),
            k if k == PsScopeKind::LargeFiles as u32 => Some(Scope::LargeFiles),
            k if k == PsScopeKind::Global as u32 => Some(Scope::Global),
            _ => None,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsAction {
    Scan = 0,
    Cleanup = 1,
    Compress = 2,
}

/// Decode an action passed across the boundary as a plain integer.
pub fn action_from_code(code: u32) -> Option<Action> {
    match code {
        c if c == PsAction::Scan as u32 => Some(Action::Scan),
        c if c == PsAction::Cleanup as u32 => Some(Action::Cleanup),
        c if c == PsAction::Compress as u32 => Some(Action::Compress),
        _ => None,
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsFeature {
    AutoScan = 0,
    CloudSync = 1,
}

pub fn feature_from_code(code: u32) -> Option<Feature> {
    match code {
        c if c == PsFeature::AutoScan as u32 => Some(Feature::AutoScan),
        c if c == PsFeature::CloudSync as u32 => Some(Feature::CloudSync),
        _ => None,
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsPurchaseEvent {
    PurchaseConfirmed = 0,
    SubscriptionLapsed = 1,
}

pub fn purchase_event_from_code(code: u32) -> Option<PurchaseEvent> {
    match code {
        c if c == PsPurchaseEvent::PurchaseConfirmed as u32 => Some(PurchaseEvent::PurchaseConfirmed),
        c if c == PsPurchaseEvent::SubscriptionLapsed as u32 => Some(PurchaseEvent::SubscriptionLapsed),
        _ => None,
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsSortKey {
    Date = 0,
    Size = 1,
    Name = 2,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsSortOrder {
    Ascending = 0,
    Descending = 1,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PsKindFilter {
    All = 0,
    Photo = 1,
    Video = 2,
}

pub fn sort_from_codes(key: u32, order: u32) -> Option<(SortKey, SortOrder)> {
    let key = match key {
        k if k == PsSortKey::Date as u32 => SortKey::Date,
        k if k == PsSortKey::Size as u32 => SortKey::Size,
        k if k == PsSortKey::Name as u32 => SortKey::Name,
        _ => return None,
    };
    let order = match order {
        o if o == PsSortOrder::Ascending as u32 => SortOrder::Ascending,
        o if o == PsSortOrder::Descending as u32 => SortOrder::Descending,
        _ => return None,
    };
    Some((key, order))
}

pub fn kind_filter_from_code(code: u32) -> Option<KindFilter> {
    match code {
        c if c == PsKindFilter::All as u32 => Some(KindFilter::All),
        c if c == PsKindFilter::Photo as u32 => Some(KindFilter::Photo),
        c if c == PsKindFilter::Video as u32 => Some(KindFilter::Video),
        _ => None,
    }
}

/// Outcome of `ps_can_perform`. `reason`: 0 = allowed, 1 = quota exceeded,
/// 2 = pro only, 3 = entitlements not loaded.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PsDecision {
    pub allowed: bool,
    pub reason: u32,
    pub requested: u32,
    pub remaining: u32,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PsEntitlement {
    pub is_pro: bool,
    pub scans_remaining: u32,
    pub cleanups_remaining: u32,
}

impl PsEntitlement {
    pub fn new(tier: Tier, scans_remaining: u32, cleanups_remaining: u32) -> Self {
        Self {
            is_pro: tier == Tier::Pro,
            scans_remaining,
            cleanups_remaining,
        }
    }
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PsTotals {
    pub count: u64,
    pub bytes: u64,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PsEnabledActions {
    pub delete: bool,
    pub compress: bool,
    pub keep_recommended: bool,
}

#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PsOverview {
    pub total_assets: u64,
    pub total_bytes: u64,
    pub duplicate_groups: u64,
    pub potential_savings_bytes: u64,
    pub large_files: u64,
    pub screenshots: u64,
}

/// `severity`: 0 = normal, 1 = warning, 2 = critical.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PsStorageSummary {
    pub used_bytes: u64,
    pub total_bytes: u64,
    pub free_bytes: u64,
    pub percent_used: f64,
    pub severity: u32,
}

pub fn severity_code(severity: Severity) -> u32 {
    match severity {
        Severity::Normal => 0,
        Severity::Warning => 1,
        Severity::Critical => 2,
    }
}

pub fn match_type_code(match_type: MatchType) -> u32 {
    match match_type {
        MatchType::Exact => 0,
        MatchType::Similar => 1,
        MatchType::Burst => 2,
        MatchType::Screenshot => 3,
    }
}

/// A page of duplicate groups.
#[repr(C)]
pub struct PsGroupPage {
    pub groups: *mut PsGroup,
    pub count: u32,
}

/// A single duplicate group. `match_type`: 0 = exact, 1 = similar, 2 = burst, 3 = screenshot.
#[repr(C)]
pub struct PsGroup {
    pub group_id: u64,
    pub match_type: u32,
    pub confidence: f64,
    pub member_count: u32,
    pub total_bytes: u64,
    pub savings_bytes: u64,
    pub recommended_id: *mut c_char,
}

/// A page of assets.
#[repr(C)]
pub struct PsAssetPage {
    pub assets: *mut PsAsset,
    pub count: u32,
}

/// A single asset with its selection flags.
#[repr(C)]
pub struct PsAsset {
    pub id: *mut c_char,
    pub filename: *mut c_char,
    pub size_bytes: u64,
    pub captured_at: i64,
    pub is_video: bool,
    pub is_selected: bool,
    pub is_recommended: bool,
}

impl PsAsset {
    pub fn new(asset: &Asset, is_selected: bool, is_recommended: bool) -> Self {
        Self {
            id: rust_string_to_c(asset.id.as_str()),
            filename: rust_string_to_c(&asset.filename),
            size_bytes: asset.size_bytes,
            captured_at: asset.captured_at.timestamp(),
            is_video: asset.kind == AssetKind::Video,
            is_selected,
            is_recommended,
        }
    }
}

/// Screenshots captured in one period. `period`: 0 = today .. 4 = older.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PsBucket {
    pub period: u32,
    pub count: u32,
    pub total_bytes: u64,
    pub selected_count: u32,
}

/// A page of screenshot buckets, newest period first.
#[repr(C)]
pub struct PsBucketPage {
    pub buckets: *mut PsBucket,
    pub count: u32,
}

/// A file above the large-file threshold. `estimated_compressed_bytes` is
/// 0 when no estimate is available. `size_tier`: 0 = normal, 1 = medium,
/// 2 = large, 3 = huge.
#[repr(C)]
pub struct PsLargeFile {
    pub asset: PsAsset,
    pub estimated_compressed_bytes: u64,
    pub savings_bytes: u64,
    pub is_compressible: bool,
    pub size_tier: u32,
}

#[repr(C)]
pub struct PsLargeFilePage {
    pub files: *mut PsLargeFile,
    pub count: u32,
}

pub fn size_tier_code(tier: SizeTier) -> u32 {
    match tier {
        SizeTier::Normal => 0,
        SizeTier::Medium => 1,
        SizeTier::Large => 2,
        SizeTier::Huge => 3,
    }
}

/// Hand a vector to C as a pointer and length. Empty pages are null.
pub fn into_raw_page<T>(items: Vec<T>) -> (*mut T, u32) {
    if items.is_empty() {
        return (ptr::null_mut(), 0);
    }
    let count = items.len() as u32;
    (Box::into_raw(items.into_boxed_slice()) as *mut T, count)
}

/// Take back a page produced by [`into_raw_page`].
///
/// # Safety
/// `items` and `count` must come from the same `into_raw_page` call.
pub unsafe fn from_raw_page<T>(items: *mut T, count: u32) -> Option<Box<[T]>> {
    if items.is_null() || count == 0 {
        return None;
    }
    let slice = std::slice::from_raw_parts_mut(items, count as usize);
    Some(Box::from_raw(slice as *mut [T]))
}

/// Helper to convert a Rust string to a C string on the heap.
pub fn rust_string_to_c(s: &str) -> *mut c_char {
    CString::new(s)
        .map(|cs| cs.into_raw())
        .unwrap_or(ptr::null_mut())
}

/// Helper to convert a C string to a Rust string.
///
/// # Safety
/// The caller must ensure `ptr` is a valid null-terminated C string.
pub unsafe fn c_string_to_rust(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}
