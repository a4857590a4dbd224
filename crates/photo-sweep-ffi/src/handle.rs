use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use photo_sweep_core::entitlement::Grant;
use photo_sweep_core::storage::Database;
use photo_sweep_core::{AppConfig, EntitlementGate, SelectionEngine};

static NEXT_HANDLE: AtomicU64 = AtomicU64::new(1);

/// Everything one host session owns: the selection over the current library,
/// the entitlement gate and the grants handed out but not yet settled.
pub struct SessionState {
    pub config: AppConfig,
    pub db: Database,
    pub gate: EntitlementGate,
    pub selection: SelectionEngine,
    pub pending_grants: HashMap<u64, Grant>,
    pub next_grant: u64,
}

impl SessionState {
    pub fn new(config: AppConfig, db: Database, gate: EntitlementGate) -> Self {
        Self {
            config,
            db,
            gate,
            selection: SelectionEngine::default(),
            pending_grants: HashMap::new(),
            next_grant: 1,
        }
    }

    pub fn hold_grant(&mut self, grant: Grant) -> u64 {
        let id = self.next_grant;
        self.next_grant += 1;
        self.pending_grants.insert(id, grant);
        id
    }
}

lazy_static! {
    static ref HANDLES: Mutex<HashMap<u64, Box<SessionState>>> = Mutex::new(HashMap::new());
}

pub fn allocate_handle(state: SessionState) -> u64 {
    let handle = NEXT_HANDLE.fetch_add(1, Ordering::SeqCst);
    let mut handles = HANDLES.lock().unwrap_or_else(|e| e.into_inner());
    handles.insert(handle, Box::new(state));
    handle
}

pub fn with_handle<F, R>(handle: u64, f: F) -> Option<R>
where
    F: FnOnce(&mut SessionState) -> R,
{
    let mut handles = HANDLES.lock().unwrap_or_else(|e| e.into_inner());
    handles.get_mut(&handle).map(|state| f(state))
}

pub fn destroy_handle(handle: u64) -> bool {
    let mut handles = HANDLES.lock().unwrap_or_else(|e| e.into_inner());
    handles.remove(&handle).is_some()
}
