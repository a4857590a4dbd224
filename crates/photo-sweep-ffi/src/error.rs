use crate::types::{rust_string_to_c, PsResultCode};
use photo_sweep_core::Error;
use std::cell::RefCell;
use std::ffi::c_char;

thread_local! {
    static LAST_ERROR: RefCell<Option<String>> = RefCell::new(None);
}

pub fn set_last_error(msg: String) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = Some(msg);
    });
}

pub fn map_core_error(e: Error) -> PsResultCode {
    set_last_error(e.to_string());
    match e {
        Error::InvalidGroup(_) => PsResultCode::InvalidGroup,
        Error::QuotaExceeded { .. } => PsResultCode::QuotaExceeded,
        Error::ProFeature(_) => PsResultCode::ProFeature,
        Error::EntitlementDesync => PsResultCode::EntitlementDesync,
        Error::UnknownAsset(_) => PsResultCode::UnknownAsset,
        Error::UnknownGroup(_) => PsResultCode::UnknownGroup,
        Error::Io(_) => PsResultCode::IoError,
        Error::Database(_) => PsResultCode::DatabaseError,
        Error::Config(_) | Error::Serialization(_) => PsResultCode::InvalidArgument,
        _ => PsResultCode::InternalError,
    }
}

/// Get the last error message. Returns a C string that must be freed with `ps_free_string`.
///
/// # Safety
/// Caller must free the returned string with `ps_free_string`.
#[no_mangle]
pub extern "C" fn ps_last_error_message() -> *mut c_char {
    LAST_ERROR.with(|e| {
        let msg = e.borrow();
        match msg.as_ref() {
            Some(s) => rust_string_to_c(s),
            None => rust_string_to_c(""),
        }
    })
}

/// Free a string allocated by the FFI layer.
///
/// # Safety
/// `ptr` must have been allocated by this library (e.g., from `ps_last_error_message`).
#[no_mangle]
pub unsafe extern "C" fn ps_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(std::ffi::CString::from_raw(ptr));
    }
}
