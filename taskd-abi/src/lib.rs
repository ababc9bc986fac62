//! The C ABI contract a compiled task script and the engine's executor speak
//! to each other over.
//!
//! A script is a `cdylib` exposing one of two entry points:
//!
//! - `taskd_run(params_json, worker_id, task_id) -> *mut c_char` — the
//!   `main(params, context)` shape.
//! - `taskd_module_run(params_json) -> *mut c_char` — the factory/`run(params)`
//!   shape, with no execution context.
//!
//! Both receive and return NUL-terminated JSON strings. Any string returned
//! across the boundary must be freed by the caller via [`taskd_free`] (the
//! host calls the *script's* copy of that symbol, since the string was
//! allocated by the script's allocator).

use serde::{de::DeserializeOwned, Serialize};
use std::ffi::{c_char, CStr, CString};

/// Read and parse a JSON value from a NUL-terminated C string pointer.
///
/// # Safety
/// `ptr` must be a valid, NUL-terminated, UTF-8 string pointer.
pub unsafe fn decode<T: DeserializeOwned>(ptr: *const c_char) -> Result<T, String> {
    if ptr.is_null() {
        return Err("null pointer passed across the taskd-abi boundary".into());
    }
    let s = CStr::from_ptr(ptr)
        .to_str()
        .map_err(|e| format!("invalid utf-8 in taskd-abi payload: {e}"))?;
    serde_json::from_str(s).map_err(|e| format!("invalid json in taskd-abi payload: {e}"))
}

/// Serialize `value` to JSON and leak it as an owned, NUL-terminated C
/// string. The caller is responsible for eventually passing the returned
/// pointer to [`taskd_free`].
pub fn encode<T: Serialize>(value: &T) -> *mut c_char {
    let json = serde_json::to_string(value).unwrap_or_else(|_| "null".to_owned());
    CString::new(json)
        .unwrap_or_else(|_| CString::new("null").unwrap())
        .into_raw()
}

/// Reclaim and drop a string previously returned by [`encode`].
///
/// # Safety
/// `ptr` must have been produced by [`encode`] in the same allocator (i.e.
/// within the same compiled script) and must not be freed twice.
pub unsafe fn free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

/// Re-exported by every compiled script via `#[no_mangle]` so the host can
/// free strings the script allocated.
#[macro_export]
macro_rules! export_free_symbol {
    () => {
        #[no_mangle]
        pub unsafe extern "C" fn taskd_free(ptr: *mut ::std::os::raw::c_char) {
            $crate::free_string(ptr)
        }
    };
}
