//! FFI bindings for Healthsync Flux
//!
//! This module provides C-compatible functions for calling the pipeline from
//! other languages. All functions use C strings (null-terminated) and return
//! allocated memory that must be freed by the caller using
//! `healthsync_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use chrono::Utc;

use crate::config::ProcessorConfig;
use crate::error::ComputeError;
use crate::pipeline::{exports_to_dashboard, HealthProcessor};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Config from an optional JSON string; NULL means defaults
unsafe fn config_from_ptr(config_json: *const c_char) -> Result<ProcessorConfig, String> {
    if config_json.is_null() {
        return Ok(ProcessorConfig::default());
    }
    let raw = cstr_to_string(config_json).ok_or("Invalid config string pointer")?;
    ProcessorConfig::from_json_str(&raw).map_err(|e| e.to_string())
}

fn finish(result: Result<String, ComputeError>) -> *mut c_char {
    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Process stored export JSON and return the dashboard payload JSON.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - `config_json` must be a valid null-terminated C string or NULL (defaults).
/// - Returns a newly allocated string that must be freed with `healthsync_free_string`.
/// - Returns NULL on error; call `healthsync_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn healthsync_process_json(
    json: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    let config = match config_from_ptr(config_json) {
        Ok(config) => config,
        Err(msg) => {
            set_last_error(&msg);
            return ptr::null_mut();
        }
    };

    finish(exports_to_dashboard(&json_str, &config))
}

// ============================================================================
// Processor API
// ============================================================================

/// Opaque handle to a HealthProcessor
pub struct HealthProcessorHandle {
    processor: HealthProcessor,
}

/// Create a processor from a JSON config (NULL for defaults).
///
/// # Safety
/// - `config_json` must be a valid null-terminated C string or NULL.
/// - Must be freed with `healthsync_processor_free`.
/// - Returns NULL on error.
#[no_mangle]
pub unsafe extern "C" fn healthsync_processor_new(
    config_json: *const c_char,
) -> *mut HealthProcessorHandle {
    clear_last_error();

    let processor = match config_from_ptr(config_json)
        .and_then(|config| HealthProcessor::new(config).map_err(|e| e.to_string()))
    {
        Ok(processor) => processor,
        Err(msg) => {
            set_last_error(&msg);
            return ptr::null_mut();
        }
    };
    Box::into_raw(Box::new(HealthProcessorHandle { processor }))
}

/// Free a processor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `healthsync_processor_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn healthsync_processor_free(processor: *mut HealthProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Recompute the dashboard from a full export snapshot.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `healthsync_processor_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `healthsync_free_string`.
/// - Returns NULL on error; call `healthsync_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn healthsync_processor_process(
    processor: *const HealthProcessorHandle,
    json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }
    let handle = &*processor;

    let json_str = match cstr_to_string(json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid JSON string pointer");
            return ptr::null_mut();
        }
    };

    let processor = &handle.processor;
    finish(
        processor
            .process_json(&json_str, Utc::now())
            .and_then(|dashboard| processor.encoder().encode_to_json(dashboard, processor.config())),
    )
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by healthsync functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a healthsync function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn healthsync_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next healthsync call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn healthsync_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn healthsync_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_json() -> CString {
        CString::new(
            r#"[{
                "timestamp": "2024-01-16T06:00:00Z",
                "metrics": [{"name": "step_count", "units": "count", "data": [
                    {"date": "2024-01-15 08:00:00 +0000", "qty": 1200},
                    {"date": "2024-01-15 09:00:00 +0000", "qty": 800}
                ]}]
            }]"#,
        )
        .unwrap()
    }

    fn utc_config() -> CString {
        CString::new(r#"{"timezone": "UTC"}"#).unwrap()
    }

    #[test]
    fn test_ffi_process_json() {
        let json = sample_json();
        let config = utc_config();

        unsafe {
            let result = healthsync_process_json(json.as_ptr(), config.as_ptr());
            assert!(!result.is_null());

            let result_str = CStr::from_ptr(result).to_str().unwrap();
            let payload: serde_json::Value = serde_json::from_str(result_str).unwrap();
            assert_eq!(payload["days"][0]["steps"], 2000.0);
            assert_eq!(payload["timezone"], "+00:00");

            healthsync_free_string(result);
        }
    }

    #[test]
    fn test_ffi_default_config() {
        let json = sample_json();
        unsafe {
            let result = healthsync_process_json(json.as_ptr(), ptr::null());
            assert!(!result.is_null());
            healthsync_free_string(result);
        }
    }

    #[test]
    fn test_ffi_invalid_json() {
        let json = CString::new("not valid json").unwrap();

        unsafe {
            let result = healthsync_process_json(json.as_ptr(), ptr::null());
            assert!(result.is_null());

            let error = healthsync_last_error();
            assert!(!error.is_null());
            let error_str = CStr::from_ptr(error).to_str().unwrap();
            assert!(error_str.contains("JSON"));
        }
    }

    #[test]
    fn test_ffi_invalid_config() {
        let json = sample_json();
        let config = CString::new(r#"{"trend_window": 0}"#).unwrap();

        unsafe {
            let result = healthsync_process_json(json.as_ptr(), config.as_ptr());
            assert!(result.is_null());
            assert!(!healthsync_last_error().is_null());

            let processor = healthsync_processor_new(config.as_ptr());
            assert!(processor.is_null());
        }
    }

    #[test]
    fn test_ffi_processor() {
        let json = sample_json();
        let config = utc_config();

        unsafe {
            let processor = healthsync_processor_new(config.as_ptr());
            assert!(!processor.is_null());

            let first = healthsync_processor_process(processor, json.as_ptr());
            let second = healthsync_processor_process(processor, json.as_ptr());
            assert!(!first.is_null());
            assert!(!second.is_null());

            let a: serde_json::Value =
                serde_json::from_str(CStr::from_ptr(first).to_str().unwrap()).unwrap();
            let b: serde_json::Value =
                serde_json::from_str(CStr::from_ptr(second).to_str().unwrap()).unwrap();
            assert_eq!(a["days"], b["days"]);
            assert_eq!(a["producer"]["instanceId"], b["producer"]["instanceId"]);

            healthsync_free_string(first);
            healthsync_free_string(second);
            healthsync_processor_free(processor);
        }
    }

    #[test]
    fn test_ffi_null_pointers() {
        unsafe {
            assert!(healthsync_process_json(ptr::null(), ptr::null()).is_null());
            assert!(healthsync_processor_process(ptr::null(), ptr::null()).is_null());
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = healthsync_version();
            assert!(!version.is_null());
            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert!(!version_str.is_empty());
        }
    }
}
