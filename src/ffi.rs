//! FFI bindings for sleepwake-flux
//!
//! This module provides C-compatible functions for calling the detector from
//! other languages. A model is loaded once into an opaque handle and can then
//! serve any number of detection calls. All returned strings are allocated
//! and must be freed by the caller using `sleepwake_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::classifier::ModelArtifact;
use crate::config::PipelineConfig;
use crate::error::DetectError;
use crate::pipeline::SleepPipeline;
use crate::schema::SensorTable;
use crate::EventEncoder;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Record a pipeline error, prefixed with its stable code
fn set_detect_error(err: &DetectError) {
    set_last_error(&format!("{}: {}", err.kind().code(), err));
}

/// Clear the last error message
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

// ============================================================================
// Model API
// ============================================================================

/// Opaque handle to a loaded model and its pipeline settings
pub struct SleepModelHandle {
    pipeline: SleepPipeline,
}

/// Load a model artifact from JSON.
///
/// # Safety
/// - `model_json` must be a valid null-terminated C string.
/// - `config_json` must be a valid null-terminated C string, or NULL for defaults.
/// - Returns a pointer that must be freed with `sleepwake_model_free`.
/// - Returns NULL on error; call `sleepwake_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn sleepwake_model_load(
    model_json: *const c_char,
    config_json: *const c_char,
) -> *mut SleepModelHandle {
    clear_last_error();

    let model_str = match cstr_to_string(model_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid model string pointer");
            return ptr::null_mut();
        }
    };

    let config = if config_json.is_null() {
        PipelineConfig::default()
    } else {
        let config_str = match cstr_to_string(config_json) {
            Some(s) => s,
            None => {
                set_last_error("Invalid config string pointer");
                return ptr::null_mut();
            }
        };
        match PipelineConfig::from_json(&config_str) {
            Ok(config) => config,
            Err(e) => {
                set_detect_error(&e);
                return ptr::null_mut();
            }
        }
    };

    let pipeline = ModelArtifact::from_json(&model_str)
        .and_then(|artifact| SleepPipeline::with_config(artifact.into_classifier(), config));

    match pipeline {
        Ok(pipeline) => Box::into_raw(Box::new(SleepModelHandle { pipeline })),
        Err(e) => {
            set_detect_error(&e);
            ptr::null_mut()
        }
    }
}

/// Free a loaded model.
///
/// # Safety
/// - `model` must be a valid pointer returned by `sleepwake_model_load`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn sleepwake_model_free(model: *mut SleepModelHandle) {
    if !model.is_null() {
        drop(Box::from_raw(model));
    }
}

/// Detect events for a JSON array of sensor records.
///
/// Returns the event table as a JSON array of
/// `{"series_id", "step", "event"}` records.
///
/// # Safety
/// - `model` must be a valid pointer returned by `sleepwake_model_load`.
/// - `records_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `sleepwake_free_string`.
/// - Returns NULL on error; call `sleepwake_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn sleepwake_detect_events(
    model: *const SleepModelHandle,
    records_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if model.is_null() {
        set_last_error("Null model pointer");
        return ptr::null_mut();
    }

    let handle = &*model;

    let records_str = match cstr_to_string(records_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid records string pointer");
            return ptr::null_mut();
        }
    };

    let result = SensorTable::from_records_json(&records_str)
        .and_then(|table| handle.pipeline.run(&table))
        .and_then(|events| EventEncoder::new().encode_to_json(&events));

    match result {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_detect_error(&e);
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by sleepwake functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a sleepwake function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn sleepwake_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message, formatted as `CODE: message`.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next sleepwake function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn sleepwake_last_error() -> *const c_char {
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
pub unsafe extern "C" fn sleepwake_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::ffi::CString;

    /// Not awake whenever enmo is at most 0.05
    fn sample_model_json() -> CString {
        CString::new(
            r#"{
                "kind": "forest",
                "feature_names": ["enmo"],
                "trees": [{"nodes": [
                    {"feature": 0, "threshold": 0.05, "left": 1, "right": 2},
                    {"value": [10.0, 0.0]},
                    {"value": [0.0, 10.0]}
                ]}]
            }"#,
        )
        .unwrap()
    }

    fn sample_records_json() -> CString {
        CString::new(
            r#"[
                {"series_id": "s1", "step": 0, "timestamp": "2018-08-14T22:00:00-0400", "anglez": 10.0, "enmo": 0.0},
                {"series_id": "s1", "step": 1, "timestamp": "2018-08-14T22:00:05-0400", "anglez": 11.0, "enmo": 0.0},
                {"series_id": "s1", "step": 2, "timestamp": "2018-08-14T22:00:10-0400", "anglez": 12.0, "enmo": 0.0}
            ]"#,
        )
        .unwrap()
    }

    unsafe fn last_error() -> String {
        let error = sleepwake_last_error();
        assert!(!error.is_null());
        CStr::from_ptr(error).to_str().unwrap().to_string()
    }

    #[test]
    fn test_ffi_model_lifecycle() {
        let model_json = sample_model_json();
        let records = sample_records_json();

        unsafe {
            let model = sleepwake_model_load(model_json.as_ptr(), ptr::null());
            assert!(!model.is_null());

            let result = sleepwake_detect_events(model, records.as_ptr());
            assert!(!result.is_null());
            assert!(sleepwake_last_error().is_null());

            let result_str = CStr::from_ptr(result).to_str().unwrap();
            let events: serde_json::Value = serde_json::from_str(result_str).unwrap();
            assert_eq!(events.as_array().map(Vec::len), Some(3));
            // three rows never fill the default smoothing window
            for event in events.as_array().into_iter().flatten() {
                assert_eq!(event["event"], "onset");
            }

            sleepwake_free_string(result);
            sleepwake_model_free(model);
        }
    }

    #[test]
    fn test_ffi_narrow_smoothing_window() {
        let model_json = sample_model_json();
        let config = CString::new(r#"{"smoothing_window": 3}"#).unwrap();
        let records = sample_records_json();

        unsafe {
            let model = sleepwake_model_load(model_json.as_ptr(), config.as_ptr());
            assert!(!model.is_null());

            let result = sleepwake_detect_events(model, records.as_ptr());
            assert!(!result.is_null());

            let result_str = CStr::from_ptr(result).to_str().unwrap();
            let events: serde_json::Value = serde_json::from_str(result_str).unwrap();
            assert_eq!(events[0]["event"], "wakeup");
            assert_eq!(events[1]["event"], "onset");
            assert_eq!(events[2]["event"], "wakeup");

            sleepwake_free_string(result);
            sleepwake_model_free(model);
        }
    }

    #[test]
    fn test_ffi_config_is_applied() {
        let model_json = sample_model_json();
        let bad_config = CString::new(r#"{"smoothing_window": 0}"#).unwrap();

        unsafe {
            let model = sleepwake_model_load(model_json.as_ptr(), bad_config.as_ptr());
            assert!(model.is_null());
            assert!(last_error().starts_with("DATA_ERROR"));
        }
    }

    #[test]
    fn test_ffi_model_unavailable() {
        let model_json = CString::new(r#"{"kind": "forest", "trees": []}"#).unwrap();

        unsafe {
            let model = sleepwake_model_load(model_json.as_ptr(), ptr::null());
            assert!(model.is_null());
            assert!(last_error().starts_with("MODEL_UNAVAILABLE"));

            let model = sleepwake_model_load(ptr::null(), ptr::null());
            assert!(model.is_null());
            assert_eq!(last_error(), "Invalid model string pointer");
        }
    }

    #[test]
    fn test_ffi_data_errors() {
        let model_json = sample_model_json();
        let empty = CString::new("[]").unwrap();
        let garbage = CString::new("not json").unwrap();

        unsafe {
            let model = sleepwake_model_load(model_json.as_ptr(), ptr::null());
            assert!(!model.is_null());

            let result = sleepwake_detect_events(model, empty.as_ptr());
            assert!(result.is_null());
            assert!(last_error().starts_with("DATA_ERROR"));

            let result = sleepwake_detect_events(model, garbage.as_ptr());
            assert!(result.is_null());
            assert!(last_error().starts_with("DATA_ERROR"));

            let result = sleepwake_detect_events(ptr::null(), empty.as_ptr());
            assert!(result.is_null());
            assert_eq!(last_error(), "Null model pointer");

            sleepwake_model_free(model);
        }
    }

    #[test]
    fn test_ffi_version() {
        unsafe {
            let version = sleepwake_version();
            assert!(!version.is_null());

            let version_str = CStr::from_ptr(version).to_str().unwrap();
            assert_eq!(version_str, env!("CARGO_PKG_VERSION"));
        }
    }
}
