//! C-compatible API for hosts that embed the service behind their own transport.
//!
//! Strings returned by `sentiment_handle` are owned by Rust and must be released
//! with `sentiment_free_str`. The loaded state lives in a process-wide slot
//! because a C caller cannot hold a Rust reference; handlers still receive it
//! by reference.

use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::sync::{LazyLock, Mutex, OnceLock};

use tracing::error;

use crate::common::config::AppCfg;
use crate::common::error::{ServeCode, ServeError};

use super::routes::{self, ApiRequest, ApiResponse, Method};
use super::state::AppState;

static STATE: OnceLock<AppState> = OnceLock::new();
static UNLOADED: LazyLock<AppState> = LazyLock::new(|| AppState::unloaded(AppCfg::default()));
static INIT_LOCK: Mutex<()> = Mutex::new(());

const FALLBACK_JSON: &str = r#"{"status":500,"body":{"detail":"Internal Server Error"}}"#;

/// ABI version to coordinate with the host.
#[no_mangle]
pub extern "C" fn sentiment_api_version() -> u32 {
    1
}

/// Load configuration and artifacts. Returns `0` on success, otherwise a
/// stable error code; the host must not serve traffic on a non-zero result.
/// A failed call leaves nothing latched, so the host may fix the environment
/// or artifacts and call again. Succeeds without reloading once a load has
/// completed.
#[no_mangle]
pub extern "C" fn sentiment_init() -> u32 {
    let _guard = INIT_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if STATE.get().is_some() {
        return ServeCode::Ok as u32;
    }

    match AppState::from_env() {
        Ok(state) => {
            let _ = STATE.set(state);
            ServeCode::Ok as u32
        }
        Err(err) => {
            error!(error = %err, "sentiment service startup failed");
            err.code() as u32
        }
    }
}

/// Whether `sentiment_init` has completed successfully.
#[no_mangle]
pub extern "C" fn sentiment_is_ready() -> bool {
    STATE.get().is_some_and(|state| state.runtime().is_ready())
}

/// Handle one request and return `{"status": <u16>, "body": <json>}`.
/// `body` may be null for requests without a payload.
#[no_mangle]
pub extern "C" fn sentiment_handle(
    method: *const c_char,
    path: *const c_char,
    body: *const c_char,
) -> *const c_char {
    if method.is_null() || path.is_null() {
        let err = ServeError::invalid("method and path are required");
        return string_to_raw(ApiResponse::from_error(&err).to_json());
    }

    let method = unsafe { CStr::from_ptr(method) }.to_string_lossy();
    let path = unsafe { CStr::from_ptr(path) }
        .to_string_lossy()
        .into_owned();
    let body = if body.is_null() {
        None
    } else {
        Some(unsafe { CStr::from_ptr(body) }.to_string_lossy().into_owned())
    };

    let request = ApiRequest {
        method: Method::parse(&method),
        path,
        body,
    };
    let state = STATE.get().unwrap_or(&*UNLOADED);
    string_to_raw(routes::handle(state, &request).to_json())
}

/// Free strings allocated by Rust.
#[no_mangle]
pub extern "C" fn sentiment_free_str(ptr: *const c_char) {
    if ptr.is_null() {
        return;
    }
    unsafe {
        let _ = CString::from_raw(ptr as *mut c_char);
    }
}

fn string_to_raw(s: String) -> *const c_char {
    match CString::new(s) {
        Ok(cstring) => cstring.into_raw(),
        Err(_) => fallback_json_raw(),
    }
}

fn fallback_json_raw() -> *const c_char {
    CString::new(FALLBACK_JSON)
        .map(CString::into_raw)
        .unwrap_or(std::ptr::null_mut())
}
