//! FFI bindings for touch gesture recognition
//!
//! This module provides C-compatible functions for driving a recognizer from
//! other languages. Strings cross the boundary as null-terminated UTF-8 JSON;
//! returned strings must be freed by the caller using `gestures_free_string`.
//!
//! The host owns time: every contact call carries its capture timestamp and
//! `gestures_recognizer_tick` carries the frame time.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr;
use std::rc::Rc;

use serde::Deserialize;
use serde_json::Value;

use crate::classifier::classify;
use crate::clock::ManualClock;
use crate::config::GestureConfig;
use crate::error::GestureError;
use crate::recognizer::Recognizer;
use crate::schema::Phase;
use crate::types::{Contact, ContactId, ContactPoint, Disposition, GestureEvent, Interaction};

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

/// NULL or empty means the default configuration
unsafe fn config_from_ptr(config_json: *const c_char) -> Result<GestureConfig, GestureError> {
    match cstr_to_string(config_json) {
        Some(s) if !s.trim().is_empty() => GestureConfig::from_json(&s),
        _ => Ok(GestureConfig::default()),
    }
}

/// Endpoint accepted by `gestures_classify_json`
#[derive(Deserialize)]
struct EndpointInput {
    x: f64,
    y: f64,
    #[serde(alias = "t")]
    timestamp_ms: f64,
    #[serde(default)]
    raw: Option<Value>,
}

impl EndpointInput {
    fn into_point(self) -> ContactPoint<Option<Value>> {
        ContactPoint {
            id: ContactId(0),
            x: self.x,
            y: self.y,
            timestamp_ms: self.timestamp_ms,
            raw: self.raw,
        }
    }
}

fn classify_json(start: &str, end: &str, config: &GestureConfig) -> Result<String, GestureError> {
    let start: EndpointInput = serde_json::from_str(start)?;
    let end: EndpointInput = serde_json::from_str(end)?;
    let gesture = classify(&start.into_point(), &end.into_point(), config);
    Ok(serde_json::to_string(&gesture)?)
}

// ============================================================================
// Stateless API
// ============================================================================

/// Classify one start/end pair and return the gesture as JSON.
///
/// Endpoints are objects with `x`, `y`, `timestamp_ms` (or `t`) and an
/// optional `raw` value that is echoed back as `start_event`/`end_event`.
///
/// # Safety
/// - `start_json` and `end_json` must be valid null-terminated C strings.
/// - `config_json` may be NULL (or empty) to use the default configuration.
/// - Returns a newly allocated string that must be freed with `gestures_free_string`.
/// - Returns NULL on error; call `gestures_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn gestures_classify_json(
    start_json: *const c_char,
    end_json: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    let start = match cstr_to_string(start_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid start JSON pointer");
            return ptr::null_mut();
        }
    };

    let end = match cstr_to_string(end_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid end JSON pointer");
            return ptr::null_mut();
        }
    };

    let config = match config_from_ptr(config_json) {
        Ok(c) => c,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    match classify_json(&start, &end, &config) {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateful Recognizer API
// ============================================================================

/// Opaque handle to a recognizer driven by host timestamps
pub struct GestureRecognizerHandle {
    recognizer: Recognizer<(), ManualClock>,
    clock: ManualClock,
    reports: Rc<RefCell<Vec<Interaction>>>,
}

impl GestureRecognizerHandle {
    fn new(config: GestureConfig) -> Result<Self, GestureError> {
        let clock = ManualClock::new(0.0);
        let reports = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&reports);
        let recognizer = Recognizer::with_clock(
            move |event: &GestureEvent| {
                if let GestureEvent::Interaction(interaction) = event {
                    sink.borrow_mut().push(interaction.clone());
                }
                Disposition::Continue
            },
            config,
            clock.clone(),
        )?;

        Ok(Self {
            recognizer,
            clock,
            reports,
        })
    }

    fn take_reports_json(&self) -> Result<String, GestureError> {
        let reports = std::mem::take(&mut *self.reports.borrow_mut());
        Ok(serde_json::to_string(&reports)?)
    }
}

/// Shared body of the contact entry points. Returns 0 on success, -1 on error.
unsafe fn contact_event(
    handle: *mut GestureRecognizerHandle,
    phase: Phase,
    id: i64,
    x: f64,
    y: f64,
    timestamp_ms: f64,
) -> c_int {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null recognizer pointer");
        return -1;
    }

    let handle = &mut *handle;
    handle.clock.set(timestamp_ms);
    let contact = Contact::new(id, x, y);
    let result = match phase {
        Phase::Start => handle.recognizer.contact_start(contact),
        Phase::Update => handle.recognizer.contact_update(contact),
        Phase::End => handle.recognizer.contact_end(contact),
    };

    match result {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Create a new recognizer.
///
/// # Safety
/// - `config_json` may be NULL (or empty) to use the default configuration.
/// - Returns a pointer that must be freed with `gestures_recognizer_free`.
/// - Returns NULL on error; call `gestures_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn gestures_recognizer_new(
    config_json: *const c_char,
) -> *mut GestureRecognizerHandle {
    clear_last_error();

    let config = match config_from_ptr(config_json) {
        Ok(c) => c,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    match GestureRecognizerHandle::new(config) {
        Ok(handle) => Box::into_raw(Box::new(handle)),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a recognizer. Tears it down first.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `gestures_recognizer_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn gestures_recognizer_free(handle: *mut GestureRecognizerHandle) {
    if !handle.is_null() {
        drop(Box::from_raw(handle));
    }
}

/// Report a contact going down at `timestamp_ms`.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `gestures_recognizer_new`.
/// - Returns 0 on success, -1 on error (e.g. the id is already down).
#[no_mangle]
pub unsafe extern "C" fn gestures_recognizer_start(
    handle: *mut GestureRecognizerHandle,
    id: i64,
    x: f64,
    y: f64,
    timestamp_ms: f64,
) -> c_int {
    contact_event(handle, Phase::Start, id, x, y, timestamp_ms)
}

/// Report a contact moving at `timestamp_ms`.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `gestures_recognizer_new`.
/// - Returns 0 on success, -1 on error (e.g. the id is not down).
#[no_mangle]
pub unsafe extern "C" fn gestures_recognizer_update(
    handle: *mut GestureRecognizerHandle,
    id: i64,
    x: f64,
    y: f64,
    timestamp_ms: f64,
) -> c_int {
    contact_event(handle, Phase::Update, id, x, y, timestamp_ms)
}

/// Report a contact lifting at `timestamp_ms`.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `gestures_recognizer_new`.
/// - Returns 0 on success, -1 on error (e.g. the id is not down).
#[no_mangle]
pub unsafe extern "C" fn gestures_recognizer_end(
    handle: *mut GestureRecognizerHandle,
    id: i64,
    x: f64,
    y: f64,
    timestamp_ms: f64,
) -> c_int {
    contact_event(handle, Phase::End, id, x, y, timestamp_ms)
}

/// Frame hook at `now_ms`: fires the pending flush if it is due.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `gestures_recognizer_new`.
/// - Returns the number of reports waiting in `gestures_recognizer_take_reports`,
///   or -1 on error.
#[no_mangle]
pub unsafe extern "C" fn gestures_recognizer_tick(
    handle: *mut GestureRecognizerHandle,
    now_ms: f64,
) -> c_int {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null recognizer pointer");
        return -1;
    }

    let handle = &mut *handle;
    handle.clock.set(now_ms);
    handle.recognizer.tick();
    c_int::try_from(handle.reports.borrow().len()).unwrap_or(c_int::MAX)
}

/// Drain the interactions reported so far as a JSON array.
///
/// # Safety
/// - `handle` must be a valid pointer returned by `gestures_recognizer_new`.
/// - Returns a newly allocated string that must be freed with `gestures_free_string`.
/// - Returns NULL on error.
#[no_mangle]
pub unsafe extern "C" fn gestures_recognizer_take_reports(
    handle: *mut GestureRecognizerHandle,
) -> *mut c_char {
    clear_last_error();

    if handle.is_null() {
        set_last_error("Null recognizer pointer");
        return ptr::null_mut();
    }

    let handle = &*handle;
    match handle.take_reports_json() {
        Ok(json) => string_to_cstr(&json),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free a string returned by a gestures function.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a gestures function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn gestures_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next gestures call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn gestures_last_error() -> *const c_char {
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
pub unsafe extern "C" fn gestures_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
