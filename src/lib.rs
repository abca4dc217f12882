//! Touch Gestures - endpoint-based touch gesture recognition
//!
//! Turns a stream of contact start/update/end events into classified
//! gestures (tap, hold, swipe with a compass direction) through a small
//! pipeline: session tracking → classification at release → batching of
//! near-simultaneous releases into one interaction → canonical serial.
//!
//! ## Modules
//!
//! - **Recognizer**: tracks contacts and reports batched interactions
//! - **Matcher**: declarative checks over a gesture set (`two(taps)`, ...)
//! - **Schema**: recorded contact streams, lifecycle validation and replay

pub mod classifier;
pub mod clock;
pub mod config;
pub mod encoder;
pub mod error;
pub mod matcher;
pub mod recognizer;
pub mod release;
pub mod schema;
pub mod serializer;
pub mod tracker;
pub mod types;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{BatchWindow, GestureConfig};
pub use error::{GestureError, ProtocolViolation};
pub use matcher::GestureSpec;
pub use recognizer::{InputSubscription, Recognizer};
pub use release::Released;
pub use serializer::{serialize_gestures, serialize_interaction};
pub use types::{
    ClassifiedGesture, Contact, ContactId, ContactPoint, Direction, Disposition, GestureEvent,
    GestureType, Interaction,
};

// Schema exports
pub use schema::{ContactEvent, ReplayAdapter, SCHEMA_VERSION};

/// Crate version embedded in encoded records
pub const CRATE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for encoded records
pub const PRODUCER_NAME: &str = "touch-gestures";
