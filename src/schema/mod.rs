//! touch.contact_event.v1 schema
//!
//! This module defines the wire format for recorded contact streams and the
//! adapter that validates them and replays them through a recognizer.

mod adapter;
mod contact_event;

pub use adapter::*;
pub use contact_event::*;
