//! touch.contact_event.v1 schema definition
//!
//! One record per contact event, as a host would log them:
//!
//! ```json
//! {"phase": "start", "id": 1, "x": 120, "y": 300, "timestamp_ms": 0}
//! {"phase": "end", "id": 1, "x": 121, "y": 300, "timestamp_ms": 84, "raw": {"target": "canvas"}}
//! ```

use crate::types::{Contact, ContactId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Current schema version
pub const SCHEMA_VERSION: &str = "touch.contact_event.v1";

fn default_schema_version() -> String {
    SCHEMA_VERSION.to_string()
}

/// Lifecycle phase of a contact event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Start,
    Update,
    End,
}

/// A recorded contact event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactEvent {
    /// Schema version, defaults to the current one when omitted
    #[serde(default = "default_schema_version")]
    pub schema_version: String,
    pub phase: Phase,
    pub id: ContactId,
    pub x: f64,
    pub y: f64,
    /// Capture time in milliseconds
    #[serde(alias = "t")]
    pub timestamp_ms: f64,
    /// Host event data passed through to the gesture's start/end event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw: Option<Value>,
}

impl ContactEvent {
    fn new(phase: Phase, id: i64, x: f64, y: f64, timestamp_ms: f64) -> Self {
        Self {
            schema_version: SCHEMA_VERSION.to_string(),
            phase,
            id: ContactId(id),
            x,
            y,
            timestamp_ms,
            raw: None,
        }
    }

    pub fn start(id: i64, x: f64, y: f64, timestamp_ms: f64) -> Self {
        Self::new(Phase::Start, id, x, y, timestamp_ms)
    }

    pub fn update(id: i64, x: f64, y: f64, timestamp_ms: f64) -> Self {
        Self::new(Phase::Update, id, x, y, timestamp_ms)
    }

    pub fn end(id: i64, x: f64, y: f64, timestamp_ms: f64) -> Self {
        Self::new(Phase::End, id, x, y, timestamp_ms)
    }

    pub fn with_raw(mut self, raw: Value) -> Self {
        self.raw = Some(raw);
        self
    }

    /// The contact as the recognizer receives it
    pub fn contact(&self) -> Contact<Option<Value>> {
        Contact {
            id: self.id,
            x: self.x,
            y: self.y,
            raw: self.raw.clone(),
        }
    }

    /// Check the event is well-formed on its own
    pub fn validate(&self) -> Result<(), EventValidationError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(EventValidationError::InvalidSchemaVersion {
                expected: SCHEMA_VERSION.to_string(),
                actual: self.schema_version.clone(),
            });
        }

        for (field, value) in [("x", self.x), ("y", self.y), ("timestamp_ms", self.timestamp_ms)] {
            if !value.is_finite() {
                return Err(EventValidationError::NonFinite { field });
            }
        }

        Ok(())
    }
}

/// Validation errors for a single contact event
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EventValidationError {
    #[error("Invalid schema version: expected {expected}, got {actual}")]
    InvalidSchemaVersion { expected: String, actual: String },

    #[error("Field {field} must be a finite number")]
    NonFinite { field: &'static str },
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_parse_minimal_event() {
        let event: ContactEvent =
            serde_json::from_str(r#"{"phase":"start","id":3,"x":10,"y":20.5,"t":12}"#).unwrap();

        assert_eq!(event, ContactEvent::start(3, 10.0, 20.5, 12.0));
        assert!(event.validate().is_ok());
    }

    #[test]
    fn test_raw_is_carried_into_contact() {
        let event = ContactEvent::end(1, 0.0, 0.0, 5.0).with_raw(json!({ "target": "canvas" }));
        let contact = event.contact();
        assert_eq!(contact.raw, Some(json!({ "target": "canvas" })));

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["phase"], "end");
        assert_eq!(value["raw"]["target"], "canvas");
    }

    #[test]
    fn test_raw_omitted_when_absent() {
        let value = serde_json::to_value(ContactEvent::update(1, 0.0, 0.0, 5.0)).unwrap();
        assert!(value.get("raw").is_none());
        assert_eq!(value["schema_version"], SCHEMA_VERSION);
    }

    #[test]
    fn test_wrong_schema_version() {
        let mut event = ContactEvent::start(1, 0.0, 0.0, 0.0);
        event.schema_version = "touch.contact_event.v0".to_string();
        assert!(matches!(
            event.validate(),
            Err(EventValidationError::InvalidSchemaVersion { .. })
        ));
    }

    #[test]
    fn test_non_finite_coordinates() {
        let event = ContactEvent::start(1, f64::NAN, 0.0, 0.0);
        assert_eq!(
            event.validate(),
            Err(EventValidationError::NonFinite { field: "x" })
        );
    }

    #[test]
    fn test_unknown_phase_rejected() {
        let result = serde_json::from_str::<ContactEvent>(
            r#"{"phase":"cancel","id":1,"x":0,"y":0,"t":0}"#,
        );
        assert!(result.is_err());
    }
}
