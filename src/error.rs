//! Error types for touch gesture recognition

use crate::types::ContactId;
use thiserror::Error;

/// Errors that can occur while recognizing gestures
#[derive(Debug, Error)]
pub enum GestureError {
    #[error("Protocol violation: {0}")]
    ProtocolViolation(#[from] ProtocolViolation),

    #[error("Invalid configuration: {field} {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    #[error("Invalid gesture spec: {0}")]
    InvalidSpec(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Failed to parse contact events: {0}")]
    ParseError(String),

    #[error("Invalid contact event: {0}")]
    InvalidEvent(#[from] crate::schema::EventValidationError),

    #[error("Recognizer has been torn down")]
    TornDown,
}

/// Contact lifecycle violations reported by the input source.
///
/// A contact must follow `start, update*, end`. Anything else is reported
/// and the offending event is dropped; other contacts keep being tracked.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolViolation {
    #[error("contact {0} started while already down")]
    DuplicateStart(ContactId),

    #[error("update for contact {0} which is not down")]
    UntrackedUpdate(ContactId),

    #[error("end for contact {0} which is not down")]
    UntrackedEnd(ContactId),
}

impl ProtocolViolation {
    /// The contact the violation was reported for
    pub fn contact_id(&self) -> ContactId {
        match self {
            ProtocolViolation::DuplicateStart(id)
            | ProtocolViolation::UntrackedUpdate(id)
            | ProtocolViolation::UntrackedEnd(id) => *id,
        }
    }
}
