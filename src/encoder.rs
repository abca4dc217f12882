//! Interaction record encoder
//!
//! Wraps interaction reports with producer metadata for logging or shipping
//! to another process.

use crate::error::GestureError;
use crate::types::Interaction;
use crate::{CRATE_VERSION, PRODUCER_NAME};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who produced a record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Producer {
    pub name: String,
    pub version: String,
    /// Unique per encoder, so records from one recognizer can be grouped
    pub instance_id: String,
}

/// An interaction report with provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord<E = ()> {
    pub producer: Producer,
    /// Position of this record in the encoder's output, from 0
    pub sequence: u64,
    pub computed_at_utc: String,
    pub interaction: Interaction<E>,
}

/// Encoder stamping interaction reports
pub struct InteractionEncoder {
    instance_id: String,
    sequence: u64,
}

impl Default for InteractionEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl InteractionEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self::with_instance_id(Uuid::new_v4().to_string())
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self {
            instance_id,
            sequence: 0,
        }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Wrap an interaction into a record
    pub fn encode<E>(&mut self, interaction: Interaction<E>) -> InteractionRecord<E> {
        let record = InteractionRecord {
            producer: Producer {
                name: PRODUCER_NAME.to_string(),
                version: CRATE_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            sequence: self.sequence,
            computed_at_utc: Utc::now().to_rfc3339(),
            interaction,
        };
        self.sequence += 1;
        record
    }

    /// Encode to a single-line JSON string
    pub fn encode_to_json<E: Serialize>(
        &mut self,
        interaction: Interaction<E>,
    ) -> Result<String, GestureError> {
        let record = self.encode(interaction);
        serde_json::to_string(&record).map_err(GestureError::JsonError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::DateTime;

    fn interaction() -> Interaction {
        Interaction {
            ended: Vec::new(),
            active: Vec::new(),
            serial: "1:tap".to_string(),
        }
    }

    #[test]
    fn test_records_carry_producer_and_sequence() {
        let mut encoder = InteractionEncoder::with_instance_id("test-instance".to_string());
        let first = encoder.encode(interaction());
        let second = encoder.encode(interaction());

        assert_eq!(first.producer.name, PRODUCER_NAME);
        assert_eq!(first.producer.version, CRATE_VERSION);
        assert_eq!(first.producer.instance_id, "test-instance");
        assert_eq!(first.sequence, 0);
        assert_eq!(second.sequence, 1);
        assert!(DateTime::parse_from_rfc3339(&first.computed_at_utc).is_ok());
    }

    #[test]
    fn test_instance_ids_are_unique() {
        let a = InteractionEncoder::new();
        let b = InteractionEncoder::new();
        assert_ne!(a.instance_id(), b.instance_id());
        assert!(Uuid::parse_str(a.instance_id()).is_ok());
    }

    #[test]
    fn test_encode_to_json() {
        let mut encoder = InteractionEncoder::new();
        let json = encoder.encode_to_json(interaction()).unwrap();
        assert!(!json.contains('\n'));

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["interaction"]["serial"], "1:tap");
        assert_eq!(value["producer"]["name"], PRODUCER_NAME);
    }
}
