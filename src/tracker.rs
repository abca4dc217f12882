//! Per-contact session tracking
//!
//! Keeps one record per contact between its start and its end. Records are
//! keyed by contact id in a `BTreeMap` so snapshots come out in id order.

use crate::classifier::classify;
use crate::config::GestureConfig;
use crate::error::ProtocolViolation;
use crate::types::{ClassifiedGesture, ContactId, ContactPoint};
use std::collections::BTreeMap;

/// In-flight record of one contact
#[derive(Debug, Clone, PartialEq)]
pub struct SessionRecord<E = ()> {
    /// Where and when the contact went down
    pub start: ContactPoint<E>,
    /// Most recent position seen for this contact
    pub latest: ContactPoint<E>,
}

/// Tracks every contact that is currently down
#[derive(Debug, Clone)]
pub struct SessionTracker<E = ()> {
    sessions: BTreeMap<ContactId, SessionRecord<E>>,
}

impl<E> Default for SessionTracker<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> SessionTracker<E> {
    pub fn new() -> Self {
        Self {
            sessions: BTreeMap::new(),
        }
    }

    /// Number of contacts currently down
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn contains(&self, id: ContactId) -> bool {
        self.sessions.contains_key(&id)
    }

    pub fn get(&self, id: ContactId) -> Option<&SessionRecord<E>> {
        self.sessions.get(&id)
    }

    /// Drop every record
    pub fn clear(&mut self) {
        self.sessions.clear();
    }

    /// Update the latest position of a tracked contact
    pub fn on_update(&mut self, point: ContactPoint<E>) -> Result<(), ProtocolViolation> {
        match self.sessions.get_mut(&point.id) {
            Some(record) => {
                record.latest = point;
                Ok(())
            }
            None => Err(ProtocolViolation::UntrackedUpdate(point.id)),
        }
    }

    /// Remove a tracked contact and hand back its record
    pub fn on_end(&mut self, id: ContactId) -> Result<SessionRecord<E>, ProtocolViolation> {
        self.sessions
            .remove(&id)
            .ok_or(ProtocolViolation::UntrackedEnd(id))
    }
}

impl<E: Clone> SessionTracker<E> {
    /// Start tracking a contact.
    ///
    /// A start for a contact that is already down leaves the existing record
    /// untouched.
    pub fn on_start(&mut self, point: ContactPoint<E>) -> Result<(), ProtocolViolation> {
        if self.sessions.contains_key(&point.id) {
            return Err(ProtocolViolation::DuplicateStart(point.id));
        }

        let record = SessionRecord {
            start: point.clone(),
            latest: point,
        };
        self.sessions.insert(record.start.id, record);
        Ok(())
    }

    /// Classify every contact still down as if it ended at `now_ms` at its
    /// latest position
    pub fn snapshot(&self, now_ms: f64, config: &GestureConfig) -> Vec<ClassifiedGesture<E>> {
        self.sessions
            .values()
            .map(|record| classify(&record.start, &record.latest.restamped(now_ms), config))
            .collect()
    }
}
