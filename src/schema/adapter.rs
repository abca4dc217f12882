//! Replay adapter for recorded contact streams
//!
//! Parses NDJSON or JSON-array recordings, checks them against the contact
//! lifecycle and drives them through a recognizer on a manual clock.

use crate::clock::{Clock, ManualClock};
use crate::config::{BatchWindow, GestureConfig};
use crate::error::{GestureError, ProtocolViolation};
use crate::recognizer::Recognizer;
use crate::schema::contact_event::*;
use crate::tracker::SessionTracker;
use crate::types::{ContactId, Disposition, GestureEvent, Interaction};
use serde::Serialize;
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use tracing::debug;

/// Frame period used to replay a next-frame batch window (60 Hz)
pub const REPLAY_FRAME_MS: f64 = 1000.0 / 60.0;

/// Adapter for recorded contact streams
pub struct ReplayAdapter;

impl ReplayAdapter {
    /// Parse a JSON string containing an array of ContactEvents
    pub fn parse_array(json: &str) -> Result<Vec<ContactEvent>, GestureError> {
        let events: Vec<ContactEvent> = serde_json::from_str(json)?;
        Ok(events)
    }

    /// Parse NDJSON (newline-delimited JSON) containing ContactEvents
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<ContactEvent>, GestureError> {
        let mut events = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<ContactEvent>(trimmed) {
                Ok(event) => events.push(event),
                Err(e) => {
                    return Err(GestureError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(events)
    }

    /// Validate each event on its own
    pub fn validate_events(events: &[ContactEvent]) -> Vec<ValidationResult> {
        events
            .iter()
            .enumerate()
            .filter_map(|(index, event)| {
                event.validate().err().map(|error| ValidationResult {
                    index,
                    contact: event.id,
                    error,
                })
            })
            .collect()
    }

    /// Check the stream follows `start, update*, end` per contact with
    /// non-decreasing timestamps, without classifying anything
    pub fn validate_lifecycle(events: &[ContactEvent]) -> Vec<LifecycleIssue> {
        let mut issues = Vec::new();
        let mut sessions: SessionTracker = SessionTracker::new();
        let mut start_index: BTreeMap<ContactId, usize> = BTreeMap::new();
        let mut previous_ms: Option<f64> = None;

        for (index, event) in events.iter().enumerate() {
            if let Some(previous) = previous_ms {
                if event.timestamp_ms < previous {
                    issues.push(LifecycleIssue {
                        index,
                        contact: event.id,
                        kind: LifecycleIssueKind::TimeWentBackwards {
                            previous_ms: previous,
                            timestamp_ms: event.timestamp_ms,
                        },
                    });
                }
            }
            previous_ms = Some(event.timestamp_ms);

            let point = event.contact().with_raw(()).at(event.timestamp_ms);
            let result = match event.phase {
                Phase::Start => sessions.on_start(point).map(|()| {
                    start_index.insert(event.id, index);
                }),
                Phase::Update => sessions.on_update(point),
                Phase::End => sessions.on_end(event.id).map(|_| {
                    start_index.remove(&event.id);
                }),
            };

            if let Err(violation) = result {
                issues.push(LifecycleIssue {
                    index,
                    contact: event.id,
                    kind: LifecycleIssueKind::Violation(violation),
                });
            }
        }

        for (contact, index) in start_index {
            issues.push(LifecycleIssue {
                index,
                contact,
                kind: LifecycleIssueKind::NeverEnded,
            });
        }

        issues
    }

    /// Replay a recording through a recognizer and collect every report.
    ///
    /// The clock follows the event timestamps. Before each event, a scheduled
    /// flush fires if its deadline is not after the event: a delay window at
    /// release time plus the delay, a next-frame window at the first
    /// [`REPLAY_FRAME_MS`] frame boundary after the release, with frames
    /// counted from the first event. Whatever is still pending fires after
    /// the last event. Protocol violations are collected and the replay goes
    /// on.
    pub fn replay(
        events: &[ContactEvent],
        config: &GestureConfig,
    ) -> Result<ReplayOutcome, GestureError> {
        let origin = events.first().map_or(0.0, |e| e.timestamp_ms);
        let clock = ManualClock::new(origin);
        let interactions: Rc<RefCell<Vec<Interaction<Option<Value>>>>> = Rc::default();
        let sink = interactions.clone();

        let mut recognizer = Recognizer::with_clock(
            move |event: &GestureEvent<Option<Value>>| {
                if let GestureEvent::Interaction(interaction) = event {
                    sink.borrow_mut().push(interaction.clone());
                }
                Disposition::Continue
            },
            config.clone(),
            clock.clone(),
        )?;

        let mut violations = Vec::new();
        for (index, event) in events.iter().enumerate() {
            event.validate()?;
            if let Some(deadline) = flush_deadline(&recognizer, origin) {
                if deadline <= event.timestamp_ms {
                    clock.set(deadline);
                    recognizer.tick();
                }
            }

            clock.set(event.timestamp_ms);
            let contact = event.contact();
            let result = match event.phase {
                Phase::Start => recognizer.contact_start(contact),
                Phase::Update => recognizer.contact_update(contact),
                Phase::End => recognizer.contact_end(contact),
            };

            match result {
                Ok(()) => {}
                Err(GestureError::ProtocolViolation(violation)) => {
                    violations.push(ReplayViolation { index, violation });
                }
                Err(e) => return Err(e),
            }
        }

        if let Some(deadline) = flush_deadline(&recognizer, origin) {
            clock.set(deadline.max(clock.now_ms()));
            recognizer.tick();
        }

        let still_active = recognizer.active_contacts();
        recognizer.destroy();
        drop(recognizer);

        let interactions = interactions.take();
        debug!(
            events = events.len(),
            interactions = interactions.len(),
            violations = violations.len(),
            still_active,
            "replay finished"
        );

        Ok(ReplayOutcome {
            interactions,
            violations,
            still_active,
        })
    }
}

/// When the pending flush fires during a replay
fn flush_deadline<E: Clone>(recognizer: &Recognizer<E, ManualClock>, origin: f64) -> Option<f64> {
    let due = recognizer.next_flush_at()?;
    Some(match recognizer.config().batch_window {
        BatchWindow::NextFrame => {
            let frame = ((due - origin) / REPLAY_FRAME_MS).floor() + 1.0;
            origin + frame * REPLAY_FRAME_MS
        }
        BatchWindow::DelayMs(_) => due,
    })
}

/// Result of event validation
#[derive(Debug)]
pub struct ValidationResult {
    pub index: usize,
    pub contact: ContactId,
    pub error: EventValidationError,
}

/// A lifecycle problem found in a recording
#[derive(Debug, Clone, PartialEq)]
pub struct LifecycleIssue {
    /// Index of the offending event (the start event for `NeverEnded`)
    pub index: usize,
    pub contact: ContactId,
    pub kind: LifecycleIssueKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleIssueKind {
    Violation(ProtocolViolation),
    TimeWentBackwards { previous_ms: f64, timestamp_ms: f64 },
    NeverEnded,
}

impl std::fmt::Display for LifecycleIssueKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleIssueKind::Violation(violation) => write!(f, "{violation}"),
            LifecycleIssueKind::TimeWentBackwards {
                previous_ms,
                timestamp_ms,
            } => write!(f, "timestamp {timestamp_ms} is before {previous_ms}"),
            LifecycleIssueKind::NeverEnded => f.write_str("contact never ended"),
        }
    }
}

/// A protocol violation hit while replaying
#[derive(Debug, Clone, PartialEq)]
pub struct ReplayViolation {
    pub index: usize,
    pub violation: ProtocolViolation,
}

/// Everything a replay produced
#[derive(Debug, Clone, Serialize)]
pub struct ReplayOutcome {
    pub interactions: Vec<Interaction<Option<Value>>>,
    #[serde(skip)]
    pub violations: Vec<ReplayViolation>,
    /// Contacts still down after the last event
    pub still_active: usize,
}
