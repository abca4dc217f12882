//! Core data types for gesture recognition
//!
//! This module defines the types that flow through the recognition pipeline:
//! contacts as delivered by the input source, the timestamped points the
//! tracker keeps, classified gestures and the interaction reports handed to
//! the consumer.

use crate::error::GestureError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Stable identifier of one contact for the duration of its lifetime
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContactId(pub i64);

impl fmt::Display for ContactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<i64> for ContactId {
    fn from(id: i64) -> Self {
        ContactId(id)
    }
}

/// A contact as delivered by the input source, before it is timestamped
#[derive(Debug, Clone, PartialEq)]
pub struct Contact<E = ()> {
    pub id: ContactId,
    pub x: f64,
    pub y: f64,
    /// Originating platform event, passed through untouched
    pub raw: E,
}

impl Contact<()> {
    /// Contact without a platform event attached
    pub fn new(id: impl Into<ContactId>, x: f64, y: f64) -> Self {
        Self {
            id: id.into(),
            x,
            y,
            raw: (),
        }
    }
}

impl<E> Contact<E> {
    /// Attach the originating platform event
    pub fn with_raw<R>(self, raw: R) -> Contact<R> {
        Contact {
            id: self.id,
            x: self.x,
            y: self.y,
            raw,
        }
    }

    /// Stamp the contact with its capture time
    pub fn at(self, timestamp_ms: f64) -> ContactPoint<E> {
        ContactPoint {
            id: self.id,
            x: self.x,
            y: self.y,
            timestamp_ms,
            raw: self.raw,
        }
    }
}

/// A contact position captured at a point in time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContactPoint<E = ()> {
    pub id: ContactId,
    pub x: f64,
    pub y: f64,
    /// Capture time in milliseconds on the recognizer's clock
    pub timestamp_ms: f64,
    /// Originating platform event, never inspected
    pub raw: E,
}

impl<E: Clone> ContactPoint<E> {
    /// Copy of this point re-stamped at `timestamp_ms`
    pub fn restamped(&self, timestamp_ms: f64) -> Self {
        Self {
            timestamp_ms,
            ..self.clone()
        }
    }
}

/// The three mutually exclusive gesture types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GestureType {
    Tap,
    Hold,
    Swipe,
}

impl GestureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GestureType::Tap => "tap",
            GestureType::Hold => "hold",
            GestureType::Swipe => "swipe",
        }
    }
}

impl fmt::Display for GestureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for GestureType {
    type Err = GestureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tap" => Ok(GestureType::Tap),
            "hold" => Ok(GestureType::Hold),
            "swipe" => Ok(GestureType::Swipe),
            other => Err(GestureError::InvalidSpec(format!(
                "unknown gesture type '{other}'"
            ))),
        }
    }
}

/// Compass direction of a swipe, counter-clockwise from "right".
///
/// Serialized as its angle in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "u16", try_from = "u16")]
pub enum Direction {
    Right,
    UpRight,
    Up,
    UpLeft,
    Left,
    DownLeft,
    Down,
    DownRight,
}

impl Direction {
    pub const ALL: [Direction; 8] = [
        Direction::Right,
        Direction::UpRight,
        Direction::Up,
        Direction::UpLeft,
        Direction::Left,
        Direction::DownLeft,
        Direction::Down,
        Direction::DownRight,
    ];

    /// Angle in degrees, a multiple of 45 in `0..360`
    pub fn angle(self) -> u16 {
        match self {
            Direction::Right => 0,
            Direction::UpRight => 45,
            Direction::Up => 90,
            Direction::UpLeft => 135,
            Direction::Left => 180,
            Direction::DownLeft => 225,
            Direction::Down => 270,
            Direction::DownRight => 315,
        }
    }

    /// Direction for an exact compass angle
    pub fn from_angle(angle: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|d| d.angle() == angle)
    }

    /// Compass name as used in serials and matcher specs
    pub fn name(self) -> &'static str {
        match self {
            Direction::Right => "right",
            Direction::UpRight => "up-right",
            Direction::Up => "up",
            Direction::UpLeft => "up-left",
            Direction::Left => "left",
            Direction::DownLeft => "down-left",
            Direction::Down => "down",
            Direction::DownRight => "down-right",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Direction {
    type Err = GestureError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|d| d.name() == s)
            .ok_or_else(|| GestureError::InvalidSpec(format!("unknown direction '{s}'")))
    }
}

impl From<Direction> for u16 {
    fn from(direction: Direction) -> Self {
        direction.angle()
    }
}

impl TryFrom<u16> for Direction {
    type Error = String;

    fn try_from(angle: u16) -> Result<Self, Self::Error> {
        Direction::from_angle(angle).ok_or_else(|| format!("{angle} is not a compass angle"))
    }
}

/// A contact's start/end pair reduced to a typed gesture
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedGesture<E = ()> {
    /// Elapsed time between start and end
    pub duration_ms: f64,
    /// Horizontal displacement, positive to the right
    pub dx: f64,
    /// Vertical displacement, positive upwards
    pub dy: f64,
    /// Angle of the displacement in `[0, 360]` (360 only by rounding), counter-clockwise from +x
    pub angle_deg: f64,
    /// Snapped compass direction, `None` when no octant is within the margin
    pub direction: Option<Direction>,
    #[serde(rename = "type")]
    pub gesture_type: GestureType,
    pub start_event: E,
    pub end_event: E,
}

impl<E> ClassifiedGesture<E> {
    pub fn is_tap(&self) -> bool {
        self.gesture_type == GestureType::Tap
    }

    pub fn is_hold(&self) -> bool {
        self.gesture_type == GestureType::Hold
    }

    pub fn is_swipe(&self) -> bool {
        self.gesture_type == GestureType::Swipe
    }
}

/// One batch of gestures delivered to the consumer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction<E = ()> {
    /// Contacts released during the batch window, in release order
    pub ended: Vec<ClassifiedGesture<E>>,
    /// Contacts still down, classified against the flush time
    pub active: Vec<ClassifiedGesture<E>>,
    /// Canonical serial of `ended` and `active`
    pub serial: String,
}

/// Named notifications emitted to the consumer callback
#[derive(Debug, Clone, PartialEq)]
pub enum GestureEvent<E = ()> {
    /// A batch flush with at least one gesture
    Interaction(Interaction<E>),
    /// A flush found no contacts down
    Released,
}

impl<E> GestureEvent<E> {
    pub fn name(&self) -> &'static str {
        match self {
            GestureEvent::Interaction(_) => "interaction",
            GestureEvent::Released => "released",
        }
    }
}

/// What the consumer wants done with the input that produced an event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Disposition {
    /// Let the host apply its default handling
    #[default]
    Continue,
    /// The consumer handled the gesture; the host should suppress defaults
    Suppress,
}
