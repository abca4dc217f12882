//! Declarative gesture matching
//!
//! A [`GestureSpec`] lists the fields a gesture must have. Each field holds
//! one or more accepted values; a gesture matches when every listed field
//! equals one of its accepted values. Fields not listed are unconstrained.
//!
//! ```ignore
//! // Exactly two taps
//! two(&report.ended, &GestureSpec::new().gesture_type(GestureType::Tap));
//!
//! // One horizontal swipe, either way
//! let spec = GestureSpec::from_json(&json!({ "type": "swipe", "dir": ["left", "right"] }))?;
//! one(&report.ended, &spec);
//! ```

use crate::error::GestureError;
use crate::types::{ClassifiedGesture, Direction, GestureType};
use serde_json::Value;

/// Accepted values per gesture field
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GestureSpec {
    gesture_type: Option<Vec<GestureType>>,
    direction: Option<Vec<Option<Direction>>>,
    duration_ms: Option<Vec<f64>>,
    dx: Option<Vec<f64>>,
    dy: Option<Vec<f64>>,
    angle_deg: Option<Vec<f64>>,
}

impl GestureSpec {
    /// Spec matching every gesture
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gesture_type(self, gesture_type: GestureType) -> Self {
        self.any_gesture_type([gesture_type])
    }

    pub fn any_gesture_type(mut self, types: impl IntoIterator<Item = GestureType>) -> Self {
        self.gesture_type = Some(types.into_iter().collect());
        self
    }

    pub fn direction(self, direction: Direction) -> Self {
        self.any_direction([direction])
    }

    pub fn any_direction(mut self, directions: impl IntoIterator<Item = Direction>) -> Self {
        self.direction = Some(directions.into_iter().map(Some).collect());
        self
    }

    /// Require a swipe that did not snap to any compass point
    pub fn unsnapped(mut self) -> Self {
        self.direction = Some(vec![None]);
        self
    }

    pub fn duration_ms(mut self, values: impl IntoIterator<Item = f64>) -> Self {
        self.duration_ms = Some(values.into_iter().collect());
        self
    }

    pub fn dx(mut self, values: impl IntoIterator<Item = f64>) -> Self {
        self.dx = Some(values.into_iter().collect());
        self
    }

    pub fn dy(mut self, values: impl IntoIterator<Item = f64>) -> Self {
        self.dy = Some(values.into_iter().collect());
        self
    }

    pub fn angle_deg(mut self, values: impl IntoIterator<Item = f64>) -> Self {
        self.angle_deg = Some(values.into_iter().collect());
        self
    }

    /// Build a spec from a JSON object such as
    /// `{"type": "swipe", "dir": ["up-left", 135, null]}`.
    ///
    /// Keys: `type`, `direction` (alias `dir`), `duration_ms` (alias `dt`),
    /// `dx`, `dy`, `angle_deg` (alias `degrees`). Each value is a literal or
    /// an array of alternatives. Directions may be compass names, compass
    /// angles, or `null` for an unsnapped swipe.
    pub fn from_json(value: &Value) -> Result<Self, GestureError> {
        let object = value
            .as_object()
            .ok_or_else(|| GestureError::InvalidSpec("spec must be a JSON object".to_string()))?;

        let mut spec = Self::new();
        for (key, value) in object {
            match key.as_str() {
                "type" => constrain(&mut spec.gesture_type, alternatives(value, parse_type)?),
                "direction" | "dir" => {
                    constrain(&mut spec.direction, alternatives(value, parse_direction)?)
                }
                "duration_ms" | "dt" => {
                    constrain(&mut spec.duration_ms, alternatives(value, parse_number)?)
                }
                "dx" => constrain(&mut spec.dx, alternatives(value, parse_number)?),
                "dy" => constrain(&mut spec.dy, alternatives(value, parse_number)?),
                "angle_deg" | "degrees" => {
                    constrain(&mut spec.angle_deg, alternatives(value, parse_number)?)
                }
                other => {
                    return Err(GestureError::InvalidSpec(format!("unknown field '{other}'")));
                }
            }
        }
        Ok(spec)
    }

    /// Parse a JSON spec from a string
    pub fn from_json_str(json: &str) -> Result<Self, GestureError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_json(&value)
    }

    /// Whether `gesture` satisfies every field of this spec
    pub fn matches<E>(&self, gesture: &ClassifiedGesture<E>) -> bool {
        accepts(&self.gesture_type, &gesture.gesture_type)
            && accepts(&self.direction, &gesture.direction)
            && accepts(&self.duration_ms, &gesture.duration_ms)
            && accepts(&self.dx, &gesture.dx)
            && accepts(&self.dy, &gesture.dy)
            && accepts(&self.angle_deg, &gesture.angle_deg)
    }
}

fn accepts<T: PartialEq>(allowed: &Option<Vec<T>>, actual: &T) -> bool {
    allowed
        .as_ref()
        .map_or(true, |values| values.iter().any(|v| v == actual))
}

/// A field given under two names must satisfy both: keep the values in common
fn constrain<T: PartialEq>(field: &mut Option<Vec<T>>, values: Vec<T>) {
    match field {
        Some(existing) => existing.retain(|v| values.contains(v)),
        None => *field = Some(values),
    }
}

fn alternatives<T>(
    value: &Value,
    parse: fn(&Value) -> Result<T, GestureError>,
) -> Result<Vec<T>, GestureError> {
    match value {
        Value::Array(items) => items.iter().map(parse).collect(),
        single => Ok(vec![parse(single)?]),
    }
}

fn parse_type(value: &Value) -> Result<GestureType, GestureError> {
    value
        .as_str()
        .ok_or_else(|| GestureError::InvalidSpec(format!("type must be a string, got {value}")))?
        .parse()
}

fn parse_direction(value: &Value) -> Result<Option<Direction>, GestureError> {
    match value {
        Value::Null => Ok(None),
        Value::String(name) => name.parse().map(Some),
        Value::Number(angle) => angle
            .as_u64()
            .and_then(|a| u16::try_from(a).ok())
            .and_then(Direction::from_angle)
            .map(Some)
            .ok_or_else(|| GestureError::InvalidSpec(format!("{angle} is not a compass angle"))),
        other => Err(GestureError::InvalidSpec(format!(
            "direction must be a name, angle or null, got {other}"
        ))),
    }
}

fn parse_number(value: &Value) -> Result<f64, GestureError> {
    value
        .as_f64()
        .ok_or_else(|| GestureError::InvalidSpec(format!("expected a number, got {value}")))
}

/// Whether a single gesture satisfies `spec`
pub fn compare<E>(gesture: &ClassifiedGesture<E>, spec: &GestureSpec) -> bool {
    spec.matches(gesture)
}

/// True iff there are exactly `len` gestures (any number when `None`) and
/// all of them satisfy `spec`
pub fn all<E>(gestures: &[ClassifiedGesture<E>], spec: &GestureSpec, len: Option<usize>) -> bool {
    if gestures.len() != len.unwrap_or(gestures.len()) {
        return false;
    }
    gestures.iter().all(|g| spec.matches(g))
}

/// True iff there are no gestures
pub fn zero<E>(gestures: &[ClassifiedGesture<E>]) -> bool {
    gestures.is_empty()
}

pub fn one<E>(gestures: &[ClassifiedGesture<E>], spec: &GestureSpec) -> bool {
    all(gestures, spec, Some(1))
}

pub fn two<E>(gestures: &[ClassifiedGesture<E>], spec: &GestureSpec) -> bool {
    all(gestures, spec, Some(2))
}

pub fn three<E>(gestures: &[ClassifiedGesture<E>], spec: &GestureSpec) -> bool {
    all(gestures, spec, Some(3))
}

pub fn four<E>(gestures: &[ClassifiedGesture<E>], spec: &GestureSpec) -> bool {
    all(gestures, spec, Some(4))
}

pub fn five<E>(gestures: &[ClassifiedGesture<E>], spec: &GestureSpec) -> bool {
    all(gestures, spec, Some(5))
}
