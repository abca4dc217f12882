//! Geometry classification
//!
//! Reduces a contact's start and end points to a [`ClassifiedGesture`]:
//! elapsed time, displacement, angle, snapped compass direction and type.
//! Every function here is pure and total over numeric input.

use crate::config::GestureConfig;
use crate::types::{ClassifiedGesture, ContactPoint, Direction, GestureType};
use std::f64::consts::PI;

/// Stand-in for a zero horizontal displacement when computing the angle
pub const ZERO_DX_EPSILON: f64 = 0.001;

/// Classify a start/end pair
pub fn classify<E: Clone>(
    start: &ContactPoint<E>,
    end: &ContactPoint<E>,
    config: &GestureConfig,
) -> ClassifiedGesture<E> {
    let duration_ms = end.timestamp_ms - start.timestamp_ms;
    let dx = end.x - start.x;
    // Screen y grows downwards; positive dy means up.
    let dy = start.y - end.y;

    let angle_deg = angle_degrees(dx, dy);
    let direction = if dx == 0.0 && dy == 0.0 {
        Some(Direction::Right)
    } else {
        snap_direction(angle_deg, config.swipe_angle_margin_deg)
    };
    let gesture_type = gesture_type(duration_ms, dx, dy, config);

    ClassifiedGesture {
        duration_ms,
        dx,
        dy,
        angle_deg,
        direction,
        gesture_type,
        start_event: start.raw.clone(),
        end_event: end.raw.clone(),
    }
}

/// Angle of `(dx, dy)` in degrees, counter-clockwise from +x.
///
/// Formula: `atan(dy / dx) * 180 / π` with quadrant correction. A zero `dx`
/// is replaced by [`ZERO_DX_EPSILON`], so a purely vertical displacement
/// lands a hair off 90° or 270° instead of exactly on it. This is not
/// `atan2`; switching would move direction boundaries.
///
/// The result is in `[0, 360]`, not `[0, 360)`: a positive `dx` with a tiny
/// negative `dy` rounds `360 + degrees` up to exactly `360.0`. Snapping
/// treats 360 as right.
pub fn angle_degrees(dx: f64, dy: f64) -> f64 {
    let dx = if dx == 0.0 { ZERO_DX_EPSILON } else { dx };

    let degrees = (dy / dx).atan() * 180.0 / PI;
    if dx > 0.0 && dy >= 0.0 {
        degrees
    } else if dx < 0.0 {
        degrees + 90.0 * 2.0
    } else {
        360.0 + degrees
    }
}

/// Snap an angle to the first compass point within `margin_deg` (inclusive).
///
/// Octants are tried in order `0, 45, .., 360`; 360 maps back to 0 (right).
pub fn snap_direction(angle_deg: f64, margin_deg: f64) -> Option<Direction> {
    (0..9u16)
        .find(|i| (f64::from(45 * i) - angle_deg).abs() <= margin_deg)
        .and_then(|i| Direction::from_angle((45 * i) % 360))
}

/// Decide the gesture type, in priority order tap, swipe, hold.
///
/// - tap: `dt <= max_tap_duration` and `|dx|`, `|dy|` both `< max_tap_movement`
/// - swipe: `|dx| >= min_swipe_movement` or `|dy| >= min_swipe_movement`
/// - hold: everything else
pub fn gesture_type(duration_ms: f64, dx: f64, dy: f64, config: &GestureConfig) -> GestureType {
    let abs_dx = dx.abs();
    let abs_dy = dy.abs();

    if duration_ms <= config.max_tap_duration_ms
        && abs_dx < config.max_tap_movement
        && abs_dy < config.max_tap_movement
    {
        GestureType::Tap
    } else if abs_dx >= config.min_swipe_movement || abs_dy >= config.min_swipe_movement {
        GestureType::Swipe
    } else {
        GestureType::Hold
    }
}
