//! Canonical gesture serials
//!
//! A serial is a short, order-independent string describing a gesture set,
//! e.g. `"2:tap,1:hold"` or `"1:swipe:right,1:swipe:down"`. Interactions join
//! the ended and active serials with `|`.

use crate::types::{ClassifiedGesture, Direction, GestureType};
use std::collections::BTreeMap;

/// Name used for swipes that did not snap to a compass point
pub const UNSNAPPED_DIRECTION: &str = "none";

/// Serialize a gesture set.
///
/// Taps and holds are counted; swipes are counted per direction, ascending by
/// angle, with unsnapped swipes last. Empty groups are omitted.
pub fn serialize_gestures<E>(gestures: &[ClassifiedGesture<E>]) -> String {
    let mut taps = 0usize;
    let mut holds = 0usize;
    // Keyed (unsnapped, angle): snapped groups first, ascending by angle.
    let mut swipes: BTreeMap<(bool, Option<u16>), usize> = BTreeMap::new();

    for gesture in gestures {
        match gesture.gesture_type {
            GestureType::Tap => taps += 1,
            GestureType::Hold => holds += 1,
            GestureType::Swipe => {
                let angle = gesture.direction.map(Direction::angle);
                *swipes.entry((angle.is_none(), angle)).or_default() += 1;
            }
        }
    }

    let mut parts = Vec::new();
    if taps > 0 {
        parts.push(format!("{taps}:tap"));
    }
    if holds > 0 {
        parts.push(format!("{holds}:hold"));
    }
    for ((_, angle), count) in swipes {
        let name = angle
            .and_then(Direction::from_angle)
            .map_or(UNSNAPPED_DIRECTION, Direction::name);
        parts.push(format!("{count}:swipe:{name}"));
    }

    parts.join(",")
}

/// Serialize an interaction as `"<ended>|<active>"`.
///
/// An empty `ended` set yields an empty serial even when contacts are still
/// active: a serial describes what was released. An empty `active` set drops
/// the `|` part.
pub fn serialize_interaction<E>(
    ended: &[ClassifiedGesture<E>],
    active: &[ClassifiedGesture<E>],
) -> String {
    if ended.is_empty() {
        return String::new();
    }

    let mut serial = serialize_gestures(ended);
    if !active.is_empty() {
        serial.push('|');
        serial.push_str(&serialize_gestures(active));
    }
    serial
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn gesture(gesture_type: GestureType, direction: Option<Direction>) -> ClassifiedGesture {
        ClassifiedGesture {
            duration_ms: 0.0,
            dx: 0.0,
            dy: 0.0,
            angle_deg: 0.0,
            direction,
            gesture_type,
            start_event: (),
            end_event: (),
        }
    }

    fn tap() -> ClassifiedGesture {
        gesture(GestureType::Tap, Some(Direction::Right))
    }

    fn hold() -> ClassifiedGesture {
        gesture(GestureType::Hold, Some(Direction::Right))
    }

    fn swipe(direction: Direction) -> ClassifiedGesture {
        gesture(GestureType::Swipe, Some(direction))
    }

    #[test]
    fn test_groups_taps_and_holds_in_any_order() {
        let orders = [
            vec![tap(), tap(), hold()],
            vec![hold(), tap(), tap()],
            vec![tap(), hold(), tap()],
        ];
        for gestures in orders {
            assert_eq!(serialize_gestures(&gestures), "2:tap,1:hold");
        }
    }

    #[test]
    fn test_swipes_sorted_by_angle() {
        let gestures = [swipe(Direction::Down), swipe(Direction::Right)];
        assert_eq!(serialize_gestures(&gestures), "1:swipe:right,1:swipe:down");
    }

    #[test]
    fn test_mixed_set() {
        let gestures = [
            swipe(Direction::Left),
            tap(),
            swipe(Direction::UpRight),
            swipe(Direction::Left),
            hold(),
        ];
        assert_eq!(
            serialize_gestures(&gestures),
            "1:tap,1:hold,1:swipe:up-right,2:swipe:left"
        );
    }

    #[test]
    fn test_unsnapped_swipes_go_last() {
        let gestures = [
            gesture(GestureType::Swipe, None),
            swipe(Direction::DownRight),
        ];
        assert_eq!(
            serialize_gestures(&gestures),
            "1:swipe:down-right,1:swipe:none"
        );
    }

    #[test]
    fn test_empty_set() {
        let empty: [ClassifiedGesture; 0] = [];
        assert_eq!(serialize_gestures(&empty), "");
    }

    #[test]
    fn test_interaction_joins_with_pipe() {
        assert_eq!(
            serialize_interaction(&[tap(), tap()], &[hold()]),
            "2:tap|1:hold"
        );
        assert_eq!(serialize_interaction(&[swipe(Direction::Up)], &[]), "1:swipe:up");
    }

    #[test]
    fn test_interaction_without_ended_is_empty() {
        assert_eq!(serialize_interaction(&[], &[hold(), tap()]), "");
    }
}
