//! Recognizer configuration
//!
//! Thresholds accept both snake_case keys and the camelCase option names
//! (`maxTapDuration`, `maxTapMovement`, `minSwipeMovement`, `swipeAngleMargin`).

use crate::error::GestureError;
use serde::{Deserialize, Serialize};

/// Default longest tap, in milliseconds
pub const DEFAULT_MAX_TAP_DURATION_MS: f64 = 170.0;

/// Default tap movement bound (exclusive), per axis
pub const DEFAULT_MAX_TAP_MOVEMENT: f64 = 2.0;

/// Default swipe movement threshold (inclusive), per axis
pub const DEFAULT_MIN_SWIPE_MOVEMENT: f64 = 50.0;

/// Default half-width of each compass sector, in degrees
pub const DEFAULT_SWIPE_ANGLE_MARGIN_DEG: f64 = 45.0 / 2.0;

/// When a scheduled flush becomes due
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BatchWindow {
    /// Due at the next host frame, i.e. the next `tick()`
    #[default]
    NextFrame,
    /// Due a fixed delay after the release that scheduled it
    DelayMs(f64),
}

/// Classification thresholds and batching behavior
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    /// A contact lasting at most this long can be a tap.
    #[serde(alias = "maxTapDuration")]
    pub max_tap_duration_ms: f64,

    /// A tap must move strictly less than this on both axes.
    #[serde(alias = "maxTapMovement")]
    pub max_tap_movement: f64,

    /// A non-tap moving at least this far on either axis is a swipe,
    /// anything shorter is a hold.
    #[serde(alias = "minSwipeMovement")]
    pub min_swipe_movement: f64,

    /// An angle within this many degrees (inclusive) of a compass point snaps
    /// to it. Above 22.5 sectors overlap and the lower angle wins; below it
    /// some angles get no direction.
    #[serde(alias = "swipeAngleMargin")]
    pub swipe_angle_margin_deg: f64,

    /// How long releases are batched before a flush
    #[serde(alias = "batchWindow")]
    pub batch_window: BatchWindow,

    /// Whether contact updates are recorded. When off, active contacts are
    /// reported at their start position.
    #[serde(alias = "trackUpdates")]
    pub track_updates: bool,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            max_tap_duration_ms: DEFAULT_MAX_TAP_DURATION_MS,
            max_tap_movement: DEFAULT_MAX_TAP_MOVEMENT,
            min_swipe_movement: DEFAULT_MIN_SWIPE_MOVEMENT,
            swipe_angle_margin_deg: DEFAULT_SWIPE_ANGLE_MARGIN_DEG,
            batch_window: BatchWindow::NextFrame,
            track_updates: true,
        }
    }
}

impl GestureConfig {
    /// Parse a JSON configuration, filling missing keys with defaults
    pub fn from_json(json: &str) -> Result<Self, GestureError> {
        let config: GestureConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn with_max_tap_duration(mut self, ms: f64) -> Self {
        self.max_tap_duration_ms = ms;
        self
    }

    pub fn with_max_tap_movement(mut self, movement: f64) -> Self {
        self.max_tap_movement = movement;
        self
    }

    pub fn with_min_swipe_movement(mut self, movement: f64) -> Self {
        self.min_swipe_movement = movement;
        self
    }

    pub fn with_swipe_angle_margin(mut self, degrees: f64) -> Self {
        self.swipe_angle_margin_deg = degrees;
        self
    }

    pub fn with_batch_window(mut self, window: BatchWindow) -> Self {
        self.batch_window = window;
        self
    }

    pub fn with_track_updates(mut self, track: bool) -> Self {
        self.track_updates = track;
        self
    }

    /// Reject thresholds that cannot classify anything sensibly
    pub fn validate(&self) -> Result<(), GestureError> {
        non_negative("max_tap_duration_ms", self.max_tap_duration_ms)?;
        non_negative("max_tap_movement", self.max_tap_movement)?;
        non_negative("min_swipe_movement", self.min_swipe_movement)?;

        let margin = self.swipe_angle_margin_deg;
        if !margin.is_finite() || margin <= 0.0 {
            return Err(GestureError::InvalidConfig {
                field: "swipe_angle_margin_deg",
                reason: format!("must be positive, got {margin}"),
            });
        }

        if let BatchWindow::DelayMs(delay) = self.batch_window {
            non_negative("batch_window.delay_ms", delay)?;
        }

        Ok(())
    }
}

fn non_negative(field: &'static str, value: f64) -> Result<(), GestureError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(GestureError::InvalidConfig {
            field,
            reason: format!("must be a non-negative number, got {value}"),
        })
    }
}
