//! Pointer gesture classification
//!
//! Pure rules over deltas and timestamps; no physics.

use std::time::{Duration, Instant};

use crate::config::GestureConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwipeConfig {
    pub threshold_px: f32,
    pub vertical_ratio: f32,
}

impl Default for SwipeConfig {
    fn default() -> Self {
        Self {
            threshold_px: 100.0,
            vertical_ratio: 0.5,
        }
    }
}

impl From<&GestureConfig> for SwipeConfig {
    fn from(config: &GestureConfig) -> Self {
        Self {
            threshold_px: config.swipe_threshold_px,
            vertical_ratio: config.vertical_swipe_ratio,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Swipe {
    /// Downward swipe; closes the detail view
    Dismiss,
    /// Leftward swipe
    Next,
    /// Rightward swipe
    Previous,
    None,
}

/// Classify one completed drag. `dx`/`dy` are end minus start, y grows downward.
///
/// Vertical dismissal is checked first and ignores the horizontal component
/// once the vertical delta dominates.
pub fn classify_swipe(dx: f32, dy: f32, config: &SwipeConfig) -> Swipe {
    let (ax, ay) = (dx.abs(), dy.abs());

    if dy > 0.0 && ay >= config.threshold_px && ay > ax * config.vertical_ratio {
        return Swipe::Dismiss;
    }

    if ax >= config.threshold_px && ax > ay {
        return if dx < 0.0 { Swipe::Next } else { Swipe::Previous };
    }

    Swipe::None
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tap {
    Single,
    Double,
}

/// Pairs taps that land within `window` of each other
#[derive(Debug, Clone)]
pub struct DoubleTapDetector {
    window: Duration,
    last_tap: Option<Instant>,
}

impl DoubleTapDetector {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_tap: None,
        }
    }

    /// A double tap consumes both taps; the next tap starts over.
    pub fn register_tap(&mut self, at: Instant) -> Tap {
        match self.last_tap {
            Some(previous) if at.saturating_duration_since(previous) < self.window => {
                self.last_tap = None;
                Tap::Double
            }
            _ => {
                self.last_tap = Some(at);
                Tap::Single
            }
        }
    }

    pub fn reset(&mut self) {
        self.last_tap = None;
    }
}
