use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Speed used when a path has no segment settings.
pub const DEFAULT_PATH_SPEED: f32 = 20.0;

/// Lowest speed a segment can be authored with.
pub const MIN_SEGMENT_SPEED: f32 = 1.0;

/// Speed settings for one path segment (the stretch between knot `i` and knot `i + 1`).
#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Default)]
#[serde(default)]
pub struct SegmentSpeed {
    /// Movement speed in world units per second.
    pub speed: f32,
    /// Time in seconds to ease into this segment's speed from the previous one.
    pub ease_in_duration: f32,
}

impl Default for SegmentSpeed {
    fn default() -> Self {
        Self {
            speed: DEFAULT_PATH_SPEED,
            ease_in_duration: 0.5,
        }
    }
}

impl SegmentSpeed {
    /// Create segment settings, clamping to the authorable range.
    pub fn new(speed: f32, ease_in_duration: f32) -> Self {
        Self {
            speed: speed.max(MIN_SEGMENT_SPEED),
            ease_in_duration: ease_in_duration.max(0.0),
        }
    }

    /// Re-apply the clamps of [`new`](Self::new), e.g. after deserializing.
    pub fn clamped(self) -> Self {
        Self::new(self.speed, self.ease_in_duration)
    }

    /// A segment that switches to its speed instantly.
    pub fn constant(speed: f32) -> Self {
        Self::new(speed, 0.0)
    }

    /// Length of the eased region at the start of the segment.
    ///
    /// The ease is authored in seconds but applied over distance, converted
    /// with this segment's own (target) speed.
    pub fn ease_distance(&self) -> f32 {
        self.ease_in_duration * self.speed
    }
}

/// Hermite smoothstep from 0 to 1, with the input clamped to [0, 1].
pub fn smoothstep(x: f32) -> f32 {
    let x = x.clamp(0.0, 1.0);
    x * x * (3.0 - 2.0 * x)
}
