mod arc_length;
mod bezier;
mod curve;
mod segment;

pub use arc_length::{ArcLengthTable, ARC_LENGTH_SAMPLES_PER_SEGMENT};
pub use bezier::BezierKnot;
pub use curve::{PathCurve, PathPose};
pub use segment::{smoothstep, SegmentSpeed, DEFAULT_PATH_SPEED, MIN_SEGMENT_SPEED};

use bevy::prelude::*;

/// Plugin that registers path types for reflection.
pub struct PathPlugin;

impl Plugin for PathPlugin {
    fn build(&self, app: &mut App) {
        app.register_type::<PathCurve>()
            .register_type::<BezierKnot>()
            .register_type::<SegmentSpeed>()
            .register_type::<PathPose>();
    }
}
