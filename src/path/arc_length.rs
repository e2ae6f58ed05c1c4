//! Distance to curve-parameter mapping.
//!
//! Queries on a [`PathCurve`](super::PathCurve) take travel distances, while
//! the Bézier segments are evaluated by a raw parameter. The table here maps
//! one to the other so that equal distance steps cover equal ground.

use bevy::prelude::*;

use super::bezier::{cubic_bezier, segment_points, BezierKnot};

/// Number of samples taken per Bézier segment when building the table.
pub const ARC_LENGTH_SAMPLES_PER_SEGMENT: usize = 32;

/// Cumulative length sampled along a knot sequence.
///
/// Entry `i` pairs a raw curve parameter (0.0 to 1.0 across all segments)
/// with the arc length from the start of the path to that parameter.
#[derive(Debug, Clone, Default)]
pub struct ArcLengthTable {
    parameters: Vec<f32>,
    lengths: Vec<f32>,
}

impl ArcLengthTable {
    /// Sample every segment `samples_per_segment` times.
    pub fn compute(knots: &[BezierKnot], samples_per_segment: usize) -> Self {
        let mut table = Self::default();
        if knots.len() < 2 {
            return table;
        }

        let steps = samples_per_segment.max(1);
        let segment_count = knots.len() - 1;
        let total_steps = (segment_count * steps) as f32;

        table.parameters.push(0.0);
        table.lengths.push(0.0);

        let mut travelled = 0.0;
        for (segment, pair) in knots.windows(2).enumerate() {
            let [p0, p1, p2, p3] = segment_points(&pair[0], &pair[1]);
            let mut last = p0;

            for step in 1..=steps {
                let point = cubic_bezier(p0, p1, p2, p3, step as f32 / steps as f32);
                travelled += last.distance(point);
                last = point;

                table
                    .parameters
                    .push((segment * steps + step) as f32 / total_steps);
                table.lengths.push(travelled);
            }
        }

        table
    }

    /// Sample with [`ARC_LENGTH_SAMPLES_PER_SEGMENT`].
    pub fn for_knots(knots: &[BezierKnot]) -> Self {
        Self::compute(knots, ARC_LENGTH_SAMPLES_PER_SEGMENT)
    }

    /// Length of the whole path.
    pub fn total_length(&self) -> f32 {
        self.lengths.last().copied().unwrap_or(0.0)
    }

    /// Raw curve parameter at `length` along the path.
    ///
    /// Lengths outside `[0, total_length]` clamp to the ends. A path with no
    /// length maps everything to 0.
    pub fn length_to_t(&self, length: f32) -> f32 {
        let total = self.total_length();
        if total <= 0.0 {
            return 0.0;
        }
        if length >= total {
            return 1.0;
        }
        let length = length.max(0.0);

        // First sample at or past the target; the one before it brackets it
        let upper = self
            .lengths
            .partition_point(|&sampled| sampled < length)
            .clamp(1, self.lengths.len() - 1);
        let lower = upper - 1;

        let span = self.lengths[upper] - self.lengths[lower];
        if span < 1e-6 {
            return self.parameters[lower];
        }

        let alpha = (length - self.lengths[lower]) / span;
        let (t0, t1) = (self.parameters[lower], self.parameters[upper]);
        t0 + (t1 - t0) * alpha
    }

    /// `count` parameters at even length spacing, endpoints included.
    pub fn uniform_t_values(&self, count: usize) -> Vec<f32> {
        match count {
            0 => Vec::new(),
            1 => vec![0.0],
            _ => {
                let spacing = self.total_length() / (count - 1) as f32;
                (0..count)
                    .map(|i| self.length_to_t(spacing * i as f32))
                    .collect()
            }
        }
    }
}
