use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// A control knot of a piecewise cubic Bézier path.
///
/// Tangents are stored relative to the knot position, so moving a knot
/// carries its handles along with it.
#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Default)]
#[serde(default)]
pub struct BezierKnot {
    /// Position of the knot in world space.
    pub position: Vec3,
    /// Incoming handle, relative to `position`.
    pub tangent_in: Vec3,
    /// Outgoing handle, relative to `position`.
    pub tangent_out: Vec3,
    /// Authored up direction at this knot.
    pub up: Vec3,
}

impl Default for BezierKnot {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            tangent_in: Vec3::ZERO,
            tangent_out: Vec3::ZERO,
            up: Vec3::Y,
        }
    }
}

impl BezierKnot {
    /// Create a knot with no handles.
    pub fn new(position: Vec3) -> Self {
        Self {
            position,
            ..default()
        }
    }

    /// Set symmetric handles: `tangent_out = tangent`, `tangent_in = -tangent`.
    pub fn with_tangent(mut self, tangent: Vec3) -> Self {
        self.tangent_in = -tangent;
        self.tangent_out = tangent;
        self
    }

    /// Set the authored up direction.
    pub fn with_up(mut self, up: Vec3) -> Self {
        self.up = up;
        self
    }
}

/// Control points of the cubic Bézier between two consecutive knots.
pub fn segment_points(start: &BezierKnot, end: &BezierKnot) -> [Vec3; 4] {
    [
        start.position,
        start.position + start.tangent_out,
        end.position + end.tangent_in,
        end.position,
    ]
}

/// Map a curve parameter (0.0 to 1.0 across all segments) to a segment
/// index and the local parameter inside that segment.
pub fn locate(knot_count: usize, t: f32) -> Option<(usize, f32)> {
    if knot_count < 2 {
        return None;
    }

    let num_segments = knot_count - 1;
    let t_scaled = t.clamp(0.0, 1.0) * num_segments as f32;
    let segment = (t_scaled.floor() as usize).min(num_segments - 1);
    let local_t = t_scaled - segment as f32;

    Some((segment, local_t))
}

/// Evaluate the path at curve parameter t.
pub fn evaluate(knots: &[BezierKnot], t: f32) -> Option<Vec3> {
    let (segment, local_t) = locate(knots.len(), t)?;
    let [p0, p1, p2, p3] = segment_points(&knots[segment], &knots[segment + 1]);
    Some(cubic_bezier(p0, p1, p2, p3, local_t))
}

/// Evaluate the (unnormalized) derivative at curve parameter t.
///
/// Where the derivative vanishes (a knot without handles), the chord of the
/// segment is returned instead so callers always get a travel direction.
pub fn evaluate_tangent(knots: &[BezierKnot], t: f32) -> Option<Vec3> {
    let (segment, local_t) = locate(knots.len(), t)?;
    let [p0, p1, p2, p3] = segment_points(&knots[segment], &knots[segment + 1]);
    let derivative = cubic_bezier_derivative(p0, p1, p2, p3, local_t);

    if derivative.length_squared() > 1e-8 {
        Some(derivative)
    } else {
        Some(p3 - p0)
    }
}

/// Interpolate the authored knot up vectors at curve parameter t.
pub fn evaluate_up(knots: &[BezierKnot], t: f32) -> Option<Vec3> {
    let (segment, local_t) = locate(knots.len(), t)?;
    Some(knots[segment].up.lerp(knots[segment + 1].up, local_t))
}

pub(crate) fn cubic_bezier(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, t: f32) -> Vec3 {
    let t2 = t * t;
    let t3 = t2 * t;
    let mt = 1.0 - t;
    let mt2 = mt * mt;
    let mt3 = mt2 * mt;

    p0 * mt3 + p1 * 3.0 * mt2 * t + p2 * 3.0 * mt * t2 + p3 * t3
}

pub(crate) fn cubic_bezier_derivative(p0: Vec3, p1: Vec3, p2: Vec3, p3: Vec3, t: f32) -> Vec3 {
    let t2 = t * t;
    let mt = 1.0 - t;
    let mt2 = mt * mt;

    (p1 - p0) * 3.0 * mt2 + (p2 - p1) * 6.0 * mt * t + (p3 - p2) * 3.0 * t2
}
