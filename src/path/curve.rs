use std::sync::OnceLock;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::geometry::PathFrame;

use super::arc_length::ArcLengthTable;
use super::bezier::{self, BezierKnot};
use super::segment::{smoothstep, SegmentSpeed, DEFAULT_PATH_SPEED, MIN_SEGMENT_SPEED};

/// Fraction of the chord used for the handles of knots added with [`PathCurve::add_knot`].
const AUTO_TANGENT_SCALE: f32 = 0.3;

/// An authored 3D path addressed by travel distance.
///
/// The path is a piecewise cubic Bézier through its knots. Segment `i` runs
/// from knot `i` to knot `i + 1` and carries its own [`SegmentSpeed`]. The
/// segment settings list is kept parallel to the knot list by every edit.
///
/// All queries take a travel distance and clamp it to `[0, total_length]`,
/// so asking past either end returns the end point instead of failing.
#[derive(Component, Debug, Clone, Reflect, Serialize, Deserialize)]
#[reflect(Component, Default)]
#[serde(default)]
pub struct PathCurve {
    knots: Vec<BezierKnot>,
    segments: Vec<SegmentSpeed>,
    default_speed: f32,
    /// Built on first query, dropped by every structural edit.
    #[reflect(ignore)]
    #[serde(skip)]
    arc_length: OnceLock<ArcLengthTable>,
}

impl Default for PathCurve {
    fn default() -> Self {
        Self {
            knots: Vec::new(),
            segments: Vec::new(),
            default_speed: DEFAULT_PATH_SPEED,
            arc_length: OnceLock::new(),
        }
    }
}

impl PathCurve {
    /// Create an empty path.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a path through the given points, shaping handles as [`add_knot`](Self::add_knot) does.
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Self {
        let mut curve = Self::new();
        for point in points {
            curve.add_knot(point);
        }
        curve
    }

    /// Create a path from explicit knots and segment settings.
    ///
    /// Missing segment settings are filled with defaults, extra ones dropped.
    pub fn from_knots(knots: Vec<BezierKnot>, mut segments: Vec<SegmentSpeed>) -> Self {
        segments.resize(knots.len(), SegmentSpeed::default());
        Self {
            knots,
            segments,
            ..default()
        }
    }

    /// Set the speed used when no segment settings apply.
    pub fn with_default_speed(mut self, speed: f32) -> Self {
        self.default_speed = speed.max(MIN_SEGMENT_SPEED);
        self
    }

    /// Speed used when no segment settings apply.
    pub fn default_speed(&self) -> f32 {
        self.default_speed
    }

    /// The authored knots.
    pub fn knots(&self) -> &[BezierKnot] {
        &self.knots
    }

    /// Per-segment speed settings, parallel to [`knots`](Self::knots).
    pub fn segments(&self) -> &[SegmentSpeed] {
        &self.segments
    }

    /// Number of knots.
    pub fn knot_count(&self) -> usize {
        self.knots.len()
    }

    /// Number of segments between knots.
    pub fn segment_count(&self) -> usize {
        self.knots.len().saturating_sub(1)
    }

    /// Check if the path has enough knots to be followed.
    pub fn is_valid(&self) -> bool {
        self.knots.len() >= 2
    }

    fn table(&self) -> &ArcLengthTable {
        self.arc_length
            .get_or_init(|| ArcLengthTable::for_knots(&self.knots))
    }

    fn invalidate_cache(&mut self) {
        self.arc_length.take();
    }

    /// Total arc length of the path.
    pub fn total_length(&self) -> f32 {
        if !self.is_valid() {
            return 0.0;
        }
        self.table().total_length()
    }

    /// Fraction of the path covered at `distance`, in [0, 1].
    ///
    /// Returns 0 for a path with no length.
    pub fn normalized_parameter(&self, distance: f32) -> f32 {
        let length = self.total_length();
        if length <= 0.0 {
            return 0.0;
        }
        (distance / length).clamp(0.0, 1.0)
    }

    /// Raw Bézier parameter for a travel distance.
    fn curve_parameter(&self, distance: f32) -> f32 {
        self.table().length_to_t(distance)
    }

    /// Position at the given travel distance.
    pub fn position_at(&self, distance: f32) -> Vec3 {
        if !self.is_valid() {
            return Vec3::ZERO;
        }
        bezier::evaluate(&self.knots, self.curve_parameter(distance)).unwrap_or(Vec3::ZERO)
    }

    /// Normalized direction of travel at the given distance.
    pub fn tangent_at(&self, distance: f32) -> Vec3 {
        if !self.is_valid() {
            return Vec3::NEG_Z;
        }
        bezier::evaluate_tangent(&self.knots, self.curve_parameter(distance))
            .and_then(|tangent| tangent.try_normalize())
            .unwrap_or(Vec3::NEG_Z)
    }

    /// Up direction at the given distance, orthogonal to the tangent.
    pub fn up_at(&self, distance: f32) -> Vec3 {
        if !self.is_valid() {
            return Vec3::Y;
        }
        let t = self.curve_parameter(distance);
        let authored = bezier::evaluate_up(&self.knots, t).unwrap_or(Vec3::Y);
        let tangent = bezier::evaluate_tangent(&self.knots, t).unwrap_or(Vec3::NEG_Z);

        let frame = PathFrame::new(tangent, authored);
        if frame.is_valid() {
            frame.up
        } else {
            Vec3::Y
        }
    }

    /// Path-local frame at the given distance.
    pub fn frame_at(&self, distance: f32) -> PathFrame {
        PathFrame::new(self.tangent_at(distance), self.up_at(distance))
    }

    /// Travel orientation at the given distance (local -Z along the tangent).
    pub fn rotation_at(&self, distance: f32) -> Quat {
        self.frame_at(distance).travel_rotation()
    }

    /// Index of the segment that owns `distance`.
    ///
    /// Segments are resolved by the normalized parameter, not by each
    /// segment's own arc length: `floor(normalized * segment_count)`.
    pub fn segment_index_at(&self, distance: f32) -> usize {
        if !self.is_valid() {
            return 0;
        }
        let segment_count = self.segment_count();
        let index = (self.normalized_parameter(distance) * segment_count as f32).floor() as usize;
        index.min(segment_count - 1)
    }

    /// Travel distance at which a segment starts, by the same rule as
    /// [`segment_index_at`](Self::segment_index_at).
    pub fn segment_start_distance(&self, index: usize) -> f32 {
        if !self.is_valid() || index == 0 {
            return 0.0;
        }
        let normalized_start = index as f32 / self.segment_count() as f32;
        normalized_start * self.total_length()
    }

    /// Speed at the given travel distance.
    ///
    /// Within a segment's eased region the speed blends (smoothstep) from
    /// the previous segment's speed to this segment's speed. The region is
    /// `ease_in_duration * speed` long, measured from the segment start.
    pub fn speed_at(&self, distance: f32) -> f32 {
        if self.segments.is_empty() || self.total_length() <= 0.0 {
            return self.default_speed;
        }

        let index = self.segment_index_at(distance).min(self.segments.len() - 1);
        let current = self.segments[index];
        let into_segment = distance - self.segment_start_distance(index);
        let ease_distance = current.ease_distance();

        if current.ease_in_duration > 0.0 && into_segment < ease_distance {
            let previous = if index > 0 {
                self.segments[index - 1].speed
            } else {
                current.speed
            };
            let progress = smoothstep(into_segment / ease_distance);
            return previous + (current.speed - previous) * progress;
        }

        current.speed
    }

    /// Full pose at the given distance.
    pub fn pose_at(&self, distance: f32) -> PathPose {
        PathPose {
            distance: distance.clamp(0.0, self.total_length()),
            position: self.position_at(distance),
            tangent: self.tangent_at(distance),
            up: self.up_at(distance),
            speed: self.speed_at(distance),
        }
    }

    /// Sample `count` points at even arc-length spacing, endpoints included.
    pub fn sample_uniform(&self, count: usize) -> Vec<Vec3> {
        if !self.is_valid() {
            return Vec::new();
        }
        self.table()
            .uniform_t_values(count)
            .into_iter()
            .filter_map(|t| bezier::evaluate(&self.knots, t))
            .collect()
    }

    /// Sample points along every segment by raw curve parameter.
    ///
    /// Cheaper than [`sample_uniform`](Self::sample_uniform); spacing follows
    /// the knot layout rather than distance.
    pub fn sample(&self, samples_per_segment: usize) -> Vec<Vec3> {
        if !self.is_valid() {
            return Vec::new();
        }
        let total = self.segment_count() * samples_per_segment.max(1);
        (0..=total)
            .filter_map(|i| bezier::evaluate(&self.knots, i as f32 / total as f32))
            .collect()
    }

    /// Keep the segment settings parallel to the knots after deserializing.
    pub(crate) fn sync_segments(&mut self) {
        self.segments
            .resize(self.knots.len(), SegmentSpeed::default());
        for segment in &mut self.segments {
            *segment = segment.clamped();
        }
        self.default_speed = self.default_speed.max(MIN_SEGMENT_SPEED);
        self.invalidate_cache();
    }

    /// Append a knot at the given position.
    ///
    /// Handles are aligned with the direction from the previous knot and
    /// sized to a fraction of the distance to it.
    pub fn add_knot(&mut self, position: Vec3) {
        let mut knot = BezierKnot::new(position);

        if let Some(last) = self.knots.last() {
            let direction = (position - last.position).normalize_or_zero();
            let tangent_length = position.distance(last.position) * AUTO_TANGENT_SCALE;
            knot = knot.with_tangent(direction * tangent_length);
        }

        self.knots.push(knot);
        self.segments.push(SegmentSpeed::default());
        self.invalidate_cache();
    }

    /// Insert a knot at the given index. Indices past the end append.
    pub fn insert_knot(&mut self, index: usize, position: Vec3) {
        let index = index.min(self.knots.len());
        self.knots.insert(index, BezierKnot::new(position));

        if index < self.segments.len() {
            self.segments.insert(index, SegmentSpeed::default());
        } else {
            self.segments.push(SegmentSpeed::default());
        }

        self.invalidate_cache();
    }

    /// Remove the knot at the given index.
    pub fn remove_knot(&mut self, index: usize) -> Option<BezierKnot> {
        if index >= self.knots.len() {
            return None;
        }

        let knot = self.knots.remove(index);
        if index < self.segments.len() {
            self.segments.remove(index);
        }
        self.invalidate_cache();
        Some(knot)
    }

    /// Move the knot at the given index, keeping its handles.
    pub fn set_knot_position(&mut self, index: usize, position: Vec3) {
        if let Some(knot) = self.knots.get_mut(index) {
            knot.position = position;
            self.invalidate_cache();
        }
    }

    /// Replace the handles of the knot at the given index.
    pub fn set_knot_tangents(&mut self, index: usize, tangent_in: Vec3, tangent_out: Vec3) {
        if let Some(knot) = self.knots.get_mut(index) {
            knot.tangent_in = tangent_in;
            knot.tangent_out = tangent_out;
            self.invalidate_cache();
        }
    }

    /// Set the authored up direction of the knot at the given index.
    pub fn set_knot_up(&mut self, index: usize, up: Vec3) {
        if let Some(knot) = self.knots.get_mut(index) {
            knot.up = up;
        }
    }

    /// Position of the knot at the given index, or zero if out of range.
    pub fn knot_position(&self, index: usize) -> Vec3 {
        self.knots
            .get(index)
            .map(|knot| knot.position)
            .unwrap_or(Vec3::ZERO)
    }

    /// Speed settings of a segment, or the defaults if out of range.
    pub fn segment_speed(&self, index: usize) -> SegmentSpeed {
        self.segments.get(index).copied().unwrap_or_default()
    }

    /// Replace the speed settings of a segment. Out-of-range indices are ignored.
    pub fn set_segment_speed(&mut self, index: usize, settings: SegmentSpeed) {
        if let Some(segment) = self.segments.get_mut(index) {
            *segment = settings;
        }
    }

    /// Remove every knot and segment setting.
    pub fn clear(&mut self) {
        self.knots.clear();
        self.segments.clear();
        self.invalidate_cache();
    }
}

/// Position, orientation and speed at a travel distance.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Default)]
pub struct PathPose {
    /// Travel distance this pose was resolved at (clamped).
    pub distance: f32,
    /// World-space position.
    pub position: Vec3,
    /// Normalized direction of travel.
    pub tangent: Vec3,
    /// Up direction.
    pub up: Vec3,
    /// Speed in world units per second.
    pub speed: f32,
}

impl Default for PathPose {
    fn default() -> Self {
        Self {
            distance: 0.0,
            position: Vec3::ZERO,
            tangent: Vec3::NEG_Z,
            up: Vec3::Y,
            speed: 0.0,
        }
    }
}

impl PathPose {
    /// Path-local frame of this pose.
    pub fn frame(&self) -> PathFrame {
        PathFrame::new(self.tangent, self.up)
    }

    /// Travel orientation of this pose (local -Z along the tangent).
    pub fn rotation(&self) -> Quat {
        self.frame().travel_rotation()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn straight(length: f32, knots: usize) -> PathCurve {
        PathCurve::from_points(
            (0..knots).map(|i| Vec3::new(0.0, 0.0, -length * i as f32 / (knots - 1) as f32)),
        )
    }

    #[test]
    fn test_straight_path_length_and_positions() {
        let curve = straight(100.0, 2);
        assert!(curve.is_valid());
        assert!((curve.total_length() - 100.0).abs() < 0.01);

        let midpoint = curve.position_at(50.0);
        assert!((midpoint - Vec3::new(0.0, 0.0, -50.0)).length() < 0.1);

        assert!((curve.tangent_at(50.0) - Vec3::NEG_Z).length() < 0.001);
        assert!((curve.up_at(50.0) - Vec3::Y).length() < 0.001);
    }

    #[test]
    fn test_out_of_range_distances_clamp() {
        let curve = PathCurve::from_points([
            Vec3::ZERO,
            Vec3::new(10.0, 5.0, -20.0),
            Vec3::new(-5.0, 0.0, -40.0),
        ]);
        let length = curve.total_length();

        assert_eq!(curve.position_at(-5.0), curve.position_at(0.0));
        assert_eq!(curve.position_at(-0.001), curve.position_at(0.0));
        assert_eq!(curve.position_at(length + 50.0), curve.position_at(length));
        assert_eq!(curve.tangent_at(length * 3.0), curve.tangent_at(length));
        assert_eq!(curve.pose_at(-1.0).distance, 0.0);
        assert_eq!(curve.pose_at(length + 1.0).distance, length);
    }

    #[test]
    fn test_speed_steps_without_ease() {
        let mut curve = straight(200.0, 3);
        curve.set_segment_speed(0, SegmentSpeed::constant(10.0));
        curve.set_segment_speed(1, SegmentSpeed::constant(30.0));

        let boundary = curve.segment_start_distance(1);
        assert_eq!(curve.speed_at(boundary - 0.01), 10.0);
        assert_eq!(curve.speed_at(boundary), 30.0);
    }

    #[test]
    fn test_speed_eases_across_boundary() {
        let mut curve = straight(200.0, 3);
        curve.set_segment_speed(0, SegmentSpeed::constant(10.0));
        curve.set_segment_speed(1, SegmentSpeed::new(30.0, 0.5));

        let boundary = curve.segment_start_distance(1);
        // Ease window is 0.5s * 30 = 15 units past the boundary
        assert_eq!(curve.speed_at(boundary), 10.0);
        assert!((curve.speed_at(boundary - 0.01) - curve.speed_at(boundary)).abs() < 0.01);
        assert!((curve.speed_at(boundary + 7.5) - 20.0).abs() < 0.001);
        assert_eq!(curve.speed_at(boundary + 15.5), 30.0);
    }

    #[test]
    fn test_first_segment_eases_from_itself() {
        let mut curve = straight(100.0, 2);
        curve.set_segment_speed(0, SegmentSpeed::new(25.0, 2.0));

        assert_eq!(curve.speed_at(0.0), 25.0);
        assert_eq!(curve.speed_at(10.0), 25.0);
    }

    #[test]
    fn test_zero_length_path() {
        let curve = PathCurve::from_points([Vec3::ONE, Vec3::ONE, Vec3::ONE]);

        assert!(curve.is_valid());
        assert_eq!(curve.total_length(), 0.0);
        assert_eq!(curve.normalized_parameter(10.0), 0.0);
        assert_eq!(curve.position_at(0.0), Vec3::ONE);
        assert_eq!(curve.position_at(25.0), Vec3::ONE);
        assert_eq!(curve.speed_at(5.0), curve.default_speed());
    }

    #[test]
    fn test_invalid_path_queries() {
        let curve = PathCurve::from_points([Vec3::new(3.0, 0.0, 0.0)]);

        assert!(!curve.is_valid());
        assert_eq!(curve.total_length(), 0.0);
        assert_eq!(curve.position_at(5.0), Vec3::ZERO);
        assert_eq!(curve.tangent_at(5.0), Vec3::NEG_Z);
        assert_eq!(curve.up_at(5.0), Vec3::Y);
        assert_eq!(curve.speed_at(5.0), DEFAULT_PATH_SPEED);
    }

    #[test]
    fn test_edits_invalidate_length() {
        let mut curve = straight(100.0, 2);
        assert!((curve.total_length() - 100.0).abs() < 0.01);

        curve.set_knot_position(1, Vec3::new(0.0, 0.0, -50.0));
        assert!((curve.total_length() - 50.0).abs() < 0.5);

        curve.add_knot(Vec3::new(0.0, 0.0, -150.0));
        assert!((curve.total_length() - 150.0).abs() < 0.5);

        curve.remove_knot(2);
        assert!((curve.total_length() - 50.0).abs() < 0.5);

        curve.clear();
        assert_eq!(curve.total_length(), 0.0);
    }

    #[test]
    fn test_segment_settings_stay_parallel() {
        let mut curve = straight(30.0, 3);
        assert_eq!(curve.segments().len(), 3);

        curve.set_segment_speed(1, SegmentSpeed::constant(42.0));
        curve.insert_knot(1, Vec3::new(1.0, 0.0, -5.0));
        assert_eq!(curve.knot_count(), 4);
        assert_eq!(curve.segments().len(), 4);
        // Segment that used to start at knot 1 now starts at knot 2
        assert_eq!(curve.segment_speed(2).speed, 42.0);

        curve.insert_knot(99, Vec3::new(0.0, 0.0, -60.0));
        assert_eq!(curve.knot_count(), 5);
        assert_eq!(curve.segments().len(), 5);

        assert!(curve.remove_knot(0).is_some());
        assert!(curve.remove_knot(10).is_none());
        assert_eq!(curve.segments().len(), 4);
    }

    #[test]
    fn test_segment_index_by_normalized_parameter() {
        let curve = straight(90.0, 4);
        let length = curve.total_length();

        assert_eq!(curve.segment_index_at(0.0), 0);
        assert_eq!(curve.segment_index_at(length * 0.5), 1);
        assert_eq!(curve.segment_index_at(length), 2);
        assert_eq!(curve.segment_start_distance(0), 0.0);
        assert!((curve.segment_start_distance(2) - length * 2.0 / 3.0).abs() < 1e-4);
    }

    #[test]
    fn test_up_is_orthogonal_to_tangent() {
        let curve = PathCurve::from_points([
            Vec3::ZERO,
            Vec3::new(0.0, 10.0, -20.0),
            Vec3::new(10.0, 0.0, -40.0),
        ]);

        for i in 0..=10 {
            let distance = curve.total_length() * i as f32 / 10.0;
            let tangent = curve.tangent_at(distance);
            let up = curve.up_at(distance);
            assert!(tangent.dot(up).abs() < 0.01);
            assert!((up.length() - 1.0).abs() < 0.001);
        }
    }

    #[test]
    fn test_add_knot_shapes_handles() {
        let curve = straight(10.0, 2);
        let knot = curve.knots()[1];

        assert!((knot.tangent_out - Vec3::new(0.0, 0.0, -3.0)).length() < 1e-5);
        assert!((knot.tangent_in - Vec3::new(0.0, 0.0, 3.0)).length() < 1e-5);
        assert_eq!(curve.knots()[0].tangent_out, Vec3::ZERO);
    }
}
