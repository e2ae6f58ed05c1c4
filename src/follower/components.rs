use bevy::prelude::*;

use crate::path::{PathCurve, PathPose};

/// Current state of a path follower.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Reflect)]
#[reflect(Default)]
pub enum FollowerState {
    /// Not yet initialized against a valid path.
    #[default]
    Idle,
    /// Advancing along the path every fixed step.
    Following,
    /// Halted by [`PathFollower::stop`]; distances are kept.
    Stopped,
    /// Reached the end of the path.
    Completed,
}

/// Outcome of one fixed simulation step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowerTick {
    /// Not following, or the path is invalid. Nothing changed.
    Skipped,
    /// Distance advanced.
    Advanced,
    /// Distance advanced and reached the end of the path on this step.
    Completed,
}

/// Component that moves an entity along a [`PathCurve`] by travel distance.
///
/// Distance is integrated at fixed simulation steps with the path's speed
/// profile. Rendering reads an interpolated pose between the last two steps,
/// so the display rate can differ from the simulation rate without snapping.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component, Default)]
pub struct PathFollower {
    /// The path entity to follow.
    pub path: Entity,

    /// Distance to start from on initialize and reset.
    pub start_distance: f32,

    /// Multiplier applied to the path's segment speeds.
    pub speed_multiplier: f32,

    /// Whether to rotate the entity to face along the path.
    pub align_to_path: bool,

    state: FollowerState,
    current_distance: f32,
    previous_distance: f32,
    pose: PathPose,
}

impl Default for PathFollower {
    fn default() -> Self {
        Self {
            path: Entity::PLACEHOLDER,
            start_distance: 0.0,
            speed_multiplier: 1.0,
            align_to_path: true,
            state: FollowerState::Idle,
            current_distance: 0.0,
            previous_distance: 0.0,
            pose: PathPose::default(),
        }
    }
}

impl PathFollower {
    /// Create a new follower for the given path.
    pub fn new(path: Entity) -> Self {
        Self {
            path,
            ..default()
        }
    }

    /// Set the starting distance.
    pub fn with_start_distance(mut self, distance: f32) -> Self {
        self.start_distance = distance.max(0.0);
        self
    }

    /// Set the speed multiplier. Negative values clamp to 0.
    pub fn with_speed_multiplier(mut self, multiplier: f32) -> Self {
        self.speed_multiplier = multiplier.max(0.0);
        self
    }

    /// Enable or disable alignment to the path direction.
    pub fn with_align_to_path(mut self, align: bool) -> Self {
        self.align_to_path = align;
        self
    }

    /// Reset both distances to `start_distance` and begin following.
    ///
    /// A follower that starts at (or past) the end of the path is
    /// immediately [`FollowerState::Completed`]. An invalid path leaves the
    /// follower [`FollowerState::Idle`].
    pub fn initialize(&mut self, curve: &PathCurve, start_distance: f32) {
        if !curve.is_valid() {
            self.state = FollowerState::Idle;
            self.current_distance = 0.0;
            self.previous_distance = 0.0;
            self.pose = PathPose::default();
            return;
        }

        let length = curve.total_length();
        let distance = start_distance.clamp(0.0, length);
        self.current_distance = distance;
        self.previous_distance = distance;
        self.state = if distance < length {
            FollowerState::Following
        } else {
            FollowerState::Completed
        };
        self.refresh_pose(curve);
    }

    /// Re-initialize at `start_distance`.
    pub fn reset(&mut self, curve: &PathCurve) {
        self.initialize(curve, self.start_distance);
    }

    /// Advance one fixed simulation step.
    ///
    /// Call once per fixed step, not once per rendered frame.
    pub fn tick(&mut self, curve: &PathCurve, fixed_delta: f32) -> FollowerTick {
        if self.state != FollowerState::Following || !curve.is_valid() {
            return FollowerTick::Skipped;
        }

        self.previous_distance = self.current_distance;

        // speed_multiplier is public and may have been set negative
        let speed = curve.speed_at(self.current_distance) * self.speed_multiplier.max(0.0);
        let length = curve.total_length();
        self.current_distance = (self.current_distance + speed * fixed_delta).clamp(0.0, length);

        let outcome = if self.current_distance >= length {
            self.current_distance = length;
            self.state = FollowerState::Completed;
            FollowerTick::Completed
        } else {
            FollowerTick::Advanced
        };

        self.refresh_pose(curve);
        outcome
    }

    /// Pose to render between fixed steps.
    ///
    /// `interpolation` is the fraction of a fixed step elapsed since the last
    /// one (clamped to [0, 1]). Position blends from the previous step's
    /// position to the current one; tangent, up and speed are the current
    /// step's values.
    pub fn render_state(&self, curve: &PathCurve, interpolation: f32) -> PathPose {
        let alpha = interpolation.clamp(0.0, 1.0);
        let previous = if curve.is_valid() {
            curve.position_at(self.previous_distance)
        } else {
            self.pose.position
        };

        PathPose {
            position: previous * (1.0 - alpha) + self.pose.position * alpha,
            ..self.pose
        }
    }

    /// Halt advancement without touching distances.
    pub fn stop(&mut self) {
        if self.state == FollowerState::Following {
            self.state = FollowerState::Stopped;
        }
    }

    /// Resume after [`stop`](Self::stop).
    pub fn resume(&mut self) {
        if self.state == FollowerState::Stopped {
            self.state = FollowerState::Following;
        }
    }

    /// Jump to a distance, e.g. when restarting from a checkpoint.
    ///
    /// Both distances are set so nothing is interpolated across the jump, and
    /// the cached pose is refreshed immediately. Seeking back from the end of
    /// the path resumes following.
    pub fn set_distance(&mut self, curve: &PathCurve, distance: f32) {
        let length = curve.total_length();
        let distance = distance.clamp(0.0, length);
        self.current_distance = distance;
        self.previous_distance = distance;

        if self.state == FollowerState::Completed && distance < length {
            self.state = FollowerState::Following;
        }

        self.refresh_pose(curve);
    }

    fn refresh_pose(&mut self, curve: &PathCurve) {
        let mut pose = curve.pose_at(self.current_distance);
        pose.speed *= self.speed_multiplier.max(0.0);
        self.pose = pose;
    }

    /// Current playback state.
    pub fn state(&self) -> FollowerState {
        self.state
    }

    /// Distance after the latest simulation step.
    pub fn current_distance(&self) -> f32 {
        self.current_distance
    }

    /// Distance before the latest simulation step.
    pub fn previous_distance(&self) -> f32 {
        self.previous_distance
    }

    /// Pose at the current distance, without interpolation.
    ///
    /// Use this from fixed-step code to avoid interpolating twice.
    pub fn pose(&self) -> PathPose {
        self.pose
    }

    /// Speed at the current distance, including the multiplier.
    pub fn current_speed(&self) -> f32 {
        self.pose.speed
    }

    /// Fraction of the path covered, in [0, 1].
    pub fn normalized_progress(&self, curve: &PathCurve) -> f32 {
        curve.normalized_parameter(self.current_distance)
    }

    /// Check if the follower is currently advancing.
    pub fn is_following(&self) -> bool {
        self.state == FollowerState::Following
    }

    /// Check if the follower has reached the end of its path.
    pub fn is_completed(&self) -> bool {
        self.state == FollowerState::Completed
    }
}

/// Message emitted every fixed step a follower's distance advances.
#[derive(Message, Debug, Clone, Copy)]
pub struct DistanceChanged {
    /// The entity with the [`PathFollower`] component.
    pub follower: Entity,
    /// Distance after the step.
    pub distance: f32,
}

/// Message emitted once when a follower reaches the end of its path.
#[derive(Message, Debug, Clone, Copy)]
pub struct PathCompleted {
    /// The entity with the [`PathFollower`] component.
    pub follower: Entity,
}

/// Request to move a follower to a distance.
#[derive(Message, Debug, Clone, Copy)]
pub struct SeekFollower {
    /// The entity with the [`PathFollower`] component.
    pub follower: Entity,
    /// Target distance, clamped to the path.
    pub distance: f32,
}
