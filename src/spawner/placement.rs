use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::path::PathCurve;

use super::formation::Formation;

/// Smallest scale multiplier a placement can carry.
pub const MIN_PLACEMENT_SCALE: f32 = 0.1;

/// An authored intent to spawn an enemy (or a formation of them) at a
/// travel distance along the level path.
#[derive(Debug, Clone, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Default)]
#[serde(default)]
pub struct EnemyPlacement {
    /// Name of the [`EnemyTemplate`](super::EnemyTemplate) to instantiate.
    pub template: Option<String>,
    /// Travel distance at which the enemy is placed.
    pub distance: f32,
    /// Offset in path-local axes: X lateral, Y vertical, Z forward.
    pub offset: Vec3,
    /// Multiplier applied to the template's scale.
    pub scale: f32,
    /// Optional formation expanding this placement into several enemies.
    pub formation: Formation,
}

impl Default for EnemyPlacement {
    fn default() -> Self {
        Self {
            template: None,
            distance: 0.0,
            offset: Vec3::ZERO,
            scale: 1.0,
            formation: Formation::default(),
        }
    }
}

impl EnemyPlacement {
    /// Create a placement of a template at a travel distance.
    pub fn new(template: impl Into<String>, distance: f32) -> Self {
        Self {
            template: Some(template.into()),
            distance: distance.max(0.0),
            ..default()
        }
    }

    /// Set the path-local offset.
    pub fn with_offset(mut self, offset: Vec3) -> Self {
        self.offset = offset;
        self
    }

    /// Set the scale multiplier.
    pub fn with_scale(mut self, scale: f32) -> Self {
        self.scale = scale.max(MIN_PLACEMENT_SCALE);
        self
    }

    /// Spawn as a formation.
    pub fn with_formation(mut self, formation: Formation) -> Self {
        self.formation = formation;
        self
    }

    /// Clamp distance, scale and formation into their valid ranges.
    ///
    /// Builders clamp as they go; this repairs placements read from level
    /// files.
    pub fn normalize(&mut self) {
        self.distance = self.distance.max(0.0);
        self.scale = self.scale.max(MIN_PLACEMENT_SCALE);
        self.formation = self.formation.clamped();
    }

    /// The template name, if one is assigned.
    pub fn template_name(&self) -> Option<&str> {
        self.template.as_deref().filter(|name| !name.is_empty())
    }

    /// World positions of every member, as previewed or spawned.
    pub fn world_positions(&self, curve: &PathCurve) -> Vec<Vec3> {
        self.formation
            .offsets()
            .into_iter()
            .map(|member| placement_world_position(curve, self.distance, self.offset + member))
            .collect()
    }
}

/// Resolve a path-local offset at a travel distance to a world position.
pub fn placement_world_position(curve: &PathCurve, distance: f32, offset: Vec3) -> Vec3 {
    curve
        .frame_at(distance)
        .transform_point(curve.position_at(distance), offset)
}

/// Orientation for a spawned enemy: facing back down the path toward the
/// oncoming follower, upright along the path's up vector.
pub fn placement_rotation(curve: &PathCurve, distance: f32) -> Quat {
    curve.frame_at(distance).facing_rotation()
}
