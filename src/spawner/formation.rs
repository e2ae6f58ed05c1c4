use std::f32::consts::TAU;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

/// Smallest number of members in a formation.
pub const MIN_FORMATION_COUNT: usize = 2;
/// Largest number of members in a formation.
pub const MAX_FORMATION_COUNT: usize = 10;
/// Smallest distance between formation members.
pub const MIN_FORMATION_SPACING: f32 = 1.0;

/// Geometric pattern that expands one placement into several enemies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Reflect, Serialize, Deserialize)]
#[reflect(Default)]
pub enum FormationKind {
    /// A single enemy at the placement point.
    #[default]
    None,
    /// A centered row across the path.
    Line,
    /// A leader at the apex with wings trailing back along the path.
    V,
    /// A center member with the four cardinal points around it, then a wider ring.
    Diamond,
    /// Members evenly spaced on a ring in the lateral/forward plane.
    Circle,
}

/// Formation settings of a placement.
#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Default)]
#[serde(default)]
pub struct Formation {
    /// The pattern to use.
    pub kind: FormationKind,
    /// Number of members, in [2, 10]. Ignored for [`FormationKind::None`].
    pub count: usize,
    /// Distance between members.
    pub spacing: f32,
}

impl Default for Formation {
    fn default() -> Self {
        Self {
            kind: FormationKind::None,
            count: 3,
            spacing: 5.0,
        }
    }
}

impl Formation {
    /// Create a formation, clamping count and spacing to the valid range.
    pub fn new(kind: FormationKind, count: usize, spacing: f32) -> Self {
        Self {
            kind,
            count: count.clamp(MIN_FORMATION_COUNT, MAX_FORMATION_COUNT),
            spacing: spacing.max(MIN_FORMATION_SPACING),
        }
    }

    /// Re-apply the clamps of [`new`](Self::new), e.g. after deserializing.
    pub fn clamped(self) -> Self {
        Self::new(self.kind, self.count, self.spacing)
    }

    /// No formation: one enemy at the placement point.
    pub fn single() -> Self {
        Self::default()
    }

    /// Number of enemies this formation spawns.
    pub fn member_count(&self) -> usize {
        match self.kind {
            FormationKind::None => 1,
            _ => self.count,
        }
    }

    /// Path-local offsets of every member.
    pub fn offsets(&self) -> Vec<Vec3> {
        formation_offsets(self.kind, self.count, self.spacing)
    }
}

/// Path-local member offsets for a formation (x lateral, y vertical, z forward).
pub fn formation_offsets(kind: FormationKind, count: usize, spacing: f32) -> Vec<Vec3> {
    match kind {
        FormationKind::None => vec![Vec3::ZERO],
        FormationKind::Line => {
            let start = -((count as f32 - 1.0) * spacing * 0.5);
            (0..count)
                .map(|i| Vec3::new(start + i as f32 * spacing, 0.0, 0.0))
                .collect()
        }
        FormationKind::V => {
            let mut offsets = Vec::with_capacity(count);
            offsets.push(Vec3::ZERO);
            for i in 1..count {
                let side = if i % 2 == 1 { 1.0 } else { -1.0 };
                let row = i.div_ceil(2) as f32;
                offsets.push(Vec3::new(side * row * spacing, 0.0, -row * spacing));
            }
            offsets
        }
        FormationKind::Diamond => {
            let cardinals = [
                Vec3::ZERO,
                Vec3::new(spacing, 0.0, 0.0),
                Vec3::new(-spacing, 0.0, 0.0),
                Vec3::new(0.0, 0.0, spacing),
                Vec3::new(0.0, 0.0, -spacing),
            ];
            let mut offsets: Vec<Vec3> = cardinals.into_iter().take(count).collect();
            // Members past the diamond go on a ring at twice the spacing
            for i in 5..count {
                let angle = (i - 5) as f32 * TAU / (count - 4) as f32;
                offsets.push(Vec3::new(
                    angle.cos() * spacing * 2.0,
                    0.0,
                    angle.sin() * spacing * 2.0,
                ));
            }
            offsets
        }
        FormationKind::Circle => (0..count)
            .map(|i| {
                let angle = i as f32 * TAU / count as f32;
                Vec3::new(angle.cos() * spacing, 0.0, angle.sin() * spacing)
            })
            .collect(),
    }
}
