use std::collections::VecDeque;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::path::PathCurve;

use super::placement::{placement_rotation, placement_world_position, EnemyPlacement};

/// Lookahead and lookbehind margins around the follower's travel distance.
#[derive(Debug, Clone, Copy, PartialEq, Reflect, Serialize, Deserialize)]
#[reflect(Default)]
#[serde(default)]
pub struct SpawnWindow {
    /// Placements within this distance ahead of the follower are spawned.
    pub ahead: f32,
    /// Spawned enemies further than this behind the follower are despawned.
    pub behind: f32,
}

impl Default for SpawnWindow {
    fn default() -> Self {
        Self {
            ahead: 100.0,
            behind: 50.0,
        }
    }
}

impl SpawnWindow {
    /// Create a window, clamping both margins to be non-negative.
    pub fn new(ahead: f32, behind: f32) -> Self {
        Self {
            ahead: ahead.max(0.0),
            behind: behind.max(0.0),
        }
    }
}

/// A live enemy created by the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Reflect)]
pub struct SpawnRecord {
    /// The spawned entity.
    pub entity: Entity,
    /// Distance of the placement that produced it; the despawn key.
    pub spawn_distance: f32,
}

/// One enemy to instantiate, handed to an [`EnemyLifecycle`].
#[derive(Debug, Clone, Copy)]
pub struct SpawnRequest<'a> {
    /// Template name of the placement.
    pub template: &'a str,
    /// Distance of the placement.
    pub spawn_distance: f32,
    /// Formation member index (0 for a single enemy).
    pub member: usize,
    /// Resolved world transform. Scale is the placement's multiplier.
    pub transform: Transform,
}

/// Creates and destroys the entities a [`SpawnScheduler`] asks for.
pub trait EnemyLifecycle {
    /// Instantiate an enemy, or return `None` if the template is unknown.
    fn spawn(&mut self, request: &SpawnRequest) -> Option<Entity>;

    /// Destroy a previously spawned enemy.
    fn despawn(&mut self, entity: Entity);
}

/// What a single [`SpawnScheduler::tick`] did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScheduleReport {
    /// Records created this tick, in spawn order.
    pub spawned: Vec<SpawnRecord>,
    /// Records destroyed this tick.
    pub despawned: Vec<SpawnRecord>,
    /// Placements dropped because their template was missing or unknown.
    pub skipped: usize,
}

impl ScheduleReport {
    /// Whether the tick changed nothing.
    pub fn is_empty(&self) -> bool {
        self.spawned.is_empty() && self.despawned.is_empty() && self.skipped == 0
    }
}

/// Component that spawns placements as the follower approaches them and
/// despawns them once they fall behind.
///
/// The scheduler works from its own sorted copy of the placements, so the
/// authored list is never consumed.
#[derive(Component, Debug, Clone, Default, Reflect)]
#[reflect(Component, Default)]
pub struct SpawnScheduler {
    /// Spawn/despawn margins.
    pub window: SpawnWindow,

    #[reflect(ignore)]
    pending: VecDeque<EnemyPlacement>,
    #[reflect(ignore)]
    active: Vec<SpawnRecord>,
    running: bool,
}

impl SpawnScheduler {
    /// Create a scheduler holding a sorted copy of `placements`.
    pub fn new(placements: &[EnemyPlacement]) -> Self {
        Self {
            pending: sorted_copy(placements),
            running: true,
            ..default()
        }
    }

    /// Set the spawn window.
    pub fn with_window(mut self, window: SpawnWindow) -> Self {
        self.window = window;
        self
    }

    /// Destroy any live records, then load a fresh sorted copy of `placements`.
    pub fn initialize(
        &mut self,
        placements: &[EnemyPlacement],
        lifecycle: &mut impl EnemyLifecycle,
    ) -> Vec<SpawnRecord> {
        let destroyed = self.destroy_active(lifecycle);
        self.pending = sorted_copy(placements);
        self.running = true;
        destroyed
    }

    /// Run one spawn pass and one despawn pass at `distance`.
    ///
    /// Spawning pops placements in distance order while the head is within
    /// `window.ahead`. Despawning removes every record whose placement
    /// distance is strictly more than `window.behind` behind `distance`.
    pub fn tick(
        &mut self,
        curve: &PathCurve,
        distance: f32,
        lifecycle: &mut impl EnemyLifecycle,
    ) -> ScheduleReport {
        let mut report = ScheduleReport::default();
        if !self.running {
            return report;
        }

        let spawn_limit = distance + self.window.ahead;
        while self
            .pending
            .front()
            .is_some_and(|placement| placement.distance <= spawn_limit)
        {
            let Some(placement) = self.pending.pop_front() else {
                break;
            };
            self.materialize(curve, &placement, lifecycle, &mut report);
        }

        let despawn_limit = distance - self.window.behind;
        self.active.retain(|record| {
            if record.spawn_distance < despawn_limit {
                lifecycle.despawn(record.entity);
                report.despawned.push(*record);
                false
            } else {
                true
            }
        });

        report
    }

    fn materialize(
        &mut self,
        curve: &PathCurve,
        placement: &EnemyPlacement,
        lifecycle: &mut impl EnemyLifecycle,
        report: &mut ScheduleReport,
    ) {
        let Some(template) = placement.template_name() else {
            warn!(
                "Skipping placement at {:.1}: no enemy template assigned",
                placement.distance
            );
            report.skipped += 1;
            return;
        };

        let rotation = placement_rotation(curve, placement.distance);
        let scale = Vec3::splat(placement.scale);

        for (member, offset) in placement.formation.offsets().into_iter().enumerate() {
            let translation =
                placement_world_position(curve, placement.distance, placement.offset + offset);
            let request = SpawnRequest {
                template,
                spawn_distance: placement.distance,
                member,
                transform: Transform {
                    translation,
                    rotation,
                    scale,
                },
            };

            let Some(entity) = lifecycle.spawn(&request) else {
                warn!(
                    "Skipping placement at {:.1}: unknown enemy template '{template}'",
                    placement.distance
                );
                report.skipped += 1;
                return;
            };

            let record = SpawnRecord {
                entity,
                spawn_distance: placement.distance,
            };
            self.active.push(record);
            report.spawned.push(record);
        }
    }

    /// Destroy every live record and drop all pending placements.
    ///
    /// Safe to call repeatedly; later ticks do nothing until re-initialized.
    pub fn teardown(&mut self, lifecycle: &mut impl EnemyLifecycle) -> Vec<SpawnRecord> {
        self.pending.clear();
        self.running = false;
        self.destroy_active(lifecycle)
    }

    fn destroy_active(&mut self, lifecycle: &mut impl EnemyLifecycle) -> Vec<SpawnRecord> {
        let destroyed: Vec<SpawnRecord> = self.active.drain(..).collect();
        for record in &destroyed {
            lifecycle.despawn(record.entity);
        }
        destroyed
    }

    /// Whether the next pending placement is within the spawn window of `distance`.
    pub fn has_due(&self, distance: f32) -> bool {
        self.pending
            .front()
            .is_some_and(|placement| placement.distance <= distance + self.window.ahead)
    }

    /// Whether a tick at `distance` would spawn or despawn anything.
    pub fn needs_tick(&self, distance: f32) -> bool {
        self.running
            && (self.has_due(distance)
                || self
                    .active
                    .iter()
                    .any(|record| record.spawn_distance < distance - self.window.behind))
    }

    /// Live spawn records.
    pub fn active(&self) -> &[SpawnRecord] {
        &self.active
    }

    /// Placements not spawned yet, in spawn order.
    pub fn pending(&self) -> impl Iterator<Item = &EnemyPlacement> {
        self.pending.iter()
    }

    /// Number of placements not spawned yet.
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Whether the scheduler is accepting ticks.
    pub fn is_running(&self) -> bool {
        self.running
    }
}

/// Stable sort by distance, so ties keep their authored order.
fn sorted_copy(placements: &[EnemyPlacement]) -> VecDeque<EnemyPlacement> {
    let mut sorted = placements.to_vec();
    sorted.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    sorted.into()
}
