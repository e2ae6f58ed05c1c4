use bevy::prelude::*;

/// Marks an entity as a named enemy template.
///
/// Templates are hidden when added. Spawned enemies copy the template's
/// mesh, material and scene, and multiply its scale by the placement scale.
#[derive(Component, Debug, Clone, Default, Reflect)]
#[reflect(Component, Default)]
pub struct EnemyTemplate {
    /// Name placements refer to.
    pub name: String,
}

impl EnemyTemplate {
    /// Create a template with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Added to every enemy a [`SpawnScheduler`](super::SpawnScheduler) spawns.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct PlacedEnemy {
    /// The scheduler entity that owns this enemy.
    pub scheduler: Entity,
    /// Template the enemy was cloned from.
    pub template: String,
    /// Travel distance of the placement.
    pub spawn_distance: f32,
    /// Formation member index.
    pub member: usize,
}

/// Written when a scheduler spawns an enemy.
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub struct EnemySpawned {
    /// The scheduler entity.
    pub scheduler: Entity,
    /// The new enemy.
    pub enemy: Entity,
    /// Travel distance of the placement.
    pub spawn_distance: f32,
}

/// Written when a scheduler despawns an enemy that fell behind, or on teardown.
#[derive(Message, Debug, Clone, Copy, PartialEq)]
pub struct EnemyDespawned {
    /// The scheduler entity.
    pub scheduler: Entity,
    /// The despawned enemy.
    pub enemy: Entity,
    /// Travel distance of the placement.
    pub spawn_distance: f32,
}
