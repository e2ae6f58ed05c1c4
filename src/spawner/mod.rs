//! Predictive enemy spawning along a path.
//!
//! A [`SpawnScheduler`] sits on the same entity as a
//! [`PathFollower`](crate::follower::PathFollower). Every fixed step, after the
//! follower has advanced, placements that come within
//! [`SpawnWindow::ahead`] are spawned from their [`EnemyTemplate`] and
//! enemies that fall more than [`SpawnWindow::behind`] back are despawned.
//!
//! # Usage
//!
//! ```ignore
//! use bevy::prelude::*;
//! use bevy_rail_level::prelude::*;
//!
//! fn setup(mut commands: Commands, mut meshes: ResMut<Assets<Mesh>>) {
//!     // Template entity (hidden automatically)
//!     commands.spawn((
//!         EnemyTemplate::new("drone"),
//!         Mesh3d(meshes.add(Sphere::new(1.0))),
//!         Transform::default(),
//!     ));
//!
//!     let path = commands.spawn(PathCurve::from_points([
//!         Vec3::ZERO,
//!         Vec3::new(0.0, 0.0, -500.0),
//!     ])).id();
//!
//!     commands.spawn((
//!         Transform::default(),
//!         PathFollower::new(path),
//!         SpawnScheduler::new(&[
//!             EnemyPlacement::new("drone", 120.0)
//!                 .with_offset(Vec3::new(0.0, 4.0, 0.0))
//!                 .with_formation(Formation::new(FormationKind::V, 5, 6.0)),
//!         ]),
//!     ));
//! }
//! ```
//!
//! Spawning goes through the [`EnemyLifecycle`] trait, so the scheduler can
//! also be driven outside the ECS.

mod components;
mod formation;
mod placement;
mod scheduler;
mod systems;

pub use components::*;
pub use formation::{
    formation_offsets, Formation, FormationKind, MAX_FORMATION_COUNT, MIN_FORMATION_COUNT,
    MIN_FORMATION_SPACING,
};
pub use placement::{
    placement_rotation, placement_world_position, EnemyPlacement, MIN_PLACEMENT_SCALE,
};
pub use scheduler::{
    EnemyLifecycle, ScheduleReport, SpawnRecord, SpawnRequest, SpawnScheduler, SpawnWindow,
};
pub use systems::{cleanup_removed_schedulers, hide_enemy_templates, run_spawn_schedulers};

pub(crate) use systems::{teardown_scheduler, write_despawned};

use bevy::prelude::*;

use crate::follower::PathFollowerPlugin;
use crate::RailSystems;

/// Plugin that runs [`SpawnScheduler`]s against their followers.
pub struct EnemySpawnerPlugin;

impl Plugin for EnemySpawnerPlugin {
    fn build(&self, app: &mut App) {
        if !app.is_plugin_added::<PathFollowerPlugin>() {
            app.add_plugins(PathFollowerPlugin);
        }

        app.register_type::<SpawnScheduler>()
            .register_type::<SpawnWindow>()
            .register_type::<EnemyPlacement>()
            .register_type::<Formation>()
            .register_type::<FormationKind>()
            .register_type::<EnemyTemplate>()
            .register_type::<PlacedEnemy>()
            .add_message::<EnemySpawned>()
            .add_message::<EnemyDespawned>()
            .add_systems(
                FixedUpdate,
                systems::run_spawn_schedulers.in_set(RailSystems::Schedule),
            )
            .add_systems(
                Update,
                (
                    systems::hide_enemy_templates,
                    systems::cleanup_removed_schedulers,
                ),
            );
    }
}
