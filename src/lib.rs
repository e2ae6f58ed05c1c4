//! # bevy_rail_level
//!
//! A Bevy plugin for rail-shooter levels.
//!
//! ## Features
//!
//! - Paths addressed by travel distance, with per-segment speeds and eased transitions
//! - Fixed-step path following with interpolated rendering
//! - Predictive enemy spawning in a sliding window, with formations
//! - Level data in RON, restarts from any distance
//! - Gizmo previews of paths, followers and placements
//!
//! ## Quick Start
//!
//! ```ignore
//! use bevy::prelude::*;
//! use bevy_rail_level::prelude::*;
//!
//! fn main() {
//!     App::new()
//!         .add_plugins(DefaultPlugins)
//!         .add_plugins(RailLevelPlugin)
//!         .add_plugins(RailDebugPlugin) // Optional: gizmo previews
//!         .add_systems(Startup, setup)
//!         .run();
//! }
//!
//! fn setup(mut commands: Commands) {
//!     let mut level = LevelSettings::new(
//!         "Canyon Run",
//!         PathCurve::from_points([
//!             Vec3::ZERO,
//!             Vec3::new(0.0, 10.0, -200.0),
//!             Vec3::new(60.0, 0.0, -400.0),
//!         ]),
//!     );
//!     level.add_placement(EnemyPlacement::new("drone", 150.0));
//!
//!     let entities = spawn_rail_level(&mut commands, &level);
//!     commands.entity(entities.rig).with_child((
//!         Camera3d::default(),
//!         Transform::from_xyz(0.0, 3.0, 10.0),
//!     ));
//! }
//! ```
//!
//! ## Plugins
//!
//! - [`PathPlugin`]: Path type registration (required, added by the others)
//! - [`PathFollowerPlugin`]: Fixed-step path following
//! - [`EnemySpawnerPlugin`]: Spawn schedulers driven by followers
//! - [`RailLevelPlugin`]: Level restarts and completion, adds all of the above
//! - [`RailDebugPlugin`]: Gizmo previews (optional, `debug` feature)
//!
//! ## Scheduling
//!
//! Simulation runs in `FixedUpdate`, ordered by [`RailSystems`]: requests are
//! applied, followers advance, then schedulers spawn and despawn against the
//! new distances. Transforms are interpolated in `Update`.

pub mod error;
pub mod follower;
pub mod geometry;
pub mod level;
pub mod path;
pub mod spawner;

#[cfg(feature = "debug")]
pub mod debug;

pub use error::LevelError;
pub use follower::PathFollowerPlugin;
pub use level::RailLevelPlugin;
pub use path::PathPlugin;
pub use spawner::EnemySpawnerPlugin;

#[cfg(feature = "debug")]
pub use debug::RailDebugPlugin;

use bevy::prelude::*;

/// Ordering of the fixed-step systems.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RailSystems {
    /// Initialization, seeks and restarts.
    Control,
    /// Followers integrate distance.
    Advance,
    /// Schedulers spawn and despawn against the advanced distance.
    Schedule,
}

/// Convenient re-exports of commonly used types.
pub mod prelude {
    pub use crate::error::LevelError;
    pub use crate::follower::{
        DistanceChanged, FollowerState, PathCompleted, PathFollower, PathFollowerPlugin,
        SeekFollower,
    };
    pub use crate::geometry::PathFrame;
    pub use crate::level::{
        spawn_rail_level, LevelCompleted, LevelEntities, LevelSettings, RailLevel,
        RailLevelPlugin, RestartLevel,
    };
    pub use crate::path::{BezierKnot, PathCurve, PathPlugin, PathPose, SegmentSpeed};
    pub use crate::spawner::{
        EnemyDespawned, EnemyLifecycle, EnemyPlacement, EnemySpawned, EnemySpawnerPlugin,
        EnemyTemplate, Formation, FormationKind, PlacedEnemy, SpawnScheduler, SpawnWindow,
    };
    pub use crate::RailSystems;

    #[cfg(feature = "debug")]
    pub use crate::debug::{RailDebugPlugin, RailDebugSettings};
}
