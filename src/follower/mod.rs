//! Fixed-step path following.
//!
//! A [`PathFollower`] integrates travel distance along a [`PathCurve`] in
//! `FixedUpdate` and writes an interpolated [`Transform`] every frame, so the
//! entity moves smoothly whatever the display rate.
//!
//! # Example
//!
//! ```rust,ignore
//! use bevy::prelude::*;
//! use bevy_rail_level::prelude::*;
//!
//! fn setup(mut commands: Commands) {
//!     let path = commands
//!         .spawn(PathCurve::from_points([
//!             Vec3::ZERO,
//!             Vec3::new(0.0, 10.0, -200.0),
//!             Vec3::new(50.0, 0.0, -400.0),
//!         ]))
//!         .id();
//!
//!     commands.spawn((
//!         Transform::default(),
//!         PathFollower::new(path).with_speed_multiplier(1.5),
//!     ));
//! }
//! ```
//!
//! [`PathCurve`]: crate::path::PathCurve

mod components;
mod systems;

pub use components::*;
pub use systems::{
    advance_path_followers, apply_follower_transforms, handle_seek_requests,
    initialize_path_followers,
};

use bevy::prelude::*;

use crate::path::PathPlugin;
use crate::RailSystems;

/// Plugin that moves [`PathFollower`] entities along their paths.
pub struct PathFollowerPlugin;

impl Plugin for PathFollowerPlugin {
    fn build(&self, app: &mut App) {
        if !app.is_plugin_added::<PathPlugin>() {
            app.add_plugins(PathPlugin);
        }

        app.register_type::<PathFollower>()
            .register_type::<FollowerState>()
            .add_message::<DistanceChanged>()
            .add_message::<PathCompleted>()
            .add_message::<SeekFollower>()
            .configure_sets(
                FixedUpdate,
                (RailSystems::Control, RailSystems::Advance, RailSystems::Schedule).chain(),
            )
            .add_systems(
                FixedUpdate,
                (
                    (systems::initialize_path_followers, systems::handle_seek_requests)
                        .chain()
                        .in_set(RailSystems::Control),
                    systems::advance_path_followers.in_set(RailSystems::Advance),
                ),
            )
            .add_systems(Update, systems::apply_follower_transforms);
    }
}
