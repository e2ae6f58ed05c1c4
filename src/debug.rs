//! Gizmo previews of paths, followers and enemy placements.

use bevy::prelude::*;

use crate::follower::{FollowerState, PathFollower};
use crate::level::RailLevel;
use crate::path::PathCurve;
use crate::spawner::placement_rotation;

/// Settings for [`RailDebugPlugin`].
#[derive(Resource, Debug, Clone, Reflect)]
#[reflect(Resource)]
pub struct RailDebugSettings {
    /// Whether anything is drawn.
    pub enabled: bool,
    /// Draw Bézier handles of every knot.
    pub show_handles: bool,
    /// Draw every placement's resolved positions.
    pub show_placements: bool,
    /// Line segments per path segment.
    pub curve_resolution: usize,
    /// Radius of knot and placement spheres.
    pub point_radius: f32,
    /// Length of the follower's axis lines.
    pub axis_length: f32,
    /// Color of the path line.
    pub path_color: Color,
    /// Color of knot spheres.
    pub knot_color: Color,
    /// Color of handle lines.
    pub handle_color: Color,
    /// Color of followers and their axes.
    pub follower_color: Color,
    /// Color of placements with a template.
    pub placement_color: Color,
    /// Color of placements without a template.
    pub invalid_placement_color: Color,
}

impl Default for RailDebugSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            show_handles: false,
            show_placements: true,
            curve_resolution: 32,
            point_radius: 0.5,
            axis_length: 4.0,
            path_color: Color::srgb(0.5, 0.5, 0.5),
            knot_color: Color::srgb(0.3, 0.3, 0.8),
            handle_color: Color::srgb(0.6, 0.6, 0.6),
            follower_color: Color::srgb(0.2, 1.0, 0.4),
            placement_color: Color::srgb(1.0, 0.4, 0.2),
            invalid_placement_color: Color::srgb(1.0, 0.0, 1.0),
        }
    }
}

/// Sampled points of a path, refreshed when the path changes.
#[derive(Component, Debug, Clone, Default)]
pub struct PathPreview {
    /// Positions sampled along the path, in order.
    pub points: Vec<Vec3>,
    /// Samples per segment the points were taken with.
    pub resolution: usize,
}

/// Plugin that draws rail levels with gizmos.
pub struct RailDebugPlugin;

impl Plugin for RailDebugPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<RailDebugSettings>()
            .register_type::<RailDebugSettings>()
            .add_systems(
                Update,
                (
                    update_path_previews,
                    (draw_paths, draw_followers, draw_placements),
                )
                    .chain(),
            );
    }
}

fn sample_preview(curve: &PathCurve, resolution: usize) -> Vec<Vec3> {
    if curve.is_valid() {
        curve.sample(resolution)
    } else {
        Vec::new()
    }
}

/// Keep [`PathPreview`] in sync with path edits and the configured resolution.
pub fn update_path_previews(
    mut commands: Commands,
    settings: Res<RailDebugSettings>,
    uncached: Query<(Entity, &PathCurve), Without<PathPreview>>,
    mut cached: Query<(Ref<PathCurve>, &mut PathPreview)>,
) {
    let resolution = settings.curve_resolution;

    for (entity, curve) in &uncached {
        commands.entity(entity).insert(PathPreview {
            points: sample_preview(curve, resolution),
            resolution,
        });
    }

    for (curve, mut preview) in &mut cached {
        if curve.is_changed() || preview.resolution != resolution {
            preview.points = sample_preview(&curve, resolution);
            preview.resolution = resolution;
        }
    }
}

/// Draw each path, its knots and optionally its handles.
pub fn draw_paths(
    settings: Res<RailDebugSettings>,
    paths: Query<(&PathCurve, Option<&PathPreview>)>,
    mut gizmos: Gizmos,
) {
    if !settings.enabled {
        return;
    }

    for (curve, preview) in &paths {
        if !curve.is_valid() {
            continue;
        }

        let fallback;
        let points = match preview {
            Some(preview) => &preview.points,
            None => {
                fallback = curve.sample(settings.curve_resolution);
                &fallback
            }
        };

        for window in points.windows(2) {
            gizmos.line(window[0], window[1], settings.path_color);
        }

        for knot in curve.knots() {
            gizmos.sphere(
                Isometry3d::from_translation(knot.position),
                settings.point_radius,
                settings.knot_color,
            );

            if settings.show_handles {
                gizmos.line(
                    knot.position,
                    knot.position + knot.tangent_in,
                    settings.handle_color,
                );
                gizmos.line(
                    knot.position,
                    knot.position + knot.tangent_out,
                    settings.handle_color,
                );
            }
        }
    }
}

/// Draw each active follower's pose as a sphere with its tangent and up axes.
pub fn draw_followers(
    settings: Res<RailDebugSettings>,
    followers: Query<&PathFollower>,
    paths: Query<&PathCurve>,
    fixed_time: Res<Time<Fixed>>,
    mut gizmos: Gizmos,
) {
    if !settings.enabled {
        return;
    }

    for follower in &followers {
        if follower.state() == FollowerState::Idle {
            continue;
        }
        let Ok(curve) = paths.get(follower.path) else {
            continue;
        };

        let pose = follower.render_state(curve, fixed_time.overstep_fraction());
        let length = settings.axis_length;
        gizmos.sphere(
            Isometry3d::from_translation(pose.position),
            settings.point_radius * 2.0,
            settings.follower_color,
        );
        gizmos.arrow(
            pose.position,
            pose.position + pose.tangent * length,
            settings.follower_color,
        );
        gizmos.line(
            pose.position,
            pose.position + pose.up * length * 0.5,
            settings.knot_color,
        );
    }
}

/// Draw every placement of every level where it will spawn.
pub fn draw_placements(
    settings: Res<RailDebugSettings>,
    levels: Query<&RailLevel>,
    paths: Query<&PathCurve>,
    mut gizmos: Gizmos,
) {
    if !settings.enabled || !settings.show_placements {
        return;
    }

    for level in &levels {
        let Ok(curve) = paths.get(level.path) else {
            continue;
        };

        for placement in &level.placements {
            let color = if placement.template_name().is_some() {
                settings.placement_color
            } else {
                settings.invalid_placement_color
            };
            let anchor = curve.position_at(placement.distance);
            let rotation = placement_rotation(curve, placement.distance);

            for position in placement.world_positions(curve) {
                gizmos.sphere(
                    Isometry3d::new(position, rotation),
                    settings.point_radius * placement.scale,
                    color,
                );
                gizmos.line(anchor, position, color.with_alpha(0.4));
            }
        }
    }
}
