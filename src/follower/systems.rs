use bevy::prelude::*;

use crate::path::PathCurve;

use super::{DistanceChanged, FollowerState, FollowerTick, PathCompleted, PathFollower, SeekFollower};

/// Initialize newly added followers against their path.
///
/// Followers left [`FollowerState::Idle`] by a missing or invalid path are
/// retried every step, and start as soon as their path becomes valid.
pub fn initialize_path_followers(
    mut followers: Query<(Entity, &mut PathFollower)>,
    paths: Query<&PathCurve>,
) {
    for (entity, mut follower) in &mut followers {
        let added = follower.is_added();
        if !added && follower.state() != FollowerState::Idle {
            continue;
        }

        let Ok(curve) = paths.get(follower.path) else {
            if added {
                warn!("Path follower {entity} references missing path {}", follower.path);
            }
            continue;
        };

        if !curve.is_valid() {
            if added {
                warn!(
                    "Path follower {entity} has an invalid path ({} knots, need at least 2)",
                    curve.knot_count()
                );
            }
            continue;
        }

        let start = follower.start_distance;
        follower.initialize(curve, start);
        debug!(
            "Path follower {entity} starting at {:.1} of {:.1}",
            follower.current_distance(),
            curve.total_length()
        );
    }
}

/// Apply seek requests before the next step is simulated.
pub fn handle_seek_requests(
    mut requests: MessageReader<SeekFollower>,
    mut followers: Query<&mut PathFollower>,
    paths: Query<&PathCurve>,
) {
    for request in requests.read() {
        let Ok(mut follower) = followers.get_mut(request.follower) else {
            continue;
        };
        let Ok(curve) = paths.get(follower.path) else {
            continue;
        };

        follower.set_distance(curve, request.distance);
        debug!(
            "Path follower {} seeked to {:.1}",
            request.follower,
            follower.current_distance()
        );
    }
}

/// Fixed-step system that advances every following follower.
///
/// Runs in `FixedUpdate`, where `Res<Time>` is the fixed clock.
pub fn advance_path_followers(
    mut followers: Query<(Entity, &mut PathFollower)>,
    paths: Query<&PathCurve>,
    time: Res<Time>,
    mut distance_events: MessageWriter<DistanceChanged>,
    mut completed_events: MessageWriter<PathCompleted>,
) {
    let delta = time.delta_secs();

    for (entity, mut follower) in &mut followers {
        if !follower.is_following() {
            continue;
        }

        let Ok(curve) = paths.get(follower.path) else {
            continue;
        };

        match follower.tick(curve, delta) {
            FollowerTick::Skipped => {}
            FollowerTick::Advanced => {
                distance_events.write(DistanceChanged {
                    follower: entity,
                    distance: follower.current_distance(),
                });
            }
            FollowerTick::Completed => {
                distance_events.write(DistanceChanged {
                    follower: entity,
                    distance: follower.current_distance(),
                });
                completed_events.write(PathCompleted { follower: entity });
                info!(
                    "Path follower {entity} completed its path ({:.1} units)",
                    follower.current_distance()
                );
            }
        }
    }
}

/// Write the interpolated pose of each follower to its transform.
///
/// Runs every rendered frame; the interpolation factor is how far the
/// fixed clock has run into the next (not yet simulated) step.
pub fn apply_follower_transforms(
    mut followers: Query<(&PathFollower, &mut Transform)>,
    paths: Query<&PathCurve>,
    fixed_time: Res<Time<Fixed>>,
) {
    let interpolation = fixed_time.overstep_fraction();

    for (follower, mut transform) in &mut followers {
        if follower.state() == FollowerState::Idle {
            continue;
        }

        let Ok(curve) = paths.get(follower.path) else {
            continue;
        };

        let pose = follower.render_state(curve, interpolation);
        transform.translation = pose.position;
        if follower.align_to_path {
            transform.rotation = pose.rotation();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bevy::ecs::message::Messages;
    use bevy::ecs::system::RunSystemOnce;

    use super::*;
    use crate::path::SegmentSpeed;

    fn world_with_path(length: f32, speed: f32) -> (World, Entity, Entity) {
        let mut world = World::new();
        world.init_resource::<Messages<DistanceChanged>>();
        world.init_resource::<Messages<PathCompleted>>();
        world.init_resource::<Messages<SeekFollower>>();
        world.insert_resource(Time::<()>::default());

        let mut curve = PathCurve::from_points([Vec3::ZERO, Vec3::new(0.0, 0.0, -length)]);
        curve.set_segment_speed(0, SegmentSpeed::constant(speed));
        let path = world.spawn(curve).id();
        let follower = world.spawn(PathFollower::new(path)).id();

        (world, path, follower)
    }

    fn step(world: &mut World, seconds: f32) {
        world
            .resource_mut::<Time>()
            .advance_by(Duration::from_secs_f32(seconds));
        world
            .run_system_once(advance_path_followers)
            .expect("advance system runs");
    }

    #[test]
    fn test_followers_advance_and_complete_once() {
        let (mut world, _, follower) = world_with_path(12.0, 5.0);
        world
            .run_system_once(initialize_path_followers)
            .expect("initialize system runs");

        for _ in 0..5 {
            step(&mut world, 1.0);
        }

        let state = world.get::<PathFollower>(follower).expect("follower exists");
        assert!(state.is_completed());

        let completed: Vec<_> = world
            .resource_mut::<Messages<PathCompleted>>()
            .drain()
            .collect();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].follower, follower);

        let distances: Vec<_> = world
            .resource_mut::<Messages<DistanceChanged>>()
            .drain()
            .map(|event| event.distance)
            .collect();
        // 5, 10, then clamped to the end
        assert_eq!(distances.len(), 3);
        assert!((distances[0] - 5.0).abs() < 0.01);
        assert!((distances[2] - 12.0).abs() < 0.01);
    }

    #[test]
    fn test_seek_requests_move_follower() {
        let (mut world, _, follower) = world_with_path(100.0, 5.0);
        world
            .run_system_once(initialize_path_followers)
            .expect("initialize system runs");

        world
            .resource_mut::<Messages<SeekFollower>>()
            .write(SeekFollower {
                follower,
                distance: 40.0,
            });
        world
            .run_system_once(handle_seek_requests)
            .expect("seek system runs");

        let state = world.get::<PathFollower>(follower).expect("follower exists");
        assert_eq!(state.current_distance(), 40.0);
        assert_eq!(state.previous_distance(), 40.0);
    }

    #[test]
    fn test_idle_follower_starts_once_path_is_valid() {
        let mut world = World::new();
        let path = world.spawn(PathCurve::from_points([Vec3::ZERO])).id();
        let follower = world.spawn(PathFollower::new(path)).id();

        world
            .run_system_once(initialize_path_followers)
            .expect("initialize system runs");
        let state = world.get::<PathFollower>(follower).expect("follower exists");
        assert_eq!(state.state(), FollowerState::Idle);

        world
            .get_mut::<PathCurve>(path)
            .expect("path exists")
            .add_knot(Vec3::new(0.0, 0.0, -20.0));
        world
            .run_system_once(initialize_path_followers)
            .expect("initialize system runs");
        let state = world.get::<PathFollower>(follower).expect("follower exists");
        assert!(state.is_following());
    }
}
