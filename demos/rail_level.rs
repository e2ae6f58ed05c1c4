//! Rail level example.
//!
//! A camera rig flies along a path while drones and turrets are spawned ahead
//! of it and despawned once passed.
//!
//! Run with: `cargo run --example rail_level`

use bevy::prelude::*;
use bevy_rail_level::prelude::*;

fn main() {
    App::new()
        .add_plugins(DefaultPlugins)
        .add_plugins(RailLevelPlugin)
        .add_plugins(RailDebugPlugin)
        .add_systems(Startup, setup)
        .add_systems(
            Update,
            (handle_input, log_spawner_events, log_level_completion),
        )
        .run();
}

fn build_level() -> LevelSettings {
    let mut path = PathCurve::from_points([
        Vec3::ZERO,
        Vec3::new(0.0, 10.0, -150.0),
        Vec3::new(60.0, 20.0, -300.0),
        Vec3::new(40.0, 0.0, -450.0),
        Vec3::new(-30.0, 5.0, -600.0),
    ]);
    path.set_segment_speed(0, SegmentSpeed::new(25.0, 0.0));
    path.set_segment_speed(1, SegmentSpeed::new(45.0, 1.5));
    path.set_segment_speed(2, SegmentSpeed::new(15.0, 1.0));
    path.set_segment_speed(3, SegmentSpeed::new(35.0, 0.5));

    let mut level = LevelSettings::new("Canyon Run", path);
    level.description = "Drone waves over a winding canyon".to_string();

    level.add_placement(
        EnemyPlacement::new("drone", 120.0)
            .with_offset(Vec3::new(0.0, 4.0, 0.0))
            .with_formation(Formation::new(FormationKind::V, 5, 6.0)),
    );
    level.add_placement(
        EnemyPlacement::new("turret", 200.0)
            .with_offset(Vec3::new(-12.0, -4.0, 0.0))
            .with_scale(2.0),
    );
    level.add_placement(
        EnemyPlacement::new("drone", 280.0)
            .with_formation(Formation::new(FormationKind::Circle, 8, 8.0)),
    );
    level.add_placement(
        EnemyPlacement::new("drone", 380.0)
            .with_offset(Vec3::new(0.0, 6.0, 0.0))
            .with_formation(Formation::new(FormationKind::Line, 4, 5.0)),
    );
    level.add_placement(
        EnemyPlacement::new("turret", 470.0)
            .with_formation(Formation::new(FormationKind::Diamond, 7, 6.0)),
    );

    level
}

fn setup(
    mut commands: Commands,
    mut meshes: ResMut<Assets<Mesh>>,
    mut materials: ResMut<Assets<StandardMaterial>>,
) {
    // Lighting
    commands.spawn(AmbientLight {
        color: Color::WHITE,
        brightness: 300.0,
        affects_lightmapped_meshes: true,
    });

    commands.spawn((
        DirectionalLight {
            illuminance: 10000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_xyz(4.0, 8.0, 4.0).looking_at(Vec3::ZERO, Vec3::Y),
    ));

    // Enemy templates (hidden, cloned on spawn)
    commands.spawn((
        EnemyTemplate::new("drone"),
        Mesh3d(meshes.add(Sphere::new(1.0))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.9, 0.2, 0.2),
            ..default()
        })),
        Transform::default(),
        Visibility::default(),
    ));
    commands.spawn((
        EnemyTemplate::new("turret"),
        Mesh3d(meshes.add(Cuboid::new(1.5, 1.5, 2.5))),
        MeshMaterial3d(materials.add(StandardMaterial {
            base_color: Color::srgb(0.9, 0.7, 0.1),
            ..default()
        })),
        Transform::default(),
        Visibility::default(),
    ));

    // Level path, rig and scheduler
    let level = build_level();
    let entities = spawn_rail_level(&mut commands, &level);

    commands.entity(entities.rig).with_child((
        Camera3d::default(),
        Transform::from_xyz(0.0, 4.0, 14.0).looking_at(Vec3::new(0.0, 0.0, -20.0), Vec3::Y),
    ));

    println!("\n=== Rail Level Example ===");
    println!("Level: {} ({} placements)", level.name, level.placements.len());
    println!();
    println!("Controls:");
    println!("  Space  - Stop/Resume the rig");
    println!("  R      - Restart from the beginning");
    println!("  C      - Restart from the checkpoint (distance 250)");
    println!("  P      - Print the level as RON");
    println!("==========================\n");
}

fn handle_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut followers: Query<&mut PathFollower>,
    levels: Query<Entity, With<RailLevel>>,
    mut restarts: MessageWriter<RestartLevel>,
) {
    // Space to toggle stop
    if keyboard.just_pressed(KeyCode::Space) {
        for mut follower in &mut followers {
            if follower.is_following() {
                follower.stop();
                println!("Stopped");
            } else {
                follower.resume();
                println!("Following");
            }
        }
    }

    let restart_distance = if keyboard.just_pressed(KeyCode::KeyR) {
        Some(0.0)
    } else if keyboard.just_pressed(KeyCode::KeyC) {
        Some(250.0)
    } else {
        None
    };

    if let Some(distance) = restart_distance {
        for level in &levels {
            restarts.write(RestartLevel { level, distance });
        }
        println!("Restarting at {distance}");
    }

    // P to dump the level
    if keyboard.just_pressed(KeyCode::KeyP) {
        match build_level().to_ron_string() {
            Ok(text) => println!("{text}"),
            Err(error) => println!("Failed to write level: {error}"),
        }
    }
}

fn log_spawner_events(
    mut spawned: MessageReader<EnemySpawned>,
    mut despawned: MessageReader<EnemyDespawned>,
    enemies: Query<&PlacedEnemy>,
) {
    for event in spawned.read() {
        let template = enemies
            .get(event.enemy)
            .map(|enemy| enemy.template.as_str())
            .unwrap_or("?");
        println!("Spawned {template} at {:.0}", event.spawn_distance);
    }
    for event in despawned.read() {
        println!("Despawned enemy from {:.0}", event.spawn_distance);
    }
}

fn log_level_completion(mut completed: MessageReader<LevelCompleted>, levels: Query<&RailLevel>) {
    for event in completed.read() {
        let name = levels
            .get(event.level)
            .map(|level| level.name.as_str())
            .unwrap_or("Unknown");
        println!("[{name}] Finished!");
    }
}
