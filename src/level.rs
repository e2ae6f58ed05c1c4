//! Level data and the entities that run it.
//!
//! [`LevelSettings`] is the authored level: a path, its enemy placements and
//! a few playback settings, stored as RON. [`spawn_rail_level`] turns it into
//! a path entity, a rig entity (follower and scheduler), and a level entity
//! carrying [`RailLevel`], which keeps the ids and the placement list for
//! restarts.
//!
//! ```ignore
//! use bevy::prelude::*;
//! use bevy_rail_level::prelude::*;
//!
//! fn load(mut commands: Commands) {
//!     let settings = LevelSettings::from_ron_str(include_str!("level.ron"))
//!         .expect("valid level file");
//!     let entities = spawn_rail_level(&mut commands, &settings);
//!     commands.entity(entities.rig).insert(Camera3d::default());
//! }
//!
//! fn restart(mut restarts: MessageWriter<RestartLevel>, levels: Query<Entity, With<RailLevel>>) {
//!     for level in &levels {
//!         restarts.write(RestartLevel { level, distance: 0.0 });
//!     }
//! }
//! ```

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{LevelError, Result};
use crate::follower::{initialize_path_followers, PathCompleted, PathFollower};
use crate::path::PathCurve;
use crate::spawner::{
    teardown_scheduler, write_despawned, EnemyDespawned, EnemyPlacement, EnemySpawnerPlugin,
    SpawnScheduler, SpawnWindow,
};
use crate::RailSystems;

/// An authored rail level.
#[derive(Debug, Clone, Reflect, Serialize, Deserialize)]
#[reflect(Default)]
#[serde(default)]
pub struct LevelSettings {
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// The path the rig travels.
    pub path: PathCurve,
    /// Enemy placements, kept sorted by distance.
    pub placements: Vec<EnemyPlacement>,
    /// Distance the rig starts from.
    pub start_distance: f32,
    /// Multiplier applied to every segment speed.
    pub speed_multiplier: f32,
    /// Spawn and despawn margins.
    pub spawn_window: SpawnWindow,
}

impl Default for LevelSettings {
    fn default() -> Self {
        Self {
            name: "New Level".to_string(),
            description: String::new(),
            path: PathCurve::default(),
            placements: Vec::new(),
            start_distance: 0.0,
            speed_multiplier: 1.0,
            spawn_window: SpawnWindow::default(),
        }
    }
}

impl LevelSettings {
    /// Create a level with a name and a path.
    pub fn new(name: impl Into<String>, path: PathCurve) -> Self {
        Self {
            name: name.into(),
            path,
            ..default()
        }
    }

    /// Parse a level from RON.
    ///
    /// The parsed level is [normalized](Self::normalize).
    pub fn from_ron_str(source: &str) -> Result<Self> {
        let mut settings: Self = ron::from_str(source)?;
        settings.normalize();
        Ok(settings)
    }

    /// Clamp every value into its valid range and sort the placements.
    ///
    /// Segment settings are padded to match the knots. Out-of-range
    /// speeds, formations, scales and distances are clamped the same way
    /// the builders clamp them.
    pub fn normalize(&mut self) {
        self.path.sync_segments();
        for placement in &mut self.placements {
            placement.normalize();
        }
        self.start_distance = self.start_distance.max(0.0);
        self.speed_multiplier = self.speed_multiplier.max(0.0);
        self.spawn_window = SpawnWindow::new(self.spawn_window.ahead, self.spawn_window.behind);
        self.sort_placements();
    }

    /// Serialize the level to pretty-printed RON.
    pub fn to_ron_string(&self) -> Result<String> {
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(6)
            .struct_names(false);
        Ok(ron::ser::to_string_pretty(self, pretty)?)
    }

    /// Whether the path can be followed.
    pub fn is_valid(&self) -> bool {
        self.path.is_valid()
    }

    /// Add a placement, after any existing ones at the same distance.
    pub fn add_placement(&mut self, placement: EnemyPlacement) {
        let index = self
            .placements
            .partition_point(|existing| existing.distance <= placement.distance);
        self.placements.insert(index, placement);
    }

    /// Remove the placement at `index`.
    pub fn remove_placement(&mut self, index: usize) -> Option<EnemyPlacement> {
        (index < self.placements.len()).then(|| self.placements.remove(index))
    }

    /// Sort placements by distance, keeping the order of ties.
    pub fn sort_placements(&mut self) {
        self.placements
            .sort_by(|a, b| a.distance.total_cmp(&b.distance));
    }

    /// Remove every placement.
    pub fn clear_placements(&mut self) {
        self.placements.clear();
    }

    /// Problems that degrade the level when it runs.
    pub fn configuration_errors(&self) -> Vec<LevelError> {
        let mut errors = Vec::new();

        if !self.path.is_valid() {
            errors.push(LevelError::InvalidPath {
                knots: self.path.knot_count(),
            });
        }

        errors.extend(
            self.placements
                .iter()
                .enumerate()
                .filter(|(_, placement)| placement.template_name().is_none())
                .map(|(index, placement)| LevelError::MissingTemplate {
                    index,
                    distance: placement.distance,
                }),
        );

        errors
    }
}

/// A running level. Lives on its own entity and owns the path and rig.
#[derive(Component, Debug, Clone, Reflect)]
#[reflect(Component)]
pub struct RailLevel {
    /// Display name.
    pub name: String,
    /// Entity with the [`PathCurve`].
    pub path: Entity,
    /// Entity with the [`PathFollower`] and [`SpawnScheduler`].
    pub rig: Entity,
    /// Authored placements, reloaded into the scheduler on restart.
    pub placements: Vec<EnemyPlacement>,
}

/// Entities created by [`spawn_rail_level`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelEntities {
    /// Entity with the [`RailLevel`].
    pub level: Entity,
    /// Entity with the [`PathCurve`].
    pub path: Entity,
    /// Entity with the [`PathFollower`] and [`SpawnScheduler`].
    pub rig: Entity,
}

/// Spawn the entities that run a level.
///
/// Configuration problems are logged and the level is spawned anyway: an
/// invalid path leaves the rig idle, untemplated placements are skipped.
pub fn spawn_rail_level(commands: &mut Commands, settings: &LevelSettings) -> LevelEntities {
    for error in settings.configuration_errors() {
        warn!("Level '{}': {error}", settings.name);
    }

    let path = commands
        .spawn((Name::new(format!("{} path", settings.name)), settings.path.clone()))
        .id();

    let rig = commands
        .spawn((
            Name::new(format!("{} rig", settings.name)),
            Transform::default(),
            Visibility::default(),
            PathFollower::new(path)
                .with_start_distance(settings.start_distance)
                .with_speed_multiplier(settings.speed_multiplier),
            SpawnScheduler::new(&settings.placements).with_window(settings.spawn_window),
        ))
        .id();

    let level = commands
        .spawn((
            Name::new(settings.name.clone()),
            RailLevel {
                name: settings.name.clone(),
                path,
                rig,
                placements: settings.placements.clone(),
            },
        ))
        .id();

    info!(
        "Initialized level '{}' ({} placements, {:.0} units)",
        settings.name,
        settings.placements.len(),
        settings.path.total_length()
    );

    LevelEntities { level, path, rig }
}

/// Request to restart a level from a distance.
///
/// The rig jumps to `distance` and resumes following. All live enemies are
/// despawned and the placements are reloaded, except those already behind
/// the despawn window at `distance`.
#[derive(Message, Debug, Clone, Copy)]
pub struct RestartLevel {
    /// Entity with the [`RailLevel`].
    pub level: Entity,
    /// Distance to restart from.
    pub distance: f32,
}

/// Written once when a level's rig reaches the end of its path.
#[derive(Message, Debug, Clone, Copy)]
pub struct LevelCompleted {
    /// Entity with the [`RailLevel`].
    pub level: Entity,
}

/// Apply restart requests before the step is simulated.
pub fn restart_levels(
    mut commands: Commands,
    mut requests: MessageReader<RestartLevel>,
    levels: Query<&RailLevel>,
    mut rigs: Query<(&mut PathFollower, &mut SpawnScheduler)>,
    paths: Query<&PathCurve>,
    mut despawned_events: MessageWriter<EnemyDespawned>,
) {
    for request in requests.read() {
        let Ok(level) = levels.get(request.level) else {
            warn!("Restart requested for missing level {}", request.level);
            continue;
        };
        let Ok((mut follower, mut scheduler)) = rigs.get_mut(level.rig) else {
            continue;
        };
        let Ok(curve) = paths.get(level.path) else {
            continue;
        };

        follower.initialize(curve, request.distance);
        let distance = follower.current_distance();

        let destroyed = teardown_scheduler(&mut commands, level.rig, &mut scheduler);
        write_despawned(&mut despawned_events, level.rig, &destroyed);

        let despawn_limit = distance - scheduler.window.behind;
        let remaining: Vec<EnemyPlacement> = level
            .placements
            .iter()
            .filter(|placement| placement.distance >= despawn_limit)
            .cloned()
            .collect();
        *scheduler = SpawnScheduler::new(&remaining).with_window(scheduler.window);

        info!(
            "Restarted level '{}' at {:.1} ({} placements pending)",
            level.name,
            distance,
            remaining.len()
        );
    }
}

/// Turn rig completions into level completions.
pub fn announce_level_completion(
    mut completions: MessageReader<PathCompleted>,
    levels: Query<(Entity, &RailLevel)>,
    mut completed_events: MessageWriter<LevelCompleted>,
) {
    for completion in completions.read() {
        for (entity, level) in &levels {
            if level.rig == completion.follower {
                info!("Level '{}' complete", level.name);
                completed_events.write(LevelCompleted { level: entity });
            }
        }
    }
}

/// Plugin that runs [`RailLevel`]s: path following, enemy spawning,
/// restarts and completion.
pub struct RailLevelPlugin;

impl Plugin for RailLevelPlugin {
    fn build(&self, app: &mut App) {
        if !app.is_plugin_added::<EnemySpawnerPlugin>() {
            app.add_plugins(EnemySpawnerPlugin);
        }

        app.register_type::<RailLevel>()
            .add_message::<RestartLevel>()
            .add_message::<LevelCompleted>()
            .add_systems(
                FixedUpdate,
                (
                    restart_levels
                        .in_set(RailSystems::Control)
                        .after(initialize_path_followers),
                    announce_level_completion.in_set(RailSystems::Schedule),
                ),
            );
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bevy::ecs::message::Messages;
    use bevy::ecs::system::RunSystemOnce;
    use bevy::time::TimeUpdateStrategy;

    use super::*;
    use crate::follower::FollowerState;
    use crate::path::SegmentSpeed;
    use crate::spawner::{EnemyTemplate, FormationKind, PlacedEnemy};

    fn sample_level() -> LevelSettings {
        let mut settings = LevelSettings::new(
            "Canyon Run",
            PathCurve::from_points([
                Vec3::ZERO,
                Vec3::new(0.0, 0.0, -100.0),
                Vec3::new(20.0, 0.0, -200.0),
            ]),
        );
        settings.add_placement(EnemyPlacement::new("drone", 80.0));
        settings.add_placement(EnemyPlacement::new("turret", 20.0));
        settings.add_placement(EnemyPlacement::new("drone", 20.0));
        settings
    }

    #[test]
    fn test_add_placement_keeps_order() {
        let settings = sample_level();
        let order: Vec<_> = settings
            .placements
            .iter()
            .map(|p| (p.distance, p.template_name().unwrap_or_default()))
            .collect();
        assert_eq!(
            order,
            vec![(20.0, "turret"), (20.0, "drone"), (80.0, "drone")]
        );
    }

    #[test]
    fn test_remove_and_clear_placements() {
        let mut settings = sample_level();
        assert!(settings.remove_placement(10).is_none());
        let removed = settings.remove_placement(0).expect("placement exists");
        assert_eq!(removed.template_name(), Some("turret"));
        assert_eq!(settings.placements.len(), 2);

        settings.clear_placements();
        assert!(settings.placements.is_empty());
    }

    #[test]
    fn test_ron_round_trip_preserves_level() {
        let settings = sample_level();
        let text = settings.to_ron_string().expect("level serializes");
        let parsed = LevelSettings::from_ron_str(&text).expect("level parses");

        assert_eq!(parsed.name, "Canyon Run");
        assert_eq!(parsed.placements, settings.placements);
        assert_eq!(parsed.path.knot_count(), 3);
        assert!((parsed.path.total_length() - settings.path.total_length()).abs() < 1e-3);
    }

    #[test]
    fn test_parse_fills_defaults_and_sorts() {
        let source = r#"(
            name: "Minimal",
            path: (
                knots: [
                    (position: (0.0, 0.0, 0.0)),
                    (position: (0.0, 0.0, -50.0)),
                ],
            ),
            placements: [
                (template: Some("drone"), distance: 40.0),
                (template: Some("drone"), distance: 10.0, scale: 2.0),
            ],
        )"#;

        let settings = LevelSettings::from_ron_str(source).expect("level parses");
        assert_eq!(settings.path.segments().len(), 2);
        assert_eq!(settings.speed_multiplier, 1.0);
        assert_eq!(settings.spawn_window, SpawnWindow::default());
        assert_eq!(settings.placements[0].distance, 10.0);
        assert_eq!(settings.placements[0].scale, 2.0);
        assert_eq!(settings.placements[1].scale, 1.0);
    }

    #[test]
    fn test_parse_clamps_out_of_range_values() {
        let source = r#"(
            path: (
                knots: [
                    (position: (0.0, 0.0, 0.0)),
                    (position: (0.0, 0.0, -50.0)),
                ],
                segments: [(speed: 0.0, ease_in_duration: -1.0)],
            ),
            placements: [
                (
                    template: Some("drone"),
                    distance: -4.0,
                    scale: 0.0,
                    formation: (kind: Line, count: 0, spacing: 0.0),
                ),
            ],
            start_distance: -10.0,
            speed_multiplier: -1.0,
            spawn_window: (ahead: -5.0, behind: 20.0),
        )"#;

        let settings = LevelSettings::from_ron_str(source).expect("level parses");
        let segment = settings.path.segment_speed(0);
        assert_eq!(segment, SegmentSpeed::new(0.0, -1.0));
        assert!(segment.speed > 0.0);

        let placement = &settings.placements[0];
        assert_eq!(placement.distance, 0.0);
        assert!(placement.scale > 0.0);
        assert_eq!(placement.formation.kind, FormationKind::Line);
        assert_eq!(placement.formation.member_count(), 2);
        assert!(placement.formation.spacing > 0.0);

        assert_eq!(settings.start_distance, 0.0);
        assert_eq!(settings.speed_multiplier, 0.0);
        assert_eq!(settings.spawn_window, SpawnWindow::new(0.0, 20.0));
    }

    #[test]
    fn test_parse_error_is_reported() {
        let error = LevelSettings::from_ron_str("(name: ").expect_err("truncated input fails");
        assert!(matches!(error, LevelError::Parse(_)));
    }

    #[test]
    fn test_configuration_errors() {
        let mut settings = LevelSettings::new("Broken", PathCurve::from_points([Vec3::ZERO]));
        let mut untemplated = EnemyPlacement::new("", 5.0);
        untemplated.template = None;
        settings.add_placement(untemplated);
        settings.add_placement(EnemyPlacement::new("drone", 9.0));

        let errors = settings.configuration_errors();
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], LevelError::InvalidPath { knots: 1 }));
        assert!(matches!(
            errors[1],
            LevelError::MissingTemplate { index: 0, .. }
        ));
        assert!(sample_level().configuration_errors().is_empty());
    }

    fn spawn_level(world: &mut World, settings: LevelSettings) -> LevelEntities {
        world
            .run_system_once(move |mut commands: Commands| {
                spawn_rail_level(&mut commands, &settings)
            })
            .expect("spawn system runs")
    }

    #[test]
    fn test_spawn_rail_level_builds_rig() {
        let mut world = World::new();
        let entities = spawn_level(&mut world, sample_level());

        let level = world.get::<RailLevel>(entities.level).expect("level exists");
        assert_eq!(level.rig, entities.rig);
        assert_eq!(level.placements.len(), 3);

        let scheduler = world
            .get::<SpawnScheduler>(entities.rig)
            .expect("rig has scheduler");
        assert_eq!(scheduler.pending_count(), 3);

        let follower = world
            .get::<PathFollower>(entities.rig)
            .expect("rig has follower");
        assert_eq!(follower.path, entities.path);
        assert!(world.get::<PathCurve>(entities.path).is_some());
    }

    #[test]
    fn test_restart_reloads_placements_ahead_of_window() {
        let mut world = World::new();
        world.init_resource::<Messages<RestartLevel>>();
        world.init_resource::<Messages<EnemyDespawned>>();

        let mut settings = sample_level();
        settings.spawn_window = SpawnWindow::new(30.0, 10.0);
        let entities = spawn_level(&mut world, settings);

        world
            .resource_mut::<Messages<RestartLevel>>()
            .write(RestartLevel {
                level: entities.level,
                distance: 50.0,
            });
        world
            .run_system_once(restart_levels)
            .expect("restart system runs");

        let follower = world
            .get::<PathFollower>(entities.rig)
            .expect("rig has follower");
        assert_eq!(follower.state(), FollowerState::Following);
        assert_eq!(follower.current_distance(), 50.0);

        let scheduler = world
            .get::<SpawnScheduler>(entities.rig)
            .expect("rig has scheduler");
        let pending: Vec<_> = scheduler.pending().map(|p| p.distance).collect();
        assert_eq!(pending, vec![80.0]);
        assert_eq!(scheduler.window, SpawnWindow::new(30.0, 10.0));
    }

    #[test]
    fn test_completion_is_announced_for_level_rig() {
        let mut world = World::new();
        world.init_resource::<Messages<PathCompleted>>();
        world.init_resource::<Messages<LevelCompleted>>();
        let entities = spawn_level(&mut world, sample_level());

        world
            .resource_mut::<Messages<PathCompleted>>()
            .write(PathCompleted {
                follower: entities.rig,
            });
        world
            .run_system_once(announce_level_completion)
            .expect("completion system runs");

        let completed: Vec<_> = world
            .resource_mut::<Messages<LevelCompleted>>()
            .drain()
            .collect();
        assert_eq!(completed.len(), 1);
        assert_eq!(completed[0].level, entities.level);
    }

    fn fixed_step_app() -> App {
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, RailLevelPlugin))
            .insert_resource(Time::<Fixed>::from_seconds(0.1))
            .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(
                100,
            )));
        app
    }

    /// 10 units per second over 0.1 s steps: exactly one unit per step.
    fn timing_level() -> LevelSettings {
        let mut curve = PathCurve::from_points([Vec3::ZERO, Vec3::new(0.0, 0.0, -50.0)]);
        curve.set_segment_speed(0, SegmentSpeed::constant(10.0));
        let mut settings = LevelSettings::new("Timing", curve);
        settings.spawn_window = SpawnWindow::new(5.0, 1.0);
        settings.add_placement(EnemyPlacement::new("drone", 7.0));
        settings
    }

    fn rig_distance(app: &App, rig: Entity) -> f32 {
        app.world()
            .get::<PathFollower>(rig)
            .expect("rig has follower")
            .current_distance()
    }

    #[test]
    fn test_scheduler_sees_distance_of_same_step() {
        let mut app = fixed_step_app();
        app.world_mut().spawn(EnemyTemplate::new("drone"));
        let entities = spawn_level(app.world_mut(), timing_level());

        let mut history = Vec::new();
        for _ in 0..15 {
            app.update();
            let distance = rig_distance(&app, entities.rig);
            let world = app.world_mut();
            let alive = world.query::<&PlacedEnemy>().iter(world).count();
            history.push((distance, alive));
        }

        // Spawned once 7 is within 5 ahead, despawned once more than 1 behind
        let spawned_at = history
            .iter()
            .position(|&(_, alive)| alive == 1)
            .expect("enemy spawned");
        assert_eq!(history[spawned_at].0, 2.0);

        let despawned_at = spawned_at
            + history[spawned_at..]
                .iter()
                .position(|&(_, alive)| alive == 0)
                .expect("enemy despawned");
        assert_eq!(history[despawned_at].0, 9.0);
    }

    #[test]
    fn test_restart_applies_after_initialization() {
        let mut app = fixed_step_app();
        let entities = spawn_level(app.world_mut(), timing_level());

        // First update only starts the clock
        app.update();
        app.world_mut()
            .resource_mut::<Messages<RestartLevel>>()
            .write(RestartLevel {
                level: entities.level,
                distance: 20.0,
            });

        for _ in 0..5 {
            app.update();
            if rig_distance(&app, entities.rig) > 0.0 {
                break;
            }
        }

        // Initialized at 0, restarted at 20, then advanced one step
        assert_eq!(rig_distance(&app, entities.rig), 21.0);
    }
}
