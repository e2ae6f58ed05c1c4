use std::collections::HashMap;

use bevy::prelude::*;

use crate::follower::{FollowerState, PathFollower};
use crate::path::PathCurve;

use super::{
    EnemyDespawned, EnemyLifecycle, EnemySpawned, EnemyTemplate, PlacedEnemy, SpawnRecord,
    SpawnRequest, SpawnScheduler,
};

/// Components copied from a template onto each spawned enemy.
struct TemplateParts {
    scale: Vec3,
    mesh: Option<Mesh3d>,
    material: Option<MeshMaterial3d<StandardMaterial>>,
    scene: Option<SceneRoot>,
}

type TemplateQuery<'w, 's> = Query<
    'w,
    's,
    (
        &'static EnemyTemplate,
        Option<&'static Transform>,
        Option<&'static Mesh3d>,
        Option<&'static MeshMaterial3d<StandardMaterial>>,
        Option<&'static SceneRoot>,
    ),
>;

/// Templates by name, gathered once per run.
struct TemplateLibrary(HashMap<String, TemplateParts>);

impl TemplateLibrary {
    fn collect(templates: &TemplateQuery) -> Self {
        let parts = templates
            .iter()
            .map(|(template, transform, mesh, material, scene)| {
                let parts = TemplateParts {
                    scale: transform.map_or(Vec3::ONE, |transform| transform.scale),
                    mesh: mesh.cloned(),
                    material: material.cloned(),
                    scene: scene.cloned(),
                };
                (template.name.clone(), parts)
            })
            .collect();
        Self(parts)
    }
}

/// [`EnemyLifecycle`] backed by deferred ECS commands.
struct CommandLifecycle<'a, 'w, 's> {
    commands: &'a mut Commands<'w, 's>,
    library: &'a TemplateLibrary,
    scheduler: Entity,
}

impl EnemyLifecycle for CommandLifecycle<'_, '_, '_> {
    fn spawn(&mut self, request: &SpawnRequest) -> Option<Entity> {
        let parts = self.library.0.get(request.template)?;

        let mut transform = request.transform;
        transform.scale *= parts.scale;

        let mut entity_commands = self.commands.spawn((
            transform,
            Visibility::default(),
            PlacedEnemy {
                scheduler: self.scheduler,
                template: request.template.to_string(),
                spawn_distance: request.spawn_distance,
                member: request.member,
            },
        ));

        if let Some(mesh) = &parts.mesh {
            entity_commands.insert(mesh.clone());
        }
        if let Some(material) = &parts.material {
            entity_commands.insert(material.clone());
        }
        if let Some(scene) = &parts.scene {
            entity_commands.insert(scene.clone());
        }

        Some(entity_commands.id())
    }

    fn despawn(&mut self, entity: Entity) {
        if let Ok(mut entity_commands) = self.commands.get_entity(entity) {
            entity_commands.despawn();
        }
    }
}

/// Hide entities marked as enemy templates.
pub fn hide_enemy_templates(mut templates: Query<&mut Visibility, Added<EnemyTemplate>>) {
    for mut visibility in &mut templates {
        *visibility = Visibility::Hidden;
    }
}

/// Tick every scheduler with the distance of the follower on the same entity.
///
/// Runs in `FixedUpdate` after the followers have advanced, so spawn and
/// despawn decisions see this step's distance.
pub fn run_spawn_schedulers(
    mut commands: Commands,
    mut schedulers: Query<(Entity, &PathFollower, &mut SpawnScheduler)>,
    paths: Query<&PathCurve>,
    templates: TemplateQuery,
    mut spawned_events: MessageWriter<EnemySpawned>,
    mut despawned_events: MessageWriter<EnemyDespawned>,
) {
    let mut library = None;

    for (entity, follower, mut scheduler) in &mut schedulers {
        if follower.state() == FollowerState::Idle || !scheduler.is_running() {
            continue;
        }

        let Ok(curve) = paths.get(follower.path) else {
            continue;
        };

        let distance = follower.current_distance();
        if !scheduler.needs_tick(distance) {
            continue;
        }

        let library = library.get_or_insert_with(|| TemplateLibrary::collect(&templates));
        let mut lifecycle = CommandLifecycle {
            commands: &mut commands,
            library,
            scheduler: entity,
        };
        let report = scheduler.tick(curve, distance, &mut lifecycle);

        for record in &report.spawned {
            debug!(
                "Scheduler {entity} spawned {} for placement at {:.1}",
                record.entity, record.spawn_distance
            );
            spawned_events.write(EnemySpawned {
                scheduler: entity,
                enemy: record.entity,
                spawn_distance: record.spawn_distance,
            });
        }
        write_despawned(&mut despawned_events, entity, &report.despawned);
    }
}

pub(crate) fn write_despawned(
    events: &mut MessageWriter<EnemyDespawned>,
    scheduler: Entity,
    records: &[SpawnRecord],
) {
    for record in records {
        debug!(
            "Scheduler {scheduler} despawned {} from placement at {:.1}",
            record.entity, record.spawn_distance
        );
        events.write(EnemyDespawned {
            scheduler,
            enemy: record.entity,
            spawn_distance: record.spawn_distance,
        });
    }
}

/// Tear down a scheduler's enemies through the command-backed lifecycle.
pub(crate) fn teardown_scheduler(
    commands: &mut Commands,
    entity: Entity,
    scheduler: &mut SpawnScheduler,
) -> Vec<SpawnRecord> {
    let library = TemplateLibrary(HashMap::new());
    let mut lifecycle = CommandLifecycle {
        commands,
        library: &library,
        scheduler: entity,
    };
    scheduler.teardown(&mut lifecycle)
}

/// Despawn enemies whose scheduler was removed.
pub fn cleanup_removed_schedulers(
    mut commands: Commands,
    mut removed: RemovedComponents<SpawnScheduler>,
    enemies: Query<(Entity, &PlacedEnemy)>,
) {
    for scheduler in removed.read() {
        for (entity, enemy) in &enemies {
            if enemy.scheduler == scheduler {
                commands.entity(entity).despawn();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use bevy::ecs::message::Messages;
    use bevy::ecs::system::RunSystemOnce;

    use super::*;
    use crate::spawner::{EnemyPlacement, SpawnWindow};

    fn setup_world(placements: &[EnemyPlacement], start: f32) -> (World, Entity) {
        let mut world = World::new();
        world.init_resource::<Messages<EnemySpawned>>();
        world.init_resource::<Messages<EnemyDespawned>>();

        world.spawn((
            EnemyTemplate::new("drone"),
            Transform::from_scale(Vec3::splat(2.0)),
            Visibility::default(),
        ));

        let curve = PathCurve::from_points([Vec3::ZERO, Vec3::new(0.0, 0.0, -300.0)]);
        let mut follower = PathFollower::default();
        follower.initialize(&curve, start);
        let path = world.spawn(curve).id();
        follower.path = path;

        let rig = world
            .spawn((
                follower,
                SpawnScheduler::new(placements).with_window(SpawnWindow::new(50.0, 10.0)),
            ))
            .id();

        (world, rig)
    }

    fn placed_count(world: &mut World) -> usize {
        world.query::<&PlacedEnemy>().iter(world).count()
    }

    #[test]
    fn test_templates_are_hidden() {
        let (mut world, _) = setup_world(&[], 0.0);
        world
            .run_system_once(hide_enemy_templates)
            .expect("hide system runs");

        let visibility = world
            .query_filtered::<&Visibility, With<EnemyTemplate>>()
            .single(&world)
            .expect("one template");
        assert_eq!(*visibility, Visibility::Hidden);
    }

    #[test]
    fn test_scheduler_spawns_clones_with_scaled_transform() {
        let placements = vec![
            EnemyPlacement::new("drone", 20.0).with_scale(1.5),
            EnemyPlacement::new("drone", 200.0),
        ];
        let (mut world, rig) = setup_world(&placements, 0.0);

        world
            .run_system_once(run_spawn_schedulers)
            .expect("scheduler system runs");

        let enemies: Vec<_> = world
            .query::<(&PlacedEnemy, &Transform)>()
            .iter(&world)
            .map(|(enemy, transform)| (enemy.clone(), *transform))
            .collect();
        assert_eq!(enemies.len(), 1);
        assert_eq!(enemies[0].0.scheduler, rig);
        assert_eq!(enemies[0].0.template, "drone");
        assert!((enemies[0].1.scale - Vec3::splat(3.0)).length() < 1e-5);
        assert!((enemies[0].1.translation - Vec3::new(0.0, 0.0, -20.0)).length() < 0.1);

        let spawned: Vec<_> = world
            .resource_mut::<Messages<EnemySpawned>>()
            .drain()
            .collect();
        assert_eq!(spawned.len(), 1);
        assert_eq!(spawned[0].spawn_distance, 20.0);
    }

    #[test]
    fn test_scheduler_despawns_behind_follower() {
        let placements = vec![EnemyPlacement::new("drone", 20.0)];
        let (mut world, rig) = setup_world(&placements, 0.0);

        world
            .run_system_once(run_spawn_schedulers)
            .expect("scheduler system runs");
        assert_eq!(placed_count(&mut world), 1);

        let path = world.get::<PathFollower>(rig).expect("rig has follower").path;
        let curve = world.get::<PathCurve>(path).expect("path exists").clone();
        world
            .get_mut::<PathFollower>(rig)
            .expect("rig has follower")
            .set_distance(&curve, 40.0);

        world
            .run_system_once(run_spawn_schedulers)
            .expect("scheduler system runs");
        assert_eq!(placed_count(&mut world), 0);

        let despawned: Vec<_> = world
            .resource_mut::<Messages<EnemyDespawned>>()
            .drain()
            .collect();
        assert_eq!(despawned.len(), 1);
    }

    #[test]
    fn test_removing_scheduler_cleans_up_enemies() {
        let placements = vec![
            EnemyPlacement::new("drone", 10.0),
            EnemyPlacement::new("drone", 30.0),
        ];
        let (mut world, rig) = setup_world(&placements, 0.0);

        world
            .run_system_once(run_spawn_schedulers)
            .expect("scheduler system runs");
        assert_eq!(placed_count(&mut world), 2);

        world.entity_mut(rig).remove::<SpawnScheduler>();
        world
            .run_system_once(cleanup_removed_schedulers)
            .expect("cleanup system runs");
        assert_eq!(placed_count(&mut world), 0);
    }
}
