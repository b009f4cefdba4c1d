use crate::components::{Input, Physics, Respawn, Stats, Transform};
use crate::config::SimConfig;
use crate::ecs::{ComponentKind, Entity, World};
use crate::events::{GameEventBus, GameEventKind};

/// Components a dead entity loses until it respawns.
const STRIPPED_ON_DEATH: [ComponentKind; 6] = [
    ComponentKind::Transform,
    ComponentKind::Physics,
    ComponentKind::Sprite,
    ComponentKind::Ai,
    ComponentKind::Input,
    ComponentKind::Stats,
];

/// Turns the entity into an inert shell and arms its respawn timer. Entities
/// that cannot respawn are destroyed.
pub fn kill(world: &mut World, events: &mut GameEventBus, config: &SimConfig, entity: Entity) {
    events.emit(entity, GameEventKind::Died);
    let Some(mut respawn) = world.get::<Respawn>(entity) else {
        tracing::debug!(%entity, "entity without respawn died");
        world.destroy(entity);
        return;
    };
    respawn.dead = true;
    respawn.timer = config.respawn_secs;
    world.set(entity, respawn);
    for kind in STRIPPED_ON_DEATH {
        world.remove(entity, kind);
    }
    tracing::info!(%entity, respawn_in = config.respawn_secs, "entity died");
}

pub fn update_respawns(world: &mut World, events: &mut GameEventBus, dt: f32) {
    for entity in world.query(ComponentKind::Respawn) {
        let Some(mut respawn) = world.get::<Respawn>(entity) else {
            continue;
        };
        if !respawn.dead {
            continue;
        }
        respawn.timer -= dt;
        if respawn.timer > 0.0 {
            world.set(entity, respawn);
            continue;
        }
        revive(world, entity, &respawn);
        respawn.dead = false;
        respawn.timer = 0.0;
        world.set(entity, respawn.clone());
        events.emit(entity, GameEventKind::Respawned);
        tracing::info!(%entity, x = respawn.spawn_x, y = respawn.spawn_y, "entity respawned");
    }
}

fn revive(world: &mut World, entity: Entity, respawn: &Respawn) {
    let loadout = &respawn.loadout;
    world.set(
        entity,
        Transform::at(respawn.spawn_x, respawn.spawn_y, respawn.level),
    );
    world.set(entity, Physics::with_speed(loadout.speed));
    world.set(entity, loadout.sprite);
    world.set(entity, Stats::full(loadout.max_health));
    world.set(entity, Input::default());
    if let Some(ai) = &loadout.ai {
        world.set(entity, ai.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Ai, AiState, Loadout, Sprite};

    fn guard(world: &mut World) -> Entity {
        let e = world.create();
        world.set(e, Transform::at(300.0, 90.0, 2));
        world.set(e, Physics::with_speed(1.0));
        world.set(e, Sprite::default());
        world.set(e, Stats {
            max_health: 40,
            current_health: 0,
        });
        world.set(e, Input::default());
        let ai = Ai {
            state: AiState::Wander,
            state_timer: 1.0,
            spawn_x: 256.0,
            spawn_y: 64.0,
            leash_radius: 600.0,
            ..Default::default()
        };
        world.set(e, Ai {
            state: AiState::Chase,
            ..ai.clone()
        });
        world.set(e, Respawn {
            spawn_x: 256.0,
            spawn_y: 64.0,
            level: 2,
            timer: 0.0,
            dead: false,
            loadout: Loadout {
                speed: 1.0,
                sprite: Sprite::default(),
                max_health: 40,
                ai: Some(ai),
            },
        });
        e
    }

    #[test]
    fn death_strips_components_and_respawn_restores_them_at_spawn() {
        let config = SimConfig::default();
        let mut world = World::new();
        let mut events = GameEventBus::default();
        let e = guard(&mut world);

        kill(&mut world, &mut events, &config, e);
        for kind in STRIPPED_ON_DEATH {
            assert!(!world.has(e, kind), "{kind:?} kept after death");
        }
        assert!(world.get::<Respawn>(e).is_some_and(|r| r.dead));

        for _ in 0..59 {
            update_respawns(&mut world, &mut events, 0.5);
        }
        assert!(world.get::<Transform>(e).is_none(), "still waiting");
        update_respawns(&mut world, &mut events, 0.5);

        let t = world.get::<Transform>(e).expect("respawned");
        assert_eq!((t.x, t.y, t.level), (256.0, 64.0, 2));
        assert_eq!(world.get::<Stats>(e), Some(Stats::full(40)));
        let ai = world.get::<Ai>(e).expect("ai restored");
        assert_eq!(ai.state, AiState::Wander);
        assert_eq!(ai.target, None);
        assert!(world.get::<Respawn>(e).is_some_and(|r| !r.dead));
    }

    #[test]
    fn entities_without_respawn_are_destroyed() {
        let mut world = World::new();
        let mut events = GameEventBus::default();
        let e = world.create();
        world.set(e, Stats::full(1));
        kill(&mut world, &mut events, &SimConfig::default(), e);
        assert!(!world.is_live(e));
    }
}
