use crate::catalog::Rules;
use crate::components::{Ai, AiState, Physics, Projectile, Sprite, Stats, Transform};
use crate::ecs::{ComponentKind, Entity, World};
use crate::events::{GameEventBus, GameEventKind};
use crate::physics_core::Aabb;
use crate::respawn;

/// Advances projectiles and melee hitboxes, then resolves terrain and target hits.
/// Targets are found by a linear scan over everything holding Stats.
pub fn advance_projectiles(world: &mut World, events: &mut GameEventBus, rules: Rules<'_>) {
    let tile_size = rules.config.tile_size;
    for entity in world.query(ComponentKind::Projectile) {
        let (Some(mut projectile), Some(mut transform)) =
            (world.get::<Projectile>(entity), world.get::<Transform>(entity))
        else {
            continue;
        };

        if let Some(physics) = world.get::<Physics>(entity) {
            transform.x += physics.vel_x;
            transform.y += physics.vel_y;
        }
        projectile.lifetime -= 1;
        if projectile.lifetime <= 0 {
            world.destroy(entity);
            continue;
        }
        world.set(entity, transform);
        world.set(entity, projectile);

        let sprite = world.get::<Sprite>(entity).unwrap_or_default();
        let center = sprite.center_of(&transform);
        let tx = (center.x / tile_size).floor() as i32;
        let ty = (center.y / tile_size).floor() as i32;
        let stopped = rules
            .atlas
            .get(transform.level)
            .is_some_and(|map| map.stops_projectile(tx, ty));
        if stopped {
            world.destroy(entity);
            continue;
        }

        let hitbox = Aabb::of_sprite(&transform, &sprite);
        if let Some(target) = first_hit(world, &projectile, &transform, &hitbox) {
            apply_hit(world, events, rules, &projectile, target);
            world.destroy(entity);
        }
    }
}

fn first_hit(
    world: &World,
    projectile: &Projectile,
    transform: &Transform,
    hitbox: &Aabb,
) -> Option<Entity> {
    world
        .query(ComponentKind::Stats)
        .into_iter()
        .filter(|target| *target != projectile.owner)
        .find(|target| {
            let (Some(t), Some(s)) = (
                world.get::<Transform>(*target),
                world.get::<Sprite>(*target),
            ) else {
                return false;
            };
            t.level == transform.level && hitbox.overlaps(&Aabb::of_sprite(&t, &s))
        })
}

/// Applies damage; a lethal hit kills, a non-lethal one may pull an idle NPC
/// toward the shooter. Never both.
fn apply_hit(
    world: &mut World,
    events: &mut GameEventBus,
    rules: Rules<'_>,
    projectile: &Projectile,
    target: Entity,
) {
    let Some(mut stats) = world.get::<Stats>(target) else {
        return;
    };
    stats.current_health = (stats.current_health - projectile.damage).max(0);
    world.set(target, stats);
    events.emit(
        projectile.owner,
        GameEventKind::ProjectileHit {
            target,
            damage: projectile.damage,
            remaining_health: stats.current_health,
        },
    );

    if stats.current_health <= 0 {
        respawn::kill(world, events, rules.config, target);
    } else if let Some(mut ai) = world.get::<Ai>(target) {
        if ai.target.is_none() {
            ai.target = Some(projectile.owner);
            ai.state = AiState::Chase;
            world.set(target, ai);
            events.emit(
                target,
                GameEventKind::Aggro {
                    target: projectile.owner,
                },
            );
        }
    }
}
