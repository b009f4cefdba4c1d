use bevy::prelude::Vec2;
use serde::{Deserialize, Serialize};

use crate::abilities;
use crate::catalog::Rules;
use crate::components::{
    Attack, AttackKind, Equipment, Input, Physics, Player, Projectile, Sprite, Transform,
};
use crate::ecs::{ComponentKind, Entity, World};
use crate::events::{GameEventBus, GameEventKind};
use crate::inventory::WeaponStats;

const BOLT_COLOR: [u8; 4] = [255, 255, 0, 255];
const SWING_COLOR: [u8; 4] = [255, 255, 255, 100];

/// Shape and payload of a flying projectile.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoltSpec {
    pub speed: f32,
    pub damage: i32,
    /// Ticks before the projectile expires.
    pub lifetime: i32,
    pub spawn_offset: f32,
    pub size: f32,
    pub color: [u8; 4],
}

/// Unit vector from `origin` toward `aim`; falls back to the facing angle when
/// the aim point sits on the origin.
pub fn aim_direction(origin: Vec2, aim: Vec2, rotation: f32) -> Vec2 {
    let dir = (aim - origin).normalize_or_zero();
    if dir == Vec2::ZERO {
        Vec2::new(rotation.cos(), rotation.sin())
    } else {
        dir
    }
}

/// Spawns a projectile whose center starts `spawn_offset` along `dir`.
pub fn spawn_bolt(
    world: &mut World,
    owner: Entity,
    level: i32,
    origin: Vec2,
    dir: Vec2,
    spec: &BoltSpec,
) -> Entity {
    let center = origin + dir * spec.spawn_offset;
    let bolt = world.create();
    world.set(
        bolt,
        Transform {
            x: center.x - spec.size * 0.5,
            y: center.y - spec.size * 0.5,
            level,
            rotation: dir.y.atan2(dir.x),
        },
    );
    world.set(
        bolt,
        Physics {
            vel_x: dir.x * spec.speed,
            vel_y: dir.y * spec.speed,
            ..Default::default()
        },
    );
    world.set(bolt, Sprite::square(spec.size, spec.color));
    world.set(
        bolt,
        Projectile {
            owner,
            damage: spec.damage,
            lifetime: spec.lifetime,
        },
    );
    bolt
}

/// Stationary, short-lived hitbox placed toward the aim point.
fn spawn_swing(
    world: &mut World,
    owner: Entity,
    level: i32,
    origin: Vec2,
    dir: Vec2,
    damage: i32,
    rules: Rules<'_>,
) -> Entity {
    let config = rules.config;
    let size = config.melee_hitbox_size;
    let center = origin + dir * config.melee_offset;
    let swing = world.create();
    world.set(
        swing,
        Transform {
            x: center.x - size * 0.5,
            y: center.y - size * 0.5,
            level,
            rotation: dir.y.atan2(dir.x),
        },
    );
    world.set(swing, Sprite::square(size, SWING_COLOR));
    world.set(
        swing,
        Projectile {
            owner,
            damage,
            lifetime: config.melee_lifetime_ticks,
        },
    );
    swing
}

/// Starts attacks for every entity whose intent asks for one. Players fire on
/// the rising edge of the attack flag only; AI-driven entities fire whenever
/// the flag is set and the weapon cooldown allows.
pub fn resolve_attacks(world: &mut World, events: &mut GameEventBus, rules: Rules<'_>, now: f64) {
    for entity in world.query(ComponentKind::Input) {
        let Some(input) = world.get::<Input>(entity) else {
            continue;
        };
        let pressed = match world.get::<Player>(entity) {
            Some(player) => input.attack && !player.prev_input.attack,
            None => input.attack,
        };
        if pressed {
            attack(world, events, rules, entity, &input, now);
        }
    }
}

/// Remembers this tick's intent so the next tick can detect rising edges.
pub fn record_player_inputs(world: &mut World) {
    for entity in world.query(ComponentKind::Player) {
        let (Some(mut player), Some(input)) =
            (world.get::<Player>(entity), world.get::<Input>(entity))
        else {
            continue;
        };
        player.prev_input = input;
        world.set(entity, player);
    }
}

fn attack(
    world: &mut World,
    events: &mut GameEventBus,
    rules: Rules<'_>,
    entity: Entity,
    input: &Input,
    now: f64,
) {
    if let Some(ability) = input.active_ability.as_deref() {
        if let Err(e) = abilities::cast(world, events, rules, entity, ability, now) {
            tracing::debug!(%entity, ability, error = %e, "ability cast refused");
        }
        return;
    }

    let Some(weapon) = equipped_weapon(world, rules, entity) else {
        return;
    };
    let Some(transform) = world.get::<Transform>(entity) else {
        return;
    };
    let mut cooldown = world.get::<Attack>(entity).unwrap_or_default();
    if !cooldown.ready(now, weapon.cooldown) {
        return;
    }
    cooldown.damage = weapon.damage;
    cooldown.range = weapon.range;
    cooldown.cooldown = weapon.cooldown;
    cooldown.kind = weapon.kind;
    cooldown.last_attack_at = Some(now);
    world.set(entity, cooldown);

    let sprite = world.get::<Sprite>(entity).unwrap_or_default();
    let origin = sprite.center_of(&transform);
    let dir = aim_direction(origin, input.aim(), transform.rotation);
    match weapon.kind {
        AttackKind::Ranged => {
            let config = rules.config;
            let speed = config.projectile_speed.max(0.1);
            let spec = BoltSpec {
                speed,
                damage: weapon.damage,
                lifetime: (weapon.range / speed) as i32,
                spawn_offset: config.projectile_spawn_offset,
                size: config.projectile_size,
                color: BOLT_COLOR,
            };
            spawn_bolt(world, entity, transform.level, origin, dir, &spec);
        }
        AttackKind::Melee => {
            spawn_swing(
                world,
                entity,
                transform.level,
                origin,
                dir,
                weapon.damage,
                rules,
            );
        }
    }
    events.emit(entity, GameEventKind::AttackFired { kind: weapon.kind });
}

/// Stats of the weapon in the entity's weapon slot, if it holds a known weapon.
pub fn equipped_weapon(world: &World, rules: Rules<'_>, entity: Entity) -> Option<WeaponStats> {
    let equipment = world.get::<Equipment>(entity)?;
    rules.catalog.items.weapon(equipment.weapon()?)
}
