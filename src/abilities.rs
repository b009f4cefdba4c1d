use std::collections::HashMap;

use bevy::prelude::Vec2;
use serde::{Deserialize, Serialize};

use crate::catalog::Rules;
use crate::combat::{self, BoltSpec};
use crate::components::{Input, Spellbook, Sprite, Stats, Transform};
use crate::ecs::{Entity, World};
use crate::error::ActionError;
use crate::events::{GameEventBus, GameEventKind};
use crate::physics_core::{self, BodyShape};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AbilityDef {
    pub name: String,
    pub cooldown: f32,
    pub effect: AbilityEffect,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AbilityEffect {
    /// Fires a projectile toward the aim point.
    Bolt(BoltSpec),
    Heal { amount: i32 },
    /// Teleports toward the aim point.
    Blink { distance: f32 },
}

impl AbilityDef {
    /// Instant abilities resolve on request; bolts go through the attack pass.
    pub fn is_instant(&self) -> bool {
        !matches!(self.effect, AbilityEffect::Bolt(_))
    }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AbilityRegistry {
    pub abilities: HashMap<String, AbilityDef>,
}

impl AbilityRegistry {
    pub fn standard() -> Self {
        let mut abilities = HashMap::new();
        abilities.insert(
            "fireball".to_string(),
            AbilityDef {
                name: "Fireball".to_string(),
                cooldown: 2.0,
                effect: AbilityEffect::Bolt(BoltSpec {
                    speed: 12.0,
                    damage: 25,
                    lifetime: 60,
                    spawn_offset: 20.0,
                    size: 12.0,
                    color: [255, 100, 0, 255],
                }),
            },
        );
        abilities.insert(
            "heal".to_string(),
            AbilityDef {
                name: "Heal".to_string(),
                cooldown: 5.0,
                effect: AbilityEffect::Heal { amount: 20 },
            },
        );
        abilities.insert(
            "blink".to_string(),
            AbilityDef {
                name: "Blink".to_string(),
                cooldown: 8.0,
                effect: AbilityEffect::Blink { distance: 100.0 },
            },
        );
        Self { abilities }
    }

    pub fn get(&self, id: &str) -> Option<&AbilityDef> {
        self.abilities.get(id)
    }
}

/// Casts an unlocked, ready ability. The cooldown only starts when the effect
/// actually happened.
pub fn cast(
    world: &mut World,
    events: &mut GameEventBus,
    rules: Rules<'_>,
    caster: Entity,
    ability_id: &str,
    now: f64,
) -> Result<(), ActionError> {
    let def = rules
        .catalog
        .abilities
        .get(ability_id)
        .ok_or_else(|| ActionError::UnknownAbility(ability_id.to_string()))?;
    let mut spellbook = world
        .get::<Spellbook>(caster)
        .ok_or(ActionError::MissingComponent("spellbook"))?;
    if !spellbook.unlocked.contains(ability_id) {
        return Err(ActionError::AbilityLocked(ability_id.to_string()));
    }
    if let Some(last) = spellbook.last_cast.get(ability_id) {
        if now - last < f64::from(def.cooldown) {
            return Err(ActionError::OnCooldown(ability_id.to_string()));
        }
    }

    match &def.effect {
        AbilityEffect::Bolt(spec) => {
            let (transform, sprite, input) = caster_pose(world, caster)?;
            let origin = sprite.center_of(&transform);
            let dir = combat::aim_direction(origin, input.aim(), transform.rotation);
            combat::spawn_bolt(world, caster, transform.level, origin, dir, spec);
        }
        AbilityEffect::Heal { amount } => {
            let mut stats = world
                .get::<Stats>(caster)
                .ok_or(ActionError::MissingComponent("stats"))?;
            stats.current_health = (stats.current_health + amount).min(stats.max_health);
            world.set(caster, stats);
        }
        AbilityEffect::Blink { distance } => {
            let (mut transform, sprite, input) = caster_pose(world, caster)?;
            let origin = sprite.center_of(&transform);
            let dir = combat::aim_direction(origin, input.aim(), transform.rotation);
            let dest = transform.position() + dir * *distance;
            let shape = BodyShape::of_sprite(&sprite, rules.config.collision_box_scale);
            let body = shape.at(dest.x, dest.y);
            if dir == Vec2::ZERO
                || physics_core::collides_with_map(
                    rules.atlas.get(transform.level),
                    &body,
                    rules.config.tile_size,
                )
            {
                return Err(ActionError::Obstructed(ability_id.to_string()));
            }
            transform.x = dest.x;
            transform.y = dest.y;
            world.set(caster, transform);
        }
    }

    spellbook.last_cast.insert(ability_id.to_string(), now);
    world.set(caster, spellbook);
    events.emit(
        caster,
        GameEventKind::AbilityCast {
            ability: ability_id.to_string(),
        },
    );
    Ok(())
}

fn caster_pose(world: &World, caster: Entity) -> Result<(Transform, Sprite, Input), ActionError> {
    let transform = world
        .get::<Transform>(caster)
        .ok_or(ActionError::MissingComponent("transform"))?;
    let input = world
        .get::<Input>(caster)
        .ok_or(ActionError::MissingComponent("input"))?;
    Ok((transform, world.get::<Sprite>(caster).unwrap_or_default(), input))
}
