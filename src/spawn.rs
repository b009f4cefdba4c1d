use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::catalog::Catalog;
use crate::components::{
    Ai, AiState, Attack, EquipSlot, Equipment, Hotbar, Input, Inventory, ItemStack, Loadout,
    Physics, Player, Respawn, Spellbook, Sprite, Stats, Transform, UiState,
};
use crate::config::SimConfig;
use crate::ecs::{Entity, World};
use crate::persistence::PlayerProfile;
use crate::tilemap::{Atlas, Spawner};

const PLAYER_COLOR: [u8; 4] = [0, 255, 0, 255];

/// Blueprint for a non-player character.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Archetype {
    pub name: String,
    pub behavior: String,
    pub max_health: i32,
    pub speed: f32,
    pub size: f32,
    pub weapon: Option<String>,
    pub aggressive: bool,
    pub faction: u32,
    pub color: [u8; 4],
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CharacterRegistry {
    pub archetypes: HashMap<String, Archetype>,
}

impl CharacterRegistry {
    pub fn standard() -> Self {
        let guard = |name: &str, max_health, weapon: &str, color| Archetype {
            name: name.to_string(),
            behavior: "guard".to_string(),
            max_health,
            speed: 1.0,
            size: 32.0,
            weapon: Some(weapon.to_string()),
            aggressive: true,
            faction: 1,
            color,
        };
        let mut archetypes = HashMap::new();
        archetypes.insert(
            "guard_melee".to_string(),
            guard("City Guard", 50, "sword_starter", [255, 255, 0, 255]),
        );
        archetypes.insert(
            "guard_ranged".to_string(),
            guard("City Archer", 40, "bow_starter", [0, 0, 255, 255]),
        );
        Self { archetypes }
    }

    pub fn get(&self, id: &str) -> Option<&Archetype> {
        self.archetypes.get(id)
    }
}

/// Materializes one NPC at a spawner. `None` for unknown archetypes.
pub fn spawn_character(
    world: &mut World,
    catalog: &Catalog,
    config: &SimConfig,
    spawner: &Spawner,
    level: i32,
) -> Option<Entity> {
    let archetype = catalog.characters.get(&spawner.character_id)?;
    let sprite = Sprite::square(archetype.size, archetype.color);
    let ai = Ai {
        behavior: archetype.behavior.clone(),
        state: AiState::Wander,
        state_timer: 1.0,
        aggressive: archetype.aggressive,
        faction: archetype.faction,
        spawn_x: spawner.x,
        spawn_y: spawner.y,
        leash_radius: config.leash_radius,
        ..Default::default()
    };

    let npc = world.create();
    world.set(npc, Transform::at(spawner.x, spawner.y, level));
    world.set(npc, Physics::with_speed(archetype.speed));
    world.set(npc, sprite);
    world.set(npc, Stats::full(archetype.max_health));
    world.set(npc, Input::default());
    world.set(npc, Attack::default());
    let mut equipment = Equipment::default();
    equipment.replace(EquipSlot::Weapon, archetype.weapon.clone());
    world.set(npc, equipment);
    world.set(npc, ai.clone());
    world.set(
        npc,
        Respawn {
            spawn_x: spawner.x,
            spawn_y: spawner.y,
            level,
            timer: 0.0,
            dead: false,
            loadout: Loadout {
                speed: archetype.speed,
                sprite,
                max_health: archetype.max_health,
                ai: Some(ai),
            },
        },
    );
    Some(npc)
}

/// Spawns every level's NPCs once. Returns how many were created.
pub fn spawn_level_spawners(
    world: &mut World,
    atlas: &Atlas,
    catalog: &Catalog,
    config: &SimConfig,
) -> usize {
    let mut spawned = 0;
    for map in atlas.levels() {
        for spawner in &map.spawners {
            match spawn_character(world, catalog, config, spawner, map.level) {
                Some(_) => spawned += 1,
                None => tracing::warn!(
                    level = map.level,
                    character = %spawner.character_id,
                    "unknown character archetype, spawner skipped"
                ),
            }
        }
    }
    tracing::info!(spawned, "level spawners materialized");
    spawned
}

/// Builds a player entity from a stored profile.
pub fn spawn_player(
    world: &mut World,
    profile: &PlayerProfile,
    catalog: &Catalog,
    config: &SimConfig,
) -> Entity {
    let max_health = config.player_max_health;
    let health = if profile.health > 0 {
        profile.health.min(max_health)
    } else {
        max_health
    };
    let sprite = Sprite::square(config.player_size, PLAYER_COLOR);

    let mut inventory = Inventory::with_capacity(config.inventory_capacity);
    for entry in &profile.inventory {
        if entry.index >= inventory.capacity() || catalog.items.get(&entry.item_id).is_none() {
            tracing::warn!(
                player = %profile.username,
                index = entry.index,
                item = %entry.item_id,
                "dropping unloadable inventory entry"
            );
            continue;
        }
        inventory.slots[entry.index] = Some(ItemStack {
            item_id: entry.item_id.clone(),
            quantity: entry.quantity,
        });
    }

    let player = world.create();
    world.set(player, Transform::at(profile.x, profile.y, profile.level));
    world.set(player, Physics::with_speed(config.player_speed));
    world.set(player, sprite);
    world.set(player, Stats {
        max_health,
        current_health: health,
    });
    world.set(player, Input {
        running: profile.running,
        ..Default::default()
    });
    world.set(player, Attack::default());
    world.set(player, inventory);
    world.set(player, Equipment {
        slots: profile.equipment.clone(),
    });
    world.set(player, Hotbar {
        slots: profile.hotbar.clone(),
    });
    world.set(player, Spellbook {
        unlocked: profile.unlocked_abilities.iter().cloned().collect(),
        ..Default::default()
    });
    world.set(player, UiState {
        open_menus: profile.open_menus.iter().cloned().collect(),
    });
    world.set(player, Player {
        username: profile.username.clone(),
        ..Default::default()
    });
    world.set(
        player,
        Respawn {
            spawn_x: profile.x,
            spawn_y: profile.y,
            level: profile.level,
            timer: 0.0,
            dead: false,
            loadout: Loadout {
                speed: config.player_speed,
                sprite,
                max_health,
                ai: None,
            },
        },
    );
    player
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ecs::ComponentKind;
    use crate::tilemap::{TileType, Tilemap};

    #[test]
    fn spawners_materialize_known_archetypes_only() {
        let mut map = Tilemap::filled(0, 10, 10, TileType::Grass);
        map.spawners = vec![
            Spawner {
                x: 64.0,
                y: 96.0,
                character_id: "guard_ranged".to_string(),
            },
            Spawner {
                x: 0.0,
                y: 0.0,
                character_id: "dragon".to_string(),
            },
        ];
        let mut world = World::new();
        let catalog = Catalog::standard();
        let config = SimConfig::default();

        let spawned = spawn_level_spawners(&mut world, &Atlas::single(map), &catalog, &config);
        assert_eq!(spawned, 1);
        let npc = world.query(ComponentKind::Ai)[0];
        let ai = world.get::<Ai>(npc).expect("ai");
        assert_eq!((ai.spawn_x, ai.spawn_y), (64.0, 96.0));
        assert_eq!(ai.leash_radius, 600.0);
        assert_eq!(world.get::<Stats>(npc), Some(Stats::full(40)));
        let equipment = world.get::<Equipment>(npc).expect("equipment");
        assert_eq!(equipment.weapon(), Some("bow_starter"));
        let respawn = world.get::<Respawn>(npc).expect("respawn");
        assert_eq!(respawn.loadout.ai, Some(ai));
    }

    #[test]
    fn player_spawns_from_profile() {
        let mut world = World::new();
        let catalog = Catalog::standard();
        let config = SimConfig::default();
        let mut profile = PlayerProfile::starter("ada", (96.0, 480.0, 0));
        profile.health = 0;

        let player = spawn_player(&mut world, &profile, &catalog, &config);
        assert_eq!(world.get::<Stats>(player), Some(Stats::full(100)));
        let t = world.get::<Transform>(player).expect("transform");
        assert_eq!((t.x, t.y), (96.0, 480.0));
        let equipment = world.get::<Equipment>(player).expect("equipment");
        assert_eq!(equipment.weapon(), Some("sword_starter"));
        let inventory = world.get::<Inventory>(player).expect("inventory");
        assert_eq!(inventory.capacity(), 25);
        assert_eq!(inventory.count_item("potion_health_small"), 5);
        let book = world.get::<Spellbook>(player).expect("spellbook");
        assert!(book.unlocked.contains("blink"));
        assert!(world.get::<Respawn>(player).is_some_and(|r| r.loadout.ai.is_none()));
    }
}
