use std::collections::HashMap;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::components::{
    EquipSlot, Equipment, Hotbar, HotbarBinding, Input, Inventory, Player, Spellbook, Stats,
    Transform, UiState, EQUIP_SLOTS, HOTBAR_SLOTS,
};
use crate::ecs::{Entity, World};
use crate::error::StoreError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryEntry {
    pub index: usize,
    pub item_id: String,
    pub quantity: u32,
}

/// Everything about a player that outlives a connection.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerProfile {
    pub username: String,
    pub x: f32,
    pub y: f32,
    pub level: i32,
    pub health: i32,
    pub inventory: Vec<InventoryEntry>,
    pub hotbar: [Option<HotbarBinding>; HOTBAR_SLOTS],
    pub equipment: [Option<String>; EQUIP_SLOTS],
    pub unlocked_abilities: Vec<String>,
    pub open_menus: Vec<String>,
    pub running: bool,
}

impl PlayerProfile {
    /// First-login profile: a bow and potions in the bag, the sword in hand.
    pub fn starter(username: &str, spawn: (f32, f32, i32)) -> Self {
        let mut equipment: [Option<String>; EQUIP_SLOTS] = Default::default();
        equipment[EquipSlot::Weapon.index()] = Some("sword_starter".to_string());
        let mut hotbar: [Option<HotbarBinding>; HOTBAR_SLOTS] = Default::default();
        hotbar[0] = Some(HotbarBinding::Item("sword_starter".to_string()));
        hotbar[1] = Some(HotbarBinding::Item("bow_starter".to_string()));
        hotbar[2] = Some(HotbarBinding::Ability("heal".to_string()));
        hotbar[3] = Some(HotbarBinding::Ability("blink".to_string()));
        Self {
            username: username.to_string(),
            x: spawn.0,
            y: spawn.1,
            level: spawn.2,
            health: 0,
            inventory: vec![
                InventoryEntry {
                    index: 0,
                    item_id: "bow_starter".to_string(),
                    quantity: 1,
                },
                InventoryEntry {
                    index: 1,
                    item_id: "potion_health_small".to_string(),
                    quantity: 5,
                },
            ],
            hotbar,
            equipment,
            unlocked_abilities: ["blink", "fireball", "heal"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            open_menus: Vec::new(),
            running: false,
        }
    }
}

/// Reads a live player's persistable state. `None` for non-players and for
/// players that are currently dead.
pub fn capture_profile(world: &World, entity: Entity) -> Option<PlayerProfile> {
    let player = world.get::<Player>(entity)?;
    let transform = world.get::<Transform>(entity)?;
    let stats = world.get::<Stats>(entity).unwrap_or_default();
    let inventory = world
        .get::<Inventory>(entity)
        .map(|inv| {
            inv.slots
                .iter()
                .enumerate()
                .filter_map(|(index, slot)| {
                    slot.as_ref().map(|stack| InventoryEntry {
                        index,
                        item_id: stack.item_id.clone(),
                        quantity: stack.quantity,
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    Some(PlayerProfile {
        username: player.username,
        x: transform.x,
        y: transform.y,
        level: transform.level,
        health: stats.current_health,
        inventory,
        hotbar: world.get::<Hotbar>(entity).unwrap_or_default().slots,
        equipment: world.get::<Equipment>(entity).unwrap_or_default().slots,
        unlocked_abilities: world
            .get::<Spellbook>(entity)
            .map(|book| book.unlocked.into_iter().collect())
            .unwrap_or_default(),
        open_menus: world
            .get::<UiState>(entity)
            .map(|ui| ui.open_menus.into_iter().collect())
            .unwrap_or_default(),
        running: world.get::<Input>(entity).is_some_and(|input| input.running),
    })
}

/// Where profiles live between sessions. Writes are last-write-wins.
pub trait ProfileStore: Send + Sync {
    fn load(&self, username: &str) -> Result<Option<PlayerProfile>, StoreError>;
    fn save(&self, profile: &PlayerProfile) -> Result<(), StoreError>;
}

#[derive(Default)]
pub struct MemoryProfileStore {
    profiles: Mutex<HashMap<String, PlayerProfile>>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileStore for MemoryProfileStore {
    fn load(&self, username: &str) -> Result<Option<PlayerProfile>, StoreError> {
        let profiles = self
            .profiles
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(profiles.get(username).cloned())
    }

    fn save(&self, profile: &PlayerProfile) -> Result<(), StoreError> {
        let mut profiles = self
            .profiles
            .lock()
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        profiles.insert(profile.username.clone(), profile.clone());
        Ok(())
    }
}
