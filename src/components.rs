use std::collections::{BTreeMap, BTreeSet};

use bevy::prelude::Vec2;
use serde::{Deserialize, Serialize};

use crate::ecs::Entity;

pub const HOTBAR_SLOTS: usize = 10;
pub const EQUIP_SLOTS: usize = 9;

/// Position of the sprite's top-left corner, vertical level and facing (radians).
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub x: f32,
    pub y: f32,
    pub level: i32,
    pub rotation: f32,
}

impl Transform {
    pub fn at(x: f32, y: f32, level: i32) -> Self {
        Self {
            x,
            y,
            level,
            rotation: 0.0,
        }
    }

    pub fn position(&self) -> Vec2 {
        Vec2::new(self.x, self.y)
    }
}

/// Per-tick velocity and scalar movement speed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Physics {
    pub vel_x: f32,
    pub vel_y: f32,
    pub acc_x: f32,
    pub acc_y: f32,
    pub speed: f32,
}

impl Physics {
    pub fn with_speed(speed: f32) -> Self {
        Self {
            speed,
            ..Default::default()
        }
    }
}

/// Visual footprint; also sizes collision and hit boxes.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Sprite {
    pub width: f32,
    pub height: f32,
    pub color: [u8; 4],
}

impl Default for Sprite {
    fn default() -> Self {
        Self::square(32.0, [255, 255, 255, 255])
    }
}

impl Sprite {
    pub fn square(size: f32, color: [u8; 4]) -> Self {
        Self {
            width: size,
            height: size,
            color,
        }
    }

    pub fn half_extents(&self) -> Vec2 {
        Vec2::new(self.width * 0.5, self.height * 0.5)
    }

    pub fn center_of(&self, transform: &Transform) -> Vec2 {
        transform.position() + self.half_extents()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    pub max_health: i32,
    pub current_health: i32,
}

impl Stats {
    pub fn full(max_health: i32) -> Self {
        Self {
            max_health,
            current_health: max_health,
        }
    }
}

/// Intent for one tick, written by a client or synthesized by the AI engine.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Input {
    pub up: bool,
    pub down: bool,
    pub left: bool,
    pub right: bool,
    pub running: bool,
    pub attack: bool,
    pub hotbar: [bool; HOTBAR_SLOTS],
    pub aim_x: f32,
    pub aim_y: f32,
    pub active_ability: Option<String>,
}

impl Input {
    /// Resets the per-tick flags, keeping the aim point and ability selection.
    pub fn clear_intent(&mut self) {
        self.up = false;
        self.down = false;
        self.left = false;
        self.right = false;
        self.attack = false;
    }

    pub fn aim(&self) -> Vec2 {
        Vec2::new(self.aim_x, self.aim_y)
    }

    pub fn set_aim(&mut self, point: Vec2) {
        self.aim_x = point.x;
        self.aim_y = point.y;
    }

    pub fn press(&mut self, direction: Direction) {
        match direction {
            Direction::Up => self.up = true,
            Direction::Down => self.down = true,
            Direction::Left => self.left = true,
            Direction::Right => self.right = true,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttackKind {
    #[default]
    Melee,
    Ranged,
}

/// Cooldown state plus a cache of the stats of the last weapon used.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Attack {
    pub damage: i32,
    pub range: f32,
    pub cooldown: f32,
    pub last_attack_at: Option<f64>,
    pub kind: AttackKind,
}

impl Attack {
    pub fn ready(&self, now: f64, cooldown: f32) -> bool {
        match self.last_attack_at {
            Some(last) => now - last >= f64::from(cooldown),
            None => true,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Projectile {
    pub owner: Entity,
    pub damage: i32,
    /// Remaining lifetime in ticks.
    pub lifetime: i32,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AiState {
    Idle,
    Move,
    #[default]
    Wander,
    Chase,
    Attack,
    Return,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    #[default]
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// Unit vector in screen space (y grows downward).
    pub fn vector(self) -> Vec2 {
        match self {
            Direction::Up => Vec2::new(0.0, -1.0),
            Direction::Down => Vec2::new(0.0, 1.0),
            Direction::Left => Vec2::new(-1.0, 0.0),
            Direction::Right => Vec2::new(1.0, 0.0),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Ai {
    pub behavior: String,
    pub state: AiState,
    pub state_timer: f32,
    pub direction: Direction,
    pub target: Option<Entity>,
    pub aggressive: bool,
    pub faction: u32,
    pub spawn_x: f32,
    pub spawn_y: f32,
    pub leash_radius: f32,
    pub path: Vec<Vec2>,
    pub path_timer: f32,
}

impl Ai {
    pub fn spawn(&self) -> Vec2 {
        Vec2::new(self.spawn_x, self.spawn_y)
    }
}

/// What an entity gets back when its respawn timer elapses.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Loadout {
    pub speed: f32,
    pub sprite: Sprite,
    pub max_health: i32,
    pub ai: Option<Ai>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Respawn {
    pub spawn_x: f32,
    pub spawn_y: f32,
    pub level: i32,
    pub timer: f32,
    pub dead: bool,
    pub loadout: Loadout,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item_id: String,
    pub quantity: u32,
}

/// Fixed-capacity slot list; `None` marks an empty slot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Inventory {
    pub slots: Vec<Option<ItemStack>>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquipSlot {
    Head,
    Neck,
    Back,
    Body,
    Legs,
    Weapon,
    Shield,
    Feet,
    Hands,
}

impl EquipSlot {
    pub const ALL: [EquipSlot; EQUIP_SLOTS] = [
        EquipSlot::Head,
        EquipSlot::Neck,
        EquipSlot::Back,
        EquipSlot::Body,
        EquipSlot::Legs,
        EquipSlot::Weapon,
        EquipSlot::Shield,
        EquipSlot::Feet,
        EquipSlot::Hands,
    ];

    pub fn index(self) -> usize {
        self as usize
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equipment {
    pub slots: [Option<String>; EQUIP_SLOTS],
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum HotbarBinding {
    Item(String),
    Ability(String),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hotbar {
    pub slots: [Option<HotbarBinding>; HOTBAR_SLOTS],
}

/// Unlocked abilities and when each was last cast (wall-clock seconds).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Spellbook {
    pub unlocked: BTreeSet<String>,
    pub last_cast: BTreeMap<String, f64>,
}

/// Marks a client-controlled entity.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub username: String,
    /// Intent recorded at the end of the previous tick's attack pass.
    pub prev_input: Input,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UiState {
    pub open_menus: BTreeSet<String>,
}
