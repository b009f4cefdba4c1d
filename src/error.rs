use thiserror::Error;

use crate::components::EquipSlot;

/// Why a discrete player request was refused. A refused request never
/// leaves a partial mutation behind.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActionError {
    #[error("slot index {0} is out of range")]
    InvalidSlot(usize),
    #[error("slot {0} is empty")]
    EmptySlot(usize),
    #[error("unknown item '{0}'")]
    UnknownItem(String),
    #[error("item '{0}' cannot be equipped")]
    NotEquippable(String),
    #[error("item '{item}' goes in the {expected:?} slot, not {requested:?}")]
    WrongSlot {
        item: String,
        expected: EquipSlot,
        requested: EquipSlot,
    },
    #[error("nothing is equipped in the {0:?} slot")]
    NothingEquipped(EquipSlot),
    #[error("item '{0}' is not in the inventory")]
    NotCarried(String),
    #[error("item '{0}' has no use action")]
    NotUsable(String),
    #[error("inventory is full")]
    InventoryFull,
    #[error("unknown ability '{0}'")]
    UnknownAbility(String),
    #[error("ability '{0}' is not unlocked")]
    AbilityLocked(String),
    #[error("ability '{0}' is on cooldown")]
    OnCooldown(String),
    #[error("ability '{0}' has no valid destination")]
    Obstructed(String),
    #[error("entity has no {0} component")]
    MissingComponent(&'static str),
}

#[derive(Debug, Error)]
pub enum MapError {
    #[error("layer '{layer}' has {actual} cells, expected {expected}")]
    LayerSize {
        layer: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("level dimensions {width}x{height} are too large")]
    Dimensions { width: usize, height: usize },
    #[error("invalid level definition: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("failed to read level file: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("profile store unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ServerError {
    #[error("server is not running")]
    Closed,
    #[error("player '{0}' is already connected")]
    AlreadyConnected(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}
