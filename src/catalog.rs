use crate::abilities::AbilityRegistry;
use crate::config::SimConfig;
use crate::inventory::ItemRegistry;
use crate::spawn::CharacterRegistry;
use crate::tilemap::Atlas;

/// Static game data: items, abilities and character archetypes.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
    pub items: ItemRegistry,
    pub abilities: AbilityRegistry,
    pub characters: CharacterRegistry,
}

impl Catalog {
    pub fn standard() -> Self {
        Self {
            items: ItemRegistry::standard(),
            abilities: AbilityRegistry::standard(),
            characters: CharacterRegistry::standard(),
        }
    }
}

/// Read-only state the systems consult during a tick.
#[derive(Clone, Copy)]
pub struct Rules<'a> {
    pub atlas: &'a Atlas,
    pub catalog: &'a Catalog,
    pub config: &'a SimConfig,
}
