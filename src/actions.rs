use serde::{Deserialize, Serialize};

use crate::abilities;
use crate::catalog::Rules;
use crate::components::{
    EquipSlot, Equipment, Hotbar, HotbarBinding, Input, Inventory, Stats, UiState, HOTBAR_SLOTS,
};
use crate::ecs::{Entity, World};
use crate::error::ActionError;
use crate::events::GameEventBus;
use crate::inventory::{self, ItemKind};

/// Discrete request from a client, applied outside the movement intent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    SwapInventory { a: usize, b: usize },
    DropItem { slot: usize },
    /// Equips equippable items, drinks consumables.
    UseItem { slot: usize },
    Equip { inventory_slot: usize, slot: EquipSlot },
    Unequip { slot: EquipSlot },
    BindHotbar {
        slot: usize,
        binding: Option<HotbarBinding>,
    },
    SwapHotbar { a: usize, b: usize },
    CastAbility { ability: String },
    SetOpenMenus { menus: Vec<String> },
}

impl Action {
    /// Whether a successful application changes persisted player state.
    pub fn persists(&self) -> bool {
        !matches!(self, Action::CastAbility { .. })
    }
}

/// Validates and applies one action. Either every component it touches is
/// committed or none is.
pub fn apply_action(
    world: &mut World,
    events: &mut GameEventBus,
    rules: Rules<'_>,
    entity: Entity,
    action: &Action,
    now: f64,
) -> Result<(), ActionError> {
    let items = &rules.catalog.items;
    match action {
        Action::SwapInventory { a, b } => {
            let mut bag = inventory_of(world, entity)?;
            bag.swap_slots(*a, *b)?;
            world.set(entity, bag);
        }
        Action::DropItem { slot } => {
            let mut bag = inventory_of(world, entity)?;
            let dropped = bag.clear_slot(*slot)?;
            tracing::debug!(%entity, item = %dropped.item_id, quantity = dropped.quantity, "item dropped");
            world.set(entity, bag);
        }
        Action::UseItem { slot } => use_item(world, rules, entity, *slot)?,
        Action::Equip {
            inventory_slot,
            slot,
        } => {
            let mut bag = inventory_of(world, entity)?;
            let mut worn = equipment_of(world, entity)?;
            inventory::equip(&mut bag, &mut worn, items, *inventory_slot, *slot)?;
            world.set(entity, bag);
            world.set(entity, worn);
        }
        Action::Unequip { slot } => {
            let mut bag = inventory_of(world, entity)?;
            let mut worn = equipment_of(world, entity)?;
            inventory::unequip(&mut bag, &mut worn, items, *slot)?;
            world.set(entity, bag);
            world.set(entity, worn);
        }
        Action::BindHotbar { slot, binding } => {
            match binding {
                Some(HotbarBinding::Item(id)) if items.get(id).is_none() => {
                    return Err(ActionError::UnknownItem(id.clone()));
                }
                Some(HotbarBinding::Ability(id)) if rules.catalog.abilities.get(id).is_none() => {
                    return Err(ActionError::UnknownAbility(id.clone()));
                }
                _ => {}
            }
            let mut hotbar = hotbar_of(world, entity)?;
            hotbar.bind(*slot, binding.clone())?;
            world.set(entity, hotbar);
        }
        Action::SwapHotbar { a, b } => {
            let mut hotbar = hotbar_of(world, entity)?;
            hotbar.swap(*a, *b)?;
            world.set(entity, hotbar);
        }
        Action::CastAbility { ability } => cast_instant(world, events, rules, entity, ability, now)?,
        Action::SetOpenMenus { menus } => {
            world.set(entity, UiState {
                open_menus: menus.iter().cloned().collect(),
            });
        }
    }
    Ok(())
}

/// Fires the bindings of hotbar keys that went down between two intents.
/// Items toggle their equipped state; instant abilities are cast. Combat
/// abilities are left to the client, which selects them through the intent.
pub fn apply_hotbar_triggers(
    world: &mut World,
    events: &mut GameEventBus,
    rules: Rules<'_>,
    entity: Entity,
    previous: &Input,
    next: &Input,
    now: f64,
) {
    let Some(hotbar) = world.get::<Hotbar>(entity) else {
        return;
    };
    for slot in 0..HOTBAR_SLOTS {
        if !next.hotbar[slot] || previous.hotbar[slot] {
            continue;
        }
        let result = match hotbar.get(slot) {
            Some(HotbarBinding::Item(item)) => toggle_item(world, rules, entity, item),
            Some(HotbarBinding::Ability(ability)) => {
                match rules.catalog.abilities.get(ability) {
                    Some(def) if def.is_instant() => {
                        abilities::cast(world, events, rules, entity, ability, now)
                    }
                    _ => Ok(()),
                }
            }
            None => Ok(()),
        };
        if let Err(e) = result {
            tracing::debug!(%entity, slot, error = %e, "hotbar trigger refused");
        }
    }
}

fn toggle_item(
    world: &mut World,
    rules: Rules<'_>,
    entity: Entity,
    item: &str,
) -> Result<(), ActionError> {
    let mut bag = inventory_of(world, entity)?;
    let mut worn = equipment_of(world, entity)?;
    inventory::toggle_equip(&mut bag, &mut worn, &rules.catalog.items, item)?;
    world.set(entity, bag);
    world.set(entity, worn);
    Ok(())
}

fn use_item(
    world: &mut World,
    rules: Rules<'_>,
    entity: Entity,
    slot: usize,
) -> Result<(), ActionError> {
    let mut bag = inventory_of(world, entity)?;
    let item_id = bag
        .slot(slot)?
        .ok_or(ActionError::EmptySlot(slot))?
        .item_id
        .clone();
    let def = rules
        .catalog
        .items
        .get(&item_id)
        .ok_or_else(|| ActionError::UnknownItem(item_id.clone()))?;

    if let Some(target) = def.equip_slot() {
        let mut worn = equipment_of(world, entity)?;
        inventory::equip(&mut bag, &mut worn, &rules.catalog.items, slot, target)?;
        world.set(entity, bag);
        world.set(entity, worn);
        return Ok(());
    }
    match def.kind {
        ItemKind::Consumable { heal } => {
            let mut stats = world
                .get::<Stats>(entity)
                .ok_or(ActionError::MissingComponent("stats"))?;
            bag.remove_from_slot(slot, 1)?;
            stats.current_health = (stats.current_health + heal).min(stats.max_health);
            world.set(entity, bag);
            world.set(entity, stats);
            Ok(())
        }
        _ => Err(ActionError::NotUsable(item_id)),
    }
}

fn cast_instant(
    world: &mut World,
    events: &mut GameEventBus,
    rules: Rules<'_>,
    entity: Entity,
    ability: &str,
    now: f64,
) -> Result<(), ActionError> {
    let def = rules
        .catalog
        .abilities
        .get(ability)
        .ok_or_else(|| ActionError::UnknownAbility(ability.to_string()))?;
    if !def.is_instant() {
        return Err(ActionError::NotUsable(ability.to_string()));
    }
    abilities::cast(world, events, rules, entity, ability, now)
}

fn inventory_of(world: &World, entity: Entity) -> Result<Inventory, ActionError> {
    world
        .get::<Inventory>(entity)
        .ok_or(ActionError::MissingComponent("inventory"))
}

fn equipment_of(world: &World, entity: Entity) -> Result<Equipment, ActionError> {
    world
        .get::<Equipment>(entity)
        .ok_or(ActionError::MissingComponent("equipment"))
}

fn hotbar_of(world: &World, entity: Entity) -> Result<Hotbar, ActionError> {
    world
        .get::<Hotbar>(entity)
        .ok_or(ActionError::MissingComponent("hotbar"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Catalog;
    use crate::config::SimConfig;
    use crate::persistence::PlayerProfile;
    use crate::spawn::spawn_player;
    use crate::tilemap::{Atlas, TileType, Tilemap};

    struct Session {
        world: World,
        events: GameEventBus,
        atlas: Atlas,
        catalog: Catalog,
        config: SimConfig,
        player: Entity,
    }

    impl Session {
        fn new() -> Self {
            let catalog = Catalog::standard();
            let config = SimConfig::default();
            let mut world = World::new();
            let profile = PlayerProfile::starter("ada", (96.0, 96.0, 0));
            let player = spawn_player(&mut world, &profile, &catalog, &config);
            Self {
                world,
                events: GameEventBus::default(),
                atlas: Atlas::single(Tilemap::filled(0, 20, 20, TileType::Grass)),
                catalog,
                config,
                player,
            }
        }

        fn apply(&mut self, action: Action) -> Result<(), ActionError> {
            let rules = Rules {
                atlas: &self.atlas,
                catalog: &self.catalog,
                config: &self.config,
            };
            apply_action(&mut self.world, &mut self.events, rules, self.player, &action, 0.0)
        }

        fn trigger(&mut self, previous: &Input, next: &Input) {
            let rules = Rules {
                atlas: &self.atlas,
                catalog: &self.catalog,
                config: &self.config,
            };
            apply_hotbar_triggers(
                &mut self.world,
                &mut self.events,
                rules,
                self.player,
                previous,
                next,
                0.0,
            );
        }

        fn bag(&self) -> Inventory {
            self.world.get::<Inventory>(self.player).expect("inventory")
        }

        fn worn(&self) -> Equipment {
            self.world.get::<Equipment>(self.player).expect("equipment")
        }
    }

    #[test]
    fn bow_into_body_slot_leaves_state_byte_identical() {
        let mut session = Session::new();
        let before = (
            serde_json::to_vec(&session.bag()).expect("json"),
            serde_json::to_vec(&session.worn()).expect("json"),
        );
        let result = session.apply(Action::Equip {
            inventory_slot: 0,
            slot: EquipSlot::Body,
        });
        assert!(matches!(result, Err(ActionError::WrongSlot { .. })));
        let after = (
            serde_json::to_vec(&session.bag()).expect("json"),
            serde_json::to_vec(&session.worn()).expect("json"),
        );
        assert_eq!(before, after);
    }

    #[test]
    fn equipping_the_bow_swaps_the_sword_into_its_slot() {
        let mut session = Session::new();
        session
            .apply(Action::UseItem { slot: 0 })
            .expect("bow is equippable");
        assert_eq!(session.worn().weapon(), Some("bow_starter"));
        assert_eq!(
            session.bag().slots[0].as_ref().map(|s| s.item_id.as_str()),
            Some("sword_starter")
        );
    }

    #[test]
    fn drinking_a_potion_heals_and_consumes_one() {
        let mut session = Session::new();
        let mut stats = session.world.get::<Stats>(session.player).expect("stats");
        stats.current_health = 50;
        session.world.set(session.player, stats);

        session.apply(Action::UseItem { slot: 1 }).expect("drink");
        assert_eq!(
            session.world.get::<Stats>(session.player).map(|s| s.current_health),
            Some(75)
        );
        assert_eq!(session.bag().count_item("potion_health_small"), 4);
    }

    #[test]
    fn invalid_requests_are_rejected_whole() {
        let mut session = Session::new();
        assert_eq!(
            session.apply(Action::SwapInventory { a: 0, b: 99 }),
            Err(ActionError::InvalidSlot(99))
        );
        assert_eq!(
            session.apply(Action::DropItem { slot: 7 }),
            Err(ActionError::EmptySlot(7))
        );
        assert_eq!(
            session.apply(Action::BindHotbar {
                slot: 4,
                binding: Some(HotbarBinding::Item("excalibur".to_string())),
            }),
            Err(ActionError::UnknownItem("excalibur".to_string()))
        );
        assert_eq!(
            session.apply(Action::CastAbility {
                ability: "fireball".to_string()
            }),
            Err(ActionError::NotUsable("fireball".to_string()))
        );
        assert_eq!(session.bag().count_item("bow_starter"), 1);
    }

    #[test]
    fn hotbar_item_toggles_on_the_rising_edge_only() {
        let mut session = Session::new();
        let idle = Input::default();
        let mut held = Input::default();
        held.hotbar[0] = true;

        session.trigger(&idle, &held);
        assert_eq!(session.worn().weapon(), None, "sword taken off");
        assert_eq!(session.bag().count_item("sword_starter"), 1);

        session.trigger(&held, &held);
        assert_eq!(session.worn().weapon(), None, "held key does nothing");

        session.trigger(&idle, &held);
        assert_eq!(session.worn().weapon(), Some("sword_starter"));
    }

    #[test]
    fn hotbar_heal_casts_instantly() {
        let mut session = Session::new();
        let mut stats = session.world.get::<Stats>(session.player).expect("stats");
        stats.current_health = 10;
        session.world.set(session.player, stats);
        let mut pressed = Input::default();
        pressed.hotbar[2] = true;

        session.trigger(&Input::default(), &pressed);
        assert_eq!(
            session.world.get::<Stats>(session.player).map(|s| s.current_health),
            Some(30)
        );
    }

    #[test]
    fn menus_are_replaced_wholesale() {
        let mut session = Session::new();
        session
            .apply(Action::SetOpenMenus {
                menus: vec!["spellbook".to_string(), "inventory".to_string()],
            })
            .expect("menus");
        let ui = session.world.get::<UiState>(session.player).expect("ui");
        assert_eq!(ui.open_menus.len(), 2);
        assert!(ui.open_menus.contains("spellbook"));
    }
}
