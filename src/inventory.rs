use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::components::{
    AttackKind, EquipSlot, Equipment, Hotbar, HotbarBinding, Inventory, ItemStack, HOTBAR_SLOTS,
};
use crate::error::ActionError;

/// Global registry of item definitions.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ItemRegistry {
    pub items: HashMap<String, ItemDef>,
}

/// Definition of an item type.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ItemDef {
    pub name: String,
    #[serde(default = "default_max_stack")]
    pub max_stack: u32,
    pub kind: ItemKind,
}

fn default_max_stack() -> u32 {
    99
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ItemKind {
    Weapon(WeaponStats),
    Armor { slot: EquipSlot },
    Consumable { heal: i32 },
    Misc,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeaponStats {
    pub kind: AttackKind,
    pub damage: i32,
    pub range: f32,
    pub cooldown: f32,
}

impl ItemDef {
    pub fn equip_slot(&self) -> Option<EquipSlot> {
        match &self.kind {
            ItemKind::Weapon(_) => Some(EquipSlot::Weapon),
            ItemKind::Armor { slot } => Some(*slot),
            _ => None,
        }
    }
}

impl ItemRegistry {
    pub fn standard() -> Self {
        let mut items = HashMap::new();
        let mut add = |id: &str, name: &str, max_stack: u32, kind: ItemKind| {
            items.insert(
                id.to_string(),
                ItemDef {
                    name: name.to_string(),
                    max_stack,
                    kind,
                },
            );
        };
        add(
            "sword_starter",
            "Rusty Sword",
            1,
            ItemKind::Weapon(WeaponStats {
                kind: AttackKind::Melee,
                damage: 20,
                range: 60.0,
                cooldown: 0.8,
            }),
        );
        add(
            "bow_starter",
            "Training Bow",
            1,
            ItemKind::Weapon(WeaponStats {
                kind: AttackKind::Ranged,
                damage: 10,
                range: 400.0,
                cooldown: 0.5,
            }),
        );
        add(
            "tunic_leather",
            "Leather Tunic",
            1,
            ItemKind::Armor {
                slot: EquipSlot::Body,
            },
        );
        add(
            "potion_health_small",
            "Small Health Potion",
            20,
            ItemKind::Consumable { heal: 25 },
        );
        add("coin_gold", "Gold Coin", 999, ItemKind::Misc);
        Self { items }
    }

    pub fn get(&self, item_id: &str) -> Option<&ItemDef> {
        self.items.get(item_id)
    }

    pub fn weapon(&self, item_id: &str) -> Option<WeaponStats> {
        match self.items.get(item_id).map(|d| &d.kind) {
            Some(ItemKind::Weapon(stats)) => Some(*stats),
            _ => None,
        }
    }
}

impl Inventory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: vec![None; capacity],
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn slot(&self, index: usize) -> Result<Option<&ItemStack>, ActionError> {
        self.slots
            .get(index)
            .map(Option::as_ref)
            .ok_or(ActionError::InvalidSlot(index))
    }

    /// Tops up stacks of the same item, then fills empty slots. Either the
    /// whole quantity fits or nothing changes.
    pub fn add_item(
        &mut self,
        registry: &ItemRegistry,
        item_id: &str,
        quantity: u32,
    ) -> Result<(), ActionError> {
        let def = registry
            .get(item_id)
            .ok_or_else(|| ActionError::UnknownItem(item_id.to_string()))?;
        let max_stack = def.max_stack.max(1);

        let room: u64 = self
            .slots
            .iter()
            .map(|slot| match slot {
                Some(stack) if stack.item_id == item_id => {
                    u64::from(max_stack.saturating_sub(stack.quantity))
                }
                Some(_) => 0,
                None => u64::from(max_stack),
            })
            .sum();
        if room < u64::from(quantity) {
            return Err(ActionError::InventoryFull);
        }

        let mut remaining = quantity;
        for stack in self.slots.iter_mut().flatten() {
            if remaining == 0 {
                break;
            }
            if stack.item_id == item_id && stack.quantity < max_stack {
                let moved = (max_stack - stack.quantity).min(remaining);
                stack.quantity += moved;
                remaining -= moved;
            }
        }
        for slot in self.slots.iter_mut() {
            if remaining == 0 {
                break;
            }
            if slot.is_none() {
                let moved = remaining.min(max_stack);
                *slot = Some(ItemStack {
                    item_id: item_id.to_string(),
                    quantity: moved,
                });
                remaining -= moved;
            }
        }
        Ok(())
    }

    /// Removes `quantity` units from one slot and returns them.
    pub fn remove_from_slot(
        &mut self,
        index: usize,
        quantity: u32,
    ) -> Result<ItemStack, ActionError> {
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(ActionError::InvalidSlot(index))?;
        let stack = slot.as_mut().ok_or(ActionError::EmptySlot(index))?;
        let taken = quantity.min(stack.quantity);
        stack.quantity -= taken;
        let item_id = stack.item_id.clone();
        if stack.quantity == 0 {
            *slot = None;
        }
        Ok(ItemStack {
            item_id,
            quantity: taken,
        })
    }

    pub fn clear_slot(&mut self, index: usize) -> Result<ItemStack, ActionError> {
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(ActionError::InvalidSlot(index))?;
        slot.take().ok_or(ActionError::EmptySlot(index))
    }

    pub fn swap_slots(&mut self, a: usize, b: usize) -> Result<(), ActionError> {
        for index in [a, b] {
            if index >= self.slots.len() {
                return Err(ActionError::InvalidSlot(index));
            }
        }
        self.slots.swap(a, b);
        Ok(())
    }

    pub fn find_item(&self, item_id: &str) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.as_ref().is_some_and(|stack| stack.item_id == item_id))
    }

    pub fn count_item(&self, item_id: &str) -> u32 {
        self.slots
            .iter()
            .flatten()
            .filter(|s| s.item_id == item_id)
            .map(|s| s.quantity)
            .sum()
    }
}

impl Equipment {
    pub fn get(&self, slot: EquipSlot) -> Option<&str> {
        self.slots[slot.index()].as_deref()
    }

    /// Puts `item` in the slot and hands back whatever was there.
    pub fn replace(&mut self, slot: EquipSlot, item: Option<String>) -> Option<String> {
        std::mem::replace(&mut self.slots[slot.index()], item)
    }

    pub fn weapon(&self) -> Option<&str> {
        self.get(EquipSlot::Weapon)
    }
}

impl Hotbar {
    pub fn get(&self, slot: usize) -> Option<&HotbarBinding> {
        self.slots.get(slot).and_then(Option::as_ref)
    }

    pub fn bind(&mut self, slot: usize, binding: Option<HotbarBinding>) -> Result<(), ActionError> {
        let entry = self
            .slots
            .get_mut(slot)
            .ok_or(ActionError::InvalidSlot(slot))?;
        *entry = binding;
        Ok(())
    }

    pub fn swap(&mut self, a: usize, b: usize) -> Result<(), ActionError> {
        for index in [a, b] {
            if index >= HOTBAR_SLOTS {
                return Err(ActionError::InvalidSlot(index));
            }
        }
        self.slots.swap(a, b);
        Ok(())
    }
}

/// Moves one unit from an inventory slot into an equipment slot. Whatever was
/// worn goes back into the freed slot, or anywhere it fits. On error neither
/// argument is modified.
pub fn equip(
    inventory: &mut Inventory,
    equipment: &mut Equipment,
    registry: &ItemRegistry,
    inventory_slot: usize,
    target: EquipSlot,
) -> Result<(), ActionError> {
    let stack = inventory
        .slot(inventory_slot)?
        .ok_or(ActionError::EmptySlot(inventory_slot))?;
    let item_id = stack.item_id.clone();
    let def = registry
        .get(&item_id)
        .ok_or_else(|| ActionError::UnknownItem(item_id.clone()))?;
    let expected = def
        .equip_slot()
        .ok_or_else(|| ActionError::NotEquippable(item_id.clone()))?;
    if expected != target {
        return Err(ActionError::WrongSlot {
            item: item_id,
            expected,
            requested: target,
        });
    }

    let mut next_inventory = inventory.clone();
    let mut next_equipment = equipment.clone();
    next_inventory.remove_from_slot(inventory_slot, 1)?;
    if let Some(previous) = next_equipment.replace(target, Some(item_id)) {
        if next_inventory.slots[inventory_slot].is_none() {
            next_inventory.slots[inventory_slot] = Some(ItemStack {
                item_id: previous,
                quantity: 1,
            });
        } else {
            next_inventory.add_item(registry, &previous, 1)?;
        }
    }

    *inventory = next_inventory;
    *equipment = next_equipment;
    Ok(())
}

/// Returns the worn item to the inventory; refused when it does not fit.
pub fn unequip(
    inventory: &mut Inventory,
    equipment: &mut Equipment,
    registry: &ItemRegistry,
    slot: EquipSlot,
) -> Result<(), ActionError> {
    let item_id = equipment
        .get(slot)
        .ok_or(ActionError::NothingEquipped(slot))?
        .to_string();
    let mut next_inventory = inventory.clone();
    next_inventory.add_item(registry, &item_id, 1)?;
    *inventory = next_inventory;
    equipment.replace(slot, None);
    Ok(())
}

/// Hotbar shortcut: takes the item off if worn, otherwise equips it from the
/// first inventory slot holding it.
pub fn toggle_equip(
    inventory: &mut Inventory,
    equipment: &mut Equipment,
    registry: &ItemRegistry,
    item_id: &str,
) -> Result<(), ActionError> {
    let slot = registry
        .get(item_id)
        .ok_or_else(|| ActionError::UnknownItem(item_id.to_string()))?
        .equip_slot()
        .ok_or_else(|| ActionError::NotEquippable(item_id.to_string()))?;
    if equipment.get(slot) == Some(item_id) {
        return unequip(inventory, equipment, registry, slot);
    }
    let index = inventory
        .find_item(item_id)
        .ok_or_else(|| ActionError::NotCarried(item_id.to_string()))?;
    equip(inventory, equipment, registry, index, slot)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ItemRegistry {
        let mut registry = ItemRegistry::standard();
        registry.items.insert(
            "ring_copper".to_string(),
            ItemDef {
                name: "Copper Ring".to_string(),
                max_stack: 5,
                kind: ItemKind::Armor {
                    slot: EquipSlot::Neck,
                },
            },
        );
        registry
    }

    fn stack(item_id: &str, quantity: u32) -> Option<ItemStack> {
        Some(ItemStack {
            item_id: item_id.to_string(),
            quantity,
        })
    }

    #[test]
    fn add_item_stacks_then_fills_empty_slots() {
        let registry = registry();
        let mut inv = Inventory::with_capacity(3);
        inv.add_item(&registry, "potion_health_small", 15).expect("fits");
        inv.add_item(&registry, "potion_health_small", 10).expect("fits");
        assert_eq!(inv.slots[0], stack("potion_health_small", 20));
        assert_eq!(inv.slots[1], stack("potion_health_small", 5));
        assert_eq!(inv.count_item("potion_health_small"), 25);
    }

    #[test]
    fn add_item_is_all_or_nothing() {
        let registry = registry();
        let mut inv = Inventory::with_capacity(2);
        inv.add_item(&registry, "sword_starter", 1).expect("fits");
        let before = inv.clone();
        assert_eq!(
            inv.add_item(&registry, "bow_starter", 2),
            Err(ActionError::InventoryFull)
        );
        assert_eq!(inv, before);
        assert_eq!(
            inv.add_item(&registry, "mystery", 1),
            Err(ActionError::UnknownItem("mystery".to_string()))
        );
    }

    #[test]
    fn slot_operations_reject_bad_indices() {
        let mut inv = Inventory::with_capacity(2);
        assert_eq!(inv.swap_slots(0, 2), Err(ActionError::InvalidSlot(2)));
        assert_eq!(inv.remove_from_slot(1, 1), Err(ActionError::EmptySlot(1)));
        assert_eq!(inv.clear_slot(5), Err(ActionError::InvalidSlot(5)));
        let mut bar = Hotbar::default();
        assert_eq!(bar.bind(10, None), Err(ActionError::InvalidSlot(10)));
        assert_eq!(bar.swap(3, 11), Err(ActionError::InvalidSlot(11)));
    }

    #[test]
    fn equip_swaps_previous_item_into_freed_slot() {
        let registry = registry();
        let mut inv = Inventory::with_capacity(2);
        inv.slots[1] = stack("bow_starter", 1);
        let mut eq = Equipment::default();
        eq.replace(EquipSlot::Weapon, Some("sword_starter".to_string()));

        equip(&mut inv, &mut eq, &registry, 1, EquipSlot::Weapon).expect("equip bow");
        assert_eq!(eq.weapon(), Some("bow_starter"));
        assert_eq!(inv.slots[1], stack("sword_starter", 1));
    }

    #[test]
    fn equipping_bow_into_body_slot_changes_nothing() {
        let registry = registry();
        let mut inv = Inventory::with_capacity(4);
        inv.slots[0] = stack("bow_starter", 1);
        let mut eq = Equipment::default();
        eq.replace(EquipSlot::Weapon, Some("sword_starter".to_string()));
        let inv_bytes = serde_json::to_vec(&inv).expect("serialize");
        let eq_bytes = serde_json::to_vec(&eq).expect("serialize");

        let result = equip(&mut inv, &mut eq, &registry, 0, EquipSlot::Body);
        assert!(matches!(result, Err(ActionError::WrongSlot { .. })));
        assert_eq!(serde_json::to_vec(&inv).expect("serialize"), inv_bytes);
        assert_eq!(serde_json::to_vec(&eq).expect("serialize"), eq_bytes);
    }

    #[test]
    fn equip_reverts_when_swapped_item_has_nowhere_to_go() {
        let registry = registry();
        let mut inv = Inventory::with_capacity(2);
        inv.slots[0] = stack("ring_copper", 3);
        inv.slots[1] = stack("coin_gold", 10);
        let mut eq = Equipment::default();
        eq.replace(EquipSlot::Neck, Some("tunic_leather".to_string()));
        let (inv_before, eq_before) = (inv.clone(), eq.clone());

        let result = equip(&mut inv, &mut eq, &registry, 0, EquipSlot::Neck);
        assert_eq!(result, Err(ActionError::InventoryFull));
        assert_eq!(inv, inv_before);
        assert_eq!(eq, eq_before);
    }

    #[test]
    fn unequip_needs_room() {
        let registry = registry();
        let mut inv = Inventory::with_capacity(1);
        inv.slots[0] = stack("coin_gold", 1);
        let mut eq = Equipment::default();
        eq.replace(EquipSlot::Body, Some("tunic_leather".to_string()));

        assert_eq!(
            unequip(&mut inv, &mut eq, &registry, EquipSlot::Body),
            Err(ActionError::InventoryFull)
        );
        assert_eq!(eq.get(EquipSlot::Body), Some("tunic_leather"));

        inv.slots[0] = None;
        unequip(&mut inv, &mut eq, &registry, EquipSlot::Body).expect("room now");
        assert_eq!(eq.get(EquipSlot::Body), None);
        assert_eq!(inv.slots[0], stack("tunic_leather", 1));
    }

    #[test]
    fn toggle_equip_round_trips_an_item() {
        let registry = registry();
        let mut inv = Inventory::with_capacity(3);
        inv.slots[2] = stack("tunic_leather", 1);
        let mut eq = Equipment::default();

        toggle_equip(&mut inv, &mut eq, &registry, "tunic_leather").expect("equip");
        assert_eq!(eq.get(EquipSlot::Body), Some("tunic_leather"));
        assert_eq!(inv.count_item("tunic_leather"), 0);

        toggle_equip(&mut inv, &mut eq, &registry, "tunic_leather").expect("unequip");
        assert_eq!(eq.get(EquipSlot::Body), None);
        assert_eq!(inv.count_item("tunic_leather"), 1);

        assert_eq!(
            toggle_equip(&mut inv, &mut eq, &registry, "potion_health_small"),
            Err(ActionError::NotEquippable("potion_health_small".to_string()))
        );
    }
}
