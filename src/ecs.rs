//! Sparse per-kind component tables keyed by entity id.
//!
//! Every component kind has its own typed map. Reads hand out detached copies;
//! changes only become visible through an explicit [`World::set`].

use std::collections::{HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::components::{
    Ai, Attack, Equipment, Hotbar, Input, Inventory, Physics, Player, Projectile, Respawn,
    Spellbook, Sprite, Stats, Transform, UiState,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Entity(pub u64);

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A component type with a dedicated table in the [`World`].
pub trait Component: Clone + Into<ComponentValue> {
    const KIND: ComponentKind;

    #[doc(hidden)]
    fn table(tables: &ComponentTables) -> &HashMap<Entity, Self>;
    #[doc(hidden)]
    fn table_mut(tables: &mut ComponentTables) -> &mut HashMap<Entity, Self>;
}

macro_rules! component_tables {
    ($($ty:ident => $field:ident),* $(,)?) => {
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
        pub enum ComponentKind {
            $($ty),*
        }

        impl ComponentKind {
            pub const ALL: &'static [ComponentKind] = &[$(ComponentKind::$ty),*];
        }

        #[derive(Clone, Debug, PartialEq)]
        pub enum ComponentValue {
            $($ty($ty)),*
        }

        impl ComponentValue {
            pub fn kind(&self) -> ComponentKind {
                match self {
                    $(ComponentValue::$ty(_) => ComponentKind::$ty),*
                }
            }
        }

        #[derive(Clone, Default)]
        pub struct ComponentTables {
            $($field: HashMap<Entity, $ty>),*
        }

        impl ComponentTables {
            fn remove_all(&mut self, entity: Entity) {
                $(self.$field.remove(&entity);)*
            }

            fn remove_kind(&mut self, entity: Entity, kind: ComponentKind) -> bool {
                match kind {
                    $(ComponentKind::$ty => self.$field.remove(&entity).is_some()),*
                }
            }

            fn contains(&self, entity: Entity, kind: ComponentKind) -> bool {
                match kind {
                    $(ComponentKind::$ty => self.$field.contains_key(&entity)),*
                }
            }

            fn holders(&self, kind: ComponentKind) -> Vec<Entity> {
                match kind {
                    $(ComponentKind::$ty => self.$field.keys().copied().collect()),*
                }
            }

            fn value(&self, entity: Entity, kind: ComponentKind) -> Option<ComponentValue> {
                match kind {
                    $(ComponentKind::$ty => self.$field.get(&entity).cloned().map(ComponentValue::$ty)),*
                }
            }

            fn insert_value(&mut self, entity: Entity, value: ComponentValue) {
                match value {
                    $(ComponentValue::$ty(v) => {
                        self.$field.insert(entity, v);
                    })*
                }
            }
        }

        $(
            impl Component for $ty {
                const KIND: ComponentKind = ComponentKind::$ty;

                fn table(tables: &ComponentTables) -> &HashMap<Entity, Self> {
                    &tables.$field
                }

                fn table_mut(tables: &mut ComponentTables) -> &mut HashMap<Entity, Self> {
                    &mut tables.$field
                }
            }

            impl From<$ty> for ComponentValue {
                fn from(value: $ty) -> Self {
                    ComponentValue::$ty(value)
                }
            }
        )*
    };
}

component_tables! {
    Transform => transforms,
    Physics => physics,
    Sprite => sprites,
    Stats => stats,
    Input => inputs,
    Attack => attacks,
    Projectile => projectiles,
    Ai => ais,
    Respawn => respawns,
    Inventory => inventories,
    Equipment => equipment,
    Hotbar => hotbars,
    Spellbook => spellbooks,
    Player => players,
    UiState => ui_states,
}

/// Owns every component. Entities are ids handed out by [`World::create`];
/// writes to ids that were never created or were destroyed are ignored.
#[derive(Clone)]
pub struct World {
    next_id: u64,
    live: HashSet<Entity>,
    tables: ComponentTables,
}

impl Default for World {
    fn default() -> Self {
        Self {
            next_id: 1,
            live: HashSet::new(),
            tables: ComponentTables::default(),
        }
    }
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create(&mut self) -> Entity {
        let entity = Entity(self.next_id);
        self.next_id += 1;
        self.live.insert(entity);
        entity
    }

    /// Removes the entity from every table.
    pub fn destroy(&mut self, entity: Entity) {
        self.tables.remove_all(entity);
        self.live.remove(&entity);
    }

    pub fn is_live(&self, entity: Entity) -> bool {
        self.live.contains(&entity)
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Commits a component value, replacing any previous value of its kind.
    /// Returns false when the entity is not live.
    pub fn set<C: Component>(&mut self, entity: Entity, component: C) -> bool {
        if !self.live.contains(&entity) {
            tracing::trace!(%entity, kind = ?C::KIND, "ignoring write to dead entity");
            return false;
        }
        C::table_mut(&mut self.tables).insert(entity, component);
        true
    }

    pub fn set_value(&mut self, entity: Entity, value: ComponentValue) -> bool {
        if !self.live.contains(&entity) {
            return false;
        }
        self.tables.insert_value(entity, value);
        true
    }

    pub fn remove(&mut self, entity: Entity, kind: ComponentKind) -> bool {
        self.tables.remove_kind(entity, kind)
    }

    /// Detached copy of the component, if present.
    pub fn get<C: Component>(&self, entity: Entity) -> Option<C> {
        C::table(&self.tables).get(&entity).cloned()
    }

    pub fn get_value(&self, entity: Entity, kind: ComponentKind) -> Option<ComponentValue> {
        self.tables.value(entity, kind)
    }

    pub fn has(&self, entity: Entity, kind: ComponentKind) -> bool {
        self.tables.contains(entity, kind)
    }

    /// Every entity holding `kind`, in ascending id order.
    pub fn query(&self, kind: ComponentKind) -> Vec<Entity> {
        let mut entities = self.tables.holders(kind);
        entities.sort_unstable();
        entities
    }
}
