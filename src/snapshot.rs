use serde::Serialize;

use crate::components::{Physics, Sprite, Stats, Transform};
use crate::ecs::{ComponentKind, Entity, World};

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct EntitySnapshot {
    pub id: Entity,
    pub transform: Option<Transform>,
    pub physics: Option<Physics>,
    pub sprite: Option<Sprite>,
    pub stats: Option<Stats>,
}

/// Read-only view of everything drawable after a tick.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub entities: Vec<EntitySnapshot>,
}

impl WorldSnapshot {
    /// Every entity holding a Sprite, ordered by id.
    pub fn capture(world: &World, tick: u64) -> Self {
        let entities = world
            .query(ComponentKind::Sprite)
            .into_iter()
            .map(|id| EntitySnapshot {
                id,
                transform: world.get(id),
                physics: world.get(id),
                sprite: world.get(id),
                stats: world.get(id),
            })
            .collect();
        Self { tick, entities }
    }

    pub fn entity(&self, id: Entity) -> Option<&EntitySnapshot> {
        self.entities.iter().find(|e| e.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_sprited_entities_appear_with_absent_parts_empty() {
        let mut world = World::new();
        let hidden = world.create();
        world.set(hidden, Transform::at(1.0, 2.0, 0));
        let shown = world.create();
        world.set(shown, Sprite::default());
        world.set(shown, Stats::full(10));

        let snapshot = WorldSnapshot::capture(&world, 9);
        assert_eq!(snapshot.tick, 9);
        assert_eq!(snapshot.entities.len(), 1);
        let entry = snapshot.entity(shown).expect("shown");
        assert_eq!(entry.transform, None);
        assert_eq!(entry.stats, Some(Stats::full(10)));
        assert!(snapshot.entity(hidden).is_none());

        let json = serde_json::to_value(&snapshot).expect("json");
        assert!(json["entities"][0]["physics"].is_null());
    }
}
