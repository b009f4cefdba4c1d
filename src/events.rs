use std::collections::VecDeque;

use serde::Serialize;

use crate::components::AttackKind;
use crate::ecs::Entity;

const MAX_EVENTS: usize = 500;

#[derive(Serialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GameEventKind {
    AttackFired { kind: AttackKind },
    AbilityCast { ability: String },
    ProjectileHit {
        target: Entity,
        damage: i32,
        remaining_health: i32,
    },
    Died,
    Respawned,
    Aggro { target: Entity },
    Leashed,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct GameEvent {
    pub tick: u64,
    pub source: Entity,
    #[serde(flatten)]
    pub kind: GameEventKind,
}

#[derive(Default)]
pub struct GameEventBus {
    pub recent: VecDeque<GameEvent>,
    pub tick: u64,
    pub dropped_events: u64,
    last_overflow_log_tick: u64,
}

impl GameEventBus {
    pub fn emit(&mut self, source: Entity, kind: GameEventKind) {
        self.recent.push_back(GameEvent {
            tick: self.tick,
            source,
            kind,
        });
        if self.recent.len() > MAX_EVENTS {
            let excess = self.recent.len() - MAX_EVENTS;
            for _ in 0..excess {
                self.recent.pop_front();
            }
            self.dropped_events = self.dropped_events.saturating_add(excess as u64);
            if self.tick.saturating_sub(self.last_overflow_log_tick) >= 60 {
                self.last_overflow_log_tick = self.tick;
                tracing::warn!(
                    excess,
                    total_dropped = self.dropped_events,
                    "dropped buffered game events"
                );
            }
        }
    }

    pub fn drain(&mut self) -> Vec<GameEvent> {
        self.recent.drain(..).collect()
    }

    pub fn count(&self, predicate: impl Fn(&GameEvent) -> bool) -> usize {
        self.recent.iter().filter(|e| predicate(e)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_bus_tracks_dropped_events() {
        let mut bus = GameEventBus::default();
        for i in 0..(MAX_EVENTS + 25) {
            bus.emit(Entity(i as u64), GameEventKind::Died);
        }
        assert_eq!(bus.recent.len(), MAX_EVENTS);
        assert_eq!(bus.dropped_events, 25);
        assert_eq!(bus.recent.front().map(|e| e.source), Some(Entity(25)));
    }

    #[test]
    fn events_serialize_flat() {
        let event = GameEvent {
            tick: 7,
            source: Entity(3),
            kind: GameEventKind::Aggro { target: Entity(9) },
        };
        let json = serde_json::to_value(&event).expect("serialize");
        assert_eq!(
            json,
            serde_json::json!({ "tick": 7, "source": 3, "type": "aggro", "target": 9 })
        );
    }
}
