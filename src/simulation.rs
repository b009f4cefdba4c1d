use crate::actions::{self, Action};
use crate::ai::AiEngine;
use crate::catalog::{Catalog, Rules};
use crate::combat;
use crate::components::Input;
use crate::config::SimConfig;
use crate::ecs::{Entity, World};
use crate::error::ActionError;
use crate::events::{GameEvent, GameEventBus};
use crate::persistence::{self, PlayerProfile};
use crate::physics::MovementSystem;
use crate::projectile;
use crate::respawn;
use crate::snapshot::WorldSnapshot;
use crate::spawn;
use crate::tilemap::Atlas;

/// The authoritative world plus everything a tick needs. Only the owner of a
/// `Simulation` mutates it; connections talk to it through the server queue.
pub struct Simulation {
    pub world: World,
    pub atlas: Atlas,
    pub catalog: Catalog,
    pub config: SimConfig,
    pub events: GameEventBus,
    ai: AiEngine,
    movement: MovementSystem,
    tick: u64,
}

impl Simulation {
    pub fn new(atlas: Atlas, catalog: Catalog, config: SimConfig) -> Self {
        Self::build(atlas, catalog, config, AiEngine::from_entropy())
    }

    /// Deterministic wander choices for tests and replays.
    pub fn with_seed(atlas: Atlas, catalog: Catalog, config: SimConfig, seed: u64) -> Self {
        Self::build(atlas, catalog, config, AiEngine::new(seed))
    }

    fn build(atlas: Atlas, catalog: Catalog, config: SimConfig, ai: AiEngine) -> Self {
        let mut world = World::new();
        let npcs = spawn::spawn_level_spawners(&mut world, &atlas, &catalog, &config);
        tracing::info!(levels = atlas.levels().count(), npcs, "world initialized");
        Self {
            world,
            atlas,
            catalog,
            config,
            events: GameEventBus::default(),
            ai,
            movement: MovementSystem::default(),
            tick: 0,
        }
    }

    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Runs one tick. `now` is wall-clock seconds, used for cooldowns.
    pub fn step(&mut self, now: f64) {
        self.tick += 1;
        let Self {
            world,
            atlas,
            catalog,
            config,
            events,
            ai,
            movement,
            tick,
        } = self;
        events.tick = *tick;
        let rules = Rules {
            atlas: &*atlas,
            catalog: &*catalog,
            config: &*config,
        };

        ai.run(world, events, rules);
        respawn::update_respawns(world, events, config.dt());
        movement.run(world, atlas, config);
        combat::resolve_attacks(world, events, rules, now);
        combat::record_player_inputs(world);
        projectile::advance_projectiles(world, events, rules);
    }

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot::capture(&self.world, self.tick)
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        self.events.drain()
    }

    pub fn join(&mut self, profile: &PlayerProfile) -> Entity {
        let entity = spawn::spawn_player(&mut self.world, profile, &self.catalog, &self.config);
        tracing::info!(%entity, player = %profile.username, "player joined");
        entity
    }

    /// Replaces the stored intent and fires hotbar keys pressed since the last
    /// one. Returns false when the entity cannot take intent (dead or gone).
    pub fn apply_intent(&mut self, entity: Entity, input: Input, now: f64) -> bool {
        let Some(previous) = self.world.get::<Input>(entity) else {
            return false;
        };
        let rules = Rules {
            atlas: &self.atlas,
            catalog: &self.catalog,
            config: &self.config,
        };
        actions::apply_hotbar_triggers(
            &mut self.world,
            &mut self.events,
            rules,
            entity,
            &previous,
            &input,
            now,
        );
        self.world.set(entity, input)
    }

    pub fn apply_action(
        &mut self,
        entity: Entity,
        action: &Action,
        now: f64,
    ) -> Result<(), ActionError> {
        let rules = Rules {
            atlas: &self.atlas,
            catalog: &self.catalog,
            config: &self.config,
        };
        actions::apply_action(&mut self.world, &mut self.events, rules, entity, action, now)
    }

    pub fn capture_profile(&self, entity: Entity) -> Option<PlayerProfile> {
        persistence::capture_profile(&self.world, entity)
    }

    pub fn remove_player(&mut self, entity: Entity) {
        self.world.destroy(entity);
    }
}
