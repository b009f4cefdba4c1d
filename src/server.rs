use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use tokio::sync::{broadcast, oneshot};

use crate::actions::Action;
use crate::components::Input;
use crate::ecs::Entity;
use crate::error::ServerError;
use crate::persistence::{PlayerProfile, ProfileStore};
use crate::simulation::Simulation;
use crate::snapshot::WorldSnapshot;

/// Everything a connection can ask of the tick loop.
pub enum ServerCommand {
    Join {
        username: String,
        reply: oneshot::Sender<Result<Entity, ServerError>>,
    },
    Intent {
        entity: Entity,
        input: Input,
    },
    Action {
        entity: Entity,
        action: Action,
    },
    Leave {
        entity: Entity,
    },
    Shutdown,
}

/// Single writer of the simulation. Commands queue up between ticks and are
/// applied in arrival order at the start of the next one.
pub struct GameServer {
    sim: Simulation,
    commands: Receiver<ServerCommand>,
    sender: Sender<ServerCommand>,
    snapshots: broadcast::Sender<Arc<WorldSnapshot>>,
    sessions: HashMap<Entity, String>,
    store: Arc<dyn ProfileStore>,
    started: Instant,
    running: bool,
}

impl GameServer {
    pub fn new(sim: Simulation, store: Arc<dyn ProfileStore>) -> Self {
        let (sender, commands) = crossbeam_channel::unbounded();
        let (snapshots, _) = broadcast::channel(sim.config.snapshot_buffer.max(1));
        Self {
            sim,
            commands,
            sender,
            snapshots,
            sessions: HashMap::new(),
            store,
            started: Instant::now(),
            running: true,
        }
    }

    pub fn handle(&self) -> ServerHandle {
        ServerHandle {
            sender: self.sender.clone(),
            snapshots: self.snapshots.clone(),
        }
    }

    pub fn simulation(&self) -> &Simulation {
        &self.sim
    }

    pub fn connected(&self) -> usize {
        self.sessions.len()
    }

    /// Applies queued commands, steps once and broadcasts the result. Returns
    /// false once a shutdown has been processed.
    pub fn tick(&mut self, now: f64) -> bool {
        self.drain_commands(now);
        if !self.running {
            return false;
        }
        self.sim.step(now);
        for event in self.sim.drain_events() {
            tracing::debug!(
                tick = event.tick,
                source = %event.source,
                kind = ?event.kind,
                "game event"
            );
        }
        // No subscribers is not an error.
        let _ = self.snapshots.send(Arc::new(self.sim.snapshot()));
        true
    }

    /// Fixed-rate loop until shutdown. Late ticks are caught up, never skipped.
    pub async fn run(mut self) {
        let period = Duration::from_secs_f32(self.sim.config.dt());
        let mut interval = tokio::time::interval(period);
        tracing::info!(tick_hz = self.sim.config.tick_hz, "tick loop started");
        loop {
            interval.tick().await;
            let now = self.started.elapsed().as_secs_f64();
            if !self.tick(now) {
                break;
            }
        }
        tracing::info!(ticks = self.sim.tick(), "tick loop stopped");
    }

    fn drain_commands(&mut self, now: f64) {
        while let Ok(command) = self.commands.try_recv() {
            match command {
                ServerCommand::Join { username, reply } => {
                    let result = self.join(username);
                    if reply.send(result).is_err() {
                        tracing::debug!("join requester went away");
                    }
                }
                ServerCommand::Intent { entity, input } => {
                    if self.sessions.contains_key(&entity)
                        && !self.sim.apply_intent(entity, input, now)
                    {
                        tracing::trace!(%entity, "intent ignored while dead");
                    }
                }
                ServerCommand::Action { entity, action } => {
                    if !self.sessions.contains_key(&entity) {
                        continue;
                    }
                    match self.sim.apply_action(entity, &action, now) {
                        Ok(()) if action.persists() => self.save(entity),
                        Ok(()) => {}
                        Err(e) => tracing::debug!(%entity, error = %e, "action rejected"),
                    }
                }
                ServerCommand::Leave { entity } => self.leave(entity),
                ServerCommand::Shutdown => {
                    self.shutdown();
                    return;
                }
            }
        }
    }

    fn join(&mut self, username: String) -> Result<Entity, ServerError> {
        if self.sessions.values().any(|name| *name == username) {
            return Err(ServerError::AlreadyConnected(username));
        }
        let profile = match self.store.load(&username)? {
            Some(profile) => profile,
            None => {
                tracing::info!(player = %username, "no stored profile, using starter kit");
                PlayerProfile::starter(&username, self.sim.atlas.player_spawn())
            }
        };
        let entity = self.sim.join(&profile);
        self.sessions.insert(entity, username);
        Ok(entity)
    }

    fn save(&self, entity: Entity) {
        let Some(profile) = self.sim.capture_profile(entity) else {
            tracing::debug!(%entity, "nothing to save while dead");
            return;
        };
        if let Err(e) = self.store.save(&profile) {
            tracing::warn!(player = %profile.username, error = %e, "failed to save profile");
        }
    }

    fn leave(&mut self, entity: Entity) {
        let Some(username) = self.sessions.remove(&entity) else {
            return;
        };
        self.save(entity);
        self.sim.remove_player(entity);
        tracing::info!(%entity, player = %username, "player left");
    }

    fn shutdown(&mut self) {
        for entity in self.sessions.keys() {
            self.save(*entity);
        }
        self.running = false;
        tracing::info!(players = self.sessions.len(), "shutdown requested, profiles saved");
    }
}

/// Cloneable entry point for connection tasks.
#[derive(Clone)]
pub struct ServerHandle {
    sender: Sender<ServerCommand>,
    snapshots: broadcast::Sender<Arc<WorldSnapshot>>,
}

impl ServerHandle {
    /// Queues a join. The snapshot subscription starts now so the first tick
    /// after the join is not missed.
    pub fn request_join(&self, username: &str) -> Result<PendingJoin, ServerError> {
        let (reply, response) = oneshot::channel();
        let snapshots = self.snapshots.subscribe();
        self.sender
            .send(ServerCommand::Join {
                username: username.to_string(),
                reply,
            })
            .map_err(|_| ServerError::Closed)?;
        Ok(PendingJoin {
            response,
            sender: self.sender.clone(),
            snapshots,
        })
    }

    pub async fn join(&self, username: &str) -> Result<Connection, ServerError> {
        self.request_join(username)?.accept().await
    }

    pub fn shutdown(&self) -> Result<(), ServerError> {
        self.sender
            .send(ServerCommand::Shutdown)
            .map_err(|_| ServerError::Closed)
    }
}

pub struct PendingJoin {
    response: oneshot::Receiver<Result<Entity, ServerError>>,
    sender: Sender<ServerCommand>,
    snapshots: broadcast::Receiver<Arc<WorldSnapshot>>,
}

impl PendingJoin {
    pub async fn accept(self) -> Result<Connection, ServerError> {
        let entity = self.response.await.map_err(|_| ServerError::Closed)??;
        Ok(Connection {
            entity,
            sender: self.sender,
            snapshots: self.snapshots,
        })
    }
}

/// One player's session. Dropping it leaves the world.
pub struct Connection {
    entity: Entity,
    sender: Sender<ServerCommand>,
    snapshots: broadcast::Receiver<Arc<WorldSnapshot>>,
}

impl Connection {
    pub fn entity(&self) -> Entity {
        self.entity
    }

    /// Replaces the player's intent from the next tick on.
    pub fn send_intent(&self, input: Input) -> Result<(), ServerError> {
        self.send(ServerCommand::Intent {
            entity: self.entity,
            input,
        })
    }

    pub fn send_action(&self, action: Action) -> Result<(), ServerError> {
        self.send(ServerCommand::Action {
            entity: self.entity,
            action,
        })
    }

    /// Next broadcast snapshot. A lagging connection skips to the oldest one
    /// still buffered.
    pub async fn next_snapshot(&mut self) -> Result<Arc<WorldSnapshot>, ServerError> {
        loop {
            match self.snapshots.recv().await {
                Ok(snapshot) => return Ok(snapshot),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(entity = %self.entity, skipped, "connection lagging");
                }
                Err(broadcast::error::RecvError::Closed) => return Err(ServerError::Closed),
            }
        }
    }

    fn send(&self, command: ServerCommand) -> Result<(), ServerError> {
        self.sender.send(command).map_err(|_| ServerError::Closed)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        let _ = self.sender.send(ServerCommand::Leave {
            entity: self.entity,
        });
    }
}
