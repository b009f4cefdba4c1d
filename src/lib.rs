//! Authoritative world simulation for a small multiplayer RPG: a component
//! store, tile-grid movement, combat, NPC behavior and a fixed-rate server
//! loop that owns all of it.

pub mod abilities;
pub mod actions;
pub mod ai;
pub mod catalog;
pub mod combat;
pub mod components;
pub mod config;
pub mod ecs;
pub mod error;
pub mod events;
pub mod inventory;
pub mod pathfinding;
pub mod persistence;
pub mod physics;
pub mod physics_core;
pub mod projectile;
pub mod raycast;
pub mod respawn;
pub mod server;
pub mod simulation;
pub mod snapshot;
pub mod spawn;
pub mod tilemap;

pub use config::SimConfig;
pub use ecs::{Entity, World};
pub use server::{Connection, GameServer, ServerHandle};
pub use simulation::Simulation;
