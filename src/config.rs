use std::path::Path;

use serde::Deserialize;

use crate::error::ConfigError;

pub const CONFIG_ENV: &str = "TIDEWATCH_CONFIG";

/// Tunables for the simulation. Distances are world units, durations seconds,
/// speeds world units per tick.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub tick_hz: f32,
    pub tile_size: f32,
    /// Collision box side as a fraction of the smaller sprite dimension.
    pub collision_box_scale: f32,
    pub run_multiplier: f32,
    pub facing_hold_secs: f32,
    pub leash_radius: f32,
    pub respawn_secs: f32,
    pub projectile_speed: f32,
    pub projectile_spawn_offset: f32,
    pub projectile_size: f32,
    pub melee_offset: f32,
    pub melee_hitbox_size: f32,
    pub melee_lifetime_ticks: i32,
    pub los_ray_step: f32,
    pub los_ray_spread: f32,
    pub chase_replan_secs: f32,
    pub return_replan_secs: f32,
    pub waypoint_tolerance: f32,
    pub home_tolerance: f32,
    pub settle_secs: f32,
    pub wander_min_secs: f32,
    pub wander_max_secs: f32,
    pub wander_aim_distance: f32,
    pub default_melee_range: f32,
    pub ranged_range_factor: f32,
    pub player_speed: f32,
    pub player_size: f32,
    pub player_max_health: i32,
    pub inventory_capacity: usize,
    pub snapshot_buffer: usize,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tick_hz: 30.0,
            tile_size: 32.0,
            collision_box_scale: 0.75,
            run_multiplier: 2.0,
            facing_hold_secs: 0.3,
            leash_radius: 600.0,
            respawn_secs: 30.0,
            projectile_speed: 10.0,
            projectile_spawn_offset: 16.0,
            projectile_size: 8.0,
            melee_offset: 30.0,
            melee_hitbox_size: 40.0,
            melee_lifetime_ticks: 15,
            los_ray_step: 8.0,
            los_ray_spread: 12.0,
            chase_replan_secs: 0.5,
            return_replan_secs: 1.0,
            waypoint_tolerance: 10.0,
            home_tolerance: 50.0,
            settle_secs: 2.0,
            wander_min_secs: 1.0,
            wander_max_secs: 3.0,
            wander_aim_distance: 100.0,
            default_melee_range: 50.0,
            ranged_range_factor: 0.8,
            player_speed: 6.0,
            player_size: 32.0,
            player_max_health: 100,
            inventory_capacity: 25,
            snapshot_buffer: 16,
        }
    }
}

impl SimConfig {
    /// Seconds per tick.
    pub fn dt(&self) -> f32 {
        1.0 / self.tick_hz.max(1.0)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}

/// Reads the file named by `TIDEWATCH_CONFIG` (or `tidewatch.json`), falling
/// back to defaults when it is missing or malformed.
pub fn load_config() -> SimConfig {
    let path = std::env::var(CONFIG_ENV)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "tidewatch.json".to_string());
    if !Path::new(&path).exists() {
        return SimConfig::default();
    }
    match SimConfig::from_path(&path) {
        Ok(config) => {
            tracing::info!(%path, "loaded simulation config");
            config
        }
        Err(e) => {
            tracing::warn!(%path, error = %e, "failed to load config, using defaults");
            SimConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_config_keeps_defaults() {
        let config: SimConfig =
            serde_json::from_str(r#"{ "leash_radius": 320.0, "tick_hz": 20.0 }"#)
                .expect("config should parse");
        assert_eq!(config.leash_radius, 320.0);
        assert!((config.dt() - 0.05).abs() < 1e-6);
        assert_eq!(config.tile_size, 32.0);
        assert_eq!(config.inventory_capacity, 25);
    }
}
