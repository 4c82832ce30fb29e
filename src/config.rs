use std::path::Path;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::physics_core::BodyShape;

pub const CONFIG_ENV: &str = "RECOIL_SIM_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "sim.json";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Sprite-derived body geometry and movement tuning for one actor kind.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActorProfile {
    /// Sprite frame size in sheet pixels.
    pub frame_size: [f32; 2],
    pub scale: f32,
    /// Transparent margins around the body inside a frame: left, right, top, bottom.
    pub padding: [f32; 4],
    /// Cap when moving toward the faced direction.
    pub max_speed: f32,
    /// Cap when moving away from the faced direction.
    pub back_speed: f32,
    pub brake: f32,
    pub life: i32,
    /// Tiles available in the body sprite sheet, as reported by the asset loader.
    pub sheet_tiles: u32,
}

impl ActorProfile {
    pub fn player() -> Self {
        Self {
            frame_size: [67.0, 48.0],
            scale: 2.0,
            padding: [23.0, 25.0, 14.0, 6.0],
            max_speed: 500.0,
            back_speed: 350.0,
            brake: 3.0,
            life: 3,
            sheet_tiles: 28,
        }
    }

    pub fn enemy() -> Self {
        Self {
            frame_size: [43.0, 42.0],
            scale: 2.0,
            padding: [13.0, 13.0, 7.0, 6.0],
            max_speed: 300.0,
            back_speed: 200.0,
            brake: 2.0,
            life: 3,
            sheet_tiles: 25,
        }
    }

    /// Collision box relative to the sprite origin (frame centre).
    pub fn body_shape(&self) -> BodyShape {
        let [fw, fh] = self.frame_size;
        let [left, right, top, bottom] = self.padding;
        let s = self.scale;
        BodyShape {
            offset: Vec2::new(-fw * 0.5 * s + left * s, -fh * 0.5 * s + top * s),
            size: Vec2::new(fw * s - (left + right) * s, fh * s - (top + bottom) * s),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeaponProfile {
    /// Weapon anchor relative to the body, x mirrored by facing.
    pub offset: [f32; 2],
    pub reload: f32,
    /// Distance from the weapon pivot to the muzzle along the aim.
    pub muzzle_distance: f32,
    /// Muzzle rise perpendicular to the aim, scaled by `-facing`.
    pub muzzle_rise: f32,
    /// Random spread applied to each shot, in degrees either side.
    pub spread_deg: f32,
    pub shoot_clip_duration: f32,
    /// Camera shake requested on every shot: duration, strength.
    pub fire_shake: Option<[f32; 2]>,
    pub sheet_tiles: u32,
}

impl WeaponProfile {
    pub fn rifle() -> Self {
        Self {
            offset: [0.0, 18.0],
            reload: 0.1,
            muzzle_distance: 65.0,
            muzzle_rise: 2.0,
            spread_deg: 4.0,
            shoot_clip_duration: 0.1,
            fire_shake: Some([0.05, 2.0]),
            sheet_tiles: 13,
        }
    }

    pub fn carbine() -> Self {
        Self {
            offset: [0.0, 12.0],
            reload: 1.0,
            muzzle_distance: 65.0,
            muzzle_rise: 2.0,
            spread_deg: 0.0,
            shoot_clip_duration: 0.05,
            fire_shake: None,
            sheet_tiles: 13,
        }
    }

    pub fn offset(&self) -> Vec2 {
        Vec2::from(self.offset)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiProfile {
    pub view_distance: f32,
    pub patrol_distance: f32,
    pub patrol_speed: f32,
    /// Extra reach of the ledge probe beyond half the body width.
    pub probe_ahead: f32,
    /// Extra depth of the ledge probe beyond half the body height.
    pub probe_below: f32,
    /// Aim blend rate per second.
    pub aim_rate: f32,
}

impl Default for AiProfile {
    fn default() -> Self {
        Self {
            view_distance: 600.0,
            patrol_distance: 800.0,
            patrol_speed: 150.0,
            probe_ahead: 20.0,
            probe_below: 10.0,
            aim_rate: 12.0,
        }
    }
}

/// Every tunable of the simulation.
#[derive(Resource, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub tile_size: f32,
    pub view_size: [f32; 2],
    /// Upper bound on a single tick's delta.
    pub max_dt: f32,
    pub gravity: f32,
    pub max_fall_speed: f32,
    pub jump_velocity: f32,
    /// Fraction of impulse velocity kept each tick.
    pub impulse_retention: f32,
    pub impulse_epsilon: f32,
    pub ground_probe: f32,
    pub fall_anim_threshold: f32,
    pub damage_feedback: f32,
    pub damage_shake: [f32; 2],
    pub knockback_force: f32,
    pub recoil_force: f32,
    pub projectile_speed: f32,
    pub projectile_coarse_radius: f32,
    pub projectile_hit_radius: f32,
    pub player: ActorProfile,
    pub enemy: ActorProfile,
    pub player_weapon: WeaponProfile,
    pub enemy_weapon: WeaponProfile,
    pub ai: AiProfile,
    pub seed: u64,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            tile_size: 64.0,
            view_size: [1920.0, 1080.0],
            max_dt: 1.0 / 30.0,
            gravity: 1000.0,
            max_fall_speed: 1000.0,
            jump_velocity: 1000.0,
            impulse_retention: 0.8,
            impulse_epsilon: 0.1,
            ground_probe: 1.0,
            fall_anim_threshold: 250.0,
            damage_feedback: 0.2,
            damage_shake: [0.3, 4.0],
            knockback_force: 3000.0,
            recoil_force: 1500.0,
            projectile_speed: 1600.0,
            projectile_coarse_radius: 100.0,
            projectile_hit_radius: 4.0,
            player: ActorProfile::player(),
            enemy: ActorProfile::enemy(),
            player_weapon: WeaponProfile::rifle(),
            enemy_weapon: WeaponProfile::carbine(),
            ai: AiProfile::default(),
            seed: 0x5eed,
        }
    }
}

impl SimConfig {
    pub fn view_size(&self) -> Vec2 {
        Vec2::from(self.view_size)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.tile_size > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "tile_size must be positive, got {}",
                self.tile_size
            )));
        }
        if !(self.max_dt > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "max_dt must be positive, got {}",
                self.max_dt
            )));
        }
        if !(0.0..1.0).contains(&self.impulse_retention) {
            return Err(ConfigError::Invalid(format!(
                "impulse_retention must be in [0, 1), got {}",
                self.impulse_retention
            )));
        }
        Ok(())
    }
}

pub fn parse_sim_config(contents: &str) -> Result<SimConfig, ConfigError> {
    let config: SimConfig = serde_json::from_str(contents)?;
    config.validate()?;
    Ok(config)
}

pub fn read_sim_config(path: &Path) -> Result<SimConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    parse_sim_config(&contents)
}

/// Loads the config named by `RECOIL_SIM_CONFIG` (or `sim.json`). Any
/// problem falls back to defaults.
pub fn load_sim_config() -> SimConfig {
    let path = std::env::var(CONFIG_ENV)
        .ok()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_CONFIG_PATH.to_string());
    match read_sim_config(Path::new(&path)) {
        Ok(config) => {
            info!("[Recoil] Loaded sim config from {}", path);
            config
        }
        Err(ConfigError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("[Recoil] No sim config at {}, using defaults", path);
            SimConfig::default()
        }
        Err(e) => {
            warn!("[Recoil] Ignoring sim config {}: {}", path, e);
            SimConfig::default()
        }
    }
}
