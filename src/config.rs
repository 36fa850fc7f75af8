//! Tunable game constants.
//!
//! Every number the movement, camera and physics code depends on lives here
//! so a host can override it from JSON. Missing fields fall back to the
//! values the Howling Abyss map was tuned with.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::{GameError, Result};

/// Converts the stored "units per millisecond" movement speed into the
/// physics engine's units per second.
pub const VELOCITY_SCALE: f32 = 1000.0;

/// Global multiplier on animation playback; the champion clips were authored
/// slightly fast for the run speed used here.
pub const ANIMATION_TIME_SCALE: f32 = 0.85;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// World units moved per tick while edge-panning
    pub speed: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,
    pub zoom_step: f32,
    /// Slack above `min_zoom` below which zooming out is refused
    pub zoom_dead_zone: f32,
    /// Forward (z) offset from the player while the camera is locked
    pub lock_offset: f32,
    pub initial_position: Vec3,
    pub pitch_degrees: f32,
    pub fov_degrees: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            speed: 0.125,
            min_zoom: 1.85,
            max_zoom: 4.0,
            zoom_step: 0.2,
            zoom_dead_zone: 0.1,
            lock_offset: 5.0,
            initial_position: Vec3::new(0.0, 8.0, 5.0),
            pitch_degrees: -56.75,
            fov_degrees: 80.0,
            z_near: 0.1,
            z_far: 1000.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PointerConfig {
    /// Multiplier on raw pointer-lock movement
    pub speed: f32,
    /// Distance in pixels from the capture region's border that counts as "at edge"
    pub edge_threshold: f32,
}

impl Default for PointerConfig {
    fn default() -> Self {
        Self {
            speed: 1.3,
            edge_threshold: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// Units per millisecond, scaled by [`VELOCITY_SCALE`] before reaching the body
    pub movement_speed: f32,
    pub arrival_threshold: f32,
    pub collider_radius: f32,
    pub mass: f32,
    pub spawn: Vec3,
    /// Height given to click targets so the model stays clear of the surface
    pub target_height: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            movement_speed: 0.0017,
            arrival_threshold: 0.4,
            collider_radius: 0.5,
            mass: 1.0,
            spawn: Vec3::new(0.0, 0.5, 0.0),
            target_height: 0.08,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub fixed_dt: f32,
    pub max_sub_steps: u32,
    pub gravity: f32,
    pub friction: f32,
    pub restitution: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            fixed_dt: 1.0 / 60.0,
            max_sub_steps: 10,
            gravity: -9.82,
            friction: 1.0,
            restitution: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnimationConfig {
    pub time_scale: f32,
    pub cross_fade: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            time_scale: ANIMATION_TIME_SCALE,
            cross_fade: 0.2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    pub snow_particles: usize,
    pub fall_speed: f32,
    pub max_drift: f32,
    pub ceiling: f32,
    pub seed: u64,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            snow_particles: 3500,
            fall_speed: 0.005,
            max_drift: 0.005,
            ceiling: 8.0,
            seed: 0x5a0e,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    pub ambience: String,
    pub ambience_volume: f32,
    pub soundtrack: String,
    pub soundtrack_volume: f32,
    pub muted: bool,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            ambience: "/assets/sounds/ambience.mp3".to_string(),
            ambience_volume: 0.25,
            soundtrack: "/assets/sounds/soundtrack.mp3".to_string(),
            soundtrack_volume: 0.09,
            muted: false,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub camera: CameraConfig,
    pub pointer: PointerConfig,
    pub player: PlayerConfig,
    pub physics: PhysicsConfig,
    pub animation: AnimationConfig,
    pub weather: WeatherConfig,
    pub audio: AudioConfig,
}

impl GameConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: GameConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn load(path: impl AsRef<std::path::Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> Result<()> {
        if self.camera.min_zoom > self.camera.max_zoom {
            return Err(GameError::InvalidConfig(format!(
                "min_zoom {} exceeds max_zoom {}",
                self.camera.min_zoom, self.camera.max_zoom
            )));
        }
        if self.physics.fixed_dt <= 0.0 {
            return Err(GameError::InvalidConfig("fixed_dt must be positive".into()));
        }
        if self.player.arrival_threshold <= 0.0 {
            return Err(GameError::InvalidConfig("arrival_threshold must be positive".into()));
        }
        Ok(())
    }

    /// Player speed in physics units per second.
    pub fn player_velocity(&self) -> f32 {
        self.player.movement_speed * VELOCITY_SCALE
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = GameConfig::from_json_str(r#"{ "camera": { "speed": 0.5 } }"#).unwrap();
        assert_eq!(config.camera.speed, 0.5);
        assert_eq!(config.camera.min_zoom, 1.85);
        assert_eq!(config.player, PlayerConfig::default());
    }

    #[test]
    fn inverted_zoom_range_is_rejected() {
        let err = GameConfig::from_json_str(r#"{ "camera": { "min_zoom": 5.0 } }"#).unwrap_err();
        assert!(matches!(err, GameError::InvalidConfig(_)));
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        assert!(matches!(
            GameConfig::from_json_str("{ camera"),
            Err(GameError::Config(_))
        ));
    }

    #[test]
    fn default_player_velocity() {
        let v = GameConfig::default().player_velocity();
        assert!((v - 1.7).abs() < 1e-5);
    }
}
