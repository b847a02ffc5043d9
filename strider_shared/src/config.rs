//! Configuration system.
//!
//! Loads engine and character configuration from JSON strings/files.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Root configuration shared by client/server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Server listen address, e.g. `127.0.0.1:40000`.
    pub server_addr: String,
    /// Fixed simulation (physics) tick rate.
    pub tick_hz: u32,
    /// Variable-rate frame tick target used for animation (client only).
    #[serde(default = "default_frame_hz")]
    pub frame_hz: u32,
    /// Player name (client only).
    #[serde(default = "default_player_name")]
    pub player_name: String,
    /// Tunables for every spawned character.
    #[serde(default)]
    pub controller: ControllerConfig,
}

fn default_frame_hz() -> u32 {
    60
}

fn default_player_name() -> String {
    "Player".to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            server_addr: "127.0.0.1:40000".to_string(),
            tick_hz: 50,
            frame_hz: default_frame_hz(),
            player_name: default_player_name(),
            controller: ControllerConfig::default(),
        }
    }
}

impl EngineConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> anyhow::Result<Self> {
        let cfg: Self = serde_json::from_str(s).context("parse engine config")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reads and parses a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        Self::from_json_str(&text)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.tick_hz == 0 {
            anyhow::bail!("tick_hz must be positive");
        }
        if self.frame_hz == 0 {
            anyhow::bail!("frame_hz must be positive");
        }
        self.controller.validate()
    }

    /// Fixed physics tick length in seconds.
    pub fn fixed_dt(&self) -> f32 {
        1.0 / self.tick_hz as f32
    }
}

/// Per-character tunables. Immutable once a character is constructed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Degrees per second while moving. Carried but unused: facing snaps.
    pub moving_turn_speed: f32,
    /// Degrees per second while standing. Carried but unused: facing snaps.
    pub stationary_turn_speed: f32,
    /// Carried but unused: there is no jump input.
    pub jump_power: f32,
    /// Must lie in `[1, 4]`. Carried but unused.
    pub gravity_multiplier: f32,
    /// Units per second at full input.
    pub move_speed: f32,
    /// Length of the downward ground probe.
    pub ground_check_distance: f32,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            moving_turn_speed: 280.0,
            stationary_turn_speed: 90.0,
            jump_power: 12.0,
            gravity_multiplier: 2.0,
            move_speed: 1.0,
            ground_check_distance: 0.1,
        }
    }
}

impl ControllerConfig {
    pub fn validate(&self) -> anyhow::Result<()> {
        if !(1.0..=4.0).contains(&self.gravity_multiplier) {
            anyhow::bail!(
                "gravity_multiplier {} outside [1, 4]",
                self.gravity_multiplier
            );
        }
        if self.ground_check_distance < 0.0 {
            anyhow::bail!(
                "ground_check_distance {} must not be negative",
                self.ground_check_distance
            );
        }
        if self.move_speed < 0.0 {
            anyhow::bail!("move_speed {} must not be negative", self.move_speed);
        }
        Ok(())
    }
}
