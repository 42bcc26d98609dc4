//! Configuration system.
//!
//! Loads sky configuration from JSON strings/files. Every field is optional
//! in the file and falls back to its default.

use std::path::Path;

use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};

use crate::{
    constellation::DEFAULT_THRESHOLD,
    math::Viewport,
    motion::{MotionConfig, PinPolicy, SimMode},
};

/// Root configuration for the sky and its runner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkyConfig {
    /// Frame rate of the animation loop.
    pub tick_hz: u32,
    pub viewport_width: f32,
    pub viewport_height: f32,
    /// Constellation join distance.
    pub threshold: f32,
    pub wrap_margin: f32,
    pub gesture_scale: f32,
    pub max_injected_speed: f32,
    /// Per-axis speed given to stationary comets when drifting starts.
    pub drift_speed: f32,
    /// Per-axis speed given to comets submitted while drifting.
    pub spawn_speed: f32,
    /// Side of the square around the viewport centre where new comets appear.
    pub spawn_spread: f32,
    pub start_drifting: bool,
    pub pin_policy: PinPolicy,
    /// Where the comet list is saved between runs.
    pub store_path: String,
    pub star_count: usize,
}

impl Default for SkyConfig {
    fn default() -> Self {
        let motion = MotionConfig::default();
        Self {
            tick_hz: 60,
            viewport_width: 1280.0,
            viewport_height: 720.0,
            threshold: DEFAULT_THRESHOLD,
            wrap_margin: motion.wrap_margin,
            gesture_scale: motion.gesture_scale,
            max_injected_speed: motion.max_injected_speed,
            drift_speed: motion.drift_speed,
            spawn_speed: 0.4,
            spawn_spread: 200.0,
            start_drifting: true,
            pin_policy: PinPolicy::Freeze,
            store_path: "comets.json".to_string(),
            star_count: 80,
        }
    }
}

impl SkyConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    /// Reads and parses a JSON config file.
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let cfg = Self::from_json_str(&text)
            .with_context(|| format!("parse config {}", path.display()))?;
        cfg.validate()
            .with_context(|| format!("invalid config {}", path.display()))?;
        Ok(cfg)
    }

    /// Rejects values the sky cannot run with: a non-positive frame rate,
    /// non-finite speeds or scales, and negative spreads or speed bounds.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(self.tick_hz > 0, "tick_hz must be positive");
        ensure!(!self.threshold.is_nan(), "threshold must be a number");
        let finite = [
            ("wrap_margin", self.wrap_margin),
            ("gesture_scale", self.gesture_scale),
            ("max_injected_speed", self.max_injected_speed),
            ("drift_speed", self.drift_speed),
            ("spawn_speed", self.spawn_speed),
            ("spawn_spread", self.spawn_spread),
        ];
        for (name, value) in finite {
            ensure!(value.is_finite(), "{name} must be finite, got {value}");
        }
        ensure!(
            self.max_injected_speed >= 0.0,
            "max_injected_speed must not be negative"
        );
        ensure!(self.spawn_spread >= 0.0, "spawn_spread must not be negative");
        Ok(())
    }

    pub fn viewport(&self) -> Viewport {
        Viewport::new(self.viewport_width, self.viewport_height)
    }

    pub fn motion(&self) -> MotionConfig {
        MotionConfig {
            wrap_margin: self.wrap_margin,
            gesture_scale: self.gesture_scale,
            max_injected_speed: self.max_injected_speed,
            drift_speed: self.drift_speed,
        }
    }

    pub fn initial_mode(&self) -> SimMode {
        SimMode::from_flag(self.start_drifting)
    }
}
