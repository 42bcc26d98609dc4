//! Motion engine.
//!
//! Kinematic only: constant velocity, toroidal wrap at the viewport edge, and
//! velocity injected from drag gestures. There is no mass, damping, or
//! collision.
//!
//! `advance` is pure. It reads a snapshot and returns the next one; the caller
//! owns the canonical list and writes the result back.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::{
    comet::Comet,
    math::{Vec2, Viewport},
};

/// Whether comets are being simulated at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SimMode {
    /// Nothing moves, whatever the stored velocities are.
    Pinned,
    #[default]
    Drifting,
}

impl SimMode {
    pub fn from_flag(drifting: bool) -> Self {
        if drifting {
            SimMode::Drifting
        } else {
            SimMode::Pinned
        }
    }

    pub fn is_drifting(self) -> bool {
        self == SimMode::Drifting
    }
}

/// What switching to `Pinned` does to stored velocities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PinPolicy {
    /// Velocities are kept and resume when drifting is switched back on.
    #[default]
    Freeze,
    /// Velocities are zeroed, so every comet is re-scattered on resume.
    Clear,
}

/// Motion parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionConfig {
    /// How far past the edge a comet travels before reappearing opposite.
    pub wrap_margin: f32,
    /// Multiplier from gesture release speed (px/s) to drift (px/frame).
    pub gesture_scale: f32,
    /// Per-axis bound on injected velocity.
    pub max_injected_speed: f32,
    /// Per-axis bound on velocity assigned when drifting starts.
    pub drift_speed: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            wrap_margin: 50.0,
            gesture_scale: 0.003,
            max_injected_speed: 1.0,
            drift_speed: 0.25,
        }
    }
}

/// Motion stepper trait.
pub trait MotionBackend: Send + Sync {
    fn advance(&self, comets: &[Comet], viewport: Viewport, mode: SimMode) -> Vec<Comet>;
}

/// Uniform drift with screen wrap.
#[derive(Debug, Clone, Copy, Default)]
pub struct DriftMotion {
    pub cfg: MotionConfig,
}

impl DriftMotion {
    pub fn new(cfg: MotionConfig) -> Self {
        Self { cfg }
    }

    /// Converts a gesture's release speed into a persistent drift velocity.
    pub fn release_velocity(&self, release: Vec2) -> Vec2 {
        release_velocity(release, &self.cfg)
    }

    /// Gives every stationary comet a fresh random drift.
    pub fn scatter_stationary<R: Rng>(&self, comets: &[Comet], rng: &mut R) -> Vec<Comet> {
        scatter_stationary(comets, self.cfg.drift_speed, rng)
    }
}

impl MotionBackend for DriftMotion {
    fn advance(&self, comets: &[Comet], viewport: Viewport, mode: SimMode) -> Vec<Comet> {
        advance_with(comets, viewport, mode, self.cfg.wrap_margin)
    }
}

/// Never moves anything. Useful for headless tests and paused previews.
#[derive(Debug, Default)]
pub struct FrozenMotion;

impl MotionBackend for FrozenMotion {
    fn advance(&self, comets: &[Comet], _viewport: Viewport, _mode: SimMode) -> Vec<Comet> {
        comets.to_vec()
    }
}

/// One frame of motion with the default 50px wrap margin.
pub fn advance(comets: &[Comet], viewport: Viewport, mode: SimMode) -> Vec<Comet> {
    advance_with(comets, viewport, mode, MotionConfig::default().wrap_margin)
}

/// One frame of motion.
///
/// Stationary comets, and every comet while `mode` is `Pinned`, come back
/// unchanged. Velocity is never modified here.
pub fn advance_with(comets: &[Comet], viewport: Viewport, mode: SimMode, margin: f32) -> Vec<Comet> {
    if !mode.is_drifting() {
        return comets.to_vec();
    }

    comets
        .iter()
        .map(|c| {
            if c.is_stationary() {
                return c.clone();
            }
            let next = c.position + c.velocity;
            Comet {
                position: Vec2::new(
                    wrap_axis(next.x, viewport.width, margin),
                    wrap_axis(next.y, viewport.height, margin),
                ),
                ..c.clone()
            }
        })
        .collect()
}

/// Wraps one coordinate to the far side once it is `margin` past an edge.
///
/// Both checks run in sequence; with a sane extent at most one of them fires.
pub fn wrap_axis(value: f32, extent: f32, margin: f32) -> f32 {
    let mut v = value;
    if v < -margin {
        v = extent + margin;
    }
    if v > extent + margin {
        v = -margin;
    }
    v
}

/// `clamp(release * gesture_scale, -max, max)` on each axis.
pub fn release_velocity(release: Vec2, cfg: &MotionConfig) -> Vec2 {
    release
        .scale(cfg.gesture_scale)
        .clamp_axes(cfg.max_injected_speed)
}

/// Random velocity in `[-speed, speed]` per axis, never exactly zero.
pub fn random_drift<R: Rng>(rng: &mut R, speed: f32) -> Vec2 {
    if speed <= 0.0 {
        return Vec2::ZERO;
    }
    loop {
        let v = Vec2::new(rng.gen_range(-speed..=speed), rng.gen_range(-speed..=speed));
        if !v.is_zero() {
            return v;
        }
    }
}

/// Assigns `random_drift(speed)` to each stationary comet; movers keep theirs.
pub fn scatter_stationary<R: Rng>(comets: &[Comet], speed: f32, rng: &mut R) -> Vec<Comet> {
    comets
        .iter()
        .map(|c| {
            if c.is_stationary() {
                Comet {
                    velocity: random_drift(rng, speed),
                    ..c.clone()
                }
            } else {
                c.clone()
            }
        })
        .collect()
}
