//! Comet model.
//!
//! A comet is one captured idea: a short label floating somewhere on the sky.
//! Only `position` and `velocity` matter to the simulation; the rest is
//! carried along for display and ordering.

use anyhow::bail;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::math::Vec2;

/// Opaque comet id, stable for the comet's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CometId(pub Uuid);

impl CometId {
    pub fn new_random() -> Self {
        CometId(Uuid::new_v4())
    }

    /// True when the hyphenated form starts with `prefix` (case-insensitive).
    pub fn matches_prefix(&self, prefix: &str) -> bool {
        !prefix.is_empty()
            && self
                .0
                .hyphenated()
                .to_string()
                .starts_with(&prefix.to_ascii_lowercase())
    }

    /// First eight hex digits, enough to address a comet from the console.
    pub fn short(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }
}

impl std::fmt::Display for CometId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

/// Display tag. Has no effect on motion or constellation lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CometColor {
    White,
    Blue,
    Purple,
    Pink,
    Amber,
    Green,
}

impl CometColor {
    pub const ALL: [CometColor; 6] = [
        CometColor::White,
        CometColor::Blue,
        CometColor::Purple,
        CometColor::Pink,
        CometColor::Amber,
        CometColor::Green,
    ];

    pub fn name(self) -> &'static str {
        match self {
            CometColor::White => "white",
            CometColor::Blue => "blue",
            CometColor::Purple => "purple",
            CometColor::Pink => "pink",
            CometColor::Amber => "amber",
            CometColor::Green => "green",
        }
    }

    /// Label color as `#rrggbb`.
    pub fn hex(self) -> &'static str {
        match self {
            CometColor::White => "#e2e8f0",
            CometColor::Blue => "#93c5fd",
            CometColor::Purple => "#c4b5fd",
            CometColor::Pink => "#f9a8d4",
            CometColor::Amber => "#fcd34d",
            CometColor::Green => "#86efac",
        }
    }

    /// Halo color: the label color at 1/8 alpha, as `#rrggbbaa`.
    pub fn glow_hex(self) -> String {
        format!("{}20", self.hex())
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|c| c.name().eq_ignore_ascii_case(name.trim()))
    }
}

/// A single idea on the sky.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comet {
    pub id: CometId,
    pub text: String,
    pub position: Vec2,
    /// Pixels per frame. Zero means the comet is not simulated.
    #[serde(default)]
    pub velocity: Vec2,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub color: Option<CometColor>,
}

impl Comet {
    /// Creates a comet stamped with the current time.
    ///
    /// Fails when `text` is empty after trimming.
    pub fn new(text: &str, position: Vec2, velocity: Vec2) -> anyhow::Result<Self> {
        Ok(Self {
            id: CometId::new_random(),
            text: normalize_text(text)?,
            position,
            velocity,
            created_at: Utc::now(),
            color: None,
        })
    }

    pub fn with_color(mut self, color: Option<CometColor>) -> Self {
        self.color = color;
        self
    }

    pub fn is_stationary(&self) -> bool {
        self.velocity.is_zero()
    }

    /// Replaces the label. The old label is kept when `text` is blank.
    pub fn set_text(&mut self, text: &str) -> anyhow::Result<()> {
        self.text = normalize_text(text)?;
        Ok(())
    }
}

/// Trims a label and rejects it if nothing is left.
pub fn normalize_text(text: &str) -> anyhow::Result<String> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        bail!("comet text cannot be empty");
    }
    Ok(trimmed.to_string())
}
