//! Local persistence.
//!
//! The sky is saved as a JSON array of `{id, text, x, y, color, createdAt}`
//! records. Velocity is deliberately not stored: restored comets start
//! stationary and only move again once drifting scatters them.

use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    comet::{Comet, CometColor, CometId},
    math::Vec2,
};

/// One saved comet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CometRecord {
    pub id: CometId,
    pub text: String,
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub color: Option<CometColor>,
    pub created_at: DateTime<Utc>,
}

impl From<&Comet> for CometRecord {
    fn from(c: &Comet) -> Self {
        Self {
            id: c.id,
            text: c.text.clone(),
            x: c.position.x,
            y: c.position.y,
            color: c.color,
            created_at: c.created_at,
        }
    }
}

impl CometRecord {
    /// Rebuilds a comet at rest.
    pub fn into_comet(self) -> Comet {
        Comet {
            id: self.id,
            text: self.text,
            position: Vec2::new(self.x, self.y),
            velocity: Vec2::ZERO,
            created_at: self.created_at,
            color: self.color,
        }
    }
}

/// Snapshot of the list in saved form, order preserved.
pub fn to_records(comets: &[Comet]) -> Vec<CometRecord> {
    comets.iter().map(CometRecord::from).collect()
}

pub fn encode_records(records: &[CometRecord]) -> anyhow::Result<String> {
    serde_json::to_string_pretty(records).context("serialize comet records")
}

pub fn decode_records(text: &str) -> anyhow::Result<Vec<CometRecord>> {
    serde_json::from_str(text).context("parse comet records")
}

/// Writes `records` to `path`, creating parent directories as needed.
pub fn save_records<P: AsRef<Path>>(path: P, records: &[CometRecord]) -> anyhow::Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create store directory {}", parent.display()))?;
    }
    let text = encode_records(records)?;
    std::fs::write(path, text).with_context(|| format!("write store {}", path.display()))?;
    info!(path = %path.display(), comets = records.len(), "Sky saved");
    Ok(())
}

/// Reads records from `path`. A missing file is an empty sky.
pub fn load_records<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<CometRecord>> {
    let path = path.as_ref();
    if !path.exists() {
        debug!(path = %path.display(), "No saved sky, starting empty");
        return Ok(Vec::new());
    }
    let text =
        std::fs::read_to_string(path).with_context(|| format!("read store {}", path.display()))?;
    let records = decode_records(&text).with_context(|| format!("load store {}", path.display()))?;
    info!(path = %path.display(), comets = records.len(), "Sky loaded");
    Ok(records)
}
