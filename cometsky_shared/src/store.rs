//! The sky: canonical owner of the comet list.
//!
//! `CometSky` is the only place the list is mutated. Direct calls
//! (`submit`, `melt`, ...) apply immediately; `queue` defers a `SkyEvent` to
//! the start of the next `tick`, which is how collaborators outside the frame
//! loop should talk to it.
//!
//! Determinism notes:
//! - All randomness comes from one seedable RNG.
//! - Queued events are applied in push order before motion runs.

use anyhow::{bail, Context};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::{
    comet::{normalize_text, Comet, CometColor, CometId},
    config::SkyConfig,
    constellation::{build_lines, Edge},
    event::{EventBus, SkyEvent},
    math::{Vec2, Viewport},
    motion::{random_drift, DriftMotion, MotionBackend, MotionConfig, PinPolicy, SimMode},
    persist::{to_records, CometRecord},
};

pub struct CometSky {
    comets: Vec<Comet>,
    mode: SimMode,
    pin_policy: PinPolicy,
    viewport: Viewport,
    threshold: f32,
    spawn_speed: f32,
    spawn_spread: f32,
    motion: DriftMotion,
    events: EventBus,
    rng: StdRng,
    frame: u64,
}

impl CometSky {
    /// Creates an empty sky seeded from OS entropy.
    pub fn new(cfg: &SkyConfig) -> Self {
        Self::build(cfg, StdRng::from_entropy())
    }

    /// Creates an empty sky with a fixed seed (reproducible spawns and drift).
    pub fn with_seed(cfg: &SkyConfig, seed: u64) -> Self {
        Self::build(cfg, StdRng::seed_from_u64(seed))
    }

    /// Creates a sky from saved records.
    ///
    /// Records come back at rest; if the config starts in drifting mode they
    /// are scattered exactly as a Pinned -> Drifting switch would.
    pub fn restored(cfg: &SkyConfig, records: Vec<CometRecord>) -> Self {
        let mut sky = Self::new(cfg);
        sky.mode = SimMode::Pinned;
        sky.restore(records);
        sky.set_mode(cfg.initial_mode());
        sky
    }

    fn build(cfg: &SkyConfig, rng: StdRng) -> Self {
        Self {
            comets: Vec::new(),
            mode: cfg.initial_mode(),
            pin_policy: cfg.pin_policy,
            viewport: cfg.viewport(),
            threshold: cfg.threshold,
            spawn_speed: cfg.spawn_speed,
            spawn_spread: cfg.spawn_spread,
            motion: DriftMotion::new(cfg.motion()),
            events: EventBus::default(),
            rng,
            frame: 0,
        }
    }

    pub fn comets(&self) -> &[Comet] {
        &self.comets
    }

    pub fn len(&self) -> usize {
        self.comets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comets.is_empty()
    }

    pub fn get(&self, id: CometId) -> Option<&Comet> {
        self.comets.iter().find(|c| c.id == id)
    }

    pub fn mode(&self) -> SimMode {
        self.mode
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    /// Frames simulated so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn set_viewport(&mut self, viewport: Viewport) {
        if viewport != self.viewport {
            debug!(width = viewport.width, height = viewport.height, "Viewport resized");
            self.viewport = viewport;
        }
    }

    pub fn set_threshold(&mut self, threshold: f32) {
        self.threshold = threshold;
    }

    /// Replaces the motion parameters. Takes effect from the next tick and
    /// the next drag release; stored velocities are left alone.
    pub fn set_motion(&mut self, cfg: MotionConfig) {
        self.motion = DriftMotion::new(cfg);
    }

    pub fn motion(&self) -> MotionConfig {
        self.motion.cfg
    }

    pub fn set_spawn_speed(&mut self, speed: f32) {
        self.spawn_speed = speed;
    }

    pub fn spawn_speed(&self) -> f32 {
        self.spawn_speed
    }

    /// Applies to the next Drifting -> Pinned switch.
    pub fn set_pin_policy(&mut self, policy: PinPolicy) {
        self.pin_policy = policy;
    }

    pub fn pin_policy(&self) -> PinPolicy {
        self.pin_policy
    }

    /// Resolves a (possibly abbreviated) id. Errors when nothing or more than
    /// one comet matches.
    pub fn resolve_prefix(&self, prefix: &str) -> anyhow::Result<CometId> {
        let mut matches = self.comets.iter().filter(|c| c.id.matches_prefix(prefix));
        let first = matches
            .next()
            .with_context(|| format!("no comet matches '{prefix}'"))?;
        if matches.next().is_some() {
            bail!("'{prefix}' matches more than one comet");
        }
        Ok(first.id)
    }

    /// Adds a new comet near the middle of the viewport.
    ///
    /// It drifts from the start in drifting mode and sits still otherwise.
    pub fn submit(&mut self, text: &str, color: Option<CometColor>) -> anyhow::Result<CometId> {
        let half = self.spawn_spread / 2.0;
        let center = self.viewport.center();
        let position = Vec2::new(
            center.x + self.rng.gen_range(-half..=half),
            center.y + self.rng.gen_range(-half..=half),
        );
        let velocity = if self.mode.is_drifting() {
            random_drift(&mut self.rng, self.spawn_speed)
        } else {
            Vec2::ZERO
        };

        let comet = Comet::new(text, position, velocity)?.with_color(color);
        let id = comet.id;
        info!(id = %id, x = position.x, y = position.y, "Comet submitted");
        self.comets.push(comet);
        Ok(id)
    }

    /// Removes a comet. Returns it, or `None` if it was already gone.
    pub fn melt(&mut self, id: CometId) -> Option<Comet> {
        let idx = self.comets.iter().position(|c| c.id == id)?;
        let comet = self.comets.remove(idx);
        info!(id = %id, "Comet melted");
        Some(comet)
    }

    /// Replaces a comet's label. `Ok(false)` when the id is unknown.
    pub fn edit_text(&mut self, id: CometId, text: &str) -> anyhow::Result<bool> {
        let Some(comet) = self.comets.iter_mut().find(|c| c.id == id) else {
            return Ok(false);
        };
        comet.set_text(text)?;
        debug!(id = %id, "Comet edited");
        Ok(true)
    }

    /// Finishes a drag: the comet lands at `position` and keeps drifting at a
    /// velocity derived from the release speed (px/s). A still release pins it.
    pub fn release_drag(&mut self, id: CometId, position: Vec2, release_velocity: Vec2) -> bool {
        let velocity = self.motion.release_velocity(release_velocity);
        let Some(comet) = self.comets.iter_mut().find(|c| c.id == id) else {
            return false;
        };
        comet.position = position;
        comet.velocity = velocity;
        debug!(id = %id, vx = velocity.x, vy = velocity.y, "Drag released");
        true
    }

    /// Removes every comet. Returns how many there were.
    pub fn clear(&mut self) -> usize {
        let n = self.comets.len();
        self.comets.clear();
        info!(removed = n, "Sky cleared");
        n
    }

    /// Switches simulation mode.
    ///
    /// Pinned -> Drifting scatters every stationary comet. Drifting -> Pinned
    /// follows the pin policy. Setting the current mode again does nothing.
    pub fn set_mode(&mut self, mode: SimMode) {
        if mode == self.mode {
            return;
        }
        match mode {
            SimMode::Drifting => {
                self.comets = self.motion.scatter_stationary(&self.comets, &mut self.rng);
            }
            SimMode::Pinned => {
                if self.pin_policy == PinPolicy::Clear {
                    for c in &mut self.comets {
                        c.velocity = Vec2::ZERO;
                    }
                }
            }
        }
        self.mode = mode;
        info!(mode = ?mode, policy = ?self.pin_policy, "Mode changed");
    }

    /// Defers a mutation to the start of the next tick.
    pub fn queue(&mut self, event: SkyEvent) {
        self.events.push(event);
    }

    pub fn pending_events(&self) -> usize {
        self.events.pending::<SkyEvent>()
    }

    /// Applies one event now.
    pub fn apply(&mut self, event: SkyEvent) -> anyhow::Result<()> {
        match event {
            SkyEvent::Submitted { text, color } => {
                self.submit(&text, color)?;
            }
            SkyEvent::Edited { id, text } => {
                if !self.edit_text(id, &text)? {
                    debug!(id = %id, "Edit for unknown comet ignored");
                }
            }
            SkyEvent::Melted { id } => {
                self.melt(id);
            }
            SkyEvent::DragReleased {
                id,
                position,
                release_velocity,
            } => {
                self.release_drag(id, position, release_velocity);
            }
            SkyEvent::Cleared => {
                self.clear();
            }
            SkyEvent::ModeChanged(mode) => self.set_mode(mode),
        }
        Ok(())
    }

    /// Runs one frame: drains queued events, then advances every comet.
    ///
    /// A rejected event (e.g. blank text) is logged and skipped; it never
    /// stops the frame.
    pub fn tick(&mut self) -> &[Comet] {
        for event in self.events.drain::<SkyEvent>() {
            if let Err(e) = self.apply(event) {
                warn!(error = %e, "Sky event rejected");
            }
        }
        self.comets = self.motion.advance(&self.comets, self.viewport, self.mode);
        self.frame += 1;
        &self.comets
    }

    /// Constellation for the current positions.
    pub fn lines(&self) -> Vec<Edge> {
        build_lines(&self.comets, self.threshold)
    }

    /// Newest first, for the list view. Ties keep sky order.
    pub fn chronological(&self) -> Vec<&Comet> {
        let mut sorted: Vec<&Comet> = self.comets.iter().collect();
        sorted.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        sorted
    }

    pub fn records(&self) -> Vec<CometRecord> {
        to_records(&self.comets)
    }

    /// Replaces the list with saved records, at rest. Records with blank text
    /// and duplicate ids after the first are dropped. Returns how many comets
    /// were restored.
    pub fn restore(&mut self, records: Vec<CometRecord>) -> usize {
        let mut comets: Vec<Comet> = Vec::with_capacity(records.len());
        for record in records {
            if comets.iter().any(|c| c.id == record.id) {
                warn!(id = %record.id, "Duplicate comet id in saved sky, skipping");
                continue;
            }
            let mut comet = record.into_comet();
            match normalize_text(&comet.text) {
                Ok(text) => comet.text = text,
                Err(e) => {
                    warn!(id = %comet.id, error = %e, "Blank comet in saved sky, skipping");
                    continue;
                }
            }
            comets.push(comet);
        }
        self.comets = comets;
        info!(comets = self.comets.len(), "Sky restored");
        self.comets.len()
    }
}
