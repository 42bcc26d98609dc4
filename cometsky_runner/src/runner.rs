//! Frame loop.
//!
//! Drives one `CometSky` at a fixed refresh rate. Each frame:
//! - Console lines received since the last frame are executed
//! - The sky ticks (queued events, then motion)
//! - The constellation is rebuilt and the frame is handed to the renderer
//!
//! The loop is the only writer of the sky. Other threads talk to it through
//! the console channel, and stop it through the shutdown channel; a stop
//! request simply means the next frame is never run.

use std::{path::PathBuf, time::Duration};

use anyhow::{ensure, Context};
use cometsky_shared::{
    comet::{Comet, CometColor},
    config::SkyConfig,
    console::{parse_command_line, Console},
    constellation::pair_count,
    event::SkyEvent,
    math::{Vec2, Viewport},
    motion::SimMode,
    persist::{load_records, save_records},
    render::{draw_frame, SkyRenderer, TraceRenderer},
    starfield::StarField,
    store::CometSky,
};
use serde::Serialize;
use tokio::{
    sync::{mpsc, watch},
    time::Instant,
};
use tracing::{debug, info, warn};

/// Runner lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Running,
    /// `quit` was issued; the loop exits before the next frame.
    Quitting,
}

/// What happened during one frame.
#[derive(Debug, Clone, Serialize)]
pub struct FrameReport {
    pub frame: u64,
    pub comets: usize,
    pub lines: usize,
    /// Output of console lines executed this frame.
    pub console: Vec<String>,
}

pub struct SkyRunner {
    pub cfg: SkyConfig,
    pub console: Console,
    sky: CometSky,
    stars: StarField,
    renderer: Box<dyn SkyRenderer>,
    store_path: PathBuf,
    state: RunnerState,
    console_rx: Option<mpsc::Receiver<String>>,
}

impl SkyRunner {
    /// Creates a runner, restoring the sky from `cfg.store_path`.
    pub fn new(cfg: SkyConfig) -> anyhow::Result<Self> {
        let records = load_records(&cfg.store_path).context("restore sky")?;
        let sky = CometSky::restored(&cfg, records);
        Self::with_sky(cfg, sky)
    }

    /// Creates a runner around an existing sky; nothing is read from disk.
    pub fn with_sky(cfg: SkyConfig, sky: CometSky) -> anyhow::Result<Self> {
        cfg.validate().context("runner config")?;
        Ok(Self {
            console: Console::for_sky(&cfg),
            stars: StarField::random(cfg.star_count),
            store_path: PathBuf::from(&cfg.store_path),
            cfg,
            sky,
            renderer: Box::new(TraceRenderer::default()),
            state: RunnerState::Running,
            console_rx: None,
        })
    }

    /// Sets the console input receiver.
    pub fn set_console_input(&mut self, rx: mpsc::Receiver<String>) {
        self.console_rx = Some(rx);
    }

    pub fn set_renderer(&mut self, renderer: Box<dyn SkyRenderer>) {
        self.renderer = renderer;
    }

    pub fn sky(&self) -> &CometSky {
        &self.sky
    }

    pub fn sky_mut(&mut self) -> &mut CometSky {
        &mut self.sky
    }

    pub fn stars(&self) -> &StarField {
        &self.stars
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.cfg.tick_hz))
    }

    /// Writes the current sky to the store file.
    pub fn save(&self) -> anyhow::Result<()> {
        save_records(&self.store_path, &self.sky.records())
    }

    /// Runs frames on a fixed schedule until `shutdown` flips to `true`, its
    /// sender is dropped, or `quit` is executed. Returns the frames run.
    pub async fn run<F>(&mut self, mut shutdown: watch::Receiver<bool>, mut on_frame: F) -> anyhow::Result<u64>
    where
        F: FnMut(&FrameReport),
    {
        let interval = self.frame_interval();
        let mut next = Instant::now();
        let mut frames = 0;
        info!(tick_hz = self.cfg.tick_hz, comets = self.sky.len(), "Frame loop started");

        loop {
            if *shutdown.borrow() || self.state == RunnerState::Quitting {
                break;
            }

            let report = self.step()?;
            on_frame(&report);
            frames += 1;

            next += interval;
            tokio::select! {
                _ = tokio::time::sleep_until(next) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        debug!("Shutdown sender dropped");
                        break;
                    }
                }
            }
        }

        info!(frames = frames, "Frame loop stopped");
        Ok(frames)
    }

    /// Runs exactly `frames` frames on the fixed schedule.
    pub async fn run_for_frames(&mut self, frames: u32) -> anyhow::Result<()> {
        let interval = self.frame_interval();
        let mut next = Instant::now();

        for _ in 0..frames {
            next += interval;
            self.step()?;
            tokio::time::sleep_until(next).await;
        }
        Ok(())
    }

    /// Executes one frame.
    pub fn step(&mut self) -> anyhow::Result<FrameReport> {
        let console = self.process_console_commands();

        self.sky.tick();
        let lines = self.sky.lines();
        let frame = self.sky.frame();
        draw_frame(self.renderer.as_mut(), frame, self.sky.comets(), &lines);

        Ok(FrameReport {
            frame,
            comets: self.sky.len(),
            lines: lines.len(),
            console,
        })
    }

    fn process_console_commands(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(rx) = self.console_rx.as_mut() {
            while let Ok(line) = rx.try_recv() {
                lines.push(line);
            }
        }

        let mut output = Vec::new();
        for line in lines {
            match self.exec_console(&line) {
                Ok(out) => output.extend(out),
                Err(e) => {
                    warn!(line = %line, error = %e, "Console command failed");
                    output.push(format!("error: {e:#}"));
                }
            }
        }
        output
    }

    /// Executes a console command.
    ///
    /// `add` and `drift` apply at once, so later lines in the same frame see
    /// their effect. Other sky mutations are queued and take effect on the
    /// next tick, which for lines arriving through the channel is this frame.
    pub fn exec_console(&mut self, line: &str) -> anyhow::Result<Vec<String>> {
        let tokens = parse_command_line(line.trim());
        let Some((cmd, args)) = tokens.split_first() else {
            return Ok(Vec::new());
        };
        let args: Vec<&str> = args.iter().map(String::as_str).collect();

        match cmd.as_str() {
            "add" => {
                let (color, words) = match args.split_first() {
                    Some((first, rest)) if !rest.is_empty() => match CometColor::from_name(first) {
                        Some(color) => (Some(color), rest),
                        None => (None, &args[..]),
                    },
                    _ => (None, &args[..]),
                };
                let id = self.sky.submit(&words.join(" "), color)?;
                Ok(vec![format!("Comet {} launched", id.short())])
            }
            "edit" => {
                let (target, words) = split_target(&args, "edit <id> <text>")?;
                let id = self.sky.resolve_prefix(target)?;
                self.sky.queue(SkyEvent::Edited {
                    id,
                    text: words.join(" "),
                });
                Ok(Vec::new())
            }
            "melt" => {
                let (target, _) = split_target(&args, "melt <id>")?;
                let id = self.sky.resolve_prefix(target)?;
                self.sky.queue(SkyEvent::Melted { id });
                Ok(vec![format!("Comet {} melting", id.short())])
            }
            "fling" => {
                let (target, rest) = split_target(&args, "fling <id> <vx> <vy>")?;
                ensure!(rest.len() == 2, "usage: fling <id> <vx> <vy>");
                let id = self.sky.resolve_prefix(target)?;
                let release = Vec2::new(parse_f32(rest[0])?, parse_f32(rest[1])?);
                let position = self
                    .sky
                    .get(id)
                    .map(|c| c.position)
                    .context("comet vanished")?;
                self.sky.queue(SkyEvent::DragReleased {
                    id,
                    position,
                    release_velocity: release,
                });
                Ok(Vec::new())
            }
            "drift" => {
                let mode = match args.first().copied() {
                    Some("on") => SimMode::Drifting,
                    Some("off") => SimMode::Pinned,
                    None => SimMode::from_flag(!self.sky.mode().is_drifting()),
                    Some(other) => anyhow::bail!("expected on|off, got '{other}'"),
                };
                self.sky.set_mode(mode);
                Ok(vec![format!("Mode: {:?}", mode)])
            }
            "clear" => {
                self.sky.queue(SkyEvent::Cleared);
                Ok(vec![format!("Clearing {} comets", self.sky.len())])
            }
            "size" => {
                ensure!(args.len() == 2, "usage: size <width> <height>");
                let viewport = Viewport::new(parse_f32(args[0])?, parse_f32(args[1])?);
                self.sky.set_viewport(viewport);
                Ok(vec![format!("Viewport {}x{}", viewport.width, viewport.height)])
            }
            "list" => {
                let out = self.sky.chronological().into_iter().map(describe).collect::<Vec<_>>();
                if out.is_empty() {
                    return Ok(vec!["No comets yet".to_string()]);
                }
                Ok(out)
            }
            "lines" => {
                let lines = self.sky.lines();
                let mut out = vec![format!(
                    "{} of {} pairs joined",
                    lines.len(),
                    pair_count(self.sky.len())
                )];
                out.extend(lines.iter().map(|e| {
                    format!("  {} - {} opacity {:.2}", e.a.short(), e.b.short(), e.opacity)
                }));
                Ok(out)
            }
            "dump" => {
                let json = serde_json::to_string(&self.sky.lines()).context("serialize lines")?;
                Ok(vec![json])
            }
            "stars" => Ok(vec![format!("{} stars in the backdrop", self.stars.len())]),
            "save" => {
                self.save()?;
                Ok(vec![format!("Saved {} comets to {}", self.sky.len(), self.store_path.display())])
            }
            "status" => {
                let vp = self.sky.viewport();
                Ok(vec![
                    format!("Mode: {:?}", self.sky.mode()),
                    format!("Frame: {}", self.sky.frame()),
                    format!("Comets: {}", self.sky.len()),
                    format!("Lines: {}", self.sky.lines().len()),
                    format!("Viewport: {}x{}", vp.width, vp.height),
                    format!("Pending events: {}", self.sky.pending_events()),
                ])
            }
            "quit" | "exit" => {
                info!("Runner shutting down");
                self.state = RunnerState::Quitting;
                Ok(Vec::new())
            }
            _ => {
                let out = self.console.exec(line)?;
                self.apply_cvars()?;
                Ok(out)
            }
        }
    }

    /// Writes console cvars into the config and pushes every tunable to the
    /// live sky. A value the config refuses is rolled back in the console.
    fn apply_cvars(&mut self) -> anyhow::Result<()> {
        let mut next = self.cfg.clone();
        self.console.apply_to(&mut next);
        if let Err(e) = next.validate() {
            self.console.sync_from(&self.cfg);
            return Err(e.context("cvar rejected"));
        }
        self.cfg = next;

        self.sky.set_threshold(self.cfg.threshold);
        self.sky.set_motion(self.cfg.motion());
        self.sky.set_spawn_speed(self.cfg.spawn_speed);
        self.sky.set_pin_policy(self.cfg.pin_policy);
        self.store_path = PathBuf::from(&self.cfg.store_path);
        Ok(())
    }
}

fn split_target<'a>(args: &'a [&'a str], usage: &str) -> anyhow::Result<(&'a str, &'a [&'a str])> {
    args.split_first()
        .map(|(first, rest)| (*first, rest))
        .with_context(|| format!("usage: {usage}"))
}

fn parse_f32(s: &str) -> anyhow::Result<f32> {
    let v: f32 = s.parse().with_context(|| format!("not a number: '{s}'"))?;
    ensure!(v.is_finite(), "not a finite number: '{s}'");
    Ok(v)
}

fn describe(c: &Comet) -> String {
    format!(
        "{} {:<24} ({:.0}, {:.0}) {} {}",
        c.id.short(),
        c.text,
        c.position.x,
        c.position.y,
        c.color.map_or("-", CometColor::name),
        c.created_at.format("%-m/%-d %H:%M"),
    )
}
