//! Frame loop integration: scheduling, shutdown, console channel, persistence.

use std::{
    sync::{Arc, Mutex},
    time::Duration,
};

use cometsky_runner::{RunnerState, SkyRunner};
use cometsky_shared::{
    comet::Comet,
    constellation::Edge,
    prelude::*,
    render::{NullRenderer, SkyRenderer},
};
use cometsky_tests::{fast_config, init_tracing};
use tokio::sync::{mpsc, watch};

fn seeded_runner(cfg: SkyConfig) -> anyhow::Result<SkyRunner> {
    let sky = CometSky::with_seed(&cfg, 17);
    SkyRunner::with_sky(cfg, sky)
}

#[tokio::test]
async fn run_for_frames_ticks_the_sky() -> anyhow::Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let mut runner = seeded_runner(fast_config(dir.path()))?;
    runner.set_renderer(Box::new(NullRenderer));
    runner.exec_console("add first")?;
    let start = runner.sky().comets()[0].position;

    runner.run_for_frames(5).await?;

    assert_eq!(runner.sky().frame(), 5);
    assert_ne!(runner.sky().comets()[0].position, start);
    Ok(())
}

#[tokio::test]
async fn shutdown_already_requested_runs_nothing() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut runner = seeded_runner(fast_config(dir.path()))?;
    let (_tx, rx) = watch::channel(true);

    let frames = runner.run(rx, |_| {}).await?;
    assert_eq!(frames, 0);
    assert_eq!(runner.sky().frame(), 0);
    Ok(())
}

#[tokio::test]
async fn shutdown_signal_stops_after_current_frame() -> anyhow::Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let mut runner = seeded_runner(fast_config(dir.path()))?;
    let (tx, rx) = watch::channel(false);

    let frames = runner
        .run(rx, |report| {
            if report.frame == 3 {
                let _ = tx.send(true);
            }
        })
        .await?;
    assert_eq!(frames, 3);
    Ok(())
}

#[tokio::test]
async fn dropped_shutdown_sender_stops_loop() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut runner = seeded_runner(fast_config(dir.path()))?;
    let (tx, rx) = watch::channel(false);
    drop(tx);

    let frames = runner.run(rx, |_| {}).await?;
    assert_eq!(frames, 1);
    Ok(())
}

#[tokio::test]
async fn quit_command_stops_loop() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let mut runner = seeded_runner(fast_config(dir.path()))?;
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);
    let (tx, rx) = mpsc::channel(8);
    runner.set_console_input(rx);
    tx.send("quit".to_string()).await?;

    let frames = runner.run(shutdown_rx, |_| {}).await?;
    assert_eq!(frames, 1);
    assert_eq!(runner.state(), RunnerState::Quitting);
    Ok(())
}

#[tokio::test]
async fn console_lines_from_another_thread() -> anyhow::Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let mut runner = seeded_runner(fast_config(dir.path()))?;
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (tx, rx) = mpsc::channel(8);
    runner.set_console_input(rx);

    let feeder = std::thread::spawn(move || {
        for line in ["add amber first idea", "add second idea", "status"] {
            if tx.blocking_send(line.to_string()).is_err() {
                break;
            }
        }
    });

    let mut output = Vec::new();
    let frames = tokio::time::timeout(
        Duration::from_secs(5),
        runner.run(shutdown_rx, |report| {
            output.extend(report.console.iter().cloned());
            if output.iter().any(|l| l == "Comets: 2") {
                let _ = shutdown_tx.send(true);
            }
        }),
    )
    .await??;
    feeder.join().expect("feeder thread");

    assert!(frames >= 1);
    assert_eq!(runner.sky().len(), 2);
    assert_eq!(runner.sky().comets()[0].color, Some(CometColor::Amber));
    assert_eq!(runner.sky().comets()[0].text, "first idea");
    Ok(())
}

#[derive(Clone, Default)]
struct Counts(Arc<Mutex<(u64, usize, usize)>>);

impl SkyRenderer for Counts {
    fn begin_frame(&mut self, _frame: u64) {
        self.0.lock().unwrap().0 += 1;
    }
    fn draw_line(&mut self, _edge: &Edge) {
        self.0.lock().unwrap().1 += 1;
    }
    fn draw_comet(&mut self, _comet: &Comet) {
        self.0.lock().unwrap().2 += 1;
    }
    fn end_frame(&mut self) {}
}

#[tokio::test]
async fn renderer_sees_every_frame() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let cfg = SkyConfig {
        start_drifting: false,
        spawn_spread: 100.0,
        ..fast_config(dir.path())
    };
    let mut runner = seeded_runner(cfg)?;
    let counts = Counts::default();
    runner.set_renderer(Box::new(counts.clone()));
    runner.exec_console("add a")?;
    runner.exec_console("add b")?;

    runner.run_for_frames(4).await?;

    // Pinned comets spawned within a 100px square stay joined.
    let (frames, lines, comets) = *counts.0.lock().unwrap();
    assert_eq!(frames, 4);
    assert_eq!(lines, 4);
    assert_eq!(comets, 8);
    Ok(())
}

#[tokio::test]
async fn saved_sky_survives_restart() -> anyhow::Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;
    let cfg = fast_config(dir.path());

    let mut first = SkyRunner::new(cfg.clone())?;
    assert!(first.sky().is_empty());
    first.exec_console("add purple keep this")?;
    first.exec_console("add and this")?;
    first.run_for_frames(3).await?;
    let out = first.exec_console("save")?;
    assert!(out[0].starts_with("Saved 2 comets"));

    let drifting = SkyRunner::new(cfg.clone())?;
    assert_eq!(drifting.sky().len(), 2);
    assert_eq!(drifting.sky().frame(), 0);
    for (before, after) in first.sky().comets().iter().zip(drifting.sky().comets()) {
        assert_eq!(before.id, after.id);
        assert_eq!(before.text, after.text);
        assert!(!after.is_stationary());
        assert!(after.velocity.x.abs() <= cfg.drift_speed);
        assert!(after.velocity.y.abs() <= cfg.drift_speed);
    }

    let pinned = SkyRunner::new(SkyConfig {
        start_drifting: false,
        ..cfg
    })?;
    assert!(pinned.sky().comets().iter().all(Comet::is_stationary));
    Ok(())
}

#[test]
fn runner_refuses_config_that_would_crash_spawning() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let cfg = SkyConfig {
        spawn_spread: -10.0,
        ..fast_config(dir.path())
    };
    assert!(SkyRunner::new(cfg.clone()).is_err());
    assert!(seeded_runner(cfg).is_err());
    Ok(())
}
