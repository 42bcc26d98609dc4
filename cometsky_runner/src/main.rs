//! Headless sky binary.
//!
//! Usage:
//!   cargo run -p cometsky_runner -- [--config sky.json] [--tick-hz 60] [--width 1280] [--height 720] [--store comets.json]
//!
//! Reads console commands from stdin, runs the sky at the configured frame
//! rate, and saves the comet list on exit.
//!
//! Console commands:
//!   add [color] <text>       - Launch a comet
//!   edit <id> <text>         - Change a comet's label
//!   melt <id>                - Remove a comet
//!   fling <id> <vx> <vy>     - Release a comet with a gesture speed (px/s)
//!   drift on|off             - Toggle drifting
//!   list | lines | status    - Inspect the sky
//!   save                     - Save now
//!   quit                     - Save and exit

use std::env;
use std::io::{BufRead, Write};

use anyhow::Context;
use cometsky_runner::SkyRunner;
use cometsky_shared::config::SkyConfig;
use tokio::sync::{mpsc, watch};
use tracing::info;

fn parse_args() -> anyhow::Result<SkyConfig> {
    let args: Vec<String> = env::args().collect();

    let mut cfg = match args.iter().position(|a| a == "--config") {
        Some(i) => {
            let path = args.get(i + 1).context("--config needs a path")?;
            SkyConfig::load(path)?
        }
        None => SkyConfig::default(),
    };

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--tick-hz" if i + 1 < args.len() => {
                cfg.tick_hz = args[i + 1].parse().unwrap_or(cfg.tick_hz);
                i += 2;
            }
            "--width" if i + 1 < args.len() => {
                cfg.viewport_width = args[i + 1].parse().unwrap_or(cfg.viewport_width);
                i += 2;
            }
            "--height" if i + 1 < args.len() => {
                cfg.viewport_height = args[i + 1].parse().unwrap_or(cfg.viewport_height);
                i += 2;
            }
            "--store" if i + 1 < args.len() => {
                cfg.store_path = args[i + 1].clone();
                i += 2;
            }
            _ => i += 1,
        }
    }
    Ok(cfg)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cfg = parse_args()?;
    info!(
        tick_hz = cfg.tick_hz,
        width = cfg.viewport_width,
        height = cfg.viewport_height,
        store = %cfg.store_path,
        "Starting sky"
    );

    let mut runner = SkyRunner::new(cfg).context("create runner")?;

    let (console_tx, console_rx) = mpsc::channel::<String>(32);
    runner.set_console_input(console_rx);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Stdin reader thread. EOF stops the loop.
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        loop {
            print!("] ");
            let _ = stdout.flush();
            let mut line = String::new();
            match stdin.lock().read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            let line = line.trim().to_string();
            if !line.is_empty() && console_tx.blocking_send(line).is_err() {
                break;
            }
        }
        let _ = shutdown_tx.send(true);
    });

    println!("Sky ready. Type 'add <idea>' to launch a comet, 'help' for more, 'quit' to exit.");
    println!();

    runner
        .run(shutdown_rx, |report| {
            for line in &report.console {
                println!("{line}");
            }
        })
        .await?;

    runner.save().context("save sky")?;
    Ok(())
}
