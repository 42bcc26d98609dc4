//! Fixtures shared by the integration tests.

use cometsky_shared::{
    comet::Comet,
    config::SkyConfig,
    math::{Vec2, Viewport},
};

/// The 1000x800 viewport most scenarios are written against.
pub const VIEW: Viewport = Viewport::new(1000.0, 800.0);

/// Installs a test-writer subscriber once; later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}

pub fn comet_at(x: f32, y: f32, vx: f32, vy: f32) -> Comet {
    Comet::new("idea", Vec2::new(x, y), Vec2::new(vx, vy)).expect("non-empty text")
}

/// Default config with a fast frame rate and the store under `dir`.
pub fn fast_config(dir: &std::path::Path) -> SkyConfig {
    SkyConfig {
        tick_hz: 200,
        store_path: dir.join("comets.json").display().to_string(),
        ..Default::default()
    }
}
