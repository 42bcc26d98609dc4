//! Rendering abstraction.
//!
//! This crate intentionally does not depend on a graphics backend. The sky
//! only prescribes what to draw (comet positions, line endpoints, line
//! opacity); color, glow, and stroke are up to the implementation.

use tracing::trace;

use crate::{comet::Comet, constellation::Edge};

/// A minimal sky drawing API, called once per frame.
pub trait SkyRenderer: Send {
    fn begin_frame(&mut self, frame: u64);
    fn draw_line(&mut self, edge: &Edge);
    fn draw_comet(&mut self, comet: &Comet);
    fn end_frame(&mut self);
}

/// Draws one full frame: lines first so comets sit on top.
pub fn draw_frame<R: SkyRenderer + ?Sized>(
    renderer: &mut R,
    frame: u64,
    comets: &[Comet],
    lines: &[Edge],
) {
    renderer.begin_frame(frame);
    for edge in lines {
        renderer.draw_line(edge);
    }
    for comet in comets {
        renderer.draw_comet(comet);
    }
    renderer.end_frame();
}

/// A no-op renderer useful for headless runs.
#[derive(Default)]
pub struct NullRenderer;

impl SkyRenderer for NullRenderer {
    fn begin_frame(&mut self, _frame: u64) {}
    fn draw_line(&mut self, _edge: &Edge) {}
    fn draw_comet(&mut self, _comet: &Comet) {}
    fn end_frame(&mut self) {}
}

/// Emits a `trace` event per frame with what would have been drawn.
#[derive(Default)]
pub struct TraceRenderer {
    frame: u64,
    comets: usize,
    lines: usize,
}

impl SkyRenderer for TraceRenderer {
    fn begin_frame(&mut self, frame: u64) {
        self.frame = frame;
        self.comets = 0;
        self.lines = 0;
    }

    fn draw_line(&mut self, _edge: &Edge) {
        self.lines += 1;
    }

    fn draw_comet(&mut self, _comet: &Comet) {
        self.comets += 1;
    }

    fn end_frame(&mut self) {
        trace!(frame = self.frame, comets = self.comets, lines = self.lines, "Frame drawn");
    }
}
