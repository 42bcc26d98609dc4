//! Constellation lines.
//!
//! Every frame, each pair of comets closer than a threshold is joined by a
//! line whose opacity fades linearly with distance. Plain O(n²) pair scan:
//! the sky is expected to hold at most a few hundred comets.

use serde::Serialize;

use crate::{
    comet::{Comet, CometId},
    math::Vec2,
};

/// Default join distance, in pixels.
pub const DEFAULT_THRESHOLD: f32 = 200.0;

/// A line between two nearby comets.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Edge {
    pub a: CometId,
    pub b: CometId,
    pub from: Vec2,
    pub to: Vec2,
    /// `1 - distance / threshold`, in `(0, 1]`.
    pub opacity: f32,
}

impl Edge {
    pub fn length(&self) -> f32 {
        self.from.distance(self.to)
    }
}

/// Number of unordered pairs among `n` comets.
pub fn pair_count(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

/// Builds the constellation for one frame.
///
/// Pairs are visited `(0,1), (0,2), .., (1,2), ..` and edges come out in that
/// order. A pair exactly `threshold` apart is not joined.
pub fn build_lines(comets: &[Comet], threshold: f32) -> Vec<Edge> {
    let mut lines = Vec::new();

    for (i, a) in comets.iter().enumerate() {
        for b in &comets[i + 1..] {
            let dist = a.position.distance(b.position);
            if dist < threshold {
                lines.push(Edge {
                    a: a.id,
                    b: b.id,
                    from: a.position,
                    to: b.position,
                    opacity: 1.0 - dist / threshold,
                });
            }
        }
    }

    lines
}
