//! Backdrop stars.
//!
//! Static twinkling dots behind the comets. Positions are percentages of the
//! viewport so the field survives resizes without regeneration.

use rand::Rng;
use serde::Serialize;

/// One backdrop star.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Star {
    pub id: usize,
    /// Percent of viewport width, `[0, 100)`.
    pub x: f32,
    /// Percent of viewport height, `[0, 100)`.
    pub y: f32,
    /// Diameter in pixels, `[0.5, 2.0)`.
    pub size: f32,
    /// Seconds before the first twinkle, `[0, 5)`.
    pub delay: f32,
    /// Seconds per twinkle cycle, `[2, 5)`.
    pub duration: f32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct StarField {
    pub stars: Vec<Star>,
}

impl StarField {
    pub fn generate<R: Rng>(count: usize, rng: &mut R) -> Self {
        let stars = (0..count)
            .map(|id| Star {
                id,
                x: rng.gen_range(0.0..100.0),
                y: rng.gen_range(0.0..100.0),
                size: rng.gen_range(0.5..2.0),
                delay: rng.gen_range(0.0..5.0),
                duration: rng.gen_range(2.0..5.0),
            })
            .collect();
        Self { stars }
    }

    /// A field from the thread-local RNG; different every run.
    pub fn random(count: usize) -> Self {
        Self::generate(count, &mut rand::thread_rng())
    }

    pub fn len(&self) -> usize {
        self.stars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stars.is_empty()
    }
}
