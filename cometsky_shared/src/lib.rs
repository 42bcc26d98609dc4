//! `cometsky_shared`
//!
//! Shared libraries for the comet sky: ideas typed by the user float around
//! the screen as comets, and nearby comets are joined by constellation lines.
//!
//! Design goals:
//! - The two per-frame computations (`motion::advance` and
//!   `constellation::build_lines`) are pure functions over a snapshot.
//! - One owner (`store::CometSky`) mutates the comet list.
//! - Traits at the seams (`MotionBackend`, `SkyRenderer`) for headless tests.
//! - No `unsafe`.

pub mod comet;
pub mod config;
pub mod console;
pub mod constellation;
pub mod event;
pub mod math;
pub mod motion;
pub mod persist;
pub mod render;
pub mod starfield;
pub mod store;

pub mod prelude {
    //! Commonly used exports.

    pub use crate::comet::*;
    pub use crate::config::*;
    pub use crate::constellation::*;
    pub use crate::event::*;
    pub use crate::math::*;
    pub use crate::motion::*;
    pub use crate::store::CometSky;
}
