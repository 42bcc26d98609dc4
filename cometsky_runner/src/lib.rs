//! `cometsky_runner`
//!
//! Drives the sky:
//! - Fixed-rate frame loop (default 60 Hz), cancelable
//! - Console commands from any thread, serialized through a channel
//! - Save on exit, restore on start
//!
//! The loop is single-threaded with respect to the sky; nothing else holds a
//! reference to the comet list.

pub mod runner;

pub use runner::{FrameReport, RunnerState, SkyRunner};
