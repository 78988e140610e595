//! ANIMA Playback - Per-character three-tier blending
//!
//! Each character holds three animation tiers: *idle* (perpetual
//! baseline), *local* (a chosen pre-baked variant), and *streamed*
//! (incrementally appended network data). The render loop calls
//! `resolve_pose` every tick; that path never blocks, performs no I/O,
//! and does not allocate once the topology is fixed.

pub mod buffer;
pub mod gaze;
pub mod tier;

pub use buffer::*;
pub use gaze::*;
pub use tier::*;
