//! ANIMA Clip Model - Containers for one segment of motion, face, or audio
//!
//! Clips are effectively immutable after construction: the only
//! post-construction mutation is the explicit timeline-start setter. A clip
//! is owned by exactly one queue at a time and moves by value from the
//! decode queue to the consumption queue.

pub mod audio;
pub mod face;
pub mod math;
pub mod motion;

pub use audio::*;
pub use face::*;
pub use math::*;
pub use motion::*;
