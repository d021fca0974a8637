//! Frame timing for the render loop.
//!
//! The render thread owns one `FrameClock` and ticks it once per rendered frame.
//! Resuming from a pause resets the baseline so the first frame after a pause
//! does not observe the whole paused interval as its delta.

mod frame_clock;

pub use frame_clock::{FrameClock, FrameTime};
