//! Lumen engine crate.
//!
//! Owns the graphics-context lifecycle, the event/render loop pair that drives
//! it, and the scene pipeline that decides what may be drawn each frame.

pub mod config;
pub mod context;
pub mod event;
pub mod logging;
pub mod platform;
pub mod render;
pub mod renderer;
pub mod runtime;
pub mod scene;
pub mod time;

mod sync;

pub use config::EngineConfig;
pub use context::{GraphicsContext, HeadlessContext};
pub use runtime::{LoopController, LoopHandle};
