//! Windowed backend: winit for the window, wgpu for drawing.
//!
//! `WindowContext` implements `GraphicsContext` on top of these. Device
//! commands issued during a frame are recorded by `WgpuDevice` and encoded into
//! a single render pass when the frame is swapped.

mod draw;
mod gpu;
mod translate;
mod window_context;

pub use draw::WgpuDevice;
pub use gpu::{Gpu, GpuFrame, GpuInit, SurfaceErrorAction};
pub use window_context::WindowContext;
