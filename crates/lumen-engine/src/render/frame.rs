use super::RenderDevice;
use crate::time::FrameTime;

/// Draws one frame. Called on the render thread with the context current,
/// after the viewport and clear have been applied.
pub trait FrameRenderer: Send {
    fn render_frame(&mut self, device: &mut dyn RenderDevice, time: &FrameTime);
}

/// Closure adapter, see [`render_fn`].
pub struct RenderFn<F>(F);

impl<F> FrameRenderer for RenderFn<F>
where
    F: FnMut(&mut dyn RenderDevice, &FrameTime) + Send,
{
    fn render_frame(&mut self, device: &mut dyn RenderDevice, time: &FrameTime) {
        (self.0)(device, time)
    }
}

/// Wraps a closure as a `FrameRenderer`.
pub fn render_fn<F>(f: F) -> RenderFn<F>
where
    F: FnMut(&mut dyn RenderDevice, &FrameTime) + Send,
{
    RenderFn(f)
}
