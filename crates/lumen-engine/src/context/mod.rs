//! Graphics context abstraction.
//!
//! A `GraphicsContext` owns one window plus the rendering state attached to it.
//! The loop controller only talks to this trait: the windowed backend lives in
//! `platform`, and `HeadlessContext` drives the same lifecycle without a display.
//!
//! Contexts are shared between the event thread, the render thread and helper
//! threads, so every operation takes `&self` and implementations synchronize
//! internally. At most one thread may have the context current at a time.

mod currency;
mod error;
mod fbconfig;
mod headless;
mod state;
mod version;

pub use currency::Currency;
pub use error::ContextError;
pub use fbconfig::{FramebufferConfig, FramebufferRequest, choose_best_config};
pub use headless::{HeadlessConfig, HeadlessContext, HeadlessStats};
pub use state::{ContextCreationPolicy, ContextState, WindowGeometry};
pub use version::ApiVersion;

use crate::event::Event;
use crate::render::RenderDevice;

pub trait GraphicsContext: Send + Sync {
    /// Opens the window and creates the rendering context.
    ///
    /// Under `ContextCreationPolicy::CreateOnEventLoopThread` this is only ever
    /// called from the thread that will later poll events.
    fn create_context(&self) -> Result<(), ContextError>;

    /// Tears the context down. Calling it without a context is a no-op.
    fn destroy_context(&self);

    /// Binds the context to the calling thread.
    ///
    /// Returns `false` when there is no context or another thread holds it.
    fn make_current(&self) -> bool;

    /// Releases the context from the calling thread.
    fn make_not_current(&self) -> bool;

    /// Presents whatever was drawn since the last swap.
    fn swap_buffers(&self);

    /// Returns the next pending window event without blocking.
    fn poll_event(&self) -> Option<Event>;

    fn is_current_for_calling_thread(&self) -> bool;

    fn have_context(&self) -> bool;

    fn state(&self) -> ContextState;

    /// Version of the created context, `None` before creation.
    fn api_version(&self) -> Option<ApiVersion>;

    fn geometry(&self) -> WindowGeometry;

    /// Runs `f` against the render device.
    ///
    /// Only succeeds on the thread that has the context current; returns
    /// whether `f` was run.
    fn with_device(&self, f: &mut dyn FnMut(&mut dyn RenderDevice)) -> bool;
}
