//! Render device abstraction.
//!
//! `RenderDevice` is the narrow command surface that shaders, meshes and
//! renderers talk to. It is only reachable through
//! `GraphicsContext::with_device`, i.e. on the thread that has the context
//! current. Resource handles are plain ids; an absent handle is `None` at the
//! call sites.

mod device;
mod error;
mod frame;
mod recording;
mod reflect;
mod release;

pub use device::{
    BufferHandle, BufferKind, ClearColor, Location, ProgramHandle, ProgramInfo, ProgramVariable,
    RenderDevice, UniformValue, Viewport,
};
pub use error::{DeviceError, ShaderError};
pub use frame::{FrameRenderer, RenderFn, render_fn};
pub use recording::{DeviceCommand, RecordedUniform, RecordingDevice};
pub use reflect::{Reflection, reflect_wgsl};
pub use release::ReleaseOutcome;
