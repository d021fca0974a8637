use glam::{Mat4, Vec4};

use super::{DeviceError, ReleaseOutcome, ShaderError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProgramHandle(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BufferHandle(pub u32);

/// Attribute or uniform slot inside a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Location(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Vertex,
    Normal,
    Index,
}

/// Named input of a linked program.
///
/// For uniforms `offset` and `size` describe the member inside the uniform
/// block, in bytes. Attributes report the byte size of one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramVariable {
    pub name: String,
    pub location: Location,
    pub offset: u32,
    pub size: u32,
}

/// Result of compiling and linking a program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramInfo {
    pub program: ProgramHandle,
    pub attributes: Vec<ProgramVariable>,
    pub uniforms: Vec<ProgramVariable>,
    /// Size of the uniform block in bytes, 0 without one.
    pub uniform_block_size: u32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UniformValue<'a> {
    Mat4(Mat4),
    Vec4Array(&'a [Vec4]),
    Int(i32),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClearColor {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl ClearColor {
    pub const BLACK: Self = Self::rgba(0.0, 0.0, 0.0, 1.0);

    pub const fn rgba(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }
}

impl Default for ClearColor {
    fn default() -> Self {
        Self::BLACK
    }
}

/// Drawable region in physical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Viewport {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Viewport {
    pub const fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }
}

/// Commands the scene pipeline issues against the current context.
///
/// Draw state is explicit: a renderer enables the attributes it binds and must
/// disable them again after drawing.
pub trait RenderDevice {
    fn compile_program(&mut self, name: &str, code: &str) -> Result<ProgramInfo, ShaderError>;
    fn delete_program(&mut self, program: ProgramHandle) -> ReleaseOutcome;

    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> Result<BufferHandle, DeviceError>;
    fn release_buffer(&mut self, buffer: BufferHandle) -> ReleaseOutcome;

    fn set_viewport(&mut self, viewport: Viewport);
    fn clear(&mut self, color: ClearColor);

    fn use_program(&mut self, program: ProgramHandle);
    fn upload_uniform(&mut self, location: Location, value: UniformValue<'_>);

    fn enable_attribute(&mut self, location: Location);
    fn disable_attribute(&mut self, location: Location);
    fn bind_vertex_buffer(&mut self, location: Location, buffer: BufferHandle, components: u32);
    fn bind_index_buffer(&mut self, buffer: BufferHandle);

    fn draw_indexed(&mut self, index_count: u32);
}
