use glam::Mat4;

use super::check_handles;
use crate::render::{BufferHandle, Location, ProgramHandle, RenderDevice, UniformValue};
use crate::scene::{MatrixKind, SceneObject, Shader, ShaderInput, Transform};

/// Draws positions only, transformed by the model-view-projection matrix.
#[derive(Debug, Default)]
pub struct PositionRenderer {
    program: Option<ProgramHandle>,
    vertex_location: Option<Location>,
    mvp_location: Option<Location>,
    vertex_buffer: Option<BufferHandle>,
    index_buffer: Option<BufferHandle>,
    mvp: Option<Transform>,
    index_count: u32,
}

impl PositionRenderer {
    pub const INPUTS: &'static [ShaderInput] =
        &[ShaderInput::VertexInput, ShaderInput::ModelViewProjection];

    pub fn test_shader(shader: &Shader) -> bool {
        shader.is_linked() && shader.has_inputs(Self::INPUTS)
    }

    pub fn test_object(object: &dyn SceneObject) -> bool {
        let hints = object.hints();
        hints.flags.mesh
            && hints.num_indexes >= 3
            && hints.matrices.model_view_projection
            && hints.num_vbo == 1
            && hints.num_ibo == 1
    }

    pub fn set_data_from_shader(&mut self, shader: &Shader) {
        self.program = shader.program();
        self.vertex_location = shader.location(ShaderInput::VertexInput);
        self.mvp_location = shader.location(ShaderInput::ModelViewProjection);
    }

    pub fn set_data_from_object(&mut self, object: &dyn SceneObject) {
        self.vertex_buffer = object.vertex_buffer();
        self.index_buffer = object.index_buffer();
        self.mvp = object.matrix(MatrixKind::ModelViewProjection);
        self.index_count = u32::try_from(object.hints().num_indexes).unwrap_or(u32::MAX);
    }

    pub fn can_render(&self) -> bool {
        self.check("position")
    }

    pub(super) fn check(&self, renderer: &str) -> bool {
        check_handles(
            renderer,
            &[
                ("program", self.program.is_some()),
                ("vertex input location", self.vertex_location.is_some()),
                ("model-view-projection location", self.mvp_location.is_some()),
                ("vertex buffer", self.vertex_buffer.is_some()),
                ("index buffer", self.index_buffer.is_some()),
                ("model-view-projection matrix", self.mvp.is_some()),
            ],
        ) && self.index_count >= 3
    }

    pub fn render(&self, device: &mut dyn RenderDevice) {
        if !self.begin(device) {
            return;
        }
        self.bind_streams(device);
        self.draw(device);
        self.unbind_streams(device);
    }

    /// Binds the program and uploads the model-view-projection matrix.
    pub(super) fn begin(&self, device: &mut dyn RenderDevice) -> bool {
        let (Some(program), Some(location)) = (self.program, self.mvp_location) else {
            return false;
        };
        device.use_program(program);
        let mvp = self.mvp.as_ref().map_or(Mat4::IDENTITY, Transform::get);
        device.upload_uniform(location, UniformValue::Mat4(mvp));
        true
    }

    pub(super) fn bind_streams(&self, device: &mut dyn RenderDevice) {
        if let (Some(location), Some(buffer)) = (self.vertex_location, self.vertex_buffer) {
            device.enable_attribute(location);
            device.bind_vertex_buffer(location, buffer, 3);
        }
    }

    pub(super) fn draw(&self, device: &mut dyn RenderDevice) {
        if let Some(buffer) = self.index_buffer {
            device.bind_index_buffer(buffer);
            device.draw_indexed(self.index_count);
        }
    }

    pub(super) fn unbind_streams(&self, device: &mut dyn RenderDevice) {
        if let (Some(location), Some(_)) = (self.vertex_location, self.vertex_buffer) {
            device.disable_attribute(location);
        }
    }
}
