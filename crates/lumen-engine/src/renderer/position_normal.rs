use super::{PositionRenderer, check_handles};
use crate::render::{BufferHandle, Location, RenderDevice};
use crate::scene::{SceneObject, Shader, ShaderInput};

/// Positions plus a per-vertex normal stream.
#[derive(Debug, Default)]
pub struct PositionNormalRenderer {
    base: PositionRenderer,
    normal_location: Option<Location>,
    normal_buffer: Option<BufferHandle>,
}

impl PositionNormalRenderer {
    pub const INPUTS: &'static [ShaderInput] = &[
        ShaderInput::VertexInput,
        ShaderInput::NormalsInput,
        ShaderInput::ModelViewProjection,
    ];

    pub fn test_shader(shader: &Shader) -> bool {
        shader.is_linked() && shader.has_inputs(Self::INPUTS)
    }

    pub fn test_object(object: &dyn SceneObject) -> bool {
        PositionRenderer::test_object(object) && object.hints().num_nbo == 1
    }

    pub fn set_data_from_shader(&mut self, shader: &Shader) {
        self.base.set_data_from_shader(shader);
        self.normal_location = shader.location(ShaderInput::NormalsInput);
    }

    pub fn set_data_from_object(&mut self, object: &dyn SceneObject) {
        self.base.set_data_from_object(object);
        self.normal_buffer = object.normal_buffer();
    }

    pub fn can_render(&self) -> bool {
        self.check("position+normal")
    }

    pub(super) fn check(&self, renderer: &str) -> bool {
        let base = self.base.check(renderer);
        let own = check_handles(
            renderer,
            &[
                ("normals input location", self.normal_location.is_some()),
                ("normal buffer", self.normal_buffer.is_some()),
            ],
        );
        base && own
    }

    pub fn render(&self, device: &mut dyn RenderDevice) {
        if !self.base.begin(device) {
            return;
        }
        self.bind_streams(device);
        self.base.draw(device);
        self.unbind_streams(device);
    }

    pub(super) fn begin(&self, device: &mut dyn RenderDevice) -> bool {
        self.base.begin(device)
    }

    pub(super) fn bind_streams(&self, device: &mut dyn RenderDevice) {
        self.base.bind_streams(device);
        if let (Some(location), Some(buffer)) = (self.normal_location, self.normal_buffer) {
            device.enable_attribute(location);
            device.bind_vertex_buffer(location, buffer, 3);
        }
    }

    pub(super) fn draw(&self, device: &mut dyn RenderDevice) {
        self.base.draw(device);
    }

    pub(super) fn unbind_streams(&self, device: &mut dyn RenderDevice) {
        self.base.unbind_streams(device);
        if let (Some(location), Some(_)) = (self.normal_location, self.normal_buffer) {
            device.disable_attribute(location);
        }
    }
}
