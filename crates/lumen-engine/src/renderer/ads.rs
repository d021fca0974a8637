use std::fmt;
use std::sync::Arc;

use glam::{Mat4, Vec4};
use log::warn;

use super::{MAX_LIGHTS, PositionNormalRenderer, check_handles};
use crate::render::{Location, RenderDevice, UniformValue};
use crate::scene::{LightModel, MatrixKind, SceneObject, Shader, ShaderInput, Transform};

/// Ambient/diffuse/specular lighting from broadcast point lights.
#[derive(Default)]
pub struct AdsRenderer {
    base: PositionNormalRenderer,
    model_view_location: Option<Location>,
    normal_matrix_location: Option<Location>,
    light_count_location: Option<Location>,
    light_positions_location: Option<Location>,
    light_colors_location: Option<Location>,
    model_view: Option<Transform>,
    normal_matrix: Option<Transform>,
    lights: Vec<Arc<dyn SceneObject>>,
}

impl AdsRenderer {
    pub const INPUTS: &'static [ShaderInput] = &[
        ShaderInput::VertexInput,
        ShaderInput::NormalsInput,
        ShaderInput::ModelViewProjection,
        ShaderInput::ModelView,
        ShaderInput::NormalMatrix,
        ShaderInput::LightCount,
        ShaderInput::LightPositions,
        ShaderInput::LightColors,
    ];

    pub fn test_shader(shader: &Shader) -> bool {
        shader.is_linked() && shader.has_inputs(Self::INPUTS)
    }

    pub fn test_object(object: &dyn SceneObject) -> bool {
        let hints = object.hints();
        PositionNormalRenderer::test_object(object)
            && hints.matrices.model_view
            && hints.matrices.normal
            && hints.light_model == LightModel::SimpleAds
    }

    pub fn set_data_from_shader(&mut self, shader: &Shader) {
        self.base.set_data_from_shader(shader);
        self.model_view_location = shader.location(ShaderInput::ModelView);
        self.normal_matrix_location = shader.location(ShaderInput::NormalMatrix);
        self.light_count_location = shader.location(ShaderInput::LightCount);
        self.light_positions_location = shader.location(ShaderInput::LightPositions);
        self.light_colors_location = shader.location(ShaderInput::LightColors);
    }

    pub fn set_data_from_object(&mut self, object: &dyn SceneObject) {
        self.base.set_data_from_object(object);
        self.model_view = object.matrix(MatrixKind::ModelView);
        self.normal_matrix = object.matrix(MatrixKind::Normal);
    }

    pub fn add_light_source(&mut self, light: Arc<dyn SceneObject>) -> bool {
        if light.light().is_none() {
            warn!("'{}' is not a light source", light.name());
            return false;
        }
        if self.lights.len() >= MAX_LIGHTS {
            warn!(
                "ads-lighting renderer: ignoring light '{}', at most {MAX_LIGHTS} are supported",
                light.name()
            );
            return false;
        }
        self.lights.push(light);
        true
    }

    /// Forgets `light`; returns whether it was attached.
    pub fn remove_light_source(&mut self, light: &Arc<dyn SceneObject>) -> bool {
        let before = self.lights.len();
        self.lights.retain(|attached| !Arc::ptr_eq(attached, light));
        self.lights.len() != before
    }

    pub fn light_sources(&self) -> usize {
        self.lights.len()
    }

    pub fn can_render(&self) -> bool {
        let base = self.base.check("ads-lighting");
        let own = check_handles(
            "ads-lighting",
            &[
                ("model-view location", self.model_view_location.is_some()),
                ("normal matrix location", self.normal_matrix_location.is_some()),
                ("light count location", self.light_count_location.is_some()),
                ("light positions location", self.light_positions_location.is_some()),
                ("light colors location", self.light_colors_location.is_some()),
                ("model-view matrix", self.model_view.is_some()),
                ("normal matrix", self.normal_matrix.is_some()),
            ],
        );
        base && own
    }

    pub fn render(&self, device: &mut dyn RenderDevice) {
        if !self.base.begin(device) {
            return;
        }
        upload_matrix(device, self.model_view_location, self.model_view.as_ref());
        upload_matrix(device, self.normal_matrix_location, self.normal_matrix.as_ref());
        self.upload_lights(device);

        self.base.bind_streams(device);
        self.base.draw(device);
        self.base.unbind_streams(device);
    }

    fn upload_lights(&self, device: &mut dyn RenderDevice) {
        let mut positions = Vec::with_capacity(self.lights.len());
        let mut colors = Vec::with_capacity(self.lights.len());
        for light in self.lights.iter().filter_map(|l| l.light()) {
            positions.push(light.position.extend(1.0));
            colors.push(light.color.extend(light.ambient));
        }

        if let Some(location) = self.light_count_location {
            device.upload_uniform(location, UniformValue::Int(positions.len() as i32));
        }
        upload_vectors(device, self.light_positions_location, &positions);
        upload_vectors(device, self.light_colors_location, &colors);
    }
}

fn upload_matrix(device: &mut dyn RenderDevice, location: Option<Location>, matrix: Option<&Transform>) {
    if let Some(location) = location {
        let value = matrix.map_or(Mat4::IDENTITY, Transform::get);
        device.upload_uniform(location, UniformValue::Mat4(value));
    }
}

fn upload_vectors(device: &mut dyn RenderDevice, location: Option<Location>, values: &[Vec4]) {
    if let (Some(location), false) = (location, values.is_empty()) {
        device.upload_uniform(location, UniformValue::Vec4Array(values));
    }
}

impl fmt::Debug for AdsRenderer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let lights: Vec<&str> = self.lights.iter().map(|l| l.name()).collect();
        f.debug_struct("AdsRenderer")
            .field("base", &self.base)
            .field("lights", &lights)
            .finish_non_exhaustive()
    }
}
