use std::borrow::Cow;
use std::collections::HashMap;
use std::path::PathBuf;

use log::{debug, warn};

use crate::render::{
    Location, ProgramHandle, ProgramInfo, ReleaseOutcome, RenderDevice, ShaderError,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShaderSource {
    File(PathBuf),
    Inline { name: String, code: String },
}

impl ShaderSource {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(path.into())
    }

    pub fn inline(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self::Inline {
            name: name.into(),
            code: code.into(),
        }
    }

    pub fn name(&self) -> Cow<'_, str> {
        match self {
            Self::File(path) => path.to_string_lossy(),
            Self::Inline { name, .. } => Cow::Borrowed(name),
        }
    }

    fn load(&self) -> Result<Cow<'_, str>, ShaderError> {
        match self {
            Self::File(path) => std::fs::read_to_string(path)
                .map(Cow::Owned)
                .map_err(|source| ShaderError::Read {
                    path: path.display().to_string(),
                    source,
                }),
            Self::Inline { code, .. } => Ok(Cow::Borrowed(code)),
        }
    }
}

/// Semantic role of a program input, resolved from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderInput {
    VertexInput,
    NormalsInput,
    ModelViewProjection,
    ModelView,
    NormalMatrix,
    LightCount,
    LightPositions,
    LightColors,
}

impl ShaderInput {
    fn from_attribute(name: &str) -> Option<Self> {
        match name {
            "position" | "in_position" | "vertex" | "in_vertex" => Some(Self::VertexInput),
            "normal" | "in_normal" | "normals" => Some(Self::NormalsInput),
            _ => None,
        }
    }

    fn from_uniform(name: &str) -> Option<Self> {
        match name {
            "mvp" | "model_view_projection" => Some(Self::ModelViewProjection),
            "model_view" | "mv" => Some(Self::ModelView),
            "normal_matrix" => Some(Self::NormalMatrix),
            "light_count" | "num_lights" => Some(Self::LightCount),
            "light_positions" => Some(Self::LightPositions),
            "light_colors" => Some(Self::LightColors),
            _ => None,
        }
    }
}

/// A shader program and the input roles it exposes.
#[derive(Debug)]
pub struct Shader {
    source: ShaderSource,
    info: Option<ProgramInfo>,
    inputs: HashMap<ShaderInput, Location>,
}

impl Shader {
    pub fn new(source: ShaderSource) -> Self {
        Self {
            source,
            info: None,
            inputs: HashMap::new(),
        }
    }

    pub fn source(&self) -> &ShaderSource {
        &self.source
    }

    pub fn is_linked(&self) -> bool {
        self.info.is_some()
    }

    pub fn program(&self) -> Option<ProgramHandle> {
        self.info.as_ref().map(|info| info.program)
    }

    pub fn info(&self) -> Option<&ProgramInfo> {
        self.info.as_ref()
    }

    /// Compiles and links the program. A linked shader is left alone.
    pub fn compile(&mut self, device: &mut dyn RenderDevice) -> Result<(), ShaderError> {
        if self.is_linked() {
            return Ok(());
        }
        let name = self.source.name().into_owned();
        let code = self.source.load()?;
        let info = device.compile_program(&name, &code)?;
        debug!(
            "shader '{name}' linked with {} attributes and {} uniforms",
            info.attributes.len(),
            info.uniforms.len()
        );
        self.info = Some(info);
        self.inputs.clear();
        Ok(())
    }

    /// Maps the program's attributes and uniforms to input roles.
    ///
    /// Returns `false` for an unlinked shader or one without a vertex input.
    /// Inputs with unknown names are ignored.
    pub fn parse_raw_information(&mut self) -> bool {
        let Some(info) = &self.info else {
            warn!("shader '{}' is not linked, cannot parse its inputs", self.source.name());
            return false;
        };

        self.inputs.clear();
        let attributes = info
            .attributes
            .iter()
            .filter_map(|a| ShaderInput::from_attribute(&a.name).map(|role| (role, a)));
        let uniforms = info
            .uniforms
            .iter()
            .filter_map(|u| ShaderInput::from_uniform(&u.name).map(|role| (role, u)));
        for (role, variable) in attributes.chain(uniforms) {
            if self.inputs.insert(role, variable.location).is_some() {
                warn!(
                    "shader '{}': '{}' maps to {role:?} a second time",
                    self.source.name(),
                    variable.name
                );
            }
        }

        if !self.inputs.contains_key(&ShaderInput::VertexInput) {
            warn!("shader '{}' has no vertex input", self.source.name());
            return false;
        }
        true
    }

    pub fn location(&self, input: ShaderInput) -> Option<Location> {
        self.inputs.get(&input).copied()
    }

    /// Whether every role in `inputs` was resolved.
    pub fn has_inputs(&self, inputs: &[ShaderInput]) -> bool {
        inputs.iter().all(|input| self.inputs.contains_key(input))
    }

    pub fn release(&mut self, device: &mut dyn RenderDevice) -> ReleaseOutcome {
        let Some(info) = self.info.take() else {
            return ReleaseOutcome::Clean;
        };
        self.inputs.clear();
        device.delete_program(info.program)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::RecordingDevice;
    use crate::scene::{BUILTIN_ADS as ADS_SHADER, BUILTIN_POSITION as POSITION_SHADER};

    #[test]
    fn inputs_resolve_after_parsing() {
        let mut device = RecordingDevice::new();
        let mut shader = Shader::new(ShaderSource::inline("ads", ADS_SHADER));
        assert!(!shader.parse_raw_information());

        shader.compile(&mut device).unwrap();
        assert!(shader.is_linked());
        assert!(shader.parse_raw_information());
        assert!(shader.has_inputs(&[
            ShaderInput::VertexInput,
            ShaderInput::NormalsInput,
            ShaderInput::ModelViewProjection,
            ShaderInput::ModelView,
            ShaderInput::NormalMatrix,
            ShaderInput::LightCount,
            ShaderInput::LightPositions,
            ShaderInput::LightColors,
        ]));
        assert_eq!(shader.location(ShaderInput::VertexInput), Some(Location(0)));
    }

    #[test]
    fn position_shader_lacks_lighting_inputs() {
        let mut device = RecordingDevice::new();
        let mut shader = Shader::new(ShaderSource::inline("pos", POSITION_SHADER));
        shader.compile(&mut device).unwrap();
        assert!(shader.parse_raw_information());
        assert!(shader.has_inputs(&[ShaderInput::VertexInput, ShaderInput::ModelViewProjection]));
        assert!(!shader.has_inputs(&[ShaderInput::NormalsInput]));
    }

    #[test]
    fn missing_file_is_a_read_error() {
        let mut device = RecordingDevice::new();
        let mut shader = Shader::new(ShaderSource::file("/nonexistent/lumen/shader.wgsl"));
        assert!(matches!(shader.compile(&mut device), Err(ShaderError::Read { .. })));
        assert!(!shader.is_linked());
    }

    #[test]
    fn release_forgets_the_program() {
        let mut device = RecordingDevice::new();
        let mut shader = Shader::new(ShaderSource::inline("pos", POSITION_SHADER));
        shader.compile(&mut device).unwrap();
        assert_eq!(shader.release(&mut device), ReleaseOutcome::Clean);
        assert!(!shader.is_linked());
        assert_eq!(device.live_programs(), 0);
    }
}
