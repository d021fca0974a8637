use crate::render::ShaderError;

#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("object index {0} is out of range")]
    ObjectOutOfRange(usize),

    #[error("object slot {0} is empty")]
    EmptySlot(usize),

    #[error("object {object} references shader {shader}, which does not exist")]
    ShaderOutOfRange { object: usize, shader: usize },

    #[error("no renderer can draw '{0}' with its shader")]
    NoMatchingRenderer(String),
}

/// First shader that failed to compile.
#[derive(Debug, thiserror::Error)]
#[error("shader {index} failed to compile")]
pub struct CompileFailure {
    pub index: usize,
    #[source]
    pub error: ShaderError,
}
