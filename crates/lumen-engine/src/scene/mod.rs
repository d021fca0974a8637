//! Scene pipeline: objects, shaders and the renderers that tie them together.
//!
//! A frame is drawn only when `SceneGraph::can_render_scene` holds; the
//! `SceneRenderer` plugs that gate into the render loop.

mod error;
mod frame;
mod graph;
mod light;
mod matrices;
mod mesh;
mod object;
mod shader;

pub use error::{CompileFailure, SceneError};
pub use frame::SceneRenderer;
pub use graph::SceneGraph;
pub use light::PointLight;
pub use matrices::SceneMatrices;
pub use mesh::{MeshData, MeshError, SimpleMesh};
pub use object::{
    HintTag, HintValue, Hints, LightData, LightModel, MatrixFlags, MatrixKind, ObjectFlags,
    SceneObject, Transform,
};
pub use shader::{Shader, ShaderInput, ShaderSource};

/// Positions only, flat colour.
pub const BUILTIN_POSITION: &str = include_str!("../../shaders/position.wgsl");
/// Positions and normals, colour from the normal direction.
pub const BUILTIN_NORMAL: &str = include_str!("../../shaders/normal.wgsl");
/// Ambient/diffuse/specular lighting from up to eight point lights.
pub const BUILTIN_ADS: &str = include_str!("../../shaders/ads.wgsl");
