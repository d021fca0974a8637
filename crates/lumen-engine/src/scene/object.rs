use std::sync::{Arc, RwLock};

use glam::{Mat4, Vec3};

use crate::render::BufferHandle;
use crate::sync::{read, write};

/// Broad object category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ObjectFlags {
    pub mesh: bool,
    pub light_source: bool,
}

/// Which transforms an object keeps up to date.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MatrixFlags {
    pub model_view_projection: bool,
    pub model_view: bool,
    pub normal: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LightModel {
    #[default]
    None,
    /// Ambient, diffuse and specular terms from point lights.
    SimpleAds,
}

/// Capability table an object reports to the scene and renderers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Hints {
    /// Everything the object needs on the device is uploaded.
    pub data_ready: bool,
    pub flags: ObjectFlags,
    pub num_vertices: u64,
    pub num_indexes: u64,
    pub num_normals: u64,
    pub matrices: MatrixFlags,
    pub num_vbo: u64,
    pub num_ibo: u64,
    pub num_nbo: u64,
    pub light_model: LightModel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HintTag {
    DataReady,
    Flags,
    NumVertices,
    NumIndexes,
    NumNormals,
    Matrices,
    NumVbo,
    NumIbo,
    NumNbo,
    LightModel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HintValue {
    Bool(bool),
    Count(u64),
    Flags(ObjectFlags),
    Matrices(MatrixFlags),
    LightModel(LightModel),
}

impl Hints {
    pub fn get(&self, tag: HintTag) -> HintValue {
        match tag {
            HintTag::DataReady => HintValue::Bool(self.data_ready),
            HintTag::Flags => HintValue::Flags(self.flags),
            HintTag::NumVertices => HintValue::Count(self.num_vertices),
            HintTag::NumIndexes => HintValue::Count(self.num_indexes),
            HintTag::NumNormals => HintValue::Count(self.num_normals),
            HintTag::Matrices => HintValue::Matrices(self.matrices),
            HintTag::NumVbo => HintValue::Count(self.num_vbo),
            HintTag::NumIbo => HintValue::Count(self.num_ibo),
            HintTag::NumNbo => HintValue::Count(self.num_nbo),
            HintTag::LightModel => HintValue::LightModel(self.light_model),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MatrixKind {
    ModelViewProjection,
    ModelView,
    Normal,
}

/// Shared, mutable matrix.
///
/// The object owns the value and updates it; renderers keep a clone of the
/// handle taken at assignment time and read it every frame.
#[derive(Debug, Clone, Default)]
pub struct Transform(Arc<RwLock<Mat4>>);

impl Transform {
    pub fn new(matrix: Mat4) -> Self {
        Self(Arc::new(RwLock::new(matrix)))
    }

    pub fn get(&self) -> Mat4 {
        *read(&self.0)
    }

    pub fn set(&self, matrix: Mat4) {
        *write(&self.0) = matrix;
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

/// Light parameters pulled by lighting renderers every frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LightData {
    pub position: Vec3,
    pub color: Vec3,
    /// Ambient contribution, 0..1.
    pub ambient: f32,
}

/// Anything that can be placed into a scene.
///
/// Objects are owned by the application and shared with the scene. Device
/// handles are `None` until the object uploaded its data.
pub trait SceneObject: Send + Sync {
    fn name(&self) -> &str;

    fn hints(&self) -> Hints;

    fn vertex_buffer(&self) -> Option<BufferHandle> {
        None
    }

    fn index_buffer(&self) -> Option<BufferHandle> {
        None
    }

    fn normal_buffer(&self) -> Option<BufferHandle> {
        None
    }

    fn matrix(&self, _kind: MatrixKind) -> Option<Transform> {
        None
    }

    fn light(&self) -> Option<LightData> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hints_are_queryable_by_tag() {
        let hints = Hints {
            data_ready: true,
            num_indexes: 36,
            light_model: LightModel::SimpleAds,
            ..Hints::default()
        };
        assert_eq!(hints.get(HintTag::DataReady), HintValue::Bool(true));
        assert_eq!(hints.get(HintTag::NumIndexes), HintValue::Count(36));
        assert_eq!(hints.get(HintTag::NumNbo), HintValue::Count(0));
        assert_eq!(
            hints.get(HintTag::LightModel),
            HintValue::LightModel(LightModel::SimpleAds)
        );
    }

    #[test]
    fn transform_handles_share_the_value() {
        let t = Transform::new(Mat4::IDENTITY);
        let cached = t.clone();
        t.set(Mat4::from_scale(Vec3::splat(2.0)));
        assert_eq!(cached.get(), Mat4::from_scale(Vec3::splat(2.0)));
        assert!(cached.ptr_eq(&t));
        assert!(!cached.ptr_eq(&Transform::default()));
    }
}
