use std::sync::Mutex;

use glam::{Mat4, Vec3};
use log::{debug, error, info, warn};

use super::{
    Hints, LightModel, MatrixFlags, MatrixKind, ObjectFlags, SceneMatrices, SceneObject, Transform,
};
use crate::render::{BufferHandle, BufferKind, DeviceError, ReleaseOutcome, RenderDevice};
use crate::sync::lock;

/// CPU-side triangle mesh.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    /// Empty, or one per position.
    pub normals: Vec<[f32; 3]>,
    pub indices: Vec<u32>,
}

impl MeshData {
    /// Axis-aligned cube centred on the origin with per-face normals and
    /// counter-clockwise outward winding.
    pub fn cube(half_extent: f32) -> Self {
        const FACES: [([f32; 3], [f32; 3], [f32; 3]); 6] = [
            ([1.0, 0.0, 0.0], [0.0, 0.0, -1.0], [0.0, 1.0, 0.0]),
            ([-1.0, 0.0, 0.0], [0.0, 0.0, 1.0], [0.0, 1.0, 0.0]),
            ([0.0, 1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, -1.0]),
            ([0.0, -1.0, 0.0], [1.0, 0.0, 0.0], [0.0, 0.0, 1.0]),
            ([0.0, 0.0, 1.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
            ([0.0, 0.0, -1.0], [-1.0, 0.0, 0.0], [0.0, 1.0, 0.0]),
        ];

        let mut mesh = Self::default();
        for (normal, u, v) in FACES {
            let (n, u, v) = (Vec3::from(normal), Vec3::from(u), Vec3::from(v));
            let center = n * half_extent;
            let base = mesh.positions.len() as u32;
            for (su, sv) in [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)] {
                let corner = center + (u * su + v * sv) * half_extent;
                mesh.positions.push(corner.to_array());
                mesh.normals.push(normal);
            }
            mesh.indices
                .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
        }
        mesh
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MeshError {
    #[error("mesh '{0}' is already uploaded")]
    AlreadyUploaded(String),

    #[error("mesh '{0}' has no data left in RAM")]
    NotInRam(String),

    #[error("mesh '{0}' is not uploaded")]
    NotUploaded(String),

    #[error("mesh '{0}' is corrupted")]
    Corrupted(String),

    #[error("uploading mesh '{name}' failed")]
    Device {
        name: String,
        #[source]
        source: DeviceError,
    },
}

#[derive(Debug, Clone, Copy)]
struct Buffers {
    vertex: BufferHandle,
    index: BufferHandle,
    normal: Option<BufferHandle>,
}

#[derive(Debug, Default)]
struct GpuState {
    data: Option<MeshData>,
    buffers: Option<Buffers>,
    corrupted: bool,
}

/// Indexed mesh with its own model matrix.
///
/// The derived matrices (model-view-projection, model-view, normal) are shared
/// `Transform`s so renderers pick up changes without being reassigned.
#[derive(Debug)]
pub struct SimpleMesh {
    name: String,
    state: Mutex<GpuState>,
    num_vertices: u64,
    num_indexes: u64,
    num_normals: u64,
    light_model: LightModel,
    keep_data_in_ram: bool,
    model: Transform,
    mvp: Transform,
    model_view: Transform,
    normal: Transform,
}

impl SimpleMesh {
    pub fn new(name: impl Into<String>, data: MeshData) -> Self {
        let light_model = if data.normals.is_empty() {
            LightModel::None
        } else {
            LightModel::SimpleAds
        };
        Self {
            name: name.into(),
            num_vertices: data.positions.len() as u64,
            num_indexes: data.indices.len() as u64,
            num_normals: data.normals.len() as u64,
            state: Mutex::new(GpuState {
                data: Some(data),
                ..GpuState::default()
            }),
            light_model,
            keep_data_in_ram: false,
            model: Transform::default(),
            mvp: Transform::default(),
            model_view: Transform::default(),
            normal: Transform::default(),
        }
    }

    /// Keep the CPU copy after uploading, so the mesh can be uploaded again.
    pub fn keep_data_in_ram(mut self, keep: bool) -> Self {
        self.keep_data_in_ram = keep;
        self
    }

    pub fn with_light_model(mut self, model: LightModel) -> Self {
        self.light_model = model;
        self
    }

    pub fn is_uploaded(&self) -> bool {
        lock(&self.state).buffers.is_some()
    }

    pub fn has_ram_data(&self) -> bool {
        lock(&self.state).data.is_some()
    }

    pub fn clear_ram_data(&self) {
        lock(&self.state).data = None;
    }

    pub fn upload(&self, device: &mut dyn RenderDevice) -> Result<(), MeshError> {
        let mut state = lock(&self.state);
        if state.corrupted {
            return Err(MeshError::Corrupted(self.name.clone()));
        }
        if state.buffers.is_some() {
            return Err(MeshError::AlreadyUploaded(self.name.clone()));
        }
        let Some(data) = state.data.as_ref() else {
            return Err(MeshError::NotInRam(self.name.clone()));
        };

        let device_error = |source| MeshError::Device {
            name: self.name.clone(),
            source,
        };
        let vertex = device
            .create_buffer(BufferKind::Vertex, bytemuck::cast_slice(&data.positions))
            .map_err(device_error)?;
        let index = match device.create_buffer(BufferKind::Index, bytemuck::cast_slice(&data.indices)) {
            Ok(index) => index,
            Err(e) => {
                device.release_buffer(vertex);
                return Err(device_error(e));
            }
        };
        let normal = if data.normals.is_empty() {
            None
        } else {
            match device.create_buffer(BufferKind::Normal, bytemuck::cast_slice(&data.normals)) {
                Ok(normal) => Some(normal),
                Err(e) => {
                    device.release_buffer(vertex);
                    device.release_buffer(index);
                    return Err(device_error(e));
                }
            }
        };

        state.buffers = Some(Buffers {
            vertex,
            index,
            normal,
        });
        if !self.keep_data_in_ram {
            state.data = None;
        }
        info!(
            "mesh '{}' uploaded: {} vertices, {} indexes",
            self.name, self.num_vertices, self.num_indexes
        );
        Ok(())
    }

    /// Releases the device buffers.
    ///
    /// The combined outcome decides what happens to the mesh: a clean release
    /// (with or without warnings) forgets the buffers, `NotReleased` keeps them
    /// so the release can be retried, `Corrupted` marks the mesh unusable.
    pub fn release(&self, device: &mut dyn RenderDevice) -> Result<ReleaseOutcome, MeshError> {
        let mut state = lock(&self.state);
        let Some(buffers) = state.buffers else {
            return Err(MeshError::NotUploaded(self.name.clone()));
        };

        let mut outcome = device
            .release_buffer(buffers.vertex)
            .worst(device.release_buffer(buffers.index));
        if let Some(normal) = buffers.normal {
            outcome = outcome.worst(device.release_buffer(normal));
        }

        match outcome {
            ReleaseOutcome::Clean => {
                state.buffers = None;
                debug!("mesh '{}' released", self.name);
            }
            ReleaseOutcome::CleanWithWarnings(code) => {
                state.buffers = None;
                warn!("mesh '{}' released with warnings (code {code})", self.name);
            }
            ReleaseOutcome::NotReleased(code) => {
                error!("mesh '{}' could not be released (code {code}), keeping its buffers", self.name);
            }
            ReleaseOutcome::Corrupted => {
                state.buffers = None;
                state.corrupted = true;
                error!("mesh '{}' is completely broken and can no longer be used", self.name);
            }
        }
        Ok(outcome)
    }

    pub fn set_model(&self, model: Mat4) {
        self.model.set(model);
    }

    pub fn model(&self) -> Mat4 {
        self.model.get()
    }

    /// Recomputes the derived matrices from the model matrix and camera.
    pub fn update_matrices(&self, camera: &SceneMatrices) {
        let model = self.model.get();
        let model_view = camera.view() * model;
        self.mvp.set(camera.view_projection() * model);
        self.model_view.set(model_view);
        self.normal.set(model_view.inverse().transpose());
    }
}

impl SceneObject for SimpleMesh {
    fn name(&self) -> &str {
        &self.name
    }

    fn hints(&self) -> Hints {
        let state = lock(&self.state);
        Hints {
            data_ready: state.buffers.is_some() && !state.corrupted,
            flags: ObjectFlags {
                mesh: true,
                light_source: false,
            },
            num_vertices: self.num_vertices,
            num_indexes: self.num_indexes,
            num_normals: self.num_normals,
            matrices: MatrixFlags {
                model_view_projection: true,
                model_view: true,
                normal: true,
            },
            num_vbo: 1,
            num_ibo: 1,
            num_nbo: u64::from(self.num_normals > 0),
            light_model: self.light_model,
        }
    }

    fn vertex_buffer(&self) -> Option<BufferHandle> {
        lock(&self.state).buffers.map(|b| b.vertex)
    }

    fn index_buffer(&self) -> Option<BufferHandle> {
        lock(&self.state).buffers.map(|b| b.index)
    }

    fn normal_buffer(&self) -> Option<BufferHandle> {
        lock(&self.state).buffers.and_then(|b| b.normal)
    }

    fn matrix(&self, kind: MatrixKind) -> Option<Transform> {
        Some(match kind {
            MatrixKind::ModelViewProjection => self.mvp.clone(),
            MatrixKind::ModelView => self.model_view.clone(),
            MatrixKind::Normal => self.normal.clone(),
        })
    }
}
