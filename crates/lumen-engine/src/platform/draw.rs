use std::collections::{BTreeSet, HashMap};
use std::num::NonZeroU64;

use log::{debug, warn};
use wgpu::util::DeviceExt;

use crate::render::{
    BufferHandle, BufferKind, ClearColor, DeviceError, Location, ProgramHandle, ProgramInfo,
    ReleaseOutcome, RenderDevice, ShaderError, UniformValue, Viewport, reflect_wgsl,
};

struct Program {
    name: String,
    pipeline: wgpu::RenderPipeline,
    info: ProgramInfo,
    /// Vertex buffer slot of each attribute location.
    slots: HashMap<Location, u32>,
    /// Last uploaded uniform values; persists across frames like GL program state.
    uniforms: Vec<u8>,
}

struct Buffer {
    buffer: wgpu::Buffer,
    kind: BufferKind,
}

struct DrawCall {
    program: ProgramHandle,
    uniforms: Vec<u8>,
    vertex: Vec<(u32, BufferHandle)>,
    index: BufferHandle,
    count: u32,
}

struct UniformArena {
    buffer: wgpu::Buffer,
    capacity: u64,
}

/// `RenderDevice` on top of wgpu.
///
/// Commands issued during a frame are recorded; `encode_frame` replays them
/// into one render pass that clears to the last clear colour. Each attribute
/// gets its own vertex buffer slot, and every program shares one uniform
/// bind group layout (group 0, binding 0, dynamic offset).
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    format: wgpu::TextureFormat,
    uniform_layout: wgpu::BindGroupLayout,
    uniform_alignment: u64,
    arena: Option<UniformArena>,

    programs: HashMap<ProgramHandle, Program>,
    buffers: HashMap<BufferHandle, Buffer>,
    next_id: u32,

    current: Option<ProgramHandle>,
    enabled: BTreeSet<Location>,
    bound: HashMap<Location, BufferHandle>,
    index: Option<BufferHandle>,

    clear: ClearColor,
    viewport: Option<Viewport>,
    draws: Vec<DrawCall>,
}

impl WgpuDevice {
    pub fn new(device: wgpu::Device, queue: wgpu::Queue, format: wgpu::TextureFormat) -> Self {
        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("lumen uniforms bgl"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: None,
                },
                count: None,
            }],
        });
        let uniform_alignment = u64::from(device.limits().min_uniform_buffer_offset_alignment);

        Self {
            device,
            queue,
            format,
            uniform_layout,
            uniform_alignment,
            arena: None,
            programs: HashMap::new(),
            buffers: HashMap::new(),
            next_id: 0,
            current: None,
            enabled: BTreeSet::new(),
            bound: HashMap::new(),
            index: None,
            clear: ClearColor::BLACK,
            viewport: None,
            draws: Vec::new(),
        }
    }

    pub fn pending_draws(&self) -> usize {
        self.draws.len()
    }

    /// Drops the recorded frame without drawing it.
    pub fn discard_frame(&mut self) {
        self.draws.clear();
    }

    /// Replays the recorded frame into `encoder`, targeting `view`.
    pub fn encode_frame(
        &mut self,
        encoder: &mut wgpu::CommandEncoder,
        view: &wgpu::TextureView,
        target: (u32, u32),
    ) {
        let draws = std::mem::take(&mut self.draws);
        let offsets = self.upload_uniforms(&draws);
        let bind_group = self.arena.as_ref().zip(offsets.binding_size).map(|(arena, size)| {
            self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("lumen uniforms"),
                layout: &self.uniform_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                        buffer: &arena.buffer,
                        offset: 0,
                        size: Some(size),
                    }),
                }],
            })
        });

        let c = self.clear;
        let mut rpass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
            label: Some("lumen frame pass"),
            color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                view,
                resolve_target: None,
                ops: wgpu::Operations {
                    load: wgpu::LoadOp::Clear(wgpu::Color {
                        r: f64::from(c.r),
                        g: f64::from(c.g),
                        b: f64::from(c.b),
                        a: f64::from(c.a),
                    }),
                    store: wgpu::StoreOp::Store,
                },
                depth_slice: None,
            })],
            depth_stencil_attachment: None,
            timestamp_writes: None,
            occlusion_query_set: None,
            multiview_mask: None,
        });

        if let Some((x, y, w, h)) = self.viewport.and_then(|v| clamp_viewport(v, target)) {
            rpass.set_viewport(x, y, w, h, 0.0, 1.0);
        }

        for (draw, offset) in draws.iter().zip(offsets.per_draw) {
            let (Some(program), Some(index)) =
                (self.programs.get(&draw.program), self.buffers.get(&draw.index))
            else {
                continue;
            };
            rpass.set_pipeline(&program.pipeline);
            if let (Some(group), Some(offset)) = (bind_group.as_ref(), offset) {
                rpass.set_bind_group(0, group, &[offset]);
            }
            for (slot, handle) in &draw.vertex {
                if let Some(vertex) = self.buffers.get(handle) {
                    rpass.set_vertex_buffer(*slot, vertex.buffer.slice(..));
                }
            }
            rpass.set_index_buffer(index.buffer.slice(..), wgpu::IndexFormat::Uint32);
            rpass.draw_indexed(0..draw.count, 0, 0..1);
        }
    }

    /// Packs every draw's uniform block into the arena at aligned offsets.
    fn upload_uniforms(&mut self, draws: &[DrawCall]) -> UniformOffsets {
        let largest = draws.iter().map(|d| d.uniforms.len() as u64).max().unwrap_or(0);
        let Some(binding_size) = NonZeroU64::new(largest.next_multiple_of(16)) else {
            return UniformOffsets {
                per_draw: vec![None; draws.len()],
                binding_size: None,
            };
        };

        let mut bytes = Vec::new();
        let mut per_draw = Vec::with_capacity(draws.len());
        for draw in draws {
            if draw.uniforms.is_empty() {
                per_draw.push(None);
                continue;
            }
            let offset = (bytes.len() as u64).next_multiple_of(self.uniform_alignment);
            bytes.resize(offset as usize, 0);
            bytes.extend_from_slice(&draw.uniforms);
            per_draw.push(u32::try_from(offset).ok());
        }
        // The last binding window must fit entirely inside the buffer.
        let needed = bytes.len() as u64 + binding_size.get();
        bytes.resize(needed.next_multiple_of(4) as usize, 0);

        if self.arena.as_ref().is_none_or(|a| a.capacity < bytes.len() as u64) {
            let capacity = (bytes.len() as u64).next_power_of_two().max(4096);
            self.arena = Some(UniformArena {
                buffer: self.device.create_buffer(&wgpu::BufferDescriptor {
                    label: Some("lumen uniform arena"),
                    size: capacity,
                    usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                    mapped_at_creation: false,
                }),
                capacity,
            });
        }
        if let Some(arena) = self.arena.as_ref() {
            self.queue.write_buffer(&arena.buffer, 0, &bytes);
        }

        UniformOffsets {
            per_draw,
            binding_size: Some(binding_size),
        }
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }

    fn create_pipeline(
        &self,
        name: &str,
        code: &str,
        info: &ProgramInfo,
    ) -> Result<(wgpu::RenderPipeline, HashMap<Location, u32>), ShaderError> {
        let compile_error = |message: String| ShaderError::Compile {
            name: name.to_string(),
            message,
        };

        let mut attributes = Vec::with_capacity(info.attributes.len());
        let mut slots = HashMap::new();
        for (slot, attribute) in info.attributes.iter().enumerate() {
            let format = vertex_format(attribute.size).ok_or_else(|| {
                compile_error(format!(
                    "attribute '{}' has an unsupported size of {} bytes",
                    attribute.name, attribute.size
                ))
            })?;
            attributes.push((
                u64::from(attribute.size),
                [wgpu::VertexAttribute {
                    format,
                    offset: 0,
                    shader_location: attribute.location.0,
                }],
            ));
            slots.insert(attribute.location, slot as u32);
        }
        let layouts: Vec<wgpu::VertexBufferLayout<'_>> = attributes
            .iter()
            .map(|(stride, attribute)| wgpu::VertexBufferLayout {
                array_stride: *stride,
                step_mode: wgpu::VertexStepMode::Vertex,
                attributes: attribute,
            })
            .collect();

        let module = self.device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some(name),
            source: wgpu::ShaderSource::Wgsl(code.into()),
        });

        let bind_group_layouts: &[&wgpu::BindGroupLayout] = if info.uniform_block_size > 0 {
            &[&self.uniform_layout]
        } else {
            &[]
        };
        let layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(name),
                bind_group_layouts,
                immediate_size: 0,
            });

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(name),
                layout: Some(&layout),
                vertex: wgpu::VertexState {
                    module: &module,
                    entry_point: None,
                    compilation_options: Default::default(),
                    buffers: &layouts,
                },
                fragment: Some(wgpu::FragmentState {
                    module: &module,
                    entry_point: None,
                    compilation_options: Default::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: self.format,
                        blend: Some(wgpu::BlendState::REPLACE),
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState {
                    topology: wgpu::PrimitiveTopology::TriangleList,
                    strip_index_format: None,
                    front_face: wgpu::FrontFace::Ccw,
                    cull_mode: Some(wgpu::Face::Back),
                    polygon_mode: wgpu::PolygonMode::Fill,
                    unclipped_depth: false,
                    conservative: false,
                },
                depth_stencil: None,
                multisample: wgpu::MultisampleState::default(),
                multiview_mask: None,
                cache: None,
            });

        Ok((pipeline, slots))
    }
}

struct UniformOffsets {
    per_draw: Vec<Option<u32>>,
    binding_size: Option<NonZeroU64>,
}

impl RenderDevice for WgpuDevice {
    fn compile_program(&mut self, name: &str, code: &str) -> Result<ProgramInfo, ShaderError> {
        let reflection = reflect_wgsl(code).map_err(|message| ShaderError::Compile {
            name: name.to_string(),
            message,
        })?;
        let program = ProgramHandle(self.next_id());
        let info = ProgramInfo {
            program,
            attributes: reflection.attributes,
            uniforms: reflection.uniforms,
            uniform_block_size: reflection.uniform_block_size,
        };
        let (pipeline, slots) = self.create_pipeline(name, code, &info)?;
        debug!("program '{name}' created as {program:?}");

        self.programs.insert(
            program,
            Program {
                name: name.to_string(),
                pipeline,
                uniforms: vec![0; info.uniform_block_size as usize],
                info: info.clone(),
                slots,
            },
        );
        Ok(info)
    }

    fn delete_program(&mut self, program: ProgramHandle) -> ReleaseOutcome {
        if self.current == Some(program) {
            self.current = None;
        }
        match self.programs.remove(&program) {
            Some(p) => {
                debug!("program '{}' deleted", p.name);
                ReleaseOutcome::Clean
            }
            None => ReleaseOutcome::CleanWithWarnings(-1),
        }
    }

    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> Result<BufferHandle, DeviceError> {
        let (label, usage) = match kind {
            BufferKind::Vertex => ("vertex", wgpu::BufferUsages::VERTEX),
            BufferKind::Normal => ("normal", wgpu::BufferUsages::VERTEX),
            BufferKind::Index => ("index", wgpu::BufferUsages::INDEX),
        };
        if data.is_empty() {
            return Err(DeviceError::EmptyBuffer(label));
        }
        let buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(label),
                contents: data,
                usage,
            });
        let handle = BufferHandle(self.next_id());
        self.buffers.insert(handle, Buffer { buffer, kind });
        Ok(handle)
    }

    fn release_buffer(&mut self, buffer: BufferHandle) -> ReleaseOutcome {
        self.bound.retain(|_, b| *b != buffer);
        if self.index == Some(buffer) {
            self.index = None;
        }
        match self.buffers.remove(&buffer) {
            Some(b) => {
                b.buffer.destroy();
                ReleaseOutcome::Clean
            }
            None => ReleaseOutcome::CleanWithWarnings(-1),
        }
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.viewport = Some(viewport);
    }

    fn clear(&mut self, color: ClearColor) {
        self.clear = color;
    }

    fn use_program(&mut self, program: ProgramHandle) {
        if self.programs.contains_key(&program) {
            self.current = Some(program);
        } else {
            warn!("use_program: unknown program {program:?}");
            self.current = None;
        }
    }

    fn upload_uniform(&mut self, location: Location, value: UniformValue<'_>) {
        let Some(program) = self.current.and_then(|p| self.programs.get_mut(&p)) else {
            warn!("upload_uniform without a program in use");
            return;
        };
        let Some(variable) = program.info.uniforms.iter().find(|u| u.location == location) else {
            warn!("program '{}' has no uniform at {location:?}", program.name);
            return;
        };
        let start = variable.offset as usize;
        let end = (start + variable.size as usize).min(program.uniforms.len());
        let target = &mut program.uniforms[start..end];

        let bytes: Vec<u8> = match value {
            UniformValue::Mat4(m) => bytemuck::cast_slice(&m.to_cols_array()).to_vec(),
            UniformValue::Vec4Array(values) => bytemuck::cast_slice(values).to_vec(),
            UniformValue::Int(i) => i.to_ne_bytes().to_vec(),
        };
        let n = bytes.len().min(target.len());
        target[..n].copy_from_slice(&bytes[..n]);
    }

    fn enable_attribute(&mut self, location: Location) {
        self.enabled.insert(location);
    }

    fn disable_attribute(&mut self, location: Location) {
        self.enabled.remove(&location);
    }

    fn bind_vertex_buffer(&mut self, location: Location, buffer: BufferHandle, components: u32) {
        match self.buffers.get(&buffer) {
            Some(b) if b.kind != BufferKind::Index => {
                if let Some(attribute) = self
                    .current
                    .and_then(|p| self.programs.get(&p))
                    .and_then(|p| p.info.attributes.iter().find(|a| a.location == location))
                {
                    if attribute.size != components * 4 {
                        warn!(
                            "attribute '{}' expects {} bytes per vertex, bound with {components} components",
                            attribute.name, attribute.size
                        );
                    }
                }
                self.bound.insert(location, buffer);
            }
            _ => warn!("bind_vertex_buffer: {buffer:?} is not a vertex buffer"),
        }
    }

    fn bind_index_buffer(&mut self, buffer: BufferHandle) {
        match self.buffers.get(&buffer) {
            Some(b) if b.kind == BufferKind::Index => self.index = Some(buffer),
            _ => warn!("bind_index_buffer: {buffer:?} is not an index buffer"),
        }
    }

    fn draw_indexed(&mut self, count: u32) {
        let (Some(handle), Some(index)) = (self.current, self.index) else {
            warn!("draw_indexed without a program or index buffer");
            return;
        };
        let Some(program) = self.programs.get(&handle) else {
            return;
        };

        let mut vertex = Vec::with_capacity(program.slots.len());
        for (location, slot) in &program.slots {
            match self.bound.get(location) {
                Some(buffer) if self.enabled.contains(location) => vertex.push((*slot, *buffer)),
                _ => {
                    warn!(
                        "program '{}': attribute at {location:?} is not enabled and bound, draw skipped",
                        program.name
                    );
                    return;
                }
            }
        }

        self.draws.push(DrawCall {
            program: handle,
            uniforms: program.uniforms.clone(),
            vertex,
            index,
            count,
        });
    }
}

fn vertex_format(size: u32) -> Option<wgpu::VertexFormat> {
    match size {
        4 => Some(wgpu::VertexFormat::Float32),
        8 => Some(wgpu::VertexFormat::Float32x2),
        12 => Some(wgpu::VertexFormat::Float32x3),
        16 => Some(wgpu::VertexFormat::Float32x4),
        _ => None,
    }
}

/// Converts a bottom-left origin viewport into a wgpu viewport inside `target`.
fn clamp_viewport(v: Viewport, target: (u32, u32)) -> Option<(f32, f32, f32, f32)> {
    let (tw, th) = (i64::from(target.0), i64::from(target.1));
    let x0 = i64::from(v.x).clamp(0, tw);
    let x1 = (i64::from(v.x) + i64::from(v.width)).clamp(0, tw);
    let top = th - (i64::from(v.y) + i64::from(v.height));
    let y0 = top.clamp(0, th);
    let y1 = (th - i64::from(v.y)).clamp(0, th);
    if x1 <= x0 || y1 <= y0 {
        return None;
    }
    Some((x0 as f32, y0 as f32, (x1 - x0) as f32, (y1 - y0) as f32))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_window_viewport_is_unchanged() {
        let v = Viewport::new(0, 0, 800, 600);
        assert_eq!(clamp_viewport(v, (800, 600)), Some((0.0, 0.0, 800.0, 600.0)));
    }

    #[test]
    fn viewport_origin_flips_and_clamps() {
        let v = Viewport::new(10, 20, 100, 50);
        assert_eq!(clamp_viewport(v, (800, 600)), Some((10.0, 530.0, 100.0, 50.0)));

        let oversized = Viewport::new(0, 0, 1000, 1000);
        assert_eq!(clamp_viewport(oversized, (800, 600)), Some((0.0, 0.0, 800.0, 600.0)));
        assert_eq!(clamp_viewport(Viewport::new(900, 0, 10, 10), (800, 600)), None);
    }

    #[test]
    fn attribute_sizes_map_to_float_formats() {
        assert_eq!(vertex_format(12), Some(wgpu::VertexFormat::Float32x3));
        assert_eq!(vertex_format(6), None);
    }
}
