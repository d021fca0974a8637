use std::collections::{BTreeSet, HashMap};

use glam::{Mat4, Vec4};

use super::{
    BufferHandle, BufferKind, ClearColor, DeviceError, Location, ProgramHandle, ProgramInfo,
    ReleaseOutcome, RenderDevice, ShaderError, UniformValue, Viewport, reflect_wgsl,
};

#[derive(Debug, Clone, PartialEq)]
pub enum RecordedUniform {
    Mat4(Mat4),
    Vec4Array(Vec<Vec4>),
    Int(i32),
}

impl From<UniformValue<'_>> for RecordedUniform {
    fn from(value: UniformValue<'_>) -> Self {
        match value {
            UniformValue::Mat4(m) => Self::Mat4(m),
            UniformValue::Vec4Array(v) => Self::Vec4Array(v.to_vec()),
            UniformValue::Int(i) => Self::Int(i),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCommand {
    Viewport(Viewport),
    Clear(ClearColor),
    UseProgram(ProgramHandle),
    Uniform {
        location: Location,
        value: RecordedUniform,
    },
    EnableAttribute(Location),
    DisableAttribute(Location),
    BindVertexBuffer {
        location: Location,
        buffer: BufferHandle,
        components: u32,
    },
    BindIndexBuffer(BufferHandle),
    DrawIndexed {
        count: u32,
    },
}

/// Device that records commands instead of executing them.
///
/// Backs `HeadlessContext`. Programs are validated with the WGSL reflector so
/// broken shaders fail to compile the same way they would on a GPU.
#[derive(Debug, Default)]
pub struct RecordingDevice {
    commands: Vec<DeviceCommand>,
    last_frame: Vec<DeviceCommand>,
    programs: HashMap<ProgramHandle, String>,
    buffers: HashMap<BufferHandle, (BufferKind, usize)>,
    enabled: BTreeSet<Location>,
    next_id: u32,
    release_override: Option<ReleaseOutcome>,
}

impl RecordingDevice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent release report `outcome` instead of the real result.
    pub fn force_release_outcome(&mut self, outcome: Option<ReleaseOutcome>) {
        self.release_override = outcome;
    }

    /// Commands recorded since the last `end_frame`.
    pub fn commands(&self) -> &[DeviceCommand] {
        &self.commands
    }

    /// Commands of the most recently finished frame.
    pub fn last_frame(&self) -> &[DeviceCommand] {
        &self.last_frame
    }

    pub fn end_frame(&mut self) {
        self.last_frame = std::mem::take(&mut self.commands);
    }

    pub fn enabled_attributes(&self) -> &BTreeSet<Location> {
        &self.enabled
    }

    pub fn live_buffers(&self) -> usize {
        self.buffers.len()
    }

    pub fn live_programs(&self) -> usize {
        self.programs.len()
    }

    pub fn buffer_len(&self, buffer: BufferHandle) -> Option<usize> {
        self.buffers.get(&buffer).map(|(_, len)| *len)
    }

    fn next_id(&mut self) -> u32 {
        self.next_id += 1;
        self.next_id
    }
}

impl RenderDevice for RecordingDevice {
    fn compile_program(&mut self, name: &str, code: &str) -> Result<ProgramInfo, ShaderError> {
        let reflection = reflect_wgsl(code).map_err(|message| ShaderError::Compile {
            name: name.to_string(),
            message,
        })?;
        let program = ProgramHandle(self.next_id());
        self.programs.insert(program, name.to_string());
        Ok(ProgramInfo {
            program,
            attributes: reflection.attributes,
            uniforms: reflection.uniforms,
            uniform_block_size: reflection.uniform_block_size,
        })
    }

    fn delete_program(&mut self, program: ProgramHandle) -> ReleaseOutcome {
        if let Some(outcome) = self.release_override {
            return outcome;
        }
        match self.programs.remove(&program) {
            Some(_) => ReleaseOutcome::Clean,
            None => ReleaseOutcome::CleanWithWarnings(-1),
        }
    }

    fn create_buffer(&mut self, kind: BufferKind, data: &[u8]) -> Result<BufferHandle, DeviceError> {
        if data.is_empty() {
            return Err(DeviceError::EmptyBuffer(match kind {
                BufferKind::Vertex => "vertex",
                BufferKind::Normal => "normal",
                BufferKind::Index => "index",
            }));
        }
        let buffer = BufferHandle(self.next_id());
        self.buffers.insert(buffer, (kind, data.len()));
        Ok(buffer)
    }

    fn release_buffer(&mut self, buffer: BufferHandle) -> ReleaseOutcome {
        if let Some(outcome) = self.release_override {
            if outcome.is_released() {
                self.buffers.remove(&buffer);
            }
            return outcome;
        }
        match self.buffers.remove(&buffer) {
            Some(_) => ReleaseOutcome::Clean,
            None => ReleaseOutcome::CleanWithWarnings(-1),
        }
    }

    fn set_viewport(&mut self, viewport: Viewport) {
        self.commands.push(DeviceCommand::Viewport(viewport));
    }

    fn clear(&mut self, color: ClearColor) {
        self.commands.push(DeviceCommand::Clear(color));
    }

    fn use_program(&mut self, program: ProgramHandle) {
        self.commands.push(DeviceCommand::UseProgram(program));
    }

    fn upload_uniform(&mut self, location: Location, value: UniformValue<'_>) {
        self.commands.push(DeviceCommand::Uniform {
            location,
            value: value.into(),
        });
    }

    fn enable_attribute(&mut self, location: Location) {
        self.enabled.insert(location);
        self.commands.push(DeviceCommand::EnableAttribute(location));
    }

    fn disable_attribute(&mut self, location: Location) {
        self.enabled.remove(&location);
        self.commands.push(DeviceCommand::DisableAttribute(location));
    }

    fn bind_vertex_buffer(&mut self, location: Location, buffer: BufferHandle, components: u32) {
        self.commands.push(DeviceCommand::BindVertexBuffer {
            location,
            buffer,
            components,
        });
    }

    fn bind_index_buffer(&mut self, buffer: BufferHandle) {
        self.commands.push(DeviceCommand::BindIndexBuffer(buffer));
    }

    fn draw_indexed(&mut self, index_count: u32) {
        self.commands.push(DeviceCommand::DrawIndexed { count: index_count });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffers_are_tracked_until_released() {
        let mut device = RecordingDevice::new();
        let vbo = device.create_buffer(BufferKind::Vertex, &[0; 36]).unwrap();
        assert_eq!(device.buffer_len(vbo), Some(36));
        assert_eq!(device.live_buffers(), 1);

        assert_eq!(device.release_buffer(vbo), ReleaseOutcome::Clean);
        assert_eq!(device.release_buffer(vbo), ReleaseOutcome::CleanWithWarnings(-1));
        assert_eq!(device.live_buffers(), 0);
    }

    #[test]
    fn empty_buffers_are_rejected() {
        let mut device = RecordingDevice::new();
        assert!(matches!(
            device.create_buffer(BufferKind::Index, &[]),
            Err(DeviceError::EmptyBuffer("index"))
        ));
    }

    #[test]
    fn forced_failures_keep_the_buffer() {
        let mut device = RecordingDevice::new();
        let vbo = device.create_buffer(BufferKind::Vertex, &[1; 12]).unwrap();
        device.force_release_outcome(Some(ReleaseOutcome::NotReleased(2)));
        assert_eq!(device.release_buffer(vbo), ReleaseOutcome::NotReleased(2));
        assert_eq!(device.live_buffers(), 1);
    }

    #[test]
    fn end_frame_moves_commands() {
        let mut device = RecordingDevice::new();
        device.clear(ClearColor::BLACK);
        device.enable_attribute(Location(0));
        device.end_frame();
        assert!(device.commands().is_empty());
        assert_eq!(device.last_frame().len(), 2);
        assert!(device.enabled_attributes().contains(&Location(0)));
    }

    #[test]
    fn invalid_wgsl_fails_to_compile() {
        let mut device = RecordingDevice::new();
        let err = device.compile_program("broken", "fn nothing() {}").unwrap_err();
        assert!(matches!(err, ShaderError::Compile { ref name, .. } if name == "broken"));
        assert_eq!(device.live_programs(), 0);
    }
}
