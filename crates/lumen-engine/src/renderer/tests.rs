use std::sync::Arc;

use glam::{Mat4, Vec3, Vec4};

use super::*;
use crate::render::{
    BufferHandle, DeviceCommand, Location, RecordedUniform, RecordingDevice,
};
use crate::scene::{
    BUILTIN_ADS, BUILTIN_NORMAL, BUILTIN_POSITION, Hints, LightData, LightModel, MatrixFlags,
    MatrixKind, ObjectFlags, PointLight, ShaderSource, Transform,
};

/// Object with hand-written hints and fixed buffer handles.
struct Fake {
    hints: Hints,
    mvp: Transform,
}

impl Fake {
    fn minimal() -> Self {
        Self {
            hints: Hints {
                data_ready: true,
                flags: ObjectFlags {
                    mesh: true,
                    light_source: false,
                },
                num_vertices: 3,
                num_indexes: 3,
                matrices: MatrixFlags {
                    model_view_projection: true,
                    ..MatrixFlags::default()
                },
                num_vbo: 1,
                num_ibo: 1,
                ..Hints::default()
            },
            mvp: Transform::new(Mat4::from_scale(Vec3::splat(2.0))),
        }
    }

    fn lit() -> Self {
        let mut fake = Self::minimal();
        fake.hints.num_normals = 3;
        fake.hints.num_nbo = 1;
        fake.hints.matrices.model_view = true;
        fake.hints.matrices.normal = true;
        fake.hints.light_model = LightModel::SimpleAds;
        fake
    }

    fn with(mut self, f: impl FnOnce(&mut Hints)) -> Self {
        f(&mut self.hints);
        self
    }
}

impl SceneObject for Fake {
    fn name(&self) -> &str {
        "fake"
    }

    fn hints(&self) -> Hints {
        self.hints
    }

    fn vertex_buffer(&self) -> Option<BufferHandle> {
        (self.hints.num_vbo > 0).then_some(BufferHandle(100))
    }

    fn index_buffer(&self) -> Option<BufferHandle> {
        (self.hints.num_ibo > 0).then_some(BufferHandle(101))
    }

    fn normal_buffer(&self) -> Option<BufferHandle> {
        (self.hints.num_nbo > 0).then_some(BufferHandle(102))
    }

    fn matrix(&self, kind: MatrixKind) -> Option<Transform> {
        let flags = self.hints.matrices;
        match kind {
            MatrixKind::ModelViewProjection if flags.model_view_projection => Some(self.mvp.clone()),
            MatrixKind::ModelView if flags.model_view => Some(Transform::new(Mat4::IDENTITY)),
            MatrixKind::Normal if flags.normal => Some(Transform::new(Mat4::IDENTITY)),
            _ => None,
        }
    }
}

fn linked(code: &str) -> Shader {
    let mut device = RecordingDevice::new();
    let mut shader = Shader::new(ShaderSource::inline("test", code));
    shader.compile(&mut device).unwrap();
    assert!(shader.parse_raw_information());
    shader
}

#[test]
fn position_accepts_the_minimal_object() {
    assert!(PositionRenderer::test_object(&Fake::minimal()));
}

#[test]
fn position_rejects_any_missing_requirement() {
    let broken: [fn(&mut Hints); 6] = [
        |h| h.flags.mesh = false,
        |h| h.num_indexes = 2,
        |h| h.matrices.model_view_projection = false,
        |h| h.num_vbo = 0,
        |h| h.num_vbo = 2,
        |h| h.num_ibo = 0,
    ];
    for (i, edit) in broken.into_iter().enumerate() {
        assert!(
            !PositionRenderer::test_object(&Fake::minimal().with(edit)),
            "case {i} was accepted"
        );
    }
}

#[test]
fn normal_and_lighting_need_more_than_positions() {
    let minimal = Fake::minimal();
    assert!(!PositionNormalRenderer::test_object(&minimal));
    assert!(!AdsRenderer::test_object(&minimal));

    let lit = Fake::lit();
    assert!(PositionNormalRenderer::test_object(&lit));
    assert!(AdsRenderer::test_object(&lit));
    assert!(!AdsRenderer::test_object(&Fake::lit().with(|h| h.light_model = LightModel::None)));
    assert!(!AdsRenderer::test_object(&Fake::lit().with(|h| h.matrices.normal = false)));
    assert!(!PositionNormalRenderer::test_object(&Fake::lit().with(|h| h.num_nbo = 0)));
}

#[test]
fn shader_tests_follow_the_available_inputs() {
    let position = linked(BUILTIN_POSITION);
    let normal = linked(BUILTIN_NORMAL);
    let ads = linked(BUILTIN_ADS);

    let accepted = |shader: &Shader| -> Vec<RendererKind> {
        RendererKind::ALL
            .into_iter()
            .filter(|kind| kind.test_shader(shader))
            .collect()
    };
    assert_eq!(accepted(&position), vec![RendererKind::Position]);
    assert_eq!(
        accepted(&normal),
        vec![RendererKind::PositionNormal, RendererKind::Position]
    );
    assert_eq!(accepted(&ads), RendererKind::ALL.to_vec());

    let unlinked = Shader::new(ShaderSource::inline("raw", BUILTIN_ADS));
    assert!(!RendererKind::Position.test_shader(&unlinked));
}

#[test]
fn unwired_renderer_cannot_render() {
    let mut renderer = Renderer::new(RendererKind::PositionNormal);
    assert!(!renderer.can_render());

    renderer.set_data_from_shader(&linked(BUILTIN_NORMAL));
    assert!(!renderer.can_render());

    // Object without a normal buffer leaves one handle unset.
    renderer.set_data_from_object(&Fake::minimal());
    assert!(!renderer.can_render());

    renderer.set_data_from_object(&Fake::lit());
    assert!(renderer.can_render());
}

#[test]
fn position_render_is_symmetric() {
    let mut renderer = Renderer::new(RendererKind::Position);
    renderer.set_data_from_shader(&linked(BUILTIN_POSITION));
    let object = Fake::minimal();
    renderer.set_data_from_object(&object);
    assert!(renderer.can_render());

    let mut device = RecordingDevice::new();
    renderer.render(&mut device);
    let program = match device.commands().first() {
        Some(DeviceCommand::UseProgram(program)) => *program,
        other => panic!("expected UseProgram first, got {other:?}"),
    };
    assert_eq!(
        device.commands(),
        &[
            DeviceCommand::UseProgram(program),
            DeviceCommand::Uniform {
                location: Location(0),
                value: RecordedUniform::Mat4(object.mvp.get()),
            },
            DeviceCommand::EnableAttribute(Location(0)),
            DeviceCommand::BindVertexBuffer {
                location: Location(0),
                buffer: BufferHandle(100),
                components: 3,
            },
            DeviceCommand::BindIndexBuffer(BufferHandle(101)),
            DeviceCommand::DrawIndexed { count: 3 },
            DeviceCommand::DisableAttribute(Location(0)),
        ]
    );
    assert!(device.enabled_attributes().is_empty());
}

#[test]
fn cached_transforms_are_read_every_frame() {
    let mut renderer = Renderer::new(RendererKind::Position);
    renderer.set_data_from_shader(&linked(BUILTIN_POSITION));
    let object = Fake::minimal();
    renderer.set_data_from_object(&object);

    let moved = Mat4::from_translation(Vec3::new(1.0, 2.0, 3.0));
    object.mvp.set(moved);
    let mut device = RecordingDevice::new();
    renderer.render(&mut device);
    assert!(device.commands().contains(&DeviceCommand::Uniform {
        location: Location(0),
        value: RecordedUniform::Mat4(moved),
    }));
}

#[test]
fn ads_uploads_lights_and_disables_both_streams() {
    let mut renderer = Renderer::new(RendererKind::AdsLighting);
    renderer.set_data_from_shader(&linked(BUILTIN_ADS));
    renderer.set_data_from_object(&Fake::lit());

    let light = PointLight::new("lamp", Vec3::new(1.0, 2.0, 3.0), Vec3::new(1.0, 0.5, 0.25))
        .with_ambient(0.2);
    let LightData { position, color, ambient } = light.light().unwrap();
    assert!(renderer.add_light_source(Arc::new(light)));
    assert!(renderer.can_render());

    let mut device = RecordingDevice::new();
    renderer.render(&mut device);
    let commands = device.commands();
    assert!(commands.contains(&DeviceCommand::Uniform {
        location: Location(3),
        value: RecordedUniform::Int(1),
    }));
    assert!(commands.contains(&DeviceCommand::Uniform {
        location: Location(4),
        value: RecordedUniform::Vec4Array(vec![position.extend(1.0)]),
    }));
    assert!(commands.contains(&DeviceCommand::Uniform {
        location: Location(5),
        value: RecordedUniform::Vec4Array(vec![Vec4::new(color.x, color.y, color.z, ambient)]),
    }));

    let enabled: Vec<_> = commands
        .iter()
        .filter_map(|c| match c {
            DeviceCommand::EnableAttribute(l) => Some(*l),
            _ => None,
        })
        .collect();
    let disabled: Vec<_> = commands
        .iter()
        .filter_map(|c| match c {
            DeviceCommand::DisableAttribute(l) => Some(*l),
            _ => None,
        })
        .collect();
    assert_eq!(enabled, vec![Location(0), Location(1)]);
    assert_eq!(disabled, enabled);
    assert!(device.enabled_attributes().is_empty());
}

#[test]
fn light_sources_are_capped() {
    let mut renderer = Renderer::new(RendererKind::AdsLighting);
    for i in 0..MAX_LIGHTS {
        let light = PointLight::new(format!("light {i}"), Vec3::ZERO, Vec3::ONE);
        assert!(renderer.add_light_source(Arc::new(light)));
    }
    let extra = PointLight::new("extra", Vec3::ZERO, Vec3::ONE);
    assert!(!renderer.add_light_source(Arc::new(extra)));
    assert_eq!(renderer.light_sources(), MAX_LIGHTS);

    assert!(!renderer.add_light_source(Arc::new(Fake::lit())));
    let mut flat = Renderer::new(RendererKind::Position);
    assert!(!flat.add_light_source(Arc::new(PointLight::new("l", Vec3::ZERO, Vec3::ONE))));
    assert_eq!(flat.light_sources(), 0);
}
