use std::path::PathBuf;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use glam::{Mat4, Vec3};
use lumen_engine::config::EngineConfig;
use lumen_engine::context::{GraphicsContext, HeadlessContext};
use lumen_engine::render::{DeviceCommand, RecordingDevice, RenderDevice, ShaderError};
use lumen_engine::renderer::RendererKind;
use lumen_engine::runtime::LoopController;
use lumen_engine::scene::{
    MeshData, PointLight, SceneGraph, SceneMatrices, SceneRenderer, ShaderSource, SimpleMesh,
};

fn shader_path(file: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("shaders").join(file)
}

fn draw_counts(commands: &[DeviceCommand]) -> Vec<u32> {
    commands
        .iter()
        .filter_map(|c| match c {
            DeviceCommand::DrawIndexed { count } => Some(*count),
            _ => None,
        })
        .collect()
}

/// One shader per lighting level, one cube per shader, one light.
fn build_scene(device: &mut dyn RenderDevice) -> (Arc<SceneGraph>, Vec<Arc<SimpleMesh>>) {
    let scene = Arc::new(SceneGraph::new());
    let position = scene.add_shader(ShaderSource::file(shader_path("position.wgsl")));
    let normal = scene.add_shader(ShaderSource::file(shader_path("normal.wgsl")));
    let ads = scene.add_shader(ShaderSource::file(shader_path("ads.wgsl")));

    let mut meshes = Vec::new();
    for shader in [position, normal, ads] {
        let mesh = Arc::new(SimpleMesh::new(format!("cube{shader}"), MeshData::cube(0.5)));
        mesh.upload(device).unwrap();
        scene.add_object(mesh.clone(), shader);
        meshes.push(mesh);
    }
    scene.add_object(
        Arc::new(PointLight::new("sun", Vec3::new(2.0, 3.0, 4.0), Vec3::ONE)),
        ads,
    );

    scene.compile_shaders(device).unwrap();
    assert_eq!(scene.parse_shaders(), 0);
    (scene, meshes)
}

#[test]
fn every_shader_finds_its_renderer() {
    let mut device = RecordingDevice::new();
    let (scene, _meshes) = build_scene(&mut device);
    assert!(!scene.can_render_scene());

    let kinds: Vec<RendererKind> = (0..3)
        .map(|index| scene.assign_best_renderer(index).unwrap())
        .collect();
    assert_eq!(
        kinds,
        [
            RendererKind::Position,
            RendererKind::PositionNormal,
            RendererKind::AdsLighting
        ]
    );
    assert_eq!(scene.renderer_light_sources(2), Some(1));
    assert!(scene.can_render_scene());

    scene.render_scene(&mut device);
    assert_eq!(draw_counts(device.commands()), [36, 36, 36]);
}

#[test]
fn camera_updates_reach_the_next_frame() {
    let mut device = RecordingDevice::new();
    let (scene, meshes) = build_scene(&mut device);
    for index in 0..3 {
        scene.assign_best_renderer(index).unwrap();
    }

    let mut camera = SceneMatrices::default();
    camera.calculate_projection_perspective(800, 600, 0.1, 100.0, 60.0);
    camera.set_camera(Vec3::new(0.0, 0.0, 5.0), Vec3::ZERO, Vec3::Y);
    let model = Mat4::from_rotation_y(0.5);
    meshes[0].set_model(model);
    meshes[0].update_matrices(&camera);

    device.end_frame();
    scene.render_scene(&mut device);
    let expected = camera.view_projection() * model;
    let uploaded = device.commands().iter().any(|c| {
        matches!(c, DeviceCommand::Uniform { value: lumen_engine::render::RecordedUniform::Mat4(m), .. } if *m == expected)
    });
    assert!(uploaded);
}

#[test]
fn missing_shader_file_is_reported_with_its_index() {
    let mut device = RecordingDevice::new();
    let scene = SceneGraph::new();
    scene.add_shader(ShaderSource::file(shader_path("position.wgsl")));
    scene.add_shader(ShaderSource::file(shader_path("does-not-exist.wgsl")));

    let failure = scene.compile_shaders(&mut device).unwrap_err();
    assert_eq!(failure.index, 1);
    assert!(matches!(failure.error, ShaderError::Read { .. }));
    assert_eq!(scene.shader_linked(0), Some(true));
    assert_eq!(scene.shader_linked(1), Some(false));
    assert!(!scene.can_render_scene());
}

#[test]
fn scene_draws_through_the_main_loop() {
    let ctx = Arc::new(HeadlessContext::default());
    let controller = LoopController::new(ctx.clone(), EngineConfig::default()).unwrap();

    let scene = Arc::new(SceneGraph::new());
    let ads = scene.add_shader(ShaderSource::file(shader_path("ads.wgsl")));
    let cube = Arc::new(SimpleMesh::new("cube", MeshData::cube(1.0)));
    let index = scene.add_object(cube.clone(), ads);
    scene.add_object(
        Arc::new(PointLight::new("lamp", Vec3::new(0.0, 4.0, 0.0), Vec3::ONE)),
        ads,
    );

    let setup_cube = cube.clone();
    let renderer = SceneRenderer::new(scene.clone()).before_frame(move |scene, device, _| {
        if setup_cube.is_uploaded() {
            return;
        }
        setup_cube.upload(device).unwrap();
        scene.compile_shaders(device).unwrap();
        scene.parse_shaders();
        scene.assign_best_renderer(index).unwrap();
    });
    controller.attach_renderer(renderer);
    controller.init().unwrap();
    controller.start_main_loop(false).unwrap();

    let end = Instant::now() + Duration::from_secs(2);
    let mut drawn = false;
    while !drawn && Instant::now() < end {
        drawn = ctx
            .inspect_device(|d| draw_counts(d.last_frame()) == [36])
            .unwrap_or(false);
        thread::sleep(Duration::from_millis(5));
    }
    assert!(drawn);
    assert_eq!(scene.renderer_kind(index), Some(RendererKind::AdsLighting));

    controller.close_window(true);
    assert!(!ctx.have_context());
}
