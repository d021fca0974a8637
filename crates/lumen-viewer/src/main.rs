//! Spinning lit cube on the lumen engine.
//!
//! Without `--config`, `lumen.toml` in the working directory is used when it
//! exists. Escape or closing the window quits.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use glam::{Mat4, Vec3};
use log::info;

use lumen_engine::config::EngineConfig;
use lumen_engine::context::{GraphicsContext, HeadlessConfig, HeadlessContext, WindowGeometry};
use lumen_engine::event::{Event, EventKind, Key, KeyState};
use lumen_engine::logging::{LoggingConfig, init_logging};
use lumen_engine::platform::WindowContext;
use lumen_engine::runtime::{LoopController, LoopHandle};
use lumen_engine::scene::{
    BUILTIN_ADS, MeshData, PointLight, SceneGraph, SceneMatrices, SceneRenderer, ShaderSource,
    SimpleMesh,
};

const DEFAULT_CONFIG: &str = "lumen.toml";

/// Spinning lit cube on the lumen engine.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Render without a window.
    #[arg(long)]
    headless: bool,

    /// Quit after this many frames.
    #[arg(long, value_name = "N")]
    frames: Option<u64>,

    /// Engine config file, `lumen.toml` by default.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig> {
    match path {
        Some(path) => EngineConfig::load(path),
        None if Path::new(DEFAULT_CONFIG).exists() => EngineConfig::load(DEFAULT_CONFIG),
        None => Ok(EngineConfig::default()),
    }
}

fn main() -> Result<()> {
    init_logging(LoggingConfig::default());

    let args = Args::parse();
    let mut config = load_config(args.config.as_deref())?;

    let context: Arc<dyn GraphicsContext> = if args.headless {
        Arc::new(HeadlessContext::new(HeadlessConfig {
            geometry: config.window.geometry(),
            ..HeadlessConfig::default()
        }))
    } else {
        config.creation_policy = WindowContext::required_policy();
        Arc::new(WindowContext::new(config.window.clone()))
    };

    let controller = LoopController::new(context, config).context("failed to set up the main loop")?;
    controller
        .init()
        .map_err(|e| anyhow::anyhow!("{e} (code {})", e.code()))?;

    let geometry = Arc::new(Mutex::new(controller.geometry()));
    listen(&controller, &geometry);

    let (scene, cube) = build_scene();
    controller.attach_renderer(spinning_cube(scene, cube, geometry, controller.handle(), args.frames));

    info!("viewer running, press Escape to quit");
    controller.start_main_loop(true)?;
    controller.close_window(true);
    Ok(())
}

fn listen(controller: &LoopController, geometry: &Arc<Mutex<WindowGeometry>>) {
    let handle = controller.handle();
    controller.events().add_listener(EventKind::Key, move |event| {
        if let Event::Key(key) = event {
            if key.key == Key::Escape && key.state == KeyState::Pressed {
                handle.quit_main_loop();
            }
        }
    });

    let geometry = Arc::clone(geometry);
    controller.events().add_listener(EventKind::Resize, move |event| {
        if let Event::Resize(resized) = event {
            *geometry.lock().unwrap_or_else(|e| e.into_inner()) = *resized;
        }
    });
}

fn build_scene() -> (Arc<SceneGraph>, Arc<SimpleMesh>) {
    let scene = Arc::new(SceneGraph::new());
    let shader = scene.add_shader(ShaderSource::inline("ads", BUILTIN_ADS));
    let cube = Arc::new(SimpleMesh::new("cube", MeshData::cube(1.0)));
    scene.add_object(cube.clone(), shader);
    scene.add_object(
        Arc::new(PointLight::new("key", Vec3::new(3.0, 4.0, 5.0), Vec3::new(1.0, 0.95, 0.9))),
        shader,
    );
    scene.add_object(
        Arc::new(PointLight::new("fill", Vec3::new(-4.0, 1.0, 2.0), Vec3::new(0.2, 0.3, 0.5)).with_ambient(0.0)),
        shader,
    );
    (scene, cube)
}

/// Uploads and wires the cube on the first frame, then rotates it.
fn spinning_cube(
    scene: Arc<SceneGraph>,
    cube: Arc<SimpleMesh>,
    geometry: Arc<Mutex<WindowGeometry>>,
    handle: LoopHandle,
    frames: Option<u64>,
) -> SceneRenderer {
    let mut camera = SceneMatrices::default();
    camera.set_camera(Vec3::new(0.0, 2.0, 6.0), Vec3::ZERO, Vec3::Y);
    let mut wired = false;

    SceneRenderer::new(scene).before_frame(move |scene, device, time| {
        if frames.is_some_and(|limit| time.frame_index >= limit) {
            handle.quit_main_loop();
            return;
        }

        if !wired {
            if let Err(e) = cube.upload(device) {
                log::error!("cube upload failed: {e}");
                handle.quit_main_loop();
                return;
            }
            if let Err(e) = scene.compile_shaders(device) {
                log::error!("{e}");
                handle.quit_main_loop();
                return;
            }
            scene.parse_shaders();
            match scene.assign_best_renderer(0) {
                Ok(kind) => info!("cube renders with {kind}"),
                Err(e) => log::error!("{e}"),
            }
            wired = true;
        }

        let size = *geometry.lock().unwrap_or_else(|e| e.into_inner());
        camera.calculate_projection_perspective(size.width, size.height, 0.1, 100.0, 45.0);
        cube.set_model(Mat4::from_rotation_y(time.elapsed) * Mat4::from_rotation_x(time.elapsed * 0.4));
        cube.update_matrices(&camera);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn args(list: &[&str]) -> Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("lumen-viewer").chain(list.iter().copied()))
    }

    #[test]
    fn command_definition_is_consistent() {
        Args::command().debug_assert();
    }

    #[test]
    fn flags_are_parsed() {
        let parsed = args(&["--headless", "--frames", "10", "--config", "a.toml"]).unwrap();
        assert!(parsed.headless);
        assert_eq!(parsed.frames, Some(10));
        assert_eq!(parsed.config, Some(PathBuf::from("a.toml")));

        let defaults = args(&[]).unwrap();
        assert!(!defaults.headless);
        assert_eq!(defaults.frames, None);
        assert_eq!(defaults.config, None);
    }

    #[test]
    fn bad_arguments_are_rejected() {
        assert!(args(&["--frames"]).is_err());
        assert!(args(&["--frames", "many"]).is_err());
        assert!(args(&["--fullscreen"]).is_err());
    }
}
