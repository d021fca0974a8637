use std::sync::Arc;

use log::{debug, info};

use super::SceneGraph;
use crate::render::{FrameRenderer, RenderDevice};
use crate::time::FrameTime;

/// Frames between readiness checks while the scene is not ready and unchanged.
const RECHECK_INTERVAL: u32 = 60;

type BeforeFrame = Box<dyn FnMut(&SceneGraph, &mut dyn RenderDevice, &FrameTime) + Send>;

/// Draws a `SceneGraph` from the render loop.
///
/// The readiness gate is evaluated when the scene revision changes, and
/// periodically while the scene is not ready, since object data may become
/// ready without a structural change.
pub struct SceneRenderer {
    scene: Arc<SceneGraph>,
    before_frame: Option<BeforeFrame>,
    ready: bool,
    checked_revision: Option<u64>,
    frames_since_check: u32,
}

impl SceneRenderer {
    pub fn new(scene: Arc<SceneGraph>) -> Self {
        Self {
            scene,
            before_frame: None,
            ready: false,
            checked_revision: None,
            frames_since_check: 0,
        }
    }

    /// Runs `f` on the render thread before each frame is drawn, e.g. to
    /// upload pending data or update matrices.
    pub fn before_frame<F>(mut self, f: F) -> Self
    where
        F: FnMut(&SceneGraph, &mut dyn RenderDevice, &FrameTime) + Send + 'static,
    {
        self.before_frame = Some(Box::new(f));
        self
    }

    pub fn scene(&self) -> &Arc<SceneGraph> {
        &self.scene
    }

    /// Forces the gate to be evaluated on the next frame.
    pub fn invalidate(&mut self) {
        self.checked_revision = None;
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    fn refresh(&mut self) {
        let revision = self.scene.revision();
        let stale = self.checked_revision != Some(revision)
            || (!self.ready && self.frames_since_check >= RECHECK_INTERVAL);
        if !stale {
            self.frames_since_check = self.frames_since_check.saturating_add(1);
            return;
        }

        let was_ready = self.ready;
        self.ready = self.scene.can_render_scene();
        self.checked_revision = Some(revision);
        self.frames_since_check = 0;
        match (was_ready, self.ready) {
            (false, true) => info!("scene is ready, drawing"),
            (true, false) => info!("scene is no longer ready, skipping draws"),
            _ => debug!("scene readiness re-evaluated: {}", self.ready),
        }
    }
}

impl FrameRenderer for SceneRenderer {
    fn render_frame(&mut self, device: &mut dyn RenderDevice, time: &FrameTime) {
        if let Some(before) = self.before_frame.as_mut() {
            before(&self.scene, device, time);
        }
        self.refresh();
        if self.ready {
            self.scene.render_scene(device);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use super::*;
    use crate::render::{DeviceCommand, RecordingDevice};
    use crate::renderer::{Renderer, RendererKind};
    use crate::scene::{BUILTIN_POSITION, Hints, MeshData, SceneObject, ShaderSource, SimpleMesh};
    use crate::time::FrameClock;

    fn draws(device: &RecordingDevice) -> usize {
        device
            .commands()
            .iter()
            .filter(|c| matches!(c, DeviceCommand::DrawIndexed { .. }))
            .count()
    }

    #[test]
    fn draws_only_once_the_scene_is_ready() {
        let mut device = RecordingDevice::new();
        let mut clock = FrameClock::new();
        let scene = Arc::new(SceneGraph::new());
        let shader = scene.add_shader(ShaderSource::inline("pos", BUILTIN_POSITION));
        let mesh = Arc::new(SimpleMesh::new("cube", MeshData::cube(1.0)));
        let index = scene.add_object(mesh.clone(), shader);

        let mut renderer = SceneRenderer::new(scene.clone());
        renderer.render_frame(&mut device, &clock.tick());
        assert!(!renderer.is_ready());
        assert_eq!(draws(&device), 0);

        scene.compile_shaders(&mut device).unwrap();
        scene.parse_shaders();
        mesh.upload(&mut device).unwrap();
        scene.assign_object_renderer(index, Renderer::new(RendererKind::Position)).unwrap();

        renderer.render_frame(&mut device, &clock.tick());
        assert!(renderer.is_ready());
        assert_eq!(draws(&device), 1);
    }

    #[test]
    fn before_frame_runs_first() {
        let mut device = RecordingDevice::new();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = calls.clone();
        let mut renderer = SceneRenderer::new(Arc::new(SceneGraph::new()))
            .before_frame(move |scene, _, _| {
                seen.fetch_add(1, Ordering::SeqCst);
                assert_eq!(scene.object_count(), 0);
            });

        renderer.render_frame(&mut device, &FrameClock::new().tick());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(renderer.is_ready());
    }

    struct Flag(AtomicBool);

    impl SceneObject for Flag {
        fn name(&self) -> &str {
            "flag"
        }

        fn hints(&self) -> Hints {
            Hints {
                data_ready: self.0.load(Ordering::SeqCst),
                ..Hints::default()
            }
        }
    }

    #[test]
    fn readiness_is_rechecked_without_structural_change() {
        let mut device = RecordingDevice::new();
        let mut clock = FrameClock::new();
        let scene = Arc::new(SceneGraph::new());
        let flag = Arc::new(Flag(AtomicBool::new(false)));
        scene.add_object(flag.clone(), 0);

        let mut renderer = SceneRenderer::new(scene.clone());
        renderer.render_frame(&mut device, &clock.tick());
        assert!(!renderer.is_ready());

        flag.0.store(true, Ordering::SeqCst);
        let revision = scene.revision();
        for _ in 0..RECHECK_INTERVAL {
            renderer.render_frame(&mut device, &clock.tick());
        }
        assert!(!renderer.is_ready());
        renderer.render_frame(&mut device, &clock.tick());
        assert!(renderer.is_ready());
        assert_eq!(scene.revision(), revision);
    }
}
