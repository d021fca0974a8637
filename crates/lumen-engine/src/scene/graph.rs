use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, error, info, warn};

use super::{CompileFailure, LightModel, SceneError, SceneObject, Shader, ShaderSource};
use crate::render::{ReleaseOutcome, RenderDevice};
use crate::renderer::{Renderer, RendererKind};
use crate::sync::lock;

struct ObjectEntry {
    object: Option<Arc<dyn SceneObject>>,
    shader: usize,
    renderer: Option<Renderer>,
}

/// Objects, shaders and the renderers assigned to them.
///
/// Indices are stable: objects and shaders are only appended, and a removed
/// object leaves an empty slot behind. Each container has its own lock; when
/// more than one is needed they are taken in the order objects, shaders, lights.
///
/// `can_render_scene` and `render_scene` expect no structural changes from
/// other threads while a frame is drawn. Callers serialize mutations with the
/// render loop (pause it, or mutate from the frame callback).
pub struct SceneGraph {
    objects: Mutex<Vec<ObjectEntry>>,
    shaders: Mutex<Vec<Shader>>,
    lights: Mutex<Vec<usize>>,
    revision: AtomicU64,
}

impl Default for SceneGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self {
            objects: Mutex::new(Vec::new()),
            shaders: Mutex::new(Vec::new()),
            lights: Mutex::new(Vec::new()),
            revision: AtomicU64::new(0),
        }
    }

    /// Bumped on every structural change.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Acquire)
    }

    /// Marks the scene as changed, e.g. after uploading object data.
    pub fn touch(&self) {
        self.revision.fetch_add(1, Ordering::AcqRel);
    }

    pub fn add_shader(&self, source: ShaderSource) -> usize {
        let mut shaders = lock(&self.shaders);
        shaders.push(Shader::new(source));
        self.touch();
        shaders.len() - 1
    }

    /// Compiles every shader that is not linked yet, in insertion order.
    /// Stops at the first failure.
    pub fn compile_shaders(&self, device: &mut dyn RenderDevice) -> Result<(), CompileFailure> {
        let mut shaders = lock(&self.shaders);
        let result = shaders
            .iter_mut()
            .enumerate()
            .filter(|(_, shader)| !shader.is_linked())
            .try_for_each(|(index, shader)| {
                shader.compile(device).map_err(|error| {
                    error!("compiling shader {index} ('{}') failed: {error}", shader.source().name());
                    CompileFailure { index, error }
                })
            });
        self.touch();
        result
    }

    /// Resolves the input roles of every shader.
    ///
    /// Returns how many shaders are unlinked or have no usable inputs.
    pub fn parse_shaders(&self) -> usize {
        let mut shaders = lock(&self.shaders);
        let failed = shaders
            .iter_mut()
            .map(|shader| shader.parse_raw_information())
            .filter(|parsed| !parsed)
            .count();
        self.touch();
        failed
    }

    /// Adds an object that will be drawn with shader `shader`.
    ///
    /// Light sources are additionally recorded for broadcasting to lighting renderers.
    pub fn add_object(&self, object: Arc<dyn SceneObject>, shader: usize) -> usize {
        let mut objects = lock(&self.objects);
        let index = objects.len();
        if object.hints().flags.light_source {
            lock(&self.lights).push(index);
            debug!("object {index} ('{}') is a light source", object.name());
        }
        objects.push(ObjectEntry {
            object: Some(object),
            shader,
            renderer: None,
        });
        self.touch();
        index
    }

    /// Detaches an object and drops its renderer. The slot stays empty, so the
    /// scene is no longer renderable until it is filled again.
    ///
    /// A removed light is also taken away from every renderer it was handed to.
    pub fn remove_object(&self, index: usize) -> Result<Arc<dyn SceneObject>, SceneError> {
        let mut objects = lock(&self.objects);
        let entry = objects
            .get_mut(index)
            .ok_or(SceneError::ObjectOutOfRange(index))?;
        let object = entry.object.take().ok_or(SceneError::EmptySlot(index))?;
        entry.renderer = None;

        let mut lights = lock(&self.lights);
        if lights.contains(&index) {
            lights.retain(|&light| light != index);
            let detached = objects
                .iter_mut()
                .filter_map(|e| e.renderer.as_mut())
                .map(|renderer| renderer.remove_light_source(&object))
                .filter(|&removed| removed)
                .count();
            debug!("light '{}' detached from {detached} renderer(s)", object.name());
        }
        drop(lights);
        self.touch();
        Ok(object)
    }

    /// Wires `renderer` to the object at `index` and its shader, then hands it
    /// every light source if the object is lit. A previous renderer is dropped.
    pub fn assign_object_renderer(&self, index: usize, mut renderer: Renderer) -> Result<(), SceneError> {
        let mut objects = lock(&self.objects);
        let entry = objects.get(index).ok_or(SceneError::ObjectOutOfRange(index))?;
        let object = entry.object.clone().ok_or(SceneError::EmptySlot(index))?;
        let shader_index = entry.shader;

        {
            let shaders = lock(&self.shaders);
            let shader = shaders.get(shader_index).ok_or(SceneError::ShaderOutOfRange {
                object: index,
                shader: shader_index,
            })?;
            renderer.set_data_from_shader(shader);
        }
        renderer.set_data_from_object(object.as_ref());

        if object.hints().light_model == LightModel::SimpleAds {
            let lights = lock(&self.lights);
            let sources = lights
                .iter()
                .filter_map(|&light| objects.get(light).and_then(|e| e.object.clone()));
            for light in sources {
                renderer.add_light_source(light);
            }
        }

        info!("object {index} ('{}') renders with {}", object.name(), renderer.kind());
        if let Some(entry) = objects.get_mut(index) {
            entry.renderer = Some(renderer);
        }
        self.touch();
        Ok(())
    }

    /// Assigns the most capable renderer that accepts the object and its shader.
    pub fn assign_best_renderer(&self, index: usize) -> Result<RendererKind, SceneError> {
        let kind = {
            let objects = lock(&self.objects);
            let entry = objects.get(index).ok_or(SceneError::ObjectOutOfRange(index))?;
            let object = entry.object.as_ref().ok_or(SceneError::EmptySlot(index))?;
            let shaders = lock(&self.shaders);
            let shader = shaders.get(entry.shader).ok_or(SceneError::ShaderOutOfRange {
                object: index,
                shader: entry.shader,
            })?;
            RendererKind::ALL
                .into_iter()
                .find(|kind| kind.test_shader(shader) && kind.test_object(object.as_ref()))
                .ok_or_else(|| SceneError::NoMatchingRenderer(object.name().to_string()))?
        };
        self.assign_object_renderer(index, Renderer::new(kind))?;
        Ok(kind)
    }

    /// Readiness gate for `render_scene`.
    ///
    /// Every object must be present and data-ready, every mesh needs a renderer
    /// that can render, and every shader must be linked. All failures are
    /// logged in one pass. An empty scene is ready.
    pub fn can_render_scene(&self) -> bool {
        let objects = lock(&self.objects);
        let shaders = lock(&self.shaders);
        let mut ready = true;

        for (index, entry) in objects.iter().enumerate() {
            let Some(object) = &entry.object else {
                warn!("object slot {index} is empty");
                ready = false;
                continue;
            };
            let hints = object.hints();
            if !hints.data_ready {
                warn!("object {index} ('{}') has no data on the device", object.name());
                ready = false;
            }
            if !hints.flags.mesh {
                continue;
            }
            match &entry.renderer {
                None => {
                    warn!("object {index} ('{}') has no renderer", object.name());
                    ready = false;
                }
                Some(renderer) if !renderer.can_render() => {
                    warn!("renderer of object {index} ('{}') cannot render", object.name());
                    ready = false;
                }
                Some(_) => {}
            }
            if entry.shader >= shaders.len() {
                warn!(
                    "object {index} ('{}') references missing shader {}",
                    object.name(),
                    entry.shader
                );
                ready = false;
            }
        }

        for (index, shader) in shaders.iter().enumerate() {
            if !shader.is_linked() {
                warn!("shader {index} ('{}') is not linked", shader.source().name());
                ready = false;
            }
        }
        ready
    }

    /// Draws every object with a renderer, in insertion order.
    ///
    /// Performs no checks; `can_render_scene` must hold and the context must be current.
    pub fn render_scene(&self, device: &mut dyn RenderDevice) {
        let objects = lock(&self.objects);
        for renderer in objects.iter().filter_map(|entry| entry.renderer.as_ref()) {
            renderer.render(device);
        }
    }

    /// Deletes every linked program; returns the worst outcome.
    pub fn release_shaders(&self, device: &mut dyn RenderDevice) -> ReleaseOutcome {
        let mut shaders = lock(&self.shaders);
        let outcome = shaders
            .iter_mut()
            .map(|shader| shader.release(device))
            .fold(ReleaseOutcome::Clean, ReleaseOutcome::worst);
        self.touch();
        outcome
    }

    pub fn object_count(&self) -> usize {
        lock(&self.objects).len()
    }

    pub fn shader_count(&self) -> usize {
        lock(&self.shaders).len()
    }

    pub fn object(&self, index: usize) -> Option<Arc<dyn SceneObject>> {
        lock(&self.objects).get(index).and_then(|e| e.object.clone())
    }

    pub fn shader_linked(&self, index: usize) -> Option<bool> {
        lock(&self.shaders).get(index).map(Shader::is_linked)
    }

    pub fn renderer_kind(&self, index: usize) -> Option<RendererKind> {
        lock(&self.objects)
            .get(index)
            .and_then(|e| e.renderer.as_ref())
            .map(Renderer::kind)
    }

    /// Number of light sources handed to the renderer at `index`.
    pub fn renderer_light_sources(&self, index: usize) -> Option<usize> {
        lock(&self.objects)
            .get(index)
            .and_then(|e| e.renderer.as_ref())
            .map(Renderer::light_sources)
    }

    pub fn light_indices(&self) -> Vec<usize> {
        lock(&self.lights).clone()
    }
}
