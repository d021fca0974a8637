use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info, warn};

use super::gate::{Completion, PauseGate};
use crate::context::GraphicsContext;
use crate::render::{ClearColor, FrameRenderer, RenderDevice, Viewport};
use crate::sync::lock;
use crate::time::FrameClock;

#[derive(Debug, Clone, Copy)]
struct FrameSettings {
    viewport: Viewport,
    clear_color: ClearColor,
    viewport_dirty: bool,
}

/// The render half of the main loop.
///
/// Runs on its own thread with the context current, calling the attached
/// `FrameRenderer` once per frame and swapping buffers. While paused it gives
/// the context up so another thread may recreate it.
pub struct RenderLoop {
    context: Arc<dyn GraphicsContext>,
    renderer: Mutex<Option<Box<dyn FrameRenderer>>>,
    should_run: AtomicBool,
    gate: PauseGate,
    finished: Completion,
    thread: Mutex<Option<JoinHandle<()>>>,
    settings: Mutex<FrameSettings>,
    frames: AtomicU64,
    join_timeout: Duration,
}

impl RenderLoop {
    pub(crate) fn new(
        context: Arc<dyn GraphicsContext>,
        clear_color: ClearColor,
        join_timeout: Duration,
    ) -> Self {
        Self {
            context,
            renderer: Mutex::new(None),
            should_run: AtomicBool::new(false),
            gate: PauseGate::default(),
            finished: Completion::new(true),
            thread: Mutex::new(None),
            settings: Mutex::new(FrameSettings {
                viewport: Viewport::default(),
                clear_color,
                viewport_dirty: false,
            }),
            frames: AtomicU64::new(0),
            join_timeout,
        }
    }

    /// Replaces the frame renderer, returning the previous one.
    pub fn set_renderer(&self, renderer: Box<dyn FrameRenderer>) -> Option<Box<dyn FrameRenderer>> {
        lock(&self.renderer).replace(renderer)
    }

    pub fn has_renderer(&self) -> bool {
        lock(&self.renderer).is_some()
    }

    /// Applied before the next frame is drawn.
    pub fn update_viewport(&self, viewport: Viewport) {
        let mut settings = lock(&self.settings);
        settings.viewport = viewport;
        settings.viewport_dirty = true;
    }

    pub fn update_clear_color(&self, color: ClearColor) {
        lock(&self.settings).clear_color = color;
    }

    pub fn viewport(&self) -> Viewport {
        lock(&self.settings).viewport
    }

    /// Frames presented since the loop was created.
    pub fn rendered_frames(&self) -> u64 {
        self.frames.load(Ordering::SeqCst)
    }

    pub fn is_running(&self) -> bool {
        !self.finished.is_done()
    }

    pub fn is_paused(&self) -> bool {
        self.gate.is_acknowledged()
    }

    pub(crate) fn start(self: &Arc<Self>) -> std::io::Result<()> {
        self.should_run.store(true, Ordering::SeqCst);
        self.finished.reset();

        let this = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name("lumen-render".into())
            .spawn(move || this.run());
        match spawned {
            Ok(handle) => {
                let previous = lock(&self.thread).replace(handle);
                if let Some(previous) = previous {
                    join_logged(previous, "previous render loop");
                }
                Ok(())
            }
            Err(e) => {
                self.should_run.store(false, Ordering::SeqCst);
                self.finished.finish();
                Err(e)
            }
        }
    }

    /// Stops the loop and joins it, waiting at most the join timeout.
    pub(crate) fn stop(&self) {
        self.should_run.store(false, Ordering::SeqCst);
        self.gate.wake();

        if self.finished.wait_timeout(self.join_timeout) {
            let handle = lock(&self.thread).take();
            if let Some(handle) = handle {
                join_logged(handle, "render loop");
            }
        } else {
            warn!(
                "render loop did not finish within {:?}, marking it finished",
                self.join_timeout
            );
            let _detached = lock(&self.thread).take();
            self.finished.finish();
        }
    }

    pub(crate) fn wait_stopped(&self) {
        self.finished.wait();
    }

    pub(crate) fn pause(&self) {
        self.gate.request();
    }

    pub(crate) fn resume(&self) {
        self.gate.release();
    }

    pub(crate) fn wait_resumed(&self, timeout: Duration) -> bool {
        self.gate.wait_released(timeout)
    }

    pub(crate) fn clear_pause(&self) {
        self.gate.reset();
    }

    pub(crate) fn wait_paused(&self, interval: Duration, keep_waiting: impl Fn() -> bool) -> bool {
        self.gate
            .wait_acknowledged(interval, || keep_waiting() && self.is_running())
    }

    fn should_run(&self) -> bool {
        self.should_run.load(Ordering::SeqCst)
    }

    fn run(self: Arc<Self>) {
        if !self.context.make_current() {
            error!("render loop could not make the graphics context current");
            self.finished.finish();
            return;
        }
        info!("render loop started");

        let mut clock = FrameClock::new();
        lock(&self.settings).viewport_dirty = true;

        while self.should_run() {
            let mut regained = true;
            let parked = self.gate.park(
                || {
                    self.context.make_not_current();
                    debug!("render loop paused");
                },
                || {
                    regained = self.context.make_current();
                    lock(&self.settings).viewport_dirty = true;
                },
                || self.should_run(),
                || {},
            );
            if !self.should_run() {
                break;
            }
            if parked {
                if !regained {
                    error!("render loop could not reacquire the graphics context, stopping");
                    break;
                }
                clock.reset();
                debug!("render loop resumed");
            }

            self.render_frame(&mut clock);
        }

        if self.context.is_current_for_calling_thread() {
            self.context.make_not_current();
        }
        info!("render loop stopped after {} frames", self.rendered_frames());
        self.finished.finish();
    }

    fn render_frame(&self, clock: &mut FrameClock) {
        let time = clock.tick();
        let settings = {
            let mut settings = lock(&self.settings);
            let snapshot = *settings;
            settings.viewport_dirty = false;
            snapshot
        };

        let mut renderer = lock(&self.renderer);
        let drawn = self.context.with_device(&mut |device: &mut dyn RenderDevice| {
            if settings.viewport_dirty {
                device.set_viewport(settings.viewport);
            }
            device.clear(settings.clear_color);
            if let Some(renderer) = renderer.as_mut() {
                renderer.render_frame(device, &time);
            }
        });
        drop(renderer);

        if drawn {
            self.context.swap_buffers();
            self.frames.fetch_add(1, Ordering::SeqCst);
        } else {
            warn!("frame {} skipped: the render device is unavailable", time.frame_index);
            thread::sleep(Duration::from_millis(1));
        }
    }
}

/// Clears to black and presents once; used right after context creation.
pub(crate) fn render_idle_frame(context: &dyn GraphicsContext) {
    let drawn = context.with_device(&mut |device: &mut dyn RenderDevice| {
        device.clear(ClearColor::BLACK);
    });
    if drawn {
        context.swap_buffers();
    }
}

pub(crate) fn join_logged(handle: JoinHandle<()>, what: &str) {
    if handle.thread().id() == thread::current().id() {
        debug!("not joining the {what} thread from itself");
        return;
    }
    if handle.join().is_err() {
        warn!("the {what} thread panicked");
    }
}

impl std::fmt::Debug for RenderLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RenderLoop")
            .field("running", &self.is_running())
            .field("paused", &self.is_paused())
            .field("frames", &self.rendered_frames())
            .finish_non_exhaustive()
    }
}
