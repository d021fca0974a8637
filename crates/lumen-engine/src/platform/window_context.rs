use std::cell::RefCell;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use log::{debug, error, info, warn};
use winit::application::ApplicationHandler;
use winit::dpi::{PhysicalPosition, PhysicalSize};
use winit::event::{StartCause, WindowEvent};
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::platform::pump_events::EventLoopExtPumpEvents;
use winit::window::{Window, WindowAttributes, WindowId};

use super::draw::WgpuDevice;
use super::gpu::{Gpu, GpuInit, SurfaceErrorAction};
use super::translate::{InputTracker, translate_window_event, window_geometry};
use crate::config::WindowConfig;
use crate::context::{
    ApiVersion, ContextCreationPolicy, ContextError, ContextState, Currency, GraphicsContext,
    WindowGeometry,
};
use crate::event::Event;
use crate::render::RenderDevice;
use crate::sync::lock;

/// Pumps allowed for the window system to deliver a newly created window.
const CREATE_ATTEMPTS: usize = 200;

thread_local! {
    /// winit allows one event loop per process; it lives on the thread that
    /// created the first window and is pumped from there.
    static EVENT_LOOP: RefCell<Option<EventLoop<()>>> = const { RefCell::new(None) };
}

struct Live {
    device: WgpuDevice,
    gpu: Gpu,
    window: Arc<Window>,
    version: ApiVersion,
    pending_resize: Option<PhysicalSize<u32>>,
}

/// Window plus wgpu device, driven through `GraphicsContext`.
///
/// Requires `ContextCreationPolicy::CreateOnEventLoopThread`: creation,
/// destruction and `poll_event` must all happen on the controller's event
/// thread, which owns the winit event loop. Rendering may happen on any thread
/// that has the context current.
///
/// Not available on macOS, where winit only runs on the main thread.
pub struct WindowContext {
    settings: WindowConfig,
    live: Mutex<Option<Live>>,
    ever_created: AtomicBool,
    currency: Currency,
    events: Mutex<VecDeque<Event>>,
    tracker: Mutex<InputTracker>,
    geometry: Mutex<WindowGeometry>,
}

impl WindowContext {
    pub fn new(settings: WindowConfig) -> Self {
        let geometry = settings.geometry();
        Self {
            settings,
            live: Mutex::new(None),
            ever_created: AtomicBool::new(false),
            currency: Currency::new(),
            events: Mutex::new(VecDeque::new()),
            tracker: Mutex::new(InputTracker::default()),
            geometry: Mutex::new(geometry),
        }
    }

    /// Creation policy this context must be driven with.
    pub const fn required_policy() -> ContextCreationPolicy {
        ContextCreationPolicy::CreateOnEventLoopThread
    }

    fn attributes(&self) -> WindowAttributes {
        let s = &self.settings;
        Window::default_attributes()
            .with_title(s.title.clone())
            .with_inner_size(PhysicalSize::new(s.width.max(1), s.height.max(1)))
            .with_position(PhysicalPosition::new(s.x, s.y))
    }

    fn pump(&self, window: &Window) -> Option<Pumped> {
        let tracker = *lock(&self.tracker);
        EVENT_LOOP.with(|cell| {
            let mut slot = cell.try_borrow_mut().ok()?;
            let event_loop = slot.as_mut()?;
            let mut pump = Pump::polling(window, tracker);
            event_loop.pump_app_events(Some(Duration::ZERO), &mut pump);
            Some(Pumped {
                events: pump.events,
                resized: pump.resized,
                tracker: pump.tracker,
            })
        })
    }
}

impl std::fmt::Debug for WindowContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WindowContext")
            .field("title", &self.settings.title)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

struct Pumped {
    events: Vec<Event>,
    resized: Option<PhysicalSize<u32>>,
    tracker: InputTracker,
}

/// Application handler for a single `pump_app_events` call.
struct Pump<'w> {
    create: Option<WindowAttributes>,
    created: Option<Result<Window, winit::error::OsError>>,
    window: Option<&'w Window>,
    tracker: InputTracker,
    events: Vec<Event>,
    resized: Option<PhysicalSize<u32>>,
}

impl<'w> Pump<'w> {
    fn creating(attributes: WindowAttributes) -> Self {
        Self {
            create: Some(attributes),
            created: None,
            window: None,
            tracker: InputTracker::default(),
            events: Vec::new(),
            resized: None,
        }
    }

    fn polling(window: &'w Window, tracker: InputTracker) -> Self {
        Self {
            create: None,
            created: None,
            window: Some(window),
            tracker,
            events: Vec::new(),
            resized: None,
        }
    }

    fn create_pending(&mut self, event_loop: &ActiveEventLoop) {
        if let Some(attributes) = self.create.take() {
            self.created = Some(event_loop.create_window(attributes));
        }
    }
}

impl ApplicationHandler for Pump<'_> {
    /// `resumed` only fires once per loop; later windows are opened here.
    fn new_events(&mut self, event_loop: &ActiveEventLoop, cause: StartCause) {
        if !matches!(cause, StartCause::Init) {
            self.create_pending(event_loop);
        }
    }

    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        self.create_pending(event_loop);
    }

    fn window_event(&mut self, _event_loop: &ActiveEventLoop, id: WindowId, event: WindowEvent) {
        let Some(window) = self.window else {
            return;
        };
        if window.id() != id {
            return;
        }
        if let WindowEvent::Resized(size) = event {
            self.resized = Some(size);
        }
        if let Some(event) = translate_window_event(window, &mut self.tracker, &event) {
            self.events.push(event);
        }
    }
}

fn build_event_loop() -> Result<EventLoop<()>, ContextError> {
    #[cfg(target_os = "macos")]
    {
        error!("windowed contexts need the main thread on macOS; use the headless context");
        return Err(ContextError::ConnectionFailed);
    }

    #[allow(unused_mut)]
    let mut builder = EventLoop::builder();
    #[cfg(all(unix, not(any(target_os = "macos", target_os = "ios", target_os = "android"))))]
    {
        winit::platform::x11::EventLoopBuilderExtX11::with_any_thread(&mut builder, true);
        winit::platform::wayland::EventLoopBuilderExtWayland::with_any_thread(&mut builder, true);
    }
    #[cfg(windows)]
    {
        winit::platform::windows::EventLoopBuilderExtWindows::with_any_thread(&mut builder, true);
    }

    builder.build().map_err(|e| {
        error!("cannot connect to the window system: {e}");
        ContextError::ConnectionFailed
    })
}

/// Opens a window on this thread's event loop, creating the loop first if needed.
fn open_window(attributes: WindowAttributes) -> Result<Window, ContextError> {
    EVENT_LOOP.with(|cell| {
        let mut slot = cell
            .try_borrow_mut()
            .map_err(|_| ContextError::WindowCreationFailed("the event loop is busy".into()))?;
        if slot.is_none() {
            *slot = Some(build_event_loop()?);
        }
        let Some(event_loop) = slot.as_mut() else {
            return Err(ContextError::ConnectionFailed);
        };

        let mut pump = Pump::creating(attributes);
        for _ in 0..CREATE_ATTEMPTS {
            event_loop.pump_app_events(Some(Duration::from_millis(10)), &mut pump);
            if let Some(created) = pump.created.take() {
                return created.map_err(|e| ContextError::WindowCreationFailed(e.to_string()));
            }
        }
        Err(ContextError::WindowCreationFailed(
            "the window system never became ready".into(),
        ))
    })
}

impl GraphicsContext for WindowContext {
    fn create_context(&self) -> Result<(), ContextError> {
        let mut live = lock(&self.live);
        if live.is_some() {
            return Err(ContextError::ContextCreationFailed(
                "a context already exists".into(),
            ));
        }

        let window = Arc::new(open_window(self.attributes())?);
        let gpu = pollster::block_on(Gpu::new(
            Arc::clone(&window),
            GpuInit::with_vsync(self.settings.vsync),
        ))
        .map_err(|e| ContextError::ContextCreationFailed(format!("{e:#}")))?;

        let version = gpu.api_version();
        let device = WgpuDevice::new(gpu.device().clone(), gpu.queue().clone(), gpu.surface_format());
        *lock(&self.geometry) = window_geometry(&window);
        info!(
            "window '{}' created ({:?}, version {version})",
            self.settings.title,
            gpu.surface_format()
        );

        *live = Some(Live {
            device,
            gpu,
            window,
            version,
            pending_resize: None,
        });
        self.ever_created.store(true, Ordering::SeqCst);
        Ok(())
    }

    fn destroy_context(&self) {
        let Some(live) = lock(&self.live).take() else {
            return;
        };
        if let Some(owner) = self.currency.force_release() {
            if owner != thread::current().id() {
                warn!("destroying a context that is current on {owner:?}");
            }
        }
        lock(&self.events).clear();
        drop(live);
        info!("window '{}' destroyed", self.settings.title);
    }

    fn make_current(&self) -> bool {
        if lock(&self.live).is_none() {
            return false;
        }
        match self.currency.acquire() {
            Ok(()) => true,
            Err(owner) => {
                warn!("context is already current on {owner:?}");
                false
            }
        }
    }

    fn make_not_current(&self) -> bool {
        self.currency.release()
    }

    fn swap_buffers(&self) {
        if !self.currency.is_current() {
            warn!("swap_buffers called without the context current");
            return;
        }
        let mut guard = lock(&self.live);
        let Some(live) = guard.as_mut() else {
            return;
        };
        if let Some(size) = live.pending_resize.take() {
            live.gpu.resize(size);
        }

        let size = live.gpu.size();
        if size.width == 0 || size.height == 0 {
            live.device.discard_frame();
            return;
        }
        match live.gpu.begin_frame() {
            Ok(mut frame) => {
                live.device
                    .encode_frame(&mut frame.encoder, &frame.view, (size.width, size.height));
                live.gpu.present(frame);
            }
            Err(e) => {
                live.device.discard_frame();
                let reason = e.to_string();
                match live.gpu.handle_surface_error(e) {
                    SurfaceErrorAction::Fatal => error!("surface error, frame lost: {reason}"),
                    action => debug!("surface error {reason}: {action:?}"),
                }
            }
        }
    }

    fn poll_event(&self) -> Option<Event> {
        if let Some(event) = lock(&self.events).pop_front() {
            return Some(event);
        }
        let window = lock(&self.live).as_ref().map(|l| Arc::clone(&l.window))?;
        let Some(pumped) = self.pump(&window) else {
            debug!("poll_event called off the event loop thread");
            return None;
        };

        *lock(&self.tracker) = pumped.tracker;
        if let Some(size) = pumped.resized {
            if let Some(live) = lock(&self.live).as_mut() {
                live.pending_resize = Some(size);
            }
        }
        let mut events = lock(&self.events);
        for event in pumped.events {
            if let Event::Resize(geometry) = event {
                *lock(&self.geometry) = geometry;
            }
            events.push_back(event);
        }
        events.pop_front()
    }

    fn is_current_for_calling_thread(&self) -> bool {
        self.currency.is_current()
    }

    fn have_context(&self) -> bool {
        lock(&self.live).is_some()
    }

    fn state(&self) -> ContextState {
        let alive = lock(&self.live).is_some();
        match (alive, self.currency.owner()) {
            (true, Some(owner)) => ContextState::Current(owner),
            (true, None) => ContextState::Created,
            (false, _) if self.ever_created.load(Ordering::SeqCst) => ContextState::Destroyed,
            (false, _) => ContextState::Uninitialized,
        }
    }

    fn api_version(&self) -> Option<ApiVersion> {
        lock(&self.live).as_ref().map(|l| l.version)
    }

    fn geometry(&self) -> WindowGeometry {
        *lock(&self.geometry)
    }

    fn with_device(&self, f: &mut dyn FnMut(&mut dyn RenderDevice)) -> bool {
        if !self.currency.is_current() {
            return false;
        }
        let mut guard = lock(&self.live);
        let Some(live) = guard.as_mut() else {
            return false;
        };
        if let Some(size) = live.pending_resize.take() {
            live.gpu.resize(size);
        }
        f(&mut live.device);
        true
    }
}
