use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, ThreadId};

use log::{debug, info, warn};

use super::{
    ApiVersion, ContextError, ContextState, Currency, FramebufferConfig, FramebufferRequest,
    GraphicsContext, WindowGeometry, choose_best_config,
};
use crate::event::Event;
use crate::render::{RecordingDevice, RenderDevice};
use crate::sync::lock;

/// What the headless "platform" offers.
#[derive(Debug, Clone)]
pub struct HeadlessConfig {
    pub version: ApiVersion,
    pub geometry: WindowGeometry,
    /// Framebuffer configurations in enumeration order.
    pub framebuffers: Vec<FramebufferConfig>,
    pub request: FramebufferRequest,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            version: ApiVersion::new(4, 5),
            geometry: WindowGeometry::default(),
            framebuffers: vec![
                FramebufferConfig::rgba8(24, 8, 0),
                FramebufferConfig::rgba8(24, 8, 4),
            ],
            request: FramebufferRequest::default(),
        }
    }
}

/// Lifecycle counters, for tests and diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HeadlessStats {
    pub created: usize,
    pub destroyed: usize,
    pub swaps: usize,
    /// Contexts currently alive; never above one.
    pub live: usize,
}

#[derive(Debug, Default)]
struct Inner {
    device: Option<RecordingDevice>,
    ever_created: bool,
    creator: Option<ThreadId>,
    chosen: Option<usize>,
    fail_next: Option<ContextError>,
    geometry: Option<WindowGeometry>,
}

/// Display-less context that records device commands.
///
/// Events are injected with [`push_event`](Self::push_event) and delivered
/// through `poll_event` like a real window system would.
#[derive(Debug)]
pub struct HeadlessContext {
    config: HeadlessConfig,
    inner: Mutex<Inner>,
    currency: Currency,
    events: Mutex<VecDeque<Event>>,
    created: AtomicUsize,
    destroyed: AtomicUsize,
    swaps: AtomicUsize,
}

impl HeadlessContext {
    pub fn new(config: HeadlessConfig) -> Self {
        Self {
            config,
            inner: Mutex::new(Inner::default()),
            currency: Currency::new(),
            events: Mutex::new(VecDeque::new()),
            created: AtomicUsize::new(0),
            destroyed: AtomicUsize::new(0),
            swaps: AtomicUsize::new(0),
        }
    }

    /// Makes the next `create_context` fail with `error`.
    pub fn fail_next_create(&self, error: ContextError) {
        lock(&self.inner).fail_next = Some(error);
    }

    /// Queues an event; resize events also update the reported geometry.
    pub fn push_event(&self, event: Event) {
        if let Event::Resize(geometry) = event {
            lock(&self.inner).geometry = Some(geometry);
        }
        lock(&self.events).push_back(event);
    }

    pub fn pending_events(&self) -> usize {
        lock(&self.events).len()
    }

    pub fn stats(&self) -> HeadlessStats {
        let created = self.created.load(Ordering::SeqCst);
        let destroyed = self.destroyed.load(Ordering::SeqCst);
        HeadlessStats {
            created,
            destroyed,
            swaps: self.swaps.load(Ordering::SeqCst),
            live: created - destroyed,
        }
    }

    /// Thread that performed the most recent creation.
    pub fn creator_thread(&self) -> Option<ThreadId> {
        lock(&self.inner).creator
    }

    /// Index into `HeadlessConfig::framebuffers` picked at creation.
    pub fn chosen_framebuffer(&self) -> Option<usize> {
        lock(&self.inner).chosen
    }

    /// Inspects the recording device without needing the context current.
    pub fn inspect_device<R>(&self, f: impl FnOnce(&mut RecordingDevice) -> R) -> Option<R> {
        lock(&self.inner).device.as_mut().map(f)
    }

    fn choose_framebuffer(&self) -> Option<usize> {
        let accepted: Vec<usize> = self
            .config
            .framebuffers
            .iter()
            .enumerate()
            .filter(|(_, c)| self.config.request.accepts(c))
            .map(|(i, _)| i)
            .collect();
        let candidates: Vec<FramebufferConfig> =
            accepted.iter().map(|&i| self.config.framebuffers[i]).collect();
        choose_best_config(&candidates).map(|best| accepted[best])
    }
}

impl Default for HeadlessContext {
    fn default() -> Self {
        Self::new(HeadlessConfig::default())
    }
}

impl GraphicsContext for HeadlessContext {
    fn create_context(&self) -> Result<(), ContextError> {
        let mut inner = lock(&self.inner);
        if let Some(error) = inner.fail_next.take() {
            return Err(error);
        }
        if inner.device.is_some() {
            return Err(ContextError::ContextCreationFailed(
                "a context already exists".into(),
            ));
        }

        let chosen = self
            .choose_framebuffer()
            .ok_or(ContextError::NoMatchingFramebuffer)?;
        debug!("headless: using framebuffer config {chosen}");

        inner.device = Some(RecordingDevice::new());
        inner.ever_created = true;
        inner.creator = Some(thread::current().id());
        inner.chosen = Some(chosen);
        self.created.fetch_add(1, Ordering::SeqCst);
        info!("headless context {} created", self.config.version);
        Ok(())
    }

    fn destroy_context(&self) {
        let mut inner = lock(&self.inner);
        if inner.device.take().is_none() {
            return;
        }
        if let Some(owner) = self.currency.force_release() {
            if owner != thread::current().id() {
                warn!("destroying a context that is current on {owner:?}");
            }
        }
        lock(&self.events).clear();
        self.destroyed.fetch_add(1, Ordering::SeqCst);
        info!("headless context destroyed");
    }

    fn make_current(&self) -> bool {
        if lock(&self.inner).device.is_none() {
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
        if let Some(device) = lock(&self.inner).device.as_mut() {
            device.end_frame();
            self.swaps.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn poll_event(&self) -> Option<Event> {
        if lock(&self.inner).device.is_none() {
            return None;
        }
        lock(&self.events).pop_front()
    }

    fn is_current_for_calling_thread(&self) -> bool {
        self.currency.is_current()
    }

    fn have_context(&self) -> bool {
        lock(&self.inner).device.is_some()
    }

    fn state(&self) -> ContextState {
        let inner = lock(&self.inner);
        match (inner.device.is_some(), self.currency.owner()) {
            (true, Some(owner)) => ContextState::Current(owner),
            (true, None) => ContextState::Created,
            (false, _) if inner.ever_created => ContextState::Destroyed,
            (false, _) => ContextState::Uninitialized,
        }
    }

    fn api_version(&self) -> Option<ApiVersion> {
        lock(&self.inner).device.as_ref().map(|_| self.config.version)
    }

    fn geometry(&self) -> WindowGeometry {
        lock(&self.inner).geometry.unwrap_or(self.config.geometry)
    }

    fn with_device(&self, f: &mut dyn FnMut(&mut dyn RenderDevice)) -> bool {
        if !self.currency.is_current() {
            return false;
        }
        match lock(&self.inner).device.as_mut() {
            Some(device) => {
                f(device);
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::{ClearColor, DeviceCommand};
    use std::sync::Arc;

    #[test]
    fn lifecycle_is_tracked() {
        let ctx = HeadlessContext::default();
        assert_eq!(ctx.state(), ContextState::Uninitialized);
        assert_eq!(ctx.api_version(), None);

        ctx.create_context().unwrap();
        assert!(ctx.have_context());
        assert_eq!(ctx.state(), ContextState::Created);
        assert_eq!(ctx.creator_thread(), Some(thread::current().id()));

        assert!(ctx.make_current());
        assert_eq!(ctx.state(), ContextState::Current(thread::current().id()));
        assert!(ctx.make_not_current());

        ctx.destroy_context();
        ctx.destroy_context();
        assert_eq!(ctx.state(), ContextState::Destroyed);
        assert_eq!(ctx.stats(), HeadlessStats { created: 1, destroyed: 1, swaps: 0, live: 0 });
    }

    #[test]
    fn second_create_is_refused() {
        let ctx = HeadlessContext::default();
        ctx.create_context().unwrap();
        assert_eq!(ctx.create_context().unwrap_err().code(), 3);
        assert_eq!(ctx.stats().live, 1);
    }

    #[test]
    fn injected_failure_applies_once() {
        let ctx = HeadlessContext::default();
        ctx.fail_next_create(ContextError::ConnectionFailed);
        assert_eq!(ctx.create_context(), Err(ContextError::ConnectionFailed));
        assert!(ctx.create_context().is_ok());
    }

    #[test]
    fn framebuffer_must_satisfy_the_request() {
        let ctx = HeadlessContext::new(HeadlessConfig {
            framebuffers: vec![FramebufferConfig::rgba8(16, 0, 8)],
            ..HeadlessConfig::default()
        });
        assert_eq!(ctx.create_context(), Err(ContextError::NoMatchingFramebuffer));

        let ctx = HeadlessContext::new(HeadlessConfig {
            framebuffers: vec![
                FramebufferConfig::rgba8(16, 0, 8),
                FramebufferConfig::rgba8(24, 8, 0),
            ],
            ..HeadlessConfig::default()
        });
        ctx.create_context().unwrap();
        assert_eq!(ctx.chosen_framebuffer(), Some(1));
    }

    #[test]
    fn device_requires_currency() {
        let ctx = Arc::new(HeadlessContext::default());
        ctx.create_context().unwrap();
        assert!(!ctx.with_device(&mut |_| {}));

        assert!(ctx.make_current());
        let other = Arc::clone(&ctx);
        let stolen = thread::spawn(move || other.make_current()).join().unwrap();
        assert!(!stolen);

        assert!(ctx.with_device(&mut |d| d.clear(ClearColor::BLACK)));
        ctx.swap_buffers();
        let last = ctx.inspect_device(|d| d.last_frame().to_vec()).unwrap();
        assert_eq!(last, vec![DeviceCommand::Clear(ClearColor::BLACK)]);
        assert_eq!(ctx.stats().swaps, 1);
    }

    #[test]
    fn events_flow_only_with_a_context() {
        let ctx = HeadlessContext::default();
        let g = WindowGeometry::new(10, 20, 300, 200);
        ctx.push_event(Event::Resize(g));
        assert_eq!(ctx.poll_event(), None);

        ctx.create_context().unwrap();
        assert_eq!(ctx.poll_event(), Some(Event::Resize(g)));
        assert_eq!(ctx.poll_event(), None);
        assert_eq!(ctx.geometry(), g);
    }
}
