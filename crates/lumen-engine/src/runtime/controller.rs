use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, Weak};
use std::thread::{self, JoinHandle, ThreadId};

use crossbeam_channel::{Receiver, Sender, TryRecvError};
use log::{debug, error, info, warn};

use super::error::{CloseOutcome, InitError, NotReady};
use super::gate::{Completion, PauseGate};
use super::render_loop::{RenderLoop, join_logged, render_idle_frame};
use super::signals;
use crate::config::EngineConfig;
use crate::context::{ContextCreationPolicy, ContextError, GraphicsContext, WindowGeometry};
use crate::event::{Event, EventDispatcher};
use crate::render::{FrameRenderer, Viewport};
use crate::sync::lock;

type Task = Box<dyn FnOnce() + Send>;

/// Messages for the thread that owns the context under
/// `CreateOnEventLoopThread`.
enum Mail {
    /// Run the event loop until `running` drops.
    Run,
    /// Run a closure on this thread, e.g. create or destroy the context.
    Task(Task),
    /// Leave the thread.
    Exit,
}

/// Creation result published by whichever thread creates the context.
///
/// `None` means "not yet created"; `init` and `restart` wait for `Some`.
#[derive(Default)]
struct CreationSlot {
    result: Mutex<Option<Result<(), ContextError>>>,
    ready: Condvar,
}

impl CreationSlot {
    fn reset(&self) {
        *lock(&self.result) = None;
    }

    fn publish(&self, result: Result<(), ContextError>) {
        *lock(&self.result) = Some(result);
        self.ready.notify_all();
    }

    fn wait(&self) -> Result<(), ContextError> {
        let mut result = lock(&self.result);
        loop {
            if let Some(result) = result.as_ref() {
                return result.clone();
            }
            result = self
                .ready
                .wait(result)
                .unwrap_or_else(std::sync::PoisonError::into_inner);
        }
    }
}

#[derive(Default)]
struct Threads {
    /// Event loop under `CreateOnCallerThread`; one per start.
    event: Option<JoinHandle<()>>,
    /// Persistent context thread under `CreateOnEventLoopThread`.
    context: Option<JoinHandle<()>>,
    quit: Option<JoinHandle<()>>,
    pause: Option<JoinHandle<()>>,
    restart: Option<JoinHandle<()>>,
}

pub(crate) struct ControllerInner {
    pub(crate) context: Arc<dyn GraphicsContext>,
    pub(crate) config: EngineConfig,
    running: AtomicBool,
    restarting: AtomicBool,
    event_gate: PauseGate,
    event_finished: Completion,
    events: EventDispatcher,
    render: Arc<RenderLoop>,
    creation: CreationSlot,
    geometry: Mutex<WindowGeometry>,
    mailbox: Mutex<Option<Sender<Mail>>>,
    context_thread: Mutex<Option<ThreadId>>,
    exit_requested: AtomicBool,
    threads: Mutex<Threads>,
}

impl ControllerInner {
    fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    fn on_context_thread(&self) -> bool {
        *lock(&self.context_thread) == Some(thread::current().id())
    }

    fn context_thread_alive(&self) -> bool {
        let has_mailbox = lock(&self.mailbox).is_some();
        has_mailbox
            && lock(&self.threads)
                .context
                .as_ref()
                .is_some_and(|h| !h.is_finished())
    }

    /// Stores a helper thread handle, joining the one it replaces outside the lock.
    fn keep_helper(
        &self,
        handle: JoinHandle<()>,
        slot: impl FnOnce(&mut Threads) -> &mut Option<JoinHandle<()>>,
        what: &str,
    ) {
        let previous = {
            let mut threads = lock(&self.threads);
            slot(&mut *threads).replace(handle)
        };
        if let Some(previous) = previous {
            join_logged(previous, what);
        }
    }

    // ---- context thread -------------------------------------------------

    fn spawn_context_thread(self: &Arc<Self>, create_first: bool) -> Result<(), InitError> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let inner = Arc::clone(self);
        let handle = thread::Builder::new()
            .name("lumen-events".into())
            .spawn(move || inner.context_thread_main(rx, create_first))
            .map_err(|e| InitError::ThreadSpawn("event loop", e))?;

        *lock(&self.context_thread) = Some(handle.thread().id());
        *lock(&self.mailbox) = Some(tx);
        let previous = lock(&self.threads).context.replace(handle);
        if let Some(previous) = previous {
            join_logged(previous, "previous event loop");
        }
        Ok(())
    }

    fn context_thread_main(self: Arc<Self>, mail: Receiver<Mail>, create_first: bool) {
        if create_first {
            self.creation.publish(self.context.create_context());
        }
        while !self.exit_requested.swap(false, Ordering::SeqCst) {
            match mail.recv() {
                Ok(Mail::Run) => self.run_event_loop(Some(&mail)),
                Ok(Mail::Task(task)) => task(),
                Ok(Mail::Exit) | Err(_) => break,
            }
        }
        debug!("event loop thread exiting");
    }

    /// Runs `task` on the context thread, or inline if this is that thread.
    fn post(&self, task: Task) -> bool {
        if self.on_context_thread() {
            task();
            return true;
        }
        let sent = match lock(&self.mailbox).as_ref() {
            Some(tx) => tx.send(Mail::Task(task)).is_ok(),
            None => false,
        };
        if sent {
            self.event_gate.wake();
        }
        sent
    }

    fn service_mail(&self, mail: &Receiver<Mail>) {
        loop {
            match mail.try_recv() {
                Ok(Mail::Task(task)) => task(),
                Ok(Mail::Run) => debug!("event loop is already running"),
                Ok(Mail::Exit) => {
                    self.exit_requested.store(true, Ordering::SeqCst);
                    self.running.store(false, Ordering::SeqCst);
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
    }

    fn stop_context_thread(&self) {
        let sender = lock(&self.mailbox).take();
        if let Some(sender) = sender {
            let _ = sender.send(Mail::Exit);
            self.event_gate.wake();
        }
        let handle = lock(&self.threads).context.take();
        if let Some(handle) = handle {
            join_logged(handle, "event loop");
        }
        *lock(&self.context_thread) = None;
    }

    // ---- creation / destruction ----------------------------------------

    /// Creates the context on the policy's thread and waits for the result.
    fn create_context_with_handshake(self: &Arc<Self>) -> Result<(), InitError> {
        self.creation.reset();
        match self.config.creation_policy {
            ContextCreationPolicy::CreateOnCallerThread => {
                self.creation.publish(self.context.create_context());
            }
            ContextCreationPolicy::CreateOnEventLoopThread => {
                if self.context_thread_alive() {
                    let inner = Arc::clone(self);
                    let posted = self.post(Box::new(move || {
                        inner.creation.publish(inner.context.create_context());
                    }));
                    if !posted {
                        self.creation.publish(Err(ContextError::ContextCreationFailed(
                            "the event loop thread is not accepting work".into(),
                        )));
                    }
                } else {
                    self.spawn_context_thread(true)?;
                }
            }
        }
        self.creation.wait().map_err(InitError::from)
    }

    /// Destroys the context on the thread that created it.
    fn destroy_context(self: &Arc<Self>) {
        match self.config.creation_policy {
            ContextCreationPolicy::CreateOnCallerThread => self.context.destroy_context(),
            ContextCreationPolicy::CreateOnEventLoopThread => {
                let (done_tx, done_rx) = crossbeam_channel::bounded(1);
                let context = Arc::clone(&self.context);
                let posted = self.post(Box::new(move || {
                    context.destroy_context();
                    let _ = done_tx.send(());
                }));
                if !posted || done_rx.recv().is_err() {
                    warn!("event loop thread unavailable, destroying the context here");
                    self.context.destroy_context();
                }
            }
        }
    }

    /// Version gate plus idle frame, run right after every creation.
    fn prepare_new_context(self: &Arc<Self>) -> Result<(), InitError> {
        if !self.context.make_current() {
            self.destroy_context();
            return Err(InitError::ContextFailed(ContextError::ContextCreationFailed(
                "the new context could not be made current".into(),
            )));
        }

        let required = self.config.min_version;
        let found = self.context.api_version().unwrap_or_default();
        if found < required {
            error!("graphics API version {found} is too old, at least {required} is required");
            self.context.make_not_current();
            self.destroy_context();
            return Err(InitError::VersionTooOld { found, required });
        }
        info!("graphics API version {found}");

        render_idle_frame(self.context.as_ref());
        self.context.make_not_current();
        *lock(&self.geometry) = self.context.geometry();
        Ok(())
    }

    pub(crate) fn init(self: &Arc<Self>) -> Result<(), InitError> {
        if self.context.have_context() {
            warn!("init called while a context exists, nothing to do");
            return Ok(());
        }
        signals::install_handlers();

        if let Err(e) = self.create_context_with_handshake() {
            error!("failed to create the graphics context: {e}");
            return Err(e);
        }
        self.prepare_new_context()
    }

    // ---- event loop -----------------------------------------------------

    fn run_event_loop(self: &Arc<Self>, mail: Option<&Receiver<Mail>>) {
        info!("event loop started");
        let idle = self.config.event_poll_interval();

        while self.is_running() {
            if let Some(mail) = mail {
                self.service_mail(mail);
            }
            self.event_gate.park(
                || debug!("event loop paused"),
                || debug!("event loop resumed"),
                || self.is_running(),
                || {
                    if let Some(mail) = mail {
                        self.service_mail(mail);
                    }
                },
            );
            if !self.is_running() {
                break;
            }
            match self.context.poll_event() {
                Some(event) => self.dispatch(event),
                None => thread::sleep(idle),
            }
        }

        self.event_finished.finish();
        info!("event loop stopped");
    }

    fn dispatch(self: &Arc<Self>, event: Event) {
        match event {
            Event::Resize(geometry) => {
                *lock(&self.geometry) = geometry;
                self.render
                    .update_viewport(Viewport::new(0, 0, geometry.width, geometry.height));
            }
            Event::WindowClose if self.config.quit_on_window_close => {
                info!("window close requested, quitting the main loop");
                self.quit_main_loop();
            }
            _ => {}
        }
        self.events.dispatch(&event);
    }

    pub(crate) fn start_main_loop(self: &Arc<Self>, wait: bool) -> Result<(), NotReady> {
        if !self.context.have_context() {
            warn!("cannot start the main loop: there is no graphics context");
            return Err(NotReady::NoContext);
        }
        if !self.render.has_renderer() {
            error!("cannot start the main loop: no frame renderer is attached");
            return Err(NotReady::NoRenderer);
        }
        if self.running.swap(true, Ordering::SeqCst) {
            warn!("the main loop is already running");
            return Err(NotReady::AlreadyRunning);
        }
        self.event_finished.reset();
        self.event_gate.reset();
        self.render.clear_pause();

        // Listeners and the viewport see the real size before the first frame.
        self.dispatch(Event::Resize(self.context.geometry()));

        let event_started = match self.config.creation_policy {
            ContextCreationPolicy::CreateOnCallerThread => {
                let inner = Arc::clone(self);
                thread::Builder::new()
                    .name("lumen-events".into())
                    .spawn(move || inner.run_event_loop(None))
                    .map(|handle| {
                        let previous = lock(&self.threads).event.replace(handle);
                        if let Some(previous) = previous {
                            join_logged(previous, "previous event loop");
                        }
                    })
                    .map_err(|e| NotReady::ThreadSpawn("event loop", e))
            }
            ContextCreationPolicy::CreateOnEventLoopThread => {
                let sent = lock(&self.mailbox)
                    .as_ref()
                    .is_some_and(|tx| tx.send(Mail::Run).is_ok());
                if sent {
                    Ok(())
                } else {
                    Err(NotReady::NoContext)
                }
            }
        };
        if let Err(e) = event_started {
            error!("failed to start the event loop: {e}");
            self.running.store(false, Ordering::SeqCst);
            self.event_finished.finish();
            return Err(e);
        }

        if let Err(e) = self.render.start() {
            error!("failed to start the render loop: {e}");
            self.quit_now();
            return Err(NotReady::ThreadSpawn("render loop", e));
        }
        info!("main loop started");

        if wait {
            self.wait_for_loops();
        }
        Ok(())
    }

    fn wait_for_loops(&self) {
        self.event_finished.wait();
        let event = lock(&self.threads).event.take();
        if let Some(handle) = event {
            join_logged(handle, "event loop");
        }
        self.render.wait_stopped();
        let quit = lock(&self.threads).quit.take();
        if let Some(handle) = quit {
            join_logged(handle, "quit");
        }
    }

    // ---- quit / pause / restart ----------------------------------------

    pub(crate) fn quit_main_loop(self: &Arc<Self>) {
        if !self.is_running() {
            debug!("quit requested while the main loop is not running");
            return;
        }

        // The handle is stored before the lock is released so that waiters
        // always find the quit thread.
        let mut threads = lock(&self.threads);
        if threads.quit.as_ref().is_some_and(|h| !h.is_finished()) {
            debug!("quit already in progress");
            return;
        }
        let inner = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name("lumen-quit".into())
            .spawn(move || inner.quit_now());
        match spawned {
            Ok(handle) => {
                if let Some(previous) = threads.quit.replace(handle) {
                    join_logged(previous, "previous quit");
                }
            }
            Err(e) => {
                drop(threads);
                error!("failed to spawn the quit thread ({e}), quitting inline");
                self.quit_now();
            }
        }
    }

    fn quit_now(&self) {
        self.running.store(false, Ordering::SeqCst);
        self.event_gate.wake();

        let timeout = self.config.loop_join_timeout();
        if self.event_finished.wait_timeout(timeout) {
            let event = lock(&self.threads).event.take();
            if let Some(handle) = event {
                join_logged(handle, "event loop");
            }
        } else {
            warn!("event loop did not finish within {timeout:?}, marking it finished");
            let _detached = lock(&self.threads).event.take();
            self.event_finished.finish();
        }

        self.render.stop();
        // A pause pending at quit time must not park the next session.
        self.event_gate.reset();
        self.render.clear_pause();
        info!("main loop stopped");
    }

    pub(crate) fn pause_main_loop(self: &Arc<Self>, run_in_new_thread: bool) {
        if !self.is_running() {
            debug!("pause requested while the main loop is not running");
            return;
        }
        if !run_in_new_thread {
            self.pause_now();
            return;
        }
        let inner = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name("lumen-pause".into())
            .spawn(move || {
                inner.pause_now();
            });
        match spawned {
            Ok(handle) => self.keep_helper(handle, |t| &mut t.pause, "pause"),
            Err(e) => error!("failed to spawn the pause thread: {e}"),
        }
    }

    /// Requests the pause and blocks until both loops acknowledged it.
    fn pause_now(&self) -> bool {
        self.event_gate.request();
        self.render.pause();

        let interval = self.config.pause_poll_interval();
        let keep_waiting = || self.is_running();
        let paused = self.event_gate.wait_acknowledged(interval, keep_waiting)
            && self.render.wait_paused(interval, keep_waiting);
        if paused {
            info!("main loop paused");
        } else {
            warn!("main loop stopped before the pause was acknowledged");
        }
        paused
    }

    /// Releases both loops and waits until neither is parked any more.
    pub(crate) fn continue_main_loop(&self) {
        self.event_gate.release();
        self.render.resume();

        let timeout = self.config.loop_join_timeout();
        if self.event_gate.wait_released(timeout) && self.render.wait_resumed(timeout) {
            debug!("main loop continued");
        } else {
            warn!("a loop was still parked {timeout:?} after continuing");
        }
    }

    pub(crate) fn is_paused(&self) -> bool {
        self.event_gate.is_acknowledged() && self.render.is_paused()
    }

    pub(crate) fn restart(self: &Arc<Self>, run_in_new_thread: bool) {
        if !self.is_running() {
            debug!("restart requested while the main loop is not running");
            return;
        }
        if self.restarting.swap(true, Ordering::SeqCst) {
            debug!("restart already in progress");
            return;
        }
        if !run_in_new_thread {
            self.restart_now();
            return;
        }

        let inner = Arc::clone(self);
        let spawned = thread::Builder::new()
            .name("lumen-restart".into())
            .spawn(move || inner.restart_now());
        match spawned {
            Ok(handle) => self.keep_helper(handle, |t| &mut t.restart, "restart"),
            Err(e) => {
                error!("failed to spawn the restart thread: {e}");
                self.restarting.store(false, Ordering::SeqCst);
            }
        }
    }

    fn restart_now(self: &Arc<Self>) {
        if !self.pause_now() {
            self.continue_main_loop();
            self.restarting.store(false, Ordering::SeqCst);
            return;
        }

        info!("recreating the graphics context");
        if self.context.make_current() {
            self.context.make_not_current();
        } else {
            warn!("the paused context could not be bound to the restarting thread");
        }
        self.destroy_context();

        let recreated = self
            .create_context_with_handshake()
            .and_then(|()| self.prepare_new_context());
        self.continue_main_loop();
        self.restarting.store(false, Ordering::SeqCst);

        match recreated {
            Ok(()) => info!("graphics context recreated"),
            Err(e) => {
                error!("failed to recreate the graphics context ({e}), quitting the main loop");
                self.quit_main_loop();
            }
        }
    }

    // ---- close / shutdown ----------------------------------------------

    pub(crate) fn close_window(self: &Arc<Self>, wait: bool) -> CloseOutcome {
        if !self.context.have_context() {
            debug!("close_window: no context, nothing to do");
            return CloseOutcome::NothingToDo;
        }

        if self.is_running() {
            self.quit_main_loop();
        }
        if wait {
            let quit = lock(&self.threads).quit.take();
            if let Some(handle) = quit {
                join_logged(handle, "quit");
            }
        }

        self.destroy_context();
        self.creation.reset();
        info!("window closed");
        CloseOutcome::Closed
    }

    pub(crate) fn shutdown(self: &Arc<Self>) {
        self.close_window(true);

        let leftovers = {
            let mut threads = lock(&self.threads);
            [
                ("restart", threads.restart.take()),
                ("pause", threads.pause.take()),
                ("quit", threads.quit.take()),
                ("event loop", threads.event.take()),
            ]
        };
        for (what, handle) in leftovers {
            if let Some(handle) = handle {
                join_logged(handle, what);
            }
        }
        self.stop_context_thread();
    }
}

/// Owner of the event and render loops.
///
/// Dropping the controller shuts everything down and frees the signal slot.
pub struct LoopController {
    inner: Arc<ControllerInner>,
}

impl LoopController {
    /// Builds a controller around `context` and claims the process signal slot.
    pub fn new(context: Arc<dyn GraphicsContext>, config: EngineConfig) -> Result<Self, InitError> {
        let render = Arc::new(RenderLoop::new(
            Arc::clone(&context),
            config.clear_color(),
            config.loop_join_timeout(),
        ));
        let inner = Arc::new(ControllerInner {
            context,
            running: AtomicBool::new(false),
            restarting: AtomicBool::new(false),
            event_gate: PauseGate::default(),
            event_finished: Completion::new(true),
            events: EventDispatcher::new(),
            render,
            creation: CreationSlot::default(),
            geometry: Mutex::new(config.window.geometry()),
            mailbox: Mutex::new(None),
            context_thread: Mutex::new(None),
            exit_requested: AtomicBool::new(false),
            threads: Mutex::new(Threads::default()),
            config,
        });
        signals::register(&inner)?;
        Ok(Self { inner })
    }

    /// Creates the context, checks its version and presents one black frame.
    ///
    /// Does nothing when a context already exists.
    pub fn init(&self) -> Result<(), InitError> {
        self.inner.init()
    }

    /// Attaches the per-frame renderer, replacing any previous one.
    pub fn attach_renderer<R: FrameRenderer + 'static>(&self, renderer: R) {
        self.inner.render.set_renderer(Box::new(renderer));
    }

    /// Starts the event and render loops.
    ///
    /// With `wait` the call blocks until both loops have terminated.
    pub fn start_main_loop(&self, wait: bool) -> Result<(), NotReady> {
        self.inner.start_main_loop(wait)
    }

    /// Stops both loops from a helper thread and returns immediately.
    pub fn quit_main_loop(&self) {
        self.inner.quit_main_loop()
    }

    /// Pauses both loops.
    ///
    /// Listeners must pass `run_in_new_thread = true`: the event thread
    /// itself has to park for the pause to complete.
    pub fn pause_main_loop(&self, run_in_new_thread: bool) {
        self.inner.pause_main_loop(run_in_new_thread)
    }

    pub fn continue_main_loop(&self) {
        self.inner.continue_main_loop()
    }

    /// Destroys and recreates the context while the loops are paused.
    ///
    /// GPU resources created on the old context are gone afterwards. The same
    /// threading rule as for [`pause_main_loop`](Self::pause_main_loop) applies.
    pub fn restart(&self, run_in_new_thread: bool) {
        self.inner.restart(run_in_new_thread)
    }

    /// Quits the loops and destroys the context; `init` may be called again.
    ///
    /// Listeners must pass `wait = false`.
    pub fn close_window(&self, wait: bool) -> CloseOutcome {
        self.inner.close_window(wait)
    }

    pub fn shutdown(&self) {
        self.inner.shutdown()
    }

    pub fn is_running(&self) -> bool {
        self.inner.is_running()
    }

    pub fn is_paused(&self) -> bool {
        self.inner.is_paused()
    }

    /// Last known window geometry.
    pub fn geometry(&self) -> WindowGeometry {
        *lock(&self.inner.geometry)
    }

    pub fn events(&self) -> &EventDispatcher {
        &self.inner.events
    }

    pub fn render_loop(&self) -> &RenderLoop {
        &self.inner.render
    }

    pub fn context(&self) -> &Arc<dyn GraphicsContext> {
        &self.inner.context
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }

    /// Weak handle for use inside listeners and renderers.
    pub fn handle(&self) -> LoopHandle {
        LoopHandle {
            inner: Arc::downgrade(&self.inner),
        }
    }

    #[cfg(test)]
    pub(crate) fn inner(&self) -> &Arc<ControllerInner> {
        &self.inner
    }
}

impl Drop for LoopController {
    fn drop(&mut self) {
        self.inner.shutdown();
        signals::unregister(&self.inner);
    }
}

impl std::fmt::Debug for LoopController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopController")
            .field("running", &self.is_running())
            .field("paused", &self.is_paused())
            .field("render", &*self.inner.render)
            .finish_non_exhaustive()
    }
}

/// Non-owning controller handle.
///
/// Safe to capture in event listeners: it does not keep the controller
/// alive. Every call is a no-op once the controller is gone. The operations
/// run in helper threads, as listeners require.
#[derive(Clone)]
pub struct LoopHandle {
    inner: Weak<ControllerInner>,
}

impl LoopHandle {
    pub fn quit_main_loop(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.quit_main_loop();
        }
    }

    pub fn pause_main_loop(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.pause_main_loop(true);
        }
    }

    pub fn continue_main_loop(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.continue_main_loop();
        }
    }

    pub fn restart(&self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.restart(true);
        }
    }

    /// Closes the window without waiting for the loops.
    pub fn close_window(&self) -> CloseOutcome {
        match self.inner.upgrade() {
            Some(inner) => inner.close_window(false),
            None => CloseOutcome::NothingToDo,
        }
    }

    pub fn is_running(&self) -> bool {
        self.inner.upgrade().is_some_and(|inner| inner.is_running())
    }

    pub fn is_paused(&self) -> bool {
        self.inner.upgrade().is_some_and(|inner| inner.is_paused())
    }
}

impl std::fmt::Debug for LoopHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoopHandle")
            .field("alive", &(self.inner.strong_count() > 0))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::{Duration, Instant};

    use super::*;
    use crate::context::{ContextState, HeadlessContext};
    use crate::render::{RenderDevice, render_fn};
    use crate::runtime::{Signal, SignalAction, SignalPolicy};
    use crate::time::FrameTime;

    /// The signal slot is process-wide; controllers in this binary take turns.
    static SERIAL: Mutex<()> = Mutex::new(());

    fn wait_until(timeout: Duration, mut f: impl FnMut() -> bool) -> bool {
        let end = Instant::now() + timeout;
        while Instant::now() < end {
            if f() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        f()
    }

    fn running_controller(config: EngineConfig) -> (Arc<HeadlessContext>, LoopController) {
        let ctx = Arc::new(HeadlessContext::default());
        let controller = LoopController::new(ctx.clone(), config).unwrap();
        controller.attach_renderer(render_fn(|_: &mut dyn RenderDevice, _: &FrameTime| {}));
        controller.init().unwrap();
        controller.start_main_loop(false).unwrap();
        (ctx, controller)
    }

    #[test]
    fn handled_signal_tears_everything_down() {
        let _serial = lock(&SERIAL);
        let (ctx, controller) = running_controller(EngineConfig::default());

        let action = signals::deliver(Signal::Interrupt, false);
        assert_eq!(action, Some(SignalAction::Exit(5)));
        assert!(!controller.is_running());
        assert_eq!(ctx.state(), ContextState::Destroyed);
        assert_eq!(ctx.stats().live, 0);
    }

    #[test]
    fn ignored_signal_keeps_the_loop_running() {
        let _serial = lock(&SERIAL);
        let config = EngineConfig {
            signals: SignalPolicy {
                handle_interrupt: true,
                handle_terminate: false,
            },
            ..EngineConfig::default()
        };
        let (ctx, controller) = running_controller(config);

        assert_eq!(signals::deliver(Signal::Terminate, false), Some(SignalAction::Ignore));
        assert!(controller.is_running());
        assert!(ctx.have_context());

        assert_eq!(controller.close_window(true), CloseOutcome::Closed);
    }

    #[test]
    fn signal_without_controller_is_dropped() {
        let _serial = lock(&SERIAL);
        assert_eq!(signals::deliver(Signal::Interrupt, false), None);
    }

    #[test]
    fn event_thread_policy_creates_off_the_caller() {
        let _serial = lock(&SERIAL);
        let config = EngineConfig {
            creation_policy: ContextCreationPolicy::CreateOnEventLoopThread,
            ..EngineConfig::default()
        };
        let (ctx, controller) = running_controller(config);

        let creator = ctx.creator_thread().unwrap();
        assert_ne!(creator, thread::current().id());
        assert_eq!(*lock(&controller.inner().context_thread), Some(creator));

        controller.restart(false);
        assert!(wait_until(Duration::from_secs(2), || !controller.is_paused()));
        assert_eq!(ctx.creator_thread(), Some(creator));
        assert_eq!(ctx.stats().created, 2);

        assert_eq!(controller.close_window(true), CloseOutcome::Closed);
        assert_eq!(ctx.stats().live, 0);
    }

    #[test]
    fn window_close_event_quits_and_reaches_listeners() {
        let _serial = lock(&SERIAL);
        let (ctx, controller) = running_controller(EngineConfig::default());
        let seen = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&seen);
        controller
            .events()
            .add_listener(crate::event::EventKind::WindowClose, move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            });

        ctx.push_event(Event::WindowClose);
        assert!(wait_until(Duration::from_secs(2), || !controller.is_running()));
        assert_eq!(seen.load(Ordering::SeqCst), 1);
        assert!(ctx.have_context());
    }
}
