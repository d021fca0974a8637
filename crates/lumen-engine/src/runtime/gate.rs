use std::sync::{Condvar, Mutex, MutexGuard};
use std::time::Duration;

use crate::sync::lock;

#[derive(Debug, Default)]
struct GateState {
    requested: bool,
    acknowledged: bool,
}

/// Pause rendezvous between a controlling thread and one loop.
///
/// The controller raises the request; the loop parks at its next safe point
/// and acknowledges. The request flag and the acknowledgement are kept apart
/// so "paused" only becomes true once the loop has actually stopped.
#[derive(Debug, Default)]
pub(crate) struct PauseGate {
    state: Mutex<GateState>,
    changed: Condvar,
}

impl PauseGate {
    pub(crate) fn request(&self) {
        lock(&self.state).requested = true;
        self.changed.notify_all();
    }

    pub(crate) fn release(&self) {
        lock(&self.state).requested = false;
        self.changed.notify_all();
    }

    /// Drops any request and acknowledgement left over from a finished loop.
    pub(crate) fn reset(&self) {
        *lock(&self.state) = GateState::default();
        self.changed.notify_all();
    }

    /// Wakes a parked loop so it re-checks its exit condition or mailbox.
    pub(crate) fn wake(&self) {
        let _state = lock(&self.state);
        self.changed.notify_all();
    }

    pub(crate) fn is_requested(&self) -> bool {
        lock(&self.state).requested
    }

    pub(crate) fn is_acknowledged(&self) -> bool {
        lock(&self.state).acknowledged
    }

    /// Called by the loop at a safe point.
    ///
    /// If a pause is requested: runs `on_pause`, acknowledges, then sleeps
    /// until the request is released or `keep_waiting` turns false, running
    /// `on_wake` after every wake-up. `on_resume` runs before returning.
    /// Returns whether the loop was parked.
    pub(crate) fn park(
        &self,
        on_pause: impl FnOnce(),
        on_resume: impl FnOnce(),
        keep_waiting: impl Fn() -> bool,
        mut on_wake: impl FnMut(),
    ) -> bool {
        if !self.is_requested() {
            return false;
        }
        on_pause();

        let mut state = lock(&self.state);
        state.acknowledged = true;
        self.changed.notify_all();
        while state.requested && keep_waiting() {
            state = self.wait(state, Duration::from_millis(50));
            drop(state);
            on_wake();
            state = lock(&self.state);
        }
        state.acknowledged = false;
        self.changed.notify_all();
        drop(state);

        on_resume();
        true
    }

    /// Waits until the loop acknowledged the pause.
    ///
    /// Gives up (returning `false`) when `keep_waiting` turns false, e.g. the
    /// loop stopped before reaching its safe point.
    pub(crate) fn wait_acknowledged(&self, interval: Duration, keep_waiting: impl Fn() -> bool) -> bool {
        let mut state = lock(&self.state);
        while !state.acknowledged {
            if !keep_waiting() {
                return false;
            }
            state = self.wait(state, interval);
        }
        true
    }

    /// Waits until a released loop has left its parking spot.
    ///
    /// Returns `false` if the loop is still parked after `timeout`.
    pub(crate) fn wait_released(&self, timeout: Duration) -> bool {
        let state = lock(&self.state);
        match self.changed.wait_timeout_while(state, timeout, |s| s.acknowledged) {
            Ok((state, _)) => !state.acknowledged,
            Err(poisoned) => !poisoned.into_inner().0.acknowledged,
        }
    }

    fn wait<'a>(&self, state: MutexGuard<'a, GateState>, timeout: Duration) -> MutexGuard<'a, GateState> {
        match self.changed.wait_timeout(state, timeout) {
            Ok((state, _)) => state,
            Err(poisoned) => poisoned.into_inner().0,
        }
    }
}

/// One-shot "finished" flag a thread raises on exit.
#[derive(Debug)]
pub(crate) struct Completion {
    done: Mutex<bool>,
    changed: Condvar,
}

impl Completion {
    pub(crate) fn new(done: bool) -> Self {
        Self {
            done: Mutex::new(done),
            changed: Condvar::new(),
        }
    }

    pub(crate) fn reset(&self) {
        *lock(&self.done) = false;
    }

    pub(crate) fn finish(&self) {
        *lock(&self.done) = true;
        self.changed.notify_all();
    }

    pub(crate) fn is_done(&self) -> bool {
        *lock(&self.done)
    }

    pub(crate) fn wait(&self) {
        let mut done = lock(&self.done);
        while !*done {
            done = self.changed.wait(done).unwrap_or_else(|p| p.into_inner());
        }
    }

    /// Returns `false` if the timeout expired first.
    pub(crate) fn wait_timeout(&self, timeout: Duration) -> bool {
        let done = lock(&self.done);
        match self.changed.wait_timeout_while(done, timeout, |done| !*done) {
            Ok((done, _)) => *done,
            Err(poisoned) => *poisoned.into_inner().0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;

    #[test]
    fn park_without_request_is_a_no_op() {
        let gate = PauseGate::default();
        assert!(!gate.park(|| panic!("paused"), || panic!("resumed"), || true, || {}));
    }

    #[test]
    fn acknowledgement_follows_the_loop() {
        let gate = Arc::new(PauseGate::default());
        let resumed = Arc::new(AtomicBool::new(false));

        gate.request();
        assert!(!gate.is_acknowledged());

        let loop_gate = Arc::clone(&gate);
        let loop_resumed = Arc::clone(&resumed);
        let worker = thread::spawn(move || {
            loop_gate.park(|| {}, || loop_resumed.store(true, Ordering::SeqCst), || true, || {})
        });

        assert!(gate.wait_acknowledged(Duration::from_millis(5), || true));
        assert!(gate.is_acknowledged());
        assert!(!resumed.load(Ordering::SeqCst));

        gate.release();
        assert!(worker.join().unwrap());
        assert!(resumed.load(Ordering::SeqCst));
        assert!(!gate.is_acknowledged());
    }

    #[test]
    fn released_loop_is_unparked_when_the_wait_returns() {
        let gate = Arc::new(PauseGate::default());
        gate.request();

        let loop_gate = Arc::clone(&gate);
        let worker = thread::spawn(move || loop_gate.park(|| {}, || {}, || true, || {}));
        assert!(gate.wait_acknowledged(Duration::from_millis(5), || true));

        gate.release();
        assert!(gate.wait_released(Duration::from_secs(2)));
        assert!(!gate.is_acknowledged());
        assert!(worker.join().unwrap());
    }

    #[test]
    fn reset_clears_a_stale_request() {
        let gate = PauseGate::default();
        gate.request();
        gate.reset();
        assert!(!gate.is_requested());
        assert!(!gate.park(|| panic!("paused"), || {}, || true, || {}));
        assert!(gate.wait_released(Duration::from_millis(1)));
    }

    #[test]
    fn parked_loop_leaves_when_told_to_stop() {
        let gate = Arc::new(PauseGate::default());
        let running = Arc::new(AtomicBool::new(true));
        let wakes = Arc::new(AtomicUsize::new(0));
        gate.request();

        let (g, r, w) = (Arc::clone(&gate), Arc::clone(&running), Arc::clone(&wakes));
        let worker = thread::spawn(move || {
            g.park(|| {}, || {}, || r.load(Ordering::SeqCst), || {
                w.fetch_add(1, Ordering::SeqCst);
            })
        });

        assert!(gate.wait_acknowledged(Duration::from_millis(5), || true));
        running.store(false, Ordering::SeqCst);
        gate.wake();
        assert!(worker.join().unwrap());
        assert!(wakes.load(Ordering::SeqCst) >= 1);
    }

    #[test]
    fn waiting_gives_up_when_the_loop_is_gone() {
        let gate = PauseGate::default();
        gate.request();
        assert!(!gate.wait_acknowledged(Duration::from_millis(1), || false));
    }

    #[test]
    fn completion_times_out_then_finishes() {
        let done = Arc::new(Completion::new(false));
        assert!(!done.wait_timeout(Duration::from_millis(5)));

        let d = Arc::clone(&done);
        thread::spawn(move || d.finish());
        done.wait();
        assert!(done.is_done());
        assert!(done.wait_timeout(Duration::from_millis(1)));
    }
}
