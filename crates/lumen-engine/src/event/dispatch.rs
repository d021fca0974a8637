use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use super::{Event, EventKind};
use crate::sync::{read, write};

type Listener = Arc<dyn Fn(&Event) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Per-kind listener registry.
///
/// Listeners run on the event thread, in registration order. The registry is
/// not locked while they run, so a listener may add or remove listeners (or
/// ask the controller to quit) without deadlocking.
#[derive(Default)]
pub struct EventDispatcher {
    listeners: RwLock<HashMap<EventKind, Vec<(ListenerId, Listener)>>>,
    next_id: AtomicU64,
}

impl EventDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener<F>(&self, kind: EventKind, listener: F) -> ListenerId
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        write(&self.listeners)
            .entry(kind)
            .or_default()
            .push((id, Arc::new(listener)));
        id
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = write(&self.listeners);
        for list in listeners.values_mut() {
            if let Some(pos) = list.iter().position(|(lid, _)| *lid == id) {
                list.remove(pos);
                return true;
            }
        }
        false
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        read(&self.listeners).get(&kind).map_or(0, Vec::len)
    }

    /// Notifies every listener of the event's kind; returns how many ran.
    pub fn dispatch(&self, event: &Event) -> usize {
        let snapshot: Vec<Listener> = match read(&self.listeners).get(&event.kind()) {
            Some(list) => list.iter().map(|(_, l)| Arc::clone(l)).collect(),
            None => return 0,
        };
        for listener in &snapshot {
            listener(event);
        }
        snapshot.len()
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = read(&self.listeners);
        let counts: HashMap<_, _> = listeners.iter().map(|(k, v)| (*k, v.len())).collect();
        f.debug_struct("EventDispatcher").field("listeners", &counts).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::WindowGeometry;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn only_matching_kinds_are_notified() {
        let dispatcher = EventDispatcher::new();
        let resizes = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&resizes);
        dispatcher.add_listener(EventKind::Resize, move |e| {
            assert!(matches!(e, Event::Resize(g) if g.width == 640));
            seen.fetch_add(1, Ordering::SeqCst);
        });

        let resize = Event::Resize(WindowGeometry::new(0, 0, 640, 480));
        assert_eq!(dispatcher.dispatch(&resize), 1);
        assert_eq!(dispatcher.dispatch(&Event::Focus { has_focus: true }), 0);
        assert_eq!(resizes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn removed_listeners_stop_receiving() {
        let dispatcher = EventDispatcher::new();
        let id = dispatcher.add_listener(EventKind::WindowClose, |_| {});
        dispatcher.add_listener(EventKind::WindowClose, |_| {});
        assert_eq!(dispatcher.listener_count(EventKind::WindowClose), 2);

        assert!(dispatcher.remove_listener(id));
        assert!(!dispatcher.remove_listener(id));
        assert_eq!(dispatcher.dispatch(&Event::WindowClose), 1);
    }

    #[test]
    fn listeners_may_register_listeners() {
        let dispatcher = Arc::new(EventDispatcher::new());
        let inner = Arc::clone(&dispatcher);
        dispatcher.add_listener(EventKind::Focus, move |_| {
            inner.add_listener(EventKind::Focus, |_| {});
        });
        dispatcher.dispatch(&Event::Focus { has_focus: false });
        assert_eq!(dispatcher.listener_count(EventKind::Focus), 2);
    }
}
