//! Per-event listener tables.
//!
//! Both transports and channels need the same primitive: register a callback
//! under an event name, get back an id that removes exactly that callback,
//! and fan an incoming event out to every callback in registration order.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Handle identifying one registered listener within its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Returns the raw id.
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Shared callback invoked with a borrowed payload.
pub type Listener<P> = Arc<dyn Fn(&P) + Send + Sync>;

/// Result of removing a listener.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovedListener {
    /// Event the listener was registered for.
    pub event: String,
    /// Listeners still registered for that event.
    pub remaining: usize,
}

/// Event name → ordered listeners.
///
/// Callbacks are invoked with no lock held, so a callback may add or remove
/// listeners (including itself) on the same table.
pub struct ListenerTable<P: ?Sized> {
    next_id: AtomicU64,
    entries: RwLock<HashMap<String, Vec<(ListenerId, Listener<P>)>>>,
}

impl<P: ?Sized> ListenerTable<P> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Registers `listener` for `event`.
    pub fn add(&self, event: &str, listener: Listener<P>) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries
            .write()
            .entry(event.to_string())
            .or_default()
            .push((id, listener));
        id
    }

    /// Removes one listener. Returns `None` if it was not registered.
    pub fn remove(&self, id: ListenerId) -> Option<RemovedListener> {
        let mut entries = self.entries.write();

        let event = entries
            .iter()
            .find(|(_, listeners)| listeners.iter().any(|(lid, _)| *lid == id))
            .map(|(event, _)| event.clone())?;

        let remaining = {
            let listeners = entries.get_mut(&event)?;
            listeners.retain(|(lid, _)| *lid != id);
            listeners.len()
        };
        if remaining == 0 {
            entries.remove(&event);
        }

        Some(RemovedListener { event, remaining })
    }

    /// Invokes every listener registered for `event`, in registration order.
    ///
    /// Returns the number of listeners invoked.
    pub fn dispatch(&self, event: &str, payload: &P) -> usize {
        // Clone listeners to release the lock before invoking them
        let listeners: Vec<Listener<P>> = {
            let entries = self.entries.read();
            match entries.get(event) {
                Some(listeners) => listeners.iter().map(|(_, l)| Arc::clone(l)).collect(),
                None => return 0,
            }
        };

        for listener in &listeners {
            listener(payload);
        }
        listeners.len()
    }

    /// Whether `id` is still registered.
    pub fn contains(&self, id: ListenerId) -> bool {
        self.entries
            .read()
            .values()
            .any(|listeners| listeners.iter().any(|(lid, _)| *lid == id))
    }

    /// Number of listeners registered for `event`.
    pub fn count(&self, event: &str) -> usize {
        self.entries.read().get(event).map(Vec::len).unwrap_or(0)
    }

    /// Event names that currently have at least one listener.
    pub fn events(&self) -> Vec<String> {
        self.entries.read().keys().cloned().collect()
    }

    /// Total number of listeners across all events.
    pub fn len(&self) -> usize {
        self.entries.read().values().map(Vec::len).sum()
    }

    /// Whether the table has no listeners.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Drops every listener.
    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

impl<P: ?Sized> Default for ListenerTable<P> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, Listener<u32>) {
        let hits = Arc::new(AtomicUsize::new(0));
        let hits_clone = hits.clone();
        (
            hits,
            Arc::new(move |_: &u32| {
                hits_clone.fetch_add(1, Ordering::SeqCst);
            }),
        )
    }

    #[test]
    fn dispatch_reaches_only_matching_event() {
        let table = ListenerTable::<u32>::new();
        let (a_hits, a) = counter();
        let (b_hits, b) = counter();

        table.add("a", a);
        table.add("b", b);

        assert_eq!(table.dispatch("a", &1), 1);
        assert_eq!(a_hits.load(Ordering::SeqCst), 1);
        assert_eq!(b_hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn dispatch_preserves_registration_order() {
        let table = ListenerTable::<u32>::new();
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

        for n in 0..3 {
            let order = order.clone();
            table.add("e", Arc::new(move |_: &u32| order.lock().push(n)));
        }

        table.dispatch("e", &0);
        assert_eq!(*order.lock(), vec![0, 1, 2]);
    }

    #[test]
    fn remove_detaches_exactly_one_listener() {
        let table = ListenerTable::<u32>::new();
        let (first_hits, first) = counter();
        let (second_hits, second) = counter();

        let first_id = table.add("e", first);
        table.add("e", second);

        let removed = table.remove(first_id).unwrap();
        assert_eq!(removed.event, "e");
        assert_eq!(removed.remaining, 1);

        table.dispatch("e", &0);
        assert_eq!(first_hits.load(Ordering::SeqCst), 0);
        assert_eq!(second_hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn remove_twice_is_noop() {
        let table = ListenerTable::<u32>::new();
        let (_, listener) = counter();
        let id = table.add("e", listener);

        assert!(table.remove(id).is_some());
        assert!(table.remove(id).is_none());
        assert!(table.is_empty());
    }

    #[test]
    fn listener_can_remove_itself_during_dispatch() {
        let table = Arc::new(ListenerTable::<u32>::new());
        let slot: Arc<parking_lot::Mutex<Option<ListenerId>>> = Arc::default();

        let table_clone = table.clone();
        let slot_clone = slot.clone();
        let id = table.add(
            "e",
            Arc::new(move |_: &u32| {
                if let Some(id) = *slot_clone.lock() {
                    table_clone.remove(id);
                }
            }),
        );
        *slot.lock() = Some(id);

        assert_eq!(table.dispatch("e", &0), 1);
        assert_eq!(table.dispatch("e", &0), 0);
    }

    #[test]
    fn ids_are_unique_across_events() {
        let table = ListenerTable::<u32>::new();
        let (_, a) = counter();
        let (_, b) = counter();

        let a_id = table.add("a", a);
        let b_id = table.add("b", b);
        assert_ne!(a_id, b_id);
        assert_eq!(table.len(), 2);
        assert_eq!(table.count("a"), 1);
    }
}
