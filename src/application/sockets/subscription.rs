//! Subscription handles.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::domain::realtime::Channel;

type Detach = Box<dyn FnOnce() + Send>;

/// A registered event listener, owned by the consumer.
///
/// Released by [`unsubscribe`](Self::unsubscribe) or by dropping the handle.
/// Once released the callback never fires again, even for an event that is
/// already being dispatched.
pub struct Subscription {
    channel: Option<Channel>,
    event: String,
    released: Arc<AtomicBool>,
    detach: Mutex<Option<Detach>>,
}

impl Subscription {
    pub(crate) fn active(
        channel: Channel,
        event: impl Into<String>,
        released: Arc<AtomicBool>,
        detach: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            channel: Some(channel),
            event: event.into(),
            released,
            detach: Mutex::new(Some(Box::new(detach))),
        }
    }

    /// Subscription that was never registered (channel unavailable).
    pub fn inactive(event: impl Into<String>) -> Self {
        Self {
            channel: None,
            event: event.into(),
            released: Arc::new(AtomicBool::new(true)),
            detach: Mutex::new(None),
        }
    }

    /// Channel the listener is registered on; `None` when inactive.
    pub fn channel(&self) -> Option<Channel> {
        self.channel
    }

    /// Event name the listener is registered for.
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Whether the callback can still fire.
    pub fn is_active(&self) -> bool {
        !self.released.load(Ordering::SeqCst)
    }

    /// Removes the listener. Calling it again is a no-op.
    pub fn unsubscribe(&self) {
        self.released.store(true, Ordering::SeqCst);
        // Take first so the lock is not held while detaching
        let detach = self.detach.lock().take();
        if let Some(detach) = detach {
            detach();
            tracing::trace!(event = %self.event, "Unsubscribed");
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("channel", &self.channel)
            .field("event", &self.event)
            .field("active", &self.is_active())
            .finish()
    }
}
