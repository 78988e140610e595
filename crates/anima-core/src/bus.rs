//! Typed publish/subscribe channel
//!
//! One bus per event kind. Subscribing returns a handle; dropping the handle
//! unsubscribes, so listeners cannot leak across session resets.

use std::sync::{Arc, Weak};

use parking_lot::Mutex;

type Listener<T> = Box<dyn FnMut(&T) + Send>;

struct BusInner<T> {
    next_id: u64,
    listeners: Vec<(u64, Listener<T>)>,
}

/// Publish side of a typed event channel.
///
/// Cheap to clone; clones publish to the same listener set.
pub struct EventBus<T> {
    inner: Arc<Mutex<BusInner<T>>>,
}

impl<T> Clone for EventBus<T> {
    fn clone(&self) -> Self {
        EventBus {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for EventBus<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> EventBus<T> {
    pub fn new() -> Self {
        EventBus {
            inner: Arc::new(Mutex::new(BusInner {
                next_id: 0,
                listeners: Vec::new(),
            })),
        }
    }

    /// Register a listener; the subscription unregisters it on drop
    pub fn subscribe(&self, listener: impl FnMut(&T) + Send + 'static) -> Subscription<T> {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.listeners.push((id, Box::new(listener)));
        Subscription {
            id,
            bus: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver `event` to every live listener, in subscription order
    pub fn publish(&self, event: &T) {
        let mut inner = self.inner.lock();
        for (_, listener) in inner.listeners.iter_mut() {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.inner.lock().listeners.len()
    }
}

/// Handle for one registered listener
pub struct Subscription<T> {
    id: u64,
    bus: Weak<Mutex<BusInner<T>>>,
}

impl<T> Subscription<T> {
    /// Explicit unsubscribe; equivalent to dropping the handle
    pub fn cancel(self) {}
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.lock().listeners.retain(|(id, _)| *id != self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_publish_reaches_subscribers() {
        let bus: EventBus<u32> = EventBus::new();
        let seen = Arc::new(AtomicU32::new(0));

        let seen2 = Arc::clone(&seen);
        let _sub = bus.subscribe(move |v| {
            seen2.fetch_add(*v, Ordering::SeqCst);
        });

        bus.publish(&3);
        bus.publish(&4);
        assert_eq!(seen.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn test_drop_unsubscribes() {
        let bus: EventBus<u32> = EventBus::new();
        let seen = Arc::new(AtomicU32::new(0));

        let seen2 = Arc::clone(&seen);
        let sub = bus.subscribe(move |v| {
            seen2.fetch_add(*v, Ordering::SeqCst);
        });
        assert_eq!(bus.listener_count(), 1);

        drop(sub);
        assert_eq!(bus.listener_count(), 0);
        bus.publish(&10);
        assert_eq!(seen.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cancel_is_drop() {
        let bus: EventBus<()> = EventBus::new();
        let sub = bus.subscribe(|_| {});
        sub.cancel();
        assert_eq!(bus.listener_count(), 0);
    }
}
