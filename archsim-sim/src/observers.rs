//! Synchronous subscriber fan-out for events and metrics.
//!
//! Delivery walks a snapshot of the subscriber list, so callbacks may
//! subscribe or unsubscribe while a notification is in progress.

use std::sync::Arc;

use parking_lot::Mutex;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

struct Registry<T> {
    next_id: u64,
    subscribers: Vec<(u64, Callback<T>)>,
}

/// Ordered list of callbacks notified synchronously in subscription order.
pub struct Observers<T> {
    registry: Arc<Mutex<Registry<T>>>,
}

impl<T> Clone for Observers<T> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<T> Default for Observers<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> std::fmt::Debug for Observers<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observers")
            .field("subscribers", &self.len())
            .finish()
    }
}

impl<T> Observers<T> {
    pub fn new() -> Self {
        Self {
            registry: Arc::new(Mutex::new(Registry {
                next_id: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    pub fn len(&self) -> usize {
        self.registry.lock().subscribers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: 'static> Observers<T> {
    /// Registers a callback. It stays registered until the returned
    /// subscription is used to unsubscribe.
    #[must_use = "the subscription is the only way to unsubscribe"]
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        let mut registry = self.registry.lock();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.subscribers.push((id, Arc::new(callback)));

        let weak = Arc::downgrade(&self.registry);
        Subscription {
            id,
            remove: Box::new(move |id| {
                if let Some(registry) = weak.upgrade() {
                    registry
                        .lock()
                        .subscribers
                        .retain(|(subscriber, _)| *subscriber != id);
                }
            }),
        }
    }

    /// Delivers `value` to every current subscriber in subscription order.
    pub fn notify(&self, value: &T) {
        let snapshot: Vec<Callback<T>> = self
            .registry
            .lock()
            .subscribers
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in snapshot {
            callback(value);
        }
    }
}

/// Handle returned by `subscribe`. Dropping it keeps the callback registered.
#[must_use = "dropping a subscription leaves its callback registered for good"]
pub struct Subscription {
    id: u64,
    remove: Box<dyn FnOnce(u64) + Send + Sync>,
}

impl Subscription {
    /// Removes the callback. Safe to call from inside a notification.
    pub fn unsubscribe(self) {
        (self.remove)(self.id);
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[test]
    fn test_notify_in_subscription_order() {
        let observers: Observers<u32> = Observers::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["a", "b"] {
            let seen = Arc::clone(&seen);
            let _subscription =
                observers.subscribe(move |value: &u32| seen.lock().push(format!("{tag}{value}")));
        }

        observers.notify(&1);
        observers.notify(&2);
        assert_eq!(*seen.lock(), vec!["a1", "b1", "a2", "b2"]);
    }

    #[test]
    fn test_unsubscribe_stops_delivery() {
        let observers: Observers<u32> = Observers::new();
        let count = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&count);
        let subscription = observers.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        observers.notify(&1);
        subscription.unsubscribe();
        observers.notify(&2);

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(observers.is_empty());
    }

    #[test]
    fn test_unsubscribe_during_delivery() {
        let observers: Observers<u32> = Observers::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let later = Arc::new(AtomicUsize::new(0));

        let own = Arc::clone(&slot);
        let subscription = observers.subscribe(move |_| {
            if let Some(subscription) = own.lock().take() {
                subscription.unsubscribe();
            }
        });
        *slot.lock() = Some(subscription);

        let counter = Arc::clone(&later);
        let _later = observers.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        observers.notify(&1);
        observers.notify(&2);

        // Second subscriber saw both notifications; first removed itself
        assert_eq!(later.load(Ordering::SeqCst), 2);
        assert_eq!(observers.len(), 1);
    }

    #[test]
    fn test_default_is_empty_and_debug_reports_count() {
        let observers: Observers<String> = Observers::default();
        assert!(observers.is_empty());
        assert_eq!(format!("{observers:?}"), "Observers { subscribers: 0 }");

        let _subscription = observers.subscribe(|_| {});
        assert_eq!(observers.len(), 1);
        assert_eq!(format!("{observers:?}"), "Observers { subscribers: 1 }");
    }

    #[test]
    fn test_dropped_subscription_stays_registered() {
        let observers: Observers<u32> = Observers::new();
        let count = Arc::new(AtomicUsize::new(0));

        let counter = Arc::clone(&count);
        drop(observers.subscribe(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        observers.notify(&1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(observers.len(), 1);
    }
}
