//! Ordered listener registry with isolated dispatch
//!
//! Every hub event (message, notification, connection change) fans out to all
//! registered listeners in registration order. A panicking listener must not
//! stop delivery to the listeners after it, and cancelling a subscription
//! twice is a no-op.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use uuid::Uuid;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Registry of listeners for one event stream
pub struct SubscriberSet<T> {
    entries: Arc<Mutex<Vec<(Uuid, Callback<T>)>>>,
}

impl<T: 'static> SubscriberSet<T> {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Register a listener. The returned handle removes exactly this listener
    /// when cancelled; dropping the handle without cancelling leaves the
    /// listener registered.
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let id = Uuid::new_v4();
        self.entries
            .lock()
            .expect("subscriber set poisoned")
            .push((id, Arc::new(callback)));
        tracing::debug!(subscription_id = %id, "Listener registered");

        let entries = self.entries.clone();
        Subscription {
            cancelled: AtomicBool::new(false),
            remove: Box::new(move || {
                entries
                    .lock()
                    .expect("subscriber set poisoned")
                    .retain(|(entry_id, _)| *entry_id != id);
                tracing::debug!(subscription_id = %id, "Listener removed");
            }),
        }
    }

    /// Deliver one event to every current listener, in registration order.
    /// Each listener runs isolated: a panic is logged and swallowed.
    pub fn emit(&self, value: &T) {
        let snapshot: Vec<Callback<T>> = self
            .entries
            .lock()
            .expect("subscriber set poisoned")
            .iter()
            .map(|(_, callback)| callback.clone())
            .collect();

        for callback in snapshot {
            if catch_unwind(AssertUnwindSafe(|| callback(value))).is_err() {
                tracing::warn!("Listener panicked during dispatch, skipping it");
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().expect("subscriber set poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: 'static> Default for SubscriberSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle for one registered listener
pub struct Subscription {
    cancelled: AtomicBool,
    remove: Box<dyn Fn() + Send + Sync>,
}

impl Subscription {
    /// Remove the listener. Safe to call more than once; only the first call
    /// has any effect.
    pub fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::SeqCst) {
            return;
        }
        (self.remove)();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_emit_reaches_all_listeners_in_order() {
        let set = SubscriberSet::<u32>::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let mut subscriptions = Vec::new();
        for tag in 0..3 {
            let seen = seen.clone();
            subscriptions.push(set.subscribe(move |value: &u32| {
                seen.lock().unwrap().push((tag, *value));
            }));
        }

        set.emit(&7);

        assert_eq!(*seen.lock().unwrap(), vec![(0, 7), (1, 7), (2, 7)]);
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let set = SubscriberSet::<u32>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let calls_clone = calls.clone();
        let subscription = set.subscribe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(set.len(), 1);

        subscription.cancel();
        subscription.cancel();
        assert!(subscription.is_cancelled());
        assert_eq!(set.len(), 0);

        set.emit(&1);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_cancel_removes_only_its_own_listener() {
        let set = SubscriberSet::<u32>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let calls_a = calls.clone();
        let a = set.subscribe(move |_| {
            calls_a.fetch_add(1, Ordering::SeqCst);
        });
        let calls_b = calls.clone();
        let _b = set.subscribe(move |_| {
            calls_b.fetch_add(10, Ordering::SeqCst);
        });

        a.cancel();
        set.emit(&1);
        assert_eq!(calls.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_panicking_listener_does_not_block_others() {
        let set = SubscriberSet::<u32>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let _a = set.subscribe(|_| panic!("listener bug"));
        let calls_clone = calls.clone();
        let _b = set.subscribe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });

        set.emit(&1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dropping_handle_keeps_listener_registered() {
        let set = SubscriberSet::<u32>::new();
        let calls = Arc::new(AtomicUsize::new(0));

        let calls_clone = calls.clone();
        let subscription = set.subscribe(move |_| {
            calls_clone.fetch_add(1, Ordering::SeqCst);
        });
        drop(subscription);

        set.emit(&1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
