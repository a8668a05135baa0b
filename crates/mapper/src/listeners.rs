//! Ordered listener registry with disposer tokens.
//!
//! Delivery is isolated: a listener that returns an error or panics is
//! logged and skipped, and the remaining listeners still run. Listeners may
//! subscribe or dispose (themselves included) from inside a callback; such
//! changes apply from the next delivery.

use std::collections::{BTreeMap, BTreeSet};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

type Callback<T> = Box<dyn FnMut(&T) -> anyhow::Result<()> + Send>;

struct Registry<T> {
    next_id: u64,
    entries: BTreeMap<u64, Callback<T>>,
    /// Ids whose callbacks are checked out for delivery.
    in_flight: BTreeSet<u64>,
    /// Checked-out ids disposed during delivery.
    disposed_in_flight: BTreeSet<u64>,
}

trait Detach: Send + Sync {
    fn detach(&self, id: u64) -> bool;
    fn contains(&self, id: u64) -> bool;
}

impl<T: 'static> Detach for Mutex<Registry<T>> {
    fn detach(&self, id: u64) -> bool {
        let mut registry = lock(self);
        if registry.entries.remove(&id).is_some() {
            return true;
        }
        if registry.in_flight.remove(&id) {
            registry.disposed_in_flight.insert(id);
            return true;
        }
        false
    }

    fn contains(&self, id: u64) -> bool {
        let registry = lock(self);
        registry.entries.contains_key(&id) || registry.in_flight.contains(&id)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Outcome of one delivery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Delivery {
    pub delivered: usize,
    pub failed: usize,
}

/// A set of listeners receiving `&T`, called in registration order.
pub struct Listeners<T> {
    inner: Arc<Mutex<Registry<T>>>,
}

impl<T: 'static> Listeners<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Registry {
                next_id: 0,
                entries: BTreeMap::new(),
                in_flight: BTreeSet::new(),
                disposed_in_flight: BTreeSet::new(),
            })),
        }
    }

    /// Register a listener. Keep the returned token to remove it later.
    pub fn subscribe<F>(&self, callback: F) -> Subscription
    where
        F: FnMut(&T) -> anyhow::Result<()> + Send + 'static,
    {
        let mut registry = lock(&self.inner);
        let id = registry.next_id;
        registry.next_id += 1;
        registry.entries.insert(id, Box::new(callback));
        drop(registry);

        let weak: Weak<Mutex<Registry<T>>> = Arc::downgrade(&self.inner);
        Subscription {
            id,
            registry: weak,
        }
    }

    /// Deliver `value` to every listener.
    pub fn emit(&self, value: &T) -> Delivery {
        // Check the callbacks out so they run without the lock held.
        let mut checked_out = {
            let mut registry = lock(&self.inner);
            let ids = registry.entries.keys().copied().collect();
            registry.in_flight = ids;
            std::mem::take(&mut registry.entries)
        };
        let mut delivery = Delivery::default();

        for (id, callback) in checked_out.iter_mut() {
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| callback(value)));
            match outcome {
                Ok(Ok(())) => delivery.delivered += 1,
                Ok(Err(e)) => {
                    delivery.failed += 1;
                    tracing::warn!(listener = id, error = %e, "Listener failed");
                }
                Err(_) => {
                    delivery.failed += 1;
                    tracing::warn!(listener = id, "Listener panicked");
                }
            }
        }

        let mut registry = lock(&self.inner);
        registry.in_flight.clear();
        let disposed = std::mem::take(&mut registry.disposed_in_flight);
        for (id, callback) in checked_out {
            if !disposed.contains(&id) {
                registry.entries.insert(id, callback);
            }
        }
        delivery
    }

    /// Number of registered listeners.
    pub fn len(&self) -> usize {
        lock(&self.inner).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: 'static> Default for Listeners<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Disposer token for one listener.
///
/// Dropping the token does *not* remove the listener; call
/// [`dispose`](Self::dispose).
#[must_use = "keep the subscription to be able to dispose the listener"]
pub struct Subscription {
    id: u64,
    registry: Weak<dyn Detach>,
}

impl Subscription {
    /// Remove the listener. Returns `false` if it was already gone.
    pub fn dispose(&self) -> bool {
        match self.registry.upgrade() {
            Some(registry) => registry.detach(self.id),
            None => false,
        }
    }

    /// Whether the listener is still registered.
    pub fn is_active(&self) -> bool {
        self.registry
            .upgrade()
            .is_some_and(|registry| registry.contains(self.id))
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_listeners_run_in_registration_order() {
        let listeners: Listeners<u32> = Listeners::new();
        let seen = Arc::new(Mutex::new(Vec::new()));
        for tag in ["a", "b", "c"] {
            let seen = seen.clone();
            let _ = listeners.subscribe(move |v| {
                seen.lock().unwrap().push(format!("{tag}{v}"));
                Ok(())
            });
        }
        listeners.emit(&1);
        assert_eq!(*seen.lock().unwrap(), vec!["a1", "b1", "c1"]);
    }

    #[test]
    fn test_failing_listener_does_not_block_others() {
        let listeners: Listeners<u32> = Listeners::new();
        let count = Arc::new(AtomicUsize::new(0));

        let _ = listeners.subscribe(|_| anyhow::bail!("boom"));
        let _ = listeners.subscribe(|_| panic!("listener panic"));
        let c = count.clone();
        let _ = listeners.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let delivery = listeners.emit(&7);
        assert_eq!(
            delivery,
            Delivery {
                delivered: 1,
                failed: 2
            }
        );
        assert_eq!(count.load(Ordering::SeqCst), 1);
        // failing listeners stay registered
        assert_eq!(listeners.len(), 3);
    }

    #[test]
    fn test_dispose_removes_listener() {
        let listeners: Listeners<u32> = Listeners::new();
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let sub = listeners.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        listeners.emit(&1);
        assert!(sub.is_active());
        assert!(sub.dispose());
        assert!(!sub.dispose());
        assert!(!sub.is_active());
        listeners.emit(&2);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dispose_from_inside_callback() {
        let listeners: Listeners<u32> = Listeners::new();
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let count = Arc::new(AtomicUsize::new(0));

        let (s, c) = (slot.clone(), count.clone());
        let sub = listeners.subscribe(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
            if let Some(sub) = s.lock().unwrap().as_ref() {
                sub.dispose();
            }
            Ok(())
        });
        *slot.lock().unwrap() = Some(sub);

        listeners.emit(&1);
        listeners.emit(&2);
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(listeners.is_empty());
    }

    #[test]
    fn test_dispose_after_registry_dropped() {
        let listeners: Listeners<u32> = Listeners::new();
        let sub = listeners.subscribe(|_| Ok(()));
        drop(listeners);
        assert!(!sub.dispose());
        assert!(!sub.is_active());
    }
}
