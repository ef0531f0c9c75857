//! Notifier: the subscription registry and dispatch engine.
//!
//! A [`Notifier<V>`] holds weakly-bound subscriptions and offers every sent
//! value to each of them. It is the engine under both
//! [`Broadcaster`](crate::Broadcaster) (no replay) and [`Cell`](crate::Cell)
//! (replays the current value to new subscribers).
//!
//! # Locking
//!
//! One mutex guards the registry, the key counter and the cached value. It is
//! held only to mutate those or to copy a snapshot of the registry; callbacks
//! always run after it is released, so a callback may subscribe or send on the
//! same notifier.
//!
//! # Lifetime
//!
//! The registry never holds a strong reference to a subscriber. A subscription
//! whose subscriber has been dropped is removed the next time it is visited:
//! by `send`, by the replay in `subscribe`, or by an explicit [`Notifier::sweep`].
//! Until then it stays in the registry together with its closures.

pub mod observe;
pub mod subscription;

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::{debug, trace};

use crate::queue::Scheduler;

pub use observe::{Anchor, Observe, Signal};
pub use subscription::{Filter, SubscriptionKey};

use subscription::{Deliver, Delivery, Stage, Subscription};

type Entry<V> = Arc<dyn Deliver<V>>;

// ---------------------------------------------------------------------------
// ObserveOptions
// ---------------------------------------------------------------------------

/// Optional parameters of a subscription.
pub struct ObserveOptions<V> {
    /// Predicate over the raw value. Values it rejects are not delivered and
    /// never reach the projection.
    pub filter: Option<Filter<V>>,
    /// Where to run the callback. `None` runs it inline on the sending thread.
    pub queue: Option<Arc<dyn Scheduler>>,
}

impl<V> ObserveOptions<V> {
    /// No filter, inline delivery.
    pub fn new() -> Self {
        Self {
            filter: None,
            queue: None,
        }
    }

    /// Set the filter (builder).
    pub fn with_filter(mut self, filter: impl Fn(&V) -> bool + Send + Sync + 'static) -> Self {
        self.filter = Some(Arc::new(filter));
        self
    }

    /// Deliver on `queue` instead of inline (builder).
    pub fn with_queue(mut self, queue: impl Scheduler + 'static) -> Self {
        self.queue = Some(Arc::new(queue));
        self
    }

    /// Deliver on an already shared scheduler (builder).
    pub fn with_shared_queue(mut self, queue: Arc<dyn Scheduler>) -> Self {
        self.queue = Some(queue);
        self
    }
}

impl<V> Default for ObserveOptions<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for ObserveOptions<V> {
    fn clone(&self) -> Self {
        Self {
            filter: self.filter.clone(),
            queue: self.queue.clone(),
        }
    }
}

impl<V> fmt::Debug for ObserveOptions<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObserveOptions")
            .field("filter", &self.filter.is_some())
            .field("queue", &self.queue.is_some())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Notifier
// ---------------------------------------------------------------------------

struct State<V> {
    registry: HashMap<SubscriptionKey, Entry<V>>,
    next_key: u64,
    /// `Some` only for replaying notifiers, and then always `Some`.
    cached: Option<V>,
}

impl<V> State<V> {
    fn allocate_key(&mut self) -> SubscriptionKey {
        let key = SubscriptionKey(self.next_key);
        self.next_key += 1;
        key
    }
}

/// Registry of weakly-bound subscriptions plus an optional cached value.
///
/// Cloning a `Notifier` yields another handle to the **same** registry.
pub struct Notifier<V> {
    state: Arc<Mutex<State<V>>>,
}

impl<V> Clone for Notifier<V> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<V> Notifier<V> {
    fn with_cache(cached: Option<V>) -> Self {
        Self {
            state: Arc::new(Mutex::new(State {
                registry: HashMap::new(),
                next_key: 0,
                cached,
            })),
        }
    }

    /// A notifier that never replays: new subscriptions only see later sends.
    pub fn new() -> Self {
        Self::with_cache(None)
    }

    /// A notifier that caches the last sent value (starting with `initial`)
    /// and replays it to every new subscription.
    pub fn replaying(initial: V) -> Self {
        Self::with_cache(Some(initial))
    }

    /// Whether new subscriptions receive the cached value.
    pub fn replays(&self) -> bool {
        self.state.lock().cached.is_some()
    }

    /// Number of registry entries, including dead ones not yet purged.
    pub fn subscription_count(&self) -> usize {
        self.state.lock().registry.len()
    }

    /// Remove every subscription whose subscriber is gone, without sending.
    ///
    /// Returns the number of subscriptions removed.
    pub fn sweep(&self) -> usize {
        let removed: Vec<Entry<V>> = {
            let mut state = self.state.lock();
            let dead: Vec<SubscriptionKey> = state
                .registry
                .iter()
                .filter(|(_, entry)| !entry.is_live())
                .map(|(key, _)| *key)
                .collect();
            dead.iter()
                .filter_map(|key| state.registry.remove(key))
                .collect()
        };
        if !removed.is_empty() {
            debug!(count = removed.len(), "swept dead subscriptions");
        }
        // Entries drop here, outside the lock.
        removed.len()
    }

    fn purge(&self, keys: &[SubscriptionKey]) {
        let removed: Vec<Entry<V>> = {
            let mut state = self.state.lock();
            keys.iter()
                .filter_map(|key| state.registry.remove(key))
                .collect()
        };
        debug!(count = removed.len(), "purged dead subscriptions");
    }
}

impl<V: Clone + Send + Sync + 'static> Notifier<V> {
    /// A clone of the cached value, if this notifier replays.
    pub fn cached(&self) -> Option<V> {
        self.state.lock().cached.clone()
    }

    /// Register a subscription.
    ///
    /// - `subscriber` bounds the subscription's lifetime; it is never upgraded
    ///   except to deliver.
    /// - `options` carries the optional filter and queue.
    /// - `projector` maps the raw value to what the callback receives;
    ///   returning `None` skips that value.
    /// - `callback` receives the resolved subscriber and the projected value.
    ///
    /// On a replaying notifier the new subscription is offered the cached value
    /// once before this returns, through the same filter/projector/queue path
    /// as any later send.
    pub fn subscribe<O, T>(
        &self,
        subscriber: Weak<O>,
        options: ObserveOptions<V>,
        projector: impl Fn(&V) -> Option<T> + Send + Sync + 'static,
        callback: impl Fn(Arc<O>, T) + Send + Sync + 'static,
    ) where
        O: ?Sized + Send + Sync + 'static,
        T: Clone + Send + 'static,
    {
        self.register(subscriber, options, Box::new(projector), Arc::new(callback));
    }

    pub(crate) fn register<O, T>(
        &self,
        subscriber: Weak<O>,
        options: ObserveOptions<V>,
        stage: Box<dyn Stage<V, T>>,
        callback: Arc<dyn Fn(Arc<O>, T) + Send + Sync>,
    ) where
        O: ?Sized + Send + Sync + 'static,
        T: Clone + Send + 'static,
    {
        let entry: Entry<V> = Arc::new(Subscription::new(
            subscriber,
            options.filter,
            options.queue,
            stage,
            callback,
        ));

        let (key, replay) = {
            let mut state = self.state.lock();
            let key = state.allocate_key();
            state.registry.insert(key, Arc::clone(&entry));
            (key, state.cached.clone())
        };
        debug!(key = %key, replay = replay.is_some(), "subscribed");

        if let Some(value) = replay {
            let outcome = entry.deliver(&value);
            trace!(key = %key, ?outcome, "replayed");
            if outcome == Delivery::Dead {
                self.purge(&[key]);
            }
        }
    }

    /// Offer `value` to every subscription.
    ///
    /// Each live subscription receives at most one delivery per call. The order
    /// in which subscriptions are visited is unspecified. Queued deliveries are
    /// handed off and not awaited.
    pub fn send(&self, value: V) {
        let snapshot: Vec<(SubscriptionKey, Entry<V>)> = {
            let mut state = self.state.lock();
            if let Some(cached) = state.cached.as_mut() {
                *cached = value.clone();
            }
            state
                .registry
                .iter()
                .map(|(key, entry)| (*key, Arc::clone(entry)))
                .collect()
        };
        trace!(subscriptions = snapshot.len(), "send");

        let mut dead = Vec::new();
        for (key, entry) in &snapshot {
            let outcome = entry.deliver(&value);
            trace!(key = %key, ?outcome, "delivery");
            if outcome == Delivery::Dead {
                dead.push(*key);
            }
        }
        if !dead.is_empty() {
            self.purge(&dead);
        }
    }
}

impl<V> Default for Notifier<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> fmt::Debug for Notifier<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.lock();
        f.debug_struct("Notifier")
            .field("subscriptions", &state.registry.len())
            .field("replays", &state.cached.is_some())
            .finish()
    }
}

// ===========================================================================
// Tests
// ===========================================================================
