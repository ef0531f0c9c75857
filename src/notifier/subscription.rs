//! Subscription internals: keys, the type-erased delivery path, and outcomes.
//!
//! A [`Subscription`] binds one weakly-held subscriber to a filter, a
//! projector, an optional scheduler and a callback. The registry stores it as
//! `Arc<dyn Deliver<V>>`, which erases the subscriber and projected types.

use std::fmt;
use std::sync::{Arc, Weak};

use tracing::warn;

use crate::queue::Scheduler;

/// Predicate over the raw value, evaluated before projection.
pub type Filter<V> = Arc<dyn Fn(&V) -> bool + Send + Sync>;

/// Maps a raw value to what the callback receives.
pub(crate) trait Stage<V, T>: Send + Sync {
    /// The part to deliver, or `None` to skip this value.
    fn project(&self, value: &V) -> Option<T>;

    /// Whether [`retract`](Stage::retract) does anything. Rejected parts are
    /// only kept around for stages that want them back.
    fn retracts(&self) -> bool {
        false
    }

    /// `part`, returned by the last `project`, was never delivered.
    fn retract(&self, _part: &T) {}
}

impl<V, T, F> Stage<V, T> for F
where
    F: Fn(&V) -> Option<T> + Send + Sync,
{
    fn project(&self, value: &V) -> Option<T> {
        self(value)
    }
}

// ---------------------------------------------------------------------------
// SubscriptionKey
// ---------------------------------------------------------------------------

/// Registry key for a subscription. Monotonically allocated per notifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionKey(pub(crate) u64);

impl SubscriptionKey {
    /// The raw key value.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Delivery
// ---------------------------------------------------------------------------

/// What happened when a value was offered to one subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    /// Callback ran inline.
    Dispatched,
    /// Callback was handed to the subscription's scheduler.
    Queued,
    /// The scheduler refused the job; nothing ran.
    Rejected,
    /// The filter rejected the raw value.
    Filtered,
    /// The projector produced nothing (e.g. an unchanged part).
    Suppressed,
    /// The subscriber is gone. The caller should deregister.
    Dead,
}

/// Type-erased delivery path stored in the registry.
pub(crate) trait Deliver<V>: Send + Sync {
    /// Offer `value` to this subscription.
    fn deliver(&self, value: &V) -> Delivery;

    /// Whether the subscriber can still be resolved.
    fn is_live(&self) -> bool;
}

// ---------------------------------------------------------------------------
// Subscription
// ---------------------------------------------------------------------------

pub(crate) struct Subscription<V, O: ?Sized, T> {
    subscriber: Weak<O>,
    filter: Option<Filter<V>>,
    queue: Option<Arc<dyn Scheduler>>,
    stage: Box<dyn Stage<V, T>>,
    callback: Arc<dyn Fn(Arc<O>, T) + Send + Sync>,
}

impl<V, O: ?Sized, T> Subscription<V, O, T> {
    pub(crate) fn new(
        subscriber: Weak<O>,
        filter: Option<Filter<V>>,
        queue: Option<Arc<dyn Scheduler>>,
        stage: Box<dyn Stage<V, T>>,
        callback: Arc<dyn Fn(Arc<O>, T) + Send + Sync>,
    ) -> Self {
        Self {
            subscriber,
            filter,
            queue,
            stage,
            callback,
        }
    }
}

impl<V, O, T> Deliver<V> for Subscription<V, O, T>
where
    O: ?Sized + Send + Sync + 'static,
    T: Clone + Send + 'static,
{
    fn deliver(&self, value: &V) -> Delivery {
        let Some(subscriber) = self.subscriber.upgrade() else {
            return Delivery::Dead;
        };
        if let Some(filter) = &self.filter {
            if !filter(value) {
                return Delivery::Filtered;
            }
        }
        let Some(projected) = self.stage.project(value) else {
            return Delivery::Suppressed;
        };

        let Some(queue) = &self.queue else {
            (self.callback)(subscriber, projected);
            return Delivery::Dispatched;
        };

        // The job owns a strong reference: a subscriber alive at enqueue time
        // is delivered to even if it is dropped before the job runs.
        let kept = self.stage.retracts().then(|| projected.clone());
        let callback = Arc::clone(&self.callback);
        match queue.schedule(Box::new(move || callback(subscriber, projected))) {
            Ok(()) => Delivery::Queued,
            Err(err) => {
                warn!(error = %err, "scheduler rejected delivery");
                if let Some(part) = kept {
                    self.stage.retract(&part);
                }
                Delivery::Rejected
            }
        }
    }

    fn is_live(&self) -> bool {
        self.subscriber.strong_count() > 0
    }
}

// ===========================================================================
// Tests
// ===========================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::Job;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;
    use tokio::sync::mpsc;

    type Callback<O, T> = Arc<dyn Fn(Arc<O>, T) + Send + Sync>;
    type Projector<V, T> = Box<dyn Stage<V, T>>;

    struct Owner;

    fn recording<T: Send + 'static>() -> (Arc<Mutex<Vec<T>>>, Callback<Owner, T>) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_c = Arc::clone(&log);
        let callback: Callback<Owner, T> =
            Arc::new(move |_: Arc<Owner>, v: T| log_c.lock().push(v));
        (log, callback)
    }

    fn identity() -> Projector<i32, i32> {
        Box::new(|v: &i32| Some(*v))
    }

    // ── Keys ─────────────────────────────────────────────────────────

    #[test]
    fn key_display_and_value() {
        let key = SubscriptionKey(41);
        assert_eq!(key.get(), 41);
        assert_eq!(key.to_string(), "#41");
    }

    // ── Delivery outcomes ────────────────────────────────────────────

    #[test]
    fn inline_delivery_runs_callback() {
        let owner = Arc::new(Owner);
        let (log, callback) = recording();
        let sub = Subscription::new(Arc::downgrade(&owner), None, None, identity(), callback);

        assert_eq!(sub.deliver(&3), Delivery::Dispatched);
        assert_eq!(*log.lock(), vec![3]);
        assert!(sub.is_live());
    }

    #[test]
    fn dead_subscriber_reports_dead() {
        let owner = Arc::new(Owner);
        let (log, callback) = recording();
        let sub = Subscription::new(Arc::downgrade(&owner), None, None, identity(), callback);
        drop(owner);

        assert!(!sub.is_live());
        assert_eq!(sub.deliver(&3), Delivery::Dead);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn empty_weak_is_dead() {
        let (_, callback) = recording::<i32>();
        let sub = Subscription::new(Weak::<Owner>::new(), None, None, identity(), callback);
        assert_eq!(sub.deliver(&1), Delivery::Dead);
    }

    #[test]
    fn filter_runs_before_projection() {
        let owner = Arc::new(Owner);
        let (log, callback) = recording();
        let projected = Arc::new(Mutex::new(0));
        let projected_c = Arc::clone(&projected);
        let projector: Projector<i32, i32> = Box::new(move |v: &i32| {
            *projected_c.lock() += 1;
            Some(*v)
        });
        let filter: Filter<i32> = Arc::new(|v: &i32| v % 2 == 0);
        let sub = Subscription::new(
            Arc::downgrade(&owner),
            Some(filter),
            None,
            projector,
            callback,
        );

        assert_eq!(sub.deliver(&3), Delivery::Filtered);
        assert_eq!(*projected.lock(), 0);
        assert_eq!(sub.deliver(&4), Delivery::Dispatched);
        assert_eq!(*projected.lock(), 1);
        assert_eq!(*log.lock(), vec![4]);
    }

    #[test]
    fn empty_projection_suppresses() {
        let owner = Arc::new(Owner);
        let (log, callback) = recording::<i32>();
        let sub = Subscription::new(
            Arc::downgrade(&owner),
            None,
            None,
            Box::new(|_: &i32| None::<i32>),
            callback,
        );
        assert_eq!(sub.deliver(&1), Delivery::Suppressed);
        assert!(log.lock().is_empty());
    }

    // ── Queued delivery ──────────────────────────────────────────────

    #[test]
    fn queued_delivery_defers_callback() {
        let owner = Arc::new(Owner);
        let (log, callback) = recording();
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let sub = Subscription::new(
            Arc::downgrade(&owner),
            None,
            Some(Arc::new(tx) as Arc<dyn Scheduler>),
            identity(),
            callback,
        );

        assert_eq!(sub.deliver(&5), Delivery::Queued);
        assert!(log.lock().is_empty());

        rx.try_recv().expect("job queued")();
        assert_eq!(*log.lock(), vec![5]);
    }

    #[test]
    fn queued_job_keeps_subscriber_alive() {
        let owner = Arc::new(Owner);
        let weak = Arc::downgrade(&owner);
        let (log, callback) = recording();
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let sub = Subscription::new(
            weak.clone(),
            None,
            Some(Arc::new(tx) as Arc<dyn Scheduler>),
            identity(),
            callback,
        );

        assert_eq!(sub.deliver(&12), Delivery::Queued);
        drop(owner);
        // The pending job still holds the subscriber.
        assert!(weak.upgrade().is_some());

        rx.try_recv().expect("job queued")();
        assert_eq!(*log.lock(), vec![12]);
        assert!(weak.upgrade().is_none());
        assert_eq!(sub.deliver(&13), Delivery::Dead);
    }

    #[test]
    fn rejected_job_reports_rejected() {
        let owner = Arc::new(Owner);
        let (log, callback) = recording();
        let (tx, rx) = mpsc::unbounded_channel::<Job>();
        drop(rx);
        let sub = Subscription::new(
            Arc::downgrade(&owner),
            None,
            Some(Arc::new(tx) as Arc<dyn Scheduler>),
            identity(),
            callback,
        );
        assert_eq!(sub.deliver(&1), Delivery::Rejected);
        assert!(log.lock().is_empty());
    }
}
