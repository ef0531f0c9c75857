//! Cell: an observable value container.
//!
//! A [`Cell<V>`] owns a value and a replaying notifier. Every write sends the
//! new value, even when it equals the old one, and every new subscriber is
//! first handed the current value.
//!
//! Writes take `&mut self`, so the value cannot change without a send. Reads
//! and writes touch the value directly; only the send goes through the
//! notifier's lock. To share a cell across threads, wrap it in your own lock
//! and hand out [`Cell::signal`] to observers.

use std::fmt;
use std::mem;
use std::ops::Deref;

use crate::notifier::observe::Source;
use crate::notifier::{Notifier, Observe, Signal};

/// Observable value with replay.
pub struct Cell<V> {
    value: V,
    notifier: Notifier<V>,
}

impl<V: Clone + Send + Sync + 'static> Cell<V> {
    /// Wrap `value`.
    pub fn new(value: V) -> Self {
        Self {
            notifier: Notifier::replaying(value.clone()),
            value,
        }
    }

    /// Borrow the current value.
    pub fn get(&self) -> &V {
        &self.value
    }

    /// Overwrite the value and send it.
    pub fn set(&mut self, value: V) {
        self.value = value;
        self.publish();
    }

    /// Mutate the value in place and send the result.
    pub fn update<R>(&mut self, f: impl FnOnce(&mut V) -> R) -> R {
        let out = f(&mut self.value);
        self.publish();
        out
    }

    /// Overwrite the value, send it, and return the previous one.
    pub fn replace(&mut self, value: V) -> V {
        let old = mem::replace(&mut self.value, value);
        self.publish();
        old
    }

    /// An observe-only handle that outlives borrows of the cell.
    pub fn signal(&self) -> Signal<V> {
        Signal::new(self.notifier.clone())
    }

    /// Number of registry entries, including dead ones not yet purged.
    pub fn subscription_count(&self) -> usize {
        self.notifier.subscription_count()
    }

    /// Consume the cell and return the value.
    pub fn into_inner(self) -> V {
        self.value
    }

    fn publish(&self) {
        self.notifier.send(self.value.clone());
    }
}

impl<V> Deref for Cell<V> {
    type Target = V;

    fn deref(&self) -> &V {
        &self.value
    }
}

impl<V: Clone + Send + Sync + Default + 'static> Default for Cell<V> {
    fn default() -> Self {
        Self::new(V::default())
    }
}

impl<V: Clone + Send + Sync + 'static> From<V> for Cell<V> {
    fn from(value: V) -> Self {
        Self::new(value)
    }
}

impl<V: fmt::Debug> fmt::Debug for Cell<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("value", &self.value)
            .field("subscriptions", &self.notifier.subscription_count())
            .finish()
    }
}

impl<V> Source<V> for Cell<V> {
    fn notifier(&self) -> &Notifier<V> {
        &self.notifier
    }
}

impl<V: Clone + Send + Sync + 'static> Observe<V> for Cell<V> {}

// ===========================================================================
// Tests
// ===========================================================================
