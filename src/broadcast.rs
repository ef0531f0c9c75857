//! Broadcaster: a stateless event stream.
//!
//! A [`Broadcaster<V>`] forwards each sent value to its current subscribers
//! and forgets it. New subscribers see only later sends.

use std::fmt;

use crate::notifier::observe::Source;
use crate::notifier::{Notifier, Observe, Signal};

/// Event broadcaster without replay.
///
/// Cloning yields another handle to the same subscriber set.
pub struct Broadcaster<V> {
    notifier: Notifier<V>,
}

impl<V: Clone + Send + Sync + 'static> Broadcaster<V> {
    /// Create a broadcaster with no subscribers.
    pub fn new() -> Self {
        Self {
            notifier: Notifier::new(),
        }
    }

    /// Send `value` to every live subscriber.
    pub fn send(&self, value: V) {
        self.notifier.send(value);
    }

    /// An observe-only handle to this broadcaster.
    pub fn signal(&self) -> Signal<V> {
        Signal::new(self.notifier.clone())
    }

    /// Number of registry entries, including dead ones not yet purged.
    pub fn subscription_count(&self) -> usize {
        self.notifier.subscription_count()
    }

    /// Drop registry entries whose subscribers are gone.
    pub fn sweep(&self) -> usize {
        self.notifier.sweep()
    }
}

impl Broadcaster<()> {
    /// Send the unit event.
    pub fn fire(&self) {
        self.send(());
    }
}

impl<V: Clone + Send + Sync + 'static> Default for Broadcaster<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Clone for Broadcaster<V> {
    fn clone(&self) -> Self {
        Self {
            notifier: self.notifier.clone(),
        }
    }
}

impl<V> fmt::Debug for Broadcaster<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Broadcaster")
            .field("subscriptions", &self.notifier.subscription_count())
            .finish()
    }
}

impl<V> Source<V> for Broadcaster<V> {
    fn notifier(&self) -> &Notifier<V> {
        &self.notifier
    }
}

impl<V: Clone + Send + Sync + 'static> Observe<V> for Broadcaster<V> {}

// ===========================================================================
// Tests
// ===========================================================================
