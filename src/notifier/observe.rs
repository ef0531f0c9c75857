//! Observation API shared by every notifier façade.
//!
//! [`Observe`] is implemented by [`Notifier`], [`Signal`],
//! [`Broadcaster`](crate::Broadcaster) and [`Cell`](crate::Cell). It only
//! registers subscriptions; sending stays with the owning type.
//!
//! The first argument of every callback is the subscriber itself, resolved
//! from the weak reference taken at subscribe time:
//!
//! ```
//! use std::sync::Arc;
//! use ufos::{Broadcaster, Observe};
//!
//! struct Screen;
//!
//! let resized = Broadcaster::<(u16, u16)>::new();
//! let screen = Arc::new(Screen);
//! resized.observe(&screen, |_screen, (w, h)| println!("{w}x{h}"));
//! resized.send((80, 24));
//! ```

use std::fmt;
use std::sync::{Arc, Weak};

use super::{Notifier, ObserveOptions};
use crate::lens::{ChangeLens, KeyPath};

// ---------------------------------------------------------------------------
// Anchor
// ---------------------------------------------------------------------------

/// An object whose lifetime bounds a subscription.
///
/// Implemented for `Arc<O>`, `Weak<O>` and `Option` of either. `None` and a
/// dangling `Weak` produce a subscription that never fires. `O` may be a trait
/// object, as in `Arc<dyn View>`, except behind `Option`.
pub trait Anchor {
    /// The subscriber type handed back to callbacks.
    type Target: ?Sized + Send + Sync + 'static;

    /// A non-owning reference to the subscriber.
    fn anchor(&self) -> Weak<Self::Target>;
}

impl<O: ?Sized + Send + Sync + 'static> Anchor for Arc<O> {
    type Target = O;

    fn anchor(&self) -> Weak<O> {
        Arc::downgrade(self)
    }
}

impl<O: ?Sized + Send + Sync + 'static> Anchor for Weak<O> {
    type Target = O;

    fn anchor(&self) -> Weak<O> {
        self.clone()
    }
}

impl<A> Anchor for Option<A>
where
    A: Anchor,
    A::Target: Sized,
{
    type Target = A::Target;

    fn anchor(&self) -> Weak<A::Target> {
        match self {
            Some(anchor) => anchor.anchor(),
            None => Weak::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Observe
// ---------------------------------------------------------------------------

mod sealed {
    use crate::notifier::Notifier;

    pub trait Source<V> {
        fn notifier(&self) -> &Notifier<V>;
    }
}

pub(crate) use sealed::Source;

/// Subscription methods available on every observable source.
pub trait Observe<V>: sealed::Source<V>
where
    V: Clone + Send + Sync + 'static,
{
    /// Call `callback` with every value, inline on the sending thread.
    fn observe<A, F>(&self, with: &A, callback: F)
    where
        A: Anchor,
        F: Fn(Arc<A::Target>, V) + Send + Sync + 'static,
    {
        self.observe_with(with, ObserveOptions::new(), callback);
    }

    /// Call `callback` with every value accepted by `options.filter`, on
    /// `options.queue` if set.
    fn observe_with<A, F>(&self, with: &A, options: ObserveOptions<V>, callback: F)
    where
        A: Anchor,
        F: Fn(Arc<A::Target>, V) + Send + Sync + 'static,
    {
        self.notifier()
            .subscribe(with.anchor(), options, |value: &V| Some(value.clone()), callback);
    }

    /// Call `callback` whenever the part of the value at `key` changes.
    ///
    /// The first value seen is always delivered; after that, a part equal to
    /// the previously delivered part is skipped.
    fn observe_key<A, T, F>(&self, key: KeyPath<V, T>, with: &A, callback: F)
    where
        A: Anchor,
        T: Clone + PartialEq + Send + 'static,
        F: Fn(Arc<A::Target>, T) + Send + Sync + 'static,
    {
        self.observe_key_with(key, with, ObserveOptions::new(), callback);
    }

    /// [`observe_key`](Observe::observe_key) with a filter and/or queue.
    ///
    /// The filter sees the full value and runs before the key is compared, so
    /// filtered values never become the "previous" part.
    fn observe_key_with<A, T, F>(
        &self,
        key: KeyPath<V, T>,
        with: &A,
        options: ObserveOptions<V>,
        callback: F,
    ) where
        A: Anchor,
        T: Clone + PartialEq + Send + 'static,
        F: Fn(Arc<A::Target>, T) + Send + Sync + 'static,
    {
        self.observe_lens(ChangeLens::from(key), with, options, callback);
    }

    /// Observe through an arbitrary [`ChangeLens`].
    ///
    /// The lens runs before the job is handed to `options.queue`. If the queue
    /// refuses the job, the part is retracted from the lens, so the next equal
    /// part is still delivered.
    fn observe_lens<A, T, F>(
        &self,
        lens: ChangeLens<V, T>,
        with: &A,
        options: ObserveOptions<V>,
        callback: F,
    ) where
        A: Anchor,
        T: Clone + Send + 'static,
        F: Fn(Arc<A::Target>, T) + Send + Sync + 'static,
    {
        self.notifier()
            .register(with.anchor(), options, Box::new(lens), Arc::new(callback));
    }
}

impl<V> Source<V> for Notifier<V> {
    fn notifier(&self) -> &Notifier<V> {
        self
    }
}

impl<V: Clone + Send + Sync + 'static> Observe<V> for Notifier<V> {}

// ---------------------------------------------------------------------------
// Signal
// ---------------------------------------------------------------------------

/// Observe-only handle to a notifier.
///
/// Hand a `Signal` to code that should be able to subscribe but not send.
pub struct Signal<V> {
    notifier: Notifier<V>,
}

impl<V> Signal<V> {
    pub(crate) fn new(notifier: Notifier<V>) -> Self {
        Self { notifier }
    }

    /// Number of registry entries, including dead ones not yet purged.
    pub fn subscription_count(&self) -> usize {
        self.notifier.subscription_count()
    }
}

impl<V> Clone for Signal<V> {
    fn clone(&self) -> Self {
        Self {
            notifier: self.notifier.clone(),
        }
    }
}

impl<V> fmt::Debug for Signal<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Signal").field(&self.notifier).finish()
    }
}

impl<V> Source<V> for Signal<V> {
    fn notifier(&self) -> &Notifier<V> {
        &self.notifier
    }
}

impl<V: Clone + Send + Sync + 'static> Observe<V> for Signal<V> {}

// ===========================================================================
// Tests
// ===========================================================================
