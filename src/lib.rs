//! # ufos
//!
//! Observable values and event broadcasters whose subscriptions are bound to
//! the lifetime of a subscriber object, with inline or queued delivery.
//!
//! A subscription holds only a weak reference to its subscriber. Once the
//! subscriber is dropped the subscription stops firing and is removed the next
//! time the notifier visits it. Nothing needs to be unsubscribed by hand.
//!
//! ## Core Systems
//!
//! - **[`notifier`]** — Subscription registry, replay cache, dispatch
//! - **[`lens`]** — Key paths and change lenses for observing parts of a value
//! - **[`broadcast`]** — [`Broadcaster`]: stateless event stream
//! - **[`cell`]** — [`Cell`]: value container that replays and re-sends on write
//! - **[`queue`]** — [`Scheduler`] seam, [`SerialQueue`], tokio handles
//! - **[`error`]** — Scheduling errors
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use ufos::{Cell, Observe};
//!
//! struct Label;
//!
//! let mut count = Cell::new(5);
//! let label = Arc::new(Label);
//! count.observe(&label, |_label, n| println!("count = {n}")); // prints 5
//! count.set(6);                                              // prints 6
//! drop(label);
//! count.set(7);                                              // prints nothing
//! ```

// Engine
pub mod error;
pub mod lens;
pub mod notifier;
pub mod queue;

// Façades
pub mod broadcast;
pub mod cell;

pub use broadcast::Broadcaster;
pub use cell::Cell;
pub use error::{Error, Result};
pub use lens::{ChangeLens, KeyPath};
pub use notifier::{Anchor, Filter, Notifier, Observe, ObserveOptions, Signal, SubscriptionKey};
pub use queue::{Job, QueueConfig, Scheduler, SerialQueue};

// Proc macros (feature-gated)
#[cfg(feature = "macros")]
pub use ufos_macros::KeyPaths;
