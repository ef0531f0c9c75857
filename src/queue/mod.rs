//! Scheduling seam for queued delivery.
//!
//! A subscription with a queue hands each delivery to a [`Scheduler`] instead of
//! running the callback on the sending thread. The notifier only ever calls
//! [`Scheduler::schedule`]; it never waits for the job to finish.
//!
//! Provided schedulers:
//!
//! - [`SerialQueue`] — a named FIFO queue with one dedicated worker thread.
//! - [`tokio::runtime::Handle`] — each job becomes a task on that runtime.
//! - [`tokio::sync::mpsc::UnboundedSender<Job>`] — jobs are handed to whoever
//!   drains the receiver.

pub mod serial;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc::UnboundedSender;

use crate::error::{Error, Result};

pub use serial::{current_label, QueueConfig, SerialQueue};

/// A unit of deferred work.
pub type Job = Box<dyn FnOnce() + Send + 'static>;

// ---------------------------------------------------------------------------
// Scheduler
// ---------------------------------------------------------------------------

/// Something that can run a [`Job`] later, somewhere else.
///
/// Implementations must not run the job inline; callers rely on `schedule`
/// returning without invoking user code.
pub trait Scheduler: Send + Sync {
    /// Enqueue `job`. An `Err` means the job was dropped without running.
    ///
    /// `Ok` means the job was accepted. A tokio runtime that starts shutting
    /// down after accepting a job may still drop it unrun.
    fn schedule(&self, job: Job) -> Result<()>;
}

impl<S: Scheduler + ?Sized> Scheduler for Arc<S> {
    fn schedule(&self, job: Job) -> Result<()> {
        (**self).schedule(job)
    }
}

/// Each job becomes a detached task.
///
/// A runtime that has already shut down cancels new tasks before polling them;
/// that is reported as [`Error::RuntimeShutdown`].
impl Scheduler for Handle {
    fn schedule(&self, job: Job) -> Result<()> {
        let started = Arc::new(AtomicBool::new(false));
        let started_c = Arc::clone(&started);
        let task = self.spawn(async move {
            started_c.store(true, Ordering::Release);
            job();
        });
        if task.is_finished() && !started.load(Ordering::Acquire) {
            return Err(Error::RuntimeShutdown);
        }
        Ok(())
    }
}

impl Scheduler for UnboundedSender<Job> {
    fn schedule(&self, job: Job) -> Result<()> {
        self.send(job).map_err(|_| Error::Disconnected)
    }
}

// ===========================================================================
// Tests
// ===========================================================================
