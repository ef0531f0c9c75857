//! SerialQueue: a named FIFO job queue with one dedicated worker thread.
//!
//! Jobs are fed to the worker through a `tokio::sync::mpsc` unbounded channel
//! and run one at a time, in submission order. The worker exits once the
//! queue is closed, or every `SerialQueue` handle has been dropped, and the
//! channel is drained.

use std::cell::RefCell;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{Job, Scheduler};
use crate::error::{Error, Result};

thread_local! {
    static CURRENT_LABEL: RefCell<Option<Arc<str>>> = const { RefCell::new(None) };
}

/// Label of the [`SerialQueue`] whose worker is running the current thread.
///
/// Returns `None` on any thread that is not a serial queue worker.
pub fn current_label() -> Option<String> {
    CURRENT_LABEL.with(|label| label.borrow().as_deref().map(str::to_owned))
}

// ---------------------------------------------------------------------------
// QueueConfig
// ---------------------------------------------------------------------------

/// Configuration for a [`SerialQueue`].
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Queue label. Also used as the worker thread name.
    pub label: String,
    /// Worker stack size in bytes. `None` uses the platform default.
    pub stack_size: Option<usize>,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            label: "ufos.queue".to_owned(),
            stack_size: None,
        }
    }
}

impl QueueConfig {
    /// Create a config with the given label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    /// Set the label (builder).
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Set the worker stack size (builder).
    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        self.stack_size = Some(bytes);
        self
    }
}

// ---------------------------------------------------------------------------
// SerialQueue
// ---------------------------------------------------------------------------

/// A cloneable handle to a serial job queue.
///
/// All clones feed the same worker. Jobs run strictly one after another; a
/// panicking job is logged and does not stop the worker.
#[derive(Clone)]
pub struct SerialQueue {
    label: Arc<str>,
    tx: mpsc::UnboundedSender<Command>,
    closed: Arc<AtomicBool>,
}

enum Command {
    Run(Job),
    Close,
}

impl SerialQueue {
    /// Start a queue with the given label and default settings.
    pub fn new(label: impl Into<String>) -> Result<Self> {
        Self::with_config(QueueConfig::new(label))
    }

    /// Start a queue from a [`QueueConfig`].
    ///
    /// Fails only if the worker thread cannot be spawned.
    pub fn with_config(config: QueueConfig) -> Result<Self> {
        let (tx, rx) = mpsc::unbounded_channel::<Command>();
        let label: Arc<str> = Arc::from(config.label.as_str());

        let mut builder = thread::Builder::new().name(config.label);
        if let Some(bytes) = config.stack_size {
            builder = builder.stack_size(bytes);
        }

        let worker_label = Arc::clone(&label);
        builder.spawn(move || run_worker(worker_label, rx))?;

        Ok(Self {
            label,
            tx,
            closed: Arc::new(AtomicBool::new(false)),
        })
    }

    /// The queue's label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Stop accepting jobs, for this handle and every clone.
    ///
    /// Jobs accepted before the call still run; the worker then exits. Later
    /// calls to `schedule` fail with [`Error::QueueClosed`]. Closing twice is
    /// a no-op.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        // Wakes the worker; an error means it has already exited.
        let _ = self.tx.send(Command::Close);
    }

    /// Whether the queue has been closed or its worker has exited.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.tx.is_closed()
    }

    fn closed_error(&self) -> Error {
        Error::QueueClosed {
            label: self.label.to_string(),
        }
    }
}

impl Scheduler for SerialQueue {
    fn schedule(&self, job: Job) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(self.closed_error());
        }
        self.tx
            .send(Command::Run(job))
            .map_err(|_| self.closed_error())
    }
}

impl fmt::Debug for SerialQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialQueue")
            .field("label", &&*self.label)
            .field("closed", &self.is_closed())
            .finish()
    }
}

fn run_worker(label: Arc<str>, mut rx: mpsc::UnboundedReceiver<Command>) {
    CURRENT_LABEL.with(|current| *current.borrow_mut() = Some(Arc::clone(&label)));
    debug!(queue = %label, "serial queue started");

    while let Some(command) = rx.blocking_recv() {
        match command {
            Command::Run(job) => {
                if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                    warn!(queue = %label, "queued job panicked");
                }
            }
            // Refuse new sends; anything already buffered is still drained.
            Command::Close => rx.close(),
        }
    }

    debug!(queue = %label, "serial queue stopped");
}

// ===========================================================================
// Tests
// ===========================================================================
