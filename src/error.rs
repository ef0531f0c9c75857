//! Error type for the scheduling seam.
//!
//! The notification path itself is total. Errors only surface when a
//! [`Scheduler`](crate::queue::Scheduler) refuses work or a
//! [`SerialQueue`](crate::queue::SerialQueue) cannot start its worker.

use std::io;

/// Errors from queue construction and job scheduling.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The serial queue's worker has exited and no longer accepts jobs.
    #[error("queue `{label}` is closed")]
    QueueClosed { label: String },

    /// The tokio runtime behind a handle has shut down.
    #[error("tokio runtime is shut down")]
    RuntimeShutdown,

    /// The receiving half of a job channel was dropped.
    #[error("job channel disconnected")]
    Disconnected,

    /// The worker thread for a serial queue could not be spawned.
    #[error("failed to spawn queue worker: {0}")]
    Spawn(#[from] io::Error),
}

/// Result alias for scheduling operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_closed_names_the_queue() {
        let err = Error::QueueClosed {
            label: "com.ufos.first".into(),
        };
        assert_eq!(err.to_string(), "queue `com.ufos.first` is closed");
    }

    #[test]
    fn runtime_shutdown_message() {
        assert_eq!(Error::RuntimeShutdown.to_string(), "tokio runtime is shut down");
    }

    #[test]
    fn spawn_wraps_io_error() {
        let err: Error = io::Error::new(io::ErrorKind::Other, "no threads").into();
        assert!(matches!(err, Error::Spawn(_)));
        assert!(err.to_string().contains("no threads"));
    }
}
