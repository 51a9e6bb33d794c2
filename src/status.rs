//! Live status propagation for sync operations.
//!
//! Every status-reporting sync operation hands the caller a [`StatusStream`]
//! that starts at `Running` and resolves to exactly one terminal value,
//! either `Done` with the operation's payload or `Failed` with a
//! human-readable message. Streams are cheap to clone; any number of
//! observers can watch the same operation without blocking the producer.

use tokio::sync::watch;

/// State of an asynchronous sync operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncStatus<T> {
    /// The operation has started and not yet finished.
    Running,
    /// Terminal: the operation finished with a payload.
    Done(T),
    /// Terminal: the operation failed with a human-readable message.
    Failed(String),
}

impl<T> SyncStatus<T> {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SyncStatus::Running)
    }

    /// The error message, when this is a failed terminal status.
    pub fn error(&self) -> Option<&str> {
        match self {
            SyncStatus::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// The payload, when this is a successful terminal status.
    pub fn into_data(self) -> Option<T> {
        match self {
            SyncStatus::Done(data) => Some(data),
            _ => None,
        }
    }
}

/// Create a status channel starting in the `Running` state.
pub(crate) fn channel<T>() -> (StatusSender<T>, StatusStream<T>) {
    let (tx, rx) = watch::channel(SyncStatus::Running);
    (StatusSender { tx }, StatusStream { rx })
}

/// Producer half of a status channel. Consuming `self` on the terminal
/// sends makes a second terminal value unrepresentable.
pub(crate) struct StatusSender<T> {
    tx: watch::Sender<SyncStatus<T>>,
}

impl<T> StatusSender<T> {
    pub(crate) fn done(self, data: T) {
        // Send fails only when every observer is gone, which is fine.
        let _ = self.tx.send(SyncStatus::Done(data));
    }

    pub(crate) fn fail(self, message: impl Into<String>) {
        let _ = self.tx.send(SyncStatus::Failed(message.into()));
    }
}

/// Observer half of a status channel.
pub struct StatusStream<T> {
    rx: watch::Receiver<SyncStatus<T>>,
}

// Manual impl: watch receivers clone regardless of `T: Clone`.
impl<T> Clone for StatusStream<T> {
    fn clone(&self) -> Self {
        Self {
            rx: self.rx.clone(),
        }
    }
}

impl<T: Clone> StatusStream<T> {
    /// The most recently published status.
    pub fn current(&self) -> SyncStatus<T> {
        self.rx.borrow().clone()
    }

    /// Wait for the terminal status.
    ///
    /// If the producing task is torn down before publishing a terminal value
    /// (engine shutdown), this resolves with the last observed status
    /// instead of waiting forever.
    pub async fn terminal(mut self) -> SyncStatus<T> {
        loop {
            {
                let current = self.rx.borrow();
                if current.is_terminal() {
                    return current.clone();
                }
            }
            if self.rx.changed().await.is_err() {
                return self.rx.borrow().clone();
            }
        }
    }
}
