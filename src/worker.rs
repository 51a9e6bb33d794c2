//! Background task pool owned by the sync engine.
//!
//! Sync operations run to completion on their own tokio tasks; there is no
//! mid-operation cancellation. Teardown is explicit: [`WorkerPool::shutdown`]
//! (also invoked on drop) aborts whatever is still in flight, so the pool's
//! lifetime bounds the engine's background work.

use std::future::Future;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

#[derive(Default)]
pub(crate) struct WorkerPool {
    handles: Mutex<Vec<JoinHandle<()>>>,
}

impl WorkerPool {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Spawn a sync task on the ambient tokio runtime.
    ///
    /// Must be called from within a runtime context. Finished handles are
    /// pruned on each spawn so the pool does not grow with engine lifetime.
    pub(crate) fn spawn<F>(&self, future: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut handles = self.handles.lock();
        handles.retain(|handle| !handle.is_finished());
        handles.push(tokio::spawn(future));
    }

    /// Abort all outstanding tasks.
    pub(crate) fn shutdown(&self) {
        for handle in self.handles.lock().drain(..) {
            handle.abort();
        }
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}
