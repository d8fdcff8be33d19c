//! Runtime abstraction for blocking filesystem work
//!
//! Scanning, opening and copying all touch the disk synchronously. `IoPool`
//! moves that work onto tokio's blocking thread pool so the async callers
//! only suspend, never block their executor thread.

use std::future::Future;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;

use crate::LoadError;

/// Handle to the worker pool used for filesystem work
#[derive(Debug, Clone, Default)]
pub struct IoPool {
    /// `None` means the runtime the caller is running on
    handle: Option<Handle>,
}

impl IoPool {
    /// Pool of whichever tokio runtime polls the calling future
    pub fn ambient() -> Self {
        Self { handle: None }
    }

    /// Pool of an explicit runtime, for callers living outside tokio
    pub fn from_handle(handle: Handle) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    /// Runs `work` on a blocking worker and waits for it.
    ///
    /// A panic or cancellation inside the worker comes back as
    /// [`LoadError::Worker`].
    pub async fn run<F, R>(&self, work: F) -> Result<R, LoadError>
    where
        F: FnOnce() -> Result<R, LoadError> + Send + 'static,
        R: Send + 'static,
    {
        let task = match &self.handle {
            Some(handle) => handle.spawn_blocking(work),
            None => tokio::task::spawn_blocking(work),
        };

        match task.await {
            Ok(result) => result,
            Err(e) => {
                log::error!("blocking worker failed: {}", e);
                Err(LoadError::Worker(e.to_string()))
            }
        }
    }

    /// Spawns an async task on the pool's runtime
    pub fn spawn<F>(&self, future: F) -> JoinHandle<F::Output>
    where
        F: Future + Send + 'static,
        F::Output: Send + 'static,
    {
        match &self.handle {
            Some(handle) => handle.spawn(future),
            None => tokio::spawn(future),
        }
    }
}
