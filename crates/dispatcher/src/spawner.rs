//! Execution context for delayed flushes
//!
//! The dispatcher never looks up a runtime on its own: whoever builds it
//! hands over a `Spawner`.

use std::future::Future;
use std::pin::Pin;

use tokio::runtime::Handle;
use tokio::task::AbortHandle;

use crate::error::DispatcherError;

/// A boxed flush task
pub type BoxedTask = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// Runs flush tasks in the background
pub trait Spawner: Send + Sync {
    /// Start `task`. The returned handle is used to cancel a flush that has
    /// not started delivering yet.
    ///
    /// # Errors
    /// `DispatcherError::Scheduling` when no execution context is available.
    fn spawn(&self, task: BoxedTask) -> Result<AbortHandle, DispatcherError>;
}

/// Spawner backed by an explicit tokio runtime handle
#[derive(Debug, Clone)]
pub struct TokioSpawner {
    handle: Handle,
}

impl TokioSpawner {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Capture the handle of the runtime the caller is running on
    ///
    /// # Errors
    /// Fails outside of a tokio runtime.
    pub fn current() -> Result<Self, DispatcherError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| DispatcherError::scheduling(e.to_string()))
    }
}

impl Spawner for TokioSpawner {
    fn spawn(&self, task: BoxedTask) -> Result<AbortHandle, DispatcherError> {
        let handle = self.handle.spawn(task).abort_handle();
        // A runtime that has shut down cancels new tasks immediately.
        if handle.is_finished() {
            return Err(DispatcherError::scheduling("runtime is shut down"));
        }
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_current_outside_runtime() {
        let result = TokioSpawner::current();
        assert!(matches!(result, Err(DispatcherError::Scheduling { .. })));
    }

    #[tokio::test]
    async fn test_spawn_runs_task() {
        let spawner = TokioSpawner::current().unwrap();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);
        let (tx, rx) = tokio::sync::oneshot::channel();

        spawner
            .spawn(Box::pin(async move {
                flag.store(true, Ordering::SeqCst);
                let _ = tx.send(());
            }))
            .unwrap();

        rx.await.unwrap();
        assert!(ran.load(Ordering::SeqCst));
    }

    #[test]
    fn test_spawn_on_dropped_runtime_fails() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let spawner = TokioSpawner::new(runtime.handle().clone());
        drop(runtime);

        let result = spawner.spawn(Box::pin(async {}));
        assert!(matches!(result, Err(DispatcherError::Scheduling { .. })));
    }

    #[tokio::test]
    async fn test_abort_handle_cancels_pending_task() {
        let spawner = TokioSpawner::current().unwrap();
        let ran = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&ran);

        let handle = spawner
            .spawn(Box::pin(async move {
                tokio::time::sleep(std::time::Duration::from_secs(60)).await;
                flag.store(true, Ordering::SeqCst);
            }))
            .unwrap();
        handle.abort();
        tokio::task::yield_now().await;

        assert!(!ran.load(Ordering::SeqCst));
    }
}
