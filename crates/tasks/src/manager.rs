use std::{future::Future, panic, time::Duration};

use futures_util::FutureExt;
use thiserror::Error;
use tokio::{runtime::Handle, sync::mpsc};
use tracing::*;

use crate::shutdown::{ShutdownGuard, ShutdownSignal};

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task {0} exited with error: {1}")]
    Failed(String, anyhow::Error),

    #[error("task {0} panicked: {1}")]
    Panicked(String, String),
}

/// Owns the shutdown channel and the critical-failure channel; the binary
/// drives it from the main thread via [`TaskManager::monitor`].
pub struct TaskManager {
    handle: Handle,
    shutdown: ShutdownSignal,
    err_tx: mpsc::UnboundedSender<TaskError>,
    err_rx: mpsc::UnboundedReceiver<TaskError>,
}

impl TaskManager {
    pub fn new(handle: Handle) -> Self {
        let (err_tx, err_rx) = mpsc::unbounded_channel();
        Self {
            handle,
            shutdown: ShutdownSignal::new(),
            err_tx,
            err_rx,
        }
    }

    pub fn executor(&self) -> TaskExecutor {
        TaskExecutor {
            handle: self.handle.clone(),
            shutdown: self.shutdown.clone(),
            err_tx: self.err_tx.clone(),
        }
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Installs ctrl-c handling that flips the shutdown signal.
    pub fn start_signal_listeners(&self) {
        let shutdown = self.shutdown.clone();
        self.handle.spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!(err = %e, "failed to listen for interrupt");
                return;
            }
            info!("interrupt received, shutting down");
            shutdown.send();
        });
    }

    /// Blocks until a critical task fails or shutdown is signalled, then
    /// gives in-flight tasks `grace` to drain.
    pub fn monitor(mut self, grace: Option<Duration>) -> anyhow::Result<()> {
        let mut guard = self.shutdown.subscribe();

        let res = self.handle.block_on(async {
            tokio::select! {
                maybe_err = self.err_rx.recv() => match maybe_err {
                    Some(e) => Err(e),
                    // All executors gone without error; nothing left to watch.
                    None => Ok(()),
                },
                _ = guard.wait_for_shutdown() => Ok(()),
            }
        });

        self.shutdown.send();
        if let Some(grace) = grace {
            self.handle.block_on(tokio::time::sleep(grace));
        }

        match res {
            Ok(()) => Ok(()),
            Err(e) => {
                error!(err = %e, "critical task failed");
                Err(e.into())
            }
        }
    }
}

/// Handle for spawning tracked tasks; cheap to clone.
#[derive(Clone)]
pub struct TaskExecutor {
    handle: Handle,
    shutdown: ShutdownSignal,
    err_tx: mpsc::UnboundedSender<TaskError>,
}

impl TaskExecutor {
    pub fn handle(&self) -> &Handle {
        &self.handle
    }

    /// Spawns an async critical task.  The future gets a [`ShutdownGuard`];
    /// errors and panics are routed to the manager.
    pub fn spawn_critical_async<F, Fut>(&self, name: &str, f: F)
    where
        F: FnOnce(ShutdownGuard) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        let name = name.to_owned();
        let guard = self.shutdown.subscribe();
        let err_tx = self.err_tx.clone();

        self.handle.spawn(async move {
            let fut = panic::AssertUnwindSafe(f(guard)).catch_unwind();
            match fut.await {
                Ok(Ok(())) => {
                    debug!(task = %name, "task exited cleanly");
                }
                Ok(Err(e)) => {
                    let _ = err_tx.send(TaskError::Failed(name, e));
                }
                Err(payload) => {
                    let _ = err_tx.send(TaskError::Panicked(name, panic_message(payload)));
                }
            }
        });
    }

    /// Spawns a blocking critical task on the runtime's blocking pool.
    pub fn spawn_critical<F>(&self, name: &str, f: F)
    where
        F: FnOnce(ShutdownGuard) -> anyhow::Result<()> + Send + 'static,
    {
        let name = name.to_owned();
        let guard = self.shutdown.subscribe();
        let err_tx = self.err_tx.clone();

        self.handle.spawn_blocking(move || {
            let res = panic::catch_unwind(panic::AssertUnwindSafe(|| f(guard)));
            match res {
                Ok(Ok(())) => {
                    debug!(task = %name, "task exited cleanly");
                }
                Ok(Err(e)) => {
                    let _ = err_tx.send(TaskError::Failed(name, e));
                }
                Err(payload) => {
                    let _ = err_tx.send(TaskError::Panicked(name, panic_message(payload)));
                }
            }
        });
    }
}

fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_monitor_catches_task_error() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        let tm = TaskManager::new(rt.handle().clone());
        let executor = tm.executor();

        executor.spawn_critical_async("boom", |_g| async {
            Err(anyhow::anyhow!("expected failure"))
        });

        let res = tm.monitor(None);
        assert!(res.is_err());
    }

    #[test]
    fn test_monitor_catches_panic() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        let tm = TaskManager::new(rt.handle().clone());
        let executor = tm.executor();

        executor.spawn_critical("panics", |_g| panic!("kaboom"));

        let res = tm.monitor(None);
        let err = res.unwrap_err().to_string();
        assert!(err.contains("kaboom"));
    }

    #[test]
    fn test_shutdown_signal_ends_monitor() {
        let rt = tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .unwrap();
        let tm = TaskManager::new(rt.handle().clone());
        let executor = tm.executor();
        let signal = tm.shutdown_signal();

        executor.spawn_critical_async("worker", |mut g| async move {
            g.wait_for_shutdown().await;
            Ok(())
        });

        signal.send();
        assert!(tm.monitor(Some(Duration::from_millis(10))).is_ok());
    }
}
