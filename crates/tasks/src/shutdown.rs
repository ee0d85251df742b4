use tokio::sync::watch;

/// Sender half used to initiate a process-wide shutdown.
#[derive(Clone)]
pub struct ShutdownSignal(watch::Sender<bool>);

impl ShutdownSignal {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self(tx)
    }

    pub fn send(&self) {
        let _ = self.0.send(true);
    }

    pub fn subscribe(&self) -> ShutdownGuard {
        ShutdownGuard(self.0.subscribe())
    }
}

impl Default for ShutdownSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver handed to every worker; checked at stage boundaries for
/// responsive shutdown.
#[derive(Clone)]
pub struct ShutdownGuard(watch::Receiver<bool>);

impl ShutdownGuard {
    pub fn should_shutdown(&self) -> bool {
        *self.0.borrow()
    }

    /// Suspends until shutdown is signalled.
    pub async fn wait_for_shutdown(&mut self) {
        while !*self.0.borrow_and_update() {
            if self.0.changed().await.is_err() {
                // Sender gone means the manager is gone; treat as shutdown.
                return;
            }
        }
    }
}
