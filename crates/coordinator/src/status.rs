use tokio::sync::watch;

/// Health snapshot published for RPC/ops surfaces to watch.
#[derive(Clone, Debug, Default)]
pub struct CoordinatorStatus {
    pub events_received: u64,
    pub events_processed: u64,
    pub events_failed: u64,
    pub last_subject: Option<String>,
}

/// Watch-channel wrapper so any number of observers can follow the
/// coordinator's health without touching the dispatcher.
#[derive(Clone)]
pub struct StatusChannel {
    tx: watch::Sender<CoordinatorStatus>,
}

impl StatusChannel {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(CoordinatorStatus::default());
        Self { tx }
    }

    pub fn subscribe(&self) -> watch::Receiver<CoordinatorStatus> {
        self.tx.subscribe()
    }

    pub fn modify(&self, f: impl FnOnce(&mut CoordinatorStatus)) {
        self.tx.send_modify(f);
    }

    pub fn current(&self) -> CoordinatorStatus {
        self.tx.borrow().clone()
    }
}

impl Default for StatusChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_modify_visible_to_subscribers() {
        let chan = StatusChannel::new();
        let rx = chan.subscribe();

        chan.modify(|s| {
            s.events_received += 1;
            s.last_subject = Some("zkpay.bsc.Treasury.DepositReceived".to_owned());
        });

        assert_eq!(rx.borrow().events_received, 1);
        assert_eq!(chan.current().last_subject.as_deref(),
            Some("zkpay.bsc.Treasury.DepositReceived"));
    }
}
