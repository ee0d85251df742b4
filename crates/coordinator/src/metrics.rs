use std::{
    collections::BTreeMap,
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use zkpay_chain_events::EventKind;

#[derive(Default)]
struct KindCounters {
    received: AtomicU64,
    processed: AtomicU64,
    failed: AtomicU64,
    process_error: AtomicU64,
    total_duration_us: AtomicU64,
}

/// Per-event-type dispatch counters.  Plain atomics; scraped into the
/// status channel rather than exported directly.
pub struct DispatchMetrics {
    counters: [KindCounters; EventKind::ALL.len()],
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct KindSnapshot {
    pub received: u64,
    pub processed: u64,
    pub failed: u64,
    pub process_error: u64,
    pub total_duration_us: u64,
}

impl DispatchMetrics {
    pub fn new() -> Self {
        Self {
            counters: Default::default(),
        }
    }

    fn of(&self, kind: EventKind) -> &KindCounters {
        let idx = EventKind::ALL
            .iter()
            .position(|k| *k == kind)
            .expect("kind present in ALL");
        &self.counters[idx]
    }

    pub fn inc_received(&self, kind: EventKind) {
        self.of(kind).received.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_processed(&self, kind: EventKind) {
        self.of(kind).processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_failed(&self, kind: EventKind) {
        self.of(kind).failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_process_error(&self, kind: EventKind) {
        self.of(kind).process_error.fetch_add(1, Ordering::Relaxed);
    }

    pub fn observe_duration(&self, kind: EventKind, duration: Duration) {
        self.of(kind)
            .total_duration_us
            .fetch_add(duration.as_micros() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> BTreeMap<EventKind, KindSnapshot> {
        EventKind::ALL
            .into_iter()
            .map(|kind| {
                let c = self.of(kind);
                (
                    kind,
                    KindSnapshot {
                        received: c.received.load(Ordering::Relaxed),
                        processed: c.processed.load(Ordering::Relaxed),
                        failed: c.failed.load(Ordering::Relaxed),
                        process_error: c.process_error.load(Ordering::Relaxed),
                        total_duration_us: c.total_duration_us.load(Ordering::Relaxed),
                    },
                )
            })
            .collect()
    }
}

impl Default for DispatchMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_accumulate() {
        let m = DispatchMetrics::new();
        m.inc_received(EventKind::DepositReceived);
        m.inc_received(EventKind::DepositReceived);
        m.inc_processed(EventKind::DepositReceived);
        m.inc_failed(EventKind::PayoutFailed);
        m.inc_process_error(EventKind::WithdrawExecuted);

        let snap = m.snapshot();
        assert_eq!(snap[&EventKind::DepositReceived].received, 2);
        assert_eq!(snap[&EventKind::DepositReceived].processed, 1);
        assert_eq!(snap[&EventKind::PayoutFailed].failed, 1);
        assert_eq!(snap[&EventKind::WithdrawExecuted].process_error, 1);
        assert_eq!(snap[&EventKind::HookFailed].received, 0);
    }
}
