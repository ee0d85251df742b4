use std::fmt;

use serde::{Deserialize, Serialize};

use crate::subject::SubjectPattern;

/// Every event type the dispatcher subscribes to.
///
/// `Treasury.WithdrawExecuted` and `IntentManager.WithdrawExecuted` share an
/// event name and are distinguished by contract, which is why the kind is
/// keyed on both.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    DepositReceived,
    DepositRecorded,
    DepositUsed,
    CommitmentRootUpdated,
    WithdrawRequested,
    WithdrawExecuted,
    IntentWithdrawExecuted,
    PayoutExecuted,
    PayoutFailed,
    HookExecuted,
    HookFailed,
    FallbackTransferred,
    FallbackFailed,
    PayoutRetryRecordCreated,
    FallbackRetryRecordCreated,
    ManuallyResolved,
}

impl EventKind {
    pub const ALL: [EventKind; 16] = [
        EventKind::DepositReceived,
        EventKind::DepositRecorded,
        EventKind::DepositUsed,
        EventKind::CommitmentRootUpdated,
        EventKind::WithdrawRequested,
        EventKind::WithdrawExecuted,
        EventKind::IntentWithdrawExecuted,
        EventKind::PayoutExecuted,
        EventKind::PayoutFailed,
        EventKind::HookExecuted,
        EventKind::HookFailed,
        EventKind::FallbackTransferred,
        EventKind::FallbackFailed,
        EventKind::PayoutRetryRecordCreated,
        EventKind::FallbackRetryRecordCreated,
        EventKind::ManuallyResolved,
    ];

    pub const fn contract(&self) -> &'static str {
        match self {
            EventKind::DepositReceived
            | EventKind::WithdrawExecuted
            | EventKind::PayoutExecuted
            | EventKind::PayoutFailed
            | EventKind::PayoutRetryRecordCreated
            | EventKind::FallbackRetryRecordCreated => "Treasury",
            EventKind::DepositRecorded
            | EventKind::DepositUsed
            | EventKind::CommitmentRootUpdated
            | EventKind::WithdrawRequested
            | EventKind::ManuallyResolved => "ZKPayProxy",
            EventKind::IntentWithdrawExecuted
            | EventKind::HookExecuted
            | EventKind::HookFailed
            | EventKind::FallbackTransferred
            | EventKind::FallbackFailed => "IntentManager",
        }
    }

    pub const fn event_name(&self) -> &'static str {
        match self {
            EventKind::DepositReceived => "DepositReceived",
            EventKind::DepositRecorded => "DepositRecorded",
            EventKind::DepositUsed => "DepositUsed",
            EventKind::CommitmentRootUpdated => "CommitmentRootUpdated",
            EventKind::WithdrawRequested => "WithdrawRequested",
            EventKind::WithdrawExecuted | EventKind::IntentWithdrawExecuted => "WithdrawExecuted",
            EventKind::PayoutExecuted => "PayoutExecuted",
            EventKind::PayoutFailed => "PayoutFailed",
            EventKind::HookExecuted => "HookExecuted",
            EventKind::HookFailed => "HookFailed",
            EventKind::FallbackTransferred => "FallbackTransferred",
            EventKind::FallbackFailed => "FallbackFailed",
            EventKind::PayoutRetryRecordCreated => "PayoutRetryRecordCreated",
            EventKind::FallbackRetryRecordCreated => "FallbackRetryRecordCreated",
            EventKind::ManuallyResolved => "ManuallyResolved",
        }
    }

    /// The wildcard subscription pattern for this event type, covering all
    /// chains.
    pub fn subject_pattern(&self) -> SubjectPattern {
        SubjectPattern::for_event(self.contract(), self.event_name())
    }

    /// Resolves a `(contract, event)` pair back to a kind.
    pub fn from_names(contract: &str, event: &str) -> Option<EventKind> {
        EventKind::ALL
            .into_iter()
            .find(|k| k.contract() == contract && k.event_name() == event)
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.contract(), self.event_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_roundtrip() {
        for kind in EventKind::ALL {
            assert_eq!(
                EventKind::from_names(kind.contract(), kind.event_name()),
                Some(kind)
            );
        }
    }

    #[test]
    fn test_withdraw_executed_disambiguation() {
        assert_eq!(
            EventKind::from_names("Treasury", "WithdrawExecuted"),
            Some(EventKind::WithdrawExecuted)
        );
        assert_eq!(
            EventKind::from_names("IntentManager", "WithdrawExecuted"),
            Some(EventKind::IntentWithdrawExecuted)
        );
    }

    #[test]
    fn test_pattern_shape() {
        let p = EventKind::DepositReceived.subject_pattern();
        assert_eq!(p.to_string(), "zkpay.*.Treasury.DepositReceived");
    }
}
