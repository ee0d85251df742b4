use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use zkpay_primitives::{amount::Amount, buf::Buf32};

/// State of a spendable sub-amount within a checkbook.
///
/// `Pending` always carries a `withdraw_request_id` back-pointer; the
/// repository's predicate-scoped updates are what keep two withdraw requests
/// from ever holding the same allocation.
#[derive(
    Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize,
    BorshSerialize, BorshDeserialize, Arbitrary,
)]
#[serde(rename_all = "snake_case")]
pub enum AllocationStatus {
    Idle,
    Pending,
    Used,
    Failed,
}

/// A named unit of spendable value inside a checkbook (a "check").
#[derive(
    Clone, Debug, Eq, PartialEq, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
    Arbitrary,
)]
pub struct AllocationEntry {
    pub id: String,
    pub checkbook_id: String,

    /// Ordinal within the checkbook.
    pub seq: u32,

    pub amount: Amount,
    pub status: AllocationStatus,

    /// One-time spend identifier; unique across all allocations once set.
    pub nullifier: Option<Buf32>,

    /// Back-pointer to the withdraw request currently holding this
    /// allocation, set while `status` is `Pending` or `Used`.
    pub withdraw_request_id: Option<String>,

    /// Deprecated request key kept for rows written before the nullifier
    /// switch-over.
    pub legacy_request_id: Option<Buf32>,

    pub created_at: u64,
    pub updated_at: u64,
}

impl AllocationEntry {
    pub fn new_idle(
        id: String,
        checkbook_id: String,
        seq: u32,
        amount: Amount,
        nullifier: Option<Buf32>,
    ) -> Self {
        Self {
            id,
            checkbook_id,
            seq,
            amount,
            status: AllocationStatus::Idle,
            nullifier,
            withdraw_request_id: None,
            legacy_request_id: None,
            created_at: 0,
            updated_at: 0,
        }
    }
}
