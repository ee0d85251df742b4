use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use zkpay_primitives::{address::UniversalAddress, amount::Amount, buf::Buf32};

/// Proof-generation stage status.
#[derive(
    Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize,
    BorshSerialize, BorshDeserialize, Arbitrary,
)]
#[serde(rename_all = "snake_case")]
pub enum ProofStatus {
    Idle,
    Generating,
    Completed,
    Failed,
}

/// On-chain verify/execute stage status.
#[derive(
    Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize,
    BorshSerialize, BorshDeserialize, Arbitrary,
)]
#[serde(rename_all = "snake_case")]
pub enum ExecuteStatus {
    Idle,
    Submitting,
    Submitted,
    Success,
    SubmitFailed,
    VerifyFailed,
}

impl ExecuteStatus {
    /// Once terminal, no repository update may move the status again.
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            ExecuteStatus::Success | ExecuteStatus::SubmitFailed | ExecuteStatus::VerifyFailed
        )
    }
}

/// Payout stage status.
#[derive(
    Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize,
    BorshSerialize, BorshDeserialize, Arbitrary,
)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    Idle,
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Post-payout hook stage status.  `None` means the request has no hook.
#[derive(
    Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize,
    BorshSerialize, BorshDeserialize, Arbitrary,
)]
#[serde(rename_all = "snake_case")]
pub enum HookStatus {
    None,
    Idle,
    Pending,
    Completed,
    Failed,
}

#[derive(
    Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize,
    BorshSerialize, BorshDeserialize, Arbitrary,
)]
pub struct ProofStage {
    pub proof: Option<Vec<u8>>,
    pub public_values: Option<Vec<u8>>,
    pub error: Option<String>,
    pub generated_at: Option<u64>,
}

#[derive(
    Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize,
    BorshSerialize, BorshDeserialize, Arbitrary,
)]
pub struct ExecuteStage {
    pub tx_hash: Option<Buf32>,
    pub block_number: Option<u64>,
    pub error: Option<String>,
    pub executed_at: Option<u64>,
}

#[derive(
    Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize,
    BorshSerialize, BorshDeserialize, Arbitrary,
)]
pub struct PayoutStage {
    pub tx_hash: Option<Buf32>,
    pub block_number: Option<u64>,
    pub error: Option<String>,
    pub retry_count: u32,
    pub last_retry_at: Option<u64>,
    pub completed_at: Option<u64>,
}

#[derive(
    Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize,
    BorshSerialize, BorshDeserialize, Arbitrary,
)]
pub struct HookStage {
    pub tx_hash: Option<Buf32>,
    pub error: Option<String>,
    pub retry_count: u32,
    pub last_retry_at: Option<u64>,
    pub completed_at: Option<u64>,
}

/// Fallback-transfer sub-state, orthogonal to payout/hook.
#[derive(
    Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize,
    BorshSerialize, BorshDeserialize, Arbitrary,
)]
pub struct FallbackState {
    pub transferred: bool,
    pub error: Option<String>,
    pub retry_count: u32,
    pub last_retry_at: Option<u64>,
}

/// Record of an operator closing out a stuck request by hand.
#[derive(
    Clone, Debug, Eq, PartialEq, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
    Arbitrary,
)]
pub struct ManualResolution {
    pub resolver: String,
    pub note: Option<String>,
    pub resolved_at: u64,
}

/// A cross-chain withdrawal intent covering one or more allocations.
///
/// There is no single monolithic status; each pipeline stage advances its
/// own field and clients derive a display status via [`DisplayStatus::derive`].
#[derive(
    Clone, Debug, Eq, PartialEq, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
    Arbitrary,
)]
pub struct WithdrawRequestEntry {
    pub id: String,
    pub owner: UniversalAddress,
    pub recipient: UniversalAddress,
    pub token_key: String,
    pub amount: Amount,

    /// Unique spend key for this request.
    pub withdraw_nullifier: Buf32,

    /// Deprecated alias still carried by pre-nullifier rows and events.
    pub legacy_request_id: Option<Buf32>,

    pub proof_status: ProofStatus,
    pub proof: ProofStage,

    pub execute_status: ExecuteStatus,
    pub execute: ExecuteStage,

    pub payout_status: PayoutStatus,
    pub payout: PayoutStage,

    pub hook_status: HookStatus,
    pub hook: HookStage,

    pub fallback: FallbackState,

    pub resolution: Option<ManualResolution>,

    pub created_at: u64,
    pub updated_at: u64,
}

impl WithdrawRequestEntry {
    /// A fresh request as created from a client withdraw intent; proof
    /// generation starts immediately.
    pub fn new_generating(
        id: String,
        owner: UniversalAddress,
        recipient: UniversalAddress,
        token_key: String,
        amount: Amount,
        withdraw_nullifier: Buf32,
    ) -> Self {
        Self {
            id,
            owner,
            recipient,
            token_key,
            amount,
            withdraw_nullifier,
            legacy_request_id: None,
            proof_status: ProofStatus::Generating,
            proof: ProofStage::default(),
            execute_status: ExecuteStatus::Idle,
            execute: ExecuteStage::default(),
            payout_status: PayoutStatus::Idle,
            payout: PayoutStage::default(),
            hook_status: HookStatus::None,
            hook: HookStage::default(),
            fallback: FallbackState::default(),
            resolution: None,
            created_at: 0,
            updated_at: 0,
        }
    }

    pub fn display_status(&self) -> DisplayStatus {
        DisplayStatus::derive(
            self.proof_status,
            self.execute_status,
            self.payout_status,
            self.hook_status,
        )
    }
}

/// User-facing reduction of the four stage statuses.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayStatus {
    FailedExecute,
    FailedPayout,
    FailedHook,
    Completed,
    PayoutPending,
    ExecutePending,
    ProofPending,
    Pending,
}

impl DisplayStatus {
    /// The canonical derivation.  Total and pure: every stage-status tuple
    /// maps to exactly one display status, failures taking precedence in
    /// pipeline order.
    pub fn derive(
        proof: ProofStatus,
        execute: ExecuteStatus,
        payout: PayoutStatus,
        hook: HookStatus,
    ) -> DisplayStatus {
        if matches!(
            execute,
            ExecuteStatus::SubmitFailed | ExecuteStatus::VerifyFailed
        ) {
            DisplayStatus::FailedExecute
        } else if payout == PayoutStatus::Failed {
            DisplayStatus::FailedPayout
        } else if hook == HookStatus::Failed {
            DisplayStatus::FailedHook
        } else if payout == PayoutStatus::Completed
            && matches!(hook, HookStatus::Completed | HookStatus::None)
        {
            DisplayStatus::Completed
        } else if execute == ExecuteStatus::Success {
            DisplayStatus::PayoutPending
        } else if proof == ProofStatus::Completed {
            DisplayStatus::ExecutePending
        } else if proof == ProofStatus::Generating {
            DisplayStatus::ProofPending
        } else {
            DisplayStatus::Pending
        }
    }
}
