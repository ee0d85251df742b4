use arbitrary::Arbitrary;
use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use zkpay_primitives::{address::UniversalAddress, amount::Amount, buf::Buf32};

/// Lifecycle position of a deposit, from raw chain receipt to being usable
/// for private withdrawals.
///
/// Promotion is ordinal-keyed: a checkbook may only ever move to a status
/// with a strictly higher ordinal, so replayed or reordered events converge
/// to the same terminal state regardless of arrival order.
#[derive(
    Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize,
    BorshSerialize, BorshDeserialize, Arbitrary,
)]
#[serde(rename_all = "snake_case")]
pub enum CheckbookStatus {
    Pending,
    Unsigned,
    ReadyForCommitment,
    GeneratingProof,
    SubmittingCommitment,
    CommitmentPending,
    WithCheckbook,
}

impl CheckbookStatus {
    /// The promotion ordinal.  Gaps are deliberate so intermediate statuses
    /// can be added without renumbering.
    pub const fn ordinal(&self) -> u8 {
        match self {
            CheckbookStatus::Pending => 10,
            CheckbookStatus::Unsigned => 30,
            CheckbookStatus::ReadyForCommitment => 50,
            CheckbookStatus::GeneratingProof => 70,
            CheckbookStatus::SubmittingCommitment => 85,
            CheckbookStatus::CommitmentPending => 95,
            CheckbookStatus::WithCheckbook => 100,
        }
    }

    /// Whether a transition from `self` to `target` is a real promotion.
    pub fn can_promote_to(&self, target: CheckbookStatus) -> bool {
        target.ordinal() > self.ordinal()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CheckbookStatus::Pending => "pending",
            CheckbookStatus::Unsigned => "unsigned",
            CheckbookStatus::ReadyForCommitment => "ready_for_commitment",
            CheckbookStatus::GeneratingProof => "generating_proof",
            CheckbookStatus::SubmittingCommitment => "submitting_commitment",
            CheckbookStatus::CommitmentPending => "commitment_pending",
            CheckbookStatus::WithCheckbook => "with_checkbook",
        }
    }
}

/// Off-chain record of a single confirmed deposit.
#[derive(
    Clone, Debug, Eq, PartialEq, Serialize, Deserialize, BorshSerialize, BorshDeserialize,
    Arbitrary,
)]
pub struct CheckbookEntry {
    pub id: String,

    /// Depositor, in universal form.
    pub user_address: UniversalAddress,

    /// Target for withdrawals derived from this deposit.  Defaults to the
    /// depositor until a record event overrides it.
    pub withdraw_recipient: UniversalAddress,

    /// SLIP-44 chain id; unique together with `local_deposit_id`.
    pub chain_id: u32,
    pub local_deposit_id: u64,

    /// Gross deposit amount, 18-decimal canonical.
    pub amount: Amount,

    /// Portion of the deposit spendable through allocations.
    pub allocatable_amount: Option<Amount>,
    pub fee_total_locked: Option<Amount>,

    /// Human-readable token symbol bound at deposit time.  Never empty once
    /// the record event has been applied.
    pub token_key: String,

    pub deposit_transaction_hash: Buf32,

    /// The in-flight commitment hash, set once proof submission starts.
    pub commitment: Option<Buf32>,

    /// Proof artifacts from the external prover.
    pub proof: Option<Vec<u8>>,
    pub public_values: Option<Vec<u8>>,

    pub promote_code: Option<String>,

    pub status: CheckbookStatus,

    /// Unix millis, stamped by the repository.
    pub created_at: u64,
    pub updated_at: u64,
}

impl CheckbookEntry {
    /// A fresh checkbook as created on first sight of a deposit.
    pub fn new_pending(
        id: String,
        user_address: UniversalAddress,
        chain_id: u32,
        local_deposit_id: u64,
        amount: Amount,
        token_key: String,
        deposit_transaction_hash: Buf32,
        promote_code: Option<String>,
    ) -> Self {
        Self {
            id,
            user_address,
            withdraw_recipient: user_address,
            chain_id,
            local_deposit_id,
            amount,
            allocatable_amount: None,
            fee_total_locked: None,
            token_key,
            deposit_transaction_hash,
            commitment: None,
            proof: None,
            public_values: None,
            promote_code,
            status: CheckbookStatus::Pending,
            created_at: 0,
            updated_at: 0,
        }
    }
}
