//! Column-family definitions for every aggregate and index.

use borsh::{BorshDeserialize, BorshSerialize};
use zkpay_primitives::buf::Buf32;
use zkpay_state::{AllocationEntry, CheckbookEntry, QueueRootEntry, WithdrawRequestEntry};

use crate::{
    define_table_with_default_codec, define_table_without_codec, impl_borsh_value_codec,
    types::{ArchivedEventEntry, EventKey},
};

/// `(chain_id, local_deposit_id)` unique key of a checkbook.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, BorshSerialize, BorshDeserialize)]
pub struct DepositKey {
    pub chain_id: u32,
    pub local_deposit_id: u64,
}

/// `(chain_id, root)` unique key of a queue root.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, BorshSerialize, BorshDeserialize)]
pub struct RootKey {
    pub chain_id: u32,
    pub root: Buf32,
}

define_table_with_default_codec!(
    /// Checkbooks by id.
    (CheckbookSchema) String => CheckbookEntry
);

define_table_with_default_codec!(
    /// Unique deposit-key index over checkbooks.
    (CheckbookDepositIdxSchema) DepositKey => String
);

define_table_with_default_codec!(
    /// In-flight commitment index over checkbooks.
    (CheckbookCommitmentIdxSchema) Buf32 => String
);

define_table_with_default_codec!(
    /// Deposit transaction hash index over checkbooks.
    (CheckbookTxIdxSchema) Buf32 => String
);

define_table_with_default_codec!(
    /// Owner index over checkbooks; key is the owner's fixed-width key form.
    (CheckbookOwnerIdxSchema) Vec<u8> => Vec<String>
);

define_table_with_default_codec!(
    /// Allocations by id.
    (AllocationSchema) String => AllocationEntry
);

define_table_with_default_codec!(
    /// Allocations per checkbook.
    (AllocationCheckbookIdxSchema) String => Vec<String>
);

define_table_with_default_codec!(
    /// Unique nullifier index over allocations.
    (AllocationNullifierIdxSchema) Buf32 => String
);

define_table_with_default_codec!(
    /// Allocations currently held by a withdraw request.
    (AllocationWithdrawIdxSchema) String => Vec<String>
);

define_table_with_default_codec!(
    /// Legacy request-id index over allocations.
    (AllocationLegacyIdxSchema) Buf32 => Vec<String>
);

define_table_with_default_codec!(
    /// Withdraw requests by id.
    (WithdrawRequestSchema) String => WithdrawRequestEntry
);

define_table_with_default_codec!(
    /// Unique withdraw-nullifier index.
    (WithdrawNullifierIdxSchema) Buf32 => String
);

define_table_with_default_codec!(
    /// Legacy request-id index over withdraw requests.
    (WithdrawLegacyIdxSchema) Buf32 => String
);

define_table_with_default_codec!(
    /// Owner index over withdraw requests.
    (WithdrawOwnerIdxSchema) Vec<u8> => Vec<String>
);

define_table_with_default_codec!(
    /// Queue roots by `(chain_id, root)`.
    (QueueRootSchema) RootKey => QueueRootEntry
);

define_table_with_default_codec!(
    /// Successor lookup: `(chain_id, previous_root)` to the successor root.
    (QueueRootPrevIdxSchema) RootKey => Buf32
);

define_table_with_default_codec!(
    /// Commitment lookup over queue roots.
    (QueueRootCommitmentIdxSchema) Buf32 => RootKey
);

define_table_with_default_codec!(
    /// Per-chain append log of roots, oldest first.
    (QueueRootLogSchema) u32 => Vec<Buf32>
);

define_table_with_default_codec!(
    /// Archived Treasury.DepositReceived events.
    (DepositReceivedArchiveSchema) EventKey => ArchivedEventEntry
);

define_table_with_default_codec!(
    /// Archived ZKPayProxy.DepositRecorded events.
    (DepositRecordedArchiveSchema) EventKey => ArchivedEventEntry
);

define_table_with_default_codec!(
    /// Archived ZKPayProxy.DepositUsed events.
    (DepositUsedArchiveSchema) EventKey => ArchivedEventEntry
);

define_table_with_default_codec!(
    /// Archived ZKPayProxy.CommitmentRootUpdated events.
    (CommitmentRootArchiveSchema) EventKey => ArchivedEventEntry
);

define_table_with_default_codec!(
    /// Archived ZKPayProxy.WithdrawRequested events.
    (WithdrawRequestedArchiveSchema) EventKey => ArchivedEventEntry
);

define_table_with_default_codec!(
    /// Archived Treasury.WithdrawExecuted events.
    (WithdrawExecutedArchiveSchema) EventKey => ArchivedEventEntry
);
