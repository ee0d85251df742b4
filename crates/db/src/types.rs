//! Repository-local types: archive records, update payloads, and the
//! outcomes of predicate-scoped writes.

use borsh::{BorshDeserialize, BorshSerialize};
use zkpay_primitives::{address::UniversalAddress, amount::Amount, buf::Buf32};

/// Idempotency key of an archived chain event.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, BorshSerialize, BorshDeserialize)]
pub struct EventKey {
    pub chain_id: u32,
    pub transaction_hash: Buf32,
    pub log_index: u64,
}

impl EventKey {
    pub fn new(chain_id: u32, transaction_hash: Buf32, log_index: u64) -> Self {
        Self {
            chain_id,
            transaction_hash,
            log_index,
        }
    }
}

/// The archived event families.  One table each.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum ArchiveKind {
    DepositReceived,
    DepositRecorded,
    DepositUsed,
    CommitmentRootUpdated,
    WithdrawRequested,
    WithdrawExecuted,
}

/// A persisted chain event, queryable after the fact.
#[derive(Clone, Debug, Eq, PartialEq, BorshSerialize, BorshDeserialize)]
pub struct ArchivedEventEntry {
    pub block_number: u64,
    pub block_timestamp: u64,
    pub contract_address: String,
    /// The raw `event_data` JSON, kept verbatim for audits.
    pub payload: String,
    pub archived_at: u64,
}

/// Result of a predicate-scoped update.  A miss means the row was already in
/// a state the predicate excludes; it is not an error.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum UpdateOutcome {
    Updated,
    PredicateMiss,
}

/// Result of an idempotent insert.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum InsertOutcome {
    Inserted,
    AlreadyExists,
}

/// Offset/limit window for paginated reads.
#[derive(Copy, Clone, Debug)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Page {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }
}

/// A page of entries plus the total matching count, newest first.
#[derive(Clone, Debug)]
pub struct Paginated<T> {
    pub entries: Vec<T>,
    pub total: usize,
}

/// Field set applied to a checkbook by the DepositRecorded handler, in one
/// transaction with the status promotion.
#[derive(Clone, Debug)]
pub struct DepositRecordUpdate {
    pub token_key: String,
    pub amount: Amount,
    pub allocatable_amount: Amount,
    pub fee_total_locked: Amount,
    pub owner: UniversalAddress,
    pub promote_code: Option<String>,
}

#[derive(Clone, Debug)]
pub enum ProofStatusUpdate {
    Generating,
    Completed {
        proof: Vec<u8>,
        public_values: Vec<u8>,
    },
    Failed {
        error: String,
    },
}

#[derive(Clone, Debug)]
pub struct ExecuteStatusUpdate {
    pub status: zkpay_state::ExecuteStatus,
    pub tx_hash: Option<Buf32>,
    pub block_number: Option<u64>,
    pub error: Option<String>,
}

#[derive(Clone, Debug)]
pub enum PayoutStatusUpdate {
    Pending,
    Processing,
    Completed {
        tx_hash: Buf32,
        block_number: u64,
    },
    Failed {
        error: String,
    },
}

#[derive(Clone, Debug)]
pub enum HookStatusUpdate {
    Pending,
    Completed { tx_hash: Buf32 },
    Failed { error: String },
}

#[derive(Clone, Debug)]
pub enum FallbackUpdate {
    Transferred,
    Failed { error: String },
}
