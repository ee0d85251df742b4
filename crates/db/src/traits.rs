//! Trait definitions for the repository layer.  One trait per aggregate;
//! the rocksdb implementations live in [`crate::rocksdb`].
//!
//! Every write here runs inside its own transaction.  Predicate-scoped
//! updates return [`UpdateOutcome`] / affected counts instead of failing
//! when the predicate excludes the row; that distinction is load-bearing
//! for idempotent event handling.

use std::sync::Arc;

use zkpay_primitives::{address::UniversalAddress, buf::Buf32};
use zkpay_state::{
    AllocationEntry, AllocationStatus, CheckbookEntry, CheckbookStatus, QueueRootEntry,
    WithdrawRequestEntry,
};

use crate::{
    types::{
        ArchiveKind, ArchivedEventEntry, DepositRecordUpdate, EventKey, ExecuteStatusUpdate,
        FallbackUpdate, HookStatusUpdate, InsertOutcome, Page, Paginated, PayoutStatusUpdate,
        ProofStatusUpdate, UpdateOutcome,
    },
    DbResult,
};

pub trait CheckbookDatabase {
    /// Inserts a new checkbook, stamping `created_at`.  Fails with
    /// [`crate::DbError::DuplicateDepositKey`] when the `(chain_id,
    /// local_deposit_id)` pair is already tracked.
    fn create_checkbook(&self, entry: CheckbookEntry) -> DbResult<CheckbookEntry>;

    fn get_checkbook(&self, id: &str) -> DbResult<Option<CheckbookEntry>>;

    fn get_checkbook_by_deposit(
        &self,
        chain_id: u32,
        local_deposit_id: u64,
    ) -> DbResult<Option<CheckbookEntry>>;

    /// Finds the checkbook whose in-flight commitment matches, used when a
    /// root update confirms the commitment landed.
    fn get_checkbook_by_commitment(&self, commitment: &Buf32) -> DbResult<Option<CheckbookEntry>>;

    fn get_checkbook_by_deposit_tx(&self, tx_hash: &Buf32) -> DbResult<Option<CheckbookEntry>>;

    /// Full-row update; the row must exist.
    fn update_checkbook(&self, entry: CheckbookEntry) -> DbResult<()>;

    /// Ordinal promotion: moves status to `target` only if the current
    /// ordinal is lower.  A miss means the row is already at or past the
    /// target.
    fn promote_checkbook(&self, id: &str, target: CheckbookStatus) -> DbResult<UpdateOutcome>;

    /// Applies the DepositRecorded field set and the status promotion in a
    /// single transaction, returning the updated row.
    fn record_deposit(
        &self,
        id: &str,
        update: DepositRecordUpdate,
        target: CheckbookStatus,
    ) -> DbResult<CheckbookEntry>;

    /// Stores the commitment hash and promotes, atomically.
    fn set_commitment(
        &self,
        id: &str,
        commitment: Buf32,
        target: CheckbookStatus,
    ) -> DbResult<UpdateOutcome>;

    /// Stores prover output and promotes, atomically.
    fn set_proof_artifacts(
        &self,
        id: &str,
        proof: Vec<u8>,
        public_values: Vec<u8>,
        target: CheckbookStatus,
    ) -> DbResult<UpdateOutcome>;

    fn list_checkbooks_by_owner(
        &self,
        owner: &UniversalAddress,
        page: Page,
    ) -> DbResult<Paginated<CheckbookEntry>>;
}

pub trait AllocationDatabase {
    /// Batch insert; nullifiers are checked unique across all allocations in
    /// the same transaction.
    fn create_allocations(&self, entries: Vec<AllocationEntry>) -> DbResult<Vec<AllocationEntry>>;

    fn get_allocation(&self, id: &str) -> DbResult<Option<AllocationEntry>>;

    fn get_allocations_by_checkbook(&self, checkbook_id: &str) -> DbResult<Vec<AllocationEntry>>;

    fn get_allocation_by_nullifier(&self, nullifier: &Buf32) -> DbResult<Option<AllocationEntry>>;

    fn get_allocations_by_withdraw_request(
        &self,
        withdraw_request_id: &str,
    ) -> DbResult<Vec<AllocationEntry>>;

    fn get_allocations_by_legacy_request(&self, request_id: &Buf32)
        -> DbResult<Vec<AllocationEntry>>;

    /// `idle → pending`, setting the back-pointer.  Rows not currently idle
    /// are skipped; the returned count is how many were actually locked and
    /// callers must treat a short count as contention.
    fn lock_for_withdrawal(&self, ids: &[String], withdraw_request_id: &str) -> DbResult<usize>;

    /// `pending → idle`, clearing the back-pointer.  Skips non-pending rows.
    fn release_allocations(&self, ids: &[String]) -> DbResult<usize>;

    /// `pending → used`.  Skips non-pending rows.
    fn mark_used(&self, ids: &[String]) -> DbResult<usize>;

    /// Unconditional status write used by the push-fabric wrapper; the row
    /// must exist.  Returns the updated entry.
    fn set_allocation_status(
        &self,
        id: &str,
        status: AllocationStatus,
    ) -> DbResult<AllocationEntry>;
}

pub trait WithdrawRequestDatabase {
    /// Inserts a new request, stamping `created_at`.  The withdraw nullifier
    /// must be globally unique.
    fn create_request(&self, entry: WithdrawRequestEntry) -> DbResult<WithdrawRequestEntry>;

    fn get_request(&self, id: &str) -> DbResult<Option<WithdrawRequestEntry>>;

    fn get_request_by_nullifier(&self, nullifier: &Buf32)
        -> DbResult<Option<WithdrawRequestEntry>>;

    fn get_request_by_legacy_id(&self, request_id: &Buf32)
        -> DbResult<Option<WithdrawRequestEntry>>;

    /// Proof-stage update.  The row must exist; a miss here is an error,
    /// unlike the execute-stage primitive.
    fn update_proof_status(&self, id: &str, update: ProofStatusUpdate) -> DbResult<()>;

    /// The optimistic-locking primitive: updates only while the current
    /// execute status is non-terminal.  A [`UpdateOutcome::PredicateMiss`]
    /// means the row was already terminal and MUST be treated as success by
    /// callers.
    fn update_execute_status(
        &self,
        id: &str,
        update: ExecuteStatusUpdate,
    ) -> DbResult<UpdateOutcome>;

    /// Payout-stage update.  Failure reports increment the retry counter in
    /// the same transaction.
    fn update_payout_status(&self, id: &str, update: PayoutStatusUpdate) -> DbResult<()>;

    fn update_hook_status(&self, id: &str, update: HookStatusUpdate) -> DbResult<()>;

    fn update_fallback(&self, id: &str, update: FallbackUpdate) -> DbResult<()>;

    /// Swaps the withdraw nullifier once the real one is known from the
    /// proof's public values.  Unique violations bubble as fatal.
    fn update_withdraw_nullifier(&self, id: &str, nullifier: Buf32) -> DbResult<()>;

    /// Marks the request manually resolved, terminal regardless of stage
    /// statuses.
    fn mark_resolved(&self, id: &str, resolver: String, note: Option<String>) -> DbResult<()>;

    fn list_requests_by_owner(
        &self,
        owner: &UniversalAddress,
        page: Page,
    ) -> DbResult<Paginated<WithdrawRequestEntry>>;
}

pub trait QueueRootDatabase {
    /// Idempotent insert; `root` is unique per chain and a replay returns
    /// [`InsertOutcome::AlreadyExists`] without touching the row.
    fn create_root(&self, entry: QueueRootEntry) -> DbResult<InsertOutcome>;

    fn is_known_root(&self, chain_id: u32, root: &Buf32) -> DbResult<bool>;

    fn get_root_by_commitment(&self, commitment: &Buf32) -> DbResult<Option<QueueRootEntry>>;

    fn find_by_previous_root(
        &self,
        chain_id: u32,
        previous_root: &Buf32,
    ) -> DbResult<Option<QueueRootEntry>>;

    /// Most-recent first.
    fn find_recent_roots(&self, chain_id: u32, limit: usize) -> DbResult<Vec<QueueRootEntry>>;
}

pub trait EventArchiveDatabase {
    /// Inserts an archived event keyed by `(chain_id, tx_hash, log_index)`.
    /// Duplicates are reported, not overwritten.
    fn insert_event(
        &self,
        kind: ArchiveKind,
        key: EventKey,
        entry: ArchivedEventEntry,
    ) -> DbResult<InsertOutcome>;

    fn get_event(&self, kind: ArchiveKind, key: &EventKey) -> DbResult<Option<ArchivedEventEntry>>;
}

/// Common database interface worker tasks are parameterized over.
pub trait CoordinatorDatabase {
    type CheckbookDb: CheckbookDatabase + Send + Sync + 'static;
    type AllocationDb: AllocationDatabase + Send + Sync + 'static;
    type WithdrawDb: WithdrawRequestDatabase + Send + Sync + 'static;
    type QueueRootDb: QueueRootDatabase + Send + Sync + 'static;
    type ArchiveDb: EventArchiveDatabase + Send + Sync + 'static;

    fn checkbook_db(&self) -> &Arc<Self::CheckbookDb>;
    fn allocation_db(&self) -> &Arc<Self::AllocationDb>;
    fn withdraw_db(&self) -> &Arc<Self::WithdrawDb>;
    fn queue_root_db(&self) -> &Arc<Self::QueueRootDb>;
    fn archive_db(&self) -> &Arc<Self::ArchiveDb>;
}
