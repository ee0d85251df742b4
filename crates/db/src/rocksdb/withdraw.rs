use std::sync::Arc;

use rockbound::{OptimisticTransactionDB, SchemaDBOperationsExt, TransactionCtx};
use tracing::*;
use zkpay_primitives::{address::UniversalAddress, buf::Buf32};
use zkpay_state::{ExecuteStatus, HookStatus, ManualResolution, PayoutStatus, ProofStatus,
    WithdrawRequestEntry};

use super::{
    now_millis,
    schemas::{
        WithdrawLegacyIdxSchema, WithdrawNullifierIdxSchema, WithdrawOwnerIdxSchema,
        WithdrawRequestSchema,
    },
    with_txn, DbOpsConfig,
};
use crate::{
    traits::WithdrawRequestDatabase,
    types::{
        ExecuteStatusUpdate, FallbackUpdate, HookStatusUpdate, Page, Paginated,
        PayoutStatusUpdate, ProofStatusUpdate, UpdateOutcome,
    },
    DbError, DbResult,
};

pub struct WithdrawRequestDb {
    db: Arc<OptimisticTransactionDB>,
    ops: DbOpsConfig,
}

impl WithdrawRequestDb {
    pub fn new(db: Arc<OptimisticTransactionDB>, ops: DbOpsConfig) -> Self {
        Self { db, ops }
    }
}

fn load_for_update(
    txn: &TransactionCtx<'_, OptimisticTransactionDB>,
    id: &str,
) -> Result<WithdrawRequestEntry, DbError> {
    txn.get_for_update::<WithdrawRequestSchema>(&id.to_owned())?
        .ok_or_else(|| DbError::MissingEntry("withdraw_request", id.to_owned()))
}

impl WithdrawRequestDatabase for WithdrawRequestDb {
    fn create_request(&self, entry: WithdrawRequestEntry) -> DbResult<WithdrawRequestEntry> {
        let mut entry = entry;
        let now = now_millis();
        entry.created_at = now;
        entry.updated_at = now;

        with_txn(&self.db, self.ops, |txn| {
            if txn
                .get_for_update::<WithdrawRequestSchema>(&entry.id)?
                .is_some()
            {
                return Err(DbError::DuplicateId(entry.id.clone()));
            }
            if txn
                .get_for_update::<WithdrawNullifierIdxSchema>(&entry.withdraw_nullifier)?
                .is_some()
            {
                return Err(DbError::DuplicateNullifier(
                    entry.withdraw_nullifier.to_hex(),
                ));
            }

            txn.put::<WithdrawRequestSchema>(&entry.id, &entry)?;
            txn.put::<WithdrawNullifierIdxSchema>(&entry.withdraw_nullifier, &entry.id)?;
            if let Some(legacy) = &entry.legacy_request_id {
                txn.put::<WithdrawLegacyIdxSchema>(legacy, &entry.id)?;
            }

            let owner_key = entry.owner.to_key_bytes().to_vec();
            let mut ids = txn
                .get_for_update::<WithdrawOwnerIdxSchema>(&owner_key)?
                .unwrap_or_default();
            if !ids.contains(&entry.id) {
                ids.push(entry.id.clone());
                txn.put::<WithdrawOwnerIdxSchema>(&owner_key, &ids)?;
            }
            Ok(())
        })?;

        Ok(entry)
    }

    fn get_request(&self, id: &str) -> DbResult<Option<WithdrawRequestEntry>> {
        Ok(self.db.get::<WithdrawRequestSchema>(&id.to_owned())?)
    }

    fn get_request_by_nullifier(
        &self,
        nullifier: &Buf32,
    ) -> DbResult<Option<WithdrawRequestEntry>> {
        let Some(id) = self.db.get::<WithdrawNullifierIdxSchema>(nullifier)? else {
            return Ok(None);
        };
        self.get_request(&id)
    }

    fn get_request_by_legacy_id(
        &self,
        request_id: &Buf32,
    ) -> DbResult<Option<WithdrawRequestEntry>> {
        let Some(id) = self.db.get::<WithdrawLegacyIdxSchema>(request_id)? else {
            return Ok(None);
        };
        self.get_request(&id)
    }

    fn update_proof_status(&self, id: &str, update: ProofStatusUpdate) -> DbResult<()> {
        with_txn(&self.db, self.ops, |txn| {
            let mut entry = load_for_update(txn, id)?;
            match &update {
                ProofStatusUpdate::Generating => {
                    entry.proof_status = ProofStatus::Generating;
                }
                ProofStatusUpdate::Completed {
                    proof,
                    public_values,
                } => {
                    entry.proof_status = ProofStatus::Completed;
                    entry.proof.proof = Some(proof.clone());
                    entry.proof.public_values = Some(public_values.clone());
                    entry.proof.generated_at = Some(now_millis());
                    entry.proof.error = None;
                }
                ProofStatusUpdate::Failed { error } => {
                    entry.proof_status = ProofStatus::Failed;
                    entry.proof.error = Some(error.clone());
                }
            }
            entry.updated_at = now_millis();
            txn.put::<WithdrawRequestSchema>(&entry.id, &entry)?;
            Ok(())
        })
    }

    fn update_execute_status(
        &self,
        id: &str,
        update: ExecuteStatusUpdate,
    ) -> DbResult<UpdateOutcome> {
        let outcome = with_txn(&self.db, self.ops, |txn| {
            let mut entry = load_for_update(txn, id)?;

            // Terminal statuses never transition out; this check runs under
            // the row lock so concurrent reporters serialize here.
            if entry.execute_status.is_terminal() {
                return Ok(UpdateOutcome::PredicateMiss);
            }

            entry.execute_status = update.status;
            if update.tx_hash.is_some() {
                entry.execute.tx_hash = update.tx_hash;
            }
            if update.block_number.is_some() {
                entry.execute.block_number = update.block_number;
            }
            match update.status {
                ExecuteStatus::Success => {
                    entry.execute.executed_at = Some(now_millis());
                }
                ExecuteStatus::SubmitFailed | ExecuteStatus::VerifyFailed => {
                    entry.execute.error = update.error.clone();
                }
                _ => {}
            }
            entry.updated_at = now_millis();
            txn.put::<WithdrawRequestSchema>(&entry.id, &entry)?;
            Ok(UpdateOutcome::Updated)
        })?;

        if outcome == UpdateOutcome::PredicateMiss {
            info!(%id, "execute status already terminal, skipping update");
        }
        Ok(outcome)
    }

    fn update_payout_status(&self, id: &str, update: PayoutStatusUpdate) -> DbResult<()> {
        with_txn(&self.db, self.ops, |txn| {
            let mut entry = load_for_update(txn, id)?;
            let now = now_millis();
            match &update {
                PayoutStatusUpdate::Pending => entry.payout_status = PayoutStatus::Pending,
                PayoutStatusUpdate::Processing => entry.payout_status = PayoutStatus::Processing,
                PayoutStatusUpdate::Completed {
                    tx_hash,
                    block_number,
                } => {
                    entry.payout_status = PayoutStatus::Completed;
                    entry.payout.tx_hash = Some(*tx_hash);
                    entry.payout.block_number = Some(*block_number);
                    entry.payout.completed_at = Some(now);
                }
                PayoutStatusUpdate::Failed { error } => {
                    entry.payout_status = PayoutStatus::Failed;
                    entry.payout.error = Some(error.clone());
                    // Incremented on the row inside this transaction so
                    // concurrent failure reports cannot lose counts.
                    entry.payout.retry_count += 1;
                    entry.payout.last_retry_at = Some(now);
                }
            }
            entry.updated_at = now;
            txn.put::<WithdrawRequestSchema>(&entry.id, &entry)?;
            Ok(())
        })
    }

    fn update_hook_status(&self, id: &str, update: HookStatusUpdate) -> DbResult<()> {
        with_txn(&self.db, self.ops, |txn| {
            let mut entry = load_for_update(txn, id)?;
            let now = now_millis();
            match &update {
                HookStatusUpdate::Pending => entry.hook_status = HookStatus::Pending,
                HookStatusUpdate::Completed { tx_hash } => {
                    entry.hook_status = HookStatus::Completed;
                    entry.hook.tx_hash = Some(*tx_hash);
                    entry.hook.completed_at = Some(now);
                }
                HookStatusUpdate::Failed { error } => {
                    entry.hook_status = HookStatus::Failed;
                    entry.hook.error = Some(error.clone());
                    entry.hook.retry_count += 1;
                    entry.hook.last_retry_at = Some(now);
                }
            }
            entry.updated_at = now;
            txn.put::<WithdrawRequestSchema>(&entry.id, &entry)?;
            Ok(())
        })
    }

    fn update_fallback(&self, id: &str, update: FallbackUpdate) -> DbResult<()> {
        with_txn(&self.db, self.ops, |txn| {
            let mut entry = load_for_update(txn, id)?;
            let now = now_millis();
            match &update {
                FallbackUpdate::Transferred => {
                    entry.fallback.transferred = true;
                    entry.fallback.error = None;
                }
                FallbackUpdate::Failed { error } => {
                    entry.fallback.error = Some(error.clone());
                    entry.fallback.retry_count += 1;
                    entry.fallback.last_retry_at = Some(now);
                }
            }
            entry.updated_at = now;
            txn.put::<WithdrawRequestSchema>(&entry.id, &entry)?;
            Ok(())
        })
    }

    fn update_withdraw_nullifier(&self, id: &str, nullifier: Buf32) -> DbResult<()> {
        with_txn(&self.db, self.ops, |txn| {
            let mut entry = load_for_update(txn, id)?;
            if entry.withdraw_nullifier == nullifier {
                return Ok(());
            }

            if let Some(holder) =
                txn.get_for_update::<WithdrawNullifierIdxSchema>(&nullifier)?
            {
                if holder != entry.id {
                    return Err(DbError::DuplicateNullifier(nullifier.to_hex()));
                }
            }

            txn.delete::<WithdrawNullifierIdxSchema>(&entry.withdraw_nullifier)?;
            txn.put::<WithdrawNullifierIdxSchema>(&nullifier, &entry.id)?;
            entry.withdraw_nullifier = nullifier;
            entry.updated_at = now_millis();
            txn.put::<WithdrawRequestSchema>(&entry.id, &entry)?;
            Ok(())
        })
    }

    fn mark_resolved(&self, id: &str, resolver: String, note: Option<String>) -> DbResult<()> {
        with_txn(&self.db, self.ops, |txn| {
            let mut entry = load_for_update(txn, id)?;
            let now = now_millis();
            entry.resolution = Some(ManualResolution {
                resolver: resolver.clone(),
                note: note.clone(),
                resolved_at: now,
            });
            entry.updated_at = now;
            txn.put::<WithdrawRequestSchema>(&entry.id, &entry)?;
            Ok(())
        })
    }

    fn list_requests_by_owner(
        &self,
        owner: &UniversalAddress,
        page: Page,
    ) -> DbResult<Paginated<WithdrawRequestEntry>> {
        let key = owner.to_key_bytes().to_vec();
        let ids = self
            .db
            .get::<WithdrawOwnerIdxSchema>(&key)?
            .unwrap_or_default();

        let mut entries = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(e) = self.get_request(id)? {
                entries.push(e);
            }
        }
        entries.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let total = entries.len();
        let entries = entries
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .collect();
        Ok(Paginated { entries, total })
    }
}

#[cfg(test)]
mod tests {
    use zkpay_primitives::amount::Amount;

    use super::*;
    use crate::rocksdb::test_utils::get_rocksdb_tmp_instance;

    fn setup_db() -> WithdrawRequestDb {
        let (db, ops) = get_rocksdb_tmp_instance().unwrap();
        WithdrawRequestDb::new(db, ops)
    }

    fn sample(id: &str, nullifier: u8) -> WithdrawRequestEntry {
        WithdrawRequestEntry::new_generating(
            id.to_owned(),
            UniversalAddress::new(714, Buf32::from([0xaa; 32])),
            UniversalAddress::new(60, Buf32::from([0xbb; 32])),
            "USDT".to_owned(),
            Amount::from_u128(1000),
            Buf32::from([nullifier; 32]),
        )
    }

    fn success_update() -> ExecuteStatusUpdate {
        ExecuteStatusUpdate {
            status: ExecuteStatus::Success,
            tx_hash: Some(Buf32::from([0x77; 32])),
            block_number: Some(1234),
            error: None,
        }
    }

    #[test]
    fn test_create_and_nullifier_lookup() {
        let db = setup_db();
        db.create_request(sample("w1", 1)).unwrap();
        let found = db
            .get_request_by_nullifier(&Buf32::from([1u8; 32]))
            .unwrap()
            .unwrap();
        assert_eq!(found.id, "w1");
        assert_eq!(found.proof_status, ProofStatus::Generating);
    }

    #[test]
    fn test_duplicate_withdraw_nullifier_rejected() {
        let db = setup_db();
        db.create_request(sample("w1", 1)).unwrap();
        let err = db.create_request(sample("w2", 1)).unwrap_err();
        assert!(matches!(err, DbError::DuplicateNullifier(_)));
    }

    #[test]
    fn test_execute_status_terminal_predicate() {
        let db = setup_db();
        db.create_request(sample("w1", 1)).unwrap();

        let out = db.update_execute_status("w1", success_update()).unwrap();
        assert_eq!(out, UpdateOutcome::Updated);
        let entry = db.get_request("w1").unwrap().unwrap();
        assert_eq!(entry.execute_status, ExecuteStatus::Success);
        assert!(entry.execute.executed_at.is_some());
        assert_eq!(entry.execute.block_number, Some(1234));

        // A late failure report cannot overwrite the terminal status; the
        // miss is success for the caller.
        let out = db
            .update_execute_status(
                "w1",
                ExecuteStatusUpdate {
                    status: ExecuteStatus::VerifyFailed,
                    tx_hash: None,
                    block_number: None,
                    error: Some("stale".to_owned()),
                },
            )
            .unwrap();
        assert_eq!(out, UpdateOutcome::PredicateMiss);
        let entry = db.get_request("w1").unwrap().unwrap();
        assert_eq!(entry.execute_status, ExecuteStatus::Success);
        assert!(entry.execute.error.is_none());
    }

    #[test]
    fn test_execute_failure_records_error() {
        let db = setup_db();
        db.create_request(sample("w1", 1)).unwrap();
        db.update_execute_status(
            "w1",
            ExecuteStatusUpdate {
                status: ExecuteStatus::SubmitFailed,
                tx_hash: None,
                block_number: None,
                error: Some("nonce too low".to_owned()),
            },
        )
        .unwrap();
        let entry = db.get_request("w1").unwrap().unwrap();
        assert_eq!(entry.execute_status, ExecuteStatus::SubmitFailed);
        assert_eq!(entry.execute.error.as_deref(), Some("nonce too low"));
    }

    #[test]
    fn test_execute_update_missing_row_is_error() {
        let db = setup_db();
        assert!(matches!(
            db.update_execute_status("nope", success_update()),
            Err(DbError::MissingEntry("withdraw_request", _))
        ));
    }

    #[test]
    fn test_proof_completion_stores_artifacts() {
        let db = setup_db();
        db.create_request(sample("w1", 1)).unwrap();
        db.update_proof_status(
            "w1",
            ProofStatusUpdate::Completed {
                proof: vec![1, 2, 3],
                public_values: vec![4, 5, 6],
            },
        )
        .unwrap();
        let entry = db.get_request("w1").unwrap().unwrap();
        assert_eq!(entry.proof_status, ProofStatus::Completed);
        assert_eq!(entry.proof.proof.as_deref(), Some(&[1u8, 2, 3][..]));
        assert!(entry.proof.generated_at.is_some());
    }

    #[test]
    fn test_payout_retry_counter_monotonic() {
        let db = setup_db();
        db.create_request(sample("w1", 1)).unwrap();

        for i in 1..=3u32 {
            db.update_payout_status(
                "w1",
                PayoutStatusUpdate::Failed {
                    error: "slippage".to_owned(),
                },
            )
            .unwrap();
            let entry = db.get_request("w1").unwrap().unwrap();
            assert_eq!(entry.payout.retry_count, i);
            assert_eq!(entry.payout_status, PayoutStatus::Failed);
        }

        // A later success keeps the counter.
        db.update_payout_status(
            "w1",
            PayoutStatusUpdate::Completed {
                tx_hash: Buf32::from([0x55; 32]),
                block_number: 99,
            },
        )
        .unwrap();
        let entry = db.get_request("w1").unwrap().unwrap();
        assert_eq!(entry.payout_status, PayoutStatus::Completed);
        assert_eq!(entry.payout.retry_count, 3);
        assert!(entry.payout.completed_at.is_some());
    }

    #[test]
    fn test_nullifier_swap() {
        let db = setup_db();
        db.create_request(sample("w1", 1)).unwrap();

        let new_n = Buf32::from([2u8; 32]);
        db.update_withdraw_nullifier("w1", new_n).unwrap();

        assert!(db
            .get_request_by_nullifier(&Buf32::from([1u8; 32]))
            .unwrap()
            .is_none());
        let found = db.get_request_by_nullifier(&new_n).unwrap().unwrap();
        assert_eq!(found.id, "w1");
    }

    #[test]
    fn test_nullifier_swap_conflict_is_fatal() {
        let db = setup_db();
        db.create_request(sample("w1", 1)).unwrap();
        db.create_request(sample("w2", 2)).unwrap();

        let err = db
            .update_withdraw_nullifier("w1", Buf32::from([2u8; 32]))
            .unwrap_err();
        assert!(matches!(err, DbError::DuplicateNullifier(_)));
    }

    #[test]
    fn test_fallback_is_orthogonal() {
        let db = setup_db();
        db.create_request(sample("w1", 1)).unwrap();
        db.update_fallback(
            "w1",
            FallbackUpdate::Failed {
                error: "insufficient gas".to_owned(),
            },
        )
        .unwrap();
        db.update_fallback("w1", FallbackUpdate::Transferred).unwrap();

        let entry = db.get_request("w1").unwrap().unwrap();
        assert!(entry.fallback.transferred);
        assert!(entry.fallback.error.is_none());
        assert_eq!(entry.fallback.retry_count, 1);
        // Stage statuses untouched.
        assert_eq!(entry.payout_status, PayoutStatus::Idle);
    }

    #[test]
    fn test_manual_resolution() {
        let db = setup_db();
        db.create_request(sample("w1", 1)).unwrap();
        db.mark_resolved("w1", "ops@zkpay".to_owned(), Some("paid manually".to_owned()))
            .unwrap();
        let entry = db.get_request("w1").unwrap().unwrap();
        let res = entry.resolution.unwrap();
        assert_eq!(res.resolver, "ops@zkpay");
        assert_eq!(res.note.as_deref(), Some("paid manually"));
    }
}
