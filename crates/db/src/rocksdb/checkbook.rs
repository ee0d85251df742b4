use std::sync::Arc;

use rockbound::{OptimisticTransactionDB, SchemaDBOperationsExt, TransactionCtx};
use zkpay_primitives::{address::UniversalAddress, buf::Buf32};
use zkpay_state::{CheckbookEntry, CheckbookStatus};

use super::{
    now_millis,
    schemas::{
        CheckbookCommitmentIdxSchema, CheckbookDepositIdxSchema, CheckbookOwnerIdxSchema,
        CheckbookSchema, CheckbookTxIdxSchema, DepositKey,
    },
    with_txn, DbOpsConfig,
};
use crate::{
    traits::CheckbookDatabase,
    types::{DepositRecordUpdate, Page, Paginated, UpdateOutcome},
    DbError, DbResult,
};

pub struct CheckbookDb {
    db: Arc<OptimisticTransactionDB>,
    ops: DbOpsConfig,
}

impl CheckbookDb {
    /// Wraps an existing database handle opened with the store column
    /// families.
    pub fn new(db: Arc<OptimisticTransactionDB>, ops: DbOpsConfig) -> Self {
        Self { db, ops }
    }
}

fn owner_idx_insert(
    txn: &TransactionCtx<'_, OptimisticTransactionDB>,
    owner: &UniversalAddress,
    id: &str,
) -> Result<(), DbError> {
    let key = owner.to_key_bytes().to_vec();
    let mut ids = txn
        .get_for_update::<CheckbookOwnerIdxSchema>(&key)?
        .unwrap_or_default();
    if !ids.iter().any(|x| x == id) {
        ids.push(id.to_owned());
        txn.put::<CheckbookOwnerIdxSchema>(&key, &ids)?;
    }
    Ok(())
}

fn owner_idx_remove(
    txn: &TransactionCtx<'_, OptimisticTransactionDB>,
    owner: &UniversalAddress,
    id: &str,
) -> Result<(), DbError> {
    let key = owner.to_key_bytes().to_vec();
    if let Some(mut ids) = txn.get_for_update::<CheckbookOwnerIdxSchema>(&key)? {
        ids.retain(|x| x != id);
        txn.put::<CheckbookOwnerIdxSchema>(&key, &ids)?;
    }
    Ok(())
}

fn load_for_update(
    txn: &TransactionCtx<'_, OptimisticTransactionDB>,
    id: &str,
) -> Result<CheckbookEntry, DbError> {
    txn.get_for_update::<CheckbookSchema>(&id.to_owned())?
        .ok_or_else(|| DbError::MissingEntry("checkbook", id.to_owned()))
}

impl CheckbookDatabase for CheckbookDb {
    fn create_checkbook(&self, entry: CheckbookEntry) -> DbResult<CheckbookEntry> {
        let mut entry = entry;
        let now = now_millis();
        entry.created_at = now;
        entry.updated_at = now;

        let dep_key = DepositKey {
            chain_id: entry.chain_id,
            local_deposit_id: entry.local_deposit_id,
        };

        with_txn(&self.db, self.ops, |txn| {
            if txn
                .get_for_update::<CheckbookSchema>(&entry.id)?
                .is_some()
            {
                return Err(DbError::DuplicateId(entry.id.clone()));
            }
            if txn
                .get_for_update::<CheckbookDepositIdxSchema>(&dep_key)?
                .is_some()
            {
                return Err(DbError::DuplicateDepositKey(
                    entry.chain_id,
                    entry.local_deposit_id,
                ));
            }

            txn.put::<CheckbookSchema>(&entry.id, &entry)?;
            txn.put::<CheckbookDepositIdxSchema>(&dep_key, &entry.id)?;
            txn.put::<CheckbookTxIdxSchema>(&entry.deposit_transaction_hash, &entry.id)?;
            owner_idx_insert(txn, &entry.user_address, &entry.id)?;
            Ok(())
        })?;

        Ok(entry)
    }

    fn get_checkbook(&self, id: &str) -> DbResult<Option<CheckbookEntry>> {
        Ok(self.db.get::<CheckbookSchema>(&id.to_owned())?)
    }

    fn get_checkbook_by_deposit(
        &self,
        chain_id: u32,
        local_deposit_id: u64,
    ) -> DbResult<Option<CheckbookEntry>> {
        let key = DepositKey {
            chain_id,
            local_deposit_id,
        };
        let Some(id) = self.db.get::<CheckbookDepositIdxSchema>(&key)? else {
            return Ok(None);
        };
        self.get_checkbook(&id)
    }

    fn get_checkbook_by_commitment(&self, commitment: &Buf32) -> DbResult<Option<CheckbookEntry>> {
        let Some(id) = self.db.get::<CheckbookCommitmentIdxSchema>(commitment)? else {
            return Ok(None);
        };
        self.get_checkbook(&id)
    }

    fn get_checkbook_by_deposit_tx(&self, tx_hash: &Buf32) -> DbResult<Option<CheckbookEntry>> {
        let Some(id) = self.db.get::<CheckbookTxIdxSchema>(tx_hash)? else {
            return Ok(None);
        };
        self.get_checkbook(&id)
    }

    fn update_checkbook(&self, entry: CheckbookEntry) -> DbResult<()> {
        with_txn(&self.db, self.ops, |txn| {
            let prev = load_for_update(txn, &entry.id)?;
            let mut next = entry.clone();
            next.created_at = prev.created_at;
            next.updated_at = now_millis();
            if prev.user_address != next.user_address {
                owner_idx_remove(txn, &prev.user_address, &prev.id)?;
                owner_idx_insert(txn, &next.user_address, &next.id)?;
            }
            txn.put::<CheckbookSchema>(&next.id, &next)?;
            Ok(())
        })
    }

    fn promote_checkbook(&self, id: &str, target: CheckbookStatus) -> DbResult<UpdateOutcome> {
        with_txn(&self.db, self.ops, |txn| {
            let mut entry = load_for_update(txn, id)?;
            if !entry.status.can_promote_to(target) {
                return Ok(UpdateOutcome::PredicateMiss);
            }
            entry.status = target;
            entry.updated_at = now_millis();
            txn.put::<CheckbookSchema>(&entry.id, &entry)?;
            Ok(UpdateOutcome::Updated)
        })
    }

    fn record_deposit(
        &self,
        id: &str,
        update: DepositRecordUpdate,
        target: CheckbookStatus,
    ) -> DbResult<CheckbookEntry> {
        with_txn(&self.db, self.ops, |txn| {
            let mut entry = load_for_update(txn, id)?;

            if entry.user_address != update.owner {
                owner_idx_remove(txn, &entry.user_address, id)?;
                owner_idx_insert(txn, &update.owner, id)?;
                entry.user_address = update.owner;
            }
            entry.token_key = update.token_key.clone();
            entry.amount = update.amount;
            entry.allocatable_amount = Some(update.allocatable_amount);
            entry.fee_total_locked = Some(update.fee_total_locked);
            if update.promote_code.is_some() {
                entry.promote_code = update.promote_code.clone();
            }
            if entry.status.can_promote_to(target) {
                entry.status = target;
            }
            entry.updated_at = now_millis();

            txn.put::<CheckbookSchema>(&entry.id, &entry)?;
            Ok(entry)
        })
    }

    fn set_commitment(
        &self,
        id: &str,
        commitment: Buf32,
        target: CheckbookStatus,
    ) -> DbResult<UpdateOutcome> {
        with_txn(&self.db, self.ops, |txn| {
            let mut entry = load_for_update(txn, id)?;
            entry.commitment = Some(commitment);
            txn.put::<CheckbookCommitmentIdxSchema>(&commitment, &entry.id)?;

            let outcome = if entry.status.can_promote_to(target) {
                entry.status = target;
                UpdateOutcome::Updated
            } else {
                UpdateOutcome::PredicateMiss
            };
            entry.updated_at = now_millis();
            txn.put::<CheckbookSchema>(&entry.id, &entry)?;
            Ok(outcome)
        })
    }

    fn set_proof_artifacts(
        &self,
        id: &str,
        proof: Vec<u8>,
        public_values: Vec<u8>,
        target: CheckbookStatus,
    ) -> DbResult<UpdateOutcome> {
        with_txn(&self.db, self.ops, |txn| {
            let mut entry = load_for_update(txn, id)?;
            entry.proof = Some(proof.clone());
            entry.public_values = Some(public_values.clone());

            let outcome = if entry.status.can_promote_to(target) {
                entry.status = target;
                UpdateOutcome::Updated
            } else {
                UpdateOutcome::PredicateMiss
            };
            entry.updated_at = now_millis();
            txn.put::<CheckbookSchema>(&entry.id, &entry)?;
            Ok(outcome)
        })
    }

    fn list_checkbooks_by_owner(
        &self,
        owner: &UniversalAddress,
        page: Page,
    ) -> DbResult<Paginated<CheckbookEntry>> {
        let key = owner.to_key_bytes().to_vec();
        let ids = self
            .db
            .get::<CheckbookOwnerIdxSchema>(&key)?
            .unwrap_or_default();

        let mut entries = Vec::with_capacity(ids.len());
        for id in &ids {
            if let Some(e) = self.get_checkbook(id)? {
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
