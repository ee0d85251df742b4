use std::sync::Arc;

use rockbound::{OptimisticTransactionDB, SchemaDBOperationsExt, TransactionCtx};
use zkpay_primitives::buf::Buf32;
use zkpay_state::{AllocationEntry, AllocationStatus};

use super::{
    now_millis,
    schemas::{
        AllocationCheckbookIdxSchema, AllocationLegacyIdxSchema, AllocationNullifierIdxSchema,
        AllocationSchema, AllocationWithdrawIdxSchema,
    },
    with_txn, DbOpsConfig,
};
use crate::{traits::AllocationDatabase, DbError, DbResult};

pub struct AllocationDb {
    db: Arc<OptimisticTransactionDB>,
    ops: DbOpsConfig,
}

impl AllocationDb {
    pub fn new(db: Arc<OptimisticTransactionDB>, ops: DbOpsConfig) -> Self {
        Self { db, ops }
    }

    fn load_many(&self, ids: &[String]) -> DbResult<Vec<AllocationEntry>> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(e) = self.db.get::<AllocationSchema>(id)? {
                out.push(e);
            }
        }
        Ok(out)
    }
}

fn load_for_update(
    txn: &TransactionCtx<'_, OptimisticTransactionDB>,
    id: &str,
) -> Result<AllocationEntry, DbError> {
    txn.get_for_update::<AllocationSchema>(&id.to_owned())?
        .ok_or_else(|| DbError::MissingEntry("allocation", id.to_owned()))
}

fn withdraw_idx_insert(
    txn: &TransactionCtx<'_, OptimisticTransactionDB>,
    request_id: &str,
    id: &str,
) -> Result<(), DbError> {
    let key = request_id.to_owned();
    let mut ids = txn
        .get_for_update::<AllocationWithdrawIdxSchema>(&key)?
        .unwrap_or_default();
    if !ids.iter().any(|x| x == id) {
        ids.push(id.to_owned());
        txn.put::<AllocationWithdrawIdxSchema>(&key, &ids)?;
    }
    Ok(())
}

fn withdraw_idx_remove(
    txn: &TransactionCtx<'_, OptimisticTransactionDB>,
    request_id: &str,
    id: &str,
) -> Result<(), DbError> {
    let key = request_id.to_owned();
    if let Some(mut ids) = txn.get_for_update::<AllocationWithdrawIdxSchema>(&key)? {
        ids.retain(|x| x != id);
        txn.put::<AllocationWithdrawIdxSchema>(&key, &ids)?;
    }
    Ok(())
}

impl AllocationDatabase for AllocationDb {
    fn create_allocations(&self, entries: Vec<AllocationEntry>) -> DbResult<Vec<AllocationEntry>> {
        let now = now_millis();
        let mut entries = entries;
        for e in entries.iter_mut() {
            e.created_at = now;
            e.updated_at = now;
        }

        with_txn(&self.db, self.ops, |txn| {
            for entry in &entries {
                if txn
                    .get_for_update::<AllocationSchema>(&entry.id)?
                    .is_some()
                {
                    return Err(DbError::DuplicateId(entry.id.clone()));
                }

                if let Some(nullifier) = &entry.nullifier {
                    if let Some(holder) =
                        txn.get_for_update::<AllocationNullifierIdxSchema>(nullifier)?
                    {
                        if holder != entry.id {
                            return Err(DbError::DuplicateNullifier(nullifier.to_hex()));
                        }
                    }
                    txn.put::<AllocationNullifierIdxSchema>(nullifier, &entry.id)?;
                }

                if let Some(legacy) = &entry.legacy_request_id {
                    let mut ids = txn
                        .get_for_update::<AllocationLegacyIdxSchema>(legacy)?
                        .unwrap_or_default();
                    if !ids.contains(&entry.id) {
                        ids.push(entry.id.clone());
                        txn.put::<AllocationLegacyIdxSchema>(legacy, &ids)?;
                    }
                }

                let mut cb_ids = txn
                    .get_for_update::<AllocationCheckbookIdxSchema>(&entry.checkbook_id)?
                    .unwrap_or_default();
                if !cb_ids.contains(&entry.id) {
                    cb_ids.push(entry.id.clone());
                    txn.put::<AllocationCheckbookIdxSchema>(&entry.checkbook_id, &cb_ids)?;
                }

                txn.put::<AllocationSchema>(&entry.id, entry)?;
            }
            Ok(())
        })?;

        Ok(entries)
    }

    fn get_allocation(&self, id: &str) -> DbResult<Option<AllocationEntry>> {
        Ok(self.db.get::<AllocationSchema>(&id.to_owned())?)
    }

    fn get_allocations_by_checkbook(&self, checkbook_id: &str) -> DbResult<Vec<AllocationEntry>> {
        let ids = self
            .db
            .get::<AllocationCheckbookIdxSchema>(&checkbook_id.to_owned())?
            .unwrap_or_default();
        let mut entries = self.load_many(&ids)?;
        entries.sort_by_key(|e| e.seq);
        Ok(entries)
    }

    fn get_allocation_by_nullifier(&self, nullifier: &Buf32) -> DbResult<Option<AllocationEntry>> {
        let Some(id) = self.db.get::<AllocationNullifierIdxSchema>(nullifier)? else {
            return Ok(None);
        };
        self.get_allocation(&id)
    }

    fn get_allocations_by_withdraw_request(
        &self,
        withdraw_request_id: &str,
    ) -> DbResult<Vec<AllocationEntry>> {
        let ids = self
            .db
            .get::<AllocationWithdrawIdxSchema>(&withdraw_request_id.to_owned())?
            .unwrap_or_default();
        self.load_many(&ids)
    }

    fn get_allocations_by_legacy_request(
        &self,
        request_id: &Buf32,
    ) -> DbResult<Vec<AllocationEntry>> {
        let ids = self
            .db
            .get::<AllocationLegacyIdxSchema>(request_id)?
            .unwrap_or_default();
        self.load_many(&ids)
    }

    fn lock_for_withdrawal(&self, ids: &[String], withdraw_request_id: &str) -> DbResult<usize> {
        with_txn(&self.db, self.ops, |txn| {
            let mut locked = 0;
            for id in ids {
                let mut entry = load_for_update(txn, id)?;
                // The predicate: only idle rows are lockable.  Anything else
                // is skipped, and the caller sees it in the count.
                if entry.status != AllocationStatus::Idle {
                    continue;
                }
                entry.status = AllocationStatus::Pending;
                entry.withdraw_request_id = Some(withdraw_request_id.to_owned());
                entry.updated_at = now_millis();
                txn.put::<AllocationSchema>(&entry.id, &entry)?;
                withdraw_idx_insert(txn, withdraw_request_id, id)?;
                locked += 1;
            }
            Ok(locked)
        })
    }

    fn release_allocations(&self, ids: &[String]) -> DbResult<usize> {
        with_txn(&self.db, self.ops, |txn| {
            let mut released = 0;
            for id in ids {
                let mut entry = load_for_update(txn, id)?;
                if entry.status != AllocationStatus::Pending {
                    continue;
                }
                if let Some(request_id) = entry.withdraw_request_id.take() {
                    withdraw_idx_remove(txn, &request_id, id)?;
                }
                entry.status = AllocationStatus::Idle;
                entry.updated_at = now_millis();
                txn.put::<AllocationSchema>(&entry.id, &entry)?;
                released += 1;
            }
            Ok(released)
        })
    }

    fn mark_used(&self, ids: &[String]) -> DbResult<usize> {
        with_txn(&self.db, self.ops, |txn| {
            let mut used = 0;
            for id in ids {
                let mut entry = load_for_update(txn, id)?;
                if entry.status != AllocationStatus::Pending {
                    continue;
                }
                entry.status = AllocationStatus::Used;
                entry.updated_at = now_millis();
                txn.put::<AllocationSchema>(&entry.id, &entry)?;
                used += 1;
            }
            Ok(used)
        })
    }

    fn set_allocation_status(
        &self,
        id: &str,
        status: AllocationStatus,
    ) -> DbResult<AllocationEntry> {
        with_txn(&self.db, self.ops, |txn| {
            let mut entry = load_for_update(txn, id)?;
            entry.status = status;
            entry.updated_at = now_millis();
            txn.put::<AllocationSchema>(&entry.id, &entry)?;
            Ok(entry)
        })
    }
}
