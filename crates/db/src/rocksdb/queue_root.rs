use std::sync::Arc;

use rockbound::{OptimisticTransactionDB, SchemaDBOperationsExt};
use zkpay_primitives::buf::Buf32;
use zkpay_state::QueueRootEntry;

use super::{
    now_millis,
    schemas::{
        QueueRootCommitmentIdxSchema, QueueRootLogSchema, QueueRootPrevIdxSchema, QueueRootSchema,
        RootKey,
    },
    with_txn, DbOpsConfig,
};
use crate::{
    traits::QueueRootDatabase,
    types::InsertOutcome,
    DbResult,
};

pub struct QueueRootDb {
    db: Arc<OptimisticTransactionDB>,
    ops: DbOpsConfig,
}

impl QueueRootDb {
    pub fn new(db: Arc<OptimisticTransactionDB>, ops: DbOpsConfig) -> Self {
        Self { db, ops }
    }
}

impl QueueRootDatabase for QueueRootDb {
    fn create_root(&self, entry: QueueRootEntry) -> DbResult<InsertOutcome> {
        let mut entry = entry;
        entry.created_at = now_millis();

        let key = RootKey {
            chain_id: entry.chain_id,
            root: entry.root,
        };

        with_txn(&self.db, self.ops, |txn| {
            // Replays of the same root update are the common case under
            // at-least-once delivery; report and leave the row alone.
            if txn.get_for_update::<QueueRootSchema>(&key)?.is_some() {
                return Ok(InsertOutcome::AlreadyExists);
            }

            txn.put::<QueueRootSchema>(&key, &entry)?;
            txn.put::<QueueRootCommitmentIdxSchema>(&entry.created_by_commitment, &key)?;

            if let Some(prev) = &entry.previous_root {
                let prev_key = RootKey {
                    chain_id: entry.chain_id,
                    root: *prev,
                };
                txn.put::<QueueRootPrevIdxSchema>(&prev_key, &entry.root)?;
            }

            let mut log = txn
                .get_for_update::<QueueRootLogSchema>(&entry.chain_id)?
                .unwrap_or_default();
            log.push(entry.root);
            txn.put::<QueueRootLogSchema>(&entry.chain_id, &log)?;

            Ok(InsertOutcome::Inserted)
        })
    }

    fn is_known_root(&self, chain_id: u32, root: &Buf32) -> DbResult<bool> {
        let key = RootKey {
            chain_id,
            root: *root,
        };
        Ok(self.db.get::<QueueRootSchema>(&key)?.is_some())
    }

    fn get_root_by_commitment(&self, commitment: &Buf32) -> DbResult<Option<QueueRootEntry>> {
        let Some(key) = self.db.get::<QueueRootCommitmentIdxSchema>(commitment)? else {
            return Ok(None);
        };
        Ok(self.db.get::<QueueRootSchema>(&key)?)
    }

    fn find_by_previous_root(
        &self,
        chain_id: u32,
        previous_root: &Buf32,
    ) -> DbResult<Option<QueueRootEntry>> {
        let prev_key = RootKey {
            chain_id,
            root: *previous_root,
        };
        let Some(successor) = self.db.get::<QueueRootPrevIdxSchema>(&prev_key)? else {
            return Ok(None);
        };
        let key = RootKey {
            chain_id,
            root: successor,
        };
        Ok(self.db.get::<QueueRootSchema>(&key)?)
    }

    fn find_recent_roots(&self, chain_id: u32, limit: usize) -> DbResult<Vec<QueueRootEntry>> {
        let log = self
            .db
            .get::<QueueRootLogSchema>(&chain_id)?
            .unwrap_or_default();

        let mut out = Vec::with_capacity(limit.min(log.len()));
        for root in log.iter().rev().take(limit) {
            let key = RootKey {
                chain_id,
                root: *root,
            };
            if let Some(entry) = self.db.get::<QueueRootSchema>(&key)? {
                out.push(entry);
            }
        }
        Ok(out)
    }
}
