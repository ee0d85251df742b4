use std::sync::Arc;

use rockbound::{
    schema::{KeyDecoder, KeyEncoder, Schema, ValueCodec},
    OptimisticTransactionDB, SchemaDBOperationsExt,
};

use super::{
    schemas::{
        CommitmentRootArchiveSchema, DepositReceivedArchiveSchema, DepositRecordedArchiveSchema,
        DepositUsedArchiveSchema, WithdrawExecutedArchiveSchema, WithdrawRequestedArchiveSchema,
    },
    with_txn, DbOpsConfig,
};
use crate::{
    traits::EventArchiveDatabase,
    types::{ArchiveKind, ArchivedEventEntry, EventKey, InsertOutcome},
    DbResult,
};

pub struct EventArchiveDb {
    db: Arc<OptimisticTransactionDB>,
    ops: DbOpsConfig,
}

impl EventArchiveDb {
    pub fn new(db: Arc<OptimisticTransactionDB>, ops: DbOpsConfig) -> Self {
        Self { db, ops }
    }

    fn insert_into<S>(&self, key: EventKey, entry: &ArchivedEventEntry) -> DbResult<InsertOutcome>
    where
        S: Schema<Key = EventKey, Value = ArchivedEventEntry>,
        EventKey: KeyEncoder<S> + KeyDecoder<S>,
        ArchivedEventEntry: ValueCodec<S>,
    {
        with_txn(&self.db, self.ops, |txn| {
            if txn.get_for_update::<S>(&key)?.is_some() {
                return Ok(InsertOutcome::AlreadyExists);
            }
            txn.put::<S>(&key, entry)?;
            Ok(InsertOutcome::Inserted)
        })
    }

    fn get_from<S>(&self, key: &EventKey) -> DbResult<Option<ArchivedEventEntry>>
    where
        S: Schema<Key = EventKey, Value = ArchivedEventEntry>,
        EventKey: KeyEncoder<S> + KeyDecoder<S>,
        ArchivedEventEntry: ValueCodec<S>,
    {
        Ok(self.db.get::<S>(key)?)
    }
}

impl EventArchiveDatabase for EventArchiveDb {
    fn insert_event(
        &self,
        kind: ArchiveKind,
        key: EventKey,
        entry: ArchivedEventEntry,
    ) -> DbResult<InsertOutcome> {
        let mut entry = entry;
        entry.archived_at = super::now_millis();
        match kind {
            ArchiveKind::DepositReceived => {
                self.insert_into::<DepositReceivedArchiveSchema>(key, &entry)
            }
            ArchiveKind::DepositRecorded => {
                self.insert_into::<DepositRecordedArchiveSchema>(key, &entry)
            }
            ArchiveKind::DepositUsed => self.insert_into::<DepositUsedArchiveSchema>(key, &entry),
            ArchiveKind::CommitmentRootUpdated => {
                self.insert_into::<CommitmentRootArchiveSchema>(key, &entry)
            }
            ArchiveKind::WithdrawRequested => {
                self.insert_into::<WithdrawRequestedArchiveSchema>(key, &entry)
            }
            ArchiveKind::WithdrawExecuted => {
                self.insert_into::<WithdrawExecutedArchiveSchema>(key, &entry)
            }
        }
    }

    fn get_event(&self, kind: ArchiveKind, key: &EventKey) -> DbResult<Option<ArchivedEventEntry>> {
        match kind {
            ArchiveKind::DepositReceived => self.get_from::<DepositReceivedArchiveSchema>(key),
            ArchiveKind::DepositRecorded => self.get_from::<DepositRecordedArchiveSchema>(key),
            ArchiveKind::DepositUsed => self.get_from::<DepositUsedArchiveSchema>(key),
            ArchiveKind::CommitmentRootUpdated => self.get_from::<CommitmentRootArchiveSchema>(key),
            ArchiveKind::WithdrawRequested => self.get_from::<WithdrawRequestedArchiveSchema>(key),
            ArchiveKind::WithdrawExecuted => self.get_from::<WithdrawExecutedArchiveSchema>(key),
        }
    }
}

#[cfg(test)]
mod tests {
    use zkpay_primitives::buf::Buf32;

    use super::*;
    use crate::rocksdb::test_utils::get_rocksdb_tmp_instance;

    fn setup_db() -> EventArchiveDb {
        let (db, ops) = get_rocksdb_tmp_instance().unwrap();
        EventArchiveDb::new(db, ops)
    }

    fn sample_entry() -> ArchivedEventEntry {
        ArchivedEventEntry {
            block_number: 100,
            block_timestamp: 1_700_000_000,
            contract_address: "0xaa".to_owned(),
            payload: "{}".to_owned(),
            archived_at: 0,
        }
    }

    #[test]
    fn test_idempotent_insert() {
        let db = setup_db();
        let key = EventKey::new(714, Buf32::from([1u8; 32]), 3);

        let out = db
            .insert_event(ArchiveKind::DepositReceived, key, sample_entry())
            .unwrap();
        assert_eq!(out, InsertOutcome::Inserted);

        let out = db
            .insert_event(ArchiveKind::DepositReceived, key, sample_entry())
            .unwrap();
        assert_eq!(out, InsertOutcome::AlreadyExists);

        let stored = db
            .get_event(ArchiveKind::DepositReceived, &key)
            .unwrap()
            .unwrap();
        assert!(stored.archived_at > 0);
    }

    #[test]
    fn test_kinds_are_separate_tables() {
        let db = setup_db();
        let key = EventKey::new(714, Buf32::from([1u8; 32]), 3);
        db.insert_event(ArchiveKind::DepositReceived, key, sample_entry())
            .unwrap();

        // The same key in another family is untouched.
        assert!(db
            .get_event(ArchiveKind::WithdrawExecuted, &key)
            .unwrap()
            .is_none());
        let out = db
            .insert_event(ArchiveKind::WithdrawExecuted, key, sample_entry())
            .unwrap();
        assert_eq!(out, InsertOutcome::Inserted);
    }

    #[test]
    fn test_distinct_log_index_distinct_rows() {
        let db = setup_db();
        let k1 = EventKey::new(714, Buf32::from([1u8; 32]), 0);
        let k2 = EventKey::new(714, Buf32::from([1u8; 32]), 1);
        db.insert_event(ArchiveKind::DepositUsed, k1, sample_entry())
            .unwrap();
        let out = db
            .insert_event(ArchiveKind::DepositUsed, k2, sample_entry())
            .unwrap();
        assert_eq!(out, InsertOutcome::Inserted);
    }
}
