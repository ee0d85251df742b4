//! Rockbound-backed implementations of the repository traits.

pub mod allocation;
pub mod checkbook;
pub mod event_archive;
pub mod queue_root;
pub mod schemas;
pub mod test_utils;
pub mod withdraw;

use std::{
    path::Path,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};

use rockbound::{
    schema::ColumnFamilyName, OptimisticTransactionDB, TransactionCtx, TransactionError,
    TransactionRetry,
};

use crate::{DbError, DbResult};

pub use allocation::AllocationDb;
pub use checkbook::CheckbookDb;
pub use event_archive::EventArchiveDb;
pub use queue_root::QueueRootDb;
pub use withdraw::WithdrawRequestDb;

pub const ROCKSDB_NAME: &str = "zkpay";

pub const STORE_COLUMN_FAMILIES: &[ColumnFamilyName] = &[
    schemas::CheckbookSchema::table_name(),
    schemas::CheckbookDepositIdxSchema::table_name(),
    schemas::CheckbookCommitmentIdxSchema::table_name(),
    schemas::CheckbookTxIdxSchema::table_name(),
    schemas::CheckbookOwnerIdxSchema::table_name(),
    schemas::AllocationSchema::table_name(),
    schemas::AllocationCheckbookIdxSchema::table_name(),
    schemas::AllocationNullifierIdxSchema::table_name(),
    schemas::AllocationWithdrawIdxSchema::table_name(),
    schemas::AllocationLegacyIdxSchema::table_name(),
    schemas::WithdrawRequestSchema::table_name(),
    schemas::WithdrawNullifierIdxSchema::table_name(),
    schemas::WithdrawLegacyIdxSchema::table_name(),
    schemas::WithdrawOwnerIdxSchema::table_name(),
    schemas::QueueRootSchema::table_name(),
    schemas::QueueRootPrevIdxSchema::table_name(),
    schemas::QueueRootCommitmentIdxSchema::table_name(),
    schemas::QueueRootLogSchema::table_name(),
    schemas::DepositReceivedArchiveSchema::table_name(),
    schemas::DepositRecordedArchiveSchema::table_name(),
    schemas::DepositUsedArchiveSchema::table_name(),
    schemas::CommitmentRootArchiveSchema::table_name(),
    schemas::WithdrawRequestedArchiveSchema::table_name(),
    schemas::WithdrawExecutedArchiveSchema::table_name(),
];

/// Per-store knobs; currently just the optimistic-transaction retry budget.
#[derive(Copy, Clone, Debug)]
pub struct DbOpsConfig {
    pub retry_count: u16,
}

impl DbOpsConfig {
    pub fn new(retry_count: u16) -> Self {
        Self { retry_count }
    }
}

/// Opens (or creates) the coordinator database with all column families.
pub fn open_rocksdb_database(
    database_dir: &Path,
) -> anyhow::Result<Arc<OptimisticTransactionDB>> {
    if !database_dir.exists() {
        std::fs::create_dir_all(database_dir)?;
    }

    let mut opts = rockbound::rocksdb::Options::default();
    opts.create_if_missing(true);
    opts.create_missing_column_families(true);

    let rbdb = OptimisticTransactionDB::open(
        database_dir,
        ROCKSDB_NAME,
        STORE_COLUMN_FAMILIES.iter().map(|s| s.to_string()),
        &opts,
    )?;

    Ok(Arc::new(rbdb))
}

/// Runs `f` inside an optimistic transaction with the configured retry
/// budget, flattening the transaction error back into [`DbError`].
pub(crate) fn with_txn<R>(
    db: &OptimisticTransactionDB,
    config: DbOpsConfig,
    f: impl FnMut(&TransactionCtx<'_, OptimisticTransactionDB>) -> Result<R, DbError>,
) -> DbResult<R> {
    db.with_optimistic_txn(TransactionRetry::Count(config.retry_count), f)
        .map_err(|e| match e {
            TransactionError::User(e) => e,
            other => DbError::Transaction(other.to_string()),
        })
}

/// Unix time in millis, used to stamp `created_at`/`updated_at` columns.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("time went backwards")
        .as_millis() as u64
}
