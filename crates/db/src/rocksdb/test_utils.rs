use std::sync::Arc;

use rockbound::{rocksdb, OptimisticTransactionDB};
use tempfile::TempDir;

use super::{DbOpsConfig, ROCKSDB_NAME, STORE_COLUMN_FAMILIES};

pub fn get_rocksdb_tmp_instance() -> anyhow::Result<(Arc<OptimisticTransactionDB>, DbOpsConfig)> {
    let mut opts = rocksdb::Options::default();
    opts.create_missing_column_families(true);
    opts.create_if_missing(true);

    let temp_dir = TempDir::new().expect("failed to create temp dir");

    let rbdb = OptimisticTransactionDB::open(
        temp_dir.into_path(),
        ROCKSDB_NAME,
        STORE_COLUMN_FAMILIES.iter().map(|s| s.to_string()),
        &opts,
    )?;

    Ok((Arc::new(rbdb), DbOpsConfig { retry_count: 5 }))
}
