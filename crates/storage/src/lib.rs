//! Higher-level storage interface over the database traits: one ops handle
//! per aggregate, each exposing `_async` variants that run the blocking
//! repository call on a shared worker pool, plus `_blocking` passthroughs.

pub(crate) mod exec;
pub mod ops;

use std::sync::Arc;

use threadpool::ThreadPool;
use zkpay_db::traits::CoordinatorDatabase;

pub use ops::{
    allocation::AllocationOps, checkbook::CheckbookOps, event_archive::EventArchiveOps,
    queue_root::QueueRootOps, withdraw::WithdrawOps,
};

/// The storage handle everything above the repository layer works with.
#[derive(Clone)]
pub struct CoordinatorStorage {
    checkbook_ops: Arc<CheckbookOps>,
    allocation_ops: Arc<AllocationOps>,
    withdraw_ops: Arc<WithdrawOps>,
    queue_root_ops: Arc<QueueRootOps>,
    archive_ops: Arc<EventArchiveOps>,
}

impl CoordinatorStorage {
    pub fn checkbook(&self) -> &Arc<CheckbookOps> {
        &self.checkbook_ops
    }

    pub fn allocation(&self) -> &Arc<AllocationOps> {
        &self.allocation_ops
    }

    pub fn withdraw(&self) -> &Arc<WithdrawOps> {
        &self.withdraw_ops
    }

    pub fn queue_root(&self) -> &Arc<QueueRootOps> {
        &self.queue_root_ops
    }

    pub fn archive(&self) -> &Arc<EventArchiveOps> {
        &self.archive_ops
    }
}

/// Wires every aggregate's ops over one database and worker pool.
pub fn create_coordinator_storage<D: CoordinatorDatabase>(
    database: Arc<D>,
    pool: ThreadPool,
) -> CoordinatorStorage {
    let checkbook_ops = Arc::new(CheckbookOps::new(
        pool.clone(),
        database.checkbook_db().clone(),
    ));
    let allocation_ops = Arc::new(AllocationOps::new(
        pool.clone(),
        database.allocation_db().clone(),
    ));
    let withdraw_ops = Arc::new(WithdrawOps::new(pool.clone(), database.withdraw_db().clone()));
    let queue_root_ops = Arc::new(QueueRootOps::new(
        pool.clone(),
        database.queue_root_db().clone(),
    ));
    let archive_ops = Arc::new(EventArchiveOps::new(pool, database.archive_db().clone()));

    CoordinatorStorage {
        checkbook_ops,
        allocation_ops,
        withdraw_ops,
        queue_root_ops,
        archive_ops,
    }
}
