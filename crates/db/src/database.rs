use std::sync::Arc;

use rockbound::OptimisticTransactionDB;

use crate::{
    rocksdb::{AllocationDb, CheckbookDb, DbOpsConfig, EventArchiveDb, QueueRootDb,
        WithdrawRequestDb},
    traits::{
        AllocationDatabase, CheckbookDatabase, CoordinatorDatabase, EventArchiveDatabase,
        QueueRootDatabase, WithdrawRequestDatabase,
    },
};

/// Shim to tie the individual aggregate stores together behind the
/// [`CoordinatorDatabase`] trait.
pub struct CommonDatabase<Cb, Al, Wr, Qr, Ev>
where
    Cb: CheckbookDatabase + Send + Sync + 'static,
    Al: AllocationDatabase + Send + Sync + 'static,
    Wr: WithdrawRequestDatabase + Send + Sync + 'static,
    Qr: QueueRootDatabase + Send + Sync + 'static,
    Ev: EventArchiveDatabase + Send + Sync + 'static,
{
    checkbook_db: Arc<Cb>,
    allocation_db: Arc<Al>,
    withdraw_db: Arc<Wr>,
    queue_root_db: Arc<Qr>,
    archive_db: Arc<Ev>,
}

impl<Cb, Al, Wr, Qr, Ev> CommonDatabase<Cb, Al, Wr, Qr, Ev>
where
    Cb: CheckbookDatabase + Send + Sync + 'static,
    Al: AllocationDatabase + Send + Sync + 'static,
    Wr: WithdrawRequestDatabase + Send + Sync + 'static,
    Qr: QueueRootDatabase + Send + Sync + 'static,
    Ev: EventArchiveDatabase + Send + Sync + 'static,
{
    pub fn new(
        checkbook_db: Arc<Cb>,
        allocation_db: Arc<Al>,
        withdraw_db: Arc<Wr>,
        queue_root_db: Arc<Qr>,
        archive_db: Arc<Ev>,
    ) -> Self {
        Self {
            checkbook_db,
            allocation_db,
            withdraw_db,
            queue_root_db,
            archive_db,
        }
    }
}

impl<Cb, Al, Wr, Qr, Ev> CoordinatorDatabase for CommonDatabase<Cb, Al, Wr, Qr, Ev>
where
    Cb: CheckbookDatabase + Send + Sync + 'static,
    Al: AllocationDatabase + Send + Sync + 'static,
    Wr: WithdrawRequestDatabase + Send + Sync + 'static,
    Qr: QueueRootDatabase + Send + Sync + 'static,
    Ev: EventArchiveDatabase + Send + Sync + 'static,
{
    type CheckbookDb = Cb;
    type AllocationDb = Al;
    type WithdrawDb = Wr;
    type QueueRootDb = Qr;
    type ArchiveDb = Ev;

    fn checkbook_db(&self) -> &Arc<Cb> {
        &self.checkbook_db
    }

    fn allocation_db(&self) -> &Arc<Al> {
        &self.allocation_db
    }

    fn withdraw_db(&self) -> &Arc<Wr> {
        &self.withdraw_db
    }

    fn queue_root_db(&self) -> &Arc<Qr> {
        &self.queue_root_db
    }

    fn archive_db(&self) -> &Arc<Ev> {
        &self.archive_db
    }
}

/// The concrete database type the binary wires up.
pub type CoordinatorDb =
    CommonDatabase<CheckbookDb, AllocationDb, WithdrawRequestDb, QueueRootDb, EventArchiveDb>;

/// Builds all aggregate stores over one rocksdb handle.
pub fn init_coordinator_db(
    rbdb: Arc<OptimisticTransactionDB>,
    ops_config: DbOpsConfig,
) -> Arc<CoordinatorDb> {
    let checkbook_db = Arc::new(CheckbookDb::new(rbdb.clone(), ops_config));
    let allocation_db = Arc::new(AllocationDb::new(rbdb.clone(), ops_config));
    let withdraw_db = Arc::new(WithdrawRequestDb::new(rbdb.clone(), ops_config));
    let queue_root_db = Arc::new(QueueRootDb::new(rbdb.clone(), ops_config));
    let archive_db = Arc::new(EventArchiveDb::new(rbdb, ops_config));
    Arc::new(CommonDatabase::new(
        checkbook_db,
        allocation_db,
        withdraw_db,
        queue_root_db,
        archive_db,
    ))
}
