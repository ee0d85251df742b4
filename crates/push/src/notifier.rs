use std::sync::{Arc, RwLock};

use tracing::*;
use zkpay_db::DbResult;
use zkpay_state::{AllocationEntry, AllocationStatus, CheckbookEntry, WithdrawRequestEntry};
use zkpay_storage::CoordinatorStorage;

use crate::fabric::{PushFabric, PushFrame, PushFrameKind};

/// Persist-then-notify wrappers around the storage ops.
///
/// The fabric is attached after early boot; transitions that happen before
/// that still persist and are merely not mirrored.
pub struct Notifier {
    storage: Arc<CoordinatorStorage>,
    fabric: RwLock<Option<Arc<PushFabric>>>,
}

impl Notifier {
    pub fn new(storage: Arc<CoordinatorStorage>) -> Self {
        Self {
            storage,
            fabric: RwLock::new(None),
        }
    }

    pub fn with_fabric(storage: Arc<CoordinatorStorage>, fabric: Arc<PushFabric>) -> Self {
        let n = Self::new(storage);
        n.set_fabric(fabric);
        n
    }

    /// Attaches the fabric; may only happen once.
    pub fn set_fabric(&self, fabric: Arc<PushFabric>) {
        let mut slot = self.fabric.write().expect("notifier fabric lock poisoned");
        if slot.is_some() {
            error!("push fabric already initialized, ignoring re-initialization");
            return;
        }
        *slot = Some(fabric);
    }

    fn emit(&self, owner: &zkpay_primitives::address::UniversalAddress, frame: PushFrame) {
        let slot = self.fabric.read().expect("notifier fabric lock poisoned");
        match slot.as_ref() {
            Some(fabric) => fabric.emit(owner, frame),
            None => {
                warn!(context = %frame.context, "push fabric not initialized, skipping mirror");
            }
        }
    }

    fn frame(kind: PushFrameKind, payload: serde_json::Value, context: &str) -> PushFrame {
        PushFrame {
            kind,
            payload,
            context: context.to_owned(),
        }
    }

    /// Updates an allocation's status and mirrors the parent checkbook to
    /// its owner's connections.
    pub async fn update_check_status(
        &self,
        id: &str,
        status: AllocationStatus,
        context: &str,
    ) -> DbResult<AllocationEntry> {
        let allocation = self
            .storage
            .allocation()
            .set_allocation_status_async(id.to_owned(), status)
            .await?;

        match self
            .storage
            .checkbook()
            .get_checkbook_async(allocation.checkbook_id.clone())
            .await?
        {
            Some(checkbook) => {
                self.push_allocation_update(&checkbook, &allocation, context);
                self.push_checkbook_direct(&checkbook, context);
            }
            None => {
                warn!(
                    allocation = %allocation.id,
                    checkbook = %allocation.checkbook_id,
                    "allocation updated but parent checkbook missing, no push"
                );
            }
        }

        Ok(allocation)
    }

    /// Full checkbook update plus mirror.
    pub async fn update_checkbook(&self, entry: CheckbookEntry, context: &str) -> DbResult<()> {
        self.storage
            .checkbook()
            .update_checkbook_async(entry.clone())
            .await?;
        self.push_checkbook_direct(&entry, context);
        Ok(())
    }

    /// Mirror-only entry point for transitions where the checkbook row
    /// itself did not change but its children did.
    pub fn push_checkbook_direct(&self, checkbook: &CheckbookEntry, context: &str) {
        let payload = match serde_json::to_value(checkbook) {
            Ok(v) => v,
            Err(e) => {
                error!(err = %e, "failed to serialize checkbook for push");
                return;
            }
        };
        self.emit(
            &checkbook.user_address,
            Self::frame(PushFrameKind::CheckbookUpdate, payload, context),
        );
    }

    pub fn push_allocation_update(
        &self,
        checkbook: &CheckbookEntry,
        allocation: &AllocationEntry,
        context: &str,
    ) {
        let payload = match serde_json::to_value(allocation) {
            Ok(v) => v,
            Err(e) => {
                error!(err = %e, "failed to serialize allocation for push");
                return;
            }
        };
        self.emit(
            &checkbook.user_address,
            Self::frame(PushFrameKind::AllocationUpdate, payload, context),
        );
    }

    pub fn push_withdraw_update(&self, request: &WithdrawRequestEntry, context: &str) {
        let payload = match serde_json::to_value(request) {
            Ok(v) => v,
            Err(e) => {
                error!(err = %e, "failed to serialize withdraw request for push");
                return;
            }
        };
        self.emit(
            &request.owner,
            Self::frame(PushFrameKind::WithdrawUpdate, payload, context),
        );
    }
}
