//! Allocation ledger rules: reservation, commit, and release around the
//! withdraw pipeline.  Allocation *creation* is driven by the client API;
//! the state machine enforcement lives here and in the repository
//! predicates.

use std::sync::Arc;

use thiserror::Error;
use tracing::*;
use uuid::Uuid;
use zkpay_db::DbError;
use zkpay_primitives::{amount::Amount, buf::Buf32};
use zkpay_state::{AllocationEntry, CheckbookEntry};
use zkpay_storage::CoordinatorStorage;

#[derive(Debug, Error)]
pub enum AllocationError {
    #[error("allocation contention: wanted {wanted}, locked {locked}")]
    Contention { wanted: usize, locked: usize },

    #[error("allocations exceed checkbook amount: {requested} > {available}")]
    Conservation {
        requested: String,
        available: String,
    },

    #[error("db: {0}")]
    Db(#[from] DbError),
}

/// One requested sub-amount.
#[derive(Clone, Debug)]
pub struct AllocationSpec {
    pub amount: Amount,
    pub nullifier: Buf32,
}

/// Creates a batch of idle allocations under a checkbook, enforcing that
/// the total allocated value never exceeds the checkbook amount.
pub async fn create_allocations(
    storage: &Arc<CoordinatorStorage>,
    checkbook: &CheckbookEntry,
    specs: Vec<AllocationSpec>,
) -> Result<Vec<AllocationEntry>, AllocationError> {
    let existing = storage
        .allocation()
        .get_allocations_by_checkbook_async(checkbook.id.clone())
        .await?;

    let existing_total: Amount = existing.iter().map(|a| a.amount).sum();
    let requested: Amount = specs.iter().map(|s| s.amount).sum();
    let total = existing_total
        .checked_add(requested)
        .ok_or_else(|| AllocationError::Conservation {
            requested: requested.to_string(),
            available: checkbook.amount.to_string(),
        })?;
    if total > checkbook.amount {
        return Err(AllocationError::Conservation {
            requested: total.to_string(),
            available: checkbook.amount.to_string(),
        });
    }

    let base_seq = existing.len() as u32;
    let entries = specs
        .into_iter()
        .enumerate()
        .map(|(i, spec)| {
            AllocationEntry::new_idle(
                Uuid::new_v4().to_string(),
                checkbook.id.clone(),
                base_seq + i as u32,
                spec.amount,
                Some(spec.nullifier),
            )
        })
        .collect();

    Ok(storage.allocation().create_allocations_async(entries).await?)
}

/// Reserves a set of allocations for a withdraw request.
///
/// If any target is not idle the whole reservation aborts: the rows this
/// call did manage to lock are released again and the caller sees
/// contention.
pub async fn reserve_for_withdrawal(
    storage: &Arc<CoordinatorStorage>,
    ids: Vec<String>,
    withdraw_request_id: &str,
) -> Result<(), AllocationError> {
    let wanted = ids.len();
    let locked = storage
        .allocation()
        .lock_for_withdrawal_async(ids, withdraw_request_id.to_owned())
        .await?;

    if locked == wanted {
        return Ok(());
    }

    // Under-allocation: roll back exactly the rows this request holds.
    let ours = storage
        .allocation()
        .get_allocations_by_withdraw_request_async(withdraw_request_id.to_owned())
        .await?;
    let released = storage
        .allocation()
        .release_allocations_async(ours.into_iter().map(|a| a.id).collect())
        .await?;
    warn!(
        request = withdraw_request_id,
        wanted, locked, released, "allocation reservation contended, rolled back"
    );

    Err(AllocationError::Contention { wanted, locked })
}

/// Consumes a request's allocations after the execute stage succeeded.
pub async fn commit_used(
    storage: &Arc<CoordinatorStorage>,
    withdraw_request_id: &str,
) -> Result<usize, AllocationError> {
    let held = storage
        .allocation()
        .get_allocations_by_withdraw_request_async(withdraw_request_id.to_owned())
        .await?;
    let used = storage
        .allocation()
        .mark_used_async(held.into_iter().map(|a| a.id).collect())
        .await?;
    Ok(used)
}

/// Returns a request's allocations to the pool after an execute-stage
/// failure.  Never valid once the request executed successfully; used rows
/// are excluded by the repository predicate.
pub async fn release_for_request(
    storage: &Arc<CoordinatorStorage>,
    withdraw_request_id: &str,
) -> Result<usize, AllocationError> {
    let held = storage
        .allocation()
        .get_allocations_by_withdraw_request_async(withdraw_request_id.to_owned())
        .await?;
    let released = storage
        .allocation()
        .release_allocations_async(held.into_iter().map(|a| a.id).collect())
        .await?;
    Ok(released)
}
