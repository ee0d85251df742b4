use std::sync::Arc;

use zkpay_primitives::token::TokenKeyRegistry;
use zkpay_push::Notifier;
use zkpay_storage::CoordinatorStorage;

/// Everything a handler needs, wired once at startup.
///
/// The token registry is read-only after boot and must be built before any
/// dispatcher task starts, which the orchestrator guarantees by
/// construction order.
pub struct EventContext {
    pub storage: Arc<CoordinatorStorage>,
    pub notifier: Arc<Notifier>,
    pub tokens: Arc<TokenKeyRegistry>,
}

impl EventContext {
    pub fn new(
        storage: Arc<CoordinatorStorage>,
        notifier: Arc<Notifier>,
        tokens: Arc<TokenKeyRegistry>,
    ) -> Self {
        Self {
            storage,
            notifier,
            tokens,
        }
    }
}
