//! The lifecycle engine: event handlers for every chain event the system
//! tracks, the dispatcher that feeds them from the bus, the allocation
//! ledger rules, and the prover-result intake.
//!
//! Handlers are written to be idempotent under at-least-once delivery; the
//! repository layer's predicate-scoped updates make reprocessing inert, so
//! the dispatcher can always NACK on transient failure without bookkeeping.

pub mod allocations;
pub mod context;
pub mod dispatcher;
pub mod errors;
pub mod handlers;
pub mod metrics;
pub mod prover;
pub mod status;

pub use context::EventContext;
pub use dispatcher::spawn_event_workers;
pub use errors::{Disposition, HandlerError, HandlerResult};
pub use metrics::DispatchMetrics;
pub use status::{CoordinatorStatus, StatusChannel};
