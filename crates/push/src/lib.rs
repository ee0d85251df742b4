//! The push fabric: mirrors persisted status transitions to connected
//! WebSocket clients, scoped by owner.
//!
//! Delivery is best-effort by design; a dropped frame is recoverable by a
//! client refresh, so nothing here ever blocks a handler or fails a
//! transaction.

pub mod fabric;
pub mod notifier;

pub use fabric::{ConnectionId, PushFabric, PushFrame, PushFrameKind};
pub use notifier::Notifier;
