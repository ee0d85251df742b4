//! The event-bus contract the dispatcher consumes, and an in-process
//! implementation with at-least-once delivery semantics.
//!
//! The production substrate is external; everything in the coordinator
//! depends only on the [`BusClient`] / [`BusSubscription`] traits so the
//! transport can be swapped without touching handler code.

pub mod memory;

use async_trait::async_trait;
use thiserror::Error;
use zkpay_chain_events::{Subject, SubjectPattern};

#[derive(Debug, Error)]
pub enum BusError {
    #[error("bus closed")]
    Closed,

    #[error("{0}")]
    Other(String),
}

pub type BusResult<T> = Result<T, BusError>;

/// A delivered message.  The consumer must settle it exactly once: `ack` to
/// consume, `nack` to request redelivery.  Dropping a message unsettled
/// counts as a nack, which keeps panicking handlers safe under
/// at-least-once delivery.
pub struct BusMessage {
    subject: Subject,
    payload: Vec<u8>,
    delivery: Box<dyn Delivery>,
}

impl BusMessage {
    pub fn new(subject: Subject, payload: Vec<u8>, delivery: Box<dyn Delivery>) -> Self {
        Self {
            subject,
            payload,
            delivery,
        }
    }

    pub fn subject(&self) -> &Subject {
        &self.subject
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    pub fn ack(mut self) {
        self.delivery.settle(Settlement::Ack);
    }

    pub fn nack(mut self) {
        self.delivery.settle(Settlement::Nack);
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Settlement {
    Ack,
    Nack,
}

/// Transport-side settlement hook.  `settle` is called at most once; the
/// transport must treat an unsettled drop as [`Settlement::Nack`].
pub trait Delivery: Send {
    fn settle(&mut self, settlement: Settlement);
}

#[async_trait]
pub trait BusSubscription: Send {
    /// Next message, or `None` once the subscription is closed and drained.
    async fn next(&mut self) -> Option<BusMessage>;
}

#[async_trait]
pub trait BusClient: Send + Sync {
    async fn subscribe(&self, pattern: SubjectPattern) -> BusResult<Box<dyn BusSubscription>>;
}
