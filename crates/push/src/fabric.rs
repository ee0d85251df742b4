use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        RwLock,
    },
};

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::*;
use zkpay_primitives::address::UniversalAddress;

/// How many frames a slow connection may lag before frames are dropped for
/// it.
const CONN_BUFFER: usize = 256;

#[derive(Copy, Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PushFrameKind {
    CheckbookUpdate,
    AllocationUpdate,
    WithdrawUpdate,
}

/// A frame as it goes over the wire.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PushFrame {
    #[serde(rename = "type")]
    pub kind: PushFrameKind,
    pub payload: serde_json::Value,
    /// The event name that triggered the transition.
    pub context: String,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ConnectionId(u64);

struct Connection {
    owner: UniversalAddress,
    tx: mpsc::Sender<PushFrame>,
}

/// Registry of live client connections, filtered per-owner on emit.
pub struct PushFabric {
    conns: RwLock<HashMap<ConnectionId, Connection>>,
    next_id: AtomicU64,
}

impl PushFabric {
    pub fn new() -> Self {
        Self {
            conns: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers a connection scoped to `owner`; the receiver half is handed
    /// to the transport task feeding the socket.
    pub fn subscribe(
        &self,
        owner: UniversalAddress,
    ) -> (ConnectionId, mpsc::Receiver<PushFrame>) {
        let (tx, rx) = mpsc::channel(CONN_BUFFER);
        let id = ConnectionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.conns
            .write()
            .expect("push conns lock poisoned")
            .insert(id, Connection { owner, tx });
        debug!(conn = id.0, %owner, "push subscriber registered");
        (id, rx)
    }

    pub fn unsubscribe(&self, id: ConnectionId) {
        self.conns
            .write()
            .expect("push conns lock poisoned")
            .remove(&id);
    }

    pub fn connection_count(&self) -> usize {
        self.conns.read().expect("push conns lock poisoned").len()
    }

    /// Emits a frame to every connection subscribed to `owner`.  Slow or
    /// gone connections lose the frame; they resync on refresh.
    pub fn emit(&self, owner: &UniversalAddress, frame: PushFrame) {
        let conns = self.conns.read().expect("push conns lock poisoned");
        for (id, conn) in conns.iter() {
            if &conn.owner != owner {
                continue;
            }
            if let Err(e) = conn.tx.try_send(frame.clone()) {
                warn!(conn = id.0, err = %e, "dropping push frame for connection");
            }
        }
    }
}

impl Default for PushFabric {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use zkpay_primitives::buf::Buf32;

    use super::*;

    fn owner(tag: u8) -> UniversalAddress {
        UniversalAddress::new(714, Buf32::from([tag; 32]))
    }

    fn frame(context: &str) -> PushFrame {
        PushFrame {
            kind: PushFrameKind::CheckbookUpdate,
            payload: serde_json::json!({"id": "cb1"}),
            context: context.to_owned(),
        }
    }

    #[tokio::test]
    async fn test_emit_scoped_by_owner() {
        let fabric = PushFabric::new();
        let (_a, mut rx_a) = fabric.subscribe(owner(1));
        let (_b, mut rx_b) = fabric.subscribe(owner(2));

        fabric.emit(&owner(1), frame("DepositRecorded"));

        let got = rx_a.recv().await.unwrap();
        assert_eq!(got.context, "DepositRecorded");
        assert!(rx_b.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let fabric = PushFabric::new();
        let (id, mut rx) = fabric.subscribe(owner(1));
        fabric.unsubscribe(id);
        fabric.emit(&owner(1), frame("x"));
        assert!(rx.try_recv().is_err());
        assert_eq!(fabric.connection_count(), 0);
    }

    #[tokio::test]
    async fn test_frame_wire_shape() {
        let f = frame("WithdrawExecuted");
        let js = serde_json::to_value(&f).unwrap();
        assert_eq!(js["type"], "checkbook_update");
        assert_eq!(js["context"], "WithdrawExecuted");
    }
}
