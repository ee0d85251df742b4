//! Dispatcher-level tests over the in-process bus: routing, settlement,
//! and failure metrics.

use std::{sync::Arc, time::Duration};

use serde_json::json;
use zkpay_bus::memory::MemoryBus;
use zkpay_chain_events::{EventKind, Subject};
use zkpay_coordinator::{
    spawn_event_workers, DispatchMetrics, EventContext, StatusChannel,
};
use zkpay_db::{database::init_coordinator_db, rocksdb::test_utils::get_rocksdb_tmp_instance};
use zkpay_primitives::{buf::Buf32, token::TokenKeyRegistry};
use zkpay_push::Notifier;
use zkpay_storage::{create_coordinator_storage, CoordinatorStorage};
use zkpay_tasks::TaskManager;

fn make_ctx() -> (Arc<EventContext>, Arc<CoordinatorStorage>) {
    let (db, ops) = get_rocksdb_tmp_instance().unwrap();
    let database = init_coordinator_db(db, ops);
    let pool = threadpool::Builder::new().num_threads(2).build();
    let storage = Arc::new(create_coordinator_storage(database, pool));
    let notifier = Arc::new(Notifier::new(storage.clone()));
    let tokens = Arc::new(TokenKeyRegistry::from_symbols(["USDT"]));
    let ctx = Arc::new(EventContext::new(storage.clone(), notifier, tokens));
    (ctx, storage)
}

fn deposit_received_payload(local_deposit_id: u64) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "chainId": 714,
        "contractAddress": "0x00000000000000000000000000000000000000aa",
        "contractName": "Treasury",
        "eventName": "DepositReceived",
        "blockNumber": 1,
        "transactionHash": Buf32::from([0x31; 32]).to_hex(),
        "logIndex": local_deposit_id,
        "blockTimestamp": 1_700_000_000,
        "eventData": {
            "depositor": format!("0x{}", "0a".repeat(20)),
            "token": format!("0x{}", "0b".repeat(20)),
            "amount": "77",
            "localDepositId": local_deposit_id,
        },
    }))
    .unwrap()
}

async fn wait_until(mut cond: impl FnMut() -> bool) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached in time");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_dispatch_routes_and_acks() {
    let (ctx, storage) = make_ctx();
    let bus = Arc::new(MemoryBus::new());
    let metrics = Arc::new(DispatchMetrics::new());
    let status = StatusChannel::new();

    let tm = TaskManager::new(tokio::runtime::Handle::current());
    let executor = tm.executor();
    spawn_event_workers(&executor, bus.as_ref(), ctx, metrics.clone(), status.clone())
        .await
        .unwrap();

    bus.publish(
        Subject::new("bsc", "Treasury", "DepositReceived"),
        deposit_received_payload(42),
    );

    let m = metrics.clone();
    wait_until(move || {
        m.snapshot()[&EventKind::DepositReceived].processed == 1
    })
    .await;

    let cb = storage
        .checkbook()
        .get_checkbook_by_deposit_async(714, 42)
        .await
        .unwrap();
    assert!(cb.is_some());
    assert_eq!(status.current().events_processed, 1);
    assert!(status
        .current()
        .last_subject
        .unwrap()
        .contains("DepositReceived"));
}

#[tokio::test(flavor = "multi_thread")]
async fn test_malformed_payload_retried_to_cap() {
    let (ctx, _storage) = make_ctx();
    let bus = Arc::new(MemoryBus::with_max_redelivery(2));
    let metrics = Arc::new(DispatchMetrics::new());
    let status = StatusChannel::new();

    let tm = TaskManager::new(tokio::runtime::Handle::current());
    let executor = tm.executor();
    spawn_event_workers(&executor, bus.as_ref(), ctx, metrics.clone(), status)
        .await
        .unwrap();

    bus.publish(
        Subject::new("bsc", "Treasury", "DepositReceived"),
        b"not json at all".to_vec(),
    );

    // Decode failures NACK; the bus redelivers until the cap, then drops.
    let m = metrics.clone();
    wait_until(move || m.snapshot()[&EventKind::DepositReceived].failed >= 2).await;

    let snap = metrics.snapshot();
    assert_eq!(snap[&EventKind::DepositReceived].processed, 0);
    assert!(snap[&EventKind::DepositReceived].received >= 2);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_duplicate_delivery_is_idempotent() {
    let (ctx, storage) = make_ctx();
    let bus = Arc::new(MemoryBus::new());
    let metrics = Arc::new(DispatchMetrics::new());

    let tm = TaskManager::new(tokio::runtime::Handle::current());
    let executor = tm.executor();
    spawn_event_workers(&executor, bus.as_ref(), ctx, metrics.clone(), StatusChannel::new())
        .await
        .unwrap();

    let payload = deposit_received_payload(7);
    bus.publish(Subject::new("bsc", "Treasury", "DepositReceived"), payload.clone());
    bus.publish(Subject::new("bsc", "Treasury", "DepositReceived"), payload);

    let m = metrics.clone();
    wait_until(move || m.snapshot()[&EventKind::DepositReceived].processed == 2).await;

    // One checkbook, despite two deliveries.
    let page = storage
        .checkbook()
        .get_checkbook_by_deposit_async(714, 7)
        .await
        .unwrap();
    assert!(page.is_some());
    let archived_twice = storage
        .archive()
        .get_event_async(
            zkpay_db::types::ArchiveKind::DepositReceived,
            zkpay_db::types::EventKey::new(714, Buf32::from([0x31; 32]), 7),
        )
        .await
        .unwrap();
    assert!(archived_twice.is_some());
}
