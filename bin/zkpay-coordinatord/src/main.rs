use std::{sync::Arc, time::Duration};

use tokio::{runtime::Handle, sync::mpsc};
use tracing::*;
use zkpay_bus::memory::MemoryBus;
use zkpay_common::logging;
use zkpay_config::Config;
use zkpay_coordinator::{
    prover::{prover_intake_task, ProverOutcome},
    spawn_event_workers, DispatchMetrics, EventContext, StatusChannel,
};
use zkpay_db::{
    database::init_coordinator_db,
    rocksdb::{open_rocksdb_database, DbOpsConfig},
};
use zkpay_primitives::token::TokenKeyRegistry;
use zkpay_push::{Notifier, PushFabric};
use zkpay_storage::create_coordinator_storage;
use zkpay_tasks::TaskManager;

use crate::args::Args;

mod args;

const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);
const PROVER_OUTCOME_BUFFER: usize = 64;

fn main() -> anyhow::Result<()> {
    let args: Args = argh::from_env();
    if let Err(e) = main_inner(args) {
        eprintln!("FATAL ERROR: {e}");
        return Err(e);
    }
    Ok(())
}

fn main_inner(args: Args) -> anyhow::Result<()> {
    let config = load_config(&args)?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("zkpay-rt")
        .build()
        .expect("init: build rt");
    let task_manager = TaskManager::new(runtime.handle().clone());
    let executor = task_manager.executor();

    init_logging(executor.handle());

    // Blocking pool for repository calls.
    let pool = threadpool::ThreadPool::with_name(
        "zkpay-pool".to_owned(),
        config.coordinator.pool_threads,
    );

    // Open and initialize rocksdb.
    let rbdb = open_rocksdb_database(&config.coordinator.datadir)?;
    let ops_config = DbOpsConfig::new(config.coordinator.db_retry_count);
    let database = init_coordinator_db(rbdb, ops_config);
    let storage = Arc::new(create_coordinator_storage(database, pool));

    // The token registry must exist before any dispatcher task starts; a
    // DepositRecorded handler running without it would drop deposits.
    let tokens = Arc::new(TokenKeyRegistry::from_symbols(&config.tokens.symbols));
    info!(symbols = tokens.len(), "token key registry initialized");

    let fabric = Arc::new(PushFabric::new());
    let notifier = Arc::new(Notifier::with_fabric(storage.clone(), fabric.clone()));

    let ctx = Arc::new(EventContext::new(storage, notifier, tokens));
    let metrics = Arc::new(DispatchMetrics::new());
    let status = StatusChannel::new();

    // The transport adapter hands these to the external bus / prover; the
    // in-process bus serves single-node deployments.
    let bus = Arc::new(MemoryBus::with_max_redelivery(
        config.dispatcher.max_redelivery,
    ));
    let (_prover_tx, prover_rx) = mpsc::channel::<ProverOutcome>(PROVER_OUTCOME_BUFFER);

    info!("init finished, starting main tasks");

    {
        let ctx = ctx.clone();
        let metrics = metrics.clone();
        let status = status.clone();
        let bus = bus.clone();
        let executor2 = executor.clone();
        runtime.block_on(async move {
            spawn_event_workers(&executor2, bus.as_ref(), ctx, metrics, status).await
        })?;
    }

    {
        let ctx = ctx.clone();
        executor.spawn_critical_async("prover-intake", move |shutdown| {
            prover_intake_task(shutdown, prover_rx, ctx)
        });
    }

    task_manager.start_signal_listeners();
    task_manager.monitor(Some(SHUTDOWN_GRACE))?;

    logging::finalize();
    info!("exiting");
    Ok(())
}

fn load_config(args: &Args) -> anyhow::Result<Config> {
    let raw = std::fs::read_to_string(&args.config)
        .map_err(|e| anyhow::anyhow!("read config {}: {e}", args.config.display()))?;
    let mut config = Config::from_str(&raw)
        .map_err(|e| anyhow::anyhow!("parse config {}: {e}", args.config.display()))?;

    if let Some(datadir) = &args.datadir {
        config.coordinator.datadir = datadir.clone();
    }
    if config.tokens.symbols.is_empty() {
        anyhow::bail!("config lists no token symbols");
    }
    if config.chains.is_empty() {
        anyhow::bail!("config lists no chains");
    }
    Ok(config)
}

/// Sets up the logging system given a handle to a runtime context to
/// possibly start the OTLP output on.
fn init_logging(rt: &Handle) {
    let mut lconfig = logging::LoggerConfig::with_base_name("zkpay-coordinatord");

    let otlp_url = logging::get_otlp_url_from_env();
    if let Some(url) = &otlp_url {
        lconfig.set_otlp_url(url.clone());
    }

    {
        // The OTLP pipeline needs a runtime context to install from.
        let _g = rt.enter();
        logging::init(lconfig);
    }

    if let Some(url) = &otlp_url {
        info!(%url, "using OpenTelemetry tracing output");
    }
}
