// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wires every subsystem together, the way the teacher's
//! `lifecycle::startup` builds a `ListenCtx`: create the state directory,
//! open storage and the broker, build the registry, start every background
//! task, and hand back an [`AppState`] plus their join handles.

use std::sync::Arc;

use ff_broker::WalBroker;
use ff_core::QueueName;
use ff_engine::{CancellationRegistry, EventBus, Orchestrator, WorkerPool, DEFAULT_TICK};
use ff_realtime::RealtimeHub;
use ff_registry::{Registry, ReloadWatcher};
use ff_storage::Storage;
use ff_webhook::{WebhookDeliveryHandler, WebhookDispatcher};
use tokio::task::JoinHandle;
use tracing::info;

use crate::config::Config;
use crate::flow_sync::FlowSync;
use crate::state::AppState;

pub struct Daemon {
    pub state: AppState,
    /// Background tasks kept alive for the process lifetime; dropping this
    /// vector would abort them.
    pub tasks: Vec<JoinHandle<()>>,
    /// Handler-directory watchers; dropping one stops its watch.
    pub watchers: Vec<ReloadWatcher>,
}

pub fn build(config: Config) -> Result<Daemon, BuildError> {
    let state_dir = config.resolve_state_dir();
    std::fs::create_dir_all(&state_dir).map_err(BuildError::Io)?;

    let storage = Storage::open(config.snapshot_path()).map_err(BuildError::Storage)?;
    let broker = WalBroker::open(&config.wal_path(), 0).map_err(BuildError::Broker)?;
    let events = EventBus::new();

    let registry = Registry::new();
    let delivery_handler = WebhookDeliveryHandler::new().map_err(BuildError::Reqwest)?;
    registry.register(Arc::new(delivery_handler));
    for name in &config.handlers.disabled {
        let _ = registry.set_disabled(name, true);
    }

    let mut tasks = Vec::new();
    let mut watchers = Vec::new();
    for dir in config.handlers.directories.clone() {
        match ReloadWatcher::spawn(dir.clone(), registry.clone()) {
            Ok(watcher) => watchers.push(watcher),
            Err(err) => tracing::warn!(%err, ?dir, "failed to watch handler directory"),
        }
    }

    let cancellations = CancellationRegistry::new();
    let orchestrator = Orchestrator::new(
        broker.clone(),
        registry.clone(),
        storage.clone(),
        events.clone(),
        cancellations.clone(),
    );

    let realtime = Arc::new(RealtimeHub::new(events.clone()));
    tasks.push(realtime.spawn_delta_tracker());

    let webhook_dispatcher = Arc::new(WebhookDispatcher::new(storage.clone(), broker.clone(), events.clone()));
    tasks.push(webhook_dispatcher.spawn());

    let flow_sync = FlowSync::new(orchestrator.clone(), events.clone());
    tasks.push(flow_sync.spawn());

    for queue_name in config.active_queues() {
        let queue = QueueName::new(queue_name.clone()).map_err(BuildError::Core)?;
        let concurrency = config.queues.concurrency_for(&queue_name);
        let pool = Arc::new(WorkerPool::new(
            queue,
            concurrency,
            broker.clone(),
            registry.clone(),
            events.clone(),
            cancellations.clone(),
        ));
        info!(queue = %queue_name, concurrency, "spawning worker pool");
        tasks.extend(pool.spawn());
    }

    let scheduler = Arc::new(orchestrator.scheduler().clone());
    tasks.push(scheduler.spawn(DEFAULT_TICK));

    let state = AppState {
        orchestrator,
        realtime,
        storage,
        config: Arc::new(config),
    };

    Ok(Daemon { state, tasks, watchers })
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("failed to prepare state directory: {0}")]
    Io(std::io::Error),
    #[error(transparent)]
    Storage(ff_storage::StorageError),
    #[error(transparent)]
    Broker(ff_broker::BrokerError),
    #[error(transparent)]
    Core(ff_core::CoreError),
    #[error("failed to build webhook delivery http client: {0}")]
    Reqwest(reqwest::Error),
}
