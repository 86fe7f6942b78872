use std::sync::Arc;

use householdiq_bridging::{BridgingEngine, BridgingOptions};
use householdiq_core::core::Core;
use householdiq_core::log::init_logger;
use householdiq_core::panic::configure_panic;
use householdiq_core::signals::Signals;
use householdiq_core::task::runtime::AsyncRuntime;
use householdiq_core::task::tick::TickService;
use householdiq_core::{info, trace, warn};
use householdiq_graph::{DynGraphStore, MemoryGraphStore};
use householdiq_kvcache::{DynKvCache, MemoryKvCache};
use householdiq_store::{DynRelationalStore, MemoryRelationalStore};
use householdiq_workers::{DailyAggFlushService, FuzzyBridgeService, GraphPruneService, DAILY_FLUSH_INTERVAL, FUZZY_DRAIN_INTERVAL};

mod args;
mod settings;
mod update_logger;

use args::Args;
use settings::Settings;
use update_logger::UpdateLoggerService;

pub fn main() {
    let args = Args::parse();
    init_logger(args.logdir.as_deref(), &args.log_level);
    configure_panic();

    let settings = Settings::from_env();
    info!("householdiqd v{} starting", env!("CARGO_PKG_VERSION"));
    info!("retention window: {} days", settings.data_retention_days);
    info!("graph bridging: {}, prune: {}, dp mode: {}", settings.use_graph_bridging, settings.prune_enabled, settings.dp_mode_enabled);
    info!("reporting floor: k >= {}, epsilon {}", settings.privacy_min_threshold, settings.privacy_noise_epsilon);
    if settings.debug {
        warn!("debug mode enabled, test partner ids 1..=10 are accepted without rows");
    }
    if settings.neo4j_password.is_empty() {
        warn!("empty graph password configured");
    }
    trace!("collaborator endpoints: db={}, kv={}:{}, graph={} (as {}), mq={}",
        settings.database_url, settings.aerospike_host, settings.aerospike_port, settings.neo4j_uri, settings.neo4j_user,
        settings.rabbitmq_host);

    // The networked collaborators behind those endpoints are attached by the
    // deployment; this process runs on the in-tree backends.
    let store: DynRelationalStore = Arc::new(MemoryRelationalStore::new());
    let cache: DynKvCache = Arc::new(MemoryKvCache::new(settings.retention()));
    let graph: DynGraphStore = Arc::new(MemoryGraphStore::new());

    let engine = Arc::new(BridgingEngine::new(
        store.clone(),
        cache.clone(),
        graph.clone(),
        BridgingOptions {
            global_salt: settings.global_salt.clone(),
            default_threshold: settings.bridging_confidence_threshold,
            retention: settings.retention(),
            graph_bridging_enabled: settings.use_graph_bridging,
            ..Default::default()
        },
    ));

    let update_logger = Arc::new(UpdateLoggerService::new());
    engine.register_observer(update_logger.observer());

    let core = Arc::new(Core::new());
    let signals = Arc::new(Signals::new(core.clone()));
    signals.init();

    let tick_service = Arc::new(TickService::new());
    let runtime = Arc::new(match args.worker_threads {
        Some(threads) => AsyncRuntime::new(threads),
        None => AsyncRuntime::default(),
    });
    runtime.register(tick_service.clone());
    runtime.register(Arc::new(FuzzyBridgeService::new(
        engine.clone(),
        store.clone(),
        cache.clone(),
        tick_service.clone(),
        FUZZY_DRAIN_INTERVAL,
    )));
    runtime.register(Arc::new(DailyAggFlushService::new(
        store.clone(),
        cache.clone(),
        settings.dp_mode_enabled,
        settings.privacy_noise_epsilon,
        tick_service.clone(),
        DAILY_FLUSH_INTERVAL,
    )));
    if settings.prune_enabled {
        runtime.register(Arc::new(GraphPruneService::new(graph.clone(), settings.retention(), tick_service.clone())));
    }
    runtime.register(update_logger);

    core.bind(runtime);
    core.run();

    info!("householdiqd is finished");
}
