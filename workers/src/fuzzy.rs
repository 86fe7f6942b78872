use householdiq_bridging::{BridgingEngine, BridgingParams, BridgingResult};
use householdiq_core::task::service::{AsyncService, AsyncServiceFuture};
use householdiq_core::task::tick::{TickReason, TickService};
use householdiq_core::time::unix_now;
use householdiq_core::{debug, info, trace, warn};
use householdiq_identity_core::{EphemeralEvent, EventId};
use householdiq_kvcache::{DynKvCache, KvCache};
use householdiq_store::{DynRelationalStore, RelationalStore};
use householdiq_utils::triggers::SingleTrigger;
use std::sync::Arc;
use std::time::Duration;

pub const FUZZY_DRAIN_INTERVAL: Duration = Duration::from_secs(10);

const SERVICE_NAME: &str = "fuzzy-bridge-service";

/// Drains the fuzzy queue on a ~10s cadence. Each pass loads the retention
/// window of recent events once and bridges every drained event pairwise
/// against it; per-event failures are logged and isolated. At most one
/// drainer should run per interval; a lost pop race reads an empty queue and
/// duplicate processing is safe because all merges are idempotent.
pub struct FuzzyBridgeService {
    engine: Arc<BridgingEngine>,
    store: DynRelationalStore,
    cache: DynKvCache,
    tick_service: Arc<TickService>,
    drain_interval: Duration,
    shutdown: SingleTrigger,
}

impl FuzzyBridgeService {
    pub fn new(
        engine: Arc<BridgingEngine>,
        store: DynRelationalStore,
        cache: DynKvCache,
        tick_service: Arc<TickService>,
        drain_interval: Duration,
    ) -> Self {
        Self { engine, store, cache, tick_service, drain_interval, shutdown: SingleTrigger::default() }
    }

    pub async fn worker(&self) {
        loop {
            let shutdown = self.shutdown.listener.clone();
            tokio::select! {
                biased;
                _ = shutdown => break,
                reason = self.tick_service.tick(self.drain_interval) => {
                    if let TickReason::Shutdown = reason {
                        break;
                    }
                    if let Err(err) = self.drain_once().await {
                        warn!("fuzzy batch drain failed: {err}");
                    }
                }
            }
        }
        trace!("{SERVICE_NAME} worker exiting");
    }

    /// One drain pass over the whole queue
    pub async fn drain_once(&self) -> BridgingResult<()> {
        let batch = self.cache.pop_fuzzy_batch().await?;
        if batch.is_empty() {
            return Ok(());
        }
        info!("fuzzy bridging batch of {} events", batch.len());

        let cutoff = unix_now().saturating_sub(self.engine.options().retention.as_millis() as u64);
        let recent = self.store.events_since(cutoff).await?;
        let params = self.engine.resolve_params().await;

        for event_id in batch {
            if let Err(err) = self.process_event(event_id, cutoff, &recent, &params).await {
                warn!("fuzzy bridging failed for event {event_id}: {err}");
            }
        }
        Ok(())
    }

    async fn process_event(
        &self,
        event_id: EventId,
        cutoff: u64,
        recent: &[EphemeralEvent],
        params: &BridgingParams,
    ) -> BridgingResult<()> {
        let Some(event) = self.store.event(event_id).await? else {
            warn!("no ephemeral event found for queued id {event_id}");
            return Ok(());
        };
        if event.timestamp < cutoff {
            debug!("event {event_id} fell out of the retention window");
            return Ok(());
        }
        if !event.consent.cross_device_bridging || event.child_flagged() {
            return Ok(());
        }

        self.engine.merge_event_node(&event).await?;
        for other in recent {
            self.engine.fuzzy_bridge(&event, other, params).await?;
        }
        debug!("fuzzy bridging complete for event {event_id}");
        Ok(())
    }
}

impl AsyncService for FuzzyBridgeService {
    fn ident(self: Arc<Self>) -> &'static str {
        SERVICE_NAME
    }

    fn start(self: Arc<Self>) -> AsyncServiceFuture {
        trace!("{} starting", SERVICE_NAME);
        Box::pin(async move {
            self.worker().await;
            Ok(())
        })
    }

    fn signal_exit(self: Arc<Self>) {
        trace!("sending an exit signal to {}", SERVICE_NAME);
        self.shutdown.trigger.trigger();
    }

    fn stop(self: Arc<Self>) -> AsyncServiceFuture {
        Box::pin(async move {
            trace!("{} stopped", SERVICE_NAME);
            Ok(())
        })
    }
}
