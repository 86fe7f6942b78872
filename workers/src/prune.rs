use chrono::{DateTime, Utc};
use householdiq_core::task::service::{AsyncService, AsyncServiceFuture};
use householdiq_core::task::tick::{TickReason, TickService};
use householdiq_core::time::unix_now;
use householdiq_core::{info, trace, warn};
use householdiq_graph::{DynGraphStore, GraphResult, GraphStore};
use householdiq_utils::triggers::SingleTrigger;
use std::sync::Arc;
use std::time::Duration;

const SERVICE_NAME: &str = "graph-prune-service";

/// UTC hour at which the daily prune fires
const PRUNE_HOUR_UTC: u32 = 3;

/// Daily detach-delete of `Event` nodes older than the retention window.
/// Scheduled for 03:00 UTC; the hosting process registers this service only
/// when pruning is enabled.
pub struct GraphPruneService {
    graph: DynGraphStore,
    retention: Duration,
    tick_service: Arc<TickService>,
    shutdown: SingleTrigger,
}

impl GraphPruneService {
    pub fn new(graph: DynGraphStore, retention: Duration, tick_service: Arc<TickService>) -> Self {
        Self { graph, retention, tick_service, shutdown: SingleTrigger::default() }
    }

    pub async fn worker(&self) {
        loop {
            let wait = duration_until_next_prune(Utc::now());
            trace!("{SERVICE_NAME}: next prune in {}s", wait.as_secs());
            let shutdown = self.shutdown.listener.clone();
            tokio::select! {
                biased;
                _ = shutdown => break,
                reason = self.tick_service.tick(wait) => {
                    if let TickReason::Shutdown = reason {
                        break;
                    }
                    if let Err(err) = self.prune_once().await {
                        warn!("graph prune failed: {err}");
                    }
                }
            }
        }
        trace!("{SERVICE_NAME} worker exiting");
    }

    pub async fn prune_once(&self) -> GraphResult<()> {
        let cutoff = unix_now().saturating_sub(self.retention.as_millis() as u64);
        let deleted = self.graph.prune_events_before(cutoff).await?;
        info!("pruned {deleted} event nodes older than the retention window");
        Ok(())
    }
}

/// Time left until the next 03:00 UTC
fn duration_until_next_prune(now: DateTime<Utc>) -> Duration {
    let today_at = now.date_naive().and_hms_opt(PRUNE_HOUR_UTC, 0, 0).expect("a valid wall-clock time").and_utc();
    let next = if now < today_at { today_at } else { today_at + chrono::Duration::days(1) };
    (next - now).to_std().unwrap_or_default()
}

impl AsyncService for GraphPruneService {
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
