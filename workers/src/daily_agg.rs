use householdiq_core::task::service::{AsyncService, AsyncServiceFuture};
use householdiq_core::task::tick::{TickReason, TickService};
use householdiq_core::time::unix_now;
use householdiq_core::{debug, trace, warn};
use householdiq_kvcache::{CacheResult, DailyAggRecord, DynKvCache, KvCache};
use householdiq_privacy::apply_differential_privacy;
use householdiq_store::{DailyAggregate, DynRelationalStore, RelationalStore, StoreResult};
use householdiq_utils::triggers::SingleTrigger;
use std::sync::Arc;
use std::time::Duration;

pub const DAILY_FLUSH_INTERVAL: Duration = Duration::from_secs(3600);

const SERVICE_NAME: &str = "daily-agg-flush-service";

/// Hourly flush of the coalesced daily-aggregate counters into the relational
/// store. A record is removed from the cache only after its flush succeeded;
/// failed dates stay buffered for the next pass.
pub struct DailyAggFlushService {
    store: DynRelationalStore,
    cache: DynKvCache,
    dp_enabled: bool,
    noise_epsilon: f64,
    tick_service: Arc<TickService>,
    flush_interval: Duration,
    shutdown: SingleTrigger,
}

impl DailyAggFlushService {
    pub fn new(
        store: DynRelationalStore,
        cache: DynKvCache,
        dp_enabled: bool,
        noise_epsilon: f64,
        tick_service: Arc<TickService>,
        flush_interval: Duration,
    ) -> Self {
        Self { store, cache, dp_enabled, noise_epsilon, tick_service, flush_interval, shutdown: SingleTrigger::default() }
    }

    pub async fn worker(&self) {
        loop {
            let shutdown = self.shutdown.listener.clone();
            tokio::select! {
                biased;
                _ = shutdown => break,
                reason = self.tick_service.tick(self.flush_interval) => {
                    if let TickReason::Shutdown = reason {
                        break;
                    }
                    if let Err(err) = self.flush_once().await {
                        warn!("daily aggregate flush failed: {err}");
                    }
                }
            }
        }
        trace!("{SERVICE_NAME} worker exiting");
    }

    /// One pass over every buffered date record
    pub async fn flush_once(&self) -> CacheResult<()> {
        let records = self.cache.daily_records().await?;
        if records.is_empty() {
            return Ok(());
        }
        debug!("flushing {} daily aggregate records", records.len());

        for record in records {
            match self.flush_record(&record).await {
                Ok(()) => self.cache.remove_daily(&record.date).await?,
                Err(err) => warn!("flushing daily aggregates for {} failed, keeping them buffered: {err}", record.date),
            }
        }
        Ok(())
    }

    async fn flush_record(&self, record: &DailyAggRecord) -> StoreResult<()> {
        for (field_key, count) in &record.counts {
            let mut parts = field_key.splitn(3, '|');
            let (Some(partner), Some(device_type), Some(event_type)) = (parts.next(), parts.next(), parts.next()) else {
                warn!("malformed daily aggregate field key: {field_key}");
                continue;
            };
            let Ok(partner_id) = partner.parse() else {
                warn!("non-numeric partner id in daily aggregate field key: {field_key}");
                continue;
            };

            let count = if self.dp_enabled { apply_differential_privacy(*count as f64, self.noise_epsilon) } else { *count as f64 };
            self.store
                .upsert_daily_aggregate(DailyAggregate {
                    date: record.date.clone(),
                    partner_id,
                    device_type: device_type.to_string(),
                    event_type: event_type.to_string(),
                    count,
                    last_updated: unix_now(),
                })
                .await?;
        }
        Ok(())
    }
}

impl AsyncService for DailyAggFlushService {
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
