use householdiq_bridging::{ChannelObserver, DynBridgingObserver};
use householdiq_core::task::service::{AsyncService, AsyncServiceFuture};
use householdiq_core::{info, trace};
use householdiq_utils::triggers::SingleTrigger;
use std::sync::Arc;

const SERVICE_NAME: &str = "bridging-update-logger";

/// Consumes the engine's observer channel and logs each published linkage
pub struct UpdateLoggerService {
    observer: Arc<ChannelObserver>,
    shutdown: SingleTrigger,
}

impl UpdateLoggerService {
    pub fn new() -> Self {
        Self { observer: Arc::new(ChannelObserver::new()), shutdown: SingleTrigger::default() }
    }

    pub fn observer(&self) -> DynBridgingObserver {
        self.observer.clone()
    }

    pub async fn worker(&self) {
        let receiver = self.observer.channel().receiver();
        loop {
            let shutdown = self.shutdown.listener.clone();
            tokio::select! {
                biased;
                _ = shutdown => break,
                update = receiver.recv() => match update {
                    Ok(update) => info!(
                        "bridged {} with {} into household {} (score {:.3})",
                        update.ephem_id, update.other_ephem_id, update.household_id, update.score
                    ),
                    Err(_) => break,
                }
            }
        }
        trace!("{SERVICE_NAME} worker exiting");
    }
}

impl Default for UpdateLoggerService {
    fn default() -> Self {
        Self::new()
    }
}

impl AsyncService for UpdateLoggerService {
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
        self.observer.channel().close();
    }

    fn stop(self: Arc<Self>) -> AsyncServiceFuture {
        Box::pin(async move {
            trace!("{} stopped", SERVICE_NAME);
            Ok(())
        })
    }
}
