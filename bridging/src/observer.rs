use householdiq_identity_core::EventId;
use householdiq_utils::channel::Channel;
use std::sync::Arc;

/// Context handed to observers after a pair was linked and published
#[derive(Debug, Clone)]
pub struct BridgingUpdate {
    pub event_id: EventId,
    pub ephem_id: String,
    pub other_ephem_id: String,
    pub household_id: String,
    pub score: f64,
}

/// The single extension hook the engine exposes. Loading and enablement of
/// concrete observers belongs to the hosting process.
pub trait BridgingObserver: Send + Sync {
    fn on_bridging_update(&self, update: &BridgingUpdate);
}

pub type DynBridgingObserver = Arc<dyn BridgingObserver>;

/// Forwards updates into a channel for hosts that consume them asynchronously
#[derive(Clone, Default)]
pub struct ChannelObserver {
    channel: Channel<BridgingUpdate>,
}

impl ChannelObserver {
    pub fn new() -> Self {
        Self { channel: Channel::unbounded() }
    }

    pub fn channel(&self) -> &Channel<BridgingUpdate> {
        &self.channel
    }
}

impl BridgingObserver for ChannelObserver {
    fn on_bridging_update(&self, update: &BridgingUpdate) {
        // A full or closed consumer never back-pressures the bridging path
        let _ = self.channel.try_send(update.clone());
    }
}
