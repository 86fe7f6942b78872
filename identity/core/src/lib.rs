pub mod config;
pub mod consent;
pub mod event;
pub mod fuzzy;
pub mod partial_keys;

pub use config::{
    default_partial_key_weights, BridgingConfig, MlBridgingThreshold, DEFAULT_BRIDGING_THRESHOLD, DEFAULT_TIME_DECAY_FACTOR,
};
pub use consent::ConsentFlags;
pub use event::{EphemeralEvent, EventId, EventType, PartnerId};
pub use partial_keys::{PartialKey, PartialKeys};
