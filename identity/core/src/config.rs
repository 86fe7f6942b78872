use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const DEFAULT_BRIDGING_THRESHOLD: f64 = 0.7;
pub const DEFAULT_TIME_DECAY_FACTOR: f64 = 0.5;

/// Weights used when the latest BridgingConfig row carries none
pub fn default_partial_key_weights() -> HashMap<String, f64> {
    [("hashedEmail", 1.0), ("hashedIP", 0.9), ("wifiSSID", 0.3), ("deviceType", 0.2), ("profileID", 0.2)]
        .into_iter()
        .map(|(k, w)| (k.to_string(), w))
        .collect()
}

/// Operator-tunable bridging parameters. The latest row by `last_updated` is
/// authoritative; the threshold is overridden by a published ML threshold.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BridgingConfig {
    pub threshold: Option<f64>,
    pub partial_key_weights: Option<HashMap<String, f64>>,
    pub time_decay_factor: Option<f64>,
    /// Milliseconds since UNIX epoch
    pub last_updated: u64,
}

/// A threshold published by the (out-of-scope) retraining job; the engine
/// only ever reads the latest row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MlBridgingThreshold {
    pub model_version: String,
    pub threshold_value: f64,
    /// Milliseconds since UNIX epoch
    pub last_trained: u64,
}
