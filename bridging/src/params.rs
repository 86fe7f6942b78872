use householdiq_identity_core::{default_partial_key_weights, DEFAULT_TIME_DECAY_FACTOR};
use householdiq_store::{DynRelationalStore, RelationalStore};
use log::warn;
use std::collections::HashMap;

/// Resolved scoring parameters for one bridging pass
#[derive(Debug, Clone)]
pub struct BridgingParams {
    pub threshold: f64,
    pub weights: HashMap<String, f64>,
    pub time_decay_factor: f64,
}

/// Resolves the effective parameters: the ML-published threshold wins over the
/// latest config row, which wins over `default_threshold`; weights and decay
/// come from the config row or the built-in defaults. Store failures degrade
/// to the defaults so a config outage never stalls bridging.
pub async fn resolve_bridging_params(store: &DynRelationalStore, default_threshold: f64) -> BridgingParams {
    let config = match store.latest_bridging_config().await {
        Ok(config) => config,
        Err(err) => {
            warn!("failed reading bridging config, using defaults: {err}");
            None
        }
    };
    let ml_threshold = match store.latest_ml_threshold().await {
        Ok(threshold) => threshold,
        Err(err) => {
            warn!("failed reading ML threshold, using config/default: {err}");
            None
        }
    };

    let threshold = ml_threshold
        .map(|row| row.threshold_value)
        .or_else(|| config.as_ref().and_then(|config| config.threshold))
        .unwrap_or(default_threshold);
    let weights = config.as_ref().and_then(|config| config.partial_key_weights.clone()).unwrap_or_else(default_partial_key_weights);
    let time_decay_factor = config.as_ref().and_then(|config| config.time_decay_factor).unwrap_or(DEFAULT_TIME_DECAY_FACTOR);

    BridgingParams { threshold, weights, time_decay_factor }
}

#[cfg(test)]
mod tests {
    use super::*;
    use householdiq_identity_core::{BridgingConfig, MlBridgingThreshold, DEFAULT_BRIDGING_THRESHOLD};
    use householdiq_store::{MemoryRelationalStore, RelationalStore};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_defaults_without_rows() {
        let store: DynRelationalStore = Arc::new(MemoryRelationalStore::new());
        let params = resolve_bridging_params(&store, DEFAULT_BRIDGING_THRESHOLD).await;
        assert_eq!(params.threshold, DEFAULT_BRIDGING_THRESHOLD);
        assert_eq!(params.time_decay_factor, DEFAULT_TIME_DECAY_FACTOR);
        assert_eq!(params.weights["hashedEmail"], 1.0);
        assert_eq!(params.weights["hashedIP"], 0.9);
    }

    #[tokio::test]
    async fn test_config_row_overrides_default() {
        let memory = Arc::new(MemoryRelationalStore::new());
        memory
            .put_bridging_config(BridgingConfig {
                threshold: Some(0.55),
                time_decay_factor: Some(0.8),
                last_updated: 1,
                ..Default::default()
            })
            .await
            .unwrap();
        let store: DynRelationalStore = memory;
        let params = resolve_bridging_params(&store, DEFAULT_BRIDGING_THRESHOLD).await;
        assert_eq!(params.threshold, 0.55);
        assert_eq!(params.time_decay_factor, 0.8);
    }

    #[tokio::test]
    async fn test_ml_threshold_wins() {
        let memory = Arc::new(MemoryRelationalStore::new());
        memory.put_bridging_config(BridgingConfig { threshold: Some(0.55), last_updated: 1, ..Default::default() }).await.unwrap();
        memory
            .publish_ml_threshold(MlBridgingThreshold { model_version: "v2".into(), threshold_value: 0.65, last_trained: 2 })
            .await
            .unwrap();
        let store: DynRelationalStore = memory;
        let params = resolve_bridging_params(&store, DEFAULT_BRIDGING_THRESHOLD).await;
        assert_eq!(params.threshold, 0.65);
    }
}
