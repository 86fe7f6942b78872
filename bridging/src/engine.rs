use crate::errors::BridgingResult;
use crate::linker::GraphLinker;
use crate::observer::{BridgingUpdate, DynBridgingObserver};
use crate::params::{resolve_bridging_params, BridgingParams};
use crate::scorer::compute_confidence;
use crate::tokens::TokenSigner;
use householdiq_core::{debug, warn};
use householdiq_graph::{DynGraphStore, GraphStore};
use householdiq_identity_core::{EphemeralEvent, EventId, DEFAULT_BRIDGING_THRESHOLD};
use householdiq_kvcache::{DynKvCache, KvCache};
use householdiq_store::{DynRelationalStore, RelationalStore};
use parking_lot::RwLock;
use serde::Serialize;
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Why bridging was suppressed for an event, surfaced verbatim to partners
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum BridgingSkipReason {
    #[serde(rename = "NO_CONSENT_OR_FLAGS")]
    NoConsentOrFlags,
    #[serde(rename = "CHILD_FLAG")]
    ChildFlag,
}

impl BridgingSkipReason {
    pub const fn as_str(&self) -> &'static str {
        match self {
            BridgingSkipReason::NoConsentOrFlags => "NO_CONSENT_OR_FLAGS",
            BridgingSkipReason::ChildFlag => "CHILD_FLAG",
        }
    }
}

impl Display for BridgingSkipReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeStatus {
    /// Deterministic short-circuit completed inline
    Done,
    /// Queued for the fuzzy batch worker
    Queued,
    Skipped(BridgingSkipReason),
}

#[derive(Debug, Clone)]
pub struct BridgeOutcome {
    pub status: BridgeStatus,
    pub household_id: Option<String>,
    pub bridging_token: Option<String>,
}

impl BridgeOutcome {
    fn skipped(reason: BridgingSkipReason) -> Self {
        Self { status: BridgeStatus::Skipped(reason), household_id: None, bridging_token: None }
    }

    pub fn skip_reason(&self) -> Option<BridgingSkipReason> {
        match self.status {
            BridgeStatus::Skipped(reason) => Some(reason),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BridgingOptions {
    pub global_salt: String,
    pub default_threshold: f64,
    /// Events older than this are ineligible for bridging
    pub retention: Duration,
    /// USE_NEO4J_BRIDGING: disables all graph work when false
    pub graph_bridging_enabled: bool,
    pub token_secret: String,
}

impl Default for BridgingOptions {
    fn default() -> Self {
        Self {
            global_salt: "SUPER_SECURE_SALT".to_string(),
            default_threshold: DEFAULT_BRIDGING_THRESHOLD,
            retention: Duration::from_secs(30 * 24 * 3600),
            graph_bridging_enabled: true,
            token_secret: "HOUSEHOLDIQ_TOKEN_SECRET".to_string(),
        }
    }
}

/// Orchestrates gate checks, scoring, graph merges and household publication
/// for one event. Holds no mutable state beyond the shared clients, so a
/// single engine serves all ingest workers and the batch drainer.
pub struct BridgingEngine {
    store: DynRelationalStore,
    cache: DynKvCache,
    graph: DynGraphStore,
    linker: GraphLinker,
    signer: TokenSigner,
    options: BridgingOptions,
    observers: RwLock<Vec<DynBridgingObserver>>,
}

impl BridgingEngine {
    pub fn new(store: DynRelationalStore, cache: DynKvCache, graph: DynGraphStore, options: BridgingOptions) -> Self {
        let linker = GraphLinker::new(graph.clone(), cache.clone(), options.global_salt.clone());
        let signer = TokenSigner::new(options.token_secret.clone());
        Self { store, cache, graph, linker, signer, options, observers: RwLock::new(Vec::new()) }
    }

    pub fn register_observer(&self, observer: DynBridgingObserver) {
        self.observers.write().push(observer);
    }

    pub fn options(&self) -> &BridgingOptions {
        &self.options
    }

    pub fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    /// Routes one persisted event: consent and child gates first, then the
    /// deterministic short-circuit when a hashed email is present, otherwise
    /// the fuzzy queue.
    pub async fn bridge(&self, event: &EphemeralEvent) -> BridgingResult<BridgeOutcome> {
        if !event.consent.cross_device_bridging {
            debug!("skipping bridging for event {}: no cross_device_bridging", event.id);
            return Ok(BridgeOutcome::skipped(BridgingSkipReason::NoConsentOrFlags));
        }
        if event.child_flagged() {
            debug!("skipping bridging for event {}: child flag", event.id);
            return Ok(BridgeOutcome::skipped(BridgingSkipReason::ChildFlag));
        }

        match event.hashed_email() {
            Some(email) => {
                let email = email.to_string();
                self.bridge_deterministic(event, &email).await
            }
            None => {
                self.cache.enqueue_fuzzy(event.id).await?;
                debug!("enqueued event {} for fuzzy bridging", event.id);
                Ok(BridgeOutcome { status: BridgeStatus::Queued, household_id: None, bridging_token: None })
            }
        }
    }

    /// Short-circuit path: bridge against every event already indexed under
    /// the hashed email, then index this one and issue a token if a household
    /// was published.
    async fn bridge_deterministic(&self, event: &EphemeralEvent, email: &str) -> BridgingResult<BridgeOutcome> {
        if self.options.graph_bridging_enabled {
            let params = self.resolve_params().await;
            self.graph.merge_event(event).await?;
            for prior_id in self.cache.email_events(email).await? {
                if let Err(err) = self.bridge_against(event, prior_id, &params).await {
                    warn!("bridging event {} against indexed event {} failed: {}", event.id, prior_id, err);
                }
            }
        }
        // The event becomes visible to later lookups only after its own
        // bridging attempt, so it never pairs with itself
        self.cache.index_email(email, event.id).await?;

        let household_id = self.cache.get_household_ref(&event.ephem_id).await?;
        let bridging_token = match household_id.as_deref() {
            Some(household) => Some(self.signer.issue(&event.ephem_id, household)?),
            None => None,
        };
        Ok(BridgeOutcome { status: BridgeStatus::Done, household_id, bridging_token })
    }

    async fn bridge_against(&self, event: &EphemeralEvent, prior_id: EventId, params: &BridgingParams) -> BridgingResult<()> {
        let Some(prior) = self.store.event(prior_id).await? else {
            debug!("indexed event {prior_id} is gone from the event store");
            return Ok(());
        };
        self.fuzzy_bridge(event, &prior, params).await
    }

    /// Merges the `Event` node ahead of pairwise bridging. The batch worker
    /// calls this once per drained event.
    pub async fn merge_event_node(&self, event: &EphemeralEvent) -> BridgingResult<()> {
        if self.options.graph_bridging_enabled {
            self.graph.merge_event(event).await?;
        }
        Ok(())
    }

    pub async fn resolve_params(&self) -> BridgingParams {
        resolve_bridging_params(&self.store, self.options.default_threshold).await
    }

    /// Scores the pair and, at or above threshold, applies the derivation
    /// rules and publishes the household references. Consent-less, child and
    /// self pairs are skipped silently.
    pub async fn fuzzy_bridge(&self, event: &EphemeralEvent, other: &EphemeralEvent, params: &BridgingParams) -> BridgingResult<()> {
        if other.id == event.id {
            return Ok(());
        }
        if !other.consent.cross_device_bridging {
            return Ok(());
        }
        if event.child_flagged() || other.child_flagged() {
            return Ok(());
        }
        if !self.options.graph_bridging_enabled {
            debug!("graph bridging disabled by config");
            return Ok(());
        }

        let score = compute_confidence(
            &event.partial_keys,
            &other.partial_keys,
            event.timestamp,
            other.timestamp,
            &params.weights,
            params.time_decay_factor,
        );
        if score < params.threshold {
            return Ok(());
        }

        let outcome = self.linker.apply(event, other, score).await?;
        self.notify(&BridgingUpdate {
            event_id: event.id,
            ephem_id: event.ephem_id.clone(),
            other_ephem_id: other.ephem_id.clone(),
            household_id: outcome.household_a,
            score,
        });
        Ok(())
    }

    fn notify(&self, update: &BridgingUpdate) {
        for observer in self.observers.read().iter() {
            observer.on_bridging_update(update);
        }
    }
}
