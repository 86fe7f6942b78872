//! The authoritative relational contract: event rows, partners, bridging
//! configuration, daily aggregates, frequency capping and the supplementary
//! compliance tables. The production driver is an external collaborator;
//! the in-tree memory backend implements the same semantics for the daemon
//! default and for tests.

mod errors;
mod memory;
mod types;

pub use errors::{StoreError, StoreResult};
pub use memory::MemoryRelationalStore;
pub use types::*;

use async_trait::async_trait;
use householdiq_identity_core::{BridgingConfig, EphemeralEvent, EventId, MlBridgingThreshold, PartnerId};
use std::sync::Arc;

/// The relational contract consumed by the bridging engine, the workers and
/// the serving operations. Implementations over a networked database must
/// bound every call with a timeout.
#[async_trait]
pub trait RelationalStore: Send + Sync {
    async fn partner(&self, partner_id: PartnerId) -> StoreResult<Option<Partner>>;
    async fn create_partner(&self, name: &str, salt: &str) -> StoreResult<Partner>;

    /// Persists the event row, assigning the next monotonic id
    async fn insert_event(&self, event: NewEvent) -> StoreResult<EphemeralEvent>;
    async fn event(&self, id: EventId) -> StoreResult<Option<EphemeralEvent>>;
    /// Event rows with `timestamp >= cutoff`, ordered by id
    async fn events_since(&self, cutoff: u64) -> StoreResult<Vec<EphemeralEvent>>;

    /// Latest bridging-config row by `last_updated`
    async fn latest_bridging_config(&self) -> StoreResult<Option<BridgingConfig>>;
    async fn put_bridging_config(&self, config: BridgingConfig) -> StoreResult<()>;
    /// Latest published ML threshold by `last_trained`
    async fn latest_ml_threshold(&self) -> StoreResult<Option<MlBridgingThreshold>>;
    async fn publish_ml_threshold(&self, threshold: MlBridgingThreshold) -> StoreResult<()>;

    /// Upsert keyed by `(date, partner, device, event)`
    async fn upsert_daily_aggregate(&self, row: DailyAggregate) -> StoreResult<()>;
    async fn daily_aggregates_in_range(&self, start_date: &str, end_date: &str) -> StoreResult<Vec<DailyAggregate>>;

    /// Returns the capping row, creating it with the default limit if absent
    async fn frequency_cap(&self, household_id: &str) -> StoreResult<FrequencyCap>;
    /// Counts one impression, creating the row first if absent
    async fn increment_frequency_cap(&self, household_id: &str) -> StoreResult<FrequencyCap>;

    async fn insert_anonymized_event(&self, row: AnonymizedEvent) -> StoreResult<()>;
    async fn record_consent_revocation(&self, ephem_id: &str) -> StoreResult<()>;
    async fn record_attribution_journey(&self, journey: AttributionJourney) -> StoreResult<()>;
    async fn insert_lookalike_segment(&self, segment: LookalikeSegment) -> StoreResult<()>;
}

pub type DynRelationalStore = Arc<dyn RelationalStore>;
