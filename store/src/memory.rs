use crate::{
    AnonymizedEvent, AttributionJourney, ConsentRevocation, DailyAggregate, FrequencyCap, LookalikeSegment, NewEvent, Partner,
    RelationalStore, StoreResult, DEFAULT_CAP_LIMIT,
};
use async_trait::async_trait;
use householdiq_core::time::unix_now;
use householdiq_identity_core::{BridgingConfig, EphemeralEvent, EventId, MlBridgingThreshold, PartnerId};
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};

/// In-process implementation of the relational contract
#[derive(Default)]
pub struct MemoryRelationalStore {
    next_event_id: AtomicU64,
    next_partner_id: AtomicU64,
    partners: RwLock<HashMap<PartnerId, Partner>>,
    events: RwLock<BTreeMap<EventId, EphemeralEvent>>,
    bridging_configs: RwLock<Vec<BridgingConfig>>,
    ml_thresholds: RwLock<Vec<MlBridgingThreshold>>,
    daily_aggregates: RwLock<BTreeMap<(String, PartnerId, String, String), DailyAggregate>>,
    frequency_caps: RwLock<HashMap<String, FrequencyCap>>,
    anonymized_events: RwLock<Vec<AnonymizedEvent>>,
    consent_revocations: RwLock<Vec<ConsentRevocation>>,
    attribution_journeys: RwLock<Vec<AttributionJourney>>,
    lookalike_segments: RwLock<Vec<LookalikeSegment>>,
}

impl MemoryRelationalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn anonymized_events(&self) -> Vec<AnonymizedEvent> {
        self.anonymized_events.read().clone()
    }

    pub fn consent_revocations(&self) -> Vec<ConsentRevocation> {
        self.consent_revocations.read().clone()
    }

    pub fn attribution_journeys(&self) -> Vec<AttributionJourney> {
        self.attribution_journeys.read().clone()
    }

    pub fn lookalike_segments(&self) -> Vec<LookalikeSegment> {
        self.lookalike_segments.read().clone()
    }
}

#[async_trait]
impl RelationalStore for MemoryRelationalStore {
    async fn partner(&self, partner_id: PartnerId) -> StoreResult<Option<Partner>> {
        Ok(self.partners.read().get(&partner_id).cloned())
    }

    async fn create_partner(&self, name: &str, salt: &str) -> StoreResult<Partner> {
        let id = self.next_partner_id.fetch_add(1, Ordering::SeqCst) + 1;
        let partner = Partner { id, name: name.to_string(), salt: salt.to_string(), created_at: unix_now(), namespace: None };
        self.partners.write().insert(id, partner.clone());
        Ok(partner)
    }

    async fn insert_event(&self, event: NewEvent) -> StoreResult<EphemeralEvent> {
        let id = self.next_event_id.fetch_add(1, Ordering::SeqCst) + 1;
        let row = EphemeralEvent {
            id,
            ephem_id: event.ephem_id,
            is_child: event.partial_keys.is_child,
            device_child_flag: event.partial_keys.device_child_flag,
            partial_keys: event.partial_keys,
            event_type: event.event_type,
            campaign_id: event.campaign_id,
            partner_id: event.partner_id,
            consent: event.consent,
            privacy_tcf: event.privacy_tcf,
            privacy_us: event.privacy_us,
            timestamp: event.timestamp,
        };
        self.events.write().insert(id, row.clone());
        Ok(row)
    }

    async fn event(&self, id: EventId) -> StoreResult<Option<EphemeralEvent>> {
        Ok(self.events.read().get(&id).cloned())
    }

    async fn events_since(&self, cutoff: u64) -> StoreResult<Vec<EphemeralEvent>> {
        Ok(self.events.read().values().filter(|event| event.timestamp >= cutoff).cloned().collect())
    }

    async fn latest_bridging_config(&self) -> StoreResult<Option<BridgingConfig>> {
        Ok(self.bridging_configs.read().iter().max_by_key(|config| config.last_updated).cloned())
    }

    async fn put_bridging_config(&self, config: BridgingConfig) -> StoreResult<()> {
        self.bridging_configs.write().push(config);
        Ok(())
    }

    async fn latest_ml_threshold(&self) -> StoreResult<Option<MlBridgingThreshold>> {
        Ok(self.ml_thresholds.read().iter().max_by_key(|threshold| threshold.last_trained).cloned())
    }

    async fn publish_ml_threshold(&self, threshold: MlBridgingThreshold) -> StoreResult<()> {
        self.ml_thresholds.write().push(threshold);
        Ok(())
    }

    async fn upsert_daily_aggregate(&self, row: DailyAggregate) -> StoreResult<()> {
        let key = (row.date.clone(), row.partner_id, row.device_type.clone(), row.event_type.clone());
        self.daily_aggregates.write().insert(key, row);
        Ok(())
    }

    async fn daily_aggregates_in_range(&self, start_date: &str, end_date: &str) -> StoreResult<Vec<DailyAggregate>> {
        Ok(self
            .daily_aggregates
            .read()
            .values()
            .filter(|row| row.date.as_str() >= start_date && row.date.as_str() <= end_date)
            .cloned()
            .collect())
    }

    async fn frequency_cap(&self, household_id: &str) -> StoreResult<FrequencyCap> {
        let mut caps = self.frequency_caps.write();
        let cap = caps.entry(household_id.to_string()).or_insert_with(|| FrequencyCap {
            household_id: household_id.to_string(),
            daily_impressions: 0,
            cap_limit: DEFAULT_CAP_LIMIT,
            updated_at: unix_now(),
        });
        Ok(cap.clone())
    }

    async fn increment_frequency_cap(&self, household_id: &str) -> StoreResult<FrequencyCap> {
        let mut caps = self.frequency_caps.write();
        let cap = caps.entry(household_id.to_string()).or_insert_with(|| FrequencyCap {
            household_id: household_id.to_string(),
            daily_impressions: 0,
            cap_limit: DEFAULT_CAP_LIMIT,
            updated_at: unix_now(),
        });
        cap.daily_impressions += 1;
        cap.updated_at = unix_now();
        Ok(cap.clone())
    }

    async fn insert_anonymized_event(&self, row: AnonymizedEvent) -> StoreResult<()> {
        self.anonymized_events.write().push(row);
        Ok(())
    }

    async fn record_consent_revocation(&self, ephem_id: &str) -> StoreResult<()> {
        self.consent_revocations.write().push(ConsentRevocation { ephem_id: ephem_id.to_string(), revoked_at: unix_now() });
        Ok(())
    }

    async fn record_attribution_journey(&self, journey: AttributionJourney) -> StoreResult<()> {
        self.attribution_journeys.write().push(journey);
        Ok(())
    }

    async fn insert_lookalike_segment(&self, segment: LookalikeSegment) -> StoreResult<()> {
        self.lookalike_segments.write().push(segment);
        Ok(())
    }
}
