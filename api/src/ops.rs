use crate::errors::{ApiError, ApiResult};
use crate::messages::{
    CappingResponse, IngestRequest, IngestResponse, LookupResponse, LookupStatus, ReportingQuery, ReportingResponse,
};
use crate::sampling::{default_sampling_rates, should_sample_event, SamplingRates};
use chrono::{TimeZone, Utc};
use householdiq_bridging::BridgingEngine;
use householdiq_core::time::unix_now;
use householdiq_core::{debug, error};
use householdiq_identity_core::{ConsentFlags, EphemeralEvent, PartnerId};
use householdiq_kvcache::{DynKvCache, KvCache};
use householdiq_privacy::{apply_differential_privacy, bridging_allowed};
use householdiq_store::{
    AnonymizedEvent, AttributionJourney, DynRelationalStore, LookalikeSegment, NewEvent, Partner, RelationalStore,
};
use std::collections::HashMap;
use std::sync::Arc;

const VALID_DEVICE_TYPES: [&str; 3] = ["mobile", "desktop", "tablet"];

/// Device bucket used for aggregates when the partner sent none
const UNKNOWN_DEVICE_TYPE: &str = "unknown";

#[derive(Debug, Clone)]
pub struct ApiOptions {
    /// Accept partner ids 1..=10 without a partners row (test traffic)
    pub debug: bool,
    pub dp_enabled: bool,
    pub noise_epsilon: f64,
    pub sampling_rates: SamplingRates,
}

impl Default for ApiOptions {
    fn default() -> Self {
        Self { debug: false, dp_enabled: false, noise_epsilon: 1.0, sampling_rates: default_sampling_rates() }
    }
}

/// The operations behind the public surfaces, shared by every transport
pub struct AggregatorApi {
    store: DynRelationalStore,
    cache: DynKvCache,
    engine: Arc<BridgingEngine>,
    options: ApiOptions,
}

impl AggregatorApi {
    pub fn new(store: DynRelationalStore, cache: DynKvCache, engine: Arc<BridgingEngine>, options: ApiOptions) -> Self {
        Self { store, cache, engine, options }
    }

    /// Ingests one event: validate, gate, persist, bridge, sample, count.
    /// Only input errors and the relational insert can fail the call;
    /// bridging, anonymization and aggregate-buffering problems are logged
    /// and surface as absent response fields.
    pub async fn ingest(&self, request: IngestRequest) -> ApiResult<IngestResponse> {
        validate_request(&request)?;
        let partner = self.resolve_partner(request.partner_id).await?;

        let (tcf, usp) = match request.privacy_signals.as_ref() {
            Some(signals) => (signals.tcf_string.as_deref(), signals.us_privacy_string.as_deref()),
            None => (None, None),
        };
        // The gate folds the framework signals into the stored consent flag,
        // so every later consumer sees one authoritative bit
        let allowed = bridging_allowed(request.consent_flags.cross_device_bridging, tcf, usp);
        let consent = ConsentFlags {
            cross_device_bridging: request.consent_flags.cross_device_bridging && allowed,
            targeting_segments: request.consent_flags.targeting_segments,
        };

        let timestamp = unix_now();
        let event = self
            .store
            .insert_event(NewEvent {
                ephem_id: request.device_data,
                partial_keys: request.partial_keys,
                event_type: request.event_type,
                campaign_id: request.campaign_id,
                partner_id: partner.id,
                consent,
                privacy_tcf: tcf.map(str::to_string),
                privacy_us: usp.map(str::to_string),
                timestamp,
            })
            .await?;
        debug!("created event {} for partner {}", event.id, partner.id);

        let outcome = match self.engine.bridge(&event).await {
            Ok(outcome) => Some(outcome),
            Err(err) => {
                error!("bridging error for event {}: {err}", event.id);
                None
            }
        };

        if should_sample_event(&self.options.sampling_rates, event.event_type) {
            if let Err(err) = self.store.insert_anonymized_event(anonymize(&event)).await {
                error!("anonymized event error for event {}: {err}", event.id);
            }
        }

        let field_key =
            format!("{}|{}|{}", event.partner_id, event.device_type().unwrap_or(UNKNOWN_DEVICE_TYPE), event.event_type);
        if let Err(err) = self.cache.increment_daily(&event_day(timestamp), &field_key).await {
            error!("daily aggregate error for event {}: {err}", event.id);
        }

        // The fuzzy path may already resolve through an earlier publication
        let household_id = match outcome.as_ref().and_then(|outcome| outcome.household_id.clone()) {
            Some(household) => Some(household),
            None => self.cache.get_household_ref(&event.ephem_id).await.unwrap_or_default(),
        };

        Ok(IngestResponse {
            id: event.id,
            ephem_id: event.ephem_id,
            timestamp: format_timestamp(timestamp),
            event_type: event.event_type,
            campaign_id: event.campaign_id,
            household_id,
            bridging_skip_reason: outcome.as_ref().and_then(|outcome| outcome.skip_reason()),
            bridging_token: outcome.and_then(|outcome| outcome.bridging_token),
        })
    }

    /// Fast `ephem_id -> household` read with the household's average edge score
    pub async fn lookup(&self, ephem_id: &str) -> ApiResult<LookupResponse> {
        let household_id =
            self.cache.get_household_ref(ephem_id).await.map_err(|err| ApiError::Internal(err.to_string()))?;
        match household_id {
            Some(household_id) => {
                let confidence_score =
                    self.cache.average_score(&household_id).await.map_err(|err| ApiError::Internal(err.to_string()))?;
                Ok(LookupResponse { household_id: Some(household_id), confidence_score: Some(confidence_score), status: LookupStatus::Matched })
            }
            None => Ok(LookupResponse { household_id: None, confidence_score: None, status: LookupStatus::NotFound }),
        }
    }

    /// Read-side capping check; creates the row with defaults when absent
    pub async fn capping_check(&self, household_id: &str) -> ApiResult<CappingResponse> {
        let cap = self.store.frequency_cap(household_id).await?;
        Ok(CappingResponse {
            household_id: cap.household_id,
            can_serve: cap.daily_impressions < cap.cap_limit,
            daily_impressions: cap.daily_impressions,
            cap_limit: cap.cap_limit,
        })
    }

    /// Counts an impression. Post-increment semantics: the increment that
    /// reaches the cap still serves.
    pub async fn capping_increment(&self, household_id: &str) -> ApiResult<CappingResponse> {
        let cap = self.store.increment_frequency_cap(household_id).await?;
        Ok(CappingResponse {
            household_id: cap.household_id,
            can_serve: cap.daily_impressions <= cap.cap_limit,
            daily_impressions: cap.daily_impressions,
            cap_limit: cap.cap_limit,
        })
    }

    /// Date-range aggregates keyed `date|partner|device|event`
    pub async fn daily_report(&self, query: ReportingQuery) -> ApiResult<ReportingResponse> {
        let rows = self.store.daily_aggregates_in_range(&query.start_date, &query.end_date).await?;
        let mut data: HashMap<String, f64> = HashMap::new();
        for row in rows {
            let key = format!("{}|{}|{}|{}", row.date, row.partner_id, row.device_type, row.event_type);
            *data.entry(key).or_insert(0.0) += row.count;
        }
        if self.options.dp_enabled {
            for count in data.values_mut() {
                *count = apply_differential_privacy(*count, self.options.noise_epsilon);
            }
        }
        Ok(ReportingResponse { data })
    }

    pub async fn revoke_consent(&self, ephem_id: &str) -> ApiResult<()> {
        self.store.record_consent_revocation(ephem_id).await?;
        Ok(())
    }

    /// Records a multi-touch conversion journey for a household
    pub async fn record_conversion(&self, household_id: &str, touch_points: Vec<String>) -> ApiResult<()> {
        self.store
            .record_attribution_journey(AttributionJourney {
                household_id: household_id.to_string(),
                conversion_time: unix_now(),
                touch_points,
            })
            .await?;
        Ok(())
    }

    pub async fn build_lookalike_segment(&self, seed_segment: &str, matched_households: Vec<String>) -> ApiResult<()> {
        self.store
            .insert_lookalike_segment(LookalikeSegment {
                seed_segment: seed_segment.to_string(),
                matched_households,
                created_at: unix_now(),
            })
            .await?;
        Ok(())
    }

    async fn resolve_partner(&self, partner_id: PartnerId) -> ApiResult<Partner> {
        if partner_id == 0 {
            return Err(ApiError::Validation("partner_id must be positive".to_string()));
        }
        if self.options.debug && (1..=10).contains(&partner_id) {
            return Ok(Partner {
                id: partner_id,
                name: format!("Test Partner {partner_id}"),
                salt: String::new(),
                created_at: 0,
                namespace: None,
            });
        }
        self.store.partner(partner_id).await?.ok_or(ApiError::InvalidPartner)
    }
}

fn validate_request(request: &IngestRequest) -> ApiResult<()> {
    if request.device_data.is_empty() {
        return Err(ApiError::Validation("device_data must not be empty".to_string()));
    }
    if let Some(device_type) = request.partial_keys.device_type() {
        if !VALID_DEVICE_TYPES.contains(&device_type.to_lowercase().as_str()) {
            return Err(ApiError::Validation(format!("invalid device type, must be one of: {VALID_DEVICE_TYPES:?}")));
        }
    }
    Ok(())
}

fn anonymize(event: &EphemeralEvent) -> AnonymizedEvent {
    AnonymizedEvent {
        event_id: event.id,
        hashed_device_sig: format!(
            "{}{}",
            event.partial_keys.hashed_ip().unwrap_or(""),
            event.partial_keys.device_type().unwrap_or("")
        ),
        hashed_user_sig: event.partial_keys.hashed_email().unwrap_or("").to_string(),
        event_day: event_day(event.timestamp),
        event_type: event.event_type,
        partner_id: event.partner_id,
    }
}

fn event_day(timestamp: u64) -> String {
    Utc.timestamp_millis_opt(timestamp as i64).single().map(|dt| dt.format("%Y-%m-%d").to_string()).unwrap_or_default()
}

fn format_timestamp(timestamp: u64) -> String {
    Utc.timestamp_millis_opt(timestamp as i64).single().map(|dt| dt.to_rfc3339()).unwrap_or_default()
}
