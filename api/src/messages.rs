use householdiq_bridging::BridgingSkipReason;
use householdiq_identity_core::{EventId, EventType, PartialKeys, PartnerId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ConsentFlagsRequest {
    pub cross_device_bridging: bool,
    pub targeting_segments: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PrivacySignals {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tcf_string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub us_privacy_string: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRequest {
    pub partner_id: PartnerId,
    /// Becomes the event's ephemeral id
    pub device_data: String,
    pub partial_keys: PartialKeys,
    pub event_type: EventType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
    pub consent_flags: ConsentFlagsRequest,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy_signals: Option<PrivacySignals>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestResponse {
    pub id: EventId,
    pub ephem_id: String,
    pub timestamp: String,
    pub event_type: EventType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub campaign_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub household_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bridging_skip_reason: Option<BridgingSkipReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bridging_token: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LookupStatus {
    #[serde(rename = "matched")]
    Matched,
    #[serde(rename = "not_found")]
    NotFound,
}

#[derive(Debug, Clone, Serialize)]
pub struct LookupResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub household_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    pub status: LookupStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CappingRequest {
    pub household_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CappingResponse {
    pub household_id: String,
    pub can_serve: bool,
    pub daily_impressions: u64,
    pub cap_limit: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportingQuery {
    pub start_date: String,
    pub end_date: String,
}

/// Aggregates keyed `date|partner|device|event`, DP-perturbed when enabled
#[derive(Debug, Clone, Serialize)]
pub struct ReportingResponse {
    pub data: HashMap<String, f64>,
}
