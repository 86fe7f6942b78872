use householdiq_identity_core::{ConsentFlags, EventId, EventType, PartialKeys, PartnerId};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CAP_LIMIT: u64 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partner {
    pub id: PartnerId,
    pub name: String,
    pub salt: String,
    pub created_at: u64,
    pub namespace: Option<String>,
}

/// An event row about to be persisted; the store assigns the id
#[derive(Debug, Clone, PartialEq)]
pub struct NewEvent {
    pub ephem_id: String,
    pub partial_keys: PartialKeys,
    pub event_type: EventType,
    pub campaign_id: Option<String>,
    pub partner_id: PartnerId,
    pub consent: ConsentFlags,
    pub privacy_tcf: Option<String>,
    pub privacy_us: Option<String>,
    pub timestamp: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyAggregate {
    pub date: String,
    pub partner_id: PartnerId,
    pub device_type: String,
    pub event_type: String,
    /// Float so differentially-private counts survive the round trip
    pub count: f64,
    pub last_updated: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrequencyCap {
    pub household_id: String,
    pub daily_impressions: u64,
    pub cap_limit: u64,
    pub updated_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnonymizedEvent {
    pub event_id: EventId,
    pub hashed_device_sig: String,
    pub hashed_user_sig: String,
    pub event_day: String,
    pub event_type: EventType,
    pub partner_id: PartnerId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsentRevocation {
    pub ephem_id: String,
    pub revoked_at: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttributionJourney {
    pub household_id: String,
    pub conversion_time: u64,
    pub touch_points: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookalikeSegment {
    pub seed_segment: String,
    pub matched_households: Vec<String>,
    pub created_at: u64,
}
