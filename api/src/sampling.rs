use householdiq_identity_core::EventType;
use rand::Rng;
use std::collections::HashMap;

/// `1/rate` sampling rates per event type
pub type SamplingRates = HashMap<String, u32>;

pub fn default_sampling_rates() -> SamplingRates {
    [("impression", 10_000), ("click", 3_000), ("conversion", 500)].into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

/// True when an event of this type should produce an anonymized row
pub fn should_sample_event(rates: &SamplingRates, event_type: EventType) -> bool {
    let rate = rates.get(event_type.as_str()).copied().unwrap_or(10_000).max(1);
    rand::thread_rng().gen_range(1..=rate) == 1
}
