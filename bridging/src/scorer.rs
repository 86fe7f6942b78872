//! Weighted partial-key similarity with exponential time decay.

use householdiq_identity_core::fuzzy::fuzzy_similarity;
use householdiq_identity_core::{PartialKey, PartialKeys};
use std::collections::HashMap;

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Scores a pair of events in `[0, 1]`.
///
/// Case-insensitively equal hashed emails short-circuit to `1.0`. Otherwise
/// every weighted key contributes `weight * similarity * recency`, where
/// `recency = decay ^ (Δhours / 24)`; the weighted sum is clamped to `1.0`.
pub fn compute_confidence(
    pk_a: &PartialKeys,
    pk_b: &PartialKeys,
    t_a: u64,
    t_b: u64,
    weights: &HashMap<String, f64>,
    time_decay_factor: f64,
) -> f64 {
    if let (Some(email_a), Some(email_b)) = (pk_a.hashed_email(), pk_b.hashed_email()) {
        if email_a.eq_ignore_ascii_case(email_b) {
            return 1.0;
        }
    }

    let time_diff_hours = t_a.abs_diff(t_b) as f64 / MS_PER_HOUR;
    let recency_factor = time_decay_factor.powf(time_diff_hours / 24.0);

    let mut score = 0.0;
    for (key, weight) in weights {
        let (Some(val_a), Some(val_b)) = (pk_a.get(key), pk_b.get(key)) else {
            continue;
        };
        let val_a = val_a.to_lowercase();
        let val_b = val_b.to_lowercase();
        if key == PartialKey::HashedEmail.as_str() && val_a == val_b {
            score += weight;
        } else {
            score += weight * fuzzy_similarity(&val_a, &val_b) * recency_factor;
        }
    }
    score.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use householdiq_identity_core::default_partial_key_weights;

    const HOUR_MS: u64 = 3_600_000;

    fn keys(email: Option<&str>, ip: Option<&str>, ssid: Option<&str>, device: Option<&str>) -> PartialKeys {
        PartialKeys {
            hashed_email: email.map(Into::into),
            hashed_ip: ip.map(Into::into),
            wifi_ssid: ssid.map(Into::into),
            device_type: device.map(Into::into),
            ..Default::default()
        }
    }

    #[test]
    fn test_shared_email_short_circuits_to_one() {
        let a = keys(Some("H1"), None, None, None);
        let b = keys(Some("h1"), Some("other"), None, Some("desktop"));
        let score = compute_confidence(&a, &b, 0, 7 * 24 * HOUR_MS, &default_partial_key_weights(), 0.5);
        assert_eq!(score, 1.0);
    }

    #[test]
    fn test_symmetry() {
        let a = keys(None, Some("ip-1"), Some("home-net"), Some("mobile"));
        let b = keys(None, Some("ip-2"), Some("home-nat"), Some("tablet"));
        let weights = default_partial_key_weights();
        let forward = compute_confidence(&a, &b, 1_000, 5_000_000, &weights, 0.5);
        let backward = compute_confidence(&b, &a, 5_000_000, 1_000, &weights, 0.5);
        assert_eq!(forward, backward);
    }

    #[test]
    fn test_clamped_to_one() {
        // identical strong keys at the same instant would sum past 1.0
        let a = keys(None, Some("ipX"), Some("ssidZ"), Some("mobile"));
        let b = keys(None, Some("ipX"), Some("ssidZ"), Some("mobile"));
        let score = compute_confidence(&a, &b, 0, 0, &default_partial_key_weights(), 0.5);
        assert_eq!(score, 1.0);
    }

    #[test]
    fn test_recency_decay_lowers_score() {
        let a = keys(None, Some("ipX"), None, None);
        let b = keys(None, Some("ipX"), None, None);
        let weights = default_partial_key_weights();
        let near = compute_confidence(&a, &b, 0, HOUR_MS, &weights, 0.5);
        let far = compute_confidence(&a, &b, 0, 72 * HOUR_MS, &weights, 0.5);
        assert!(near > far);
        assert!(far > 0.0);
    }

    #[test]
    fn test_missing_keys_are_skipped() {
        let a = keys(None, Some("ipX"), None, None);
        let b = keys(None, None, Some("ssid"), None);
        let score = compute_confidence(&a, &b, 0, 0, &default_partial_key_weights(), 0.5);
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_shared_ip_and_ssid_pass_default_threshold() {
        // the fuzzy-path fixture: same hashedIP and wifiSSID within the hour
        let a = keys(None, Some("ipX"), Some("ssidZ"), None);
        let b = keys(None, Some("ipX"), Some("ssidZ"), None);
        let score = compute_confidence(&a, &b, 0, HOUR_MS / 2, &default_partial_key_weights(), 0.5);
        assert!(score >= 0.7, "expected {score} above the default threshold");
    }
}
