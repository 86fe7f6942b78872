use householdiq_api::{
    AggregatorApi, ApiError, ApiOptions, CappingRequest, ConsentFlagsRequest, IngestRequest, LookupStatus, PrivacySignals,
    ReportingQuery,
};
use householdiq_bridging::{BridgingEngine, BridgingOptions};
use householdiq_graph::{DynGraphStore, MemoryGraphStore};
use householdiq_identity_core::{EventType, PartialKeys};
use householdiq_kvcache::{DynKvCache, KvCache, MemoryKvCache};
use householdiq_store::{DailyAggregate, DynRelationalStore, MemoryRelationalStore, RelationalStore};
use std::sync::Arc;
use std::time::Duration;

const RETENTION: Duration = Duration::from_secs(30 * 24 * 3600);

struct Fixture {
    store: DynRelationalStore,
    cache: DynKvCache,
    api: AggregatorApi,
}

async fn fixture(options: ApiOptions) -> Fixture {
    let store: DynRelationalStore = Arc::new(MemoryRelationalStore::new());
    let cache: DynKvCache = Arc::new(MemoryKvCache::new(RETENTION));
    let graph: DynGraphStore = Arc::new(MemoryGraphStore::new());
    let engine = Arc::new(BridgingEngine::new(store.clone(), cache.clone(), graph, BridgingOptions::default()));
    store.create_partner("partner-one", "salt-1").await.unwrap();
    let api = AggregatorApi::new(store.clone(), cache.clone(), engine, options);
    Fixture { store, cache, api }
}

fn request(ephem_id: &str, partial_keys: PartialKeys, cross_device: bool) -> IngestRequest {
    IngestRequest {
        partner_id: 1,
        device_data: ephem_id.to_string(),
        partial_keys,
        event_type: EventType::Impression,
        campaign_id: Some("camp-1".into()),
        consent_flags: ConsentFlagsRequest { cross_device_bridging: cross_device, targeting_segments: true },
        privacy_signals: None,
    }
}

#[tokio::test]
async fn test_ingest_without_consent_still_counts_aggregates() {
    let f = fixture(ApiOptions::default()).await;

    // no deviceType supplied: the aggregate falls back to "unknown"
    let response = f.api.ingest(request("A", PartialKeys::default(), false)).await.unwrap();
    assert_eq!(response.bridging_skip_reason.map(|reason| reason.as_str()), Some("NO_CONSENT_OR_FLAGS"));
    assert_eq!(response.household_id, None);
    assert_eq!(response.bridging_token, None);

    // the event row was persisted regardless
    assert!(f.store.event(response.id).await.unwrap().is_some());

    // no household publications for the suppressed event
    assert_eq!(f.cache.get_household_ref("A").await.unwrap(), None);

    let records = f.cache.daily_records().await.unwrap();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].counts["1|unknown|impression"], 1);
}

#[tokio::test]
async fn test_us_privacy_opt_out_behaves_like_no_consent() {
    let f = fixture(ApiOptions::default()).await;

    let mut req = request("B", PartialKeys { device_type: Some("mobile".into()), ..Default::default() }, true);
    req.privacy_signals = Some(PrivacySignals { tcf_string: None, us_privacy_string: Some("1YYY".into()) });

    let response = f.api.ingest(req).await.unwrap();
    assert_eq!(response.bridging_skip_reason.map(|reason| reason.as_str()), Some("NO_CONSENT_OR_FLAGS"));
    assert_eq!(f.cache.get_household_ref("B").await.unwrap(), None);

    // the aggregate was still buffered
    let records = f.cache.daily_records().await.unwrap();
    assert_eq!(records[0].counts["1|mobile|impression"], 1);

    // the stored row carries the denied consent bit and the raw signal
    let row = f.store.event(response.id).await.unwrap().unwrap();
    assert!(!row.consent.cross_device_bridging);
    assert_eq!(row.privacy_us.as_deref(), Some("1YYY"));
}

#[tokio::test]
async fn test_child_flag_skip_reason() {
    let f = fixture(ApiOptions::default()).await;
    let keys = PartialKeys { device_type: Some("mobile".into()), is_child: true, ..Default::default() };
    let response = f.api.ingest(request("C", keys, true)).await.unwrap();
    assert_eq!(response.bridging_skip_reason.map(|reason| reason.as_str()), Some("CHILD_FLAG"));
    assert!(f.store.event(response.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_unknown_partner_is_rejected() {
    let f = fixture(ApiOptions::default()).await;
    let mut req = request("D", PartialKeys::default(), true);
    req.partner_id = 42;
    let err = f.api.ingest(req).await.unwrap_err();
    assert!(matches!(err, ApiError::InvalidPartner));
    assert_eq!(err.status_code(), 400);
}

#[tokio::test]
async fn test_debug_mode_accepts_test_partners() {
    let f = fixture(ApiOptions { debug: true, ..Default::default() }).await;
    let mut req = request("E", PartialKeys::default(), true);
    req.partner_id = 7;
    assert!(f.api.ingest(req).await.is_ok());
}

#[tokio::test]
async fn test_invalid_device_type_is_a_validation_error() {
    let f = fixture(ApiOptions::default()).await;
    let keys = PartialKeys { device_type: Some("fridge".into()), ..Default::default() };
    let err = f.api.ingest(request("F", keys, true)).await.unwrap_err();
    assert!(matches!(err, ApiError::Validation(_)));
    assert_eq!(err.status_code(), 422);
}

#[tokio::test]
async fn test_lookup_after_deterministic_merge() {
    let f = fixture(ApiOptions::default()).await;

    let keys_a = PartialKeys { hashed_email: Some("h1".into()), device_type: Some("mobile".into()), ..Default::default() };
    f.api.ingest(request("A", keys_a, true)).await.unwrap();

    let keys_b = PartialKeys { hashed_email: Some("h1".into()), device_type: Some("tablet".into()), ..Default::default() };
    let second = f.api.ingest(request("B", keys_b, true)).await.unwrap();
    assert!(second.household_id.is_some());
    assert!(second.bridging_token.is_some());

    let lookup_a = f.api.lookup("A").await.unwrap();
    let lookup_b = f.api.lookup("B").await.unwrap();
    assert_eq!(lookup_a.status, LookupStatus::Matched);
    assert_eq!(lookup_a.household_id, lookup_b.household_id);

    let missing = f.api.lookup("nobody").await.unwrap();
    assert_eq!(missing.status, LookupStatus::NotFound);
    assert_eq!(missing.household_id, None);
}

#[tokio::test]
async fn test_cap_counter_serves_through_the_cap() {
    let f = fixture(ApiOptions::default()).await;

    let body: CappingRequest = serde_json::from_str(r#"{"household_id":"house-1"}"#).unwrap();
    let check = f.api.capping_check(&body.household_id).await.unwrap();
    assert!(check.can_serve);
    assert_eq!(check.daily_impressions, 0);
    assert_eq!(check.cap_limit, 5);

    // five increments serve, the sixth does not
    for expected in 1..=5 {
        let response = f.api.capping_increment(&body.household_id).await.unwrap();
        assert!(response.can_serve, "increment {expected} should serve");
        assert_eq!(response.daily_impressions, expected);
    }
    let response = f.api.capping_increment(&body.household_id).await.unwrap();
    assert!(!response.can_serve);
    assert_eq!(response.daily_impressions, 6);
}

#[tokio::test]
async fn test_ingest_request_wire_shape() {
    let raw = r#"{
        "partner_id": 1,
        "device_data": "opaque-device-token",
        "partial_keys": {
            "hashedEmail": "h1",
            "hashedIP": "ip-1",
            "deviceType": "mobile",
            "isChild": false,
            "deviceChildFlag": false
        },
        "event_type": "click",
        "campaign_id": "camp-9",
        "consent_flags": { "cross_device_bridging": true, "targeting_segments": false },
        "privacy_signals": { "us_privacy_string": "1YNY" }
    }"#;
    let request: IngestRequest = serde_json::from_str(raw).unwrap();
    assert_eq!(request.event_type, EventType::Click);
    assert_eq!(request.partial_keys.hashed_email.as_deref(), Some("h1"));
    assert_eq!(request.partial_keys.device_type.as_deref(), Some("mobile"));
    assert!(!request.consent_flags.targeting_segments);
    assert_eq!(request.privacy_signals.clone().unwrap().us_privacy_string.as_deref(), Some("1YNY"));

    let f = fixture(ApiOptions::default()).await;
    let response = f.api.ingest(request).await.unwrap();
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["ephem_id"], "opaque-device-token");
    assert_eq!(json["event_type"], "click");
    // absent optionals stay off the wire
    assert!(json.get("bridging_skip_reason").is_none());
}

#[tokio::test]
async fn test_daily_report_sums_range() {
    let f = fixture(ApiOptions::default()).await;
    for (date, count) in [("2025-05-01", 3.0), ("2025-05-02", 4.0), ("2025-06-01", 9.0)] {
        f.store
            .upsert_daily_aggregate(DailyAggregate {
                date: date.into(),
                partner_id: 1,
                device_type: "mobile".into(),
                event_type: "impression".into(),
                count,
                last_updated: 0,
            })
            .await
            .unwrap();
    }

    let report = f.api.daily_report(ReportingQuery { start_date: "2025-05-01".into(), end_date: "2025-05-31".into() }).await.unwrap();
    assert_eq!(report.data.len(), 2);
    assert_eq!(report.data["2025-05-01|1|mobile|impression"], 3.0);
    assert_eq!(report.data["2025-05-02|1|mobile|impression"], 4.0);
}

#[tokio::test]
async fn test_daily_report_with_dp_noise() {
    let f = fixture(ApiOptions { dp_enabled: true, noise_epsilon: 1.0, ..Default::default() }).await;
    f.store
        .upsert_daily_aggregate(DailyAggregate {
            date: "2025-05-01".into(),
            partner_id: 1,
            device_type: "mobile".into(),
            event_type: "impression".into(),
            count: 50.0,
            last_updated: 0,
        })
        .await
        .unwrap();

    let report = f.api.daily_report(ReportingQuery { start_date: "2025-05-01".into(), end_date: "2025-05-01".into() }).await.unwrap();
    assert!(report.data["2025-05-01|1|mobile|impression"] >= 0.0);
}

#[tokio::test]
async fn test_consent_revocation_and_journeys_are_recorded() {
    let store = Arc::new(MemoryRelationalStore::new());
    let store_dyn: DynRelationalStore = store.clone();
    let cache: DynKvCache = Arc::new(MemoryKvCache::new(RETENTION));
    let graph: DynGraphStore = Arc::new(MemoryGraphStore::new());
    let engine = Arc::new(BridgingEngine::new(store_dyn.clone(), cache.clone(), graph, BridgingOptions::default()));
    let api = AggregatorApi::new(store_dyn, cache, engine, ApiOptions::default());

    api.revoke_consent("A").await.unwrap();
    api.record_conversion("house-1", vec!["imp-1".into(), "click-2".into()]).await.unwrap();
    api.build_lookalike_segment("seed", vec!["house-1".into(), "house-2".into()]).await.unwrap();

    assert_eq!(store.consent_revocations().len(), 1);
    assert_eq!(store.attribution_journeys()[0].touch_points.len(), 2);
    assert_eq!(store.lookalike_segments()[0].matched_households.len(), 2);
}
