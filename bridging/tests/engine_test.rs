use householdiq_bridging::{BridgeStatus, BridgingEngine, BridgingOptions, BridgingSkipReason, ChannelObserver};
use householdiq_core::time::unix_now;
use householdiq_graph::{DynGraphStore, GraphStore, MemoryGraphStore};
use householdiq_identity_core::{ConsentFlags, EphemeralEvent, EventType, PartialKeys};
use householdiq_kvcache::{DynKvCache, KvCache, MemoryKvCache};
use householdiq_store::{DynRelationalStore, MemoryRelationalStore, NewEvent, RelationalStore};
use std::sync::Arc;
use std::time::Duration;

const RETENTION: Duration = Duration::from_secs(30 * 24 * 3600);

struct Fixture {
    store: DynRelationalStore,
    cache: DynKvCache,
    graph: Arc<MemoryGraphStore>,
    engine: BridgingEngine,
}

fn fixture() -> Fixture {
    let store: DynRelationalStore = Arc::new(MemoryRelationalStore::new());
    let cache: DynKvCache = Arc::new(MemoryKvCache::new(RETENTION));
    let graph = Arc::new(MemoryGraphStore::new());
    let graph_dyn: DynGraphStore = graph.clone();
    let engine = BridgingEngine::new(store.clone(), cache.clone(), graph_dyn, BridgingOptions::default());
    Fixture { store, cache, graph, engine }
}

async fn ingest(store: &DynRelationalStore, ephem_id: &str, partial_keys: PartialKeys, consent: bool) -> EphemeralEvent {
    store
        .insert_event(NewEvent {
            ephem_id: ephem_id.to_string(),
            partial_keys,
            event_type: EventType::Impression,
            campaign_id: None,
            partner_id: 1,
            consent: ConsentFlags { cross_device_bridging: consent, targeting_segments: true },
            privacy_tcf: None,
            privacy_us: None,
            timestamp: unix_now(),
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn test_deterministic_merge_on_shared_email() {
    let f = fixture();

    let keys_a = PartialKeys { hashed_email: Some("h1".into()), device_type: Some("mobile".into()), ..Default::default() };
    let ev1 = ingest(&f.store, "A", keys_a, true).await;
    let first = f.engine.bridge(&ev1).await.unwrap();
    assert_eq!(first.status, BridgeStatus::Done);
    // nothing indexed yet, so no household and no token
    assert_eq!(first.household_id, None);
    assert_eq!(first.bridging_token, None);

    let keys_b = PartialKeys {
        hashed_email: Some("h1".into()),
        wifi_ssid: Some("ssid1".into()),
        device_type: Some("tablet".into()),
        ..Default::default()
    };
    let ev2 = ingest(&f.store, "B", keys_b, true).await;
    let second = f.engine.bridge(&ev2).await.unwrap();
    assert_eq!(second.status, BridgeStatus::Done);

    // both ephemerals resolve to the same household
    let household_a = f.cache.get_household_ref("A").await.unwrap().expect("A has a household");
    let household_b = f.cache.get_household_ref("B").await.unwrap().expect("B has a household");
    assert_eq!(household_a, household_b);
    assert_eq!(second.household_id.as_deref(), Some(household_b.as_str()));

    // the email index holds both events in ingest order
    assert_eq!(f.cache.email_events("h1").await.unwrap(), vec![ev1.id, ev2.id]);

    // a signed token over the published household comes back on the second event
    let token = second.bridging_token.expect("token issued");
    let claims = f.engine.signer().verify(&token).unwrap();
    assert_eq!(claims.sub, "B");
    assert_eq!(claims.household, household_b);
}

#[tokio::test]
async fn test_child_event_contributes_nothing() {
    let f = fixture();

    let keys = PartialKeys {
        hashed_email: Some("kid@hash".into()),
        device_type: Some("mobile".into()),
        is_child: true,
        ..Default::default()
    };
    let event = ingest(&f.store, "C", keys, true).await;
    let outcome = f.engine.bridge(&event).await.unwrap();
    assert_eq!(outcome.skip_reason(), Some(BridgingSkipReason::ChildFlag));
    assert_eq!(outcome.household_id, None);

    // no graph nodes or relationships, no cache publications, no index entry
    let counts = f.graph.counts().await.unwrap();
    assert_eq!(counts.events, 0);
    assert_eq!(counts.relationships, 0);
    assert_eq!(f.cache.get_household_ref("C").await.unwrap(), None);
    assert!(f.cache.email_events("kid@hash").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_device_child_flag_suppresses_too() {
    let f = fixture();
    let keys = PartialKeys { hashed_email: Some("h".into()), device_child_flag: true, ..Default::default() };
    let event = ingest(&f.store, "D", keys, true).await;
    let outcome = f.engine.bridge(&event).await.unwrap();
    assert_eq!(outcome.skip_reason(), Some(BridgingSkipReason::ChildFlag));
}

#[tokio::test]
async fn test_no_consent_skips_before_any_write() {
    let f = fixture();
    let keys = PartialKeys { hashed_email: Some("h2".into()), device_type: Some("mobile".into()), ..Default::default() };
    let event = ingest(&f.store, "E", keys, false).await;
    let outcome = f.engine.bridge(&event).await.unwrap();
    assert_eq!(outcome.skip_reason(), Some(BridgingSkipReason::NoConsentOrFlags));
    assert_eq!(f.cache.get_household_ref("E").await.unwrap(), None);
    assert!(f.cache.email_events("h2").await.unwrap().is_empty());
    assert_eq!(f.graph.counts().await.unwrap().events, 0);
}

#[tokio::test]
async fn test_event_without_email_is_queued() {
    let f = fixture();
    let keys = PartialKeys { hashed_ip: Some("ipX".into()), device_type: Some("mobile".into()), ..Default::default() };
    let event = ingest(&f.store, "F", keys, true).await;
    let outcome = f.engine.bridge(&event).await.unwrap();
    assert_eq!(outcome.status, BridgeStatus::Queued);
    assert_eq!(f.cache.pop_fuzzy_batch().await.unwrap(), vec![event.id]);
}

#[tokio::test]
async fn test_rebridging_is_idempotent() {
    let f = fixture();

    let keys_a = PartialKeys { hashed_email: Some("h1".into()), device_type: Some("mobile".into()), ..Default::default() };
    let ev1 = ingest(&f.store, "A", keys_a, true).await;
    f.engine.bridge(&ev1).await.unwrap();

    let keys_b = PartialKeys { hashed_email: Some("h1".into()), device_type: Some("tablet".into()), ..Default::default() };
    let ev2 = ingest(&f.store, "B", keys_b.clone(), true).await;
    f.engine.bridge(&ev2).await.unwrap();

    let counts = f.graph.counts().await.unwrap();
    let household = f.cache.get_household_ref("B").await.unwrap();
    let score = f.cache.average_score(household.as_deref().unwrap_or_default()).await.unwrap();

    // replaying the same event leaves the topology and the scores unchanged
    f.engine.bridge(&ev2).await.unwrap();
    assert_eq!(f.graph.counts().await.unwrap(), counts);
    assert_eq!(f.cache.get_household_ref("B").await.unwrap(), household);
    let household = f.cache.get_household_ref("B").await.unwrap().unwrap();
    assert_eq!(f.cache.average_score(&household).await.unwrap(), score);
}

#[tokio::test]
async fn test_shared_wifi_publishes_shared_household() {
    let f = fixture();
    let params = f.engine.resolve_params().await;

    let keys_a = PartialKeys { hashed_email: Some("h9".into()), wifi_ssid: Some("Home-Net".into()), ..Default::default() };
    let keys_b = PartialKeys { hashed_email: Some("H9".into()), wifi_ssid: Some("home-net".into()), ..Default::default() };
    let ev1 = ingest(&f.store, "A", keys_a, true).await;
    let ev2 = ingest(&f.store, "B", keys_b, true).await;

    let observer = Arc::new(ChannelObserver::new());
    f.engine.register_observer(observer.clone());

    f.engine.fuzzy_bridge(&ev2, &ev1, &params).await.unwrap();

    let household_a = f.cache.get_household_ref("A").await.unwrap().unwrap();
    let household_b = f.cache.get_household_ref("B").await.unwrap().unwrap();
    assert_eq!(household_a, household_b);

    // membership carries both ephemerals and the edge book averages to the score
    let mut members = f.cache.household_members(&household_a).await.unwrap();
    members.sort();
    members.dedup();
    assert_eq!(members, vec!["A".to_string(), "B".to_string()]);
    assert_eq!(f.cache.average_score(&household_a).await.unwrap(), 1.0);

    // the observer hook saw the publication
    let update = observer.channel().try_recv().unwrap();
    assert_eq!(update.ephem_id, "B");
    assert_eq!(update.other_ephem_id, "A");
    assert_eq!(update.household_id, household_a);
    assert_eq!(update.score, 1.0);
}

#[tokio::test]
async fn test_below_threshold_pair_is_not_linked() {
    let f = fixture();
    let params = f.engine.resolve_params().await;

    // only a weak deviceType signal: 0.2 * recency stays far below 0.7
    let keys_a = PartialKeys { device_type: Some("mobile".into()), ..Default::default() };
    let keys_b = PartialKeys { device_type: Some("mobile".into()), ..Default::default() };
    let ev1 = ingest(&f.store, "A", keys_a, true).await;
    let ev2 = ingest(&f.store, "B", keys_b, true).await;

    f.engine.fuzzy_bridge(&ev2, &ev1, &params).await.unwrap();
    assert_eq!(f.cache.get_household_ref("A").await.unwrap(), None);
    assert_eq!(f.cache.get_household_ref("B").await.unwrap(), None);
    assert_eq!(f.graph.counts().await.unwrap().relationships, 0);
}

#[tokio::test]
async fn test_consentless_partner_event_is_never_linked() {
    let f = fixture();
    let params = f.engine.resolve_params().await;

    let keys_a = PartialKeys { wifi_ssid: Some("net".into()), hashed_ip: Some("ip".into()), ..Default::default() };
    let ev1 = ingest(&f.store, "A", keys_a.clone(), false).await;
    let ev2 = ingest(&f.store, "B", keys_a, true).await;

    f.engine.fuzzy_bridge(&ev2, &ev1, &params).await.unwrap();
    assert_eq!(f.cache.get_household_ref("A").await.unwrap(), None);
    assert_eq!(f.cache.get_household_ref("B").await.unwrap(), None);
}
