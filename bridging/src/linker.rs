//! Derivation rules applied to an above-threshold event pair: device, user
//! and household identifiers are salted hashes over the shared signals, the
//! graph gets the confidence-weighted links, and the cache gets the household
//! publication.

use crate::errors::BridgingResult;
use householdiq_graph::{DynGraphStore, GraphStore};
use householdiq_hashes::salted_identity_hash;
use householdiq_identity_core::EphemeralEvent;
use householdiq_kvcache::{DynKvCache, KvCache};

pub struct GraphLinker {
    graph: DynGraphStore,
    cache: DynKvCache,
    salt: String,
}

/// Households assigned to the two events of a pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOutcome {
    pub household_a: String,
    pub household_b: String,
    pub shared_household: bool,
}

impl GraphLinker {
    pub fn new(graph: DynGraphStore, cache: DynKvCache, salt: impl Into<String>) -> Self {
        Self { graph, cache, salt: salt.into() }
    }

    fn hash(&self, preimage: &str) -> String {
        salted_identity_hash(&self.salt, preimage).to_string()
    }

    /// Links events `a` (the newly processed one) and `b` with `score`,
    /// publishing household references, membership and the edge book.
    /// Only a shared wifi SSID yields a shared household; otherwise each side
    /// gets its own solo household and no edge is recorded.
    pub async fn apply(&self, a: &EphemeralEvent, b: &EphemeralEvent, score: f64) -> BridgingResult<LinkOutcome> {
        let pk_a = &a.partial_keys;
        let pk_b = &b.partial_keys;

        let dev_sig_a = format!("{}{}", pk_a.hashed_ip().unwrap_or(""), pk_a.device_type().unwrap_or("")).to_lowercase();
        let dev_sig_b = format!("{}{}", pk_b.hashed_ip().unwrap_or(""), pk_b.device_type().unwrap_or("")).to_lowercase();

        let wifi_a = pk_a.wifi_ssid().unwrap_or("");
        let wifi_b = pk_b.wifi_ssid().unwrap_or("");
        let shared_wifi = !wifi_a.is_empty() && !wifi_b.is_empty() && wifi_a.eq_ignore_ascii_case(wifi_b);

        let (device_a, device_b) = if shared_wifi {
            let merged = self.hash(&format!("{wifi_a}mergedDevice"));
            self.graph.link_event_to_device(&a.ephem_id, &merged, score).await?;
            self.graph.link_event_to_device(&b.ephem_id, &merged, score).await?;
            (merged.clone(), merged)
        } else {
            let device_a = self.hash(&format!("{dev_sig_a}device"));
            let device_b = self.hash(&format!("{dev_sig_b}device"));
            self.graph.link_event_to_device(&a.ephem_id, &device_a, score).await?;
            self.graph.link_event_to_device(&b.ephem_id, &device_b, score).await?;
            (device_a, device_b)
        };

        let prof_a = pk_a.profile_id().unwrap_or("");
        let prof_b = pk_b.profile_id().unwrap_or("");
        let email_a = pk_a.hashed_email().unwrap_or("").to_lowercase();
        let email_b = pk_b.hashed_email().unwrap_or("").to_lowercase();

        let (user_a, user_b) = if !email_a.is_empty() && email_a == email_b {
            let merged = self.hash(&format!("{email_a}sameUser"));
            self.graph.link_device_to_user(&device_a, &merged, score).await?;
            self.graph.link_device_to_user(&device_b, &merged, score).await?;
            (merged.clone(), merged)
        } else if !prof_a.is_empty() && !prof_b.is_empty() && prof_a.eq_ignore_ascii_case(prof_b) {
            let merged = self.hash(&format!("{prof_a}sameUser"));
            self.graph.link_device_to_user(&device_a, &merged, score).await?;
            self.graph.link_device_to_user(&device_b, &merged, score).await?;
            (merged.clone(), merged)
        } else {
            let user_a = self.hash(&format!("{device_a}{prof_a}{email_a}user"));
            let user_b = self.hash(&format!("{device_b}{prof_b}{email_b}user"));
            self.graph.link_device_to_user(&device_a, &user_a, score).await?;
            self.graph.link_device_to_user(&device_b, &user_b, score).await?;
            (user_a, user_b)
        };

        if shared_wifi {
            let household = self.hash(&format!("{wifi_a}household"));
            self.graph.link_user_to_household(&user_a, &household, score).await?;
            self.graph.link_user_to_household(&user_b, &household, score).await?;
            // refs before memberships, so a ref is never behind its membership
            self.cache.set_household_ref(&a.ephem_id, &household).await?;
            self.cache.set_household_ref(&b.ephem_id, &household).await?;
            self.cache.append_membership(&household, &a.ephem_id).await?;
            self.cache.append_membership(&household, &b.ephem_id).await?;
            self.cache.add_edge(&household, &a.ephem_id, &b.ephem_id, score).await?;
            Ok(LinkOutcome { household_a: household.clone(), household_b: household, shared_household: true })
        } else {
            let household_a = self.hash(&format!("{user_a}soloHouse"));
            let household_b = self.hash(&format!("{user_b}soloHouse"));
            self.graph.link_user_to_household(&user_a, &household_a, score).await?;
            self.graph.link_user_to_household(&user_b, &household_b, score).await?;
            self.cache.set_household_ref(&a.ephem_id, &household_a).await?;
            self.cache.set_household_ref(&b.ephem_id, &household_b).await?;
            Ok(LinkOutcome { household_a, household_b, shared_household: false })
        }
    }
}
