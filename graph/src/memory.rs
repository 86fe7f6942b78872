use crate::{EventNode, GraphCounts, GraphResult, GraphStore};
use async_trait::async_trait;
use householdiq_core::time::unix_now;
use householdiq_identity_core::EphemeralEvent;
use parking_lot::RwLock;
use std::collections::HashMap;

type EdgeMap = HashMap<(String, String), f64>;

#[derive(Default)]
struct Inner {
    events: HashMap<String, EventNode>,
    devices: HashMap<String, u64>,
    users: HashMap<String, u64>,
    households: HashMap<String, u64>,
    from_device: EdgeMap,
    used_by: EdgeMap,
    member_of: EdgeMap,
}

impl Inner {
    /// Relationship upsert with set-max confidence
    fn link(edges: &mut EdgeMap, from: &str, to: &str, confidence: f64) {
        let entry = edges.entry((from.to_string(), to.to_string())).or_insert(confidence);
        if *entry < confidence {
            *entry = confidence;
        }
    }

    fn links_from(edges: &EdgeMap, from: &str) -> Vec<(String, f64)> {
        edges.iter().filter(|((a, _), _)| a == from).map(|((_, b), confidence)| (b.clone(), *confidence)).collect()
    }
}

/// In-process implementation of the graph contract
#[derive(Default)]
pub struct MemoryGraphStore {
    inner: RwLock<Inner>,
}

impl MemoryGraphStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GraphStore for MemoryGraphStore {
    async fn merge_event(&self, event: &EphemeralEvent) -> GraphResult<()> {
        let now = unix_now();
        let mut inner = self.inner.write();
        match inner.events.get_mut(&event.ephem_id) {
            Some(node) => node.last_seen = now,
            None => {
                let node = EventNode {
                    id: event.ephem_id.clone(),
                    partial_keys: serde_json::to_string(&event.partial_keys)?,
                    timestamp: event.timestamp,
                    created_at: now,
                    last_seen: now,
                };
                inner.events.insert(event.ephem_id.clone(), node);
            }
        }
        Ok(())
    }

    async fn link_event_to_device(&self, ephem_id: &str, device_id: &str, confidence: f64) -> GraphResult<()> {
        let now = unix_now();
        let mut inner = self.inner.write();
        inner.devices.entry(device_id.to_string()).or_insert(now);
        // MERGE the event endpoint as a bare node when it was not seen yet
        inner.events.entry(ephem_id.to_string()).or_insert_with(|| EventNode {
            id: ephem_id.to_string(),
            partial_keys: "{}".to_string(),
            timestamp: now,
            created_at: now,
            last_seen: now,
        });
        Inner::link(&mut inner.from_device, ephem_id, device_id, confidence);
        Ok(())
    }

    async fn link_device_to_user(&self, device_id: &str, user_id: &str, confidence: f64) -> GraphResult<()> {
        let now = unix_now();
        let mut inner = self.inner.write();
        inner.users.entry(user_id.to_string()).or_insert(now);
        inner.devices.entry(device_id.to_string()).or_insert(now);
        Inner::link(&mut inner.used_by, device_id, user_id, confidence);
        Ok(())
    }

    async fn link_user_to_household(&self, user_id: &str, household_id: &str, confidence: f64) -> GraphResult<()> {
        let now = unix_now();
        let mut inner = self.inner.write();
        inner.households.entry(household_id.to_string()).or_insert(now);
        inner.users.entry(user_id.to_string()).or_insert(now);
        Inner::link(&mut inner.member_of, user_id, household_id, confidence);
        Ok(())
    }

    async fn prune_events_before(&self, cutoff: u64) -> GraphResult<usize> {
        let mut inner = self.inner.write();
        let doomed: Vec<String> =
            inner.events.iter().filter(|(_, node)| node.created_at < cutoff).map(|(id, _)| id.clone()).collect();
        for id in &doomed {
            inner.events.remove(id);
            inner.from_device.retain(|(from, _), _| from != id);
        }
        Ok(doomed.len())
    }

    async fn event_node(&self, ephem_id: &str) -> GraphResult<Option<EventNode>> {
        Ok(self.inner.read().events.get(ephem_id).cloned())
    }

    async fn device_links(&self, ephem_id: &str) -> GraphResult<Vec<(String, f64)>> {
        Ok(Inner::links_from(&self.inner.read().from_device, ephem_id))
    }

    async fn user_links(&self, device_id: &str) -> GraphResult<Vec<(String, f64)>> {
        Ok(Inner::links_from(&self.inner.read().used_by, device_id))
    }

    async fn household_links(&self, user_id: &str) -> GraphResult<Vec<(String, f64)>> {
        Ok(Inner::links_from(&self.inner.read().member_of, user_id))
    }

    async fn counts(&self) -> GraphResult<GraphCounts> {
        let inner = self.inner.read();
        Ok(GraphCounts {
            events: inner.events.len(),
            devices: inner.devices.len(),
            users: inner.users.len(),
            households: inner.households.len(),
            relationships: inner.from_device.len() + inner.used_by.len() + inner.member_of.len(),
        })
    }
}
