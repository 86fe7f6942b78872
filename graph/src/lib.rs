//! The linkage topology: Event, Device, User and Household nodes joined by
//! `FROM_DEVICE`, `USED_BY` and `MEMBER_OF` relationships whose confidence is
//! monotonically non-decreasing. Every operation is an idempotent upsert, so
//! out-of-order and duplicate processing converge.

mod errors;
mod memory;

pub use errors::{GraphError, GraphResult};
pub use memory::MemoryGraphStore;

use async_trait::async_trait;
use householdiq_identity_core::EphemeralEvent;
use std::sync::Arc;

/// Snapshot of an `Event` node
#[derive(Debug, Clone, PartialEq)]
pub struct EventNode {
    /// The partner-scoped ephemeral id
    pub id: String,
    /// Partial keys serialized as a JSON string property
    pub partial_keys: String,
    pub timestamp: u64,
    pub created_at: u64,
    pub last_seen: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GraphCounts {
    pub events: usize,
    pub devices: usize,
    pub users: usize,
    pub households: usize,
    pub relationships: usize,
}

/// The property-graph contract. Implementations over a networked graph must
/// bound every call with a timeout; confidence updates use set-max semantics.
#[async_trait]
pub trait GraphStore: Send + Sync {
    /// Upserts the `Event` node: creation stores the partial keys and event
    /// timestamp, every merge refreshes `lastSeen`.
    async fn merge_event(&self, event: &EphemeralEvent) -> GraphResult<()>;

    async fn link_event_to_device(&self, ephem_id: &str, device_id: &str, confidence: f64) -> GraphResult<()>;
    async fn link_device_to_user(&self, device_id: &str, user_id: &str, confidence: f64) -> GraphResult<()>;
    async fn link_user_to_household(&self, user_id: &str, household_id: &str, confidence: f64) -> GraphResult<()>;

    /// Detach-deletes `Event` nodes created before `cutoff` (ms since epoch),
    /// removing their dangling relationships. Returns the number deleted.
    async fn prune_events_before(&self, cutoff: u64) -> GraphResult<usize>;

    async fn event_node(&self, ephem_id: &str) -> GraphResult<Option<EventNode>>;
    /// `FROM_DEVICE` relationships of an event as `(device_id, confidence)`
    async fn device_links(&self, ephem_id: &str) -> GraphResult<Vec<(String, f64)>>;
    /// `USED_BY` relationships of a device as `(user_id, confidence)`
    async fn user_links(&self, device_id: &str) -> GraphResult<Vec<(String, f64)>>;
    /// `MEMBER_OF` relationships of a user as `(household_id, confidence)`
    async fn household_links(&self, user_id: &str) -> GraphResult<Vec<(String, f64)>>;
    async fn counts(&self) -> GraphResult<GraphCounts>;
}

pub type DynGraphStore = Arc<dyn GraphStore>;
