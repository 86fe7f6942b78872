//! The ephemeral derived-state cache: household references, membership
//! lists, the per-household edge book, the hashed-email index, the fuzzy
//! bridging queue and the coalesced daily-aggregate counters.
//!
//! Everything held here is rebuildable; losing the cache must never corrupt
//! the property graph or the relational store.

mod errors;
mod memory;

pub use errors::{CacheError, CacheResult};
pub use memory::MemoryKvCache;

use async_trait::async_trait;
use householdiq_identity_core::EventId;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub const BRIDGE_SET: &str = "bridgeSet";
pub const HOUSE_SET: &str = "houseSet";
pub const HOUSE_SCORE_SET: &str = "houseScoreSet";
pub const DAILY_AGG_SET: &str = "dailyAggSet";
pub const EMAIL_INDEX_SET: &str = "emailIndexSet";
pub const FUZZY_QUEUE_SET: &str = "fuzzyQueueSet";

/// Short queue TTL so an outage cannot retain queued ids forever
pub const FUZZY_QUEUE_TTL: Duration = Duration::from_secs(3600);

/// Per-household edge book: one score per sorted ephemeral pair plus running
/// sums for averaging.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HouseholdEdgeBook {
    pub edges: HashMap<String, f64>,
    pub sum_score: f64,
    pub count_score: u64,
}

impl HouseholdEdgeBook {
    pub fn pair_key(ephem_a: &str, ephem_b: &str) -> String {
        let mut pair = [ephem_a, ephem_b];
        pair.sort_unstable();
        pair.join("|")
    }

    /// First insert of a pair updates the sums; re-inserts are no-ops
    pub fn insert(&mut self, ephem_a: &str, ephem_b: &str, score: f64) {
        let key = Self::pair_key(ephem_a, ephem_b);
        if !self.edges.contains_key(&key) {
            self.edges.insert(key, score);
            self.sum_score += score;
            self.count_score += 1;
        }
    }

    pub fn average(&self) -> f64 {
        if self.count_score == 0 {
            0.0
        } else {
            self.sum_score / self.count_score as f64
        }
    }
}

/// One buffered daily-aggregate record: `partner|device|event` keyed counts
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DailyAggRecord {
    pub date: String,
    pub counts: HashMap<String, u64>,
}

/// The KV cache contract consumed by the bridging engine and the background
/// workers. Implementations over a networked store must bound every call
/// with a timeout and keep `increment_daily` lost-update free (CAS retry or
/// an equivalent per-key serialization).
#[async_trait]
pub trait KvCache: Send + Sync {
    /// Overwrites the `ephem_id -> household_id` mapping
    async fn set_household_ref(&self, ephem_id: &str, household_id: &str) -> CacheResult<()>;
    async fn get_household_ref(&self, ephem_id: &str) -> CacheResult<Option<String>>;

    /// Appends to the household membership list; duplicates are tolerated and
    /// deduplicated by readers
    async fn append_membership(&self, household_id: &str, ephem_id: &str) -> CacheResult<()>;
    async fn household_members(&self, household_id: &str) -> CacheResult<Vec<String>>;

    async fn add_edge(&self, household_id: &str, ephem_a: &str, ephem_b: &str, score: f64) -> CacheResult<()>;
    async fn average_score(&self, household_id: &str) -> CacheResult<f64>;

    async fn index_email(&self, hashed_email: &str, event_id: EventId) -> CacheResult<()>;
    async fn email_events(&self, hashed_email: &str) -> CacheResult<Vec<EventId>>;

    async fn enqueue_fuzzy(&self, event_id: EventId) -> CacheResult<()>;
    /// Reads and removes the whole queue. A drainer losing the race simply
    /// observes an empty queue.
    async fn pop_fuzzy_batch(&self) -> CacheResult<Vec<EventId>>;

    async fn increment_daily(&self, date: &str, field_key: &str) -> CacheResult<()>;
    async fn daily_records(&self) -> CacheResult<Vec<DailyAggRecord>>;
    /// Called after a record was flushed downstream; failed dates stay buffered
    async fn remove_daily(&self, date: &str) -> CacheResult<()>;
}

pub type DynKvCache = Arc<dyn KvCache>;
