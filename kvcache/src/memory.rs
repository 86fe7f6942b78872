use crate::{CacheResult, DailyAggRecord, HouseholdEdgeBook, KvCache, FUZZY_QUEUE_TTL};
use async_trait::async_trait;
use householdiq_core::time::unix_now;
use householdiq_identity_core::EventId;
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::time::Duration;

/// A record with a TTL deadline in milliseconds since epoch. Expired records
/// are treated as absent on read and replaced on write.
#[derive(Debug, Clone)]
struct Expiring<T> {
    value: T,
    deadline: u64,
}

impl<T> Expiring<T> {
    fn new(value: T, ttl: Duration) -> Self {
        Self { value, deadline: unix_now().saturating_add(ttl.as_millis() as u64) }
    }

    fn live(&self) -> bool {
        self.deadline > unix_now()
    }
}

/// In-process implementation of the KV cache contract.
///
/// All records except the fuzzy queue carry the retention-window TTL; the
/// queue uses [`FUZZY_QUEUE_TTL`]. The daily-aggregate map sits behind a
/// mutex, which serializes increments and rules out lost updates.
pub struct MemoryKvCache {
    retention: Duration,
    household_refs: RwLock<HashMap<String, Expiring<String>>>,
    memberships: RwLock<HashMap<String, Expiring<Vec<String>>>>,
    edge_books: RwLock<HashMap<String, Expiring<HouseholdEdgeBook>>>,
    email_index: RwLock<HashMap<String, Expiring<Vec<EventId>>>>,
    fuzzy_queue: Mutex<Option<Expiring<Vec<EventId>>>>,
    daily: Mutex<HashMap<String, Expiring<HashMap<String, u64>>>>,
}

impl MemoryKvCache {
    pub fn new(retention: Duration) -> Self {
        Self {
            retention,
            household_refs: RwLock::new(HashMap::new()),
            memberships: RwLock::new(HashMap::new()),
            edge_books: RwLock::new(HashMap::new()),
            email_index: RwLock::new(HashMap::new()),
            fuzzy_queue: Mutex::new(None),
            daily: Mutex::new(HashMap::new()),
        }
    }

    /// Appends `item` to the live list under `key`, starting a fresh record
    /// (and TTL) when the existing one is absent or expired.
    fn append_to<T: Clone>(map: &RwLock<HashMap<String, Expiring<Vec<T>>>>, key: &str, item: T, ttl: Duration) {
        let mut guard = map.write();
        match guard.get_mut(key) {
            Some(record) if record.live() => {
                record.value.push(item);
                record.deadline = unix_now().saturating_add(ttl.as_millis() as u64);
            }
            _ => {
                guard.insert(key.to_string(), Expiring::new(vec![item], ttl));
            }
        }
    }

    fn read_list<T: Clone>(map: &RwLock<HashMap<String, Expiring<Vec<T>>>>, key: &str) -> Vec<T> {
        map.read().get(key).filter(|record| record.live()).map(|record| record.value.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl KvCache for MemoryKvCache {
    async fn set_household_ref(&self, ephem_id: &str, household_id: &str) -> CacheResult<()> {
        self.household_refs.write().insert(ephem_id.to_string(), Expiring::new(household_id.to_string(), self.retention));
        Ok(())
    }

    async fn get_household_ref(&self, ephem_id: &str) -> CacheResult<Option<String>> {
        Ok(self.household_refs.read().get(ephem_id).filter(|record| record.live()).map(|record| record.value.clone()))
    }

    async fn append_membership(&self, household_id: &str, ephem_id: &str) -> CacheResult<()> {
        Self::append_to(&self.memberships, household_id, ephem_id.to_string(), self.retention);
        Ok(())
    }

    async fn household_members(&self, household_id: &str) -> CacheResult<Vec<String>> {
        Ok(Self::read_list(&self.memberships, household_id))
    }

    async fn add_edge(&self, household_id: &str, ephem_a: &str, ephem_b: &str, score: f64) -> CacheResult<()> {
        let mut guard = self.edge_books.write();
        let mut book = match guard.get(household_id) {
            Some(record) if record.live() => record.value.clone(),
            _ => HouseholdEdgeBook::default(),
        };
        book.insert(ephem_a, ephem_b, score);
        guard.insert(household_id.to_string(), Expiring::new(book, self.retention));
        Ok(())
    }

    async fn average_score(&self, household_id: &str) -> CacheResult<f64> {
        Ok(self.edge_books.read().get(household_id).filter(|record| record.live()).map(|record| record.value.average()).unwrap_or(0.0))
    }

    async fn index_email(&self, hashed_email: &str, event_id: EventId) -> CacheResult<()> {
        Self::append_to(&self.email_index, hashed_email, event_id, self.retention);
        Ok(())
    }

    async fn email_events(&self, hashed_email: &str) -> CacheResult<Vec<EventId>> {
        Ok(Self::read_list(&self.email_index, hashed_email))
    }

    async fn enqueue_fuzzy(&self, event_id: EventId) -> CacheResult<()> {
        let mut guard = self.fuzzy_queue.lock();
        match guard.as_mut() {
            Some(record) if record.live() => {
                record.value.push(event_id);
                record.deadline = unix_now().saturating_add(FUZZY_QUEUE_TTL.as_millis() as u64);
            }
            _ => *guard = Some(Expiring::new(vec![event_id], FUZZY_QUEUE_TTL)),
        }
        Ok(())
    }

    async fn pop_fuzzy_batch(&self) -> CacheResult<Vec<EventId>> {
        let record = self.fuzzy_queue.lock().take();
        Ok(record.filter(|record| record.live()).map(|record| record.value).unwrap_or_default())
    }

    async fn increment_daily(&self, date: &str, field_key: &str) -> CacheResult<()> {
        let mut guard = self.daily.lock();
        match guard.get_mut(date) {
            Some(record) if record.live() => {
                *record.value.entry(field_key.to_string()).or_insert(0) += 1;
                record.deadline = unix_now().saturating_add(self.retention.as_millis() as u64);
            }
            _ => {
                guard.insert(date.to_string(), Expiring::new(HashMap::from([(field_key.to_string(), 1)]), self.retention));
            }
        }
        Ok(())
    }

    async fn daily_records(&self) -> CacheResult<Vec<DailyAggRecord>> {
        Ok(self
            .daily
            .lock()
            .iter()
            .filter(|(_, record)| record.live())
            .map(|(date, record)| DailyAggRecord { date: date.clone(), counts: record.value.clone() })
            .collect())
    }

    async fn remove_daily(&self, date: &str) -> CacheResult<()> {
        self.daily.lock().remove(date);
        Ok(())
    }
}
