//! Pricing memoisation: LRU with TTL
//!
//! Keyed on the full resolver input with the calculation time truncated
//! to the minute, so a snapshot never outlives a rule-window boundary by
//! more than the TTL. Admin edits drop only the affected entries via the
//! `(station, plan, rule)` invalidation keys.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::domain::TariffSnapshot;

const DEFAULT_TTL: Duration = Duration::from_secs(300);
const DEFAULT_CAPACITY: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    station_id: String,
    connector_type: Option<String>,
    /// Power in deci-kW; floats are not hashable.
    power_dkw: Option<i64>,
    /// Calculation time truncated to the minute.
    minute: i64,
    client_id: Option<Uuid>,
}

impl CacheKey {
    pub fn new(
        station_id: &str,
        connector_type: Option<&str>,
        power_kw: Option<f64>,
        at: DateTime<Utc>,
        client_id: Option<Uuid>,
    ) -> Self {
        Self {
            station_id: station_id.to_string(),
            connector_type: connector_type.map(str::to_string),
            power_dkw: power_kw.map(|p| (p * 10.0).round() as i64),
            minute: at.timestamp() / 60,
            client_id,
        }
    }
}

struct Entry {
    snapshot: TariffSnapshot,
    inserted_at: Instant,
    station_id: String,
}

struct Inner {
    map: HashMap<CacheKey, Entry>,
    order: VecDeque<CacheKey>,
}

pub struct PricingCache {
    inner: Mutex<Inner>,
    ttl: Duration,
    capacity: usize,
}

impl PricingCache {
    pub fn new() -> Self {
        Self::with_settings(DEFAULT_TTL, DEFAULT_CAPACITY)
    }

    pub fn with_settings(ttl: Duration, capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                map: HashMap::new(),
                order: VecDeque::new(),
            }),
            ttl,
            capacity,
        }
    }

    pub fn get(&self, key: &CacheKey) -> Option<TariffSnapshot> {
        self.get_at(key, Instant::now())
    }

    pub fn put(&self, key: CacheKey, snapshot: TariffSnapshot) {
        self.put_at(key, snapshot, Instant::now())
    }

    fn get_at(&self, key: &CacheKey, now: Instant) -> Option<TariffSnapshot> {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        match inner.map.get(key) {
            Some(entry) if now.duration_since(entry.inserted_at) < self.ttl => {
                let snapshot = entry.snapshot.clone();
                // Refresh recency
                inner.order.retain(|k| k != key);
                inner.order.push_back(key.clone());
                Some(snapshot)
            }
            Some(_) => {
                inner.map.remove(key);
                inner.order.retain(|k| k != key);
                None
            }
            None => None,
        }
    }

    fn put_at(&self, key: CacheKey, snapshot: TariffSnapshot, now: Instant) {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        let station_id = key.station_id.clone();
        inner.order.retain(|k| k != &key);
        inner.order.push_back(key.clone());
        inner.map.insert(
            key,
            Entry {
                snapshot,
                inserted_at: now,
                station_id,
            },
        );

        while inner.map.len() > self.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.map.remove(&oldest);
        }
    }

    /// Drop every entry computed for a station.
    pub fn invalidate_station(&self, station_id: &str) {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        inner.map.retain(|_, entry| entry.station_id != station_id);
        let live: Vec<CacheKey> = inner.map.keys().cloned().collect();
        inner.order.retain(|k| live.contains(k));
    }

    /// Drop entries whose snapshot came from a plan.
    pub fn invalidate_plan(&self, plan_id: Uuid) {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        inner
            .map
            .retain(|_, entry| entry.snapshot.tariff_plan_id != Some(plan_id));
        let live: Vec<CacheKey> = inner.map.keys().cloned().collect();
        inner.order.retain(|k| live.contains(k));
    }

    /// Drop entries whose snapshot came from a rule.
    pub fn invalidate_rule(&self, rule_id: Uuid) {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        inner
            .map
            .retain(|_, entry| entry.snapshot.rule_id != Some(rule_id));
        let live: Vec<CacheKey> = inner.map.keys().cloned().collect();
        inner.order.retain(|k| live.contains(k));
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        inner.map.clear();
        inner.order.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(|p| p.into_inner()).map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for PricingCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(station: &str, minute_offset: i64) -> CacheKey {
        CacheKey {
            station_id: station.to_string(),
            connector_type: None,
            power_dkw: None,
            minute: 1_000_000 + minute_offset,
            client_id: None,
        }
    }

    #[test]
    fn hit_within_ttl() {
        let cache = PricingCache::new();
        cache.put(key("ST-1", 0), TariffSnapshot::default_tariff());
        assert!(cache.get(&key("ST-1", 0)).is_some());
        assert!(cache.get(&key("ST-1", 1)).is_none());
        assert!(cache.get(&key("ST-2", 0)).is_none());
    }

    #[test]
    fn entry_expires_after_ttl() {
        let cache = PricingCache::with_settings(Duration::from_secs(300), 16);
        let t0 = Instant::now();
        cache.put_at(key("ST-1", 0), TariffSnapshot::default_tariff(), t0);

        let before_expiry = t0 + Duration::from_secs(299);
        assert!(cache.get_at(&key("ST-1", 0), before_expiry).is_some());

        let after_expiry = t0 + Duration::from_secs(301);
        assert!(cache.get_at(&key("ST-1", 0), after_expiry).is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn lru_evicts_oldest() {
        let cache = PricingCache::with_settings(Duration::from_secs(300), 2);
        cache.put(key("ST-1", 0), TariffSnapshot::default_tariff());
        cache.put(key("ST-2", 0), TariffSnapshot::default_tariff());
        // Touch ST-1 so ST-2 is the least recently used
        assert!(cache.get(&key("ST-1", 0)).is_some());
        cache.put(key("ST-3", 0), TariffSnapshot::default_tariff());

        assert!(cache.get(&key("ST-1", 0)).is_some());
        assert!(cache.get(&key("ST-2", 0)).is_none());
        assert!(cache.get(&key("ST-3", 0)).is_some());
    }

    #[test]
    fn invalidation_by_station_and_rule() {
        let cache = PricingCache::new();
        let rule_id = Uuid::new_v4();
        let mut snapshot = TariffSnapshot::default_tariff();
        snapshot.rule_id = Some(rule_id);

        cache.put(key("ST-1", 0), snapshot);
        cache.put(key("ST-2", 0), TariffSnapshot::default_tariff());

        cache.invalidate_rule(rule_id);
        assert!(cache.get(&key("ST-1", 0)).is_none());
        assert!(cache.get(&key("ST-2", 0)).is_some());

        cache.invalidate_station("ST-2");
        assert!(cache.is_empty());
    }
}
