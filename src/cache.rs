use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::models::Lang;

/// How long an assembled menu stays fresh.
pub const MENU_DATA_TTL: Duration = Duration::from_secs(5 * 60);
/// Categories change less frequently.
pub const CATEGORIES_TTL: Duration = Duration::from_secs(10 * 60);
pub const DISHES_TTL: Duration = Duration::from_secs(5 * 60);
/// Today's menu rolls over daily, keep it short.
pub const MENU_OF_THE_DAY_TTL: Duration = Duration::from_secs(2 * 60);
pub const WEEK_MENU_TTL: Duration = Duration::from_secs(30 * 60);
/// How often the background task sweeps expired entries.
pub const CLEANUP_INTERVAL: Duration = Duration::from_secs(10 * 60);

/// Key namespace for the shared cache. The aggregator only stores fully
/// assembled menus (`menu_data_*`) and today's dish list
/// (`menu_of_the_day_*`); the remaining prefixes are reserved for
/// finer-grained caching.
pub mod cache_key {
    use super::Lang;

    pub fn menu_data(lang: Lang) -> String {
        format!("menu_data_{}", lang)
    }

    pub fn categories(lang: Lang) -> String {
        format!("categories_{}", lang)
    }

    pub fn dishes(lang: Lang) -> String {
        format!("dishes_{}", lang)
    }

    pub fn menu_of_the_day(lang: Lang) -> String {
        format!("menu_of_the_day_{}", lang)
    }

    pub fn week_menu(lang: Lang) -> String {
        format!("week_menu_{}", lang)
    }
}

struct CacheEntry {
    value: Value,
    stored_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        // A zero TTL is already expired on the very next read.
        self.ttl.is_zero() || self.stored_at.elapsed() > self.ttl
    }
}

struct CacheState {
    entries: HashMap<String, CacheEntry>,
    // Insertion order of live keys, for stats().
    order: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub keys: Vec<String>,
}

/// In-process key/value store with per-entry expiry.
///
/// Values are opaque JSON so one store can hold every cached payload. Expiry
/// is lazy: `get` drops an expired entry when it sees one, and the periodic
/// `cleanup` sweeps the rest. The whole-map mutex is the concurrency model;
/// every operation is a short critical section.
pub struct TtlCache {
    inner: Mutex<CacheState>,
}

impl TtlCache {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(CacheState {
                entries: HashMap::new(),
                order: Vec::new(),
            }),
        }
    }

    /// Returns the stored value if it exists and has not expired.
    pub fn get(&self, key: &str) -> Option<Value> {
        let mut state = self.inner.lock().expect("cache mutex poisoned");

        let expired = match state.entries.get(key) {
            None => return None,
            Some(entry) => entry.is_expired(),
        };

        if expired {
            state.entries.remove(key);
            state.order.retain(|k| k != key);
            return None;
        }

        state.entries.get(key).map(|entry| entry.value.clone())
    }

    /// Stores a value, unconditionally overwriting any existing entry and
    /// resetting its clock.
    pub fn set(&self, key: &str, value: Value, ttl: Duration) {
        let mut state = self.inner.lock().expect("cache mutex poisoned");

        if !state.entries.contains_key(key) {
            state.order.push(key.to_string());
        }
        state.entries.insert(
            key.to_string(),
            CacheEntry {
                value,
                stored_at: Instant::now(),
                ttl,
            },
        );
    }

    /// Removes an entry if present. Absent keys are not an error.
    pub fn delete(&self, key: &str) {
        let mut state = self.inner.lock().expect("cache mutex poisoned");
        state.entries.remove(key);
        state.order.retain(|k| k != key);
    }

    /// Removes every entry.
    pub fn clear(&self) {
        let mut state = self.inner.lock().expect("cache mutex poisoned");
        state.entries.clear();
        state.order.clear();
    }

    /// Proactively removes all currently-expired entries.
    pub fn cleanup(&self) {
        let mut state = self.inner.lock().expect("cache mutex poisoned");
        state.entries.retain(|_, entry| !entry.is_expired());
        let live: Vec<String> = state
            .order
            .iter()
            .filter(|k| state.entries.contains_key(*k))
            .cloned()
            .collect();
        state.order = live;
    }

    pub fn stats(&self) -> CacheStats {
        let state = self.inner.lock().expect("cache mutex poisoned");
        CacheStats {
            size: state.entries.len(),
            keys: state.order.clone(),
        }
    }
}

impl Default for TtlCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_get_returns_stored_value() {
        let cache = TtlCache::new();
        cache.set("a", json!({"n": 1}), Duration::from_secs(60));
        assert_eq!(cache.get("a"), Some(json!({"n": 1})));
    }

    #[test]
    fn test_get_missing_key() {
        let cache = TtlCache::new();
        assert_eq!(cache.get("nope"), None);
    }

    #[test]
    fn test_zero_ttl_expires_immediately() {
        let cache = TtlCache::new();
        cache.set("a", json!(1), Duration::ZERO);
        assert_eq!(cache.get("a"), None);
        // The expired entry was dropped on read.
        assert_eq!(cache.stats().size, 0);
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let cache = TtlCache::new();
        cache.set("a", json!(1), Duration::from_millis(10));
        assert_eq!(cache.get("a"), Some(json!(1)));
        std::thread::sleep(Duration::from_millis(25));
        assert_eq!(cache.get("a"), None);
    }

    #[test]
    fn test_set_overwrites_and_resets_clock() {
        let cache = TtlCache::new();
        cache.set("a", json!(1), Duration::from_millis(10));
        std::thread::sleep(Duration::from_millis(25));
        cache.set("a", json!(2), Duration::from_secs(60));
        assert_eq!(cache.get("a"), Some(json!(2)));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let cache = TtlCache::new();
        cache.set("a", json!(1), Duration::from_secs(60));
        cache.delete("a");
        cache.delete("a");
        assert_eq!(cache.get("a"), None);
    }

    #[test]
    fn test_clear_removes_everything() {
        let cache = TtlCache::new();
        cache.set("a", json!(1), Duration::from_secs(60));
        cache.set("b", json!(2), Duration::from_secs(60));
        cache.clear();
        assert_eq!(cache.stats().size, 0);
        assert!(cache.stats().keys.is_empty());
    }

    #[test]
    fn test_cleanup_sweeps_only_expired_entries() {
        let cache = TtlCache::new();
        cache.set("stale", json!(1), Duration::ZERO);
        cache.set("fresh", json!(2), Duration::from_secs(60));
        cache.cleanup();

        let stats = cache.stats();
        assert_eq!(stats.size, 1);
        assert_eq!(stats.keys, vec!["fresh".to_string()]);
        assert_eq!(cache.get("fresh"), Some(json!(2)));
    }

    #[test]
    fn test_stats_preserves_insertion_order() {
        let cache = TtlCache::new();
        cache.set("first", json!(1), Duration::from_secs(60));
        cache.set("second", json!(2), Duration::from_secs(60));
        cache.set("third", json!(3), Duration::from_secs(60));
        // Overwriting keeps the original position.
        cache.set("first", json!(10), Duration::from_secs(60));

        assert_eq!(
            cache.stats().keys,
            vec![
                "first".to_string(),
                "second".to_string(),
                "third".to_string()
            ]
        );
    }

    #[test]
    fn test_cache_key_namespace() {
        assert_eq!(cache_key::menu_data(Lang::Es), "menu_data_es");
        assert_eq!(cache_key::categories(Lang::En), "categories_en");
        assert_eq!(cache_key::dishes(Lang::De), "dishes_de");
        assert_eq!(cache_key::menu_of_the_day(Lang::Es), "menu_of_the_day_es");
        assert_eq!(cache_key::week_menu(Lang::En), "week_menu_en");
    }
}
