use std::{
    collections::BTreeMap,
    ops::Bound,
    sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard},
    time::{Duration, Instant},
};

use async_trait::async_trait;
use log::{debug, warn};

use super::{KeyPage, SessionStore, StoreError, UpdateFn};

struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    /// A ttl too large to represent as a deadline never expires.
    fn new(value: String, ttl: Option<Duration>) -> Self {
        Self {
            value,
            expires_at: ttl.and_then(|ttl| Instant::now().checked_add(ttl)),
        }
    }

    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| at > now)
    }
}

/// Process local [`SessionStore`].
///
/// Expired keys are invisible to every read as soon as their deadline passes;
/// they are physically removed by [`SessionStore::purge_expired`], which the
/// sweeper task calls periodically.
#[derive(Default)]
pub struct MemorySessionStore {
    entries: RwLock<BTreeMap<String, Entry>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, BTreeMap<String, Entry>>, StoreError> {
        self.entries
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".into()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, BTreeMap<String, Entry>>, StoreError> {
        self.entries
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".into()))
    }
}

/// Live keys starting with `prefix`, in key order.
fn live_keys_with_prefix<'a>(
    map: &'a BTreeMap<String, Entry>,
    prefix: &'a str,
    now: Instant,
) -> impl Iterator<Item = &'a String> + 'a {
    map.range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
        .take_while(move |(key, _)| key.starts_with(prefix))
        .filter(move |(_, entry)| entry.is_live(now))
        .map(|(key, _)| key)
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        let map = self.read()?;

        Ok(map
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), StoreError> {
        self.write()?.insert(key.to_owned(), Entry::new(value, ttl));
        Ok(())
    }

    async fn set_if_absent(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError> {
        let now = Instant::now();
        let mut map = self.write()?;

        if map.get(key).is_some_and(|entry| entry.is_live(now)) {
            return Ok(false);
        }

        map.insert(key.to_owned(), Entry::new(value, ttl));
        Ok(true)
    }

    async fn update(
        &self,
        key: &str,
        ttl: Option<Duration>,
        f: UpdateFn,
    ) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        let mut map = self.write()?;

        let previous = map.remove(key).filter(|entry| entry.is_live(now));
        let next = f(previous.as_ref().map(|entry| entry.value.as_str()));

        if let Some(value) = next {
            let entry = match (ttl, &previous) {
                (None, Some(old)) => Entry {
                    value,
                    expires_at: old.expires_at,
                },
                _ => Entry::new(value, ttl),
            };
            map.insert(key.to_owned(), entry);
        }

        Ok(previous.map(|entry| entry.value))
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let now = Instant::now();
        let removed = self.write()?.remove(key);
        Ok(removed.is_some_and(|entry| entry.is_live(now)))
    }

    async fn ttl(&self, key: &str) -> Result<Option<Option<Duration>>, StoreError> {
        let now = Instant::now();
        let map = self.read()?;

        Ok(map
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.expires_at.map(|at| at.saturating_duration_since(now))))
    }

    async fn multi_get(&self, keys: &[String]) -> Result<Vec<Option<String>>, StoreError> {
        let now = Instant::now();
        let map = self.read()?;

        Ok(keys
            .iter()
            .map(|key| {
                map.get(key)
                    .filter(|entry| entry.is_live(now))
                    .map(|entry| entry.value.clone())
            })
            .collect())
    }

    async fn search_keys(
        &self,
        prefix: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<String>, StoreError> {
        let now = Instant::now();
        let map = self.read()?;

        Ok(live_keys_with_prefix(&map, prefix, now)
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count_keys(&self, prefix: &str) -> Result<u64, StoreError> {
        let now = Instant::now();
        let map = self.read()?;

        Ok(live_keys_with_prefix(&map, prefix, now).count() as u64)
    }

    async fn scan(&self, prefix: &str, offset: usize, limit: usize) -> Result<KeyPage, StoreError> {
        let now = Instant::now();
        let map = self.read()?;

        let mut keys = Vec::with_capacity(limit.min(64));
        let mut total = 0u64;
        for (i, key) in live_keys_with_prefix(&map, prefix, now).enumerate() {
            if i >= offset && keys.len() < limit {
                keys.push(key.clone());
            }
            total += 1;
        }

        Ok(KeyPage { keys, total })
    }

    async fn purge_expired(&self) -> Result<usize, StoreError> {
        let now = Instant::now();
        let mut map = self.write()?;

        let before = map.len();
        map.retain(|_, entry| entry.is_live(now));
        Ok(before - map.len())
    }
}

/// Periodically purges expired keys from `store` on the current actix runtime.
pub fn spawn_sweeper(store: Arc<dyn SessionStore>, every: Duration) {
    actix_rt::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            interval.tick().await;
            match store.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => debug!("session sweeper purged {} expired keys", purged),
                Err(e) => warn!("session sweeper failed: {}", e),
            }
        }
    });
}
