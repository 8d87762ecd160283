//! Key-value storage backing the session registry.
//!
//! Values are opaque strings (the auth layer stores JSON), every key may carry a TTL,
//! and keys can be enumerated by prefix in lexicographic order.

use std::time::Duration;

use async_trait::async_trait;
use derive_more::{Display, Error};

pub mod memory;

pub use memory::MemorySessionStore;

/// Read-modify-write step for [`SessionStore::update`]. Gets the live value (if any) and
/// returns the value to store, or `None` to delete the key.
pub type UpdateFn = Box<dyn FnOnce(Option<&str>) -> Option<String> + Send>;

#[derive(Debug, Display, Error)]
pub enum StoreError {
    #[display(fmt = "session store unavailable: {}", _0)]
    Unavailable(#[error(not(source))] String),
    #[display(fmt = "corrupt value under `{}`", _0)]
    Corrupt(#[error(not(source))] String),
}

/// A window of keys together with the number of keys matching the prefix,
/// both taken from the same snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyPage {
    pub keys: Vec<String>,
    pub total: u64,
}

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// `ttl` of `None` stores the key without expiry.
    async fn set(&self, key: &str, value: String, ttl: Option<Duration>) -> Result<(), StoreError>;

    /// Returns false and leaves the existing value alone when the key is live.
    async fn set_if_absent(
        &self,
        key: &str,
        value: String,
        ttl: Option<Duration>,
    ) -> Result<bool, StoreError>;

    /// Applies `f` to the current value and writes its result back as one atomic step.
    /// `ttl` of `Some` resets the expiry, `None` keeps the current deadline (a new key
    /// never expires). Returns the value stored before the update.
    async fn update(
        &self,
        key: &str,
        ttl: Option<Duration>,
        f: UpdateFn,
    ) -> Result<Option<String>, StoreError>;

    /// Returns whether a live key was removed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// Remaining lifetime. `None` when the key is missing, `Some(None)` when it never expires.
    async fn ttl(&self, key: &str) -> Result<Option<Option<Duration>>, StoreError>;

    async fn multi_get(&self, keys: &[String]) -> Result<Vec<Option<String>>, StoreError>;

    async fn search_keys(
        &self,
        prefix: &str,
        offset: usize,
        limit: usize,
    ) -> Result<Vec<String>, StoreError>;

    async fn count_keys(&self, prefix: &str) -> Result<u64, StoreError>;

    /// Atomic combination of [`SessionStore::search_keys`] and [`SessionStore::count_keys`].
    async fn scan(&self, prefix: &str, offset: usize, limit: usize) -> Result<KeyPage, StoreError>;

    /// Drops every expired key, returning how many were removed.
    async fn purge_expired(&self) -> Result<usize, StoreError>;
}
