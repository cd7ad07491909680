//! Credential store.
//!
//! Key-value storage with per-key expiry, holding the mapping from refresh
//! token to the access token it was issued with. Only per-key atomicity is
//! assumed; nothing here locks across keys.

mod memory;
mod redis_store;

pub use memory::MemoryStore;
pub use redis_store::RedisStore;

use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Insert or overwrite `key`, expiring after `ttl`.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Bring the expiry of an existing key forward to at most `ttl` from now.
    /// A key that already expires sooner keeps its deadline. Returns whether the
    /// deadline moved; `false` also covers an absent key.
    async fn shorten_expiry(&self, key: &str, ttl: Duration) -> Result<bool, StoreError>;

    /// Remove `key`. Returns whether anything was deleted.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    async fn ping(&self) -> Result<(), StoreError>;
}
