//! Key/value store adapter.
//!
//! Session records live in an external store reached through the
//! [`SessionBackend`] trait. Two backends ship with the crate:
//!
//! - [`RedisBackend`]: any Redis-protocol server (Redis, Valkey, KeyDB)
//! - [`MemoryBackend`]: an in-process map for tests and local development
//!
//! Every operation is async and reports failures as a [`SessionError`]
//! value; nothing panics on a store failure.
//!
//! [`SessionError`]: crate::SessionError

mod memory;
mod redis_backend;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::Result;

pub use self::memory::MemoryBackend;
pub use self::redis_backend::RedisBackend;

/// Capacity of the connection event channel.
pub(crate) const EVENT_CAPACITY: usize = 16;

/// Connection lifecycle notification emitted by a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// A connection to the store was established.
    Connected,
    /// A store command or connection attempt failed.
    Error(String),
    /// The backend was explicitly disconnected.
    Disconnected,
}

/// Operations the session layer needs from a key/value store.
#[async_trait]
pub trait SessionBackend: Send + Sync {
    /// Whether `key` currently exists.
    async fn exists(&self, key: &str) -> Result<bool>;

    /// Fetch the value stored under `key`, if any.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key` with no expiry.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Store `value` under `key`, expiring after `ttl_secs`.
    async fn set_with_expiry(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()>;

    /// Remove `key`. Returns whether it existed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Remove every key in the store. Irreversible.
    async fn delete_all(&self) -> Result<()>;

    /// List keys matching a glob-style `pattern` (`*` wildcard).
    async fn list_keys(&self, pattern: &str) -> Result<Vec<String>>;

    /// Reset the expiry of `key` to `ttl_secs`.
    ///
    /// Returns `true` iff the key existed and its TTL was updated.
    async fn refresh_expiry(&self, key: &str, ttl_secs: u64) -> Result<bool>;

    /// Close the connection. Later operations fail with `ConnectionClosed`.
    async fn disconnect(&self) -> Result<()>;

    /// Subscribe to connection lifecycle events.
    fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent>;
}
