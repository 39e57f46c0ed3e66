//! In-process store backend.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast;
use tokio::time::Instant;

use super::{ConnectionEvent, SessionBackend, EVENT_CAPACITY};
use crate::error::SessionError;
use crate::Result;

/// How often a write also drops every expired entry.
const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<Instant>,
}

impl Entry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |deadline| now < deadline)
    }
}

/// Thread-safe in-memory store with per-key expiry.
///
/// Expiry follows the tokio clock, so paused-time tests can advance past a
/// TTL without sleeping. Expired entries are dropped when touched, and
/// writes sweep the whole map at most once per minute.
pub struct MemoryBackend {
    entries: RwLock<HashMap<String, Entry>>,
    next_sweep: Mutex<Instant>,
    closed: AtomicBool,
    events: broadcast::Sender<ConnectionEvent>,
}

impl MemoryBackend {
    /// Create a new empty store.
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            entries: RwLock::new(HashMap::new()),
            next_sweep: Mutex::new(Instant::now() + SWEEP_INTERVAL),
            closed: AtomicBool::new(false),
            events,
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .map(|entries| entries.values().filter(|e| e.is_live(now)).count())
            .unwrap_or(0)
    }

    /// Whether the store holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn check_open(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            Err(SessionError::ConnectionClosed)
        } else {
            Ok(())
        }
    }

    fn write<T>(&self, f: impl FnOnce(&mut HashMap<String, Entry>) -> T) -> Result<T> {
        self.check_open()?;
        let mut entries = self
            .entries
            .write()
            .map_err(|_| SessionError::Store("memory store lock poisoned".into()))?;
        self.sweep_if_due(&mut entries, Instant::now());
        Ok(f(&mut entries))
    }

    fn sweep_if_due(&self, entries: &mut HashMap<String, Entry>, now: Instant) {
        let Ok(mut next_sweep) = self.next_sweep.lock() else {
            return;
        };
        if now >= *next_sweep {
            let before = entries.len();
            entries.retain(|_, entry| entry.is_live(now));
            tracing::trace!(dropped = before - entries.len(), "memory store swept");
            *next_sweep = now + SWEEP_INTERVAL;
        }
    }

    fn live_value(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        self.write(|entries| match entries.get(key) {
            Some(entry) if entry.is_live(now) => Some(entry.value.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        })
    }
}

fn deadline(now: Instant, ttl_secs: u64) -> Result<Instant> {
    now.checked_add(Duration::from_secs(ttl_secs))
        .ok_or_else(|| SessionError::Store(format!("expiry of {ttl_secs}s is out of range")))
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SessionBackend for MemoryBackend {
    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.live_value(key)?.is_some())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        self.live_value(key)
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.write(|entries| {
            entries.insert(
                key.to_string(),
                Entry {
                    value: value.to_string(),
                    expires_at: None,
                },
            );
        })
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        let deadline = deadline(Instant::now(), ttl_secs)?;
        self.write(|entries| {
            entries.insert(
                key.to_string(),
                Entry {
                    value: value.to_string(),
                    expires_at: Some(deadline),
                },
            );
        })
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let now = Instant::now();
        self.write(|entries| {
            entries
                .remove(key)
                .is_some_and(|entry| entry.is_live(now))
        })
    }

    async fn delete_all(&self) -> Result<()> {
        self.write(|entries| entries.clear())
    }

    async fn list_keys(&self, pattern: &str) -> Result<Vec<String>> {
        let now = Instant::now();
        self.write(|entries| {
            entries.retain(|_, entry| entry.is_live(now));
            entries
                .keys()
                .filter(|key| glob_match(pattern, key))
                .cloned()
                .collect()
        })
    }

    async fn refresh_expiry(&self, key: &str, ttl_secs: u64) -> Result<bool> {
        let now = Instant::now();
        let expires_at = deadline(now, ttl_secs)?;
        self.write(|entries| match entries.get_mut(key) {
            Some(entry) if entry.is_live(now) => {
                entry.expires_at = Some(expires_at);
                true
            }
            Some(_) => {
                entries.remove(key);
                false
            }
            None => false,
        })
    }

    async fn disconnect(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::AcqRel) {
            tracing::debug!("memory session store closed");
            let _ = self.events.send(ConnectionEvent::Disconnected);
        }
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.events.subscribe()
    }
}

/// Match `text` against a pattern where `*` matches any run of characters.
fn glob_match(pattern: &str, text: &str) -> bool {
    let mut parts = pattern.split('*');
    let Some(first) = parts.next() else {
        return text.is_empty();
    };
    let Some(mut rest) = text.strip_prefix(first) else {
        return false;
    };

    let tail: Vec<&str> = parts.collect();
    let Some((last, middle)) = tail.split_last() else {
        // No wildcard at all.
        return rest.is_empty();
    };

    for part in middle {
        match rest.find(part) {
            Some(idx) => rest = &rest[idx + part.len()..],
            None => return false,
        }
    }
    rest.ends_with(last)
}
