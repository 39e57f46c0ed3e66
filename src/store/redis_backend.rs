//! Redis-protocol store backend.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::FromRedisValue;
use tokio::sync::{broadcast, Mutex};

use super::{ConnectionEvent, SessionBackend, EVENT_CAPACITY};
use crate::error::SessionError;
use crate::Result;

/// Store backend speaking the Redis protocol.
///
/// The connection is opened lazily on the first command. A failed command
/// drops the cached connection so the next command reconnects.
pub struct RedisBackend {
    client: redis::Client,
    connection: Mutex<Option<MultiplexedConnection>>,
    closed: AtomicBool,
    events: broadcast::Sender<ConnectionEvent>,
}

impl RedisBackend {
    /// Create a backend for the given `redis://` URL.
    ///
    /// No network I/O happens until the first command.
    pub fn open(url: &str) -> Result<Self> {
        let client = redis::Client::open(url)?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            client,
            connection: Mutex::new(None),
            closed: AtomicBool::new(false),
            events,
        })
    }

    /// Open the connection eagerly so misconfiguration surfaces at startup.
    pub async fn connect(&self) -> Result<()> {
        self.connection().await.map(|_| ())
    }

    fn emit(&self, event: ConnectionEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }

    async fn connection(&self) -> Result<MultiplexedConnection> {
        if self.closed.load(Ordering::Acquire) {
            return Err(SessionError::ConnectionClosed);
        }

        let mut slot = self.connection.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }

        match self.client.get_multiplexed_async_connection().await {
            Ok(conn) => {
                tracing::info!("session store connected");
                self.emit(ConnectionEvent::Connected);
                *slot = Some(conn.clone());
                Ok(conn)
            }
            Err(err) => {
                tracing::warn!(error = %err, "session store connection failed");
                self.emit(ConnectionEvent::Error(err.to_string()));
                Err(err.into())
            }
        }
    }

    async fn run<T>(&self, operation: &'static str, cmd: redis::Cmd) -> Result<T>
    where
        T: FromRedisValue + Send,
    {
        let mut conn = self.connection().await?;
        let result: redis::RedisResult<T> = cmd.query_async(&mut conn).await;
        match result {
            Ok(value) => Ok(value),
            Err(err) => {
                tracing::warn!(operation, error = %err, "session store command failed");
                self.emit(ConnectionEvent::Error(err.to_string()));
                *self.connection.lock().await = None;
                Err(err.into())
            }
        }
    }
}

#[async_trait]
impl SessionBackend for RedisBackend {
    async fn exists(&self, key: &str) -> Result<bool> {
        let mut cmd = redis::cmd("EXISTS");
        cmd.arg(key);
        let count: i64 = self.run("exists", cmd).await?;
        Ok(count > 0)
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(key);
        self.run("get", cmd).await
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        self.run("set", cmd).await
    }

    async fn set_with_expiry(&self, key: &str, value: &str, ttl_secs: u64) -> Result<()> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value).arg("EX").arg(ttl_secs);
        self.run("set_with_expiry", cmd).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut cmd = redis::cmd("DEL");
        cmd.arg(key);
        let removed: i64 = self.run("delete", cmd).await?;
        Ok(removed > 0)
    }

    async fn delete_all(&self) -> Result<()> {
        self.run("delete_all", redis::cmd("FLUSHDB")).await
    }

    async fn list_keys(&self, pattern: &str) -> Result<Vec<String>> {
        let mut cmd = redis::cmd("KEYS");
        cmd.arg(pattern);
        self.run("list_keys", cmd).await
    }

    async fn refresh_expiry(&self, key: &str, ttl_secs: u64) -> Result<bool> {
        let mut cmd = redis::cmd("EXPIRE");
        cmd.arg(key).arg(ttl_secs);
        let updated: i64 = self.run("refresh_expiry", cmd).await?;
        Ok(updated == 1)
    }

    async fn disconnect(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        // Commands already holding a clone of the connection run to completion.
        self.connection.lock().await.take();
        tracing::info!("session store disconnected");
        self.emit(ConnectionEvent::Disconnected);
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.events.subscribe()
    }
}
