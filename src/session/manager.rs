//! Session record operations.

use std::sync::Arc;

use axum::http::HeaderName;
use tokio::sync::broadcast;

use super::{SessionData, SidGenerator};
use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::store::{ConnectionEvent, RedisBackend, SessionBackend};
use crate::Result;

/// Session service: owns the configuration and a handle to the store.
///
/// Build one per process and share it behind an `Arc`. All operations take
/// the bare session identifier; the configured key prefix is applied here.
pub struct SessionManager {
    config: SessionConfig,
    header: HeaderName,
    generator: SidGenerator,
    backend: Arc<dyn SessionBackend>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("config", &self.config)
            .field("header", &self.header)
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Build a manager over an existing backend.
    pub fn with_backend(config: SessionConfig, backend: Arc<dyn SessionBackend>) -> Result<Self> {
        let header = config.validate()?;
        Ok(Self::from_parts(config, header, backend))
    }

    fn from_parts(
        config: SessionConfig,
        header: HeaderName,
        backend: Arc<dyn SessionBackend>,
    ) -> Self {
        Self {
            generator: SidGenerator::new(config.sid_length),
            header,
            config,
            backend,
        }
    }

    /// Build a manager backed by the Redis endpoint in `config.connection`.
    ///
    /// The connection is opened eagerly; a store that cannot be reached is
    /// reported here rather than on the first request.
    pub async fn connect(config: SessionConfig) -> Result<Self> {
        let header = config.validate()?;
        let backend = RedisBackend::open(&config.connection.to_url())?;
        backend.connect().await?;
        Ok(Self::from_parts(config, header, Arc::new(backend)))
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Header carrying the session identifier.
    pub fn sid_header(&self) -> &HeaderName {
        &self.header
    }

    pub fn generator(&self) -> &SidGenerator {
        &self.generator
    }

    /// Subscribe to store connection events.
    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.backend.subscribe()
    }

    fn key(&self, sid: &str) -> String {
        format!("{}{}", self.config.key_prefix, sid)
    }

    fn report(&self, operation: &'static str, sid: &str, err: &SessionError) {
        if self.config.debug {
            tracing::error!(operation, sid, error = %err, "session store operation failed");
        } else {
            tracing::debug!(operation, sid, error = %err, "session store operation failed");
        }
    }

    /// Generate an identifier not currently used by a live session.
    ///
    /// Regenerates on collision. A failed existence check is returned as an
    /// error instead of being treated as "no collision".
    pub async fn create_sid(&self) -> Result<String> {
        loop {
            let sid = self.generator.generate();
            match self.backend.exists(&self.key(&sid)).await {
                Ok(false) => return Ok(sid),
                Ok(true) => {
                    tracing::debug!("session id collision; regenerating");
                }
                Err(err) => {
                    self.report("create_sid", &sid, &err);
                    return Err(err);
                }
            }
        }
    }

    /// Persist `data` under `sid`, setting its `sid` field.
    ///
    /// Uses the configured TTL unless sessions are persistent.
    pub async fn save(&self, sid: &str, data: &SessionData) -> Result<()> {
        if sid.is_empty() {
            return Err(SessionError::InvalidArgument("sid is required"));
        }

        let mut record = data.clone();
        record.set_sid(sid);
        let raw = record.to_json()?;
        let key = self.key(sid);

        let result = if self.config.persist {
            self.backend.set(&key, &raw).await
        } else {
            self.backend
                .set_with_expiry(&key, &raw, self.config.ttl_secs)
                .await
        };

        result.inspect_err(|err| self.report("save", sid, err))
    }

    /// Load the data stored under `sid`.
    ///
    /// A missing session is `Ok(None)`, not an error.
    pub async fn load(&self, sid: &str) -> Result<Option<SessionData>> {
        if sid.is_empty() {
            return Err(SessionError::InvalidArgument("sid is required"));
        }

        let raw = self
            .backend
            .get(&self.key(sid))
            .await
            .inspect_err(|err| self.report("load", sid, err))?;

        match raw {
            Some(raw) => {
                let mut data = SessionData::from_json(&raw)?;
                data.set_sid(sid);
                Ok(Some(data))
            }
            None => Ok(None),
        }
    }

    /// Extend the life of `sid` by the configured TTL.
    ///
    /// Returns whether the session is still active. Persistent sessions are
    /// always active and never touch the store.
    pub async fn refresh(&self, sid: &str) -> Result<bool> {
        if self.config.persist {
            return Ok(true);
        }
        if sid.is_empty() {
            return Err(SessionError::InvalidArgument("sid is required"));
        }

        self.backend
            .refresh_expiry(&self.key(sid), self.config.ttl_secs)
            .await
            .inspect_err(|err| self.report("refresh", sid, err))
    }

    /// Whether a live session exists for `sid`. An empty `sid` never exists.
    pub async fn exists(&self, sid: &str) -> Result<bool> {
        if sid.is_empty() {
            return Ok(false);
        }

        self.backend
            .exists(&self.key(sid))
            .await
            .inspect_err(|err| self.report("exists", sid, err))
    }

    /// Delete the session stored under `sid`. Returns whether it existed.
    pub async fn destroy(&self, sid: &str) -> Result<bool> {
        if sid.is_empty() {
            return Err(SessionError::InvalidArgument("sid is required"));
        }

        self.backend
            .delete(&self.key(sid))
            .await
            .inspect_err(|err| self.report("destroy", sid, err))
    }

    /// Delete every session. Requires `admin_operations`.
    ///
    /// Scoped to the key prefix; with an empty prefix the whole store is
    /// flushed.
    pub async fn destroy_all(&self) -> Result<()> {
        if !self.config.admin_operations {
            return Err(SessionError::OperationNotPermitted("destroy_all"));
        }

        let result = if self.config.key_prefix.is_empty() {
            self.backend.delete_all().await
        } else {
            self.delete_namespace().await
        };

        match &result {
            Ok(()) => tracing::warn!(prefix = %self.config.key_prefix, "all sessions destroyed"),
            Err(err) => self.report("destroy_all", "*", err),
        }
        result
    }

    async fn delete_namespace(&self) -> Result<()> {
        let keys = self.backend.list_keys(&self.pattern()).await?;
        for key in keys {
            self.backend.delete(&key).await?;
        }
        Ok(())
    }

    fn pattern(&self) -> String {
        format!("{}*", self.config.key_prefix)
    }

    /// List the identifiers of every stored session. Requires `admin_operations`.
    pub async fn get_all_keys(&self) -> Result<Vec<String>> {
        if !self.config.admin_operations {
            return Err(SessionError::OperationNotPermitted("get_all_keys"));
        }

        let keys = self
            .backend
            .list_keys(&self.pattern())
            .await
            .inspect_err(|err| self.report("get_all_keys", "*", err))?;

        let prefix = self.config.key_prefix.as_str();
        Ok(keys
            .into_iter()
            .filter_map(|key| key.strip_prefix(prefix).map(str::to_string))
            .collect())
    }

    /// Close the store connection.
    pub async fn disconnect(&self) -> Result<()> {
        self.backend.disconnect().await
    }
}
