//! Request session resolution.
//!
//! For every request the resolver decides between reusing the presented
//! session, or minting a new one when the header is missing, malformed or
//! names a session that no longer exists. Every failure fails open: the
//! request continues without a session and without the response header.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::{from_fn_with_state, Next},
    response::Response,
    Router,
};

use crate::session::{Session, SessionData, SessionManager};

/// What the inbound session header told us.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Inbound<'a> {
    NoHeader,
    Invalid,
    Presented(&'a str),
}

fn inbound<'a>(manager: &SessionManager, headers: &'a HeaderMap) -> Inbound<'a> {
    // HeaderMap lookups are case-insensitive.
    match headers.get(manager.sid_header()) {
        None => Inbound::NoHeader,
        Some(value) => match value.to_str() {
            Ok(sid) if manager.generator().is_well_formed(sid) => Inbound::Presented(sid),
            _ => Inbound::Invalid,
        },
    }
}

/// Resolve, persist and return the session for a request.
///
/// Returns `None` when any store step fails.
pub async fn resolve(manager: &SessionManager, headers: &HeaderMap) -> Option<Session> {
    let reused = match inbound(manager, headers) {
        Inbound::Presented(sid) => match manager.exists(sid).await {
            Ok(true) => match manager.load(sid).await {
                Ok(Some(data)) => Some((sid.to_string(), data)),
                // Expired between the existence check and the read.
                Ok(None) => None,
                Err(err) => {
                    tracing::warn!(error = %err, "session load failed; continuing without session");
                    return None;
                }
            },
            Ok(false) => {
                tracing::debug!("unknown or expired session id presented");
                None
            }
            Err(err) => {
                tracing::warn!(error = %err, "session lookup failed; continuing without session");
                return None;
            }
        },
        Inbound::Invalid => {
            tracing::debug!("malformed session header ignored");
            None
        }
        Inbound::NoHeader => None,
    };

    let (sid, mut data) = match reused {
        Some(found) => found,
        None => match manager.create_sid().await {
            Ok(sid) => {
                tracing::debug!(sid = %sid, "new session");
                (sid, SessionData::new())
            }
            Err(err) => {
                tracing::warn!(error = %err, "session id generation failed; continuing without session");
                return None;
            }
        },
    };

    data.set_sid(&sid);
    if let Err(err) = manager.save(&sid, &data).await {
        tracing::warn!(error = %err, "session save failed; continuing without session");
        return None;
    }

    Some(Session::new(sid, data))
}

/// Response extension telling [`resolve_session`] the handler destroyed the
/// request's session, so its identifier is not echoed back.
#[derive(Debug, Clone, Copy, Default)]
pub struct SessionEnded;

/// Axum middleware attaching a [`Session`] to each request.
///
/// Use with [`axum::middleware::from_fn_with_state`], or through
/// [`SessionRouterExt::with_sessions`]. The session identifier is echoed in
/// the configured response header unless the handler already set it or
/// marked the response with [`SessionEnded`].
pub async fn resolve_session(
    State(manager): State<Arc<SessionManager>>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(session) = resolve(&manager, request.headers()).await else {
        return next.run(request).await;
    };

    let header_value = HeaderValue::from_str(session.sid()).ok();
    request.extensions_mut().insert(session);

    let mut response = next.run(request).await;
    if response.extensions().get::<SessionEnded>().is_some() {
        return response;
    }
    if let Some(value) = header_value {
        response
            .headers_mut()
            .entry(manager.sid_header().clone())
            .or_insert(value);
    }
    response
}

/// Mount the session resolver on a router.
pub trait SessionRouterExt {
    /// Resolve a session for every route currently on this router.
    fn with_sessions(self, manager: Arc<SessionManager>) -> Self;
}

impl<S> SessionRouterExt for Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    fn with_sessions(self, manager: Arc<SessionManager>) -> Self {
        self.route_layer(from_fn_with_state(manager, resolve_session))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::{body::Body, http::StatusCode, routing::get, Extension};
    use tokio::sync::broadcast;
    use tower::ServiceExt;

    use crate::config::SessionConfig;
    use crate::error::SessionError;
    use crate::store::{ConnectionEvent, MemoryBackend, SessionBackend};
    use crate::Result;

    /// Reads from an in-process store but rejects every write.
    struct ReadOnlyBackend {
        inner: MemoryBackend,
    }

    #[async_trait]
    impl SessionBackend for ReadOnlyBackend {
        async fn exists(&self, key: &str) -> Result<bool> {
            self.inner.exists(key).await
        }

        async fn get(&self, key: &str) -> Result<Option<String>> {
            self.inner.get(key).await
        }

        async fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(SessionError::Store("READONLY".into()))
        }

        async fn set_with_expiry(&self, _key: &str, _value: &str, _ttl_secs: u64) -> Result<()> {
            Err(SessionError::Store("READONLY".into()))
        }

        async fn delete(&self, key: &str) -> Result<bool> {
            self.inner.delete(key).await
        }

        async fn delete_all(&self) -> Result<()> {
            self.inner.delete_all().await
        }

        async fn list_keys(&self, pattern: &str) -> Result<Vec<String>> {
            self.inner.list_keys(pattern).await
        }

        async fn refresh_expiry(&self, key: &str, ttl_secs: u64) -> Result<bool> {
            self.inner.refresh_expiry(key, ttl_secs).await
        }

        async fn disconnect(&self) -> Result<()> {
            self.inner.disconnect().await
        }

        fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
            self.inner.subscribe()
        }
    }

    fn manager() -> (Arc<SessionManager>, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let config = SessionConfig {
            sid_length: 12,
            ..SessionConfig::default()
        };
        let manager = SessionManager::with_backend(config, backend.clone()).unwrap();
        (Arc::new(manager), backend)
    }

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("session-id", HeaderValue::from_str(value).unwrap());
        headers
    }

    #[tokio::test]
    async fn test_no_header_mints_session() {
        let (manager, _) = manager();
        let session = resolve(&manager, &HeaderMap::new()).await.unwrap();

        assert_eq!(session.sid().len(), 12);
        assert_eq!(session.data().sid(), Some(session.sid()));
        assert!(manager.exists(session.sid()).await.unwrap());
    }

    #[tokio::test]
    async fn test_valid_header_reuses_session() {
        let (manager, _) = manager();
        let mut data = SessionData::new();
        data.insert("visits", 3);
        manager.save("AAAAbbbb1234", &data).await.unwrap();

        let session = resolve(&manager, &headers_with("AAAAbbbb1234")).await.unwrap();
        assert_eq!(session.sid(), "AAAAbbbb1234");
        assert_eq!(session.data().get("visits"), Some(&serde_json::json!(3)));
    }

    #[tokio::test]
    async fn test_header_name_case_insensitive() {
        let (manager, _) = manager();
        manager.save("AAAAbbbb1234", &SessionData::new()).await.unwrap();

        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::HeaderName::from_bytes(b"SESSION-ID").unwrap(),
            HeaderValue::from_static("AAAAbbbb1234"),
        );
        let session = resolve(&manager, &headers).await.unwrap();
        assert_eq!(session.sid(), "AAAAbbbb1234");
    }

    #[tokio::test]
    async fn test_unknown_sid_gets_new_session() {
        let (manager, _) = manager();
        let session = resolve(&manager, &headers_with("neverIssued1")).await.unwrap();
        assert_ne!(session.sid(), "neverIssued1");
        assert!(!manager.exists("neverIssued1").await.unwrap());
    }

    #[tokio::test]
    async fn test_malformed_sid_gets_new_session() {
        let (manager, backend) = manager();
        let session = resolve(&manager, &headers_with("short")).await.unwrap();
        assert_ne!(session.sid(), "short");
        assert_eq!(backend.len(), 1);
    }

    #[tokio::test]
    async fn test_store_failure_fails_open() {
        let (manager, backend) = manager();
        backend.disconnect().await.unwrap();

        assert!(resolve(&manager, &HeaderMap::new()).await.is_none());
        assert!(resolve(&manager, &headers_with("AAAAbbbb1234")).await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_record_fails_open() {
        let (manager, backend) = manager();
        backend.set("sess:AAAAbbbb1234", "{oops").await.unwrap();

        assert!(resolve(&manager, &headers_with("AAAAbbbb1234")).await.is_none());
    }

    #[tokio::test]
    async fn test_save_failure_fails_open() {
        let inner = MemoryBackend::new();
        inner
            .set("sess:AAAAbbbb1234", r#"{"sid":"AAAAbbbb1234"}"#)
            .await
            .unwrap();
        let config = SessionConfig {
            sid_length: 12,
            ..SessionConfig::default()
        };
        let manager = Arc::new(
            SessionManager::with_backend(config, Arc::new(ReadOnlyBackend { inner })).unwrap(),
        );

        // Existence check and load succeed; only the write fails.
        assert!(manager.exists("AAAAbbbb1234").await.unwrap());
        assert!(resolve(&manager, &headers_with("AAAAbbbb1234")).await.is_none());

        async fn has_session(session: Option<Session>) -> &'static str {
            if session.is_some() {
                "attached"
            } else {
                "none"
            }
        }
        let app: Router = Router::new()
            .route("/", get(has_session))
            .with_sessions(manager);
        let request = axum::http::Request::builder()
            .uri("/")
            .header("session-id", "AAAAbbbb1234")
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key("session-id"));
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&body[..], b"none");
    }

    #[tokio::test]
    async fn test_ended_session_not_echoed() {
        let (manager, _) = manager();

        async fn end() -> (Extension<SessionEnded>, StatusCode) {
            (Extension(SessionEnded), StatusCode::NO_CONTENT)
        }
        let app: Router = Router::new()
            .route("/end", get(end))
            .route("/keep", get(|| async { StatusCode::NO_CONTENT }))
            .with_sessions(manager);

        let request = |uri: &str| {
            axum::http::Request::builder()
                .uri(uri)
                .body(Body::empty())
                .unwrap()
        };
        let response = app.clone().oneshot(request("/end")).await.unwrap();
        assert!(!response.headers().contains_key("session-id"));

        let response = app.oneshot(request("/keep")).await.unwrap();
        assert!(response.headers().contains_key("session-id"));
    }
}
