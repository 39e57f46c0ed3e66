//! # header-session
//!
//! Session management for HTTP clients that cannot keep cookies.
//!
//! Each client receives an opaque session identifier in a response header
//! (`Session-Id` by default) and presents it on later requests. Session data
//! is a JSON object kept in a Redis-protocol store with a time-to-live that
//! is refreshed on every request reusing the session.
//!
//! ## Features
//!
//! - **Header transport**: no cookies, suitable for mobile and native clients
//! - **Collision-checked identifiers**: 62-symbol alphabet, CSPRNG-backed
//! - **Expiring or persistent sessions**: per-process TTL policy
//! - **Fail-open middleware**: store outages never reject a request
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use axum::{routing::get, Router};
//! use header_session::{Session, SessionConfig, SessionManager, SessionRouterExt};
//!
//! async fn whoami(session: Session) -> String {
//!     session.sid().to_string()
//! }
//!
//! #[tokio::main]
//! async fn main() -> header_session::Result<()> {
//!     header_session::logging::try_init(None).ok();
//!
//!     let sessions = Arc::new(SessionManager::connect(SessionConfig::default()).await?);
//!     let app: Router = Router::new()
//!         .route("/whoami", get(whoami))
//!         .with_sessions(sessions.clone());
//!
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//!     axum::serve(listener, app).await?;
//!     sessions.disconnect().await
//! }
//! ```

pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod session;
pub mod store;

// Re-export commonly used types
pub use api::{SessionEnded, SessionRouterExt};
pub use config::{ConnectionConfig, SessionConfig};
pub use error::{Result, SessionError};
pub use session::{Session, SessionData, SessionManager, SidGenerator};
pub use store::{ConnectionEvent, MemoryBackend, RedisBackend, SessionBackend};
