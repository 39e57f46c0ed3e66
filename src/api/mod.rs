//! HTTP layer for header-session.
//!
//! This module provides the session-resolving middleware and a small REST
//! surface for inspecting and editing the current session.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check (no session)
//! - `GET /` - API information
//! - `GET /session` - Current session
//! - `PUT /session` - Merge a JSON object into the current session
//! - `DELETE /session` - Destroy the current session
//! - `GET /admin/sessions` - List session ids (admin operations only)
//! - `DELETE /admin/sessions` - Destroy all sessions (admin operations only)
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use header_session::api::{serve, AppState, ServerConfig};
//! use header_session::{SessionConfig, SessionManager};
//!
//! #[tokio::main]
//! async fn main() -> header_session::Result<()> {
//!     let sessions = SessionManager::connect(SessionConfig::default()).await?;
//!     let state = AppState::new(Arc::new(sessions));
//!     serve(ServerConfig::new("127.0.0.1", 3000), state).await
//! }
//! ```

pub mod handlers;
pub mod middleware;
pub mod router;
pub mod types;

// Re-export commonly used types
pub use handlers::AppState;
pub use middleware::{resolve, resolve_session, SessionEnded, SessionRouterExt};
pub use router::{create_router, serve, ServerConfig};
pub use types::{ErrorResponse, ListSessionsResponse, SessionResponse};
