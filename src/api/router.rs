//! API router configuration.

use axum::{
    http::HeaderName,
    routing::get,
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use super::handlers::{
    api_info, delete_session, destroy_sessions, get_session, health, list_sessions,
    update_session, AppState,
};
use super::middleware::SessionRouterExt;

/// Create the API router with all routes configured.
///
/// `/health` is served without a session; every other route runs behind the
/// session resolver.
pub fn create_router(state: AppState) -> Router {
    let sid_header: HeaderName = state.sessions.sid_header().clone();

    let session_routes = Router::new()
        .route("/", get(api_info))
        .route(
            "/session",
            get(get_session).put(update_session).delete(delete_session),
        )
        .route(
            "/admin/sessions",
            get(list_sessions).delete(destroy_sessions),
        )
        .with_sessions(state.sessions.clone());

    Router::new()
        .route("/health", get(health))
        .merge(session_routes)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
                .expose_headers([sid_header]),
        )
        .with_state(state)
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to.
    pub host: String,
    /// Port to listen on.
    pub port: u16,
    /// Stop accepting connections on Ctrl-C and drain in-flight requests.
    pub graceful_shutdown: bool,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            graceful_shutdown: true,
        }
    }

    pub fn without_graceful_shutdown(mut self) -> Self {
        self.graceful_shutdown = false;
        self
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("127.0.0.1", 3000)
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

/// Start the API server.
///
/// Closes the session store connection once the server stops.
pub async fn serve(config: ServerConfig, state: AppState) -> crate::Result<()> {
    let addr = config.bind_address();
    let sessions = state.sessions.clone();
    let router = create_router(state);

    tracing::info!("Starting header-session API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;

    let served = if config.graceful_shutdown {
        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown_signal())
            .await
    } else {
        axum::serve(listener, router).await
    };

    sessions.disconnect().await?;
    served?;

    Ok(())
}
