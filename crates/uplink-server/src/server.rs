//! `UplinkServer` — Axum HTTP server over the orchestrator.

use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use uplink_runtime::Orchestrator;

use crate::config::ServerConfig;
use crate::routes;
use crate::shutdown::ShutdownCoordinator;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// The session orchestrator.
    pub orchestrator: Arc<Orchestrator>,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// When the server started.
    pub start_time: Instant,
    /// Per-file upload size cap, in bytes.
    pub max_upload_bytes: u64,
}

/// The main Uplink server.
pub struct UplinkServer {
    config: ServerConfig,
    orchestrator: Arc<Orchestrator>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
}

impl UplinkServer {
    /// Create a new server over an orchestrator.
    pub fn new(config: ServerConfig, orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            config,
            orchestrator,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            orchestrator: self.orchestrator.clone(),
            shutdown: self.shutdown.clone(),
            start_time: self.start_time,
            max_upload_bytes: self.config.max_upload_size_mb * 1024 * 1024,
        };

        Router::new()
            .route("/health", get(routes::health))
            .route("/api/sessions", post(routes::create_session))
            .route(
                "/api/sessions/{id}",
                get(routes::session_status).delete(routes::cancel_session),
            )
            .route(
                "/api/sessions/{id}/second-factor",
                post(routes::submit_second_factor),
            )
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(state)
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the orchestrator.
    pub fn orchestrator(&self) -> &Arc<Orchestrator> {
        &self.orchestrator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;
    use uplink_agent::ScriptedAgent;
    use uplink_runtime::OrchestratorConfig;

    fn make_server() -> UplinkServer {
        let agent = ScriptedAgent::builder().build();
        let orchestrator = Orchestrator::new(Arc::new(agent), OrchestratorConfig::default());
        UplinkServer::new(ServerConfig::default(), orchestrator)
    }

    #[test]
    fn server_with_default_config() {
        let server = make_server();
        assert_eq!(server.config().host, "0.0.0.0");
        assert_eq!(server.config().port, 8000);
    }

    #[test]
    fn shutdown_coordinator_accessible() {
        let server = make_server();
        assert!(!server.shutdown().is_shutting_down());
    }

    #[tokio::test]
    async fn health_endpoint_returns_ok() {
        let server = make_server();
        let app = server.router();

        let req = Request::builder()
            .uri("/health")
            .body(Body::empty())
            .unwrap();

        let resp = app.oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["active_sessions"], 0);
        assert_eq!(body["max_sessions"], 10);
    }

    #[tokio::test]
    async fn unknown_route_is_404() {
        let server = make_server();
        let req = Request::builder()
            .uri("/api/nope")
            .body(Body::empty())
            .unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn status_for_unknown_session_is_404() {
        let server = make_server();
        let req = Request::builder()
            .uri("/api/sessions/no-such-session")
            .body(Body::empty())
            .unwrap();
        let resp = server.router().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(
            body["error"]
                .as_str()
                .unwrap()
                .contains("session not found or expired")
        );
    }
}
