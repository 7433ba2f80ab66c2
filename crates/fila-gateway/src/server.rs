// SPDX-FileCopyrightText: 2026 Fila Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state for the gateway.

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};
use fila_core::FilaError;
use fila_engine::QueueEngine;
use tower_http::cors::CorsLayer;

use crate::handlers;
use crate::sse;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// The queue engine every handler operates through.
    pub engine: Arc<QueueEngine>,
    /// Fallback agency name until a settings record is saved.
    pub default_agency_name: String,
    /// History strip length for the public display.
    pub call_history: usize,
    /// Process start time for uptime calculation.
    pub start_time: std::time::Instant,
}

/// Gateway server configuration (mirrors GatewayConfig from fila-config).
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
}

/// Build the gateway router.
///
/// Routes:
/// - POST /v1/tickets, GET /v1/tickets
/// - POST /v1/tickets/next
/// - POST /v1/tickets/{id}/start | finish | recall | no-show | cancel | takeover
/// - GET  /v1/display, /v1/stats, /v1/export
/// - GET/PUT /v1/settings
/// - GET/POST /v1/services, DELETE /v1/services/{id}
/// - GET  /v1/events (SSE change feed)
/// - GET  /health (unauthenticated liveness)
pub fn router(state: GatewayState) -> Router {
    Router::new()
        .route("/health", get(handlers::get_health))
        .route(
            "/v1/tickets",
            post(handlers::post_ticket).get(handlers::get_tickets),
        )
        .route("/v1/tickets/next", post(handlers::post_call_next))
        .route("/v1/tickets/{id}/start", post(handlers::post_start))
        .route("/v1/tickets/{id}/finish", post(handlers::post_finish))
        .route("/v1/tickets/{id}/recall", post(handlers::post_recall))
        .route("/v1/tickets/{id}/no-show", post(handlers::post_no_show))
        .route("/v1/tickets/{id}/cancel", post(handlers::post_cancel))
        .route("/v1/tickets/{id}/takeover", post(handlers::post_takeover))
        .route("/v1/display", get(handlers::get_display))
        .route("/v1/stats", get(handlers::get_stats))
        .route("/v1/export", get(handlers::get_export))
        .route(
            "/v1/settings",
            get(handlers::get_settings).put(handlers::put_settings),
        )
        .route(
            "/v1/services",
            get(handlers::get_services).post(handlers::post_service),
        )
        .route("/v1/services/{id}", delete(handlers::delete_service))
        .route("/v1/events", get(sse::events))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Start the gateway HTTP server and serve until the process exits.
pub async fn start_server(config: &ServerConfig, state: GatewayState) -> Result<(), FilaError> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| FilaError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("Gateway server listening on {addr}");

    axum::serve(listener, app)
        .await
        .map_err(|e| FilaError::Internal(format!("gateway server error: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fila_config::model::StorageConfig;
    use fila_storage::SqliteTicketStore;
    use tempfile::tempdir;

    #[tokio::test]
    async fn router_builds_with_real_engine() {
        let dir = tempdir().unwrap();
        let config = StorageConfig {
            database_path: dir.path().join("gw.db").to_string_lossy().into_owned(),
            wal_mode: true,
        };
        let store = SqliteTicketStore::open(&config).await.unwrap();
        let state = GatewayState {
            engine: Arc::new(QueueEngine::new(Arc::new(store))),
            default_agency_name: "Test Agency".to_string(),
            call_history: 5,
            start_time: std::time::Instant::now(),
        };
        let _router = router(state.clone());
        let _cloned = state.clone();
    }

    #[test]
    fn server_config_debug() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8420,
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("127.0.0.1"));
    }
}
