// SPDX-FileCopyrightText: 2026 Fila Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `fila serve` command implementation.
//!
//! Opens the SQLite ticket store, builds the queue engine, and serves the
//! HTTP gateway until interrupted. On shutdown the WAL is checkpointed so
//! the next start sees a clean database.

use std::sync::Arc;

use tracing::info;

use fila_config::model::FilaConfig;
use fila_core::{FilaError, TicketStore};
use fila_engine::QueueEngine;
use fila_gateway::{GatewayState, ServerConfig, start_server};
use fila_storage::SqliteTicketStore;

/// Run the `fila serve` command.
pub async fn run_serve(config: FilaConfig) -> Result<(), FilaError> {
    init_tracing(&config.log.level);

    info!("starting fila serve");

    let store = Arc::new(SqliteTicketStore::open(&config.storage).await?);
    let engine = Arc::new(QueueEngine::new(store.clone() as Arc<dyn TicketStore>));

    let state = GatewayState {
        engine,
        default_agency_name: config.agency.name.clone(),
        call_history: config.display.call_history,
        start_time: std::time::Instant::now(),
    };
    let server_config = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
    };

    tokio::select! {
        result = start_server(&server_config, state) => result,
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
            store.close().await?;
            Ok(())
        }
    }
}

/// Initialize the tracing subscriber.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("fila={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
