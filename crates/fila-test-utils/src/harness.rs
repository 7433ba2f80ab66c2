// SPDX-FileCopyrightText: 2026 Fila Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a complete queue stack on a temp SQLite database:
//! store, engine, and config. Provides registration helpers so tests read as
//! scenarios rather than setup.

use std::sync::Arc;

use tokio::sync::broadcast;

use fila_config::model::{FilaConfig, StorageConfig};
use fila_core::types::{NewTicket, Priority, Ticket, TicketEvent};
use fila_core::{FilaError, TicketStore};
use fila_engine::QueueEngine;
use fila_storage::SqliteTicketStore;

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    agency_name: Option<String>,
    call_history: usize,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            agency_name: None,
            call_history: 5,
        }
    }

    /// Override the default agency name.
    pub fn with_agency_name(mut self, name: impl Into<String>) -> Self {
        self.agency_name = Some(name.into());
        self
    }

    /// Override the display history length.
    pub fn with_call_history(mut self, limit: usize) -> Self {
        self.call_history = limit;
        self
    }

    /// Build the test harness, creating the temp database and engine.
    pub async fn build(self) -> Result<TestHarness, FilaError> {
        let temp_dir = tempfile::TempDir::new().map_err(FilaError::storage)?;
        let db_path = temp_dir.path().join("test.db");

        let mut config = FilaConfig::default();
        config.storage = StorageConfig {
            database_path: db_path.to_string_lossy().into_owned(),
            wal_mode: true,
        };
        if let Some(name) = self.agency_name {
            config.agency.name = name;
        }
        config.display.call_history = self.call_history;

        let store = Arc::new(SqliteTicketStore::open(&config.storage).await?);
        let engine = Arc::new(QueueEngine::new(store.clone() as Arc<dyn TicketStore>));

        Ok(TestHarness {
            engine,
            store,
            config,
            _temp_dir: temp_dir,
        })
    }
}

/// A complete queue environment on temp storage.
pub struct TestHarness {
    /// The queue engine under test.
    pub engine: Arc<QueueEngine>,
    /// Direct store access for low-level assertions.
    pub store: Arc<SqliteTicketStore>,
    /// The configuration the harness was built with.
    pub config: FilaConfig,
    /// Temp directory kept alive for cleanup on drop.
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    /// Create a new builder for configuring the test harness.
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Register a walk-in visitor with the given priority.
    pub async fn register(
        &self,
        name: &str,
        service: &str,
        priority: Priority,
    ) -> Result<Ticket, FilaError> {
        self.engine
            .register(NewTicket {
                name: name.to_string(),
                cpf: None,
                service: service.to_string(),
                priority,
                observations: None,
            })
            .await
    }

    /// Subscribe to the store's change-event feed.
    pub fn subscribe(&self) -> broadcast::Receiver<TicketEvent> {
        self.engine.subscribe()
    }
}
