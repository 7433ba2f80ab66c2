// SPDX-FileCopyrightText: 2026 Fila Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the TicketStore trait.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::debug;

use fila_config::model::StorageConfig;
use fila_core::types::{
    AgencySettings, NewTicket, ServiceEntry, Ticket, TicketEvent, TicketFilter, TicketPatch,
    TicketStatus,
};
use fila_core::{FilaError, TicketStore};

use crate::database::Database;
use crate::queries;

/// Capacity of the change-event channel. A subscriber that falls further
/// behind than this skips to the live edge instead of blocking writers.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// SQLite-backed ticket store.
///
/// Wraps a [`Database`] handle, delegates all query operations to the typed
/// query modules, and broadcasts a [`TicketEvent`] after every successful
/// write so connected clients converge without polling.
pub struct SqliteTicketStore {
    db: Database,
    events: broadcast::Sender<TicketEvent>,
}

impl SqliteTicketStore {
    /// Open the store at the configured path, running migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, FilaError> {
        let db = Database::open(&config.database_path, config.wal_mode).await?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        debug!(path = %config.database_path, "SQLite ticket store opened");
        Ok(Self { db, events })
    }

    /// Broadcast a change event. Having no subscribers is not an error.
    fn emit(&self, event: TicketEvent) {
        let _ = self.events.send(event);
    }
}

#[async_trait]
impl TicketStore for SqliteTicketStore {
    async fn create_ticket(
        &self,
        new: NewTicket,
        created_at: DateTime<Utc>,
    ) -> Result<Ticket, FilaError> {
        let ticket = queries::tickets::create_ticket(&self.db, new, created_at).await?;
        self.emit(TicketEvent::inserted(ticket.clone()));
        Ok(ticket)
    }

    async fn get_ticket(&self, id: &str) -> Result<Option<Ticket>, FilaError> {
        queries::tickets::get_ticket(&self.db, id).await
    }

    async fn list_tickets(&self, filter: TicketFilter) -> Result<Vec<Ticket>, FilaError> {
        queries::tickets::list_tickets(&self.db, filter).await
    }

    async fn update_ticket(
        &self,
        id: &str,
        patch: TicketPatch,
        expected: Option<&[TicketStatus]>,
    ) -> Result<Option<Ticket>, FilaError> {
        let updated = queries::tickets::update_ticket(&self.db, id, patch, expected).await?;
        if let Some(ticket) = &updated {
            self.emit(TicketEvent::updated(ticket.clone()));
        }
        Ok(updated)
    }

    fn subscribe(&self) -> broadcast::Receiver<TicketEvent> {
        self.events.subscribe()
    }

    async fn load_settings(&self) -> Result<Option<AgencySettings>, FilaError> {
        queries::settings::load(&self.db).await
    }

    async fn save_settings(&self, settings: &AgencySettings) -> Result<(), FilaError> {
        queries::settings::save(&self.db, settings, Utc::now()).await
    }

    async fn list_services(&self) -> Result<Vec<ServiceEntry>, FilaError> {
        queries::services::list(&self.db).await
    }

    async fn add_service(&self, name: &str) -> Result<ServiceEntry, FilaError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(FilaError::Validation("service name must not be empty".into()));
        }
        queries::services::add(&self.db, name, Utc::now())
            .await?
            .ok_or_else(|| FilaError::Validation(format!("service `{name}` already exists")))
    }

    async fn remove_service(&self, id: i64) -> Result<(), FilaError> {
        if queries::services::remove(&self.db, id).await? {
            Ok(())
        } else {
            Err(FilaError::NotFound { id: id.to_string() })
        }
    }

    async fn close(&self) -> Result<(), FilaError> {
        self.db.close().await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fila_core::types::{Priority, TicketEventKind};
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
            wal_mode: true,
        }
    }

    async fn open_store() -> (SqliteTicketStore, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("store.db");
        let store = SqliteTicketStore::open(&make_config(db_path.to_str().unwrap()))
            .await
            .unwrap();
        (store, dir)
    }

    fn walk_in(name: &str) -> NewTicket {
        NewTicket {
            name: name.to_string(),
            cpf: None,
            service: "Primeira vez".to_string(),
            priority: Priority::Normal,
            observations: None,
        }
    }

    #[tokio::test]
    async fn insert_broadcasts_inserted_event() {
        let (store, _dir) = open_store().await;
        let mut rx = store.subscribe();

        let ticket = store.create_ticket(walk_in("Ana"), Utc::now()).await.unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, TicketEventKind::Inserted);
        assert_eq!(event.ticket.id, ticket.id);

        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn successful_update_broadcasts_updated_event() {
        let (store, _dir) = open_store().await;
        let now = Utc::now();
        let ticket = store.create_ticket(walk_in("Ana"), now).await.unwrap();

        let mut rx = store.subscribe();
        store
            .update_ticket(
                &ticket.id,
                TicketPatch {
                    status: Some(TicketStatus::Calling),
                    called_at: Some(now),
                    attendant_name: Some("Maria".to_string()),
                    recall_count: Some(1),
                    ..TicketPatch::default()
                },
                Some(&[TicketStatus::Waiting]),
            )
            .await
            .unwrap()
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.kind, TicketEventKind::Updated);
        assert_eq!(event.ticket.status, TicketStatus::Calling);

        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn failed_conditional_update_broadcasts_nothing() {
        let (store, _dir) = open_store().await;
        let now = Utc::now();
        let ticket = store.create_ticket(walk_in("Ana"), now).await.unwrap();

        // Move out of Waiting first.
        store
            .update_ticket(
                &ticket.id,
                TicketPatch {
                    status: Some(TicketStatus::Canceled),
                    finished_at: Some(now),
                    ..TicketPatch::default()
                },
                Some(&[TicketStatus::Waiting]),
            )
            .await
            .unwrap()
            .unwrap();

        let mut rx = store.subscribe();
        let lost = store
            .update_ticket(
                &ticket.id,
                TicketPatch {
                    status: Some(TicketStatus::Calling),
                    called_at: Some(now),
                    recall_count: Some(1),
                    ..TicketPatch::default()
                },
                Some(&[TicketStatus::Waiting]),
            )
            .await
            .unwrap();
        assert!(lost.is_none());
        assert!(
            matches!(rx.try_recv(), Err(broadcast::error::TryRecvError::Empty)),
            "a lost race must not broadcast"
        );

        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_service_is_a_validation_error() {
        let (store, _dir) = open_store().await;

        store.add_service("Cadastro").await.unwrap();
        let err = store.add_service("Cadastro").await.unwrap_err();
        assert!(matches!(err, FilaError::Validation(_)));

        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn empty_service_name_is_rejected() {
        let (store, _dir) = open_store().await;
        let err = store.add_service("   ").await.unwrap_err();
        assert!(matches!(err, FilaError::Validation(_)));
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn remove_missing_service_is_not_found() {
        let (store, _dir) = open_store().await;
        let err = store.remove_service(99).await.unwrap_err();
        assert!(matches!(err, FilaError::NotFound { .. }));
        store.close().await.unwrap();
    }

    #[tokio::test]
    async fn settings_default_is_absent_until_saved() {
        let (store, _dir) = open_store().await;

        assert!(store.load_settings().await.unwrap().is_none());
        store
            .save_settings(&AgencySettings {
                agency_name: "SAS Uruburetama".to_string(),
            })
            .await
            .unwrap();
        assert_eq!(
            store.load_settings().await.unwrap().unwrap().agency_name,
            "SAS Uruburetama"
        );

        store.close().await.unwrap();
    }
}
