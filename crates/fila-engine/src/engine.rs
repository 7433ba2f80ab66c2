// SPDX-FileCopyrightText: 2026 Fila Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The queue engine: ticket lifecycle operations over a ticket store.
//!
//! Every mutation is a single conditional write; the precondition travels
//! with the update so a stale view can never apply an invalid transition.
//! `call_next` is the one operation with a retry: losing the claim race
//! reloads the waiting list and claims the new head, bounded to avoid
//! spinning on a pathologically contended queue.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::broadcast;
use tracing::{debug, info};

use fila_core::types::{
    AgencySettings, NewTicket, ServiceEntry, Ticket, TicketEvent, TicketFilter, TicketPatch,
    TicketStatus,
};
use fila_core::{FilaError, TicketStore};

use crate::display::{self, DisplayFeed};
use crate::export;
use crate::ordering;
use crate::stats::{self, DateRange, StatsReport};

/// Total claim attempts for a targetless `call_next` before giving up.
/// Attempt 1 is the normal path; the rest absorb lost races.
const MAX_CALL_ATTEMPTS: usize = 3;

/// Queue engine over a shared ticket store.
///
/// Cheap to clone the `Arc` into; each UI surface gets the same store
/// injected rather than reaching for a global.
pub struct QueueEngine {
    store: Arc<dyn TicketStore>,
}

impl QueueEngine {
    pub fn new(store: Arc<dyn TicketStore>) -> Self {
        Self { store }
    }

    /// Register a visitor, assigning a daily ticket number.
    pub async fn register(&self, new: NewTicket) -> Result<Ticket, FilaError> {
        if new.name.trim().is_empty() {
            return Err(FilaError::Validation("visitor name must not be empty".into()));
        }
        if new.service.trim().is_empty() {
            return Err(FilaError::Validation("service must not be empty".into()));
        }

        let ticket = self.store.create_ticket(new, Utc::now()).await?;
        info!(number = %ticket.number, service = %ticket.service, "ticket registered");
        Ok(ticket)
    }

    /// Call a specific ticket, or the head of the waiting queue.
    ///
    /// Without a target, returns `None` only when the waiting list is empty.
    /// A race lost to another attendant is retried against the reloaded
    /// list; the loser transparently gets the next-available ticket. With an
    /// explicit target, a lost race surfaces as `InvalidTransition` instead
    /// of calling someone the attendant did not pick.
    pub async fn call_next(
        &self,
        attendant_name: &str,
        target: Option<&str>,
    ) -> Result<Option<Ticket>, FilaError> {
        if attendant_name.trim().is_empty() {
            return Err(FilaError::Validation("attendant name must not be empty".into()));
        }

        if let Some(id) = target {
            let ticket = self.require(id).await?;
            let patch = calling_patch(attendant_name, ticket.recall_count + 1);
            return match self
                .store
                .update_ticket(id, patch, Some(&[TicketStatus::Waiting]))
                .await?
            {
                Some(called) => {
                    info!(number = %called.number, attendant = attendant_name, "ticket called");
                    Ok(Some(called))
                }
                None => {
                    let current = self.require(id).await?;
                    Err(FilaError::InvalidTransition {
                        action: "call",
                        status: current.status,
                    })
                }
            };
        }

        for attempt in 1..=MAX_CALL_ATTEMPTS {
            let waiting = self
                .store
                .list_tickets(TicketFilter::with_status(TicketStatus::Waiting))
                .await?;
            let Some(head) = ordering::next_in_line(&waiting) else {
                return Ok(None);
            };

            let patch = calling_patch(attendant_name, head.recall_count + 1);
            match self
                .store
                .update_ticket(&head.id, patch, Some(&[TicketStatus::Waiting]))
                .await?
            {
                Some(called) => {
                    info!(number = %called.number, attendant = attendant_name, "ticket called");
                    return Ok(Some(called));
                }
                None => {
                    debug!(
                        attempt,
                        number = %head.number,
                        "lost call race, reloading waiting list"
                    );
                }
            }
        }

        Err(FilaError::Internal(format!(
            "call_next lost the claim race {MAX_CALL_ATTEMPTS} times in a row"
        )))
    }

    /// Begin serving a called visitor.
    pub async fn start_service(&self, id: &str) -> Result<Ticket, FilaError> {
        self.transition(
            id,
            "start",
            &[TicketStatus::Calling],
            TicketPatch {
                status: Some(TicketStatus::InProgress),
                started_at: Some(Utc::now()),
                ..TicketPatch::default()
            },
        )
        .await
    }

    /// Conclude service. Also accepts `Calling` for the direct-finish flow.
    pub async fn finish(&self, id: &str) -> Result<Ticket, FilaError> {
        self.transition(
            id,
            "finish",
            &[TicketStatus::InProgress, TicketStatus::Calling],
            TicketPatch {
                status: Some(TicketStatus::Finished),
                finished_at: Some(Utc::now()),
                ..TicketPatch::default()
            },
        )
        .await
    }

    /// Re-announce a called ticket without changing its queue position.
    pub async fn recall(&self, id: &str) -> Result<Ticket, FilaError> {
        let ticket = self.require(id).await?;
        let recalled = self
            .transition(
                id,
                "recall",
                &[TicketStatus::Calling],
                TicketPatch {
                    called_at: Some(Utc::now()),
                    recall_count: Some(ticket.recall_count + 1),
                    ..TicketPatch::default()
                },
            )
            .await?;
        debug!(number = %recalled.number, recall_count = recalled.recall_count, "ticket recalled");
        Ok(recalled)
    }

    /// Mark a called visitor who never showed up at the counter.
    pub async fn mark_no_show(&self, id: &str) -> Result<Ticket, FilaError> {
        self.transition(
            id,
            "mark as no-show",
            &[TicketStatus::Calling],
            TicketPatch {
                status: Some(TicketStatus::NoShow),
                finished_at: Some(Utc::now()),
                ..TicketPatch::default()
            },
        )
        .await
    }

    /// Cancel a ticket that is still waiting. Tickets already being served
    /// cannot be canceled.
    pub async fn cancel(&self, id: &str) -> Result<Ticket, FilaError> {
        self.transition(
            id,
            "cancel",
            &[TicketStatus::Waiting],
            TicketPatch {
                status: Some(TicketStatus::Canceled),
                finished_at: Some(Utc::now()),
                ..TicketPatch::default()
            },
        )
        .await
    }

    /// Reassign an active ticket to another attendant. Any attendant may
    /// rescue a ticket abandoned mid-flow; status and timestamps stay put.
    pub async fn takeover(&self, id: &str, new_attendant: &str) -> Result<Ticket, FilaError> {
        if new_attendant.trim().is_empty() {
            return Err(FilaError::Validation("attendant name must not be empty".into()));
        }
        let taken = self
            .transition(
                id,
                "take over",
                &[TicketStatus::Calling, TicketStatus::InProgress],
                TicketPatch {
                    attendant_name: Some(new_attendant.to_string()),
                    ..TicketPatch::default()
                },
            )
            .await?;
        info!(number = %taken.number, attendant = new_attendant, "ticket taken over");
        Ok(taken)
    }

    // --- Read side ---

    /// List tickets through the store filter.
    pub async fn tickets(&self, filter: TicketFilter) -> Result<Vec<Ticket>, FilaError> {
        self.store.list_tickets(filter).await
    }

    /// Fetch one ticket, failing with `NotFound` when absent.
    pub async fn ticket(&self, id: &str) -> Result<Ticket, FilaError> {
        self.require(id).await
    }

    /// Derive the statistics report for a date range.
    pub async fn stats(&self, range: DateRange) -> Result<StatsReport, FilaError> {
        let tickets = self.store.list_tickets(TicketFilter::all()).await?;
        Ok(stats::stats_report(&tickets, range, Utc::now()))
    }

    /// Derive the public display feed (current call + bounded history).
    pub async fn display_feed(&self, history_limit: usize) -> Result<DisplayFeed, FilaError> {
        let tickets = self.store.list_tickets(TicketFilter::all()).await?;
        Ok(display::display_feed(&tickets, history_limit))
    }

    /// Render the delimited report for tickets in the range (all when `None`).
    pub async fn export_csv(&self, range: Option<DateRange>) -> Result<String, FilaError> {
        let filter = match range {
            Some(range) => TicketFilter::since(range.start(Utc::now())),
            None => TicketFilter::all(),
        };
        let tickets = self.store.list_tickets(filter).await?;
        export::csv_string(&tickets)
    }

    /// Subscribe to the store's change-event feed.
    pub fn subscribe(&self) -> broadcast::Receiver<TicketEvent> {
        self.store.subscribe()
    }

    // --- Settings & service catalog ---

    pub async fn settings(&self) -> Result<Option<AgencySettings>, FilaError> {
        self.store.load_settings().await
    }

    pub async fn update_settings(&self, settings: AgencySettings) -> Result<AgencySettings, FilaError> {
        if settings.agency_name.trim().is_empty() {
            return Err(FilaError::Validation("agency name must not be empty".into()));
        }
        self.store.save_settings(&settings).await?;
        Ok(settings)
    }

    pub async fn services(&self) -> Result<Vec<ServiceEntry>, FilaError> {
        self.store.list_services().await
    }

    pub async fn add_service(&self, name: &str) -> Result<ServiceEntry, FilaError> {
        self.store.add_service(name).await
    }

    pub async fn remove_service(&self, id: i64) -> Result<(), FilaError> {
        self.store.remove_service(id).await
    }

    /// Flush and release the underlying store.
    pub async fn close(&self) -> Result<(), FilaError> {
        self.store.close().await
    }

    // --- Internals ---

    async fn require(&self, id: &str) -> Result<Ticket, FilaError> {
        self.store
            .get_ticket(id)
            .await?
            .ok_or_else(|| FilaError::NotFound { id: id.to_string() })
    }

    /// Apply `patch` if the ticket's status is in `expected`; otherwise
    /// report the actual status as an invalid transition (or `NotFound`).
    async fn transition(
        &self,
        id: &str,
        action: &'static str,
        expected: &[TicketStatus],
        patch: TicketPatch,
    ) -> Result<Ticket, FilaError> {
        match self.store.update_ticket(id, patch, Some(expected)).await? {
            Some(ticket) => Ok(ticket),
            None => {
                let current = self.require(id).await?;
                Err(FilaError::InvalidTransition {
                    action,
                    status: current.status,
                })
            }
        }
    }
}

/// The patch that claims a Waiting ticket for announcement.
fn calling_patch(attendant_name: &str, recall_count: i64) -> TicketPatch {
    TicketPatch {
        status: Some(TicketStatus::Calling),
        called_at: Some(Utc::now()),
        attendant_name: Some(attendant_name.to_string()),
        recall_count: Some(recall_count),
        ..TicketPatch::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fila_config::model::StorageConfig;
    use fila_core::types::Priority;
    use fila_storage::SqliteTicketStore;
    use tempfile::tempdir;

    async fn engine() -> (QueueEngine, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let config = StorageConfig {
            database_path: dir.path().join("engine.db").to_string_lossy().into_owned(),
            wal_mode: true,
        };
        let store = SqliteTicketStore::open(&config).await.unwrap();
        (QueueEngine::new(Arc::new(store)), dir)
    }

    fn walk_in(name: &str, service: &str, priority: Priority) -> NewTicket {
        NewTicket {
            name: name.to_string(),
            cpf: None,
            service: service.to_string(),
            priority,
            observations: None,
        }
    }

    #[tokio::test]
    async fn register_assigns_number_and_waiting_status() {
        let (engine, _dir) = engine().await;
        let ticket = engine
            .register(walk_in("Ana", "Primeira vez", Priority::Normal))
            .await
            .unwrap();
        assert_eq!(ticket.number, "P-001");
        assert_eq!(ticket.status, TicketStatus::Waiting);
    }

    #[tokio::test]
    async fn register_rejects_blank_name_and_service() {
        let (engine, _dir) = engine().await;

        let err = engine
            .register(walk_in("  ", "Primeira vez", Priority::Normal))
            .await
            .unwrap_err();
        assert!(matches!(err, FilaError::Validation(_)));

        let err = engine
            .register(walk_in("Ana", "", Priority::Normal))
            .await
            .unwrap_err();
        assert!(matches!(err, FilaError::Validation(_)));
    }

    #[tokio::test]
    async fn call_next_prefers_priority_class_over_arrival() {
        let (engine, _dir) = engine().await;

        engine
            .register(walk_in("Ana", "Primeira vez", Priority::Normal))
            .await
            .unwrap();
        engine
            .register(walk_in("Bruno", "Inclusão", Priority::Normal))
            .await
            .unwrap();
        let elderly = engine
            .register(walk_in("Carla", "Alteração", Priority::Elderly))
            .await
            .unwrap();

        let called = engine.call_next("Maria", None).await.unwrap().unwrap();
        assert_eq!(called.id, elderly.id, "priority preempts earlier arrivals");
        assert_eq!(called.status, TicketStatus::Calling);
        assert_eq!(called.attendant_name.as_deref(), Some("Maria"));
        assert_eq!(called.recall_count, 1);
        assert!(called.called_at.is_some());
    }

    #[tokio::test]
    async fn call_next_on_empty_queue_returns_none() {
        let (engine, _dir) = engine().await;
        assert!(engine.call_next("Maria", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn call_next_with_explicit_target_claims_that_ticket() {
        let (engine, _dir) = engine().await;

        engine
            .register(walk_in("Ana", "Primeira vez", Priority::Elderly))
            .await
            .unwrap();
        let bruno = engine
            .register(walk_in("Bruno", "Inclusão", Priority::Normal))
            .await
            .unwrap();

        let called = engine
            .call_next("Maria", Some(&bruno.id))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(called.id, bruno.id);
    }

    #[tokio::test]
    async fn call_next_on_already_called_target_is_invalid() {
        let (engine, _dir) = engine().await;
        let ticket = engine
            .register(walk_in("Ana", "Primeira vez", Priority::Normal))
            .await
            .unwrap();
        engine.call_next("Maria", Some(&ticket.id)).await.unwrap();

        let err = engine
            .call_next("João", Some(&ticket.id))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FilaError::InvalidTransition {
                status: TicketStatus::Calling,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn concurrent_call_next_yields_distinct_tickets() {
        let (engine, _dir) = engine().await;
        let engine = Arc::new(engine);

        engine
            .register(walk_in("Ana", "Primeira vez", Priority::Normal))
            .await
            .unwrap();
        engine
            .register(walk_in("Bruno", "Inclusão", Priority::Normal))
            .await
            .unwrap();

        let a = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.call_next("Maria", None).await })
        };
        let b = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.call_next("João", None).await })
        };

        let first = a.await.unwrap().unwrap().expect("two tickets waiting");
        let second = b.await.unwrap().unwrap().expect("two tickets waiting");
        assert_ne!(first.id, second.id, "each attendant must win a different ticket");
    }

    #[tokio::test]
    async fn concurrent_call_next_on_single_ticket_one_wins() {
        let (engine, _dir) = engine().await;
        let engine = Arc::new(engine);

        engine
            .register(walk_in("Ana", "Primeira vez", Priority::Normal))
            .await
            .unwrap();

        let a = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.call_next("Maria", None).await })
        };
        let b = {
            let engine = engine.clone();
            tokio::spawn(async move { engine.call_next("João", None).await })
        };

        let results = [a.await.unwrap().unwrap(), b.await.unwrap().unwrap()];
        let winners: Vec<_> = results.iter().flatten().collect();
        assert_eq!(winners.len(), 1, "exactly one attendant wins the only ticket");
    }

    #[tokio::test]
    async fn full_lifecycle_waiting_to_finished() {
        let (engine, _dir) = engine().await;
        let ticket = engine
            .register(walk_in("Ana", "Primeira vez", Priority::Normal))
            .await
            .unwrap();

        let called = engine.call_next("Maria", None).await.unwrap().unwrap();
        assert_eq!(called.id, ticket.id);

        let started = engine.start_service(&ticket.id).await.unwrap();
        assert_eq!(started.status, TicketStatus::InProgress);
        assert!(started.started_at.is_some());

        let finished = engine.finish(&ticket.id).await.unwrap();
        assert_eq!(finished.status, TicketStatus::Finished);
        assert!(finished.finished_at.is_some());
        assert!(finished.finished_at >= finished.started_at);
    }

    #[tokio::test]
    async fn direct_finish_from_calling_is_allowed() {
        let (engine, _dir) = engine().await;
        let ticket = engine
            .register(walk_in("Ana", "Primeira vez", Priority::Normal))
            .await
            .unwrap();
        engine.call_next("Maria", None).await.unwrap();

        let finished = engine.finish(&ticket.id).await.unwrap();
        assert_eq!(finished.status, TicketStatus::Finished);
        assert!(finished.started_at.is_none(), "direct finish skips InProgress");
    }

    #[tokio::test]
    async fn recall_bumps_count_and_refreshes_called_at() {
        let (engine, _dir) = engine().await;
        let ticket = engine
            .register(walk_in("Ana", "Primeira vez", Priority::Normal))
            .await
            .unwrap();
        let called = engine.call_next("Maria", None).await.unwrap().unwrap();

        let recalled = engine.recall(&ticket.id).await.unwrap();
        assert_eq!(recalled.status, TicketStatus::Calling);
        assert_eq!(recalled.recall_count, called.recall_count + 1);
        assert!(recalled.called_at >= called.called_at);
    }

    #[tokio::test]
    async fn no_show_is_terminal_and_leaves_queue() {
        let (engine, _dir) = engine().await;
        let ticket = engine
            .register(walk_in("Ana", "Primeira vez", Priority::Normal))
            .await
            .unwrap();
        engine.call_next("Maria", None).await.unwrap();

        let gone = engine.mark_no_show(&ticket.id).await.unwrap();
        assert_eq!(gone.status, TicketStatus::NoShow);
        assert!(gone.finished_at.is_some());

        // Excluded from future selection.
        assert!(engine.call_next("Maria", None).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cancel_only_applies_to_waiting_tickets() {
        let (engine, _dir) = engine().await;
        let waiting = engine
            .register(walk_in("Ana", "Primeira vez", Priority::Normal))
            .await
            .unwrap();
        let canceled = engine.cancel(&waiting.id).await.unwrap();
        assert_eq!(canceled.status, TicketStatus::Canceled);

        let served = engine
            .register(walk_in("Bruno", "Inclusão", Priority::Normal))
            .await
            .unwrap();
        engine.call_next("Maria", None).await.unwrap();
        engine.start_service(&served.id).await.unwrap();

        let err = engine.cancel(&served.id).await.unwrap_err();
        assert!(matches!(
            err,
            FilaError::InvalidTransition {
                status: TicketStatus::InProgress,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn takeover_reassigns_without_status_change() {
        let (engine, _dir) = engine().await;
        let ticket = engine
            .register(walk_in("Ana", "Primeira vez", Priority::Normal))
            .await
            .unwrap();
        engine.call_next("Maria", None).await.unwrap();
        let started = engine.start_service(&ticket.id).await.unwrap();

        let taken = engine.takeover(&ticket.id, "João").await.unwrap();
        assert_eq!(taken.status, TicketStatus::InProgress);
        assert_eq!(taken.attendant_name.as_deref(), Some("João"));
        assert_eq!(taken.started_at, started.started_at);
    }

    #[tokio::test]
    async fn invalid_transitions_are_rejected() {
        let (engine, _dir) = engine().await;
        let ticket = engine
            .register(walk_in("Ana", "Primeira vez", Priority::Normal))
            .await
            .unwrap();

        // start_service on Waiting
        assert!(matches!(
            engine.start_service(&ticket.id).await.unwrap_err(),
            FilaError::InvalidTransition {
                status: TicketStatus::Waiting,
                ..
            }
        ));

        // mark_no_show on Finished
        engine.call_next("Maria", None).await.unwrap();
        engine.finish(&ticket.id).await.unwrap();
        assert!(matches!(
            engine.mark_no_show(&ticket.id).await.unwrap_err(),
            FilaError::InvalidTransition {
                status: TicketStatus::Finished,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn operations_on_unknown_ids_are_not_found() {
        let (engine, _dir) = engine().await;
        assert!(matches!(
            engine.start_service("ghost").await.unwrap_err(),
            FilaError::NotFound { .. }
        ));
        assert!(matches!(
            engine.call_next("Maria", Some("ghost")).await.unwrap_err(),
            FilaError::NotFound { .. }
        ));
        assert!(matches!(
            engine.ticket("ghost").await.unwrap_err(),
            FilaError::NotFound { .. }
        ));
    }

    #[tokio::test]
    async fn register_broadcasts_to_subscribers() {
        let (engine, _dir) = engine().await;
        let mut rx = engine.subscribe();

        engine
            .register(walk_in("Ana", "Primeira vez", Priority::Normal))
            .await
            .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.ticket.number, "P-001");
    }
}
