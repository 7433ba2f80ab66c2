// SPDX-FileCopyrightText: 2026 Fila Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The ticket store trait implemented by persistence backends.
//!
//! The store is the only shared mutable resource in the system. It persists
//! tickets, applies conditional writes, and broadcasts change events; it
//! never originates status transitions -- that is the queue engine's job.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::error::FilaError;
use crate::types::{
    AgencySettings, NewTicket, ServiceEntry, Ticket, TicketEvent, TicketFilter, TicketPatch,
    TicketStatus,
};

/// Durable ticket storage with change notifications.
///
/// Correctness under concurrent attendants rests entirely on
/// [`update_ticket`](TicketStore::update_ticket)'s conditional-write
/// contract: the patch applies only if the ticket's status is still one of
/// `expected` at commit time, and the caller learns whether it won.
#[async_trait]
pub trait TicketStore: Send + Sync + 'static {
    /// Persist a new Waiting ticket, assigning its id and daily number.
    ///
    /// The daily sequence count and the insert must be atomic with respect
    /// to concurrent registrations, so number generation lives inside the
    /// store rather than in the engine.
    async fn create_ticket(
        &self,
        new: NewTicket,
        created_at: DateTime<Utc>,
    ) -> Result<Ticket, FilaError>;

    /// Fetch a ticket by id.
    async fn get_ticket(&self, id: &str) -> Result<Option<Ticket>, FilaError>;

    /// List tickets matching the filter, ordered by `created_at` ascending.
    async fn list_tickets(&self, filter: TicketFilter) -> Result<Vec<Ticket>, FilaError>;

    /// Apply a partial update, optionally conditioned on the current status.
    ///
    /// Returns the updated ticket, or `None` when the row exists but its
    /// status was not in `expected` (a lost race or stale precondition).
    /// A nonexistent id also yields `None`; callers that need to distinguish
    /// re-fetch with [`get_ticket`](TicketStore::get_ticket).
    async fn update_ticket(
        &self,
        id: &str,
        patch: TicketPatch,
        expected: Option<&[TicketStatus]>,
    ) -> Result<Option<Ticket>, FilaError>;

    /// Subscribe to the change-event feed.
    ///
    /// Every successful insert or update is broadcast after commit. A lagged
    /// subscriber skips to the live edge rather than blocking writers.
    fn subscribe(&self) -> broadcast::Receiver<TicketEvent>;

    // --- Settings ---

    /// Load the settings record, if one has been saved.
    async fn load_settings(&self) -> Result<Option<AgencySettings>, FilaError>;

    /// Persist the settings record, replacing any previous one.
    async fn save_settings(&self, settings: &AgencySettings) -> Result<(), FilaError>;

    // --- Service catalog ---

    /// List catalog services in creation order.
    async fn list_services(&self) -> Result<Vec<ServiceEntry>, FilaError>;

    /// Add a service to the catalog. Duplicate names are rejected.
    async fn add_service(&self, name: &str) -> Result<ServiceEntry, FilaError>;

    /// Remove a service from the catalog.
    async fn remove_service(&self, id: i64) -> Result<(), FilaError>;

    /// Flush pending writes and release the backend.
    async fn close(&self) -> Result<(), FilaError>;
}
