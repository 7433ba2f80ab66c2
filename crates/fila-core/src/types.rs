// SPDX-FileCopyrightText: 2026 Fila Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types for the Fila ticket queue.
//!
//! A [`Ticket`] is one registered visit request tracked through its service
//! lifecycle. Status strings and priority labels are stored as text in the
//! database, so both enums derive `Display`/`EnumString` for round-tripping.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Lifecycle status of a ticket.
///
/// `Waiting -> Calling -> InProgress -> Finished`, with `Waiting -> Canceled`,
/// `Calling -> NoShow`, and `Calling -> Finished` as a degenerate direct-finish
/// path. Terminal statuses are final.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum TicketStatus {
    Waiting,
    Calling,
    InProgress,
    Finished,
    Canceled,
    NoShow,
}

impl TicketStatus {
    /// Terminal statuses admit no further mutation.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TicketStatus::Finished | TicketStatus::Canceled | TicketStatus::NoShow
        )
    }

    /// A ticket currently being announced or served.
    pub fn is_active(self) -> bool {
        matches!(self, TicketStatus::Calling | TicketStatus::InProgress)
    }
}

/// Priority class of a visitor.
///
/// Everything except `Normal` forms one undifferentiated preferential class
/// that preempts normal tickets in queue order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum Priority {
    Normal,
    Elderly,
    Pregnant,
    Disabled,
}

impl Priority {
    /// Whether this ticket preempts the normal queue.
    pub fn is_preferential(self) -> bool {
        !matches!(self, Priority::Normal)
    }
}

/// One registered visit request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ticket {
    /// Opaque unique identifier (UUID v4), immutable.
    pub id: String,
    /// Human-readable code, e.g. `P-007`. Unique within a calendar day.
    pub number: String,
    pub name: String,
    pub cpf: Option<String>,
    /// Free-form name of the requested service.
    pub service: String,
    pub priority: Priority,
    pub status: TicketStatus,
    pub created_at: DateTime<Utc>,
    /// Set when first entering `Calling`; refreshed on recall.
    pub called_at: Option<DateTime<Utc>>,
    /// Set when entering `InProgress`.
    pub started_at: Option<DateTime<Utc>>,
    /// Set when entering a terminal status.
    pub finished_at: Option<DateTime<Utc>>,
    /// Attendant currently or previously responsible; reassignable via takeover.
    pub attendant_name: Option<String>,
    pub observations: Option<String>,
    /// Number of times the ticket has been (re)announced.
    pub recall_count: i64,
}

/// Visitor-supplied data for registering a new ticket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewTicket {
    pub name: String,
    #[serde(default)]
    pub cpf: Option<String>,
    pub service: String,
    pub priority: Priority,
    #[serde(default)]
    pub observations: Option<String>,
}

/// Partial update applied to a ticket. `None` fields are left unchanged.
///
/// Combined with an expected-status condition this is the store's single
/// conditional-write primitive: the update applies only if the ticket's
/// status still matches at commit time.
#[derive(Debug, Clone, Default)]
pub struct TicketPatch {
    pub status: Option<TicketStatus>,
    pub called_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub attendant_name: Option<String>,
    pub recall_count: Option<i64>,
}

/// Filter for listing tickets. Results are always ordered by `created_at`
/// ascending (arrival order).
#[derive(Debug, Clone, Default)]
pub struct TicketFilter {
    /// Only tickets created at or after this instant.
    pub created_since: Option<DateTime<Utc>>,
    /// Only tickets currently in this status.
    pub status: Option<TicketStatus>,
}

impl TicketFilter {
    /// No filtering: the full ticket set in arrival order.
    pub fn all() -> Self {
        Self::default()
    }

    /// Tickets currently in the given status.
    pub fn with_status(status: TicketStatus) -> Self {
        Self {
            status: Some(status),
            ..Self::default()
        }
    }

    /// Tickets created at or after the given instant.
    pub fn since(created_since: DateTime<Utc>) -> Self {
        Self {
            created_since: Some(created_since),
            ..Self::default()
        }
    }
}

/// Kind of change carried by a [`TicketEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TicketEventKind {
    Inserted,
    Updated,
}

/// A change notification broadcast by the store after a successful write.
///
/// Every connected engine instance subscribes to this feed so concurrent
/// clients converge without polling.
#[derive(Debug, Clone, Serialize)]
pub struct TicketEvent {
    pub kind: TicketEventKind,
    pub ticket: Ticket,
}

impl TicketEvent {
    pub fn inserted(ticket: Ticket) -> Self {
        Self {
            kind: TicketEventKind::Inserted,
            ticket,
        }
    }

    pub fn updated(ticket: Ticket) -> Self {
        Self {
            kind: TicketEventKind::Updated,
            ticket,
        }
    }
}

/// The single mutable settings record, independent of ticket state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgencySettings {
    pub agency_name: String,
}

/// One entry of the service catalog offered to reception.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceEntry {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// Build a Waiting ticket with fixed timestamps, for tests.
#[cfg(test)]
pub(crate) fn test_ticket(id: &str, number: &str) -> Ticket {
    Ticket {
        id: id.to_string(),
        number: number.to_string(),
        name: "Ana".to_string(),
        cpf: None,
        service: "Primeira vez".to_string(),
        priority: Priority::Normal,
        status: TicketStatus::Waiting,
        created_at: "2026-08-03T12:00:00Z".parse().expect("valid timestamp"),
        called_at: None,
        started_at: None,
        finished_at: None,
        attendant_name: None,
        observations: None,
        recall_count: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses_are_final() {
        assert!(TicketStatus::Finished.is_terminal());
        assert!(TicketStatus::Canceled.is_terminal());
        assert!(TicketStatus::NoShow.is_terminal());
        assert!(!TicketStatus::Waiting.is_terminal());
        assert!(!TicketStatus::Calling.is_terminal());
        assert!(!TicketStatus::InProgress.is_terminal());
    }

    #[test]
    fn active_statuses_are_calling_and_in_progress() {
        assert!(TicketStatus::Calling.is_active());
        assert!(TicketStatus::InProgress.is_active());
        assert!(!TicketStatus::Waiting.is_active());
        assert!(!TicketStatus::Finished.is_active());
    }

    #[test]
    fn only_normal_is_not_preferential() {
        assert!(!Priority::Normal.is_preferential());
        assert!(Priority::Elderly.is_preferential());
        assert!(Priority::Pregnant.is_preferential());
        assert!(Priority::Disabled.is_preferential());
    }

    #[test]
    fn ticket_event_constructors_set_kind() {
        let t = test_ticket("t-1", "P-001");
        assert_eq!(TicketEvent::inserted(t.clone()).kind, TicketEventKind::Inserted);
        assert_eq!(TicketEvent::updated(t).kind, TicketEventKind::Updated);
    }

    #[test]
    fn ticket_event_kind_serializes_lowercase() {
        let json = serde_json::to_string(&TicketEventKind::Inserted).expect("serialize");
        assert_eq!(json, "\"inserted\"");
    }

    #[test]
    fn new_ticket_deserializes_without_optional_fields() {
        let json = r#"{"name": "Ana", "service": "Primeira vez", "priority": "Normal"}"#;
        let new: NewTicket = serde_json::from_str(json).expect("deserialize");
        assert_eq!(new.name, "Ana");
        assert!(new.cpf.is_none());
        assert!(new.observations.is_none());
    }
}
