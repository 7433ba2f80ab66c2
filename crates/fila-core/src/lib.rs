// SPDX-FileCopyrightText: 2026 Fila Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Fila ticket-queue system.
//!
//! This crate provides the domain types (tickets, statuses, priorities,
//! change events), the error taxonomy, ticket-number formatting, and the
//! [`TicketStore`] trait implemented by persistence backends. All other
//! Fila crates build on the definitions here.

pub mod error;
pub mod numbering;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::FilaError;
pub use traits::TicketStore;
pub use types::{
    AgencySettings, NewTicket, Priority, ServiceEntry, Ticket, TicketEvent, TicketEventKind,
    TicketFilter, TicketPatch, TicketStatus,
};
