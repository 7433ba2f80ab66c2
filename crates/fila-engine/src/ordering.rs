// SPDX-FileCopyrightText: 2026 Fila Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue selection policy.
//!
//! Waiting tickets partition into the preferential class (priority other
//! than Normal) and the normal class. Each class is first-come-first-served;
//! the preferential class always preempts the normal one regardless of
//! arrival time. There is no sub-ranking among Elderly/Pregnant/Disabled.

use fila_core::types::{Ticket, TicketStatus};

/// The full selectable order over the Waiting subset of `tickets`:
/// preferential tickets oldest-first, then normal tickets oldest-first.
pub fn sort_waiting(tickets: &[Ticket]) -> Vec<&Ticket> {
    let mut preferential: Vec<&Ticket> = tickets
        .iter()
        .filter(|t| t.status == TicketStatus::Waiting && t.priority.is_preferential())
        .collect();
    let mut normal: Vec<&Ticket> = tickets
        .iter()
        .filter(|t| t.status == TicketStatus::Waiting && !t.priority.is_preferential())
        .collect();

    preferential.sort_by_key(|t| t.created_at);
    normal.sort_by_key(|t| t.created_at);

    preferential.into_iter().chain(normal).collect()
}

/// The next ticket `call_next` should claim, if any.
pub fn next_in_line(tickets: &[Ticket]) -> Option<&Ticket> {
    sort_waiting(tickets).into_iter().next()
}
