// SPDX-FileCopyrightText: 2026 Fila Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The public display feed.
//!
//! The panel shows one "current" ticket (the most recently called among
//! Calling/InProgress) and a bounded strip of previously called tickets.
//! `recall_count` and `called_at` ride along so the announcer can manage
//! re-announcement cadence.

use fila_core::types::Ticket;
use serde::Serialize;

/// What the public display renders.
#[derive(Debug, Clone, Serialize)]
pub struct DisplayFeed {
    /// The ticket being announced or served right now, if any.
    pub current: Option<Ticket>,
    /// Most recently called tickets, newest first, excluding `current`.
    pub history: Vec<Ticket>,
}

/// Compute the display feed from the full ticket set.
pub fn display_feed(tickets: &[Ticket], history_limit: usize) -> DisplayFeed {
    let mut active: Vec<&Ticket> = tickets.iter().filter(|t| t.status.is_active()).collect();
    active.sort_by(|a, b| b.called_at.cmp(&a.called_at));
    let current = active.first().map(|t| (*t).clone());

    let mut called: Vec<&Ticket> = tickets.iter().filter(|t| t.called_at.is_some()).collect();
    called.sort_by(|a, b| b.called_at.cmp(&a.called_at));

    let history = called
        .into_iter()
        .filter(|t| current.as_ref().is_none_or(|c| c.id != t.id))
        .take(history_limit)
        .cloned()
        .collect();

    DisplayFeed { current, history }
}
