// SPDX-FileCopyrightText: 2026 Fila Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Queue engine for the Fila ticket system.
//!
//! [`QueueEngine`] owns the ticket lifecycle: it validates registrations,
//! enforces the status state machine through conditional writes, resolves
//! concurrent "call next" races, and derives read-side views (statistics,
//! the public display feed, CSV export). It is the sole originator of
//! ticket mutations; the store persists and broadcasts but never decides.

pub mod display;
pub mod engine;
pub mod export;
pub mod ordering;
pub mod stats;

pub use display::DisplayFeed;
pub use engine::QueueEngine;
pub use stats::{DateRange, HealthLevel, QueueTotals, ServiceHealth, StatsReport};
