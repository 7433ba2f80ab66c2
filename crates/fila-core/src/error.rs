// SPDX-FileCopyrightText: 2026 Fila Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Fila ticket-queue system.

use thiserror::Error;

use crate::types::TicketStatus;

/// The primary error type used across the Fila workspace.
///
/// Storage failures never imply the operation was applied; transition and
/// not-found errors are logic errors the caller surfaces to the user.
#[derive(Debug, Error)]
pub enum FilaError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A status change was attempted from an incompatible source state.
    #[error("invalid transition: cannot {action} a ticket in status {status}")]
    InvalidTransition {
        action: &'static str,
        status: TicketStatus,
    },

    /// The referenced record does not exist.
    #[error("not found: {id}")]
    NotFound { id: String },

    /// Input rejected before reaching storage (empty name, duplicate service, ...).
    #[error("validation error: {0}")]
    Validation(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl FilaError {
    /// Wrap any error as a storage failure.
    pub fn storage(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        FilaError::Storage {
            source: Box::new(source),
        }
    }
}
