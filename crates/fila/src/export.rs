// SPDX-FileCopyrightText: 2026 Fila Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `fila export` command implementation.
//!
//! Opens the ticket store directly (no running server needed) and writes
//! the delimited report to a file.

use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

use fila_config::model::FilaConfig;
use fila_core::{FilaError, TicketStore};
use fila_engine::QueueEngine;
use fila_engine::stats::DateRange;
use fila_storage::SqliteTicketStore;

/// Run the `fila export` command.
pub async fn run_export(
    config: &FilaConfig,
    output: &Path,
    range: Option<&str>,
) -> Result<(), FilaError> {
    let range = match range {
        Some(raw) => Some(
            DateRange::from_str(raw)
                .map_err(|_| FilaError::Validation(format!("unknown range `{raw}`")))?,
        ),
        None => None,
    };

    let store = Arc::new(SqliteTicketStore::open(&config.storage).await?);
    let engine = QueueEngine::new(store.clone() as Arc<dyn TicketStore>);

    let csv = engine.export_csv(range).await?;
    std::fs::write(output, &csv).map_err(FilaError::storage)?;
    store.close().await?;

    println!("report written to {}", output.display());
    Ok(())
}
