// SPDX-FileCopyrightText: 2026 Fila Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Settings record operations.

use chrono::{DateTime, Utc};
use fila_core::FilaError;
use fila_core::types::AgencySettings;
use rusqlite::params;

use crate::database::Database;
use crate::models::fmt_ts;

/// Load the settings record, if one has been saved.
pub async fn load(db: &Database) -> Result<Option<AgencySettings>, FilaError> {
    db.connection()
        .call(|conn| {
            let result = conn.query_row(
                "SELECT agency_name FROM settings WHERE id = 1",
                [],
                |row| row.get::<_, String>(0),
            );
            match result {
                Ok(agency_name) => Ok(Some(AgencySettings { agency_name })),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Persist the settings record, replacing any previous one.
pub async fn save(
    db: &Database,
    settings: &AgencySettings,
    updated_at: DateTime<Utc>,
) -> Result<(), FilaError> {
    let name = settings.agency_name.clone();
    let ts = fmt_ts(updated_at);
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO settings (id, agency_name, updated_at) VALUES (1, ?1, ?2)
                 ON CONFLICT(id) DO UPDATE SET
                     agency_name = excluded.agency_name,
                     updated_at = excluded.updated_at",
                params![name, ts],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
