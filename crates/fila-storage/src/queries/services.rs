// SPDX-FileCopyrightText: 2026 Fila Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service catalog operations.

use chrono::{DateTime, Utc};
use fila_core::FilaError;
use fila_core::types::ServiceEntry;
use rusqlite::params;

use crate::database::Database;
use crate::models::{fmt_ts, parse_ts};

/// List catalog services in creation order.
pub async fn list(db: &Database) -> Result<Vec<ServiceEntry>, FilaError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, created_at FROM services ORDER BY created_at ASC, id ASC",
            )?;
            let rows = stmt.query_map([], |row| {
                let created_at: String = row.get(2)?;
                Ok(ServiceEntry {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    created_at: parse_ts(2, &created_at)?,
                })
            })?;
            let mut services = Vec::new();
            for row in rows {
                services.push(row?);
            }
            Ok(services)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Add a service to the catalog.
///
/// Returns `None` when a service with the same name already exists.
pub async fn add(
    db: &Database,
    name: &str,
    created_at: DateTime<Utc>,
) -> Result<Option<ServiceEntry>, FilaError> {
    let name = name.to_string();
    let ts = fmt_ts(created_at);
    db.connection()
        .call(move |conn| {
            let affected = conn.execute(
                "INSERT OR IGNORE INTO services (name, created_at) VALUES (?1, ?2)",
                params![name, ts],
            )?;
            if affected == 0 {
                return Ok(None);
            }
            Ok(Some(ServiceEntry {
                id: conn.last_insert_rowid(),
                name,
                created_at,
            }))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Remove a service from the catalog. Returns whether a row was deleted.
pub async fn remove(db: &Database, id: i64) -> Result<bool, FilaError> {
    db.connection()
        .call(move |conn| {
            let affected = conn.execute("DELETE FROM services WHERE id = ?1", params![id])?;
            Ok(affected > 0)
        })
        .await
        .map_err(crate::database::map_tr_err)
}
