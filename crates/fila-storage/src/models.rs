// SPDX-FileCopyrightText: 2026 Fila Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row mapping between core domain types and SQLite text columns.
//!
//! The canonical types live in `fila-core::types`; this module re-exports
//! them and provides the text encoding used for timestamps and enums.
//! Timestamps are RFC 3339 UTC with millisecond precision, which compares
//! lexicographically in SQL.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};

pub use fila_core::types::{AgencySettings, ServiceEntry, Ticket};

/// Column list shared by every ticket SELECT; order matches
/// [`ticket_from_row`].
pub(crate) const TICKET_COLUMNS: &str = "id, number, name, cpf, service, priority, status, \
     created_at, called_at, started_at, finished_at, attendant_name, observations, recall_count";

/// Encode a timestamp for storage.
pub(crate) fn fmt_ts(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Decode a stored timestamp, reporting the offending column on failure.
pub(crate) fn parse_ts(idx: usize, raw: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

/// Decode a stored enum label (status, priority) by its `FromStr` impl.
pub(crate) fn parse_enum<T>(idx: usize, raw: &str) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    T::from_str(raw).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Map a row selected with [`TICKET_COLUMNS`] into a [`Ticket`].
pub(crate) fn ticket_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Ticket> {
    let priority: String = row.get(5)?;
    let status: String = row.get(6)?;
    let created_at: String = row.get(7)?;
    let called_at: Option<String> = row.get(8)?;
    let started_at: Option<String> = row.get(9)?;
    let finished_at: Option<String> = row.get(10)?;

    Ok(Ticket {
        id: row.get(0)?,
        number: row.get(1)?,
        name: row.get(2)?,
        cpf: row.get(3)?,
        service: row.get(4)?,
        priority: parse_enum(5, &priority)?,
        status: parse_enum(6, &status)?,
        created_at: parse_ts(7, &created_at)?,
        called_at: called_at.as_deref().map(|s| parse_ts(8, s)).transpose()?,
        started_at: started_at.as_deref().map(|s| parse_ts(9, s)).transpose()?,
        finished_at: finished_at.as_deref().map(|s| parse_ts(10, s)).transpose()?,
        attendant_name: row.get(11)?,
        observations: row.get(12)?,
        recall_count: row.get(13)?,
    })
}
