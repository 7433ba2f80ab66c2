// SPDX-FileCopyrightText: 2026 Fila Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delimited report export.
//!
//! One row per ticket, timestamps rendered as local date-time strings.
//! Unset fields export as empty strings.

use std::io::Write;

use chrono::{DateTime, Local, Utc};
use fila_core::FilaError;
use fila_core::types::Ticket;

const HEADERS: [&str; 12] = [
    "number",
    "name",
    "cpf",
    "service",
    "priority",
    "status",
    "created_at",
    "called_at",
    "started_at",
    "finished_at",
    "attendant",
    "observations",
];

/// Write the report for `tickets` to `out` as CSV.
pub fn write_csv<W: Write>(tickets: &[Ticket], out: W) -> Result<(), FilaError> {
    let mut writer = csv::Writer::from_writer(out);
    writer.write_record(HEADERS).map_err(FilaError::storage)?;

    for ticket in tickets {
        writer
            .write_record([
                ticket.number.as_str(),
                ticket.name.as_str(),
                ticket.cpf.as_deref().unwrap_or(""),
                ticket.service.as_str(),
                &ticket.priority.to_string(),
                &ticket.status.to_string(),
                &fmt_local(Some(ticket.created_at)),
                &fmt_local(ticket.called_at),
                &fmt_local(ticket.started_at),
                &fmt_local(ticket.finished_at),
                ticket.attendant_name.as_deref().unwrap_or(""),
                ticket.observations.as_deref().unwrap_or(""),
            ])
            .map_err(FilaError::storage)?;
    }

    writer.flush().map_err(FilaError::storage)
}

/// Render the report as an in-memory CSV string.
pub fn csv_string(tickets: &[Ticket]) -> Result<String, FilaError> {
    let mut buf = Vec::new();
    write_csv(tickets, &mut buf)?;
    String::from_utf8(buf).map_err(|e| FilaError::Internal(format!("csv is not utf-8: {e}")))
}

fn fmt_local(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.with_timezone(&Local).format("%d/%m/%Y %H:%M").to_string())
        .unwrap_or_default()
}
