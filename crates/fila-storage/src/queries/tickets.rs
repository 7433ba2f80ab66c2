// SPDX-FileCopyrightText: 2026 Fila Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket CRUD and the conditional-write primitive.
//!
//! `create_ticket` runs the daily count and the insert in one transaction on
//! the single writer thread, which is what keeps ticket numbers unique and
//! gapless under concurrent registrations. `update_ticket` is the
//! compare-and-swap the queue engine's `call_next` race policy rests on: the
//! patch applies only when the row's status still matches at commit time.

use chrono::{DateTime, Utc};
use fila_core::numbering::{start_of_local_day, ticket_number};
use fila_core::types::{NewTicket, Ticket, TicketFilter, TicketPatch, TicketStatus};
use fila_core::FilaError;
use rusqlite::params;
use rusqlite::types::Value;

use crate::database::Database;
use crate::models::{fmt_ts, ticket_from_row, TICKET_COLUMNS};

/// Insert a new Waiting ticket, assigning its id and daily number.
pub async fn create_ticket(
    db: &Database,
    new: NewTicket,
    created_at: DateTime<Utc>,
) -> Result<Ticket, FilaError> {
    let id = uuid::Uuid::new_v4().to_string();
    let created = fmt_ts(created_at);
    let day_start = fmt_ts(start_of_local_day(created_at));
    let status = TicketStatus::Waiting;

    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;

            // The daily sequence is global across services and scoped to the
            // local calendar day. Counting inside the insert transaction
            // serializes concurrent registrations.
            let count: i64 = tx.query_row(
                "SELECT COUNT(*) FROM tickets WHERE created_at >= ?1",
                params![day_start],
                |row| row.get(0),
            )?;
            let number = ticket_number(&new.service, count + 1);

            tx.execute(
                "INSERT INTO tickets
                     (id, number, name, cpf, service, priority, status, created_at, recall_count)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0)",
                params![
                    id,
                    number,
                    new.name,
                    new.cpf,
                    new.service,
                    new.priority.to_string(),
                    status.to_string(),
                    created,
                ],
            )?;
            tx.commit()?;

            Ok(Ticket {
                id,
                number,
                name: new.name,
                cpf: new.cpf,
                service: new.service,
                priority: new.priority,
                status,
                created_at,
                called_at: None,
                started_at: None,
                finished_at: None,
                attendant_name: None,
                observations: new.observations,
                recall_count: 0,
            })
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Get a ticket by id.
pub async fn get_ticket(db: &Database, id: &str) -> Result<Option<Ticket>, FilaError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {TICKET_COLUMNS} FROM tickets WHERE id = ?1"
            ))?;
            let result = stmt.query_row(params![id], ticket_from_row);
            match result {
                Ok(ticket) => Ok(Some(ticket)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// List tickets matching the filter, ordered by arrival.
pub async fn list_tickets(db: &Database, filter: TicketFilter) -> Result<Vec<Ticket>, FilaError> {
    let mut sql = format!("SELECT {TICKET_COLUMNS} FROM tickets");
    let mut clauses = Vec::new();
    let mut args: Vec<String> = Vec::new();

    if let Some(since) = filter.created_since {
        clauses.push("created_at >= ?");
        args.push(fmt_ts(since));
    }
    if let Some(status) = filter.status {
        clauses.push("status = ?");
        args.push(status.to_string());
    }
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY created_at ASC");

    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(rusqlite::params_from_iter(args), ticket_from_row)?;
            let mut tickets = Vec::new();
            for row in rows {
                tickets.push(row?);
            }
            Ok(tickets)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Apply a partial update, optionally conditioned on the current status.
///
/// Returns the updated row, or `None` when nothing matched -- either the id
/// does not exist or the status condition failed (a lost race).
pub async fn update_ticket(
    db: &Database,
    id: &str,
    patch: TicketPatch,
    expected: Option<&[TicketStatus]>,
) -> Result<Option<Ticket>, FilaError> {
    let mut sets = Vec::new();
    let mut args: Vec<Value> = Vec::new();

    if let Some(status) = patch.status {
        sets.push("status = ?");
        args.push(Value::Text(status.to_string()));
    }
    if let Some(ts) = patch.called_at {
        sets.push("called_at = ?");
        args.push(Value::Text(fmt_ts(ts)));
    }
    if let Some(ts) = patch.started_at {
        sets.push("started_at = ?");
        args.push(Value::Text(fmt_ts(ts)));
    }
    if let Some(ts) = patch.finished_at {
        sets.push("finished_at = ?");
        args.push(Value::Text(fmt_ts(ts)));
    }
    if let Some(name) = patch.attendant_name {
        sets.push("attendant_name = ?");
        args.push(Value::Text(name));
    }
    if let Some(n) = patch.recall_count {
        sets.push("recall_count = ?");
        args.push(Value::Integer(n));
    }
    if sets.is_empty() {
        return Err(FilaError::Internal("empty ticket patch".to_string()));
    }

    let id = id.to_string();
    let mut sql = format!("UPDATE tickets SET {} WHERE id = ?", sets.join(", "));
    args.push(Value::Text(id.clone()));
    if let Some(expected) = expected {
        let placeholders = vec!["?"; expected.len()].join(", ");
        sql.push_str(&format!(" AND status IN ({placeholders})"));
        for status in expected {
            args.push(Value::Text(status.to_string()));
        }
    }

    db.connection()
        .call(move |conn| {
            let tx = conn.transaction()?;
            let affected = tx.execute(&sql, rusqlite::params_from_iter(args))?;
            if affected == 0 {
                tx.commit()?;
                return Ok(None);
            }
            let ticket = tx.query_row(
                &format!("SELECT {TICKET_COLUMNS} FROM tickets WHERE id = ?1"),
                params![id],
                ticket_from_row,
            )?;
            tx.commit()?;
            Ok(Some(ticket))
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fila_core::types::Priority;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap(), true).await.unwrap();
        (db, dir)
    }

    fn walk_in(name: &str, service: &str, priority: Priority) -> NewTicket {
        NewTicket {
            name: name.to_string(),
            cpf: None,
            service: service.to_string(),
            priority,
            observations: None,
        }
    }

    #[tokio::test]
    async fn create_assigns_number_and_waiting_status() {
        let (db, _dir) = setup_db().await;

        let ticket = create_ticket(
            &db,
            walk_in("Ana", "Primeira vez", Priority::Normal),
            Utc::now(),
        )
        .await
        .unwrap();

        assert_eq!(ticket.number, "P-001");
        assert_eq!(ticket.status, TicketStatus::Waiting);
        assert_eq!(ticket.recall_count, 0);
        assert!(ticket.called_at.is_none());
        assert!(ticket.started_at.is_none());
        assert!(ticket.finished_at.is_none());

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn numbering_is_gapless_across_services() {
        let (db, _dir) = setup_db().await;
        let now = Utc::now();

        let t1 = create_ticket(&db, walk_in("Ana", "Primeira vez", Priority::Normal), now)
            .await
            .unwrap();
        let t2 = create_ticket(&db, walk_in("Bruno", "Inclusão", Priority::Normal), now)
            .await
            .unwrap();
        let t3 = create_ticket(&db, walk_in("Carla", "Alteração", Priority::Elderly), now)
            .await
            .unwrap();

        assert_eq!(t1.number, "P-001");
        assert_eq!(t2.number, "I-002");
        assert_eq!(t3.number, "A-003");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn numbering_ignores_tickets_from_previous_days() {
        let (db, _dir) = setup_db().await;
        let now = Utc::now();
        let yesterday = now - chrono::Duration::days(1);

        let old = create_ticket(&db, walk_in("Ana", "Primeira vez", Priority::Normal), yesterday)
            .await
            .unwrap();
        let fresh = create_ticket(&db, walk_in("Bruno", "Primeira vez", Priority::Normal), now)
            .await
            .unwrap();

        assert_eq!(old.number, "P-001");
        assert_eq!(fresh.number, "P-001", "daily sequence must reset at local midnight");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn get_round_trips_all_fields() {
        let (db, _dir) = setup_db().await;

        let mut new = walk_in("Ana", "Primeira vez", Priority::Pregnant);
        new.cpf = Some("123.456.789-00".to_string());
        new.observations = Some("needs interpreter".to_string());
        let created = create_ticket(&db, new, Utc::now()).await.unwrap();

        let fetched = get_ticket(&db, &created.id).await.unwrap().unwrap();
        assert_eq!(fetched, created);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn get_nonexistent_returns_none() {
        let (db, _dir) = setup_db().await;
        assert!(get_ticket(&db, "no-such-id").await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn list_orders_by_arrival_and_filters_by_status() {
        let (db, _dir) = setup_db().await;
        let base = Utc::now();

        let t1 = create_ticket(&db, walk_in("Ana", "Primeira vez", Priority::Normal), base)
            .await
            .unwrap();
        let t2 = create_ticket(
            &db,
            walk_in("Bruno", "Inclusão", Priority::Normal),
            base + chrono::Duration::seconds(1),
        )
        .await
        .unwrap();

        // Move t1 out of Waiting.
        update_ticket(
            &db,
            &t1.id,
            TicketPatch {
                status: Some(TicketStatus::Canceled),
                finished_at: Some(base + chrono::Duration::seconds(2)),
                ..TicketPatch::default()
            },
            Some(&[TicketStatus::Waiting]),
        )
        .await
        .unwrap()
        .unwrap();

        let all = list_tickets(&db, TicketFilter::all()).await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, t1.id, "arrival order");

        let waiting = list_tickets(&db, TicketFilter::with_status(TicketStatus::Waiting))
            .await
            .unwrap();
        assert_eq!(waiting.len(), 1);
        assert_eq!(waiting[0].id, t2.id);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn conditional_update_applies_once() {
        let (db, _dir) = setup_db().await;
        let now = Utc::now();

        let ticket = create_ticket(&db, walk_in("Ana", "Primeira vez", Priority::Normal), now)
            .await
            .unwrap();

        let claim = TicketPatch {
            status: Some(TicketStatus::Calling),
            called_at: Some(now),
            attendant_name: Some("Maria".to_string()),
            recall_count: Some(1),
            ..TicketPatch::default()
        };

        // First claim wins.
        let won = update_ticket(&db, &ticket.id, claim.clone(), Some(&[TicketStatus::Waiting]))
            .await
            .unwrap();
        let won = won.expect("first conditional update should apply");
        assert_eq!(won.status, TicketStatus::Calling);
        assert_eq!(won.attendant_name.as_deref(), Some("Maria"));
        assert_eq!(won.recall_count, 1);

        // Second claim against the same precondition loses.
        let lost = update_ticket(&db, &ticket.id, claim, Some(&[TicketStatus::Waiting]))
            .await
            .unwrap();
        assert!(lost.is_none(), "status is no longer Waiting");

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn conditional_update_accepts_any_expected_status() {
        let (db, _dir) = setup_db().await;
        let now = Utc::now();

        let ticket = create_ticket(&db, walk_in("Ana", "Primeira vez", Priority::Normal), now)
            .await
            .unwrap();
        update_ticket(
            &db,
            &ticket.id,
            TicketPatch {
                status: Some(TicketStatus::Calling),
                called_at: Some(now),
                recall_count: Some(1),
                ..TicketPatch::default()
            },
            Some(&[TicketStatus::Waiting]),
        )
        .await
        .unwrap()
        .unwrap();

        // finish accepts Calling or InProgress.
        let finished = update_ticket(
            &db,
            &ticket.id,
            TicketPatch {
                status: Some(TicketStatus::Finished),
                finished_at: Some(now),
                ..TicketPatch::default()
            },
            Some(&[TicketStatus::InProgress, TicketStatus::Calling]),
        )
        .await
        .unwrap();
        assert_eq!(finished.unwrap().status, TicketStatus::Finished);

        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn update_nonexistent_returns_none() {
        let (db, _dir) = setup_db().await;
        let result = update_ticket(
            &db,
            "no-such-id",
            TicketPatch {
                status: Some(TicketStatus::Canceled),
                ..TicketPatch::default()
            },
            None,
        )
        .await
        .unwrap();
        assert!(result.is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn empty_patch_is_rejected() {
        let (db, _dir) = setup_db().await;
        let err = update_ticket(&db, "any", TicketPatch::default(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, FilaError::Internal(_)));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_registrations_get_distinct_numbers() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("concurrent.db");
        let db = std::sync::Arc::new(
            Database::open(db_path.to_str().unwrap(), true).await.unwrap(),
        );

        let mut handles = Vec::new();
        for i in 0..10 {
            let db = db.clone();
            handles.push(tokio::spawn(async move {
                create_ticket(
                    &db,
                    NewTicket {
                        name: format!("Visitor {i}"),
                        cpf: None,
                        service: "Cadastro".to_string(),
                        priority: Priority::Normal,
                        observations: None,
                    },
                    Utc::now(),
                )
                .await
            }));
        }

        let mut numbers = Vec::new();
        for handle in handles {
            numbers.push(handle.await.unwrap().unwrap().number);
        }
        numbers.sort();
        numbers.dedup();
        assert_eq!(numbers.len(), 10, "numbers must be unique: {numbers:?}");

        db.close().await.unwrap();
    }
}
