// SPDX-FileCopyrightText: 2026 Fila Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Server-Sent Events stream of ticket change events.
//!
//! Every client (reception, attendant stations, the TV panel, the dashboard)
//! holds one `GET /v1/events` stream open and applies `inserted`/`updated`
//! events to its local view, so nobody polls. A subscriber that falls behind
//! the broadcast buffer receives a `lagged` event and should re-fetch the
//! ticket list before resuming.
//!
//! SSE event format:
//! ```text
//! event: inserted | updated
//! data: {"kind": "...", "ticket": {...}}
//!
//! event: lagged
//! data: {"skipped": 12}
//! ```

use std::convert::Infallible;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream};
use tokio::sync::broadcast;

use fila_core::types::TicketEventKind;

use crate::server::GatewayState;

/// GET /v1/events -- the change-event stream.
pub async fn events(
    State(state): State<GatewayState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.engine.subscribe();

    let stream = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let name = match event.kind {
                        TicketEventKind::Inserted => "inserted",
                        TicketEventKind::Updated => "updated",
                    };
                    let data =
                        serde_json::to_string(&event).unwrap_or_else(|_| "{}".to_string());
                    return Some((Ok(Event::default().event(name).data(data)), rx));
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "event subscriber lagged, skipping to live edge");
                    let data = format!(r#"{{"skipped": {skipped}}}"#);
                    return Some((Ok(Event::default().event("lagged").data(data)), rx));
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}
