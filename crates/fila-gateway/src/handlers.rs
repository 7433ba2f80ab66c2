// SPDX-FileCopyrightText: 2026 Fila Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the gateway REST API.
//!
//! Handlers stay thin: deserialize, call the engine, map `FilaError` onto a
//! status code. The UI layer owns user-facing messaging; the body carries
//! the error text verbatim.

use std::str::FromStr;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use fila_core::FilaError;
use fila_core::types::{AgencySettings, NewTicket, ServiceEntry, Ticket, TicketFilter, TicketStatus};
use fila_engine::stats::DateRange;

use crate::server::GatewayState;

/// Request body for POST /v1/tickets/next.
#[derive(Debug, Deserialize)]
pub struct CallNextRequest {
    /// Attendant claiming the call.
    pub attendant_name: String,
    /// Specific ticket to call instead of the queue head.
    #[serde(default)]
    pub ticket_id: Option<String>,
}

/// Response body for POST /v1/tickets/next.
#[derive(Debug, Serialize)]
pub struct CallNextResponse {
    /// The called ticket, or `null` when the waiting list is empty.
    pub ticket: Option<Ticket>,
}

/// Request body for POST /v1/tickets/{id}/takeover.
#[derive(Debug, Deserialize)]
pub struct TakeoverRequest {
    pub attendant_name: String,
}

/// Request body for POST /v1/services.
#[derive(Debug, Deserialize)]
pub struct ServiceRequest {
    pub name: String,
}

/// Query parameters for GET /v1/tickets.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub range: Option<String>,
}

/// Query parameters for GET /v1/stats and /v1/export.
#[derive(Debug, Default, Deserialize)]
pub struct RangeQuery {
    #[serde(default)]
    pub range: Option<String>,
}

/// Response body for GET /health.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// `FilaError` carrier implementing `IntoResponse`, so handlers can use `?`.
pub struct ApiError(FilaError);

impl From<FilaError> for ApiError {
    fn from(err: FilaError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            FilaError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            FilaError::InvalidTransition { .. } => StatusCode::CONFLICT,
            FilaError::NotFound { .. } => StatusCode::NOT_FOUND,
            FilaError::Storage { .. } => StatusCode::SERVICE_UNAVAILABLE,
            FilaError::Config(_) | FilaError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(ErrorResponse {
                error: self.0.to_string(),
            }),
        )
            .into_response()
    }
}

fn parse_range(raw: Option<&str>) -> Result<Option<DateRange>, ApiError> {
    match raw {
        None => Ok(None),
        Some(s) => DateRange::from_str(s)
            .map(Some)
            .map_err(|_| ApiError(FilaError::Validation(format!("unknown range `{s}`")))),
    }
}

fn parse_status(raw: Option<&str>) -> Result<Option<TicketStatus>, ApiError> {
    match raw {
        None => Ok(None),
        Some(s) => TicketStatus::from_str(s)
            .map(Some)
            .map_err(|_| ApiError(FilaError::Validation(format!("unknown status `{s}`")))),
    }
}

/// POST /v1/tickets -- register a visitor.
pub async fn post_ticket(
    State(state): State<GatewayState>,
    Json(new): Json<NewTicket>,
) -> Result<(StatusCode, Json<Ticket>), ApiError> {
    let ticket = state.engine.register(new).await?;
    Ok((StatusCode::CREATED, Json(ticket)))
}

/// GET /v1/tickets -- list tickets, optionally filtered by status and range.
pub async fn get_tickets(
    State(state): State<GatewayState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Vec<Ticket>>, ApiError> {
    let filter = TicketFilter {
        status: parse_status(query.status.as_deref())?,
        created_since: parse_range(query.range.as_deref())?.map(|r| r.start(chrono::Utc::now())),
    };
    Ok(Json(state.engine.tickets(filter).await?))
}

/// POST /v1/tickets/next -- call the next visitor (or a specific ticket).
pub async fn post_call_next(
    State(state): State<GatewayState>,
    Json(req): Json<CallNextRequest>,
) -> Result<Json<CallNextResponse>, ApiError> {
    let ticket = state
        .engine
        .call_next(&req.attendant_name, req.ticket_id.as_deref())
        .await?;
    Ok(Json(CallNextResponse { ticket }))
}

/// POST /v1/tickets/{id}/start
pub async fn post_start(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<Ticket>, ApiError> {
    Ok(Json(state.engine.start_service(&id).await?))
}

/// POST /v1/tickets/{id}/finish
pub async fn post_finish(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<Ticket>, ApiError> {
    Ok(Json(state.engine.finish(&id).await?))
}

/// POST /v1/tickets/{id}/recall
pub async fn post_recall(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<Ticket>, ApiError> {
    Ok(Json(state.engine.recall(&id).await?))
}

/// POST /v1/tickets/{id}/no-show
pub async fn post_no_show(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<Ticket>, ApiError> {
    Ok(Json(state.engine.mark_no_show(&id).await?))
}

/// POST /v1/tickets/{id}/cancel
pub async fn post_cancel(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
) -> Result<Json<Ticket>, ApiError> {
    Ok(Json(state.engine.cancel(&id).await?))
}

/// POST /v1/tickets/{id}/takeover
pub async fn post_takeover(
    State(state): State<GatewayState>,
    Path(id): Path<String>,
    Json(req): Json<TakeoverRequest>,
) -> Result<Json<Ticket>, ApiError> {
    Ok(Json(state.engine.takeover(&id, &req.attendant_name).await?))
}

/// GET /v1/display -- what the public panel renders.
pub async fn get_display(
    State(state): State<GatewayState>,
) -> Result<Json<fila_engine::DisplayFeed>, ApiError> {
    Ok(Json(state.engine.display_feed(state.call_history).await?))
}

/// GET /v1/stats -- statistics report, default range `today`.
pub async fn get_stats(
    State(state): State<GatewayState>,
    Query(query): Query<RangeQuery>,
) -> Result<Json<fila_engine::StatsReport>, ApiError> {
    let range = parse_range(query.range.as_deref())?.unwrap_or(DateRange::Today);
    Ok(Json(state.engine.stats(range).await?))
}

/// GET /v1/export -- CSV report; no range exports the full ticket set.
pub async fn get_export(
    State(state): State<GatewayState>,
    Query(query): Query<RangeQuery>,
) -> Result<Response, ApiError> {
    let range = parse_range(query.range.as_deref())?;
    let csv = state.engine.export_csv(range).await?;
    Ok((
        [(header::CONTENT_TYPE, "text/csv; charset=utf-8")],
        csv,
    )
        .into_response())
}

/// GET /v1/settings -- stored settings, falling back to the config default.
pub async fn get_settings(
    State(state): State<GatewayState>,
) -> Result<Json<AgencySettings>, ApiError> {
    let settings = state.engine.settings().await?.unwrap_or(AgencySettings {
        agency_name: state.default_agency_name.clone(),
    });
    Ok(Json(settings))
}

/// PUT /v1/settings
pub async fn put_settings(
    State(state): State<GatewayState>,
    Json(settings): Json<AgencySettings>,
) -> Result<Json<AgencySettings>, ApiError> {
    Ok(Json(state.engine.update_settings(settings).await?))
}

/// GET /v1/services
pub async fn get_services(
    State(state): State<GatewayState>,
) -> Result<Json<Vec<ServiceEntry>>, ApiError> {
    Ok(Json(state.engine.services().await?))
}

/// POST /v1/services
pub async fn post_service(
    State(state): State<GatewayState>,
    Json(req): Json<ServiceRequest>,
) -> Result<(StatusCode, Json<ServiceEntry>), ApiError> {
    let entry = state.engine.add_service(&req.name).await?;
    Ok((StatusCode::CREATED, Json(entry)))
}

/// DELETE /v1/services/{id}
pub async fn delete_service(
    State(state): State<GatewayState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.engine.remove_service(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /health -- unauthenticated liveness for systemd and the status command.
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}
