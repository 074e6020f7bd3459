/*!
 * Booking & Scheduling HTTP Handlers
 *
 * Thin Axum handlers over the Booking Coordinator and Query Facade. No
 * handler talks to the Repository or database directly — every call goes
 * through `AppState.coordinator` or `AppState.facade`, and every error is
 * an `EngineError` mapped to a response by its own `IntoResponse` impl.
 */

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::engine::{BarberOption, Slot};
use crate::handlers::AppState;
use crate::models::{
    BookRequest, BookingResult, CancelRequest, ChangePriorityRequest, MoveQueuePositionRequest,
    TransitionStatusRequest,
};
use crate::utils::{EngineError, Result};

/// POST /book
pub async fn book(
    State(state): State<AppState>,
    Json(req): Json<BookRequest>,
) -> Result<impl IntoResponse> {
    req.validate()
        .map_err(|e| EngineError::InvalidRequest(e.to_string()))?;

    let result: BookingResult = state.coordinator.book(req).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

#[derive(Debug, Deserialize)]
pub struct SlotsQuery {
    pub barber_id: Uuid,
    pub date: NaiveDate,
    #[serde(default)]
    pub service_ids: Vec<Uuid>,
    #[serde(default)]
    pub addon_ids: Vec<Uuid>,
}

/// GET /slots
pub async fn get_slots(
    State(state): State<AppState>,
    Query(query): Query<SlotsQuery>,
) -> Result<impl IntoResponse> {
    if query.service_ids.is_empty() {
        return Err(EngineError::InvalidRequest(
            "at least one service_id is required".to_string(),
        ));
    }
    let slots: Vec<Slot> = state
        .facade
        .unified_slots(query.barber_id, query.date, &query.service_ids, &query.addon_ids)
        .await?;
    Ok((StatusCode::OK, Json(slots)))
}

#[derive(Debug, Deserialize)]
pub struct AlternativesQuery {
    pub date: NaiveDate,
    #[serde(default)]
    pub service_ids: Vec<Uuid>,
    #[serde(default)]
    pub addon_ids: Vec<Uuid>,
    pub exclude_barber_id: Option<Uuid>,
}

/// GET /alternatives
pub async fn get_alternatives(
    State(state): State<AppState>,
    Query(query): Query<AlternativesQuery>,
) -> Result<impl IntoResponse> {
    if query.service_ids.is_empty() {
        return Err(EngineError::InvalidRequest(
            "at least one service_id is required".to_string(),
        ));
    }
    let options: Vec<BarberOption> = state
        .facade
        .find_alternatives(query.date, &query.service_ids, &query.addon_ids, query.exclude_barber_id)
        .await?;
    Ok((StatusCode::OK, Json(options)))
}

/// GET /appointments/{id}
pub async fn get_appointment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let appointment = state.facade.get_appointment(id).await?;
    Ok((StatusCode::OK, Json(appointment)))
}

/// POST /cancel/{id}
pub async fn cancel(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CancelRequest>,
) -> Result<impl IntoResponse> {
    req.validate()
        .map_err(|e| EngineError::InvalidRequest(e.to_string()))?;
    state.coordinator.cancel(id, req.expected_version).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /status/{id}
pub async fn transition_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<TransitionStatusRequest>,
) -> Result<impl IntoResponse> {
    req.validate()
        .map_err(|e| EngineError::InvalidRequest(e.to_string()))?;
    state
        .coordinator
        .transition_status(id, req.new_status, req.expected_version)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /priority/{id}
pub async fn change_priority(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<ChangePriorityRequest>,
) -> Result<impl IntoResponse> {
    req.validate()
        .map_err(|e| EngineError::InvalidRequest(e.to_string()))?;
    state
        .coordinator
        .change_priority(id, req.new_priority, req.expected_version)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /queue/{id}/move
pub async fn move_queue_position(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<MoveQueuePositionRequest>,
) -> Result<impl IntoResponse> {
    req.validate()
        .map_err(|e| EngineError::InvalidRequest(e.to_string()))?;
    state
        .coordinator
        .move_queue_position(id, req.new_position, req.expected_version)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /queue/{id}/promote
pub async fn promote_queue_to_scheduled(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<CancelRequest>,
) -> Result<impl IntoResponse> {
    state
        .coordinator
        .promote_queue_to_scheduled(id, req.expected_version)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub uptime_seconds: u64,
    pub database: &'static str,
}

/// GET /health
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = state.start_time.elapsed().unwrap_or_default().as_secs();
    let db_ok = sqlx::query("SELECT 1").execute(&state.pool).await.is_ok();

    let response = HealthResponse {
        status: if db_ok { "healthy" } else { "unhealthy" },
        version: env!("CARGO_PKG_VERSION"),
        uptime_seconds: uptime,
        database: if db_ok { "connected" } else { "disconnected" },
    };

    let status_code = if db_ok {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(response))
}
