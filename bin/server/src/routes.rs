//! Request handlers for triggers, logs and health.

use crate::app::AppState;
use crate::error::ApiError;
use axum::Json;
use axum::extract::State;
use chime_core::{EventLogId, TriggerId};
use chime_scheduler::{EventLog, HealthStatus, NewTrigger, Trigger};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use std::sync::Arc;

/// Body for `POST /triggers/api/`.
///
/// The payload must be a JSON object; `null` and scalars are rejected.
#[derive(Debug, Deserialize)]
pub struct ApiTriggerRequest {
    name: String,
    payload: Map<String, JsonValue>,
}

/// Response for `POST /triggers/`.
#[derive(Debug, Serialize)]
pub struct CreateTriggerResponse {
    id: TriggerId,
    message: &'static str,
}

/// Response for `POST /triggers/api/`.
#[derive(Debug, Serialize)]
pub struct ApiTriggerResponse {
    message: &'static str,
    trigger_id: TriggerId,
    event_id: EventLogId,
}

/// Response for `GET /triggers/`.
#[derive(Debug, Serialize)]
pub struct TriggerList {
    triggers: Vec<Trigger>,
}

/// Response for `GET /logs/`.
#[derive(Debug, Serialize)]
pub struct LogList {
    logs: Vec<EventLog>,
}

/// Creates a trigger, arming its timer when it is scheduled.
pub async fn create_trigger(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewTrigger>,
) -> Result<Json<CreateTriggerResponse>, ApiError> {
    let trigger = state.service.create_trigger(body).await?;

    Ok(Json(CreateTriggerResponse {
        id: trigger.id,
        message: "Trigger created successfully",
    }))
}

/// Creates an API trigger and records its event immediately.
pub async fn create_api_trigger(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ApiTriggerRequest>,
) -> Result<Json<ApiTriggerResponse>, ApiError> {
    let (trigger, log) = state
        .service
        .create_api_trigger(body.name, Some(JsonValue::Object(body.payload)))
        .await?;

    Ok(Json(ApiTriggerResponse {
        message: "API trigger executed",
        trigger_id: trigger.id,
        event_id: log.id,
    }))
}

/// Lists all triggers.
pub async fn list_triggers(
    State(state): State<Arc<AppState>>,
) -> Result<Json<TriggerList>, ApiError> {
    let triggers = state.service.list_triggers().await?;
    Ok(Json(TriggerList { triggers }))
}

/// Lists all event logs.
pub async fn list_logs(State(state): State<Arc<AppState>>) -> Result<Json<LogList>, ApiError> {
    let logs = state.service.list_logs().await?;
    Ok(Json(LogList { logs }))
}

/// Reports whether the database answers.
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthStatus>, ApiError> {
    let status = state
        .service
        .health_check()
        .await
        .map_err(|e| ApiError::Unhealthy {
            details: e.to_string(),
        })?;
    Ok(Json(status))
}
