//! Error types for the HTTP surface and process startup.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chime_scheduler::{SchedulerError, TriggerError};
use serde_json::json;
use std::fmt;

/// Errors returned by request handlers.
///
/// Every variant renders as `{"detail": "<message>"}`.
#[derive(Debug)]
pub enum ApiError {
    /// Request rejected before any write.
    Validation { details: String },
    /// Lookup found nothing.
    NotFound { details: String },
    /// The store failed or was unreachable.
    Storage { details: String },
    /// The trigger was saved but its timer was not armed.
    Scheduling { details: String },
    /// The health check round trip failed.
    Unhealthy { details: String },
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Validation { details }
            | Self::NotFound { details }
            | Self::Storage { details }
            | Self::Scheduling { details } => f.write_str(details),
            Self::Unhealthy { details } => {
                write!(f, "Database connection failed: {details}")
            }
        }
    }
}

impl std::error::Error for ApiError {}

impl From<TriggerError> for ApiError {
    fn from(err: TriggerError) -> Self {
        let details = err.to_string();
        match err {
            TriggerError::Validation { .. } => Self::Validation { details },
            TriggerError::NotFound { .. } => Self::NotFound { details },
            TriggerError::AlreadyExists { .. } | TriggerError::StorageFailed { .. } => {
                Self::Storage { details }
            }
        }
    }
}

impl From<SchedulerError> for ApiError {
    fn from(err: SchedulerError) -> Self {
        match err {
            SchedulerError::Trigger(err) => err.into(),
            not_scheduled @ SchedulerError::NotScheduled { .. } => Self::Scheduling {
                details: not_scheduled.to_string(),
            },
        }
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Validation { .. } => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } => StatusCode::NOT_FOUND,
            Self::Storage { .. } | Self::Scheduling { .. } | Self::Unhealthy { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }

        (status, Json(json!({ "detail": self.to_string() }))).into_response()
    }
}

/// Failures that stop the server from starting.
#[derive(Debug)]
pub enum StartupError {
    /// Configuration could not be loaded.
    Config { details: String },
    /// The database could not be reached.
    Database { details: String },
    /// Schema migrations failed.
    Migration { details: String },
    /// Startup reconciliation of scheduled triggers failed.
    Reconcile { details: String },
    /// The listener could not be bound or the server stopped with an error.
    Serve { details: String },
}

impl fmt::Display for StartupError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config { details } => write!(f, "failed to load configuration: {details}"),
            Self::Database { details } => write!(f, "failed to connect to database: {details}"),
            Self::Migration { details } => write!(f, "failed to run migrations: {details}"),
            Self::Reconcile { details } => {
                write!(f, "failed to reconcile scheduled triggers: {details}")
            }
            Self::Serve { details } => write!(f, "server error: {details}"),
        }
    }
}

impl std::error::Error for StartupError {}
