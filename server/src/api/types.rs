//! Shared API types
//!
//! Error responses and request parameters common to the statistics endpoints.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::domain::statistics::{StatsError, TrendOptions};
use crate::utils::time::parse_day_path;

/// Parse the `{day}` path segment (`YYYYMMDD`)
pub fn parse_day_param(day: &str) -> Result<NaiveDate, ApiError> {
    parse_day_path(day).ok_or_else(|| {
        ApiError::bad_request(
            "INVALID_DATE",
            format!("Invalid day: {}. Use YYYYMMDD.", day),
        )
    })
}

/// Optional trend parameters accepted by the data endpoints
#[derive(Debug, Default, Deserialize)]
pub struct TrendQuery {
    /// Allow-listed attribute to aggregate
    pub attribute: Option<String>,
    /// Minute bucket size (0 = hourly, at most 60)
    pub minutes: Option<u32>,
}

impl TrendQuery {
    /// Trend options, falling back to `default_minutes` when unset
    pub fn options(&self, default_minutes: u32) -> TrendOptions {
        TrendOptions {
            target_attribute: self.attribute.clone(),
            minute_bucket_size: self.minutes.unwrap_or(default_minutes),
        }
    }
}

/// Standard API error response
#[derive(Debug)]
pub enum ApiError {
    BadRequest { code: String, message: String },
    NotFound { code: String, message: String },
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn not_found(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::NotFound {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<StatsError> for ApiError {
    fn from(e: StatsError) -> Self {
        if e.is_client_error() {
            tracing::debug!(error = %e, "Rejected statistics request");
            return Self::bad_request("INVALID_REQUEST", e.to_string());
        }
        tracing::error!(error = %e, "Statistics error");
        match e {
            StatsError::QueryExecutionFailure(_) => Self::internal("Database operation failed"),
            _ => Self::internal("Recorder returned data in an unexpected layout"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_type, code, message) = match self {
            Self::BadRequest { code, message } => {
                (StatusCode::BAD_REQUEST, "bad_request", code, message)
            }
            Self::NotFound { code, message } => (StatusCode::NOT_FOUND, "not_found", code, message),
            Self::Internal { message } => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "INTERNAL".to_string(),
                message,
            ),
        };
        (
            status,
            Json(serde_json::json!({
                "error": error_type,
                "code": code,
                "message": message
            })),
        )
            .into_response()
    }
}
