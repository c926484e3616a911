//! Response types for the overtime engine API.
//!
//! This module defines the error body, the mapping from [`EngineError`] to
//! HTTP status codes, and the summary types returned by lookup endpoints.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::EngineError;
use crate::models::{HourThresholds, Policy, PremiumRule, SafetyLimits, StackingStrategy};

/// API error response structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    /// Error code for programmatic handling.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional details about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    /// Creates a new API error with details.
    pub fn with_details(
        code: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: Some(details.into()),
        }
    }

    /// Creates a malformed JSON error response.
    pub fn malformed_json(message: impl Into<String>) -> Self {
        Self::new("MALFORMED_JSON", message)
    }
}

/// API error with HTTP status code.
#[derive(Debug)]
pub struct ApiErrorResponse {
    /// The HTTP status code.
    pub status: StatusCode,
    /// The error body.
    pub error: ApiError,
}

impl ApiErrorResponse {
    fn new(status: StatusCode, error: ApiError) -> Self {
        Self { status, error }
    }

    /// A 400 response for an unreadable body or query string.
    pub fn bad_request(error: ApiError) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error)
    }
}

impl IntoResponse for ApiErrorResponse {
    fn into_response(self) -> Response {
        (self.status, Json(self.error)).into_response()
    }
}

fn trace_details(steps: usize) -> String {
    format!("{} explanation steps recorded before the failure", steps)
}

impl From<EngineError> for ApiErrorResponse {
    fn from(error: EngineError) -> Self {
        let message = error.to_string();
        match error {
            EngineError::PolicyNotFound { .. } => {
                Self::new(StatusCode::NOT_FOUND, ApiError::new("POLICY_NOT_FOUND", message))
            }
            EngineError::ShiftNotFound { .. } => {
                Self::new(StatusCode::NOT_FOUND, ApiError::new("SHIFT_NOT_FOUND", message))
            }
            EngineError::LineNotFound { .. } => {
                Self::new(StatusCode::NOT_FOUND, ApiError::new("LINE_NOT_FOUND", message))
            }
            EngineError::BudgetNotFound { .. } => {
                Self::new(StatusCode::NOT_FOUND, ApiError::new("BUDGET_NOT_FOUND", message))
            }
            EngineError::InvalidPolicy { .. } => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                ApiError::new("INVALID_POLICY", message),
            ),
            EngineError::BudgetCapacityExceeded { .. } => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                ApiError::with_details(
                    "BUDGET_CAPACITY_EXCEEDED",
                    message,
                    "The budget's hard cap blocks this request",
                ),
            ),
            EngineError::BudgetApprovalRequired { .. } => Self::new(
                StatusCode::CONFLICT,
                ApiError::with_details(
                    "BUDGET_APPROVAL_REQUIRED",
                    message,
                    "Resubmit with elevated sign-off to charge beyond the soft cap",
                ),
            ),
            EngineError::RestBreach { .. } => {
                Self::new(StatusCode::CONFLICT, ApiError::new("REST_BREACH", message))
            }
            EngineError::CriticalFatigue { .. } => {
                Self::new(StatusCode::CONFLICT, ApiError::new("CRITICAL_FATIGUE", message))
            }
            EngineError::LineLocked { .. } => Self::new(
                StatusCode::CONFLICT,
                ApiError::with_details(
                    "LINE_LOCKED",
                    message,
                    "Locked lines can only be corrected by a superseding line",
                ),
            ),
            EngineError::InvalidInput { .. } => {
                Self::new(StatusCode::BAD_REQUEST, ApiError::new("VALIDATION_ERROR", message))
            }
            EngineError::LineAlreadyCharged { .. } => Self::new(
                StatusCode::CONFLICT,
                ApiError::new("LINE_ALREADY_CHARGED", message),
            ),
            EngineError::InvalidTimeRange { .. } => Self::new(
                StatusCode::BAD_REQUEST,
                ApiError::new("INVALID_TIME_RANGE", message),
            ),
            EngineError::TimeBlockTampered {
                ref partial_trace, ..
            } => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                ApiError::with_details(
                    "TIME_BLOCK_TAMPERED",
                    message,
                    trace_details(partial_trace.len()),
                ),
            ),
            EngineError::ConfigNotFound { .. } | EngineError::ConfigParseError { .. } => Self::new(
                StatusCode::INTERNAL_SERVER_ERROR,
                ApiError::with_details("CONFIG_ERROR", "Configuration error", message),
            ),
            EngineError::CalculationError {
                ref partial_trace, ..
            } => Self::new(
                StatusCode::UNPROCESSABLE_ENTITY,
                ApiError::with_details(
                    "CALCULATION_ERROR",
                    message,
                    trace_details(partial_trace.len()),
                ),
            ),
        }
    }
}

/// Policy summary returned by `GET /policies/resolve`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicySummary {
    /// Policy version id.
    pub id: Uuid,
    /// Policy name.
    pub name: String,
    /// Version number.
    pub version: u32,
    /// Country code.
    pub country: String,
    /// Sector scope.
    pub sector: Option<String>,
    /// State scope.
    pub state_province: Option<String>,
    /// First effective day.
    pub effective_from: NaiveDate,
    /// Last effective day.
    pub effective_to: Option<NaiveDate>,
    /// Currency.
    pub currency: String,
    /// Stacking strategy.
    pub stacking: StackingStrategy,
    /// Hour thresholds.
    pub thresholds: HourThresholds,
    /// Premium ladder.
    pub premiums: Vec<PremiumRule>,
    /// Safety limits.
    pub safety: SafetyLimits,
}

impl From<Policy> for PolicySummary {
    fn from(policy: Policy) -> Self {
        Self {
            id: policy.id,
            name: policy.name,
            version: policy.version,
            country: policy.country,
            sector: policy.sector,
            state_province: policy.state_province,
            effective_from: policy.effective_from,
            effective_to: policy.effective_to,
            currency: policy.currency,
            stacking: policy.stacking,
            thresholds: policy.thresholds,
            premiums: policy.premiums,
            safety: policy.safety,
        }
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `ok`.
    pub status: String,
    /// Crate version.
    pub version: String,
}
