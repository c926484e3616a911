//! HTTP request handlers for the overtime engine API.
//!
//! This module contains the handler functions for all API endpoints. Every
//! request gets a correlation id that is attached to its log lines.

use std::time::Instant;

use axum::{
    Json, Router,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::EngineResult;
use crate::service::CalculationRequest;

use super::request::{
    ApproveLineRequest, BudgetCapacityRequest, CalculateOvertimeRequest, CreateBudgetRequest,
    FatigueQuery, FitnessRequest, ForecastQuery, PayrollExportRequest, PolicyResolveQuery,
    RejectLineRequest, RestComplianceRequest, SeedPoliciesRequest, ShiftRequest,
    TimeBlockRequest,
};
use super::response::{ApiError, ApiErrorResponse, HealthResponse, PolicySummary};
use super::state::AppState;

const API_ACTOR: &str = "api";

type JsonBody<T> = Result<Json<T>, JsonRejection>;

/// Creates the API router with all endpoints.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/shifts", post(create_shift_handler))
        .route("/shifts/:shift_id", get(get_shift_handler))
        .route("/shifts/:shift_id/time-blocks", post(append_time_block_handler))
        .route("/shifts/:shift_id/lines", get(shift_lines_handler))
        .route("/overtime/calculate", post(calculate_handler))
        .route("/overtime/preview", post(preview_handler))
        .route("/lines/:line_id/approve", post(approve_line_handler))
        .route("/lines/:line_id/reject", post(reject_line_handler))
        .route("/fatigue/rest-compliance", post(rest_compliance_handler))
        .route("/fatigue/fitness", post(fitness_handler))
        .route("/fatigue/:employee_id", get(fatigue_handler))
        .route("/budgets", post(create_budget_handler))
        .route("/budgets/capacity", post(budget_capacity_handler))
        .route("/budgets/:budget_id", get(get_budget_handler))
        .route("/budgets/:budget_id/forecast", get(budget_forecast_handler))
        .route("/policies/resolve", get(resolve_policy_handler))
        .route("/policies/seed", post(seed_policies_handler))
        .route("/payroll/export", post(payroll_export_handler))
        .with_state(state)
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Maps a body rejection to a 400 the way clients expect.
fn json_rejection(correlation_id: Uuid, rejection: JsonRejection) -> ApiErrorResponse {
    let error = match rejection {
        JsonRejection::JsonDataError(err) => {
            let body_text = err.body_text();
            warn!(correlation_id = %correlation_id, error = %body_text, "JSON data error");
            if body_text.contains("missing field") {
                ApiError::new("VALIDATION_ERROR", body_text)
            } else {
                ApiError::malformed_json(body_text)
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            warn!(correlation_id = %correlation_id, error = %err, "JSON syntax error");
            ApiError::malformed_json(format!("Invalid JSON syntax: {}", err))
        }
        JsonRejection::MissingJsonContentType(_) => {
            ApiError::new("MISSING_CONTENT_TYPE", "Content-Type must be application/json")
        }
        _ => ApiError::malformed_json("Failed to parse request body"),
    };
    ApiErrorResponse::bad_request(error)
}

fn query_rejection(correlation_id: Uuid, rejection: QueryRejection) -> ApiErrorResponse {
    let body_text = rejection.body_text();
    warn!(correlation_id = %correlation_id, error = %body_text, "Query string error");
    ApiErrorResponse::bad_request(ApiError::new("VALIDATION_ERROR", body_text))
}

fn path_rejection(correlation_id: Uuid, rejection: PathRejection) -> ApiErrorResponse {
    let body_text = rejection.body_text();
    warn!(correlation_id = %correlation_id, error = %body_text, "Path parameter error");
    ApiErrorResponse::bad_request(ApiError::new("VALIDATION_ERROR", body_text))
}

/// Logs and renders the outcome of one service call.
fn respond<T: Serialize>(
    correlation_id: Uuid,
    operation: &'static str,
    status: StatusCode,
    started: Instant,
    result: EngineResult<T>,
) -> Response {
    match result {
        Ok(body) => {
            info!(
                correlation_id = %correlation_id,
                operation,
                duration_us = started.elapsed().as_micros(),
                "Request completed"
            );
            (status, Json(body)).into_response()
        }
        Err(err) => {
            warn!(
                correlation_id = %correlation_id,
                operation,
                error = %err,
                "Request failed"
            );
            ApiErrorResponse::from(err).into_response()
        }
    }
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

async fn create_shift_handler(
    State(state): State<AppState>,
    payload: JsonBody<ShiftRequest>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let started = Instant::now();
    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return json_rejection(correlation_id, rejection).into_response(),
    };
    info!(correlation_id = %correlation_id, shift_id = %request.id, "Recording shift");

    let shift = request.into_shift(API_ACTOR);
    let result = state.service().record_shift(shift.clone()).map(|()| shift);
    respond(correlation_id, "record_shift", StatusCode::CREATED, started, result)
}

async fn get_shift_handler(
    State(state): State<AppState>,
    Path(shift_id): Path<String>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let started = Instant::now();
    let result = state.service().get_shift(&shift_id);
    respond(correlation_id, "get_shift", StatusCode::OK, started, result)
}

async fn append_time_block_handler(
    State(state): State<AppState>,
    Path(shift_id): Path<String>,
    payload: JsonBody<TimeBlockRequest>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let started = Instant::now();
    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return json_rejection(correlation_id, rejection).into_response(),
    };

    let result = state.service().append_time_block(
        &shift_id,
        request.start,
        request.end,
        request.work_type,
        request.corrects,
    );
    respond(correlation_id, "append_time_block", StatusCode::CREATED, started, result)
}

async fn shift_lines_handler(
    State(state): State<AppState>,
    Path(shift_id): Path<String>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let started = Instant::now();
    let result = state.service().lines_for_shift(&shift_id);
    respond(correlation_id, "lines_for_shift", StatusCode::OK, started, result)
}

async fn calculate_handler(
    State(state): State<AppState>,
    payload: JsonBody<CalculateOvertimeRequest>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let started = Instant::now();
    let request: CalculationRequest = match payload {
        Ok(Json(req)) => req.into(),
        Err(rejection) => return json_rejection(correlation_id, rejection).into_response(),
    };
    info!(
        correlation_id = %correlation_id,
        shift_id = %request.shift_id,
        country = %request.jurisdiction.country,
        "Processing calculation request"
    );

    let result = state.service().calculate_overtime(&request);
    if let Ok(outcome) = &result {
        info!(
            correlation_id = %correlation_id,
            lines = outcome.lines.len(),
            total_amount = %outcome.total_amount,
            "Overtime calculated"
        );
    }
    respond(correlation_id, "calculate_overtime", StatusCode::OK, started, result)
}

async fn preview_handler(
    State(state): State<AppState>,
    payload: JsonBody<CalculateOvertimeRequest>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let started = Instant::now();
    let request: CalculationRequest = match payload {
        Ok(Json(req)) => req.into(),
        Err(rejection) => return json_rejection(correlation_id, rejection).into_response(),
    };

    let result = state.service().preview_overtime(&request);
    respond(correlation_id, "preview_overtime", StatusCode::OK, started, result)
}

async fn approve_line_handler(
    State(state): State<AppState>,
    line_id: Result<Path<Uuid>, PathRejection>,
    payload: JsonBody<ApproveLineRequest>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let started = Instant::now();
    let line_id = match line_id {
        Ok(Path(id)) => id,
        Err(rejection) => return path_rejection(correlation_id, rejection).into_response(),
    };
    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return json_rejection(correlation_id, rejection).into_response(),
    };
    info!(
        correlation_id = %correlation_id,
        line_id = %line_id,
        actor = %request.actor,
        "Approving overtime line"
    );

    let result = state
        .service()
        .approve_line(line_id, &request.actor, request.override_soft_cap);
    respond(correlation_id, "approve_line", StatusCode::OK, started, result)
}

async fn reject_line_handler(
    State(state): State<AppState>,
    line_id: Result<Path<Uuid>, PathRejection>,
    payload: JsonBody<RejectLineRequest>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let started = Instant::now();
    let line_id = match line_id {
        Ok(Path(id)) => id,
        Err(rejection) => return path_rejection(correlation_id, rejection).into_response(),
    };
    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return json_rejection(correlation_id, rejection).into_response(),
    };

    let result = state
        .service()
        .reject_line(line_id, &request.actor, &request.reason);
    respond(correlation_id, "reject_line", StatusCode::OK, started, result)
}

async fn fatigue_handler(
    State(state): State<AppState>,
    Path(employee_id): Path<String>,
    query: Result<Query<FatigueQuery>, QueryRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let started = Instant::now();
    let query = match query {
        Ok(Query(q)) => q,
        Err(rejection) => return query_rejection(correlation_id, rejection).into_response(),
    };

    let as_of = query.as_of.unwrap_or_else(today);
    let result = state.service().check_fatigue(&employee_id, as_of);
    respond(correlation_id, "check_fatigue", StatusCode::OK, started, result)
}

async fn rest_compliance_handler(
    State(state): State<AppState>,
    payload: JsonBody<RestComplianceRequest>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let started = Instant::now();
    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return json_rejection(correlation_id, rejection).into_response(),
    };

    let result = state.service().check_rest_compliance(
        &request.employee_id,
        request.proposed_start,
        &request.jurisdiction.into(),
    );
    respond(correlation_id, "check_rest_compliance", StatusCode::OK, started, result)
}

async fn fitness_handler(
    State(state): State<AppState>,
    payload: JsonBody<FitnessRequest>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let started = Instant::now();
    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return json_rejection(correlation_id, rejection).into_response(),
    };

    let result = state.service().check_fitness(
        &request.employee_id,
        request.proposed_start,
        request.duration_hours,
        &request.jurisdiction.into(),
    );
    respond(correlation_id, "check_fitness", StatusCode::OK, started, result)
}

async fn create_budget_handler(
    State(state): State<AppState>,
    payload: JsonBody<CreateBudgetRequest>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let started = Instant::now();
    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return json_rejection(correlation_id, rejection).into_response(),
    };

    let budget = request.into_budget(&state.settings().default_currency, API_ACTOR);
    let result = state.service().create_budget(budget);
    respond(correlation_id, "create_budget", StatusCode::CREATED, started, result)
}

async fn get_budget_handler(
    State(state): State<AppState>,
    budget_id: Result<Path<Uuid>, PathRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let started = Instant::now();
    let budget_id = match budget_id {
        Ok(Path(id)) => id,
        Err(rejection) => return path_rejection(correlation_id, rejection).into_response(),
    };

    let result = state.service().get_budget(budget_id);
    respond(correlation_id, "get_budget", StatusCode::OK, started, result)
}

async fn budget_capacity_handler(
    State(state): State<AppState>,
    payload: JsonBody<BudgetCapacityRequest>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let started = Instant::now();
    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return json_rejection(correlation_id, rejection).into_response(),
    };

    let result = state.service().check_budget_capacity(
        &request.cost_center,
        request.project.as_deref(),
        request.hours,
        request.amount,
        request.date.unwrap_or_else(today),
    );
    respond(correlation_id, "check_budget_capacity", StatusCode::OK, started, result)
}

async fn budget_forecast_handler(
    State(state): State<AppState>,
    budget_id: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<ForecastQuery>, QueryRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let started = Instant::now();
    let budget_id = match budget_id {
        Ok(Path(id)) => id,
        Err(rejection) => return path_rejection(correlation_id, rejection).into_response(),
    };
    let query = match query {
        Ok(Query(q)) => q,
        Err(rejection) => return query_rejection(correlation_id, rejection).into_response(),
    };

    let result = state
        .service()
        .budget_forecast(budget_id, query.today.unwrap_or_else(today));
    respond(correlation_id, "budget_forecast", StatusCode::OK, started, result)
}

async fn resolve_policy_handler(
    State(state): State<AppState>,
    query: Result<Query<PolicyResolveQuery>, QueryRejection>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let started = Instant::now();
    let query = match query {
        Ok(Query(q)) => q.into_query(today()),
        Err(rejection) => return query_rejection(correlation_id, rejection).into_response(),
    };

    let result = state
        .service()
        .resolve_policy(&query)
        .map(PolicySummary::from);
    respond(correlation_id, "resolve_policy", StatusCode::OK, started, result)
}

async fn seed_policies_handler(
    State(state): State<AppState>,
    payload: JsonBody<SeedPoliciesRequest>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let started = Instant::now();
    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return json_rejection(correlation_id, rejection).into_response(),
    };
    info!(
        correlation_id = %correlation_id,
        organization_id = %request.organization_id,
        "Seeding default policies"
    );

    let result = state
        .service()
        .seed_default_policies(&request.organization_id, request.effective_from)
        .map(|policies| {
            policies
                .into_iter()
                .map(PolicySummary::from)
                .collect::<Vec<_>>()
        });
    respond(correlation_id, "seed_default_policies", StatusCode::CREATED, started, result)
}

async fn payroll_export_handler(
    State(state): State<AppState>,
    payload: JsonBody<PayrollExportRequest>,
) -> Response {
    let correlation_id = Uuid::new_v4();
    let started = Instant::now();
    let request = match payload {
        Ok(Json(req)) => req,
        Err(rejection) => return json_rejection(correlation_id, rejection).into_response(),
    };
    info!(
        correlation_id = %correlation_id,
        batch_id = %request.batch_id,
        "Exporting overtime lines to payroll"
    );

    let result = state.service().export_to_payroll(
        &request.batch_id,
        request.period_start,
        request.period_end,
        &request.cost_centers,
    );
    respond(correlation_id, "export_to_payroll", StatusCode::OK, started, result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::observability::noop;
    use crate::repository::InMemoryStore;
    use crate::service::OvertimeService;
    use axum::body::Body;
    use axum::http::Request;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn create_test_state() -> AppState {
        let service = OvertimeService::new(Arc::new(InMemoryStore::new()), noop());
        service.seed_default_policies("default", None).unwrap();
        AppState::new(service, Settings::default())
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("Content-Type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn read_error(response: Response) -> ApiError {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let router = create_router(create_test_state());
        let response = router
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_malformed_json_returns_400() {
        let router = create_router(create_test_state());
        let response = router
            .oneshot(post_json("/overtime/calculate", "{ invalid json }"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(read_error(response).await.code, "MALFORMED_JSON");
    }

    #[tokio::test]
    async fn test_missing_field_returns_validation_error() {
        let router = create_router(create_test_state());
        let response = router
            .oneshot(post_json("/overtime/calculate", r#"{"country": "US"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error = read_error(response).await;
        assert_eq!(error.code, "VALIDATION_ERROR");
        assert!(error.message.contains("shift_id"));
    }

    #[tokio::test]
    async fn test_unknown_shift_returns_404() {
        let router = create_router(create_test_state());
        let response = router
            .oneshot(post_json(
                "/overtime/calculate",
                r#"{"shift_id": "missing", "country": "US", "base_rate": "25"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(read_error(response).await.code, "SHIFT_NOT_FOUND");
    }

    #[tokio::test]
    async fn test_bad_line_id_returns_400() {
        let router = create_router(create_test_state());
        let response = router
            .oneshot(post_json("/lines/not-a-uuid/approve", r#"{"actor": "supervisor"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_resolve_policy_query() {
        let router = create_router(create_test_state());
        let response = router
            .oneshot(
                Request::builder()
                    .uri("/policies/resolve?country=US&state_province=CA&date=2026-03-03")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let summary: PolicySummary = serde_json::from_slice(&body).unwrap();
        assert_eq!(summary.name, "US California Labor Code");
    }
}
