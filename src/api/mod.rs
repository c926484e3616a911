//! HTTP API module for the overtime engine.
//!
//! A thin JSON adapter over [`OvertimeService`](crate::service::OvertimeService):
//! every endpoint parses its input, calls one service operation and maps
//! the result or error to a response.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::{
    ApproveLineRequest, BudgetCapacityRequest, CalculateOvertimeRequest, CreateBudgetRequest,
    FatigueQuery, FitnessRequest, ForecastQuery, JurisdictionRequest, PayrollExportRequest,
    PolicyResolveQuery, RejectLineRequest, RestComplianceRequest, SeedPoliciesRequest,
    ShiftRequest, TimeBlockRequest,
};
pub use response::{ApiError, ApiErrorResponse, HealthResponse, PolicySummary};
pub use state::AppState;
