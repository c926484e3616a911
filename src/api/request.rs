//! Request types for the overtime engine API.
//!
//! Bodies and query strings are flat JSON; each type converts into the
//! domain or service type it stands for.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    AuditRecord, Break, CapType, CaptureSource, OvertimeBudget, Shift, ShiftClassification,
    ShiftStatus, WorkType,
};
use crate::policy::PolicyQuery;
use crate::service::{CalculationRequest, Jurisdiction};

/// Jurisdiction fields shared by several requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JurisdictionRequest {
    /// ISO country code.
    pub country: String,
    /// Sector.
    #[serde(default)]
    pub sector: Option<String>,
    /// State or province.
    #[serde(default)]
    pub state_province: Option<String>,
    /// Union agreement key.
    #[serde(default)]
    pub union_agreement: Option<String>,
}

impl From<JurisdictionRequest> for Jurisdiction {
    fn from(req: JurisdictionRequest) -> Self {
        Jurisdiction {
            country: req.country,
            sector: req.sector,
            state_province: req.state_province,
            union_agreement: req.union_agreement,
        }
    }
}

/// Body of `POST /overtime/calculate` and `POST /overtime/preview`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculateOvertimeRequest {
    /// Shift to calculate.
    pub shift_id: String,
    /// Where the shift was worked.
    #[serde(flatten)]
    pub jurisdiction: JurisdictionRequest,
    /// Base hourly rate.
    #[serde(default)]
    pub base_rate: Option<Decimal>,
    /// Hours already worked this week.
    #[serde(default)]
    pub weekly_hours_so_far: Option<Decimal>,
    /// Consecutive days worked including this one.
    #[serde(default)]
    pub consecutive_days: Option<u32>,
}

impl From<CalculateOvertimeRequest> for CalculationRequest {
    fn from(req: CalculateOvertimeRequest) -> Self {
        CalculationRequest {
            shift_id: req.shift_id,
            jurisdiction: req.jurisdiction.into(),
            base_rate: req.base_rate,
            weekly_hours_so_far: req.weekly_hours_so_far,
            consecutive_days: req.consecutive_days,
        }
    }
}

fn default_organization() -> String {
    "default".to_string()
}

fn default_cost_center() -> String {
    "GENERAL".to_string()
}

/// Body of `POST /shifts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShiftRequest {
    /// Shift id.
    pub id: String,
    /// Employee who worked it.
    pub employee_id: String,
    /// Employing organization.
    #[serde(default = "default_organization")]
    pub organization_id: String,
    /// Work location.
    #[serde(default)]
    pub location_id: Option<String>,
    /// Cost centre charged.
    #[serde(default = "default_cost_center")]
    pub cost_center: String,
    /// Project charged.
    #[serde(default)]
    pub project: Option<String>,
    /// Rostered start.
    #[serde(default)]
    pub scheduled_start: Option<NaiveDateTime>,
    /// Rostered end.
    #[serde(default)]
    pub scheduled_end: Option<NaiveDateTime>,
    /// Clock-in.
    pub actual_start: NaiveDateTime,
    /// Clock-out; omit for a shift still in progress.
    #[serde(default)]
    pub actual_end: Option<NaiveDateTime>,
    /// Breaks taken.
    #[serde(default)]
    pub breaks: Vec<Break>,
    /// Day, night, on-call and so on.
    #[serde(default)]
    pub classification: ShiftClassification,
    /// How the times were captured.
    #[serde(default)]
    pub capture_source: CaptureSource,
}

impl ShiftRequest {
    /// Converts into a stored shift attributed to `actor`.
    pub fn into_shift(self, actor: &str) -> Shift {
        let status = if self.actual_end.is_some() {
            ShiftStatus::Completed
        } else {
            ShiftStatus::InProgress
        };
        Shift {
            id: self.id,
            employee_id: self.employee_id,
            organization_id: self.organization_id,
            location_id: self.location_id,
            cost_center: self.cost_center,
            project: self.project,
            scheduled_start: self.scheduled_start,
            scheduled_end: self.scheduled_end,
            actual_start: self.actual_start,
            actual_end: self.actual_end,
            breaks: self.breaks,
            classification: self.classification,
            capture_source: self.capture_source,
            status,
            overtime_hours: None,
            overtime_amount: None,
            audit: AuditRecord::new(actor),
        }
    }
}

/// Body of `POST /shifts/{id}/time-blocks`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeBlockRequest {
    /// Block start.
    pub start: NaiveDateTime,
    /// Block end.
    pub end: NaiveDateTime,
    /// What the time was spent on.
    pub work_type: WorkType,
    /// The block this one corrects.
    #[serde(default)]
    pub corrects: Option<Uuid>,
}

/// Query of `GET /fatigue/{employee_id}`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FatigueQuery {
    /// Day to assess through; today when omitted.
    #[serde(default)]
    pub as_of: Option<NaiveDate>,
}

/// Body of `POST /fatigue/rest-compliance`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestComplianceRequest {
    /// Employee to check.
    pub employee_id: String,
    /// Proposed shift start.
    pub proposed_start: NaiveDateTime,
    /// Jurisdiction whose minimum rest applies.
    #[serde(flatten)]
    pub jurisdiction: JurisdictionRequest,
}

/// Body of `POST /fatigue/fitness`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitnessRequest {
    /// Employee to check.
    pub employee_id: String,
    /// Proposed shift start.
    pub proposed_start: NaiveDateTime,
    /// Proposed shift length.
    pub duration_hours: Decimal,
    /// Jurisdiction whose limits apply.
    #[serde(flatten)]
    pub jurisdiction: JurisdictionRequest,
}

/// Body of `POST /budgets/capacity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetCapacityRequest {
    /// Cost centre charged.
    pub cost_center: String,
    /// Project charged.
    #[serde(default)]
    pub project: Option<String>,
    /// Hours requested.
    #[serde(default)]
    pub hours: Decimal,
    /// Amount requested.
    #[serde(default)]
    pub amount: Decimal,
    /// Date of the work; today when omitted.
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

/// Body of `POST /budgets`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBudgetRequest {
    /// Owning organization.
    #[serde(default = "default_organization")]
    pub organization_id: String,
    /// Budget name.
    pub name: String,
    /// Cost centre scope.
    #[serde(default)]
    pub cost_center: Option<String>,
    /// Project scope.
    #[serde(default)]
    pub project: Option<String>,
    /// First day of the period.
    pub period_start: NaiveDate,
    /// Last day of the period.
    pub period_end: NaiveDate,
    /// Hard or soft.
    pub cap_type: CapType,
    /// Hour cap.
    #[serde(default)]
    pub cap_hours: Option<Decimal>,
    /// Amount cap.
    #[serde(default)]
    pub cap_amount: Option<Decimal>,
    /// Currency; the configured default when omitted.
    #[serde(default)]
    pub currency: Option<String>,
    /// Warning threshold percentage.
    #[serde(default)]
    pub warning_threshold_pct: Option<Decimal>,
    /// Critical threshold percentage.
    #[serde(default)]
    pub critical_threshold_pct: Option<Decimal>,
}

impl CreateBudgetRequest {
    /// Builds the budget, filling the currency from `default_currency`.
    pub fn into_budget(self, default_currency: &str, actor: &str) -> OvertimeBudget {
        let mut budget = OvertimeBudget::new(
            self.organization_id,
            self.name,
            self.period_start,
            self.period_end,
            self.cap_type,
            self.currency.unwrap_or_else(|| default_currency.to_string()),
        );
        budget.cost_center = self.cost_center;
        budget.project = self.project;
        budget.cap_hours = self.cap_hours;
        budget.cap_amount = self.cap_amount;
        if let Some(pct) = self.warning_threshold_pct {
            budget.warning_threshold_pct = pct;
        }
        if let Some(pct) = self.critical_threshold_pct {
            budget.critical_threshold_pct = pct;
        }
        budget.audit = AuditRecord::new(actor);
        budget
    }
}

/// Query of `GET /budgets/{id}/forecast`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForecastQuery {
    /// Day to project from; today when omitted.
    #[serde(default)]
    pub today: Option<NaiveDate>,
}

/// Query of `GET /policies/resolve`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyResolveQuery {
    /// ISO country code.
    pub country: String,
    /// Sector.
    #[serde(default)]
    pub sector: Option<String>,
    /// State or province.
    #[serde(default)]
    pub state_province: Option<String>,
    /// Union agreement key.
    #[serde(default)]
    pub union_agreement: Option<String>,
    /// Organization scope.
    #[serde(default)]
    pub organization_id: Option<String>,
    /// Effective date; today when omitted.
    #[serde(default)]
    pub date: Option<NaiveDate>,
}

impl PolicyResolveQuery {
    /// Converts into a policy query, defaulting the date to `today`.
    pub fn into_query(self, today: NaiveDate) -> PolicyQuery {
        PolicyQuery {
            country: self.country,
            sector: self.sector,
            state_province: self.state_province,
            union_agreement: self.union_agreement,
            organization_id: self.organization_id,
            date: self.date.unwrap_or(today),
        }
    }
}

/// Body of `POST /policies/seed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedPoliciesRequest {
    /// Organization to seed for.
    pub organization_id: String,
    /// Overrides the templates' effective dates.
    #[serde(default)]
    pub effective_from: Option<NaiveDate>,
}

/// Body of `POST /payroll/export`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayrollExportRequest {
    /// Payroll batch id.
    pub batch_id: String,
    /// First work date included.
    pub period_start: NaiveDate,
    /// Last work date included.
    pub period_end: NaiveDate,
    /// Cost centres to export; all when empty.
    #[serde(default)]
    pub cost_centers: Vec<String>,
}

/// Body of `POST /lines/{id}/approve`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApproveLineRequest {
    /// Approver.
    pub actor: String,
    /// Elevated sign-off for a soft-cap overrun.
    #[serde(default)]
    pub override_soft_cap: bool,
}

/// Body of `POST /lines/{id}/reject`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RejectLineRequest {
    /// Reviewer.
    pub actor: String,
    /// Why the line was rejected.
    pub reason: String,
}
