//! Transport-agnostic operations over the engine components.
//!
//! [`OvertimeService`] does the boundary I/O (loading shifts, policies, time
//! blocks and budgets from the store) and hands materialized data to the pure
//! components. The HTTP layer is a thin adapter over these methods.

use std::sync::Arc;

use chrono::{Datelike, Days, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::budget::{BudgetCapacity, BudgetForecast, BudgetValidator, SpendRequest};
use crate::calculation::{
    CalculationContext, CalculationOutcome, OvertimeCalculationEngine, compute_worked_hours,
};
use crate::error::{EngineError, EngineResult, MAX_AMOUNT, MAX_HOURS, ensure_quantity};
use crate::fatigue::{FatigueAssessment, FatigueTracker, FitnessDecision, RestCompliance};
use crate::models::{
    BudgetRules, LineStatus, OvertimeBudget, OvertimeLine, Policy, Shift, TimeBlock, WorkType,
};
use crate::observability::{EngineEvent, SharedObserver};
use crate::policy::{PolicyEngine, PolicyQuery};
use crate::repository::{
    BudgetRepository, LineRepository, PolicyRepository, ShiftRepository, Store,
    TimeBlockRepository,
};

/// Actor recorded when the service changes records on its own account.
pub const SERVICE_ACTOR: &str = "overtime_service";

/// Where a shift was worked, for policy resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jurisdiction {
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

impl Jurisdiction {
    /// A country-wide jurisdiction.
    pub fn country(country: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            ..Self::default()
        }
    }

    /// Builds the policy query for `date`, scoped to `organization_id`.
    pub fn query(&self, date: NaiveDate, organization_id: Option<&str>) -> PolicyQuery {
        PolicyQuery {
            country: self.country.clone(),
            sector: self.sector.clone(),
            state_province: self.state_province.clone(),
            union_agreement: self.union_agreement.clone(),
            organization_id: organization_id.map(str::to_string),
            date,
        }
    }
}

/// Input to a calculation or preview.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationRequest {
    /// Shift to calculate.
    pub shift_id: String,
    /// Where the shift was worked.
    pub jurisdiction: Jurisdiction,
    /// Base hourly rate. Defaults to the rate of the shift's previous calculation.
    #[serde(default)]
    pub base_rate: Option<Decimal>,
    /// Hours worked earlier in the week. Derived from stored shifts when absent.
    #[serde(default)]
    pub weekly_hours_so_far: Option<Decimal>,
    /// Consecutive days worked including this one. Derived from stored shifts when absent.
    #[serde(default)]
    pub consecutive_days: Option<u32>,
}

/// Lines locked under one payroll batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayrollExport {
    /// Payroll batch id.
    pub batch_id: String,
    /// First work date included.
    pub period_start: NaiveDate,
    /// Last work date included.
    pub period_end: NaiveDate,
    /// Locked lines.
    pub lines: Vec<OvertimeLine>,
    /// Sum of their amounts.
    pub total_amount: Decimal,
}

/// Result of approving a line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineApproval {
    /// The approved line.
    pub line: OvertimeLine,
    /// The budget charged, if one governs the line.
    pub budget: Option<OvertimeBudget>,
    /// Informational messages from the budget check.
    pub warnings: Vec<String>,
}

/// The overtime core behind one store.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use chrono::NaiveDateTime;
/// use overtime_engine::models::Shift;
/// use overtime_engine::observability::noop;
/// use overtime_engine::repository::InMemoryStore;
/// use overtime_engine::service::{CalculationRequest, Jurisdiction, OvertimeService};
/// use rust_decimal::Decimal;
///
/// let service = OvertimeService::new(Arc::new(InMemoryStore::new()), noop());
/// service.seed_default_policies("default", None).unwrap();
///
/// let start = NaiveDateTime::parse_from_str("2026-03-03 08:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
/// service
///     .record_shift(Shift::completed("shift_001", "emp_001", start, start + chrono::Duration::hours(10)))
///     .unwrap();
///
/// let outcome = service
///     .calculate_overtime(&CalculationRequest {
///         shift_id: "shift_001".to_string(),
///         jurisdiction: Jurisdiction {
///             state_province: Some("CA".to_string()),
///             ..Jurisdiction::country("US")
///         },
///         base_rate: Some(Decimal::from(25)),
///         weekly_hours_so_far: None,
///         consecutive_days: None,
///     })
///     .unwrap();
/// assert_eq!(outcome.total_amount, Decimal::from(75));
/// ```
#[derive(Clone)]
pub struct OvertimeService {
    policies: PolicyEngine,
    calculator: OvertimeCalculationEngine,
    fatigue: FatigueTracker,
    budgets: BudgetValidator,
    policy_repository: Arc<dyn PolicyRepository>,
    shifts: Arc<dyn ShiftRepository>,
    time_blocks: Arc<dyn TimeBlockRepository>,
    lines: Arc<dyn LineRepository>,
    budget_repository: Arc<dyn BudgetRepository>,
    observer: SharedObserver,
}

impl std::fmt::Debug for OvertimeService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OvertimeService").finish_non_exhaustive()
    }
}

fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.checked_add_days(Days::new(1))
        .unwrap_or(date)
        .and_time(NaiveTime::MIN)
}

impl OvertimeService {
    /// Wires every component to `store`.
    pub fn new<S: Store + 'static>(store: Arc<S>, observer: SharedObserver) -> Self {
        Self {
            policies: PolicyEngine::new(store.clone(), observer.clone()),
            calculator: OvertimeCalculationEngine::new(observer.clone()),
            fatigue: FatigueTracker::new(store.clone(), observer.clone()),
            budgets: BudgetValidator::new(store.clone(), observer.clone()),
            policy_repository: store.clone(),
            shifts: store.clone(),
            time_blocks: store.clone(),
            lines: store.clone(),
            budget_repository: store,
            observer,
        }
    }

    /// Stores policies loaded from configuration.
    pub fn load_policies(&self, policies: Vec<Policy>) -> EngineResult<usize> {
        let count = policies.len();
        for policy in policies {
            policy.validate()?;
            self.policy_repository.save_policy(policy)?;
        }
        Ok(count)
    }

    /// Stores a shift.
    pub fn record_shift(&self, shift: Shift) -> EngineResult<()> {
        self.shifts.save_shift(shift)
    }

    /// Returns a stored shift.
    pub fn get_shift(&self, shift_id: &str) -> EngineResult<Shift> {
        self.shifts.get_shift(shift_id)
    }

    /// Appends a time block for a stored shift to its employee's chain.
    pub fn append_time_block(
        &self,
        shift_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        work_type: WorkType,
        corrects: Option<Uuid>,
    ) -> EngineResult<TimeBlock> {
        let shift = self.shifts.get_shift(shift_id)?;
        self.time_blocks
            .append_time_block(&shift.employee_id, shift_id, start, end, work_type, corrects)
    }

    /// Stores a budget.
    pub fn create_budget(&self, budget: OvertimeBudget) -> EngineResult<OvertimeBudget> {
        if let Some(cap) = budget.cap_amount {
            ensure_quantity("cap_amount", cap, MAX_AMOUNT)?;
        }
        if let Some(cap) = budget.cap_hours {
            ensure_quantity("cap_hours", cap, MAX_HOURS)?;
        }
        self.budget_repository.save_budget(budget.clone())?;
        Ok(budget)
    }

    /// Returns a stored budget.
    pub fn get_budget(&self, budget_id: Uuid) -> EngineResult<OvertimeBudget> {
        self.budget_repository.get_budget(budget_id)
    }

    /// Resolves the single applicable policy.
    pub fn resolve_policy(&self, query: &PolicyQuery) -> EngineResult<Policy> {
        self.policies.find_applicable_policy(query)
    }

    /// Seeds the jurisdiction templates for an organization.
    pub fn seed_default_policies(
        &self,
        organization_id: &str,
        effective_from: Option<NaiveDate>,
    ) -> EngineResult<Vec<Policy>> {
        self.policies
            .seed_default_policies(organization_id, effective_from)
    }

    fn week_start(date: NaiveDate, policy: &Policy) -> NaiveDate {
        let offset = (7 + date.weekday().num_days_from_monday()
            - policy.thresholds.week_starts_on.num_days_from_monday())
            % 7;
        date.checked_sub_days(Days::new(u64::from(offset)))
            .unwrap_or(date)
    }

    /// Worked hours of completed shifts earlier in the policy week.
    fn weekly_hours_before(&self, shift: &Shift, policy: &Policy) -> EngineResult<Decimal> {
        let from = Self::week_start(shift.work_date(), policy).and_time(NaiveTime::MIN);
        Ok(self
            .shifts
            .shifts_for_employee(&shift.employee_id, from, shift.actual_start)?
            .iter()
            .filter(|s| s.id != shift.id)
            .map(|s| compute_worked_hours(s, &policy.rounding, 1).hours)
            .sum())
    }

    /// Length of the run of worked days ending on the shift's date.
    fn consecutive_days_through(&self, shift: &Shift) -> EngineResult<u32> {
        let date = shift.work_date();
        let lookback = date.checked_sub_days(Days::new(31)).unwrap_or(date);
        let worked: Vec<NaiveDate> = self
            .shifts
            .shifts_for_employee(
                &shift.employee_id,
                lookback.and_time(NaiveTime::MIN),
                shift.actual_start,
            )?
            .iter()
            .map(Shift::work_date)
            .collect();

        let mut run = 1;
        let mut day = date;
        while let Some(previous) = day.pred_opt()
            && worked.contains(&previous)
        {
            run += 1;
            day = previous;
        }
        Ok(run)
    }

    fn context_for(
        &self,
        request: &CalculationRequest,
        shift: &Shift,
        policy: &Policy,
    ) -> EngineResult<CalculationContext> {
        let base_rate = match request.base_rate {
            Some(rate) => rate,
            None => self
                .lines
                .lines_for_shift(&shift.id)?
                .iter()
                .max_by_key(|l| l.audit.created_at)
                .map(|l| l.base_rate)
                .ok_or_else(|| EngineError::CalculationError {
                    message: format!("no base rate supplied for shift '{}' and none on file", shift.id),
                    partial_trace: Vec::new(),
                })?,
        };
        let prior_weekly_hours = match request.weekly_hours_so_far {
            Some(hours) => hours,
            None => self.weekly_hours_before(shift, policy)?,
        };
        let consecutive_days_worked = match request.consecutive_days {
            Some(days) => days,
            None => self.consecutive_days_through(shift)?,
        };
        Ok(CalculationContext {
            base_rate,
            prior_weekly_hours,
            consecutive_days_worked,
        })
    }

    fn run_calculation(&self, request: &CalculationRequest) -> EngineResult<(Shift, CalculationOutcome)> {
        let shift = self.shifts.get_shift(&request.shift_id)?;
        let query = request
            .jurisdiction
            .query(shift.work_date(), Some(&shift.organization_id));
        let policy = self.policies.find_applicable_policy(&query)?;
        let context = self.context_for(request, &shift, &policy)?;
        let blocks = self.time_blocks.time_blocks(&shift.employee_id)?;
        let mut outcome = self.calculator.calculate(&shift, &blocks, &policy, &context)?;
        for line in &mut outcome.lines {
            line.cost_center = shift.cost_center.clone();
            line.project = shift.project.clone();
        }
        Ok((shift, outcome))
    }

    /// Calculates and persists overtime lines for a stored shift.
    ///
    /// Earlier lines for the shift are marked superseded; if any of them is
    /// locked by payroll the recalculation fails with `LineLocked`. Budget
    /// spend charged for a superseded line is reversed, so approving its
    /// replacement charges the shift once.
    pub fn calculate_overtime(&self, request: &CalculationRequest) -> EngineResult<CalculationOutcome> {
        let (mut shift, outcome) = self.run_calculation(request)?;

        let previous: Vec<Uuid> = self
            .lines
            .lines_for_shift(&shift.id)?
            .iter()
            .filter(|l| !matches!(l.status, LineStatus::Superseded | LineStatus::Rejected))
            .map(|l| l.id)
            .collect();
        let mut charged: Vec<(Uuid, Uuid, NaiveDate)> = Vec::new();
        if !previous.is_empty() {
            self.lines.update_lines(&previous, &mut |line| {
                if line.is_locked {
                    return Err(EngineError::LineLocked {
                        line_id: line.id,
                        batch_id: line.payroll_batch_id.clone().unwrap_or_default(),
                    });
                }
                if let Some(budget_id) = line.budget_id {
                    charged.push((budget_id, line.id, line.work_date));
                }
                line.status = LineStatus::Superseded;
                line.metadata
                    .insert("superseded_reason".to_string(), serde_json::json!("recalculated"));
                line.audit.touch(SERVICE_ACTOR);
                Ok(())
            })?;
        }
        for (budget_id, line_id, work_date) in charged {
            self.budgets
                .reverse_line_spend(budget_id, line_id, work_date, "line superseded by recalculation")?;
        }

        self.lines.save_lines(&outcome.lines)?;
        shift.overtime_hours = Some(outcome.lines.iter().map(|l| l.quantity).sum());
        shift.overtime_amount = Some(outcome.total_amount);
        shift.audit.touch(SERVICE_ACTOR);
        self.shifts.save_shift(shift)?;
        Ok(outcome)
    }

    /// Calculates overtime lines without persisting anything.
    pub fn preview_overtime(&self, request: &CalculationRequest) -> EngineResult<CalculationOutcome> {
        self.run_calculation(request).map(|(_, outcome)| outcome)
    }

    /// Lines stored for a shift, superseded ones included.
    pub fn lines_for_shift(&self, shift_id: &str) -> EngineResult<Vec<OvertimeLine>> {
        self.lines.lines_for_shift(shift_id)
    }

    /// Scores fatigue over the seven days up to the end of `as_of`.
    pub fn check_fatigue(&self, employee_id: &str, as_of: NaiveDate) -> EngineResult<FatigueAssessment> {
        self.fatigue
            .calculate_fatigue_score(employee_id, end_of_day(as_of))
    }

    /// Checks minimum rest before `proposed_start` under the jurisdiction's policy.
    pub fn check_rest_compliance(
        &self,
        employee_id: &str,
        proposed_start: NaiveDateTime,
        jurisdiction: &Jurisdiction,
    ) -> EngineResult<RestCompliance> {
        let policy = self
            .policies
            .find_applicable_policy(&jurisdiction.query(proposed_start.date(), None))?;
        self.fatigue
            .check_rest_compliance(employee_id, proposed_start, &policy)
    }

    /// Gates a proposed shift on rest and fatigue.
    ///
    /// Critical fatigue and rest breaches are returned as errors.
    pub fn check_fitness(
        &self,
        employee_id: &str,
        proposed_start: NaiveDateTime,
        duration_hours: Decimal,
        jurisdiction: &Jurisdiction,
    ) -> EngineResult<FitnessDecision> {
        ensure_quantity("duration_hours", duration_hours, MAX_HOURS)?;
        let policy = self
            .policies
            .find_applicable_policy(&jurisdiction.query(proposed_start.date(), None))?;
        self.fatigue
            .require_fit_for_shift(employee_id, proposed_start, duration_hours, &policy)
    }

    /// Checks whether overtime fits the governing budget.
    pub fn check_budget_capacity(
        &self,
        cost_center: &str,
        project: Option<&str>,
        hours: Decimal,
        amount: Decimal,
        date: NaiveDate,
    ) -> EngineResult<BudgetCapacity> {
        self.budgets
            .check_budget_capacity(cost_center, project, hours, amount, date)
    }

    /// Projects a budget to its period end.
    pub fn budget_forecast(&self, budget_id: Uuid, today: NaiveDate) -> EngineResult<BudgetForecast> {
        self.budgets.generate_forecast(budget_id, today)
    }

    /// Expires finished budgets and reports those at or past a threshold.
    pub fn run_budget_sweep(&self, today: NaiveDate) -> EngineResult<Vec<Uuid>> {
        let expired = self.budgets.expire_budgets(today)?;
        self.budgets.scan_alerts(today)?;
        Ok(expired)
    }

    fn budget_rules_for(&self, line: &OvertimeLine) -> EngineResult<BudgetRules> {
        Ok(self
            .policy_repository
            .list_policies()?
            .into_iter()
            .find(|p| p.id == line.policy_id)
            .map(|p| p.budget_rules)
            .unwrap_or_default())
    }

    /// Approves a pending line and charges it to its budget.
    ///
    /// The status change and the charge happen while the line is held, so
    /// concurrent approvals of one line charge the budget once. A hard cap
    /// refuses with `BudgetCapacityExceeded`; a soft cap refuses with
    /// `BudgetApprovalRequired` unless `override_soft_cap` is set and the
    /// policy permits overrides. On refusal neither the line nor the budget
    /// changes.
    pub fn approve_line(
        &self,
        line_id: Uuid,
        actor: &str,
        override_soft_cap: bool,
    ) -> EngineResult<LineApproval> {
        let line = self.lines.get_line(line_id)?;
        let rules = self.budget_rules_for(&line)?;
        let governing = self
            .budgets
            .find_budget(&line.cost_center, line.project.as_deref(), line.work_date)?;

        let mut charged = None;
        let mut updated = self.lines.update_lines(&[line_id], &mut |line| {
            line.approve(actor)?;
            if let Some(budget) = &governing {
                let request = SpendRequest::new(line.quantity, line.calculated_amount, line.work_date)
                    .line(line.id)
                    .employee(line.employee_id.clone());
                charged = Some(self.budgets.check_and_record_spending(
                    budget.id,
                    &request,
                    &rules,
                    override_soft_cap,
                )?);
                line.budget_id = Some(budget.id);
            }
            Ok(())
        })?;
        let line = updated.pop().ok_or(EngineError::LineNotFound { line_id })?;

        let mut warnings = Vec::new();
        if governing.is_none() {
            warnings.push(format!(
                "No budget covers cost centre '{}' on {}; line approved without a budget charge",
                line.cost_center, line.work_date
            ));
        }
        Ok(LineApproval {
            line,
            budget: charged,
            warnings,
        })
    }

    /// Rejects a pending line.
    pub fn reject_line(&self, line_id: Uuid, actor: &str, reason: &str) -> EngineResult<OvertimeLine> {
        let mut updated = self
            .lines
            .update_lines(&[line_id], &mut |line| line.reject(actor, reason))?;
        updated.pop().ok_or(EngineError::LineNotFound { line_id })
    }

    /// Locks pending and approved lines worked in `[from, to]` for the given
    /// cost centres under `batch_id`.
    ///
    /// An empty cost centre list exports every cost centre.
    pub fn export_to_payroll(
        &self,
        batch_id: &str,
        from: NaiveDate,
        to: NaiveDate,
        cost_centers: &[String],
    ) -> EngineResult<PayrollExport> {
        if to < from {
            return Err(EngineError::CalculationError {
                message: format!("export period end {} precedes start {}", to, from),
                partial_trace: Vec::new(),
            });
        }

        let ids: Vec<Uuid> = self
            .lines
            .lines_between(from, to)?
            .iter()
            .filter(|l| !l.is_locked)
            .filter(|l| matches!(l.status, LineStatus::Pending | LineStatus::Approved))
            .filter(|l| cost_centers.is_empty() || cost_centers.contains(&l.cost_center))
            .map(|l| l.id)
            .collect();

        let lines = if ids.is_empty() {
            Vec::new()
        } else {
            self.lines.update_lines(&ids, &mut |line| {
                line.lock_for_payroll(batch_id, SERVICE_ACTOR)
            })?
        };
        let total_amount: Decimal = lines.iter().map(|l| l.calculated_amount).sum();

        self.observer.on_event(&EngineEvent::LinesExported {
            batch_id: batch_id.to_string(),
            lines: lines.len(),
            total_amount,
        });

        Ok(PayrollExport {
            batch_id: batch_id.to_string(),
            period_start: from,
            period_end: to,
            lines,
            total_amount,
        })
    }
}
