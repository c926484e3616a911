//! Budget capacity checks and spend recording.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::forecast::{BudgetForecast, project_budget};
use crate::error::{EngineError, EngineResult, MAX_AMOUNT, MAX_HOURS, ensure_quantity};
use crate::models::{
    BudgetRules, BudgetStatus, BudgetThreshold, CapType, ForecastSnapshot, OvertimeBudget,
};
use crate::observability::{EngineEvent, SharedObserver};
use crate::repository::BudgetRepository;

/// Actor recorded on budget transactions made by the validator.
pub const BUDGET_ACTOR: &str = "budget_validator";

/// Outcome of a capacity check. Never mutates the budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetCapacity {
    /// Budget that governs the request, if any.
    pub budget_id: Option<Uuid>,
    /// Its name.
    pub budget_name: Option<String>,
    /// Whether the request may proceed (possibly with approval).
    pub has_capacity: bool,
    /// Whether a soft cap requires elevated sign-off.
    pub requires_approval: bool,
    /// Amount left before the request.
    pub remaining_amount: Option<Decimal>,
    /// Hours left before the request.
    pub remaining_hours: Option<Decimal>,
    /// Usage after the request, as a percentage of the cap.
    pub percentage_used: Decimal,
    /// Status the budget would have after the request.
    pub status: Option<BudgetStatus>,
    /// Thresholds this request would cross.
    pub thresholds_crossed: Vec<BudgetThreshold>,
    /// Informational messages.
    pub warnings: Vec<String>,
}

impl BudgetCapacity {
    fn unrestricted(warning: String) -> Self {
        Self {
            budget_id: None,
            budget_name: None,
            has_capacity: true,
            requires_approval: false,
            remaining_amount: None,
            remaining_hours: None,
            percentage_used: Decimal::ZERO,
            status: None,
            thresholds_crossed: Vec::new(),
            warnings: vec![warning],
        }
    }
}

/// One spend to record against a budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpendRequest {
    /// Overtime line the spend pays for.
    pub line_id: Option<Uuid>,
    /// Hours.
    pub hours: Decimal,
    /// Amount.
    pub amount: Decimal,
    /// Employee paid.
    pub employee_id: Option<String>,
    /// Date the work happened.
    pub occurred_on: NaiveDate,
}

impl SpendRequest {
    /// Creates a request for `hours` and `amount` on `occurred_on`.
    pub fn new(hours: Decimal, amount: Decimal, occurred_on: NaiveDate) -> Self {
        Self {
            line_id: None,
            hours,
            amount,
            employee_id: None,
            occurred_on,
        }
    }

    /// Links the spend to an overtime line.
    pub fn line(mut self, line_id: Uuid) -> Self {
        self.line_id = Some(line_id);
        self
    }

    /// Records the employee paid.
    pub fn employee(mut self, employee_id: impl Into<String>) -> Self {
        self.employee_id = Some(employee_id.into());
        self
    }
}

/// A budget at or past one of its thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetAlert {
    /// Budget concerned.
    pub budget_id: Uuid,
    /// Its name.
    pub budget_name: String,
    /// Highest threshold reached.
    pub threshold: BudgetThreshold,
    /// Current usage.
    pub percentage_used: Decimal,
    /// Current status.
    pub status: BudgetStatus,
}

fn validate_request(hours: Decimal, amount: Decimal) -> EngineResult<()> {
    ensure_quantity("hours", hours, MAX_HOURS)?;
    ensure_quantity("amount", amount, MAX_AMOUNT)?;
    Ok(())
}

fn scope_rank(budget: &OvertimeBudget, cost_center: &str, project: Option<&str>) -> Option<u8> {
    match (project, budget.project.as_deref()) {
        (Some(wanted), Some(scoped)) if wanted == scoped => Some(2),
        (_, None) if budget.cost_center.as_deref() == Some(cost_center) => Some(1),
        _ => None,
    }
}

fn describe_usage(budget: &OvertimeBudget, percentage: Decimal) -> Option<String> {
    if percentage >= Decimal::from(100) {
        Some(format!(
            "Budget '{}' exceeded: {}% of cap would be used",
            budget.name,
            percentage.normalize()
        ))
    } else if percentage >= budget.critical_threshold_pct {
        Some(format!(
            "Budget '{}' at critical level: {}% of cap would be used",
            budget.name,
            percentage.normalize()
        ))
    } else if percentage >= budget.warning_threshold_pct {
        Some(format!(
            "Budget '{}' past warning level: {}% of cap would be used",
            budget.name,
            percentage.normalize()
        ))
    } else {
        None
    }
}

fn evaluate_capacity(
    budget: &OvertimeBudget,
    hours: Decimal,
    amount: Decimal,
    rules: &BudgetRules,
) -> BudgetCapacity {
    let remaining_amount = budget.remaining_amount();
    let remaining_hours = budget.remaining_hours();
    let fits = remaining_amount.is_none_or(|left| amount <= left)
        && remaining_hours.is_none_or(|left| hours <= left);

    let before = budget.percentage_used();
    let after = budget.percentage_with(hours, amount);
    let mut warnings: Vec<String> = describe_usage(budget, after).into_iter().collect();

    let expired = budget.status == BudgetStatus::Expired;
    let (has_capacity, requires_approval) = match (fits, budget.cap_type) {
        _ if expired => (false, false),
        (true, _) => (true, false),
        (false, CapType::Hard) => (false, false),
        (false, CapType::Soft) => (true, true),
    };
    if expired {
        warnings.push(format!("Budget '{}' has expired", budget.name));
    } else if !fits {
        warnings.push(match budget.cap_type {
            CapType::Hard => format!("Hard cap on budget '{}' blocks this request", budget.name),
            CapType::Soft if rules.allow_soft_cap_override => {
                format!("Soft cap on budget '{}' exceeded; approval required", budget.name)
            }
            CapType::Soft => format!(
                "Soft cap on budget '{}' exceeded; approval required and the policy allows no override",
                budget.name
            ),
        });
    }

    BudgetCapacity {
        budget_id: Some(budget.id),
        budget_name: Some(budget.name.clone()),
        has_capacity,
        requires_approval,
        remaining_amount,
        remaining_hours,
        percentage_used: after,
        status: Some(budget.projected_status(hours, amount)),
        thresholds_crossed: budget.thresholds_crossed(before, after),
        warnings,
    }
}

/// Checks and records overtime against cost-centre and project budgets.
///
/// Every mutation goes through [`BudgetRepository::update_budget`], which
/// serializes writers per budget.
#[derive(Clone)]
pub struct BudgetValidator {
    repository: Arc<dyn BudgetRepository>,
    observer: SharedObserver,
}

impl std::fmt::Debug for BudgetValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BudgetValidator").finish_non_exhaustive()
    }
}

impl BudgetValidator {
    /// Creates a validator over `repository`.
    pub fn new(repository: Arc<dyn BudgetRepository>, observer: SharedObserver) -> Self {
        Self {
            repository,
            observer,
        }
    }

    /// The most specific open budget covering `date`.
    ///
    /// A project budget is preferred over a cost-centre budget; among equals
    /// the one with the shortest period wins, then the name.
    pub fn find_budget(
        &self,
        cost_center: &str,
        project: Option<&str>,
        date: NaiveDate,
    ) -> EngineResult<Option<OvertimeBudget>> {
        let mut candidates: Vec<(u8, OvertimeBudget)> = self
            .repository
            .list_budgets()?
            .into_iter()
            .filter(|b| b.covers(date))
            .filter_map(|b| scope_rank(&b, cost_center, project).map(|rank| (rank, b)))
            .collect();
        candidates.sort_by(|(ra, a), (rb, b)| {
            rb.cmp(ra)
                .then_with(|| (a.period_end - a.period_start).cmp(&(b.period_end - b.period_start)))
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(candidates.into_iter().next().map(|(_, b)| b))
    }

    /// Checks whether `hours` and `amount` fit the governing budget, under
    /// default budget rules.
    ///
    /// Without a budget the request is unrestricted and a warning says so.
    pub fn check_budget_capacity(
        &self,
        cost_center: &str,
        project: Option<&str>,
        hours: Decimal,
        amount: Decimal,
        date: NaiveDate,
    ) -> EngineResult<BudgetCapacity> {
        self.check_budget_capacity_with_rules(
            cost_center,
            project,
            hours,
            amount,
            date,
            &BudgetRules::default(),
        )
    }

    /// Like [`check_budget_capacity`](Self::check_budget_capacity) under a policy's budget rules.
    pub fn check_budget_capacity_with_rules(
        &self,
        cost_center: &str,
        project: Option<&str>,
        hours: Decimal,
        amount: Decimal,
        date: NaiveDate,
        rules: &BudgetRules,
    ) -> EngineResult<BudgetCapacity> {
        validate_request(hours, amount)?;
        match self.find_budget(cost_center, project, date)? {
            Some(budget) => Ok(evaluate_capacity(&budget, hours, amount, rules)),
            None => {
                let scope = match project {
                    Some(project) => format!("project '{}' or cost centre '{}'", project, cost_center),
                    None => format!("cost centre '{}'", cost_center),
                };
                let qualifier = if rules.require_budget {
                    "; the applicable policy requires one"
                } else {
                    ""
                };
                Ok(BudgetCapacity::unrestricted(format!(
                    "No budget covers {} on {}; capacity is unrestricted{}",
                    scope, date, qualifier
                )))
            }
        }
    }

    fn emit_spend_events(&self, budget: &OvertimeBudget, request: &SpendRequest, before: Decimal) {
        self.observer.on_event(&EngineEvent::BudgetSpendRecorded {
            budget_id: budget.id,
            hours: request.hours,
            amount: request.amount,
            status: budget.status,
        });
        let after = budget.percentage_used();
        for threshold in budget.thresholds_crossed(before, after) {
            self.observer.on_event(&EngineEvent::BudgetThresholdCrossed {
                budget_id: budget.id,
                threshold,
                percentage_used: after,
            });
        }
    }

    /// Appends a spend transaction and recomputes status, atomically per budget.
    ///
    /// Recording actual spend never fails on a cap; use
    /// [`check_and_record_spending`](Self::check_and_record_spending) to gate it.
    pub fn record_spending(
        &self,
        budget_id: Uuid,
        request: &SpendRequest,
    ) -> EngineResult<OvertimeBudget> {
        validate_request(request.hours, request.amount)?;
        let mut before = Decimal::ZERO;
        let updated = self.repository.update_budget(budget_id, &mut |budget| {
            before = budget.percentage_used();
            budget.spend(
                request.hours,
                request.amount,
                request.line_id,
                request.employee_id.as_deref(),
                request.occurred_on,
                BUDGET_ACTOR,
            )?;
            Ok(())
        })?;
        self.emit_spend_events(&updated, request, before);
        Ok(updated)
    }

    /// Checks capacity and records the spend inside one critical section.
    ///
    /// Fails with `BudgetCapacityExceeded` on a hard cap. A soft cap fails
    /// with `BudgetApprovalRequired` unless `approved` is set and the rules
    /// allow overriding it. A line already charged to the budget fails with
    /// `LineAlreadyCharged`. The budget is left unchanged on failure.
    pub fn check_and_record_spending(
        &self,
        budget_id: Uuid,
        request: &SpendRequest,
        rules: &BudgetRules,
        approved: bool,
    ) -> EngineResult<OvertimeBudget> {
        validate_request(request.hours, request.amount)?;
        let mut before = Decimal::ZERO;
        let updated = self.repository.update_budget(budget_id, &mut |budget| {
            let capacity = evaluate_capacity(budget, request.hours, request.amount, rules);
            if !capacity.has_capacity {
                return Err(EngineError::BudgetCapacityExceeded {
                    budget_id,
                    requested: request.amount,
                    remaining: budget.remaining_amount().unwrap_or(Decimal::ZERO),
                });
            }
            if capacity.requires_approval && !(approved && rules.allow_soft_cap_override) {
                return Err(EngineError::BudgetApprovalRequired {
                    budget_id,
                    reason: capacity.warnings.join("; "),
                });
            }
            before = budget.percentage_used();
            budget.spend(
                request.hours,
                request.amount,
                request.line_id,
                request.employee_id.as_deref(),
                request.occurred_on,
                BUDGET_ACTOR,
            )?;
            Ok(())
        })?;
        self.emit_spend_events(&updated, request, before);
        Ok(updated)
    }

    /// Returns a superseded line's spend to its budget.
    ///
    /// Returns the updated budget, or `None` if the line had no spend on it.
    pub fn reverse_line_spend(
        &self,
        budget_id: Uuid,
        line_id: Uuid,
        occurred_on: NaiveDate,
        reason: &str,
    ) -> EngineResult<Option<OvertimeBudget>> {
        let mut reversed = None;
        let updated = self.repository.update_budget(budget_id, &mut |budget| {
            reversed = budget
                .reverse_spend(line_id, occurred_on, reason, BUDGET_ACTOR)
                .map(|t| (t.hours, t.amount));
            Ok(())
        })?;
        Ok(reversed.map(|(hours, amount)| {
            self.observer.on_event(&EngineEvent::BudgetSpendReversed {
                budget_id,
                line_id,
                hours,
                amount,
            });
            updated
        }))
    }

    /// Reserves capacity for approved but unpaid work.
    pub fn commit(&self, budget_id: Uuid, request: &SpendRequest) -> EngineResult<OvertimeBudget> {
        let mut before = Decimal::ZERO;
        let updated = self.repository.update_budget(budget_id, &mut |budget| {
            before = budget.percentage_used();
            budget.commit(
                request.hours,
                request.amount,
                request.line_id,
                request.occurred_on,
                BUDGET_ACTOR,
            )?;
            Ok(())
        })?;
        let after = updated.percentage_used();
        for threshold in updated.thresholds_crossed(before, after) {
            self.observer.on_event(&EngineEvent::BudgetThresholdCrossed {
                budget_id,
                threshold,
                percentage_used: after,
            });
        }
        Ok(updated)
    }

    /// Releases a reservation, e.g. after the line was rejected.
    pub fn release(&self, budget_id: Uuid, request: &SpendRequest) -> EngineResult<OvertimeBudget> {
        self.repository.update_budget(budget_id, &mut |budget| {
            budget.release(
                request.hours,
                request.amount,
                request.line_id,
                request.occurred_on,
                BUDGET_ACTOR,
            )?;
            Ok(())
        })
    }

    /// Changes a budget's caps; the only way its status may move backwards.
    pub fn reallocate(
        &self,
        budget_id: Uuid,
        cap_hours: Option<Decimal>,
        cap_amount: Option<Decimal>,
        reason: &str,
        occurred_on: NaiveDate,
        actor: &str,
    ) -> EngineResult<OvertimeBudget> {
        self.repository.update_budget(budget_id, &mut |budget| {
            budget.reallocate(cap_hours, cap_amount, reason, occurred_on, actor)?;
            Ok(())
        })
    }

    /// Projects period-end spend and stores the snapshot on the budget.
    pub fn generate_forecast(&self, budget_id: Uuid, today: NaiveDate) -> EngineResult<BudgetForecast> {
        let mut forecast = None;
        self.repository.update_budget(budget_id, &mut |budget| {
            let projection = project_budget(budget, today);
            budget.forecast = Some(ForecastSnapshot {
                projected_amount: projection.projected_amount,
                projected_overrun_pct: projection.projected_overrun_pct,
                generated_at: Utc::now(),
            });
            forecast = Some(projection);
            Ok(())
        })?;
        forecast.ok_or(EngineError::BudgetNotFound { budget_id })
    }

    /// Lists open budgets covering `today` that sit at or past a threshold.
    pub fn scan_alerts(&self, today: NaiveDate) -> EngineResult<Vec<BudgetAlert>> {
        let alerts: Vec<BudgetAlert> = self
            .repository
            .list_budgets()?
            .into_iter()
            .filter(|b| b.covers(today) && b.status != BudgetStatus::Expired)
            .filter_map(|b| {
                b.current_threshold().map(|threshold| BudgetAlert {
                    budget_id: b.id,
                    budget_name: b.name.clone(),
                    threshold,
                    percentage_used: b.percentage_used(),
                    status: b.status,
                })
            })
            .collect();
        for alert in &alerts {
            self.observer.on_event(&EngineEvent::BudgetThresholdCrossed {
                budget_id: alert.budget_id,
                threshold: alert.threshold,
                percentage_used: alert.percentage_used,
            });
        }
        Ok(alerts)
    }

    /// Expires every budget whose period ended before `today`. Returns their ids.
    pub fn expire_budgets(&self, today: NaiveDate) -> EngineResult<Vec<Uuid>> {
        let mut expired = Vec::new();
        for budget in self.repository.list_budgets()? {
            if budget.status == BudgetStatus::Expired || today <= budget.period_end {
                continue;
            }
            let mut changed = false;
            self.repository.update_budget(budget.id, &mut |b| {
                changed = b.expire_if_due(today, BUDGET_ACTOR);
                Ok(())
            })?;
            if changed {
                self.observer
                    .on_event(&EngineEvent::BudgetExpired { budget_id: budget.id });
                expired.push(budget.id);
            }
        }
        Ok(expired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::{RecordingObserver, noop};
    use crate::repository::InMemoryStore;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 3, d).unwrap()
    }

    fn icu_budget(cap: &str, cap_type: CapType) -> OvertimeBudget {
        OvertimeBudget::new("org_001", "ICU March", day(1), day(31), cap_type, "USD")
            .for_cost_center("ICU")
            .with_amount_cap(dec(cap))
    }

    fn validator_with(budgets: Vec<OvertimeBudget>) -> (BudgetValidator, Arc<RecordingObserver>) {
        let store = Arc::new(InMemoryStore::new());
        for budget in budgets {
            store.save_budget(budget).unwrap();
        }
        let recorder = Arc::new(RecordingObserver::new());
        (BudgetValidator::new(store, recorder.clone()), recorder)
    }

    /// BUD-001: hard cap 1000, 950 spent, request 100.
    #[test]
    fn test_hard_cap_blocks_request() {
        let mut budget = icu_budget("1000", CapType::Hard);
        budget
            .spend(dec("25"), dec("950"), None, None, day(2), "system")
            .unwrap();
        let (validator, _) = validator_with(vec![budget]);

        let capacity = validator
            .check_budget_capacity("ICU", None, dec("2"), dec("100"), day(10))
            .unwrap();

        assert!(!capacity.has_capacity);
        assert!(!capacity.requires_approval);
        assert_eq!(capacity.status, Some(BudgetStatus::Exceeded));
        assert_eq!(capacity.remaining_amount, Some(dec("50")));
        assert_eq!(capacity.percentage_used, dec("105"));
        assert!(capacity.warnings[0].contains("105%"));
        assert_eq!(capacity.thresholds_crossed, vec![BudgetThreshold::Exceeded]);
    }

    #[test]
    fn test_soft_cap_requires_approval() {
        let mut budget = icu_budget("1000", CapType::Soft);
        budget
            .spend(dec("25"), dec("950"), None, None, day(2), "system")
            .unwrap();
        let (validator, _) = validator_with(vec![budget]);

        let capacity = validator
            .check_budget_capacity("ICU", None, dec("2"), dec("100"), day(10))
            .unwrap();
        assert!(capacity.has_capacity);
        assert!(capacity.requires_approval);

        let strict = BudgetRules {
            allow_soft_cap_override: false,
            ..BudgetRules::default()
        };
        let capacity = validator
            .check_budget_capacity_with_rules("ICU", None, dec("2"), dec("100"), day(10), &strict)
            .unwrap();
        assert!(capacity.has_capacity);
        assert!(capacity.requires_approval);
        assert!(capacity.warnings.iter().any(|w| w.contains("no override")));
    }

    #[test]
    fn test_soft_cap_without_override_needs_approval_not_hard_refusal() {
        let budget = icu_budget("100", CapType::Soft);
        let id = budget.id;
        let (validator, _) = validator_with(vec![budget]);
        let strict = BudgetRules {
            allow_soft_cap_override: false,
            ..BudgetRules::default()
        };
        let request = SpendRequest::new(dec("4"), dec("150"), day(10));

        for approved in [false, true] {
            let err = validator
                .check_and_record_spending(id, &request, &strict, approved)
                .unwrap_err();
            assert!(matches!(err, EngineError::BudgetApprovalRequired { .. }));
        }
        let forecast = validator.generate_forecast(id, day(10)).unwrap();
        assert_eq!(forecast.spent_to_date, Decimal::ZERO);
    }

    #[test]
    fn test_out_of_range_requests_are_rejected() {
        let (validator, _) = validator_with(vec![icu_budget("1000", CapType::Hard)]);
        for (hours, amount) in [
            (dec("2"), Decimal::MAX),
            (Decimal::MAX, dec("100")),
            (dec("-1"), dec("100")),
            (dec("2"), dec("-100")),
        ] {
            let err = validator
                .check_budget_capacity("ICU", None, hours, amount, day(10))
                .unwrap_err();
            assert!(matches!(err, EngineError::InvalidInput { .. }));
        }
    }

    #[test]
    fn test_line_spend_reversed_once() {
        let budget = icu_budget("1000", CapType::Hard);
        let id = budget.id;
        let (validator, recorder) = validator_with(vec![budget]);
        let line = Uuid::new_v4();
        let request = SpendRequest::new(dec("2"), dec("75"), day(5)).line(line);

        validator
            .check_and_record_spending(id, &request, &BudgetRules::default(), false)
            .unwrap();
        let err = validator
            .check_and_record_spending(id, &request, &BudgetRules::default(), false)
            .unwrap_err();
        assert!(matches!(err, EngineError::LineAlreadyCharged { .. }));

        let reversed = validator
            .reverse_line_spend(id, line, day(6), "recalculated")
            .unwrap()
            .unwrap();
        assert_eq!(reversed.spent_amount, Decimal::ZERO);
        assert!(validator
            .reverse_line_spend(id, line, day(6), "recalculated")
            .unwrap()
            .is_none());
        assert!(recorder
            .events()
            .iter()
            .any(|e| matches!(e, EngineEvent::BudgetSpendReversed { line_id, .. } if *line_id == line)));
    }

    #[test]
    fn test_no_budget_is_unrestricted_with_warning() {
        let (validator, _) = validator_with(vec![icu_budget("1000", CapType::Hard)]);
        let capacity = validator
            .check_budget_capacity("RADIOLOGY", None, dec("8"), dec("400"), day(10))
            .unwrap();
        assert!(capacity.has_capacity);
        assert_eq!(capacity.budget_id, None);
        assert!(capacity.warnings[0].contains("unrestricted"));
    }

    #[test]
    fn test_project_budget_preferred() {
        let cost_center = icu_budget("1000", CapType::Hard);
        let project = OvertimeBudget::new("org_001", "Winter surge", day(1), day(31), CapType::Hard, "USD")
            .for_cost_center("ICU")
            .for_project("SURGE")
            .with_amount_cap(dec("50"));
        let project_id = project.id;
        let (validator, _) = validator_with(vec![cost_center, project]);

        let capacity = validator
            .check_budget_capacity("ICU", Some("SURGE"), dec("2"), dec("100"), day(10))
            .unwrap();
        assert_eq!(capacity.budget_id, Some(project_id));
        assert!(!capacity.has_capacity);

        let capacity = validator
            .check_budget_capacity("ICU", None, dec("2"), dec("100"), day(10))
            .unwrap();
        assert_ne!(capacity.budget_id, Some(project_id));
        assert!(capacity.has_capacity);
    }

    #[test]
    fn test_budget_outside_period_is_ignored() {
        let (validator, _) = validator_with(vec![icu_budget("1000", CapType::Hard)]);
        let capacity = validator
            .check_budget_capacity(
                "ICU",
                None,
                dec("2"),
                dec("100"),
                NaiveDate::from_ymd_opt(2026, 4, 1).unwrap(),
            )
            .unwrap();
        assert_eq!(capacity.budget_id, None);
    }

    #[test]
    fn test_record_spending_emits_events() {
        let budget = icu_budget("1000", CapType::Hard);
        let id = budget.id;
        let (validator, recorder) = validator_with(vec![budget]);

        let request = SpendRequest::new(dec("20"), dec("850"), day(5))
            .line(Uuid::new_v4())
            .employee("emp_001");
        let updated = validator.record_spending(id, &request).unwrap();

        assert_eq!(updated.spent_amount, dec("850"));
        assert_eq!(updated.status, BudgetStatus::Warning);
        let events = recorder.events();
        assert!(matches!(events[0], EngineEvent::BudgetSpendRecorded { .. }));
        assert!(matches!(
            events[1],
            EngineEvent::BudgetThresholdCrossed {
                threshold: BudgetThreshold::Warning,
                ..
            }
        ));
    }

    #[test]
    fn test_check_and_record_refuses_without_side_effects() {
        let mut budget = icu_budget("1000", CapType::Hard);
        budget
            .spend(dec("25"), dec("950"), None, None, day(2), "system")
            .unwrap();
        let id = budget.id;
        let (validator, _) = validator_with(vec![budget]);

        let request = SpendRequest::new(dec("2"), dec("100"), day(10));
        let err = validator
            .check_and_record_spending(id, &request, &BudgetRules::default(), false)
            .unwrap_err();
        assert!(matches!(err, EngineError::BudgetCapacityExceeded { .. }));

        let forecast = validator.generate_forecast(id, day(10)).unwrap();
        assert_eq!(forecast.spent_to_date, dec("950"));
    }

    #[test]
    fn test_soft_cap_spend_needs_approval_flag() {
        let mut budget = icu_budget("1000", CapType::Soft);
        budget
            .spend(dec("25"), dec("950"), None, None, day(2), "system")
            .unwrap();
        let id = budget.id;
        let (validator, _) = validator_with(vec![budget]);
        let request = SpendRequest::new(dec("2"), dec("100"), day(10));

        let err = validator
            .check_and_record_spending(id, &request, &BudgetRules::default(), false)
            .unwrap_err();
        assert!(matches!(err, EngineError::BudgetApprovalRequired { .. }));

        let updated = validator
            .check_and_record_spending(id, &request, &BudgetRules::default(), true)
            .unwrap();
        assert_eq!(updated.spent_amount, dec("1050"));
        assert_eq!(updated.status, BudgetStatus::Depleted);
        assert_eq!(updated.remaining_amount(), Some(Decimal::ZERO));
    }

    #[test]
    fn test_forecast_is_stored_on_budget() {
        let mut budget = icu_budget("3100", CapType::Soft);
        budget
            .spend(dec("30"), dec("1500"), None, None, day(5), "system")
            .unwrap();
        let id = budget.id;
        let store = Arc::new(InMemoryStore::new());
        store.save_budget(budget).unwrap();
        let validator = BudgetValidator::new(store.clone(), noop());

        let forecast = validator.generate_forecast(id, day(10)).unwrap();
        assert_eq!(forecast.days_remaining, 21);
        assert_eq!(forecast.projected_amount, dec("4650"));
        let stored = store.get_budget(id).unwrap();
        assert_eq!(
            stored.forecast.map(|f| f.projected_amount),
            Some(dec("4650"))
        );
    }

    #[test]
    fn test_alert_scan_and_expiry_sweep() {
        let mut hot = icu_budget("1000", CapType::Soft);
        hot.spend(dec("20"), dec("960"), None, None, day(2), "system")
            .unwrap();
        let quiet = OvertimeBudget::new("org_001", "Feb", day(1), day(1), CapType::Soft, "USD")
            .for_cost_center("ICU")
            .with_amount_cap(dec("1000"));
        let quiet_id = quiet.id;
        let (validator, recorder) = validator_with(vec![hot, quiet]);

        let alerts = validator.scan_alerts(day(10)).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].threshold, BudgetThreshold::Critical);

        let expired = validator.expire_budgets(day(10)).unwrap();
        assert_eq!(expired, vec![quiet_id]);
        assert!(recorder
            .events()
            .iter()
            .any(|e| matches!(e, EngineEvent::BudgetExpired { budget_id } if *budget_id == quiet_id)));
        assert!(validator.expire_budgets(day(10)).unwrap().is_empty());
    }

    proptest! {
        #[test]
        fn prop_remaining_never_negative(
            cap in 100u32..5000,
            spends in proptest::collection::vec((0u32..40, 0u32..2000), 1..12),
        ) {
            let budget = icu_budget(&cap.to_string(), CapType::Soft);
            let id = budget.id;
            let (validator, _) = validator_with(vec![budget]);
            let mut previous = BudgetStatus::Active;
            for (hours, amount) in spends {
                let request = SpendRequest::new(Decimal::from(hours), Decimal::from(amount), day(5));
                let updated = validator.record_spending(id, &request).unwrap();
                let remaining = updated.remaining_amount().unwrap();
                prop_assert!(remaining >= Decimal::ZERO);
                prop_assert!(updated.status >= previous);
                previous = updated.status;
            }
        }
    }
}
