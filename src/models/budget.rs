//! Overtime budget model.
//!
//! An [`OvertimeBudget`] caps overtime for one cost centre or project over one
//! period. Running totals change only through transactions appended to its
//! log, and status is recomputed after each one.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

use super::AuditRecord;

/// Whether a cap blocks or only warns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CapType {
    /// Requests beyond the cap are refused.
    Hard,
    /// Requests beyond the cap need approval.
    Soft,
}

/// Budget status, ordered by severity.
///
/// Within a period status only moves forward, except through a reallocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BudgetStatus {
    /// Below the warning threshold.
    Active,
    /// At or above the warning threshold.
    Warning,
    /// Spent plus committed has reached the cap.
    Exceeded,
    /// Actual spend alone has reached the cap.
    Depleted,
    /// The period has ended.
    Expired,
}

/// Threshold levels that raise alerts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BudgetThreshold {
    /// Warning percentage reached.
    Warning,
    /// Critical percentage reached.
    Critical,
    /// 100% reached.
    Exceeded,
}

/// Kind of budget transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// Hours/amount reserved for approved but unpaid work.
    Commitment,
    /// A reservation released without spending.
    Release,
    /// Actual spend.
    Spend,
    /// Spend returned because the line it paid for was superseded.
    Reversal,
    /// Cap change.
    Reallocation,
    /// Period closed.
    Expiry,
}

/// One entry of a budget's append-only log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetTransaction {
    /// Transaction id.
    pub id: Uuid,
    /// Kind of transaction.
    pub kind: TransactionType,
    /// When the transaction was recorded.
    pub recorded_at: DateTime<Utc>,
    /// Business date the transaction applies to.
    pub occurred_on: NaiveDate,
    /// Hours moved.
    pub hours: Decimal,
    /// Amount moved.
    pub amount: Decimal,
    /// Remaining amount before the transaction.
    pub balance_before: Decimal,
    /// Remaining amount after the transaction.
    pub balance_after: Decimal,
    /// Overtime line the transaction relates to.
    pub line_id: Option<Uuid>,
    /// Employee the transaction relates to.
    pub employee_id: Option<String>,
    /// Free-text note.
    pub note: Option<String>,
}

/// Latest forecast stored on a budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastSnapshot {
    /// Projected spend at period end.
    pub projected_amount: Decimal,
    /// Projected overrun as a percentage of the cap (zero if on track).
    pub projected_overrun_pct: Decimal,
    /// When the forecast was generated.
    pub generated_at: DateTime<Utc>,
}

/// An overtime budget for one cost centre or project over one period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OvertimeBudget {
    /// Budget id.
    pub id: Uuid,
    /// Owning organization.
    pub organization_id: String,
    /// Display name.
    pub name: String,
    /// Cost centre scope.
    pub cost_center: Option<String>,
    /// Project scope; takes precedence over cost centre when both budgets exist.
    pub project: Option<String>,
    /// First day of the period.
    pub period_start: NaiveDate,
    /// Last day of the period.
    pub period_end: NaiveDate,
    /// Hour cap.
    pub cap_hours: Option<Decimal>,
    /// Amount cap.
    pub cap_amount: Option<Decimal>,
    /// Hard or soft cap.
    pub cap_type: CapType,
    /// Currency of the amounts.
    pub currency: String,
    /// Hours spent.
    pub spent_hours: Decimal,
    /// Amount spent.
    pub spent_amount: Decimal,
    /// Hours committed.
    pub committed_hours: Decimal,
    /// Amount committed.
    pub committed_amount: Decimal,
    /// Warning threshold percentage.
    pub warning_threshold_pct: Decimal,
    /// Critical threshold percentage.
    pub critical_threshold_pct: Decimal,
    /// Current status.
    pub status: BudgetStatus,
    /// Append-only transaction log.
    pub transactions: Vec<BudgetTransaction>,
    /// Latest forecast.
    pub forecast: Option<ForecastSnapshot>,
    /// Record metadata; `revision` serves as the optimistic concurrency version.
    pub audit: AuditRecord,
}

fn hundred() -> Decimal {
    Decimal::from(100)
}

fn checked_total(field: &str, a: Decimal, b: Decimal) -> EngineResult<Decimal> {
    a.checked_add(b).ok_or_else(|| EngineError::InvalidInput {
        field: field.to_string(),
        message: format!("{} + {} overflows", a, b),
    })
}

impl OvertimeBudget {
    /// Creates an active budget with empty totals.
    ///
    /// # Example
    ///
    /// ```
    /// use overtime_engine::models::{BudgetStatus, CapType, OvertimeBudget};
    /// use chrono::NaiveDate;
    /// use rust_decimal::Decimal;
    ///
    /// let budget = OvertimeBudget::new(
    ///     "org_001",
    ///     "ICU overtime March",
    ///     NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
    ///     NaiveDate::from_ymd_opt(2026, 3, 31).unwrap(),
    ///     CapType::Hard,
    ///     "USD",
    /// )
    /// .for_cost_center("ICU")
    /// .with_amount_cap(Decimal::from(1000));
    ///
    /// assert_eq!(budget.status, BudgetStatus::Active);
    /// assert_eq!(budget.remaining_amount(), Some(Decimal::from(1000)));
    /// ```
    pub fn new(
        organization_id: impl Into<String>,
        name: impl Into<String>,
        period_start: NaiveDate,
        period_end: NaiveDate,
        cap_type: CapType,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            organization_id: organization_id.into(),
            name: name.into(),
            cost_center: None,
            project: None,
            period_start,
            period_end,
            cap_hours: None,
            cap_amount: None,
            cap_type,
            currency: currency.into(),
            spent_hours: Decimal::ZERO,
            spent_amount: Decimal::ZERO,
            committed_hours: Decimal::ZERO,
            committed_amount: Decimal::ZERO,
            warning_threshold_pct: Decimal::from(80),
            critical_threshold_pct: Decimal::from(95),
            status: BudgetStatus::Active,
            transactions: Vec::new(),
            forecast: None,
            audit: AuditRecord::default(),
        }
    }

    /// Scopes the budget to a cost centre.
    pub fn for_cost_center(mut self, cost_center: impl Into<String>) -> Self {
        self.cost_center = Some(cost_center.into());
        self
    }

    /// Scopes the budget to a project.
    pub fn for_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    /// Sets the amount cap.
    pub fn with_amount_cap(mut self, cap: Decimal) -> Self {
        self.cap_amount = Some(cap);
        self
    }

    /// Sets the hour cap.
    pub fn with_hour_cap(mut self, cap: Decimal) -> Self {
        self.cap_hours = Some(cap);
        self
    }

    /// Sets warning and critical thresholds.
    pub fn with_thresholds(mut self, warning_pct: Decimal, critical_pct: Decimal) -> Self {
        self.warning_threshold_pct = warning_pct;
        self.critical_threshold_pct = critical_pct;
        self
    }

    /// Returns true if `date` falls inside the period.
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.period_start <= date && date <= self.period_end
    }

    /// Amount left: `cap − (spent + committed)`, clamped at zero.
    pub fn remaining_amount(&self) -> Option<Decimal> {
        self.cap_amount
            .map(|cap| (cap - self.spent_amount - self.committed_amount).max(Decimal::ZERO))
    }

    /// Hours left: `cap − (spent + committed)`, clamped at zero.
    pub fn remaining_hours(&self) -> Option<Decimal> {
        self.cap_hours
            .map(|cap| (cap - self.spent_hours - self.committed_hours).max(Decimal::ZERO))
    }

    /// Percentage of the cap used by spend plus commitments.
    pub fn percentage_used(&self) -> Decimal {
        self.percentage_with(Decimal::ZERO, Decimal::ZERO)
    }

    /// Percentage of the cap that would be used after adding `hours` and `amount`.
    ///
    /// Measured on the amount cap when there is one, otherwise on the hour cap.
    /// Without any cap the budget is never consumed. Usage too large to
    /// represent saturates at `Decimal::MAX`.
    pub fn percentage_with(&self, hours: Decimal, amount: Decimal) -> Decimal {
        let (used, cap) = match (self.cap_amount, self.cap_hours) {
            (Some(cap), _) => (
                self.spent_amount
                    .checked_add(self.committed_amount)
                    .and_then(|t| t.checked_add(amount)),
                cap,
            ),
            (None, Some(cap)) => (
                self.spent_hours
                    .checked_add(self.committed_hours)
                    .and_then(|t| t.checked_add(hours)),
                cap,
            ),
            (None, None) => return Decimal::ZERO,
        };
        let Some(used) = used else {
            return Decimal::MAX;
        };
        if cap <= Decimal::ZERO {
            return if used > Decimal::ZERO {
                hundred()
            } else {
                Decimal::ZERO
            };
        }
        used.checked_div(cap)
            .and_then(|ratio| ratio.checked_mul(hundred()))
            .map_or(Decimal::MAX, |pct| pct.round_dp(2))
    }

    fn spent_percentage(&self) -> Decimal {
        match (self.cap_amount, self.cap_hours) {
            (Some(cap), _) if cap > Decimal::ZERO => (self.spent_amount / cap)
                .checked_mul(hundred())
                .unwrap_or(Decimal::MAX),
            (None, Some(cap)) if cap > Decimal::ZERO => (self.spent_hours / cap)
                .checked_mul(hundred())
                .unwrap_or(Decimal::MAX),
            (Some(_), _) | (None, Some(_)) => hundred(),
            (None, None) => Decimal::ZERO,
        }
    }

    /// Status implied by the totals (ignoring monotonicity and expiry).
    pub fn derived_status(&self) -> BudgetStatus {
        let used = self.percentage_used();
        if self.cap_amount.is_none() && self.cap_hours.is_none() {
            BudgetStatus::Active
        } else if self.spent_percentage() >= hundred() {
            BudgetStatus::Depleted
        } else if used >= hundred() {
            BudgetStatus::Exceeded
        } else if used >= self.warning_threshold_pct {
            BudgetStatus::Warning
        } else {
            BudgetStatus::Active
        }
    }

    /// Status the budget would have after committing `hours` and `amount`.
    pub fn projected_status(&self, hours: Decimal, amount: Decimal) -> BudgetStatus {
        let mut projected = self.clone();
        projected.committed_hours = projected.committed_hours.checked_add(hours).unwrap_or(Decimal::MAX);
        projected.committed_amount = projected
            .committed_amount
            .checked_add(amount)
            .unwrap_or(Decimal::MAX);
        projected.status.max(projected.derived_status())
    }

    /// Hours and amount currently spent on `line_id`, net of reversals.
    pub fn net_spend_for_line(&self, line_id: Uuid) -> (Decimal, Decimal) {
        self.transactions
            .iter()
            .filter(|t| t.line_id == Some(line_id))
            .fold((Decimal::ZERO, Decimal::ZERO), |(h, a), t| match t.kind {
                TransactionType::Spend => (h + t.hours, a + t.amount),
                TransactionType::Reversal => (h - t.hours, a - t.amount),
                _ => (h, a),
            })
    }

    /// Threshold levels passed when usage moves from `before_pct` to `after_pct`.
    pub fn thresholds_crossed(&self, before_pct: Decimal, after_pct: Decimal) -> Vec<BudgetThreshold> {
        [
            (BudgetThreshold::Warning, self.warning_threshold_pct),
            (BudgetThreshold::Critical, self.critical_threshold_pct),
            (BudgetThreshold::Exceeded, hundred()),
        ]
        .into_iter()
        .filter(|(_, level)| before_pct < *level && after_pct >= *level)
        .map(|(threshold, _)| threshold)
        .collect()
    }

    /// Highest threshold currently at or above.
    pub fn current_threshold(&self) -> Option<BudgetThreshold> {
        self.thresholds_crossed(Decimal::MIN, self.percentage_used())
            .into_iter()
            .max()
    }

    fn ensure_open(&self) -> EngineResult<()> {
        if self.status == BudgetStatus::Expired {
            return Err(EngineError::CalculationError {
                message: format!("budget {} has expired", self.id),
                partial_trace: Vec::new(),
            });
        }
        Ok(())
    }

    fn balance(&self) -> Decimal {
        self.remaining_amount()
            .or_else(|| self.remaining_hours())
            .unwrap_or(Decimal::ZERO)
    }

    #[allow(clippy::too_many_arguments)]
    fn append(
        &mut self,
        kind: TransactionType,
        occurred_on: NaiveDate,
        hours: Decimal,
        amount: Decimal,
        line_id: Option<Uuid>,
        employee_id: Option<&str>,
        note: Option<String>,
        balance_before: Decimal,
    ) -> &BudgetTransaction {
        let balance_after = self.balance();
        self.transactions.push(BudgetTransaction {
            id: Uuid::new_v4(),
            kind,
            recorded_at: Utc::now(),
            occurred_on,
            hours,
            amount,
            balance_before,
            balance_after,
            line_id,
            employee_id: employee_id.map(str::to_string),
            note,
        });
        let index = self.transactions.len() - 1;
        &self.transactions[index]
    }

    fn advance_status(&mut self) {
        self.status = self.status.max(self.derived_status());
    }

    /// Reserves hours and amount for approved, unpaid work.
    pub fn commit(
        &mut self,
        hours: Decimal,
        amount: Decimal,
        line_id: Option<Uuid>,
        occurred_on: NaiveDate,
        actor: &str,
    ) -> EngineResult<&BudgetTransaction> {
        self.ensure_open()?;
        let before = self.balance();
        let committed_hours = checked_total("hours", self.committed_hours, hours)?;
        let committed_amount = checked_total("amount", self.committed_amount, amount)?;
        self.committed_hours = committed_hours;
        self.committed_amount = committed_amount;
        self.advance_status();
        self.audit.touch(actor);
        Ok(self.append(
            TransactionType::Commitment,
            occurred_on,
            hours,
            amount,
            line_id,
            None,
            None,
            before,
        ))
    }

    /// Releases a reservation (e.g. the line was rejected).
    pub fn release(
        &mut self,
        hours: Decimal,
        amount: Decimal,
        line_id: Option<Uuid>,
        occurred_on: NaiveDate,
        actor: &str,
    ) -> EngineResult<&BudgetTransaction> {
        self.ensure_open()?;
        let before = self.balance();
        let hours = hours.min(self.committed_hours);
        let amount = amount.min(self.committed_amount);
        self.committed_hours -= hours;
        self.committed_amount -= amount;
        self.audit.touch(actor);
        Ok(self.append(
            TransactionType::Release,
            occurred_on,
            hours,
            amount,
            line_id,
            None,
            None,
            before,
        ))
    }

    /// Records actual spend and recomputes status.
    ///
    /// Spend against a line that was committed first consumes the commitment.
    /// A line that already carries spend on this budget is refused with
    /// `LineAlreadyCharged` until that spend is reversed.
    pub fn spend(
        &mut self,
        hours: Decimal,
        amount: Decimal,
        line_id: Option<Uuid>,
        employee_id: Option<&str>,
        occurred_on: NaiveDate,
        actor: &str,
    ) -> EngineResult<&BudgetTransaction> {
        self.ensure_open()?;
        let before = self.balance();
        let spent_hours = checked_total("hours", self.spent_hours, hours)?;
        let spent_amount = checked_total("amount", self.spent_amount, amount)?;

        if let Some(line) = line_id {
            let (charged_hours, charged_amount) = self.net_spend_for_line(line);
            if charged_hours > Decimal::ZERO || charged_amount > Decimal::ZERO {
                return Err(EngineError::LineAlreadyCharged {
                    line_id: line,
                    budget_id: self.id,
                });
            }
            let committed = self
                .transactions
                .iter()
                .filter(|t| t.line_id == Some(line))
                .fold((Decimal::ZERO, Decimal::ZERO), |(h, a), t| match t.kind {
                    TransactionType::Commitment => (h + t.hours, a + t.amount),
                    TransactionType::Release | TransactionType::Spend => (h - t.hours, a - t.amount),
                    _ => (h, a),
                });
            self.committed_hours -= committed.0.clamp(Decimal::ZERO, hours).min(self.committed_hours);
            self.committed_amount -= committed
                .1
                .clamp(Decimal::ZERO, amount)
                .min(self.committed_amount);
        }

        self.spent_hours = spent_hours;
        self.spent_amount = spent_amount;
        self.advance_status();
        self.audit.touch(actor);
        Ok(self.append(
            TransactionType::Spend,
            occurred_on,
            hours,
            amount,
            line_id,
            employee_id,
            None,
            before,
        ))
    }

    /// Returns the spend recorded for `line_id` to the budget.
    ///
    /// Used when the line is superseded by a recalculation. Returns `None`
    /// when the line has no outstanding spend. Status is left where it is.
    pub fn reverse_spend(
        &mut self,
        line_id: Uuid,
        occurred_on: NaiveDate,
        reason: &str,
        actor: &str,
    ) -> Option<&BudgetTransaction> {
        let (hours, amount) = self.net_spend_for_line(line_id);
        if hours <= Decimal::ZERO && amount <= Decimal::ZERO {
            return None;
        }
        let before = self.balance();
        self.spent_hours = (self.spent_hours - hours).max(Decimal::ZERO);
        self.spent_amount = (self.spent_amount - amount).max(Decimal::ZERO);
        self.audit.touch(actor);
        Some(self.append(
            TransactionType::Reversal,
            occurred_on,
            hours,
            amount,
            Some(line_id),
            None,
            Some(reason.to_string()),
            before,
        ))
    }

    /// Changes the caps. The only transaction that may move status backwards.
    pub fn reallocate(
        &mut self,
        cap_hours: Option<Decimal>,
        cap_amount: Option<Decimal>,
        reason: &str,
        occurred_on: NaiveDate,
        actor: &str,
    ) -> EngineResult<&BudgetTransaction> {
        self.ensure_open()?;
        let before = self.balance();
        let delta_amount = match (cap_amount, self.cap_amount) {
            (Some(new), Some(old)) => new - old,
            (Some(new), None) => new,
            _ => Decimal::ZERO,
        };
        let delta_hours = match (cap_hours, self.cap_hours) {
            (Some(new), Some(old)) => new - old,
            (Some(new), None) => new,
            _ => Decimal::ZERO,
        };
        self.cap_hours = cap_hours;
        self.cap_amount = cap_amount;
        self.status = self.derived_status();
        self.audit.touch(actor);
        Ok(self.append(
            TransactionType::Reallocation,
            occurred_on,
            delta_hours,
            delta_amount,
            None,
            None,
            Some(reason.to_string()),
            before,
        ))
    }

    /// Closes the budget if `today` is past the period end. Returns true if it expired now.
    pub fn expire_if_due(&mut self, today: NaiveDate, actor: &str) -> bool {
        if self.status == BudgetStatus::Expired || today <= self.period_end {
            return false;
        }
        let before = self.balance();
        self.status = BudgetStatus::Expired;
        self.audit.touch(actor);
        self.append(
            TransactionType::Expiry,
            today,
            Decimal::ZERO,
            Decimal::ZERO,
            None,
            None,
            None,
            before,
        );
        true
    }
}
