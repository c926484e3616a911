//! Overtime result lines and their explanation traces.
//!
//! An [`OvertimeLine`] is one surviving premium for one shift. It carries an
//! [`Explanation`] detailed enough to reconstruct the amount without running
//! the engine again. Lines are never deleted: corrections supersede them.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

use super::{AuditRecord, CompTimePolicy};

/// Rounds a monetary amount to two decimal places, half away from zero.
///
/// # Example
///
/// ```
/// use overtime_engine::models::round_currency;
/// use rust_decimal::Decimal;
/// use std::str::FromStr;
///
/// assert_eq!(round_currency(Decimal::from_str("10.125").unwrap()), Decimal::from_str("10.13").unwrap());
/// assert_eq!(round_currency(Decimal::from_str("10.124").unwrap()), Decimal::from_str("10.12").unwrap());
/// ```
pub fn round_currency(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// A single step in an explanation trace.
///
/// Each step captures the formula applied, its inputs and outputs, and a
/// human-readable reasoning line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationStep {
    /// The sequential step number.
    pub step_number: u32,
    /// Machine identifier of the rule that produced the step.
    pub rule_id: String,
    /// Human-readable name of the rule.
    pub rule_name: String,
    /// The formula applied, e.g. `hours × base_rate × multiplier`.
    pub formula: String,
    /// The input values for this step.
    pub input: serde_json::Value,
    /// The output values from this step.
    pub output: serde_json::Value,
    /// Human-readable explanation of the decision.
    pub reasoning: String,
}

impl CalculationStep {
    /// Creates a step with empty inputs, outputs and reasoning.
    pub fn new(
        step_number: u32,
        rule_id: impl Into<String>,
        rule_name: impl Into<String>,
        formula: impl Into<String>,
    ) -> Self {
        Self {
            step_number,
            rule_id: rule_id.into(),
            rule_name: rule_name.into(),
            formula: formula.into(),
            input: serde_json::Value::Null,
            output: serde_json::Value::Null,
            reasoning: String::new(),
        }
    }

    /// Sets the step's inputs.
    pub fn with_input(mut self, input: serde_json::Value) -> Self {
        self.input = input;
        self
    }

    /// Sets the step's outputs.
    pub fn with_output(mut self, output: serde_json::Value) -> Self {
        self.output = output;
        self
    }

    /// Sets the step's reasoning.
    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = reasoning.into();
        self
    }
}

/// The structured explanation attached to every line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Explanation {
    /// Name of the premium rule that produced the line.
    pub rule_name: String,
    /// Statute or agreement clause, if any.
    pub legal_reference: Option<String>,
    /// Ordered calculation steps.
    pub steps: Vec<CalculationStep>,
    /// Final quantity (hours or flat units).
    pub final_hours: Decimal,
    /// Final effective hourly rate (`base_rate × multiplier`).
    pub final_rate: Decimal,
    /// Final amount.
    pub final_amount: Decimal,
}

/// Categorical label of a pay line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateClass {
    /// Time-and-a-half style overtime.
    Overtime,
    /// Double-time style overtime (tier 2).
    DoubleTime,
    /// Night differential.
    NightDifferential,
    /// Weekend premium.
    WeekendPremium,
    /// Holiday premium.
    HolidayPremium,
    /// Consecutive day premium.
    ConsecutiveDayPremium,
    /// Split shift penalty.
    SplitShiftPenalty,
    /// Missed meal break penalty.
    MealBreakPenalty,
    /// Missed rest break penalty.
    RestBreakPenalty,
    /// Call-out pay.
    CallOut,
    /// Standby pay.
    Standby,
}

/// What a line's quantity was measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Basis {
    /// Hours beyond a daily threshold.
    Daily,
    /// Hours beyond a weekly threshold.
    Weekly,
    /// Nth consecutive day worked.
    Consecutive,
    /// Hours inside a clock window.
    TimeOfDay,
    /// Day of the week.
    DayOfWeek,
    /// Public holiday.
    Holiday,
    /// Hours worked on a call-out.
    CallOut,
    /// Hours on standby.
    OnCall,
    /// Flat penalty.
    Penalty,
    /// A guaranteed minimum was paid instead of actual hours.
    Minimum,
}

/// Unit of a line's quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuantityUnit {
    /// Worked hours.
    Hours,
    /// Flat units of pay (penalties).
    FlatUnits,
}

/// Approval status of a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineStatus {
    /// Awaiting approval.
    Pending,
    /// Approved for payment.
    Approved,
    /// Rejected.
    Rejected,
    /// Paid through payroll.
    Paid,
    /// Replaced by a correction line.
    Superseded,
}

/// Hours banked as time off instead of pay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompTimeConversion {
    /// Hours added to the comp-time balance.
    pub hours_banked: Decimal,
    /// When the conversion happened.
    pub converted_at: DateTime<Utc>,
}

/// One surviving premium for one shift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OvertimeLine {
    /// Line id.
    pub id: Uuid,
    /// The shift the line was calculated for.
    pub shift_id: String,
    /// The employee paid.
    pub employee_id: String,
    /// The policy version applied.
    pub policy_id: Uuid,
    /// The policy version number applied.
    pub policy_version: u32,
    /// Cost centre charged.
    pub cost_center: String,
    /// Project charged, if any.
    pub project: Option<String>,
    /// Date the hours are attributed to.
    pub work_date: NaiveDate,
    /// Rate class label.
    pub rate_class: RateClass,
    /// What the quantity was measured against.
    pub basis: Basis,
    /// Hours or flat units.
    pub quantity: Decimal,
    /// Unit of `quantity`.
    pub unit: QuantityUnit,
    /// Pay multiplier.
    pub multiplier: Decimal,
    /// Base hourly rate.
    pub base_rate: Decimal,
    /// `quantity × base_rate × multiplier`, rounded to cents.
    pub calculated_amount: Decimal,
    /// Currency of `calculated_amount`.
    pub currency: String,
    /// Payroll earning code.
    pub earning_code: String,
    /// Explanation trace.
    pub explanation: Explanation,
    /// Approval status.
    pub status: LineStatus,
    /// Budget the line was charged to.
    pub budget_id: Option<Uuid>,
    /// Comp-time conversion, if banked.
    pub comp_time: Option<CompTimeConversion>,
    /// True when the multiplier replaces base pay rather than adding to it.
    pub replaces_base_pay: bool,
    /// Correction version (starts at 1).
    pub version: u32,
    /// The line this one corrects.
    pub supersedes: Option<Uuid>,
    /// The correction that replaced this line.
    pub superseded_by: Option<Uuid>,
    /// True once exported to payroll.
    pub is_locked: bool,
    /// Payroll batch that locked the line.
    pub payroll_batch_id: Option<String>,
    /// Free-form flags (e.g. clamped negative hours).
    pub metadata: serde_json::Map<String, serde_json::Value>,
    /// Record metadata.
    pub audit: AuditRecord,
}

impl OvertimeLine {
    /// Returns true if `calculated_amount` equals `quantity × base_rate × multiplier` to the cent.
    pub fn amount_is_consistent(&self) -> bool {
        self.calculated_amount == round_currency(self.quantity * self.base_rate * self.multiplier)
    }

    fn ensure_unlocked(&self) -> EngineResult<()> {
        if self.is_locked {
            return Err(EngineError::LineLocked {
                line_id: self.id,
                batch_id: self.payroll_batch_id.clone().unwrap_or_default(),
            });
        }
        Ok(())
    }

    fn ensure_status(&self, allowed: &[LineStatus], action: &str) -> EngineResult<()> {
        if !allowed.contains(&self.status) {
            return Err(EngineError::CalculationError {
                message: format!(
                    "cannot {} line {} in status {:?}",
                    action, self.id, self.status
                ),
                partial_trace: Vec::new(),
            });
        }
        Ok(())
    }

    /// Approves a pending line.
    pub fn approve(&mut self, actor: &str) -> EngineResult<()> {
        self.ensure_unlocked()?;
        self.ensure_status(&[LineStatus::Pending], "approve")?;
        self.status = LineStatus::Approved;
        self.audit.touch(actor);
        Ok(())
    }

    /// Rejects a pending line.
    pub fn reject(&mut self, actor: &str, reason: &str) -> EngineResult<()> {
        self.ensure_unlocked()?;
        self.ensure_status(&[LineStatus::Pending], "reject")?;
        self.status = LineStatus::Rejected;
        self.metadata
            .insert("rejection_reason".to_string(), serde_json::json!(reason));
        self.audit.touch(actor);
        Ok(())
    }

    /// Locks the line under a payroll batch.
    pub fn lock_for_payroll(&mut self, batch_id: &str, actor: &str) -> EngineResult<()> {
        self.ensure_unlocked()?;
        self.ensure_status(&[LineStatus::Pending, LineStatus::Approved], "export")?;
        self.is_locked = true;
        self.payroll_batch_id = Some(batch_id.to_string());
        self.audit.touch(actor);
        Ok(())
    }

    /// Marks an approved, exported line as paid.
    ///
    /// This is the one status change payroll may make after locking.
    pub fn mark_paid(&mut self, actor: &str) -> EngineResult<()> {
        self.ensure_status(&[LineStatus::Approved], "mark paid")?;
        if !self.is_locked {
            return Err(EngineError::CalculationError {
                message: format!("line {} must be exported before it is paid", self.id),
                partial_trace: Vec::new(),
            });
        }
        self.status = LineStatus::Paid;
        self.audit.touch(actor);
        Ok(())
    }

    /// Issues a correction line with a new quantity and rate.
    ///
    /// The correction is pending, unlocked, `version + 1` and references this
    /// line; this line is marked superseded. Allowed on locked lines.
    pub fn supersede(
        &mut self,
        quantity: Decimal,
        base_rate: Decimal,
        reason: &str,
        actor: &str,
    ) -> EngineResult<OvertimeLine> {
        if self.superseded_by.is_some() {
            return Err(EngineError::CalculationError {
                message: format!("line {} has already been superseded", self.id),
                partial_trace: Vec::new(),
            });
        }

        let amount = round_currency(quantity * base_rate * self.multiplier);
        let mut correction = self.clone();
        correction.id = Uuid::new_v4();
        correction.quantity = quantity;
        correction.base_rate = base_rate;
        correction.calculated_amount = amount;
        correction.status = LineStatus::Pending;
        correction.comp_time = None;
        correction.version = self.version + 1;
        correction.supersedes = Some(self.id);
        correction.superseded_by = None;
        correction.is_locked = false;
        correction.payroll_batch_id = None;
        correction.audit = AuditRecord::new(actor);
        correction
            .metadata
            .insert("correction_reason".to_string(), serde_json::json!(reason));

        let step_number = correction.explanation.steps.len() as u32 + 1;
        correction.explanation.steps.push(
            CalculationStep::new(
                step_number,
                "correction",
                "Correction",
                "quantity × base_rate × multiplier",
            )
            .with_input(serde_json::json!({
                "supersedes": self.id.to_string(),
                "quantity": quantity.normalize().to_string(),
                "base_rate": base_rate.normalize().to_string(),
                "multiplier": self.multiplier.normalize().to_string(),
            }))
            .with_output(serde_json::json!({
                "amount": amount.to_string(),
            }))
            .with_reasoning(format!("Correction of line {}: {}", self.id, reason)),
        );
        correction.explanation.final_hours = quantity;
        correction.explanation.final_rate = base_rate * self.multiplier;
        correction.explanation.final_amount = amount;

        self.superseded_by = Some(correction.id);
        self.status = LineStatus::Superseded;
        self.audit.touch(actor);
        Ok(correction)
    }

    /// Banks the line's hours as comp time instead of pay.
    ///
    /// Banks `quantity × accrual_multiplier` hours, capped so the balance never
    /// exceeds the policy maximum. Returns the hours banked.
    pub fn convert_to_comp_time(
        &mut self,
        policy: &CompTimePolicy,
        current_balance: Decimal,
        actor: &str,
    ) -> EngineResult<Decimal> {
        self.ensure_unlocked()?;
        self.ensure_status(&[LineStatus::Pending, LineStatus::Approved], "bank")?;
        if !policy.enabled {
            return Err(EngineError::CalculationError {
                message: "comp time is not enabled for this policy".to_string(),
                partial_trace: Vec::new(),
            });
        }
        if self.unit != QuantityUnit::Hours || self.comp_time.is_some() {
            return Err(EngineError::CalculationError {
                message: format!("line {} cannot be banked as comp time", self.id),
                partial_trace: Vec::new(),
            });
        }

        let available = (policy.max_balance_hours - current_balance).max(Decimal::ZERO);
        let hours_banked = (self.quantity * policy.accrual_multiplier).min(available);

        self.comp_time = Some(CompTimeConversion {
            hours_banked,
            converted_at: Utc::now(),
        });
        self.audit.touch(actor);
        Ok(hours_banked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn sample_line() -> OvertimeLine {
        OvertimeLine {
            id: Uuid::new_v4(),
            shift_id: "shift_001".to_string(),
            employee_id: "emp_001".to_string(),
            policy_id: Uuid::nil(),
            policy_version: 1,
            cost_center: "CC-100".to_string(),
            project: None,
            work_date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
            rate_class: RateClass::Overtime,
            basis: Basis::Daily,
            quantity: dec("2"),
            unit: QuantityUnit::Hours,
            multiplier: dec("1.5"),
            base_rate: dec("25"),
            calculated_amount: dec("75.00"),
            currency: "USD".to_string(),
            earning_code: "OT_DAILY".to_string(),
            explanation: Explanation {
                rule_name: "Daily overtime".to_string(),
                legal_reference: None,
                steps: vec![],
                final_hours: dec("2"),
                final_rate: dec("37.5"),
                final_amount: dec("75.00"),
            },
            status: LineStatus::Pending,
            budget_id: None,
            comp_time: None,
            replaces_base_pay: false,
            version: 1,
            supersedes: None,
            superseded_by: None,
            is_locked: false,
            payroll_batch_id: None,
            metadata: serde_json::Map::new(),
            audit: AuditRecord::default(),
        }
    }

    fn comp_policy() -> CompTimePolicy {
        CompTimePolicy {
            enabled: true,
            accrual_multiplier: dec("1.5"),
            max_balance_hours: dec("10"),
        }
    }

    #[test]
    fn test_amount_consistency() {
        let mut line = sample_line();
        assert!(line.amount_is_consistent());
        line.calculated_amount = dec("74.99");
        assert!(!line.amount_is_consistent());
    }

    #[test]
    fn test_approve_then_lock_then_pay() {
        let mut line = sample_line();
        line.approve("supervisor").unwrap();
        line.lock_for_payroll("PR-2026-03", "payroll").unwrap();
        assert!(line.is_locked);
        line.mark_paid("payroll").unwrap();
        assert_eq!(line.status, LineStatus::Paid);
    }

    #[test]
    fn test_locked_line_refuses_mutation() {
        let mut line = sample_line();
        line.lock_for_payroll("PR-2026-03", "payroll").unwrap();

        assert!(matches!(
            line.approve("supervisor"),
            Err(EngineError::LineLocked { .. })
        ));
        assert!(matches!(
            line.reject("supervisor", "late"),
            Err(EngineError::LineLocked { .. })
        ));
        assert!(matches!(
            line.convert_to_comp_time(&comp_policy(), Decimal::ZERO, "emp_001"),
            Err(EngineError::LineLocked { .. })
        ));
    }

    #[test]
    fn test_pay_requires_export() {
        let mut line = sample_line();
        line.approve("supervisor").unwrap();
        assert!(line.mark_paid("payroll").is_err());
    }

    #[test]
    fn test_supersede_locked_line() {
        let mut line = sample_line();
        line.lock_for_payroll("PR-2026-03", "payroll").unwrap();

        let correction = line
            .supersede(dec("3"), dec("25"), "missed punch", "payroll_admin")
            .unwrap();

        assert_eq!(correction.version, 2);
        assert_eq!(correction.supersedes, Some(line.id));
        assert_eq!(correction.calculated_amount, dec("112.50"));
        assert!(!correction.is_locked);
        assert_eq!(correction.status, LineStatus::Pending);
        assert!(correction.amount_is_consistent());
        assert_eq!(line.superseded_by, Some(correction.id));
        assert_eq!(line.status, LineStatus::Superseded);
        assert!(line.is_locked);

        assert!(line.supersede(dec("4"), dec("25"), "again", "payroll_admin").is_err());
    }

    #[test]
    fn test_comp_time_capped_by_balance() {
        let mut line = sample_line();
        let banked = line
            .convert_to_comp_time(&comp_policy(), dec("8"), "emp_001")
            .unwrap();
        assert_eq!(banked, dec("2"));
        assert_eq!(line.comp_time.as_ref().unwrap().hours_banked, dec("2"));

        let mut line = sample_line();
        let banked = line
            .convert_to_comp_time(&comp_policy(), Decimal::ZERO, "emp_001")
            .unwrap();
        assert_eq!(banked, dec("3.0"));
    }

    #[test]
    fn test_comp_time_disabled() {
        let mut line = sample_line();
        let policy = CompTimePolicy {
            enabled: false,
            ..comp_policy()
        };
        assert!(line
            .convert_to_comp_time(&policy, Decimal::ZERO, "emp_001")
            .is_err());
    }

    #[test]
    fn test_rejection_records_reason() {
        let mut line = sample_line();
        line.reject("supervisor", "not authorised").unwrap();
        assert_eq!(line.status, LineStatus::Rejected);
        assert_eq!(line.metadata["rejection_reason"], "not authorised");
    }
}
