//! Shared types for premium evaluation.
//!
//! Every premium evaluator reads the same [`PremiumInput`] and returns zero or
//! more [`PremiumResult`]s. No evaluator mutates shared state.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};
use crate::models::{
    Basis, CalculationStep, Policy, QuantityUnit, RateClass, Shift, round_currency,
};

/// Rolling context supplied by the caller for one calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationContext {
    /// Base hourly rate.
    pub base_rate: Decimal,
    /// Hours already worked this week before this shift.
    #[serde(default)]
    pub prior_weekly_hours: Decimal,
    /// Consecutive days worked, counting the day of this shift.
    #[serde(default)]
    pub consecutive_days_worked: u32,
}

impl CalculationContext {
    /// Creates a context with no prior hours and a one-day run.
    pub fn new(base_rate: Decimal) -> Self {
        Self {
            base_rate,
            prior_weekly_hours: Decimal::ZERO,
            consecutive_days_worked: 1,
        }
    }
}

/// Read-only input shared by all evaluators.
#[derive(Debug, Clone, Copy)]
pub struct PremiumInput<'a> {
    /// The completed shift.
    pub shift: &'a Shift,
    /// The applicable policy.
    pub policy: &'a Policy,
    /// Worked hours after rounding.
    pub worked_hours: Decimal,
    /// Caller-supplied rolling context.
    pub context: &'a CalculationContext,
}

/// A fired premium, before stacking resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PremiumResult {
    /// Machine identifier of the rule.
    pub rule_id: String,
    /// Human-readable rule name.
    pub rule_name: String,
    /// Rate class label.
    pub rate_class: RateClass,
    /// Basis of the quantity.
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
    pub amount: Decimal,
    /// Payroll earning code.
    pub earning_code: String,
    /// Statute or agreement clause.
    pub legal_reference: Option<String>,
    /// True once a `REPLACE` strategy selected this premium.
    pub replaces_base_pay: bool,
    /// Explanation steps, in order.
    pub steps: Vec<CalculationStep>,
}

/// Describes a premium before it is priced.
#[derive(Debug, Clone)]
pub struct PremiumSpec {
    /// Machine identifier of the rule.
    pub rule_id: &'static str,
    /// Human-readable rule name.
    pub rule_name: &'static str,
    /// Rate class label.
    pub rate_class: RateClass,
    /// Basis of the quantity.
    pub basis: Basis,
    /// Unit of the quantity.
    pub unit: QuantityUnit,
    /// Pay multiplier.
    pub multiplier: Decimal,
    /// Payroll earning code.
    pub earning_code: String,
    /// Statute or agreement clause.
    pub legal_reference: Option<String>,
}

impl PremiumSpec {
    /// Prices `quantity` at `base_rate` and appends the pricing step.
    ///
    /// `steps` holds the rule-specific steps recorded so far; on overflow they
    /// are returned inside the error.
    pub fn price(
        self,
        quantity: Decimal,
        base_rate: Decimal,
        mut steps: Vec<CalculationStep>,
    ) -> EngineResult<PremiumResult> {
        let raw = quantity
            .checked_mul(base_rate)
            .and_then(|v| v.checked_mul(self.multiplier));
        let Some(raw) = raw else {
            return Err(EngineError::CalculationError {
                message: format!(
                    "{}: amount overflow for {} × {} × {}",
                    self.rule_id, quantity, base_rate, self.multiplier
                ),
                partial_trace: steps,
            });
        };
        let amount = round_currency(raw);
        let rate = base_rate.checked_mul(self.multiplier).unwrap_or(Decimal::MAX);

        let unit_label = match self.unit {
            QuantityUnit::Hours => "hours",
            QuantityUnit::FlatUnits => "units",
        };
        steps.push(
            CalculationStep::new(
                0,
                format!("{}_amount", self.rule_id),
                format!("{} Amount", self.rule_name),
                "quantity × base_rate × multiplier",
            )
            .with_input(serde_json::json!({
                "quantity": quantity.normalize().to_string(),
                "unit": unit_label,
                "base_rate": base_rate.normalize().to_string(),
                "multiplier": self.multiplier.normalize().to_string(),
            }))
            .with_output(serde_json::json!({
                "rate": rate.normalize().to_string(),
                "amount": amount.to_string(),
            }))
            .with_reasoning(format!(
                "{} {} × ${} × {} = ${}",
                quantity.normalize(),
                unit_label,
                base_rate.normalize(),
                self.multiplier.normalize(),
                amount
            )),
        );

        Ok(PremiumResult {
            rule_id: self.rule_id.to_string(),
            rule_name: self.rule_name.to_string(),
            rate_class: self.rate_class,
            basis: self.basis,
            quantity,
            unit: self.unit,
            multiplier: self.multiplier,
            base_rate,
            amount,
            earning_code: self.earning_code,
            legal_reference: self.legal_reference,
            replaces_base_pay: false,
            steps,
        })
    }
}

/// Formats a decimal for explanation steps.
pub(crate) fn show(value: Decimal) -> String {
    value.normalize().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn spec() -> PremiumSpec {
        PremiumSpec {
            rule_id: "daily_overtime_tier1",
            rule_name: "Daily Overtime Tier 1",
            rate_class: RateClass::Overtime,
            basis: Basis::Daily,
            unit: QuantityUnit::Hours,
            multiplier: dec("1.5"),
            earning_code: "OT_DAILY".to_string(),
            legal_reference: None,
        }
    }

    #[test]
    fn test_price_rounds_to_cents() {
        let result = spec().price(dec("1.3333"), dec("25.55"), vec![]).unwrap();
        // 1.3333 × 25.55 × 1.5 = 51.09870...
        assert_eq!(result.amount, dec("51.10"));
        assert_eq!(result.steps.len(), 1);
        assert_eq!(result.steps[0].rule_id, "daily_overtime_tier1_amount");
    }

    #[test]
    fn test_price_overflow_keeps_partial_trace() {
        let steps = vec![CalculationStep::new(0, "detect", "Detect", "x")];
        let err = spec()
            .price(Decimal::MAX, Decimal::MAX, steps)
            .unwrap_err();
        assert_eq!(err.partial_trace().len(), 1);
    }
}
