//! Weekly overtime.
//!
//! Only the portion of this shift that pushes the week over the threshold is
//! charged. Hours already attributed to earlier shifts in the same week are
//! never counted again.

use rust_decimal::Decimal;

use crate::error::EngineResult;
use crate::models::{Basis, CalculationStep, QuantityUnit, RateClass};

use super::premium::{PremiumInput, PremiumResult, PremiumSpec, show};

/// Hours of this shift that fall beyond the weekly threshold.
///
/// `min(shift_hours, prior + shift_hours − threshold)`, floored at zero.
///
/// # Example
///
/// ```
/// use overtime_engine::calculation::weekly_overtime_hours;
/// use rust_decimal::Decimal;
///
/// // 36 hours already worked, 8 hour shift, 40 hour week: 4 hours overtime.
/// assert_eq!(
///     weekly_overtime_hours(Decimal::from(36), Decimal::from(8), Decimal::from(40)),
///     Decimal::from(4)
/// );
/// // Already over the threshold: the whole shift is overtime, no more.
/// assert_eq!(
///     weekly_overtime_hours(Decimal::from(45), Decimal::from(8), Decimal::from(40)),
///     Decimal::from(8)
/// );
/// ```
pub fn weekly_overtime_hours(prior_weekly_hours: Decimal, shift_hours: Decimal, threshold: Decimal) -> Decimal {
    // A total too large to represent is past any threshold.
    let over = prior_weekly_hours
        .max(Decimal::ZERO)
        .checked_add(shift_hours)
        .and_then(|total| total.checked_sub(threshold))
        .unwrap_or(shift_hours);
    over.min(shift_hours).max(Decimal::ZERO)
}

/// Evaluates the policy's weekly overtime slot.
pub fn evaluate_weekly_overtime(input: &PremiumInput<'_>) -> EngineResult<Vec<PremiumResult>> {
    let Some(rule) = input.policy.weekly_overtime() else {
        return Ok(Vec::new());
    };

    let threshold = input.policy.thresholds.weekly_hours;
    let prior = input.context.prior_weekly_hours;
    let hours = weekly_overtime_hours(prior, input.worked_hours, threshold);
    if hours <= Decimal::ZERO {
        return Ok(Vec::new());
    }

    let detection = CalculationStep::new(
        0,
        "weekly_overtime_detection",
        "Weekly Overtime Detection",
        "min(shift_hours, prior_weekly_hours + shift_hours − weekly_threshold)",
    )
    .with_input(serde_json::json!({
        "prior_weekly_hours": show(prior),
        "shift_hours": show(input.worked_hours),
        "weekly_threshold": show(threshold),
        "week_starts_on": input.policy.thresholds.week_starts_on.to_string(),
    }))
    .with_output(serde_json::json!({
        "overtime_hours": show(hours),
    }))
    .with_reasoning(format!(
        "{} prior hours plus {} hours this shift passes the {} hour week; {} hours of this shift are weekly overtime",
        show(prior),
        show(input.worked_hours),
        show(threshold),
        show(hours)
    ));

    let result = PremiumSpec {
        rule_id: "weekly_overtime",
        rule_name: "Weekly Overtime",
        rate_class: RateClass::Overtime,
        basis: Basis::Weekly,
        unit: QuantityUnit::Hours,
        multiplier: rule.multiplier,
        earning_code: rule.earning_code.clone(),
        legal_reference: rule
            .legal_reference
            .clone()
            .or_else(|| input.policy.legal_reference.clone()),
    }
    .price(hours, input.context.base_rate, vec![detection])?;

    Ok(vec![result])
}
