//! Daily overtime.
//!
//! Hours beyond the policy's daily threshold are paid at tier 1, capped at
//! the tier 2 boundary when one exists; hours beyond the boundary are paid at
//! tier 2.

use rust_decimal::Decimal;

use crate::error::EngineResult;
use crate::models::{Basis, CalculationStep, QuantityUnit, RateClass};

use super::premium::{PremiumInput, PremiumResult, PremiumSpec, show};

/// Splits worked hours into tier 1 and tier 2 daily overtime.
///
/// # Example
///
/// ```
/// use overtime_engine::calculation::split_daily_overtime;
/// use rust_decimal::Decimal;
///
/// let (tier1, tier2) = split_daily_overtime(Decimal::from(13), Decimal::from(8), Some(Decimal::from(12)));
/// assert_eq!(tier1, Decimal::from(4));
/// assert_eq!(tier2, Decimal::from(1));
/// ```
pub fn split_daily_overtime(
    worked_hours: Decimal,
    threshold: Decimal,
    tier2_after: Option<Decimal>,
) -> (Decimal, Decimal) {
    if worked_hours <= threshold {
        return (Decimal::ZERO, Decimal::ZERO);
    }
    match tier2_after {
        Some(boundary) if worked_hours > boundary => {
            (boundary - threshold, worked_hours - boundary)
        }
        _ => (worked_hours - threshold, Decimal::ZERO),
    }
}

/// Evaluates the policy's daily overtime slot. Returns up to two premiums.
pub fn evaluate_daily_overtime(input: &PremiumInput<'_>) -> EngineResult<Vec<PremiumResult>> {
    let (Some(rule), Some(threshold)) = (
        input.policy.daily_overtime(),
        input.policy.thresholds.daily_hours,
    ) else {
        return Ok(Vec::new());
    };

    let boundary = rule.tier2.as_ref().map(|t| t.after_hours);
    let (tier1_hours, tier2_hours) = split_daily_overtime(input.worked_hours, threshold, boundary);
    if tier1_hours <= Decimal::ZERO {
        return Ok(Vec::new());
    }

    let detection = CalculationStep::new(
        0,
        "daily_overtime_detection",
        "Daily Overtime Detection",
        "tier1 = min(worked, tier2_after) − daily_threshold; tier2 = worked − tier2_after",
    )
    .with_input(serde_json::json!({
        "worked_hours": show(input.worked_hours),
        "daily_threshold": show(threshold),
        "tier2_after": boundary.map(show),
    }))
    .with_output(serde_json::json!({
        "tier1_hours": show(tier1_hours),
        "tier2_hours": show(tier2_hours),
    }))
    .with_reasoning(format!(
        "{} hours worked exceeds the {} hour daily threshold by {} hours",
        show(input.worked_hours),
        show(threshold),
        show(input.worked_hours - threshold)
    ));

    let legal_reference = rule
        .legal_reference
        .clone()
        .or_else(|| input.policy.legal_reference.clone());
    let base_rate = input.context.base_rate;
    let mut results = Vec::new();

    results.push(
        PremiumSpec {
            rule_id: "daily_overtime_tier1",
            rule_name: "Daily Overtime Tier 1",
            rate_class: RateClass::Overtime,
            basis: Basis::Daily,
            unit: QuantityUnit::Hours,
            multiplier: rule.multiplier,
            earning_code: rule.earning_code.clone(),
            legal_reference: legal_reference.clone(),
        }
        .price(tier1_hours, base_rate, vec![detection.clone()])?,
    );

    if let Some(tier2) = &rule.tier2
        && tier2_hours > Decimal::ZERO
    {
        results.push(
            PremiumSpec {
                rule_id: "daily_overtime_tier2",
                rule_name: "Daily Overtime Tier 2",
                rate_class: RateClass::DoubleTime,
                basis: Basis::Daily,
                unit: QuantityUnit::Hours,
                multiplier: tier2.multiplier,
                earning_code: tier2.earning_code.clone(),
                legal_reference,
            }
            .price(tier2_hours, base_rate, vec![detection])?,
        );
    }

    Ok(results)
}
