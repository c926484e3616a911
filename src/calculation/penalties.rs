//! Flat penalties: split shift, missed meal break and missed rest break.
//!
//! Penalties are paid in flat units of the base rate rather than in worked
//! hours.

use crate::error::EngineResult;
use crate::models::{
    Basis, BreakPenaltyRule, BreakType, CalculationStep, PremiumKind, PremiumRule, QuantityUnit,
    RateClass,
};

use super::premium::{PremiumInput, PremiumResult, PremiumSpec, show};

/// Evaluates the split shift slot: fires when any unpaid gap reaches the minimum.
pub fn evaluate_split_shift(input: &PremiumInput<'_>) -> EngineResult<Vec<PremiumResult>> {
    let Some(PremiumRule::SplitShift(rule)) = input.policy.premium(PremiumKind::SplitShift) else {
        return Ok(Vec::new());
    };
    let gap = input.shift.longest_unpaid_gap_minutes();
    if gap < rule.minimum_gap_minutes {
        return Ok(Vec::new());
    }

    let detection = CalculationStep::new(
        0,
        "split_shift_detection",
        "Split Shift Detection",
        "longest_unpaid_gap ≥ minimum_gap",
    )
    .with_input(serde_json::json!({
        "longest_unpaid_gap_minutes": gap,
        "minimum_gap_minutes": rule.minimum_gap_minutes,
    }))
    .with_output(serde_json::json!({
        "penalty_units": show(rule.penalty_hours),
    }))
    .with_reasoning(format!(
        "Unpaid gap of {} minutes meets the {} minute split shift minimum",
        gap, rule.minimum_gap_minutes
    ));

    let result = PremiumSpec {
        rule_id: "split_shift_penalty",
        rule_name: "Split Shift Penalty",
        rate_class: RateClass::SplitShiftPenalty,
        basis: Basis::Penalty,
        unit: QuantityUnit::FlatUnits,
        multiplier: rule.multiplier,
        earning_code: rule.earning_code.clone(),
        legal_reference: rule
            .legal_reference
            .clone()
            .or_else(|| input.policy.legal_reference.clone()),
    }
    .price(rule.penalty_hours, input.context.base_rate, vec![detection])?;
    Ok(vec![result])
}

fn evaluate_break_penalty(
    input: &PremiumInput<'_>,
    rule: &BreakPenaltyRule,
    break_type: BreakType,
    rule_id: &'static str,
    rule_name: &'static str,
    rate_class: RateClass,
) -> EngineResult<Vec<PremiumResult>> {
    if input.worked_hours <= rule.trigger_hours {
        return Ok(Vec::new());
    }
    if input
        .shift
        .has_qualifying_break(break_type, rule.required_break_minutes)
    {
        return Ok(Vec::new());
    }

    let detection = CalculationStep::new(
        0,
        format!("{}_detection", rule_id),
        format!("{} Detection", rule_name),
        "worked_hours > trigger_hours ∧ no qualifying break",
    )
    .with_input(serde_json::json!({
        "worked_hours": show(input.worked_hours),
        "trigger_hours": show(rule.trigger_hours),
        "break_type": break_type,
        "required_break_minutes": rule.required_break_minutes,
    }))
    .with_output(serde_json::json!({
        "penalty_units": show(rule.penalty_hours),
    }))
    .with_reasoning(format!(
        "{} hours worked (over {}) without a {:?} break of at least {} minutes",
        show(input.worked_hours),
        show(rule.trigger_hours),
        break_type,
        rule.required_break_minutes
    ));

    let result = PremiumSpec {
        rule_id,
        rule_name,
        rate_class,
        basis: Basis::Penalty,
        unit: QuantityUnit::FlatUnits,
        multiplier: rule.multiplier,
        earning_code: rule.earning_code.clone(),
        legal_reference: rule
            .legal_reference
            .clone()
            .or_else(|| input.policy.legal_reference.clone()),
    }
    .price(rule.penalty_hours, input.context.base_rate, vec![detection])?;
    Ok(vec![result])
}

/// Evaluates the meal break slot.
pub fn evaluate_meal_break(input: &PremiumInput<'_>) -> EngineResult<Vec<PremiumResult>> {
    let Some(PremiumRule::MealBreak(rule)) = input.policy.premium(PremiumKind::MealBreak) else {
        return Ok(Vec::new());
    };
    evaluate_break_penalty(
        input,
        rule,
        BreakType::Meal,
        "meal_break_penalty",
        "Meal Break Penalty",
        RateClass::MealBreakPenalty,
    )
}

/// Evaluates the rest break slot.
pub fn evaluate_rest_break(input: &PremiumInput<'_>) -> EngineResult<Vec<PremiumResult>> {
    let Some(PremiumRule::RestBreak(rule)) = input.policy.premium(PremiumKind::RestBreak) else {
        return Ok(Vec::new());
    };
    evaluate_break_penalty(
        input,
        rule,
        BreakType::Rest,
        "rest_break_penalty",
        "Rest Break Penalty",
        RateClass::RestBreakPenalty,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calculation::premium::CalculationContext;
    use crate::models::{Break, Policy, Shift};
    use crate::policy::templates;
    use chrono::NaiveDateTime;
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(&format!("2026-03-03 {}", s), "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn base_shift() -> Shift {
        Shift::completed("shift_001", "emp_001", dt("06:00:00"), dt("16:00:00"))
    }

    fn unpaid(start: &str, end: &str, break_type: BreakType) -> Break {
        Break {
            start_time: dt(start),
            end_time: dt(end),
            is_paid: false,
            break_type,
        }
    }

    fn evaluate(
        f: fn(&PremiumInput<'_>) -> EngineResult<Vec<PremiumResult>>,
        policy: &Policy,
        shift: &Shift,
        worked: &str,
    ) -> Vec<PremiumResult> {
        let context = CalculationContext::new(dec("25"));
        let input = PremiumInput {
            shift,
            policy,
            worked_hours: dec(worked),
            context: &context,
        };
        f(&input).unwrap()
    }

    #[test]
    fn test_split_shift_gap() {
        let policy = templates::us_california().unwrap();
        let mut shift = base_shift();
        shift.breaks.push(unpaid("10:00:00", "10:30:00", BreakType::Meal));
        assert!(evaluate(evaluate_split_shift, &policy, &shift, "9.5").is_empty());

        shift.breaks.push(unpaid("11:00:00", "13:00:00", BreakType::Other));
        let results = evaluate(evaluate_split_shift, &policy, &shift, "7.5");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].unit, QuantityUnit::FlatUnits);
        assert_eq!(results[0].amount, dec("25.00"));
    }

    #[test]
    fn test_meal_penalty_when_no_meal_break() {
        let policy = templates::us_california().unwrap();
        let shift = base_shift();
        let results = evaluate(evaluate_meal_break, &policy, &shift, "10");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].rate_class, RateClass::MealBreakPenalty);
    }

    #[test]
    fn test_no_meal_penalty_with_qualifying_break() {
        let policy = templates::us_california().unwrap();
        let mut shift = base_shift();
        shift.breaks.push(unpaid("11:00:00", "11:30:00", BreakType::Meal));
        assert!(evaluate(evaluate_meal_break, &policy, &shift, "9.5").is_empty());
    }

    #[test]
    fn test_short_shift_needs_no_break() {
        let policy = templates::us_california().unwrap();
        let shift = base_shift();
        assert!(evaluate(evaluate_meal_break, &policy, &shift, "4").is_empty());
        assert!(evaluate(evaluate_rest_break, &policy, &shift, "3").is_empty());
    }

    #[test]
    fn test_rest_penalty_requires_rest_type() {
        let policy = templates::us_california().unwrap();
        let mut shift = base_shift();
        shift.breaks.push(unpaid("11:00:00", "11:30:00", BreakType::Meal));
        let results = evaluate(evaluate_rest_break, &policy, &shift, "9.5");
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].rate_class, RateClass::RestBreakPenalty);
    }
}
