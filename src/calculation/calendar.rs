//! Calendar premiums: weekend, public holiday and Nth consecutive day.
//!
//! Weekend and holiday premiums are keyed on the shift's start date and apply
//! to all worked hours of the shift.

use chrono::Datelike;
use rust_decimal::Decimal;

use crate::error::EngineResult;
use crate::models::{Basis, CalculationStep, PremiumKind, PremiumRule, QuantityUnit, RateClass};

use super::premium::{PremiumInput, PremiumResult, PremiumSpec, show};

/// Evaluates the weekend slot.
pub fn evaluate_weekend(input: &PremiumInput<'_>) -> EngineResult<Vec<PremiumResult>> {
    let Some(PremiumRule::Weekend(rule)) = input.policy.premium(PremiumKind::Weekend) else {
        return Ok(Vec::new());
    };
    let weekday = input.shift.work_date().weekday();
    if !rule.days.contains(&weekday) || input.worked_hours <= Decimal::ZERO {
        return Ok(Vec::new());
    }

    let detection = CalculationStep::new(0, "weekend_detection", "Weekend Detection", "weekday(start_date) ∈ weekend_days")
        .with_input(serde_json::json!({
            "start_date": input.shift.work_date().to_string(),
            "weekend_days": rule.days.iter().map(|d| d.to_string()).collect::<Vec<_>>(),
        }))
        .with_output(serde_json::json!({
            "weekday": weekday.to_string(),
            "hours": show(input.worked_hours),
        }))
        .with_reasoning(format!(
            "Shift starts on {} ({}); all {} worked hours attract the weekend premium",
            input.shift.work_date(),
            weekday,
            show(input.worked_hours)
        ));

    let result = PremiumSpec {
        rule_id: "weekend_premium",
        rule_name: "Weekend Premium",
        rate_class: RateClass::WeekendPremium,
        basis: Basis::DayOfWeek,
        unit: QuantityUnit::Hours,
        multiplier: rule.multiplier,
        earning_code: rule.earning_code.clone(),
        legal_reference: rule
            .legal_reference
            .clone()
            .or_else(|| input.policy.legal_reference.clone()),
    }
    .price(input.worked_hours, input.context.base_rate, vec![detection])?;
    Ok(vec![result])
}

/// Evaluates the holiday slot against the policy's holiday calendar.
///
/// A holiday's own multiplier takes precedence over the rule's default.
pub fn evaluate_holiday(input: &PremiumInput<'_>) -> EngineResult<Vec<PremiumResult>> {
    let Some(PremiumRule::Holiday(rule)) = input.policy.premium(PremiumKind::Holiday) else {
        return Ok(Vec::new());
    };
    let date = input.shift.work_date();
    let Some(holiday) = input.policy.holiday_on(date) else {
        return Ok(Vec::new());
    };
    if input.worked_hours <= Decimal::ZERO {
        return Ok(Vec::new());
    }

    let multiplier = holiday.multiplier.unwrap_or(rule.multiplier);
    let detection = CalculationStep::new(0, "holiday_detection", "Holiday Detection", "start_date ∈ holiday_calendar")
        .with_input(serde_json::json!({
            "start_date": date.to_string(),
            "default_multiplier": show(rule.multiplier),
            "holiday_multiplier": holiday.multiplier.map(show),
        }))
        .with_output(serde_json::json!({
            "holiday": holiday.name,
            "multiplier": show(multiplier),
        }))
        .with_reasoning(match holiday.multiplier {
            Some(m) => format!("{} is {}; holiday override multiplier {} applies", date, holiday.name, show(m)),
            None => format!("{} is {}; default holiday multiplier {} applies", date, holiday.name, show(multiplier)),
        });

    let result = PremiumSpec {
        rule_id: "holiday_premium",
        rule_name: "Holiday Premium",
        rate_class: RateClass::HolidayPremium,
        basis: Basis::Holiday,
        unit: QuantityUnit::Hours,
        multiplier,
        earning_code: rule.earning_code.clone(),
        legal_reference: rule
            .legal_reference
            .clone()
            .or_else(|| input.policy.legal_reference.clone()),
    }
    .price(input.worked_hours, input.context.base_rate, vec![detection])?;
    Ok(vec![result])
}

/// Evaluates the Nth consecutive day slot.
pub fn evaluate_consecutive_day(input: &PremiumInput<'_>) -> EngineResult<Vec<PremiumResult>> {
    let Some(PremiumRule::ConsecutiveDay(rule)) = input.policy.premium(PremiumKind::ConsecutiveDay) else {
        return Ok(Vec::new());
    };
    let days = input.context.consecutive_days_worked;
    if days < rule.trigger_day || input.worked_hours <= Decimal::ZERO {
        return Ok(Vec::new());
    }

    let detection = CalculationStep::new(
        0,
        "consecutive_day_detection",
        "Consecutive Day Detection",
        "consecutive_days_worked ≥ trigger_day",
    )
    .with_input(serde_json::json!({
        "consecutive_days_worked": days,
        "trigger_day": rule.trigger_day,
    }))
    .with_output(serde_json::json!({
        "hours": show(input.worked_hours),
    }))
    .with_reasoning(format!(
        "Day {} of a consecutive run reaches the day {} trigger",
        days, rule.trigger_day
    ));

    let result = PremiumSpec {
        rule_id: "consecutive_day_premium",
        rule_name: "Consecutive Day Premium",
        rate_class: RateClass::ConsecutiveDayPremium,
        basis: Basis::Consecutive,
        unit: QuantityUnit::Hours,
        multiplier: rule.multiplier,
        earning_code: rule.earning_code.clone(),
        legal_reference: rule
            .legal_reference
            .clone()
            .or_else(|| input.policy.legal_reference.clone()),
    }
    .price(input.worked_hours, input.context.base_rate, vec![detection])?;
    Ok(vec![result])
}
