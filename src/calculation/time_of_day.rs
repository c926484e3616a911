//! Night differential: hours that fall inside a clock window.
//!
//! The window may wrap midnight (e.g. 22:00–06:00). Only worked intervals
//! count; unpaid breaks inside the window are excluded.

use chrono::{Days, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;

use crate::error::EngineResult;
use crate::models::{Basis, CalculationStep, QuantityUnit, RateClass};

use super::premium::{PremiumInput, PremiumResult, PremiumSpec, show};
use super::worked_hours::minutes_to_hours;

/// Minutes of `[start, end)` that fall inside the daily window `[window_start, window_end)`.
///
/// # Example
///
/// ```
/// use overtime_engine::calculation::window_overlap_minutes;
/// use chrono::{NaiveDateTime, NaiveTime};
///
/// let start = NaiveDateTime::parse_from_str("2026-03-06 20:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
/// let end = NaiveDateTime::parse_from_str("2026-03-07 06:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
/// let minutes = window_overlap_minutes(
///     start,
///     end,
///     NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
///     NaiveTime::from_hms_opt(6, 0, 0).unwrap(),
/// );
/// assert_eq!(minutes, 8 * 60);
/// ```
pub fn window_overlap_minutes(
    start: NaiveDateTime,
    end: NaiveDateTime,
    window_start: NaiveTime,
    window_end: NaiveTime,
) -> i64 {
    if end <= start || window_start == window_end {
        return 0;
    }
    let wraps = window_end <= window_start;

    // A window anchored on the day before `start` can still reach into the interval.
    let mut day = start
        .date()
        .checked_sub_days(Days::new(1))
        .unwrap_or(start.date());
    let last_day = end.date();
    let mut total = 0;

    while day <= last_day {
        let open = day.and_time(window_start);
        let close_day = if wraps {
            day.checked_add_days(Days::new(1)).unwrap_or(day)
        } else {
            day
        };
        let close = close_day.and_time(window_end);

        let overlap_start = open.max(start);
        let overlap_end = close.min(end);
        if overlap_end > overlap_start {
            total += (overlap_end - overlap_start).num_minutes();
        }

        match day.checked_add_days(Days::new(1)) {
            Some(next) => day = next,
            None => break,
        }
    }
    total
}

/// Evaluates the policy's night differential slot.
pub fn evaluate_night_differential(input: &PremiumInput<'_>) -> EngineResult<Vec<PremiumResult>> {
    let Some(rule) = input.policy.night_differential() else {
        return Ok(Vec::new());
    };

    let intervals = input.shift.worked_intervals();
    let minutes: i64 = intervals
        .iter()
        .map(|(s, e)| window_overlap_minutes(*s, *e, rule.window_start, rule.window_end))
        .sum();
    let hours = minutes_to_hours(minutes).min(input.worked_hours);
    if hours <= Decimal::ZERO {
        return Ok(Vec::new());
    }

    let detection = CalculationStep::new(
        0,
        "night_window_overlap",
        "Night Window Overlap",
        "Σ overlap(worked_interval, night_window)",
    )
    .with_input(serde_json::json!({
        "window_start": rule.window_start.to_string(),
        "window_end": rule.window_end.to_string(),
        "worked_intervals": intervals
            .iter()
            .map(|(s, e)| format!("{} – {}", s, e))
            .collect::<Vec<_>>(),
    }))
    .with_output(serde_json::json!({
        "night_minutes": minutes,
        "night_hours": show(hours),
    }))
    .with_reasoning(format!(
        "{} hours worked inside the {}–{} night window",
        show(hours),
        rule.window_start.format("%H:%M"),
        rule.window_end.format("%H:%M")
    ));

    let result = PremiumSpec {
        rule_id: "night_differential",
        rule_name: "Night Differential",
        rate_class: RateClass::NightDifferential,
        basis: Basis::TimeOfDay,
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

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn t(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_day_shift_outside_window() {
        let minutes = window_overlap_minutes(
            dt("2026-03-02 08:00:00"),
            dt("2026-03-02 16:00:00"),
            t(22, 0),
            t(6, 0),
        );
        assert_eq!(minutes, 0);
    }

    #[test]
    fn test_early_morning_in_wrapped_window() {
        // Window opened the previous evening.
        let minutes = window_overlap_minutes(
            dt("2026-03-02 04:00:00"),
            dt("2026-03-02 12:00:00"),
            t(22, 0),
            t(6, 0),
        );
        assert_eq!(minutes, 120);
    }

    #[test]
    fn test_non_wrapping_window() {
        let minutes = window_overlap_minutes(
            dt("2026-03-02 18:00:00"),
            dt("2026-03-02 23:30:00"),
            t(20, 0),
            t(23, 0),
        );
        assert_eq!(minutes, 180);
    }

    #[test]
    fn test_interval_spanning_two_windows() {
        let minutes = window_overlap_minutes(
            dt("2026-03-02 04:00:00"),
            dt("2026-03-03 01:00:00"),
            t(22, 0),
            t(6, 0),
        );
        // 04:00-06:00 and 22:00-01:00
        assert_eq!(minutes, 120 + 180);
    }

    #[test]
    fn test_empty_interval() {
        assert_eq!(
            window_overlap_minutes(
                dt("2026-03-02 04:00:00"),
                dt("2026-03-02 04:00:00"),
                t(22, 0),
                t(6, 0)
            ),
            0
        );
    }
}
