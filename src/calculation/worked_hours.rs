//! Worked-hours computation and time-capture rounding.
//!
//! Worked minutes are `(actual_end − actual_start) − unpaid breaks`. The
//! policy's rounding rule is then applied: minutes within the grace allowance
//! past an increment boundary are forgiven, anything further is rounded by the
//! rule's method. Negative results are clamped to zero and flagged.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::{CalculationStep, RoundingMethod, RoundingRule, Shift};

/// The result of computing worked hours for a shift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkedHours {
    /// Gross minutes minus unpaid breaks, before rounding. `None` if the shift has no clock-out.
    pub net_minutes: Option<i64>,
    /// Minutes after clamping and rounding.
    pub rounded_minutes: i64,
    /// `rounded_minutes / 60`.
    pub hours: Decimal,
    /// True if the net minutes were negative and clamped to zero.
    pub clamped_negative: bool,
    /// The explanation step recording the computation.
    pub audit_step: CalculationStep,
}

/// Rounds `minutes` according to `rule`.
///
/// The remainder past the previous increment boundary is truncated when it
/// is within `grace_minutes`; otherwise the method decides. Already-rounded
/// values are returned unchanged, so rounding is idempotent.
///
/// # Examples
///
/// ```
/// use overtime_engine::calculation::round_minutes;
/// use overtime_engine::models::{RoundingMethod, RoundingRule};
///
/// let rule = RoundingRule { method: RoundingMethod::Nearest, increment_minutes: 15, grace_minutes: 0 };
/// assert_eq!(round_minutes(487, &rule), 480);
/// assert_eq!(round_minutes(488, &rule), 495);
///
/// let up = RoundingRule { method: RoundingMethod::Up, increment_minutes: 15, grace_minutes: 5 };
/// assert_eq!(round_minutes(484, &up), 480); // within grace
/// assert_eq!(round_minutes(486, &up), 495);
/// ```
pub fn round_minutes(minutes: i64, rule: &RoundingRule) -> i64 {
    let minutes = minutes.max(0);
    let increment = i64::from(rule.increment_minutes);
    if rule.method == RoundingMethod::None || increment <= 0 {
        return minutes;
    }

    let remainder = minutes % increment;
    if remainder == 0 {
        return minutes;
    }
    let floor = minutes - remainder;
    if remainder <= i64::from(rule.grace_minutes) {
        return floor;
    }

    match rule.method {
        RoundingMethod::Up => floor + increment,
        RoundingMethod::Down => floor,
        RoundingMethod::Nearest if remainder * 2 >= increment => floor + increment,
        RoundingMethod::Nearest | RoundingMethod::None => floor,
    }
}

/// Converts minutes to decimal hours.
pub fn minutes_to_hours(minutes: i64) -> Decimal {
    Decimal::from(minutes) / Decimal::from(60)
}

/// Computes worked hours for a shift under a rounding rule.
///
/// A shift without a clock-out yields zero hours and `net_minutes = None`.
///
/// # Example
///
/// ```
/// use overtime_engine::calculation::compute_worked_hours;
/// use overtime_engine::models::{RoundingRule, Shift};
/// use chrono::NaiveDateTime;
/// use rust_decimal::Decimal;
///
/// let start = NaiveDateTime::parse_from_str("2026-03-02 08:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
/// let end = NaiveDateTime::parse_from_str("2026-03-02 18:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
/// let shift = Shift::completed("shift_001", "emp_001", start, end);
///
/// let worked = compute_worked_hours(&shift, &RoundingRule::default(), 1);
/// assert_eq!(worked.hours, Decimal::from(10));
/// assert!(!worked.clamped_negative);
/// ```
pub fn compute_worked_hours(shift: &Shift, rounding: &RoundingRule, step_number: u32) -> WorkedHours {
    let net_minutes = shift.net_minutes();
    let raw = net_minutes.unwrap_or(0);
    let clamped_negative = raw < 0;
    let rounded_minutes = round_minutes(raw, rounding);
    let hours = minutes_to_hours(rounded_minutes);

    let reasoning = match net_minutes {
        None => "Shift has no clock-out; worked hours are zero".to_string(),
        Some(m) if m < 0 => format!(
            "Net duration of {} minutes is negative; clamped to zero",
            m
        ),
        Some(m) if m != rounded_minutes => format!(
            "{} net minutes rounded ({:?}, {} minute increment, {} minute grace) to {} minutes = {} hours",
            m,
            rounding.method,
            rounding.increment_minutes,
            rounding.grace_minutes,
            rounded_minutes,
            hours.normalize()
        ),
        Some(m) => format!("{} net minutes = {} hours", m, hours.normalize()),
    };

    let audit_step = CalculationStep::new(
        step_number,
        "worked_hours",
        "Worked Hours",
        "round((actual_end − actual_start) − unpaid_breaks)",
    )
    .with_input(serde_json::json!({
        "actual_start": shift.actual_start.to_string(),
        "actual_end": shift.actual_end.map(|e| e.to_string()),
        "gross_minutes": shift.gross_minutes(),
        "unpaid_break_minutes": shift.unpaid_break_minutes(),
        "rounding_method": rounding.method,
        "increment_minutes": rounding.increment_minutes,
        "grace_minutes": rounding.grace_minutes,
    }))
    .with_output(serde_json::json!({
        "net_minutes": net_minutes,
        "rounded_minutes": rounded_minutes,
        "worked_hours": hours.normalize().to_string(),
        "clamped_negative": clamped_negative,
    }))
    .with_reasoning(reasoning);

    WorkedHours {
        net_minutes,
        rounded_minutes,
        hours,
        clamped_negative,
        audit_step,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Break, BreakType};
    use chrono::NaiveDateTime;
    use proptest::prelude::*;

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn rule(method: RoundingMethod, increment: u32, grace: u32) -> RoundingRule {
        RoundingRule {
            method,
            increment_minutes: increment,
            grace_minutes: grace,
        }
    }

    /// WH-001: 10 hour shift with 30 minute unpaid meal
    #[test]
    fn test_unpaid_break_subtracted() {
        let mut shift = Shift::completed(
            "WH-001",
            "emp_001",
            dt("2026-03-02 08:00:00"),
            dt("2026-03-02 18:30:00"),
        );
        shift.breaks.push(Break {
            start_time: dt("2026-03-02 12:00:00"),
            end_time: dt("2026-03-02 12:30:00"),
            is_paid: false,
            break_type: BreakType::Meal,
        });

        let worked = compute_worked_hours(&shift, &RoundingRule::default(), 1);
        assert_eq!(worked.net_minutes, Some(600));
        assert_eq!(worked.hours, Decimal::from(10));
        assert_eq!(worked.audit_step.rule_id, "worked_hours");
    }

    /// WH-002: missing clock-out gives zero hours
    #[test]
    fn test_missing_clock_out() {
        let mut shift = Shift::completed(
            "WH-002",
            "emp_001",
            dt("2026-03-02 08:00:00"),
            dt("2026-03-02 16:00:00"),
        );
        shift.actual_end = None;

        let worked = compute_worked_hours(&shift, &RoundingRule::default(), 1);
        assert_eq!(worked.net_minutes, None);
        assert_eq!(worked.hours, Decimal::ZERO);
        assert!(worked.audit_step.reasoning.contains("no clock-out"));
    }

    /// WH-003: breaks longer than the shift clamp to zero
    #[test]
    fn test_negative_duration_clamped() {
        let mut shift = Shift::completed(
            "WH-003",
            "emp_001",
            dt("2026-03-02 08:00:00"),
            dt("2026-03-02 09:00:00"),
        );
        shift.breaks.push(Break {
            start_time: dt("2026-03-02 08:00:00"),
            end_time: dt("2026-03-02 10:00:00"),
            is_paid: false,
            break_type: BreakType::Other,
        });

        let worked = compute_worked_hours(&shift, &RoundingRule::default(), 1);
        assert_eq!(worked.net_minutes, Some(-60));
        assert_eq!(worked.hours, Decimal::ZERO);
        assert!(worked.clamped_negative);
    }

    #[test]
    fn test_rounding_methods() {
        assert_eq!(round_minutes(487, &rule(RoundingMethod::Down, 15, 0)), 480);
        assert_eq!(round_minutes(481, &rule(RoundingMethod::Up, 15, 0)), 495);
        assert_eq!(round_minutes(483, &rule(RoundingMethod::Nearest, 6, 0)), 486);
        assert_eq!(round_minutes(494, &rule(RoundingMethod::Nearest, 30, 0)), 480);
        assert_eq!(round_minutes(495, &rule(RoundingMethod::Nearest, 30, 0)), 510);
        assert_eq!(round_minutes(487, &rule(RoundingMethod::None, 15, 0)), 487);
    }

    #[test]
    fn test_grace_forgives_small_overrun() {
        let up = rule(RoundingMethod::Up, 15, 7);
        assert_eq!(round_minutes(487, &up), 480);
        assert_eq!(round_minutes(488, &up), 495);
    }

    proptest! {
        #[test]
        fn prop_rounding_is_idempotent(
            minutes in 0i64..2_000,
            method in prop_oneof![
                Just(RoundingMethod::None),
                Just(RoundingMethod::Nearest),
                Just(RoundingMethod::Up),
                Just(RoundingMethod::Down),
            ],
            increment in prop_oneof![Just(6u32), Just(15u32), Just(30u32)],
            grace in 0u32..6,
        ) {
            let r = rule(method, increment, grace);
            let once = round_minutes(minutes, &r);
            prop_assert_eq!(round_minutes(once, &r), once);
        }

        #[test]
        fn prop_rounding_stays_within_one_increment(
            minutes in 0i64..2_000,
            increment in prop_oneof![Just(6u32), Just(15u32), Just(30u32)],
        ) {
            let r = rule(RoundingMethod::Nearest, increment, 0);
            let rounded = round_minutes(minutes, &r);
            prop_assert!((rounded - minutes).abs() <= i64::from(increment));
            prop_assert!(rounded >= 0);
        }
    }
}
