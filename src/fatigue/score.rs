//! Pure fatigue scoring.
//!
//! Six factors are derived from the trailing seven days of completed shifts,
//! each normalized to 0–100 against a reference ceiling and combined with
//! fixed weights into one 0–100 score.

use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::calculation::{minutes_to_hours, window_overlap_minutes};
use crate::models::{Shift, ShiftClassification};

/// Length of the scoring window.
pub const TRAILING_WINDOW_DAYS: u64 = 7;

/// Inter-shift rest below which a rest deficit accrues, in hours.
pub const REFERENCE_REST_HOURS: i64 = 11;

/// Hours per shift beyond which worked time counts as overtime when the
/// shift carries no computed overtime.
pub const STANDARD_SHIFT_HOURS: i64 = 8;

/// Minimum minutes inside the night window for a shift to count as a night shift.
pub const NIGHT_SHIFT_MINUTES: i64 = 180;

/// Night window used for fatigue purposes.
pub fn night_window() -> (NaiveTime, NaiveTime) {
    (
        NaiveTime::from_hms_opt(23, 0, 0).unwrap_or(NaiveTime::MIN),
        NaiveTime::from_hms_opt(6, 0, 0).unwrap_or(NaiveTime::MIN),
    )
}

/// One of the six fatigue inputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FatigueFactor {
    /// Total hours worked.
    TotalHours,
    /// Number of night shifts.
    NightShifts,
    /// Longest run of consecutive days worked.
    ConsecutiveDays,
    /// Overtime hours.
    OvertimeHours,
    /// Cumulative shortfall below the reference rest between shifts.
    RestDeficit,
    /// Longest single shift.
    LongestShift,
}

impl FatigueFactor {
    /// All factors, in reporting order.
    pub const ALL: [FatigueFactor; 6] = [
        FatigueFactor::TotalHours,
        FatigueFactor::NightShifts,
        FatigueFactor::ConsecutiveDays,
        FatigueFactor::OvertimeHours,
        FatigueFactor::RestDeficit,
        FatigueFactor::LongestShift,
    ];

    /// Raw value at which the sub-score saturates at 100.
    pub fn ceiling(self) -> Decimal {
        match self {
            FatigueFactor::TotalHours => Decimal::from(60),
            FatigueFactor::NightShifts => Decimal::from(5),
            FatigueFactor::ConsecutiveDays => Decimal::from(10),
            FatigueFactor::OvertimeHours => Decimal::from(20),
            FatigueFactor::RestDeficit => Decimal::from(10),
            FatigueFactor::LongestShift => Decimal::from(16),
        }
    }

    /// Weight in the combined score. Weights sum to one.
    pub fn weight(self) -> Decimal {
        match self {
            FatigueFactor::TotalHours => Decimal::new(25, 2),
            FatigueFactor::NightShifts => Decimal::new(20, 2),
            FatigueFactor::ConsecutiveDays => Decimal::new(20, 2),
            FatigueFactor::OvertimeHours => Decimal::new(15, 2),
            FatigueFactor::RestDeficit => Decimal::new(15, 2),
            FatigueFactor::LongestShift => Decimal::new(5, 2),
        }
    }
}

/// Raw factor values for one employee and window.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FatigueFactors {
    /// Total net hours worked.
    pub total_hours: Decimal,
    /// Number of night shifts.
    pub night_shifts: u32,
    /// Longest consecutive-day run.
    pub consecutive_days: u32,
    /// Overtime hours.
    pub overtime_hours: Decimal,
    /// Summed rest shortfall, in hours.
    pub rest_deficit_hours: Decimal,
    /// Longest single shift, in elapsed hours.
    pub longest_shift_hours: Decimal,
}

impl FatigueFactors {
    /// Raw value of one factor.
    pub fn value(&self, factor: FatigueFactor) -> Decimal {
        match factor {
            FatigueFactor::TotalHours => self.total_hours,
            FatigueFactor::NightShifts => Decimal::from(self.night_shifts),
            FatigueFactor::ConsecutiveDays => Decimal::from(self.consecutive_days),
            FatigueFactor::OvertimeHours => self.overtime_hours,
            FatigueFactor::RestDeficit => self.rest_deficit_hours,
            FatigueFactor::LongestShift => self.longest_shift_hours,
        }
    }
}

/// One factor's contribution to the score.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactorScore {
    /// The factor.
    pub factor: FatigueFactor,
    /// Raw value.
    pub value: Decimal,
    /// Reference ceiling.
    pub ceiling: Decimal,
    /// Normalized sub-score (0–100).
    pub sub_score: Decimal,
    /// Weight.
    pub weight: Decimal,
    /// `sub_score × weight`.
    pub weighted: Decimal,
}

/// Fatigue level bands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FatigueLevel {
    /// Score below 30.
    Low,
    /// Score below 60.
    Moderate,
    /// Score below 85.
    High,
    /// Score of 85 or more.
    Critical,
}

impl FatigueLevel {
    /// Maps a 0–100 score to its band.
    pub fn from_score(score: Decimal) -> Self {
        if score < Decimal::from(30) {
            FatigueLevel::Low
        } else if score < Decimal::from(60) {
            FatigueLevel::Moderate
        } else if score < Decimal::from(85) {
            FatigueLevel::High
        } else {
            FatigueLevel::Critical
        }
    }
}

/// Severity of a fatigue breach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BreachSeverity {
    /// Approaching a limit.
    Warning,
    /// Over a limit.
    Error,
}

/// A limit the recent work pattern breaks or approaches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FatigueBreach {
    /// Factor concerned.
    pub factor: FatigueFactor,
    /// Severity.
    pub severity: BreachSeverity,
    /// Observed value.
    pub value: Decimal,
    /// Limit crossed.
    pub limit: Decimal,
    /// Human-readable description.
    pub message: String,
}

/// Combines factors into a 0–100 score and a per-factor breakdown.
///
/// # Example
///
/// ```
/// use overtime_engine::fatigue::{FatigueFactors, FatigueLevel, score_factors};
/// use rust_decimal::Decimal;
///
/// let factors = FatigueFactors {
///     total_hours: Decimal::from(30),
///     ..FatigueFactors::default()
/// };
/// let (score, breakdown) = score_factors(&factors);
///
/// // 30 / 60 hours = 50, weighted 0.25.
/// assert_eq!(score, Decimal::new(125, 1));
/// assert_eq!(breakdown.len(), 6);
/// assert_eq!(FatigueLevel::from_score(score), FatigueLevel::Low);
/// ```
pub fn score_factors(factors: &FatigueFactors) -> (Decimal, Vec<FactorScore>) {
    let hundred = Decimal::from(100);
    let breakdown: Vec<FactorScore> = FatigueFactor::ALL
        .iter()
        .map(|&factor| {
            let value = factors.value(factor).max(Decimal::ZERO);
            let ceiling = factor.ceiling();
            let sub_score = ((value / ceiling).min(Decimal::ONE) * hundred).round_dp(2);
            let weight = factor.weight();
            FactorScore {
                factor,
                value,
                ceiling,
                sub_score,
                weight,
                weighted: (sub_score * weight).round_dp(2),
            }
        })
        .collect();
    let score = breakdown
        .iter()
        .map(|f| f.sub_score * f.weight)
        .sum::<Decimal>()
        .round_dp(2)
        .min(hundred);
    (score, breakdown)
}

/// Lists breached and approached limits.
pub fn detect_breaches(factors: &FatigueFactors) -> Vec<FatigueBreach> {
    let mut breaches = Vec::new();
    let mut push = |factor, severity, value: Decimal, limit: Decimal, message: String| {
        breaches.push(FatigueBreach {
            factor,
            severity,
            value,
            limit,
            message,
        });
    };

    let days = Decimal::from(factors.consecutive_days);
    if factors.consecutive_days > 7 {
        push(
            FatigueFactor::ConsecutiveDays,
            BreachSeverity::Error,
            days,
            Decimal::from(7),
            format!("{} consecutive days worked (more than 7)", factors.consecutive_days),
        );
    } else if factors.consecutive_days >= 6 {
        push(
            FatigueFactor::ConsecutiveDays,
            BreachSeverity::Warning,
            days,
            Decimal::from(6),
            format!("{} consecutive days worked", factors.consecutive_days),
        );
    }

    let deficit = factors.rest_deficit_hours;
    if deficit > Decimal::from(5) {
        push(
            FatigueFactor::RestDeficit,
            BreachSeverity::Error,
            deficit,
            Decimal::from(5),
            format!("rest deficit of {} hours (more than 5)", deficit.normalize()),
        );
    } else if deficit > Decimal::ZERO {
        push(
            FatigueFactor::RestDeficit,
            BreachSeverity::Warning,
            deficit,
            Decimal::ZERO,
            format!("rest deficit of {} hours", deficit.normalize()),
        );
    }

    let hours = factors.total_hours;
    if hours > Decimal::from(60) {
        push(
            FatigueFactor::TotalHours,
            BreachSeverity::Error,
            hours,
            Decimal::from(60),
            format!("{} hours worked in 7 days (more than 60)", hours.normalize()),
        );
    } else if hours > Decimal::from(48) {
        push(
            FatigueFactor::TotalHours,
            BreachSeverity::Warning,
            hours,
            Decimal::from(48),
            format!("{} hours worked in 7 days (more than 48)", hours.normalize()),
        );
    }

    if factors.longest_shift_hours > Decimal::from(13) {
        push(
            FatigueFactor::LongestShift,
            BreachSeverity::Error,
            factors.longest_shift_hours,
            Decimal::from(13),
            format!(
                "single shift of {} hours (more than 13)",
                factors.longest_shift_hours.normalize()
            ),
        );
    }

    breaches
}

/// Advice matching the level and the worst factors.
pub fn recommendations(
    level: FatigueLevel,
    factors: &FatigueFactors,
    breaches: &[FatigueBreach],
) -> Vec<String> {
    let mut advice = match level {
        FatigueLevel::Low => vec!["Fatigue risk is low; no action required".to_string()],
        FatigueLevel::Moderate => vec!["Monitor workload and avoid adding overtime this week".to_string()],
        FatigueLevel::High => vec![
            "Limit further overtime and schedule a full rest day".to_string(),
            "Supervisor review required before extending shifts".to_string(),
        ],
        FatigueLevel::Critical => vec![
            "Do not schedule further shifts until rest has been taken".to_string(),
            "Immediate supervisor and occupational health review required".to_string(),
        ],
    };

    if factors.night_shifts >= 3 {
        advice.push("Rotate off night shifts; allow at least 48 hours rest after a night run".to_string());
    }
    if factors.rest_deficit_hours > Decimal::ZERO {
        advice.push(format!(
            "Restore at least {} hours between shifts",
            REFERENCE_REST_HOURS
        ));
    }
    if breaches
        .iter()
        .any(|b| b.factor == FatigueFactor::ConsecutiveDays)
    {
        advice.push("Schedule a day off to break the consecutive-day run".to_string());
    }
    advice
}

fn worked_hours(shift: &Shift) -> Decimal {
    minutes_to_hours(shift.net_minutes().unwrap_or(0).max(0))
}

fn is_night_shift(shift: &Shift) -> bool {
    if shift.classification == ShiftClassification::Night {
        return true;
    }
    let (start, end) = night_window();
    let minutes: i64 = shift
        .worked_intervals()
        .iter()
        .map(|(s, e)| window_overlap_minutes(*s, *e, start, end))
        .sum();
    minutes >= NIGHT_SHIFT_MINUTES
}

fn longest_run(dates: &[NaiveDate]) -> u32 {
    let mut longest = 0;
    let mut current = 0;
    let mut previous: Option<NaiveDate> = None;
    for &date in dates {
        current = match previous {
            Some(p) if p == date => current,
            Some(p) if p.checked_add_days(Days::new(1)) == Some(date) => current + 1,
            _ => 1,
        };
        longest = longest.max(current);
        previous = Some(date);
    }
    longest
}

/// Derives the six factors from completed shifts that started in the
/// seven days before `as_of`.
///
/// Shifts without a clock-out are ignored.
pub fn derive_factors(shifts: &[Shift], as_of: NaiveDateTime) -> FatigueFactors {
    let window_start = as_of
        .checked_sub_days(Days::new(TRAILING_WINDOW_DAYS))
        .unwrap_or(as_of);
    let mut recent: Vec<&Shift> = shifts
        .iter()
        .filter(|s| s.actual_end.is_some())
        .filter(|s| s.actual_start >= window_start && s.actual_start < as_of)
        .collect();
    recent.sort_by_key(|s| s.actual_start);

    let standard = Decimal::from(STANDARD_SHIFT_HOURS);
    let reference_rest = Decimal::from(REFERENCE_REST_HOURS);

    let total_hours = recent.iter().map(|s| worked_hours(s)).sum();
    let night_shifts = recent.iter().filter(|s| is_night_shift(s)).count() as u32;
    let overtime_hours = recent
        .iter()
        .map(|s| {
            s.overtime_hours
                .unwrap_or_else(|| (worked_hours(s) - standard).max(Decimal::ZERO))
        })
        .sum();
    let longest_shift_hours = recent
        .iter()
        .filter_map(|s| s.elapsed_hours())
        .max()
        .unwrap_or(Decimal::ZERO);

    let mut rest_deficit_hours = Decimal::ZERO;
    for pair in recent.windows(2) {
        if let Some(end) = pair[0].actual_end {
            let gap = minutes_to_hours((pair[1].actual_start - end).num_minutes().max(0));
            rest_deficit_hours += (reference_rest - gap).max(Decimal::ZERO);
        }
    }

    let dates: Vec<NaiveDate> = recent.iter().map(|s| s.work_date()).collect();

    FatigueFactors {
        total_hours,
        night_shifts,
        consecutive_days: longest_run(&dates),
        overtime_hours,
        rest_deficit_hours,
        longest_shift_hours,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn shift(id: &str, start: &str, hours: i64) -> Shift {
        let start = dt(start);
        Shift::completed(id, "emp_001", start, start + chrono::Duration::hours(hours))
    }

    #[test]
    fn test_weights_sum_to_one() {
        let total: Decimal = FatigueFactor::ALL.iter().map(|f| f.weight()).sum();
        assert_eq!(total, Decimal::ONE);
    }

    #[test]
    fn test_empty_history_scores_zero() {
        let (score, breakdown) = score_factors(&FatigueFactors::default());
        assert_eq!(score, Decimal::ZERO);
        assert!(breakdown.iter().all(|f| f.sub_score == Decimal::ZERO));
    }

    #[test]
    fn test_saturated_factors_score_hundred() {
        let factors = FatigueFactors {
            total_hours: dec("80"),
            night_shifts: 7,
            consecutive_days: 12,
            overtime_hours: dec("30"),
            rest_deficit_hours: dec("15"),
            longest_shift_hours: dec("20"),
        };
        let (score, _) = score_factors(&factors);
        assert_eq!(score, Decimal::from(100));
        assert_eq!(FatigueLevel::from_score(score), FatigueLevel::Critical);
    }

    #[test]
    fn test_level_bands() {
        assert_eq!(FatigueLevel::from_score(dec("29.99")), FatigueLevel::Low);
        assert_eq!(FatigueLevel::from_score(dec("30")), FatigueLevel::Moderate);
        assert_eq!(FatigueLevel::from_score(dec("60")), FatigueLevel::High);
        assert_eq!(FatigueLevel::from_score(dec("84.99")), FatigueLevel::High);
        assert_eq!(FatigueLevel::from_score(dec("85")), FatigueLevel::Critical);
    }

    #[test]
    fn test_breach_thresholds() {
        let factors = FatigueFactors {
            total_hours: dec("50"),
            consecutive_days: 6,
            rest_deficit_hours: dec("2"),
            longest_shift_hours: dec("12"),
            ..FatigueFactors::default()
        };
        let breaches = detect_breaches(&factors);
        assert_eq!(breaches.len(), 3);
        assert!(breaches.iter().all(|b| b.severity == BreachSeverity::Warning));

        let factors = FatigueFactors {
            total_hours: dec("61"),
            consecutive_days: 8,
            rest_deficit_hours: dec("5.5"),
            longest_shift_hours: dec("13.5"),
            ..FatigueFactors::default()
        };
        let breaches = detect_breaches(&factors);
        assert_eq!(breaches.len(), 4);
        assert!(breaches.iter().all(|b| b.severity == BreachSeverity::Error));
    }

    #[test]
    fn test_derive_factors_from_history() {
        // Seven consecutive days; the last gap is only 6 hours.
        let mut shifts: Vec<Shift> = (1..=6)
            .map(|d| shift(&format!("s{}", d), &format!("2026-03-0{} 08:00:00", d), 10))
            .collect();
        shifts.push(shift("s7", "2026-03-07 00:00:00", 8));
        // Outside the window.
        shifts.push(shift("old", "2026-02-20 08:00:00", 10));

        let factors = derive_factors(&shifts, dt("2026-03-08 08:00:00"));

        assert_eq!(factors.consecutive_days, 7);
        assert_eq!(factors.total_hours, dec("68"));
        assert_eq!(factors.overtime_hours, dec("12"));
        assert_eq!(factors.longest_shift_hours, dec("10"));
        // Five 14 hour gaps contribute nothing; 18:00 → 00:00 is 5 hours short.
        assert_eq!(factors.rest_deficit_hours, dec("5"));
        assert_eq!(factors.night_shifts, 1);
    }

    #[test]
    fn test_open_shift_ignored() {
        let mut open = shift("open", "2026-03-07 08:00:00", 8);
        open.actual_end = None;
        let factors = derive_factors(&[open], dt("2026-03-08 08:00:00"));
        assert_eq!(factors, FatigueFactors::default());
    }

    #[test]
    fn test_recommendations_follow_level() {
        let factors = FatigueFactors::default();
        assert_eq!(recommendations(FatigueLevel::Low, &factors, &[]).len(), 1);
        let critical = recommendations(FatigueLevel::Critical, &factors, &[]);
        assert!(critical[0].contains("Do not schedule"));
    }

    fn factors_strategy() -> impl Strategy<Value = FatigueFactors> {
        (0u32..100, 0u32..10, 0u32..15, 0u32..40, 0u32..20, 0u32..24).prop_map(
            |(hours, nights, days, overtime, deficit, longest)| FatigueFactors {
                total_hours: Decimal::from(hours),
                night_shifts: nights,
                consecutive_days: days,
                overtime_hours: Decimal::from(overtime),
                rest_deficit_hours: Decimal::from(deficit),
                longest_shift_hours: Decimal::from(longest),
            },
        )
    }

    proptest! {
        #[test]
        fn prop_score_monotonic_in_each_factor(
            factors in factors_strategy(),
            factor_index in 0usize..6,
            bump in 1u32..20,
        ) {
            let mut more = factors.clone();
            let extra = Decimal::from(bump);
            match FatigueFactor::ALL[factor_index] {
                FatigueFactor::TotalHours => more.total_hours += extra,
                FatigueFactor::NightShifts => more.night_shifts += bump,
                FatigueFactor::ConsecutiveDays => more.consecutive_days += bump,
                FatigueFactor::OvertimeHours => more.overtime_hours += extra,
                FatigueFactor::RestDeficit => more.rest_deficit_hours += extra,
                FatigueFactor::LongestShift => more.longest_shift_hours += extra,
            }
            let (before, _) = score_factors(&factors);
            let (after, _) = score_factors(&more);
            prop_assert!(after >= before);
            prop_assert!(after <= Decimal::from(100));
            prop_assert!(before >= Decimal::ZERO);
        }
    }
}
