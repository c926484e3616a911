//! Per-employee fatigue assessment and rest gating over stored shifts.

use std::sync::Arc;

use chrono::{Days, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::score::{
    FactorScore, FatigueBreach, FatigueFactors, FatigueLevel, TRAILING_WINDOW_DAYS,
    derive_factors, detect_breaches, recommendations, score_factors,
};
use crate::calculation::minutes_to_hours;
use crate::error::{EngineError, EngineResult};
use crate::models::{Policy, Shift};
use crate::observability::{EngineEvent, SharedObserver};
use crate::repository::ShiftRepository;

/// How far back to look for the shift preceding a proposed start.
pub const REST_LOOKBACK_DAYS: u64 = 14;

/// Preceding-shift length treated as excessive when the policy sets no daily maximum.
pub const DEFAULT_LONG_SHIFT_HOURS: i64 = 12;

/// Fatigue score and its breakdown for one employee.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FatigueAssessment {
    /// Employee assessed.
    pub employee_id: String,
    /// End of the window (exclusive).
    pub as_of: NaiveDateTime,
    /// Start of the window.
    pub window_start: NaiveDateTime,
    /// Combined score, 0–100.
    pub score: Decimal,
    /// Level band.
    pub level: FatigueLevel,
    /// Raw factor values.
    pub factors: FatigueFactors,
    /// Per-factor contributions.
    pub breakdown: Vec<FactorScore>,
    /// Limits broken or approached.
    pub breaches: Vec<FatigueBreach>,
    /// Advice for the scheduler.
    pub recommendations: Vec<String>,
    /// Number of completed shifts in the window.
    pub shifts_considered: usize,
}

/// How far short of minimum rest a proposed start is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RestSeverity {
    /// Less than 2 hours short.
    Low,
    /// 2 to 4 hours short.
    Medium,
    /// 4 or more hours short.
    High,
}

impl RestSeverity {
    /// Maps a shortfall in hours to a severity.
    pub fn from_shortfall(hours_short: Decimal) -> Self {
        if hours_short < Decimal::from(2) {
            RestSeverity::Low
        } else if hours_short < Decimal::from(4) {
            RestSeverity::Medium
        } else {
            RestSeverity::High
        }
    }

    fn label(self) -> &'static str {
        match self {
            RestSeverity::Low => "LOW",
            RestSeverity::Medium => "MEDIUM",
            RestSeverity::High => "HIGH",
        }
    }
}

/// Result of checking a proposed start against the policy's minimum rest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestCompliance {
    /// Employee checked.
    pub employee_id: String,
    /// Proposed shift start.
    pub proposed_start: NaiveDateTime,
    /// Policy minimum rest, in hours.
    pub minimum_rest_hours: Decimal,
    /// The preceding completed shift, if any.
    pub last_shift_id: Option<String>,
    /// When the preceding shift ended.
    pub last_shift_end: Option<NaiveDateTime>,
    /// Hours of rest before the proposed start. `None` without a preceding shift.
    pub hours_rest: Option<Decimal>,
    /// Hours short of the minimum (zero when compliant).
    pub hours_short: Decimal,
    /// Whether the minimum is met.
    pub compliant: bool,
    /// Severity of a breach.
    pub severity: Option<RestSeverity>,
}

/// Whether an employee may start a proposed shift, and why not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FitnessDecision {
    /// True when no blocking reason was found.
    pub fit: bool,
    /// Blocking reasons.
    pub reasons: Vec<String>,
    /// Fatigue as of the proposed start.
    pub fatigue: FatigueAssessment,
    /// Rest check for the proposed start.
    pub rest: RestCompliance,
}

/// Scores fatigue and gates shift starts on rest and fatigue.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use chrono::NaiveDateTime;
/// use overtime_engine::fatigue::{FatigueLevel, FatigueTracker};
/// use overtime_engine::observability::noop;
/// use overtime_engine::repository::InMemoryStore;
///
/// let tracker = FatigueTracker::new(Arc::new(InMemoryStore::new()), noop());
/// let as_of = NaiveDateTime::parse_from_str("2026-03-08 00:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
/// let assessment = tracker.calculate_fatigue_score("emp_001", as_of).unwrap();
///
/// assert_eq!(assessment.level, FatigueLevel::Low);
/// assert_eq!(assessment.shifts_considered, 0);
/// ```
#[derive(Clone)]
pub struct FatigueTracker {
    shifts: Arc<dyn ShiftRepository>,
    observer: SharedObserver,
}

impl std::fmt::Debug for FatigueTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FatigueTracker").finish_non_exhaustive()
    }
}

impl FatigueTracker {
    /// Creates a tracker over stored shifts.
    pub fn new(shifts: Arc<dyn ShiftRepository>, observer: SharedObserver) -> Self {
        Self { shifts, observer }
    }

    /// Scores the completed shifts that started in the seven days before `as_of`.
    pub fn calculate_fatigue_score(
        &self,
        employee_id: &str,
        as_of: NaiveDateTime,
    ) -> EngineResult<FatigueAssessment> {
        let window_start = as_of
            .checked_sub_days(Days::new(TRAILING_WINDOW_DAYS))
            .unwrap_or(as_of);
        let shifts = self
            .shifts
            .shifts_for_employee(employee_id, window_start, as_of)?;

        let factors = derive_factors(&shifts, as_of);
        let (score, breakdown) = score_factors(&factors);
        let level = FatigueLevel::from_score(score);
        let breaches = detect_breaches(&factors);
        let advice = recommendations(level, &factors, &breaches);

        self.observer.on_event(&EngineEvent::FatigueAssessed {
            employee_id: employee_id.to_string(),
            score,
            level: format!("{:?}", level).to_uppercase(),
        });

        Ok(FatigueAssessment {
            employee_id: employee_id.to_string(),
            as_of,
            window_start,
            score,
            level,
            factors,
            breakdown,
            breaches,
            recommendations: advice,
            shifts_considered: shifts.iter().filter(|s| s.actual_end.is_some()).count(),
        })
    }

    fn preceding_shift(
        &self,
        employee_id: &str,
        proposed_start: NaiveDateTime,
    ) -> EngineResult<Option<Shift>> {
        let from = proposed_start
            .checked_sub_days(Days::new(REST_LOOKBACK_DAYS))
            .unwrap_or(proposed_start);
        Ok(self
            .shifts
            .shifts_for_employee(employee_id, from, proposed_start)?
            .into_iter()
            .filter(|s| s.actual_end.is_some())
            .max_by_key(|s| s.actual_end))
    }

    /// Measures rest between the last completed shift and `proposed_start`.
    ///
    /// A preceding shift that overlaps the proposed start counts as zero rest.
    /// A breach emits `RestBreachDetected`.
    pub fn check_rest_compliance(
        &self,
        employee_id: &str,
        proposed_start: NaiveDateTime,
        policy: &Policy,
    ) -> EngineResult<RestCompliance> {
        let minimum = policy.safety.minimum_rest_hours;
        let previous = self.preceding_shift(employee_id, proposed_start)?;
        let last_shift_end = previous.as_ref().and_then(|s| s.actual_end);

        let hours_rest = last_shift_end
            .map(|end| minutes_to_hours((proposed_start - end).num_minutes().max(0)));
        let hours_short = hours_rest
            .map(|rest| (minimum - rest).max(Decimal::ZERO))
            .unwrap_or(Decimal::ZERO);
        let compliant = hours_short == Decimal::ZERO;
        let severity = (!compliant).then(|| RestSeverity::from_shortfall(hours_short));

        if let (Some(severity), Some(rest)) = (severity, hours_rest) {
            self.observer.on_event(&EngineEvent::RestBreachDetected {
                employee_id: employee_id.to_string(),
                hours_rest: rest,
                hours_short,
                severity: severity.label().to_string(),
            });
        }

        Ok(RestCompliance {
            employee_id: employee_id.to_string(),
            proposed_start,
            minimum_rest_hours: minimum,
            last_shift_id: previous.map(|s| s.id),
            last_shift_end,
            hours_rest,
            hours_short,
            compliant,
            severity,
        })
    }

    /// Decides whether `employee_id` may start a shift of `duration_hours` at
    /// `proposed_start`.
    ///
    /// Unfit when fatigue is critical, minimum rest is breached, the preceding
    /// shift was excessively long, or the proposed shift exceeds the policy's
    /// daily maximum.
    pub fn is_fit_for_shift(
        &self,
        employee_id: &str,
        proposed_start: NaiveDateTime,
        duration_hours: Decimal,
        policy: &Policy,
    ) -> EngineResult<FitnessDecision> {
        let fatigue = self.calculate_fatigue_score(employee_id, proposed_start)?;
        let rest = self.check_rest_compliance(employee_id, proposed_start, policy)?;
        let long_shift = policy
            .safety
            .max_daily_hours
            .unwrap_or_else(|| Decimal::from(DEFAULT_LONG_SHIFT_HOURS));

        let mut reasons = Vec::new();
        if fatigue.level == FatigueLevel::Critical {
            reasons.push(format!("fatigue score {} is critical", fatigue.score));
        }
        if !rest.compliant {
            reasons.push(format!(
                "only {} hours rest, {} hours short of the {} hour minimum",
                rest.hours_rest.unwrap_or(Decimal::ZERO).normalize(),
                rest.hours_short.normalize(),
                rest.minimum_rest_hours.normalize()
            ));
        }
        if let Some(previous) = &rest.last_shift_id
            && let Ok(shift) = self.shifts.get_shift(previous)
            && let Some(hours) = shift.elapsed_hours()
            && hours > long_shift
        {
            reasons.push(format!(
                "preceding shift lasted {} hours (more than {})",
                hours.normalize(),
                long_shift.normalize()
            ));
        }
        if let Some(max_daily) = policy.safety.max_daily_hours
            && duration_hours > max_daily
        {
            reasons.push(format!(
                "proposed {} hour shift exceeds the {} hour daily maximum",
                duration_hours.normalize(),
                max_daily.normalize()
            ));
        }

        Ok(FitnessDecision {
            fit: reasons.is_empty(),
            reasons,
            fatigue,
            rest,
        })
    }

    /// Like [`is_fit_for_shift`](Self::is_fit_for_shift) but turns critical
    /// fatigue and rest breaches into errors.
    ///
    /// Other unfit reasons come back as a decision with `fit == false` for
    /// supervisor review.
    pub fn require_fit_for_shift(
        &self,
        employee_id: &str,
        proposed_start: NaiveDateTime,
        duration_hours: Decimal,
        policy: &Policy,
    ) -> EngineResult<FitnessDecision> {
        let decision = self.is_fit_for_shift(employee_id, proposed_start, duration_hours, policy)?;
        if decision.fatigue.level == FatigueLevel::Critical {
            return Err(EngineError::CriticalFatigue {
                employee_id: employee_id.to_string(),
                score: decision.fatigue.score,
            });
        }
        if !decision.rest.compliant {
            return Err(EngineError::RestBreach {
                employee_id: employee_id.to_string(),
                proposed_start,
                hours_rest: decision.rest.hours_rest.unwrap_or(Decimal::ZERO),
                hours_short: decision.rest.hours_short,
            });
        }
        Ok(decision)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::{RecordingObserver, noop};
    use crate::policy::templates;
    use crate::repository::InMemoryStore;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn store_with(shifts: &[(&str, &str, i64)]) -> Arc<InMemoryStore> {
        let store = Arc::new(InMemoryStore::new());
        for (id, start, hours) in shifts {
            let start = dt(start);
            store
                .save_shift(Shift::completed(
                    *id,
                    "emp_001",
                    start,
                    start + chrono::Duration::hours(*hours),
                ))
                .unwrap();
        }
        store
    }

    /// Seven consecutive shifts; the last ends at 02:00 on 2026-03-08.
    fn seven_day_run() -> Arc<InMemoryStore> {
        store_with(&[
            ("s1", "2026-03-01 08:00:00", 10),
            ("s2", "2026-03-02 08:00:00", 10),
            ("s3", "2026-03-03 08:00:00", 10),
            ("s4", "2026-03-04 08:00:00", 10),
            ("s5", "2026-03-05 08:00:00", 10),
            ("s6", "2026-03-06 08:00:00", 10),
            ("s7", "2026-03-07 18:00:00", 8),
        ])
    }

    #[test]
    fn test_rest_breach_scenario() {
        let recorder = Arc::new(RecordingObserver::new());
        let tracker = FatigueTracker::new(seven_day_run(), recorder.clone());
        let policy = templates::uk_nhs().unwrap();

        let rest = tracker
            .check_rest_compliance("emp_001", dt("2026-03-08 08:00:00"), &policy)
            .unwrap();

        assert!(!rest.compliant);
        assert_eq!(rest.last_shift_id.as_deref(), Some("s7"));
        assert_eq!(rest.hours_rest, Some(dec("6")));
        assert_eq!(rest.hours_short, dec("5"));
        assert_eq!(rest.severity, Some(RestSeverity::High));
        assert!(recorder.events().iter().any(|e| matches!(
            e,
            EngineEvent::RestBreachDetected { severity, .. } if severity == "HIGH"
        )));
    }

    #[test]
    fn test_rest_breach_makes_employee_unfit() {
        let tracker = FatigueTracker::new(seven_day_run(), noop());
        let policy = templates::uk_nhs().unwrap();
        let start = dt("2026-03-08 08:00:00");

        let decision = tracker
            .is_fit_for_shift("emp_001", start, dec("8"), &policy)
            .unwrap();
        assert!(!decision.fit);
        assert!(decision.reasons.iter().any(|r| r.contains("5 hours short")));

        let err = tracker
            .require_fit_for_shift("emp_001", start, dec("8"), &policy)
            .unwrap_err();
        assert!(matches!(err, EngineError::RestBreach { .. }));
        assert!(err.is_safety_or_hard_stop());
    }

    #[test]
    fn test_rest_severity_bands() {
        assert_eq!(RestSeverity::from_shortfall(dec("1.5")), RestSeverity::Low);
        assert_eq!(RestSeverity::from_shortfall(dec("2")), RestSeverity::Medium);
        assert_eq!(RestSeverity::from_shortfall(dec("3.99")), RestSeverity::Medium);
        assert_eq!(RestSeverity::from_shortfall(dec("4")), RestSeverity::High);
    }

    #[test]
    fn test_compliant_rest_and_no_history() {
        let store = store_with(&[("s1", "2026-03-02 08:00:00", 8)]);
        let tracker = FatigueTracker::new(store, noop());
        let policy = templates::uk_nhs().unwrap();

        let rest = tracker
            .check_rest_compliance("emp_001", dt("2026-03-03 08:00:00"), &policy)
            .unwrap();
        assert!(rest.compliant);
        assert_eq!(rest.hours_rest, Some(dec("16")));
        assert_eq!(rest.severity, None);

        let rest = tracker
            .check_rest_compliance("emp_002", dt("2026-03-03 08:00:00"), &policy)
            .unwrap();
        assert!(rest.compliant);
        assert_eq!(rest.hours_rest, None);
    }

    #[test]
    fn test_overlapping_preceding_shift_counts_as_zero_rest() {
        let store = store_with(&[("s1", "2026-03-02 20:00:00", 12)]);
        let tracker = FatigueTracker::new(store, noop());
        let policy = templates::us_california().unwrap();

        let rest = tracker
            .check_rest_compliance("emp_001", dt("2026-03-03 07:00:00"), &policy)
            .unwrap();
        assert_eq!(rest.hours_rest, Some(Decimal::ZERO));
        assert_eq!(rest.hours_short, dec("8"));
    }

    #[test]
    fn test_fatigue_score_for_seven_day_run() {
        let recorder = Arc::new(RecordingObserver::new());
        let tracker = FatigueTracker::new(seven_day_run(), recorder.clone());

        let assessment = tracker
            .calculate_fatigue_score("emp_001", dt("2026-03-08 08:00:00"))
            .unwrap();

        assert_eq!(assessment.shifts_considered, 7);
        assert_eq!(assessment.factors.consecutive_days, 7);
        assert_eq!(assessment.factors.total_hours, dec("68"));
        assert!(assessment.score > Decimal::from(30));
        assert!(assessment.level >= FatigueLevel::Moderate);
        assert!(!assessment.breaches.is_empty());
        assert!(matches!(
            recorder.events().last(),
            Some(EngineEvent::FatigueAssessed { .. })
        ));
    }

    #[test]
    fn test_long_preceding_shift_is_unfit_but_not_an_error() {
        let store = store_with(&[("s1", "2026-03-02 06:00:00", 14)]);
        let tracker = FatigueTracker::new(store, noop());
        let policy = templates::uk_nhs().unwrap();
        let start = dt("2026-03-03 10:00:00");

        let decision = tracker
            .require_fit_for_shift("emp_001", start, dec("8"), &policy)
            .unwrap();
        assert!(!decision.fit);
        assert!(decision.reasons[0].contains("preceding shift lasted 14 hours"));
    }

    #[test]
    fn test_proposed_shift_over_daily_maximum() {
        let tracker = FatigueTracker::new(Arc::new(InMemoryStore::new()), noop());
        let policy = templates::uk_nhs().unwrap();

        let decision = tracker
            .is_fit_for_shift("emp_001", dt("2026-03-03 08:00:00"), dec("14"), &policy)
            .unwrap();
        assert!(!decision.fit);
        assert_eq!(decision.reasons.len(), 1);

        let decision = tracker
            .is_fit_for_shift("emp_001", dt("2026-03-03 08:00:00"), dec("8"), &policy)
            .unwrap();
        assert!(decision.fit);
    }
}
