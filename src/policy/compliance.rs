//! Hard safety limit checks.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::Policy;

/// Which limit a violation concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ComplianceLimit {
    /// Maximum hours in one day.
    MaxDailyHours,
    /// Maximum consecutive days worked.
    MaxConsecutiveDays,
    /// Minimum rest between shifts.
    MinimumRest,
}

/// One violated limit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceViolation {
    /// The limit violated.
    pub limit: ComplianceLimit,
    /// The limit's configured value.
    pub limit_value: Decimal,
    /// The observed value.
    pub actual: Decimal,
    /// Human-readable description.
    pub message: String,
}

/// Result of [`validate_compliance`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComplianceReport {
    /// True when no limit is violated.
    pub compliant: bool,
    /// Violated limits, in check order.
    pub violations: Vec<ComplianceViolation>,
}

/// Checks worked hours, consecutive days and rest against the policy's hard limits.
///
/// `hours_since_last_shift` is `None` when there is no previous shift. Limits
/// the policy does not set are not checked.
///
/// # Example
///
/// ```
/// use overtime_engine::policy::{ComplianceLimit, templates, validate_compliance};
/// use rust_decimal::Decimal;
///
/// let policy = templates::uk_nhs().unwrap();
/// let report = validate_compliance(Decimal::from(14), 3, Some(Decimal::from(9)), &policy);
///
/// assert!(!report.compliant);
/// let limits: Vec<_> = report.violations.iter().map(|v| v.limit).collect();
/// assert_eq!(limits, vec![ComplianceLimit::MaxDailyHours, ComplianceLimit::MinimumRest]);
/// ```
pub fn validate_compliance(
    hours_worked: Decimal,
    consecutive_days: u32,
    hours_since_last_shift: Option<Decimal>,
    policy: &Policy,
) -> ComplianceReport {
    let safety = &policy.safety;
    let mut violations = Vec::new();

    if let Some(max) = safety.max_daily_hours
        && hours_worked > max
    {
        violations.push(ComplianceViolation {
            limit: ComplianceLimit::MaxDailyHours,
            limit_value: max,
            actual: hours_worked,
            message: format!(
                "{} hours exceeds the daily maximum of {} hours",
                hours_worked.normalize(),
                max.normalize()
            ),
        });
    }

    if let Some(max) = safety.max_consecutive_days
        && consecutive_days > max
    {
        violations.push(ComplianceViolation {
            limit: ComplianceLimit::MaxConsecutiveDays,
            limit_value: Decimal::from(max),
            actual: Decimal::from(consecutive_days),
            message: format!(
                "{} consecutive days exceeds the maximum of {}",
                consecutive_days, max
            ),
        });
    }

    if let Some(rest) = hours_since_last_shift
        && rest < safety.minimum_rest_hours
    {
        violations.push(ComplianceViolation {
            limit: ComplianceLimit::MinimumRest,
            limit_value: safety.minimum_rest_hours,
            actual: rest,
            message: format!(
                "{} hours rest is {} hours short of the {} hour minimum",
                rest.normalize(),
                (safety.minimum_rest_hours - rest).normalize(),
                safety.minimum_rest_hours.normalize()
            ),
        });
    }

    ComplianceReport {
        compliant: violations.is_empty(),
        violations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::policy::templates;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_within_limits() {
        let policy = templates::eu_wtd().unwrap();
        let report = validate_compliance(dec("8"), 5, Some(dec("12")), &policy);
        assert!(report.compliant);
        assert!(report.violations.is_empty());
    }

    #[test]
    fn test_all_limits_violated() {
        let policy = templates::eu_wtd().unwrap();
        let report = validate_compliance(dec("13.5"), 7, Some(dec("10")), &policy);
        assert!(!report.compliant);
        assert_eq!(report.violations.len(), 3);
        assert_eq!(report.violations[2].actual, dec("10"));
        assert!(report.violations[2].message.contains("1 hours short"));
    }

    #[test]
    fn test_boundaries_are_compliant() {
        let policy = templates::eu_wtd().unwrap();
        let report = validate_compliance(dec("13"), 6, Some(dec("11")), &policy);
        assert!(report.compliant);
    }

    #[test]
    fn test_unset_limits_are_not_checked() {
        let policy = templates::us_federal().unwrap();
        let report = validate_compliance(dec("20"), 14, None, &policy);
        assert!(report.compliant);
    }
}
