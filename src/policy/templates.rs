//! Jurisdiction policy templates.
//!
//! Templates are reference data, kept as YAML under `config/policies/` and
//! embedded at compile time so they are reviewed and versioned like any other
//! configuration file.

use crate::error::{EngineError, EngineResult};
use crate::models::Policy;

const US_FEDERAL: &str = include_str!("../../config/policies/us_federal.yaml");
const US_CALIFORNIA: &str = include_str!("../../config/policies/us_california.yaml");
const UK_NHS: &str = include_str!("../../config/policies/uk_nhs.yaml");
const EU_WTD: &str = include_str!("../../config/policies/eu_wtd.yaml");
const ZA_BCEA: &str = include_str!("../../config/policies/za_bcea.yaml");
const NG_LABOUR: &str = include_str!("../../config/policies/ng_labour.yaml");

/// Template file names and contents, in seeding order.
pub const TEMPLATE_SOURCES: [(&str, &str); 6] = [
    ("us_federal.yaml", US_FEDERAL),
    ("us_california.yaml", US_CALIFORNIA),
    ("uk_nhs.yaml", UK_NHS),
    ("eu_wtd.yaml", EU_WTD),
    ("za_bcea.yaml", ZA_BCEA),
    ("ng_labour.yaml", NG_LABOUR),
];

/// Parses and validates one policy document.
pub fn parse_policy(source: &str, content: &str) -> EngineResult<Policy> {
    let policy: Policy =
        serde_yaml::from_str(content).map_err(|e| EngineError::ConfigParseError {
            path: source.to_string(),
            message: e.to_string(),
        })?;
    policy.validate()?;
    Ok(policy)
}

/// US federal (FLSA): weekly overtime after 40 hours, `HIGHEST` stacking.
pub fn us_federal() -> EngineResult<Policy> {
    parse_policy("us_federal.yaml", US_FEDERAL)
}

/// California: daily 8/12, weekly 40, seventh day, split shift and break penalties, `HIGHEST` stacking.
///
/// # Example
///
/// ```
/// use overtime_engine::models::StackingStrategy;
/// use overtime_engine::policy::templates;
///
/// let policy = templates::us_california().unwrap();
/// assert_eq!(policy.state_province.as_deref(), Some("CA"));
/// assert_eq!(policy.stacking, StackingStrategy::Highest);
/// ```
pub fn us_california() -> EngineResult<Policy> {
    parse_policy("us_california.yaml", US_CALIFORNIA)
}

/// UK NHS Agenda for Change: unsocial hours and on-call, `ADD_ON` stacking.
pub fn uk_nhs() -> EngineResult<Policy> {
    parse_policy("uk_nhs.yaml", UK_NHS)
}

/// EU Working Time Directive safety limits.
pub fn eu_wtd() -> EngineResult<Policy> {
    parse_policy("eu_wtd.yaml", EU_WTD)
}

/// South Africa BCEA.
pub fn za_bcea() -> EngineResult<Policy> {
    parse_policy("za_bcea.yaml", ZA_BCEA)
}

/// Nigeria Labour Act.
pub fn ng_labour() -> EngineResult<Policy> {
    parse_policy("ng_labour.yaml", NG_LABOUR)
}

/// All six templates, in seeding order.
pub fn all() -> EngineResult<Vec<Policy>> {
    TEMPLATE_SOURCES
        .iter()
        .map(|(source, content)| parse_policy(source, content))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PremiumKind, StackingStrategy};
    use rust_decimal::Decimal;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_all_templates_parse_and_validate() {
        let policies = all().unwrap();
        assert_eq!(policies.len(), 6);
        let countries: Vec<&str> = policies.iter().map(|p| p.country.as_str()).collect();
        assert_eq!(countries, vec!["US", "US", "GB", "EU", "ZA", "NG"]);
    }

    #[test]
    fn test_federal_is_weekly_only() {
        let policy = us_federal().unwrap();
        assert!(policy.thresholds.daily_hours.is_none());
        assert!(policy.premium(PremiumKind::WeeklyOvertime).is_some());
        assert!(policy.premium(PremiumKind::DailyOvertime).is_none());
    }

    #[test]
    fn test_california_ladder() {
        let policy = us_california().unwrap();
        let daily = policy.daily_overtime().unwrap();
        assert_eq!(policy.thresholds.daily_hours, Some(dec("8")));
        assert_eq!(daily.multiplier, dec("1.5"));
        assert_eq!(daily.tier2.as_ref().unwrap().after_hours, dec("12"));
        for kind in [
            PremiumKind::ConsecutiveDay,
            PremiumKind::SplitShift,
            PremiumKind::MealBreak,
            PremiumKind::RestBreak,
        ] {
            assert!(policy.premium(kind).is_some(), "{:?} missing", kind);
        }
    }

    #[test]
    fn test_nhs_adds_on_and_has_on_call() {
        let policy = uk_nhs().unwrap();
        assert_eq!(policy.stacking, StackingStrategy::AddOn);
        assert_eq!(policy.safety.minimum_rest_hours, dec("11"));
        assert_eq!(policy.on_call.unwrap().callout_minimum_hours, dec("3"));
    }

    #[test]
    fn test_eu_safety_limits() {
        let policy = eu_wtd().unwrap();
        assert_eq!(policy.safety.max_weekly_hours, Some(dec("48")));
        assert!(policy.safety.opt_out_allowed);
    }

    #[test]
    fn test_malformed_template_reports_source() {
        let err = parse_policy("broken.yaml", "name: [").unwrap_err();
        assert!(matches!(err, EngineError::ConfigParseError { ref path, .. } if path == "broken.yaml"));
    }
}
