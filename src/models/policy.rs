//! Overtime policy model.
//!
//! A [`Policy`] describes one jurisdiction/sector's overtime rules for one
//! version. Premiums are a tagged union ([`PremiumRule`]) so every premium
//! kind carries exactly the fields it needs and malformed shapes are rejected
//! when the policy is loaded, not when it is used.

use chrono::{Days, NaiveDate, NaiveTime, Weekday};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult};

use super::AuditRecord;

/// How multiple fired premiums are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StackingStrategy {
    /// Every premium is paid independently.
    AddOn,
    /// Only the premium with the greatest multiplier is paid.
    Highest,
    /// As `Highest`, but the surviving rate replaces the base rate.
    Replace,
}

/// Direction used when rounding worked minutes to an increment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingMethod {
    /// No rounding; exact minutes are used.
    #[default]
    None,
    /// Round to the nearest increment (half rounds up).
    Nearest,
    /// Round up to the next increment.
    Up,
    /// Round down to the previous increment.
    Down,
}

/// Time-capture rounding rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundingRule {
    /// Rounding direction.
    #[serde(default)]
    pub method: RoundingMethod,
    /// Increment in minutes (6, 15 or 30).
    #[serde(default = "default_increment")]
    pub increment_minutes: u32,
    /// Minutes past an increment boundary that are forgiven before rounding.
    #[serde(default)]
    pub grace_minutes: u32,
}

fn default_increment() -> u32 {
    15
}

impl Default for RoundingRule {
    fn default() -> Self {
        Self {
            method: RoundingMethod::None,
            increment_minutes: default_increment(),
            grace_minutes: 0,
        }
    }
}

/// Weekly and daily hour thresholds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HourThresholds {
    /// Hours per week before weekly overtime applies.
    pub weekly_hours: Decimal,
    /// Hours per day before daily overtime applies, if the jurisdiction has daily overtime.
    #[serde(default)]
    pub daily_hours: Option<Decimal>,
    /// Weekday on which the overtime week resets.
    #[serde(default = "default_week_start")]
    pub week_starts_on: Weekday,
}

fn default_week_start() -> Weekday {
    Weekday::Mon
}

/// A higher daily overtime tier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OvertimeTier {
    /// Worked hours after which this tier applies.
    pub after_hours: Decimal,
    /// Pay multiplier for hours in this tier.
    pub multiplier: Decimal,
    /// Payroll earning code.
    pub earning_code: String,
}

/// Daily overtime: hours beyond the policy's daily threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DailyOvertimeRule {
    /// Tier 1 multiplier.
    pub multiplier: Decimal,
    /// Tier 1 payroll earning code.
    pub earning_code: String,
    /// Optional tier 2 (e.g. double time after 12 hours).
    #[serde(default)]
    pub tier2: Option<OvertimeTier>,
    /// Statute or agreement clause.
    #[serde(default)]
    pub legal_reference: Option<String>,
}

/// Weekly overtime: hours beyond the weekly threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeeklyOvertimeRule {
    /// Pay multiplier.
    pub multiplier: Decimal,
    /// Payroll earning code.
    pub earning_code: String,
    /// Statute or agreement clause.
    #[serde(default)]
    pub legal_reference: Option<String>,
}

/// Night differential for hours inside a clock window (may wrap midnight).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NightRule {
    /// Window start (local time).
    pub window_start: NaiveTime,
    /// Window end (local time); earlier than start means the window wraps midnight.
    pub window_end: NaiveTime,
    /// Pay multiplier.
    pub multiplier: Decimal,
    /// Payroll earning code.
    pub earning_code: String,
    /// Statute or agreement clause.
    #[serde(default)]
    pub legal_reference: Option<String>,
}

/// Weekend premium, keyed on the shift's start date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeekendRule {
    /// Pay multiplier.
    pub multiplier: Decimal,
    /// Payroll earning code.
    pub earning_code: String,
    /// Days that count as the weekend.
    #[serde(default = "default_weekend_days")]
    pub days: Vec<Weekday>,
    /// Statute or agreement clause.
    #[serde(default)]
    pub legal_reference: Option<String>,
}

fn default_weekend_days() -> Vec<Weekday> {
    vec![Weekday::Sat, Weekday::Sun]
}

/// Public holiday premium.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HolidayRule {
    /// Default multiplier; a holiday's own multiplier takes precedence.
    pub multiplier: Decimal,
    /// Payroll earning code.
    pub earning_code: String,
    /// Statute or agreement clause.
    #[serde(default)]
    pub legal_reference: Option<String>,
}

/// Premium on the Nth consecutive day worked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConsecutiveDayRule {
    /// Consecutive day count (including the current day) that triggers the premium.
    pub trigger_day: u32,
    /// Pay multiplier.
    pub multiplier: Decimal,
    /// Payroll earning code.
    pub earning_code: String,
    /// Statute or agreement clause.
    #[serde(default)]
    pub legal_reference: Option<String>,
}

/// Flat penalty when a shift is split by a long unpaid gap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SplitShiftRule {
    /// Minimum gap, in minutes, that makes a shift a split shift.
    pub minimum_gap_minutes: i64,
    /// Flat units of pay owed.
    pub penalty_hours: Decimal,
    /// Multiplier applied to the flat units.
    #[serde(default = "default_penalty_multiplier")]
    pub multiplier: Decimal,
    /// Payroll earning code.
    pub earning_code: String,
    /// Statute or agreement clause.
    #[serde(default)]
    pub legal_reference: Option<String>,
}

/// Flat penalty when a required meal or rest break was not taken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BreakPenaltyRule {
    /// Worked hours above which the break is required.
    pub trigger_hours: Decimal,
    /// Minimum break length, in minutes, that satisfies the requirement.
    pub required_break_minutes: i64,
    /// Flat units of pay owed.
    pub penalty_hours: Decimal,
    /// Multiplier applied to the flat units.
    #[serde(default = "default_penalty_multiplier")]
    pub multiplier: Decimal,
    /// Payroll earning code.
    pub earning_code: String,
    /// Statute or agreement clause.
    #[serde(default)]
    pub legal_reference: Option<String>,
}

fn default_penalty_multiplier() -> Decimal {
    Decimal::ONE
}

/// One slot of a policy's premium ladder.
///
/// # Example
///
/// ```
/// use overtime_engine::models::{PremiumKind, PremiumRule};
///
/// let yaml = r#"
/// kind: weekly_overtime
/// multiplier: "1.5"
/// earning_code: OT_WEEKLY
/// "#;
/// let rule: PremiumRule = serde_yaml::from_str(yaml).unwrap();
/// assert_eq!(rule.kind(), PremiumKind::WeeklyOvertime);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PremiumRule {
    /// Daily overtime (tier 1 and optional tier 2).
    DailyOvertime(DailyOvertimeRule),
    /// Weekly overtime.
    WeeklyOvertime(WeeklyOvertimeRule),
    /// Night differential.
    NightDifferential(NightRule),
    /// Weekend premium.
    Weekend(WeekendRule),
    /// Public holiday premium.
    Holiday(HolidayRule),
    /// Nth consecutive day premium.
    ConsecutiveDay(ConsecutiveDayRule),
    /// Split shift penalty.
    SplitShift(SplitShiftRule),
    /// Missed meal break penalty.
    MealBreak(BreakPenaltyRule),
    /// Missed rest break penalty.
    RestBreak(BreakPenaltyRule),
}

/// Premium kinds in the fixed order the calculation engine evaluates them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PremiumKind {
    /// Daily overtime.
    DailyOvertime,
    /// Weekly overtime.
    WeeklyOvertime,
    /// Night differential.
    NightDifferential,
    /// Weekend premium.
    Weekend,
    /// Holiday premium.
    Holiday,
    /// Consecutive day premium.
    ConsecutiveDay,
    /// Split shift penalty.
    SplitShift,
    /// Meal break penalty.
    MealBreak,
    /// Rest break penalty.
    RestBreak,
}

impl PremiumKind {
    /// All kinds, in evaluation order.
    pub const EVALUATION_ORDER: [PremiumKind; 9] = [
        PremiumKind::DailyOvertime,
        PremiumKind::WeeklyOvertime,
        PremiumKind::NightDifferential,
        PremiumKind::Weekend,
        PremiumKind::Holiday,
        PremiumKind::ConsecutiveDay,
        PremiumKind::SplitShift,
        PremiumKind::MealBreak,
        PremiumKind::RestBreak,
    ];
}

impl PremiumRule {
    /// Returns the kind of this premium slot.
    pub fn kind(&self) -> PremiumKind {
        match self {
            PremiumRule::DailyOvertime(_) => PremiumKind::DailyOvertime,
            PremiumRule::WeeklyOvertime(_) => PremiumKind::WeeklyOvertime,
            PremiumRule::NightDifferential(_) => PremiumKind::NightDifferential,
            PremiumRule::Weekend(_) => PremiumKind::Weekend,
            PremiumRule::Holiday(_) => PremiumKind::Holiday,
            PremiumRule::ConsecutiveDay(_) => PremiumKind::ConsecutiveDay,
            PremiumRule::SplitShift(_) => PremiumKind::SplitShift,
            PremiumRule::MealBreak(_) => PremiumKind::MealBreak,
            PremiumRule::RestBreak(_) => PremiumKind::RestBreak,
        }
    }

    /// Returns every multiplier the slot declares.
    fn multipliers(&self) -> Vec<Decimal> {
        match self {
            PremiumRule::DailyOvertime(r) => {
                let mut m = vec![r.multiplier];
                if let Some(tier2) = &r.tier2 {
                    m.push(tier2.multiplier);
                }
                m
            }
            PremiumRule::WeeklyOvertime(r) => vec![r.multiplier],
            PremiumRule::NightDifferential(r) => vec![r.multiplier],
            PremiumRule::Weekend(r) => vec![r.multiplier],
            PremiumRule::Holiday(r) => vec![r.multiplier],
            PremiumRule::ConsecutiveDay(r) => vec![r.multiplier],
            PremiumRule::SplitShift(r) => vec![r.multiplier],
            PremiumRule::MealBreak(r) | PremiumRule::RestBreak(r) => vec![r.multiplier],
        }
    }
}

/// Hard safety limits used by compliance and fatigue checks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyLimits {
    /// Minimum rest between shifts, in hours.
    pub minimum_rest_hours: Decimal,
    /// Minimum uninterrupted weekly rest, in hours.
    #[serde(default)]
    pub weekly_rest_hours: Option<Decimal>,
    /// Maximum hours in one day.
    #[serde(default)]
    pub max_daily_hours: Option<Decimal>,
    /// Maximum hours in one week.
    #[serde(default)]
    pub max_weekly_hours: Option<Decimal>,
    /// Maximum consecutive days worked.
    #[serde(default)]
    pub max_consecutive_days: Option<u32>,
    /// Whether an individual may opt out of the weekly maximum.
    #[serde(default)]
    pub opt_out_allowed: bool,
}

/// On-call and call-out rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnCallPolicy {
    /// Multiplier paid for standby hours.
    pub standby_multiplier: Decimal,
    /// Earning code for standby hours.
    pub standby_earning_code: String,
    /// Multiplier paid for hours worked on a call-out.
    pub callout_multiplier: Decimal,
    /// Minimum hours paid for any call-out.
    pub callout_minimum_hours: Decimal,
    /// Earning code for call-out hours.
    pub callout_earning_code: String,
}

/// Compensatory time-off rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompTimePolicy {
    /// Whether overtime may be banked as time off.
    pub enabled: bool,
    /// Hours banked per overtime hour.
    pub accrual_multiplier: Decimal,
    /// Maximum comp-time balance, in hours.
    pub max_balance_hours: Decimal,
}

/// One level of the approval hierarchy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalLevel {
    /// Level number; lower levels are tried first.
    pub level: u32,
    /// Role that approves at this level.
    pub role: String,
    /// Largest number of hours this level may approve.
    #[serde(default)]
    pub max_hours: Option<Decimal>,
    /// Largest amount this level may approve.
    #[serde(default)]
    pub max_amount: Option<Decimal>,
}

/// Budget rules attached to a policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetRules {
    /// Whether overtime must be charged against a budget.
    #[serde(default)]
    pub require_budget: bool,
    /// Whether a soft cap may be exceeded with approval.
    #[serde(default = "default_true")]
    pub allow_soft_cap_override: bool,
    /// Default warning threshold percentage for new budgets.
    #[serde(default = "default_warning_pct")]
    pub warning_threshold_pct: Decimal,
    /// Default critical threshold percentage for new budgets.
    #[serde(default = "default_critical_pct")]
    pub critical_threshold_pct: Decimal,
}

fn default_true() -> bool {
    true
}

fn default_warning_pct() -> Decimal {
    Decimal::from(80)
}

fn default_critical_pct() -> Decimal {
    Decimal::from(95)
}

impl Default for BudgetRules {
    fn default() -> Self {
        Self {
            require_budget: false,
            allow_soft_cap_override: true,
            warning_threshold_pct: default_warning_pct(),
            critical_threshold_pct: default_critical_pct(),
        }
    }
}

/// A public holiday in the policy's calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    /// Holiday date.
    pub date: NaiveDate,
    /// Holiday name.
    pub name: String,
    /// Multiplier overriding the holiday rule's default.
    #[serde(default)]
    pub multiplier: Option<Decimal>,
}

/// One version of a jurisdiction/sector overtime policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Unique identifier of this version.
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    /// Owning organization, if the policy was seeded for one.
    #[serde(default)]
    pub organization_id: Option<String>,
    /// Human-readable name.
    pub name: String,
    /// Version number; superseding creates `version + 1`.
    #[serde(default = "default_version")]
    pub version: u32,
    /// ISO country code (or a regional code such as `EU`).
    pub country: String,
    /// Sector; `None` applies to every sector.
    #[serde(default)]
    pub sector: Option<String>,
    /// State or province; `None` applies country-wide.
    #[serde(default)]
    pub state_province: Option<String>,
    /// Union agreement key; `None` applies to everyone.
    #[serde(default)]
    pub union_agreement: Option<String>,
    /// First day this version applies.
    pub effective_from: NaiveDate,
    /// Last day this version applies, if closed.
    #[serde(default)]
    pub effective_to: Option<NaiveDate>,
    /// Inactive policies are never selected.
    #[serde(default = "default_true")]
    pub is_active: bool,
    /// Currency for every amount computed under this policy.
    pub currency: String,
    /// Governing statute.
    #[serde(default)]
    pub legal_reference: Option<String>,
    /// Hour thresholds.
    pub thresholds: HourThresholds,
    /// Premium ladder.
    #[serde(default)]
    pub premiums: Vec<PremiumRule>,
    /// How fired premiums combine.
    pub stacking: StackingStrategy,
    /// Time-capture rounding.
    #[serde(default)]
    pub rounding: RoundingRule,
    /// Rest and safety limits.
    pub safety: SafetyLimits,
    /// On-call rules.
    #[serde(default)]
    pub on_call: Option<OnCallPolicy>,
    /// Comp-time rules.
    #[serde(default)]
    pub comp_time: Option<CompTimePolicy>,
    /// Approval hierarchy, lowest level first.
    #[serde(default)]
    pub approval_hierarchy: Vec<ApprovalLevel>,
    /// Budget rules.
    #[serde(default)]
    pub budget_rules: BudgetRules,
    /// Holiday calendar.
    #[serde(default)]
    pub holidays: Vec<Holiday>,
    /// Record metadata.
    #[serde(default)]
    pub audit: AuditRecord,
}

fn default_version() -> u32 {
    1
}

impl Policy {
    /// Checks the policy for shapes the calculation engine cannot use.
    pub fn validate(&self) -> EngineResult<()> {
        let invalid = |message: String| EngineError::InvalidPolicy {
            policy: self.name.clone(),
            message,
        };

        if self.thresholds.weekly_hours <= Decimal::ZERO {
            return Err(invalid("weekly threshold must be positive".to_string()));
        }
        if let Some(to) = self.effective_to
            && to < self.effective_from
        {
            return Err(invalid(format!(
                "effective_to {} precedes effective_from {}",
                to, self.effective_from
            )));
        }
        if !matches!(self.rounding.increment_minutes, 6 | 15 | 30) {
            return Err(invalid(format!(
                "unsupported rounding increment {} (expected 6, 15 or 30)",
                self.rounding.increment_minutes
            )));
        }
        if self.rounding.grace_minutes >= self.rounding.increment_minutes
            && self.rounding.method != RoundingMethod::None
        {
            return Err(invalid(
                "grace minutes must be smaller than the rounding increment".to_string(),
            ));
        }

        let mut seen = Vec::new();
        for rule in &self.premiums {
            let kind = rule.kind();
            if seen.contains(&kind) {
                return Err(invalid(format!("duplicate premium slot {:?}", kind)));
            }
            seen.push(kind);

            if rule.multipliers().iter().any(|m| *m <= Decimal::ZERO) {
                return Err(invalid(format!(
                    "premium {:?} has a non-positive multiplier",
                    kind
                )));
            }

            match rule {
                PremiumRule::DailyOvertime(daily) => {
                    let threshold = self.thresholds.daily_hours.ok_or_else(|| {
                        invalid("daily overtime requires a daily threshold".to_string())
                    })?;
                    if let Some(tier2) = &daily.tier2
                        && tier2.after_hours <= threshold
                    {
                        return Err(invalid(format!(
                            "tier 2 boundary {} must be above daily threshold {}",
                            tier2.after_hours, threshold
                        )));
                    }
                }
                PremiumRule::NightDifferential(night) if night.window_start == night.window_end => {
                    return Err(invalid("night window start equals end".to_string()));
                }
                PremiumRule::ConsecutiveDay(rule) if rule.trigger_day < 2 => {
                    return Err(invalid("consecutive day trigger must be at least 2".to_string()));
                }
                _ => {}
            }
        }

        Ok(())
    }

    /// Returns true if this version applies on `date`.
    pub fn is_effective_on(&self, date: NaiveDate) -> bool {
        self.is_active
            && self.effective_from <= date
            && self.effective_to.is_none_or(|to| date <= to)
    }

    /// Returns true if the policy's scope covers the requested jurisdiction.
    ///
    /// Unset policy scope fields act as wildcards; set fields must match
    /// (case-insensitively).
    pub fn matches_scope(
        &self,
        country: &str,
        sector: Option<&str>,
        state_province: Option<&str>,
        union_agreement: Option<&str>,
    ) -> bool {
        fn field_matches(policy_value: Option<&str>, requested: Option<&str>) -> bool {
            match (policy_value, requested) {
                (None, _) => true,
                (Some(p), Some(r)) => p.eq_ignore_ascii_case(r),
                (Some(_), None) => false,
            }
        }

        self.country.eq_ignore_ascii_case(country)
            && field_matches(self.sector.as_deref(), sector)
            && field_matches(self.state_province.as_deref(), state_province)
            && field_matches(self.union_agreement.as_deref(), union_agreement)
    }

    /// Ranks how specific the policy scope is.
    ///
    /// Union agreement (4) and state/province (2) outrank sector (1), which
    /// outranks a country-general policy (0).
    pub fn specificity(&self) -> u8 {
        let mut score = 0;
        if self.union_agreement.is_some() {
            score += 4;
        }
        if self.state_province.is_some() {
            score += 2;
        }
        if self.sector.is_some() {
            score += 1;
        }
        score
    }

    /// Returns the holiday on `date`, if any.
    pub fn holiday_on(&self, date: NaiveDate) -> Option<&Holiday> {
        self.holidays.iter().find(|h| h.date == date)
    }

    /// Returns the premium slot of the given kind, if configured.
    pub fn premium(&self, kind: PremiumKind) -> Option<&PremiumRule> {
        self.premiums.iter().find(|p| p.kind() == kind)
    }

    /// Closes this version the day before `effective_from` and returns its successor.
    ///
    /// The successor is a copy with a fresh id and `version + 1`; callers
    /// then adjust its rules before persisting both records.
    pub fn supersede(&mut self, effective_from: NaiveDate, actor: &str) -> EngineResult<Policy> {
        if effective_from <= self.effective_from {
            return Err(EngineError::InvalidPolicy {
                policy: self.name.clone(),
                message: format!(
                    "successor must start after {} (got {})",
                    self.effective_from, effective_from
                ),
            });
        }
        let closing = effective_from
            .checked_sub_days(Days::new(1))
            .unwrap_or(effective_from);

        let mut successor = self.clone();
        successor.id = Uuid::new_v4();
        successor.version = self.version + 1;
        successor.effective_from = effective_from;
        successor.effective_to = self.effective_to.filter(|to| *to >= effective_from);
        successor.audit = AuditRecord::new(actor);

        self.effective_to = Some(closing);
        self.audit.touch(actor);
        Ok(successor)
    }

    /// Returns the lowest approval level able to sign off `hours` and `amount`.
    pub fn required_approval(&self, hours: Decimal, amount: Decimal) -> Option<&ApprovalLevel> {
        let mut levels: Vec<&ApprovalLevel> = self.approval_hierarchy.iter().collect();
        levels.sort_by_key(|l| l.level);
        levels.into_iter().find(|l| {
            l.max_hours.is_none_or(|max| hours <= max)
                && l.max_amount.is_none_or(|max| amount <= max)
        })
    }

    /// Returns the daily overtime slot.
    pub fn daily_overtime(&self) -> Option<&DailyOvertimeRule> {
        match self.premium(PremiumKind::DailyOvertime) {
            Some(PremiumRule::DailyOvertime(rule)) => Some(rule),
            _ => None,
        }
    }

    /// Returns the weekly overtime slot.
    pub fn weekly_overtime(&self) -> Option<&WeeklyOvertimeRule> {
        match self.premium(PremiumKind::WeeklyOvertime) {
            Some(PremiumRule::WeeklyOvertime(rule)) => Some(rule),
            _ => None,
        }
    }

    /// Returns the night differential slot.
    pub fn night_differential(&self) -> Option<&NightRule> {
        match self.premium(PremiumKind::NightDifferential) {
            Some(PremiumRule::NightDifferential(rule)) => Some(rule),
            _ => None,
        }
    }
}
