//! Linear period-end projection from the historical burn rate.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{OvertimeBudget, TransactionType, round_currency};

/// How far the projection runs past the cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ForecastOutlook {
    /// Projected to finish within the cap.
    OnTrack,
    /// Up to 10% over.
    MinorOverrun,
    /// More than 10% over.
    ModerateOverrun,
    /// More than 20% over.
    SevereOverrun,
}

impl ForecastOutlook {
    /// Maps a projected overrun percentage to an outlook.
    pub fn from_overrun(overrun_pct: Decimal) -> Self {
        if overrun_pct > Decimal::from(20) {
            ForecastOutlook::SevereOverrun
        } else if overrun_pct > Decimal::from(10) {
            ForecastOutlook::ModerateOverrun
        } else if overrun_pct > Decimal::ZERO {
            ForecastOutlook::MinorOverrun
        } else {
            ForecastOutlook::OnTrack
        }
    }

    /// Advice for the budget owner.
    pub fn recommendations(self) -> Vec<String> {
        let advice: &[&str] = match self {
            ForecastOutlook::SevereOverrun => &[
                "Freeze discretionary overtime for the rest of the period",
                "Escalate to finance for an immediate reallocation decision",
                "Review staffing levels and backfill with regular hours",
            ],
            ForecastOutlook::ModerateOverrun => &[
                "Require manager approval for all new overtime",
                "Redistribute shifts to reduce overtime exposure",
            ],
            ForecastOutlook::MinorOverrun => &[
                "Monitor daily spend; a small reduction keeps the budget on track",
            ],
            ForecastOutlook::OnTrack => &["Spend is on track for the period"],
        };
        advice.iter().map(|s| s.to_string()).collect()
    }
}

/// Projected period-end position of one budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetForecast {
    /// Budget forecast.
    pub budget_id: Uuid,
    /// Date the projection was made for.
    pub as_of: NaiveDate,
    /// Days of the period elapsed up to and including `as_of`.
    pub days_elapsed: i64,
    /// Days left after `as_of`.
    pub days_remaining: i64,
    /// Spend recorded so far.
    pub spent_to_date: Decimal,
    /// Mean spend per elapsed day.
    pub average_daily_spend: Decimal,
    /// Spent plus committed plus the burn rate over the remaining days.
    pub projected_amount: Decimal,
    /// The cap the projection is measured against.
    pub cap: Option<Decimal>,
    /// `(projected − cap) / cap × 100`, zero when under the cap or uncapped.
    pub projected_overrun_pct: Decimal,
    /// Outlook tier.
    pub outlook: ForecastOutlook,
    /// Advice for the tier.
    pub recommendations: Vec<String>,
}

/// Projects `budget` to its period end as of `today`.
///
/// Measured in amounts when the budget has an amount cap, otherwise in hours.
///
/// # Example
///
/// ```
/// use chrono::NaiveDate;
/// use overtime_engine::budget::{ForecastOutlook, project_budget};
/// use overtime_engine::models::{CapType, OvertimeBudget};
/// use rust_decimal::Decimal;
///
/// let day = |d| NaiveDate::from_ymd_opt(2026, 3, d).unwrap();
/// let mut budget = OvertimeBudget::new("org_001", "ICU", day(1), day(30), CapType::Hard, "USD")
///     .with_amount_cap(Decimal::from(3000));
/// budget
///     .spend(Decimal::from(20), Decimal::from(1500), None, None, day(10), "system")
///     .unwrap();
///
/// // 1500 over 10 days is 150 a day; 20 more days projects 4500.
/// let forecast = project_budget(&budget, day(10));
/// assert_eq!(forecast.projected_amount, Decimal::from(4500));
/// assert_eq!(forecast.outlook, ForecastOutlook::SevereOverrun);
/// ```
pub fn project_budget(budget: &OvertimeBudget, today: NaiveDate) -> BudgetForecast {
    let as_of = today.clamp(budget.period_start, budget.period_end);
    let days_elapsed = ((as_of - budget.period_start).num_days() + 1).max(1);
    let days_remaining = (budget.period_end - as_of).num_days().max(0);

    let by_amount = budget.cap_amount.is_some() || budget.cap_hours.is_none();
    let spent_to_date: Decimal = budget
        .transactions
        .iter()
        .filter(|t| t.kind == TransactionType::Spend && t.occurred_on <= as_of)
        .map(|t| if by_amount { t.amount } else { t.hours })
        .sum();
    let (committed, cap) = if by_amount {
        (budget.committed_amount, budget.cap_amount)
    } else {
        (budget.committed_hours, budget.cap_hours)
    };

    let average_daily_spend = round_currency(spent_to_date / Decimal::from(days_elapsed));
    let projected_amount = round_currency(
        spent_to_date + committed + average_daily_spend * Decimal::from(days_remaining),
    );

    let projected_overrun_pct = match cap {
        Some(cap) if cap > Decimal::ZERO && projected_amount > cap => {
            ((projected_amount - cap) / cap * Decimal::from(100)).round_dp(2)
        }
        _ => Decimal::ZERO,
    };
    let outlook = ForecastOutlook::from_overrun(projected_overrun_pct);

    BudgetForecast {
        budget_id: budget.id,
        as_of,
        days_elapsed,
        days_remaining,
        spent_to_date,
        average_daily_spend,
        projected_amount,
        cap,
        projected_overrun_pct,
        outlook,
        recommendations: outlook.recommendations(),
    }
}
