//! Overtime calculation.
//!
//! This module contains the pure calculation pipeline: worked-hours
//! computation with rounding, one evaluator per premium family, the stacking
//! strategy table and the [`OvertimeCalculationEngine`] that ties them
//! together.

mod calendar;
mod daily_overtime;
mod engine;
mod on_call;
mod penalties;
mod premium;
mod stacking;
mod time_of_day;
mod weekly_overtime;
mod worked_hours;

pub use calendar::{evaluate_consecutive_day, evaluate_holiday, evaluate_weekend};
pub use daily_overtime::{evaluate_daily_overtime, split_daily_overtime};
pub use engine::{
    CalculationOutcome, CalculationWarning, ENGINE_ACTOR, OvertimeCalculationEngine, summarize,
};
pub use on_call::evaluate_on_call;
pub use penalties::{evaluate_meal_break, evaluate_rest_break, evaluate_split_shift};
pub use premium::{CalculationContext, PremiumInput, PremiumResult, PremiumSpec};
pub use stacking::{
    STRATEGY_TABLE, StackingFn, StackingResolution, resolve, stack_add_on, stack_highest,
    stack_replace, strategy_fn,
};
pub use time_of_day::{evaluate_night_differential, window_overlap_minutes};
pub use weekly_overtime::{evaluate_weekly_overtime, weekly_overtime_hours};
pub use worked_hours::{WorkedHours, compute_worked_hours, minutes_to_hours, round_minutes};
