//! Core data models for the overtime engine.
//!
//! This module contains all the domain models used throughout the engine:
//! policies, shifts, time blocks, overtime lines and budgets.

mod audit;
mod budget;
mod overtime_line;
mod policy;
mod shift;
mod time_block;

pub use audit::AuditRecord;
pub use budget::{
    BudgetStatus, BudgetThreshold, BudgetTransaction, CapType, ForecastSnapshot, OvertimeBudget,
    TransactionType,
};
pub use overtime_line::{
    Basis, CalculationStep, CompTimeConversion, Explanation, LineStatus, OvertimeLine,
    QuantityUnit, RateClass, round_currency,
};
pub use policy::{
    ApprovalLevel, BreakPenaltyRule, BudgetRules, CompTimePolicy, ConsecutiveDayRule,
    DailyOvertimeRule, Holiday, HolidayRule, HourThresholds, NightRule, OnCallPolicy,
    OvertimeTier, Policy, PremiumKind, PremiumRule, RoundingMethod, RoundingRule, SafetyLimits,
    SplitShiftRule, StackingStrategy, WeekendRule, WeeklyOvertimeRule,
};
pub use shift::{Break, BreakType, CaptureSource, Shift, ShiftClassification, ShiftStatus};
pub use time_block::{
    TIME_BLOCK_CHAIN_GENESIS, TimeBlock, TimeBlockLog, WorkType, compute_block_hash,
    effective_blocks, verify_chain,
};
