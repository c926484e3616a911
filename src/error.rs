//! Error types for the overtime engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for every failure the calculation, compliance and budget components can
//! report. Safety and hard-cap failures are separate variants so callers are
//! forced to handle them explicitly.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use thiserror::Error;
use uuid::Uuid;

use crate::models::CalculationStep;

/// The main error type for the overtime engine.
///
/// # Example
///
/// ```
/// use overtime_engine::error::EngineError;
/// use chrono::NaiveDate;
///
/// let error = EngineError::PolicyNotFound {
///     country: "FR".to_string(),
///     sector: Some("GENERAL".to_string()),
///     date: NaiveDate::from_ymd_opt(2026, 3, 2).unwrap(),
/// };
/// assert_eq!(
///     error.to_string(),
///     "No applicable policy for country 'FR' (sector GENERAL) on 2026-03-02"
/// );
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// No active policy matches the requested jurisdiction and date.
    #[error(
        "No applicable policy for country '{country}' (sector {}) on {date}",
        .sector.as_deref().unwrap_or("any")
    )]
    PolicyNotFound {
        /// The requested country code.
        country: String,
        /// The requested sector, if any.
        sector: Option<String>,
        /// The effective date that was searched.
        date: NaiveDate,
    },

    /// A policy definition failed validation at load time.
    #[error("Invalid policy '{policy}': {message}")]
    InvalidPolicy {
        /// The policy name or file that failed validation.
        policy: String,
        /// What was wrong with it.
        message: String,
    },

    /// A shift could not be found.
    #[error("Shift not found: {shift_id}")]
    ShiftNotFound {
        /// The missing shift id.
        shift_id: String,
    },

    /// An overtime line could not be found.
    #[error("Overtime line not found: {line_id}")]
    LineNotFound {
        /// The missing line id.
        line_id: Uuid,
    },

    /// A budget could not be found.
    #[error("Budget not found: {budget_id}")]
    BudgetNotFound {
        /// The missing budget id.
        budget_id: Uuid,
    },

    /// The request would breach a hard budget cap.
    #[error(
        "Budget {budget_id} hard cap exceeded: requested {requested}, remaining {remaining}"
    )]
    BudgetCapacityExceeded {
        /// The budget that blocked the request.
        budget_id: Uuid,
        /// The requested amount.
        requested: Decimal,
        /// What was left before the request.
        remaining: Decimal,
    },

    /// The request exceeds a soft cap and needs elevated sign-off.
    #[error("Budget {budget_id} requires approval: {reason}")]
    BudgetApprovalRequired {
        /// The budget that flagged the request.
        budget_id: Uuid,
        /// Why approval is required.
        reason: String,
    },

    /// The proposed shift start violates the minimum rest period.
    #[error(
        "Rest breach for employee '{employee_id}': {hours_rest} hours rest before {proposed_start}, {hours_short} hours short"
    )]
    RestBreach {
        /// The employee concerned.
        employee_id: String,
        /// The proposed shift start.
        proposed_start: NaiveDateTime,
        /// Hours of rest actually available.
        hours_rest: Decimal,
        /// Hours missing against the policy minimum.
        hours_short: Decimal,
    },

    /// The employee's fatigue score is at the critical level.
    #[error("Critical fatigue for employee '{employee_id}': score {score}")]
    CriticalFatigue {
        /// The employee concerned.
        employee_id: String,
        /// The fatigue score (0-100).
        score: Decimal,
    },

    /// A request value is out of range.
    #[error("Invalid value for '{field}': {message}")]
    InvalidInput {
        /// The offending field.
        field: String,
        /// What was wrong with it.
        message: String,
    },

    /// A budget already carries a spend for this overtime line.
    #[error("Overtime line {line_id} is already charged to budget {budget_id}")]
    LineAlreadyCharged {
        /// The line concerned.
        line_id: Uuid,
        /// The budget holding the charge.
        budget_id: Uuid,
    },

    /// A shift's time range is unusable for calculation.
    #[error("Invalid time range for shift '{shift_id}': {message}")]
    InvalidTimeRange {
        /// The shift concerned.
        shift_id: String,
        /// What was wrong with the range.
        message: String,
    },

    /// An overtime line was mutated after payroll export.
    #[error("Overtime line {line_id} is locked by payroll batch '{batch_id}'")]
    LineLocked {
        /// The locked line.
        line_id: Uuid,
        /// The payroll batch that locked it.
        batch_id: String,
    },

    /// A time block failed hash verification.
    #[error("Time block {block_id} (sequence {sequence}) failed hash verification")]
    TimeBlockTampered {
        /// The block that failed.
        block_id: Uuid,
        /// Its sequence number.
        sequence: u64,
        /// Explanation steps recorded before the failure.
        partial_trace: Vec<CalculationStep>,
    },

    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// A general calculation error occurred.
    #[error("Calculation error: {message}")]
    CalculationError {
        /// A description of the calculation error.
        message: String,
        /// Explanation steps recorded before the failure.
        partial_trace: Vec<CalculationStep>,
    },
}

impl EngineError {
    /// Returns true for failures an approval workflow is required to act on:
    /// rest breaches, critical fatigue, hard budget caps and missing policies.
    pub fn is_safety_or_hard_stop(&self) -> bool {
        matches!(
            self,
            EngineError::RestBreach { .. }
                | EngineError::CriticalFatigue { .. }
                | EngineError::BudgetCapacityExceeded { .. }
                | EngineError::PolicyNotFound { .. }
        )
    }

    /// Returns the explanation steps captured before a calculation failure.
    pub fn partial_trace(&self) -> &[CalculationStep] {
        match self {
            EngineError::CalculationError { partial_trace, .. }
            | EngineError::TimeBlockTampered { partial_trace, .. } => partial_trace,
            _ => &[],
        }
    }
}

/// Largest hour quantity accepted from a caller.
pub const MAX_HOURS: Decimal = Decimal::from_parts(10_000, 0, 0, false, 0);

/// Largest rate or amount accepted from a caller.
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(3_567_587_328, 232, 0, false, 0);

/// Checks that a caller-supplied quantity is non-negative and at most `max`.
pub fn ensure_quantity(field: &str, value: Decimal, max: Decimal) -> EngineResult<Decimal> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(EngineError::InvalidInput {
            field: field.to_string(),
            message: format!("{} is negative", value),
        });
    }
    if value > max {
        return Err(EngineError::InvalidInput {
            field: field.to_string(),
            message: format!("{} exceeds the limit of {}", value, max),
        });
    }
    Ok(value)
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
