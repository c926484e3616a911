//! Fatigue scoring and rest compliance.
//!
//! The factor model is pure; [`FatigueTracker`] applies it to
//! an employee's stored shifts and gates proposed shift starts.

mod score;
mod tracker;

pub use score::{
    BreachSeverity, FactorScore, FatigueBreach, FatigueFactor, FatigueFactors, FatigueLevel,
    NIGHT_SHIFT_MINUTES, REFERENCE_REST_HOURS, STANDARD_SHIFT_HOURS, TRAILING_WINDOW_DAYS,
    derive_factors, detect_breaches, night_window, recommendations, score_factors,
};
pub use tracker::{
    DEFAULT_LONG_SHIFT_HOURS, FatigueAssessment, FatigueTracker, FitnessDecision,
    REST_LOOKBACK_DAYS, RestCompliance, RestSeverity,
};
