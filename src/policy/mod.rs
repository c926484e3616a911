//! Policy resolution, compliance checks and jurisdiction templates.

mod compliance;
mod engine;
pub mod templates;

pub use compliance::{ComplianceLimit, ComplianceReport, ComplianceViolation, validate_compliance};
pub use engine::{PolicyEngine, PolicyQuery, SEED_ACTOR, select_policy};
