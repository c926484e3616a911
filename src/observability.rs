//! Injected observability for the core components.
//!
//! Calculation, fatigue, policy and budget components never log directly.
//! They receive an [`EngineObserver`] and emit typed [`EngineEvent`]s, so unit
//! tests stay free of log side effects and can assert on what was emitted.
//! [`TracingObserver`] forwards events to `tracing` for the service binary.

use std::sync::{Arc, Mutex};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{BudgetStatus, BudgetThreshold};

/// Something a core component wants the outside world to know about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum EngineEvent {
    /// A policy was selected for a jurisdiction.
    PolicyResolved {
        /// Selected policy.
        policy_id: Uuid,
        /// Policy name.
        policy_name: String,
        /// Policy version.
        version: u32,
        /// Number of candidate policies that matched.
        candidates: usize,
    },
    /// No policy matched a jurisdiction.
    PolicyNotFound {
        /// Requested country.
        country: String,
        /// Requested sector.
        sector: Option<String>,
        /// Requested date.
        date: NaiveDate,
    },
    /// Negative worked hours were clamped to zero.
    NegativeHoursClamped {
        /// Shift concerned.
        shift_id: String,
        /// Net minutes before clamping.
        raw_minutes: i64,
    },
    /// A shift's time range could not be used.
    InvalidTimeRange {
        /// Shift concerned.
        shift_id: String,
        /// What was wrong.
        message: String,
    },
    /// Time blocks disagree with the shift's clock times.
    TimeBlockMismatch {
        /// Shift concerned.
        shift_id: String,
        /// Minutes covered by effective blocks.
        block_minutes: i64,
        /// Net minutes of the shift.
        shift_minutes: i64,
    },
    /// A calculation finished.
    CalculationCompleted {
        /// Shift calculated.
        shift_id: String,
        /// Policy applied.
        policy_id: Uuid,
        /// Worked hours after rounding.
        worked_hours: Decimal,
        /// Number of lines produced.
        lines: usize,
        /// Sum of line amounts.
        total_amount: Decimal,
    },
    /// A proposed shift start breaches minimum rest.
    RestBreachDetected {
        /// Employee concerned.
        employee_id: String,
        /// Rest hours available.
        hours_rest: Decimal,
        /// Hours short of the minimum.
        hours_short: Decimal,
        /// Severity label.
        severity: String,
    },
    /// A fatigue score was computed.
    FatigueAssessed {
        /// Employee concerned.
        employee_id: String,
        /// Score (0-100).
        score: Decimal,
        /// Level label.
        level: String,
    },
    /// A budget passed a threshold.
    BudgetThresholdCrossed {
        /// Budget concerned.
        budget_id: Uuid,
        /// Threshold passed.
        threshold: BudgetThreshold,
        /// Usage after the change.
        percentage_used: Decimal,
    },
    /// Spend was recorded against a budget.
    BudgetSpendRecorded {
        /// Budget concerned.
        budget_id: Uuid,
        /// Hours recorded.
        hours: Decimal,
        /// Amount recorded.
        amount: Decimal,
        /// Status afterwards.
        status: BudgetStatus,
    },
    /// A superseded line's spend was returned to its budget.
    BudgetSpendReversed {
        /// Budget concerned.
        budget_id: Uuid,
        /// Line whose spend was reversed.
        line_id: Uuid,
        /// Hours returned.
        hours: Decimal,
        /// Amount returned.
        amount: Decimal,
    },
    /// A budget period ended.
    BudgetExpired {
        /// Budget concerned.
        budget_id: Uuid,
    },
    /// Lines were locked under a payroll batch.
    LinesExported {
        /// Payroll batch.
        batch_id: String,
        /// Number of lines locked.
        lines: usize,
        /// Sum of their amounts.
        total_amount: Decimal,
    },
}

/// Receives events from the core components.
pub trait EngineObserver: Send + Sync {
    /// Handles one event.
    fn on_event(&self, event: &EngineEvent);
}

/// Shared observer handle passed to components.
pub type SharedObserver = Arc<dyn EngineObserver>;

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl EngineObserver for NoopObserver {
    fn on_event(&self, _event: &EngineEvent) {}
}

/// Returns a shared [`NoopObserver`].
pub fn noop() -> SharedObserver {
    Arc::new(NoopObserver)
}

/// Forwards events to `tracing` with structured fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl EngineObserver for TracingObserver {
    fn on_event(&self, event: &EngineEvent) {
        match event {
            EngineEvent::PolicyResolved {
                policy_id,
                policy_name,
                version,
                candidates,
            } => debug!(
                policy_id = %policy_id,
                policy_name = %policy_name,
                version,
                candidates,
                "Policy resolved"
            ),
            EngineEvent::PolicyNotFound {
                country,
                sector,
                date,
            } => warn!(
                country = %country,
                sector = sector.as_deref().unwrap_or("any"),
                date = %date,
                "No applicable policy"
            ),
            EngineEvent::NegativeHoursClamped {
                shift_id,
                raw_minutes,
            } => warn!(shift_id = %shift_id, raw_minutes, "Negative worked hours clamped to zero"),
            EngineEvent::InvalidTimeRange { shift_id, message } => {
                warn!(shift_id = %shift_id, message = %message, "Invalid shift time range")
            }
            EngineEvent::TimeBlockMismatch {
                shift_id,
                block_minutes,
                shift_minutes,
            } => warn!(
                shift_id = %shift_id,
                block_minutes,
                shift_minutes,
                "Time blocks disagree with shift times"
            ),
            EngineEvent::CalculationCompleted {
                shift_id,
                policy_id,
                worked_hours,
                lines,
                total_amount,
            } => info!(
                shift_id = %shift_id,
                policy_id = %policy_id,
                worked_hours = %worked_hours,
                lines,
                total_amount = %total_amount,
                "Overtime calculation completed"
            ),
            EngineEvent::RestBreachDetected {
                employee_id,
                hours_rest,
                hours_short,
                severity,
            } => warn!(
                employee_id = %employee_id,
                hours_rest = %hours_rest,
                hours_short = %hours_short,
                severity = %severity,
                "Rest breach detected"
            ),
            EngineEvent::FatigueAssessed {
                employee_id,
                score,
                level,
            } => info!(
                employee_id = %employee_id,
                score = %score,
                level = %level,
                "Fatigue assessed"
            ),
            EngineEvent::BudgetThresholdCrossed {
                budget_id,
                threshold,
                percentage_used,
            } => warn!(
                budget_id = %budget_id,
                threshold = ?threshold,
                percentage_used = %percentage_used,
                "Budget threshold crossed"
            ),
            EngineEvent::BudgetSpendRecorded {
                budget_id,
                hours,
                amount,
                status,
            } => info!(
                budget_id = %budget_id,
                hours = %hours,
                amount = %amount,
                status = ?status,
                "Budget spend recorded"
            ),
            EngineEvent::BudgetSpendReversed {
                budget_id,
                line_id,
                hours,
                amount,
            } => info!(
                budget_id = %budget_id,
                line_id = %line_id,
                hours = %hours,
                amount = %amount,
                "Budget spend reversed"
            ),
            EngineEvent::BudgetExpired { budget_id } => {
                info!(budget_id = %budget_id, "Budget expired")
            }
            EngineEvent::LinesExported {
                batch_id,
                lines,
                total_amount,
            } => info!(
                batch_id = %batch_id,
                lines,
                total_amount = %total_amount,
                "Overtime lines exported to payroll"
            ),
        }
    }
}

/// Keeps every event in memory. Used by tests and diagnostics endpoints.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<EngineEvent>>,
}

impl RecordingObserver {
    /// Creates an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the events recorded so far.
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }
}

impl EngineObserver for RecordingObserver {
    fn on_event(&self, event: &EngineEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_observer_keeps_order() {
        let recorder = RecordingObserver::new();
        recorder.on_event(&EngineEvent::BudgetExpired {
            budget_id: Uuid::nil(),
        });
        recorder.on_event(&EngineEvent::InvalidTimeRange {
            shift_id: "shift_001".to_string(),
            message: "missing clock-out".to_string(),
        });

        let events = recorder.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(events[0], EngineEvent::BudgetExpired { .. }));
    }

    #[test]
    fn test_events_serialize_with_tag() {
        let event = EngineEvent::NegativeHoursClamped {
            shift_id: "shift_001".to_string(),
            raw_minutes: -30,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "negative_hours_clamped");
        assert_eq!(json["raw_minutes"], -30);
    }

    #[test]
    fn test_shared_observers_are_interchangeable() {
        let observers: Vec<SharedObserver> = vec![noop(), Arc::new(TracingObserver)];
        for observer in observers {
            observer.on_event(&EngineEvent::BudgetExpired {
                budget_id: Uuid::nil(),
            });
        }
    }
}
