//! The overtime calculation engine.
//!
//! Given a completed shift, its time blocks, the applicable policy and the
//! caller's rolling context, the engine computes worked hours, evaluates every
//! premium slot in a fixed order, resolves them with the policy's stacking
//! strategy and emits one [`OvertimeLine`] per surviving premium.
//!
//! The engine is pure apart from the injected observer: the same inputs always
//! produce the same lines (modulo generated ids and timestamps).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{EngineError, EngineResult, MAX_AMOUNT, MAX_HOURS, ensure_quantity};
use crate::models::{
    AuditRecord, CalculationStep, Explanation, LineStatus, OvertimeLine, Policy, Shift, TimeBlock,
    effective_blocks, verify_chain,
};
use crate::observability::{EngineEvent, SharedObserver, noop};

use super::calendar::{evaluate_consecutive_day, evaluate_holiday, evaluate_weekend};
use super::daily_overtime::evaluate_daily_overtime;
use super::on_call::evaluate_on_call;
use super::penalties::{evaluate_meal_break, evaluate_rest_break, evaluate_split_shift};
use super::premium::{CalculationContext, PremiumInput, PremiumResult, show};
use super::stacking::resolve;
use super::time_of_day::evaluate_night_differential;
use super::weekly_overtime::evaluate_weekly_overtime;
use super::worked_hours::{WorkedHours, compute_worked_hours};

/// Actor recorded on lines the engine creates.
pub const ENGINE_ACTOR: &str = "overtime_engine";

type Evaluator = fn(&PremiumInput<'_>) -> EngineResult<Vec<PremiumResult>>;

/// Premium evaluators in evaluation order. Order decides stacking ties.
const EVALUATORS: [Evaluator; 10] = [
    evaluate_daily_overtime,
    evaluate_weekly_overtime,
    evaluate_night_differential,
    evaluate_weekend,
    evaluate_holiday,
    evaluate_consecutive_day,
    evaluate_split_shift,
    evaluate_meal_break,
    evaluate_rest_break,
    evaluate_on_call,
];

/// A non-fatal issue found during calculation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationWarning {
    /// A code identifying the type of warning.
    pub code: String,
    /// A human-readable description of the warning.
    pub message: String,
    /// The severity level (e.g., "low", "medium", "high").
    pub severity: String,
}

impl CalculationWarning {
    fn new(code: &str, message: impl Into<String>, severity: &str) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            severity: severity.to_string(),
        }
    }
}

/// Everything one calculation produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalculationOutcome {
    /// Shift calculated.
    pub shift_id: String,
    /// Employee paid.
    pub employee_id: String,
    /// Policy applied.
    pub policy_id: Uuid,
    /// Policy version applied.
    pub policy_version: u32,
    /// Worked hours after rounding.
    pub worked_hours: Decimal,
    /// One line per surviving premium, in evaluation order.
    pub lines: Vec<OvertimeLine>,
    /// Sum of line amounts.
    pub total_amount: Decimal,
    /// Currency of the amounts.
    pub currency: String,
    /// Non-fatal issues.
    pub warnings: Vec<CalculationWarning>,
    /// Shift-level steps (worked hours, block verification, stacking).
    pub trace: Vec<CalculationStep>,
    /// Flags such as `negative_hours_clamped`.
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

/// Computes overtime lines for completed shifts.
///
/// # Example
///
/// ```
/// use overtime_engine::calculation::{CalculationContext, OvertimeCalculationEngine};
/// use overtime_engine::models::Shift;
/// use overtime_engine::policy::templates;
/// use chrono::NaiveDateTime;
/// use rust_decimal::Decimal;
///
/// let policy = templates::us_california().unwrap();
/// let start = NaiveDateTime::parse_from_str("2026-03-03 08:00:00", "%Y-%m-%d %H:%M:%S").unwrap();
/// let shift = Shift::completed("shift_001", "emp_001", start, start + chrono::Duration::hours(10));
///
/// let engine = OvertimeCalculationEngine::default();
/// let outcome = engine
///     .calculate(&shift, &[], &policy, &CalculationContext::new(Decimal::from(25)))
///     .unwrap();
///
/// assert_eq!(outcome.lines.len(), 1);
/// assert_eq!(outcome.lines[0].calculated_amount, Decimal::from(75));
/// ```
#[derive(Clone)]
pub struct OvertimeCalculationEngine {
    observer: SharedObserver,
}

impl Default for OvertimeCalculationEngine {
    fn default() -> Self {
        Self::new(noop())
    }
}

impl std::fmt::Debug for OvertimeCalculationEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OvertimeCalculationEngine").finish_non_exhaustive()
    }
}

fn with_trace_prefix(error: EngineError, prefix: &[CalculationStep]) -> EngineError {
    let prepend = |steps: Vec<CalculationStep>| -> Vec<CalculationStep> {
        prefix.iter().cloned().chain(steps).collect()
    };
    match error {
        EngineError::CalculationError {
            message,
            partial_trace,
        } => EngineError::CalculationError {
            message,
            partial_trace: prepend(partial_trace),
        },
        EngineError::TimeBlockTampered {
            block_id,
            sequence,
            partial_trace,
        } => EngineError::TimeBlockTampered {
            block_id,
            sequence,
            partial_trace: prepend(partial_trace),
        },
        other => other,
    }
}

fn renumber(steps: &mut [CalculationStep]) {
    for (index, step) in steps.iter_mut().enumerate() {
        step.step_number = index as u32 + 1;
    }
}

impl OvertimeCalculationEngine {
    /// Creates an engine reporting to `observer`.
    pub fn new(observer: SharedObserver) -> Self {
        Self { observer }
    }

    /// Calculates overtime lines for `shift` under `policy`.
    ///
    /// `time_blocks` may be empty. When present they are verified first and
    /// a tampered chain fails the calculation with the trace computed so far.
    ///
    /// A shift without a clock-out, or whose breaks exceed its length, is not
    /// an error: the outcome has zero hours, no lines and a warning.
    pub fn calculate(
        &self,
        shift: &Shift,
        time_blocks: &[TimeBlock],
        policy: &Policy,
        context: &CalculationContext,
    ) -> EngineResult<CalculationOutcome> {
        policy.validate()?;

        let mut trace = Vec::new();
        let mut warnings = Vec::new();
        let mut metadata = serde_json::Map::new();

        if context.base_rate < Decimal::ZERO {
            return Err(EngineError::CalculationError {
                message: format!("base rate {} must not be negative", context.base_rate),
                partial_trace: trace,
            });
        }
        ensure_quantity("base_rate", context.base_rate, MAX_AMOUNT)?;
        ensure_quantity("weekly_hours_so_far", context.prior_weekly_hours, MAX_HOURS)?;

        let worked = compute_worked_hours(shift, &policy.rounding, 1);
        trace.push(worked.audit_step.clone());

        let mut outcome = CalculationOutcome {
            shift_id: shift.id.clone(),
            employee_id: shift.employee_id.clone(),
            policy_id: policy.id,
            policy_version: policy.version,
            worked_hours: worked.hours,
            lines: Vec::new(),
            total_amount: Decimal::ZERO,
            currency: policy.currency.clone(),
            warnings: Vec::new(),
            trace: Vec::new(),
            metadata: serde_json::Map::new(),
        };

        if shift.actual_end.is_none() {
            let message = "shift has no clock-out; treated as zero hours".to_string();
            self.observer.on_event(&EngineEvent::InvalidTimeRange {
                shift_id: shift.id.clone(),
                message: message.clone(),
            });
            warnings.push(CalculationWarning::new("INVALID_TIME_RANGE", message, "low"));
            outcome.warnings = warnings;
            outcome.trace = trace;
            return Ok(outcome);
        }

        if !time_blocks.is_empty() {
            verify_chain(time_blocks).map_err(|e| with_trace_prefix(e, &trace))?;
            if let Some(step) = self.reconcile_blocks(shift, time_blocks, &worked, &mut warnings) {
                trace.push(step);
            }
        }

        if worked.clamped_negative {
            let raw_minutes = worked.net_minutes.unwrap_or_default();
            self.observer.on_event(&EngineEvent::NegativeHoursClamped {
                shift_id: shift.id.clone(),
                raw_minutes,
            });
            warnings.push(CalculationWarning::new(
                "NEGATIVE_HOURS_CLAMPED",
                format!(
                    "net duration of {} minutes clamped to zero; no premiums evaluated",
                    raw_minutes
                ),
                "medium",
            ));
            metadata.insert("negative_hours_clamped".to_string(), serde_json::json!(true));
            metadata.insert("raw_net_minutes".to_string(), serde_json::json!(raw_minutes));
            outcome.warnings = warnings;
            outcome.trace = trace;
            outcome.metadata = metadata;
            return Ok(outcome);
        }

        let input = PremiumInput {
            shift,
            policy,
            worked_hours: worked.hours,
            context,
        };
        let mut fired = Vec::new();
        for evaluator in EVALUATORS {
            fired.extend(evaluator(&input).map_err(|e| with_trace_prefix(e, &trace))?);
        }

        let fired_ids: Vec<String> = fired.iter().map(|p| p.rule_id.clone()).collect();
        let resolution = resolve(policy.stacking, fired);
        let stacking_step = CalculationStep::new(
            0,
            "stacking_resolution",
            "Stacking Resolution",
            format!("{:?}", policy.stacking),
        )
        .with_input(serde_json::json!({
            "strategy": policy.stacking,
            "fired": fired_ids,
        }))
        .with_output(serde_json::json!({
            "kept": resolution.kept.iter().map(|p| p.rule_id.as_str()).collect::<Vec<_>>(),
            "dropped": resolution.dropped.iter().map(|p| p.rule_id.as_str()).collect::<Vec<_>>(),
        }))
        .with_reasoning(format!(
            "{} premium(s) fired; {:?} stacking keeps {}",
            fired_ids.len(),
            policy.stacking,
            resolution.kept.len()
        ));
        trace.push(stacking_step.clone());

        metadata.insert(
            "stacking_strategy".to_string(),
            serde_json::json!(policy.stacking),
        );
        metadata.insert("fired_premiums".to_string(), serde_json::json!(fired_ids));

        let lines: Vec<OvertimeLine> = resolution
            .kept
            .into_iter()
            .map(|premium| build_line(shift, policy, &trace, &stacking_step, premium))
            .collect();
        let total_amount: Decimal = lines.iter().map(|l| l.calculated_amount).sum();

        self.observer.on_event(&EngineEvent::CalculationCompleted {
            shift_id: shift.id.clone(),
            policy_id: policy.id,
            worked_hours: worked.hours,
            lines: lines.len(),
            total_amount,
        });

        renumber(&mut trace);
        outcome.lines = lines;
        outcome.total_amount = total_amount;
        outcome.warnings = warnings;
        outcome.trace = trace;
        outcome.metadata = metadata;
        Ok(outcome)
    }

    /// Compares effective block minutes with the shift's net minutes.
    fn reconcile_blocks(
        &self,
        shift: &Shift,
        time_blocks: &[TimeBlock],
        worked: &WorkedHours,
        warnings: &mut Vec<CalculationWarning>,
    ) -> Option<CalculationStep> {
        let effective = effective_blocks(time_blocks, &shift.id);
        if effective.is_empty() {
            return None;
        }
        let block_minutes: i64 = effective
            .iter()
            .filter(|b| b.work_type.is_paid())
            .map(|b| b.minutes())
            .sum();
        let shift_minutes = worked.net_minutes.unwrap_or_default();
        let matches = block_minutes == shift_minutes;

        if !matches {
            self.observer.on_event(&EngineEvent::TimeBlockMismatch {
                shift_id: shift.id.clone(),
                block_minutes,
                shift_minutes,
            });
            warnings.push(CalculationWarning::new(
                "TIME_BLOCK_MISMATCH",
                format!(
                    "time blocks cover {} paid minutes but the shift records {}",
                    block_minutes, shift_minutes
                ),
                "medium",
            ));
        }

        Some(
            CalculationStep::new(
                0,
                "time_block_verification",
                "Time Block Verification",
                "verify(hash chain) ∧ Σ paid block minutes = net shift minutes",
            )
            .with_input(serde_json::json!({
                "blocks": effective.len(),
                "first_sequence": effective.first().map(|b| b.sequence),
                "last_hash": effective.last().map(|b| b.hash.clone()),
            }))
            .with_output(serde_json::json!({
                "block_minutes": block_minutes,
                "shift_minutes": shift_minutes,
                "consistent": matches,
            }))
            .with_reasoning(if matches {
                format!("{} verified blocks agree with the shift times", effective.len())
            } else {
                format!(
                    "{} verified blocks disagree with the shift times ({} vs {} minutes)",
                    effective.len(),
                    block_minutes,
                    shift_minutes
                )
            }),
        )
    }
}

fn build_line(
    shift: &Shift,
    policy: &Policy,
    shift_trace: &[CalculationStep],
    stacking_step: &CalculationStep,
    premium: PremiumResult,
) -> OvertimeLine {
    let mut steps: Vec<CalculationStep> = shift_trace
        .iter()
        .filter(|s| s.rule_id != stacking_step.rule_id)
        .cloned()
        .chain(premium.steps)
        .chain(std::iter::once(stacking_step.clone()))
        .collect();
    renumber(&mut steps);

    let final_rate = premium.base_rate * premium.multiplier;
    let mut metadata = serde_json::Map::new();
    metadata.insert("rule_id".to_string(), serde_json::json!(premium.rule_id));
    metadata.insert(
        "stacking_strategy".to_string(),
        serde_json::json!(policy.stacking),
    );

    OvertimeLine {
        id: Uuid::new_v4(),
        shift_id: shift.id.clone(),
        employee_id: shift.employee_id.clone(),
        policy_id: policy.id,
        policy_version: policy.version,
        cost_center: shift.cost_center.clone(),
        project: shift.project.clone(),
        work_date: shift.work_date(),
        rate_class: premium.rate_class,
        basis: premium.basis,
        quantity: premium.quantity,
        unit: premium.unit,
        multiplier: premium.multiplier,
        base_rate: premium.base_rate,
        calculated_amount: premium.amount,
        currency: policy.currency.clone(),
        earning_code: premium.earning_code,
        explanation: Explanation {
            rule_name: premium.rule_name,
            legal_reference: premium.legal_reference,
            steps,
            final_hours: premium.quantity,
            final_rate,
            final_amount: premium.amount,
        },
        status: LineStatus::Pending,
        budget_id: None,
        comp_time: None,
        replaces_base_pay: premium.replaces_base_pay,
        version: 1,
        supersedes: None,
        superseded_by: None,
        is_locked: false,
        payroll_batch_id: None,
        metadata,
        audit: AuditRecord::new(ENGINE_ACTOR),
    }
}

/// Formats an outcome's lines as a one-line summary, used in logs.
pub fn summarize(outcome: &CalculationOutcome) -> String {
    outcome
        .lines
        .iter()
        .map(|l| {
            format!(
                "{}: {} × {} × {} = {}",
                l.earning_code,
                show(l.quantity),
                show(l.base_rate),
                show(l.multiplier),
                l.calculated_amount
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Basis, Break, BreakType, QuantityUnit, RateClass, ShiftClassification, StackingStrategy,
        TimeBlockLog, WorkType,
    };
    use crate::observability::RecordingObserver;
    use crate::policy::templates;
    use chrono::NaiveDateTime;
    use proptest::prelude::*;
    use std::str::FromStr;
    use std::sync::Arc;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn dt(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").unwrap()
    }

    fn shift(start: &str, end: &str) -> Shift {
        Shift::completed("shift_001", "emp_001", dt(start), dt(end))
    }

    fn context(rate: &str) -> CalculationContext {
        CalculationContext::new(dec(rate))
    }

    /// Scenario 1: California 10 hour shift, $25, HIGHEST stacking.
    #[test]
    fn test_california_ten_hour_shift_single_line() {
        let policy = templates::us_california().unwrap();
        let shift = shift("2026-03-03 08:00:00", "2026-03-03 18:00:00");
        let mut ctx = context("25");
        ctx.prior_weekly_hours = dec("36");

        let outcome = OvertimeCalculationEngine::default()
            .calculate(&shift, &[], &policy, &ctx)
            .unwrap();

        assert_eq!(outcome.lines.len(), 1);
        let line = &outcome.lines[0];
        assert_eq!(line.quantity, dec("2"));
        assert_eq!(line.multiplier, dec("1.5"));
        assert_eq!(line.calculated_amount, dec("75.00"));
        assert_eq!(line.basis, Basis::Daily);
        assert_eq!(line.currency, "USD");
        assert!(line.amount_is_consistent());
        assert!(!line.replaces_base_pay);
    }

    /// Scenario 2: NHS night shift on Saturday 02:00-06:00, ADD_ON stacking.
    #[test]
    fn test_nhs_saturday_night_adds_two_lines() {
        let policy = templates::uk_nhs().unwrap();
        let shift = shift("2026-03-07 02:00:00", "2026-03-07 06:00:00");

        let outcome = OvertimeCalculationEngine::default()
            .calculate(&shift, &[], &policy, &context("20"))
            .unwrap();

        assert_eq!(outcome.lines.len(), 2);
        assert_eq!(outcome.lines[0].rate_class, RateClass::NightDifferential);
        assert_eq!(outcome.lines[1].rate_class, RateClass::WeekendPremium);
        assert_eq!(outcome.lines[0].quantity, dec("4"));
        assert_eq!(outcome.lines[1].quantity, dec("4"));
        assert_eq!(
            outcome.total_amount,
            outcome.lines[0].calculated_amount + outcome.lines[1].calculated_amount
        );
    }

    #[test]
    fn test_missing_clock_out_is_not_an_error() {
        let policy = templates::us_federal().unwrap();
        let mut shift = shift("2026-03-03 08:00:00", "2026-03-03 18:00:00");
        shift.actual_end = None;
        let recorder = Arc::new(RecordingObserver::new());
        let engine = OvertimeCalculationEngine::new(recorder.clone());

        let outcome = engine.calculate(&shift, &[], &policy, &context("25")).unwrap();

        assert!(outcome.lines.is_empty());
        assert_eq!(outcome.worked_hours, Decimal::ZERO);
        assert_eq!(outcome.warnings[0].code, "INVALID_TIME_RANGE");
        assert!(matches!(
            recorder.events()[0],
            EngineEvent::InvalidTimeRange { .. }
        ));
    }

    #[test]
    fn test_negative_hours_clamped_and_flagged() {
        let policy = templates::us_california().unwrap();
        let mut shift = shift("2026-03-03 08:00:00", "2026-03-03 09:00:00");
        shift.breaks.push(Break {
            start_time: dt("2026-03-03 07:00:00"),
            end_time: dt("2026-03-03 11:00:00"),
            is_paid: false,
            break_type: BreakType::Other,
        });
        let recorder = Arc::new(RecordingObserver::new());
        let engine = OvertimeCalculationEngine::new(recorder.clone());

        let outcome = engine.calculate(&shift, &[], &policy, &context("25")).unwrap();

        assert!(outcome.lines.is_empty());
        assert_eq!(outcome.metadata["negative_hours_clamped"], true);
        assert!(recorder
            .events()
            .iter()
            .any(|e| matches!(e, EngineEvent::NegativeHoursClamped { .. })));
    }

    #[test]
    fn test_highest_tie_daily_beats_weekly() {
        let policy = templates::us_california().unwrap();
        let shift = shift("2026-03-06 08:00:00", "2026-03-06 18:00:00");
        let mut ctx = context("25");
        ctx.prior_weekly_hours = dec("40");

        let outcome = OvertimeCalculationEngine::default()
            .calculate(&shift, &[], &policy, &ctx)
            .unwrap();

        // Daily (2h @1.5) and weekly (10h @1.5) tie on multiplier; daily is evaluated first.
        assert_eq!(outcome.lines.len(), 1);
        assert_eq!(outcome.lines[0].basis, Basis::Daily);
        assert_eq!(outcome.metadata["fired_premiums"][1], "weekly_overtime");
    }

    #[test]
    fn test_replace_strategy_marks_line() {
        let mut policy = templates::uk_nhs().unwrap();
        policy.stacking = StackingStrategy::Replace;
        let shift = shift("2026-03-07 02:00:00", "2026-03-07 06:00:00");

        let outcome = OvertimeCalculationEngine::default()
            .calculate(&shift, &[], &policy, &context("20"))
            .unwrap();

        assert_eq!(outcome.lines.len(), 1);
        assert!(outcome.lines[0].replaces_base_pay);
    }

    #[test]
    fn test_explanation_steps_numbered_and_complete() {
        let policy = templates::us_california().unwrap();
        let shift = shift("2026-03-03 08:00:00", "2026-03-03 18:00:00");
        let outcome = OvertimeCalculationEngine::default()
            .calculate(&shift, &[], &policy, &context("25"))
            .unwrap();

        let steps = &outcome.lines[0].explanation.steps;
        assert_eq!(steps.first().unwrap().rule_id, "worked_hours");
        assert_eq!(steps.last().unwrap().rule_id, "stacking_resolution");
        for (i, step) in steps.iter().enumerate() {
            assert_eq!(step.step_number, i as u32 + 1);
        }
        let explanation = &outcome.lines[0].explanation;
        assert_eq!(explanation.final_amount, dec("75.00"));
        assert_eq!(explanation.final_rate, dec("37.5"));
        assert!(explanation.legal_reference.is_some());
    }

    #[test]
    fn test_tampered_blocks_fail_with_partial_trace() {
        let policy = templates::us_federal().unwrap();
        let shift = shift("2026-03-03 08:00:00", "2026-03-03 16:00:00");
        let mut log = TimeBlockLog::new("emp_001");
        log.append("shift_001", dt("2026-03-03 08:00:00"), dt("2026-03-03 16:00:00"), WorkType::Regular, None)
            .unwrap();
        let mut blocks = log.blocks().to_vec();
        blocks[0].end = dt("2026-03-03 18:00:00");

        let err = OvertimeCalculationEngine::default()
            .calculate(&shift, &blocks, &policy, &context("25"))
            .unwrap_err();

        assert!(matches!(err, EngineError::TimeBlockTampered { .. }));
        assert_eq!(err.partial_trace()[0].rule_id, "worked_hours");
    }

    #[test]
    fn test_block_mismatch_warns() {
        let policy = templates::us_federal().unwrap();
        let shift = shift("2026-03-03 08:00:00", "2026-03-03 16:00:00");
        let mut log = TimeBlockLog::new("emp_001");
        log.append("shift_001", dt("2026-03-03 08:00:00"), dt("2026-03-03 15:00:00"), WorkType::Regular, None)
            .unwrap();

        let outcome = OvertimeCalculationEngine::default()
            .calculate(&shift, log.blocks(), &policy, &context("25"))
            .unwrap();

        assert!(outcome.warnings.iter().any(|w| w.code == "TIME_BLOCK_MISMATCH"));
        assert!(outcome.trace.iter().any(|s| s.rule_id == "time_block_verification"));
    }

    #[test]
    fn test_callout_minimum_line() {
        let policy = templates::uk_nhs().unwrap();
        let mut shift = shift("2026-03-04 10:00:00", "2026-03-04 11:00:00");
        shift.classification = ShiftClassification::OnCall;

        let outcome = OvertimeCalculationEngine::default()
            .calculate(&shift, &[], &policy, &context("20"))
            .unwrap();

        let callout = outcome
            .lines
            .iter()
            .find(|l| l.rate_class == RateClass::CallOut)
            .unwrap();
        assert_eq!(callout.basis, Basis::Minimum);
        assert_eq!(callout.unit, QuantityUnit::Hours);
    }

    #[test]
    fn test_negative_base_rate_rejected() {
        let policy = templates::us_federal().unwrap();
        let shift = shift("2026-03-03 08:00:00", "2026-03-03 16:00:00");
        let err = OvertimeCalculationEngine::default()
            .calculate(&shift, &[], &policy, &context("-1"))
            .unwrap_err();
        assert!(matches!(err, EngineError::CalculationError { .. }));
    }

    #[test]
    fn test_out_of_range_context_rejected() {
        let policy = templates::us_california().unwrap();
        let shift = shift("2026-03-03 08:00:00", "2026-03-03 18:00:00");
        let engine = OvertimeCalculationEngine::default();

        let mut ctx = context("25");
        ctx.prior_weekly_hours = Decimal::MAX;
        let err = engine.calculate(&shift, &[], &policy, &ctx).unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput { ref field, .. } if field == "weekly_hours_so_far"));

        ctx.prior_weekly_hours = dec("-4");
        assert!(engine.calculate(&shift, &[], &policy, &ctx).is_err());

        let err = engine
            .calculate(&shift, &[], &policy, &context("79228162514264337593543950335"))
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput { ref field, .. } if field == "base_rate"));
    }

    #[test]
    fn test_completed_event_emitted() {
        let policy = templates::us_california().unwrap();
        let shift = shift("2026-03-03 08:00:00", "2026-03-03 18:00:00");
        let recorder = Arc::new(RecordingObserver::new());
        OvertimeCalculationEngine::new(recorder.clone())
            .calculate(&shift, &[], &policy, &context("25"))
            .unwrap();

        match recorder.events().last().unwrap() {
            EngineEvent::CalculationCompleted {
                lines, total_amount, ..
            } => {
                assert_eq!(*lines, 1);
                assert_eq!(*total_amount, dec("75.00"));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }

    proptest! {
        #[test]
        fn prop_line_amounts_consistent_and_non_negative(
            start_minute in 0i64..(24 * 60),
            length in 0i64..(16 * 60),
            rate_cents in 0i64..10_000,
            prior in 0i64..60,
            consecutive in 1u32..10,
            template in 0usize..6,
        ) {
            let policies = templates::all().unwrap();
            let policy = &policies[template];
            let start = dt("2026-03-02 00:00:00") + chrono::Duration::minutes(start_minute);
            let shift = Shift::completed("prop", "emp", start, start + chrono::Duration::minutes(length));
            let ctx = CalculationContext {
                base_rate: Decimal::new(rate_cents, 2),
                prior_weekly_hours: Decimal::from(prior),
                consecutive_days_worked: consecutive,
            };

            let outcome = OvertimeCalculationEngine::default()
                .calculate(&shift, &[], policy, &ctx)
                .unwrap();

            prop_assert!(outcome.total_amount >= Decimal::ZERO);
            for line in &outcome.lines {
                prop_assert!(line.calculated_amount >= Decimal::ZERO);
                prop_assert!(line.amount_is_consistent());
            }
            match policy.stacking {
                StackingStrategy::Highest | StackingStrategy::Replace => {
                    prop_assert!(outcome.lines.len() <= 1);
                }
                StackingStrategy::AddOn => {}
            }
        }
    }
}
