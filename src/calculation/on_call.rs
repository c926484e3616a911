//! On-call pay: standby hours and call-outs.
//!
//! Evaluated after the eight premium slots, so these lines lose multiplier
//! ties under `HIGHEST` and `REPLACE` stacking.

use rust_decimal::Decimal;

use crate::error::EngineResult;
use crate::models::{Basis, CalculationStep, QuantityUnit, RateClass, ShiftClassification};

use super::premium::{PremiumInput, PremiumResult, PremiumSpec, show};

/// Evaluates the policy's on-call rules for standby and call-out shifts.
///
/// A call-out is paid for `max(worked, minimum)` hours; when the minimum is
/// what gets paid the line's basis is [`Basis::Minimum`].
pub fn evaluate_on_call(input: &PremiumInput<'_>) -> EngineResult<Vec<PremiumResult>> {
    let Some(on_call) = &input.policy.on_call else {
        return Ok(Vec::new());
    };
    let legal_reference = input.policy.legal_reference.clone();

    match input.shift.classification {
        ShiftClassification::OnCall => {
            let minimum = on_call.callout_minimum_hours;
            let padded = input.worked_hours < minimum;
            let hours = input.worked_hours.max(minimum);

            let detection = CalculationStep::new(
                0,
                "callout_minimum",
                "Call-out Minimum",
                "max(worked_hours, callout_minimum_hours)",
            )
            .with_input(serde_json::json!({
                "worked_hours": show(input.worked_hours),
                "callout_minimum_hours": show(minimum),
            }))
            .with_output(serde_json::json!({
                "paid_hours": show(hours),
                "minimum_applied": padded,
            }))
            .with_reasoning(if padded {
                format!(
                    "Call-out of {} hours is paid at the {} hour minimum",
                    show(input.worked_hours),
                    show(minimum)
                )
            } else {
                format!("Call-out of {} hours exceeds the minimum", show(hours))
            });

            let result = PremiumSpec {
                rule_id: "callout",
                rule_name: "Call-out",
                rate_class: RateClass::CallOut,
                basis: if padded { Basis::Minimum } else { Basis::CallOut },
                unit: QuantityUnit::Hours,
                multiplier: on_call.callout_multiplier,
                earning_code: on_call.callout_earning_code.clone(),
                legal_reference,
            }
            .price(hours, input.context.base_rate, vec![detection])?;
            Ok(vec![result])
        }
        ShiftClassification::Standby if input.worked_hours > Decimal::ZERO => {
            let detection = CalculationStep::new(0, "standby_hours", "Standby Hours", "worked_hours")
                .with_input(serde_json::json!({
                    "classification": "standby",
                }))
                .with_output(serde_json::json!({
                    "standby_hours": show(input.worked_hours),
                }))
                .with_reasoning(format!(
                    "{} hours on standby",
                    show(input.worked_hours)
                ));

            let result = PremiumSpec {
                rule_id: "standby",
                rule_name: "Standby",
                rate_class: RateClass::Standby,
                basis: Basis::OnCall,
                unit: QuantityUnit::Hours,
                multiplier: on_call.standby_multiplier,
                earning_code: on_call.standby_earning_code.clone(),
                legal_reference,
            }
            .price(input.worked_hours, input.context.base_rate, vec![detection])?;
            Ok(vec![result])
        }
        _ => Ok(Vec::new()),
    }
}
