//! Stacking resolution.
//!
//! Each [`StackingStrategy`] maps to one pure function over the fired
//! premiums, looked up in [`STRATEGY_TABLE`]. Premiums arrive in evaluation
//! order; when two share the greatest multiplier the earlier one wins.

use serde::{Deserialize, Serialize};

use crate::models::StackingStrategy;

use super::premium::PremiumResult;

/// Fired premiums split into the ones paid and the ones dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackingResolution {
    /// Premiums that become lines.
    pub kept: Vec<PremiumResult>,
    /// Premiums discarded by the strategy.
    pub dropped: Vec<PremiumResult>,
}

/// A stacking strategy implementation.
pub type StackingFn = fn(Vec<PremiumResult>) -> StackingResolution;

/// Strategy lookup table.
pub const STRATEGY_TABLE: [(StackingStrategy, StackingFn); 3] = [
    (StackingStrategy::AddOn, stack_add_on),
    (StackingStrategy::Highest, stack_highest),
    (StackingStrategy::Replace, stack_replace),
];

/// Returns the implementation for `strategy`.
pub fn strategy_fn(strategy: StackingStrategy) -> StackingFn {
    STRATEGY_TABLE
        .iter()
        .find(|(s, _)| *s == strategy)
        .map(|(_, f)| *f)
        .unwrap_or(stack_add_on)
}

/// Resolves `fired` with the policy's strategy.
pub fn resolve(strategy: StackingStrategy, fired: Vec<PremiumResult>) -> StackingResolution {
    strategy_fn(strategy)(fired)
}

/// Keeps every premium.
pub fn stack_add_on(fired: Vec<PremiumResult>) -> StackingResolution {
    StackingResolution {
        kept: fired,
        dropped: Vec::new(),
    }
}

/// Keeps the single premium with the greatest multiplier.
///
/// Every fired premium competes, including tiers of the same family. A 13 hour
/// California day fires daily tier 1 (1.5x) and daily tier 2 (2.0x), and only
/// the tier 2 line is kept; the tier 1 hours are not paid separately.
///
/// Ties go to the first premium in evaluation order.
pub fn stack_highest(fired: Vec<PremiumResult>) -> StackingResolution {
    let mut winner: Option<usize> = None;
    for (index, premium) in fired.iter().enumerate() {
        match winner {
            Some(best) if premium.multiplier <= fired[best].multiplier => {}
            _ => winner = Some(index),
        }
    }

    let Some(winner) = winner else {
        return StackingResolution::default();
    };
    let mut kept = Vec::with_capacity(1);
    let mut dropped = Vec::with_capacity(fired.len().saturating_sub(1));
    for (index, premium) in fired.into_iter().enumerate() {
        if index == winner {
            kept.push(premium);
        } else {
            dropped.push(premium);
        }
    }
    StackingResolution { kept, dropped }
}

/// As [`stack_highest`], with the survivor replacing base pay.
pub fn stack_replace(fired: Vec<PremiumResult>) -> StackingResolution {
    let mut resolution = stack_highest(fired);
    for premium in &mut resolution.kept {
        premium.replaces_base_pay = true;
    }
    resolution
}
