//! Reverse Net Solver: the gross loan that yields a target net loan when
//! fees and interest are themselves functions of the gross.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::types::Money;

/// Net-to-gross ratio assumed for the first estimate.
const SEED_NET_RATIO: Decimal = dec!(0.85);
const MAX_ITERATIONS: u32 = 10;
/// Accept once the forward net is within a penny of the target.
const NET_TOLERANCE: Money = dec!(0.01);

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NetSolveOutcome {
    pub gross: Money,
    pub iterations: u32,
    pub converged: bool,
    /// Target net minus forward net at `gross`.
    pub residual: Money,
}

/// Fixed-point iteration `gross += target - net(gross)` from `target / 0.85`.
///
/// When the budget runs out the last estimate is returned with
/// `converged = false`.
pub fn solve_gross_for_net<F>(target_net: Money, forward_net: F) -> NetSolveOutcome
where
    F: Fn(Money) -> Money,
{
    let mut gross = target_net / SEED_NET_RATIO;

    for iter in 0..MAX_ITERATIONS {
        let residual = target_net - forward_net(gross);
        if residual.abs() < NET_TOLERANCE {
            return NetSolveOutcome {
                gross,
                iterations: iter + 1,
                converged: true,
                residual,
            };
        }
        gross += residual;
    }

    let residual = target_net - forward_net(gross);
    let converged = residual.abs() < NET_TOLERANCE;
    if !converged {
        tracing::warn!(
            target_net = %target_net,
            gross = %gross,
            residual = %residual,
            iterations = MAX_ITERATIONS,
            "reverse net solver did not converge"
        );
    }
    NetSolveOutcome {
        gross,
        iterations: MAX_ITERATIONS,
        converged,
        residual,
    }
}
