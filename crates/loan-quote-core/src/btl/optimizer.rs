//! Optimizer: choose the (rolled months, deferred rate) pair that maximises
//! the net loan.
//!
//! Three modes are mutually exclusive per call. Fixed-rule products always
//! evaluate (0, 0); a manual override is clamped into the record bounds and
//! evaluated once; otherwise a [`SearchStrategy`] scans the candidate space.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::btl::constraints::ResolvedLimits;
use crate::btl::scenario::{evaluate_scenario, Candidate, Scenario, ScenarioContext};
use crate::config::{EngineConfig, SearchMethod, SearchSettings};
use crate::input::CalculationInput;
use crate::numeric::{clamp_decimal, clamp_months, NET_TIE_TOLERANCE};
use crate::types::{Months, Rate};

// ---------------------------------------------------------------------------
// Modes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OptimizerMode {
    FixedRule,
    Manual,
    Auto,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SearchMode {
    FixedRule,
    /// Clamped manual candidate.
    Manual(Candidate),
    Auto,
}

impl SearchMode {
    pub fn kind(&self) -> OptimizerMode {
        match self {
            SearchMode::FixedRule => OptimizerMode::FixedRule,
            SearchMode::Manual(_) => OptimizerMode::Manual,
            SearchMode::Auto => OptimizerMode::Auto,
        }
    }
}

/// Pick the optimizer mode for a call.
///
/// A missing half of a manual override defaults to zero before clamping.
pub fn select_mode(
    input: &CalculationInput,
    limits: &ResolvedLimits,
    config: &EngineConfig,
) -> SearchMode {
    if config.is_fixed_rule(&input.product) {
        return SearchMode::FixedRule;
    }
    if !input.has_manual_override() {
        return SearchMode::Auto;
    }
    let max_rolled = limits.max_rolled_months.min(limits.term_months);
    let rolled = clamp_months(
        input.manual_rolled_months.unwrap_or(0),
        limits.min_rolled_months,
        max_rolled,
    )
    .min(limits.term_months);
    let deferred = clamp_decimal(
        input.manual_deferred_rate.unwrap_or(Decimal::ZERO),
        limits.min_deferred_rate,
        limits.max_deferred_rate,
    );
    SearchMode::Manual(Candidate::new(rolled, deferred))
}

// ---------------------------------------------------------------------------
// Candidate space
// ---------------------------------------------------------------------------

/// Grid of candidates: every rolled month in range crossed with every
/// deferred-rate step. Always holds at least one candidate.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchSpace {
    pub min_rolled: Months,
    pub max_rolled: Months,
    pub min_deferred: Rate,
    pub deferred_step: Rate,
    /// Index of the last deferred step; zero for a single column.
    pub deferred_steps: u32,
    /// Upper deferred bound; off-grid maxima are never exceeded.
    pub max_deferred: Rate,
}

impl SearchSpace {
    pub fn new(limits: &ResolvedLimits, settings: &SearchSettings) -> Self {
        let max_rolled = limits.max_rolled_months.min(limits.term_months);
        let min_rolled = limits.min_rolled_months.min(max_rolled);
        let span = limits.max_deferred_rate - limits.min_deferred_rate;
        let deferred_steps = if settings.deferred_step > Decimal::ZERO && span > Decimal::ZERO {
            (span / settings.deferred_step).floor().to_u32().unwrap_or(0)
        } else {
            0
        };
        Self {
            min_rolled,
            max_rolled,
            min_deferred: limits.min_deferred_rate,
            deferred_step: settings.deferred_step,
            deferred_steps,
            max_deferred: limits.max_deferred_rate.max(limits.min_deferred_rate),
        }
    }

    pub fn deferred_at(&self, step: u32) -> Rate {
        (self.min_deferred + self.deferred_step * Decimal::from(step)).min(self.max_deferred)
    }

    pub fn candidate(&self, rolled: Months, step: u32) -> Candidate {
        Candidate::new(rolled, self.deferred_at(step))
    }

    pub fn size(&self) -> u64 {
        u64::from(self.max_rolled - self.min_rolled + 1) * u64::from(self.deferred_steps + 1)
    }
}

/// Whether `candidate` should displace `incumbent`.
///
/// The net loan must improve by more than the tie tolerance; on a tie the
/// smaller rolled months, then the smaller deferred rate, wins.
pub fn is_better(candidate: &Scenario, incumbent: &Scenario) -> bool {
    let diff = candidate.net_loan - incumbent.net_loan;
    if diff > NET_TIE_TOLERANCE {
        return true;
    }
    if diff < -NET_TIE_TOLERANCE {
        return false;
    }
    (candidate.rolled_months, candidate.deferred_rate)
        < (incumbent.rolled_months, incumbent.deferred_rate)
}

/// Best scenario found and how many candidates were evaluated.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub best: Scenario,
    pub evaluations: u64,
}

/// Tracks the incumbent while a strategy walks the space.
struct Tracker<'a, 'b> {
    ctx: &'a ScenarioContext<'b>,
    best: Option<Scenario>,
    evaluations: u64,
}

impl<'a, 'b> Tracker<'a, 'b> {
    fn new(ctx: &'a ScenarioContext<'b>) -> Self {
        Self {
            ctx,
            best: None,
            evaluations: 0,
        }
    }

    fn evaluate(&mut self, candidate: Candidate) -> Scenario {
        self.evaluations += 1;
        let scenario = evaluate_scenario(self.ctx, candidate);
        let replace = match &self.best {
            Some(best) => is_better(&scenario, best),
            None => true,
        };
        if replace {
            self.best = Some(scenario.clone());
        }
        scenario
    }

    fn finish(mut self, space: &SearchSpace) -> SearchOutcome {
        let best = match self.best.take() {
            Some(best) => best,
            None => self.evaluate(space.candidate(space.min_rolled, 0)),
        };
        SearchOutcome {
            best,
            evaluations: self.evaluations,
        }
    }
}

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

pub trait SearchStrategy {
    fn name(&self) -> &'static str;

    fn search(&self, ctx: &ScenarioContext<'_>, space: &SearchSpace) -> SearchOutcome;
}

/// Exhaustive scan of every candidate.
#[derive(Debug, Clone, Copy, Default)]
pub struct GridSearch;

impl SearchStrategy for GridSearch {
    fn name(&self) -> &'static str {
        "grid"
    }

    fn search(&self, ctx: &ScenarioContext<'_>, space: &SearchSpace) -> SearchOutcome {
        let mut tracker = Tracker::new(ctx);
        for rolled in space.min_rolled..=space.max_rolled {
            for step in 0..=space.deferred_steps {
                tracker.evaluate(space.candidate(rolled, step));
            }
        }
        tracker.finish(space)
    }
}

/// Ternary search over deferred-rate steps within each rolled month.
///
/// Net loan is unimodal in the deferred rate for a fixed rolled month. When
/// the two probes cannot be told apart the remaining window is scanned, so
/// plateaus resolve exactly as the grid would.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoldenSectionSearch;

impl SearchStrategy for GoldenSectionSearch {
    fn name(&self) -> &'static str {
        "golden_section"
    }

    fn search(&self, ctx: &ScenarioContext<'_>, space: &SearchSpace) -> SearchOutcome {
        let mut tracker = Tracker::new(ctx);
        for rolled in space.min_rolled..=space.max_rolled {
            let (mut lo, mut hi) = (0u32, space.deferred_steps);
            while hi - lo > 2 {
                let third = (hi - lo) / 3;
                let (m1, m2) = (lo + third, hi - third);
                let a = tracker.evaluate(space.candidate(rolled, m1)).net_loan;
                let b = tracker.evaluate(space.candidate(rolled, m2)).net_loan;
                if (a - b).abs() <= NET_TIE_TOLERANCE {
                    break;
                }
                if a < b {
                    lo = m1 + 1;
                } else {
                    hi = m2 - 1;
                }
            }
            for step in lo..=hi {
                tracker.evaluate(space.candidate(rolled, step));
            }
        }
        tracker.finish(space)
    }
}

pub fn strategy_for(method: SearchMethod) -> &'static dyn SearchStrategy {
    match method {
        SearchMethod::Grid => &GridSearch,
        SearchMethod::GoldenSection => &GoldenSectionSearch,
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct Optimized {
    pub mode: OptimizerMode,
    pub scenario: Scenario,
    pub evaluations: u64,
}

/// Run the selected mode and return the winning scenario.
///
/// Always yields a scenario, with a zero gross loan when nothing is feasible.
pub fn optimize(
    ctx: &ScenarioContext<'_>,
    limits: &ResolvedLimits,
    mode: SearchMode,
    settings: &SearchSettings,
) -> Optimized {
    match mode {
        SearchMode::FixedRule => Optimized {
            mode: OptimizerMode::FixedRule,
            scenario: evaluate_scenario(ctx, Candidate::NONE),
            evaluations: 1,
        },
        SearchMode::Manual(candidate) => Optimized {
            mode: OptimizerMode::Manual,
            scenario: evaluate_scenario(ctx, candidate),
            evaluations: 1,
        },
        SearchMode::Auto => {
            let space = SearchSpace::new(limits, settings);
            let strategy = strategy_for(settings.method);
            let outcome = strategy.search(ctx, &space);
            tracing::trace!(
                strategy = strategy.name(),
                evaluations = outcome.evaluations,
                space = space.size(),
                rolled_months = outcome.best.rolled_months,
                deferred_rate = %outcome.best.deferred_rate,
                net_loan = %outcome.best.net_loan,
                "search complete"
            );
            Optimized {
                mode: OptimizerMode::Auto,
                scenario: outcome.best,
                evaluations: outcome.evaluations,
            }
        }
    }
}
