//! Constraint Engine: LTV and absolute loan bounds.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::EngineConfig;
use crate::input::CalculationInput;
use crate::numeric::{min_bound, positive};
use crate::product::{LoanType, RateRecord};
use crate::types::{Money, Months, Multiple, Rate};

/// Rate-record bounds with configured fallbacks filled in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ResolvedLimits {
    pub min_loan: Money,
    pub max_loan: Money,
    pub term_months: Months,
    pub min_rolled_months: Months,
    pub max_rolled_months: Months,
    pub min_deferred_rate: Rate,
    pub max_deferred_rate: Rate,
    pub min_icr: Multiple,
}

/// Gross-loan bounds that do not depend on the rolled/deferred candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoanCaps {
    /// Tightest applicable LTV ceiling; `None` when nothing limits LTV.
    pub effective_max_ltv: Option<Rate>,
    /// `property_value x effective_max_ltv`; `None` without a property value.
    pub ltv_cap: Option<Money>,
    /// LTV cap, specific gross amount and maximum loan combined.
    pub loan_cap: Money,
    pub min_loan: Money,
    pub max_loan: Money,
}

pub fn resolve_limits(record: &RateRecord, config: &EngineConfig) -> ResolvedLimits {
    let defaults = &config.limits;
    ResolvedLimits {
        min_loan: record.min_loan.unwrap_or(defaults.min_loan),
        max_loan: record.max_loan.unwrap_or(defaults.max_loan),
        term_months: record
            .term_months
            .filter(|t| *t > 0)
            .unwrap_or(defaults.term_months),
        min_rolled_months: record.min_rolled_months.unwrap_or(0),
        max_rolled_months: record
            .max_rolled_months
            .unwrap_or(defaults.max_rolled_months),
        min_deferred_rate: record.min_deferred_rate.unwrap_or(Decimal::ZERO),
        max_deferred_rate: record
            .max_deferred_rate
            .unwrap_or(defaults.max_deferred_rate),
        min_icr: record
            .min_icr
            .unwrap_or_else(|| defaults.min_icr_for(record.product_kind)),
    }
}

/// Lowest of the product maximum, the retention tier cap, the
/// flat-above-commercial tier cap and (for LTV-driven loan types) the
/// borrower's target LTV.
pub fn effective_max_ltv(
    input: &CalculationInput,
    record: &RateRecord,
    config: &EngineConfig,
) -> Option<Rate> {
    let retention = input.retention.map(|t| config.retention_ltv.cap_for(t));

    let flat_above_commercial = match (&config.flat_above_commercial, input.tier) {
        (Some(rule), Some(tier)) if input.flat_above_commercial => {
            rule.tier_ltv.get(&tier).copied()
        }
        _ => None,
    };

    let target = match input.loan_type {
        LoanType::MaxLtv | LoanType::SpecificLtv => positive(input.target_ltv),
        LoanType::SpecificGross | LoanType::SpecificNet => None,
    };

    [positive(record.max_ltv), retention, flat_above_commercial, target]
        .into_iter()
        .fold(None, min_bound)
}

/// Candidate-independent caps for one quote.
pub fn derive_loan_caps(
    input: &CalculationInput,
    record: &RateRecord,
    limits: &ResolvedLimits,
    config: &EngineConfig,
) -> LoanCaps {
    let max_ltv = effective_max_ltv(input, record, config);
    let ltv_cap = match (positive(input.property_value), max_ltv) {
        (Some(value), Some(ltv)) => Some(value * ltv),
        _ => None,
    };

    let mut cap = ltv_cap;
    if input.loan_type == LoanType::SpecificGross {
        cap = min_bound(cap, positive(input.specific_gross_loan));
    }
    let loan_cap = cap.map_or(limits.max_loan, |c| c.min(limits.max_loan));

    LoanCaps {
        effective_max_ltv: max_ltv,
        ltv_cap,
        loan_cap,
        min_loan: limits.min_loan,
        max_loan: limits.max_loan,
    }
}
