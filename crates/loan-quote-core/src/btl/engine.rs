//! The single BTL engine entry point: `evaluate(input, rate record, config)`.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Instant;

use crate::broker::{broker_fees, resolve_proc_fee_pct};
use crate::btl::constraints::{derive_loan_caps, resolve_limits};
use crate::btl::optimizer::{optimize, select_mode, OptimizerMode};
use crate::btl::scenario::ScenarioContext;
use crate::config::EngineConfig;
use crate::error::LoanQuoteError;
use crate::input::CalculationInput;
use crate::metrics::{derive_metrics, DerivedMetrics, MetricsInput};
use crate::numeric::{format_rate_pct, positive, MAX_LOAN_MATCH_TOLERANCE};
use crate::product::{ProductKind, RateBasis, RateRecord};
use crate::rates::compose_rates;
use crate::types::{elapsed_us, with_metadata, ComputationOutput, Money, Months, Multiple, Rate};
use crate::LoanQuoteResult;

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Quote for one (rate record, fee column) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteOutput {
    pub product_name: String,
    pub product_kind: ProductKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column_key: Option<String>,
    pub mode: OptimizerMode,

    // Rates
    pub full_rate_text: String,
    pub pay_rate_text: String,
    pub display_rate: Rate,
    pub stress_rate: Rate,
    pub pay_rate: Rate,
    pub is_rate_overridden: bool,
    pub floor_applied: Option<Rate>,

    // Loan amounts
    pub gross_loan: Money,
    pub net_loan: Money,
    pub product_fee_pct: Rate,
    pub product_fee_amount: Money,
    pub rolled_interest_amount: Money,
    pub deferred_interest_amount: Money,

    // Ratios
    pub ltv: Option<Rate>,
    pub net_ltv: Option<Rate>,
    pub effective_max_ltv: Option<Rate>,
    pub icr: Option<Multiple>,
    pub min_icr: Multiple,

    // Payments
    pub monthly_payment: Money,
    pub payment_start_month: Months,
    pub rolled_months: Months,
    pub deferred_rate: Rate,
    pub term_months: Months,

    // Broker
    pub proc_fee_pct: Rate,
    pub proc_fee_amount: Money,
    pub broker_fee_amount: Money,
    pub client_fee_amount: Money,

    // Flags
    pub below_minimum_loan: bool,
    pub hit_maximum_loan_cap: bool,
    pub is_manual_override: bool,

    #[serde(flatten)]
    pub metrics: DerivedMetrics,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Size, optimise and price a BTL loan for one product column.
pub fn evaluate(
    input: &CalculationInput,
    record: &RateRecord,
    config: &EngineConfig,
) -> LoanQuoteResult<ComputationOutput<QuoteOutput>> {
    let start = Instant::now();
    record.validate()?;

    let mut warnings: Vec<String> = Vec::new();
    let limits = resolve_limits(record, config);

    // Rates
    let nominal = input
        .rate_override
        .unwrap_or_else(|| record.rate_on(RateBasis::Annual));
    let rates = compose_rates(
        record.product_kind,
        nominal,
        &config.market,
        &input.product,
        &config.floor_policy,
    );
    if let Some(floor) = rates.floor_applied {
        warnings.push(format!(
            "Rate floor of {} applied for {} {}",
            format_rate_pct(floor),
            input.product.range,
            input.product.property_type
        ));
    }

    // Caps and search
    let caps = derive_loan_caps(input, record, &limits, config);
    let fee_pct = input
        .effective_fee_pct()
        .or(record.product_fee)
        .unwrap_or(Decimal::ZERO);
    if fee_pct < Decimal::ZERO || fee_pct >= Decimal::ONE {
        return Err(LoanQuoteError::InvalidInput {
            field: "product_fee_pct".into(),
            reason: format!("Product fee {fee_pct} must be between 0% and 100%"),
        });
    }
    let monthly_income = positive(input.monthly_rent).unwrap_or(Decimal::ZERO)
        + positive(input.top_slicing).unwrap_or(Decimal::ZERO);
    let ctx = ScenarioContext {
        rates: &rates,
        caps: &caps,
        limits: &limits,
        loan_type: input.loan_type,
        specific_net_loan: input.specific_net_loan,
        property_value: input.property_value,
        monthly_income,
        fee_pct,
    };
    let mode = select_mode(input, &limits, config);
    let optimized = optimize(&ctx, &limits, mode, &config.search);
    let scenario = optimized.scenario;

    // Broker
    let proc = resolve_proc_fee_pct(&input.broker, &config.broker);
    if proc.clamped {
        warnings.push(format!(
            "Requested proc fee adjusted to {} (route tolerance)",
            format_rate_pct(proc.proc_fee_pct)
        ));
    }
    let fees = broker_fees(scenario.gross_loan, proc.proc_fee_pct, &input.broker);

    let metrics = derive_metrics(
        &MetricsInput {
            gross_loan: scenario.gross_loan,
            net_loan: scenario.net_loan,
            product_fee_amount: scenario.product_fee_amount,
            rolled_interest_amount: scenario.rolled_interest_amount,
            deferred_interest_amount: scenario.deferred_interest_amount,
            monthly_payment: scenario.monthly_payment,
            rolled_months: scenario.rolled_months,
            term_months: limits.term_months,
            record,
            broker_fees: &fees,
        },
        &config.market,
        &config.title_insurance,
    );

    // Flags
    let hit_maximum_loan_cap =
        (scenario.gross_loan - limits.max_loan).abs() < MAX_LOAN_MATCH_TOLERANCE;
    if scenario.below_minimum_loan {
        warnings.push(format!(
            "Eligible loan is below the product minimum of {}; no loan offered",
            limits.min_loan
        ));
    }
    if scenario.gross_loan.is_zero() && !scenario.below_minimum_loan {
        warnings.push("No eligible loan for these inputs".into());
    }

    let product_name = match (&input.product_type, input.tier) {
        (Some(name), Some(tier)) => format!("{name}, Tier {tier}"),
        (Some(name), None) => name.clone(),
        (None, _) => format!("{} {}", input.product.range, input.product.property_type),
    };

    tracing::debug!(
        product = %product_name,
        column = input.column_key.as_deref().unwrap_or("-"),
        mode = ?optimized.mode,
        evaluations = optimized.evaluations,
        gross_loan = %scenario.gross_loan,
        net_loan = %scenario.net_loan,
        "btl quote evaluated"
    );

    let net_ltv = positive(input.property_value).map(|pv| scenario.net_loan / pv);
    let output = QuoteOutput {
        product_name,
        product_kind: record.product_kind,
        column_key: input.column_key.clone(),
        mode: optimized.mode,
        full_rate_text: rates.full_rate_text(),
        pay_rate_text: rates.pay_rate_text(scenario.deferred_rate),
        display_rate: rates.display_rate,
        stress_rate: rates.stress_rate,
        pay_rate: scenario.pay_rate,
        is_rate_overridden: input.rate_override.is_some(),
        floor_applied: rates.floor_applied,
        gross_loan: scenario.gross_loan,
        net_loan: scenario.net_loan,
        product_fee_pct: fee_pct,
        product_fee_amount: scenario.product_fee_amount,
        rolled_interest_amount: scenario.rolled_interest_amount,
        deferred_interest_amount: scenario.deferred_interest_amount,
        ltv: scenario.ltv,
        net_ltv,
        effective_max_ltv: caps.effective_max_ltv,
        icr: scenario.icr,
        min_icr: limits.min_icr,
        monthly_payment: scenario.monthly_payment,
        payment_start_month: scenario.payment_start_month,
        rolled_months: scenario.rolled_months,
        deferred_rate: scenario.deferred_rate,
        term_months: limits.term_months,
        proc_fee_pct: fees.proc_fee_pct,
        proc_fee_amount: fees.proc_fee_amount,
        broker_fee_amount: fees.broker_fee_amount,
        client_fee_amount: fees.client_fee_amount,
        below_minimum_loan: scenario.below_minimum_loan,
        hit_maximum_loan_cap,
        is_manual_override: optimized.mode == OptimizerMode::Manual,
        metrics,
    };

    let assumptions = json!({
        "loan_type": input.loan_type,
        "product": input.product,
        "optimizer_mode": optimized.mode,
        "search_method": config.search.method,
        "candidates_evaluated": optimized.evaluations,
        "product_fee_pct": fee_pct.to_string(),
        "min_icr": limits.min_icr.to_string(),
        "term_months": limits.term_months,
        "standard_bbr": config.market.standard_bbr.to_string(),
        "stress_bbr": config.market.stress_bbr.to_string(),
    });

    Ok(with_metadata(
        "BTL loan sizing: LTV and ICR caps, net-loan maximisation over rolled months and deferred rate",
        &assumptions,
        warnings,
        elapsed_us(start),
        output,
    ))
}
