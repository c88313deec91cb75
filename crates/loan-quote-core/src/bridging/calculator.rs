//! Bridge and Fusion calculator.
//!
//! Product kinds map as Fixed -> fixed bridge (monthly coupon), Tracker ->
//! variable bridge (monthly margin over base rate) and FusionTiered -> Fusion
//! (annual tier margin over base rate, fixed 24-month term). Only Fusion
//! defers interest. When the borrower fixes a net loan the gross is found
//! with [`solve_gross_for_net`] against the same forward calculation used
//! for the final quote.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Instant;

use crate::bridging::reverse::{solve_gross_for_net, NetSolveOutcome};
use crate::broker::{broker_fees, resolve_proc_fee_pct, BrokerInputs};
use crate::config::EngineConfig;
use crate::error::LoanQuoteError;
use crate::metrics::{aprc, erc_schedule, title_insurance};
use crate::numeric::{clamp_decimal, clamp_months, format_rate_pct, months, positive, MONTHS_PER_YEAR};
use crate::product::{ProductKind, RateBasis, RateRecord};
use crate::types::{elapsed_us, with_metadata, ComputationOutput, Money, Months, Multiple, Rate};
use crate::LoanQuoteResult;

// ---------------------------------------------------------------------------
// Input / Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BridgingInput {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gross_loan: Option<Money>,
    /// When positive, the gross loan is solved for this net amount.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specific_net_loan: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_value: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_rent: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_slicing: Option<Money>,
    /// Bridge term; Fusion always uses the configured Fusion term.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term_months: Option<Months>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rolled_months: Option<Months>,
    /// Annual deferred rate; Fusion only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deferred_rate: Option<Rate>,
    #[serde(default)]
    pub broker: BrokerInputs,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErcAmount {
    pub year: u32,
    pub rate: Rate,
    pub amount: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BridgingQuote {
    pub product_kind: ProductKind,
    pub fusion_tier: Option<String>,
    pub gross_loan: Money,
    pub net_loan: Money,
    /// 60, 70 or 75.
    pub ltv_bucket: u32,
    pub gross_ltv: Option<Rate>,
    pub net_ltv: Option<Rate>,

    // Rates
    pub full_annual_rate: Rate,
    pub full_rate_monthly: Rate,
    /// Coupon or margin per month.
    pub coupon_monthly: Rate,
    pub bbr_monthly: Rate,
    /// Annual for Fusion (margin less deferred), monthly coupon for bridges.
    pub pay_rate: Rate,
    pub full_rate_text: String,
    pub pay_rate_text: String,

    // Fees
    pub arrangement_fee_pct: Rate,
    pub arrangement_fee_amount: Money,
    pub proc_fee_pct: Rate,
    pub proc_fee_amount: Money,
    pub broker_fee_amount: Money,
    pub client_fee_amount: Money,
    pub admin_fee: Money,
    pub title_insurance: Option<Money>,
    pub commitment_fee_amount: Money,
    pub exit_fee_amount: Money,
    pub erc: Vec<ErcAmount>,

    // Interest
    pub term_months: Months,
    pub rolled_months: Months,
    pub serviced_months: Months,
    pub deferred_rate: Rate,
    pub rolled_interest_coupon: Money,
    pub rolled_interest_bbr: Money,
    pub rolled_interest_amount: Money,
    pub deferred_interest_amount: Money,
    pub serviced_interest_amount: Money,
    pub total_interest: Money,
    pub monthly_payment: Money,

    pub aprc_annual: Option<Rate>,
    pub aprc_monthly: Option<Rate>,
    pub total_amount_repayable: Money,
    /// Fusion only.
    pub icr: Option<Multiple>,

    // Flags
    pub below_minimum_loan: bool,
    pub hit_maximum_loan_cap: bool,
    pub hit_ltv_cap: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_solve: Option<NetSolveOutcome>,
}

// ---------------------------------------------------------------------------
// Internal pricing terms
// ---------------------------------------------------------------------------

/// Everything fixed for a call except the gross loan.
#[derive(Debug, Clone)]
struct PricingTerms {
    kind: ProductKind,
    /// Record rate on the product's bridging basis.
    nominal: Rate,
    term: Months,
    rolled: Months,
    deferred_annual: Rate,
    coupon_monthly: Rate,
    bbr_monthly: Rate,
    full_annual_rate: Rate,
    arrangement_pct: Rate,
    proc_fee_pct: Rate,
    admin_fee: Money,
}

/// Gross-dependent figures.
#[derive(Debug, Clone, Copy)]
struct Breakdown {
    arrangement: Money,
    proc_fee: Money,
    broker_fee: Money,
    client_fee: Money,
    title: Option<Money>,
    rolled_coupon: Money,
    rolled_bbr: Money,
    deferred: Money,
    serviced: Money,
    net: Money,
}

impl Breakdown {
    fn rolled(&self) -> Money {
        self.rolled_coupon + self.rolled_bbr
    }

    fn total_interest(&self) -> Money {
        self.deferred + self.rolled() + self.serviced
    }
}

fn breakdown(gross: Money, t: &PricingTerms, broker: &BrokerInputs, config: &EngineConfig) -> Breakdown {
    let fees = broker_fees(gross, t.proc_fee_pct, broker);
    let title = title_insurance(gross, &config.title_insurance);
    let rolled = months(t.rolled);
    let deferred_monthly = t.deferred_annual / MONTHS_PER_YEAR;

    let deferred = gross * deferred_monthly * months(t.term);
    let rolled_coupon = gross * (t.coupon_monthly - deferred_monthly) * rolled;
    let rolled_bbr = gross * t.bbr_monthly * rolled;
    let serviced_rate = t.full_annual_rate - t.deferred_annual;
    let serviced =
        gross * serviced_rate / MONTHS_PER_YEAR * months(t.term.saturating_sub(t.rolled));

    let arrangement = gross * t.arrangement_pct;
    let net = (gross
        - arrangement
        - rolled_coupon
        - rolled_bbr
        - deferred
        - fees.proc_fee_amount
        - fees.broker_fee_amount
        - fees.client_fee_amount
        - t.admin_fee
        - title.unwrap_or(Decimal::ZERO))
    .max(Decimal::ZERO);

    Breakdown {
        arrangement,
        proc_fee: fees.proc_fee_amount,
        broker_fee: fees.broker_fee_amount,
        client_fee: fees.client_fee_amount,
        title,
        rolled_coupon,
        rolled_bbr,
        deferred,
        serviced,
        net,
    }
}

fn pricing_terms(
    input: &BridgingInput,
    record: &RateRecord,
    proc_fee_pct: Rate,
    config: &EngineConfig,
) -> PricingTerms {
    let settings = &config.bridging;
    let bbr_annual = config.market.standard_bbr;
    let kind = record.product_kind;
    let nominal = record.rate_on(RateBasis::for_bridging(kind));

    let term = match kind {
        ProductKind::FusionTiered => settings.fusion_term_months,
        _ => input
            .term_months
            .filter(|t| *t > 0)
            .or(record.term_months)
            .unwrap_or(settings.default_bridge_term_months),
    };

    let (min_rolled, max_rolled) = match kind {
        ProductKind::FusionTiered => (
            record.min_rolled_months.unwrap_or(settings.fusion_min_rolled_months),
            record.max_rolled_months.unwrap_or(settings.fusion_max_rolled_months),
        ),
        _ => (
            record.min_rolled_months.unwrap_or(settings.bridge_min_rolled_months),
            record
                .max_rolled_months
                .unwrap_or(settings.bridge_max_rolled_months)
                .min(term),
        ),
    };
    let rolled = input
        .rolled_months
        .map_or(min_rolled, |r| clamp_months(r, min_rolled, max_rolled))
        .min(term);

    let deferred_annual = match kind {
        ProductKind::FusionTiered => {
            let max_deferred = record.max_deferred_rate.unwrap_or(Decimal::ZERO);
            clamp_decimal(
                input.deferred_rate.unwrap_or(Decimal::ZERO),
                Decimal::ZERO,
                max_deferred,
            )
        }
        _ => Decimal::ZERO,
    };

    let (coupon_monthly, bbr_monthly, full_annual_rate) = match kind {
        ProductKind::Fixed => (nominal, Decimal::ZERO, nominal * MONTHS_PER_YEAR),
        ProductKind::Tracker => {
            let bbr_monthly = bbr_annual / MONTHS_PER_YEAR;
            (nominal, bbr_monthly, (nominal + bbr_monthly) * MONTHS_PER_YEAR)
        }
        ProductKind::FusionTiered => (
            nominal / MONTHS_PER_YEAR,
            bbr_annual / MONTHS_PER_YEAR,
            nominal + bbr_annual,
        ),
    };

    PricingTerms {
        kind,
        nominal,
        term,
        rolled,
        deferred_annual,
        coupon_monthly,
        bbr_monthly,
        full_annual_rate,
        arrangement_pct: record.product_fee.unwrap_or(settings.default_arrangement_fee),
        proc_fee_pct,
        admin_fee: record.admin_fee.unwrap_or(Decimal::ZERO),
    }
}

/// Record bounds applied to the requested or solved gross loan.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct LoanBounds {
    min_loan: Option<Money>,
    max_loan: Option<Money>,
    ltv_cap: Option<Money>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct BoundedGross {
    gross: Money,
    below_minimum_loan: bool,
    hit_maximum_loan_cap: bool,
    hit_ltv_cap: bool,
}

impl LoanBounds {
    fn new(record: &RateRecord, property_value: Option<Money>) -> Self {
        Self {
            min_loan: positive(record.min_loan),
            max_loan: record.max_loan,
            ltv_cap: positive(property_value)
                .zip(record.max_ltv)
                .map(|(pv, ltv)| pv * ltv),
        }
    }

    /// Cap at the tighter of maximum loan and LTV; below the minimum no loan is offered.
    fn apply(&self, gross: Money) -> BoundedGross {
        let mut out = BoundedGross {
            gross,
            ..Default::default()
        };
        if let Some(max) = self.max_loan.filter(|max| out.gross > *max) {
            out.gross = max;
            out.hit_maximum_loan_cap = true;
        }
        if let Some(cap) = self.ltv_cap.filter(|cap| out.gross > *cap) {
            out.gross = cap;
            out.hit_maximum_loan_cap = false;
            out.hit_ltv_cap = true;
        }
        if let Some(min) = self.min_loan.filter(|min| out.gross < *min) {
            out.gross = Decimal::ZERO;
            out.below_minimum_loan = true;
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// LTV band used to pick bridge pricing: 60 up to 60%, 70 up to 70%, else 75.
pub fn ltv_bucket(gross: Money, property_value: Option<Money>) -> u32 {
    let Some(pv) = positive(property_value) else {
        return 75;
    };
    let ltv = gross / pv;
    if ltv <= Decimal::new(60, 2) {
        60
    } else if ltv <= Decimal::new(70, 2) {
        70
    } else {
        75
    }
}

/// Price a Bridge or Fusion loan, solving for gross when a net loan is given.
pub fn calculate_bridging_quote(
    input: &BridgingInput,
    record: &RateRecord,
    config: &EngineConfig,
) -> LoanQuoteResult<ComputationOutput<BridgingQuote>> {
    let start = Instant::now();
    record.validate()?;

    let mut warnings: Vec<String> = Vec::new();
    let proc = resolve_proc_fee_pct(&input.broker, &config.broker);
    if proc.clamped {
        warnings.push(format!(
            "Requested proc fee adjusted to {} (route tolerance)",
            format_rate_pct(proc.proc_fee_pct)
        ));
    }
    let terms = pricing_terms(input, record, proc.proc_fee_pct, config);

    let (gross, net_solve) = match (positive(input.specific_net_loan), positive(input.gross_loan)) {
        (Some(target), _) => {
            let outcome = solve_gross_for_net(target, |g| {
                breakdown(g, &terms, &input.broker, config).net
            });
            if !outcome.converged {
                warnings.push(format!(
                    "Net loan solver stopped after {} iterations; net differs from target by {}",
                    outcome.iterations,
                    outcome.residual.round_dp(2)
                ));
            }
            (outcome.gross, Some(outcome))
        }
        (None, Some(gross)) => (gross, None),
        (None, None) => {
            return Err(LoanQuoteError::InvalidInput {
                field: "gross_loan".into(),
                reason: "Provide a positive gross loan or specific net loan".into(),
            })
        }
    };

    let requested = gross;
    let bounded = LoanBounds::new(record, input.property_value).apply(requested);
    let gross = bounded.gross;
    if bounded.hit_maximum_loan_cap {
        warnings.push(format!(
            "Gross loan {} capped at the product maximum of {}",
            requested.round_dp(2),
            gross.round_dp(2)
        ));
    }
    if bounded.hit_ltv_cap {
        warnings.push(format!(
            "Gross loan {} capped at {} by the maximum LTV",
            requested.round_dp(2),
            gross.round_dp(2)
        ));
    }
    if bounded.below_minimum_loan {
        warnings.push(format!(
            "Gross loan {} is below the product minimum; no loan offered",
            requested.round_dp(2)
        ));
    }

    let b = breakdown(gross, &terms, &input.broker, config);
    if let Some(target) = positive(input.specific_net_loan) {
        if gross != requested && b.net < target {
            warnings.push(format!(
                "Net loan target of {target} is not reachable within product limits"
            ));
        }
    }
    let has_loan = gross > Decimal::ZERO;
    let serviced_months = terms.term.saturating_sub(terms.rolled);
    let monthly_payment = if serviced_months > 0 {
        b.serviced / months(serviced_months)
    } else {
        Decimal::ZERO
    };
    let total_interest = b.total_interest();
    let aprc_annual = aprc(gross, b.net, total_interest, terms.term);

    let is_fusion = terms.kind == ProductKind::FusionTiered;
    let icr = if is_fusion {
        fusion_icr(input, gross, &terms, b.rolled(), config)
    } else {
        None
    };

    let erc = if is_fusion {
        erc_schedule(&record.erc)
            .into_iter()
            .filter(|e| e.year <= 2)
            .map(|e| ErcAmount {
                year: e.year,
                rate: e.rate,
                amount: gross * e.rate,
            })
            .collect()
    } else {
        Vec::new()
    };

    let (pay_rate, full_rate_text, pay_rate_text) = rate_texts(&terms);
    let pv = positive(input.property_value);

    tracing::debug!(
        kind = ?terms.kind,
        gross_loan = %gross,
        net_loan = %b.net,
        rolled_months = terms.rolled,
        solved = net_solve.is_some(),
        "bridging quote calculated"
    );

    let output = BridgingQuote {
        product_kind: terms.kind,
        fusion_tier: record.fusion_tier.clone().filter(|_| is_fusion),
        gross_loan: gross,
        net_loan: b.net,
        ltv_bucket: ltv_bucket(gross, pv),
        gross_ltv: pv.map(|v| gross / v),
        net_ltv: pv.map(|v| b.net / v),
        full_annual_rate: terms.full_annual_rate,
        full_rate_monthly: terms.full_annual_rate / MONTHS_PER_YEAR,
        coupon_monthly: terms.coupon_monthly,
        bbr_monthly: terms.bbr_monthly,
        pay_rate,
        full_rate_text,
        pay_rate_text,
        arrangement_fee_pct: terms.arrangement_pct,
        arrangement_fee_amount: b.arrangement,
        proc_fee_pct: terms.proc_fee_pct,
        proc_fee_amount: b.proc_fee,
        broker_fee_amount: b.broker_fee,
        client_fee_amount: b.client_fee,
        admin_fee: if has_loan { terms.admin_fee } else { Decimal::ZERO },
        title_insurance: b.title,
        commitment_fee_amount: gross * config.bridging.commitment_fee,
        exit_fee_amount: gross * config.bridging.exit_fee,
        erc,
        term_months: terms.term,
        rolled_months: terms.rolled,
        serviced_months,
        deferred_rate: terms.deferred_annual,
        rolled_interest_coupon: b.rolled_coupon,
        rolled_interest_bbr: b.rolled_bbr,
        rolled_interest_amount: b.rolled(),
        deferred_interest_amount: b.deferred,
        serviced_interest_amount: b.serviced,
        total_interest,
        monthly_payment,
        aprc_annual,
        aprc_monthly: aprc_annual.map(|a| a / MONTHS_PER_YEAR),
        total_amount_repayable: gross + total_interest,
        icr,
        below_minimum_loan: bounded.below_minimum_loan,
        hit_maximum_loan_cap: bounded.hit_maximum_loan_cap,
        hit_ltv_cap: bounded.hit_ltv_cap,
        net_solve,
    };

    let assumptions = json!({
        "product_kind": terms.kind,
        "term_months": terms.term,
        "rolled_months": terms.rolled,
        "deferred_rate": terms.deferred_annual.to_string(),
        "arrangement_fee_pct": terms.arrangement_pct.to_string(),
        "standard_bbr": config.market.standard_bbr.to_string(),
        "commitment_fee_pct": config.bridging.commitment_fee.to_string(),
        "exit_fee_pct": config.bridging.exit_fee.to_string(),
    });

    Ok(with_metadata(
        "Bridge/Fusion pricing: rolled, deferred and serviced interest with fee deductions",
        &assumptions,
        warnings,
        elapsed_us(start),
        output,
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// (income x ICR months) / ((annual rate - deferred) x gross x years - rolled).
fn fusion_icr(
    input: &BridgingInput,
    gross: Money,
    terms: &PricingTerms,
    rolled_interest: Money,
    config: &EngineConfig,
) -> Option<Multiple> {
    let income = positive(input.monthly_rent).unwrap_or(Decimal::ZERO)
        + positive(input.top_slicing).unwrap_or(Decimal::ZERO);
    if income <= Decimal::ZERO {
        return None;
    }
    let settings = &config.bridging;
    let interest = (terms.full_annual_rate - terms.deferred_annual) * gross * settings.icr_years()
        - rolled_interest;
    if interest <= Decimal::ZERO {
        return None;
    }
    Some(income * months(settings.fusion_icr_months) / interest)
}

fn rate_texts(terms: &PricingTerms) -> (Rate, String, String) {
    let nominal = terms.nominal;
    match terms.kind {
        ProductKind::FusionTiered => {
            let pay = nominal - terms.deferred_annual;
            (
                pay,
                format!("{} + BBR", format_rate_pct(nominal)),
                format!("{} + BBR", format_rate_pct(pay)),
            )
        }
        ProductKind::Tracker => (
            terms.coupon_monthly,
            format!("{} + BBR", format_rate_pct(terms.coupon_monthly)),
            format!("{} + BBR", format_rate_pct(terms.coupon_monthly)),
        ),
        ProductKind::Fixed => (
            terms.coupon_monthly,
            format_rate_pct(terms.coupon_monthly),
            format_rate_pct(terms.coupon_monthly),
        ),
    }
}
