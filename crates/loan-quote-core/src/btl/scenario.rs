//! Scenario Evaluator: one (rolled months, deferred rate) candidate.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::btl::constraints::{LoanCaps, ResolvedLimits};
use crate::numeric::{
    months, positive, tightest, MONTHS_PER_YEAR, NET_DENOMINATOR_EPSILON, PAYABLE_RATE_FLOOR,
};
use crate::product::LoanType;
use crate::rates::ComposedRates;
use crate::types::{Money, Months, Multiple, Rate};

/// Decimal places kept on reported ICR values.
const ICR_DP: u32 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Candidate {
    pub rolled_months: Months,
    pub deferred_rate: Rate,
}

impl Candidate {
    pub const NONE: Candidate = Candidate {
        rolled_months: 0,
        deferred_rate: Decimal::ZERO,
    };

    pub fn new(rolled_months: Months, deferred_rate: Rate) -> Self {
        Self {
            rolled_months,
            deferred_rate,
        }
    }
}

/// Everything the evaluator needs that stays fixed across candidates.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioContext<'a> {
    pub rates: &'a ComposedRates,
    pub caps: &'a LoanCaps,
    pub limits: &'a ResolvedLimits,
    pub loan_type: LoanType,
    pub specific_net_loan: Option<Money>,
    pub property_value: Option<Money>,
    /// Monthly rent plus top-slicing income.
    pub monthly_income: Money,
    pub fee_pct: Rate,
}

/// Full loan breakdown for one candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub rolled_months: Months,
    pub deferred_rate: Rate,
    pub gross_loan: Money,
    pub net_loan: Money,
    pub product_fee_amount: Money,
    pub rolled_interest_amount: Money,
    pub deferred_interest_amount: Money,
    pub ltv: Option<Rate>,
    pub icr: Option<Multiple>,
    pub pay_rate: Rate,
    /// Monthly "direct debit" payment.
    pub monthly_payment: Money,
    pub payment_start_month: Months,
    /// The caps allowed a loan, but less than the product minimum.
    pub below_minimum_loan: bool,
}

impl Scenario {
    pub fn candidate(&self) -> Candidate {
        Candidate::new(self.rolled_months, self.deferred_rate)
    }
}

/// Largest gross loan the rent supports at the minimum ICR.
///
/// `None` (unbounded) when there is no rental income.
pub fn icr_cap(ctx: &ScenarioContext<'_>, candidate: Candidate) -> Option<Money> {
    let income = positive(Some(ctx.monthly_income))?;
    let term = ctx.limits.term_months;
    let annual_rent = income * months(term);
    let payable_stress = (ctx.rates.stress_rate - candidate.deferred_rate).max(PAYABLE_RATE_FLOOR);
    let remaining = months(term.saturating_sub(candidate.rolled_months).max(1));
    let divisor = ctx.limits.min_icr * (payable_stress / MONTHS_PER_YEAR) * remaining;
    if divisor <= Decimal::ZERO {
        return None;
    }
    Some(annual_rent / divisor)
}

/// Gross loan whose deductions leave exactly the target net loan.
///
/// `None` when no target applies or the deductions consume the whole loan.
pub fn gross_from_net(ctx: &ScenarioContext<'_>, candidate: Candidate) -> Option<Money> {
    if ctx.loan_type != LoanType::SpecificNet {
        return None;
    }
    let target = positive(ctx.specific_net_loan)?;
    let pay_rate = ctx.rates.pay_rate(candidate.deferred_rate);
    let denominator = Decimal::ONE
        - ctx.fee_pct
        - pay_rate / MONTHS_PER_YEAR * months(candidate.rolled_months)
        - candidate.deferred_rate / MONTHS_PER_YEAR * months(ctx.limits.term_months);
    (denominator > NET_DENOMINATOR_EPSILON).then(|| target / denominator)
}

/// Evaluate one candidate into a [`Scenario`].
pub fn evaluate_scenario(ctx: &ScenarioContext<'_>, candidate: Candidate) -> Scenario {
    let term = ctx.limits.term_months;
    let rolled = candidate.rolled_months;
    let deferred = candidate.deferred_rate;

    let eligible = tightest(&[
        Some(ctx.caps.loan_cap),
        icr_cap(ctx, candidate),
        gross_from_net(ctx, candidate),
    ])
    .unwrap_or(ctx.caps.loan_cap)
    .max(Decimal::ZERO);

    let below_minimum_loan = eligible > Decimal::ZERO && eligible < ctx.limits.min_loan;
    let gross = if eligible < ctx.limits.min_loan {
        Decimal::ZERO
    } else {
        eligible
    };

    let pay_rate = ctx.rates.pay_rate(deferred);
    let product_fee_amount = gross * ctx.fee_pct;
    let rolled_interest_amount = gross * pay_rate / MONTHS_PER_YEAR * months(rolled);
    let deferred_interest_amount = gross * deferred / MONTHS_PER_YEAR * months(term);
    let net_loan = gross - product_fee_amount - rolled_interest_amount - deferred_interest_amount;

    let remaining = months(term.saturating_sub(rolled).max(1));
    let icr = if ctx.monthly_income > Decimal::ZERO
        && gross > Decimal::ZERO
        && pay_rate > Decimal::ZERO
    {
        let annualised_interest =
            gross * (pay_rate / MONTHS_PER_YEAR) * remaining * MONTHS_PER_YEAR / months(term);
        Some((ctx.monthly_income * MONTHS_PER_YEAR / annualised_interest).round_dp(ICR_DP))
    } else {
        None
    };

    Scenario {
        rolled_months: rolled,
        deferred_rate: deferred,
        gross_loan: gross,
        net_loan,
        product_fee_amount,
        rolled_interest_amount,
        deferred_interest_amount,
        ltv: positive(ctx.property_value).map(|pv| gross / pv),
        icr,
        pay_rate,
        monthly_payment: gross * pay_rate / MONTHS_PER_YEAR,
        payment_start_month: rolled + 1,
        below_minimum_loan,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::btl::constraints::{derive_loan_caps, resolve_limits};
    use crate::config::EngineConfig;
    use crate::input::CalculationInput;
    use crate::product::{ProductKind, ProductRange, ProductSelector, PropertyType, RateRecord};
    use crate::rates::{compose_rates, NoFloor};
    use rust_decimal_macros::dec;

    struct Fixture {
        rates: ComposedRates,
        caps: LoanCaps,
        limits: ResolvedLimits,
        input: CalculationInput,
    }

    impl Fixture {
        fn new(rent: Money, loan_type: LoanType) -> Self {
            let config = EngineConfig::default();
            let mut record = RateRecord::new(ProductKind::Fixed, dec!(0.065));
            record.min_loan = Some(dec!(50_000));
            record.max_loan = Some(dec!(5_000_000));
            record.max_ltv = Some(dec!(0.75));
            record.min_icr = Some(dec!(1.45));
            record.term_months = Some(24);
            let selector = ProductSelector::new(ProductRange::Specialist, PropertyType::Residential);
            let mut input = CalculationInput::new(loan_type, selector);
            input.property_value = Some(dec!(500_000));
            input.monthly_rent = Some(rent);
            input.target_ltv = Some(dec!(0.75));
            let limits = resolve_limits(&record, &config);
            let caps = derive_loan_caps(&input, &record, &limits, &config);
            let rates = compose_rates(
                record.product_kind,
                record.rate,
                &config.market,
                &selector,
                &NoFloor,
            );
            Self {
                rates,
                caps,
                limits,
                input,
            }
        }

        fn ctx(&self, fee_pct: Rate) -> ScenarioContext<'_> {
            ScenarioContext {
                rates: &self.rates,
                caps: &self.caps,
                limits: &self.limits,
                loan_type: self.input.loan_type,
                specific_net_loan: self.input.specific_net_loan,
                property_value: self.input.property_value,
                monthly_income: self.input.monthly_rent.unwrap_or_default(),
                fee_pct,
            }
        }
    }

    #[test]
    fn test_ltv_cap_binds_with_strong_rent() {
        // 3_000 x 24 / 0.1885 = 381_963 clears the 375k LTV cap.
        let f = Fixture::new(dec!(3_000), LoanType::MaxLtv);
        let s = evaluate_scenario(&f.ctx(dec!(0.02)), Candidate::NONE);
        assert_eq!(s.gross_loan, dec!(375_000));
        assert_eq!(s.product_fee_amount, dec!(7_500));
        assert_eq!(s.net_loan, dec!(367_500));
        assert_eq!(s.ltv, Some(dec!(0.75)));
        assert_eq!(s.payment_start_month, 1);
        // 375k x 6.5% / 12
        assert_eq!(s.monthly_payment, dec!(2_031.25));
    }

    #[test]
    fn test_icr_cap_binds_with_weak_rent() {
        let f = Fixture::new(dec!(1_000), LoanType::MaxLtv);
        let s = evaluate_scenario(&f.ctx(dec!(0.02)), Candidate::NONE);
        // 24_000 / (1.45 x 0.065 / 12 x 24)
        assert!((s.gross_loan - dec!(127_320.9549)).abs() < dec!(0.001));
        assert_eq!(s.icr, Some(dec!(1.45)));
    }

    #[test]
    fn test_rolled_and_deferred_split() {
        let f = Fixture::new(dec!(3_000), LoanType::MaxLtv);
        let s = evaluate_scenario(&f.ctx(dec!(0.02)), Candidate::new(6, dec!(0.01)));
        assert_eq!(s.pay_rate, dec!(0.055));
        assert_eq!(s.gross_loan, dec!(375_000));
        // 375k x 5.5% / 12 x 6
        assert_eq!(s.rolled_interest_amount, dec!(10_312.5));
        // 375k x 1% / 12 x 24
        assert_eq!(s.deferred_interest_amount, dec!(7_500));
        assert_eq!(s.net_loan, dec!(349_687.5));
        assert_eq!(s.payment_start_month, 7);
    }

    #[test]
    fn test_specific_net_grosses_up() {
        let mut f = Fixture::new(dec!(2_500), LoanType::SpecificNet);
        f.input.specific_net_loan = Some(dec!(250_000));
        let s = evaluate_scenario(&f.ctx(dec!(0.02)), Candidate::NONE);
        assert!((s.net_loan - dec!(250_000)).abs() < dec!(0.0001));
        assert!(s.gross_loan > s.net_loan);
    }

    #[test]
    fn test_gross_from_net_infeasible_denominator() {
        let mut f = Fixture::new(dec!(2_500), LoanType::SpecificNet);
        f.input.specific_net_loan = Some(dec!(250_000));
        assert_eq!(gross_from_net(&f.ctx(Decimal::ONE), Candidate::NONE), None);
    }

    #[test]
    fn test_below_minimum_zeroes_gross() {
        let f = Fixture::new(dec!(300), LoanType::MaxLtv);
        let s = evaluate_scenario(&f.ctx(dec!(0.02)), Candidate::NONE);
        assert_eq!(s.gross_loan, Decimal::ZERO);
        assert_eq!(s.net_loan, Decimal::ZERO);
        assert!(s.below_minimum_loan);
        assert_eq!(s.icr, None);
    }

    #[test]
    fn test_no_rent_leaves_icr_unbounded() {
        let f = Fixture::new(Decimal::ZERO, LoanType::MaxLtv);
        assert_eq!(icr_cap(&f.ctx(dec!(0.02)), Candidate::NONE), None);
        let s = evaluate_scenario(&f.ctx(dec!(0.02)), Candidate::NONE);
        assert_eq!(s.gross_loan, dec!(375_000));
        assert_eq!(s.icr, None);
    }
}
