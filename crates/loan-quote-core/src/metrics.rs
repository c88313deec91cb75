//! Derived Metrics Calculator.
//!
//! Presentation-level figures computed once on the chosen scenario: APRC,
//! ERC schedule, revert rate, NBP, serviced interest, title insurance and
//! total cost to borrower.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::broker::BrokerFees;
use crate::config::{MarketRates, TitleInsuranceRule};
use crate::numeric::{format_rate_pct, format_rate_pct_compact, months, MONTHS_PER_YEAR};
use crate::product::{RateRecord, RevertIndex};
use crate::types::{Money, Months, Rate};

/// ERC years read from a rate record.
pub const MAX_ERC_YEARS: usize = 5;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErcEntry {
    pub year: u32,
    pub rate: Rate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RevertRate {
    /// Index value plus margin.
    pub rate: Rate,
    /// e.g. "MVR+0.40%" or "5.25%+0.40%".
    pub text: String,
}

/// Every cost line that makes up the total cost to borrower.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CostComponents {
    pub product_fee: Money,
    pub rolled_interest: Money,
    pub deferred_interest: Money,
    pub serviced_interest: Money,
    pub admin_fee: Money,
    pub exit_fee: Money,
    pub proc_fee: Money,
    pub broker_fee: Money,
    pub client_fee: Money,
    pub title_insurance: Money,
}

/// Chosen-scenario figures the metrics are derived from.
#[derive(Debug, Clone, Copy)]
pub struct MetricsInput<'a> {
    pub gross_loan: Money,
    pub net_loan: Money,
    pub product_fee_amount: Money,
    pub rolled_interest_amount: Money,
    pub deferred_interest_amount: Money,
    pub monthly_payment: Money,
    pub rolled_months: Months,
    pub term_months: Months,
    pub record: &'a RateRecord,
    pub broker_fees: &'a BrokerFees,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DerivedMetrics {
    /// Annualised cost of credit as a decimal (0.0712 = 7.12%).
    pub aprc: Option<Rate>,
    pub erc_schedule: Vec<ErcEntry>,
    pub erc_text: Option<String>,
    pub revert_rate: Option<Rate>,
    pub revert_rate_text: Option<String>,
    /// Monthly payment at the revert rate.
    pub revert_payment: Option<Money>,
    pub admin_fee: Money,
    pub exit_fee: Money,
    pub nbp: Money,
    pub serviced_interest: Money,
    pub total_interest: Money,
    /// `None` when the gross loan is outside the insurable range.
    pub title_insurance: Option<Money>,
    pub total_cost_to_borrower: Money,
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Linear APRC approximation: ((gross + interest) / net - 1) x 12 / term.
pub fn aprc(gross: Money, net: Money, total_interest: Money, term: Months) -> Option<Rate> {
    if net <= Decimal::ZERO || term == 0 {
        return None;
    }
    Some(((gross + total_interest) / net - Decimal::ONE) * MONTHS_PER_YEAR / months(term))
}

/// Year-indexed ERC entries for the populated columns among the first five.
pub fn erc_schedule(erc: &[Option<Rate>]) -> Vec<ErcEntry> {
    erc.iter()
        .take(MAX_ERC_YEARS)
        .zip(1u32..)
        .filter_map(|(rate, year)| rate.map(|rate| ErcEntry { year, rate }))
        .collect()
}

/// "Yr1: 3% | Yr2: 2.50%"; `None` for an empty schedule.
pub fn erc_text(schedule: &[ErcEntry]) -> Option<String> {
    if schedule.is_empty() {
        return None;
    }
    Some(
        schedule
            .iter()
            .map(|e| format!("Yr{}: {}", e.year, format_rate_pct_compact(e.rate)))
            .collect::<Vec<_>>()
            .join(" | "),
    )
}

/// Resolve the revert index against market rates and add the margin.
pub fn revert_rate(
    index: Option<&RevertIndex>,
    margin: Option<Rate>,
    market: &MarketRates,
) -> Option<RevertRate> {
    let index = index?;
    let base = match index {
        RevertIndex::Bbr => market.standard_bbr,
        RevertIndex::Mvr => market.current_mvr,
        RevertIndex::Fixed(rate) => *rate,
    };
    let margin = margin.unwrap_or(Decimal::ZERO);
    let margin_text = if margin > Decimal::ZERO {
        format!("+{}", format_rate_pct(margin))
    } else if margin < Decimal::ZERO {
        format_rate_pct(margin)
    } else {
        String::new()
    };
    let text = match index.label() {
        Some(label) => format!("{label}{margin_text}"),
        None => format!("{}{margin_text}", format_rate_pct(base)),
    };
    Some(RevertRate {
        rate: base + margin,
        text,
    })
}

pub fn revert_payment(gross: Money, revert_rate: Rate) -> Money {
    gross * revert_rate / MONTHS_PER_YEAR
}

/// Net borrowing proceeds.
pub fn nbp(net: Money, admin_fee: Money, exit_fee: Money) -> Money {
    net - admin_fee - exit_fee
}

/// Interest paid monthly over the non-rolled part of the term.
pub fn serviced_interest(monthly_payment: Money, term: Months, rolled: Months) -> Money {
    monthly_payment * months(term.saturating_sub(rolled))
}

/// max(minimum, gross x rate x (1 + IPT)) for 0 < gross <= ceiling.
pub fn title_insurance(gross: Money, rule: &TitleInsuranceRule) -> Option<Money> {
    if gross <= Decimal::ZERO || gross > rule.max_gross_loan {
        return None;
    }
    let premium = gross * rule.rate * (Decimal::ONE + rule.insurance_premium_tax);
    Some(premium.max(rule.minimum_premium))
}

pub fn total_cost_to_borrower(c: &CostComponents) -> Money {
    c.product_fee
        + c.rolled_interest
        + c.deferred_interest
        + c.serviced_interest
        + c.admin_fee
        + c.exit_fee
        + c.proc_fee
        + c.broker_fee
        + c.client_fee
        + c.title_insurance
}

/// Compute every derived metric for the chosen scenario.
pub fn derive_metrics(
    input: &MetricsInput<'_>,
    market: &MarketRates,
    title_rule: &TitleInsuranceRule,
) -> DerivedMetrics {
    let record = input.record;
    let has_loan = input.gross_loan > Decimal::ZERO;
    let admin_fee = record.admin_fee.filter(|_| has_loan).unwrap_or(Decimal::ZERO);
    let exit_fee = record.exit_fee.filter(|_| has_loan).unwrap_or(Decimal::ZERO);

    let serviced = serviced_interest(input.monthly_payment, input.term_months, input.rolled_months);
    let total_interest = input.rolled_interest_amount + input.deferred_interest_amount + serviced;

    let schedule = erc_schedule(&record.erc);
    let erc_text = erc_text(&schedule);

    let revert = revert_rate(record.revert_index.as_ref(), record.revert_margin, market);
    let revert_payment = revert
        .as_ref()
        .map(|r| revert_payment(input.gross_loan, r.rate));

    let title = title_insurance(input.gross_loan, title_rule);

    let total_cost = total_cost_to_borrower(&CostComponents {
        product_fee: input.product_fee_amount,
        rolled_interest: input.rolled_interest_amount,
        deferred_interest: input.deferred_interest_amount,
        serviced_interest: serviced,
        admin_fee,
        exit_fee,
        proc_fee: input.broker_fees.proc_fee_amount,
        broker_fee: input.broker_fees.broker_fee_amount,
        client_fee: input.broker_fees.client_fee_amount,
        title_insurance: title.unwrap_or(Decimal::ZERO),
    });

    DerivedMetrics {
        aprc: aprc(input.gross_loan, input.net_loan, total_interest, input.term_months),
        erc_schedule: schedule,
        erc_text,
        revert_rate: revert.as_ref().map(|r| r.rate),
        revert_rate_text: revert.map(|r| r.text),
        revert_payment,
        admin_fee,
        exit_fee,
        nbp: nbp(input.net_loan, admin_fee, exit_fee),
        serviced_interest: serviced,
        total_interest,
        title_insurance: title,
        total_cost_to_borrower: total_cost,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::ProductKind;
    use pretty_assertions::assert_eq;
    use rust_decimal_macros::dec;

    #[test]
    fn test_aprc_linear_approximation() {
        // (300k + 36k) / 290k - 1 = 0.158620..., annualised over 24 months
        let a = aprc(dec!(300_000), dec!(290_000), dec!(36_000), 24).unwrap();
        assert!((a - dec!(0.0793103448)).abs() < dec!(0.0000001));
        assert_eq!(aprc(dec!(300_000), Decimal::ZERO, dec!(1), 24), None);
        assert_eq!(aprc(dec!(300_000), dec!(1), dec!(1), 0), None);
    }

    #[test]
    fn test_erc_schedule_skips_blank_years_and_caps_at_five() {
        let erc = vec![
            Some(dec!(0.03)),
            Some(dec!(0.025)),
            None,
            Some(dec!(0.01)),
            None,
            Some(dec!(0.5)),
        ];
        let schedule = erc_schedule(&erc);
        assert_eq!(schedule.len(), 3);
        assert_eq!(schedule[2].year, 4);
        assert_eq!(
            erc_text(&schedule).unwrap(),
            "Yr1: 3% | Yr2: 2.50% | Yr4: 1%"
        );
        assert_eq!(erc_text(&[]), None);
    }

    #[test]
    fn test_revert_rate_index_labels() {
        let market = MarketRates::default();
        let mvr = revert_rate(Some(&RevertIndex::Mvr), Some(dec!(0.004)), &market).unwrap();
        assert_eq!(mvr.rate, dec!(0.0899));
        assert_eq!(mvr.text, "MVR+0.40%");

        let bbr = revert_rate(Some(&RevertIndex::Bbr), None, &market).unwrap();
        assert_eq!(bbr.rate, dec!(0.04));
        assert_eq!(bbr.text, "BBR");

        let fixed = revert_rate(
            Some(&RevertIndex::Fixed(dec!(0.0525))),
            Some(dec!(-0.0025)),
            &market,
        )
        .unwrap();
        assert_eq!(fixed.rate, dec!(0.05));
        assert_eq!(fixed.text, "5.25%-0.25%");

        assert_eq!(revert_rate(None, Some(dec!(0.01)), &market), None);
    }

    #[test]
    fn test_title_insurance_bounds() {
        let rule = TitleInsuranceRule::default();
        assert_eq!(title_insurance(Decimal::ZERO, &rule), None);
        assert_eq!(title_insurance(dec!(100_000), &rule), Some(dec!(392)));
        // 300k x 0.13% x 1.12 = 436.80
        assert_eq!(title_insurance(dec!(300_000), &rule), Some(dec!(436.8)));
        assert_eq!(title_insurance(dec!(3_000_000), &rule), Some(dec!(4368)));
        assert_eq!(title_insurance(dec!(3_000_001), &rule), None);
    }

    #[test]
    fn test_nbp_and_serviced_interest() {
        assert_eq!(nbp(dec!(290_000), dec!(199), dec!(0)), dec!(289_801));
        assert_eq!(serviced_interest(dec!(1_500), 24, 6), dec!(27_000));
        assert_eq!(serviced_interest(dec!(1_500), 12, 18), Decimal::ZERO);
    }

    #[test]
    fn test_derive_metrics_totals() {
        let mut record = RateRecord::new(ProductKind::Fixed, dec!(0.065));
        record.admin_fee = Some(dec!(199));
        record.erc = vec![Some(dec!(0.03)), Some(dec!(0.02))];
        record.revert_index = Some(RevertIndex::Mvr);
        let fees = BrokerFees {
            proc_fee_pct: dec!(0.01),
            proc_fee_amount: dec!(3_000),
            broker_fee_amount: dec!(500),
            client_fee_amount: Decimal::ZERO,
        };
        let input = MetricsInput {
            gross_loan: dec!(300_000),
            net_loan: dec!(294_000),
            product_fee_amount: dec!(6_000),
            rolled_interest_amount: Decimal::ZERO,
            deferred_interest_amount: Decimal::ZERO,
            monthly_payment: dec!(1_625),
            rolled_months: 0,
            term_months: 24,
            record: &record,
            broker_fees: &fees,
        };
        let m = derive_metrics(&input, &MarketRates::default(), &TitleInsuranceRule::default());

        assert_eq!(m.serviced_interest, dec!(39_000));
        assert_eq!(m.total_interest, dec!(39_000));
        assert_eq!(m.nbp, dec!(293_801));
        assert_eq!(m.title_insurance, Some(dec!(436.8)));
        assert_eq!(m.erc_text.as_deref(), Some("Yr1: 3% | Yr2: 2%"));
        assert_eq!(m.revert_rate, Some(dec!(0.0859)));
        assert_eq!(m.revert_payment, Some(dec!(2_147.5)));
        // 6000 + 39000 + 199 + 3000 + 500 + 436.8
        assert_eq!(m.total_cost_to_borrower, dec!(49_135.8));
    }

    #[test]
    fn test_zero_loan_carries_no_costs() {
        let mut record = RateRecord::new(ProductKind::Fixed, dec!(0.065));
        record.admin_fee = Some(dec!(500));
        record.exit_fee = Some(dec!(250));
        let fees = BrokerFees {
            proc_fee_pct: dec!(0.009),
            proc_fee_amount: Decimal::ZERO,
            broker_fee_amount: Decimal::ZERO,
            client_fee_amount: Decimal::ZERO,
        };
        let input = MetricsInput {
            gross_loan: Decimal::ZERO,
            net_loan: Decimal::ZERO,
            product_fee_amount: Decimal::ZERO,
            rolled_interest_amount: Decimal::ZERO,
            deferred_interest_amount: Decimal::ZERO,
            monthly_payment: Decimal::ZERO,
            rolled_months: 0,
            term_months: 24,
            record: &record,
            broker_fees: &fees,
        };
        let m = derive_metrics(&input, &MarketRates::default(), &TitleInsuranceRule::default());

        assert_eq!(m.admin_fee, Decimal::ZERO);
        assert_eq!(m.exit_fee, Decimal::ZERO);
        assert_eq!(m.nbp, Decimal::ZERO);
        assert_eq!(m.title_insurance, None);
        assert_eq!(m.total_cost_to_borrower, Decimal::ZERO);
        assert_eq!(m.aprc, None);
    }
}
