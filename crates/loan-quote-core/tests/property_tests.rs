use loan_quote_core::bridging::{calculate_bridging_quote, BridgingInput};
use loan_quote_core::btl::evaluate;
use loan_quote_core::product::{
    LoanType, ProductKind, ProductRange, ProductSelector, PropertyType, RateRecord,
};
use loan_quote_core::{CalculationInput, EngineConfig};
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn record(rate_bps: u32) -> RateRecord {
    let mut r = RateRecord::new(ProductKind::Fixed, Decimal::new(rate_bps as i64, 4));
    r.min_loan = Some(dec!(50_000));
    r.max_loan = Some(dec!(1_000_000));
    r.max_ltv = Some(dec!(0.75));
    r.min_icr = Some(dec!(1.45));
    r.term_months = Some(24);
    r.max_rolled_months = Some(12);
    r.max_deferred_rate = Some(dec!(0.015));
    r
}

fn input(pv: u32, rent: u32, fee_bps: u32) -> CalculationInput {
    let mut i = CalculationInput::new(
        LoanType::MaxLtv,
        ProductSelector::new(ProductRange::Specialist, PropertyType::Residential),
    );
    i.property_value = Some(Decimal::from(pv));
    i.monthly_rent = Some(Decimal::from(rent));
    i.product_fee_pct = Some(Decimal::new(fee_bps as i64, 4));
    i
}

fn property_value() -> impl Strategy<Value = u32> {
    80_000u32..3_000_000
}

fn rent() -> impl Strategy<Value = u32> {
    200u32..15_000
}

fn coupon_bps() -> impl Strategy<Value = u32> {
    350u32..900
}

fn fee_bps() -> impl Strategy<Value = u32> {
    0u32..600
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn test_quote_respects_caps(
        pv in property_value(),
        rent in rent(),
        rate in coupon_bps(),
        fee in fee_bps()
    ) {
        let record = record(rate);
        let q = evaluate(&input(pv, rent, fee), &record, &EngineConfig::default())
            .unwrap()
            .result;

        prop_assert!(q.net_loan <= q.gross_loan);
        prop_assert!(q.gross_loan <= dec!(1_000_000));
        prop_assert!(q.gross_loan <= Decimal::from(pv) * dec!(0.75) + dec!(0.000001));
        prop_assert!(q.gross_loan.is_zero() || q.gross_loan >= dec!(50_000));
        if let Some(icr) = q.icr {
            prop_assert!(icr >= dec!(1.45) - dec!(0.000001), "icr {}", icr);
        }
        prop_assert!(q.rolled_months <= 12);
        prop_assert!(q.deferred_rate <= dec!(0.015));
    }

    #[test]
    fn test_more_property_value_never_lowers_net(
        pv in property_value(),
        extra in 0u32..500_000,
        rent in rent(),
        rate in coupon_bps()
    ) {
        let record = record(rate);
        let config = EngineConfig::default();
        let low = evaluate(&input(pv, rent, 200), &record, &config).unwrap().result;
        let high = evaluate(&input(pv + extra, rent, 200), &record, &config).unwrap().result;
        prop_assert!(
            high.net_loan >= low.net_loan - dec!(0.000001),
            "pv {} -> {}: net {} -> {}",
            pv,
            pv + extra,
            low.net_loan,
            high.net_loan
        );
    }

    #[test]
    fn test_evaluation_is_deterministic(
        pv in property_value(),
        rent in rent(),
        rate in coupon_bps(),
        fee in fee_bps()
    ) {
        let record = record(rate);
        let config = EngineConfig::default();
        let i = input(pv, rent, fee);
        let first = evaluate(&i, &record, &config).unwrap().result;
        let second = evaluate(&i, &record, &config).unwrap().result;
        prop_assert_eq!(first, second);
    }

    #[test]
    fn test_bridging_net_target_round_trip(
        target in 50_000u32..2_000_000,
        coupon in 45u32..120,
        rolled in 0u32..12
    ) {
        let mut record = RateRecord::new(ProductKind::Fixed, Decimal::new(coupon as i64, 4));
        record.product_fee = Some(dec!(0.02));
        let input = BridgingInput {
            specific_net_loan: Some(Decimal::from(target)),
            rolled_months: Some(rolled),
            ..Default::default()
        };
        let q = calculate_bridging_quote(&input, &record, &EngineConfig::default())
            .unwrap()
            .result;
        prop_assert!((q.net_loan - Decimal::from(target)).abs() < dec!(0.01));
        prop_assert!(q.gross_loan > q.net_loan);
    }
}
