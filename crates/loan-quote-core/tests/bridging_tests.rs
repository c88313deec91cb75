use loan_quote_core::bridging::{calculate_bridging_quote, ltv_bucket, BridgingInput};
use loan_quote_core::broker::{BrokerInputs, BrokerRoute, ClientFee, ClientType};
use loan_quote_core::product::{ProductKind, RateRecord};
use loan_quote_core::EngineConfig;
use pretty_assertions::assert_eq;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

// ===========================================================================
// Fixtures
// ===========================================================================

fn bridge_fix() -> RateRecord {
    let mut r = RateRecord::new(ProductKind::Fixed, dec!(0.0085));
    r.product_fee = Some(dec!(0.02));
    r.admin_fee = Some(dec!(295));
    r
}

fn bridge_var() -> RateRecord {
    let mut r = RateRecord::new(ProductKind::Tracker, dec!(0.0049));
    r.product_fee = Some(dec!(0.02));
    r
}

fn fusion() -> RateRecord {
    let mut r = RateRecord::new(ProductKind::FusionTiered, dec!(0.0479));
    r.product_fee = Some(dec!(0.02));
    r.max_deferred_rate = Some(dec!(0.02));
    r.erc = vec![Some(dec!(0.03)), Some(dec!(0.02)), Some(dec!(0.01))];
    r.fusion_tier = Some("Large".into());
    r
}

fn net_input(target: Decimal) -> BridgingInput {
    BridgingInput {
        specific_net_loan: Some(target),
        property_value: Some(dec!(750_000)),
        monthly_rent: Some(dec!(3_500)),
        ..Default::default()
    }
}

// ===========================================================================
// Reverse solve
// ===========================================================================

#[test]
fn test_net_target_round_trip_for_every_product() {
    let config = EngineConfig::default();
    for record in [bridge_fix(), bridge_var(), fusion()] {
        for target in [dec!(120_000), dec!(400_000)] {
            let out = calculate_bridging_quote(&net_input(target), &record, &config).unwrap();
            let q = &out.result;
            let solve = q.net_solve.expect("net target should be solved");
            assert!(solve.converged, "{:?} at {target}", record.product_kind);
            assert!(
                (q.net_loan - target).abs() < dec!(0.01),
                "{:?}: net {} vs target {target}",
                record.product_kind,
                q.net_loan
            );
            assert!(q.gross_loan > target);
            assert!(out.warnings.is_empty());
        }
    }
}

#[test]
fn test_net_target_includes_broker_and_client_fees() {
    let mut input = net_input(dec!(300_000));
    input.broker = BrokerInputs {
        client_type: Some(ClientType::Broker),
        route: Some(BrokerRoute::MortgageClub),
        broker_fee_flat: Some(dec!(1_500)),
        client_fee: Some(ClientFee::Flat(dec!(750))),
        ..Default::default()
    };
    let plain = calculate_bridging_quote(&net_input(dec!(300_000)), &bridge_fix(), &EngineConfig::default())
        .unwrap()
        .result;
    let brokered = calculate_bridging_quote(&input, &bridge_fix(), &EngineConfig::default())
        .unwrap()
        .result;

    assert!((brokered.net_loan - dec!(300_000)).abs() < dec!(0.01));
    assert!(brokered.gross_loan > plain.gross_loan);
    assert_eq!(brokered.proc_fee_pct, dec!(0.009));
    assert_eq!(brokered.broker_fee_amount, dec!(1_500));
    assert_eq!(brokered.client_fee_amount, dec!(750));
}

#[test]
fn test_net_target_takes_precedence_over_gross() {
    let mut input = net_input(dec!(200_000));
    input.gross_loan = Some(dec!(900_000));
    let q = calculate_bridging_quote(&input, &bridge_fix(), &EngineConfig::default())
        .unwrap()
        .result;
    assert!((q.net_loan - dec!(200_000)).abs() < dec!(0.01));
    assert!(q.gross_loan < dec!(900_000));
}

// ===========================================================================
// Forward pricing
// ===========================================================================

#[test]
fn test_bridge_rolled_months_clamped_to_term() {
    let input = BridgingInput {
        gross_loan: Some(dec!(150_000)),
        term_months: Some(9),
        rolled_months: Some(18),
        ..Default::default()
    };
    let q = calculate_bridging_quote(&input, &bridge_fix(), &EngineConfig::default())
        .unwrap()
        .result;
    assert_eq!(q.term_months, 9);
    assert_eq!(q.rolled_months, 9);
    assert_eq!(q.serviced_months, 0);
    assert_eq!(q.monthly_payment, Decimal::ZERO);
    assert_eq!(q.serviced_interest_amount, Decimal::ZERO);
}

#[test]
fn test_bridge_rolled_months_below_minimum_raised() {
    let input = BridgingInput {
        gross_loan: Some(dec!(150_000)),
        rolled_months: Some(1),
        ..Default::default()
    };
    let q = calculate_bridging_quote(&input, &bridge_var(), &EngineConfig::default())
        .unwrap()
        .result;
    assert_eq!(q.rolled_months, 3);
    assert_eq!(q.deferred_rate, Decimal::ZERO);
}

#[test]
fn test_bridges_ignore_deferred_rate() {
    let input = BridgingInput {
        gross_loan: Some(dec!(150_000)),
        deferred_rate: Some(dec!(0.01)),
        ..Default::default()
    };
    let q = calculate_bridging_quote(&input, &bridge_fix(), &EngineConfig::default())
        .unwrap()
        .result;
    assert_eq!(q.deferred_rate, Decimal::ZERO);
    assert_eq!(q.deferred_interest_amount, Decimal::ZERO);
}

#[test]
fn test_fusion_fixed_term_and_erc_first_two_years() {
    let input = BridgingInput {
        gross_loan: Some(dec!(600_000)),
        property_value: Some(dec!(1_000_000)),
        term_months: Some(12),
        monthly_rent: Some(dec!(5_000)),
        ..Default::default()
    };
    let q = calculate_bridging_quote(&input, &fusion(), &EngineConfig::default())
        .unwrap()
        .result;

    assert_eq!(q.term_months, 24);
    assert_eq!(q.rolled_months, 6);
    assert_eq!(q.ltv_bucket, 60);
    assert_eq!(q.fusion_tier.as_deref(), Some("Large"));
    assert_eq!(q.full_rate_text, "4.79% + BBR");
    let years: Vec<u32> = q.erc.iter().map(|e| e.year).collect();
    assert_eq!(years, vec![1, 2]);
    assert_eq!(q.erc[0].amount, dec!(18_000));
    assert_eq!(q.erc[1].amount, dec!(12_000));
    assert!(q.icr.unwrap() > Decimal::ONE);
}

#[test]
fn test_fusion_icr_absent_without_income() {
    let input = BridgingInput {
        gross_loan: Some(dec!(600_000)),
        ..Default::default()
    };
    let q = calculate_bridging_quote(&input, &fusion(), &EngineConfig::default())
        .unwrap()
        .result;
    assert_eq!(q.icr, None);
}

#[test]
fn test_totals_are_consistent() {
    let input = BridgingInput {
        gross_loan: Some(dec!(250_000)),
        property_value: Some(dec!(340_000)),
        rolled_months: Some(6),
        ..Default::default()
    };
    let q = calculate_bridging_quote(&input, &bridge_var(), &EngineConfig::default())
        .unwrap()
        .result;

    assert_eq!(
        q.total_interest,
        q.rolled_interest_amount + q.deferred_interest_amount + q.serviced_interest_amount
    );
    assert_eq!(q.total_amount_repayable, q.gross_loan + q.total_interest);
    assert_eq!(q.ltv_bucket, 75);
    assert!(q.aprc_annual.unwrap() > Decimal::ZERO);
    assert_eq!(q.aprc_monthly, q.aprc_annual.map(|a| a / dec!(12)));
}

#[test]
fn test_ltv_bucket_boundaries() {
    assert_eq!(ltv_bucket(dec!(300_000), Some(dec!(500_000))), 60);
    assert_eq!(ltv_bucket(dec!(350_000), Some(dec!(500_000))), 70);
    assert_eq!(ltv_bucket(dec!(360_000), Some(dec!(500_000))), 75);
    assert_eq!(ltv_bucket(dec!(360_000), Some(Decimal::ZERO)), 75);
}

#[test]
fn test_rejects_input_without_amounts() {
    let input = BridgingInput {
        gross_loan: Some(Decimal::ZERO),
        specific_net_loan: Some(dec!(-5)),
        ..Default::default()
    };
    assert!(calculate_bridging_quote(&input, &fusion(), &EngineConfig::default()).is_err());
}

// ===========================================================================
// Product bounds
// ===========================================================================

fn bounded_bridge() -> RateRecord {
    let mut r = bridge_fix();
    r.min_loan = Some(dec!(75_000));
    r.max_loan = Some(dec!(5_000_000));
    r.max_ltv = Some(dec!(0.75));
    r
}

#[test]
fn test_gross_capped_at_product_maximum() {
    let input = BridgingInput {
        gross_loan: Some(dec!(10_000_000)),
        ..Default::default()
    };
    let out = calculate_bridging_quote(&input, &bounded_bridge(), &EngineConfig::default()).unwrap();
    let q = &out.result;

    assert_eq!(q.gross_loan, dec!(5_000_000));
    assert!(q.hit_maximum_loan_cap);
    assert_eq!(q.arrangement_fee_amount, dec!(100_000));
    assert!(q.net_loan <= q.gross_loan);
    assert!(out.warnings.iter().any(|w| w.contains("product maximum")));
}

#[test]
fn test_gross_capped_by_max_ltv() {
    let input = BridgingInput {
        gross_loan: Some(dec!(450_000)),
        property_value: Some(dec!(500_000)),
        ..Default::default()
    };
    let out = calculate_bridging_quote(&input, &bounded_bridge(), &EngineConfig::default()).unwrap();
    let q = &out.result;

    assert_eq!(q.gross_loan, dec!(375_000));
    assert!(q.hit_ltv_cap);
    assert!(!q.hit_maximum_loan_cap);
    assert_eq!(q.gross_ltv, Some(dec!(0.75)));
}

#[test]
fn test_solved_gross_respects_maximum_loan() {
    let mut record = bounded_bridge();
    record.max_loan = Some(dec!(200_000));
    let out = calculate_bridging_quote(&net_input(dec!(250_000)), &record, &EngineConfig::default())
        .unwrap();
    let q = &out.result;

    assert_eq!(q.gross_loan, dec!(200_000));
    assert!(q.hit_maximum_loan_cap);
    assert!(q.net_loan < dec!(250_000));
    assert!(out.warnings.iter().any(|w| w.contains("not reachable")));
}

#[test]
fn test_below_minimum_offers_no_loan_or_fees() {
    let input = BridgingInput {
        gross_loan: Some(dec!(50_000)),
        broker: BrokerInputs {
            broker_fee_flat: Some(dec!(995)),
            client_fee: Some(ClientFee::Flat(dec!(500))),
            ..Default::default()
        },
        ..Default::default()
    };
    let out = calculate_bridging_quote(&input, &bounded_bridge(), &EngineConfig::default()).unwrap();
    let q = &out.result;

    assert!(q.below_minimum_loan);
    assert_eq!(q.gross_loan, Decimal::ZERO);
    assert_eq!(q.net_loan, Decimal::ZERO);
    assert_eq!(q.broker_fee_amount, Decimal::ZERO);
    assert_eq!(q.client_fee_amount, Decimal::ZERO);
    assert_eq!(q.admin_fee, Decimal::ZERO);
    assert_eq!(q.aprc_annual, None);
    assert!(out.warnings.iter().any(|w| w.contains("below the product minimum")));
}
