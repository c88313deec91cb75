//! Rate Composer: nominal coupon or margin -> display and stress rates.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::MarketRates;
use crate::numeric::format_rate_pct;
use crate::product::{ProductKind, ProductSelector};
use crate::rates::floor::FloorPolicy;
use crate::types::Rate;

/// Rates derived for one product column, all as annual decimals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComposedRates {
    pub kind: ProductKind,
    /// Rate used for quoted payment figures.
    pub display_rate: Rate,
    /// Rate used for affordability (ICR) testing.
    pub stress_rate: Rate,
    /// Margin over the reference rate; `None` for fixed coupons.
    pub margin: Option<Rate>,
    /// Reference rate included in `display_rate` (zero for fixed coupons).
    pub reference_rate: Rate,
    /// Floor that lifted either rate, if one did.
    pub floor_applied: Option<Rate>,
}

impl ComposedRates {
    /// Payment rate once `deferred_rate` is taken out of the display rate.
    pub fn pay_rate(&self, deferred_rate: Rate) -> Rate {
        (self.display_rate - deferred_rate).max(Decimal::ZERO)
    }

    /// "6.50%" for fixed coupons, "2.50% + BBR" for margin products.
    pub fn full_rate_text(&self) -> String {
        match (self.margin, self.floor_applied) {
            (Some(margin), None) => format!("{} + BBR", format_rate_pct(margin)),
            _ => format_rate_pct(self.display_rate),
        }
    }

    /// Pay rate text after deferral, in the same style as [`Self::full_rate_text`].
    pub fn pay_rate_text(&self, deferred_rate: Rate) -> String {
        match (self.margin, self.floor_applied) {
            (Some(margin), None) => format!(
                "{} + BBR",
                format_rate_pct((margin - deferred_rate).max(Decimal::ZERO))
            ),
            _ => format_rate_pct(self.pay_rate(deferred_rate)),
        }
    }
}

/// Compose display and stress rates for a product.
///
/// Fixed coupons use the nominal rate for both. Tracker and Fusion margins
/// are added to the standard base rate for display and to the stress base
/// rate for stress testing. The floor policy is applied last, to both rates.
pub fn compose_rates(
    kind: ProductKind,
    nominal: Rate,
    market: &MarketRates,
    selector: &ProductSelector,
    floor_policy: &dyn FloorPolicy,
) -> ComposedRates {
    let (display_base, stress_base, margin, reference_rate) = match kind {
        ProductKind::Fixed => (nominal, nominal, None, Decimal::ZERO),
        ProductKind::Tracker | ProductKind::FusionTiered => (
            nominal + market.standard_bbr,
            nominal + market.stress_bbr,
            Some(nominal),
            market.standard_bbr,
        ),
    };

    let floor = floor_policy.floor_for(selector, kind);
    let (display_rate, stress_rate) = match floor {
        Some(f) => (display_base.max(f), stress_base.max(f)),
        None => (display_base, stress_base),
    };
    let floor_applied = floor.filter(|f| *f > display_base || *f > stress_base);

    ComposedRates {
        kind,
        display_rate,
        stress_rate,
        margin,
        reference_rate,
        floor_applied,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::{ProductRange, PropertyType};
    use crate::rates::floor::{FloorTable, NoFloor};
    use rust_decimal_macros::dec;

    fn specialist() -> ProductSelector {
        ProductSelector::new(ProductRange::Specialist, PropertyType::Residential)
    }

    fn core() -> ProductSelector {
        ProductSelector::new(ProductRange::Core, PropertyType::Residential)
    }

    #[test]
    fn test_fixed_display_equals_stress() {
        let rates = compose_rates(
            ProductKind::Fixed,
            dec!(0.065),
            &MarketRates::default(),
            &specialist(),
            &NoFloor,
        );
        assert_eq!(rates.display_rate, dec!(0.065));
        assert_eq!(rates.stress_rate, dec!(0.065));
        assert_eq!(rates.margin, None);
        assert_eq!(rates.full_rate_text(), "6.50%");
    }

    #[test]
    fn test_tracker_adds_standard_and_stress_bbr() {
        let rates = compose_rates(
            ProductKind::Tracker,
            dec!(0.025),
            &MarketRates::default(),
            &specialist(),
            &NoFloor,
        );
        assert_eq!(rates.display_rate, dec!(0.065));
        assert_eq!(rates.stress_rate, dec!(0.0675));
        assert_eq!(rates.margin, Some(dec!(0.025)));
        assert_eq!(rates.full_rate_text(), "2.50% + BBR");
        assert_eq!(rates.pay_rate_text(dec!(0.005)), "2.00% + BBR");
    }

    #[test]
    fn test_fusion_keeps_margin_separately() {
        let rates = compose_rates(
            ProductKind::FusionTiered,
            dec!(0.0479),
            &MarketRates::default(),
            &specialist(),
            &NoFloor,
        );
        assert_eq!(rates.display_rate, dec!(0.0879));
        assert_eq!(rates.margin, Some(dec!(0.0479)));
        assert_eq!(rates.reference_rate, dec!(0.04));
    }

    #[test]
    fn test_floor_applies_after_composition() {
        let table = FloorTable::default();
        let low_fix = compose_rates(
            ProductKind::Fixed,
            dec!(0.035),
            &MarketRates::default(),
            &core(),
            &table,
        );
        assert_eq!(low_fix.display_rate, dec!(0.05));
        assert_eq!(low_fix.stress_rate, dec!(0.05));
        assert_eq!(low_fix.floor_applied, Some(dec!(0.05)));

        // 0.5% margin + 4% BBR composes to 4.5% and is floored; the 4.75%
        // stress rate is floored too.
        let tracker = compose_rates(
            ProductKind::Tracker,
            dec!(0.005),
            &MarketRates::default(),
            &core(),
            &table,
        );
        assert_eq!(tracker.display_rate, dec!(0.05));
        assert_eq!(tracker.stress_rate, dec!(0.05));
        assert_eq!(tracker.full_rate_text(), "5.00%");

        // A composed rate already above the floor is untouched.
        let above = compose_rates(
            ProductKind::Tracker,
            dec!(0.02),
            &MarketRates::default(),
            &core(),
            &table,
        );
        assert_eq!(above.display_rate, dec!(0.06));
        assert_eq!(above.floor_applied, None);
    }

    #[test]
    fn test_specialist_not_floored_by_default_table() {
        let rates = compose_rates(
            ProductKind::Fixed,
            dec!(0.035),
            &MarketRates::default(),
            &specialist(),
            &FloorTable::default(),
        );
        assert_eq!(rates.display_rate, dec!(0.035));
        assert_eq!(rates.floor_applied, None);
    }

    #[test]
    fn test_pay_rate_never_negative() {
        let rates = compose_rates(
            ProductKind::Fixed,
            dec!(0.01),
            &MarketRates::default(),
            &specialist(),
            &NoFloor,
        );
        assert_eq!(rates.pay_rate(dec!(0.015)), Decimal::ZERO);
    }
}
