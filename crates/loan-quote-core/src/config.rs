//! Engine configuration.
//!
//! Every administrator-editable rule (market rates, floor rates, retention
//! tables, fee-column sets, broker tolerances) is carried in [`EngineConfig`]
//! and passed by reference into each call. Defaults reproduce the values the
//! platform ships with.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::broker::BrokerRoute;
use crate::product::{ProductKind, ProductRange, ProductSelector, PropertyType, RetentionLtv};
use crate::rates::floor::FloorTable;
use crate::types::{Money, Months, Multiple, Rate};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub market: MarketRates,
    pub limits: LimitDefaults,
    pub floor_policy: FloorTable,
    /// Product selectors that never roll or defer interest.
    pub fixed_rule_products: FixedRuleProducts,
    pub retention_ltv: RetentionLtvTable,
    pub flat_above_commercial: Option<FlatAboveCommercialRule>,
    pub fee_columns: FeeColumnTable,
    pub broker: BrokerCommissionConfig,
    pub search: SearchSettings,
    pub title_insurance: TitleInsuranceRule,
    pub bridging: BridgingSettings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            market: MarketRates::default(),
            limits: LimitDefaults::default(),
            floor_policy: FloorTable::default(),
            fixed_rule_products: FixedRuleProducts::default(),
            retention_ltv: RetentionLtvTable::default(),
            flat_above_commercial: Some(FlatAboveCommercialRule::default()),
            fee_columns: FeeColumnTable::default(),
            broker: BrokerCommissionConfig::default(),
            search: SearchSettings::default(),
            title_insurance: TitleInsuranceRule::default(),
            bridging: BridgingSettings::default(),
        }
    }
}

impl EngineConfig {
    pub fn is_fixed_rule(&self, selector: &ProductSelector) -> bool {
        self.fixed_rule_products.0.contains(selector)
    }
}

/// Reference rates used for display and stress testing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketRates {
    pub standard_bbr: Rate,
    pub stress_bbr: Rate,
    pub current_mvr: Rate,
}

impl Default for MarketRates {
    fn default() -> Self {
        Self {
            standard_bbr: dec!(0.04),
            stress_bbr: dec!(0.0425),
            current_mvr: dec!(0.0859),
        }
    }
}

/// Fallbacks for bounds a rate record leaves empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitDefaults {
    pub min_loan: Money,
    pub max_loan: Money,
    pub term_months: Months,
    pub max_rolled_months: Months,
    pub max_deferred_rate: Rate,
    pub min_icr_fixed: Multiple,
    pub min_icr_tracker: Multiple,
}

impl Default for LimitDefaults {
    fn default() -> Self {
        Self {
            min_loan: dec!(50_000),
            max_loan: dec!(25_000_000),
            term_months: 24,
            max_rolled_months: 24,
            max_deferred_rate: dec!(0.015),
            min_icr_fixed: dec!(1.45),
            min_icr_tracker: dec!(1.25),
        }
    }
}

impl LimitDefaults {
    pub fn min_icr_for(&self, kind: ProductKind) -> Multiple {
        match kind {
            ProductKind::Fixed => self.min_icr_fixed,
            ProductKind::Tracker | ProductKind::FusionTiered => self.min_icr_tracker,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FixedRuleProducts(pub Vec<ProductSelector>);

impl Default for FixedRuleProducts {
    fn default() -> Self {
        Self(vec![ProductSelector::new(
            ProductRange::Core,
            PropertyType::Residential,
        )])
    }
}

/// Maximum LTV per retention tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetentionLtvTable {
    pub ltv_65: Rate,
    pub ltv_75: Rate,
}

impl Default for RetentionLtvTable {
    fn default() -> Self {
        Self {
            ltv_65: dec!(0.65),
            ltv_75: dec!(0.75),
        }
    }
}

impl RetentionLtvTable {
    pub fn cap_for(&self, tier: RetentionLtv) -> Rate {
        match tier {
            RetentionLtv::Ltv65 => self.ltv_65,
            RetentionLtv::Ltv75 => self.ltv_75,
        }
    }
}

/// Tier-driven LTV ceiling for flats above commercial premises.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlatAboveCommercialRule {
    pub tier_ltv: BTreeMap<u32, Rate>,
}

impl Default for FlatAboveCommercialRule {
    fn default() -> Self {
        Self {
            tier_ltv: BTreeMap::from([(2, dec!(0.65)), (3, dec!(0.75))]),
        }
    }
}

/// Product-fee column sets shown side by side for one product.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeeColumnTable {
    pub residential: Vec<Rate>,
    pub commercial: Vec<Rate>,
    pub semi_commercial: Vec<Rate>,
    pub retention_residential: Vec<Rate>,
    pub retention_commercial: Vec<Rate>,
    pub retention_semi_commercial: Vec<Rate>,
    pub core: Vec<Rate>,
    pub core_retention_65: Vec<Rate>,
    pub core_retention_75: Vec<Rate>,
}

impl Default for FeeColumnTable {
    fn default() -> Self {
        let standard = vec![dec!(0.06), dec!(0.04), dec!(0.03), dec!(0.02)];
        let standard_short = vec![dec!(0.06), dec!(0.04), dec!(0.02)];
        let retention = vec![dec!(0.055), dec!(0.035), dec!(0.025), dec!(0.015)];
        let retention_short = vec![dec!(0.055), dec!(0.035), dec!(0.015)];
        Self {
            residential: standard.clone(),
            commercial: standard_short.clone(),
            semi_commercial: standard_short,
            retention_residential: retention.clone(),
            retention_commercial: retention_short.clone(),
            retention_semi_commercial: retention_short,
            core: standard,
            core_retention_65: retention.clone(),
            core_retention_75: retention,
        }
    }
}

impl FeeColumnTable {
    /// Column set for a product selector and retention choice.
    pub fn columns_for(
        &self,
        selector: &ProductSelector,
        retention: Option<RetentionLtv>,
    ) -> &[Rate] {
        match (selector.range, retention, selector.property_type) {
            (ProductRange::Core, Some(RetentionLtv::Ltv65), _) => &self.core_retention_65,
            (ProductRange::Core, Some(RetentionLtv::Ltv75), _) => &self.core_retention_75,
            (ProductRange::Core, None, _) => &self.core,
            (_, Some(_), PropertyType::Residential) => &self.retention_residential,
            (_, Some(_), PropertyType::Commercial) => &self.retention_commercial,
            (_, Some(_), PropertyType::SemiCommercial) => &self.retention_semi_commercial,
            (_, None, PropertyType::Residential) => &self.residential,
            (_, None, PropertyType::Commercial) => &self.commercial,
            (_, None, PropertyType::SemiCommercial) => &self.semi_commercial,
        }
    }
}

/// Default commission per broker route and the allowed deviation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerCommissionConfig {
    pub defaults: BTreeMap<BrokerRoute, Rate>,
    pub tolerance: Rate,
    /// Used for routes missing from `defaults`.
    pub fallback: Rate,
}

impl Default for BrokerCommissionConfig {
    fn default() -> Self {
        Self {
            defaults: BTreeMap::from([
                (BrokerRoute::DirectBroker, dec!(0.009)),
                (BrokerRoute::MortgageClub, dec!(0.009)),
                (BrokerRoute::Network, dec!(0.009)),
                (BrokerRoute::Packager, dec!(0.009)),
            ]),
            tolerance: dec!(0.002),
            fallback: dec!(0.009),
        }
    }
}

impl BrokerCommissionConfig {
    pub fn default_for(&self, route: BrokerRoute) -> Rate {
        self.defaults.get(&route).copied().unwrap_or(self.fallback)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchMethod {
    /// Exhaustive scan of every (rolled, deferred) pair.
    #[default]
    Grid,
    /// Ternary search over deferred-rate steps for each rolled month.
    GoldenSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchSettings {
    pub method: SearchMethod,
    /// Deferred-rate increment between candidates (0.0001 = 0.01%).
    pub deferred_step: Rate,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            method: SearchMethod::Grid,
            deferred_step: dec!(0.0001),
        }
    }
}

/// Title insurance premium: max(minimum, gross x rate x (1 + IPT)) up to a ceiling.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TitleInsuranceRule {
    pub minimum_premium: Money,
    pub rate: Rate,
    pub insurance_premium_tax: Rate,
    pub max_gross_loan: Money,
}

impl Default for TitleInsuranceRule {
    fn default() -> Self {
        Self {
            minimum_premium: dec!(392),
            rate: dec!(0.0013),
            insurance_premium_tax: dec!(0.12),
            max_gross_loan: dec!(3_000_000),
        }
    }
}

/// Bridge and Fusion product conventions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgingSettings {
    pub fusion_term_months: Months,
    pub default_bridge_term_months: Months,
    pub default_arrangement_fee: Rate,
    pub commitment_fee: Rate,
    pub exit_fee: Rate,
    pub fusion_min_rolled_months: Months,
    pub fusion_max_rolled_months: Months,
    pub bridge_min_rolled_months: Months,
    pub bridge_max_rolled_months: Months,
    /// Months of income and interest compared by the Fusion ICR test.
    pub fusion_icr_months: Months,
}

impl Default for BridgingSettings {
    fn default() -> Self {
        Self {
            fusion_term_months: 24,
            default_bridge_term_months: 12,
            default_arrangement_fee: dec!(0.02),
            commitment_fee: dec!(0.01),
            exit_fee: dec!(0.01),
            fusion_min_rolled_months: 6,
            fusion_max_rolled_months: 12,
            bridge_min_rolled_months: 3,
            bridge_max_rolled_months: 18,
            fusion_icr_months: 24,
        }
    }
}

impl BridgingSettings {
    pub fn icr_years(&self) -> Decimal {
        Decimal::from(self.fusion_icr_months) / dec!(12)
    }
}
