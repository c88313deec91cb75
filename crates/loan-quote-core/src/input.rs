//! Borrower-side inputs for one quote call.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::broker::BrokerInputs;
use crate::product::{LoanType, ProductRange, ProductSelector, PropertyType, RetentionLtv};
use crate::types::{Money, Months, Rate};

/// Typed borrower inputs for a single (rate record, fee column) evaluation.
///
/// Amounts that do not apply to the chosen `loan_type` are ignored. Absent
/// or zero amounts read as "not supplied".
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationInput {
    pub loan_type: LoanType,
    pub product: ProductSelector,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_value: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monthly_rent: Option<Money>,
    /// Additional monthly income counted towards the ICR test.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_slicing: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specific_net_loan: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specific_gross_loan: Option<Money>,
    /// Requested LTV as a fraction, read for `MaxLtv` and `SpecificLtv`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_ltv: Option<Rate>,
    /// Free-text product type, e.g. "2yr Fix".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_type: Option<String>,
    /// Criteria tier (1-3); read by the flat-above-commercial rule.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention: Option<RetentionLtv>,
    #[serde(default)]
    pub flat_above_commercial: bool,
    /// Product fee for this column as a fraction of gross.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_fee_pct: Option<Rate>,
    /// Label of the fee column being evaluated, used to look up overrides.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column_key: Option<String>,
    /// Per-column product fee overrides keyed by column label.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub fee_overrides: BTreeMap<String, Rate>,
    /// Replaces the record's coupon or margin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_override: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_rolled_months: Option<Months>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub manual_deferred_rate: Option<Rate>,
    #[serde(default)]
    pub broker: BrokerInputs,
}

impl CalculationInput {
    /// An input with only the loan type and product selector populated.
    pub fn new(loan_type: LoanType, product: ProductSelector) -> Self {
        Self {
            loan_type,
            product,
            property_value: None,
            monthly_rent: None,
            top_slicing: None,
            specific_net_loan: None,
            specific_gross_loan: None,
            target_ltv: None,
            product_type: None,
            tier: None,
            retention: None,
            flat_above_commercial: false,
            product_fee_pct: None,
            column_key: None,
            fee_overrides: BTreeMap::new(),
            rate_override: None,
            manual_rolled_months: None,
            manual_deferred_rate: None,
            broker: BrokerInputs::default(),
        }
    }

    /// Product fee for the current column, preferring an override keyed by
    /// `column_key`.
    pub fn effective_fee_pct(&self) -> Option<Rate> {
        self.column_key
            .as_ref()
            .and_then(|key| self.fee_overrides.get(key).copied())
            .or(self.product_fee_pct)
    }

    pub fn has_manual_override(&self) -> bool {
        self.manual_rolled_months.is_some() || self.manual_deferred_rate.is_some()
    }
}

impl Default for CalculationInput {
    fn default() -> Self {
        Self::new(
            LoanType::MaxLtv,
            ProductSelector::new(ProductRange::Specialist, PropertyType::Residential),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_fee_override_wins_for_its_column() {
        let mut input = CalculationInput::default();
        input.product_fee_pct = Some(dec!(0.02));
        input.fee_overrides.insert("2%".into(), dec!(0.0175));
        assert_eq!(input.effective_fee_pct(), Some(dec!(0.02)));

        input.column_key = Some("2%".into());
        assert_eq!(input.effective_fee_pct(), Some(dec!(0.0175)));

        input.column_key = Some("4%".into());
        assert_eq!(input.effective_fee_pct(), Some(dec!(0.02)));
    }

    #[test]
    fn test_minimal_json_input() {
        let json = r#"{
            "loan_type": "max_ltv",
            "product": { "range": "specialist", "property_type": "residential" },
            "property_value": 500000,
            "monthly_rent": "2500",
            "target_ltv": 0.75
        }"#;
        let input: CalculationInput = serde_json::from_str(json).unwrap();
        assert_eq!(input.property_value, Some(dec!(500000)));
        assert_eq!(input.monthly_rent, Some(dec!(2500)));
        assert!(!input.has_manual_override());
        assert!(input.broker.client_type.is_none());
    }
}
