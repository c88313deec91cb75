//! Rate-floor policies.
//!
//! A floor is applied after the display and stress rates are composed. Which
//! products carry a floor is administrator data, so the policy is a trait with
//! a table-backed implementation rather than hard-coded conditionals.

use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::product::{ProductKind, ProductRange, ProductSelector, PropertyType};
use crate::types::Rate;

/// Minimum rate applicable to a product, if any.
pub trait FloorPolicy {
    fn floor_for(&self, selector: &ProductSelector, kind: ProductKind) -> Option<Rate>;
}

/// Policy that never floors.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoFloor;

impl FloorPolicy for NoFloor {
    fn floor_for(&self, _selector: &ProductSelector, _kind: ProductKind) -> Option<Rate> {
        None
    }
}

/// One predicate -> floor entry. `None` predicates match anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FloorRule {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<ProductRange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub property_type: Option<PropertyType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_kind: Option<ProductKind>,
    pub floor: Rate,
}

impl FloorRule {
    pub fn matches(&self, selector: &ProductSelector, kind: ProductKind) -> bool {
        self.range.map_or(true, |r| r == selector.range)
            && self.property_type.map_or(true, |p| p == selector.property_type)
            && self.product_kind.map_or(true, |k| k == kind)
    }
}

/// Ordered list of floor rules; the highest matching floor wins.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FloorTable {
    pub rules: Vec<FloorRule>,
}

impl Default for FloorTable {
    fn default() -> Self {
        Self {
            rules: vec![FloorRule {
                range: Some(ProductRange::Core),
                property_type: Some(PropertyType::Residential),
                product_kind: None,
                floor: dec!(0.05),
            }],
        }
    }
}

impl FloorPolicy for FloorTable {
    fn floor_for(&self, selector: &ProductSelector, kind: ProductKind) -> Option<Rate> {
        self.rules
            .iter()
            .filter(|rule| rule.matches(selector, kind))
            .map(|rule| rule.floor)
            .max()
    }
}
