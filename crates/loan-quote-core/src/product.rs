//! Product taxonomy and the rates-store record consumed by every calculator.
//!
//! Product-group dispatch is a tagged variant over
//! {Fixed, Tracker, FusionTiered} x {Core, Specialist}; the string forms used
//! by the rates store are only interpreted at the normalization boundary.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LoanQuoteError;
use crate::numeric::MONTHS_PER_YEAR;
use crate::types::{Money, Months, Multiple, Rate};
use crate::LoanQuoteResult;

/// How the nominal rate of a product column is composed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductKind {
    /// Fixed coupon (BTL fixes, fixed bridges).
    Fixed,
    /// Margin over the reference base rate (BTL trackers, variable bridges).
    Tracker,
    /// Fusion bridging: tier margin over the reference base rate.
    FusionTiered,
}

impl ProductKind {
    pub fn tracks_reference_rate(&self) -> bool {
        !matches!(self, ProductKind::Fixed)
    }

    /// Classify a free-text product type such as "2yr Tracker" or "Fusion".
    pub fn from_product_type(label: &str) -> Self {
        let lower = label.to_ascii_lowercase();
        if lower.contains("fusion") {
            ProductKind::FusionTiered
        } else if lower.contains("tracker") || lower.contains("var") {
            ProductKind::Tracker
        } else {
            ProductKind::Fixed
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductRange {
    Core,
    Specialist,
}

impl FromStr for ProductRange {
    type Err = LoanQuoteError;

    fn from_str(s: &str) -> LoanQuoteResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "core" => Ok(ProductRange::Core),
            "specialist" => Ok(ProductRange::Specialist),
            other => Err(LoanQuoteError::InvalidInput {
                field: "range".into(),
                reason: format!("Unknown product range '{other}'"),
            }),
        }
    }
}

impl fmt::Display for ProductRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductRange::Core => write!(f, "Core"),
            ProductRange::Specialist => write!(f, "Specialist"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    Residential,
    Commercial,
    SemiCommercial,
}

impl FromStr for PropertyType {
    type Err = LoanQuoteError;

    fn from_str(s: &str) -> LoanQuoteResult<Self> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match key.as_str() {
            "residential" => Ok(PropertyType::Residential),
            "commercial" => Ok(PropertyType::Commercial),
            "semicommercial" => Ok(PropertyType::SemiCommercial),
            _ => Err(LoanQuoteError::InvalidInput {
                field: "property_type".into(),
                reason: format!("Unknown property type '{s}'"),
            }),
        }
    }
}

impl fmt::Display for PropertyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PropertyType::Residential => "Residential",
            PropertyType::Commercial => "Commercial",
            PropertyType::SemiCommercial => "Semi-Commercial",
        };
        write!(f, "{label}")
    }
}

/// A (product range, property type) pair used to key configured rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ProductSelector {
    pub range: ProductRange,
    pub property_type: PropertyType,
}

impl ProductSelector {
    pub fn new(range: ProductRange, property_type: PropertyType) -> Self {
        Self {
            range,
            property_type,
        }
    }
}

/// Which borrower figure drives the loan size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoanType {
    /// Largest loan the LTV and ICR caps allow.
    MaxLtv,
    SpecificGross,
    SpecificNet,
    SpecificLtv,
}

impl FromStr for LoanType {
    type Err = LoanQuoteError;

    fn from_str(s: &str) -> LoanQuoteResult<Self> {
        let lower = s.trim().to_ascii_lowercase();
        if lower.contains("net") {
            Ok(LoanType::SpecificNet)
        } else if lower.contains("gross") && lower.contains("specific") {
            Ok(LoanType::SpecificGross)
        } else if lower.contains("specific") && lower.contains("ltv") {
            Ok(LoanType::SpecificLtv)
        } else if lower.contains("ltv") || lower.contains("optimum") || lower.contains("max") {
            Ok(LoanType::MaxLtv)
        } else {
            Err(LoanQuoteError::InvalidInput {
                field: "loan_type".into(),
                reason: format!("Unknown loan type '{s}'"),
            })
        }
    }
}

/// Retention (existing-borrower) LTV tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RetentionLtv {
    /// Capped at exactly 65%.
    #[serde(rename = "65")]
    Ltv65,
    /// Covers LTVs in (65%, 75%].
    #[serde(rename = "75")]
    Ltv75,
}

impl RetentionLtv {
    /// Pick the tier for a percentage such as 65 or 75.
    pub fn from_percent(pct: Decimal) -> Option<Self> {
        if pct <= Decimal::ZERO {
            None
        } else if pct <= Decimal::from(65) {
            Some(RetentionLtv::Ltv65)
        } else {
            Some(RetentionLtv::Ltv75)
        }
    }
}

/// Reference index a product reverts to after its initial period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevertIndex {
    /// Bank base rate.
    Bbr,
    /// Lender's mortgage variable rate.
    Mvr,
    /// An explicit rate.
    Fixed(Rate),
}

impl RevertIndex {
    pub fn label(&self) -> Option<&'static str> {
        match self {
            RevertIndex::Bbr => Some("BBR"),
            RevertIndex::Mvr => Some("MVR"),
            RevertIndex::Fixed(_) => None,
        }
    }
}

/// Period a [`RateRecord::rate`] is quoted over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateBasis {
    Annual,
    Monthly,
}

impl RateBasis {
    /// Basis the bridging calculator prices `kind` on: Bridge coupons and
    /// margins are monthly, Fusion margins annual.
    pub fn for_bridging(kind: ProductKind) -> Self {
        match kind {
            ProductKind::FusionTiered => RateBasis::Annual,
            ProductKind::Fixed | ProductKind::Tracker => RateBasis::Monthly,
        }
    }
}

/// One product column from the rates store. Read-only to the engine.
///
/// Optional limits fall back to `EngineConfig::limits` when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateRecord {
    pub product_kind: ProductKind,
    /// Coupon for fixed products, margin for tracker and Fusion products.
    /// Read through [`RateRecord::rate_on`].
    pub rate: Rate,
    /// Unit of `rate`; when absent the pricing engine's own basis is assumed
    /// (annual for BTL and Fusion, monthly for Bridge products).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_basis: Option<RateBasis>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_loan: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_loan: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_ltv: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_rolled_months: Option<Months>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_rolled_months: Option<Months>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_deferred_rate: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_deferred_rate: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub term_months: Option<Months>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_icr: Option<Multiple>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_fee: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exit_fee: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_fee: Option<Rate>,
    /// Early repayment charge per loan year; only the first five are read.
    #[serde(default)]
    pub erc: Vec<Option<Rate>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revert_index: Option<RevertIndex>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revert_margin: Option<Rate>,
    /// Fusion tier label, e.g. "Small", "Medium", "Large".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fusion_tier: Option<String>,
}

impl RateRecord {
    /// A record with only its kind and rate populated.
    pub fn new(product_kind: ProductKind, rate: Rate) -> Self {
        Self {
            product_kind,
            rate,
            rate_basis: None,
            min_loan: None,
            max_loan: None,
            max_ltv: None,
            min_rolled_months: None,
            max_rolled_months: None,
            min_deferred_rate: None,
            max_deferred_rate: None,
            term_months: None,
            min_icr: None,
            admin_fee: None,
            exit_fee: None,
            product_fee: None,
            erc: Vec::new(),
            revert_index: None,
            revert_margin: None,
            fusion_tier: None,
        }
    }

    /// The rate expressed on `basis`, converting when the record states another unit.
    pub fn rate_on(&self, basis: RateBasis) -> Rate {
        match (self.rate_basis, basis) {
            (Some(RateBasis::Monthly), RateBasis::Annual) => self.rate * MONTHS_PER_YEAR,
            (Some(RateBasis::Annual), RateBasis::Monthly) => self.rate / MONTHS_PER_YEAR,
            _ => self.rate,
        }
    }

    /// Reject structurally invalid records before any calculation runs.
    pub fn validate(&self) -> LoanQuoteResult<()> {
        if self.term_months == Some(0) {
            return Err(LoanQuoteError::InvalidInput {
                field: "term_months".into(),
                reason: "Term must be at least 1 month".into(),
            });
        }
        if let (Some(min), Some(max)) = (self.min_loan, self.max_loan) {
            if max < min {
                return Err(LoanQuoteError::InvalidInput {
                    field: "max_loan".into(),
                    reason: "Maximum loan cannot be below minimum loan".into(),
                });
            }
        }
        let negatives = [
            ("rate", Some(self.rate)),
            ("min_loan", self.min_loan),
            ("max_loan", self.max_loan),
            ("max_ltv", self.max_ltv),
            ("min_deferred_rate", self.min_deferred_rate),
            ("max_deferred_rate", self.max_deferred_rate),
            ("min_icr", self.min_icr),
            ("admin_fee", self.admin_fee),
            ("exit_fee", self.exit_fee),
            ("product_fee", self.product_fee),
        ];
        for (field, value) in negatives {
            if matches!(value, Some(v) if v < Decimal::ZERO) {
                return Err(LoanQuoteError::InvalidInput {
                    field: field.into(),
                    reason: "Rate record limits cannot be negative".into(),
                });
            }
        }
        if matches!(self.product_fee, Some(fee) if fee >= Decimal::ONE) {
            return Err(LoanQuoteError::InvalidInput {
                field: "product_fee".into(),
                reason: "Product fee must be below 100%".into(),
            });
        }
        Ok(())
    }
}
