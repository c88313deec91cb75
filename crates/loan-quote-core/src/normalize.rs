//! Input Normalizer.
//!
//! Turns form-style borrower payloads and rates-store rows (percent units,
//! numbers that may arrive as strings, currency symbols, thousands
//! separators) into the typed [`CalculationInput`] and [`RateRecord`].
//! Unusable numbers become `None` instead of errors; only unknown enum labels
//! are rejected.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

use crate::broker::{BrokerInputs, BrokerRoute, ClientFee, ClientType};
use crate::error::LoanQuoteError;
use crate::input::CalculationInput;
use crate::numeric::percent_to_rate;
use crate::product::{LoanType, ProductKind, ProductSelector, RateRecord, RetentionLtv, RevertIndex};
use crate::types::{Money, Months, Rate};
use crate::LoanQuoteResult;

// ---------------------------------------------------------------------------
// Number parsing
// ---------------------------------------------------------------------------

/// Parse user-entered numeric text such as "£250,000" or "6.5%".
///
/// Returns `None` for empty or unparsable text.
pub fn parse_number(raw: &str) -> Option<Decimal> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(c, '£' | ',' | '%') && !c.is_whitespace())
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    Decimal::from_str(&cleaned)
        .or_else(|_| Decimal::from_scientific(&cleaned))
        .ok()
}

/// A number that may arrive as a JSON number, a numeric string, or null.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct LooseDecimal(pub Option<Decimal>);

impl<'de> Deserialize<'de> for LooseDecimal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(LooseDecimal(value.as_ref().and_then(value_to_decimal)))
    }
}

fn value_to_decimal(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::Number(n) => parse_number(&n.to_string()),
        serde_json::Value::String(s) => parse_number(s),
        _ => None,
    }
}

/// `#[serde(with = "loose_decimal")]` adapter for `Option<Decimal>` fields.
pub mod loose_decimal {
    use super::LooseDecimal;
    use rust_decimal::Decimal;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(value: &Option<Decimal>, s: S) -> Result<S::Ok, S::Error> {
        value.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Decimal>, D::Error> {
        Ok(LooseDecimal::deserialize(d)?.0)
    }
}

fn non_negative(value: Option<Decimal>) -> Option<Decimal> {
    value.filter(|v| *v >= Decimal::ZERO)
}

fn amount(value: Option<Decimal>) -> Option<Money> {
    non_negative(value)
}

fn pct(value: Option<Decimal>) -> Option<Rate> {
    non_negative(value).map(percent_to_rate)
}

fn whole_months(value: Option<Decimal>) -> Option<Months> {
    non_negative(value).and_then(|v| v.round().to_u32())
}

fn is_yes(flag: Option<&str>) -> bool {
    matches!(
        flag.map(|f| f.trim().to_ascii_lowercase()).as_deref(),
        Some("yes" | "y" | "true" | "1")
    )
}

fn non_empty(text: &Option<String>) -> Option<&str> {
    text.as_deref().map(str::trim).filter(|t| !t.is_empty())
}

// ---------------------------------------------------------------------------
// Borrower form
// ---------------------------------------------------------------------------

/// Borrower inputs as captured by the quoting form. Percentages are in
/// percent units (75 = 75%).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BorrowerForm {
    pub loan_type: String,
    pub range: String,
    pub property_type: String,
    pub product_type: Option<String>,
    #[serde(with = "loose_decimal")]
    pub tier: Option<Decimal>,
    #[serde(with = "loose_decimal")]
    pub property_value: Option<Decimal>,
    #[serde(with = "loose_decimal")]
    pub monthly_rent: Option<Decimal>,
    #[serde(with = "loose_decimal")]
    pub top_slicing: Option<Decimal>,
    #[serde(with = "loose_decimal")]
    pub specific_net_loan: Option<Decimal>,
    #[serde(with = "loose_decimal")]
    pub specific_gross_loan: Option<Decimal>,
    #[serde(with = "loose_decimal")]
    pub max_ltv: Option<Decimal>,
    pub retention_choice: Option<String>,
    #[serde(with = "loose_decimal")]
    pub retention_ltv: Option<Decimal>,
    pub flat_above_commercial: Option<String>,
    #[serde(with = "loose_decimal")]
    pub product_fee_percent: Option<Decimal>,
    pub col_key: Option<String>,
    pub fee_overrides: BTreeMap<String, LooseDecimal>,
    #[serde(with = "loose_decimal")]
    pub overridden_rate: Option<Decimal>,
    #[serde(with = "loose_decimal")]
    pub manual_rolled: Option<Decimal>,
    #[serde(with = "loose_decimal")]
    pub manual_deferred: Option<Decimal>,
    pub client_type: Option<String>,
    pub broker_route: Option<String>,
    #[serde(with = "loose_decimal")]
    pub proc_fee_pct: Option<Decimal>,
    #[serde(with = "loose_decimal")]
    pub broker_fee_pct: Option<Decimal>,
    #[serde(with = "loose_decimal")]
    pub broker_fee_flat: Option<Decimal>,
    /// "flat" or "percentage".
    pub client_fee_type: Option<String>,
    #[serde(with = "loose_decimal")]
    pub client_fee_value: Option<Decimal>,
}

fn parse_client_type(label: &str) -> LoanQuoteResult<ClientType> {
    match label.to_ascii_lowercase().as_str() {
        "direct" => Ok(ClientType::Direct),
        "broker" => Ok(ClientType::Broker),
        other => Err(LoanQuoteError::InvalidInput {
            field: "client_type".into(),
            reason: format!("Unknown client type '{other}'"),
        }),
    }
}

fn parse_broker_route(label: &str) -> LoanQuoteResult<BrokerRoute> {
    let key: String = label
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_ascii_lowercase();
    match key.as_str() {
        "directbroker" => Ok(BrokerRoute::DirectBroker),
        "mortgageclub" => Ok(BrokerRoute::MortgageClub),
        "network" => Ok(BrokerRoute::Network),
        "packager" => Ok(BrokerRoute::Packager),
        _ => Err(LoanQuoteError::InvalidInput {
            field: "broker_route".into(),
            reason: format!("Unknown broker route '{label}'"),
        }),
    }
}

fn normalize_broker(form: &BorrowerForm) -> LoanQuoteResult<BrokerInputs> {
    let client_fee = match (
        non_empty(&form.client_fee_type).map(str::to_ascii_lowercase),
        non_negative(form.client_fee_value),
    ) {
        (Some(kind), Some(value)) if kind.starts_with("flat") => Some(ClientFee::Flat(value)),
        (Some(kind), Some(value)) if kind.starts_with("perc") || kind == "%" => {
            Some(ClientFee::Percentage(percent_to_rate(value)))
        }
        _ => None,
    };

    Ok(BrokerInputs {
        client_type: non_empty(&form.client_type).map(parse_client_type).transpose()?,
        route: non_empty(&form.broker_route).map(parse_broker_route).transpose()?,
        proc_fee_pct: pct(form.proc_fee_pct),
        broker_fee_pct: pct(form.broker_fee_pct),
        broker_fee_flat: amount(form.broker_fee_flat),
        client_fee,
    })
}

/// Convert a form payload into a typed [`CalculationInput`].
pub fn normalize_borrower_form(form: &BorrowerForm) -> LoanQuoteResult<CalculationInput> {
    let loan_type: LoanType = form.loan_type.parse()?;
    let product = ProductSelector::new(form.range.parse()?, form.property_type.parse()?);

    let retention = if is_yes(form.retention_choice.as_deref()) {
        non_negative(form.retention_ltv).and_then(RetentionLtv::from_percent)
    } else {
        None
    };

    let fee_overrides = form
        .fee_overrides
        .iter()
        .filter_map(|(key, value)| pct(value.0).map(|rate| (key.clone(), rate)))
        .collect();

    Ok(CalculationInput {
        loan_type,
        product,
        property_value: amount(form.property_value),
        monthly_rent: amount(form.monthly_rent),
        top_slicing: amount(form.top_slicing),
        specific_net_loan: amount(form.specific_net_loan),
        specific_gross_loan: amount(form.specific_gross_loan),
        target_ltv: pct(form.max_ltv),
        product_type: non_empty(&form.product_type).map(str::to_string),
        tier: non_negative(form.tier).and_then(|t| t.round().to_u32()),
        retention,
        flat_above_commercial: is_yes(form.flat_above_commercial.as_deref()),
        product_fee_pct: pct(form.product_fee_percent),
        column_key: non_empty(&form.col_key).map(str::to_string),
        fee_overrides,
        rate_override: pct(form.overridden_rate),
        manual_rolled_months: whole_months(form.manual_rolled),
        manual_deferred_rate: pct(form.manual_deferred),
        broker: normalize_broker(form)?,
    })
}

// ---------------------------------------------------------------------------
// Rates-store row
// ---------------------------------------------------------------------------

/// A row as stored in the rates table. Rates and ICR are percent numbers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RateRow {
    pub product_type: String,
    #[serde(with = "loose_decimal")]
    pub rate: Option<Decimal>,
    #[serde(with = "loose_decimal")]
    pub min_loan: Option<Decimal>,
    #[serde(with = "loose_decimal")]
    pub max_loan: Option<Decimal>,
    #[serde(with = "loose_decimal")]
    pub max_ltv: Option<Decimal>,
    #[serde(with = "loose_decimal")]
    pub min_rolled_months: Option<Decimal>,
    #[serde(with = "loose_decimal")]
    pub max_rolled_months: Option<Decimal>,
    #[serde(with = "loose_decimal")]
    pub min_defer_int: Option<Decimal>,
    #[serde(with = "loose_decimal")]
    pub max_defer_int: Option<Decimal>,
    #[serde(with = "loose_decimal")]
    pub term_months: Option<Decimal>,
    #[serde(with = "loose_decimal")]
    pub min_icr: Option<Decimal>,
    #[serde(with = "loose_decimal")]
    pub admin_fee: Option<Decimal>,
    #[serde(with = "loose_decimal")]
    pub exit_fee: Option<Decimal>,
    #[serde(with = "loose_decimal")]
    pub product_fee: Option<Decimal>,
    #[serde(with = "loose_decimal")]
    pub erc_1: Option<Decimal>,
    #[serde(with = "loose_decimal")]
    pub erc_2: Option<Decimal>,
    #[serde(with = "loose_decimal")]
    pub erc_3: Option<Decimal>,
    #[serde(with = "loose_decimal")]
    pub erc_4: Option<Decimal>,
    #[serde(with = "loose_decimal")]
    pub erc_5: Option<Decimal>,
    pub revert_index: Option<String>,
    #[serde(with = "loose_decimal")]
    pub revert_margin: Option<Decimal>,
    pub fusion_tier: Option<String>,
}

fn parse_revert_index(raw: &str) -> Option<RevertIndex> {
    let lower = raw.to_ascii_lowercase();
    if lower.contains("bbr") {
        Some(RevertIndex::Bbr)
    } else if lower.contains("mvr") {
        Some(RevertIndex::Mvr)
    } else {
        parse_number(raw).map(|p| RevertIndex::Fixed(percent_to_rate(p)))
    }
}

/// Convert a rates-store row into a [`RateRecord`].
///
/// Zero limits are treated as unset, matching how the rates table leaves
/// blank cells.
pub fn normalize_rate_row(row: &RateRow) -> LoanQuoteResult<RateRecord> {
    let rate = pct(row.rate).ok_or_else(|| LoanQuoteError::InvalidInput {
        field: "rate".into(),
        reason: "Rate row has no usable rate".into(),
    })?;
    let set = |v: Option<Decimal>| v.filter(|x| *x > Decimal::ZERO);

    let record = RateRecord {
        product_kind: ProductKind::from_product_type(&row.product_type),
        rate,
        rate_basis: None,
        min_loan: amount(set(row.min_loan)),
        max_loan: amount(set(row.max_loan)),
        max_ltv: pct(set(row.max_ltv)),
        min_rolled_months: whole_months(row.min_rolled_months),
        max_rolled_months: whole_months(set(row.max_rolled_months)),
        min_deferred_rate: pct(row.min_defer_int),
        max_deferred_rate: pct(row.max_defer_int),
        term_months: whole_months(set(row.term_months)),
        min_icr: pct(set(row.min_icr)),
        admin_fee: amount(row.admin_fee),
        exit_fee: amount(row.exit_fee),
        product_fee: pct(row.product_fee),
        erc: [row.erc_1, row.erc_2, row.erc_3, row.erc_4, row.erc_5]
            .into_iter()
            .map(pct)
            .collect(),
        revert_index: non_empty(&row.revert_index).and_then(parse_revert_index),
        revert_margin: row.revert_margin.map(percent_to_rate),
        fusion_tier: non_empty(&row.fusion_tier).map(str::to_string),
    };
    record.validate()?;
    Ok(record)
}
