//! Request documents accepted by the CLI and the bindings.
//!
//! Each side of a request may arrive typed or raw: borrower inputs as
//! `input` or as the form payload `form`, the product column as `record` or
//! as a rates-store `rate_row`. Typed sections win when both are present.

use serde::{Deserialize, Serialize};

#[cfg(feature = "bridging")]
use crate::bridging::BridgingInput;
use crate::error::LoanQuoteError;
use crate::input::CalculationInput;
use crate::normalize::{normalize_borrower_form, normalize_rate_row, BorrowerForm, RateRow};
use crate::product::RateRecord;
use crate::LoanQuoteResult;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BtlRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input: Option<CalculationInput>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form: Option<BorrowerForm>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<RateRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_row: Option<RateRow>,
}

impl BtlRequest {
    /// Typed borrower input and rate record for the engine.
    pub fn resolve(&self) -> LoanQuoteResult<(CalculationInput, RateRecord)> {
        let input = match (&self.input, &self.form) {
            (Some(input), _) => input.clone(),
            (None, Some(form)) => normalize_borrower_form(form)?,
            (None, None) => {
                return Err(LoanQuoteError::InsufficientData(
                    "request needs an 'input' or a 'form' section".into(),
                ))
            }
        };
        Ok((input, resolve_record(&self.record, &self.rate_row)?))
    }
}

#[cfg(feature = "bridging")]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgingRequest {
    pub input: BridgingInput,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<RateRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_row: Option<RateRow>,
}

#[cfg(feature = "bridging")]
impl BridgingRequest {
    pub fn resolve(&self) -> LoanQuoteResult<(BridgingInput, RateRecord)> {
        Ok((self.input.clone(), resolve_record(&self.record, &self.rate_row)?))
    }
}

fn resolve_record(record: &Option<RateRecord>, row: &Option<RateRow>) -> LoanQuoteResult<RateRecord> {
    match (record, row) {
        (Some(record), _) => {
            record.validate()?;
            Ok(record.clone())
        }
        (None, Some(row)) => normalize_rate_row(row),
        (None, None) => Err(LoanQuoteError::InsufficientData(
            "request needs a 'record' or a 'rate_row' section".into(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::{LoanType, ProductKind};
    use rust_decimal_macros::dec;

    #[test]
    fn test_form_and_rate_row_request() {
        let request: BtlRequest = serde_json::from_str(
            r#"{
                "form": { "loan_type": "Max Optimum Gross Loan", "range": "Specialist",
                          "property_type": "Commercial", "property_value": "400,000",
                          "monthly_rent": 2000, "max_ltv": "70" },
                "rate_row": { "product_type": "3yr Fix", "rate": "5.99", "max_ltv": 75 }
            }"#,
        )
        .unwrap();
        let (input, record) = request.resolve().unwrap();
        assert_eq!(input.loan_type, LoanType::MaxLtv);
        assert_eq!(input.target_ltv, Some(dec!(0.7)));
        assert_eq!(record.product_kind, ProductKind::Fixed);
        assert_eq!(record.rate, dec!(0.0599));
    }

    #[test]
    fn test_typed_record_wins_over_row() {
        let mut request = BtlRequest {
            input: Some(CalculationInput::default()),
            record: Some(RateRecord::new(ProductKind::Tracker, dec!(0.025))),
            ..Default::default()
        };
        request.rate_row = Some(RateRow {
            product_type: "2yr Fix".into(),
            rate: Some(dec!(6.5)),
            ..Default::default()
        });
        let (_, record) = request.resolve().unwrap();
        assert_eq!(record.product_kind, ProductKind::Tracker);
    }

    #[test]
    fn test_missing_sections_rejected() {
        let request = BtlRequest {
            input: Some(CalculationInput::default()),
            ..Default::default()
        };
        assert!(matches!(
            request.resolve(),
            Err(LoanQuoteError::InsufficientData(_))
        ));
        assert!(BtlRequest::default().resolve().is_err());
    }

    #[cfg(feature = "bridging")]
    #[test]
    fn test_bridging_request_defaults_input() {
        let request: BridgingRequest =
            serde_json::from_str(r#"{ "record": { "product_kind": "fixed", "rate": "0.0085" } }"#)
                .unwrap();
        let (input, record) = request.resolve().unwrap();
        assert_eq!(input.gross_loan, None);
        assert_eq!(record.rate, dec!(0.0085));
    }
}
