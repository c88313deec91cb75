use napi::Result as NapiResult;
use napi_derive::napi;

use loan_quote_core::request::{BridgingRequest, BtlRequest};
use loan_quote_core::EngineConfig;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Engine configuration from JSON, or the shipped defaults when absent.
fn engine_config(config_json: Option<String>) -> NapiResult<EngineConfig> {
    match config_json.filter(|s| !s.trim().is_empty()) {
        Some(json) => serde_json::from_str(&json).map_err(to_napi_error),
        None => Ok(EngineConfig::default()),
    }
}

// ---------------------------------------------------------------------------
// Buy-to-let
// ---------------------------------------------------------------------------

#[napi]
pub fn evaluate_btl_quote(request_json: String, config_json: Option<String>) -> NapiResult<String> {
    let request: BtlRequest = serde_json::from_str(&request_json).map_err(to_napi_error)?;
    let config = engine_config(config_json)?;
    let (input, record) = request.resolve().map_err(to_napi_error)?;
    let output =
        loan_quote_core::btl::evaluate(&input, &record, &config).map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[napi]
pub fn evaluate_fee_columns(request_json: String, config_json: Option<String>) -> NapiResult<String> {
    let request: BtlRequest = serde_json::from_str(&request_json).map_err(to_napi_error)?;
    let config = engine_config(config_json)?;
    let (input, record) = request.resolve().map_err(to_napi_error)?;
    let output = loan_quote_core::btl::evaluate_fee_columns(&input, &record, &config)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

// ---------------------------------------------------------------------------
// Bridging
// ---------------------------------------------------------------------------

#[napi]
pub fn calculate_bridging_quote(
    request_json: String,
    config_json: Option<String>,
) -> NapiResult<String> {
    let request: BridgingRequest = serde_json::from_str(&request_json).map_err(to_napi_error)?;
    let config = engine_config(config_json)?;
    let (input, record) = request.resolve().map_err(to_napi_error)?;
    let output = loan_quote_core::bridging::calculate_bridging_quote(&input, &record, &config)
        .map_err(to_napi_error)?;
    serde_json::to_string(&output).map_err(to_napi_error)
}

#[derive(serde::Deserialize)]
struct LtvBucketInput {
    gross_loan: rust_decimal::Decimal,
    #[serde(default)]
    property_value: Option<rust_decimal::Decimal>,
}

/// Bridge pricing band (60, 70 or 75) for a gross loan and property value.
#[napi]
pub fn bridging_ltv_bucket(input_json: String) -> NapiResult<u32> {
    let input: LtvBucketInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    Ok(loan_quote_core::bridging::ltv_bucket(
        input.gross_loan,
        input.property_value,
    ))
}

// ---------------------------------------------------------------------------
// Normalisation and configuration
// ---------------------------------------------------------------------------

#[napi]
pub fn normalize_borrower_form(form_json: String) -> NapiResult<String> {
    let form: loan_quote_core::normalize::BorrowerForm =
        serde_json::from_str(&form_json).map_err(to_napi_error)?;
    let input = loan_quote_core::normalize::normalize_borrower_form(&form).map_err(to_napi_error)?;
    serde_json::to_string(&input).map_err(to_napi_error)
}

#[napi]
pub fn normalize_rate_row(row_json: String) -> NapiResult<String> {
    let row: loan_quote_core::normalize::RateRow =
        serde_json::from_str(&row_json).map_err(to_napi_error)?;
    let record = loan_quote_core::normalize::normalize_rate_row(&row).map_err(to_napi_error)?;
    serde_json::to_string(&record).map_err(to_napi_error)
}

#[napi]
pub fn default_engine_config() -> NapiResult<String> {
    serde_json::to_string(&EngineConfig::default()).map_err(to_napi_error)
}
