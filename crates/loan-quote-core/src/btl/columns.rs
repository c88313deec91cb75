//! Fee-column evaluation: one quote per configured product-fee column.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Instant;

use crate::btl::engine::{evaluate, QuoteOutput};
use crate::config::EngineConfig;
use crate::input::CalculationInput;
use crate::numeric::format_rate_pct_compact;
use crate::product::RateRecord;
use crate::types::{elapsed_us, with_metadata, ComputationOutput, Rate};
use crate::LoanQuoteResult;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeColumnQuote {
    /// Column label, e.g. "2%"; also the key for fee overrides.
    pub column_key: String,
    pub column_fee_pct: Rate,
    pub quote: QuoteOutput,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeeColumnsOutput {
    pub columns: Vec<FeeColumnQuote>,
    /// Column with the largest net loan.
    pub best_column: Option<String>,
}

/// Label used for a fee column and its override key.
pub fn column_label(fee_pct: Rate) -> String {
    format_rate_pct_compact(fee_pct)
}

/// Evaluate every fee column configured for the input's product selector
/// and retention choice. Columns are independent of one another.
pub fn evaluate_fee_columns(
    input: &CalculationInput,
    record: &RateRecord,
    config: &EngineConfig,
) -> LoanQuoteResult<ComputationOutput<FeeColumnsOutput>> {
    let start = Instant::now();
    let fee_set = config.fee_columns.columns_for(&input.product, input.retention);

    let mut warnings = Vec::new();
    let mut columns = Vec::with_capacity(fee_set.len());
    for &fee_pct in fee_set {
        let key = column_label(fee_pct);
        let mut column_input = input.clone();
        column_input.product_fee_pct = Some(fee_pct);
        column_input.column_key = Some(key.clone());

        let out = evaluate(&column_input, record, config)?;
        warnings.extend(out.warnings.into_iter().map(|w| format!("[{key}] {w}")));
        columns.push(FeeColumnQuote {
            column_key: key,
            column_fee_pct: fee_pct,
            quote: out.result,
        });
    }

    let best_column = columns
        .iter()
        .filter(|c| !c.quote.gross_loan.is_zero())
        .max_by(|a, b| a.quote.net_loan.cmp(&b.quote.net_loan))
        .map(|c| c.column_key.clone());

    let assumptions = json!({
        "product": input.product,
        "retention": input.retention,
        "column_fees": fee_set.iter().map(|f| f.to_string()).collect::<Vec<_>>(),
        "overrides": input.fee_overrides.len(),
    });

    Ok(with_metadata(
        "BTL fee-column comparison: one independent quote per product-fee column",
        &assumptions,
        warnings,
        elapsed_us(start),
        FeeColumnsOutput {
            columns,
            best_column,
        },
    ))
}
