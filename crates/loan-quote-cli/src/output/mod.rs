pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::{Map, Value};

/// Quote fields shown when fee columns are compared side by side.
const COLUMN_SUMMARY_FIELDS: [&str; 10] = [
    "gross_loan",
    "net_loan",
    "product_fee_amount",
    "ltv",
    "icr",
    "rolled_months",
    "deferred_rate",
    "pay_rate_text",
    "monthly_payment",
    "aprc",
];

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// One flat row per fee column when `result` is a fee-column comparison.
pub(crate) fn fee_column_rows(result: &Value) -> Option<Vec<Value>> {
    let columns = result.get("columns")?.as_array()?;
    let rows = columns
        .iter()
        .map(|column| {
            let mut row = Map::new();
            row.insert(
                "column".into(),
                column.get("column_key").cloned().unwrap_or(Value::Null),
            );
            for field in COLUMN_SUMMARY_FIELDS {
                let val = column
                    .get("quote")
                    .and_then(|q| q.get(field))
                    .cloned()
                    .unwrap_or(Value::Null);
                row.insert(field.into(), val);
            }
            Value::Object(row)
        })
        .collect();
    Some(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_fee_column_rows_flatten_quotes() {
        let result = json!({
            "columns": [
                { "column_key": "6%", "column_fee_pct": "0.06", "quote": { "net_loan": "352500", "gross_loan": "375000" } },
                { "column_key": "2%", "column_fee_pct": "0.02", "quote": { "net_loan": "367500", "gross_loan": "375000" } }
            ],
            "best_column": "2%"
        });
        let rows = fee_column_rows(&result).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1]["column"], json!("2%"));
        assert_eq!(rows[1]["net_loan"], json!("367500"));
        assert_eq!(rows[0]["icr"], Value::Null);
    }

    #[test]
    fn test_single_quote_has_no_column_rows() {
        assert!(fee_column_rows(&json!({ "net_loan": "1" })).is_none());
    }
}
