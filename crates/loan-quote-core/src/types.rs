use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Pounds sterling.
pub type Money = Decimal;

/// Annual or monthly rate as a fraction (0.065 = 6.5%), never a percentage.
pub type Rate = Decimal;

/// Coverage multiple, e.g. 1.45 for a 145% ICR.
pub type Multiple = Decimal;

pub type Months = u32;

const PRECISION: &str = "rust_decimal_128bit";

/// Envelope returned by every quote operation.
///
/// `result` is deterministic for a given input; `metadata` carries wall-clock
/// timing and is excluded from comparisons between runs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationOutput<T: Serialize> {
    pub result: T,
    pub methodology: String,
    pub assumptions: serde_json::Value,
    /// Informational conditions: floors applied, minimum-loan misses, solver
    /// non-convergence, clamped broker commission.
    pub warnings: Vec<String>,
    pub metadata: ComputationMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputationMetadata {
    pub version: String,
    pub computation_time_us: u64,
    pub precision: String,
}

pub fn with_metadata<T: Serialize>(
    methodology: &str,
    assumptions: &impl Serialize,
    warnings: Vec<String>,
    elapsed_us: u64,
    result: T,
) -> ComputationOutput<T> {
    ComputationOutput {
        result,
        methodology: methodology.to_string(),
        assumptions: serde_json::to_value(assumptions).unwrap_or_default(),
        warnings,
        metadata: ComputationMetadata {
            version: env!("CARGO_PKG_VERSION").to_string(),
            computation_time_us: elapsed_us,
            precision: PRECISION.to_string(),
        },
    }
}

/// Microseconds since `start`, saturating.
pub fn elapsed_us(start: Instant) -> u64 {
    u64::try_from(start.elapsed().as_micros()).unwrap_or(u64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_carries_warnings_and_precision() {
        let out = with_metadata(
            "test",
            &json!({ "term_months": 24 }),
            vec!["Rate floor of 5.00% applied".into()],
            12,
            "payload",
        );
        assert_eq!(out.result, "payload");
        assert_eq!(out.assumptions["term_months"], 24);
        assert_eq!(out.warnings.len(), 1);
        assert_eq!(out.metadata.precision, "rust_decimal_128bit");
        assert_eq!(out.metadata.computation_time_us, 12);
    }
}
