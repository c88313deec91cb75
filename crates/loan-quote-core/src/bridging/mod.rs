//! Bridge and Fusion bridging products.

pub mod calculator;
pub mod reverse;

pub use calculator::{calculate_bridging_quote, ltv_bucket, BridgingInput, BridgingQuote};
pub use reverse::{solve_gross_for_net, NetSolveOutcome};
