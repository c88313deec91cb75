//! Buy-to-let engine: constraint derivation, scenario evaluation,
//! rolled/deferred optimisation and fee-column comparison.

pub mod columns;
pub mod constraints;
pub mod engine;
pub mod optimizer;
pub mod scenario;

pub use columns::{evaluate_fee_columns, FeeColumnQuote, FeeColumnsOutput};
pub use engine::{evaluate, QuoteOutput};
pub use optimizer::{GoldenSectionSearch, GridSearch, OptimizerMode, SearchStrategy};
