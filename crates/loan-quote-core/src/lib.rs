pub mod broker;
pub mod config;
pub mod error;
pub mod input;
pub mod metrics;
pub mod normalize;
pub mod numeric;
pub mod product;
pub mod rates;
pub mod request;
pub mod types;

#[cfg(feature = "btl")]
pub mod btl;

#[cfg(feature = "bridging")]
pub mod bridging;

pub use config::EngineConfig;
pub use error::LoanQuoteError;
pub use input::CalculationInput;
pub use types::*;

/// Standard result type for all loan-quote operations
pub type LoanQuoteResult<T> = Result<T, LoanQuoteError>;
