pub mod composer;
pub mod floor;

pub use composer::{compose_rates, ComposedRates};
pub use floor::{FloorPolicy, FloorRule, FloorTable, NoFloor};
