//! Numeric helpers shared by the rate, constraint and scenario layers.
//!
//! Caps that may be absent are carried as `Option<Money>` where `None` means
//! "unbounded". Division guards use fixed epsilon floors rather than
//! branching into errors.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::types::{Money, Months, Rate};

/// Floor applied to the payable stress rate before it is used as a divisor.
pub const PAYABLE_RATE_FLOOR: Rate = dec!(0.000001);

/// Smallest denominator accepted when grossing a target net loan up.
pub const NET_DENOMINATOR_EPSILON: Decimal = dec!(0.0000001);

/// Net-loan improvement (in pounds) a candidate must exceed to displace the incumbent.
pub const NET_TIE_TOLERANCE: Money = dec!(0.000001);

/// Distance from the absolute maximum loan at which the cap is reported as hit.
pub const MAX_LOAN_MATCH_TOLERANCE: Money = dec!(0.000001);

pub const MONTHS_PER_YEAR: Decimal = dec!(12);

pub const HUNDRED: Decimal = dec!(100);

/// Smaller of two optional bounds, treating `None` as unbounded.
pub fn min_bound(a: Option<Money>, b: Option<Money>) -> Option<Money> {
    match (a, b) {
        (Some(x), Some(y)) => Some(x.min(y)),
        (Some(x), None) => Some(x),
        (None, y) => y,
    }
}

/// Smallest of any number of optional bounds.
pub fn tightest(bounds: &[Option<Money>]) -> Option<Money> {
    bounds.iter().fold(None, |acc, b| min_bound(acc, *b))
}

/// Clamp into `[lo, hi]`; when the interval is inverted the lower bound wins.
pub fn clamp_decimal(value: Decimal, lo: Decimal, hi: Decimal) -> Decimal {
    value.min(hi).max(lo)
}

pub fn clamp_months(value: Months, lo: Months, hi: Months) -> Months {
    value.min(hi).max(lo)
}

pub fn months(m: Months) -> Decimal {
    Decimal::from(m)
}

/// Present positive values only; zero and negatives read as "not supplied".
pub fn positive(value: Option<Decimal>) -> Option<Decimal> {
    value.filter(|v| *v > Decimal::ZERO)
}

pub fn percent_to_rate(pct: Decimal) -> Rate {
    pct / HUNDRED
}

pub fn rate_to_percent(rate: Rate) -> Decimal {
    rate * HUNDRED
}

/// Render a decimal rate as a two-decimal percentage, e.g. 0.065 -> "6.50%".
pub fn format_rate_pct(rate: Rate) -> String {
    format!("{:.2}%", rate_to_percent(rate).round_dp(2))
}

/// Render a rate compactly: whole percentages without decimals ("3%"),
/// otherwise two decimals ("2.50%").
pub fn format_rate_pct_compact(rate: Rate) -> String {
    let pct = rate_to_percent(rate);
    if pct.fract().is_zero() {
        format!("{}%", pct.trunc().normalize())
    } else {
        format!("{:.2}%", pct.round_dp(2))
    }
}
