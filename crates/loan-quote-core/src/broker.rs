//! Broker commission (proc fee), broker fee and broker client fee resolution.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::BrokerCommissionConfig;
use crate::numeric::{clamp_decimal, positive};
use crate::types::{Money, Rate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientType {
    Direct,
    Broker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BrokerRoute {
    DirectBroker,
    MortgageClub,
    Network,
    Packager,
}

/// How an additional broker client fee is expressed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ClientFee {
    /// Fixed amount in pounds.
    Flat(Money),
    /// Fraction of the gross loan.
    Percentage(Rate),
}

/// Broker-side inputs attached to a quote request.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BrokerInputs {
    /// When absent the requested proc fee is used without route policy.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_type: Option<ClientType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route: Option<BrokerRoute>,
    /// Requested procuration fee (commission) as a fraction of gross.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proc_fee_pct: Option<Rate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broker_fee_pct: Option<Rate>,
    /// Takes precedence over `broker_fee_pct` when positive.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub broker_fee_flat: Option<Money>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_fee: Option<ClientFee>,
}

/// Resolved proc-fee percentage and whether the request had to be clamped.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProcFeeResolution {
    pub proc_fee_pct: Rate,
    pub clamped: bool,
}

/// Broker-side amounts for a given gross loan.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BrokerFees {
    pub proc_fee_pct: Rate,
    pub proc_fee_amount: Money,
    pub broker_fee_amount: Money,
    pub client_fee_amount: Money,
}

/// Resolve the procuration fee percentage.
///
/// Direct clients pay none. Broker clients on a known route start from the
/// route default and any requested value is held within default +/- tolerance.
/// Otherwise the requested value is taken as-is.
pub fn resolve_proc_fee_pct(
    broker: &BrokerInputs,
    config: &BrokerCommissionConfig,
) -> ProcFeeResolution {
    let requested_as_is = ProcFeeResolution {
        proc_fee_pct: broker.proc_fee_pct.unwrap_or(Decimal::ZERO).max(Decimal::ZERO),
        clamped: false,
    };

    let route = match (broker.client_type, broker.route) {
        (Some(ClientType::Direct), _) => {
            return ProcFeeResolution {
                proc_fee_pct: Decimal::ZERO,
                clamped: false,
            }
        }
        (Some(ClientType::Broker), Some(route)) => route,
        _ => return requested_as_is,
    };

    let default = config.default_for(route);
    match broker.proc_fee_pct {
        None => ProcFeeResolution {
            proc_fee_pct: default,
            clamped: false,
        },
        Some(requested) => {
            let lo = (default - config.tolerance).max(Decimal::ZERO);
            let hi = default + config.tolerance;
            let resolved = clamp_decimal(requested, lo, hi);
            ProcFeeResolution {
                proc_fee_pct: resolved,
                clamped: resolved != requested,
            }
        }
    }
}

/// Compute proc fee, broker fee and client fee amounts on `gross`.
///
/// Nothing is charged when there is no loan.
pub fn broker_fees(gross: Money, proc_fee_pct: Rate, broker: &BrokerInputs) -> BrokerFees {
    if gross <= Decimal::ZERO {
        return BrokerFees {
            proc_fee_pct,
            proc_fee_amount: Decimal::ZERO,
            broker_fee_amount: Decimal::ZERO,
            client_fee_amount: Decimal::ZERO,
        };
    }
    let proc_fee_amount = gross * proc_fee_pct;

    let broker_fee_amount = match positive(broker.broker_fee_flat) {
        Some(flat) => flat,
        None => gross * broker.broker_fee_pct.unwrap_or(Decimal::ZERO).max(Decimal::ZERO),
    };

    let client_fee_amount = match &broker.client_fee {
        Some(ClientFee::Flat(amount)) => (*amount).max(Decimal::ZERO),
        Some(ClientFee::Percentage(pct)) => gross * (*pct).max(Decimal::ZERO),
        None => Decimal::ZERO,
    };

    BrokerFees {
        proc_fee_pct,
        proc_fee_amount,
        broker_fee_amount,
        client_fee_amount,
    }
}
