use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use loan_quote_core::bridging::{self, BridgingInput};
use loan_quote_core::product::{ProductKind, RateRecord};
use loan_quote_core::request::BridgingRequest;
use loan_quote_core::EngineConfig;

use crate::input;

/// Arguments for a bridge or Fusion quote
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct BridgingArgs {
    /// Request file (JSON or YAML) with input and record/rate_row sections
    #[arg(long)]
    pub input: Option<String>,

    /// bridge-fix, bridge-var or fusion
    #[arg(long, default_value = "bridge-fix")]
    pub product: String,

    /// Monthly coupon or margin for bridges, annual margin for Fusion
    #[arg(long)]
    pub rate: Option<Decimal>,

    /// Arrangement fee (e.g. 0.02)
    #[arg(long)]
    pub fee: Option<Decimal>,

    /// Fusion maximum deferred rate
    #[arg(long)]
    pub max_deferred: Option<Decimal>,

    #[arg(long)]
    pub gross_loan: Option<Decimal>,

    /// Solve the gross loan for this net amount
    #[arg(long)]
    pub net_loan: Option<Decimal>,

    #[arg(long)]
    pub property_value: Option<Decimal>,

    /// Monthly rent (Fusion ICR)
    #[arg(long)]
    pub rent: Option<Decimal>,

    #[arg(long)]
    pub term_months: Option<u32>,

    #[arg(long)]
    pub rolled: Option<u32>,

    /// Fusion deferred rate
    #[arg(long)]
    pub deferred: Option<Decimal>,
}

impl BridgingArgs {
    fn request(&self) -> Result<(BridgingInput, RateRecord), Box<dyn std::error::Error>> {
        if let Some(request) = input::read_request::<BridgingRequest>(self.input.as_deref())? {
            return Ok(request.resolve()?);
        }

        let rate = self
            .rate
            .ok_or("--rate is required without --input or stdin")?;
        let mut record = RateRecord::new(ProductKind::from_product_type(&self.product), rate);
        record.product_fee = self.fee;
        record.max_deferred_rate = self.max_deferred;

        let input = BridgingInput {
            gross_loan: self.gross_loan,
            specific_net_loan: self.net_loan,
            property_value: self.property_value,
            monthly_rent: self.rent,
            term_months: self.term_months,
            rolled_months: self.rolled,
            deferred_rate: self.deferred,
            ..Default::default()
        };
        Ok((input, record))
    }
}

pub fn run_bridging(
    args: BridgingArgs,
    config: &EngineConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let (bridge_input, record) = args.request()?;
    let result = bridging::calculate_bridging_quote(&bridge_input, &record, config)?;
    Ok(serde_json::to_value(result)?)
}
