use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use loan_quote_core::btl;
use loan_quote_core::product::{LoanType, ProductKind, ProductSelector, RateRecord};
use loan_quote_core::request::BtlRequest;
use loan_quote_core::{CalculationInput, EngineConfig};

use crate::input;

/// Arguments for a BTL quote
#[derive(Args)]
#[command(allow_hyphen_values = true)]
pub struct BtlArgs {
    /// Request file (JSON or YAML) with input/form and record/rate_row sections
    #[arg(long)]
    pub input: Option<String>,

    /// max_ltv, specific_gross, specific_net or specific_ltv
    #[arg(long, default_value = "max_ltv")]
    pub loan_type: String,

    /// core or specialist
    #[arg(long, default_value = "specialist")]
    pub range: String,

    /// residential, commercial or semi-commercial
    #[arg(long, default_value = "residential")]
    pub property_type: String,

    /// Product type label, e.g. "2yr Fix" or "2yr Tracker"
    #[arg(long, default_value = "2yr Fix")]
    pub product: String,

    #[arg(long)]
    pub property_value: Option<Decimal>,

    /// Monthly rent
    #[arg(long)]
    pub rent: Option<Decimal>,

    /// Monthly top-slicing income
    #[arg(long)]
    pub top_slicing: Option<Decimal>,

    #[arg(long)]
    pub gross_loan: Option<Decimal>,

    #[arg(long)]
    pub net_loan: Option<Decimal>,

    /// Requested LTV (e.g. 0.75)
    #[arg(long)]
    pub target_ltv: Option<Decimal>,

    /// Product fee (e.g. 0.02 for 2%)
    #[arg(long)]
    pub fee: Option<Decimal>,

    /// Coupon for fixes, margin over base rate for trackers (e.g. 0.065)
    #[arg(long)]
    pub rate: Option<Decimal>,

    #[arg(long)]
    pub max_ltv: Option<Decimal>,

    /// Minimum ICR (e.g. 1.45)
    #[arg(long)]
    pub min_icr: Option<Decimal>,

    #[arg(long)]
    pub term_months: Option<u32>,

    #[arg(long)]
    pub max_rolled_months: Option<u32>,

    /// Maximum deferred rate (e.g. 0.015)
    #[arg(long)]
    pub max_deferred: Option<Decimal>,

    /// Manual rolled months
    #[arg(long)]
    pub rolled: Option<u32>,

    /// Manual deferred rate
    #[arg(long)]
    pub deferred: Option<Decimal>,
}

/// Arguments for a fee-column comparison
#[derive(Args)]
pub struct FeeColumnsArgs {
    #[command(flatten)]
    pub btl: BtlArgs,
}

impl BtlArgs {
    fn request(&self) -> Result<(CalculationInput, RateRecord), Box<dyn std::error::Error>> {
        if let Some(request) = input::read_request::<BtlRequest>(self.input.as_deref())? {
            return Ok(request.resolve()?);
        }
        let rate = self
            .rate
            .ok_or("--rate is required without --input or stdin")?;

        let loan_type: LoanType = self.loan_type.parse()?;
        let product = ProductSelector::new(self.range.parse()?, self.property_type.parse()?);
        let mut calc = CalculationInput::new(loan_type, product);
        calc.property_value = self.property_value;
        calc.monthly_rent = self.rent;
        calc.top_slicing = self.top_slicing;
        calc.specific_gross_loan = self.gross_loan;
        calc.specific_net_loan = self.net_loan;
        calc.target_ltv = self.target_ltv;
        calc.product_fee_pct = self.fee;
        calc.product_type = Some(self.product.clone());
        calc.manual_rolled_months = self.rolled;
        calc.manual_deferred_rate = self.deferred;

        let mut record = RateRecord::new(ProductKind::from_product_type(&self.product), rate);
        record.max_ltv = self.max_ltv;
        record.min_icr = self.min_icr;
        record.term_months = self.term_months;
        record.max_rolled_months = self.max_rolled_months;
        record.max_deferred_rate = self.max_deferred;
        record.product_fee = self.fee;
        Ok((calc, record))
    }
}

pub fn run_btl(args: BtlArgs, config: &EngineConfig) -> Result<Value, Box<dyn std::error::Error>> {
    let (calc, record) = args.request()?;
    let result = btl::evaluate(&calc, &record, config)?;
    Ok(serde_json::to_value(result)?)
}

pub fn run_fee_columns(
    args: FeeColumnsArgs,
    config: &EngineConfig,
) -> Result<Value, Box<dyn std::error::Error>> {
    let (calc, record) = args.btl.request()?;
    let result = btl::evaluate_fee_columns(&calc, &record, config)?;
    Ok(serde_json::to_value(result)?)
}
