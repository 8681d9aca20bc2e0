use clap::Args;
use rust_decimal::Decimal;
use serde_json::{json, Value};

use loansim_core::schedule::LoanTerms;
use loansim_core::time_value::level_payment;

use crate::input;

/// Arguments for the baseline payment calculation
#[derive(Args)]
pub struct PaymentArgs {
    /// Path to a JSON or YAML input file with loan terms
    #[arg(long)]
    pub input: Option<String>,

    /// Amount borrowed
    #[arg(long)]
    pub principal: Option<Decimal>,

    /// Nominal annual rate in percent (7.2 = 7.2%)
    #[arg(long, alias = "rate")]
    pub annual_rate: Option<Decimal>,

    /// Term in months
    #[arg(long, alias = "months")]
    pub term_months: Option<u32>,
}

pub fn run_payment(args: PaymentArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let terms: LoanTerms = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        LoanTerms {
            principal: args
                .principal
                .ok_or("--principal is required (or provide --input)")?,
            annual_rate_percent: args
                .annual_rate
                .ok_or("--annual-rate is required (or provide --input)")?,
            term_months: args
                .term_months
                .ok_or("--term-months is required (or provide --input)")?,
        }
    };

    terms.validate()?;

    let baseline_pmt = level_payment(terms.principal, terms.monthly_rate(), terms.term_months);
    Ok(json!({
        "baseline_pmt": baseline_pmt,
        "terms": terms,
    }))
}
