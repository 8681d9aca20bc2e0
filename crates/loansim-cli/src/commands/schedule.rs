use clap::Args;
use rust_decimal::Decimal;
use serde_json::Value;

use loansim_core::schedule::{self, LoanTerms, Overrides, ScheduleInput};

use crate::input;

/// Arguments for a full schedule run
#[derive(Args)]
pub struct ScheduleArgs {
    /// Path to a JSON or YAML input file (overrides individual flags)
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

    /// One-off payment override as period=amount; may be repeated
    #[arg(long = "override", value_name = "PERIOD=AMOUNT", value_parser = parse_override)]
    pub overrides: Vec<(u32, Decimal)>,
}

fn parse_override(s: &str) -> Result<(u32, Decimal), String> {
    let (period, amount) = s
        .split_once('=')
        .ok_or_else(|| format!("expected period=amount, got '{s}'"))?;

    let period: u32 = period
        .trim()
        .parse()
        .map_err(|_| format!("invalid period '{period}'"))?;
    if period == 0 {
        return Err("period numbers start at 1".into());
    }

    let amount: Decimal = amount
        .trim()
        .parse()
        .map_err(|_| format!("invalid amount '{amount}'"))?;
    if amount < Decimal::ZERO {
        return Err("override amount cannot be negative".into());
    }

    Ok((period, amount))
}

pub fn run_schedule(args: ScheduleArgs) -> Result<Value, Box<dyn std::error::Error>> {
    let mut schedule_input: ScheduleInput = if let Some(ref path) = args.input {
        input::file::read_input(path)?
    } else if let Some(data) = input::stdin::read_stdin()? {
        serde_json::from_value(data)?
    } else {
        ScheduleInput {
            terms: LoanTerms {
                principal: args
                    .principal
                    .ok_or("--principal is required (or provide --input)")?,
                annual_rate_percent: args
                    .annual_rate
                    .ok_or("--annual-rate is required (or provide --input)")?,
                term_months: args
                    .term_months
                    .ok_or("--term-months is required (or provide --input)")?,
            },
            overrides: Overrides::new(),
        }
    };

    // Flag overrides apply on top of whatever the file or stdin carried
    for (period, amount) in &args.overrides {
        schedule_input.overrides.set(*period, *amount);
    }

    let output = schedule::compute_schedule(&schedule_input);

    // Derived aggregates belong to the caller, not the engine
    let total_interest = output.result.total_interest();
    let balance_series = output.result.balance_series();

    let mut value = serde_json::to_value(&output)?;
    if let Some(result) = value.get_mut("result") {
        result["total_interest"] = serde_json::to_value(total_interest)?;
        result["balance_series"] = serde_json::to_value(&balance_series)?;
    }
    Ok(value)
}
