use napi::Result as NapiResult;
use napi_derive::napi;

use loansim_core::schedule::{self, LoanTerms, ScheduleInput};
use loansim_core::time_value::level_payment;

/// Convert any Display error into a napi::Error.
fn to_napi_error(e: impl std::fmt::Display) -> napi::Error {
    napi::Error::from_reason(e.to_string())
}

/// Compute a full amortisation schedule from a JSON `ScheduleInput`.
/// Degenerate inputs come back as an empty schedule with warnings, so
/// the caller can treat "no rows" as its not-ready state.
#[napi]
pub fn compute_schedule(input_json: String) -> NapiResult<String> {
    let input: ScheduleInput = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    let output = schedule::compute_schedule(&input);
    serde_json::to_string(&output).map_err(to_napi_error)
}

/// Baseline monthly payment for a JSON `LoanTerms`, without building
/// the whole schedule.
#[napi]
pub fn baseline_payment(input_json: String) -> NapiResult<String> {
    let terms: LoanTerms = serde_json::from_str(&input_json).map_err(to_napi_error)?;
    terms.validate().map_err(to_napi_error)?;

    let pmt = level_payment(terms.principal, terms.monthly_rate(), terms.term_months);
    serde_json::to_string(&serde_json::json!({ "baseline_pmt": pmt })).map_err(to_napi_error)
}
