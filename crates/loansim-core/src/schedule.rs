//! Re-amortising level-payment loan schedules with one-off overrides.
//!
//! Any period's payment can be replaced with a caller-supplied amount.
//! The override applies to that period only; the remaining horizon is
//! then re-amortised so the loan still ends on the original month. All
//! math in `rust_decimal::Decimal`.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Instant;

use crate::error::LoanSimError;
use crate::time_value::level_payment;
use crate::types::{with_metadata, ComputationOutput, Money, Rate};
use crate::LoanSimResult;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Ending balances below this are collapsed to exactly zero.
const BALANCE_EPSILON: Decimal = dec!(0.00000001);

/// Terms beyond this many months are accepted but flagged.
const LONG_TERM_MONTHS: u32 = 600;

const METHODOLOGY: &str = "Re-amortising level-payment schedule with one-off overrides";

// ---------------------------------------------------------------------------
// Input types
// ---------------------------------------------------------------------------

/// Core loan parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanTerms {
    /// Amount borrowed.
    pub principal: Money,
    /// Nominal annual rate as a percentage (7.2 = 7.2%).
    pub annual_rate_percent: Rate,
    /// Term in months.
    pub term_months: u32,
}

impl LoanTerms {
    /// Periodic rate: the annual percentage divided by 100, then by 12.
    pub fn monthly_rate(&self) -> Rate {
        self.annual_rate_percent / dec!(100) / dec!(12)
    }

    /// Check the terms describe a computable loan.
    pub fn validate(&self) -> LoanSimResult<()> {
        if self.principal <= Decimal::ZERO {
            return Err(LoanSimError::InvalidInput {
                field: "principal".into(),
                reason: "Principal must be positive".into(),
            });
        }
        if self.term_months == 0 {
            return Err(LoanSimError::InvalidInput {
                field: "term_months".into(),
                reason: "Term must be greater than zero".into(),
            });
        }
        if self.annual_rate_percent < Decimal::ZERO {
            return Err(LoanSimError::InvalidInput {
                field: "annual_rate_percent".into(),
                reason: "Annual rate cannot be negative".into(),
            });
        }
        Ok(())
    }
}

/// One-off payment overrides keyed by period number (1-based).
///
/// An entry replaces the suggested payment for that period only. Clearing
/// removes the entry outright; an explicit override of zero is a real
/// payment of zero, not an absence. Periods outside the loan term are
/// inert: the engine never consults them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Overrides(BTreeMap<u32, Money>);

impl Overrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an override. Declines period 0 and negative amounts, leaving
    /// the map untouched; returns whether the value was stored.
    pub fn set(&mut self, period: u32, amount: Money) -> bool {
        if period == 0 || amount < Decimal::ZERO {
            return false;
        }
        self.0.insert(period, amount);
        true
    }

    /// Remove the override at `period`, returning it if one was present.
    pub fn clear(&mut self, period: u32) -> Option<Money> {
        self.0.remove(&period)
    }

    /// Remove every override.
    pub fn clear_all(&mut self) {
        self.0.clear();
    }

    pub fn get(&self, period: u32) -> Option<Money> {
        self.0.get(&period).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, Money)> + '_ {
        self.0.iter().map(|(period, amount)| (*period, *amount))
    }
}

/// Engine input: loan terms plus the caller-owned override map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleInput {
    pub terms: LoanTerms,
    #[serde(default)]
    pub overrides: Overrides,
}

// ---------------------------------------------------------------------------
// Output types
// ---------------------------------------------------------------------------

/// A single period of the schedule. Rows are produced fresh on every
/// recomputation and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleRow {
    /// Period number, 1-based.
    pub period: u32,
    /// Balance at the start of the period.
    pub beginning_balance: Money,
    /// Interest accrued this period (periodic rate times beginning balance).
    pub interest_accrued: Money,
    /// Payment actually applied: the override if present, else the
    /// suggested payment, clamped so it cannot overshoot the payoff.
    pub payment_applied: Money,
    /// Balance carried into the next period.
    pub ending_balance: Money,
    /// The equal payment in force entering this period.
    pub suggested_payment: Money,
}

/// A point of the balance-over-time series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalancePoint {
    pub period: u32,
    pub ending_balance: Money,
}

/// Full schedule output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleOutput {
    /// Equal payment over the full original term, ignoring overrides.
    pub baseline_pmt: Money,
    /// One row per period, 1..=term_months. Empty when the inputs are
    /// not ready to compute.
    pub rows: Vec<ScheduleRow>,
}

impl ScheduleOutput {
    /// Total interest accrued across all periods.
    pub fn total_interest(&self) -> Money {
        self.rows.iter().map(|row| row.interest_accrued).sum()
    }

    /// Ending balance per period, the chart series consumed by callers.
    pub fn balance_series(&self) -> Vec<BalancePoint> {
        self.rows
            .iter()
            .map(|row| BalancePoint {
                period: row.period,
                ending_balance: row.ending_balance,
            })
            .collect()
    }
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// Compute the full amortisation schedule for the given input.
///
/// Degenerate inputs (non-positive principal or term, negative rate) do
/// not error: the output carries a zero baseline and no rows, with the
/// reason in `warnings`. Callers treat an empty row set as the canonical
/// "not ready" signal.
pub fn compute_schedule(input: &ScheduleInput) -> ComputationOutput<ScheduleOutput> {
    let start = Instant::now();
    let mut warnings: Vec<String> = Vec::new();

    if let Err(reason) = input.terms.validate() {
        warnings.push(format!("{reason}; schedule not computed"));
        let elapsed = start.elapsed().as_micros() as u64;
        return with_metadata(
            METHODOLOGY,
            input,
            warnings,
            elapsed,
            ScheduleOutput {
                baseline_pmt: Decimal::ZERO,
                rows: Vec::new(),
            },
        );
    }

    let n = input.terms.term_months;
    if n > LONG_TERM_MONTHS {
        warnings.push(format!("Term of {n} months is unusually long"));
    }

    let r = input.terms.monthly_rate();

    // Fixed against the full original term; overrides never move it.
    let baseline_pmt = level_payment(input.terms.principal, r, n);

    let mut rows = Vec::with_capacity(n as usize);
    let mut bal = input.terms.principal;
    let mut active_pmt = baseline_pmt;

    for k in 1..=n {
        let beginning = bal;
        let interest = r * beginning;

        let mut payment = input.overrides.get(k).unwrap_or(active_pmt);

        // A payment may close the loan this period, but never overshoot it.
        let max_to_close = beginning * (Decimal::ONE + r);
        if payment > max_to_close {
            payment = max_to_close;
        }

        let mut ending = beginning + interest - payment;
        if ending < BALANCE_EPSILON {
            ending = Decimal::ZERO;
        }

        rows.push(ScheduleRow {
            period: k,
            beginning_balance: beginning,
            interest_accrued: interest,
            payment_applied: payment,
            ending_balance: ending,
            suggested_payment: active_pmt,
        });

        bal = ending;
        let remaining = n - k;

        // Re-amortise the remaining horizon after every period, overridden
        // or not, so the equal payment always tracks the balance actually
        // carried forward.
        if remaining > 0 {
            active_pmt = level_payment(bal, r, remaining);
        }
    }

    let elapsed = start.elapsed().as_micros() as u64;
    with_metadata(
        METHODOLOGY,
        input,
        warnings,
        elapsed,
        ScheduleOutput { baseline_pmt, rows },
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const TOL: Decimal = dec!(0.01);

    fn assert_close(actual: Decimal, expected: Decimal, tol: Decimal, msg: &str) {
        let diff = (actual - expected).abs();
        assert!(
            diff <= tol,
            "{}: expected ~{}, got {} (diff = {})",
            msg,
            expected,
            actual,
            diff
        );
    }

    fn thirty_year_mortgage() -> ScheduleInput {
        ScheduleInput {
            terms: LoanTerms {
                principal: dec!(200_000),
                annual_rate_percent: dec!(7.2),
                term_months: 360,
            },
            overrides: Overrides::new(),
        }
    }

    fn small_loan() -> ScheduleInput {
        // 10k at 12% over a year: 1% per month, round numbers throughout
        ScheduleInput {
            terms: LoanTerms {
                principal: dec!(10_000),
                annual_rate_percent: dec!(12),
                term_months: 12,
            },
            overrides: Overrides::new(),
        }
    }

    // -----------------------------------------------------------------------
    // 1. Monthly rate derivation
    // -----------------------------------------------------------------------
    #[test]
    fn test_monthly_rate() {
        let input = thirty_year_mortgage();
        assert_eq!(input.terms.monthly_rate(), dec!(0.006));
    }

    // -----------------------------------------------------------------------
    // 2. Schedule has one row per period
    // -----------------------------------------------------------------------
    #[test]
    fn test_schedule_length() {
        let out = compute_schedule(&thirty_year_mortgage());
        assert_eq!(out.result.rows.len(), 360);
    }

    // -----------------------------------------------------------------------
    // 3. First row of the worked 30-year example
    // -----------------------------------------------------------------------
    #[test]
    fn test_thirty_year_first_row() {
        let out = compute_schedule(&thirty_year_mortgage());
        let first = &out.result.rows[0];

        assert_close(out.result.baseline_pmt, dec!(1357.58), TOL, "baseline PMT");
        assert_eq!(first.beginning_balance, dec!(200_000));
        assert_eq!(first.interest_accrued, dec!(1200));
        assert_close(first.ending_balance, dec!(199_842.42), TOL, "first ending");
        assert_eq!(first.suggested_payment, out.result.baseline_pmt);
    }

    // -----------------------------------------------------------------------
    // 4. Ending balance snaps to exactly zero at maturity
    // -----------------------------------------------------------------------
    #[test]
    fn test_fully_amortises_to_zero() {
        let out = compute_schedule(&thirty_year_mortgage());
        let last = out.result.rows.last().unwrap();
        assert_eq!(last.ending_balance, Decimal::ZERO);
    }

    // -----------------------------------------------------------------------
    // 5. Suggested payment barely drifts without overrides
    // -----------------------------------------------------------------------
    #[test]
    fn test_no_override_suggested_stays_on_baseline() {
        let out = compute_schedule(&thirty_year_mortgage());
        for row in &out.result.rows {
            assert_close(
                row.suggested_payment,
                out.result.baseline_pmt,
                dec!(0.000001),
                &format!("suggested payment at period {}", row.period),
            );
        }
    }

    // -----------------------------------------------------------------------
    // 6. Override replaces exactly one payment
    // -----------------------------------------------------------------------
    #[test]
    fn test_override_applies_to_its_period_only() {
        let mut input = small_loan();
        assert!(input.overrides.set(3, dec!(2_000)));

        let base = compute_schedule(&small_loan());
        let out = compute_schedule(&input);

        // Periods before the override are untouched
        assert_eq!(out.result.rows[0], base.result.rows[0]);
        assert_eq!(out.result.rows[1], base.result.rows[1]);

        let hit = &out.result.rows[2];
        assert_eq!(hit.payment_applied, dec!(2_000));
        assert_eq!(
            hit.ending_balance,
            hit.beginning_balance + hit.interest_accrued - dec!(2_000)
        );

        // The horizon after the override re-amortises downwards
        assert_close(
            out.result.rows[3].suggested_payment,
            dec!(758.73),
            TOL,
            "re-amortised payment",
        );
        assert!(out.result.rows[3].suggested_payment < base.result.rows[3].suggested_payment);

        // The loan still ends on the original month
        assert_eq!(out.result.rows.last().unwrap().ending_balance, Decimal::ZERO);
    }

    // -----------------------------------------------------------------------
    // 7. Oversized override clamps to the payoff amount
    // -----------------------------------------------------------------------
    #[test]
    fn test_override_clamps_to_max_to_close() {
        let mut input = small_loan();
        input.overrides.set(1, dec!(1_000_000));
        let out = compute_schedule(&input);

        let first = &out.result.rows[0];
        // max_to_close = 10_000 * 1.01
        assert_eq!(first.payment_applied, dec!(10_100));
        assert_eq!(first.ending_balance, Decimal::ZERO);

        // Everything after the payoff is a zero row
        for row in &out.result.rows[1..] {
            assert_eq!(row.beginning_balance, Decimal::ZERO);
            assert_eq!(row.interest_accrued, Decimal::ZERO);
            assert_eq!(row.payment_applied, Decimal::ZERO);
            assert_eq!(row.ending_balance, Decimal::ZERO);
        }
    }

    // -----------------------------------------------------------------------
    // 8. Zero-rate loans repay straight-line with no interest
    // -----------------------------------------------------------------------
    #[test]
    fn test_zero_rate_straight_line() {
        let input = ScheduleInput {
            terms: LoanTerms {
                principal: dec!(120_000),
                annual_rate_percent: Decimal::ZERO,
                term_months: 12,
            },
            overrides: Overrides::new(),
        };
        let out = compute_schedule(&input);

        assert_eq!(out.result.baseline_pmt, dec!(10_000));
        for row in &out.result.rows {
            assert_eq!(row.interest_accrued, Decimal::ZERO);
            assert_eq!(row.payment_applied, dec!(10_000));
        }
        assert_eq!(out.result.rows.last().unwrap().ending_balance, Decimal::ZERO);
    }

    // -----------------------------------------------------------------------
    // 9. An override of zero is a skipped payment, not an absence
    // -----------------------------------------------------------------------
    #[test]
    fn test_zero_override_grows_the_balance() {
        let mut input = small_loan();
        input.overrides.set(2, Decimal::ZERO);
        let out = compute_schedule(&input);

        let skipped = &out.result.rows[1];
        assert_eq!(skipped.payment_applied, Decimal::ZERO);
        assert_eq!(
            skipped.ending_balance,
            skipped.beginning_balance + skipped.interest_accrued
        );
        assert!(skipped.ending_balance > skipped.beginning_balance);

        // Still fully amortises by the original maturity
        assert_eq!(out.result.rows.last().unwrap().ending_balance, Decimal::ZERO);
    }

    // -----------------------------------------------------------------------
    // 10. Overrides outside the term are inert
    // -----------------------------------------------------------------------
    #[test]
    fn test_out_of_range_override_is_inert() {
        let mut input = small_loan();
        input.overrides.set(99, dec!(5_000));
        let out = compute_schedule(&input);
        let base = compute_schedule(&small_loan());
        assert_eq!(out.result.rows, base.result.rows);
    }

    // -----------------------------------------------------------------------
    // 11. Degenerate inputs produce the empty "not ready" result
    // -----------------------------------------------------------------------
    #[test]
    fn test_invalid_inputs_yield_empty_schedule() {
        let cases = [
            LoanTerms {
                principal: Decimal::ZERO,
                annual_rate_percent: dec!(5),
                term_months: 12,
            },
            LoanTerms {
                principal: dec!(-1_000),
                annual_rate_percent: dec!(5),
                term_months: 12,
            },
            LoanTerms {
                principal: dec!(1_000),
                annual_rate_percent: dec!(5),
                term_months: 0,
            },
            LoanTerms {
                principal: dec!(1_000),
                annual_rate_percent: dec!(-5),
                term_months: 12,
            },
        ];

        for terms in cases {
            let input = ScheduleInput {
                terms,
                overrides: Overrides::new(),
            };
            let out = compute_schedule(&input);
            assert_eq!(out.result.baseline_pmt, Decimal::ZERO);
            assert!(out.result.rows.is_empty());
            assert!(!out.warnings.is_empty());
        }
    }

    // -----------------------------------------------------------------------
    // 12. Override map declines invalid writes
    // -----------------------------------------------------------------------
    #[test]
    fn test_override_map_contract() {
        let mut overrides = Overrides::new();

        assert!(!overrides.set(0, dec!(100)));
        assert!(!overrides.set(3, dec!(-1)));
        assert!(overrides.is_empty());

        assert!(overrides.set(3, dec!(250)));
        assert_eq!(overrides.get(3), Some(dec!(250)));
        assert_eq!(overrides.len(), 1);

        assert_eq!(overrides.clear(3), Some(dec!(250)));
        assert_eq!(overrides.get(3), None);
        assert!(overrides.is_empty());
    }

    // -----------------------------------------------------------------------
    // 13. Derived aggregates
    // -----------------------------------------------------------------------
    #[test]
    fn test_total_interest_and_balance_series() {
        let out = compute_schedule(&small_loan());

        let manual: Decimal = out.result.rows.iter().map(|r| r.interest_accrued).sum();
        assert_eq!(out.result.total_interest(), manual);
        assert_close(out.result.total_interest(), dec!(661.85), TOL, "total interest");

        let series = out.result.balance_series();
        assert_eq!(series.len(), out.result.rows.len());
        for (point, row) in series.iter().zip(out.result.rows.iter()) {
            assert_eq!(point.period, row.period);
            assert_eq!(point.ending_balance, row.ending_balance);
        }
    }

    // -----------------------------------------------------------------------
    // 14. Envelope carries methodology and the long-term warning
    // -----------------------------------------------------------------------
    #[test]
    fn test_envelope_metadata_and_warnings() {
        let out = compute_schedule(&thirty_year_mortgage());
        assert!(out.methodology.contains("level-payment"));
        assert_eq!(out.metadata.precision, "rust_decimal_128bit");
        assert!(out.warnings.is_empty());

        let long = ScheduleInput {
            terms: LoanTerms {
                principal: dec!(100_000),
                annual_rate_percent: dec!(4),
                term_months: 720,
            },
            overrides: Overrides::new(),
        };
        let out = compute_schedule(&long);
        assert!(out.warnings.iter().any(|w| w.contains("unusually long")));
        assert_eq!(out.result.rows.len(), 720);
    }

    // -----------------------------------------------------------------------
    // 15. Input round-trips through JSON with string period keys
    // -----------------------------------------------------------------------
    #[test]
    fn test_input_serde_round_trip() {
        let mut input = small_loan();
        input.overrides.set(4, dec!(1_500));

        let json = serde_json::to_string(&input).unwrap();
        let back: ScheduleInput = serde_json::from_str(&json).unwrap();
        assert_eq!(back, input);
        assert_eq!(back.overrides.get(4), Some(dec!(1_500)));
    }
}
