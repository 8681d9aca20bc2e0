use rust_decimal::Decimal;
use rust_decimal::MathematicalOps;
use rust_decimal_macros::dec;

use crate::types::{Money, Rate};

/// Periodic rates closer to zero than this are treated as exactly zero,
/// so the annuity denominator never degenerates.
const ZERO_RATE_EPSILON: Decimal = dec!(0.000000000001);

/// Level payment that fully amortises `pv` over `periods` at `rate` per
/// period.
///
/// Zero periods yield a zero payment. A near-zero rate falls back to
/// straight-line repayment (`pv / periods`); otherwise the standard
/// annuity formula `rate * pv / (1 - (1 + rate)^(-periods))` applies.
pub fn level_payment(pv: Money, rate: Rate, periods: u32) -> Money {
    if periods == 0 {
        return Decimal::ZERO;
    }

    if rate.abs() < ZERO_RATE_EPSILON {
        return pv / Decimal::from(periods);
    }

    let factor = (Decimal::ONE + rate).powd(Decimal::from(periods));
    rate * pv / (Decimal::ONE - Decimal::ONE / factor)
}
