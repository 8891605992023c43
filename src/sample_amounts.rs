//! Fill-amount ladders used to probe a venue's price curve at several depths.
//!
//! Amounts follow a geometric distribution: `N` weights `b^0..b^(N-1)` are
//! normalised to sum to one, accumulated, scaled by the maximum fill amount
//! and rounded up. The last amount is always exactly the maximum.

use ethers::types::{U256, U512};
use rust_decimal::Decimal;

use crate::errors::{SamplerError, SamplerResult};

/// Linearly spaced amounts (`b = 1`).
pub fn get_sample_amounts(max_fill_amount: U256, num_samples: usize) -> Vec<U256> {
    let den = U256::from(num_samples);
    let fractions = (1..=num_samples).map(|i| (U256::from(i), den)).collect::<Vec<_>>();
    amounts_from_fractions(max_fill_amount, &fractions)
}

/// Geometrically spaced amounts with base `exp_base` (must be `>= 1`).
pub fn get_sample_amounts_with_base(
    max_fill_amount: U256,
    num_samples: usize,
    exp_base: Decimal,
) -> SamplerResult<Vec<U256>> {
    if exp_base < Decimal::ONE {
        return Err(SamplerError::InvalidSampleDistribution(format!(
            "base {} is below 1",
            exp_base
        )));
    }
    if exp_base == Decimal::ONE {
        return Ok(get_sample_amounts(max_fill_amount, num_samples));
    }

    let mut weights = Vec::with_capacity(num_samples);
    let mut weight = Decimal::ONE;
    for i in 0..num_samples {
        if i > 0 {
            weight = weight.checked_mul(exp_base).ok_or_else(|| {
                SamplerError::InvalidSampleDistribution(format!(
                    "base {} overflows at {} samples",
                    exp_base, num_samples
                ))
            })?;
        }
        weights.push(weight);
    }

    let total = weights
        .iter()
        .try_fold(Decimal::ZERO, |acc, w| acc.checked_add(*w))
        .ok_or_else(|| SamplerError::InvalidSampleDistribution("weight sum overflows".into()))?;

    let mut cumulative = Decimal::ZERO;
    let mut fractions = Vec::with_capacity(num_samples);
    for w in weights {
        cumulative += w;
        fractions.push(decimal_fraction(cumulative, total));
    }
    Ok(amounts_from_fractions(max_fill_amount, &fractions))
}

/// `a / b` as an exact integer fraction, both operands being positive.
fn decimal_fraction(a: Decimal, b: Decimal) -> (U256, U256) {
    // a = am / 10^as, b = bm / 10^bs  =>  a / b = am * 10^bs / (bm * 10^as)
    let am = U256::from(a.mantissa().unsigned_abs());
    let bm = U256::from(b.mantissa().unsigned_abs());
    let num = am * U256::exp10(b.scale() as usize);
    let den = bm * U256::exp10(a.scale() as usize);
    (num, den)
}

fn amounts_from_fractions(max_fill_amount: U256, fractions: &[(U256, U256)]) -> Vec<U256> {
    let n = fractions.len();
    let mut amounts = Vec::with_capacity(n);
    let mut prev = U256::zero();
    for (i, (num, den)) in fractions.iter().enumerate() {
        if i == n - 1 {
            amounts.push(max_fill_amount);
            break;
        }
        let mut amount = mul_div_ceil(max_fill_amount, *num, *den);
        // Keep the ladder strictly increasing while leaving room for the
        // remaining steps. With fewer units than samples this degrades to
        // non-decreasing.
        let remaining = U256::from(n - 1 - i);
        let lower = prev.saturating_add(U256::one());
        if max_fill_amount >= remaining && lower <= max_fill_amount - remaining {
            let upper = max_fill_amount - remaining;
            amount = amount.max(lower).min(upper);
        } else {
            amount = amount.max(prev).min(max_fill_amount);
        }
        prev = amount;
        amounts.push(amount);
    }
    amounts
}

fn mul_div_ceil(value: U256, num: U256, den: U256) -> U256 {
    if den.is_zero() {
        return value;
    }
    let product: U512 = value.full_mul(num);
    let den = U512::from(den);
    let rounded = (product + den - U512::one()) / den;
    U256::try_from(rounded).unwrap_or(U256::MAX)
}
