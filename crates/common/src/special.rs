use std::f64::consts::PI;

use crate::error::Error;

/// Above this argument the asymptotic expansion is used instead of the power series.
const SERIES_LIMIT: f64 = 30.0;

const MAX_TERMS: usize = 500;

/// Power series sum of I0, `sum (x^2/4)^k / (k!)^2`.
fn i0_power_series(x: f64) -> f64 {
    let quarter_x_sqr = 0.25 * x * x;
    let mut term = 1.0;
    let mut sum = 1.0;

    for k in 1..MAX_TERMS {
        let k = k as f64;
        term *= quarter_x_sqr / (k * k);
        sum += term;

        if term < f64::EPSILON * 0.5 * sum {
            break;
        }
    }

    sum
}

/// Sum of the large argument expansion, `I0(x) ~ e^x / sqrt(2 pi x) * sum`.
fn i0_asymptotic_sum(x: f64) -> f64 {
    let mut term = 1.0;
    let mut sum = 1.0;

    for k in 1..MAX_TERMS {
        let two_k_minus_one = (2 * k - 1) as f64;
        let next = term * two_k_minus_one * two_k_minus_one / (k as f64 * 8.0 * x);

        // The series is only asymptotic, stop once the terms start growing.
        if next >= term {
            break;
        }

        term = next;
        sum += term;

        if term < f64::EPSILON * 0.5 * sum {
            break;
        }
    }

    sum
}

/// Exponentially scaled modified Bessel function of the first kind, `e^-|x| I0(x)`.
///
/// Never overflows, which makes it the building block for evaluating I0 in
/// extended exponent arithmetic.
pub fn bessel_i0_scaled(x: f64) -> Result<f64, Error> {
    if !x.is_finite() {
        return Err(Error::NonFiniteResult("bessel_i0_scaled"));
    }

    let x = x.abs();

    if x <= SERIES_LIMIT {
        Ok(i0_power_series(x) * (-x).exp())
    } else {
        Ok(i0_asymptotic_sum(x) / (2.0 * PI * x).sqrt())
    }
}

/// Modified Bessel function of the first kind of order zero.
///
/// # Errors
/// Returns `Error::BesselOverflow` when the result exceeds the double range and
/// `Error::NonFiniteResult` for a non-finite argument.
pub fn bessel_i0(x: f64) -> Result<f64, Error> {
    if !x.is_finite() {
        return Err(Error::NonFiniteResult("bessel_i0"));
    }

    let x = x.abs();

    if x <= SERIES_LIMIT {
        return Ok(i0_power_series(x));
    }

    let sum = i0_asymptotic_sum(x);
    let log_value = x - 0.5 * (2.0 * PI * x).ln() + sum.ln();

    if log_value >= f64::MAX.ln() {
        return Err(Error::BesselOverflow(x));
    }

    Ok(x.exp() / (2.0 * PI * x).sqrt() * sum)
}
