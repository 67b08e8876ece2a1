use std::f64::consts::LN_2;

/// Minimal real arithmetic needed to evaluate products of exponentials that
/// underflow in double precision.
pub trait HighPrecisionReal: Sized + Copy {
    fn from_f64(value: f64) -> Self;

    /// `e^x` without underflow or overflow of the intermediate result.
    fn exp(x: f64) -> Self;

    fn mul(self, other: Self) -> Self;

    /// Narrows back to double precision, flushing to zero or infinity outside the range.
    fn to_f64(self) -> f64;
}

/// A double mantissa in `[0.5, 1)` paired with an unbounded binary exponent.
///
/// Precision is that of an `f64`, the exponent range is that of an `i64`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtendedExponentFloat {
    mantissa: f64,
    exponent: i64,
}

// Cody-Waite split of ln(2): the high part has trailing zero bits so `k * LN2_HI` is exact.
const LN2_HI: f64 = 6.931_471_803_691_238_164_90e-1;
const LN2_LO: f64 = 1.908_214_929_270_587_700_02e-10;

const EXPONENT_MASK: u64 = 0x7ff << 52;

/// Splits a finite non-zero `x` into `m * 2^e` with `0.5 <= |m| < 1`.
fn frexp(x: f64) -> (f64, i64) {
    if x == 0.0 || !x.is_finite() {
        return (x, 0);
    }

    let bits = x.to_bits();
    let biased = ((bits & EXPONENT_MASK) >> 52) as i64;

    if biased == 0 {
        // Subnormal, normalize first.
        let (m, e) = frexp(x * 2f64.powi(54));
        return (m, e - 54);
    }

    let mantissa = f64::from_bits((bits & !EXPONENT_MASK) | (1022u64 << 52));
    (mantissa, biased - 1022)
}

/// `2^k` for `k` in the normal exponent range.
fn pow2(k: i64) -> f64 {
    debug_assert!((-1022..=1023).contains(&k));
    f64::from_bits(((k + 1023) as u64) << 52)
}

/// `m * 2^e`, rounding once at the end.
fn ldexp(m: f64, e: i64) -> f64 {
    if m == 0.0 || !m.is_finite() {
        return m;
    }
    if e > 1024 {
        return f64::INFINITY.copysign(m);
    }
    if e < -1080 {
        return 0.0f64.copysign(m);
    }

    let half = e / 2;
    m * pow2(half) * pow2(e - half)
}

impl ExtendedExponentFloat {
    /// Natural logarithm, finite even when the value is outside the double range.
    pub fn ln(&self) -> f64 {
        self.mantissa.ln() + self.exponent as f64 * LN_2
    }

    fn normalized(mantissa: f64, exponent: i64) -> Self {
        if mantissa == 0.0 {
            return Self {
                mantissa: 0.0,
                exponent: 0,
            };
        }

        let (m, e) = frexp(mantissa);
        Self {
            mantissa: m,
            exponent: exponent + e,
        }
    }
}

impl HighPrecisionReal for ExtendedExponentFloat {
    fn from_f64(value: f64) -> Self {
        Self::normalized(value, 0)
    }

    fn exp(x: f64) -> Self {
        if x.is_nan() {
            return Self {
                mantissa: f64::NAN,
                exponent: 0,
            };
        }

        let k = (x / LN_2).floor();
        let remainder = (x - k * LN2_HI) - k * LN2_LO;

        Self::normalized(remainder.exp(), k as i64)
    }

    fn mul(self, other: Self) -> Self {
        Self::normalized(self.mantissa * other.mantissa, self.exponent + other.exponent)
    }

    fn to_f64(self) -> f64 {
        ldexp(self.mantissa, self.exponent)
    }
}
