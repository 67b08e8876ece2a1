use common::error::Error;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Kronrod abscissae of the 15 point rule on `[0, 1]`, descending.
/// The odd entries are the 7 point Gauss abscissae.
const XGK: [f64; 8] = [
    0.991455371120812639206854697526329,
    0.949107912342758524526189684047851,
    0.864864423359769072789712788640926,
    0.741531185599394439863864773280788,
    0.586087235467691130294144845693013,
    0.405845151377397166906606412076961,
    0.207784955007898467600689403773245,
    0.000000000000000000000000000000000,
];

const WGK: [f64; 8] = [
    0.022935322010529224963732008058970,
    0.063092092629978553290700663189204,
    0.104790010322250183839876322541518,
    0.140653259715525918745189590510238,
    0.169004726639267902826583426598550,
    0.190350578064785409913256402421014,
    0.204432940075298892414161999234649,
    0.209482141084727828012999174891714,
];

const WG: [f64; 4] = [
    0.129484966168869693270611432679082,
    0.279705391489276667901467771423780,
    0.381830050505118944950369775488975,
    0.417959183673469387755102040816327,
];

pub const DEFAULT_SUBINTERVAL_LIMIT: usize = 1000;

/// Finest uniform partition tried when every node of the first rule sees a zero integrand.
const MAX_INITIAL_PARTITION: usize = 64;

/// Integral estimate and its absolute error estimate.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct QuadratureResult {
    pub value: f64,
    pub error_estimate: f64,
}

/// Outcome of a single 15 point rule application.
#[derive(Debug, Clone, Copy)]
struct RuleEvaluation {
    result: f64,
    error: f64,
    result_abs: f64,
    result_asc: f64,
}

#[derive(Debug, Clone, Copy)]
struct Bin {
    lower: f64,
    upper: f64,
    result: f64,
    error: f64,
}

// Max-heap on the error estimate.
impl PartialEq for Bin {
    fn eq(&self, other: &Self) -> bool {
        self.error.total_cmp(&other.error) == Ordering::Equal
    }
}

impl Eq for Bin {}

impl PartialOrd for Bin {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Bin {
    fn cmp(&self, other: &Self) -> Ordering {
        self.error.total_cmp(&other.error)
    }
}

/// QUADPACK style error rescaling.
fn rescale_error(error: f64, result_abs: f64, result_asc: f64) -> f64 {
    let mut error = error.abs();

    if result_asc != 0.0 && error != 0.0 {
        let scale = (200.0 * error / result_asc).powf(1.5);
        error = if scale < 1.0 {
            result_asc * scale
        } else {
            result_asc
        };
    }

    if result_abs > f64::MIN_POSITIVE / (50.0 * f64::EPSILON) {
        let min_error = 50.0 * f64::EPSILON * result_abs;
        if min_error > error {
            error = min_error;
        }
    }

    error
}

fn subinterval_too_small(a1: f64, a2: f64, b2: f64) -> bool {
    let tmp = (1.0 + 100.0 * f64::EPSILON) * (a2.abs() + 1000.0 * f64::MIN_POSITIVE);
    a1.abs() <= tmp && b2.abs() <= tmp
}

/// Adaptive Gauss-Kronrod (7/15) integrator, bisecting the subinterval with the
/// largest error estimate until the requested tolerance is met.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussKronrodIntegrator {
    relative_error_tol: f64,
    subinterval_limit: usize,
}

impl GaussKronrodIntegrator {
    pub fn new(relative_error_tol: f64) -> Self {
        Self {
            relative_error_tol,
            subinterval_limit: DEFAULT_SUBINTERVAL_LIMIT,
        }
    }

    pub fn with_subinterval_limit(mut self, subinterval_limit: usize) -> Self {
        self.subinterval_limit = subinterval_limit.max(1);
        self
    }

    pub fn relative_error_tol(&self) -> f64 {
        self.relative_error_tol
    }

    fn apply_rule<F>(integrand: &mut F, lower: f64, upper: f64) -> Result<RuleEvaluation, Error>
    where
        F: FnMut(f64) -> Result<f64, Error>,
    {
        let center = 0.5 * (lower + upper);
        let half_length = 0.5 * (upper - lower);
        let abs_half_length = half_length.abs();

        let f_center = integrand(center)?;
        let mut result_gauss = f_center * WG[3];
        let mut result_kronrod = f_center * WGK[7];
        let mut result_abs = result_kronrod.abs();

        let mut fv1 = [0.0; 7];
        let mut fv2 = [0.0; 7];

        for j in 0..3 {
            let jtw = 2 * j + 1;
            let abscissa = half_length * XGK[jtw];
            let f1 = integrand(center - abscissa)?;
            let f2 = integrand(center + abscissa)?;

            fv1[jtw] = f1;
            fv2[jtw] = f2;
            result_gauss += WG[j] * (f1 + f2);
            result_kronrod += WGK[jtw] * (f1 + f2);
            result_abs += WGK[jtw] * (f1.abs() + f2.abs());
        }

        for j in 0..4 {
            let jtwm1 = 2 * j;
            let abscissa = half_length * XGK[jtwm1];
            let f1 = integrand(center - abscissa)?;
            let f2 = integrand(center + abscissa)?;

            fv1[jtwm1] = f1;
            fv2[jtwm1] = f2;
            result_kronrod += WGK[jtwm1] * (f1 + f2);
            result_abs += WGK[jtwm1] * (f1.abs() + f2.abs());
        }

        let mean = 0.5 * result_kronrod;
        let mut result_asc = WGK[7] * (f_center - mean).abs();
        for j in 0..7 {
            result_asc += WGK[j] * ((fv1[j] - mean).abs() + (fv2[j] - mean).abs());
        }

        let error = (result_kronrod - result_gauss) * half_length;
        let result_abs = result_abs * abs_half_length;
        let result_asc = result_asc * abs_half_length;

        Ok(RuleEvaluation {
            result: result_kronrod * half_length,
            error: rescale_error(error, result_abs, result_asc),
            result_abs,
            result_asc,
        })
    }

    fn apply_uniform_partition<F>(
        integrand: &mut F,
        lower: f64,
        upper: f64,
        pieces: usize,
    ) -> Result<Vec<(f64, f64, RuleEvaluation)>, Error>
    where
        F: FnMut(f64) -> Result<f64, Error>,
    {
        let width = (upper - lower) / pieces as f64;
        (0..pieces)
            .map(|i| {
                let a = lower + i as f64 * width;
                let b = if i + 1 == pieces { upper } else { a + width };
                Self::apply_rule(&mut *integrand, a, b).map(|rule| (a, b, rule))
            })
            .collect()
    }

    /// Integrates `integrand` over `[lower, upper]`.
    ///
    /// # Errors
    /// Propagates integrand errors. Returns `Error::SubintervalLimitReached` when the
    /// tolerance is not met within the subinterval limit and `Error::IntegrationRoundOff`
    /// when round-off or a vanishing subinterval prevents convergence.
    pub fn integrate_adaptively<F>(
        &self,
        mut integrand: F,
        lower: f64,
        upper: f64,
    ) -> Result<QuadratureResult, Error>
    where
        F: FnMut(f64) -> Result<f64, Error>,
    {
        let first = Self::apply_rule(&mut integrand, lower, upper)?;

        // A peak narrower than the node spacing is invisible to the first rule.
        // Refine uniformly until some node sees a non-zero value.
        let mut partition = vec![(lower, upper, first)];
        let max_partition = MAX_INITIAL_PARTITION.min(self.subinterval_limit);
        while partition.iter().all(|(_, _, rule)| rule.result_abs == 0.0)
            && partition.len() * 2 <= max_partition
        {
            let pieces = partition.len() * 2;
            partition = Self::apply_uniform_partition(&mut integrand, lower, upper, pieces)?;
        }

        if partition.len() == 1 {
            let tolerance = self.relative_error_tol * first.result.abs();
            let round_off = 50.0 * f64::EPSILON * first.result_abs;

            if first.error <= round_off && first.error > tolerance {
                return Err(Error::IntegrationRoundOff);
            }

            if (first.error <= tolerance && first.error != first.result_asc) || first.error == 0.0 {
                return Ok(QuadratureResult {
                    value: first.result,
                    error_estimate: first.error,
                });
            }

            if self.subinterval_limit == 1 {
                return Err(Error::SubintervalLimitReached(1));
            }
        }

        let mut bins = BinaryHeap::with_capacity(self.subinterval_limit);
        let mut area = 0.0;
        let mut error_sum = 0.0;
        for (bin_lower, bin_upper, rule) in &partition {
            bins.push(Bin {
                lower: *bin_lower,
                upper: *bin_upper,
                result: rule.result,
                error: rule.error,
            });
            area += rule.result;
            error_sum += rule.error;
        }

        let mut round_off_1 = 0;
        let mut round_off_2 = 0;

        if partition.len() > 1 && error_sum <= self.relative_error_tol * area.abs() {
            return Ok(QuadratureResult {
                value: area,
                error_estimate: error_sum,
            });
        }

        if bins.len() >= self.subinterval_limit {
            return Err(Error::SubintervalLimitReached(self.subinterval_limit));
        }

        for iteration in partition.len()..self.subinterval_limit {
            let Some(bin) = bins.pop() else {
                break;
            };

            let midpoint = 0.5 * (bin.lower + bin.upper);
            let left = Self::apply_rule(&mut integrand, bin.lower, midpoint)?;
            let right = Self::apply_rule(&mut integrand, midpoint, bin.upper)?;

            let area_12 = left.result + right.result;
            let error_12 = left.error + right.error;

            error_sum += error_12 - bin.error;
            area += area_12 - bin.result;

            if left.result_asc != left.error && right.result_asc != right.error {
                let delta = bin.result - area_12;

                if delta.abs() <= 1e-5 * area_12.abs() && error_12 >= 0.99 * bin.error {
                    round_off_1 += 1;
                }
                if iteration >= 10 && error_12 > bin.error {
                    round_off_2 += 1;
                }
            }

            bins.push(Bin {
                lower: bin.lower,
                upper: midpoint,
                result: left.result,
                error: left.error,
            });
            bins.push(Bin {
                lower: midpoint,
                upper: bin.upper,
                result: right.result,
                error: right.error,
            });

            let tolerance = self.relative_error_tol * area.abs();

            if error_sum <= tolerance {
                break;
            }

            if round_off_1 >= 6 || round_off_2 >= 20 {
                return Err(Error::IntegrationRoundOff);
            }

            if iteration + 1 == self.subinterval_limit {
                return Err(Error::SubintervalLimitReached(self.subinterval_limit));
            }

            if subinterval_too_small(bin.lower, midpoint, bin.upper) {
                return Err(Error::IntegrationRoundOff);
            }
        }

        // Resum to avoid the drift of the running area.
        let value = bins.iter().map(|b| b.result).sum();

        Ok(QuadratureResult {
            value,
            error_estimate: error_sum,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn assert_rel_eq(a: f64, b: f64, tol: f64) {
        assert!(
            ((a - b) / b).abs() < tol,
            "{} is not within {} of {}",
            a,
            tol,
            b
        );
    }

    #[test]
    fn polynomial_is_exact_with_one_rule() {
        let integrator = GaussKronrodIntegrator::new(1e-12);
        let result = integrator
            .integrate_adaptively(|x| Ok(x * x * x + 2.0 * x), 0.0, 2.0)
            .unwrap();

        assert_rel_eq(result.value, 8.0, 1e-14);
        assert!(result.error_estimate >= 0.0);
    }

    #[test]
    fn smooth_functions() {
        let integrator = GaussKronrodIntegrator::new(1e-10);

        let sin = integrator
            .integrate_adaptively(|x| Ok(x.sin()), 0.0, PI)
            .unwrap();
        assert_rel_eq(sin.value, 2.0, 1e-10);

        let exp = integrator
            .integrate_adaptively(|x| Ok((-x).exp()), 0.0, 20.0)
            .unwrap();
        assert_rel_eq(exp.value, 1.0 - (-20.0f64).exp(), 1e-10);
    }

    #[test]
    fn sharply_peaked_gaussian_needs_subdivision() {
        let integrator = GaussKronrodIntegrator::new(1e-6);
        let width: f64 = 1e-3;
        let result = integrator
            .integrate_adaptively(|x| Ok((-(x - 0.3) * (x - 0.3) / (2.0 * width * width)).exp()), -1.0, 1.0)
            .unwrap();

        assert_rel_eq(result.value, width * (2.0 * PI).sqrt(), 1e-6);
        assert!(result.error_estimate <= 1e-6 * result.value);
    }

    #[test]
    fn narrow_peak_missed_by_first_rule_is_found() {
        let integrator = GaussKronrodIntegrator::new(1e-6);
        let width: f64 = 1e-3;
        let mut calls = 0;
        let result = integrator
            .integrate_adaptively(
                |x| {
                    calls += 1;
                    Ok((-(x + 0.7) * (x + 0.7) / (2.0 * width * width)).exp())
                },
                -1.0,
                1.0,
            )
            .unwrap();

        assert!(calls > 15);
        assert!(result.error_estimate > 0.0);
        assert_rel_eq(result.value, width * (2.0 * PI).sqrt(), 1e-6);
    }

    #[test]
    fn zero_integrand_with_tight_limit() {
        let integrator = GaussKronrodIntegrator::new(1e-4).with_subinterval_limit(1);
        let result = integrator.integrate_adaptively(|_| Ok(0.0), 0.0, 1.0).unwrap();

        assert_eq!(result, QuadratureResult::default());
    }

    #[test]
    fn integrable_singularity() {
        let integrator = GaussKronrodIntegrator::new(1e-4);
        let result = integrator
            .integrate_adaptively(|x: f64| Ok(1.0 / x.sqrt()), 0.0, 1.0)
            .unwrap();

        assert_rel_eq(result.value, 2.0, 1e-4);
    }

    #[test]
    fn zero_integrand() {
        let integrator = GaussKronrodIntegrator::new(1e-4);
        let result = integrator.integrate_adaptively(|_| Ok(0.0), -1.0, 1.0).unwrap();

        assert_eq!(result, QuadratureResult::default());
    }

    #[test]
    fn subinterval_limit_is_enforced() {
        let integrator = GaussKronrodIntegrator::new(1e-12).with_subinterval_limit(2);
        let result = integrator.integrate_adaptively(|x: f64| Ok(1.0 / x.sqrt()), 0.0, 1.0);

        assert_eq!(result, Err(Error::SubintervalLimitReached(2)));
    }

    #[test]
    fn integrand_errors_propagate() {
        let integrator = GaussKronrodIntegrator::new(1e-4);
        let result = integrator.integrate_adaptively(
            |_| Err(Error::NonFiniteResult("test integrand")),
            0.0,
            1.0,
        );

        assert_eq!(result, Err(Error::NonFiniteResult("test integrand")));
    }
}
