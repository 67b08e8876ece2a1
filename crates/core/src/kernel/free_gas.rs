use common::constants::{NEUTRON_REST_MASS_ENERGY_MEV, SPEED_OF_LIGHT_CM_PER_S};
use common::error::Error;
use common::high_precision::{ExtendedExponentFloat, HighPrecisionReal};
use common::special::{bessel_i0, bessel_i0_scaled};
use log::{debug, trace};
use std::f64::consts::PI;
use std::sync::Arc;

use super::integrator::{GaussKronrodIntegrator, QuadratureResult};
use crate::traits::{AngularDistribution, OneDDistribution};

pub const DEFAULT_RELATIVE_ERROR_TOL: f64 = 1e-4;

const BISECTION_RELATIVE_TOL: f64 = 1e-15;
const MAX_BISECTION_ITERATIONS: usize = 200;
const MAX_GRID_REFINEMENTS: usize = 16;

/// Smallest energy transfer, in units of kT, for an incoming energy `energy`.
pub fn beta_min(energy: f64, kt: f64) -> f64 {
    -energy / kt
}

/// Smallest momentum transfer, in units of A kT, allowed for `beta`.
pub fn alpha_min(energy: f64, beta: f64, atomic_weight_ratio: f64, kt: f64) -> f64 {
    let e = energy / kt;
    let diff = e.sqrt() - (e + beta).max(0.0).sqrt();

    diff * diff / atomic_weight_ratio
}

/// Largest momentum transfer, in units of A kT, allowed for `beta`.
pub fn alpha_max(energy: f64, beta: f64, atomic_weight_ratio: f64, kt: f64) -> f64 {
    let e = energy / kt;
    let sum = e.sqrt() + (e + beta).max(0.0).sqrt();

    sum * sum / atomic_weight_ratio
}

fn ensure_positive_finite(name: &'static str, value: f64) -> Result<(), Error> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(Error::InvalidKernelParameter { name, value })
    }
}

/// Integrand of the free gas elastic scattering kernel over the center-of-mass
/// scattering angle cosine, for a fixed `(alpha, beta, E)`.
///
/// The factor is `sigma(E_rel) p(E, mu) / (1 - mu)^2 * exp(a / (1 - mu) + c) I0(b sqrt((1 + mu) / (1 - mu)))`,
/// where `E_rel` is the relative energy implied by the momentum transfer. The `a`, `b`, `c`
/// coefficients and the relative velocity multiplier only depend on `(alpha, beta, E)` and
/// are cached when the independent variables change.
#[derive(Clone)]
pub struct FreeGasElasticScatteringKernelFactor {
    zero_temp_cross_section: Arc<dyn OneDDistribution>,
    cm_scattering_distribution: Arc<dyn AngularDistribution>,
    atomic_weight_ratio: f64,
    kt: f64,
    alpha: f64,
    beta: f64,
    energy: f64,
    exp_arg_mult: f64,
    exp_arg_const: f64,
    bessel_arg_mult: f64,
    relative_velocity_mult: f64,
    integrator: GaussKronrodIntegrator,
}

impl std::fmt::Debug for FreeGasElasticScatteringKernelFactor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FreeGasElasticScatteringKernelFactor")
            .field("atomic_weight_ratio", &self.atomic_weight_ratio)
            .field("kt", &self.kt)
            .field("alpha", &self.alpha)
            .field("beta", &self.beta)
            .field("energy", &self.energy)
            .finish_non_exhaustive()
    }
}

impl FreeGasElasticScatteringKernelFactor {
    /// # Arguments
    /// * `zero_temp_cross_section` - Zero temperature elastic cross section (b) over energy (MeV).
    /// * `cm_scattering_distribution` - Center-of-mass angular distribution.
    /// * `atomic_weight_ratio` - Target mass over the neutron mass.
    /// * `kt` - Target temperature (MeV).
    ///
    /// # Errors
    /// Returns `Error::InvalidKernelParameter` when `A` or `kT` is not positive and finite,
    /// plus any error of [`Self::set_independent_variables`].
    pub fn new(
        zero_temp_cross_section: Arc<dyn OneDDistribution>,
        cm_scattering_distribution: Arc<dyn AngularDistribution>,
        atomic_weight_ratio: f64,
        kt: f64,
        alpha: f64,
        beta: f64,
        energy: f64,
    ) -> Result<Self, Error> {
        ensure_positive_finite("A", atomic_weight_ratio)?;
        ensure_positive_finite("kT", kt)?;

        let mut factor = Self {
            zero_temp_cross_section,
            cm_scattering_distribution,
            atomic_weight_ratio,
            kt,
            alpha: 0.0,
            beta: 0.0,
            energy: 0.0,
            exp_arg_mult: 0.0,
            exp_arg_const: 0.0,
            bessel_arg_mult: 0.0,
            relative_velocity_mult: 0.0,
            integrator: GaussKronrodIntegrator::new(DEFAULT_RELATIVE_ERROR_TOL),
        };
        factor.set_independent_variables(alpha, beta, energy)?;

        Ok(factor)
    }

    pub fn with_integrator(mut self, integrator: GaussKronrodIntegrator) -> Self {
        self.integrator = integrator;
        self
    }

    pub fn integrator(&self) -> &GaussKronrodIntegrator {
        &self.integrator
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn beta(&self) -> f64 {
        self.beta
    }

    pub fn energy(&self) -> f64 {
        self.energy
    }

    /// Changes `(alpha, beta, E)` and refreshes the cached coefficients.
    ///
    /// # Errors
    /// * `Error::InvalidKernelParameter` if `E` is not positive and finite.
    /// * `Error::IndependentVariableOutOfRange` if `beta < -E/kT` or `alpha` is outside
    ///   of `[alpha_min, alpha_max]`.
    pub fn set_independent_variables(
        &mut self,
        alpha: f64,
        beta: f64,
        energy: f64,
    ) -> Result<(), Error> {
        ensure_positive_finite("E", energy)?;

        let min_beta = beta_min(energy, self.kt);
        if !beta.is_finite() || beta < min_beta {
            return Err(Error::IndependentVariableOutOfRange {
                name: "beta",
                value: beta,
                min: min_beta,
                max: f64::MAX,
            });
        }

        let a = self.atomic_weight_ratio;
        let min_alpha = alpha_min(energy, beta, a, self.kt);
        let max_alpha = alpha_max(energy, beta, a, self.kt);

        // The bounds carry the round-off of their own evaluation.
        let slack = 1e-10;
        if !(alpha > 0.0
            && alpha >= min_alpha * (1.0 - slack)
            && alpha <= max_alpha * (1.0 + slack))
        {
            return Err(Error::IndependentVariableOutOfRange {
                name: "alpha",
                value: alpha,
                min: min_alpha,
                max: max_alpha,
            });
        }

        self.alpha = alpha;
        self.beta = beta;
        self.energy = energy;
        self.update_cached_values();

        trace!(
            "Free gas kernel factor set to alpha = {}, beta = {}, E = {}",
            alpha, beta, energy
        );

        Ok(())
    }

    fn update_cached_values(&mut self) {
        let a = self.atomic_weight_ratio;
        let a_plus_1 = a + 1.0;
        let alpha = self.alpha;
        let beta = self.beta;
        let e = self.energy / self.kt;

        self.exp_arg_mult = -a_plus_1 * a_plus_1 * alpha / 2.0;
        self.exp_arg_const = -a * e - a_plus_1 * beta / 2.0 + a * a_plus_1 * alpha / 2.0;

        let x = ((4.0 * a * e + 2.0 * a_plus_1 * beta - (a * a - 1.0) * alpha) / 2.0
            - (alpha + beta) * (alpha + beta) / (2.0 * alpha))
            .max(0.0);
        self.bessel_arg_mult = a_plus_1 * (alpha * x / 2.0).sqrt();

        self.relative_velocity_mult = SPEED_OF_LIGHT_CM_PER_S
            * a_plus_1
            * (alpha * self.kt / (a * NEUTRON_REST_MASS_ENERGY_MEV)).sqrt();
    }

    /// `exp(exp_arg) * I0(bessel_arg)` when `exp(exp_arg)` falls outside of the double range.
    fn exponential_bessel_product<H: HighPrecisionReal>(exp_arg: f64, bessel_arg: f64) -> Result<f64, Error> {
        let i0_scaled = bessel_i0_scaled(bessel_arg)?;

        Ok(H::exp(exp_arg)
            .mul(H::exp(bessel_arg))
            .mul(H::from_f64(i0_scaled))
            .to_f64())
    }

    /// Evaluates the factor at the center-of-mass angle cosine `mu_cm`.
    ///
    /// # Errors
    /// * `Error::IndependentVariableOutOfRange` if `mu_cm` is outside of `[-1, 1]`.
    /// * `Error::NonFiniteResult` if the factor is not finite.
    pub fn evaluate(&self, mu_cm: f64) -> Result<f64, Error> {
        if !(-1.0..=1.0).contains(&mu_cm) {
            return Err(Error::IndependentVariableOutOfRange {
                name: "mu_cm",
                value: mu_cm,
                min: -1.0,
                max: 1.0,
            });
        }

        if mu_cm == 1.0 {
            return Ok(0.0);
        }

        let one_minus_mu = 1.0 - mu_cm;

        let relative_velocity = self.relative_velocity_mult / one_minus_mu.sqrt();
        let beta_rel = relative_velocity / SPEED_OF_LIGHT_CM_PER_S;
        let relative_energy = 0.5 * NEUTRON_REST_MASS_ENERGY_MEV * beta_rel * beta_rel;

        let term_1 = self.zero_temp_cross_section.evaluate(relative_energy)
            * self
                .cm_scattering_distribution
                .evaluate_pdf(self.energy, mu_cm)
            / (one_minus_mu * one_minus_mu);

        if term_1 == 0.0 {
            return Ok(0.0);
        }

        let exp_arg = self.exp_arg_mult / one_minus_mu + self.exp_arg_const;
        let bessel_arg = self.bessel_arg_mult * ((1.0 + mu_cm) / one_minus_mu).sqrt();

        let term_2 = if exp_arg > f64::MIN_POSITIVE.ln() && exp_arg < f64::MAX.ln() {
            match bessel_i0(bessel_arg) {
                Ok(i0) => exp_arg.exp() * i0,
                Err(Error::BesselOverflow(_)) => {
                    (bessel_arg + exp_arg).exp() / (2.0 * PI * bessel_arg).sqrt()
                }
                Err(e) => return Err(e),
            }
        } else {
            Self::exponential_bessel_product::<ExtendedExponentFloat>(exp_arg, bessel_arg)?
        };

        let value = term_1 * term_2;

        if !value.is_finite() {
            return Err(Error::NonFiniteResult("free gas elastic scattering kernel factor"));
        }

        Ok(value)
    }

    /// Angle cosine where `exp(a / (1 - mu)) I0(b sqrt((1 + mu) / (1 - mu)))` peaks.
    fn estimated_peak_cosine(&self) -> f64 {
        let a2 = self.exp_arg_mult * self.exp_arg_mult;
        let b2 = self.bessel_arg_mult * self.bessel_arg_mult;

        if a2 + b2 == 0.0 {
            return 0.0;
        }

        ((b2 - a2) / (a2 + b2)).clamp(-1.0, 1.0)
    }

    /// Refines a grid over `[lower, upper]` until a strictly positive point is found.
    fn find_cosine_with_nonzero_value(&self, lower: f64, upper: f64) -> Result<Option<f64>, Error> {
        let mut grid = vec![lower, upper];

        for _ in 0..MAX_GRID_REFINEMENTS {
            let midpoints: Vec<f64> = grid.windows(2).map(|w| 0.5 * (w[0] + w[1])).collect();

            for &mu in &midpoints {
                if self.evaluate(mu)? > 0.0 {
                    return Ok(Some(mu));
                }
            }

            let mut refined = Vec::with_capacity(grid.len() + midpoints.len());
            for (point, midpoint) in grid.iter().zip(midpoints.iter()) {
                refined.push(*point);
                refined.push(*midpoint);
            }
            refined.push(upper);
            grid = refined;
        }

        Ok(None)
    }

    /// Bisects between a point where the factor vanishes and one where it is positive,
    /// returning the last vanishing point.
    fn bisect_to_zero_crossing(&self, mut zero: f64, mut positive: f64) -> Result<f64, Error> {
        for _ in 0..MAX_BISECTION_ITERATIONS {
            let scale = zero.abs().max(positive.abs());
            if (positive - zero).abs() <= BISECTION_RELATIVE_TOL * scale {
                break;
            }

            let midpoint = 0.5 * (zero + positive);
            if midpoint == zero || midpoint == positive {
                break;
            }

            if self.evaluate(midpoint)? > 0.0 {
                positive = midpoint;
            } else {
                zero = midpoint;
            }
        }

        Ok(zero)
    }

    /// Cosine interval outside of which the factor vanishes.
    ///
    /// Returns `(0, 0)` when no positive value can be found on `[-1, 1]`.
    pub fn find_integration_limits(&self) -> Result<(f64, f64), Error> {
        let peak = self.estimated_peak_cosine();

        let anchor = if self.evaluate(peak)? > 0.0 {
            peak
        } else {
            match self.find_cosine_with_nonzero_value(-1.0, 1.0)? {
                Some(mu) => mu,
                None => {
                    debug!(
                        "Free gas kernel factor vanishes on [-1, 1] (alpha = {}, beta = {}, E = {})",
                        self.alpha, self.beta, self.energy
                    );
                    return Ok((0.0, 0.0));
                }
            }
        };

        let lower = if self.evaluate(-1.0)? > 0.0 {
            -1.0
        } else {
            self.bisect_to_zero_crossing(-1.0, anchor)?
        };

        // The factor always vanishes at mu = 1.
        let upper = self.bisect_to_zero_crossing(1.0, anchor)?;

        Ok((lower, upper))
    }

    /// Integral of the factor over the center-of-mass angle cosine.
    ///
    /// # Errors
    /// Propagates evaluation and integration errors.
    pub fn get_integrated_value(&self) -> Result<QuadratureResult, Error> {
        let (lower, upper) = self.find_integration_limits()?;

        if lower >= upper {
            return Ok(QuadratureResult::default());
        }

        let result = self
            .integrator
            .integrate_adaptively(|mu| self.evaluate(mu), lower, upper)?;

        if !result.value.is_finite() {
            return Err(Error::NonFiniteResult("free gas elastic scattering kernel integral"));
        }

        debug!(
            "Free gas kernel integral over [{}, {}] = {} +/- {}",
            lower, upper, result.value, result.error_estimate
        );

        Ok(result)
    }
}
