use log::info;
use std::sync::Arc;
use tokio::task::JoinHandle;

use super::config::KernelConfig;
use super::error::Error;
use tally_core::distributions::{
    IsotropicAngularDistribution, LinearlyAnisotropicAngularDistribution, UniformDistribution,
};
use tally_core::kernel::{
    FreeGasElasticScatteringKernelFactor, GaussKronrodIntegrator, QuadratureResult,
};
use tally_core::traits::AngularDistribution;

/// Upper energy bound (MeV) of the constant zero temperature cross section.
const CROSS_SECTION_MAX_ENERGY: f64 = 20.0;

/// Evaluates the free gas kernel integral for the configured `(alpha, beta, E)`.
pub struct KernelJob {
    config: KernelConfig,
}

impl KernelJob {
    pub fn new(config: KernelConfig) -> Self {
        KernelJob { config }
    }

    pub fn build_factor(&self) -> Result<FreeGasElasticScatteringKernelFactor, Error> {
        let c = &self.config;

        let cross_section = Arc::new(UniformDistribution::new(
            0.0,
            CROSS_SECTION_MAX_ENERGY,
            c.zero_temperature_cross_section,
        )?);

        let angular: Arc<dyn AngularDistribution> = if c.mean_cosine == 0.0 {
            Arc::new(IsotropicAngularDistribution)
        } else {
            Arc::new(LinearlyAnisotropicAngularDistribution::new(c.mean_cosine)?)
        };

        let integrator = GaussKronrodIntegrator::new(c.relative_error_tol)
            .with_subinterval_limit(c.subinterval_limit);

        Ok(FreeGasElasticScatteringKernelFactor::new(
            cross_section,
            angular,
            c.atomic_weight_ratio,
            c.kt(),
            c.alpha,
            c.beta,
            c.energy,
        )?
        .with_integrator(integrator))
    }

    pub fn evaluate(&self) -> Result<QuadratureResult, Error> {
        let factor = self.build_factor()?;
        let result = factor.get_integrated_value()?;

        info!(
            "Free gas kernel: A = {}, kT = {:e} MeV, alpha = {}, beta = {}, E = {:e} MeV -> {:e} +/- {:e}",
            self.config.atomic_weight_ratio,
            self.config.kt(),
            self.config.alpha,
            self.config.beta,
            self.config.energy,
            result.value,
            result.error_estimate
        );

        Ok(result)
    }

    /// Runs the integration on the blocking pool.
    pub fn spawn(self) -> JoinHandle<Result<QuadratureResult, Error>> {
        tokio::task::spawn_blocking(move || self.evaluate())
    }
}
