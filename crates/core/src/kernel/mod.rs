pub mod free_gas;
pub mod integrator;

pub use free_gas::{FreeGasElasticScatteringKernelFactor, alpha_max, alpha_min, beta_min};
pub use integrator::{GaussKronrodIntegrator, QuadratureResult};
