use std::sync::{Arc, OnceLock};

use crate::traits::{OneDDistribution, ParticleResponse, ParticleStateLike};

/// The response that every estimator starts with: always 1, spatially uniform.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultResponse;

impl DefaultResponse {
    pub const NAME: &'static str = "default";

    /// Shared handle to the default response.
    pub fn shared() -> Arc<dyn ParticleResponse> {
        static DEFAULT: OnceLock<Arc<dyn ParticleResponse>> = OnceLock::new();
        DEFAULT.get_or_init(|| Arc::new(DefaultResponse)).clone()
    }
}

impl ParticleResponse for DefaultResponse {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn evaluate(&self, _particle: &dyn ParticleStateLike) -> f64 {
        1.0
    }

    fn is_spatially_uniform(&self) -> bool {
        true
    }
}

type ResponseFn = dyn Fn(&dyn ParticleStateLike) -> f64 + Send + Sync;

/// A named response backed by a closure.
#[derive(Clone)]
pub struct FnResponse {
    name: String,
    evaluator: Arc<ResponseFn>,
    spatially_uniform: bool,
}

impl FnResponse {
    pub fn new<F>(name: impl Into<String>, spatially_uniform: bool, evaluator: F) -> Self
    where
        F: Fn(&dyn ParticleStateLike) -> f64 + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            evaluator: Arc::new(evaluator),
            spatially_uniform,
        }
    }

    /// Response that evaluates a distribution at the particle energy.
    pub fn energy(name: impl Into<String>, distribution: Arc<dyn OneDDistribution>) -> Self {
        Self::new(name, true, move |particle| {
            distribution.evaluate(particle.energy())
        })
    }
}

impl std::fmt::Debug for FnResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnResponse")
            .field("name", &self.name)
            .field("spatially_uniform", &self.spatially_uniform)
            .finish()
    }
}

impl ParticleResponse for FnResponse {
    fn name(&self) -> &str {
        &self.name
    }

    fn evaluate(&self, particle: &dyn ParticleStateLike) -> f64 {
        (self.evaluator)(particle)
    }

    fn is_spatially_uniform(&self) -> bool {
        self.spatially_uniform
    }
}
