use common::types::ParticleType;
use std::fmt::{Debug, Display};
use std::hash::Hash;

/// Read access to the state of a tracked particle.
pub trait ParticleStateLike {
    fn weight(&self) -> f64;

    /// Kinetic energy (MeV).
    fn energy(&self) -> f64;

    /// Unit direction vector.
    fn direction(&self) -> [f64; 3];

    /// Position (cm).
    fn position(&self) -> [f64; 3];

    /// Time since the history started (s).
    fn time(&self) -> f64;

    fn collision_number(&self) -> u32;

    fn particle_type(&self) -> ParticleType;

    /// Speed (cm/s).
    fn speed(&self) -> f64;

    fn charge(&self) -> f64 {
        self.particle_type().charge()
    }
}

/// A response function applied to every contribution of an estimator.
pub trait ParticleResponse: Send + Sync {
    fn name(&self) -> &str;

    fn evaluate(&self, particle: &dyn ParticleStateLike) -> f64;

    fn is_spatially_uniform(&self) -> bool;
}

/// A one dimensional distribution over an independent variable.
pub trait OneDDistribution: Send + Sync {
    fn evaluate(&self, x: f64) -> f64;

    fn evaluate_pdf(&self, x: f64) -> f64;

    /// Samples by inverting the CDF at `random_number` in `[0, 1)`.
    fn sample_with_random_number(&self, random_number: f64) -> f64;

    fn lower_bound_of_indep_var(&self) -> f64;

    fn upper_bound_of_indep_var(&self) -> f64;
}

/// Angular distribution of the scattering angle cosine, conditioned on the incoming energy.
pub trait AngularDistribution: Send + Sync {
    fn evaluate_pdf(&self, incoming_energy: f64, angle_cosine: f64) -> f64;
}

/// Per-event multiplier applied to every raw contribution, selected at compile time.
pub trait ContributionMultiplier: Send + Sync + 'static {
    fn multiplier(particle: &dyn ParticleStateLike) -> f64;
}

/// Multiplier policies that also define the per-history pulse height contribution.
pub trait PulseHeightMultiplier: ContributionMultiplier {
    fn pulse_contribution(energy_deposition: f64) -> f64;
}

/// Identifier of a cell or surface an entity estimator tallies over.
pub trait EntityId: Copy + Eq + Hash + Ord + Debug + Display + Send + Sync + 'static {}

impl<T> EntityId for T where T: Copy + Eq + Hash + Ord + Debug + Display + Send + Sync + 'static {}
