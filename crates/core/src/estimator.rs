use common::error::Error;
use common::moments::MomentAccumulator;
use common::types::{ParticleType, PhaseSpacePoint, RunContext};
use std::collections::BTreeSet;
use std::io::{self, Write};
use std::sync::Arc;

use crate::entity::EntityAccumulator;
use crate::phase_space::PhaseSpaceDiscretization;
use crate::response::DefaultResponse;
use crate::traits::{ParticleResponse, ParticleStateLike};

/// Mean, relative error, relative variance of the variance and figure of merit of one bin.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ProcessedMoments {
    pub mean: f64,
    pub relative_error: f64,
    pub variance_of_variance: f64,
    pub figure_of_merit: f64,
}

/// Configuration shared by every estimator: phase-space bins, response functions,
/// and the particle types that may contribute.
#[derive(Clone)]
pub struct EstimatorCore {
    id: u64,
    multiplier: f64,
    discretization: PhaseSpaceDiscretization,
    response_functions: Vec<Arc<dyn ParticleResponse>>,
    particle_types: BTreeSet<ParticleType>,
}

impl std::fmt::Debug for EstimatorCore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.response_functions.iter().map(|r| r.name()).collect();

        f.debug_struct("EstimatorCore")
            .field("id", &self.id)
            .field("multiplier", &self.multiplier)
            .field("discretization", &self.discretization)
            .field("response_functions", &names)
            .field("particle_types", &self.particle_types)
            .finish()
    }
}

impl EstimatorCore {
    /// Creates an estimator with a single bin, the default response and every particle type.
    ///
    /// # Errors
    /// Returns `Error::InvalidMultiplier` unless `multiplier` is positive and finite.
    pub fn new(id: u64, multiplier: f64) -> Result<Self, Error> {
        if !(multiplier > 0.0) || !multiplier.is_finite() {
            return Err(Error::InvalidMultiplier(multiplier));
        }

        Ok(Self {
            id,
            multiplier,
            discretization: PhaseSpaceDiscretization::default(),
            response_functions: vec![DefaultResponse::shared()],
            particle_types: ParticleType::ALL.into_iter().collect(),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn discretization(&self) -> &PhaseSpaceDiscretization {
        &self.discretization
    }

    pub fn set_energy_bin_boundaries(&mut self, boundaries: &[f64]) -> Result<(), Error> {
        self.discretization.set_energy_bin_boundaries(boundaries)
    }

    pub fn set_cosine_bin_boundaries(&mut self, boundaries: &[f64]) -> Result<(), Error> {
        self.discretization.set_cosine_bin_boundaries(boundaries)
    }

    pub fn set_time_bin_boundaries(&mut self, boundaries: &[f64]) -> Result<(), Error> {
        self.discretization.set_time_bin_boundaries(boundaries)
    }

    pub fn set_collision_number_bins(&mut self, edges: &[u32]) -> Result<(), Error> {
        self.discretization.set_collision_number_bins(edges)
    }

    /// # Errors
    /// Returns `Error::EmptyResponseFunctions` for an empty list.
    pub fn set_response_functions(
        &mut self,
        response_functions: Vec<Arc<dyn ParticleResponse>>,
    ) -> Result<(), Error> {
        if response_functions.is_empty() {
            return Err(Error::EmptyResponseFunctions);
        }

        self.response_functions = response_functions;
        Ok(())
    }

    pub fn num_response_functions(&self) -> usize {
        self.response_functions.len()
    }

    pub fn response_function_name(&self, response_function_index: usize) -> &str {
        self.response_functions[response_function_index].name()
    }

    #[inline]
    pub fn evaluate_response_function(
        &self,
        response_function_index: usize,
        particle: &dyn ParticleStateLike,
    ) -> f64 {
        self.response_functions[response_function_index].evaluate(particle)
    }

    pub fn set_particle_types(&mut self, particle_types: &[ParticleType]) {
        self.particle_types = particle_types.iter().copied().collect();
    }

    pub fn particle_types(&self) -> &BTreeSet<ParticleType> {
        &self.particle_types
    }

    #[inline]
    pub fn is_particle_type_assigned(&self, particle_type: ParticleType) -> bool {
        self.particle_types.contains(&particle_type)
    }

    /// Number of bins per response function.
    pub fn num_bins(&self) -> usize {
        self.discretization.num_bins()
    }

    /// Size of the per-entity moment arrays.
    pub fn num_bins_with_response_functions(&self) -> usize {
        self.num_bins() * self.num_response_functions()
    }

    #[inline]
    pub fn calculate_bin_index(
        &self,
        point: &PhaseSpacePoint,
        response_function_index: usize,
    ) -> Option<usize> {
        self.discretization
            .calculate_bin_index(point, response_function_index)
    }

    #[inline]
    pub fn response_function_index(&self, bin_index: usize) -> usize {
        bin_index / self.num_bins()
    }

    /// Bin description followed by the response function name.
    pub fn bin_name(&self, bin_index: usize) -> String {
        format!(
            "{}, {}",
            self.discretization.bin_name(bin_index),
            self.response_function_name(self.response_function_index(bin_index))
        )
    }

    /// Turns raw moments into normalized estimates.
    pub fn process_moments(
        &self,
        moments: &MomentAccumulator,
        norm_constant: f64,
        run: &RunContext,
    ) -> ProcessedMoments {
        let n = run.num_histories();

        ProcessedMoments {
            mean: moments.mean(n) * self.multiplier / norm_constant,
            relative_error: moments.relative_error(n),
            variance_of_variance: moments.variance_of_variance(n),
            figure_of_merit: moments.figure_of_merit(n, run.elapsed_time()),
        }
    }

    /// Replicas can be merged when the bins and responses line up.
    pub fn is_compatible_with(&self, other: &EstimatorCore) -> bool {
        self.id == other.id
            && self.multiplier == other.multiplier
            && self.discretization == other.discretization
            && self.num_response_functions() == other.num_response_functions()
            && self.particle_types == other.particle_types
    }

    pub(crate) fn print_summary(&self, os: &mut dyn Write, kind: &str) -> io::Result<()> {
        writeln!(os, "{}: {}", kind, self.id)?;
        writeln!(os, "Multiplier: {}", self.multiplier)?;

        let types: Vec<String> = self.particle_types.iter().map(|t| t.to_string()).collect();
        writeln!(os, "Particle Types: {}", types.join(", "))?;

        writeln!(os, "Response Functions:")?;
        for (i, response) in self.response_functions.iter().enumerate() {
            writeln!(os, "  {}.) {}", i + 1, response.name())?;
        }

        let d = &self.discretization;
        writeln!(os, "Energy Bins: {:?}", d.energy_bin_boundaries())?;
        writeln!(os, "Cosine Bins: {:?}", d.cosine_bin_boundaries())?;
        writeln!(os, "Time Bins: {:?}", d.time_bin_boundaries())?;
        writeln!(os, "Collision Number Bins: {:?}", d.collision_number_bins())
    }

    /// Prints one line per bin, grouped by response function.
    pub(crate) fn print_bin_data(
        &self,
        os: &mut dyn Write,
        moments: &[MomentAccumulator],
        norm_constant: f64,
        run: &RunContext,
    ) -> io::Result<()> {
        let num_bins = self.num_bins();

        for r in 0..self.num_response_functions() {
            writeln!(os, " Response Function: {}", self.response_function_name(r))?;

            for i in 0..num_bins {
                let p = self.process_moments(&moments[i + r * num_bins], norm_constant, run);
                writeln!(
                    os,
                    "  {} {:e} {:e} {:e} {:e}",
                    self.discretization.bin_name(i),
                    p.mean,
                    p.relative_error,
                    p.variance_of_variance,
                    p.figure_of_merit
                )?;
            }
        }

        Ok(())
    }

    /// Prints one line per response function.
    pub(crate) fn print_total_data(
        &self,
        os: &mut dyn Write,
        moments: &[MomentAccumulator],
        norm_constant: f64,
        run: &RunContext,
    ) -> io::Result<()> {
        for (r, m) in moments.iter().enumerate() {
            let p = self.process_moments(m, norm_constant, run);
            writeln!(
                os,
                " Response Function: {}\n  {:e} {:e} {:e} {:e}",
                self.response_function_name(r),
                p.mean,
                p.relative_error,
                p.variance_of_variance,
                p.figure_of_merit
            )?;
        }

        Ok(())
    }
}

pub(crate) mod sealed {
    use crate::entity::EntityAccumulator;
    use crate::traits::EntityId;

    /// Mutable accumulator access, kept inside the crate so the configuration
    /// overrides of an estimator cannot be bypassed.
    pub trait AccumulatorAccess {
        type EntityId: EntityId;

        fn accumulator_mut(&mut self) -> &mut EntityAccumulator<Self::EntityId>;
    }
}

/// Common interface of all entity estimators.
///
/// Implementors only expose their accumulator; configuration calls that do not
/// apply to an estimator are overridden to warn and return `Ok`.
pub trait Estimator: sealed::AccumulatorAccess {
    /// Human readable estimator type used in reports.
    fn kind(&self) -> &'static str;

    fn accumulator(&self) -> &EntityAccumulator<Self::EntityId>;

    fn id(&self) -> u64 {
        self.accumulator().core().id()
    }

    fn set_energy_bin_boundaries(&mut self, boundaries: &[f64]) -> Result<(), Error> {
        self.accumulator_mut().set_energy_bin_boundaries(boundaries)
    }

    fn set_cosine_bin_boundaries(&mut self, boundaries: &[f64]) -> Result<(), Error> {
        self.accumulator_mut().set_cosine_bin_boundaries(boundaries)
    }

    fn set_time_bin_boundaries(&mut self, boundaries: &[f64]) -> Result<(), Error> {
        self.accumulator_mut().set_time_bin_boundaries(boundaries)
    }

    fn set_collision_number_bins(&mut self, edges: &[u32]) -> Result<(), Error> {
        self.accumulator_mut().set_collision_number_bins(edges)
    }

    fn set_response_functions(
        &mut self,
        response_functions: Vec<Arc<dyn ParticleResponse>>,
    ) -> Result<(), Error> {
        self.accumulator_mut()
            .set_response_functions(response_functions)
    }

    fn set_particle_types(&mut self, particle_types: &[ParticleType]) {
        self.accumulator_mut().set_particle_types(particle_types)
    }

    fn is_entity_assigned(&self, entity_id: Self::EntityId) -> bool {
        self.accumulator().is_entity_assigned(entity_id)
    }

    fn is_particle_type_assigned(&self, particle_type: ParticleType) -> bool {
        self.accumulator()
            .core()
            .is_particle_type_assigned(particle_type)
    }

    fn has_uncommitted_history_contribution(&self) -> bool {
        self.accumulator().has_uncommitted_history_contribution()
    }

    /// Folds the current history into the moments. Call exactly once per history.
    fn commit_history_contribution(&mut self) {
        self.accumulator_mut().commit_history_contribution()
    }

    fn reset_data(&mut self) {
        self.accumulator_mut().reset_data()
    }

    /// Sums the moments of an identically configured replica into this estimator.
    fn merge(&mut self, other: &Self) -> Result<(), Error>
    where
        Self: Sized,
    {
        self.accumulator_mut().merge(other.accumulator())
    }

    fn print(&self, os: &mut dyn Write, run: &RunContext) -> io::Result<()> {
        self.accumulator().print(os, self.kind(), run)
    }
}
