use common::error::Error;
use std::marker::PhantomData;

use super::SurfaceId;
use crate::entity::EntityAccumulator;
use crate::estimator::Estimator;
use crate::estimator::sealed::AccumulatorAccess;
use crate::traits::{ContributionMultiplier, ParticleStateLike};

pub const DEFAULT_COSINE_CUTOFF: f64 = 0.01;

/// Cosine of the angle between a particle direction and a surface normal.
///
/// Neither vector has to be normalized.
pub fn calculate_angle_cosine(direction: [f64; 3], surface_normal: [f64; 3]) -> f64 {
    let dot: f64 = direction
        .iter()
        .zip(surface_normal.iter())
        .map(|(d, n)| d * n)
        .sum();
    let norm = |v: &[f64; 3]| v.iter().map(|x| x * x).sum::<f64>().sqrt();

    (dot / (norm(&direction) * norm(&surface_normal))).clamp(-1.0, 1.0)
}

/// Surface flux, each crossing scores `1/|mu|`.
///
/// Grazing crossings with `|mu|` below the cutoff score `2/cutoff` instead.
#[derive(Debug, Clone)]
pub struct SurfaceFluxEstimator<M: ContributionMultiplier> {
    accumulator: EntityAccumulator<SurfaceId>,
    cosine_cutoff: f64,
    _multiplier: PhantomData<M>,
}

impl<M: ContributionMultiplier> SurfaceFluxEstimator<M> {
    /// # Arguments
    /// * `surface_areas` - One area per surface, used to normalize the flux.
    pub fn new(
        id: u64,
        multiplier: f64,
        surface_ids: &[SurfaceId],
        surface_areas: &[f64],
    ) -> Result<Self, Error> {
        Ok(Self {
            accumulator: EntityAccumulator::new(
                id,
                multiplier,
                "Surface",
                surface_ids,
                Some(surface_areas),
            )?,
            cosine_cutoff: DEFAULT_COSINE_CUTOFF,
            _multiplier: PhantomData,
        })
    }

    /// # Errors
    /// Returns `Error::InvalidCosineCutoff` unless `0 < cutoff <= 1`.
    pub fn set_cosine_cutoff_value(&mut self, cutoff: f64) -> Result<(), Error> {
        if !(cutoff > 0.0 && cutoff <= 1.0) {
            return Err(Error::InvalidCosineCutoff(cutoff));
        }

        self.cosine_cutoff = cutoff;
        Ok(())
    }

    pub fn cosine_cutoff_value(&self) -> f64 {
        self.cosine_cutoff
    }

    pub fn update_from_particle_crossing_surface_event(
        &mut self,
        particle: &dyn ParticleStateLike,
        surface: SurfaceId,
        angle_cosine: f64,
    ) {
        let abs_cosine = angle_cosine.abs();

        let raw = if abs_cosine < self.cosine_cutoff {
            2.0 / self.cosine_cutoff
        } else {
            1.0 / abs_cosine
        };

        self.accumulator.add_partial_history_contribution(
            surface,
            particle,
            angle_cosine,
            raw * M::multiplier(particle),
        );
    }
}

impl<M: ContributionMultiplier> AccumulatorAccess for SurfaceFluxEstimator<M> {
    type EntityId = SurfaceId;

    fn accumulator_mut(&mut self) -> &mut EntityAccumulator<SurfaceId> {
        &mut self.accumulator
    }
}

impl<M: ContributionMultiplier> Estimator for SurfaceFluxEstimator<M> {
    fn kind(&self) -> &'static str {
        "Surface Flux Estimator"
    }

    fn accumulator(&self) -> &EntityAccumulator<SurfaceId> {
        &self.accumulator
    }

}

/// Net number of crossings through a surface.
#[derive(Debug, Clone)]
pub struct SurfaceCurrentEstimator<M: ContributionMultiplier> {
    accumulator: EntityAccumulator<SurfaceId>,
    _multiplier: PhantomData<M>,
}

impl<M: ContributionMultiplier> SurfaceCurrentEstimator<M> {
    /// Currents are not normalized, the surface norm constants are all 1.
    pub fn new(id: u64, multiplier: f64, surface_ids: &[SurfaceId]) -> Result<Self, Error> {
        Ok(Self {
            accumulator: EntityAccumulator::new(id, multiplier, "Surface", surface_ids, None)?,
            _multiplier: PhantomData,
        })
    }

    pub fn update_from_particle_crossing_surface_event(
        &mut self,
        particle: &dyn ParticleStateLike,
        surface: SurfaceId,
        angle_cosine: f64,
    ) {
        self.accumulator.add_partial_history_contribution(
            surface,
            particle,
            angle_cosine,
            M::multiplier(particle),
        );
    }
}

impl<M: ContributionMultiplier> AccumulatorAccess for SurfaceCurrentEstimator<M> {
    type EntityId = SurfaceId;

    fn accumulator_mut(&mut self) -> &mut EntityAccumulator<SurfaceId> {
        &mut self.accumulator
    }
}

impl<M: ContributionMultiplier> Estimator for SurfaceCurrentEstimator<M> {
    fn kind(&self) -> &'static str {
        "Surface Current Estimator"
    }

    fn accumulator(&self) -> &EntityAccumulator<SurfaceId> {
        &self.accumulator
    }

}
