use common::error::Error;
use log::warn;
use std::marker::PhantomData;

use super::CellId;
use crate::entity::EntityAccumulator;
use crate::estimator::Estimator;
use crate::estimator::sealed::AccumulatorAccess;
use crate::traits::{ContributionMultiplier, ParticleStateLike};

/// Cell flux estimated from collisions, each scoring the inverse total macroscopic
/// cross section at the collision site.
#[derive(Debug, Clone)]
pub struct CellCollisionFluxEstimator<M: ContributionMultiplier> {
    accumulator: EntityAccumulator<CellId>,
    _multiplier: PhantomData<M>,
}

impl<M: ContributionMultiplier> CellCollisionFluxEstimator<M> {
    pub fn new(
        id: u64,
        multiplier: f64,
        cell_ids: &[CellId],
        cell_volumes: &[f64],
    ) -> Result<Self, Error> {
        Ok(Self {
            accumulator: EntityAccumulator::new(id, multiplier, "Cell", cell_ids, Some(cell_volumes))?,
            _multiplier: PhantomData,
        })
    }

    pub fn update_from_particle_colliding_in_cell_event(
        &mut self,
        particle: &dyn ParticleStateLike,
        cell: CellId,
        inverse_total_cross_section: f64,
    ) {
        let contribution = inverse_total_cross_section * M::multiplier(particle);

        self.accumulator
            .add_partial_history_contribution(cell, particle, 1.0, contribution);
    }
}

impl<M: ContributionMultiplier> AccumulatorAccess for CellCollisionFluxEstimator<M> {
    type EntityId = CellId;

    fn accumulator_mut(&mut self) -> &mut EntityAccumulator<CellId> {
        &mut self.accumulator
    }
}

impl<M: ContributionMultiplier> Estimator for CellCollisionFluxEstimator<M> {
    fn kind(&self) -> &'static str {
        "Cell Collision Flux Estimator"
    }

    fn accumulator(&self) -> &EntityAccumulator<CellId> {
        &self.accumulator
    }

    fn set_cosine_bin_boundaries(&mut self, _boundaries: &[f64]) -> Result<(), Error> {
        warn!(
            "Cosine bins cannot be set for cell collision flux estimator {}, the bins are ignored.",
            self.id()
        );
        Ok(())
    }
}
