use common::error::Error;
use log::warn;
use std::marker::PhantomData;

use super::CellId;
use crate::entity::EntityAccumulator;
use crate::estimator::Estimator;
use crate::estimator::sealed::AccumulatorAccess;
use crate::traits::{ContributionMultiplier, ParticleStateLike};

/// Cell flux estimated from the track length of every subtrack inside a cell.
#[derive(Debug, Clone)]
pub struct CellTrackLengthFluxEstimator<M: ContributionMultiplier> {
    accumulator: EntityAccumulator<CellId>,
    _multiplier: PhantomData<M>,
}

impl<M: ContributionMultiplier> CellTrackLengthFluxEstimator<M> {
    /// # Arguments
    /// * `cell_volumes` - One volume per cell, used to normalize the flux.
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

    pub fn update_from_particle_subtrack_ending_in_cell_event(
        &mut self,
        particle: &dyn ParticleStateLike,
        cell: CellId,
        track_length: f64,
    ) {
        debug_assert!(track_length >= 0.0);

        let contribution = track_length * M::multiplier(particle);

        self.accumulator
            .add_partial_history_contribution(cell, particle, 1.0, contribution);
    }
}

impl<M: ContributionMultiplier> AccumulatorAccess for CellTrackLengthFluxEstimator<M> {
    type EntityId = CellId;

    fn accumulator_mut(&mut self) -> &mut EntityAccumulator<CellId> {
        &mut self.accumulator
    }
}

impl<M: ContributionMultiplier> Estimator for CellTrackLengthFluxEstimator<M> {
    fn kind(&self) -> &'static str {
        "Cell Track-Length Flux Estimator"
    }

    fn accumulator(&self) -> &EntityAccumulator<CellId> {
        &self.accumulator
    }

    fn set_cosine_bin_boundaries(&mut self, _boundaries: &[f64]) -> Result<(), Error> {
        warn!(
            "Cosine bins cannot be set for cell track-length flux estimator {}, the bins are ignored.",
            self.id()
        );
        Ok(())
    }
}
