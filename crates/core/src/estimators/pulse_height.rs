use common::error::Error;
use common::types::{ParticleType, PhaseSpacePoint};
use log::{trace, warn};
use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;

use super::CellId;
use crate::entity::EntityAccumulator;
use crate::estimator::Estimator;
use crate::estimator::sealed::AccumulatorAccess;
use crate::traits::{ParticleResponse, ParticleStateLike, PulseHeightMultiplier};

/// Particle types that can deposit energy in a pulse height cell.
pub const PULSE_HEIGHT_PARTICLE_TYPES: [ParticleType; 3] = [
    ParticleType::Photon,
    ParticleType::Electron,
    ParticleType::Positron,
];

/// Energy deposited per history in a cell, binned by deposited energy.
///
/// Entering a cell adds `weight * energy` to the cell's deposition, leaving subtracts it.
/// At commit time every cell with a non-zero deposition scores once in the energy bin
/// of its deposition, and the sum over all cells scores once in the total bins.
#[derive(Debug, Clone)]
pub struct CellPulseHeightEstimator<M: PulseHeightMultiplier> {
    accumulator: EntityAccumulator<CellId>,
    // cell position -> current history deposition
    energy_depositions: BTreeMap<usize, f64>,
    _multiplier: PhantomData<M>,
}

impl<M: PulseHeightMultiplier> CellPulseHeightEstimator<M> {
    pub fn new(id: u64, multiplier: f64, cell_ids: &[CellId]) -> Result<Self, Error> {
        let mut accumulator = EntityAccumulator::new(id, multiplier, "Cell", cell_ids, None)?;
        accumulator.set_particle_types(&PULSE_HEIGHT_PARTICLE_TYPES);

        Ok(Self {
            accumulator,
            energy_depositions: BTreeMap::new(),
            _multiplier: PhantomData,
        })
    }

    pub fn update_from_particle_entering_cell_event(
        &mut self,
        particle: &dyn ParticleStateLike,
        cell_entering: CellId,
    ) {
        self.add_energy_deposition(particle, cell_entering, 1.0);
    }

    pub fn update_from_particle_leaving_cell_event(
        &mut self,
        particle: &dyn ParticleStateLike,
        cell_leaving: CellId,
    ) {
        self.add_energy_deposition(particle, cell_leaving, -1.0);
    }

    fn add_energy_deposition(&mut self, particle: &dyn ParticleStateLike, cell: CellId, sign: f64) {
        let Some(position) = self.accumulator.entity_position(cell) else {
            trace!("Pulse height estimator {}: cell {} is not assigned", self.id(), cell);
            return;
        };

        if !self
            .accumulator
            .core()
            .is_particle_type_assigned(particle.particle_type())
        {
            return;
        }

        *self.energy_depositions.entry(position).or_insert(0.0) +=
            sign * particle.weight() * particle.energy();
    }

    /// Energy bin of a deposition, `None` when it is outside of the energy bins.
    fn deposition_bin(&self, energy_deposition: f64) -> Option<usize> {
        self.accumulator
            .core()
            .calculate_bin_index(&PhaseSpacePoint::energy_only(energy_deposition), 0)
    }

    fn warn_ignored(&self, what: &str) {
        warn!(
            "{} cannot be set for pulse height estimator {}, the request is ignored.",
            what,
            self.id()
        );
    }
}

impl<M: PulseHeightMultiplier> AccumulatorAccess for CellPulseHeightEstimator<M> {
    type EntityId = CellId;

    fn accumulator_mut(&mut self) -> &mut EntityAccumulator<CellId> {
        &mut self.accumulator
    }
}

impl<M: PulseHeightMultiplier> Estimator for CellPulseHeightEstimator<M> {
    fn kind(&self) -> &'static str {
        "Cell Pulse Height Estimator"
    }

    fn accumulator(&self) -> &EntityAccumulator<CellId> {
        &self.accumulator
    }

    fn set_cosine_bin_boundaries(&mut self, _boundaries: &[f64]) -> Result<(), Error> {
        self.warn_ignored("Cosine bins");
        Ok(())
    }

    fn set_time_bin_boundaries(&mut self, _boundaries: &[f64]) -> Result<(), Error> {
        self.warn_ignored("Time bins");
        Ok(())
    }

    fn set_collision_number_bins(&mut self, _edges: &[u32]) -> Result<(), Error> {
        self.warn_ignored("Collision number bins");
        Ok(())
    }

    fn set_response_functions(
        &mut self,
        _response_functions: Vec<Arc<dyn ParticleResponse>>,
    ) -> Result<(), Error> {
        self.warn_ignored("Response functions");
        Ok(())
    }

    /// Only photons, electrons and positrons are kept.
    fn set_particle_types(&mut self, particle_types: &[ParticleType]) {
        let (valid, invalid): (Vec<ParticleType>, Vec<ParticleType>) = particle_types
            .iter()
            .copied()
            .partition(|t| PULSE_HEIGHT_PARTICLE_TYPES.contains(t));

        for particle_type in invalid {
            warn!(
                "Particle type {} cannot contribute to pulse height estimator {}, it is ignored.",
                particle_type,
                self.id()
            );
        }

        self.accumulator.set_particle_types(&valid);
    }

    fn has_uncommitted_history_contribution(&self) -> bool {
        !self.energy_depositions.is_empty()
    }

    fn commit_history_contribution(&mut self) {
        // Only depositions score here, anything else in the accumulator is stale.
        self.accumulator.discard_history_contribution();
        let depositions = std::mem::take(&mut self.energy_depositions);

        if depositions.is_empty() {
            return;
        }

        let mut total_deposition = 0.0;

        for (position, deposition) in depositions {
            total_deposition += deposition;

            if deposition == 0.0 {
                continue;
            }

            if let Some(bin) = self.deposition_bin(deposition) {
                let contribution = M::pulse_contribution(deposition);

                self.accumulator
                    .commit_to_bin_of_entity(position, bin, contribution);
                self.accumulator
                    .commit_to_total_of_entity(position, 0, contribution);
            }
        }

        if total_deposition == 0.0 {
            return;
        }

        if let Some(bin) = self.deposition_bin(total_deposition) {
            let contribution = M::pulse_contribution(total_deposition);

            self.accumulator.commit_to_bin_of_total(bin, contribution);
            self.accumulator.commit_to_total(0, contribution);
        }
    }

    fn reset_data(&mut self) {
        self.accumulator.reset_data();
        self.energy_depositions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multiplier::{WeightAndEnergyMultiplier, WeightMultiplier};
    use crate::particle::ParticleState;
    use crate::response::DefaultResponse;

    fn photon(energy: f64) -> ParticleState {
        ParticleState::new(ParticleType::Photon, energy)
    }

    #[test]
    fn default_particle_types() {
        let estimator = CellPulseHeightEstimator::<WeightMultiplier>::new(0, 1.0, &[0]).unwrap();

        assert!(estimator.is_particle_type_assigned(ParticleType::Photon));
        assert!(estimator.is_particle_type_assigned(ParticleType::Electron));
        assert!(estimator.is_particle_type_assigned(ParticleType::Positron));
        assert!(!estimator.is_particle_type_assigned(ParticleType::Neutron));
        assert!(!estimator.is_particle_type_assigned(ParticleType::AdjointPhoton));
    }

    #[test]
    fn invalid_particle_types_are_dropped() {
        let mut estimator =
            CellPulseHeightEstimator::<WeightMultiplier>::new(0, 1.0, &[0]).unwrap();
        estimator.set_particle_types(&[ParticleType::Neutron, ParticleType::Electron]);

        assert!(estimator.is_particle_type_assigned(ParticleType::Electron));
        assert!(!estimator.is_particle_type_assigned(ParticleType::Neutron));
        assert!(!estimator.is_particle_type_assigned(ParticleType::Photon));
    }

    #[test]
    fn only_energy_bins_apply() {
        let mut estimator =
            CellPulseHeightEstimator::<WeightMultiplier>::new(0, 1.0, &[0]).unwrap();

        estimator.set_energy_bin_boundaries(&[0.0, 1.0, 2.0]).unwrap();
        estimator.set_cosine_bin_boundaries(&[-1.0, 0.0, 1.0]).unwrap();
        estimator.set_time_bin_boundaries(&[0.0, 1.0, 2.0]).unwrap();
        estimator.set_collision_number_bins(&[0, 1]).unwrap();
        estimator
            .set_response_functions(vec![DefaultResponse::shared(), DefaultResponse::shared()])
            .unwrap();

        let core = estimator.accumulator().core();
        assert_eq!(core.num_bins(), 2);
        assert_eq!(core.num_response_functions(), 1);
    }

    /// A photon enters cell 0 with 1 MeV, leaves into cell 1 with 0.5 MeV and leaves
    /// cell 1 with 0.45 MeV.
    #[test]
    fn deposition_is_binned_per_cell_and_in_total() {
        let mut estimator =
            CellPulseHeightEstimator::<WeightAndEnergyMultiplier>::new(0, 10.0, &[0, 1]).unwrap();
        estimator.set_energy_bin_boundaries(&[0.0, 0.1, 1.0]).unwrap();

        estimator.update_from_particle_entering_cell_event(&photon(1.0), 0);
        assert!(estimator.has_uncommitted_history_contribution());
        estimator.update_from_particle_leaving_cell_event(&photon(0.5), 0);
        estimator.update_from_particle_entering_cell_event(&photon(0.5), 1);
        estimator.update_from_particle_leaving_cell_event(&photon(0.45), 1);
        estimator.commit_history_contribution();
        assert!(!estimator.has_uncommitted_history_contribution());

        let acc = estimator.accumulator();
        let cell_0 = acc.entity_bin_moments(0).unwrap();
        assert!(cell_0[0].is_zero());
        assert_eq!(cell_0[1].first(), 0.5);

        let cell_1 = acc.entity_bin_moments(1).unwrap();
        assert!((cell_1[0].first() - 0.05).abs() < 1e-15);
        assert!(cell_1[1].is_zero());

        let total = acc.total_bin_moments();
        assert!(total[0].is_zero());
        assert!((total[1].first() - 0.55).abs() < 1e-15);
    }

    #[test]
    fn count_mode_scores_one_per_history() {
        let mut estimator =
            CellPulseHeightEstimator::<WeightMultiplier>::new(0, 1.0, &[0, 1]).unwrap();
        estimator.set_energy_bin_boundaries(&[0.0, 1.0, 10.0]).unwrap();

        estimator.update_from_particle_entering_cell_event(&photon(5.0), 0);
        estimator.update_from_particle_leaving_cell_event(&photon(5.0), 0);
        estimator.update_from_particle_entering_cell_event(&photon(5.0), 1);
        estimator.commit_history_contribution();

        let acc = estimator.accumulator();
        assert!(acc.entity_bin_moments(0).unwrap().iter().all(|m| m.is_zero()));
        assert_eq!(acc.entity_bin_moments(1).unwrap()[1].first(), 1.0);
        assert_eq!(acc.total_bin_moments()[1].first(), 1.0);
    }

    #[test]
    fn neutrons_do_not_deposit() {
        let mut estimator =
            CellPulseHeightEstimator::<WeightMultiplier>::new(0, 1.0, &[0]).unwrap();
        let neutron = ParticleState::new(ParticleType::Neutron, 1.0);

        estimator.update_from_particle_entering_cell_event(&neutron, 0);
        assert!(!estimator.has_uncommitted_history_contribution());
    }

    #[test]
    fn reset_discards_depositions() {
        let mut estimator =
            CellPulseHeightEstimator::<WeightMultiplier>::new(0, 1.0, &[0]).unwrap();

        estimator.update_from_particle_entering_cell_event(&photon(1.0), 0);
        estimator.reset_data();
        estimator.commit_history_contribution();

        assert!(estimator.accumulator().total_bin_moments()[0].is_zero());
    }

    #[test]
    fn commit_drops_stray_accumulator_contributions() {
        let mut estimator =
            CellPulseHeightEstimator::<WeightMultiplier>::new(0, 1.0, &[0]).unwrap();
        estimator.set_energy_bin_boundaries(&[0.0, 1.0, 2.0]).unwrap();

        estimator
            .accumulator_mut()
            .add_partial_history_contribution(0, &photon(0.5), 1.0, 3.0);
        estimator.update_from_particle_entering_cell_event(&photon(1.5), 0);
        estimator.commit_history_contribution();

        let acc = estimator.accumulator();
        assert!(!acc.has_uncommitted_history_contribution());
        assert!(acc.entity_bin_moments(0).unwrap()[0].is_zero());
        assert_eq!(acc.entity_bin_moments(0).unwrap()[1].first(), 1.0);
    }
}
