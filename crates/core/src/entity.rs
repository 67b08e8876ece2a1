use common::error::Error;
use common::moments::MomentAccumulator;
use common::types::{ParticleType, PhaseSpacePoint, RunContext};
use log::{debug, trace, warn};
use std::collections::{BTreeMap, HashMap};
use std::io::{self, Write};
use std::sync::Arc;

use crate::estimator::{EstimatorCore, ProcessedMoments};
use crate::traits::{EntityId, ParticleResponse, ParticleStateLike};

/// Per-entity moment storage on top of an [`EstimatorCore`].
///
/// Holds, for every entity, one accumulator per bin and response function and one
/// total per response function, plus the same two arrays summed over all entities.
/// Contributions of the history in progress are kept in an update tracker until
/// [`EntityAccumulator::commit_history_contribution`] folds them into the moments.
#[derive(Debug, Clone)]
pub struct EntityAccumulator<Id: EntityId> {
    core: EstimatorCore,
    entity_label: &'static str,
    entity_ids: Vec<Id>,
    entity_positions: HashMap<Id, usize>,
    entity_norm_constants: Vec<f64>,
    total_norm_constant: f64,
    entity_bin_moments: Vec<Vec<MomentAccumulator>>,
    entity_total_moments: Vec<Vec<MomentAccumulator>>,
    total_bin_moments: Vec<MomentAccumulator>,
    total_moments: Vec<MomentAccumulator>,
    // entity position -> bin index -> current history total
    update_tracker: BTreeMap<usize, BTreeMap<usize, f64>>,
}

impl<Id: EntityId> EntityAccumulator<Id> {
    /// Creates the accumulator for a fixed set of entities.
    ///
    /// # Arguments
    /// * `entity_label` - Name of the entity kind used in reports ("Cell", "Surface").
    /// * `entity_norm_constants` - One volume or area per entity, all 1 when `None`.
    ///
    /// # Errors
    /// Fails for an invalid multiplier, an empty entity list, or norm constants that are
    /// not one positive finite value per entity. Duplicate ids are dropped with a warning,
    /// the first occurrence wins.
    pub fn new(
        id: u64,
        multiplier: f64,
        entity_label: &'static str,
        entity_ids: &[Id],
        entity_norm_constants: Option<&[f64]>,
    ) -> Result<Self, Error> {
        let core = EstimatorCore::new(id, multiplier)?;

        if entity_ids.is_empty() {
            return Err(Error::EmptyEntitySet);
        }

        if let Some(norms) = entity_norm_constants {
            if norms.len() != entity_ids.len() {
                return Err(Error::NormConstantCountMismatch {
                    expected: entity_ids.len(),
                    got: norms.len(),
                });
            }
            if let Some(&bad) = norms.iter().find(|n| !(**n > 0.0) || !n.is_finite()) {
                return Err(Error::InvalidNormConstant(bad));
            }
        }

        let mut ids = Vec::with_capacity(entity_ids.len());
        let mut positions = HashMap::with_capacity(entity_ids.len());
        let mut norm_constants = Vec::with_capacity(entity_ids.len());

        for (i, &entity) in entity_ids.iter().enumerate() {
            if positions.contains_key(&entity) {
                warn!(
                    "Estimator {}: {} {} was specified more than once, the duplicate is ignored.",
                    id, entity_label, entity
                );
                continue;
            }

            positions.insert(entity, ids.len());
            ids.push(entity);
            norm_constants.push(entity_norm_constants.map_or(1.0, |n| n[i]));
        }

        let total_norm_constant = norm_constants.iter().sum();

        let mut accumulator = Self {
            core,
            entity_label,
            entity_ids: ids,
            entity_positions: positions,
            entity_norm_constants: norm_constants,
            total_norm_constant,
            entity_bin_moments: Vec::new(),
            entity_total_moments: Vec::new(),
            total_bin_moments: Vec::new(),
            total_moments: Vec::new(),
            update_tracker: BTreeMap::new(),
        };
        accumulator.resize_moments();

        Ok(accumulator)
    }

    pub fn core(&self) -> &EstimatorCore {
        &self.core
    }

    pub fn entity_label(&self) -> &'static str {
        self.entity_label
    }

    /// Reallocates every moment array for the current bins and response functions.
    /// Previously accumulated data is lost.
    fn resize_moments(&mut self) {
        let bins = self.core.num_bins_with_response_functions();
        let responses = self.core.num_response_functions();
        let entities = self.entity_ids.len();

        debug!(
            "Estimator {}: resizing moments to {} bins x {} entities",
            self.core.id(),
            bins,
            entities
        );

        self.entity_bin_moments = vec![vec![MomentAccumulator::new(); bins]; entities];
        self.entity_total_moments = vec![vec![MomentAccumulator::new(); responses]; entities];
        self.total_bin_moments = vec![MomentAccumulator::new(); bins];
        self.total_moments = vec![MomentAccumulator::new(); responses];
        self.update_tracker.clear();
    }

    pub fn set_energy_bin_boundaries(&mut self, boundaries: &[f64]) -> Result<(), Error> {
        self.core.set_energy_bin_boundaries(boundaries)?;
        self.resize_moments();
        Ok(())
    }

    pub fn set_cosine_bin_boundaries(&mut self, boundaries: &[f64]) -> Result<(), Error> {
        self.core.set_cosine_bin_boundaries(boundaries)?;
        self.resize_moments();
        Ok(())
    }

    pub fn set_time_bin_boundaries(&mut self, boundaries: &[f64]) -> Result<(), Error> {
        self.core.set_time_bin_boundaries(boundaries)?;
        self.resize_moments();
        Ok(())
    }

    pub fn set_collision_number_bins(&mut self, edges: &[u32]) -> Result<(), Error> {
        self.core.set_collision_number_bins(edges)?;
        self.resize_moments();
        Ok(())
    }

    pub fn set_response_functions(
        &mut self,
        response_functions: Vec<Arc<dyn ParticleResponse>>,
    ) -> Result<(), Error> {
        self.core.set_response_functions(response_functions)?;
        self.resize_moments();
        Ok(())
    }

    pub fn set_particle_types(&mut self, particle_types: &[ParticleType]) {
        self.core.set_particle_types(particle_types)
    }

    pub fn entity_ids(&self) -> &[Id] {
        &self.entity_ids
    }

    #[inline]
    pub fn is_entity_assigned(&self, entity_id: Id) -> bool {
        self.entity_positions.contains_key(&entity_id)
    }

    pub(crate) fn entity_position(&self, entity_id: Id) -> Option<usize> {
        self.entity_positions.get(&entity_id).copied()
    }

    pub fn entity_norm_constant(&self, entity_id: Id) -> Option<f64> {
        self.entity_position(entity_id)
            .map(|pos| self.entity_norm_constants[pos])
    }

    /// Sum of all entity norm constants.
    pub fn total_norm_constant(&self) -> f64 {
        self.total_norm_constant
    }

    /// Adds a partial contribution of the current history to an entity.
    ///
    /// Every response function is evaluated once and scales `raw_contribution`.
    /// Contributions for unassigned entities, unassigned particle types or points
    /// outside of the phase space are dropped.
    pub fn add_partial_history_contribution(
        &mut self,
        entity_id: Id,
        particle: &dyn ParticleStateLike,
        angle_cosine: f64,
        raw_contribution: f64,
    ) {
        debug_assert!(raw_contribution.is_finite());

        let Some(position) = self.entity_position(entity_id) else {
            trace!(
                "Estimator {}: {} {} is not assigned, contribution dropped",
                self.core.id(),
                self.entity_label,
                entity_id
            );
            return;
        };

        if !self.core.is_particle_type_assigned(particle.particle_type()) {
            trace!(
                "Estimator {}: {} contributions are not tallied",
                self.core.id(),
                particle.particle_type()
            );
            return;
        }

        let point = PhaseSpacePoint {
            energy: particle.energy(),
            cosine: angle_cosine,
            time: particle.time(),
            collision_number: particle.collision_number(),
        };

        for r in 0..self.core.num_response_functions() {
            let Some(bin) = self.core.calculate_bin_index(&point, r) else {
                trace!(
                    "Estimator {}: {:?} is outside of the phase space",
                    self.core.id(),
                    point
                );
                return;
            };

            let contribution = raw_contribution * self.core.evaluate_response_function(r, particle);
            self.add_to_update_tracker(position, bin, contribution);
        }
    }

    #[inline]
    fn add_to_update_tracker(&mut self, position: usize, bin: usize, contribution: f64) {
        *self
            .update_tracker
            .entry(position)
            .or_default()
            .entry(bin)
            .or_insert(0.0) += contribution;
    }

    pub fn has_uncommitted_history_contribution(&self) -> bool {
        !self.update_tracker.is_empty()
    }

    /// Drops the history in progress without scoring it.
    pub(crate) fn discard_history_contribution(&mut self) {
        self.update_tracker.clear();
    }

    /// Folds the current history into the moments and clears the update tracker.
    ///
    /// Per entity, each bin total is committed to the entity bin and summed into the
    /// entity total; across entities, bin totals and response totals are committed
    /// to the total-over-entities arrays.
    pub fn commit_history_contribution(&mut self) {
        let num_bins = self.core.num_bins();
        let num_responses = self.core.num_response_functions();

        let mut totals = vec![0.0; num_responses];
        let mut bin_totals: BTreeMap<usize, f64> = BTreeMap::new();

        let tracker = std::mem::take(&mut self.update_tracker);

        for (position, bins) in &tracker {
            let mut entity_totals = vec![0.0; num_responses];

            for (&bin, &contribution) in bins {
                let r = bin / num_bins;

                entity_totals[r] += contribution;
                totals[r] += contribution;
                *bin_totals.entry(bin).or_insert(0.0) += contribution;

                self.commit_to_bin_of_entity(*position, bin, contribution);
            }

            for (r, &total) in entity_totals.iter().enumerate() {
                self.commit_to_total_of_entity(*position, r, total);
            }
        }

        for (r, &total) in totals.iter().enumerate() {
            self.commit_to_total(r, total);
        }

        for (bin, total) in bin_totals {
            self.commit_to_bin_of_total(bin, total);
        }
    }

    #[inline]
    pub(crate) fn commit_to_bin_of_entity(&mut self, position: usize, bin: usize, contribution: f64) {
        if contribution != 0.0 {
            self.entity_bin_moments[position][bin].add(contribution);
        }
    }

    #[inline]
    pub(crate) fn commit_to_total_of_entity(
        &mut self,
        position: usize,
        response_function_index: usize,
        contribution: f64,
    ) {
        if contribution != 0.0 {
            self.entity_total_moments[position][response_function_index].add(contribution);
        }
    }

    #[inline]
    pub(crate) fn commit_to_bin_of_total(&mut self, bin: usize, contribution: f64) {
        if contribution != 0.0 {
            self.total_bin_moments[bin].add(contribution);
        }
    }

    #[inline]
    pub(crate) fn commit_to_total(&mut self, response_function_index: usize, contribution: f64) {
        if contribution != 0.0 {
            self.total_moments[response_function_index].add(contribution);
        }
    }

    /// Zeroes every moment and discards the history in progress.
    pub fn reset_data(&mut self) {
        self.entity_bin_moments
            .iter_mut()
            .flatten()
            .chain(self.entity_total_moments.iter_mut().flatten())
            .chain(self.total_bin_moments.iter_mut())
            .chain(self.total_moments.iter_mut())
            .for_each(MomentAccumulator::reset);

        self.update_tracker.clear();
    }

    /// Sums the committed moments of a replica into this accumulator.
    ///
    /// # Errors
    /// Returns `Error::IncompatibleEstimators` unless both share the same entities,
    /// bins, and response functions.
    pub fn merge(&mut self, other: &EntityAccumulator<Id>) -> Result<(), Error> {
        if !self.core.is_compatible_with(&other.core)
            || self.entity_ids != other.entity_ids
            || self.entity_norm_constants != other.entity_norm_constants
        {
            return Err(Error::IncompatibleEstimators(
                self.core.id(),
                other.core.id(),
            ));
        }

        fn merge_all(into: &mut [MomentAccumulator], from: &[MomentAccumulator]) {
            for (a, b) in into.iter_mut().zip(from) {
                a.merge(b);
            }
        }

        for (into, from) in self
            .entity_bin_moments
            .iter_mut()
            .zip(&other.entity_bin_moments)
        {
            merge_all(into, from);
        }
        for (into, from) in self
            .entity_total_moments
            .iter_mut()
            .zip(&other.entity_total_moments)
        {
            merge_all(into, from);
        }
        merge_all(&mut self.total_bin_moments, &other.total_bin_moments);
        merge_all(&mut self.total_moments, &other.total_moments);

        Ok(())
    }

    pub fn entity_bin_moments(&self, entity_id: Id) -> Option<&[MomentAccumulator]> {
        self.entity_position(entity_id)
            .map(|pos| self.entity_bin_moments[pos].as_slice())
    }

    pub fn entity_total_moments(&self, entity_id: Id) -> Option<&[MomentAccumulator]> {
        self.entity_position(entity_id)
            .map(|pos| self.entity_total_moments[pos].as_slice())
    }

    pub fn total_bin_moments(&self) -> &[MomentAccumulator] {
        &self.total_bin_moments
    }

    pub fn total_moments(&self) -> &[MomentAccumulator] {
        &self.total_moments
    }

    fn process_all(
        &self,
        moments: &[MomentAccumulator],
        norm_constant: f64,
        run: &RunContext,
    ) -> Vec<ProcessedMoments> {
        moments
            .iter()
            .map(|m| self.core.process_moments(m, norm_constant, run))
            .collect()
    }

    /// Per-bin estimates of one entity, normalized by its norm constant.
    pub fn entity_bin_processed_data(
        &self,
        entity_id: Id,
        run: &RunContext,
    ) -> Option<Vec<ProcessedMoments>> {
        let pos = self.entity_position(entity_id)?;

        Some(self.process_all(
            &self.entity_bin_moments[pos],
            self.entity_norm_constants[pos],
            run,
        ))
    }

    /// Per-response-function totals of one entity.
    pub fn entity_total_processed_data(
        &self,
        entity_id: Id,
        run: &RunContext,
    ) -> Option<Vec<ProcessedMoments>> {
        let pos = self.entity_position(entity_id)?;

        Some(self.process_all(
            &self.entity_total_moments[pos],
            self.entity_norm_constants[pos],
            run,
        ))
    }

    /// Per-bin estimates over all entities, normalized by the total norm constant.
    pub fn total_bin_processed_data(&self, run: &RunContext) -> Vec<ProcessedMoments> {
        self.process_all(&self.total_bin_moments, self.total_norm_constant, run)
    }

    pub fn total_processed_data(&self, run: &RunContext) -> Vec<ProcessedMoments> {
        self.process_all(&self.total_moments, self.total_norm_constant, run)
    }

    /// Prints the configuration, then per entity and over all entities the bin data
    /// followed by the totals.
    pub fn print(&self, os: &mut dyn Write, kind: &str, run: &RunContext) -> io::Result<()> {
        self.core.print_summary(os, kind)?;

        for (pos, entity) in self.entity_ids.iter().enumerate() {
            let norm = self.entity_norm_constants[pos];

            writeln!(os, "{}: {}", self.entity_label, entity)?;
            self.core
                .print_bin_data(os, &self.entity_bin_moments[pos], norm, run)?;
            writeln!(os, " {} Total:", self.entity_label)?;
            self.core
                .print_total_data(os, &self.entity_total_moments[pos], norm, run)?;
        }

        writeln!(os, "All {}s:", self.entity_label)?;
        self.core.print_bin_data(
            os,
            &self.total_bin_moments,
            self.total_norm_constant,
            run,
        )?;
        writeln!(os, " Total:")?;
        self.core.print_total_data(
            os,
            &self.total_moments,
            self.total_norm_constant,
            run,
        )
    }
}
