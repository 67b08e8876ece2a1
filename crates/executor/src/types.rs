use std::io::Write;
use std::sync::Arc;

use super::config::{GeometryConfig, TallyConfig};
use super::error::Error;
use common::types::RunContext;
use tally_core::Estimator;
use tally_core::estimators::{
    CellCollisionFluxEstimator, CellPulseHeightEstimator, CellTrackLengthFluxEstimator, CellId,
    SurfaceCurrentEstimator, SurfaceFluxEstimator, SurfaceId,
};
use tally_core::multiplier::{WeightAndEnergyMultiplier, WeightMultiplier};
use tally_core::response::{DefaultResponse, FnResponse};
use tally_core::traits::ParticleResponse;

/// One replica of every estimator the slab simulation drives.
///
/// Each worker owns a `TallySet`; the reducer merges them.
#[derive(Debug, Clone)]
pub struct TallySet {
    pub track_length: CellTrackLengthFluxEstimator<WeightMultiplier>,
    pub collision: CellCollisionFluxEstimator<WeightMultiplier>,
    pub surface_flux: SurfaceFluxEstimator<WeightMultiplier>,
    pub surface_current: SurfaceCurrentEstimator<WeightMultiplier>,
    pub pulse_height: CellPulseHeightEstimator<WeightAndEnergyMultiplier>,
}

/// Cell `i` is the slab between surfaces `i` and `i + 1`.
pub fn cell_ids(geometry: &GeometryConfig) -> Vec<CellId> {
    (0..geometry.cell_widths.len() as CellId).collect()
}

pub fn surface_ids(geometry: &GeometryConfig) -> Vec<SurfaceId> {
    (0..=geometry.cell_widths.len() as SurfaceId).collect()
}

impl TallySet {
    pub fn new(geometry: &GeometryConfig, tally: &TallyConfig) -> Result<Self, Error> {
        let cells = cell_ids(geometry);
        let surfaces = surface_ids(geometry);
        // Unit cross-sectional area, so slab volumes are the widths.
        let volumes = &geometry.cell_widths;
        let areas = vec![1.0; surfaces.len()];

        let mut track_length = CellTrackLengthFluxEstimator::<WeightMultiplier>::new(
            0,
            tally.multiplier,
            &cells,
            volumes,
        )?;
        let mut collision =
            CellCollisionFluxEstimator::<WeightMultiplier>::new(1, tally.multiplier, &cells, volumes)?;
        let mut surface_flux =
            SurfaceFluxEstimator::<WeightMultiplier>::new(2, tally.multiplier, &surfaces, &areas)?;
        let mut surface_current =
            SurfaceCurrentEstimator::<WeightMultiplier>::new(3, tally.multiplier, &surfaces)?;
        let mut pulse_height =
            CellPulseHeightEstimator::<WeightAndEnergyMultiplier>::new(4, tally.multiplier, &cells)?;

        track_length.set_energy_bin_boundaries(&tally.energy_bins)?;
        collision.set_energy_bin_boundaries(&tally.energy_bins)?;
        surface_flux.set_energy_bin_boundaries(&tally.energy_bins)?;
        surface_current.set_energy_bin_boundaries(&tally.energy_bins)?;
        pulse_height.set_energy_bin_boundaries(&tally.energy_bins)?;

        surface_flux.set_cosine_cutoff_value(tally.cosine_cutoff)?;
        surface_current.set_cosine_bin_boundaries(&[-1.0, 0.0, 1.0])?;

        let sigma_a = geometry.total_cross_section * geometry.absorption_probability;
        let absorption_rate: Arc<dyn ParticleResponse> =
            Arc::new(FnResponse::new("absorption rate", true, move |_| sigma_a));
        track_length.set_response_functions(vec![DefaultResponse::shared(), absorption_rate])?;

        Ok(Self {
            track_length,
            collision,
            surface_flux,
            surface_current,
            pulse_height,
        })
    }

    /// Ends the current history on every estimator.
    pub fn commit_history_contribution(&mut self) {
        self.track_length.commit_history_contribution();
        self.collision.commit_history_contribution();
        self.surface_flux.commit_history_contribution();
        self.surface_current.commit_history_contribution();
        self.pulse_height.commit_history_contribution();
    }

    pub fn has_uncommitted_history_contribution(&self) -> bool {
        self.track_length.has_uncommitted_history_contribution()
            || self.collision.has_uncommitted_history_contribution()
            || self.surface_flux.has_uncommitted_history_contribution()
            || self.surface_current.has_uncommitted_history_contribution()
            || self.pulse_height.has_uncommitted_history_contribution()
    }

    pub fn merge(&mut self, other: &TallySet) -> Result<(), Error> {
        self.track_length.merge(&other.track_length)?;
        self.collision.merge(&other.collision)?;
        self.surface_flux.merge(&other.surface_flux)?;
        self.surface_current.merge(&other.surface_current)?;
        self.pulse_height.merge(&other.pulse_height)?;
        Ok(())
    }

    pub fn print(&self, os: &mut dyn Write, run: &RunContext) -> Result<(), Error> {
        self.track_length.print(os, run)?;
        writeln!(os)?;
        self.collision.print(os, run)?;
        writeln!(os)?;
        self.surface_flux.print(os, run)?;
        writeln!(os)?;
        self.surface_current.print(os, run)?;
        writeln!(os)?;
        self.pulse_height.print(os, run)?;
        Ok(())
    }
}

/// Replica delivered by a worker once its share of histories is done.
#[derive(Debug)]
pub struct WorkerReport {
    pub worker_id: usize,
    pub num_histories: u64,
    pub tallies: TallySet,
}
