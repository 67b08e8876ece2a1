use common::types::{ParticleType, RunContext};
use std::sync::Arc;
use tally_core::distributions::UniformDistribution;
use tally_core::estimators::{
    CellCollisionFluxEstimator, CellTrackLengthFluxEstimator, SurfaceCurrentEstimator,
};
use tally_core::multiplier::{WeightAndEnergyMultiplier, WeightMultiplier};
use tally_core::response::{DefaultResponse, FnResponse};
use tally_core::traits::ParticleResponse;
use tally_core::{Estimator, ParticleState};

fn neutron(energy: f64) -> ParticleState {
    ParticleState::new(ParticleType::Neutron, energy)
}

/// Histories are replayed from `(cell, energy, track length)` lists.
fn run_histories(
    estimator: &mut CellTrackLengthFluxEstimator<WeightMultiplier>,
    histories: &[Vec<(u64, f64, f64)>],
) {
    for history in histories {
        for &(cell, energy, length) in history {
            estimator.update_from_particle_subtrack_ending_in_cell_event(
                &neutron(energy),
                cell,
                length,
            );
        }
        estimator.commit_history_contribution();
    }
}

fn configured_track_length() -> CellTrackLengthFluxEstimator<WeightMultiplier> {
    let mut estimator =
        CellTrackLengthFluxEstimator::<WeightMultiplier>::new(7, 2.0, &[1, 2], &[1.0, 4.0])
            .unwrap();
    estimator.set_energy_bin_boundaries(&[0.0, 1.0, 10.0]).unwrap();

    let low_energy: Arc<dyn ParticleResponse> = Arc::new(FnResponse::energy(
        "low energy",
        Arc::new(UniformDistribution::new(0.0, 1.0, 1.0).unwrap()),
    ));
    estimator
        .set_response_functions(vec![DefaultResponse::shared(), low_energy])
        .unwrap();

    estimator
}

#[test]
fn multi_history_statistics() {
    let mut estimator = configured_track_length();
    let histories = vec![
        vec![(1, 0.5, 1.0), (1, 0.5, 1.0), (2, 5.0, 4.0)],
        vec![(1, 5.0, 2.0)],
        vec![],
        vec![(2, 0.25, 8.0)],
    ];
    run_histories(&mut estimator, &histories);

    let run = RunContext::new(4, 0.0, 2.0).unwrap();
    let acc = estimator.accumulator();

    // Cell 1, default response, low energy bin: one history scoring 2.
    let cell_1 = acc.entity_bin_moments(1).unwrap();
    assert_eq!(cell_1[0].first(), 2.0);
    assert_eq!(cell_1[0].second(), 4.0);
    assert_eq!(cell_1[1].first(), 2.0);
    // Low energy response: only the 0.5 MeV tracks count.
    assert_eq!(cell_1[2].first(), 2.0);
    assert!(cell_1[3].is_zero());

    let processed = acc.entity_bin_processed_data(1, &run).unwrap();
    assert_eq!(processed[0].mean, 2.0 / 4.0 * 2.0);
    assert!((processed[0].relative_error - (1.0f64 - 0.25).sqrt()).abs() < 1e-15);

    // Cell totals merge both energy bins inside each history.
    let cell_1_total = acc.entity_total_moments(1).unwrap();
    assert_eq!(cell_1_total[0].first(), 4.0);
    assert_eq!(cell_1_total[0].second(), 8.0);

    // Over all cells the first history scores 2 + 4 in the default response.
    let total = acc.total_moments();
    assert_eq!(total[0].first(), 6.0 + 2.0 + 8.0);
    assert_eq!(total[0].second(), 36.0 + 4.0 + 64.0);
    assert_eq!(total[1].first(), 2.0 + 8.0);

    let total_processed = acc.total_processed_data(&run);
    assert_eq!(total_processed[0].mean, 16.0 / 4.0 * 2.0 / 5.0);
}

#[test]
fn merged_replicas_match_a_single_run() {
    let histories = vec![
        vec![(1, 0.5, 1.0), (2, 5.0, 4.0)],
        vec![(1, 5.0, 2.0)],
        vec![(2, 0.25, 8.0), (2, 0.75, 1.0)],
        vec![(1, 9.0, 3.0)],
    ];

    let mut single = configured_track_length();
    run_histories(&mut single, &histories);

    let mut left = configured_track_length();
    let mut right = configured_track_length();
    run_histories(&mut left, &histories[..2]);
    run_histories(&mut right, &histories[2..]);
    left.merge(&right).unwrap();

    for cell in [1, 2] {
        assert_eq!(
            left.accumulator().entity_bin_moments(cell),
            single.accumulator().entity_bin_moments(cell)
        );
        assert_eq!(
            left.accumulator().entity_total_moments(cell),
            single.accumulator().entity_total_moments(cell)
        );
    }
    assert_eq!(left.accumulator().total_moments(), single.accumulator().total_moments());
}

#[test]
fn merging_differently_binned_replicas_fails() {
    let mut a = configured_track_length();
    let mut b = configured_track_length();
    b.set_energy_bin_boundaries(&[0.0, 2.0, 10.0]).unwrap();

    assert!(a.merge(&b).is_err());
}

#[test]
fn report_lists_every_entity_and_response() {
    let mut estimator = configured_track_length();
    run_histories(&mut estimator, &[vec![(1, 0.5, 1.0)]]);

    let run = RunContext::new(1, 0.0, 1.0).unwrap();
    let mut out = Vec::new();
    estimator.print(&mut out, &run).unwrap();
    let report = String::from_utf8(out).unwrap();

    assert!(report.contains("Cell Track-Length Flux Estimator: 7"));
    assert!(report.contains("Cell: 1"));
    assert!(report.contains("Cell: 2"));
    assert!(report.contains("All Cells:"));
    assert!(report.contains("Response Function: default"));
    assert!(report.contains("Response Function: low energy"));
    assert!(report.contains("Energy Bin: [0,1]"));
}

#[test]
fn estimators_share_a_history() {
    let mut collision =
        CellCollisionFluxEstimator::<WeightMultiplier>::new(0, 1.0, &[1], &[2.0]).unwrap();
    let mut current =
        SurfaceCurrentEstimator::<WeightAndEnergyMultiplier>::new(1, 1.0, &[10]).unwrap();

    let mut particle = neutron(2.0).with_weight(0.5);
    collision.update_from_particle_colliding_in_cell_event(&particle, 1, 4.0);
    particle.advance(1.0);
    current.update_from_particle_crossing_surface_event(&particle, 10, 1.0);
    current.update_from_particle_crossing_surface_event(&particle, 10, -1.0);

    collision.commit_history_contribution();
    current.commit_history_contribution();

    let run = RunContext::new(1, 0.0, 1.0).unwrap();
    assert_eq!(collision.accumulator().entity_bin_processed_data(1, &run).unwrap()[0].mean, 1.0);
    assert_eq!(current.accumulator().entity_bin_moments(10).unwrap()[0].first(), 2.0);
}
