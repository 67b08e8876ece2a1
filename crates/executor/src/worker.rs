use log::info;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;

use super::config::Config;
use super::error::Error;
use super::simulator::SlabSimulator;
use super::types::{TallySet, WorkerReport};

/// Simulates a share of the histories on its own estimator replicas.
pub struct Worker {
    id: usize,
    num_histories: u64,
    config: Config,
}

/// Splits `total` histories over `workers`, the first workers taking the remainder.
pub fn split_histories(total: u64, workers: usize) -> Vec<u64> {
    let workers = workers.max(1) as u64;
    let base = total / workers;
    let remainder = total % workers;

    (0..workers)
        .map(|i| base + u64::from(i < remainder))
        .collect()
}

impl Worker {
    pub fn new(id: usize, num_histories: u64, config: Config) -> Self {
        Worker {
            id,
            num_histories,
            config,
        }
    }

    /// Runs every history of this worker. Worker `i` seeds its generator with `seed + i`.
    pub fn run(self) -> Result<WorkerReport, Error> {
        let mut tallies = TallySet::new(&self.config.geometry, &self.config.tally)?;
        let seed = self.config.simulation.seed.wrapping_add(self.id as u64);
        let mut simulator =
            SlabSimulator::new(&self.config.geometry, &self.config.simulation, seed);

        for _ in 0..self.num_histories {
            simulator.run_history(&mut tallies);
        }

        info!(
            "Worker {} finished {} histories.",
            self.id, self.num_histories
        );

        Ok(WorkerReport {
            worker_id: self.id,
            num_histories: self.num_histories,
            tallies,
        })
    }

    /// Runs the worker on the blocking pool and sends its replica to the reducer.
    pub fn spawn(self, sender: Sender<WorkerReport>) -> JoinHandle<Result<(), Error>> {
        tokio::task::spawn_blocking(move || {
            let report = self.run()?;
            sender
                .blocking_send(report)
                .map_err(|_| Error::ChannelSendFailed)
        })
    }
}
