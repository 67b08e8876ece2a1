use log::info;
use tokio::sync::mpsc::Receiver;

use super::error::Error;
use super::types::{TallySet, WorkerReport};

/// Async consumer that merges worker replicas into one tally set.
pub struct Reducer {
    receiver: Receiver<WorkerReport>,
}

impl Reducer {
    pub fn new(receiver: Receiver<WorkerReport>) -> Self {
        Self { receiver }
    }

    /// Merges replicas until every sender is dropped.
    ///
    /// Returns the merged tallies and the total number of histories behind them.
    pub async fn reduce(mut self) -> Result<(TallySet, u64), Error> {
        info!("Reducer ready.");

        let mut merged: Option<TallySet> = None;
        let mut num_histories = 0;

        while let Some(report) = self.receiver.recv().await {
            info!(
                "Reducer received {} histories from worker {}.",
                report.num_histories, report.worker_id
            );
            num_histories += report.num_histories;

            match merged.as_mut() {
                Some(tallies) => tallies.merge(&report.tallies)?,
                None => merged = Some(report.tallies),
            }
        }

        info!("Receiver closed, reduced {} histories.", num_histories);

        merged
            .map(|tallies| (tallies, num_histories))
            .ok_or(Error::NoReplicas)
    }

    pub fn spawn_task(self) -> tokio::task::JoinHandle<Result<(TallySet, u64), Error>> {
        tokio::spawn(self.reduce())
    }
}
