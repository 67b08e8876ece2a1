pub mod config;
pub mod error;
pub mod kernel_job;
pub mod reducer;
pub mod simulator;
pub mod types;
pub mod worker;

use env_logger::Env;
use log::info;
use std::io;
use std::time::Instant;
use tokio::sync::mpsc::{self, Sender};
use tokio::task::JoinHandle;

use common::types::RunContext;
use error::Error;
use kernel_job::KernelJob;
use reducer::Reducer;
use types::WorkerReport;
use worker::{Worker, split_histories};

#[tokio::main]
async fn main() -> Result<(), Error> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = config::load_config()?;
    info!(
        "Running {} {} histories on {} workers.",
        config.simulation.histories, config.simulation.particle_type, config.simulation.workers
    );

    let start = Instant::now();

    let (sender, receiver) = mpsc::channel::<WorkerReport>(config.simulation.workers);

    // Spawn tasks
    let reducer_handle = Reducer::new(receiver).spawn_task();
    let worker_handles = spawn_workers(&config, sender);

    for handle in worker_handles {
        handle
            .await
            .map_err(|e| Error::WorkerJoinFailed(e.to_string()))??;
    }

    let (tallies, num_histories) = reducer_handle
        .await
        .map_err(|e| Error::WorkerJoinFailed(e.to_string()))??;

    let elapsed = start.elapsed().as_secs_f64().max(f64::MIN_POSITIVE);
    let run = RunContext::new(num_histories, 0.0, elapsed)?;
    info!("Simulated {} histories in {:.3} s.", num_histories, elapsed);

    {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        tallies.print(&mut out, &run)?;
    }

    let kernel = KernelJob::new(config.kernel.clone())
        .spawn()
        .await
        .map_err(|e| Error::WorkerJoinFailed(e.to_string()))??;
    info!(
        "Free gas kernel integral: {:e} (error estimate {:e})",
        kernel.value, kernel.error_estimate
    );

    info!("Pipeline shut down.");
    Ok(())
}

/// Spawns one worker per configured thread; the sender is dropped once all are running.
fn spawn_workers(
    config: &config::Config,
    sender: Sender<WorkerReport>,
) -> Vec<JoinHandle<Result<(), Error>>> {
    split_histories(config.simulation.histories, config.simulation.workers)
        .into_iter()
        .enumerate()
        .filter(|(_, histories)| *histories > 0)
        .map(|(id, histories)| Worker::new(id, histories, config.clone()).spawn(sender.clone()))
        .collect()
}
