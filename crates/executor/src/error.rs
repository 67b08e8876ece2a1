use thiserror::Error;

use common::error::Error as TallyError;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to load configuration: {0}")]
    ConfigLoadError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Channel sender failed: Receiver has been dropped.")]
    ChannelSendFailed,

    #[error("Worker task failed to complete: {0}")]
    WorkerJoinFailed(String),

    #[error("No worker delivered a replica.")]
    NoReplicas,

    #[error("Tally error: {0}")]
    TallyError(#[from] TallyError),

    #[error("Failed to write report: {0}")]
    IoError(#[from] std::io::Error),
}
