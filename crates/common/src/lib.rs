pub mod constants;
pub mod error;
pub mod high_precision;
pub mod moments;
pub mod numeric_kernel;
pub mod special;
pub mod types;

pub use error::Error;
pub use moments::MomentAccumulator;
pub use types::{ParticleType, PhaseSpaceDimension, PhaseSpacePoint, RunContext};
