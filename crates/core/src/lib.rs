pub mod distributions;
pub mod entity;
pub mod estimator;
pub mod estimators;
pub mod kernel;
pub mod multiplier;
pub mod particle;
pub mod phase_space;
pub mod response;
pub mod traits;

pub use entity::EntityAccumulator;
pub use estimator::{Estimator, EstimatorCore, ProcessedMoments};
pub use particle::ParticleState;
pub use phase_space::PhaseSpaceDiscretization;
