mod cell_collision;
mod cell_track_length;
mod pulse_height;
mod surface;

pub use cell_collision::CellCollisionFluxEstimator;
pub use cell_track_length::CellTrackLengthFluxEstimator;
pub use pulse_height::{CellPulseHeightEstimator, PULSE_HEIGHT_PARTICLE_TYPES};
pub use surface::{
    DEFAULT_COSINE_CUTOFF, SurfaceCurrentEstimator, SurfaceFluxEstimator, calculate_angle_cosine,
};

/// Handle of a geometry cell.
pub type CellId = u64;

/// Handle of a geometry surface.
pub type SurfaceId = u64;
