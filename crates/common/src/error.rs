use thiserror::Error;

use crate::types::PhaseSpaceDimension;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// A continuous axis needs at least two boundaries, the collision number axis at least one edge.
    #[error("{dimension} bins need at least {required} boundaries, got {got}.")]
    TooFewBinBoundaries {
        dimension: PhaseSpaceDimension,
        required: usize,
        got: usize,
    },

    #[error("{dimension} bin boundaries must be strictly increasing (index {index}).")]
    NonAscendingBinBoundaries {
        dimension: PhaseSpaceDimension,
        index: usize,
    },

    #[error("{dimension} bin boundary {value} is outside of the allowed range.")]
    BinBoundaryOutOfRange {
        dimension: PhaseSpaceDimension,
        value: f64,
    },

    #[error("At least one response function must be assigned to an estimator.")]
    EmptyResponseFunctions,

    #[error("At least one entity must be assigned to an estimator.")]
    EmptyEntitySet,

    #[error("Expected {expected} entity normalization constants, got {got}.")]
    NormConstantCountMismatch { expected: usize, got: usize },

    #[error("Entity normalization constant {0} must be positive and finite.")]
    InvalidNormConstant(f64),

    #[error("Estimator multiplier {0} must be positive and finite.")]
    InvalidMultiplier(f64),

    #[error("The number of histories must be greater than zero.")]
    InvalidHistoryCount,

    #[error("Elapsed simulation time {0} must be positive.")]
    InvalidElapsedTime(f64),

    #[error("Cosine cutoff {0} must lie in (0, 1].")]
    InvalidCosineCutoff(f64),

    #[error("Kernel parameter {name} = {value} is invalid.")]
    InvalidKernelParameter { name: &'static str, value: f64 },

    #[error("Independent variable {name} = {value} is outside of [{min}, {max}].")]
    IndependentVariableOutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("Estimators {0} and {1} do not share the same configuration and cannot be merged.")]
    IncompatibleEstimators(u64, u64),

    /// Postcondition violation: a numerical routine produced NaN or infinity.
    #[error("Non-finite result encountered in {0}.")]
    NonFiniteResult(&'static str),

    #[error("Modified Bessel function I0 overflows for argument {0}.")]
    BesselOverflow(f64),

    #[error("Adaptive integration reached the subinterval limit ({0}) before converging.")]
    SubintervalLimitReached(usize),

    #[error("Adaptive integration cannot reach the requested tolerance because of round-off.")]
    IntegrationRoundOff,
}
