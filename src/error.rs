use thiserror::Error;
use crate::index_space::IndexSpace;




/**
 * Fatal configuration errors. Every variant indicates a setup or programming
 * mistake; none is transient and none is retried.
 */
#[derive(Debug, Error, PartialEq)]
pub enum Error {

    #[error("boundary interpolant order must be at least 1 (got {0})")]
    InvalidOrder(usize),

    #[error("level {requested} is beyond the deepest constructible level {deepest}")]
    LevelOutOfRange { requested: usize, deepest: usize },

    #[error("index space {0:?} cannot be coarsened evenly by two")]
    DegenerateCoarsening(IndexSpace),

    #[error("boundary registry does not match the operator's grid blocks")]
    GridMismatch,

    #[error("operator coefficients have not been set")]
    MissingCoefficients,

    #[error("coefficient storage does not match the discretization")]
    CoefficientMismatch,
}
