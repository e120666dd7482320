//! Error types for randfield.

use thiserror::Error;

use crate::volume::GridDims;

/// Result type alias for randfield operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for randfield operations.
///
/// `Domain` and `GridMismatch` indicate a caller contract violation and
/// always propagate. `Degenerate` marks a quantity that is undefined for
/// the given input (empty search volume, zero expected clusters).
/// Numeric saturation is never an error; saturated probabilities are
/// returned as flagged boundary values.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    /// Argument outside its valid range.
    #[error("domain error: {name} = {value} must be {expected}")]
    Domain {
        /// Name of the offending argument.
        name: &'static str,
        /// Value supplied by the caller.
        value: f64,
        /// Human-readable description of the valid range.
        expected: &'static str,
    },

    /// Grid shapes of the map, mask, or a label volume disagree.
    #[error("grid mismatch: {context} has dims {actual:?}, expected {expected:?}")]
    GridMismatch {
        /// Which input carried the wrong grid.
        context: &'static str,
        /// Dimensions the engine expected.
        expected: GridDims,
        /// Dimensions actually supplied.
        actual: GridDims,
    },

    /// The requested quantity is undefined for this input.
    #[error("degenerate input: {0}")]
    Degenerate(&'static str),

    /// Extraction aborted via the injected cancellation capability.
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Shorthand for a [`Error::Domain`] value.
    #[must_use]
    pub fn domain(name: &'static str, value: f64, expected: &'static str) -> Self {
        Self::Domain {
            name,
            value,
            expected,
        }
    }
}
