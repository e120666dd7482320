//! Statistic kind tag.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Kind of per-voxel statistic a map carries.
///
/// A tagged variant dispatched with `match`; the degrees-of-freedom
/// payload only exists for t-statistics.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StatKind {
    /// Standard normal (z) statistic.
    Z,
    /// Student-t statistic with degrees of freedom.
    T {
        /// Degrees of freedom; finite and positive.
        df: f64,
    },
}

impl StatKind {
    /// Creates a t-statistic kind, validating the degrees of freedom.
    ///
    /// # Errors
    /// Returns [`Error::Domain`] if `df` is not finite and positive.
    pub fn t(df: f64) -> Result<Self> {
        if !df.is_finite() || df <= 0.0 {
            return Err(Error::domain("df", df, "finite and > 0"));
        }
        Ok(Self::T { df })
    }

    /// Degrees of freedom, if this is a t-statistic.
    #[inline]
    #[must_use]
    pub fn df(&self) -> Option<f64> {
        match self {
            Self::Z => None,
            Self::T { df } => Some(*df),
        }
    }

    /// Validates the kind's payload.
    ///
    /// # Errors
    /// Returns [`Error::Domain`] for a t kind whose degrees of freedom are
    /// not finite and positive.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Z => Ok(()),
            Self::T { df } if df.is_finite() && *df > 0.0 => Ok(()),
            Self::T { df } => Err(Error::domain("df", *df, "finite and > 0")),
        }
    }
}
