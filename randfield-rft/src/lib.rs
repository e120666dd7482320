//! randfield-rft: Random field theory statistics.
//!
//! This crate implements the statistical payload of randfield:
//! - **convert** - t/z/p statistic conversions and Bonferroni correction
//! - **resels** - resel counts from an analysis mask and smoothness
//! - **topology** - Euler-characteristic densities and voxel-level
//!   corrected significance
//! - **extent** - expected voxels/clusters and cluster-extent p-values
//! - **threshold** - normalization of caller threshold units to z-units
//!   and voxel counts
//!
//! Formulas follow Worsley et al., *Human Brain Mapping* 1996 and the
//! cluster-extent approximation of Friston et al. 1994.
#![warn(missing_docs)]

pub mod convert;
pub mod extent;
pub mod resels;
pub mod threshold;
pub mod topology;

pub use convert::UpperTail;
pub use resels::{resel_counts, ReselCounts};
pub use threshold::{ExtentThreshold, NormalizedThreshold, StatThreshold, ThresholdSpec};

// Re-export the core types callers need alongside the statistics.
pub use randfield_core::{AnalysisMask, Fwhm, GridDims, Spacing, StatKind, StatMap};
