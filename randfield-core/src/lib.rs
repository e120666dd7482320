//! randfield-core: Core types for random field theory inference.
//!
//! This crate provides the foundational value types shared by the
//! statistical (`randfield-rft`) and extraction (`randfield-algorithms`)
//! crates: voxel grid views, the statistic kind tag, cluster output
//! types, the error taxonomy, and the progress/cancellation capability.
//!

pub mod cluster;
pub mod error;
pub mod progress;
pub mod stat;
pub mod volume;

pub use cluster::{Cluster, ClusterResult, LabelComposition};
pub use error::{Error, Result};
pub use progress::{CancelFlag, NoProgress, ProgressSink};
pub use stat::StatKind;
pub use volume::{AnalysisMask, Fwhm, GridDims, LabelVolume, Spacing, StatMap};
