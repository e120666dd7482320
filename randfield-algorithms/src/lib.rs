//! randfield-algorithms: Supra-threshold cluster extraction.
//!
//! This crate turns a thresholded statistic map into labeled clusters:
//! - **Thresholding** - masked binarization in map units
//! - **Labeling** - 26-connected union-find components
//! - **Composition** - per-cluster atlas label histograms
//!
#![warn(missing_docs)]

mod composition;
mod labeling;
mod query;

pub use composition::{attach_compositions, composition_for, REPORT_FLOOR};
pub use labeling::extract_clusters;
pub use query::{apply_threshold, run_query};

// Re-export the core result types callers consume.
pub use randfield_core::{Cluster, ClusterResult, LabelComposition};
