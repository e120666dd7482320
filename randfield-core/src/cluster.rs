//! Cluster output types.

use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Normalized label histogram of one cluster over one label volume.
///
/// The full histogram is always retained; [`LabelComposition::significant`]
/// applies the reporting floor for human-readable output.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LabelComposition {
    /// Name of the atlas the label volume came from.
    pub atlas: String,
    /// Label code to fraction of cluster voxels, ordered by code.
    pub fractions: BTreeMap<i32, f64>,
}

impl LabelComposition {
    /// Fraction of cluster voxels carrying `code`, zero if absent.
    #[must_use]
    pub fn fraction(&self, code: i32) -> f64 {
        self.fractions.get(&code).copied().unwrap_or(0.0)
    }

    /// Entries at or above the reporting floor, for display.
    pub fn significant(&self, floor: f64) -> impl Iterator<Item = (i32, f64)> + '_ {
        self.fractions
            .iter()
            .filter(move |(_, &f)| f >= floor)
            .map(|(&code, &f)| (code, f))
    }
}

/// A supra-threshold cluster.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Cluster {
    /// Linear index of the peak voxel.
    pub peak_index: usize,
    /// Voxel coordinate (x, y, z) of the peak.
    pub peak_voxel: (usize, usize, usize),
    /// World coordinate (mm) of the peak.
    pub peak_world: (f64, f64, f64),
    /// Statistic value at the peak, in map units.
    pub peak_value: f64,
    /// Number of voxels in the cluster.
    pub extent: usize,
    /// Member voxels as linear indices, in ascending order.
    pub voxels: Vec<usize>,
    /// One composition per supplied label volume.
    pub compositions: Vec<LabelComposition>,
}

/// Ordered sequence of clusters produced by one query.
///
/// Clusters appear in discovery order (order of each cluster's first
/// member voxel in linear-index order); any display ordering is a caller
/// responsibility. Produced fresh per query, never mutated afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClusterResult {
    /// Clusters in discovery order.
    pub clusters: Vec<Cluster>,
    /// Statistic threshold that produced the result, in z-units.
    pub threshold_z: f64,
    /// Extent threshold that produced the result, in voxels.
    pub min_extent_voxels: usize,
}

impl ClusterResult {
    /// Number of clusters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.clusters.len()
    }

    /// Returns true if no cluster survived the thresholds.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clusters.is_empty()
    }

    /// Iterator over the clusters in discovery order.
    pub fn iter(&self) -> impl Iterator<Item = &Cluster> {
        self.clusters.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_composition_floor() {
        let mut fractions = BTreeMap::new();
        fractions.insert(1, 0.89);
        fractions.insert(2, 0.105);
        fractions.insert(3, 0.005);
        let comp = LabelComposition {
            atlas: "aal".to_string(),
            fractions,
        };

        let shown: Vec<(i32, f64)> = comp.significant(0.01).collect();
        assert_eq!(shown.len(), 2);
        assert_eq!(shown[0].0, 1);
        assert_eq!(shown[1].0, 2);
        // The sub-floor entry is retained internally.
        assert!(comp.fraction(3) > 0.0);
    }

    #[test]
    fn test_empty_result() {
        let result = ClusterResult::default();
        assert!(result.is_empty());
        assert_eq!(result.len(), 0);
    }
}
