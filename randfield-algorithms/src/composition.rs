//! Cluster label composition over categorical atlas volumes.

use std::collections::BTreeMap;

use randfield_core::{Cluster, Error, GridDims, LabelComposition, LabelVolume, Result};
use rayon::prelude::*;

/// Default reporting floor: compositions below 1% of a cluster are kept
/// internally but omitted from human-readable output.
pub const REPORT_FLOOR: f64 = 0.01;

/// Normalized label histogram of one voxel set over one label volume.
///
/// # Errors
/// Returns [`Error::GridMismatch`] if the label volume's grid differs
/// from the map's grid.
#[allow(clippy::cast_precision_loss)]
pub fn composition_for(
    voxels: &[usize],
    labels: &LabelVolume<'_>,
    map_dims: GridDims,
) -> Result<LabelComposition> {
    if labels.dims() != map_dims {
        return Err(Error::GridMismatch {
            context: "label volume",
            expected: map_dims,
            actual: labels.dims(),
        });
    }

    let mut counts: BTreeMap<i32, usize> = BTreeMap::new();
    for &idx in voxels {
        *counts.entry(labels.codes()[idx]).or_insert(0) += 1;
    }

    let total = voxels.len().max(1) as f64;
    let fractions = counts
        .into_iter()
        .map(|(code, n)| (code, n as f64 / total))
        .collect();

    Ok(LabelComposition {
        atlas: labels.atlas().to_string(),
        fractions,
    })
}

/// Attaches one composition per label volume to every cluster.
///
/// All volumes are validated against the map grid before any cluster is
/// touched, so a mismatch never leaves partially labeled output.
///
/// # Errors
/// Returns [`Error::GridMismatch`] for a label volume on a different
/// grid.
pub fn attach_compositions(
    clusters: &mut [Cluster],
    map_dims: GridDims,
    labels: &[LabelVolume<'_>],
) -> Result<()> {
    for volume in labels {
        if volume.dims() != map_dims {
            return Err(Error::GridMismatch {
                context: "label volume",
                expected: map_dims,
                actual: volume.dims(),
            });
        }
    }

    clusters.par_iter_mut().try_for_each(|cluster| {
        cluster.compositions = labels
            .iter()
            .map(|volume| composition_for(&cluster.voxels, volume, map_dims))
            .collect::<Result<Vec<LabelComposition>>>()?;
        Ok(())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_composition_fractions_sum_to_one() {
        let dims = GridDims::new(4, 1, 1);
        let codes = vec![7, 7, 7, 3];
        let labels = LabelVolume::new(&codes, dims, "aal").unwrap();

        let comp = composition_for(&[0, 1, 2, 3], &labels, dims).unwrap();
        assert_abs_diff_eq!(comp.fraction(7), 0.75);
        assert_abs_diff_eq!(comp.fraction(3), 0.25);
        assert_eq!(comp.atlas, "aal");

        let total: f64 = comp.fractions.values().sum();
        assert_abs_diff_eq!(total, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_mismatched_label_grid_rejected() {
        let dims = GridDims::new(4, 1, 1);
        let codes = vec![1, 2];
        let labels = LabelVolume::new(&codes, GridDims::new(2, 1, 1), "aal").unwrap();

        let result = composition_for(&[0, 1], &labels, dims);
        assert!(matches!(result, Err(Error::GridMismatch { .. })));
    }
}
