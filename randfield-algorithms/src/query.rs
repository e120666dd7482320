//! The end-to-end cluster query: threshold, extract, compose.

use randfield_core::{
    AnalysisMask, ClusterResult, Error, LabelVolume, ProgressSink, Result, StatMap,
};
use randfield_rft::NormalizedThreshold;
use rayon::prelude::*;

use crate::composition::attach_compositions;
use crate::labeling::extract_clusters;

/// Binarizes the map against a cutoff expressed in map units.
///
/// A voxel is supra-threshold iff it is inside the mask and its value is
/// at or above the cutoff. An infinite cutoff yields an all-false volume.
///
/// # Errors
/// Returns [`Error::GridMismatch`] if the mask grid differs from the
/// map grid.
pub fn apply_threshold(
    map: &StatMap<'_>,
    mask: &AnalysisMask<'_>,
    cutoff: f64,
) -> Result<Vec<bool>> {
    if mask.dims() != map.dims() {
        return Err(Error::GridMismatch {
            context: "analysis mask",
            expected: map.dims(),
            actual: mask.dims(),
        });
    }
    let supra = map
        .values()
        .par_iter()
        .zip(mask.inside().par_iter())
        .map(|(&v, &inside)| inside && f64::from(v) >= cutoff)
        .collect();
    Ok(supra)
}

/// Runs a full cluster query against a statistic map.
///
/// The normalized threshold is converted to the map's own units, the
/// masked volume is binarized and labeled, clusters below the extent
/// threshold are dropped, and each surviving cluster is annotated with
/// one label composition per atlas volume.
///
/// # Errors
/// Returns [`Error::GridMismatch`] for a mask or label volume on a
/// different grid, [`Error::Domain`] for an invalid statistic kind, and
/// [`Error::Cancelled`] if the progress sink requests cancellation.
pub fn run_query(
    map: &StatMap<'_>,
    mask: &AnalysisMask<'_>,
    threshold: NormalizedThreshold,
    labels: &[LabelVolume<'_>],
    progress: &dyn ProgressSink,
) -> Result<ClusterResult> {
    let cutoff = threshold.cutoff_in_map_units(map.kind())?;
    let supra = apply_threshold(map, mask, cutoff)?;
    let mut clusters = extract_clusters(map, &supra, threshold.min_extent_voxels, progress)?;
    attach_compositions(&mut clusters, map.dims(), labels)?;
    Ok(ClusterResult {
        clusters,
        threshold_z: threshold.z,
        min_extent_voxels: threshold.min_extent_voxels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use randfield_core::{Fwhm, GridDims, NoProgress, Spacing, StatKind};

    fn make_map(values: &[f32], dims: GridDims, kind: StatKind) -> StatMap<'_> {
        StatMap::new(
            values,
            dims,
            Spacing::new(1.0, 1.0, 1.0),
            Fwhm::new(1.0, 1.0, 1.0),
            kind,
        )
        .unwrap()
    }

    #[test]
    fn test_threshold_respects_mask() {
        let dims = GridDims::new(4, 1, 1);
        let values = vec![5.0f32, 5.0, 1.0, 5.0];
        let inside = vec![true, false, true, true];
        let map = make_map(&values, dims, StatKind::Z);
        let mask = AnalysisMask::new(&inside, dims).unwrap();

        let supra = apply_threshold(&map, &mask, 3.0).unwrap();
        assert_eq!(supra, vec![true, false, false, true]);
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let dims = GridDims::new(2, 1, 1);
        let values = vec![3.0f32, 2.999_999];
        let inside = vec![true, true];
        let map = make_map(&values, dims, StatKind::Z);
        let mask = AnalysisMask::new(&inside, dims).unwrap();

        let supra = apply_threshold(&map, &mask, 3.0).unwrap();
        assert!(supra[0]);
        assert!(!supra[1]);
    }

    #[test]
    fn test_infinite_cutoff_suppresses_everything() {
        let dims = GridDims::new(3, 3, 1);
        let values = vec![9.0f32; dims.len()];
        let inside = vec![true; dims.len()];
        let map = make_map(&values, dims, StatKind::Z);
        let mask = AnalysisMask::new(&inside, dims).unwrap();

        let supra = apply_threshold(&map, &mask, f64::INFINITY).unwrap();
        assert!(supra.iter().all(|&s| !s));
    }

    #[test]
    fn test_query_converts_cutoff_for_t_maps() {
        // z = 2 maps to a t cutoff above 2 at df = 5, so a t-value of
        // exactly 2.0 must not survive while a clearly larger one does.
        let dims = GridDims::new(2, 1, 1);
        let values = vec![2.0f32, 6.0];
        let inside = vec![true, true];
        let map = make_map(&values, dims, StatKind::T { df: 5.0 });
        let mask = AnalysisMask::new(&inside, dims).unwrap();
        let threshold = NormalizedThreshold {
            z: 2.0,
            min_extent_voxels: 0,
        };

        let result = run_query(&map, &mask, threshold, &[], &NoProgress).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result.clusters[0].peak_index, 1);
    }

    #[test]
    fn test_query_rejects_mismatched_mask() {
        let dims = GridDims::new(3, 1, 1);
        let values = vec![1.0f32; 3];
        let inside = vec![true; 6];
        let map = make_map(&values, dims, StatKind::Z);
        let mask = AnalysisMask::new(&inside, GridDims::new(6, 1, 1)).unwrap();
        let threshold = NormalizedThreshold {
            z: 0.0,
            min_extent_voxels: 0,
        };

        let result = run_query(&map, &mask, threshold, &[], &NoProgress);
        assert!(matches!(result, Err(Error::GridMismatch { .. })));
    }
}
