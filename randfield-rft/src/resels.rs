//! Resel counting over an analysis mask.
//!
//! Converts a binary search volume plus per-axis smoothness into the four
//! resel counts R0..R3 used by the Euler-characteristic expansion. R0 is
//! the Euler characteristic of the mask; R1 and R2 come from the discrete
//! edge/face counts of Worsley et al. 1996; R3 is the bulk measure
//! (masked voxel count scaled to resel units).

use randfield_core::{AnalysisMask, Error, Fwhm, Result, Spacing};
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Resel counts of a search volume.
///
/// One resel is a block of FWHMx x FWHMy x FWHMz millimetres. All
/// components are non-negative; an all-zero value means the search volume
/// is undefined (empty mask) and downstream consumers must not divide by
/// any component.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReselCounts {
    /// Euler characteristic of the mask.
    pub r0: f64,
    /// Resel-scaled boundary length measure.
    pub r1: f64,
    /// Resel-scaled surface measure.
    pub r2: f64,
    /// Resel-scaled bulk volume.
    pub r3: f64,
}

impl ReselCounts {
    /// Components indexed by dimension 0..=3.
    #[inline]
    #[must_use]
    pub fn as_array(&self) -> [f64; 4] {
        [self.r0, self.r1, self.r2, self.r3]
    }

    /// True when the search volume is undefined (empty mask).
    #[must_use]
    pub fn is_undefined(&self) -> bool {
        self.r0 == 0.0 && self.r1 == 0.0 && self.r2 == 0.0 && self.r3 == 0.0
    }
}

/// Discrete adjacency counts of a binary volume.
///
/// Voxels, edges along each axis (both endpoints masked), faces in each
/// plane (all four corners masked), and cubes (all eight corners masked).
#[derive(Debug, Clone, Copy, Default)]
struct TopologyCounts {
    p: u64,
    ex: u64,
    ey: u64,
    ez: u64,
    fxy: u64,
    fxz: u64,
    fyz: u64,
    c: u64,
}

impl TopologyCounts {
    fn merge(self, other: Self) -> Self {
        Self {
            p: self.p + other.p,
            ex: self.ex + other.ex,
            ey: self.ey + other.ey,
            ez: self.ez + other.ez,
            fxy: self.fxy + other.fxy,
            fxz: self.fxz + other.fxz,
            fyz: self.fyz + other.fyz,
            c: self.c + other.c,
        }
    }
}

/// Counts elements whose lowest-coordinate corner lies in slice `z`.
fn slice_counts(mask: &AnalysisMask<'_>, z: usize) -> TopologyCounts {
    let dims = mask.dims();
    let mut t = TopologyCounts::default();

    for y in 0..dims.ny {
        for x in 0..dims.nx {
            if !mask.contains(x, y, z) {
                continue;
            }
            t.p += 1;

            let in_x = x + 1 < dims.nx && mask.contains(x + 1, y, z);
            let in_y = y + 1 < dims.ny && mask.contains(x, y + 1, z);
            let in_z = z + 1 < dims.nz && mask.contains(x, y, z + 1);
            t.ex += u64::from(in_x);
            t.ey += u64::from(in_y);
            t.ez += u64::from(in_z);

            let in_xy = in_x && in_y && mask.contains(x + 1, y + 1, z);
            let in_xz = in_x && in_z && mask.contains(x + 1, y, z + 1);
            let in_yz = in_y && in_z && mask.contains(x, y + 1, z + 1);
            t.fxy += u64::from(in_xy);
            t.fxz += u64::from(in_xz);
            t.fyz += u64::from(in_yz);

            let in_cube = in_xy && in_xz && in_yz && mask.contains(x + 1, y + 1, z + 1);
            t.c += u64::from(in_cube);
        }
    }
    t
}

fn check_extent(name: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value <= 0.0 {
        return Err(Error::domain(name, value, "finite and > 0"));
    }
    Ok(())
}

/// Computes the resel counts of a masked search volume.
///
/// Adjacency counts are accumulated per z-slice in parallel and reduced.
/// An empty mask yields all-zero counts (undefined search volume), not an
/// error.
///
/// # Errors
/// Returns [`Error::Domain`] for non-positive or non-finite smoothness or
/// voxel spacing.
#[allow(clippy::cast_precision_loss)]
pub fn resel_counts(mask: &AnalysisMask<'_>, fwhm: Fwhm, spacing: Spacing) -> Result<ReselCounts> {
    check_extent("fwhm.fx", fwhm.fx)?;
    check_extent("fwhm.fy", fwhm.fy)?;
    check_extent("fwhm.fz", fwhm.fz)?;
    check_extent("spacing.sx", spacing.sx)?;
    check_extent("spacing.sy", spacing.sy)?;
    check_extent("spacing.sz", spacing.sz)?;

    // Voxel edge lengths in resel units.
    let kx = spacing.sx / fwhm.fx;
    let ky = spacing.sy / fwhm.fy;
    let kz = spacing.sz / fwhm.fz;

    let dims = mask.dims();
    let t = (0..dims.nz)
        .into_par_iter()
        .map(|z| slice_counts(mask, z))
        .reduce(TopologyCounts::default, TopologyCounts::merge);

    let p = t.p as f64;
    let (ex, ey, ez) = (t.ex as f64, t.ey as f64, t.ez as f64);
    let (fxy, fxz, fyz) = (t.fxy as f64, t.fxz as f64, t.fyz as f64);
    let c = t.c as f64;

    let r0 = p - (ex + ey + ez) + (fxy + fxz + fyz) - c;
    let r1 = (ex - fxy - fxz + c) * kx + (ey - fxy - fyz + c) * ky + (ez - fxz - fyz + c) * kz;
    let r2 = (fxy - c) * kx * ky + (fxz - c) * kx * kz + (fyz - c) * ky * kz;
    let r3 = p * kx * ky * kz;

    Ok(ReselCounts {
        r0: r0.max(0.0),
        r1: r1.max(0.0),
        r2: r2.max(0.0),
        r3: r3.max(0.0),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};
    use randfield_core::GridDims;

    fn unit_geometry() -> (Fwhm, Spacing) {
        (Fwhm::new(1.0, 1.0, 1.0), Spacing::new(1.0, 1.0, 1.0))
    }

    fn box_mask(dims: GridDims) -> Vec<bool> {
        vec![true; dims.len()]
    }

    #[test]
    fn test_empty_mask_is_undefined() {
        let dims = GridDims::new(4, 4, 4);
        let inside = vec![false; dims.len()];
        let mask = AnalysisMask::new(&inside, dims).unwrap();
        let (fwhm, spacing) = unit_geometry();

        let resels = resel_counts(&mask, fwhm, spacing).unwrap();
        assert!(resels.is_undefined());
    }

    #[test]
    fn test_single_voxel() {
        let dims = GridDims::new(3, 3, 3);
        let mut inside = vec![false; dims.len()];
        inside[dims.index(1, 1, 1)] = true;
        let mask = AnalysisMask::new(&inside, dims).unwrap();
        let (fwhm, spacing) = unit_geometry();

        let resels = resel_counts(&mask, fwhm, spacing).unwrap();
        assert_abs_diff_eq!(resels.r0, 1.0);
        assert_abs_diff_eq!(resels.r1, 0.0);
        assert_abs_diff_eq!(resels.r2, 0.0);
        assert_abs_diff_eq!(resels.r3, 1.0);
    }

    #[test]
    fn test_cuboid_one_resel_per_voxel() {
        let dims = GridDims::new(10, 10, 10);
        let inside = box_mask(dims);
        let mask = AnalysisMask::new(&inside, dims).unwrap();
        let (fwhm, spacing) = unit_geometry();

        let resels = resel_counts(&mask, fwhm, spacing).unwrap();
        assert_abs_diff_eq!(resels.r0, 1.0);
        assert_relative_eq!(resels.r3, 1000.0, max_relative = 1e-12);
        // Boundary measures are positive for a solid box.
        assert!(resels.r1 > 0.0);
        assert!(resels.r2 > 0.0);
    }

    #[test]
    fn test_two_voxel_line_length() {
        // Two voxels adjacent in x: one edge of length kx.
        let dims = GridDims::new(4, 1, 1);
        let mut inside = vec![false; dims.len()];
        inside[dims.index(1, 0, 0)] = true;
        inside[dims.index(2, 0, 0)] = true;
        let mask = AnalysisMask::new(&inside, dims).unwrap();

        let resels = resel_counts(&mask, Fwhm::new(4.0, 4.0, 4.0), Spacing::new(2.0, 2.0, 2.0))
            .unwrap();
        assert_abs_diff_eq!(resels.r0, 1.0);
        assert_abs_diff_eq!(resels.r1, 0.5); // sx / fx = 0.5
        assert_abs_diff_eq!(resels.r2, 0.0);
    }

    #[test]
    fn test_flat_plate_area() {
        // A 3x3x1 plate: 4 faces of kx*ky each.
        let dims = GridDims::new(3, 3, 1);
        let inside = box_mask(dims);
        let mask = AnalysisMask::new(&inside, dims).unwrap();
        let (fwhm, spacing) = unit_geometry();

        let resels = resel_counts(&mask, fwhm, spacing).unwrap();
        assert_abs_diff_eq!(resels.r0, 1.0);
        assert_abs_diff_eq!(resels.r2, 4.0);
    }

    #[test]
    fn test_two_blobs_euler_two() {
        let dims = GridDims::new(10, 5, 5);
        let mut inside = vec![false; dims.len()];
        for z in 0..2 {
            for y in 0..2 {
                for x in 0..2 {
                    inside[dims.index(x, y, z)] = true;
                    inside[dims.index(x + 6, y + 2, z + 2)] = true;
                }
            }
        }
        let mask = AnalysisMask::new(&inside, dims).unwrap();
        let (fwhm, spacing) = unit_geometry();

        let resels = resel_counts(&mask, fwhm, spacing).unwrap();
        assert_abs_diff_eq!(resels.r0, 2.0);
        assert_abs_diff_eq!(resels.r3, 16.0);
    }

    #[test]
    fn test_invalid_fwhm_rejected() {
        let dims = GridDims::new(2, 2, 2);
        let inside = box_mask(dims);
        let mask = AnalysisMask::new(&inside, dims).unwrap();

        let bad = resel_counts(&mask, Fwhm::new(0.0, 1.0, 1.0), Spacing::new(1.0, 1.0, 1.0));
        assert!(bad.is_err());
        let bad = resel_counts(
            &mask,
            Fwhm::new(1.0, 1.0, 1.0),
            Spacing::new(1.0, f64::NAN, 1.0),
        );
        assert!(bad.is_err());
    }
}
