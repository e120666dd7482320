//! Voxel grid views for statistic maps, masks, and label volumes.
//!
//! All views borrow caller-owned storage; the engine never retains a
//! reference beyond a single call. Linear indexing is row-major with x
//! fastest: `index = x + nx * (y + ny * z)`.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::stat::StatKind;

/// Dimensions of a 3D voxel grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GridDims {
    /// Voxels along x.
    pub nx: usize,
    /// Voxels along y.
    pub ny: usize,
    /// Voxels along z.
    pub nz: usize,
}

impl GridDims {
    /// Creates grid dimensions.
    #[inline]
    #[must_use]
    pub fn new(nx: usize, ny: usize, nz: usize) -> Self {
        Self { nx, ny, nz }
    }

    /// Total number of voxels.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    /// Returns true if the grid holds no voxels.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Linear index of voxel (x, y, z).
    #[inline]
    #[must_use]
    pub fn index(&self, x: usize, y: usize, z: usize) -> usize {
        x + self.nx * (y + self.ny * z)
    }

    /// Voxel coordinate of a linear index.
    #[inline]
    #[must_use]
    pub fn coords(&self, index: usize) -> (usize, usize, usize) {
        let x = index % self.nx;
        let y = (index / self.nx) % self.ny;
        let z = index / (self.nx * self.ny);
        (x, y, z)
    }
}

/// Voxel spacing in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Spacing {
    /// Spacing along x (mm).
    pub sx: f64,
    /// Spacing along y (mm).
    pub sy: f64,
    /// Spacing along z (mm).
    pub sz: f64,
}

impl Spacing {
    /// Creates a voxel spacing.
    #[inline]
    #[must_use]
    pub fn new(sx: f64, sy: f64, sz: f64) -> Self {
        Self { sx, sy, sz }
    }

    /// Volume of one voxel in cubic millimetres.
    #[inline]
    #[must_use]
    pub fn voxel_volume(&self) -> f64 {
        self.sx * self.sy * self.sz
    }
}

/// Spatial smoothness (full width at half maximum) in millimetres.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Fwhm {
    /// Smoothness along x (mm).
    pub fx: f64,
    /// Smoothness along y (mm).
    pub fy: f64,
    /// Smoothness along z (mm).
    pub fz: f64,
}

impl Fwhm {
    /// Creates a smoothness value.
    #[inline]
    #[must_use]
    pub fn new(fx: f64, fy: f64, fz: f64) -> Self {
        Self { fx, fy, fz }
    }
}

/// Immutable view over a statistical parametric map.
///
/// The voxel values are a per-voxel t- or z-statistic as produced by the
/// host's model estimation; this crate only consumes them.
#[derive(Debug, Clone, Copy)]
pub struct StatMap<'a> {
    values: &'a [f32],
    dims: GridDims,
    spacing: Spacing,
    fwhm: Fwhm,
    kind: StatKind,
}

impl<'a> StatMap<'a> {
    /// Creates a map view over caller-owned voxel data.
    ///
    /// # Errors
    /// Returns [`Error::GridMismatch`] if the slice length does not match
    /// the grid dimensions.
    pub fn new(
        values: &'a [f32],
        dims: GridDims,
        spacing: Spacing,
        fwhm: Fwhm,
        kind: StatKind,
    ) -> Result<Self> {
        if values.len() != dims.len() {
            return Err(Error::GridMismatch {
                context: "statistic map",
                expected: dims,
                actual: GridDims::new(values.len(), 1, 1),
            });
        }
        Ok(Self {
            values,
            dims,
            spacing,
            fwhm,
            kind,
        })
    }

    /// Raw voxel values in linear-index order.
    #[inline]
    #[must_use]
    pub fn values(&self) -> &'a [f32] {
        self.values
    }

    /// Grid dimensions.
    #[inline]
    #[must_use]
    pub fn dims(&self) -> GridDims {
        self.dims
    }

    /// Voxel spacing.
    #[inline]
    #[must_use]
    pub fn spacing(&self) -> Spacing {
        self.spacing
    }

    /// Spatial smoothness.
    #[inline]
    #[must_use]
    pub fn fwhm(&self) -> Fwhm {
        self.fwhm
    }

    /// Statistic kind (z or t with degrees of freedom).
    #[inline]
    #[must_use]
    pub fn kind(&self) -> StatKind {
        self.kind
    }

    /// Statistic value at a linear index.
    #[inline]
    #[must_use]
    pub fn value(&self, index: usize) -> f32 {
        self.values[index]
    }

    /// World coordinate (mm) of a voxel coordinate.
    #[inline]
    #[must_use]
    pub fn world(&self, x: usize, y: usize, z: usize) -> (f64, f64, f64) {
        #[allow(clippy::cast_precision_loss)]
        (
            x as f64 * self.spacing.sx,
            y as f64 * self.spacing.sy,
            z as f64 * self.spacing.sz,
        )
    }
}

/// Boolean view marking the voxels included in the search volume.
#[derive(Debug, Clone, Copy)]
pub struct AnalysisMask<'a> {
    inside: &'a [bool],
    dims: GridDims,
}

impl<'a> AnalysisMask<'a> {
    /// Creates a mask view over caller-owned data.
    ///
    /// # Errors
    /// Returns [`Error::GridMismatch`] if the slice length does not match
    /// the grid dimensions.
    pub fn new(inside: &'a [bool], dims: GridDims) -> Result<Self> {
        if inside.len() != dims.len() {
            return Err(Error::GridMismatch {
                context: "analysis mask",
                expected: dims,
                actual: GridDims::new(inside.len(), 1, 1),
            });
        }
        Ok(Self { inside, dims })
    }

    /// Raw mask values in linear-index order.
    #[inline]
    #[must_use]
    pub fn inside(&self) -> &'a [bool] {
        self.inside
    }

    /// Grid dimensions.
    #[inline]
    #[must_use]
    pub fn dims(&self) -> GridDims {
        self.dims
    }

    /// Whether the voxel at (x, y, z) is in the search volume.
    #[inline]
    #[must_use]
    pub fn contains(&self, x: usize, y: usize, z: usize) -> bool {
        self.inside[self.dims.index(x, y, z)]
    }

    /// Number of voxels inside the search volume.
    #[must_use]
    pub fn voxel_count(&self) -> usize {
        self.inside.iter().filter(|&&m| m).count()
    }
}

/// Categorical label volume sharing the statistic map's grid.
///
/// Label code to display name lookup stays with the caller's atlas
/// collaborator; the engine only sees integer codes.
#[derive(Debug, Clone, Copy)]
pub struct LabelVolume<'a> {
    codes: &'a [i32],
    dims: GridDims,
    atlas: &'a str,
}

impl<'a> LabelVolume<'a> {
    /// Creates a label volume view over caller-owned data.
    ///
    /// # Errors
    /// Returns [`Error::GridMismatch`] if the slice length does not match
    /// the grid dimensions.
    pub fn new(codes: &'a [i32], dims: GridDims, atlas: &'a str) -> Result<Self> {
        if codes.len() != dims.len() {
            return Err(Error::GridMismatch {
                context: "label volume",
                expected: dims,
                actual: GridDims::new(codes.len(), 1, 1),
            });
        }
        Ok(Self { codes, dims, atlas })
    }

    /// Raw label codes in linear-index order.
    #[inline]
    #[must_use]
    pub fn codes(&self) -> &'a [i32] {
        self.codes
    }

    /// Grid dimensions.
    #[inline]
    #[must_use]
    pub fn dims(&self) -> GridDims {
        self.dims
    }

    /// Name of the atlas this volume came from.
    #[inline]
    #[must_use]
    pub fn atlas(&self) -> &'a str {
        self.atlas
    }
}
