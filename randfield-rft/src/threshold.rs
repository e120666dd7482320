//! Threshold normalization.
//!
//! Callers pick thresholds in whatever unit their front end exposes
//! (t-value, p-value, Bonferroni p, GRF-corrected p, FDR q, resel count,
//! volume); the engine normalizes everything to z-units and voxel counts
//! before extraction.

use randfield_core::{AnalysisMask, Error, Result, StatKind, StatMap};
use rayon::prelude::*;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::convert::{p_to_z, raw_upper_tail_t, raw_upper_tail_z, t_to_z, z_to_t, P_FLOOR};
use crate::extent::{expected_clusters, expected_voxels, extent_for_corrected_p,
    extent_for_uncorrected_p};
use crate::resels::ReselCounts;
use crate::topology::voxel_corrected_p;

/// Upper bound of the z range searched when inverting corrected p-values.
const Z_SEARCH_MAX: f64 = 50.0;

/// Upper bound of the coarse scan locating the expected-EC maximum. All
/// four EC densities are decreasing well before this point for any
/// statistic kind.
const Z_PEAK_SEARCH_MAX: f64 = 4.0;

/// Statistic threshold in a caller-chosen unit.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum StatThreshold {
    /// z-statistic threshold.
    Z(f64),
    /// t-statistic threshold; requires a t-statistic map.
    T(f64),
    /// Uncorrected upper-tail p-value.
    PUncorrected(f64),
    /// Bonferroni family-wise corrected p-value.
    PBonferroni(f64),
    /// GRF family-wise corrected voxel-level p-value.
    PCorrected(f64),
    /// False discovery rate q-value (Benjamini-Hochberg over the mask).
    FdrQ(f64),
}

/// Cluster extent threshold in a caller-chosen unit.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum ExtentThreshold {
    /// Minimum cluster size in voxels.
    Voxels(usize),
    /// Minimum cluster size in resels.
    Resels(f64),
    /// Minimum cluster volume in cubic millimetres.
    VolumeMm3(f64),
    /// Uncorrected cluster-extent p-value.
    PUncorrected(f64),
    /// Family-wise corrected cluster-extent p-value.
    PCorrected(f64),
}

/// A statistic threshold and an extent threshold, as chosen by the caller.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ThresholdSpec {
    /// Statistic threshold.
    pub stat: StatThreshold,
    /// Extent threshold.
    pub extent: ExtentThreshold,
}

/// Thresholds normalized to engine units.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NormalizedThreshold {
    /// Statistic threshold in z-units.
    pub z: f64,
    /// Extent threshold in voxels.
    pub min_extent_voxels: usize,
}

/// Converts a z-unit threshold to the map's own statistic units.
fn stat_units(z: f64, kind: StatKind) -> Result<f64> {
    match kind {
        StatKind::Z => Ok(z),
        StatKind::T { df } => {
            if z.is_infinite() {
                // An unreachable FDR threshold stays unreachable.
                return Ok(z);
            }
            z_to_t(z, df)
        }
    }
}

impl NormalizedThreshold {
    /// The statistic threshold expressed in the map's own units (t-units
    /// for a t-statistic map, z otherwise).
    ///
    /// # Errors
    /// Returns [`Error::Domain`] for invalid degrees of freedom.
    pub fn cutoff_in_map_units(&self, kind: StatKind) -> Result<f64> {
        stat_units(self.z, kind)
    }
}

/// Upper-tail p-value of one voxel value under the map's statistic kind.
fn voxel_p(value: f64, kind: StatKind) -> Result<f64> {
    match kind {
        StatKind::Z => Ok(raw_upper_tail_z(value)),
        StatKind::T { df } => raw_upper_tail_t(value, df),
    }
}

/// Benjamini-Hochberg critical p over the in-mask voxel p-values, or
/// `None` when no voxel survives at level q.
fn fdr_critical_p(map: &StatMap<'_>, mask: &AnalysisMask<'_>, q: f64) -> Result<Option<f64>> {
    let kind = map.kind();
    kind.validate()?;

    let mut p_values: Vec<f64> = map
        .values()
        .par_iter()
        .zip(mask.inside().par_iter())
        .filter(|(_, &inside)| inside)
        .map(|(&v, _)| voxel_p(f64::from(v), kind))
        .collect::<Result<Vec<f64>>>()?;
    if p_values.is_empty() {
        return Err(Error::Degenerate("empty search volume"));
    }
    p_values.par_sort_unstable_by(f64::total_cmp);

    #[allow(clippy::cast_precision_loss)]
    let n = p_values.len() as f64;
    let critical = p_values
        .iter()
        .enumerate()
        .rev()
        .find(|(i, &p)| {
            #[allow(clippy::cast_precision_loss)]
            let rank = (*i + 1) as f64;
            p <= q * rank / n
        })
        .map(|(_, &p)| p);
    Ok(critical)
}

/// Corrected voxel-level p at a z-unit threshold. The threshold is
/// converted to map units first, so t-field densities see t-values.
fn corrected_p_at_z(z: f64, resels: &ReselCounts, kind: StatKind) -> Result<f64> {
    voxel_corrected_p(stat_units(z, kind)?, resels, kind)
}

/// Bisects for the z whose voxel-level corrected p equals `p`.
///
/// The clamped expected EC is not monotone at low thresholds (the third
/// order density is negative below its mode, and a large R3 can clamp
/// the whole sum to zero there), so the search runs only on the
/// decreasing branch: a coarse scan locates the EC maximum and bisection
/// starts from it.
fn z_for_corrected_p(p: f64, resels: &ReselCounts, kind: StatKind) -> Result<f64> {
    if !(p > 0.0 && p < 1.0) {
        return Err(Error::domain("p", p, "in (0, 1)"));
    }
    let steps = 256;
    let mut lo = 0.0;
    let mut peak = corrected_p_at_z(0.0, resels, kind)?;
    for i in 1..=steps {
        let z = Z_PEAK_SEARCH_MAX * f64::from(i) / f64::from(steps);
        let value = corrected_p_at_z(z, resels, kind)?;
        if value > peak {
            peak = value;
            lo = z;
        }
    }
    if peak <= p {
        // Every threshold from the EC mode upward satisfies the bound;
        // the mode is the loosest of them.
        return Ok(lo);
    }
    let mut hi = Z_SEARCH_MAX;
    if corrected_p_at_z(hi, resels, kind)? > p {
        return Ok(hi);
    }
    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if corrected_p_at_z(mid, resels, kind)? > p {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Ok(0.5 * (lo + hi))
}

impl StatThreshold {
    /// Normalizes the threshold to z-units.
    ///
    /// # Errors
    /// Returns [`Error::Domain`] for out-of-range arguments or a t-value
    /// threshold applied to a z-statistic map, and propagates
    /// [`Error::Degenerate`] for an undefined search volume.
    pub fn normalize(
        &self,
        map: &StatMap<'_>,
        mask: &AnalysisMask<'_>,
        resels: &ReselCounts,
    ) -> Result<f64> {
        match *self {
            Self::Z(z) => {
                if !z.is_finite() {
                    return Err(Error::domain("z", z, "finite"));
                }
                Ok(z)
            }
            Self::T(t) => match map.kind() {
                StatKind::T { df } => t_to_z(t, df),
                StatKind::Z => Err(Error::domain(
                    "t",
                    t,
                    "only applicable to t-statistic maps",
                )),
            },
            Self::PUncorrected(p) => p_to_z(p),
            Self::PBonferroni(p) => {
                let n = mask.voxel_count();
                if n == 0 {
                    return Err(Error::Degenerate("empty search volume"));
                }
                #[allow(clippy::cast_precision_loss)]
                p_to_z((p / n as f64).max(P_FLOOR))
            }
            Self::PCorrected(p) => z_for_corrected_p(p, resels, map.kind()),
            Self::FdrQ(q) => {
                if !(q > 0.0 && q <= 1.0) {
                    return Err(Error::domain("q", q, "in (0, 1]"));
                }
                match fdr_critical_p(map, mask, q)? {
                    Some(p) => p_to_z(p.max(P_FLOOR)),
                    // Nothing survives: an unreachable threshold.
                    None => Ok(f64::INFINITY),
                }
            }
        }
    }
}

impl ExtentThreshold {
    /// Normalizes the threshold to a voxel count, given the normalized
    /// statistic threshold `z`.
    ///
    /// # Errors
    /// Returns [`Error::Domain`] for out-of-range arguments and
    /// [`Error::Degenerate`] where the extent distribution is undefined
    /// (zero expected clusters or voxels).
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn normalize(
        &self,
        map: &StatMap<'_>,
        mask: &AnalysisMask<'_>,
        resels: &ReselCounts,
        z: f64,
    ) -> Result<usize> {
        let spacing = map.spacing();
        let fwhm = map.fwhm();
        match *self {
            Self::Voxels(k) => Ok(k),
            Self::Resels(r) => {
                if !r.is_finite() || r < 0.0 {
                    return Err(Error::domain("resels", r, "finite and >= 0"));
                }
                let voxels_per_resel =
                    (fwhm.fx * fwhm.fy * fwhm.fz) / spacing.voxel_volume();
                Ok((r * voxels_per_resel).ceil() as usize)
            }
            Self::VolumeMm3(v) => {
                if !v.is_finite() || v < 0.0 {
                    return Err(Error::domain("volume", v, "finite and >= 0"));
                }
                Ok((v / spacing.voxel_volume()).ceil() as usize)
            }
            Self::PUncorrected(p) => {
                // The cluster rates are evaluated in map units.
                let cutoff = stat_units(z, map.kind())?;
                let ev = expected_voxels(cutoff, mask.voxel_count(), map.kind())?;
                let ec = expected_clusters(cutoff, resels, map.kind())?;
                Ok(extent_for_uncorrected_p(p, ev, ec)?.ceil() as usize)
            }
            Self::PCorrected(p) => {
                let cutoff = stat_units(z, map.kind())?;
                let ev = expected_voxels(cutoff, mask.voxel_count(), map.kind())?;
                let ec = expected_clusters(cutoff, resels, map.kind())?;
                Ok(extent_for_corrected_p(p, ev, ec)?.ceil() as usize)
            }
        }
    }
}

impl ThresholdSpec {
    /// Normalizes both thresholds to engine units.
    ///
    /// # Errors
    /// Propagates the errors of [`StatThreshold::normalize`] and
    /// [`ExtentThreshold::normalize`].
    pub fn normalize(
        &self,
        map: &StatMap<'_>,
        mask: &AnalysisMask<'_>,
        resels: &ReselCounts,
    ) -> Result<NormalizedThreshold> {
        let z = self.stat.normalize(map, mask, resels)?;
        let min_extent_voxels = self.extent.normalize(map, mask, resels, z)?;
        Ok(NormalizedThreshold {
            z,
            min_extent_voxels,
        })
    }
}
