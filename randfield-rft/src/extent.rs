//! Cluster-extent inference under the null hypothesis.
//!
//! Expected supra-threshold voxels and clusters, and the exponential
//! cube-root extent survival function of Friston et al. 1994, calibrated
//! so its mean extent equals expected-voxels / expected-clusters.

use randfield_core::{AnalysisMask, Error, Result, StatKind};
use statrs::function::gamma::gamma;

use crate::convert::{raw_upper_tail_t, raw_upper_tail_z};
use crate::resels::ReselCounts;
use crate::topology::expected_euler_characteristic;

/// Upper-tail probability of the field's statistic kind at threshold z.
fn upper_tail(z: f64, kind: StatKind) -> Result<f64> {
    if !z.is_finite() {
        return Err(Error::domain("z", z, "finite"));
    }
    match kind {
        StatKind::Z => Ok(raw_upper_tail_z(z)),
        StatKind::T { df } => raw_upper_tail_t(z, df),
    }
}

/// Expected number of voxels above threshold z in a search volume of
/// `n_voxels` voxels.
///
/// # Errors
/// Returns [`Error::Domain`] for non-finite z or an invalid kind.
#[allow(clippy::cast_precision_loss)]
pub fn expected_voxels(z: f64, n_voxels: usize, kind: StatKind) -> Result<f64> {
    Ok(n_voxels as f64 * upper_tail(z, kind)?)
}

/// Convenience form of [`expected_voxels`] taking the analysis mask.
///
/// # Errors
/// Returns [`Error::Domain`] for non-finite z or an invalid kind.
pub fn expected_voxels_in_mask(z: f64, mask: &AnalysisMask<'_>, kind: StatKind) -> Result<f64> {
    expected_voxels(z, mask.voxel_count(), kind)
}

/// Expected number of supra-threshold clusters: the expected Euler
/// characteristic, clamped at zero. Valid as a cluster-count estimate for
/// z above the onset of cluster separation.
///
/// # Errors
/// Propagates the errors of [`expected_euler_characteristic`].
pub fn expected_clusters(z: f64, resels: &ReselCounts, kind: StatKind) -> Result<f64> {
    Ok(expected_euler_characteristic(z, resels, kind)?.max(0.0))
}

fn check_rate(name: &'static str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(Error::domain(name, value, "finite and >= 0"));
    }
    Ok(())
}

/// Survival exponent beta, calibrated so the mean extent of
/// `exp(-beta * k^(2/3))` equals ev / ec (the calibration constant is
/// Gamma(5/2), the D = 3 case of Gamma(D/2 + 1)).
fn survival_beta(ev: f64, ec: f64) -> f64 {
    (gamma(2.5) * ec / ev).powf(2.0 / 3.0)
}

/// Probability that a cluster has extent >= k voxels, given that a
/// cluster exists: `exp(-beta * k^(2/3))`.
///
/// `k <= 0` yields probability 1; zero expected clusters yield 1.
///
/// # Errors
/// Returns [`Error::Domain`] for NaN k or negative/non-finite ev, ec, and
/// [`Error::Degenerate`] when no voxels are expected above threshold.
pub fn uncorrected_cluster_p(k: f64, ev: f64, ec: f64) -> Result<f64> {
    if k.is_nan() {
        return Err(Error::domain("k", k, "a number"));
    }
    check_rate("ev", ev)?;
    check_rate("ec", ec)?;
    if k <= 0.0 {
        return Ok(1.0);
    }
    if ec <= 0.0 {
        return Ok(1.0);
    }
    if ev <= 0.0 {
        return Err(Error::Degenerate("no voxels expected above threshold"));
    }
    Ok((-survival_beta(ev, ec) * k.powf(2.0 / 3.0)).exp())
}

/// Family-wise corrected cluster-extent p-value:
/// `1 - (1 - p_u)^ec` across ec expected independent clusters.
///
/// Saturates at the uncorrected value when no clusters are expected.
///
/// # Errors
/// Propagates the errors of [`uncorrected_cluster_p`].
pub fn corrected_cluster_p(k: f64, ev: f64, ec: f64) -> Result<f64> {
    let p_u = uncorrected_cluster_p(k, ev, ec)?;
    if ec <= 0.0 {
        return Ok(p_u);
    }
    // 1 - (1 - p)^ec via log1p/expm1 to keep precision for small p.
    let corrected = -(ec * (-p_u).ln_1p()).exp_m1();
    Ok(corrected.clamp(0.0, 1.0))
}

fn check_cluster_rates(ev: f64, ec: f64) -> Result<()> {
    check_rate("ev", ev)?;
    check_rate("ec", ec)?;
    if ec <= 0.0 || ev <= 0.0 {
        return Err(Error::Degenerate(
            "extent threshold undefined: no clusters expected",
        ));
    }
    Ok(())
}

/// Extent k whose uncorrected cluster p-value equals p: the closed-form
/// inverse `k = (-ln p / beta)^(3/2)`.
///
/// # Errors
/// Returns [`Error::Domain`] for p outside (0, 1] and
/// [`Error::Degenerate`] when ev or ec is zero.
pub fn extent_for_uncorrected_p(p: f64, ev: f64, ec: f64) -> Result<f64> {
    if !(p > 0.0 && p <= 1.0) {
        return Err(Error::domain("p", p, "in (0, 1]"));
    }
    check_cluster_rates(ev, ec)?;
    Ok((-p.ln() / survival_beta(ev, ec)).powf(1.5))
}

/// Extent k whose corrected cluster p-value equals p.
///
/// # Errors
/// Returns [`Error::Domain`] for p outside (0, 1) and
/// [`Error::Degenerate`] when ev or ec is zero.
pub fn extent_for_corrected_p(p: f64, ev: f64, ec: f64) -> Result<f64> {
    if !(p > 0.0 && p < 1.0) {
        return Err(Error::domain("p", p, "in (0, 1)"));
    }
    check_cluster_rates(ev, ec)?;
    // Invert the family-wise combination first.
    let p_u = -((-p).ln_1p() / ec).exp_m1();
    extent_for_uncorrected_p(p_u.clamp(f64::MIN_POSITIVE, 1.0), ev, ec)
}
