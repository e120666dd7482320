//! Scalar statistic conversions.
//!
//! Pure functions converting between t-statistics, z-statistics, and
//! upper-tail probabilities, all internally normalized to standard-normal
//! space, plus Bonferroni family-wise correction. Probabilities that fall
//! below the representable floor are clamped and flagged rather than
//! silently returned as zero.

use randfield_core::{Error, Result};
use statrs::distribution::{ContinuousCDF, Normal, StudentsT};
use statrs::function::erf::erfc;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Smallest probability reported before flagging saturation.
pub const P_FLOOR: f64 = 1e-300;

/// Degrees of freedom above which the Student-t is treated as normal.
const DF_NORMAL_CUTOFF: f64 = 1e6;

/// An upper-tail probability with a numeric saturation flag.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UpperTail {
    /// The probability, clamped to at least [`P_FLOOR`].
    pub p: f64,
    /// True if the exact value fell below the representable floor.
    pub underflowed: bool,
}

impl UpperTail {
    fn clamped(p: f64) -> Self {
        if p < P_FLOOR {
            Self {
                p: P_FLOOR,
                underflowed: true,
            }
        } else {
            Self {
                p,
                underflowed: false,
            }
        }
    }
}

fn unit_normal() -> Normal {
    // (0, 1) is always a valid parameterisation.
    Normal::new(0.0, 1.0).expect("unit normal parameters are valid")
}

fn student_t(df: f64) -> Result<StudentsT> {
    StudentsT::new(0.0, 1.0, df).map_err(|_| Error::domain("df", df, "finite and > 0"))
}

fn check_df(df: f64) -> Result<()> {
    if df.is_nan() || df <= 0.0 {
        return Err(Error::domain("df", df, "finite and > 0"));
    }
    Ok(())
}

fn check_p(p: f64) -> Result<()> {
    if !(p > 0.0 && p <= 1.0) {
        return Err(Error::domain("p", p, "in (0, 1]"));
    }
    Ok(())
}

/// Raw standard-normal upper tail P(Z > z), without the saturation floor.
pub(crate) fn raw_upper_tail_z(z: f64) -> f64 {
    0.5 * erfc(z / std::f64::consts::SQRT_2)
}

/// Raw Student-t upper tail P(T > t), without the saturation floor.
///
/// Uses the symmetry `sf(t) = cdf(-t)` so small tails keep full
/// precision from the incomplete-beta evaluation.
pub(crate) fn raw_upper_tail_t(t: f64, df: f64) -> Result<f64> {
    check_df(df)?;
    if df >= DF_NORMAL_CUTOFF {
        return Ok(raw_upper_tail_z(t));
    }
    Ok(student_t(df)?.cdf(-t))
}

/// Upper-tail probability P(Z > z) of the standard normal.
///
/// # Errors
/// Returns [`Error::Domain`] for NaN input.
pub fn z_to_p(z: f64) -> Result<UpperTail> {
    if z.is_nan() {
        return Err(Error::domain("z", z, "a number"));
    }
    Ok(UpperTail::clamped(raw_upper_tail_z(z)))
}

/// Quantile of the standard normal upper tail: z with P(Z > z) = p.
///
/// # Errors
/// Returns [`Error::Domain`] for p <= 0, p > 1, or NaN.
pub fn p_to_z(p: f64) -> Result<f64> {
    check_p(p)?;
    Ok(-unit_normal().inverse_cdf(p))
}

/// Upper-tail probability P(T > t) of the Student-t distribution.
///
/// # Errors
/// Returns [`Error::Domain`] for NaN t or invalid degrees of freedom.
pub fn t_to_p(t: f64, df: f64) -> Result<UpperTail> {
    if t.is_nan() {
        return Err(Error::domain("t", t, "a number"));
    }
    Ok(UpperTail::clamped(raw_upper_tail_t(t, df)?))
}

/// Quantile of the Student-t upper tail: t with P(T > t) = p.
///
/// # Errors
/// Returns [`Error::Domain`] for p outside (0, 1] or invalid degrees of
/// freedom.
pub fn p_to_t(p: f64, df: f64) -> Result<f64> {
    check_p(p)?;
    check_df(df)?;
    if df >= DF_NORMAL_CUTOFF {
        return p_to_z(p);
    }
    Ok(-student_t(df)?.inverse_cdf(p))
}

/// Converts a t-statistic to the z-statistic with equal tail probability.
///
/// Monotonic in t; falls back to the normal approximation for very large
/// degrees of freedom.
///
/// # Errors
/// Returns [`Error::Domain`] for NaN t or invalid degrees of freedom.
pub fn t_to_z(t: f64, df: f64) -> Result<f64> {
    check_df(df)?;
    if t.is_nan() {
        return Err(Error::domain("t", t, "a number"));
    }
    if df >= DF_NORMAL_CUTOFF {
        return Ok(t);
    }
    // Work on the positive half and mirror, so both tails stay stable.
    if t < 0.0 {
        return Ok(-t_to_z(-t, df)?);
    }
    let tail = raw_upper_tail_t(t, df)?;
    p_to_z(tail.max(P_FLOOR))
}

/// Converts a z-statistic to the t-statistic with equal tail probability.
///
/// Inverse of [`t_to_z`] for the same degrees of freedom.
///
/// # Errors
/// Returns [`Error::Domain`] for NaN z or invalid degrees of freedom.
pub fn z_to_t(z: f64, df: f64) -> Result<f64> {
    check_df(df)?;
    if z.is_nan() {
        return Err(Error::domain("z", z, "a number"));
    }
    if df >= DF_NORMAL_CUTOFF {
        return Ok(z);
    }
    if z < 0.0 {
        return Ok(-z_to_t(-z, df)?);
    }
    let tail = raw_upper_tail_z(z).max(P_FLOOR);
    p_to_t(tail, df)
}

/// Bonferroni family-wise correction: min(1, p * n).
///
/// # Errors
/// Returns [`Error::Domain`] for p outside [0, 1], NaN, or n = 0.
pub fn bonferroni_corrected(p: f64, n: usize) -> Result<f64> {
    if p.is_nan() || !(0.0..=1.0).contains(&p) {
        return Err(Error::domain("p", p, "in [0, 1]"));
    }
    if n == 0 {
        return Err(Error::domain("n", 0.0, "> 0"));
    }
    #[allow(clippy::cast_precision_loss)]
    Ok((p * n as f64).min(1.0))
}

/// Per-comparison probability recovered from a Bonferroni-corrected one.
///
/// # Errors
/// Returns [`Error::Domain`] for p outside [0, 1], NaN, or n = 0.
pub fn bonferroni_uncorrected(p: f64, n: usize) -> Result<f64> {
    if p.is_nan() || !(0.0..=1.0).contains(&p) {
        return Err(Error::domain("p", p, "in [0, 1]"));
    }
    if n == 0 {
        return Err(Error::domain("n", 0.0, "> 0"));
    }
    #[allow(clippy::cast_precision_loss)]
    Ok((p / n as f64).clamp(0.0, 1.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::{assert_abs_diff_eq, assert_relative_eq};

    #[test]
    fn test_z_to_p_known_values() {
        assert_abs_diff_eq!(z_to_p(0.0).unwrap().p, 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(z_to_p(1.959_964).unwrap().p, 0.025, epsilon = 1e-6);
        // Lower tail exceeds one half.
        assert!(z_to_p(-1.0).unwrap().p > 0.8);
    }

    #[test]
    fn test_p_z_round_trip() {
        for &p in &[1e-12, 1e-8, 1e-4, 0.025, 0.5, 0.9, 0.999] {
            let z = p_to_z(p).unwrap();
            assert_relative_eq!(z_to_p(z).unwrap().p, p, max_relative = 1e-9);
        }
        for &z in &[-4.0, -1.0, 0.0, 0.5, 3.0, 6.0] {
            let p = z_to_p(z).unwrap().p;
            assert_abs_diff_eq!(p_to_z(p).unwrap(), z, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_t_z_round_trip() {
        for &df in &[1.0, 4.0, 10.0, 30.0, 120.0] {
            for &z in &[-3.0, -0.5, 0.0, 1.0, 2.5, 5.0] {
                let t = z_to_t(z, df).unwrap();
                assert_abs_diff_eq!(t_to_z(t, df).unwrap(), z, epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_t_to_z_known_value() {
        // t = 2.228139 at df = 10 has upper tail 0.025, same as z = 1.959964.
        let z = t_to_z(2.228_138_852, 10.0).unwrap();
        assert_abs_diff_eq!(z, 1.959_964, epsilon = 1e-4);
    }

    #[test]
    fn test_t_to_z_large_df_is_identity() {
        assert_abs_diff_eq!(t_to_z(2.5, 1e9).unwrap(), 2.5, epsilon = 1e-12);
        assert_abs_diff_eq!(z_to_t(2.5, f64::MAX).unwrap(), 2.5, epsilon = 1e-12);
    }

    #[test]
    fn test_t_to_z_monotonic() {
        let df = 7.0;
        let mut last = f64::NEG_INFINITY;
        let mut t = -40.0;
        while t <= 40.0 {
            let z = t_to_z(t, df).unwrap();
            assert!(z > last, "t_to_z not monotonic at t = {t}");
            last = z;
            t += 0.5;
        }
    }

    #[test]
    fn test_z_to_p_monotonic_decreasing() {
        let mut last = f64::INFINITY;
        let mut z = -10.0;
        while z <= 10.0 {
            let p = z_to_p(z).unwrap().p;
            assert!(p < last, "z_to_p not decreasing at z = {z}");
            last = p;
            z += 0.25;
        }
    }

    #[test]
    fn test_underflow_is_flagged() {
        let tail = z_to_p(40.0).unwrap();
        assert!(tail.underflowed);
        assert_eq!(tail.p, P_FLOOR);

        let tail = z_to_p(8.0).unwrap();
        assert!(!tail.underflowed);
        assert!(tail.p > 0.0);
    }

    #[test]
    fn test_domain_errors() {
        assert!(p_to_z(0.0).is_err());
        assert!(p_to_z(-0.1).is_err());
        assert!(p_to_z(1.5).is_err());
        assert!(p_to_z(f64::NAN).is_err());
        assert!(t_to_z(1.0, 0.0).is_err());
        assert!(t_to_z(1.0, -2.0).is_err());
        assert!(t_to_z(f64::NAN, 10.0).is_err());
        assert!(t_to_p(1.0, f64::NAN).is_err());
    }

    #[test]
    fn test_bonferroni() {
        assert_abs_diff_eq!(bonferroni_corrected(0.001, 100).unwrap(), 0.1, epsilon = 1e-12);
        assert_abs_diff_eq!(bonferroni_corrected(0.5, 100).unwrap(), 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(bonferroni_uncorrected(0.05, 1000).unwrap(), 5e-5, epsilon = 1e-16);
        assert!(bonferroni_corrected(0.5, 0).is_err());
        assert!(bonferroni_corrected(-0.1, 10).is_err());
    }

    #[test]
    fn test_bonferroni_monotonic() {
        let mut last = 0.0;
        for i in 1..=20 {
            let p = f64::from(i) * 0.01;
            let corrected = bonferroni_corrected(p, 7).unwrap();
            assert!(corrected >= last);
            last = corrected;
        }
    }

    #[test]
    fn test_t_tails_heavier_than_normal() {
        // At low df the t distribution has more mass in the tails, so the
        // equal-tail z is smaller than t.
        let z = t_to_z(3.0, 3.0).unwrap();
        assert!(z < 3.0);
        assert!(z > 0.0);
    }
}
