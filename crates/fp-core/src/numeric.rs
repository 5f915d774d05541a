use crate::FpError;

/// Floating point type used throughout system
pub type Real = f64;

/// Absolute/relative tolerance pair.
///
/// Used both for float comparisons and as the local error target of the
/// adaptive integrator: a component error `e` is acceptable when
/// `|e| <= abs + rel * |x|`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Tolerances {
    pub const fn new(abs: Real, rel: Real) -> Self {
        Self { abs, rel }
    }
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-6,
            rel: 1e-8,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, FpError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(FpError::NonFinite { what, value: v })
    }
}

pub fn ensure_positive(v: Real, what: &'static str) -> Result<Real, FpError> {
    let v = ensure_finite(v, what)?;
    if v > 0.0 {
        Ok(v)
    } else {
        Err(FpError::NotPositive { what, value: v })
    }
}

/// Check `lo < v < hi`.
pub fn ensure_open_interval(
    v: Real,
    lo: Real,
    hi: Real,
    what: &'static str,
) -> Result<Real, FpError> {
    let v = ensure_finite(v, what)?;
    if v > lo && v < hi {
        Ok(v)
    } else {
        Err(FpError::OutOfDomain {
            what,
            value: v,
            lo,
            hi,
        })
    }
}

/// Weighted RMS norm of an error estimate.
///
/// Each component is scaled by `abs + rel * max(|x0|, |x1|)`, so a result
/// `<= 1.0` means the step met the tolerance.
pub fn scaled_rms_norm(err: &[Real], x0: &[Real], x1: &[Real], tol: Tolerances) -> Real {
    debug_assert_eq!(err.len(), x0.len());
    debug_assert_eq!(err.len(), x1.len());
    if err.is_empty() {
        return 0.0;
    }
    let sum: Real = err
        .iter()
        .zip(x0.iter().zip(x1.iter()))
        .map(|(e, (a, b))| {
            let sc = tol.abs + tol.rel * a.abs().max(b.abs());
            (e / sc).powi(2)
        })
        .sum();
    (sum / err.len() as Real).sqrt()
}
