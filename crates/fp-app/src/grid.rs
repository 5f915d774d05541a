//! Uniform sample grid shared by every trajectory computation.

use fp_core::units::{Time, si};
use fp_core::{ensure_finite, ensure_positive};
use fp_project::validate::MAX_SAMPLES;

use crate::error::{AppError, AppResult};

/// Sample times `start + i * step` for `i` in `0..len`, end exclusive.
#[derive(Clone, Debug, PartialEq)]
pub struct TimeGrid {
    start_s: f64,
    step_s: f64,
    times: Vec<f64>,
}

impl Default for TimeGrid {
    fn default() -> Self {
        Self::build(0.0, 1000.0, 0.01)
    }
}

impl TimeGrid {
    pub fn new(start: Time, end: Time, step: Time) -> AppResult<Self> {
        Self::from_seconds(si::seconds(start), si::seconds(end), si::seconds(step))
    }

    pub fn from_seconds(start_s: f64, end_s: f64, step_s: f64) -> AppResult<Self> {
        let start_s = ensure_finite(start_s, "grid start")?;
        let end_s = ensure_finite(end_s, "grid end")?;
        let step_s = ensure_positive(step_s, "grid step")?;
        if end_s <= start_s {
            return Err(AppError::InvalidInput(format!(
                "grid end {end_s} s must be after start {start_s} s"
            )));
        }
        let raw = (end_s - start_s) / step_s;
        if raw > MAX_SAMPLES {
            return Err(AppError::InvalidInput(format!(
                "grid of {raw:e} samples exceeds the limit of {MAX_SAMPLES:e}"
            )));
        }

        Ok(Self::build(start_s, end_s, step_s))
    }

    fn build(start_s: f64, end_s: f64, step_s: f64) -> Self {
        let n = Self::sample_count(start_s, end_s, step_s);
        let times = (0..n).map(|i| start_s + i as f64 * step_s).collect();
        Self {
            start_s,
            step_s,
            times,
        }
    }

    /// `ceil((end - start) / step)`, treating a quotient within rounding
    /// noise of an integer as that integer.
    pub fn sample_count(start_s: f64, end_s: f64, step_s: f64) -> usize {
        let raw = (end_s - start_s) / step_s;
        if raw <= 0.0 {
            return 0;
        }
        let nearest = raw.round();
        if (raw - nearest).abs() <= 1e-9 * nearest.max(1.0) {
            nearest as usize
        } else {
            raw.ceil() as usize
        }
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn times(&self) -> &[f64] {
        &self.times
    }

    pub fn start(&self) -> f64 {
        self.start_s
    }

    pub fn step(&self) -> f64 {
        self.step_s
    }

    pub fn time_at(&self, index: usize) -> Option<f64> {
        self.times.get(index).copied()
    }

    /// Simulated span covered by the samples.
    pub fn duration(&self) -> f64 {
        self.times.last().map_or(0.0, |t| t - self.start_s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fp_core::units::s;

    #[test]
    fn reference_grid_has_one_hundred_thousand_samples() {
        let grid = TimeGrid::new(s(0.0), s(1000.0), s(0.01)).unwrap();
        assert_eq!(grid.len(), 100_000);
        assert_eq!(grid.time_at(0), Some(0.0));
        assert!((grid.time_at(99_999).unwrap() - 999.99).abs() < 1e-9);
        assert_eq!(grid.time_at(100_000), None);
    }

    #[test]
    fn default_grid_matches_reference() {
        assert_eq!(TimeGrid::default().len(), 100_000);
    }

    #[test]
    fn end_is_exclusive_and_partial_steps_round_up() {
        assert_eq!(TimeGrid::sample_count(0.0, 1.0, 0.25), 4);
        assert_eq!(TimeGrid::sample_count(0.0, 1.0, 0.3), 4);
        assert_eq!(TimeGrid::sample_count(0.0, 0.3, 0.1), 3);
    }

    #[test]
    fn times_are_strictly_increasing() {
        let grid = TimeGrid::from_seconds(2.0, 3.0, 0.01).unwrap();
        assert!(grid.times().windows(2).all(|w| w[1] > w[0]));
        assert_eq!(grid.start(), 2.0);
        assert_eq!(grid.step(), 0.01);
    }

    #[test]
    fn rejects_bad_windows() {
        assert!(TimeGrid::from_seconds(0.0, 0.0, 0.01).is_err());
        assert!(TimeGrid::from_seconds(0.0, 1.0, 0.0).is_err());
        assert!(TimeGrid::from_seconds(f64::NAN, 1.0, 0.1).is_err());
    }

    #[test]
    fn rejects_grids_too_large_to_hold() {
        let err = TimeGrid::from_seconds(0.0, 1e30, 1e-3).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)), "unexpected error {err}");
        assert!(TimeGrid::from_seconds(0.0, 1e4, 0.01).is_ok());
    }
}
