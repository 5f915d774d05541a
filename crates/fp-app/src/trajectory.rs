//! Trajectory solver: initial conditions to Cartesian bob positions.
//!
//! The pipeline is integrate -> extract angles -> convert to Cartesian.
//! The vertical coordinate is shifted by a trajectory-wide constant so that
//! the lowest point of the swing sits at `base_height_m`; that constant
//! depends on the minimum over every sample, so the whole series has to
//! exist before any height is final.

use std::sync::Arc;
use std::time::Instant;

use fp_sim::{
    CancelToken, FoucaultPendulum, InitialConditions, IntegrationStats, PendulumConstants,
    PendulumState, PoleGuard, SimOptions, SimProgress, SimRecord, run_on_grid_with_progress,
};
use nalgebra::{Point3, Vector3};

use crate::error::AppResult;
use crate::grid::TimeGrid;

/// Placement of the pendulum in the rendered scene (y up).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SceneGeometry {
    /// Height the lowest point of the swing is lifted to
    pub base_height_m: f64,
    pub pivot: Point3<f64>,
    /// Length of the drawn rod
    pub rod_length_m: f64,
    pub bob_radius_m: f64,
}

impl Default for SceneGeometry {
    fn default() -> Self {
        Self {
            base_height_m: 43.0,
            pivot: Point3::new(0.0, 67.0, 0.0),
            rod_length_m: 24.0,
            bob_radius_m: 1.0,
        }
    }
}

impl SceneGeometry {
    /// Rod axis from the pivot to the bob.
    pub fn rod_vector(&self, bob: &Point3<f64>) -> Vector3<f64> {
        bob - self.pivot
    }

    /// Drawn rod: `rod_length_m` long, from the pivot towards the bob.
    pub fn drawn_rod(&self, bob: &Point3<f64>) -> Vector3<f64> {
        self.rod_vector(bob)
            .try_normalize(f64::EPSILON)
            .map_or_else(Vector3::zeros, |axis| axis * self.rod_length_m)
    }

    /// Gap between the bob's surface at its lowest point and the reference plane.
    pub fn lowest_clearance(&self, trajectory: &Trajectory) -> Option<f64> {
        trajectory.lowest_height().map(|y| y - self.bob_radius_m)
    }
}

/// Polar and azimuthal angle series, index-aligned with the grid.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AngleSeries {
    pub polar: Vec<f64>,
    pub azimuth: Vec<f64>,
}

impl AngleSeries {
    pub fn len(&self) -> usize {
        self.polar.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polar.is_empty()
    }
}

/// Bob positions, one per grid sample. Immutable once built.
#[derive(Clone, Debug, PartialEq)]
pub struct Trajectory {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub z: Vec<f64>,
    angles: AngleSeries,
    vertical_offset: f64,
    initial: InitialConditions,
    stats: IntegrationStats,
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn position(&self, index: usize) -> Option<Point3<f64>> {
        Some(Point3::new(
            *self.x.get(index)?,
            *self.y.get(index)?,
            *self.z.get(index)?,
        ))
    }

    pub fn positions(&self) -> impl Iterator<Item = Point3<f64>> + '_ {
        self.x
            .iter()
            .zip(&self.y)
            .zip(&self.z)
            .map(|((x, y), z)| Point3::new(*x, *y, *z))
    }

    pub fn angles(&self) -> &AngleSeries {
        &self.angles
    }

    /// `base + |min(-L cos a)|`, the constant the heights are built from.
    pub fn vertical_offset(&self) -> f64 {
        self.vertical_offset
    }

    /// Initial conditions the trajectory was integrated from, after pole handling.
    pub fn initial_conditions(&self) -> InitialConditions {
        self.initial
    }

    pub fn stats(&self) -> IntegrationStats {
        self.stats
    }

    pub fn lowest_height(&self) -> Option<f64> {
        self.y.iter().copied().reduce(f64::min)
    }

    pub fn highest_height(&self) -> Option<f64> {
        self.y.iter().copied().reduce(f64::max)
    }
}

/// Pull `a(t)` and `b(t)` out of an integrated record.
pub fn extract_angles(record: &SimRecord<PendulumState>) -> AngleSeries {
    AngleSeries {
        polar: record.x.iter().map(|s| s[0]).collect(),
        azimuth: record.x.iter().map(|s| s[1]).collect(),
    }
}

/// Convert angle series to scene coordinates.
///
/// x = L sin a cos b, z = L sin a sin b, y = base + |min(-L cos a)| - L cos a.
/// Returns `(x, y, z, offset)`.
pub fn to_cartesian(
    angles: &AngleSeries,
    length_m: f64,
    geometry: &SceneGeometry,
) -> (Vec<f64>, Vec<f64>, Vec<f64>, f64) {
    let n = angles.len();
    let mut x = Vec::with_capacity(n);
    let mut z = Vec::with_capacity(n);
    let mut y_raw = Vec::with_capacity(n);

    for (a, b) in angles.polar.iter().zip(&angles.azimuth) {
        let (sin_a, cos_a) = a.sin_cos();
        let (sin_b, cos_b) = b.sin_cos();
        x.push(length_m * sin_a * cos_b);
        z.push(length_m * sin_a * sin_b);
        y_raw.push(-length_m * cos_a);
    }

    let lowest_raw = y_raw.iter().copied().fold(f64::INFINITY, f64::min);
    let offset = if lowest_raw.is_finite() {
        geometry.base_height_m + lowest_raw.abs()
    } else {
        geometry.base_height_m
    };
    // y_raw already holds -L cos a
    let y = y_raw.into_iter().map(|v| offset + v).collect();

    (x, y, z, offset)
}

/// Everything needed to turn initial conditions into a trajectory.
///
/// Cheap to clone: the grid is shared.
#[derive(Clone, Debug)]
pub struct TrajectorySolver {
    pub constants: PendulumConstants,
    pub guard: PoleGuard,
    pub options: SimOptions,
    pub geometry: SceneGeometry,
    grid: Arc<TimeGrid>,
}

impl Default for TrajectorySolver {
    fn default() -> Self {
        Self::new(
            PendulumConstants::default(),
            PoleGuard::default(),
            SimOptions::default(),
            SceneGeometry::default(),
            Arc::new(TimeGrid::default()),
        )
    }
}

impl TrajectorySolver {
    pub fn new(
        constants: PendulumConstants,
        guard: PoleGuard,
        options: SimOptions,
        geometry: SceneGeometry,
        grid: Arc<TimeGrid>,
    ) -> Self {
        Self {
            constants,
            guard,
            options,
            geometry,
            grid,
        }
    }

    pub fn grid(&self) -> &Arc<TimeGrid> {
        &self.grid
    }

    /// Same solver on a different grid.
    pub fn with_grid(&self, grid: Arc<TimeGrid>) -> Self {
        Self {
            grid,
            ..self.clone()
        }
    }

    /// Integrate the equations of motion over the grid.
    pub fn integrate(
        &self,
        initial: InitialConditions,
        cancel: Option<&CancelToken>,
        progress: Option<&mut dyn FnMut(&SimProgress)>,
    ) -> AppResult<(InitialConditions, SimRecord<PendulumState>)> {
        let mut model = FoucaultPendulum::new(self.constants, initial, &self.guard)?;
        let record = run_on_grid_with_progress(
            &mut model,
            self.grid.times(),
            &self.options,
            cancel,
            progress,
        )?;
        tracing::debug!(rhs_evals = model.rhs_evals(), "derivative evaluations");
        Ok((model.initial_conditions(), record))
    }

    /// Compute the full trajectory for `initial`.
    pub fn compute_trajectory(&self, initial: InitialConditions) -> AppResult<Trajectory> {
        self.compute_trajectory_with(initial, None, None)
    }

    /// Compute the full trajectory, with optional cancellation and progress.
    pub fn compute_trajectory_with(
        &self,
        initial: InitialConditions,
        cancel: Option<&CancelToken>,
        progress: Option<&mut dyn FnMut(&SimProgress)>,
    ) -> AppResult<Trajectory> {
        let started = Instant::now();
        let (admitted, record) = self.integrate(initial, cancel, progress)?;
        let angles = extract_angles(&record);
        let (x, y, z, vertical_offset) =
            to_cartesian(&angles, self.constants.length_m, &self.geometry);

        tracing::debug!(
            samples = x.len(),
            accepted = record.stats.accepted_steps,
            rejected = record.stats.rejected_steps,
            elapsed_s = started.elapsed().as_secs_f64(),
            "trajectory computed"
        );

        Ok(Trajectory {
            x,
            y,
            z,
            angles,
            vertical_offset,
            initial: admitted,
            stats: record.stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    #[test]
    fn cartesian_conversion_follows_spherical_coordinates() {
        let angles = AngleSeries {
            polar: vec![PI / 2.0, PI / 6.0],
            azimuth: vec![0.0, PI / 2.0],
        };
        let (x, _y, z, _) = to_cartesian(&angles, 30.0, &SceneGeometry::default());
        assert!((x[0] - 30.0).abs() < 1e-12);
        assert!(z[0].abs() < 1e-12);
        assert!(x[1].abs() < 1e-12);
        assert!((z[1] - 15.0).abs() < 1e-12);
    }

    #[test]
    fn vertical_offset_uses_global_minimum() {
        let angles = AngleSeries {
            polar: vec![0.3, 0.1, 0.2],
            azimuth: vec![0.0; 3],
        };
        let geometry = SceneGeometry::default();
        let (_, y, _, offset) = to_cartesian(&angles, 30.0, &geometry);

        let min_raw = -30.0 * 0.1_f64.cos();
        assert!((offset - (43.0 + min_raw.abs())).abs() < 1e-12);
        // lowest sample is the one closest to vertical
        assert!((y[1] - 43.0).abs() < 1e-12);
        assert!(y[0] > y[2] && y[2] > y[1]);
    }

    #[test]
    fn offset_changes_every_height_when_one_sample_changes() {
        let geometry = SceneGeometry::default();
        let first = AngleSeries {
            polar: vec![0.3, 0.2],
            azimuth: vec![0.0; 2],
        };
        let second = AngleSeries {
            polar: vec![0.3, 0.1],
            azimuth: vec![0.0; 2],
        };
        let (_, y1, _, _) = to_cartesian(&first, 30.0, &geometry);
        let (_, y2, _, _) = to_cartesian(&second, 30.0, &geometry);
        assert_ne!(y1[0], y2[0]);
    }

    #[test]
    fn empty_series_converts_to_empty_trajectory() {
        let (x, y, z, offset) =
            to_cartesian(&AngleSeries::default(), 30.0, &SceneGeometry::default());
        assert!(x.is_empty() && y.is_empty() && z.is_empty());
        assert_eq!(offset, 43.0);
    }

    #[test]
    fn rod_vector_points_from_pivot_to_bob() {
        let geometry = SceneGeometry::default();
        let rod = geometry.rod_vector(&Point3::new(1.0, 45.0, -2.0));
        assert_eq!(rod, Vector3::new(1.0, -22.0, -2.0));
    }

    #[test]
    fn drawn_rod_has_scene_length_and_points_at_bob() {
        let geometry = SceneGeometry::default();
        let bob = Point3::new(3.0, 37.0, 4.0);
        let rod = geometry.drawn_rod(&bob);

        assert!((rod.norm() - geometry.rod_length_m).abs() < 1e-12);
        let axis = geometry.rod_vector(&bob).normalize();
        assert!((rod.normalize() - axis).norm() < 1e-12);
        assert_eq!(geometry.drawn_rod(&geometry.pivot), Vector3::zeros());
    }
}
