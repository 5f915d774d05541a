//! Scenario loading and translation into solver inputs.

use std::path::Path;
use std::sync::Arc;

use fp_core::Tolerances;
use fp_core::units::{deg, m, mps2, radps, s};
use fp_project::schema::{MethodDef, PolePolicyDef, Scenario};
use fp_sim::{
    InitialConditions, IntegratorType, PendulumConstants, PoleGuard, PolePolicy, SimOptions,
};
use nalgebra::Point3;

use crate::error::AppResult;
use crate::grid::TimeGrid;
use crate::trajectory::{SceneGeometry, TrajectorySolver};

/// Everything a scenario file turns into.
#[derive(Clone, Debug)]
pub struct SimulationSetup {
    pub name: String,
    pub solver: TrajectorySolver,
    pub initial: InitialConditions,
    pub playback_rate_hz: f64,
    pub trail: bool,
}

impl Default for SimulationSetup {
    fn default() -> Self {
        Self {
            name: "Foucault pendulum".to_string(),
            solver: TrajectorySolver::default(),
            initial: InitialConditions::default(),
            playback_rate_hz: 100.0,
            trail: true,
        }
    }
}

/// Load and validate a scenario file (YAML or JSON).
pub fn load_scenario(path: &Path) -> AppResult<Scenario> {
    let scenario = fp_project::load(path)?;
    tracing::debug!(path = %path.display(), name = %scenario.name, "scenario loaded");
    Ok(scenario)
}

pub fn integrator_for(method: MethodDef) -> IntegratorType {
    match method {
        MethodDef::DormandPrince45 => IntegratorType::DormandPrince45,
        MethodDef::Rk4 => IntegratorType::RK4,
        MethodDef::ForwardEuler => IntegratorType::ForwardEuler,
    }
}

fn pole_policy_for(policy: PolePolicyDef) -> PolePolicy {
    match policy {
        PolePolicyDef::Reject => PolePolicy::Reject,
        PolePolicyDef::Clamp => PolePolicy::Clamp,
    }
}

/// Translate a validated scenario into a solver, initial conditions and
/// playback settings.
pub fn build_setup(scenario: &Scenario) -> AppResult<SimulationSetup> {
    fp_project::validate_scenario(scenario)?;

    let physics = &scenario.physics;
    let constants = PendulumConstants::new(
        m(physics.length_m),
        mps2(physics.gravity_mps2),
        radps(physics.earth_rate_radps),
        deg(physics.latitude_deg),
    )?;

    let solver_def = &scenario.solver;
    let guard = PoleGuard::new(
        solver_def.pole_margin_rad,
        pole_policy_for(solver_def.pole_policy),
    )?;
    let options = SimOptions {
        integrator: integrator_for(solver_def.method),
        tolerances: Tolerances::new(solver_def.atol, solver_def.rtol),
        max_steps: solver_def.max_steps,
        min_step: solver_def.min_step_s,
        max_step: solver_def.max_step_s,
        ..SimOptions::default()
    };
    options.validate()?;

    let time = &scenario.time;
    let grid = TimeGrid::new(s(time.start_s), s(time.end_s), s(time.step_s))?;

    let scene = &scenario.scene;
    let geometry = SceneGeometry {
        base_height_m: scene.base_height_m,
        pivot: Point3::new(0.0, scene.pivot_height_m, 0.0),
        rod_length_m: scene.rod_length_m,
        bob_radius_m: scene.bob_radius_m,
    };

    let initial_def = &scenario.initial;
    let initial = InitialConditions::new(
        deg(initial_def.release_angle_deg),
        deg(initial_def.azimuth_deg),
        initial_def.polar_rate_radps,
        initial_def.azimuth_rate_radps,
    );

    tracing::debug!(
        samples = grid.len(),
        integrator = ?options.integrator,
        "simulation setup built"
    );

    Ok(SimulationSetup {
        name: scenario.name.clone(),
        solver: TrajectorySolver::new(constants, guard, options, geometry, Arc::new(grid)),
        initial,
        playback_rate_hz: scenario.playback.rate_hz,
        trail: scenario.playback.trail,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use fp_project::schema::SolverDef;

    #[test]
    fn default_scenario_builds_reference_setup() {
        let setup = build_setup(&Scenario::default()).unwrap();
        assert_eq!(setup.solver.grid().len(), 100_000);
        assert_eq!(setup.solver.constants, PendulumConstants::default());
        assert_eq!(setup.solver.geometry, SceneGeometry::default());
        assert!((setup.initial.polar_rad - 10f64.to_radians()).abs() < 1e-12);
        assert_eq!(setup.playback_rate_hz, 100.0);
        assert!(setup.trail);
    }

    #[test]
    fn solver_section_maps_onto_options() {
        let scenario = Scenario {
            solver: SolverDef {
                method: MethodDef::Rk4,
                rtol: 1e-6,
                atol: 1e-9,
                max_step_s: Some(0.002),
                pole_policy: PolePolicyDef::Reject,
                ..Default::default()
            },
            ..Default::default()
        };
        let setup = build_setup(&scenario).unwrap();
        let options = &setup.solver.options;
        assert_eq!(options.integrator, IntegratorType::RK4);
        assert_eq!(options.tolerances, Tolerances::new(1e-9, 1e-6));
        assert_eq!(options.max_step, Some(0.002));
        assert_eq!(setup.solver.guard.policy, PolePolicy::Reject);
    }

    #[test]
    fn invalid_scenario_is_refused() {
        let mut scenario = Scenario::default();
        scenario.time.end_s = -1.0;
        assert!(build_setup(&scenario).is_err());
    }
}
