//! Scenario validation logic.

use crate::schema::{
    InitialDef, PhysicsDef, PlaybackDef, Scenario, SceneDef, SolverDef, TimeGridDef,
};

/// Release angles the angle control accepts, in degrees.
pub const RELEASE_ANGLE_RANGE_DEG: (f64, f64) = (0.0, 90.0);
/// Playback rates the rate control accepts, in frames per second.
pub const PLAYBACK_RATE_RANGE_HZ: (f64, f64) = (0.0, 1000.0);
/// Refuse grids that would not fit comfortably in memory.
pub const MAX_SAMPLES: f64 = 10_000_000.0;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Invalid value: {field} = {value} ({reason})")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },
}

fn invalid(field: &str, value: impl ToString, reason: &str) -> ValidationError {
    ValidationError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn finite(field: &str, v: f64) -> Result<(), ValidationError> {
    if v.is_finite() {
        Ok(())
    } else {
        Err(invalid(field, v, "must be finite"))
    }
}

fn positive(field: &str, v: f64) -> Result<(), ValidationError> {
    finite(field, v)?;
    if v > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, v, "must be positive"))
    }
}

fn within(field: &str, v: f64, (lo, hi): (f64, f64)) -> Result<(), ValidationError> {
    finite(field, v)?;
    if (lo..=hi).contains(&v) {
        Ok(())
    } else {
        Err(invalid(field, v, &format!("must lie within [{lo}, {hi}]")))
    }
}

pub fn validate_scenario(scenario: &Scenario) -> Result<(), ValidationError> {
    if scenario.version == 0 || scenario.version > crate::LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: scenario.version,
        });
    }
    if scenario.name.trim().is_empty() {
        return Err(invalid("name", "", "must not be empty"));
    }

    validate_physics(&scenario.physics)?;
    validate_initial(&scenario.initial)?;
    validate_time(&scenario.time)?;
    validate_solver(&scenario.solver)?;
    validate_scene(&scenario.scene)?;
    validate_playback(&scenario.playback)?;
    Ok(())
}

fn validate_physics(physics: &PhysicsDef) -> Result<(), ValidationError> {
    positive("physics.length_m", physics.length_m)?;
    positive("physics.gravity_mps2", physics.gravity_mps2)?;
    finite("physics.earth_rate_radps", physics.earth_rate_radps)?;
    within("physics.latitude_deg", physics.latitude_deg, (-90.0, 90.0))
}

pub fn validate_release_angle(release_angle_deg: f64) -> Result<(), ValidationError> {
    within(
        "initial.release_angle_deg",
        release_angle_deg,
        RELEASE_ANGLE_RANGE_DEG,
    )
}

fn validate_initial(initial: &InitialDef) -> Result<(), ValidationError> {
    validate_release_angle(initial.release_angle_deg)?;
    finite("initial.azimuth_deg", initial.azimuth_deg)?;
    finite("initial.polar_rate_radps", initial.polar_rate_radps)?;
    finite("initial.azimuth_rate_radps", initial.azimuth_rate_radps)
}

fn validate_time(time: &TimeGridDef) -> Result<(), ValidationError> {
    finite("time.start_s", time.start_s)?;
    finite("time.end_s", time.end_s)?;
    positive("time.step_s", time.step_s)?;
    if time.end_s <= time.start_s {
        return Err(invalid("time.end_s", time.end_s, "must be after time.start_s"));
    }
    let samples = (time.end_s - time.start_s) / time.step_s;
    if samples > MAX_SAMPLES {
        return Err(invalid("time.step_s", time.step_s, "grid has too many samples"));
    }
    Ok(())
}

fn validate_solver(solver: &SolverDef) -> Result<(), ValidationError> {
    finite("solver.rtol", solver.rtol)?;
    if solver.rtol < 0.0 {
        return Err(invalid("solver.rtol", solver.rtol, "must not be negative"));
    }
    positive("solver.atol", solver.atol)?;
    if solver.max_steps == 0 {
        return Err(invalid("solver.max_steps", 0, "must be positive"));
    }
    positive("solver.min_step_s", solver.min_step_s)?;
    if let Some(h) = solver.max_step_s {
        positive("solver.max_step_s", h)?;
        if h < solver.min_step_s {
            return Err(invalid("solver.max_step_s", h, "must not be below min_step_s"));
        }
    }
    positive("solver.pole_margin_rad", solver.pole_margin_rad)?;
    if solver.pole_margin_rad >= std::f64::consts::FRAC_PI_2 {
        return Err(invalid(
            "solver.pole_margin_rad",
            solver.pole_margin_rad,
            "must be below pi/2",
        ));
    }
    Ok(())
}

fn validate_scene(scene: &SceneDef) -> Result<(), ValidationError> {
    finite("scene.base_height_m", scene.base_height_m)?;
    finite("scene.pivot_height_m", scene.pivot_height_m)?;
    positive("scene.rod_length_m", scene.rod_length_m)?;
    finite("scene.bob_radius_m", scene.bob_radius_m)?;
    if scene.bob_radius_m < 0.0 {
        return Err(invalid(
            "scene.bob_radius_m",
            scene.bob_radius_m,
            "must not be negative",
        ));
    }
    if scene.pivot_height_m <= scene.base_height_m {
        return Err(invalid(
            "scene.pivot_height_m",
            scene.pivot_height_m,
            "pivot must sit above the base height",
        ));
    }
    Ok(())
}

pub fn validate_playback_rate(rate_hz: f64) -> Result<(), ValidationError> {
    within("playback.rate_hz", rate_hz, PLAYBACK_RATE_RANGE_HZ)
}

fn validate_playback(playback: &PlaybackDef) -> Result<(), ValidationError> {
    validate_playback_rate(playback.rate_hz)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_scenario_is_valid() {
        validate_scenario(&Scenario::default()).unwrap();
    }

    #[test]
    fn rejects_future_version() {
        let scenario = Scenario {
            version: crate::LATEST_VERSION + 1,
            ..Default::default()
        };
        assert!(matches!(
            validate_scenario(&scenario),
            Err(ValidationError::UnsupportedVersion { .. })
        ));
    }

    #[test]
    fn rejects_inverted_time_window() {
        let mut scenario = Scenario::default();
        scenario.time.end_s = -1.0;
        let err = validate_scenario(&scenario).unwrap_err();
        assert!(format!("{err}").contains("time.end_s"));
    }

    #[test]
    fn rejects_release_angle_outside_control_range() {
        assert!(validate_release_angle(90.5).is_err());
        assert!(validate_release_angle(-1.0).is_err());
        assert!(validate_release_angle(f64::NAN).is_err());
        // zero is in range; the pole guard deals with it later
        assert!(validate_release_angle(0.0).is_ok());
    }

    #[test]
    fn rejects_playback_rate_outside_control_range() {
        assert!(validate_playback_rate(1000.0).is_ok());
        assert!(validate_playback_rate(0.0).is_ok());
        assert!(validate_playback_rate(1010.0).is_err());
    }

    #[test]
    fn rejects_pivot_below_base() {
        let mut scenario = Scenario::default();
        scenario.scene.pivot_height_m = 40.0;
        assert!(validate_scenario(&scenario).is_err());
    }

    #[test]
    fn rejects_oversized_grid() {
        let mut scenario = Scenario::default();
        scenario.time.step_s = 1e-6;
        assert!(validate_scenario(&scenario).is_err());
    }

    #[test]
    fn rejects_zero_length() {
        let mut scenario = Scenario::default();
        scenario.physics.length_m = 0.0;
        assert!(validate_scenario(&scenario).is_err());
    }
}
