//! Scenario schema definitions.
//!
//! Every section falls back to the reference scene: a 30 m pendulum at 45°
//! latitude released at 10°, sampled every 10 ms for 1000 s.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Scenario {
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub physics: PhysicsDef,
    #[serde(default)]
    pub initial: InitialDef,
    #[serde(default)]
    pub time: TimeGridDef,
    #[serde(default)]
    pub solver: SolverDef,
    #[serde(default)]
    pub scene: SceneDef,
    #[serde(default)]
    pub playback: PlaybackDef,
}

impl Default for Scenario {
    fn default() -> Self {
        Self {
            version: crate::LATEST_VERSION,
            name: "Foucault pendulum".to_string(),
            physics: PhysicsDef::default(),
            initial: InitialDef::default(),
            time: TimeGridDef::default(),
            solver: SolverDef::default(),
            scene: SceneDef::default(),
            playback: PlaybackDef::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PhysicsDef {
    pub length_m: f64,
    pub gravity_mps2: f64,
    pub earth_rate_radps: f64,
    pub latitude_deg: f64,
}

impl Default for PhysicsDef {
    fn default() -> Self {
        Self {
            length_m: 30.0,
            gravity_mps2: 9.81,
            earth_rate_radps: 7.27e-5,
            latitude_deg: 45.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct InitialDef {
    /// Angle of the rod from vertical at release
    pub release_angle_deg: f64,
    pub azimuth_deg: f64,
    pub polar_rate_radps: f64,
    pub azimuth_rate_radps: f64,
}

impl Default for InitialDef {
    fn default() -> Self {
        Self {
            release_angle_deg: 10.0,
            azimuth_deg: 0.0,
            polar_rate_radps: 0.1,
            azimuth_rate_radps: 0.1,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TimeGridDef {
    pub start_s: f64,
    /// Exclusive
    pub end_s: f64,
    pub step_s: f64,
}

impl Default for TimeGridDef {
    fn default() -> Self {
        Self {
            start_s: 0.0,
            end_s: 1000.0,
            step_s: 0.01,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum MethodDef {
    #[default]
    DormandPrince45,
    Rk4,
    ForwardEuler,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PolePolicyDef {
    Reject,
    #[default]
    Clamp,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SolverDef {
    pub method: MethodDef,
    pub rtol: f64,
    pub atol: f64,
    pub max_steps: usize,
    pub min_step_s: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_step_s: Option<f64>,
    pub pole_margin_rad: f64,
    pub pole_policy: PolePolicyDef,
}

impl Default for SolverDef {
    fn default() -> Self {
        Self {
            method: MethodDef::default(),
            rtol: 1e-8,
            atol: 1e-6,
            max_steps: 2_000_000,
            min_step_s: 1e-12,
            max_step_s: None,
            pole_margin_rad: 1e-3,
            pole_policy: PolePolicyDef::default(),
        }
    }
}

/// Where the pendulum hangs in the rendered scene.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SceneDef {
    /// Height of the lowest point of the swing
    pub base_height_m: f64,
    pub pivot_height_m: f64,
    pub rod_length_m: f64,
    pub bob_radius_m: f64,
}

impl Default for SceneDef {
    fn default() -> Self {
        Self {
            base_height_m: 43.0,
            pivot_height_m: 67.0,
            rod_length_m: 24.0,
            bob_radius_m: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlaybackDef {
    /// Frames per second; 0 pauses
    pub rate_hz: f64,
    pub trail: bool,
}

impl Default for PlaybackDef {
    fn default() -> Self {
        Self {
            rate_hz: 100.0,
            trail: true,
        }
    }
}
