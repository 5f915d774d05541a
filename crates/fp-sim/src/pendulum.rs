//! Foucault pendulum equations of motion.
//!
//! State is `(a, b, x, y)`: `a` the angle of the rod from the vertical,
//! `b` the azimuth of the swing plane, `x = da/dt`, `y = db/dt`. The
//! azimuthal equation divides by `sin(a)`, so `a` must stay inside `(0, pi)`.

use std::f64::consts::PI;

use fp_core::units::{Accel, Angle, AngularRate, Length, constants, deg, m, si};
use fp_core::{
    Tolerances, ensure_finite, ensure_open_interval, ensure_positive, scaled_rms_norm,
};
use nalgebra::Vector4;

use crate::error::{SimError, SimResult};
use crate::model::TransientModel;

/// `(a, b, da/dt, db/dt)`
pub type PendulumState = Vector4<f64>;

/// Physical constants of one simulation run.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PendulumConstants {
    /// Rod length (m)
    pub length_m: f64,
    /// Gravitational acceleration (m/s²)
    pub gravity_mps2: f64,
    /// Angular velocity of the Earth (rad/s)
    pub earth_rate_radps: f64,
    /// Latitude of the pivot (rad)
    pub latitude_rad: f64,
}

impl Default for PendulumConstants {
    fn default() -> Self {
        Self {
            length_m: 30.0,
            gravity_mps2: constants::GRAVITY_MPS2,
            earth_rate_radps: constants::EARTH_RATE_RADPS,
            latitude_rad: si::radians(deg(45.0)),
        }
    }
}

impl PendulumConstants {
    pub fn new(
        length: Length,
        gravity: Accel,
        earth_rate: AngularRate,
        latitude: Angle,
    ) -> SimResult<Self> {
        let length_m = ensure_positive(si::meters(length), "pendulum length")?;
        let gravity_mps2 = ensure_positive(si::mps2(gravity), "gravity")?;
        let earth_rate_radps = ensure_finite(si::radps(earth_rate), "earth rotation rate")?;
        let latitude_rad = ensure_finite(si::radians(latitude), "latitude")?;
        if latitude_rad.abs() > PI / 2.0 {
            return Err(SimError::NonPhysical {
                what: "latitude must lie within [-90°, 90°]",
            });
        }
        Ok(Self {
            length_m,
            gravity_mps2,
            earth_rate_radps,
            latitude_rad,
        })
    }

    pub fn length(&self) -> Length {
        m(self.length_m)
    }

    /// Small-oscillation angular frequency sqrt(g/L).
    pub fn natural_frequency(&self) -> f64 {
        (self.gravity_mps2 / self.length_m).sqrt()
    }

    /// Small-angle period 2π·sqrt(L/g).
    pub fn small_angle_period(&self) -> f64 {
        2.0 * PI / self.natural_frequency()
    }

    /// Rate at which the swing plane turns, ω·sin(φ).
    pub fn precession_rate(&self) -> f64 {
        self.earth_rate_radps * self.latitude_rad.sin()
    }

    /// Instantaneous derivative `(da/dt, db/dt, dx/dt, dy/dt)`.
    ///
    /// Undefined (Inf/NaN) when `sin(a) == 0`.
    pub fn derivative(&self, state: &PendulumState) -> PendulumState {
        let (a, b, x, y) = (state[0], state[1], state[2], state[3]);
        let (sin_a, cos_a) = a.sin_cos();
        let (sin_phi, cos_phi) = self.latitude_rad.sin_cos();
        let omega = self.earth_rate_radps;

        // projection of Earth's rotation axis shared by both Coriolis terms
        let coupling = cos_phi * sin_a * b.cos() + sin_phi * cos_a;

        let dx = sin_a * cos_a * y * y + 2.0 * omega * sin_a * coupling * y
            - (self.gravity_mps2 / self.length_m) * sin_a;
        let dy = (-2.0 * cos_a * x * y - 2.0 * omega * coupling * x) / sin_a;

        Vector4::new(x, y, dx, dy)
    }
}

/// Initial-condition set `(a0, b0, x0, y0)`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct InitialConditions {
    /// Release angle from vertical (rad)
    pub polar_rad: f64,
    /// Initial azimuth (rad)
    pub azimuth_rad: f64,
    /// Initial da/dt (rad/s)
    pub polar_rate: f64,
    /// Initial db/dt (rad/s)
    pub azimuth_rate: f64,
}

impl Default for InitialConditions {
    fn default() -> Self {
        Self {
            polar_rad: si::radians(deg(10.0)),
            azimuth_rad: 0.0,
            polar_rate: 0.1,
            azimuth_rate: 0.1,
        }
    }
}

impl InitialConditions {
    pub fn new(release: Angle, azimuth: Angle, polar_rate: f64, azimuth_rate: f64) -> Self {
        Self {
            polar_rad: si::radians(release),
            azimuth_rad: si::radians(azimuth),
            polar_rate,
            azimuth_rate,
        }
    }

    /// Replace only the release angle.
    pub fn with_release(self, release: Angle) -> Self {
        Self {
            polar_rad: si::radians(release),
            ..self
        }
    }

    pub fn as_state(&self) -> PendulumState {
        Vector4::new(
            self.polar_rad,
            self.azimuth_rad,
            self.polar_rate,
            self.azimuth_rate,
        )
    }
}

/// What to do with a release angle that sits too close to a pole.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PolePolicy {
    /// Refuse the initial conditions.
    Reject,
    /// Move the angle to the nearest admissible value.
    #[default]
    Clamp,
}

/// Keeps the release angle inside `[margin, pi - margin]`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PoleGuard {
    pub margin_rad: f64,
    pub policy: PolePolicy,
}

impl Default for PoleGuard {
    fn default() -> Self {
        Self {
            margin_rad: 1e-3,
            policy: PolePolicy::default(),
        }
    }
}

impl PoleGuard {
    pub fn new(margin_rad: f64, policy: PolePolicy) -> SimResult<Self> {
        let margin_rad = ensure_open_interval(margin_rad, 0.0, PI / 2.0, "pole margin")?;
        Ok(Self { margin_rad, policy })
    }

    /// Validate initial conditions before they reach the derivative.
    pub fn admit(&self, ic: InitialConditions) -> SimResult<InitialConditions> {
        for (v, what) in [
            (ic.polar_rad, "release angle"),
            (ic.azimuth_rad, "initial azimuth"),
            (ic.polar_rate, "initial polar rate"),
            (ic.azimuth_rate, "initial azimuth rate"),
        ] {
            ensure_finite(v, what)?;
        }

        let lo = self.margin_rad;
        let hi = PI - self.margin_rad;
        if (lo..=hi).contains(&ic.polar_rad) {
            return Ok(ic);
        }

        match self.policy {
            PolePolicy::Reject => Err(SimError::PoleViolation {
                angle_rad: ic.polar_rad,
                margin_rad: self.margin_rad,
            }),
            PolePolicy::Clamp => {
                let clamped = ic.polar_rad.clamp(lo, hi);
                tracing::warn!(
                    requested = ic.polar_rad,
                    clamped,
                    "release angle too close to a pole, clamping"
                );
                Ok(InitialConditions {
                    polar_rad: clamped,
                    ..ic
                })
            }
        }
    }
}

/// The pendulum as a transient model.
#[derive(Clone, Debug)]
pub struct FoucaultPendulum {
    pub constants: PendulumConstants,
    initial: InitialConditions,
    rhs_evals: usize,
}

impl FoucaultPendulum {
    /// Build a model; the initial conditions pass through `guard` first.
    pub fn new(
        constants: PendulumConstants,
        initial: InitialConditions,
        guard: &PoleGuard,
    ) -> SimResult<Self> {
        let initial = guard.admit(initial)?;
        Ok(Self {
            constants,
            initial,
            rhs_evals: 0,
        })
    }

    /// Initial conditions after pole handling.
    pub fn initial_conditions(&self) -> InitialConditions {
        self.initial
    }

    /// Number of derivative evaluations so far.
    pub fn rhs_evals(&self) -> usize {
        self.rhs_evals
    }
}

impl TransientModel for FoucaultPendulum {
    type State = PendulumState;

    fn initial_state(&self) -> Self::State {
        self.initial.as_state()
    }

    fn rhs(&mut self, _t: f64, x: &Self::State) -> SimResult<Self::State> {
        self.rhs_evals += 1;
        Ok(self.constants.derivative(x))
    }

    fn add(&self, a: &Self::State, b: &Self::State) -> Self::State {
        a + b
    }

    fn scale(&self, a: &Self::State, scale: f64) -> Self::State {
        a * scale
    }

    fn error_norm(
        &self,
        err: &Self::State,
        x0: &Self::State,
        x1: &Self::State,
        tol: Tolerances,
    ) -> f64 {
        scaled_rms_norm(err.as_slice(), x0.as_slice(), x1.as_slice(), tol)
    }

    fn is_finite(&self, x: &Self::State) -> bool {
        x.iter().all(|v| v.is_finite())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fp_core::units::{mps2, rad, radps};
    use proptest::prelude::*;

    #[test]
    fn derivative_definitional_components() {
        let c = PendulumConstants::default();
        let s = Vector4::new(0.3, 1.2, -0.4, 0.25);
        let d = c.derivative(&s);
        assert_eq!(d[0], -0.4);
        assert_eq!(d[1], 0.25);
    }

    #[test]
    fn derivative_without_rotation_is_spherical_pendulum() {
        let c = PendulumConstants {
            earth_rate_radps: 0.0,
            ..Default::default()
        };
        let (a, x, y) = (0.4_f64, 0.2_f64, 0.3_f64);
        let d = c.derivative(&Vector4::new(a, 0.0, x, y));
        let g_over_l = c.gravity_mps2 / c.length_m;
        let dx = a.sin() * a.cos() * y * y - g_over_l * a.sin();
        let dy = -2.0 * a.cos() * x * y / a.sin();
        assert!((d[2] - dx).abs() < 1e-15);
        assert!((d[3] - dy).abs() < 1e-15);
    }

    #[test]
    fn coriolis_term_couples_latitude() {
        let s = Vector4::new(0.2, 0.0, 0.1, 0.1);
        let equator = PendulumConstants {
            latitude_rad: 0.0,
            ..Default::default()
        };
        let pole = PendulumConstants {
            latitude_rad: PI / 2.0,
            ..Default::default()
        };
        assert_ne!(equator.derivative(&s)[3], pole.derivative(&s)[3]);
    }

    #[test]
    fn derivative_blows_up_at_pole() {
        let c = PendulumConstants::default();
        let d = c.derivative(&Vector4::new(0.0, 0.0, 0.1, 0.1));
        assert!(!d[3].is_finite());
    }

    #[test]
    fn constants_reject_bad_values() {
        let g = mps2(9.81);
        let w = radps(7.27e-5);
        assert!(PendulumConstants::new(m(0.0), g, w, deg(45.0)).is_err());
        assert!(PendulumConstants::new(m(30.0), mps2(-1.0), w, deg(45.0)).is_err());
        assert!(PendulumConstants::new(m(30.0), g, w, deg(120.0)).is_err());
        let c = PendulumConstants::new(m(30.0), g, w, deg(45.0)).unwrap();
        assert!((c.latitude_rad - PI / 4.0).abs() < 1e-12);
    }

    #[test]
    fn small_angle_period_for_thirty_metres() {
        let c = PendulumConstants::default();
        assert!((c.small_angle_period() - 10.99).abs() < 0.01);
    }

    #[test]
    fn swing_plane_turns_with_the_sine_of_latitude() {
        let at = |lat: f64| PendulumConstants {
            latitude_rad: lat,
            ..Default::default()
        };
        let omega = constants::EARTH_RATE_RADPS;
        assert_eq!(at(0.0).precession_rate(), 0.0);
        assert!((at(PI / 2.0).precession_rate() - omega).abs() < 1e-18);
        assert!((at(-PI / 2.0).precession_rate() + omega).abs() < 1e-18);
        let mid = PendulumConstants::default().precession_rate();
        assert!((mid - omega * std::f64::consts::FRAC_1_SQRT_2).abs() < 1e-15);
    }

    #[test]
    fn guard_clamps_zero_release_angle() {
        let guard = PoleGuard::default();
        let ic = InitialConditions::default().with_release(rad(0.0));
        let admitted = guard.admit(ic).unwrap();
        assert_eq!(admitted.polar_rad, guard.margin_rad);
        let d = PendulumConstants::default().derivative(&admitted.as_state());
        assert!(d.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn guard_margin_must_lie_below_a_right_angle() {
        for margin in [0.0, -1e-3, PI / 2.0, 2.0, f64::NAN] {
            let err = PoleGuard::new(margin, PolePolicy::Clamp).unwrap_err();
            assert!(matches!(err, SimError::Domain(_)), "margin {margin}: {err}");
        }
        let err = PoleGuard::new(2.0, PolePolicy::Reject).unwrap_err();
        assert!(matches!(
            err,
            SimError::Domain(fp_core::FpError::OutOfDomain { value, .. }) if value == 2.0
        ));
        assert!(PoleGuard::new(0.05, PolePolicy::Clamp).is_ok());
    }

    #[test]
    fn guard_rejects_zero_release_angle_when_asked() {
        let guard = PoleGuard::new(1e-3, PolePolicy::Reject).unwrap();
        let ic = InitialConditions::default().with_release(rad(1e-6));
        assert!(matches!(guard.admit(ic), Err(SimError::PoleViolation { .. })));
        let ic = InitialConditions::default().with_release(rad(PI));
        assert!(guard.admit(ic).is_err());
    }

    #[test]
    fn guard_passes_interior_angles_untouched() {
        let guard = PoleGuard::new(1e-3, PolePolicy::Reject).unwrap();
        let ic = InitialConditions::default();
        assert_eq!(guard.admit(ic).unwrap(), ic);
    }

    #[test]
    fn guard_rejects_nan() {
        let guard = PoleGuard::default();
        let ic = InitialConditions {
            polar_rate: f64::NAN,
            ..Default::default()
        };
        assert!(matches!(guard.admit(ic), Err(SimError::Domain(_))));
    }

    #[test]
    fn model_counts_rhs_evaluations() {
        let mut model = FoucaultPendulum::new(
            PendulumConstants::default(),
            InitialConditions::default(),
            &PoleGuard::default(),
        )
        .unwrap();
        let x = model.initial_state();
        model.rhs(0.0, &x).unwrap();
        model.rhs(0.0, &x).unwrap();
        assert_eq!(model.rhs_evals(), 2);
    }

    proptest! {
        #[test]
        fn derivative_is_finite_inside_domain(
            a in 1e-3_f64..(PI - 1e-3),
            b in -10.0_f64..10.0,
            x in -5.0_f64..5.0,
            y in -5.0_f64..5.0,
            lat in -PI / 2.0..PI / 2.0,
        ) {
            let c = PendulumConstants { latitude_rad: lat, ..Default::default() };
            let d = c.derivative(&Vector4::new(a, b, x, y));
            prop_assert!(d.iter().all(|v| v.is_finite()));
        }
    }
}
