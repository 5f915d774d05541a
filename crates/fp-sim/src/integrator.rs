//! Time integrators: fixed-step RK4 / forward Euler and the embedded
//! Dormand-Prince 5(4) pair used for adaptive stepping.

use fp_core::Tolerances;

use crate::error::SimResult;
use crate::model::TransientModel;

/// Trait for time integrators.
pub trait Integrator {
    /// Advance state by one time step using the transient model.
    fn step<M: TransientModel>(
        &self,
        model: &mut M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State>;
}

/// x + h * sum(c_i * k_i), skipping zero coefficients.
fn combine<M: TransientModel>(
    model: &M,
    x: &M::State,
    h: f64,
    terms: &[(f64, &M::State)],
) -> M::State {
    terms.iter().fold(x.clone(), |acc, (c, k)| {
        if *c == 0.0 {
            acc
        } else {
            model.add(&acc, &model.scale(k, h * c))
        }
    })
}

/// Classical RK4 (Runge-Kutta 4th order) integrator.
#[derive(Clone, Debug)]
pub struct RK4;

impl Integrator for RK4 {
    fn step<M: TransientModel>(
        &self,
        model: &mut M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State> {
        let k1 = model.rhs(t, x)?;

        let x2 = model.add(x, &model.scale(&k1, 0.5 * dt));
        let k2 = model.rhs(t + 0.5 * dt, &x2)?;

        let x3 = model.add(x, &model.scale(&k2, 0.5 * dt));
        let k3 = model.rhs(t + 0.5 * dt, &x3)?;

        let x4 = model.add(x, &model.scale(&k3, dt));
        let k4 = model.rhs(t + dt, &x4)?;

        // x_new = x + (dt/6) * (k1 + 2*k2 + 2*k3 + k4)
        Ok(combine(
            model,
            x,
            dt / 6.0,
            &[(1.0, &k1), (2.0, &k2), (2.0, &k3), (1.0, &k4)],
        ))
    }
}

/// Forward Euler (explicit, 1st order, fast for testing).
#[derive(Clone, Debug)]
pub struct ForwardEuler;

impl Integrator for ForwardEuler {
    fn step<M: TransientModel>(
        &self,
        model: &mut M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State> {
        let xdot = model.rhs(t, x)?;
        Ok(model.add(x, &model.scale(&xdot, dt)))
    }
}

/// Output of one embedded Runge-Kutta step.
#[derive(Clone, Debug)]
pub struct EmbeddedStep<S> {
    /// 5th-order solution at t + dt
    pub state: S,
    /// Difference between the 5th- and 4th-order solutions
    pub error: S,
}

/// Dormand-Prince 5(4) embedded pair (the method behind `ode45`/`RK45`).
#[derive(Clone, Debug, Default)]
pub struct DormandPrince45;

// Butcher tableau
const C2: f64 = 1.0 / 5.0;
const C3: f64 = 3.0 / 10.0;
const C4: f64 = 4.0 / 5.0;
const C5: f64 = 8.0 / 9.0;

const A21: f64 = 1.0 / 5.0;
const A31: f64 = 3.0 / 40.0;
const A32: f64 = 9.0 / 40.0;
const A41: f64 = 44.0 / 45.0;
const A42: f64 = -56.0 / 15.0;
const A43: f64 = 32.0 / 9.0;
const A51: f64 = 19372.0 / 6561.0;
const A52: f64 = -25360.0 / 2187.0;
const A53: f64 = 64448.0 / 6561.0;
const A54: f64 = -212.0 / 729.0;
const A61: f64 = 9017.0 / 3168.0;
const A62: f64 = -355.0 / 33.0;
const A63: f64 = 46732.0 / 5247.0;
const A64: f64 = 49.0 / 176.0;
const A65: f64 = -5103.0 / 18656.0;

const B1: f64 = 35.0 / 384.0;
const B3: f64 = 500.0 / 1113.0;
const B4: f64 = 125.0 / 192.0;
const B5: f64 = -2187.0 / 6784.0;
const B6: f64 = 11.0 / 84.0;

// b - b_hat
const E1: f64 = 71.0 / 57600.0;
const E3: f64 = -71.0 / 16695.0;
const E4: f64 = 71.0 / 1920.0;
const E5: f64 = -17253.0 / 339200.0;
const E6: f64 = 22.0 / 525.0;
const E7: f64 = -1.0 / 40.0;

impl DormandPrince45 {
    /// Order of the error estimator, used by the step controller.
    pub const ERROR_ORDER: f64 = 4.0;

    /// Take one step of size `dt` and return the solution with its error estimate.
    pub fn try_step<M: TransientModel>(
        &self,
        model: &mut M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<EmbeddedStep<M::State>> {
        let k1 = model.rhs(t, x)?;

        let x2 = combine(model, x, dt, &[(A21, &k1)]);
        let k2 = model.rhs(t + C2 * dt, &x2)?;

        let x3 = combine(model, x, dt, &[(A31, &k1), (A32, &k2)]);
        let k3 = model.rhs(t + C3 * dt, &x3)?;

        let x4 = combine(model, x, dt, &[(A41, &k1), (A42, &k2), (A43, &k3)]);
        let k4 = model.rhs(t + C4 * dt, &x4)?;

        let x5 = combine(
            model,
            x,
            dt,
            &[(A51, &k1), (A52, &k2), (A53, &k3), (A54, &k4)],
        );
        let k5 = model.rhs(t + C5 * dt, &x5)?;

        let x6 = combine(
            model,
            x,
            dt,
            &[(A61, &k1), (A62, &k2), (A63, &k3), (A64, &k4), (A65, &k5)],
        );
        let k6 = model.rhs(t + dt, &x6)?;

        let state = combine(
            model,
            x,
            dt,
            &[(B1, &k1), (B3, &k3), (B4, &k4), (B5, &k5), (B6, &k6)],
        );
        let k7 = model.rhs(t + dt, &state)?;

        let zero = model.scale(&k1, 0.0);
        let error = combine(
            model,
            &zero,
            dt,
            &[
                (E1, &k1),
                (E3, &k3),
                (E4, &k4),
                (E5, &k5),
                (E6, &k6),
                (E7, &k7),
            ],
        );

        Ok(EmbeddedStep { state, error })
    }
}

impl Integrator for DormandPrince45 {
    fn step<M: TransientModel>(
        &self,
        model: &mut M,
        t: f64,
        x: &M::State,
        dt: f64,
    ) -> SimResult<M::State> {
        Ok(self.try_step(model, t, x, dt)?.state)
    }
}

/// Elementary step-size controller for embedded pairs.
#[derive(Clone, Copy, Debug)]
pub struct StepController {
    pub tol: Tolerances,
    /// Safety factor applied to the optimal step
    pub safety: f64,
    /// Smallest allowed shrink factor per step
    pub min_factor: f64,
    /// Largest allowed growth factor per step
    pub max_factor: f64,
}

impl StepController {
    pub fn new(tol: Tolerances) -> Self {
        Self {
            tol,
            safety: 0.9,
            min_factor: 0.2,
            max_factor: 10.0,
        }
    }

    /// Propose the next step size after a step of size `h` with error norm `err`.
    ///
    /// A NaN/infinite norm shrinks by `min_factor`. After a rejected step
    /// (`err > 1`) the step never grows.
    pub fn propose(&self, h: f64, err: f64) -> f64 {
        if !err.is_finite() {
            return h * self.min_factor;
        }
        let factor = if err == 0.0 {
            self.max_factor
        } else {
            let exponent = -1.0 / (DormandPrince45::ERROR_ORDER + 1.0);
            (self.safety * err.powf(exponent)).clamp(self.min_factor, self.max_factor)
        };
        if err > 1.0 { h * factor.min(1.0) } else { h * factor }
    }

    pub fn accepts(&self, err: f64) -> bool {
        err.is_finite() && err <= 1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SimResult;

    /// dx/dt = -x
    struct Decay;

    impl TransientModel for Decay {
        type State = f64;

        fn initial_state(&self) -> f64 {
            1.0
        }

        fn rhs(&mut self, _t: f64, x: &f64) -> SimResult<f64> {
            Ok(-x)
        }

        fn add(&self, a: &f64, b: &f64) -> f64 {
            a + b
        }

        fn scale(&self, a: &f64, scale: f64) -> f64 {
            a * scale
        }

        fn error_norm(&self, err: &f64, x0: &f64, x1: &f64, tol: Tolerances) -> f64 {
            fp_core::scaled_rms_norm(&[*err], &[*x0], &[*x1], tol)
        }

        fn is_finite(&self, x: &f64) -> bool {
            x.is_finite()
        }
    }

    #[test]
    fn rk4_matches_exponential() {
        let mut model = Decay;
        let x = RK4.step(&mut model, 0.0, &1.0, 0.1).unwrap();
        assert!((x - (-0.1_f64).exp()).abs() < 1e-7);
    }

    #[test]
    fn euler_is_first_order() {
        let mut model = Decay;
        let x = ForwardEuler.step(&mut model, 0.0, &1.0, 0.1).unwrap();
        assert!((x - 0.9).abs() < 1e-15);
    }

    #[test]
    fn dormand_prince_is_accurate_and_estimates_small_error() {
        let mut model = Decay;
        let step = DormandPrince45.try_step(&mut model, 0.0, &1.0, 0.1).unwrap();
        assert!((step.state - (-0.1_f64).exp()).abs() < 1e-8);
        assert!(step.error.abs() < 1e-6);
        assert!(step.error.abs() > 0.0);
    }

    #[test]
    fn dormand_prince_error_shrinks_with_step() {
        let mut model = Decay;
        let big = DormandPrince45.try_step(&mut model, 0.0, &1.0, 0.4).unwrap();
        let small = DormandPrince45.try_step(&mut model, 0.0, &1.0, 0.2).unwrap();
        // local error estimate is O(h^5)
        let ratio = big.error.abs() / small.error.abs();
        assert!(ratio > 16.0, "ratio = {ratio}");
    }

    #[test]
    fn controller_shrinks_on_rejection_and_grows_on_easy_steps() {
        let ctl = StepController::new(Tolerances::default());
        assert!(ctl.propose(0.1, 4.0) < 0.1);
        assert!(ctl.propose(0.1, 1e-4) > 0.1);
        assert_eq!(ctl.propose(0.1, 0.0), 0.1 * ctl.max_factor);
        assert_eq!(ctl.propose(0.1, f64::NAN), 0.1 * ctl.min_factor);
        assert!(!ctl.accepts(f64::NAN));
        assert!(ctl.accepts(0.5));
    }
}
