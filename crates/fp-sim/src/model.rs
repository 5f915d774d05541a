//! TransientModel trait for pluggable dynamic systems.

use fp_core::Tolerances;

use crate::error::SimResult;

/// Trait for transient (dynamic) system models.
///
/// A TransientModel must implement:
/// - State type (Clone, for snapshots)
/// - Initial state
/// - RHS (right-hand side) computation: x_dot = f(t, x)
/// - Vector arithmetic for integration: add states, scale by scalar
/// - An error norm so adaptive integrators can judge a step
pub trait TransientModel {
    /// State type (must be Clone).
    type State: Clone;

    /// Return the state at the first sample time.
    fn initial_state(&self) -> Self::State;

    /// Compute state derivative dxdt = f(t, x).
    ///
    /// Takes &mut self so models may keep evaluation counters or caches.
    fn rhs(&mut self, t: f64, x: &Self::State) -> SimResult<Self::State>;

    /// Add two states element-wise: result = a + b.
    fn add(&self, a: &Self::State, b: &Self::State) -> Self::State;

    /// Scale a state by a scalar: result = scale * a.
    fn scale(&self, a: &Self::State, scale: f64) -> Self::State;

    /// Weighted RMS norm of a local error estimate between `x0` and `x1`.
    /// Values `<= 1.0` satisfy the tolerance.
    fn error_norm(
        &self,
        err: &Self::State,
        x0: &Self::State,
        x1: &Self::State,
        tol: Tolerances,
    ) -> f64;

    /// True if every component is finite.
    fn is_finite(&self, x: &Self::State) -> bool;
}
