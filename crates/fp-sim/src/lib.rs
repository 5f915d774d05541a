//! Time integration for the Foucault pendulum.
//!
//! Provides:
//! - `TransientModel` trait for pluggable ODE systems
//! - Adaptive Dormand-Prince 5(4) integrator plus fixed-step RK4 and forward Euler
//! - Grid runner that records the state at every requested sample time,
//!   with progress reporting and cooperative cancellation
//! - The Foucault pendulum equations of motion

pub mod error;
pub mod integrator;
pub mod model;
pub mod pendulum;
pub mod sim;

// Re-exports for public API
pub use error::{SimError, SimResult};
pub use integrator::{DormandPrince45, EmbeddedStep, ForwardEuler, Integrator, RK4, StepController};
pub use model::TransientModel;
pub use pendulum::{
    FoucaultPendulum, InitialConditions, PendulumConstants, PendulumState, PoleGuard, PolePolicy,
};
pub use sim::{
    CancelToken, IntegrationStats, IntegratorType, SimOptions, SimProgress, SimRecord, run_on_grid,
    run_on_grid_with_progress,
};
