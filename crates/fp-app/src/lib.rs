//! Application service layer for the Foucault pendulum.
//!
//! Turns scenario files into solver setups, computes trajectories (on the
//! calling thread or a worker), and drives paced playback from a command
//! queue. Shared by the CLI and any graphical front end.

pub mod commands;
pub mod context;
pub mod error;
pub mod grid;
pub mod playback;
pub mod scenario_service;
pub mod trajectory;
pub mod worker;

pub use commands::{Command, CommandQueue};
pub use context::{SimulationContext, TrajectoryStatus};
pub use error::{AppError, AppResult};
pub use grid::TimeGrid;
pub use playback::{Frame, PlaybackClock};
pub use scenario_service::{SimulationSetup, build_setup, integrator_for, load_scenario};
pub use trajectory::{
    AngleSeries, SceneGeometry, Trajectory, TrajectorySolver, extract_angles, to_cartesian,
};
pub use worker::{TrajectoryWorker, WorkerMessage};
