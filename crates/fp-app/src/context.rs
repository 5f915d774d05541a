//! Interactive simulation state: the current trajectory, the staged
//! parameters, and the playback position.
//!
//! All mutation goes through [`Command`]s. Bad input never panics; it is
//! either refused with a warning or leaves the context `Degraded`.

use std::time::Duration;

use fp_core::units::{deg, rad, si};
use fp_sim::InitialConditions;

use crate::commands::{Command, CommandQueue};
use crate::error::AppResult;
use crate::playback::{Frame, PlaybackClock};
use crate::scenario_service::SimulationSetup;
use crate::trajectory::{Trajectory, TrajectorySolver};
use crate::worker::TrajectoryWorker;

#[derive(Clone, Debug, PartialEq)]
pub enum TrajectoryStatus {
    /// Nothing applied yet
    Empty,
    /// A background computation is running
    Computing,
    Ready,
    /// Last apply failed; no frames are produced
    Degraded { reason: String },
}

#[derive(Debug)]
pub struct SimulationContext {
    solver: TrajectorySolver,
    /// Conditions of the current (or in-flight) trajectory
    applied: InitialConditions,
    /// Release angle waiting for the next `Apply`
    pending_release_deg: f64,
    trajectory: Option<Trajectory>,
    status: TrajectoryStatus,
    clock: PlaybackClock,
    trail: bool,
    clear_trail: bool,
    worker: Option<TrajectoryWorker>,
    background: bool,
}

impl SimulationContext {
    pub fn new(solver: TrajectorySolver, initial: InitialConditions) -> Self {
        Self {
            solver,
            applied: initial,
            pending_release_deg: si::degrees(rad(initial.polar_rad)),
            trajectory: None,
            status: TrajectoryStatus::Empty,
            clock: PlaybackClock::default(),
            trail: true,
            clear_trail: false,
            worker: None,
            background: false,
        }
    }

    pub fn from_setup(setup: SimulationSetup) -> AppResult<Self> {
        let mut ctx = Self::new(setup.solver, setup.initial);
        ctx.clock = PlaybackClock::new(setup.playback_rate_hz)?;
        ctx.trail = setup.trail;
        Ok(ctx)
    }

    /// Run `Apply` on a worker thread instead of blocking.
    pub fn with_background_apply(mut self, background: bool) -> Self {
        self.background = background;
        self
    }

    pub fn solver(&self) -> &TrajectorySolver {
        &self.solver
    }

    pub fn status(&self) -> &TrajectoryStatus {
        &self.status
    }

    pub fn trajectory(&self) -> Option<&Trajectory> {
        self.trajectory.as_ref()
    }

    pub fn applied_conditions(&self) -> InitialConditions {
        self.applied
    }

    pub fn pending_release_deg(&self) -> f64 {
        self.pending_release_deg
    }

    pub fn playback_rate_hz(&self) -> f64 {
        self.clock.rate_hz()
    }

    /// True while the playback rate is zero.
    pub fn is_paused(&self) -> bool {
        self.clock.is_paused()
    }

    /// Wall-clock time between frames, `None` while paused.
    pub fn frame_interval(&self) -> Option<Duration> {
        self.clock.frame_interval()
    }

    pub fn playback_index(&self) -> usize {
        self.clock.index()
    }

    pub fn trail(&self) -> bool {
        self.trail
    }

    /// True once every frame of the current trajectory has been emitted.
    pub fn is_finished(&self) -> bool {
        match &self.trajectory {
            Some(trajectory) => self.clock.is_finished(trajectory.len()),
            None => false,
        }
    }

    /// True when playback can only move on after another command: paused,
    /// or the last apply failed.
    pub fn awaits_command(&self) -> bool {
        self.is_paused() || matches!(self.status, TrajectoryStatus::Degraded { .. })
    }

    /// Stage a release angle for the next `Apply`.
    pub fn set_release_angle(&mut self, degrees: f64) -> AppResult<()> {
        fp_project::validate_release_angle(degrees)?;
        self.pending_release_deg = degrees;
        Ok(())
    }

    pub fn set_playback_rate(&mut self, hz: f64) -> AppResult<()> {
        self.clock.set_rate(hz)
    }

    pub fn set_trail(&mut self, on: bool) {
        if self.trail && !on {
            self.clear_trail = true;
        }
        self.trail = on;
    }

    fn staged_conditions(&self) -> InitialConditions {
        self.applied.with_release(deg(self.pending_release_deg))
    }

    /// Recompute with the staged release angle, swap the result in and
    /// restart playback. Runs on a worker when background apply is enabled.
    pub fn apply(&mut self) {
        if self.background {
            self.apply_in_background();
        } else {
            self.apply_blocking();
        }
    }

    /// Compute on the calling thread.
    pub fn apply_blocking(&mut self) {
        // An in-flight computation is superseded.
        self.worker = None;
        let initial = self.staged_conditions();
        tracing::info!(release_deg = self.pending_release_deg, "applying parameters");
        let outcome = self.solver.compute_trajectory(initial);
        self.install(initial, outcome);
    }

    /// Start the computation on a worker thread, cancelling any in flight.
    /// The result is swapped in by `poll` or `wait_for_worker`.
    pub fn apply_in_background(&mut self) {
        let initial = self.staged_conditions();
        tracing::info!(
            release_deg = self.pending_release_deg,
            "applying parameters in background"
        );
        // Replacing the worker drops, and so cancels, the previous one.
        self.worker = Some(TrajectoryWorker::start(self.solver.clone(), initial));
        self.status = TrajectoryStatus::Computing;
    }

    fn install(&mut self, initial: InitialConditions, outcome: AppResult<Trajectory>) {
        self.clock.reset();
        match outcome {
            Ok(trajectory) => {
                self.applied = trajectory.initial_conditions();
                tracing::debug!(samples = trajectory.len(), "trajectory swapped in");
                self.trajectory = Some(trajectory);
                self.status = TrajectoryStatus::Ready;
            }
            Err(e) => {
                tracing::warn!(error = %e, "trajectory computation failed");
                self.applied = initial;
                self.trajectory = None;
                self.status = TrajectoryStatus::Degraded {
                    reason: e.to_string(),
                };
            }
        }
    }

    /// Collect a finished background computation, if any.
    pub fn poll(&mut self) -> bool {
        let Some(worker) = self.worker.as_mut() else {
            return false;
        };
        match worker.poll() {
            Some(outcome) => {
                let initial = worker.initial_conditions();
                self.worker = None;
                self.install(initial, outcome);
                true
            }
            None => false,
        }
    }

    /// Block until the background computation (if any) finishes.
    pub fn wait_for_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            let initial = worker.initial_conditions();
            let outcome = worker.wait();
            self.install(initial, outcome);
        }
    }

    /// Latest `(sample, total)` of the background computation.
    pub fn worker_progress(&self) -> Option<(usize, usize)> {
        self.worker.as_ref().and_then(|w| w.progress())
    }

    /// Apply one command. Invalid values are refused and logged; the
    /// context stays as it was.
    pub fn handle(&mut self, command: Command) {
        let refused = match command {
            Command::SetReleaseAngle { degrees } => self.set_release_angle(degrees).err(),
            Command::SetPlaybackRate { hz } => self.set_playback_rate(hz).err(),
            Command::SetTrail(on) => {
                self.set_trail(on);
                None
            }
            Command::Apply => {
                self.apply();
                None
            }
        };
        if let Some(e) = refused {
            tracing::warn!(error = %e, "command refused");
        }
    }

    /// Handle everything waiting in `queue`, in order.
    pub fn drain(&mut self, queue: &CommandQueue) -> usize {
        let commands = queue.drain();
        let n = commands.len();
        for command in commands {
            self.handle(command);
        }
        n
    }

    fn frame_at(&mut self, index: usize) -> Option<Frame> {
        let trajectory = self.trajectory.as_ref()?;
        let bob = trajectory.position(index)?;
        let time_s = self.solver.grid().time_at(index)?;
        let clear_trail = std::mem::take(&mut self.clear_trail);
        Some(Frame {
            index,
            time_s,
            bob,
            rod: self.solver.geometry.drawn_rod(&bob),
            trail: self.trail,
            clear_trail,
        })
    }

    /// Frames owed after `elapsed` wall-clock time. Empty while paused,
    /// computing, degraded or finished.
    pub fn advance(&mut self, elapsed: Duration) -> Vec<Frame> {
        self.poll();
        let Some(len) = self.trajectory.as_ref().map(Trajectory::len) else {
            return Vec::new();
        };
        if self.status != TrajectoryStatus::Ready {
            return Vec::new();
        }
        let due = self.clock.frames_due(elapsed);
        self.clock
            .take(due, len)
            .filter_map(|i| self.frame_at(i))
            .collect()
    }

    /// Emit exactly one frame, ignoring the clock.
    pub fn step(&mut self) -> Option<Frame> {
        self.poll();
        if self.status != TrajectoryStatus::Ready {
            return None;
        }
        let len = self.trajectory.as_ref()?.len();
        let range = self.clock.take(1, len);
        if range.is_empty() {
            return None;
        }
        self.frame_at(range.start)
    }
}
