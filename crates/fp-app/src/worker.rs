//! Background trajectory computation.

use std::sync::mpsc::{Receiver, RecvError, Sender, TryRecvError, channel};
use std::thread::{self, JoinHandle};

use fp_sim::{CancelToken, InitialConditions, SimProgress};

use crate::error::{AppError, AppResult};
use crate::trajectory::{Trajectory, TrajectorySolver};

#[derive(Debug)]
pub enum WorkerMessage {
    Progress { sample: usize, total: usize, t: f64 },
    Complete(Box<Trajectory>),
    Failed(AppError),
}

/// One trajectory computation running on its own thread.
///
/// Dropping the worker cancels the computation.
pub struct TrajectoryWorker {
    rx: Receiver<WorkerMessage>,
    cancel: CancelToken,
    initial: InitialConditions,
    progress: Option<(usize, usize)>,
    _handle: JoinHandle<()>,
}

impl TrajectoryWorker {
    pub fn start(solver: TrajectorySolver, initial: InitialConditions) -> Self {
        let (tx, rx) = channel();
        let cancel = CancelToken::new();
        let token = cancel.clone();

        let handle = thread::spawn(move || {
            let message = match Self::compute(&solver, initial, &token, &tx) {
                Ok(trajectory) => WorkerMessage::Complete(Box::new(trajectory)),
                Err(e) => WorkerMessage::Failed(e),
            };
            // Receiver gone means nobody wants the result.
            let _ = tx.send(message);
        });

        Self {
            rx,
            cancel,
            initial,
            progress: None,
            _handle: handle,
        }
    }

    fn compute(
        solver: &TrajectorySolver,
        initial: InitialConditions,
        cancel: &CancelToken,
        tx: &Sender<WorkerMessage>,
    ) -> AppResult<Trajectory> {
        let mut report = |p: &SimProgress| {
            let _ = tx.send(WorkerMessage::Progress {
                sample: p.sample,
                total: p.total_samples,
                t: p.t,
            });
        };
        solver.compute_trajectory_with(initial, Some(cancel), Some(&mut report))
    }

    /// Initial conditions this worker was started with.
    pub fn initial_conditions(&self) -> InitialConditions {
        self.initial
    }

    /// Latest `(sample, total)` seen by `poll`.
    pub fn progress(&self) -> Option<(usize, usize)> {
        self.progress
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Non-blocking check. `None` while the computation is still running.
    pub fn poll(&mut self) -> Option<AppResult<Trajectory>> {
        loop {
            match self.rx.try_recv() {
                Ok(message) => {
                    if let Some(outcome) = self.absorb(message) {
                        return Some(outcome);
                    }
                }
                Err(TryRecvError::Empty) => return None,
                Err(TryRecvError::Disconnected) => return Some(Err(AppError::WorkerDisconnected)),
            }
        }
    }

    /// Block until the computation finishes.
    pub fn wait(mut self) -> AppResult<Trajectory> {
        loop {
            match self.rx.recv() {
                Ok(message) => {
                    if let Some(outcome) = self.absorb(message) {
                        return outcome;
                    }
                }
                Err(RecvError) => return Err(AppError::WorkerDisconnected),
            }
        }
    }

    fn absorb(&mut self, message: WorkerMessage) -> Option<AppResult<Trajectory>> {
        match message {
            WorkerMessage::Progress { sample, total, t } => {
                tracing::trace!(sample, total, t, "trajectory progress");
                self.progress = Some((sample, total));
                None
            }
            WorkerMessage::Complete(trajectory) => Some(Ok(*trajectory)),
            WorkerMessage::Failed(e) => Some(Err(e)),
        }
    }
}

impl Drop for TrajectoryWorker {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl std::fmt::Debug for TrajectoryWorker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrajectoryWorker")
            .field("initial", &self.initial)
            .field("progress", &self.progress)
            .finish_non_exhaustive()
    }
}
