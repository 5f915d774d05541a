//! Simulation runner and result recording.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use fp_core::Tolerances;

use crate::error::{SimError, SimResult};
use crate::integrator::{DormandPrince45, ForwardEuler, Integrator, RK4, StepController};
use crate::model::TransientModel;

/// Integrator selection for simulation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum IntegratorType {
    /// Adaptive Dormand-Prince 5(4) with local error control (default).
    #[default]
    DormandPrince45,
    /// 4th-order Runge-Kutta, fixed sub-steps.
    RK4,
    /// Forward Euler (1st-order), fixed sub-steps.
    ForwardEuler,
}

/// Options for simulation runs.
#[derive(Clone, Debug)]
pub struct SimOptions {
    /// Integrator type (default: Dormand-Prince 5(4))
    pub integrator: IntegratorType,
    /// Local error target for the adaptive integrator
    pub tolerances: Tolerances,
    /// Upper bound on attempted steps over the whole run
    pub max_steps: usize,
    /// Adaptive step below which the run is abandoned (seconds)
    pub min_step: f64,
    /// Largest internal step (seconds). Fixed-step integrators split each
    /// grid interval into sub-steps no longer than this.
    pub max_step: Option<f64>,
    /// Emit progress every N grid samples
    pub progress_every: usize,
}

impl Default for SimOptions {
    fn default() -> Self {
        Self {
            integrator: IntegratorType::default(),
            tolerances: Tolerances::default(),
            max_steps: 2_000_000,
            min_step: 1e-12,
            max_step: None,
            progress_every: 1_000,
        }
    }
}

impl SimOptions {
    pub fn validate(&self) -> SimResult<()> {
        if !(self.tolerances.abs > 0.0 && self.tolerances.rel >= 0.0) {
            return Err(SimError::InvalidArg {
                what: "tolerances must be positive",
            });
        }
        if self.max_steps == 0 {
            return Err(SimError::InvalidArg {
                what: "max_steps must be positive",
            });
        }
        if !(self.min_step > 0.0) {
            return Err(SimError::InvalidArg {
                what: "min_step must be positive",
            });
        }
        if let Some(h) = self.max_step {
            if !(h > 0.0) || h < self.min_step {
                return Err(SimError::InvalidArg {
                    what: "max_step must be positive and not below min_step",
                });
            }
        }
        if self.progress_every == 0 {
            return Err(SimError::InvalidArg {
                what: "progress_every must be positive",
            });
        }
        Ok(())
    }
}

/// Step bookkeeping for one run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct IntegrationStats {
    pub accepted_steps: usize,
    pub rejected_steps: usize,
}

impl IntegrationStats {
    pub fn attempted(&self) -> usize {
        self.accepted_steps + self.rejected_steps
    }
}

/// Progress snapshot emitted while integrating.
#[derive(Clone, Debug)]
pub struct SimProgress {
    /// Grid samples completed (including the initial one)
    pub sample: usize,
    pub total_samples: usize,
    /// Simulated time reached (seconds)
    pub t: f64,
    pub stats: IntegrationStats,
}

impl SimProgress {
    pub fn fraction_complete(&self) -> f64 {
        if self.total_samples == 0 {
            1.0
        } else {
            self.sample as f64 / self.total_samples as f64
        }
    }
}

/// Cooperative cancellation flag, checked between grid samples.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Record of simulation results, one entry per grid sample.
#[derive(Clone, Debug)]
pub struct SimRecord<S> {
    /// Time points (seconds)
    pub t: Vec<f64>,
    /// State snapshots
    pub x: Vec<S>,
    pub stats: IntegrationStats,
}

impl<S> SimRecord<S> {
    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }
}

/// Integrate `model` and record its state at every time in `times`.
pub fn run_on_grid<M: TransientModel>(
    model: &mut M,
    times: &[f64],
    opts: &SimOptions,
) -> SimResult<SimRecord<M::State>> {
    run_on_grid_with_progress(model, times, opts, None, None)
}

/// Integrate `model` over `times`, emitting progress and honouring `cancel`.
///
/// `times` must be strictly increasing; the model's initial state is taken
/// to hold at `times[0]`.
pub fn run_on_grid_with_progress<M: TransientModel>(
    model: &mut M,
    times: &[f64],
    opts: &SimOptions,
    cancel: Option<&CancelToken>,
    mut progress: Option<&mut dyn FnMut(&SimProgress)>,
) -> SimResult<SimRecord<M::State>> {
    opts.validate()?;
    if times.iter().any(|t| !t.is_finite()) {
        return Err(SimError::InvalidArg {
            what: "sample times must be finite",
        });
    }
    if times.windows(2).any(|w| w[1] <= w[0]) {
        return Err(SimError::InvalidArg {
            what: "sample times must be strictly increasing",
        });
    }

    let total = times.len();
    let mut stats = IntegrationStats::default();
    let mut t_record = Vec::with_capacity(total);
    let mut x_record = Vec::with_capacity(total);

    let Some(&t0) = times.first() else {
        return Ok(SimRecord {
            t: t_record,
            x: x_record,
            stats,
        });
    };

    let mut x = model.initial_state();
    if !model.is_finite(&x) {
        return Err(SimError::Diverged {
            t: t0,
            what: "initial state is not finite",
        });
    }
    t_record.push(t0);
    x_record.push(x.clone());

    tracing::debug!(samples = total, integrator = ?opts.integrator, "integration started");

    let controller = StepController::new(opts.tolerances);
    let mut h = times
        .get(1)
        .map(|t1| t1 - t0)
        .unwrap_or(opts.min_step)
        .min(opts.max_step.unwrap_or(f64::INFINITY));

    for (i, pair) in times.windows(2).enumerate() {
        let (ta, tb) = (pair[0], pair[1]);
        if cancel.is_some_and(|c| c.is_cancelled()) {
            tracing::debug!(t = ta, "integration cancelled");
            return Err(SimError::Cancelled { t: ta });
        }

        x = match opts.integrator {
            IntegratorType::DormandPrince45 => {
                advance_adaptive(model, &controller, opts, ta, tb, x, &mut h, &mut stats)?
            }
            IntegratorType::RK4 => advance_fixed(model, &RK4, opts, ta, tb, x, &mut stats)?,
            IntegratorType::ForwardEuler => {
                advance_fixed(model, &ForwardEuler, opts, ta, tb, x, &mut stats)?
            }
        };

        if !model.is_finite(&x) {
            tracing::warn!(t = tb, "non-finite state, stopping integration");
            return Err(SimError::Diverged {
                t: tb,
                what: "state became non-finite",
            });
        }

        t_record.push(tb);
        x_record.push(x.clone());

        let sample = i + 2;
        if let Some(cb) = progress.as_deref_mut() {
            if sample % opts.progress_every == 0 || sample == total {
                cb(&SimProgress {
                    sample,
                    total_samples: total,
                    t: tb,
                    stats,
                });
            }
        }
    }

    tracing::debug!(
        accepted = stats.accepted_steps,
        rejected = stats.rejected_steps,
        "integration finished"
    );

    Ok(SimRecord {
        t: t_record,
        x: x_record,
        stats,
    })
}

fn check_budget(opts: &SimOptions, stats: &IntegrationStats, t: f64) -> SimResult<()> {
    if stats.attempted() >= opts.max_steps {
        tracing::warn!(t, steps = opts.max_steps, "step budget exhausted");
        return Err(SimError::StepBudgetExhausted {
            t,
            steps: opts.max_steps,
        });
    }
    Ok(())
}

/// Step from `ta` to exactly `tb` with error control. `h` carries the
/// controller's proposal across grid intervals.
#[allow(clippy::too_many_arguments)]
fn advance_adaptive<M: TransientModel>(
    model: &mut M,
    controller: &StepController,
    opts: &SimOptions,
    ta: f64,
    tb: f64,
    mut x: M::State,
    h: &mut f64,
    stats: &mut IntegrationStats,
) -> SimResult<M::State> {
    let max_step = opts.max_step.unwrap_or(f64::INFINITY);
    let mut t = ta;
    while t < tb {
        check_budget(opts, stats, t)?;

        let remaining = tb - t;
        let last = *h >= remaining;
        let h_try = if last { remaining } else { *h };

        let step = DormandPrince45.try_step(model, t, &x, h_try)?;
        let err = model.error_norm(&step.error, &x, &step.state, controller.tol);

        if controller.accepts(err) && model.is_finite(&step.state) {
            stats.accepted_steps += 1;
            t = if last { tb } else { t + h_try };
            x = step.state;
            let proposal = controller.propose(h_try, err);
            // a step shortened to land on the grid says little about the next one
            let next = if last { (*h).max(proposal) } else { proposal };
            *h = next.min(max_step);
        } else {
            stats.rejected_steps += 1;
            *h = controller.propose(h_try, err);
            if *h < opts.min_step {
                tracing::warn!(t, h = *h, err, "adaptive step underflow");
                return Err(SimError::StepSizeUnderflow { t, h: *h });
            }
        }
    }
    Ok(x)
}

/// Step from `ta` to `tb` in equal sub-steps no longer than `max_step`.
fn advance_fixed<M: TransientModel, I: Integrator>(
    model: &mut M,
    integrator: &I,
    opts: &SimOptions,
    ta: f64,
    tb: f64,
    mut x: M::State,
    stats: &mut IntegrationStats,
) -> SimResult<M::State> {
    let span = tb - ta;
    let substeps = match opts.max_step {
        // shave rounding noise so 0.01 / 0.001 gives 10 sub-steps, not 11
        Some(h) => ((span / h * (1.0 - 1e-12)).ceil() as usize).max(1),
        None => 1,
    };
    let dt = span / substeps as f64;
    for k in 0..substeps {
        let t = ta + k as f64 * dt;
        check_budget(opts, stats, t)?;
        x = integrator.step(model, t, &x, dt)?;
        stats.accepted_steps += 1;
    }
    Ok(x)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sim_options_defaults() {
        let opts = SimOptions::default();
        assert_eq!(opts.integrator, IntegratorType::DormandPrince45);
        assert_eq!(opts.tolerances.rel, 1e-8);
        assert_eq!(opts.tolerances.abs, 1e-6);
        assert_eq!(opts.max_steps, 2_000_000);
        assert!(opts.validate().is_ok());
    }

    #[test]
    fn sim_options_invalid() {
        let opts = SimOptions {
            max_steps: 0,
            ..Default::default()
        };
        assert!(opts.validate().is_err());

        let opts = SimOptions {
            max_step: Some(0.0),
            ..Default::default()
        };
        assert!(opts.validate().is_err());

        let opts = SimOptions {
            tolerances: Tolerances::new(0.0, 1e-8),
            ..Default::default()
        };
        assert!(opts.validate().is_err());
    }

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn progress_fraction() {
        let p = SimProgress {
            sample: 25,
            total_samples: 100,
            t: 0.24,
            stats: IntegrationStats::default(),
        };
        assert!((p.fraction_complete() - 0.25).abs() < 1e-12);
    }
}
