//! Error types for simulation operations.

use thiserror::Error;

/// Errors encountered during trajectory integration.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimError {
    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Non-physical condition: {what}")]
    NonPhysical { what: &'static str },

    #[error("Release angle {angle_rad} rad is within {margin_rad} rad of a pole")]
    PoleViolation { angle_rad: f64, margin_rad: f64 },

    #[error("Simulation diverged at t = {t} s: {what}")]
    Diverged { t: f64, what: &'static str },

    #[error("Step size underflow at t = {t} s (h = {h})")]
    StepSizeUnderflow { t: f64, h: f64 },

    #[error("Step budget of {steps} steps exhausted at t = {t} s")]
    StepBudgetExhausted { t: f64, steps: usize },

    #[error("Integration cancelled at t = {t} s")]
    Cancelled { t: f64 },

    #[error("Domain error: {0}")]
    Domain(#[from] fp_core::FpError),
}

pub type SimResult<T> = Result<T, SimError>;

impl SimError {
    /// True for failures where the numbers went bad, as opposed to bad
    /// arguments or a cancelled run.
    pub fn is_divergence(&self) -> bool {
        matches!(
            self,
            SimError::Diverged { .. }
                | SimError::StepSizeUnderflow { .. }
                | SimError::StepBudgetExhausted { .. }
        )
    }
}
