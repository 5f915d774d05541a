//! Error types for the fp-app service layer.

/// Application error type that wraps errors from the backend crates
/// and provides a unified error interface for the CLI and any front end.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Scenario error: {0}")]
    Project(#[from] fp_project::ProjectError),

    #[error("Invalid input: {0}")]
    Validation(#[from] fp_project::ValidationError),

    #[error("Simulation error: {0}")]
    Simulation(#[from] fp_sim::SimError),

    #[error("Invalid argument: {0}")]
    Core(#[from] fp_core::FpError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Trajectory worker stopped without a result")]
    WorkerDisconnected,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl AppError {
    /// True when integration produced unusable numbers.
    pub fn is_divergence(&self) -> bool {
        matches!(self, AppError::Simulation(e) if e.is_divergence())
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, AppError::Simulation(fp_sim::SimError::Cancelled { .. }))
    }
}

/// Result type for fp-app operations.
pub type AppResult<T> = Result<T, AppError>;
