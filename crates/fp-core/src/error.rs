use thiserror::Error;

pub type FpResult<T> = Result<T, FpError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FpError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("{what} must be positive (got {value})")]
    NotPositive { what: &'static str, value: f64 },

    #[error("{what} = {value} lies outside the open interval ({lo}, {hi})")]
    OutOfDomain {
        what: &'static str,
        value: f64,
        lo: f64,
        hi: f64,
    },
}
