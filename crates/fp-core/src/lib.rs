//! fp-core: shared foundation for the Foucault pendulum workspace.
//!
//! Contains:
//! - units (uom SI types + constructors, physical constants)
//! - numeric (Real + tolerances + float and domain checks)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod units;

pub use error::{FpError, FpResult};
pub use numeric::*;
pub use units::*;
