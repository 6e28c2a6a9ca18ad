//! Baseline-dependent smoothing of interferometric visibilities.
//!
//! Short baselines see slowly-varying ionospheric phases, so they can be
//! averaged over longer stretches of time than long baselines. Each baseline
//! is smoothed along the time axis with a Gaussian whose width depends on the
//! baseline length and channel frequency; flagged samples carry no weight.

pub mod averaging;
pub mod baselines;
pub mod config;
mod error;
pub mod memory;
pub mod process;
pub mod read;
pub mod write;

pub use error::BlavgError;
pub use marlu::{c32, UVW};
