//! Baseline-dependent Gaussian smoothing of visibilities.
//!
//! Per baseline, a Gaussian width (in samples) is estimated for every channel
//! from the baseline length (see [`estimate_kernel`]), and the weighted
//! visibilities are then smoothed along the time axis (see
//! [`smooth_baseline`]).

mod kernel;
mod smooth;

pub use kernel::*;
pub use smooth::*;

use marlu::{c32, UVW};
use ndarray::prelude::*;

/// The visibilities of a single baseline. All cubes are arranged
/// `[time][channel][polarisation]`, with times matching the rows of the
/// baseline's [`crate::baselines::BaselineGroup`].
#[derive(Debug, Clone)]
pub struct BaselineVis {
    /// The UVW coordinates of each row \[metres\].
    pub uvws: Vec<UVW>,

    pub data: Array3<c32>,

    /// `true` means flagged.
    pub flags: Array3<bool>,

    /// The weights may have a polarisation axis of length 1, in which case
    /// the single weight applies to all polarisations.
    pub weights: Array3<f32>,
}
