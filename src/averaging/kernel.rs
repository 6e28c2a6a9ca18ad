//! Estimation of the smoothing-kernel width of a baseline.

use hifitime::Duration;
use marlu::UVW;
use vec1::Vec1;

/// The baseline length scale \[km\] of the width estimate. A baseline of this
/// length at [`REF_FREQ_HZ`] gets a width of exactly `ion_factor` seconds.
pub const ION_REF_DIST_KM: f64 = 25.0e3;

/// The reference frequency of the width estimate \[Hz\].
pub const REF_FREQ_HZ: f64 = 60.0e6;

/// Why a baseline isn't smoothed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Degeneracy {
    /// The mean UVW length is zero (or not finite), so the baseline length
    /// can't be used.
    ZeroLength,

    /// There are fewer than two distinct timestamps, so there's no time
    /// resolution to convert widths into samples.
    NoTimeRes,
}

impl std::fmt::Display for Degeneracy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Degeneracy::ZeroLength => write!(f, "baseline length is zero"),
            Degeneracy::NoTimeRes => write!(f, "fewer than two distinct timestamps"),
        }
    }
}

/// The Gaussian widths to smooth a baseline with.
#[derive(Debug, Clone, PartialEq)]
pub struct KernelProfile {
    /// The standard deviation of the kernel for each channel \[samples\].
    /// Never negative; 0 means "don't smooth".
    pub sigmas: Vec1<f64>,

    /// The mean baseline length \[km\].
    pub dist_km: f64,

    /// If set, this baseline is degenerate and all `sigmas` are 0.
    pub degeneracy: Option<Degeneracy>,
}

/// The mean length of the supplied UVWs \[km\].
pub fn mean_baseline_length_km(uvws: &[UVW]) -> f64 {
    if uvws.is_empty() {
        return 0.0;
    }
    let sum: f64 = uvws
        .iter()
        .map(|uvw| (uvw.u * uvw.u + uvw.v * uvw.v + uvw.w * uvw.w).sqrt())
        .sum();
    sum / uvws.len() as f64 / 1e3
}

/// The kernel width \[seconds\] for a baseline of length `dist_km` observed at
/// `freq_hz`. `dist_km` must be positive.
pub fn sigma_seconds(ion_factor: f64, dist_km: f64, freq_hz: f64) -> f64 {
    ion_factor * (ION_REF_DIST_KM / dist_km).sqrt() * (freq_hz / REF_FREQ_HZ)
}

/// Estimate the kernel widths for a baseline, one per channel in
/// `chan_freqs` \[Hz\].
///
/// Degenerate baselines (zero length or no time resolution) get zero-width
/// kernels, i.e. they are passed through unsmoothed; the reason is reported in
/// [`KernelProfile::degeneracy`].
pub fn estimate_kernel(
    uvws: &[UVW],
    time_res: Option<Duration>,
    chan_freqs: &Vec1<f64>,
    ion_factor: f64,
) -> KernelProfile {
    let dist_km = mean_baseline_length_km(uvws);

    let degeneracy = if !dist_km.is_finite() || dist_km <= 0.0 {
        Some(Degeneracy::ZeroLength)
    } else {
        match time_res {
            Some(t) if t.to_seconds() > 0.0 => None,
            _ => Some(Degeneracy::NoTimeRes),
        }
    };

    let sigmas = match (degeneracy, time_res) {
        (None, Some(time_res)) => {
            let time_res = time_res.to_seconds();
            chan_freqs.mapped_ref(|&freq| sigma_seconds(ion_factor, dist_km, freq) / time_res)
        }
        _ => chan_freqs.mapped_ref(|_| 0.0),
    };

    KernelProfile {
        sigmas,
        dist_km,
        degeneracy,
    }
}
