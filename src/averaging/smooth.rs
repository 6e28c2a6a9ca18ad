//! Weighted Gaussian smoothing along the time axis.
//!
//! Each visibility is multiplied by its weight (zero if flagged), and both the
//! weighted visibilities and the weights are convolved with a Gaussian. The
//! convolved visibilities divided by the convolved weights is then a running
//! weighted average with a Gaussian window; the convolved weights are the new
//! weights.
//!
//! Edges are handled by reflecting about the outermost samples
//! (`d c b a | a b c d | d c b a`). Data and weights use the same reflection,
//! so the normalisation is exact everywhere.

use marlu::c32;
use ndarray::prelude::*;

use super::{BaselineVis, KernelProfile};

/// Kernels are truncated at this many standard deviations.
pub const KERNEL_TRUNCATE: f64 = 4.0;

/// The result of smoothing a baseline. Arrays are arranged
/// `[time][channel][polarisation]`.
#[derive(Debug, Clone)]
pub struct SmoothedVis {
    /// Smoothed visibilities. Samples with no weight in their window are NaN.
    pub data: Array3<c32>,

    /// Smoothed weights.
    pub weights: Array3<f32>,

    /// The number of samples whose whole window was flagged (or had zero
    /// weight), and are therefore NaN.
    pub num_invalid: usize,
}

/// Get a normalised Gaussian kernel with standard deviation `sigma`
/// \[samples\] for smoothing `len` samples. The kernel has `2r + 1` elements,
/// with `r` being `sigma * KERNEL_TRUNCATE` rounded to the nearest integer.
/// `None` is returned if `sigma` isn't positive, or there are no samples; no
/// smoothing should be done.
///
/// The reflected boundary repeats every `2 * len` samples. If `r` would be
/// larger than `len`, the kernel is instead folded onto a single period, so
/// `r` is `len` and the last element is zero. Convolving with the folded kernel
/// gives the same result as the full one.
pub fn gaussian_kernel(sigma: f64, len: usize) -> Option<Vec<f64>> {
    if len == 0 || sigma.is_nan() || sigma <= 0.0 {
        return None;
    }

    let radius = KERNEL_TRUNCATE * sigma + 0.5;
    let exponent = -0.5 / (sigma * sigma);
    let gaussian = |x: isize| (exponent * (x * x) as f64).exp();
    let mut kernel: Vec<f64> = if radius < (len + 1) as f64 {
        let radius = radius as isize;
        (-radius..=radius).map(gaussian).collect()
    } else {
        let period = 2 * len;
        let mut folded = vec![0.0; period + 1];
        if sigma >= period as f64 {
            // Folded this wide, a Gaussian is flat to one part in 1e8.
            folded[..period].fill(1.0);
        } else {
            let radius = radius as isize;
            for x in -radius..=radius {
                let i = (x + len as isize).rem_euclid(period as isize) as usize;
                folded[i] += gaussian(x);
            }
        }
        folded
    };
    let sum: f64 = kernel.iter().sum();
    kernel.iter_mut().for_each(|k| *k /= sum);
    Some(kernel)
}

/// Map a (possibly out-of-bounds) index onto `0..len` by reflecting about the
/// edges of the array. The reflection repeats, so arbitrarily distant indices
/// are valid.
pub(super) fn reflect_index(i: isize, len: usize) -> usize {
    let period = 2 * len as isize;
    let i = i.rem_euclid(period) as usize;
    if i < len {
        i
    } else {
        2 * len - 1 - i
    }
}

/// Convolve `input` with `kernel` (which must have an odd length), writing
/// into `output`.
pub(super) fn convolve_reflect(input: &[f64], kernel: &[f64], output: &mut [f64]) {
    let len = input.len();
    let radius = (kernel.len() / 2) as isize;
    for (i_out, out) in output.iter_mut().enumerate() {
        *out = kernel
            .iter()
            .enumerate()
            .map(|(i_k, k)| {
                let i_in = i_out as isize + i_k as isize - radius;
                k * input[reflect_index(i_in, len)]
            })
            .sum();
    }
}

/// Smooth the visibilities of a baseline. `profile` must have one width per
/// channel of `vis`.
///
/// A channel with zero width is passed through untouched, except that flagged
/// samples have their weights zeroed. Otherwise, any sample whose convolved
/// weight is zero is set to NaN and counted in [`SmoothedVis::num_invalid`].
pub fn smooth_baseline(vis: &BaselineVis, profile: &KernelProfile) -> SmoothedVis {
    let dim = vis.data.dim();
    let (num_times, num_chans, _) = dim;
    assert_eq!(vis.flags.dim(), dim, "flags and data have different shapes");
    assert_eq!(
        profile.sigmas.len(),
        num_chans,
        "need one kernel width per channel"
    );
    let weights = vis
        .weights
        .broadcast(dim)
        .expect("weights can be broadcast to the shape of the data");

    let mut out_data = Array3::zeros(dim);
    let mut out_weights = Array3::zeros(dim);
    let mut num_invalid = 0;

    // Scratch space, reused over all lanes.
    let mut weighted_re = vec![0.0; num_times];
    let mut weighted_im = vec![0.0; num_times];
    let mut eff_weights = vec![0.0; num_times];
    let mut conv_re = vec![0.0; num_times];
    let mut conv_im = vec![0.0; num_times];
    let mut conv_weights = vec![0.0; num_times];

    for (i_chan, &sigma) in profile.sigmas.iter().enumerate() {
        let kernel = gaussian_kernel(sigma, num_times);

        for (((data, flags), weights), (mut data_lane, mut weights_lane)) in vis
            .data
            .index_axis(Axis(1), i_chan)
            .axis_iter(Axis(1))
            .zip(vis.flags.index_axis(Axis(1), i_chan).axis_iter(Axis(1)))
            .zip(weights.index_axis(Axis(1), i_chan).axis_iter(Axis(1)))
            .zip(
                out_data
                    .index_axis_mut(Axis(1), i_chan)
                    .axis_iter_mut(Axis(1))
                    .zip(
                        out_weights
                            .index_axis_mut(Axis(1), i_chan)
                            .axis_iter_mut(Axis(1)),
                    ),
            )
        {
            // Flagged samples get no weight, whatever their stored weight.
            for (((&d, &f), &w), ((wr, wi), ew)) in data
                .iter()
                .zip(flags.iter())
                .zip(weights.iter())
                .zip(
                    weighted_re
                        .iter_mut()
                        .zip(weighted_im.iter_mut())
                        .zip(eff_weights.iter_mut()),
                )
            {
                *ew = if f { 0.0 } else { f64::from(w) };
                // Samples without weight contribute nothing, even if they
                // aren't finite.
                (*wr, *wi) = if *ew == 0.0 {
                    (0.0, 0.0)
                } else {
                    (f64::from(d.re) * *ew, f64::from(d.im) * *ew)
                };
            }

            let kernel = match kernel.as_deref() {
                Some(k) => k,
                None => {
                    data_lane.assign(&data);
                    weights_lane
                        .iter_mut()
                        .zip(eff_weights.iter())
                        .for_each(|(o, &w)| *o = w as f32);
                    continue;
                }
            };

            convolve_reflect(&weighted_re, kernel, &mut conv_re);
            convolve_reflect(&weighted_im, kernel, &mut conv_im);
            convolve_reflect(&eff_weights, kernel, &mut conv_weights);

            for ((od, ow), ((&re, &im), &w)) in data_lane
                .iter_mut()
                .zip(weights_lane.iter_mut())
                .zip(conv_re.iter().zip(conv_im.iter()).zip(conv_weights.iter()))
            {
                *ow = w as f32;
                *od = if w == 0.0 {
                    num_invalid += 1;
                    c32::new(f32::NAN, f32::NAN)
                } else {
                    c32::new((re / w) as f32, (im / w) as f32)
                };
            }
        }
    }

    SmoothedVis {
        data: out_data,
        weights: out_weights,
        num_invalid,
    }
}
