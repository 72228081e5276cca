//! Separable Gaussian smoothing for N-dimensional arrays
//!
//! A Gaussian blur in N dimensions factors into N one-dimensional passes, one
//! per axis. Each pass convolves every lane along its axis with a normalized
//! 1D kernel. Samples outside the array are taken from a mirror image of the
//! lane that does not repeat the edge sample (`... 2 1 | 0 1 2 ... n-1 | n-2 ...`).
//!
//! The mirrored lane repeats with period `2 * (n - 1)`. When a kernel is at
//! least as wide as the lane it is folded onto one period first, so the cost
//! of a pass is bounded by the lane length rather than by sigma.

use ndarray::{ArrayD, ArrayViewD, Axis, Zip};

/// Most kernel periods summed when folding a wide kernel onto a lane.
///
/// Past this many periods the kernel is flat to well within `f32` precision
/// for every lane it is folded onto.
const MAX_FOLDED_PERIODS: usize = 1024;

/// Kernel half-width for a given sigma: `ceil(3 * sigma)`, at least 1.
///
/// Saturates at `usize::MAX` for very large sigmas.
pub fn kernel_radius(sigma: f64) -> usize {
    ((3.0 * sigma).ceil() as usize).max(1)
}

/// Create a normalized 1D Gaussian kernel of length `2 * kernel_radius(sigma) + 1`
///
/// # Arguments
/// * `sigma` - Standard deviation of the Gaussian in samples (must be > 0)
///
/// # Returns
/// * Kernel taps, symmetric around the centre, summing to 1
///
/// The kernel is materialized in full, so this is meant for sigmas on the
/// scale of the data. [`gaussian_blur`] folds wider kernels itself.
pub fn gaussian_kernel_1d(sigma: f64) -> Vec<f32> {
    let radius = kernel_radius(sigma) as isize;
    let two_sigma_sq = 2.0 * sigma * sigma;

    let taps: Vec<f64> = (-radius..=radius)
        .map(|x| (-((x * x) as f64) / two_sigma_sq).exp())
        .collect();

    normalize(taps)
}

/// Gaussian taps for offsets `0..period`, each the sum of every kernel tap
/// congruent to it modulo `period`.
fn folded_kernel(sigma: f64, period: usize) -> Vec<f32> {
    let radius = kernel_radius(sigma).min(period.saturating_mul(MAX_FOLDED_PERIODS)) as isize;
    let two_sigma_sq = 2.0 * sigma * sigma;

    let mut taps = vec![0.0f64; period];
    for x in -radius..=radius {
        let x_f = x as f64;
        taps[x.rem_euclid(period as isize) as usize] += (-(x_f * x_f) / two_sigma_sq).exp();
    }

    normalize(taps)
}

fn normalize(mut taps: Vec<f64>) -> Vec<f32> {
    let sum: f64 = taps.iter().sum();
    if sum > 0.0 {
        taps.iter_mut().for_each(|t| *t /= sum);
    }
    taps.into_iter().map(|t| t as f32).collect()
}

/// Map a possibly out-of-bounds lane index onto `[0, len)` by mirroring.
#[inline]
fn mirror_index(i: isize, len: usize) -> usize {
    if len == 1 {
        return 0;
    }
    let period = 2 * (len as isize - 1);
    let m = i.rem_euclid(period);
    if m >= len as isize {
        (period - m) as usize
    } else {
        m as usize
    }
}

/// Convolve every lane along `axis` with `taps`, writing into `output`.
///
/// Tap `k` weighs the source sample at offset `k - origin` from the output
/// sample. Lanes are processed on the rayon pool.
fn convolve_axis(
    input: &ArrayViewD<f32>,
    output: &mut ArrayD<f32>,
    axis: usize,
    taps: &[f32],
    origin: isize,
) {
    let len = input.shape()[axis];

    Zip::from(output.lanes_mut(Axis(axis)))
        .and(input.lanes(Axis(axis)))
        .par_for_each(|mut out_lane, in_lane| {
            let src = in_lane.to_vec();
            for (i, out) in out_lane.iter_mut().enumerate() {
                let mut sum = 0.0f32;
                for (k, &tap) in taps.iter().enumerate() {
                    let j = mirror_index(i as isize + k as isize - origin, len);
                    sum += tap * src[j];
                }
                *out = sum;
            }
        });
}

/// Blur an N-dimensional array with an isotropic Gaussian of width `sigma`.
///
/// Axes with extent 1 are left untouched; an empty array is returned as is.
/// The caller validates `sigma` (see [`crate::detection::DetectionConfig`]).
pub fn gaussian_blur(input: &ArrayViewD<f32>, sigma: f64) -> ArrayD<f32> {
    let mut current = input.to_owned();
    if current.is_empty() {
        return current;
    }

    let radius = kernel_radius(sigma);
    let mut centred: Option<Vec<f32>> = None;
    for axis in 0..current.ndim() {
        let len = current.shape()[axis];
        if len < 2 {
            continue;
        }

        let mut next = ArrayD::<f32>::zeros(current.raw_dim());
        if radius < len {
            let taps = centred.get_or_insert_with(|| gaussian_kernel_1d(sigma));
            convolve_axis(&current.view(), &mut next, axis, taps, radius as isize);
        } else {
            let taps = folded_kernel(sigma, 2 * (len - 1));
            convolve_axis(&current.view(), &mut next, axis, &taps, 0);
        }
        current = next;
    }

    current
}
