//! Local maximum search over N-dimensional float arrays
//!
//! A sample is a local maximum when it is strictly greater than every sample in
//! its full `3^n - 1` neighbourhood (faces, edges and corners) and strictly
//! greater than the threshold. Samples on the outer border of any axis have an
//! incomplete neighbourhood and are never reported.

use ndarray::{ArrayViewD, Dimension};

/// All non-zero offsets in `{-1, 0, 1}^ndim`.
fn neighbour_offsets(ndim: usize) -> Vec<Vec<isize>> {
    let count = 3usize.pow(ndim as u32);
    (0..count)
        .map(|mut code| {
            (0..ndim)
                .map(|_| {
                    let digit = (code % 3) as isize - 1;
                    code /= 3;
                    digit
                })
                .collect::<Vec<isize>>()
        })
        .filter(|offset| offset.iter().any(|&d| d != 0))
        .collect()
}

/// Find local maxima above `threshold`
///
/// # Arguments
/// * `image` - Filtered array to scan
/// * `threshold` - Values must be strictly greater than this to be reported
///
/// # Returns
/// Full indices of every local maximum, in row-major scan order (last axis
/// varies fastest).
pub fn find_local_maxima(image: &ArrayViewD<f32>, threshold: f32) -> Vec<Vec<usize>> {
    let shape = image.shape();
    let ndim = shape.len();

    // Every sample needs a neighbour on both sides of every axis
    if ndim == 0 || shape.iter().any(|&n| n < 3) {
        return Vec::new();
    }

    let offsets = neighbour_offsets(ndim);
    let mut neighbour = vec![0usize; ndim];
    let mut maxima = Vec::new();

    for (index, &value) in image.indexed_iter() {
        let index = index.slice();
        if index
            .iter()
            .zip(shape)
            .any(|(&i, &n)| i == 0 || i == n - 1)
        {
            continue;
        }
        if value <= threshold {
            continue;
        }

        let is_peak = offsets.iter().all(|offset| {
            for d in 0..ndim {
                neighbour[d] = (index[d] as isize + offset[d]) as usize;
            }
            image[neighbour.as_slice()] < value
        });

        if is_peak {
            maxima.push(index.to_vec());
        }
    }

    maxima
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array2, Array3, ArrayD, IxDyn};

    #[test]
    fn test_offset_counts() {
        assert_eq!(neighbour_offsets(1).len(), 2);
        assert_eq!(neighbour_offsets(2).len(), 8);
        assert_eq!(neighbour_offsets(3).len(), 26);
    }

    #[test]
    fn test_single_peak_2d() {
        let mut image = Array2::<f32>::zeros((7, 7));
        image[[3, 4]] = 5.0;
        image[[3, 3]] = 2.0;

        let maxima = find_local_maxima(&image.into_dyn().view(), 1.0);
        assert_eq!(maxima, vec![vec![3, 4]]);
    }

    #[test]
    fn test_plateau_is_not_a_maximum() {
        let mut image = Array2::<f32>::zeros((7, 7));
        image[[3, 3]] = 5.0;
        image[[3, 4]] = 5.0;

        let maxima = find_local_maxima(&image.into_dyn().view(), 0.0);
        assert!(maxima.is_empty());
    }

    #[test]
    fn test_diagonal_neighbours_count() {
        // Larger diagonal neighbour suppresses the centre under full connectivity
        let mut image = Array2::<f32>::zeros((7, 7));
        image[[3, 3]] = 5.0;
        image[[4, 4]] = 6.0;

        let maxima = find_local_maxima(&image.into_dyn().view(), 0.0);
        assert_eq!(maxima, vec![vec![4, 4]]);
    }

    #[test]
    fn test_border_and_threshold() {
        let mut image = Array3::<f32>::zeros((5, 5, 5));
        image[[0, 2, 2]] = 100.0; // on the border
        image[[2, 2, 2]] = 10.0;

        let view = image.into_dyn();
        assert_eq!(find_local_maxima(&view.view(), 5.0), vec![vec![2, 2, 2]]);
        assert!(find_local_maxima(&view.view(), 10.0).is_empty());
    }

    #[test]
    fn test_too_small_arrays_have_no_interior() {
        let image = ArrayD::<f32>::from_elem(IxDyn(&[2, 9]), 1.0);
        assert!(find_local_maxima(&image.view(), 0.0).is_empty());
    }
}
