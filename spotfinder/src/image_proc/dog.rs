//! Difference-of-Gaussians band-pass filter.
//!
//! `dog = blur(sigma1) - blur(sigma2)`. With `sigma1 < sigma2` bright,
//! round features of a scale between the two sigmas give a positive response,
//! while flat background cancels out and pixel noise is smoothed away.

use log::debug;

use crate::error::SpotError;
use crate::image_proc::convolve::gaussian_blur;
use crate::volume::Volume;

/// Reject sigmas that cannot define a Gaussian.
pub(crate) fn validate_sigma(name: &'static str, sigma: f64) -> Result<(), SpotError> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Err(SpotError::invalid(
            name,
            format!("must be a finite value > 0, got {sigma}"),
        ));
    }
    Ok(())
}

/// Apply a Difference-of-Gaussians filter to a float volume.
///
/// Returns a newly allocated volume with the same shape and axis labels.
///
/// # Errors
/// `InvalidParameter` if either sigma is not a finite positive number.
pub fn difference_of_gaussians(
    volume: &Volume<f32>,
    sigma1: f64,
    sigma2: f64,
) -> Result<Volume<f32>, SpotError> {
    validate_sigma("sigma1", sigma1)?;
    validate_sigma("sigma2", sigma2)?;

    debug!(
        "DoG sigma1={sigma1} sigma2={sigma2} on shape {:?}",
        volume.shape()
    );

    let view = volume.data().view();
    let mut narrow = gaussian_blur(&view, sigma1);
    let wide = gaussian_blur(&view, sigma2);
    narrow -= &wide;

    Ok(Volume::from_parts(narrow, volume.axes().to_vec()))
}
