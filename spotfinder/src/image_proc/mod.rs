//! Image processing operations used by spot detection
//!
//! Each step of the detection pipeline is a named, statically typed function:
//! slicing out a channel, converting samples to float, Gaussian smoothing,
//! Difference-of-Gaussians band-pass filtering, and local-maximum search.
//! Image loaders live in [`io`].

pub mod convolve;
pub mod dog;
pub mod io;
pub mod local_extrema;
pub mod slice;

// Re-export key functionality for easier access
pub use convolve::{gaussian_blur, gaussian_kernel_1d, kernel_radius};
pub use dog::difference_of_gaussians;
pub use local_extrema::find_local_maxima;
pub use slice::{convert_to_f32, hyper_slice_view};
