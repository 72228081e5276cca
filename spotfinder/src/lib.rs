//! Spot detection for multi-channel microscopy image volumes.
//!
//! The pipeline isolates one channel of an N-dimensional image, converts it to
//! float, applies a Difference-of-Gaussians band-pass filter and reports every
//! local intensity maximum above a threshold as a [`Spot`]. Spots from
//! successive channels accumulate in a [`ResultsTable`].
//!
//! ```rust
//! use ndarray::{ArrayD, IxDyn};
//! use spotfinder::{DetectionConfig, ResultsTable, SpotDetector, Volume};
//!
//! // [X, Y, Channel, Z] volume with one bright voxel in channel 0
//! let mut data = ArrayD::<u16>::zeros(IxDyn(&[16, 16, 2, 8]));
//! data[[5, 9, 0, 4]] = 4000;
//! let volume = Volume::with_default_axes(data);
//!
//! let detector = SpotDetector::new(DetectionConfig {
//!     threshold: 10.0,
//!     ..Default::default()
//! })?;
//! let mut table = ResultsTable::new();
//! detector.detect_channels(&volume, &[0, 1], &mut table)?;
//!
//! assert_eq!(table.len(), 1);
//! assert_eq!((table.spots()[0].x, table.spots()[0].y, table.spots()[0].z), (5, 9, 4));
//! # Ok::<(), spotfinder::SpotError>(())
//! ```

pub mod detection;
pub mod error;
pub mod image_proc;
pub mod results;
pub mod shared_args;
pub mod volume;

pub use detection::{detect_spots, DetectionConfig, Spot, SpotDetector};
pub use error::{InputError, SpotError};
pub use image_proc::io::{load_image, ImageData, ImageLoader};
pub use results::{ResultsSink, ResultsTable};
pub use volume::{AxisKind, Volume, VolumeView};
