//! Detection parameters and their JSON persistence.
//!
//! A [`DetectionConfig`] holds everything the detector needs besides the image
//! and the channel: which axis is the channel axis, the two DoG sigmas and the
//! response threshold. Configurations can be stored as JSON so a tuned set of
//! parameters can be reused across runs; command-line flags override
//! individual fields on top of a loaded file.
//!
//! # Defaults
//!
//! - `channel_axis = 2`, matching the `[X, Y, Channel, Z]` loader layout
//! - `sigma1 = 1.0`, `sigma2 = 1.5`: band-pass for spots a few pixels across
//! - `threshold = 100.0`, in filtered (float) intensity units
//!
//! # Usage
//!
//! ```rust
//! use spotfinder::detection::DetectionConfig;
//!
//! let config = DetectionConfig {
//!     threshold: 50.0,
//!     ..Default::default()
//! };
//! assert!(config.validate().is_ok());
//! assert_eq!(config.sigma1, 1.0);
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::SpotError;
use crate::image_proc::dog::validate_sigma;

/// Default channel axis for `[X, Y, Channel, Z]` images.
pub const DEFAULT_CHANNEL_AXIS: usize = 2;

/// Parameters for one detection run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Axis of the volume that indexes channels
    pub channel_axis: usize,
    /// Width of the narrow Gaussian, in samples
    pub sigma1: f64,
    /// Width of the wide Gaussian, in samples
    pub sigma2: f64,
    /// Minimum DoG response a maximum must exceed
    pub threshold: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            channel_axis: DEFAULT_CHANNEL_AXIS,
            sigma1: 1.0,
            sigma2: 1.5,
            threshold: 100.0,
        }
    }
}

impl DetectionConfig {
    /// Check the numeric parameters.
    ///
    /// # Errors
    /// `InvalidParameter` naming `sigma1`, `sigma2` or `threshold`.
    pub fn validate(&self) -> Result<(), SpotError> {
        validate_sigma("sigma1", self.sigma1)?;
        validate_sigma("sigma2", self.sigma2)?;
        if self.threshold.is_nan() {
            return Err(SpotError::invalid("threshold", "must be a number, got NaN"));
        }
        Ok(())
    }

    /// Read a configuration from a JSON file. Missing fields take defaults.
    pub fn load_from_file(path: &Path) -> Result<Self, SpotError> {
        let text = fs::read_to_string(path)
            .map_err(|e| SpotError::Config(format!("cannot read {}: {e}", path.display())))?;
        serde_json::from_str(&text)
            .map_err(|e| SpotError::Config(format!("cannot parse {}: {e}", path.display())))
    }

    /// Write the configuration as pretty-printed JSON.
    pub fn save_to_file(&self, path: &Path) -> Result<(), SpotError> {
        let text = serde_json::to_string_pretty(self)
            .map_err(|e| SpotError::Config(format!("cannot serialize config: {e}")))?;
        fs::write(path, text)
            .map_err(|e| SpotError::Config(format!("cannot write {}: {e}", path.display())))
    }
}
