//! Error taxonomy for spot detection.
//!
//! Two layers of errors are used throughout the crate:
//!
//! - [`InputError`] covers everything that can go wrong before an image volume
//!   exists: missing files, undecodable formats, inconsistent page layouts.
//! - [`SpotError`] is what detection operations return. Parameter problems are
//!   reported as [`SpotError::InvalidParameter`] or [`SpotError::OutOfRange`]
//!   and always name the offending parameter; loader failures are wrapped
//!   unchanged in [`SpotError::Input`].
//!
//! Failures are a deterministic function of the input, so nothing here is
//! retried.

use std::path::PathBuf;
use thiserror::Error;

/// Failures raised while reading an image from disk.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("TIFF decoding failed for {path}: {source}")]
    Tiff {
        path: PathBuf,
        #[source]
        source: tiff::TiffError,
    },
    #[error("Image decoding failed for {path}: {source}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("Unsupported image data in {path}: {reason}")]
    Unsupported { path: PathBuf, reason: String },
    #[error("Inconsistent image layout in {path}: {reason}")]
    Shape { path: PathBuf, reason: String },
}

/// Errors returned by detection and its orchestration helpers.
#[derive(Error, Debug)]
pub enum SpotError {
    /// A numeric parameter (sigma, threshold) is unusable.
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// An index (channel, axis) falls outside `[0, extent)`.
    #[error("Parameter `{name}` = {value} is out of range [0, {extent})")]
    OutOfRange {
        name: &'static str,
        value: i64,
        extent: usize,
    },

    #[error(transparent)]
    Input(#[from] InputError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SpotError {
    pub(crate) fn invalid(name: &'static str, reason: impl Into<String>) -> Self {
        SpotError::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    pub(crate) fn out_of_range(name: &'static str, value: i64, extent: usize) -> Self {
        SpotError::OutOfRange {
            name,
            value,
            extent,
        }
    }
}
