//! Microscopy image loading.
//!
//! Loaders turn a file into an [`ImageData`], a typed [`Volume`] whose axes
//! follow the `[X, Y, Channel, Z, Time]` convention:
//!
//! - X and Y are always present.
//! - The channel axis is always present at index 2, with extent 1 for
//!   single-channel files, so channel selection works the same for every image.
//! - Z and Time are only added when the file holds more than one slice or frame.
//!
//! # Supported Formats
//!
//! - **TIFF stacks** (`.tif`, `.tiff`): multi-page grayscale, 8/16-bit unsigned
//!   or 32-bit float, with ImageJ hyperstack metadata when available
//! - **Raster images**: anything the `image` crate decodes (PNG, JPEG, ...).
//!   Gray images have one channel; RGB and RGBA composites keep each colour
//!   plane (and alpha) as its own channel
//!
//! Other readers plug in by implementing [`ImageLoader`].

mod tiff_stack;

pub use tiff_stack::{HyperstackLayout, TiffStackLoader};

use image::{DynamicImage, ImageBuffer, Pixel};
use ndarray::{ArrayD, IxDyn};
use std::path::Path;

use crate::error::InputError;
use crate::volume::{AxisKind, Volume};

/// A loaded image with its native sample type.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageData {
    U8(Volume<u8>),
    U16(Volume<u16>),
    F32(Volume<f32>),
}

impl ImageData {
    /// Name of the sample type, e.g. `uint16`.
    pub fn pixel_type(&self) -> &'static str {
        match self {
            ImageData::U8(_) => "uint8",
            ImageData::U16(_) => "uint16",
            ImageData::F32(_) => "float32",
        }
    }

    pub fn axes(&self) -> &[AxisKind] {
        match self {
            ImageData::U8(v) => v.axes(),
            ImageData::U16(v) => v.axes(),
            ImageData::F32(v) => v.axes(),
        }
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            ImageData::U8(v) => v.shape(),
            ImageData::U16(v) => v.shape(),
            ImageData::F32(v) => v.shape(),
        }
    }

    pub fn ndim(&self) -> usize {
        self.shape().len()
    }

    /// Index of the channel axis, if the image has one.
    pub fn channel_axis(&self) -> Option<usize> {
        self.axes().iter().position(|&a| a == AxisKind::Channel)
    }
}

/// Source of image volumes.
pub trait ImageLoader {
    fn load(&self, path: &Path) -> Result<ImageData, InputError>;
}

/// Single-plane raster images decoded by the `image` crate.
///
/// Output axes are `[X, Y, Channel]`. The channel extent is the pixel's
/// channel count: 1 for gray, 3 for RGB, 4 for RGBA. Gray+alpha images and
/// formats without a native sample type here are reduced to 16-bit luma.
#[derive(Debug, Default, Clone, Copy)]
pub struct RasterLoader;

impl ImageLoader for RasterLoader {
    fn load(&self, path: &Path) -> Result<ImageData, InputError> {
        let decoded = image::open(path).map_err(|source| InputError::Image {
            path: path.to_path_buf(),
            source,
        })?;

        let data = match decoded {
            DynamicImage::ImageLuma8(img) => ImageData::U8(planes(&img)),
            DynamicImage::ImageRgb8(img) => ImageData::U8(planes(&img)),
            DynamicImage::ImageRgba8(img) => ImageData::U8(planes(&img)),
            DynamicImage::ImageLuma16(img) => ImageData::U16(planes(&img)),
            DynamicImage::ImageRgb16(img) => ImageData::U16(planes(&img)),
            DynamicImage::ImageRgba16(img) => ImageData::U16(planes(&img)),
            DynamicImage::ImageRgb32F(img) => ImageData::F32(planes(&img)),
            DynamicImage::ImageRgba32F(img) => ImageData::F32(planes(&img)),
            other => ImageData::U16(planes(&other.to_luma16())),
        };

        Ok(data)
    }
}

/// Spread interleaved pixels over a trailing channel axis.
fn planes<P: Pixel>(img: &ImageBuffer<P, Vec<P::Subpixel>>) -> Volume<P::Subpixel> {
    let (width, height) = img.dimensions();
    let shape = IxDyn(&[width as usize, height as usize, P::CHANNEL_COUNT as usize]);
    let data = ArrayD::from_shape_fn(shape, |idx| {
        img.get_pixel(idx[0] as u32, idx[1] as u32).channels()[idx[2]]
    });
    Volume::from_parts(data, vec![AxisKind::X, AxisKind::Y, AxisKind::Channel])
}

/// Load an image, choosing the loader from the file extension.
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<ImageData, InputError> {
    let path = path.as_ref();
    let is_tiff = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| matches!(e.to_ascii_lowercase().as_str(), "tif" | "tiff"))
        .unwrap_or(false);

    if is_tiff {
        TiffStackLoader.load(path)
    } else {
        RasterLoader.load(path)
    }
}
